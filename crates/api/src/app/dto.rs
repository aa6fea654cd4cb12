use serde::{Deserialize, Deserializer};

use stockroom_catalog::{
    Category, CategoryChanges, Product, ProductChanges, Supplier, SupplierChanges, category::NAME_REQUIRED,
    product::SKU_REQUIRED,
};
use stockroom_core::{CategoryId, DomainError, DomainResult};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

/// Partial update: absent keys are left alone, explicit `null` clears.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<CategoryId>>,
}

impl UpdateCategoryRequest {
    pub fn into_changes(self) -> DomainResult<CategoryChanges> {
        let changes = CategoryChanges {
            name: required(self.name, NAME_REQUIRED)?,
            description: self.description,
            parent_id: self.parent_id,
        };
        changes.validate()?;
        Ok(changes)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<i64>,
    pub category_id: Option<CategoryId>,
}

/// Partial product update. `null` for `name` or `sku` is rejected; `null`
/// for `unit_price` or `category_id` counts as absent.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub sku: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub unit_price: Option<i64>,
    pub category_id: Option<CategoryId>,
}

impl UpdateProductRequest {
    pub fn into_changes(self) -> DomainResult<ProductChanges> {
        let changes = ProductChanges {
            name: required(self.name, NAME_REQUIRED)?,
            sku: required(self.sku, SKU_REQUIRED)?,
            description: self.description,
            unit_price: self.unit_price,
            category_id: self.category_id,
        };
        changes.validate()?;
        Ok(changes)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierRequest {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSupplierRequest {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub contact_person: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub address: Option<Option<String>>,
}

impl UpdateSupplierRequest {
    pub fn into_changes(self) -> DomainResult<SupplierChanges> {
        let changes = SupplierChanges {
            name: required(self.name, NAME_REQUIRED)?,
            contact_person: self.contact_person,
            email: self.email,
            phone: self.phone,
            address: self.address,
        };
        changes.validate()?;
        Ok(changes)
    }
}

/// A present-but-null required field is a validation error.
fn required(field: Option<Option<String>>, message: &str) -> DomainResult<Option<String>> {
    match field {
        Some(None) => Err(DomainError::validation(message)),
        Some(Some(value)) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Deserialize a key that is present (possibly `null`) as `Some(..)`.
///
/// Paired with `#[serde(default)]` so an absent key stays `None`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn category_to_json(c: &Category) -> serde_json::Value {
    serde_json::json!({
        "id": c.id,
        "name": c.name,
        "description": c.description,
        "parent_id": c.parent_id,
        "created_at": c.created_at.to_rfc3339(),
        "updated_at": c.updated_at.to_rfc3339(),
    })
}

pub fn product_to_json(p: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id,
        "name": p.name,
        "sku": p.sku,
        "description": p.description,
        "unit_price": p.unit_price,
        "category_id": p.category_id,
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.to_rfc3339(),
    })
}

pub fn supplier_to_json(s: &Supplier) -> serde_json::Value {
    serde_json::json!({
        "id": s.id,
        "name": s.name,
        "contact_person": s.contact_person,
        "email": s.email,
        "phone": s.phone,
        "address": s.address,
        "created_at": s.created_at.to_rfc3339(),
        "updated_at": s.updated_at.to_rfc3339(),
    })
}
