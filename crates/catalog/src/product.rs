use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult, ProductId};

use crate::category::NAME_REQUIRED;

pub const SKU_REQUIRED: &str = "SKU is required";
pub const NEGATIVE_PRICE: &str = "Unit price must not be negative";

/// A sellable product, filed under exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    /// Price in the smallest currency unit (e.g. cents).
    pub unit_price: i64,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub unit_price: i64,
    pub category_id: CategoryId,
}

impl NewProduct {
    pub fn new(
        name: Option<String>,
        sku: Option<String>,
        description: Option<String>,
        unit_price: Option<i64>,
        category_id: Option<CategoryId>,
    ) -> DomainResult<Self> {
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DomainError::validation(NAME_REQUIRED))?;
        let sku = sku
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DomainError::validation(SKU_REQUIRED))?;
        let category_id = category_id.ok_or_else(|| DomainError::validation("Category is required"))?;

        let unit_price = unit_price.unwrap_or(0);
        if unit_price < 0 {
            return Err(DomainError::validation(NEGATIVE_PRICE));
        }

        Ok(Self {
            name,
            sku,
            description,
            unit_price,
            category_id,
        })
    }
}

/// Partial update of a product. Only `description` can be cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<Option<String>>,
    pub unit_price: Option<i64>,
    pub category_id: Option<CategoryId>,
}

impl ProductChanges {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(DomainError::validation(NAME_REQUIRED));
        }
        if self.sku.as_deref().is_some_and(str::is_empty) {
            return Err(DomainError::validation(SKU_REQUIRED));
        }
        if self.unit_price.is_some_and(|p| p < 0) {
            return Err(DomainError::validation(NEGATIVE_PRICE));
        }
        Ok(())
    }

    /// The new sku, if it differs from the current one.
    pub fn resku(&self, product: &Product) -> Option<&str> {
        self.sku.as_deref().filter(|s| *s != product.sku)
    }

    /// The new category, if it differs from the current one.
    pub fn moves(&self, product: &Product) -> Option<CategoryId> {
        self.category_id.filter(|c| *c != product.category_id)
    }

    pub fn apply(self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(sku) = self.sku {
            product.sku = sku;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(unit_price) = self.unit_price {
            product.unit_price = unit_price;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
        product.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(
        name: Option<&str>,
        sku: Option<&str>,
        price: Option<i64>,
        category: Option<i64>,
    ) -> DomainResult<NewProduct> {
        NewProduct::new(
            name.map(String::from),
            sku.map(String::from),
            None,
            price,
            category.map(CategoryId::new),
        )
    }

    #[test]
    fn accepts_complete_input_with_default_price() {
        let p = build(Some("Tank Top"), Some("TT-01"), None, Some(3)).unwrap();
        assert_eq!(p.unit_price, 0);
        assert_eq!(p.category_id, CategoryId::new(3));
    }

    #[test]
    fn required_fields_are_checked_in_order() {
        let err = build(Some(""), None, None, None).unwrap_err();
        assert_eq!(err, DomainError::validation("Name is required"));

        let err = build(Some("Tank Top"), Some(""), None, None).unwrap_err();
        assert_eq!(err, DomainError::validation("SKU is required"));

        let err = build(Some("Tank Top"), Some("TT-01"), None, None).unwrap_err();
        assert_eq!(err, DomainError::validation("Category is required"));
    }

    #[test]
    fn rejects_negative_price() {
        let err = build(Some("Tank Top"), Some("TT-01"), Some(-1), Some(3)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("negative")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    fn stored() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(7),
            name: "Tank Top".into(),
            sku: "TT-01".into(),
            description: Some("Cotton".into()),
            unit_price: 1500,
            category_id: CategoryId::new(3),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn changes_validate_present_fields_only() {
        assert!(ProductChanges::default().validate().is_ok());

        let empty_sku = ProductChanges {
            sku: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(empty_sku.validate().unwrap_err(), DomainError::validation(SKU_REQUIRED));

        let negative = ProductChanges {
            unit_price: Some(-5),
            ..Default::default()
        };
        assert_eq!(negative.validate().unwrap_err(), DomainError::validation(NEGATIVE_PRICE));
    }

    #[test]
    fn resku_and_moves_ignore_unchanged_values() {
        let product = stored();
        let same = ProductChanges {
            sku: Some("TT-01".into()),
            category_id: Some(CategoryId::new(3)),
            ..Default::default()
        };
        assert_eq!(same.resku(&product), None);
        assert_eq!(same.moves(&product), None);

        let other = ProductChanges {
            sku: Some("TT-02".into()),
            category_id: Some(CategoryId::new(4)),
            ..Default::default()
        };
        assert_eq!(other.resku(&product), Some("TT-02"));
        assert_eq!(other.moves(&product), Some(CategoryId::new(4)));
    }

    #[test]
    fn apply_keeps_absent_fields() {
        let mut product = stored();
        let later = product.updated_at + chrono::Duration::seconds(1);

        ProductChanges {
            unit_price: Some(1200),
            description: Some(None),
            ..Default::default()
        }
        .apply(&mut product, later);

        assert_eq!(product.name, "Tank Top");
        assert_eq!(product.sku, "TT-01");
        assert_eq!(product.unit_price, 1200);
        assert_eq!(product.description, None);
        assert_eq!(product.updated_at, later);
    }
}
