use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockroom_auth::{Role, User, UserDirectory};
use stockroom_catalog::{Category, NewCategory, NewProduct, NewSupplier, Product, Supplier};
use stockroom_core::{CategoryId, ProductId, SupplierId, UserId};

use super::{CatalogStore, CatalogTx, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct CatalogState {
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    suppliers: BTreeMap<SupplierId, Supplier>,
    last_user_id: i64,
    last_category_id: i64,
    last_product_id: i64,
    last_supplier_id: i64,
}

impl CatalogState {
    fn name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| c.name == name && Some(c.id) != except)
    }

    fn sku_taken(&self, sku: &str, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.sku == sku && Some(p.id) != except)
    }

    fn supplier_name_taken(&self, name: &str, except: Option<SupplierId>) -> bool {
        self.suppliers
            .values()
            .any(|s| s.name == name && Some(s.id) != except)
    }

    fn check_category(&self, id: CategoryId) -> StoreResult<()> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!(
                "products.category_id references missing category {id}"
            )))
        }
    }

    fn check_parent(&self, parent_id: Option<CategoryId>) -> StoreResult<()> {
        match parent_id {
            Some(id) if !self.categories.contains_key(&id) => Err(StoreError::ForeignKeyViolation(
                format!("categories.parent_id references missing category {id}"),
            )),
            _ => Ok(()),
        }
    }
}

/// In-memory catalog store for tests/dev.
///
/// Enforces the same constraints as the Postgres schema (unique category and
/// supplier names, unique sku, parent and category references). Transactions are serialised:
/// one open transaction holds the state lock until it commits or rolls back.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<Mutex<CatalogState>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a user (stands in for the external registration flow).
    pub async fn add_user(&self, username: &str, email: &str, role: Role) -> User {
        let mut state = self.state.lock().await;
        state.last_user_id += 1;
        let user = User {
            id: UserId::new(state.last_user_id),
            username: username.to_string(),
            email: email.to_string(),
            role,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserDirectory for InMemoryCatalogStore {
    async fn find_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.state.lock().await.users.len() as i64)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.state.lock().await.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.state.lock().await.categories.get(&id).cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let state = self.state.lock().await;
        Ok(state.categories.values().find(|c| c.name == name).cloned())
    }

    async fn count_products_in_category(&self, id: CategoryId) -> StoreResult<i64> {
        let state = self.state.lock().await;
        Ok(state.products.values().filter(|p| p.category_id == id).count() as i64)
    }

    async fn list_products(&self, category_id: Option<CategoryId>) -> StoreResult<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .values()
            .filter(|p| category_id.is_none_or(|c| p.category_id == c))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn find_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.values().find(|p| p.sku == sku).cloned())
    }

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        Ok(self.state.lock().await.suppliers.values().cloned().collect())
    }

    async fn get_supplier(&self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        Ok(self.state.lock().await.suppliers.get(&id).cloned())
    }

    async fn find_supplier_by_name(&self, name: &str) -> StoreResult<Option<Supplier>> {
        let state = self.state.lock().await;
        Ok(state.suppliers.values().find(|s| s.name == name).cloned())
    }

    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(InMemoryTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

/// Exclusive hold on the state plus the snapshot to restore on rollback.
struct InMemoryTx {
    guard: OwnedMutexGuard<CatalogState>,
    /// `None` once committed.
    snapshot: Option<CatalogState>,
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl CatalogTx for InMemoryTx {
    async fn insert_category(&mut self, new: NewCategory) -> StoreResult<Category> {
        let state = &mut *self.guard;
        if state.name_taken(&new.name, None) {
            return Err(StoreError::UniqueViolation(format!("categories.name '{}'", new.name)));
        }
        state.check_parent(new.parent_id)?;

        state.last_category_id += 1;
        let now = Utc::now();
        let category = Category {
            id: CategoryId::new(state.last_category_id),
            name: new.name,
            description: new.description,
            parent_id: new.parent_id,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&mut self, category: &Category) -> StoreResult<Category> {
        let state = &mut *self.guard;
        if !state.categories.contains_key(&category.id) {
            return Err(StoreError::NotFound(format!("category {}", category.id)));
        }
        if state.name_taken(&category.name, Some(category.id)) {
            return Err(StoreError::UniqueViolation(format!("categories.name '{}'", category.name)));
        }
        state.check_parent(category.parent_id)?;

        state.categories.insert(category.id, category.clone());
        Ok(category.clone())
    }

    async fn delete_category(&mut self, id: CategoryId) -> StoreResult<()> {
        let state = &mut *self.guard;
        if !state.categories.contains_key(&id) {
            return Err(StoreError::NotFound(format!("category {id}")));
        }
        if state.products.values().any(|p| p.category_id == id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "products.category_id still references category {id}"
            )));
        }

        state.categories.remove(&id);
        for child in state.categories.values_mut() {
            if child.parent_id == Some(id) {
                child.parent_id = None;
            }
        }
        Ok(())
    }

    async fn insert_product(&mut self, new: NewProduct) -> StoreResult<Product> {
        let state = &mut *self.guard;
        if state.sku_taken(&new.sku, None) {
            return Err(StoreError::UniqueViolation(format!("products.sku '{}'", new.sku)));
        }
        state.check_category(new.category_id)?;

        state.last_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.last_product_id),
            name: new.name,
            sku: new.sku,
            description: new.description,
            unit_price: new.unit_price,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&mut self, product: &Product) -> StoreResult<Product> {
        let state = &mut *self.guard;
        if !state.products.contains_key(&product.id) {
            return Err(StoreError::NotFound(format!("product {}", product.id)));
        }
        if state.sku_taken(&product.sku, Some(product.id)) {
            return Err(StoreError::UniqueViolation(format!("products.sku '{}'", product.sku)));
        }
        state.check_category(product.category_id)?;

        state.products.insert(product.id, product.clone());
        Ok(product.clone())
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        match self.guard.products.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("product {id}"))),
        }
    }

    async fn insert_supplier(&mut self, new: NewSupplier) -> StoreResult<Supplier> {
        let state = &mut *self.guard;
        if state.supplier_name_taken(&new.name, None) {
            return Err(StoreError::UniqueViolation(format!("suppliers.name '{}'", new.name)));
        }

        state.last_supplier_id += 1;
        let now = Utc::now();
        let supplier = Supplier {
            id: SupplierId::new(state.last_supplier_id),
            name: new.name,
            contact_person: new.contact_person,
            email: new.email,
            phone: new.phone,
            address: new.address,
            created_at: now,
            updated_at: now,
        };
        state.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<Supplier> {
        let state = &mut *self.guard;
        if !state.suppliers.contains_key(&supplier.id) {
            return Err(StoreError::NotFound(format!("supplier {}", supplier.id)));
        }
        if state.supplier_name_taken(&supplier.name, Some(supplier.id)) {
            return Err(StoreError::UniqueViolation(format!("suppliers.name '{}'", supplier.name)));
        }

        state.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier.clone())
    }

    async fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<()> {
        match self.guard.suppliers.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("supplier {id}"))),
        }
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        // Drop restores the snapshot.
        Ok(())
    }
}
