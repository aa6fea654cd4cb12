//! Catalog persistence: read queries plus transactional writes.
//!
//! Reads go straight to the store. Every mutation runs inside a
//! [`CatalogTx`] obtained from [`CatalogStore::begin`] and ends in exactly one
//! of `commit` or `rollback`; a transaction dropped without either is rolled
//! back.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

use async_trait::async_trait;
use thiserror::Error;

use stockroom_auth::UserDirectory;
use stockroom_catalog::{Category, NewCategory, NewProduct, NewSupplier, Product, Supplier};
use stockroom_core::{CategoryId, ProductId, SupplierId};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write (duplicate name or sku).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A referenced row is missing, or a referencing row blocks a delete.
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// The row a write targeted no longer exists.
    #[error("row not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Catalog and user persistence.
///
/// Implements [`UserDirectory`] so role gates can resolve callers against the
/// same backend.
#[async_trait]
pub trait CatalogStore: UserDirectory + Send + Sync {
    async fn count_users(&self) -> StoreResult<i64>;

    /// All categories, ordered by id.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    /// Exact, case-sensitive name match.
    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>>;
    async fn count_products_in_category(&self, id: CategoryId) -> StoreResult<i64>;

    /// Products ordered by id, optionally restricted to one category.
    async fn list_products(&self, category_id: Option<CategoryId>) -> StoreResult<Vec<Product>>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn find_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>>;

    /// All suppliers, ordered by id.
    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>>;
    async fn get_supplier(&self, id: SupplierId) -> StoreResult<Option<Supplier>>;
    async fn find_supplier_by_name(&self, name: &str) -> StoreResult<Option<Supplier>>;

    /// Open a write transaction.
    ///
    /// Do not call other store methods from the same task while the
    /// transaction is open: the in-memory backend holds its lock until the
    /// transaction ends.
    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>>;
}

/// An open write transaction.
#[async_trait]
pub trait CatalogTx: Send {
    async fn insert_category(&mut self, new: NewCategory) -> StoreResult<Category>;
    /// Persist every field of `category` (matched by id).
    async fn update_category(&mut self, category: &Category) -> StoreResult<Category>;
    /// Delete a category; children are detached, owned products block it.
    async fn delete_category(&mut self, id: CategoryId) -> StoreResult<()>;

    async fn insert_product(&mut self, new: NewProduct) -> StoreResult<Product>;
    async fn update_product(&mut self, product: &Product) -> StoreResult<Product>;
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()>;

    async fn insert_supplier(&mut self, new: NewSupplier) -> StoreResult<Supplier>;
    async fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<Supplier>;
    async fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Close `tx` according to `result`: commit on success, roll back on error.
///
/// The operation's error wins over a rollback failure (which is only logged).
pub async fn finish<T>(tx: Box<dyn CatalogTx>, result: StoreResult<T>) -> StoreResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed after {err}");
            }
            Err(err)
        }
    }
}
