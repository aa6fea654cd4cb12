//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (other) | Any other | `Backend` |
//! | Other (pool closed, IO, decode) | N/A | `Backend` |
//!
//! Uniqueness and references are enforced by the schema in `schema.sql`, so a
//! duplicate that slips past a handler's pre-check still surfaces as
//! `UniqueViolation`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockroom_auth::{Role, User, UserDirectory};
use stockroom_catalog::{Category, NewCategory, NewProduct, NewSupplier, Product, Supplier};
use stockroom_core::{CategoryId, ProductId, SupplierId, UserId};

use super::{CatalogStore, CatalogTx, StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
    "id, name, sku, description, unit_price, category_id, created_at, updated_at";
const SUPPLIER_COLUMNS: &str =
    "id, name, contact_person, email, phone, address, created_at, updated_at";

/// Postgres catalog store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; each write
/// transaction holds one pooled connection until it ends.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes.
    pub async fn apply_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PostgresCatalogStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, role, created_at FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(UserRow::from_row(&row)?.try_into()?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), err)]
    async fn count_users(&self) -> StoreResult<i64> {
        sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&*self.pool)
            .await
            .and_then(|row| row.try_get::<i64, _>("n"))
            .map_err(|e| map_sqlx_error("count_users", e))
    }

    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(category_from_row).collect()
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = $1"))
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_category_by_name", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn count_products_in_category(&self, id: CategoryId) -> StoreResult<i64> {
        sqlx::query("SELECT COUNT(*) AS n FROM products WHERE category_id = $1")
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .and_then(|row| row.try_get::<i64, _>("n"))
            .map_err(|e| map_sqlx_error("count_products_in_category", e))
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self, category_id: Option<CategoryId>) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE ($1::BIGINT IS NULL OR category_id = $1)
             ORDER BY id"
        ))
        .bind(category_id.map(|c| c.get()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
            .bind(sku)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product_by_sku", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        let rows = sqlx::query(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_suppliers", e))?;
        rows.iter().map(supplier_from_row).collect()
    }

    #[instrument(skip(self), fields(supplier_id = %id), err)]
    async fn get_supplier(&self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        let row = sqlx::query(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_supplier", e))?;
        row.as_ref().map(supplier_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_supplier_by_name(&self, name: &str) -> StoreResult<Option<Supplier>> {
        let row = sqlx::query(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE name = $1"))
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_supplier_by_name", e))?;
        row.as_ref().map(supplier_from_row).transpose()
    }

    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

/// Open Postgres transaction. Dropping it without commit rolls back (SQLx).
struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogTx for PostgresTx {
    #[instrument(skip(self, new), fields(name = %new.name), err)]
    async fn insert_category(&mut self, new: NewCategory) -> StoreResult<Category> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO categories (name, description, parent_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.parent_id.map(|p| p.get()))
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        category_from_row(&row)
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn update_category(&mut self, category: &Category) -> StoreResult<Category> {
        let row = sqlx::query(&format!(
            "UPDATE categories
             SET name = $2, description = $3, parent_id = $4, updated_at = $5
             WHERE id = $1
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(category.id.get())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent_id.map(|p| p.get()))
        .bind(category.updated_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;

        match row {
            Some(row) => category_from_row(&row),
            None => Err(StoreError::NotFound(format!("category {}", category.id))),
        }
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&mut self, id: CategoryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("category {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self, new), fields(sku = %new.sku), err)]
    async fn insert_product(&mut self, new: NewProduct) -> StoreResult<Product> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO products (name, sku, description, unit_price, category_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.sku)
        .bind(&new.description)
        .bind(new.unit_price)
        .bind(new.category_id.get())
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        product_from_row(&row)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&mut self, product: &Product) -> StoreResult<Product> {
        let row = sqlx::query(&format!(
            "UPDATE products
             SET name = $2, sku = $3, description = $4, unit_price = $5, category_id = $6, updated_at = $7
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.id.get())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.description)
        .bind(product.unit_price)
        .bind(product.category_id.get())
        .bind(product.updated_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(StoreError::NotFound(format!("product {}", product.id))),
        }
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    async fn insert_supplier(&mut self, new: NewSupplier) -> StoreResult<Supplier> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO suppliers (name, contact_person, email, phone, address, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.contact_person)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_supplier", e))?;
        supplier_from_row(&row)
    }

    #[instrument(skip(self, supplier), fields(supplier_id = %supplier.id), err)]
    async fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<Supplier> {
        let row = sqlx::query(&format!(
            "UPDATE suppliers
             SET name = $2, contact_person = $3, email = $4, phone = $5, address = $6, updated_at = $7
             WHERE id = $1
             RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(supplier.id.get())
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.updated_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_supplier", e))?;

        match row {
            Some(row) => supplier_from_row(&row),
            None => Err(StoreError::NotFound(format!("supplier {}", supplier.id))),
        }
    }

    #[instrument(skip(self), fields(supplier_id = %id), err)]
    async fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_supplier", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("supplier {id}")));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

// -------------------------
// Row mapping
// -------------------------

#[derive(Debug)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::new(row.id),
            username: row.username,
            email: row.email,
            role: row.role.parse::<Role>()?,
            created_at: row.created_at,
        })
    }
}

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    let decode = |e| map_sqlx_error("decode_category", e);
    Ok(Category {
        id: CategoryId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        parent_id: row
            .try_get::<Option<i64>, _>("parent_id")
            .map_err(decode)?
            .map(CategoryId::new),
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let decode = |e| map_sqlx_error("decode_product", e);
    Ok(Product {
        id: ProductId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        sku: row.try_get("sku").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        unit_price: row.try_get("unit_price").map_err(decode)?,
        category_id: CategoryId::new(row.try_get("category_id").map_err(decode)?),
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn supplier_from_row(row: &PgRow) -> StoreResult<Supplier> {
    let decode = |e| map_sqlx_error("decode_supplier", e);
    Ok(Supplier {
        id: SupplierId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        contact_person: row.try_get("contact_person").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        address: row.try_get("address").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
