//! Product catalog domain: categories, the products filed under them, and
//! the suppliers stock is bought from.
//!
//! Pure data and validation; persistence lives in `stockroom-infra`.

pub mod category;
pub mod product;
pub mod supplier;

pub use category::{Category, CategoryChanges, NewCategory};
pub use product::{NewProduct, Product, ProductChanges};
pub use supplier::{NewSupplier, Supplier, SupplierChanges};
