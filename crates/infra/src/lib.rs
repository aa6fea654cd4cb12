//! Infrastructure layer: persistence backends for the catalog.

pub mod store;

pub use store::{
    CatalogStore, CatalogTx, InMemoryCatalogStore, PostgresCatalogStore, StoreError, StoreResult, finish,
};
