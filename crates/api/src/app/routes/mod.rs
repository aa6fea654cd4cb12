//! HTTP routes.
//!
//! Each resource contributes a public router (reads) and a protected router
//! (mutations). Both register the same paths; axum merges their method
//! routers so only the mutating methods sit behind the auth layer. The layer
//! also answers any other method on those paths (`PATCH` gets a 401 without a
//! token, not a 405); wholly unknown paths reach the fallback.

use axum::Router;

pub mod categories;
pub mod common;
pub mod products;
pub mod suppliers;
pub mod system;

pub fn public_router() -> Router {
    Router::new()
        .merge(categories::public_routes())
        .merge(products::public_routes())
        .merge(suppliers::public_routes())
}

pub fn protected_router() -> Router {
    Router::new()
        .merge(categories::protected_routes())
        .merge(products::protected_routes())
        .merge(suppliers::protected_routes())
}
