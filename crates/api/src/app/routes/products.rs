use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::NewProduct;
use stockroom_core::ProductId;
use stockroom_infra::{StoreError, finish};

use crate::app::dto;
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common::body_or_400;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::AuthContext;

const NOT_FOUND: &str = "Product not found";
const CATEGORY_NOT_FOUND: &str = "Category not found";
const DUPLICATE_SKU: &str = "Product with this SKU already exists";

pub fn public_routes() -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/", get(list_products))
        .route("/api/products/:id", get(get_product))
}

pub fn protected_routes() -> Router {
    Router::new()
        .route("/api/products", post(create_product))
        .route("/api/products/", post(create_product))
        .route("/api/products/:id", delete(delete_product).put(update_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ProductListQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;

    let products = services
        .store
        .list_products(query.category_id)
        .await
        .map_err(|e| services.internal(e))?;

    let items = products.iter().map(dto::product_to_json).collect::<Vec<_>>();
    Ok((StatusCode::OK, Json(serde_json::json!({ "products": items }))).into_response())
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let product = services
        .store
        .get_product(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "product": dto::product_to_json(&product) }))).into_response())
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let user = authz::staff_or_admin(&services, &auth).await?;
    let body = body_or_400(body)?;

    let new = NewProduct::new(body.name, body.sku, body.description, body.unit_price, body.category_id)?;

    let category = services
        .store
        .get_category(new.category_id)
        .await
        .map_err(|e| services.internal(e))?;
    if category.is_none() {
        return Err(ApiError::validation(CATEGORY_NOT_FOUND));
    }

    let existing = services
        .store
        .find_product_by_sku(&new.sku)
        .await
        .map_err(|e| services.internal(e))?;
    if existing.is_some() {
        return Err(ApiError::validation(DUPLICATE_SKU));
    }

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.insert_product(new).await;
    let product = finish(tx, result).await.map_err(|e| match e {
        StoreError::UniqueViolation(_) => ApiError::validation(DUPLICATE_SKU),
        StoreError::ForeignKeyViolation(_) => ApiError::validation(CATEGORY_NOT_FOUND),
        other => services.internal(other),
    })?;

    tracing::info!(
        product_id = %product.id,
        category_id = %product.category_id,
        user_id = %user.id,
        "product created"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Product created successfully",
            "product": dto::product_to_json(&product),
        })),
    )
        .into_response())
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let user = authz::staff_or_admin(&services, &auth).await?;
    let id = parse_id(&id)?;

    let mut product = services
        .store
        .get_product(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let changes = body_or_400(body)?.into_changes()?;

    if let Some(sku) = changes.resku(&product) {
        let clash = services
            .store
            .find_product_by_sku(sku)
            .await
            .map_err(|e| services.internal(e))?;
        if clash.is_some_and(|other| other.id != product.id) {
            return Err(ApiError::validation(DUPLICATE_SKU));
        }
    }

    if let Some(category_id) = changes.moves(&product) {
        let category = services
            .store
            .get_category(category_id)
            .await
            .map_err(|e| services.internal(e))?;
        if category.is_none() {
            return Err(ApiError::validation(CATEGORY_NOT_FOUND));
        }
    }

    changes.apply(&mut product, Utc::now());

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.update_product(&product).await;
    let product = finish(tx, result).await.map_err(|e| match e {
        StoreError::UniqueViolation(_) => ApiError::validation(DUPLICATE_SKU),
        StoreError::ForeignKeyViolation(_) => ApiError::validation(CATEGORY_NOT_FOUND),
        StoreError::NotFound(_) => ApiError::not_found(NOT_FOUND),
        other => services.internal(other),
    })?;

    tracing::info!(product_id = %product.id, user_id = %user.id, "product updated");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Product updated successfully",
            "product": dto::product_to_json(&product),
        })),
    )
        .into_response())
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let user = authz::admin(&services, &auth).await?;
    let id = parse_id(&id)?;

    let product = services
        .store
        .get_product(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.delete_product(product.id).await;
    finish(tx, result).await.map_err(|e| match e {
        StoreError::NotFound(_) => ApiError::not_found(NOT_FOUND),
        other => services.internal(other),
    })?;

    tracing::info!(product_id = %product.id, user_id = %user.id, "product deleted");

    Ok((StatusCode::OK, Json(serde_json::json!({ "message": "Product deleted successfully" }))).into_response())
}

fn parse_id(raw: &str) -> ApiResult<ProductId> {
    raw.parse().map_err(|_| ApiError::not_found(NOT_FOUND))
}
