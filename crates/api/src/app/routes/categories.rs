use std::sync::Arc;

use axum::{
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::NewCategory;
use stockroom_core::CategoryId;
use stockroom_infra::{StoreError, finish};

use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common::body_or_400;
use crate::app::services::AppServices;
use crate::app::dto;
use crate::authz;
use crate::context::AuthContext;

const NOT_FOUND: &str = "Category not found";

pub fn public_routes() -> Router {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/categories/", get(list_categories))
        .route("/api/categories/:id", get(get_category))
}

pub fn protected_routes() -> Router {
    Router::new()
        .route("/api/categories", post(create_category))
        .route("/api/categories/", post(create_category))
        .route("/api/categories/:id", put(update_category).delete(delete_category))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    let categories = services
        .store
        .list_categories()
        .await
        .map_err(|e| services.internal(e))?;

    let items = categories.iter().map(dto::category_to_json).collect::<Vec<_>>();
    Ok((StatusCode::OK, Json(serde_json::json!({ "categories": items }))).into_response())
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let category = services
        .store
        .get_category(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "category": dto::category_to_json(&category) }))).into_response())
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<dto::CreateCategoryRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let user = authz::staff_or_admin(&services, &auth).await?;
    let body = body_or_400(body)?;

    let new = NewCategory::new(body.name, body.description, body.parent_id)?;

    let existing = services
        .store
        .find_category_by_name(&new.name)
        .await
        .map_err(|e| services.internal(e))?;
    if existing.is_some() {
        return Err(ApiError::validation("Category already exists"));
    }

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.insert_category(new).await;
    let category = finish(tx, result).await.map_err(|e| match e {
        StoreError::UniqueViolation(_) => ApiError::validation("Category already exists"),
        StoreError::ForeignKeyViolation(_) => ApiError::validation("Parent category not found"),
        other => services.internal(other),
    })?;

    tracing::info!(category_id = %category.id, user_id = %user.id, "category created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Category created successfully",
            "category": dto::category_to_json(&category),
        })),
    )
        .into_response())
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateCategoryRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let user = authz::staff_or_admin(&services, &auth).await?;
    let id = parse_id(&id)?;

    let mut category = services
        .store
        .get_category(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let changes = body_or_400(body)?.into_changes()?;

    if let Some(name) = changes.renames(&category) {
        let clash = services
            .store
            .find_category_by_name(name)
            .await
            .map_err(|e| services.internal(e))?;
        if clash.is_some_and(|other| other.id != category.id) {
            return Err(ApiError::validation("Category name already exists"));
        }
    }

    changes.apply(&mut category, Utc::now());

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.update_category(&category).await;
    let category = finish(tx, result).await.map_err(|e| match e {
        StoreError::UniqueViolation(_) => ApiError::validation("Category name already exists"),
        StoreError::ForeignKeyViolation(_) => ApiError::validation("Parent category not found"),
        StoreError::NotFound(_) => ApiError::not_found(NOT_FOUND),
        other => services.internal(other),
    })?;

    tracing::info!(category_id = %category.id, user_id = %user.id, "category updated");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Category updated successfully",
            "category": dto::category_to_json(&category),
        })),
    )
        .into_response())
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let user = authz::admin(&services, &auth).await?;
    let id = parse_id(&id)?;

    let category = services
        .store
        .get_category(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let products = services
        .store
        .count_products_in_category(category.id)
        .await
        .map_err(|e| services.internal(e))?;
    if products > 0 {
        return Err(ApiError::validation("Cannot delete category with products"));
    }

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.delete_category(category.id).await;
    finish(tx, result).await.map_err(|e| match e {
        StoreError::ForeignKeyViolation(_) => ApiError::validation("Cannot delete category with products"),
        StoreError::NotFound(_) => ApiError::not_found(NOT_FOUND),
        other => services.internal(other),
    })?;

    tracing::info!(category_id = %category.id, user_id = %user.id, "category deleted");

    Ok((StatusCode::OK, Json(serde_json::json!({ "message": "Category deleted successfully" }))).into_response())
}

fn parse_id(raw: &str) -> ApiResult<CategoryId> {
    raw.parse().map_err(|_| ApiError::not_found(NOT_FOUND))
}
