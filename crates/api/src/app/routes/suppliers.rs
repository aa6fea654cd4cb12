use std::sync::Arc;

use axum::{
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::NewSupplier;
use stockroom_core::SupplierId;
use stockroom_infra::{StoreError, finish};

use crate::app::dto;
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common::body_or_400;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::AuthContext;

const NOT_FOUND: &str = "Supplier not found";

pub fn public_routes() -> Router {
    Router::new()
        .route("/api/suppliers", get(list_suppliers))
        .route("/api/suppliers/", get(list_suppliers))
        .route("/api/suppliers/:id", get(get_supplier))
}

pub fn protected_routes() -> Router {
    Router::new()
        .route("/api/suppliers", post(create_supplier))
        .route("/api/suppliers/", post(create_supplier))
        .route("/api/suppliers/:id", put(update_supplier).delete(delete_supplier))
}

pub async fn list_suppliers(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Response> {
    let suppliers = services
        .store
        .list_suppliers()
        .await
        .map_err(|e| services.internal(e))?;

    let items = suppliers.iter().map(dto::supplier_to_json).collect::<Vec<_>>();
    Ok((StatusCode::OK, Json(serde_json::json!({ "suppliers": items }))).into_response())
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let supplier = services
        .store
        .get_supplier(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "supplier": dto::supplier_to_json(&supplier) }))).into_response())
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<dto::CreateSupplierRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let user = authz::staff_or_admin(&services, &auth).await?;
    let body = body_or_400(body)?;

    let new = NewSupplier::new(body.name, body.contact_person, body.email, body.phone, body.address)?;

    let existing = services
        .store
        .find_supplier_by_name(&new.name)
        .await
        .map_err(|e| services.internal(e))?;
    if existing.is_some() {
        return Err(ApiError::validation("Supplier already exists"));
    }

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.insert_supplier(new).await;
    let supplier = finish(tx, result).await.map_err(|e| match e {
        StoreError::UniqueViolation(_) => ApiError::validation("Supplier already exists"),
        other => services.internal(other),
    })?;

    tracing::info!(supplier_id = %supplier.id, user_id = %user.id, "supplier created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Supplier created successfully",
            "supplier": dto::supplier_to_json(&supplier),
        })),
    )
        .into_response())
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateSupplierRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let user = authz::staff_or_admin(&services, &auth).await?;
    let id = parse_id(&id)?;

    let mut supplier = services
        .store
        .get_supplier(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let changes = body_or_400(body)?.into_changes()?;

    if let Some(name) = changes.renames(&supplier) {
        let clash = services
            .store
            .find_supplier_by_name(name)
            .await
            .map_err(|e| services.internal(e))?;
        if clash.is_some_and(|other| other.id != supplier.id) {
            return Err(ApiError::validation("Supplier name already exists"));
        }
    }

    changes.apply(&mut supplier, Utc::now());

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.update_supplier(&supplier).await;
    let supplier = finish(tx, result).await.map_err(|e| match e {
        StoreError::UniqueViolation(_) => ApiError::validation("Supplier name already exists"),
        StoreError::NotFound(_) => ApiError::not_found(NOT_FOUND),
        other => services.internal(other),
    })?;

    tracing::info!(supplier_id = %supplier.id, user_id = %user.id, "supplier updated");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Supplier updated successfully",
            "supplier": dto::supplier_to_json(&supplier),
        })),
    )
        .into_response())
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let user = authz::admin(&services, &auth).await?;
    let id = parse_id(&id)?;

    let supplier = services
        .store
        .get_supplier(id)
        .await
        .map_err(|e| services.internal(e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let mut tx = services.store.begin().await.map_err(|e| services.internal(e))?;
    let result = tx.delete_supplier(supplier.id).await;
    finish(tx, result).await.map_err(|e| match e {
        StoreError::NotFound(_) => ApiError::not_found(NOT_FOUND),
        other => services.internal(other),
    })?;

    tracing::info!(supplier_id = %supplier.id, user_id = %user.id, "supplier deleted");

    Ok((StatusCode::OK, Json(serde_json::json!({ "message": "Supplier deleted successfully" }))).into_response())
}

fn parse_id(raw: &str) -> ApiResult<SupplierId> {
    raw.parse().map_err(|_| ApiError::not_found(NOT_FOUND))
}
