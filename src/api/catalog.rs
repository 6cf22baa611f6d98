//! Catalog API handlers: permission codes and feature objects

use crate::api::SuccessResponse;
use crate::error::Result;
use crate::server::AppState;
use axum::{extract::State, response::IntoResponse, Json};

/// List permission codes in ascending level order.
pub async fn list_permission_codes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let codes = state.catalog_service.list_permission_codes().await?;
    Ok(Json(SuccessResponse::new(codes)))
}

/// List the feature object catalog.
pub async fn list_feature_objects(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let objects = state.catalog_service.list_feature_objects().await?;
    Ok(Json(SuccessResponse::new(objects)))
}
