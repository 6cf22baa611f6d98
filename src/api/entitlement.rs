//! Entitlement API handlers: tenant caps and the audit trail

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::{AuditQuery, EntitlementUpdateItem, OperatorContext};
use crate::error::Result;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

/// List every feature object with the tenant's cap, entitled or not.
pub async fn list_entitlements(
    State(state): State<AppState>,
    ctx: OperatorContext,
) -> Result<impl IntoResponse> {
    let items = state
        .entitlement_service
        .list_entitlements(ctx.tenant_id)
        .await?;
    Ok(Json(SuccessResponse::new(items)))
}

/// Get one feature object's entitlement for the tenant.
pub async fn get_entitlement(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(object_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let item = state
        .entitlement_service
        .get_entitlement(ctx.tenant_id, object_id)
        .await?;
    Ok(Json(SuccessResponse::new(item)))
}

/// Apply a batch of entitlement updates.
pub async fn update_entitlements(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Json(items): Json<Vec<EntitlementUpdateItem>>,
) -> Result<impl IntoResponse> {
    state
        .entitlement_service
        .update_entitlements(&ctx, &items)
        .await?;
    Ok(Json(MessageResponse::new("Entitlements updated")))
}

#[derive(Debug, Serialize)]
pub struct AuditPage<T> {
    pub records: Vec<T>,
    pub total: i64,
}

/// Query the tenant's entitlement audit trail, newest first.
pub async fn list_audit(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse> {
    let (records, total) = state
        .entitlement_service
        .list_audit(ctx.tenant_id, &query)
        .await?;
    Ok(Json(SuccessResponse::new(AuditPage { records, total })))
}
