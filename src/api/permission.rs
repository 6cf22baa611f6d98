//! Permission API handlers: effective resolution, role grants, user overrides

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::{AssignmentInput, GrantScope, OperatorContext};
use crate::error::Result;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

/// Resolve the effective permission for every feature object, for one user.
pub async fn resolve_user_permissions(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let resolved = state
        .resolver_service
        .resolve_effective_permissions(&ctx, user_id)
        .await?;
    Ok(Json(SuccessResponse::new(resolved)))
}

#[derive(Debug, Deserialize)]
pub struct GrantScopeQuery {
    #[serde(default)]
    pub scope: GrantScope,
}

/// List a role's grants, clamped to the tenant's entitlement ceilings.
pub async fn list_role_grants(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(role_id): Path<i64>,
    Query(query): Query<GrantScopeQuery>,
) -> Result<impl IntoResponse> {
    let grants = state
        .assignment_service
        .get_role_grants(ctx.tenant_id, role_id, query.scope)
        .await?;
    Ok(Json(SuccessResponse::new(grants)))
}

/// Replace a role's grant set.
pub async fn replace_role_grants(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(role_id): Path<i64>,
    Json(assignments): Json<Vec<AssignmentInput>>,
) -> Result<impl IntoResponse> {
    state
        .assignment_service
        .replace_role_grants(&ctx, role_id, &assignments)
        .await?;
    Ok(Json(MessageResponse::new("Role grants replaced")))
}

/// List a user's stored overrides.
pub async fn list_user_overrides(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let overrides = state
        .assignment_service
        .get_user_overrides(ctx.tenant_id, user_id)
        .await?;
    Ok(Json(SuccessResponse::new(overrides)))
}

/// Replace a user's override set.
pub async fn replace_user_overrides(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(user_id): Path<i64>,
    Json(assignments): Json<Vec<AssignmentInput>>,
) -> Result<impl IntoResponse> {
    state
        .assignment_service
        .replace_user_overrides(&ctx, user_id, &assignments)
        .await?;
    Ok(Json(MessageResponse::new("User overrides replaced")))
}
