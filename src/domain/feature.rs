//! Feature object and tenant entitlement domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Entitlement status: the feature is switched on for the tenant.
pub const STATUS_ENABLED: i32 = 1;
/// Entitlement status: the feature is invisible to every tenant member.
pub const STATUS_DISABLED: i32 = 0;

/// A node in the navigable feature hierarchy (menu or page).
///
/// Read-only input to the core; owned by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeatureObject {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
}

/// Stored tenant entitlement row: one per (tenant, feature-object).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantFeatureCap {
    pub id: i64,
    pub tenant_id: i64,
    pub object_id: i64,
    pub permission_id: i64,
    pub status: i32,
    pub grant_source: String,
    pub granted_by: Option<i64>,
    pub granted_at: DateTime<Utc>,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Read view of a tenant's ceiling for one feature object, with the
/// permission code and level joined in. This is what both the write-time
/// validator and the read-path clamp consume.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PermissionCeiling {
    pub object_id: i64,
    pub status: i32,
    pub permission_code: String,
    pub permission_level: i32,
}

impl PermissionCeiling {
    pub fn is_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }
}

/// Feature object joined with the tenant's entitlement, for admin listings.
/// `status`/`permission_code` are absent when the tenant has no cap row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EntitlementView {
    pub object_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<i32>,
    pub permission_code: Option<String>,
}

/// One proposed entitlement change for a feature object.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EntitlementUpdateItem {
    pub object_id: i64,
    #[validate(range(min = 0, max = 1))]
    pub status: i32,
    #[validate(length(min = 1, max = 50))]
    pub permission_code: String,
}

/// Kind of entitlement change recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Grant,
    Revoke,
    Enable,
    Disable,
    UpdatePermission,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Grant => "GRANT",
            AuditAction::Revoke => "REVOKE",
            AuditAction::Enable => "ENABLE",
            AuditAction::Disable => "DISABLE",
            AuditAction::UpdatePermission => "UPDATE_PERMISSION",
        }
    }
}

/// Immutable, append-only record of one entitlement change.
/// Never mutated or deleted after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EntitlementAuditRecord {
    pub id: i64,
    pub tenant_id: i64,
    pub object_id: i64,
    pub action: AuditAction,
    pub before_status: Option<i32>,
    pub after_status: i32,
    pub before_permission_id: Option<i64>,
    pub after_permission_id: i64,
    pub operator_user_id: i64,
    pub operator_tenant_id: i64,
    pub trace_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit trail query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub object_id: Option<i64>,
    pub action: Option<AuditAction>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}
