//! Role grant and user override domain models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// One role's grant on one feature object, with provenance metadata.
/// A role holds at most one grant per feature object.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleGrantRow {
    pub role_id: i64,
    pub role_name: String,
    pub object_id: i64,
    pub permission_code: String,
}

/// A user's direct override on one feature object, independent of roles.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserOverrideRow {
    pub object_id: i64,
    pub permission_code: String,
}

/// One proposed (feature-object, permission-code) assignment.
///
/// Used identically for role grants and user overrides; duplicates inside
/// one request collapse to the last occurrence per object.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignmentInput {
    pub object_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub permission_code: String,
}

/// An assignment that passed write-time validation and is ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAssignment {
    pub object_id: i64,
    pub permission_id: i64,
}

/// Which role contributed which code to a resolved permission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSource {
    pub role_id: i64,
    pub role_name: String,
    pub permission_code: String,
}

/// The fully resolved permission for one (user, feature-object) pair.
///
/// `role_sources` and `override_code` are provenance for callers (UI
/// explanation); only `effective_code` feeds further authorization checks.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPermission {
    pub object_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub category: Option<String>,
    pub effective_code: String,
    pub role_sources: Vec<RoleSource>,
    pub override_code: Option<String>,
    pub tenant_status: Option<i32>,
    pub tenant_permission_code: Option<String>,
}

/// Feature object joined with a role's grant and the tenant ceiling,
/// for the role-centric admin read view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ObjectPermission {
    pub object_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub category: Option<String>,
    pub permission_code: Option<String>,
    pub tenant_permission_code: Option<String>,
}

/// Scope selector for the role grant read view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrantScope {
    /// Every feature object visible to the tenant, granted or not.
    #[default]
    All,
    /// Only objects the role actually holds a grant on.
    Assigned,
}
