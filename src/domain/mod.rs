//! Domain models for Featuregate Core

pub mod context;
pub mod feature;
pub mod grants;
pub mod permission;

pub use context::OperatorContext;
pub use feature::{
    AuditAction, AuditQuery, EntitlementAuditRecord, EntitlementUpdateItem, EntitlementView,
    FeatureObject, PermissionCeiling, TenantFeatureCap, STATUS_DISABLED, STATUS_ENABLED,
};
pub use grants::{
    AssignmentInput, GrantScope, ObjectPermission, ResolvedPermission, RoleGrantRow, RoleSource,
    UserOverrideRow, ValidatedAssignment,
};
pub use permission::{PermissionCode, PermissionLattice};
