//! Assignment validation and full-replace writes
//!
//! Role grants and user overrides share one validation path: normalize each
//! proposed code against the lattice, then check it against the tenant's
//! entitlement ceiling. The whole batch must pass before any row is written;
//! a single bad assignment rejects the request and leaves the stored set
//! untouched.

use crate::domain::{
    AssignmentInput, GrantScope, ObjectPermission, OperatorContext, PermissionLattice,
    UserOverrideRow, ValidatedAssignment,
};
use crate::error::{AppError, Result};
use crate::repository::{EntitlementRepository, GrantRepository, MembershipRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub struct AssignmentService<M, G, E>
where
    M: MembershipRepository,
    G: GrantRepository,
    E: EntitlementRepository,
{
    lattice: Arc<PermissionLattice>,
    membership_repo: Arc<M>,
    grant_repo: Arc<G>,
    entitlement_repo: Arc<E>,
}

impl<M, G, E> AssignmentService<M, G, E>
where
    M: MembershipRepository,
    G: GrantRepository,
    E: EntitlementRepository,
{
    pub fn new(
        lattice: Arc<PermissionLattice>,
        membership_repo: Arc<M>,
        grant_repo: Arc<G>,
        entitlement_repo: Arc<E>,
    ) -> Self {
        Self {
            lattice,
            membership_repo,
            grant_repo,
            entitlement_repo,
        }
    }

    /// Deduplicate by feature object, keeping first-seen order with the last
    /// proposed code winning for a repeated object.
    fn dedupe(assignments: &[AssignmentInput]) -> Vec<(i64, &str)> {
        let mut order: Vec<i64> = Vec::new();
        let mut latest: HashMap<i64, &str> = HashMap::new();
        for assignment in assignments {
            if !latest.contains_key(&assignment.object_id) {
                order.push(assignment.object_id);
            }
            latest.insert(assignment.object_id, assignment.permission_code.as_str());
        }
        order
            .into_iter()
            .map(|object_id| (object_id, latest[&object_id]))
            .collect()
    }

    /// Validate a proposed assignment set against the tenant's ceilings.
    ///
    /// Fails on the first unknown code, non-entitled feature, or assignment
    /// exceeding the ceiling. Nothing is written here.
    async fn validate_assignments(
        &self,
        tenant_id: i64,
        assignments: &[AssignmentInput],
    ) -> Result<Vec<ValidatedAssignment>> {
        for assignment in assignments {
            assignment.validate()?;
        }

        let ceilings: HashMap<i64, _> = self
            .entitlement_repo
            .find_ceilings(tenant_id)
            .await?
            .into_iter()
            .map(|c| (c.object_id, c))
            .collect();

        let mut validated = Vec::new();
        for (object_id, code) in Self::dedupe(assignments) {
            let permission = self.lattice.normalize(code).ok_or_else(|| {
                AppError::InvalidArgument(format!("Unknown permission code: {code}"))
            })?;

            let ceiling = ceilings.get(&object_id).ok_or_else(|| {
                AppError::Forbidden(format!(
                    "Feature object {object_id} is not entitled for tenant {tenant_id}"
                ))
            })?;
            if !ceiling.is_enabled() {
                return Err(AppError::Forbidden(format!(
                    "Feature object {object_id} is disabled for tenant {tenant_id}"
                )));
            }
            if permission.level > ceiling.permission_level {
                return Err(AppError::Forbidden(format!(
                    "Permission {} exceeds tenant ceiling {} for feature object {object_id}",
                    permission.code, ceiling.permission_code
                )));
            }

            validated.push(ValidatedAssignment {
                object_id,
                permission_id: permission.id,
            });
        }

        Ok(validated)
    }

    /// Replace a role's grant set after validating every assignment.
    pub async fn replace_role_grants(
        &self,
        ctx: &OperatorContext,
        role_id: i64,
        assignments: &[AssignmentInput],
    ) -> Result<()> {
        let tenant_id = ctx.tenant_id;
        if !self.membership_repo.role_exists(tenant_id, role_id).await? {
            return Err(AppError::NotFound(format!(
                "Role {role_id} not found in tenant {tenant_id}"
            )));
        }

        let validated = self.validate_assignments(tenant_id, assignments).await?;
        self.grant_repo
            .replace_role_grants(tenant_id, role_id, &validated)
            .await?;

        info!(
            tenant_id,
            role_id,
            count = validated.len(),
            operator = ctx.user_id,
            "replaced role grants"
        );
        Ok(())
    }

    /// Replace a user's override set after validating every assignment.
    pub async fn replace_user_overrides(
        &self,
        ctx: &OperatorContext,
        user_id: i64,
        assignments: &[AssignmentInput],
    ) -> Result<()> {
        let tenant_id = ctx.tenant_id;
        if !self.membership_repo.user_in_tenant(tenant_id, user_id).await? {
            return Err(AppError::NotFound(format!(
                "User {user_id} not found in tenant {tenant_id}"
            )));
        }

        let validated = self.validate_assignments(tenant_id, assignments).await?;
        self.grant_repo
            .replace_user_overrides(tenant_id, user_id, &validated)
            .await?;

        info!(
            tenant_id,
            user_id,
            count = validated.len(),
            operator = ctx.user_id,
            "replaced user overrides"
        );
        Ok(())
    }

    /// List a role's grants over the feature catalog.
    ///
    /// Stored grants are clamped to the tenant ceiling on the way out, so a
    /// grant written before the tenant was downgraded reads at the reduced
    /// level rather than its stored one.
    pub async fn get_role_grants(
        &self,
        tenant_id: i64,
        role_id: i64,
        scope: GrantScope,
    ) -> Result<Vec<ObjectPermission>> {
        if !self.membership_repo.role_exists(tenant_id, role_id).await? {
            return Err(AppError::NotFound(format!(
                "Role {role_id} not found in tenant {tenant_id}"
            )));
        }

        let assigned_only = matches!(scope, GrantScope::Assigned);
        let mut items = self
            .grant_repo
            .find_role_object_permissions(tenant_id, role_id, assigned_only)
            .await?;

        for item in &mut items {
            if item.permission_code.is_some() {
                item.permission_code = self
                    .lattice
                    .min_code(
                        item.permission_code.as_deref(),
                        item.tenant_permission_code.as_deref(),
                    )
                    .map(|p| p.code.clone());
            }
        }

        Ok(items)
    }

    /// List a user's stored overrides (raw, not clamped).
    pub async fn get_user_overrides(
        &self,
        tenant_id: i64,
        user_id: i64,
    ) -> Result<Vec<UserOverrideRow>> {
        if !self.membership_repo.user_in_tenant(tenant_id, user_id).await? {
            return Err(AppError::NotFound(format!(
                "User {user_id} not found in tenant {tenant_id}"
            )));
        }

        self.grant_repo.find_user_overrides(tenant_id, user_id).await
    }
}
