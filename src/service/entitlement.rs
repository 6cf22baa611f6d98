//! Tenant entitlement lifecycle
//!
//! Updates are diffed against the stored caps to decide the audit action:
//! GRANT/REVOKE when a cap row first appears, ENABLE/DISABLE when only the
//! status flips, UPDATE_PERMISSION when only the ceiling moves. Items whose
//! target state matches the stored row are dropped before the write, so a
//! repeated request leaves no audit trace.

use crate::domain::{
    AuditAction, AuditQuery, EntitlementAuditRecord, EntitlementUpdateItem, EntitlementView,
    OperatorContext, PermissionLattice, STATUS_ENABLED,
};
use crate::error::{AppError, Result};
use crate::repository::{
    AuditRepository, CapChange, CatalogRepository, ChangeOperator, EntitlementRepository,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub struct EntitlementService<C, E, A>
where
    C: CatalogRepository,
    E: EntitlementRepository,
    A: AuditRepository,
{
    lattice: Arc<PermissionLattice>,
    catalog_repo: Arc<C>,
    entitlement_repo: Arc<E>,
    audit_repo: Arc<A>,
}

impl<C, E, A> EntitlementService<C, E, A>
where
    C: CatalogRepository,
    E: EntitlementRepository,
    A: AuditRepository,
{
    pub fn new(
        lattice: Arc<PermissionLattice>,
        catalog_repo: Arc<C>,
        entitlement_repo: Arc<E>,
        audit_repo: Arc<A>,
    ) -> Self {
        Self {
            lattice,
            catalog_repo,
            entitlement_repo,
            audit_repo,
        }
    }

    pub async fn list_entitlements(&self, tenant_id: i64) -> Result<Vec<EntitlementView>> {
        self.entitlement_repo.list_entitlements(tenant_id).await
    }

    pub async fn get_entitlement(
        &self,
        tenant_id: i64,
        object_id: i64,
    ) -> Result<EntitlementView> {
        self.entitlement_repo
            .find_entitlement(tenant_id, object_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Feature object {object_id} not found")))
    }

    /// Apply a batch of entitlement updates for one tenant.
    ///
    /// The batch is validated in full before any write, then applied together
    /// with its audit records in a single transaction.
    pub async fn update_entitlements(
        &self,
        ctx: &OperatorContext,
        items: &[EntitlementUpdateItem],
    ) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let tenant_id = ctx.tenant_id;

        let existing: HashMap<i64, _> = self
            .entitlement_repo
            .find_caps(tenant_id)
            .await?
            .into_iter()
            .map(|cap| (cap.object_id, cap))
            .collect();

        // Collapse repeated objects to the last proposed state, preserving
        // first-seen order, so one batch never produces two changes for the
        // same (tenant, object) row.
        let mut order: Vec<i64> = Vec::new();
        let mut latest: HashMap<i64, &EntitlementUpdateItem> = HashMap::new();
        for item in items {
            if !latest.contains_key(&item.object_id) {
                order.push(item.object_id);
            }
            latest.insert(item.object_id, item);
        }

        let mut changes = Vec::new();
        for object_id in order {
            let item = latest[&object_id];
            item.validate()?;

            let permission = self.lattice.normalize(&item.permission_code).ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "Unknown permission code: {}",
                    item.permission_code
                ))
            })?;

            if self
                .catalog_repo
                .find_feature_object(item.object_id)
                .await?
                .is_none()
            {
                return Err(AppError::NotFound(format!(
                    "Feature object {} not found",
                    item.object_id
                )));
            }

            match existing.get(&item.object_id) {
                None => {
                    let action = if item.status == STATUS_ENABLED {
                        AuditAction::Grant
                    } else {
                        AuditAction::Revoke
                    };
                    changes.push(CapChange {
                        object_id: item.object_id,
                        existing_id: None,
                        status: item.status,
                        permission_id: permission.id,
                        action,
                        before_status: None,
                        before_permission_id: None,
                    });
                }
                Some(cap) => {
                    let status_changed = cap.status != item.status;
                    let permission_changed = cap.permission_id != permission.id;
                    if !status_changed && !permission_changed {
                        continue;
                    }

                    let action = if status_changed {
                        if item.status == STATUS_ENABLED {
                            AuditAction::Enable
                        } else {
                            AuditAction::Disable
                        }
                    } else {
                        AuditAction::UpdatePermission
                    };
                    changes.push(CapChange {
                        object_id: item.object_id,
                        existing_id: Some(cap.id),
                        status: item.status,
                        permission_id: permission.id,
                        action,
                        before_status: Some(cap.status),
                        before_permission_id: Some(cap.permission_id),
                    });
                }
            }
        }

        if changes.is_empty() {
            return Ok(());
        }

        let operator = ChangeOperator {
            user_id: ctx.user_id,
            tenant_id: ctx.operator_tenant_id(),
            trace_id: ctx.trace_id.clone(),
        };
        self.entitlement_repo
            .apply_changes(tenant_id, &operator, &changes)
            .await?;

        info!(
            tenant_id,
            count = changes.len(),
            operator = ctx.user_id,
            operator_tenant = operator.tenant_id,
            "applied entitlement changes"
        );
        Ok(())
    }

    pub async fn list_audit(
        &self,
        tenant_id: i64,
        query: &AuditQuery,
    ) -> Result<(Vec<EntitlementAuditRecord>, i64)> {
        let records = self.audit_repo.find(tenant_id, query).await?;
        let total = self.audit_repo.count(tenant_id, query).await?;
        Ok((records, total))
    }
}
