//! Tenant feature entitlement repository
//!
//! Cap rows are unique per (tenant, feature-object) and only ever written
//! together with their audit record: `apply_changes` runs the whole batch in
//! one transaction, so an entitlement change without its audit record cannot
//! be observed.

use crate::domain::{
    AuditAction, EntitlementView, PermissionCeiling, TenantFeatureCap,
};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

/// One validated cap change, paired with the audit entry it must carry.
#[derive(Debug, Clone)]
pub struct CapChange {
    pub object_id: i64,
    /// Row id when updating an existing cap; `None` creates one.
    pub existing_id: Option<i64>,
    pub status: i32,
    pub permission_id: i64,
    pub action: AuditAction,
    pub before_status: Option<i32>,
    pub before_permission_id: Option<i64>,
}

/// Operator identity attached to every cap change in a batch.
#[derive(Debug, Clone)]
pub struct ChangeOperator {
    pub user_id: i64,
    pub tenant_id: i64,
    pub trace_id: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    async fn find_ceilings(&self, tenant_id: i64) -> Result<Vec<PermissionCeiling>>;
    async fn find_caps(&self, tenant_id: i64) -> Result<Vec<TenantFeatureCap>>;
    async fn list_entitlements(&self, tenant_id: i64) -> Result<Vec<EntitlementView>>;
    async fn find_entitlement(
        &self,
        tenant_id: i64,
        object_id: i64,
    ) -> Result<Option<EntitlementView>>;
    async fn apply_changes(
        &self,
        tenant_id: i64,
        operator: &ChangeOperator,
        changes: &[CapChange],
    ) -> Result<()>;
}

pub struct EntitlementRepositoryImpl {
    pool: MySqlPool,
}

impl EntitlementRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementRepository for EntitlementRepositoryImpl {
    async fn find_ceilings(&self, tenant_id: i64) -> Result<Vec<PermissionCeiling>> {
        let ceilings = sqlx::query_as::<_, PermissionCeiling>(
            "SELECT tfp.object_id, tfp.status, p.code AS permission_code, \
                    p.level AS permission_level \
             FROM tenant_feature_permissions tfp \
             INNER JOIN permissions p ON tfp.permission_id = p.id \
             WHERE tfp.tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ceilings)
    }

    async fn find_caps(&self, tenant_id: i64) -> Result<Vec<TenantFeatureCap>> {
        let caps = sqlx::query_as::<_, TenantFeatureCap>(
            "SELECT id, tenant_id, object_id, permission_id, status, grant_source, \
                    granted_by, granted_at, updated_by, updated_at \
             FROM tenant_feature_permissions WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(caps)
    }

    async fn list_entitlements(&self, tenant_id: i64) -> Result<Vec<EntitlementView>> {
        let items = sqlx::query_as::<_, EntitlementView>(
            "SELECT fo.id AS object_id, fo.parent_id, fo.name, fo.category, fo.location, \
                    tfp.status, p.code AS permission_code \
             FROM feature_objects fo \
             LEFT JOIN tenant_feature_permissions tfp \
                    ON tfp.object_id = fo.id AND tfp.tenant_id = ? \
             LEFT JOIN permissions p ON tfp.permission_id = p.id \
             ORDER BY fo.id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn find_entitlement(
        &self,
        tenant_id: i64,
        object_id: i64,
    ) -> Result<Option<EntitlementView>> {
        let item = sqlx::query_as::<_, EntitlementView>(
            "SELECT fo.id AS object_id, fo.parent_id, fo.name, fo.category, fo.location, \
                    tfp.status, p.code AS permission_code \
             FROM feature_objects fo \
             LEFT JOIN tenant_feature_permissions tfp \
                    ON tfp.object_id = fo.id AND tfp.tenant_id = ? \
             LEFT JOIN permissions p ON tfp.permission_id = p.id \
             WHERE fo.id = ?",
        )
        .bind(tenant_id)
        .bind(object_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn apply_changes(
        &self,
        tenant_id: i64,
        operator: &ChangeOperator,
        changes: &[CapChange],
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for change in changes {
            match change.existing_id {
                Some(id) => {
                    sqlx::query(
                        "UPDATE tenant_feature_permissions \
                         SET permission_id = ?, status = ?, grant_source = 'ADMIN', \
                             updated_by = ?, updated_at = NOW() \
                         WHERE id = ?",
                    )
                    .bind(change.permission_id)
                    .bind(change.status)
                    .bind(operator.user_id)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query(
                        "INSERT INTO tenant_feature_permissions \
                         (tenant_id, object_id, permission_id, status, grant_source, \
                          granted_by, granted_at, updated_by, updated_at) \
                         VALUES (?, ?, ?, ?, 'ADMIN', ?, NOW(), ?, NOW())",
                    )
                    .bind(tenant_id)
                    .bind(change.object_id)
                    .bind(change.permission_id)
                    .bind(change.status)
                    .bind(operator.user_id)
                    .bind(operator.user_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            sqlx::query(
                "INSERT INTO tenant_feature_audit \
                 (tenant_id, object_id, action, before_status, after_status, \
                  before_permission_id, after_permission_id, operator_user_id, \
                  operator_tenant_id, trace_id, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NOW())",
            )
            .bind(tenant_id)
            .bind(change.object_id)
            .bind(change.action.as_str())
            .bind(change.before_status)
            .bind(change.status)
            .bind(change.before_permission_id)
            .bind(change.permission_id)
            .bind(operator.user_id)
            .bind(operator.tenant_id)
            .bind(&operator.trace_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
