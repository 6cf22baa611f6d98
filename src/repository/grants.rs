//! Role grant and user override repository
//!
//! Writes use full-replace semantics: replacing a subject's assignment set
//! deletes all prior rows for that subject and inserts the new set inside
//! one transaction, so a reader can never observe a partially-replaced set.

use crate::domain::{ObjectPermission, RoleGrantRow, UserOverrideRow, ValidatedAssignment};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GrantRepository: Send + Sync {
    async fn find_role_grants_for_roles(
        &self,
        tenant_id: i64,
        role_ids: &[i64],
    ) -> Result<Vec<RoleGrantRow>>;
    async fn find_role_object_permissions(
        &self,
        tenant_id: i64,
        role_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<ObjectPermission>>;
    async fn find_user_overrides(
        &self,
        tenant_id: i64,
        user_id: i64,
    ) -> Result<Vec<UserOverrideRow>>;
    async fn replace_role_grants(
        &self,
        tenant_id: i64,
        role_id: i64,
        assignments: &[ValidatedAssignment],
    ) -> Result<()>;
    async fn replace_user_overrides(
        &self,
        tenant_id: i64,
        user_id: i64,
        assignments: &[ValidatedAssignment],
    ) -> Result<()>;
}

pub struct GrantRepositoryImpl {
    pool: MySqlPool,
}

impl GrantRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GrantRepository for GrantRepositoryImpl {
    async fn find_role_grants_for_roles(
        &self,
        tenant_id: i64,
        role_ids: &[i64],
    ) -> Result<Vec<RoleGrantRow>> {
        if role_ids.is_empty() {
            return Ok(vec![]);
        }

        let placeholders = vec!["?"; role_ids.len()].join(", ");
        let sql = format!(
            "SELECT rg.role_id, r.name AS role_name, rg.object_id, p.code AS permission_code \
             FROM role_grants rg \
             INNER JOIN roles r ON rg.role_id = r.id \
             INNER JOIN permissions p ON rg.permission_id = p.id \
             WHERE rg.tenant_id = ? AND rg.role_id IN ({placeholders})",
        );

        let mut query = sqlx::query_as::<_, RoleGrantRow>(&sql).bind(tenant_id);
        for role_id in role_ids {
            query = query.bind(role_id);
        }

        let grants = query.fetch_all(&self.pool).await?;
        Ok(grants)
    }

    async fn find_role_object_permissions(
        &self,
        tenant_id: i64,
        role_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<ObjectPermission>> {
        let mut sql = String::from(
            "SELECT fo.id AS object_id, fo.parent_id, fo.name, fo.category, \
                    p.code AS permission_code, tp.code AS tenant_permission_code \
             FROM feature_objects fo \
             LEFT JOIN role_grants rg \
                    ON rg.object_id = fo.id AND rg.tenant_id = ? AND rg.role_id = ? \
             LEFT JOIN permissions p ON rg.permission_id = p.id \
             LEFT JOIN tenant_feature_permissions tfp \
                    ON tfp.object_id = fo.id AND tfp.tenant_id = ? \
             LEFT JOIN permissions tp ON tfp.permission_id = tp.id",
        );
        if assigned_only {
            sql.push_str(" WHERE rg.id IS NOT NULL");
        }
        sql.push_str(" ORDER BY fo.id");

        let items = sqlx::query_as::<_, ObjectPermission>(&sql)
            .bind(tenant_id)
            .bind(role_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn find_user_overrides(
        &self,
        tenant_id: i64,
        user_id: i64,
    ) -> Result<Vec<UserOverrideRow>> {
        let overrides = sqlx::query_as::<_, UserOverrideRow>(
            "SELECT uo.object_id, p.code AS permission_code \
             FROM user_overrides uo \
             INNER JOIN permissions p ON uo.permission_id = p.id \
             WHERE uo.tenant_id = ? AND uo.user_id = ?",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(overrides)
    }

    async fn replace_role_grants(
        &self,
        tenant_id: i64,
        role_id: i64,
        assignments: &[ValidatedAssignment],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_grants WHERE tenant_id = ? AND role_id = ?")
            .bind(tenant_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        for assignment in assignments {
            sqlx::query(
                "INSERT INTO role_grants (tenant_id, role_id, object_id, permission_id) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(tenant_id)
            .bind(role_id)
            .bind(assignment.object_id)
            .bind(assignment.permission_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn replace_user_overrides(
        &self,
        tenant_id: i64,
        user_id: i64,
        assignments: &[ValidatedAssignment],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_overrides WHERE tenant_id = ? AND user_id = ?")
            .bind(tenant_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for assignment in assignments {
            sqlx::query(
                "INSERT INTO user_overrides (tenant_id, user_id, object_id, permission_id) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(tenant_id)
            .bind(user_id)
            .bind(assignment.object_id)
            .bind(assignment.permission_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
