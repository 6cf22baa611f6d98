//! Role membership lookups
//!
//! Owned by identity/role management; the core only consumes the
//! (tenant, user) -> role-id mapping and existence checks.

use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn find_user_role_ids(&self, tenant_id: i64, user_id: i64) -> Result<Vec<i64>>;
    async fn user_in_tenant(&self, tenant_id: i64, user_id: i64) -> Result<bool>;
    async fn role_exists(&self, tenant_id: i64, role_id: i64) -> Result<bool>;
}

pub struct MembershipRepositoryImpl {
    pool: MySqlPool,
}

impl MembershipRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for MembershipRepositoryImpl {
    async fn find_user_role_ids(&self, tenant_id: i64, user_id: i64) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT role_id FROM user_roles WHERE tenant_id = ? AND user_id = ?",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn user_in_tenant(&self, tenant_id: i64, user_id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM tenant_users WHERE tenant_id = ? AND user_id = ? AND status = 1",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn role_exists(&self, tenant_id: i64, role_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM roles WHERE tenant_id = ? AND id = ?")
                .bind(tenant_id)
                .bind(role_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }
}
