//! Entitlement audit trail queries
//!
//! The audit table is append-only; inserts happen inside the entitlement
//! write transaction (see `repository::entitlement`). This repository only
//! reads the trail back.

use crate::domain::{AuditQuery, EntitlementAuditRecord};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn find(&self, tenant_id: i64, query: &AuditQuery)
        -> Result<Vec<EntitlementAuditRecord>>;
    async fn count(&self, tenant_id: i64, query: &AuditQuery) -> Result<i64>;
}

pub struct AuditRepositoryImpl {
    pool: MySqlPool,
}

impl AuditRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn filter_sql(query: &AuditQuery) -> String {
        let mut sql = String::new();
        if query.object_id.is_some() {
            sql.push_str(" AND object_id = ?");
        }
        if query.action.is_some() {
            sql.push_str(" AND action = ?");
        }
        if query.from_date.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if query.to_date.is_some() {
            sql.push_str(" AND created_at <= ?");
        }
        sql
    }

    /// Effective (limit, offset): limit defaults to 50, never exceeds 100,
    /// and both are clamped to non-negative values.
    fn page_bounds(query: &AuditQuery) -> (i64, i64) {
        let limit = query.limit.unwrap_or(50).clamp(0, 100);
        let offset = query.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[async_trait]
impl AuditRepository for AuditRepositoryImpl {
    async fn find(
        &self,
        tenant_id: i64,
        query: &AuditQuery,
    ) -> Result<Vec<EntitlementAuditRecord>> {
        let mut sql = String::from(
            "SELECT id, tenant_id, object_id, action, before_status, after_status, \
                    before_permission_id, after_permission_id, operator_user_id, \
                    operator_tenant_id, trace_id, created_at \
             FROM tenant_feature_audit WHERE tenant_id = ?",
        );
        sql.push_str(&Self::filter_sql(query));
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut query_builder =
            sqlx::query_as::<_, EntitlementAuditRecord>(&sql).bind(tenant_id);

        if let Some(object_id) = query.object_id {
            query_builder = query_builder.bind(object_id);
        }
        if let Some(action) = query.action {
            query_builder = query_builder.bind(action.as_str());
        }
        if let Some(from_date) = query.from_date {
            query_builder = query_builder.bind(from_date);
        }
        if let Some(to_date) = query.to_date {
            query_builder = query_builder.bind(to_date);
        }

        let (limit, offset) = Self::page_bounds(query);
        query_builder = query_builder.bind(limit).bind(offset);

        let records = query_builder.fetch_all(&self.pool).await?;
        Ok(records)
    }

    async fn count(&self, tenant_id: i64, query: &AuditQuery) -> Result<i64> {
        let mut sql =
            String::from("SELECT COUNT(*) FROM tenant_feature_audit WHERE tenant_id = ?");
        sql.push_str(&Self::filter_sql(query));

        let mut query_builder = sqlx::query_as::<_, (i64,)>(&sql).bind(tenant_id);

        if let Some(object_id) = query.object_id {
            query_builder = query_builder.bind(object_id);
        }
        if let Some(action) = query.action {
            query_builder = query_builder.bind(action.as_str());
        }
        if let Some(from_date) = query.from_date {
            query_builder = query_builder.bind(from_date);
        }
        if let Some(to_date) = query.to_date {
            query_builder = query_builder.bind(to_date);
        }

        let (count,) = query_builder.fetch_one(&self.pool).await?;
        Ok(count)
    }
}
