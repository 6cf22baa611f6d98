//! Permission catalog and feature-object catalog repository
//!
//! Both catalogs are read-only inputs to the core: the permission catalog is
//! loaded once at startup to build the lattice, feature objects are the
//! navigable hierarchy permissions are granted against.

use crate::domain::{FeatureObject, PermissionCode};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_permission_codes(&self) -> Result<Vec<PermissionCode>>;
    async fn list_feature_objects(&self) -> Result<Vec<FeatureObject>>;
    async fn find_feature_object(&self, id: i64) -> Result<Option<FeatureObject>>;
}

pub struct CatalogRepositoryImpl {
    pool: MySqlPool,
}

impl CatalogRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for CatalogRepositoryImpl {
    async fn list_permission_codes(&self) -> Result<Vec<PermissionCode>> {
        let codes = sqlx::query_as::<_, PermissionCode>(
            "SELECT id, code, name, level FROM permissions ORDER BY level",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn list_feature_objects(&self) -> Result<Vec<FeatureObject>> {
        let objects = sqlx::query_as::<_, FeatureObject>(
            "SELECT id, parent_id, name, category, location FROM feature_objects ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(objects)
    }

    async fn find_feature_object(&self, id: i64) -> Result<Option<FeatureObject>> {
        let object = sqlx::query_as::<_, FeatureObject>(
            "SELECT id, parent_id, name, category, location FROM feature_objects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(object)
    }
}
