//! Read-only catalog views: permission codes and feature objects.

use crate::domain::{FeatureObject, PermissionCode};
use crate::error::Result;
use crate::repository::CatalogRepository;
use std::sync::Arc;

pub struct CatalogService<C>
where
    C: CatalogRepository,
{
    catalog_repo: Arc<C>,
}

impl<C> CatalogService<C>
where
    C: CatalogRepository,
{
    pub fn new(catalog_repo: Arc<C>) -> Self {
        Self { catalog_repo }
    }

    /// Permission codes in ascending level order.
    pub async fn list_permission_codes(&self) -> Result<Vec<PermissionCode>> {
        let mut codes = self.catalog_repo.list_permission_codes().await?;
        codes.sort_by_key(|c| c.level);
        Ok(codes)
    }

    pub async fn list_feature_objects(&self) -> Result<Vec<FeatureObject>> {
        self.catalog_repo.list_feature_objects().await
    }
}
