//! Effective permission resolution
//!
//! The read path: role grants are aggregated per feature object with the
//! lattice max, combined with the user's override (overrides are additive
//! grants, never restrictions), then clamped by the tenant's entitlement
//! ceiling. Absence of grants, overrides, or caps is data, not an error.

use crate::domain::{
    OperatorContext, PermissionLattice, ResolvedPermission, RoleSource, STATUS_ENABLED,
};
use crate::error::{AppError, Result};
use crate::repository::{
    CatalogRepository, EntitlementRepository, GrantRepository, MembershipRepository,
};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ResolverService<C, M, G, E>
where
    C: CatalogRepository,
    M: MembershipRepository,
    G: GrantRepository,
    E: EntitlementRepository,
{
    lattice: Arc<PermissionLattice>,
    catalog_repo: Arc<C>,
    membership_repo: Arc<M>,
    grant_repo: Arc<G>,
    entitlement_repo: Arc<E>,
}

impl<C, M, G, E> ResolverService<C, M, G, E>
where
    C: CatalogRepository,
    M: MembershipRepository,
    G: GrantRepository,
    E: EntitlementRepository,
{
    pub fn new(
        lattice: Arc<PermissionLattice>,
        catalog_repo: Arc<C>,
        membership_repo: Arc<M>,
        grant_repo: Arc<G>,
        entitlement_repo: Arc<E>,
    ) -> Self {
        Self {
            lattice,
            catalog_repo,
            membership_repo,
            grant_repo,
            entitlement_repo,
        }
    }

    /// Resolve the effective permission for every feature object visible to
    /// the tenant, for one user.
    ///
    /// Role provenance and the raw override are retained in the output so
    /// callers can explain the result without re-querying.
    pub async fn resolve_effective_permissions(
        &self,
        ctx: &OperatorContext,
        user_id: i64,
    ) -> Result<Vec<ResolvedPermission>> {
        let tenant_id = ctx.tenant_id;
        if !self.membership_repo.user_in_tenant(tenant_id, user_id).await? {
            return Err(AppError::NotFound(format!(
                "User {user_id} not found in tenant {tenant_id}"
            )));
        }

        let objects = self.catalog_repo.list_feature_objects().await?;
        let role_ids = self
            .membership_repo
            .find_user_role_ids(tenant_id, user_id)
            .await?;
        let grants = self
            .grant_repo
            .find_role_grants_for_roles(tenant_id, &role_ids)
            .await?;

        let mut sources_by_object: HashMap<i64, Vec<RoleSource>> = HashMap::new();
        for grant in grants {
            sources_by_object
                .entry(grant.object_id)
                .or_default()
                .push(RoleSource {
                    role_id: grant.role_id,
                    role_name: grant.role_name,
                    permission_code: grant.permission_code,
                });
        }

        let overrides: HashMap<i64, String> = self
            .grant_repo
            .find_user_overrides(tenant_id, user_id)
            .await?
            .into_iter()
            .map(|o| (o.object_id, o.permission_code))
            .collect();

        let ceilings: HashMap<i64, _> = self
            .entitlement_repo
            .find_ceilings(tenant_id)
            .await?
            .into_iter()
            .map(|c| (c.object_id, c))
            .collect();

        let mut result = Vec::with_capacity(objects.len());
        for object in objects {
            let sources = sources_by_object.remove(&object.id).unwrap_or_default();
            let role_codes: Vec<Option<&str>> = sources
                .iter()
                .map(|s| Some(s.permission_code.as_str()))
                .collect();
            let role_max = self.lattice.max_code(&role_codes);

            let override_code = overrides.get(&object.id);
            let combined = self.lattice.max_code(&[
                Some(role_max.code.as_str()),
                override_code.map(String::as_str),
            ]);

            let ceiling = ceilings.get(&object.id);
            let effective = match ceiling {
                // A disabled feature is invisible to every tenant member,
                // and a never-granted feature resolves as not entitled.
                None => self.lattice.bottom(),
                Some(c) if c.status != STATUS_ENABLED => self.lattice.bottom(),
                Some(c) => self
                    .lattice
                    .min_code(Some(&combined.code), Some(&c.permission_code))
                    .unwrap_or_else(|| self.lattice.bottom()),
            };

            result.push(ResolvedPermission {
                object_id: object.id,
                parent_id: object.parent_id,
                name: object.name,
                category: object.category,
                effective_code: effective.code.clone(),
                role_sources: sources,
                override_code: override_code.cloned(),
                tenant_status: ceiling.map(|c| c.status),
                tenant_permission_code: ceiling.map(|c| c.permission_code.clone()),
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        FeatureObject, PermissionCeiling, PermissionCode, RoleGrantRow, UserOverrideRow,
        STATUS_DISABLED,
    };
    use crate::repository::catalog::MockCatalogRepository;
    use crate::repository::entitlement::MockEntitlementRepository;
    use crate::repository::grants::MockGrantRepository;
    use crate::repository::membership::MockMembershipRepository;
    use pretty_assertions::assert_eq;

    fn lattice() -> Arc<PermissionLattice> {
        let catalog = vec![
            PermissionCode {
                id: 1,
                code: "NONE".to_string(),
                name: "No Access".to_string(),
                level: 0,
            },
            PermissionCode {
                id: 2,
                code: "VIEW".to_string(),
                name: "View".to_string(),
                level: 10,
            },
            PermissionCode {
                id: 3,
                code: "EDIT".to_string(),
                name: "Edit".to_string(),
                level: 20,
            },
            PermissionCode {
                id: 4,
                code: "ADMIN".to_string(),
                name: "Administer".to_string(),
                level: 30,
            },
        ];
        Arc::new(PermissionLattice::from_catalog(catalog).unwrap())
    }

    fn object(id: i64, name: &str) -> FeatureObject {
        FeatureObject {
            id,
            parent_id: None,
            name: name.to_string(),
            category: Some("MENU".to_string()),
            location: None,
        }
    }

    fn ceiling(object_id: i64, code: &str, level: i32, status: i32) -> PermissionCeiling {
        PermissionCeiling {
            object_id,
            status,
            permission_code: code.to_string(),
            permission_level: level,
        }
    }

    struct Fixture {
        catalog: MockCatalogRepository,
        membership: MockMembershipRepository,
        grants: MockGrantRepository,
        entitlements: MockEntitlementRepository,
    }

    impl Fixture {
        fn new() -> Self {
            let mut membership = MockMembershipRepository::new();
            membership.expect_user_in_tenant().returning(|_, _| Ok(true));
            Self {
                catalog: MockCatalogRepository::new(),
                membership,
                grants: MockGrantRepository::new(),
                entitlements: MockEntitlementRepository::new(),
            }
        }

        fn into_service(
            self,
        ) -> ResolverService<
            MockCatalogRepository,
            MockMembershipRepository,
            MockGrantRepository,
            MockEntitlementRepository,
        > {
            ResolverService::new(
                lattice(),
                Arc::new(self.catalog),
                Arc::new(self.membership),
                Arc::new(self.grants),
                Arc::new(self.entitlements),
            )
        }
    }

    #[tokio::test]
    async fn test_role_grant_flows_through_enabled_cap() {
        let mut fx = Fixture::new();
        fx.catalog
            .expect_list_feature_objects()
            .returning(|| Ok(vec![object(2, "Reports")]));
        fx.membership
            .expect_find_user_role_ids()
            .returning(|_, _| Ok(vec![7]));
        fx.grants.expect_find_role_grants_for_roles().returning(|_, _| {
            Ok(vec![RoleGrantRow {
                role_id: 7,
                role_name: "Analyst".to_string(),
                object_id: 2,
                permission_code: "VIEW".to_string(),
            }])
        });
        fx.grants
            .expect_find_user_overrides()
            .returning(|_, _| Ok(vec![]));
        fx.entitlements
            .expect_find_ceilings()
            .returning(|_| Ok(vec![ceiling(2, "EDIT", 20, STATUS_ENABLED)]));

        let service = fx.into_service();
        let result = service
            .resolve_effective_permissions(&OperatorContext::new(1, 77), 77)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].effective_code, "VIEW");
        assert_eq!(result[0].role_sources.len(), 1);
        assert_eq!(result[0].role_sources[0].role_name, "Analyst");
        assert_eq!(result[0].override_code, None);
    }

    #[tokio::test]
    async fn test_override_raises_then_cap_clamps() {
        let mut fx = Fixture::new();
        fx.catalog
            .expect_list_feature_objects()
            .returning(|| Ok(vec![object(2, "Reports")]));
        fx.membership
            .expect_find_user_role_ids()
            .returning(|_, _| Ok(vec![7]));
        fx.grants.expect_find_role_grants_for_roles().returning(|_, _| {
            Ok(vec![RoleGrantRow {
                role_id: 7,
                role_name: "Analyst".to_string(),
                object_id: 2,
                permission_code: "VIEW".to_string(),
            }])
        });
        fx.grants.expect_find_user_overrides().returning(|_, _| {
            Ok(vec![UserOverrideRow {
                object_id: 2,
                permission_code: "ADMIN".to_string(),
            }])
        });
        fx.entitlements
            .expect_find_ceilings()
            .returning(|_| Ok(vec![ceiling(2, "EDIT", 20, STATUS_ENABLED)]));

        let service = fx.into_service();
        let result = service
            .resolve_effective_permissions(&OperatorContext::new(1, 77), 77)
            .await
            .unwrap();

        // ADMIN override clamps to the EDIT ceiling
        assert_eq!(result[0].effective_code, "EDIT");
        assert_eq!(result[0].override_code, Some("ADMIN".to_string()));
        assert_eq!(result[0].tenant_permission_code, Some("EDIT".to_string()));
    }

    #[tokio::test]
    async fn test_lower_override_is_ineffective() {
        let mut fx = Fixture::new();
        fx.catalog
            .expect_list_feature_objects()
            .returning(|| Ok(vec![object(3, "Settings")]));
        fx.membership
            .expect_find_user_role_ids()
            .returning(|_, _| Ok(vec![7]));
        fx.grants.expect_find_role_grants_for_roles().returning(|_, _| {
            Ok(vec![RoleGrantRow {
                role_id: 7,
                role_name: "Manager".to_string(),
                object_id: 3,
                permission_code: "EDIT".to_string(),
            }])
        });
        fx.grants.expect_find_user_overrides().returning(|_, _| {
            Ok(vec![UserOverrideRow {
                object_id: 3,
                permission_code: "VIEW".to_string(),
            }])
        });
        fx.entitlements
            .expect_find_ceilings()
            .returning(|_| Ok(vec![ceiling(3, "ADMIN", 30, STATUS_ENABLED)]));

        let service = fx.into_service();
        let result = service
            .resolve_effective_permissions(&OperatorContext::new(1, 77), 77)
            .await
            .unwrap();

        // Overrides are additive: a VIEW override cannot lower the EDIT grant
        assert_eq!(result[0].effective_code, "EDIT");
    }

    #[tokio::test]
    async fn test_disabled_cap_forces_none() {
        let mut fx = Fixture::new();
        fx.catalog
            .expect_list_feature_objects()
            .returning(|| Ok(vec![object(4, "Billing")]));
        fx.membership
            .expect_find_user_role_ids()
            .returning(|_, _| Ok(vec![7]));
        fx.grants.expect_find_role_grants_for_roles().returning(|_, _| {
            Ok(vec![RoleGrantRow {
                role_id: 7,
                role_name: "Admin".to_string(),
                object_id: 4,
                permission_code: "ADMIN".to_string(),
            }])
        });
        fx.grants
            .expect_find_user_overrides()
            .returning(|_, _| Ok(vec![]));
        fx.entitlements
            .expect_find_ceilings()
            .returning(|_| Ok(vec![ceiling(4, "ADMIN", 30, STATUS_DISABLED)]));

        let service = fx.into_service();
        let result = service
            .resolve_effective_permissions(&OperatorContext::new(1, 77), 77)
            .await
            .unwrap();

        assert_eq!(result[0].effective_code, "NONE");
        assert_eq!(result[0].tenant_status, Some(STATUS_DISABLED));
    }

    #[tokio::test]
    async fn test_missing_cap_row_resolves_to_none() {
        let mut fx = Fixture::new();
        fx.catalog
            .expect_list_feature_objects()
            .returning(|| Ok(vec![object(5, "Exports")]));
        fx.membership
            .expect_find_user_role_ids()
            .returning(|_, _| Ok(vec![7]));
        fx.grants.expect_find_role_grants_for_roles().returning(|_, _| {
            Ok(vec![RoleGrantRow {
                role_id: 7,
                role_name: "Admin".to_string(),
                object_id: 5,
                permission_code: "ADMIN".to_string(),
            }])
        });
        fx.grants
            .expect_find_user_overrides()
            .returning(|_, _| Ok(vec![]));
        fx.entitlements
            .expect_find_ceilings()
            .returning(|_| Ok(vec![]));

        let service = fx.into_service();
        let result = service
            .resolve_effective_permissions(&OperatorContext::new(1, 77), 77)
            .await
            .unwrap();

        // Never-granted feature: not entitled, not unconstrained
        assert_eq!(result[0].effective_code, "NONE");
        assert_eq!(result[0].tenant_status, None);
    }

    #[tokio::test]
    async fn test_user_with_no_roles_and_no_overrides() {
        let mut fx = Fixture::new();
        fx.catalog
            .expect_list_feature_objects()
            .returning(|| Ok(vec![object(1, "Home"), object(2, "Reports")]));
        fx.membership
            .expect_find_user_role_ids()
            .returning(|_, _| Ok(vec![]));
        fx.grants
            .expect_find_role_grants_for_roles()
            .returning(|_, _| Ok(vec![]));
        fx.grants
            .expect_find_user_overrides()
            .returning(|_, _| Ok(vec![]));
        fx.entitlements.expect_find_ceilings().returning(|_| {
            Ok(vec![
                ceiling(1, "ADMIN", 30, STATUS_ENABLED),
                ceiling(2, "ADMIN", 30, STATUS_ENABLED),
            ])
        });

        let service = fx.into_service();
        let result = service
            .resolve_effective_permissions(&OperatorContext::new(1, 77), 77)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| r.effective_code == "NONE"));
        assert!(result.iter().all(|r| r.role_sources.is_empty()));
    }

    #[tokio::test]
    async fn test_multiple_roles_reduce_to_max() {
        let mut fx = Fixture::new();
        fx.catalog
            .expect_list_feature_objects()
            .returning(|| Ok(vec![object(2, "Reports")]));
        fx.membership
            .expect_find_user_role_ids()
            .returning(|_, _| Ok(vec![7, 8]));
        fx.grants.expect_find_role_grants_for_roles().returning(|_, _| {
            Ok(vec![
                RoleGrantRow {
                    role_id: 7,
                    role_name: "Analyst".to_string(),
                    object_id: 2,
                    permission_code: "VIEW".to_string(),
                },
                RoleGrantRow {
                    role_id: 8,
                    role_name: "Editor".to_string(),
                    object_id: 2,
                    permission_code: "EDIT".to_string(),
                },
            ])
        });
        fx.grants
            .expect_find_user_overrides()
            .returning(|_, _| Ok(vec![]));
        fx.entitlements
            .expect_find_ceilings()
            .returning(|_| Ok(vec![ceiling(2, "ADMIN", 30, STATUS_ENABLED)]));

        let service = fx.into_service();
        let result = service
            .resolve_effective_permissions(&OperatorContext::new(1, 77), 77)
            .await
            .unwrap();

        assert_eq!(result[0].effective_code, "EDIT");
        // Both contributing roles are retained for provenance
        assert_eq!(result[0].role_sources.len(), 2);
    }

    #[tokio::test]
    async fn test_user_not_in_tenant() {
        let mut membership = MockMembershipRepository::new();
        membership
            .expect_user_in_tenant()
            .returning(|_, _| Ok(false));

        let service = ResolverService::new(
            lattice(),
            Arc::new(MockCatalogRepository::new()),
            Arc::new(membership),
            Arc::new(MockGrantRepository::new()),
            Arc::new(MockEntitlementRepository::new()),
        );

        let result = service
            .resolve_effective_permissions(&OperatorContext::new(1, 99), 99)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
