use featuregate_core::domain::{
    AuditAction, AuditQuery, EntitlementUpdateItem, OperatorContext, PermissionLattice,
    STATUS_DISABLED, STATUS_ENABLED,
};
use featuregate_core::repository::audit::AuditRepositoryImpl;
use featuregate_core::repository::catalog::CatalogRepositoryImpl;
use featuregate_core::repository::entitlement::EntitlementRepositoryImpl;
use featuregate_core::repository::{AuditRepository, CatalogRepository};
use featuregate_core::service::EntitlementService;
use sqlx::MySqlPool;
use std::sync::Arc;

mod common;

async fn build_service(
    pool: &MySqlPool,
) -> EntitlementService<CatalogRepositoryImpl, EntitlementRepositoryImpl, AuditRepositoryImpl> {
    let catalog_repo = Arc::new(CatalogRepositoryImpl::new(pool.clone()));
    let codes = catalog_repo.list_permission_codes().await.unwrap();
    let lattice = Arc::new(PermissionLattice::from_catalog(codes).unwrap());
    EntitlementService::new(
        lattice,
        catalog_repo,
        Arc::new(EntitlementRepositoryImpl::new(pool.clone())),
        Arc::new(AuditRepositoryImpl::new(pool.clone())),
    )
}

#[tokio::test]
async fn test_grant_then_disable_writes_audit_trail() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let tenant_id = common::next_tenant_id();
    let reports = common::create_feature_object(&pool, "Reports").await;
    let service = build_service(&pool).await;
    let ctx = OperatorContext::new(tenant_id, 9);

    // First grant
    service
        .update_entitlements(
            &ctx,
            &[EntitlementUpdateItem {
                object_id: reports,
                status: STATUS_ENABLED,
                permission_code: "EDIT".to_string(),
            }],
        )
        .await
        .unwrap();

    let entitlement = service.get_entitlement(tenant_id, reports).await.unwrap();
    assert_eq!(entitlement.status, Some(STATUS_ENABLED));
    assert_eq!(entitlement.permission_code, Some("EDIT".to_string()));

    // Then disable
    service
        .update_entitlements(
            &ctx,
            &[EntitlementUpdateItem {
                object_id: reports,
                status: STATUS_DISABLED,
                permission_code: "EDIT".to_string(),
            }],
        )
        .await
        .unwrap();

    let (records, total) = service
        .list_audit(tenant_id, &AuditQuery::default())
        .await
        .unwrap();
    assert_eq!(total, 2);
    // Newest first
    assert_eq!(records[0].action, AuditAction::Disable);
    assert_eq!(records[0].before_status, Some(STATUS_ENABLED));
    assert_eq!(records[0].after_status, STATUS_DISABLED);
    assert_eq!(records[1].action, AuditAction::Grant);
    assert_eq!(records[1].before_status, None);
    assert_eq!(records[1].operator_user_id, 9);
    assert_eq!(records[1].operator_tenant_id, tenant_id);

    common::cleanup_tenant(&pool, tenant_id).await.unwrap();
}

#[tokio::test]
async fn test_repeated_update_writes_no_audit() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let tenant_id = common::next_tenant_id();
    let reports = common::create_feature_object(&pool, "Reports").await;
    let service = build_service(&pool).await;
    let ctx = OperatorContext::new(tenant_id, 9);

    let items = [EntitlementUpdateItem {
        object_id: reports,
        status: STATUS_ENABLED,
        permission_code: "VIEW".to_string(),
    }];
    service.update_entitlements(&ctx, &items).await.unwrap();
    service.update_entitlements(&ctx, &items).await.unwrap();

    let (_, total) = service
        .list_audit(tenant_id, &AuditQuery::default())
        .await
        .unwrap();
    assert_eq!(total, 1);

    common::cleanup_tenant(&pool, tenant_id).await.unwrap();
}

#[tokio::test]
async fn test_ceiling_change_audited_as_update_permission() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let tenant_id = common::next_tenant_id();
    let reports = common::create_feature_object(&pool, "Reports").await;
    let service = build_service(&pool).await;
    let ctx = OperatorContext::new(tenant_id, 9);

    service
        .update_entitlements(
            &ctx,
            &[EntitlementUpdateItem {
                object_id: reports,
                status: STATUS_ENABLED,
                permission_code: "VIEW".to_string(),
            }],
        )
        .await
        .unwrap();
    service
        .update_entitlements(
            &ctx,
            &[EntitlementUpdateItem {
                object_id: reports,
                status: STATUS_ENABLED,
                permission_code: "ADMIN".to_string(),
            }],
        )
        .await
        .unwrap();

    let audit_repo = AuditRepositoryImpl::new(pool.clone());
    let records = audit_repo
        .find(
            tenant_id,
            &AuditQuery {
                action: Some(AuditAction::UpdatePermission),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].object_id, reports);

    common::cleanup_tenant(&pool, tenant_id).await.unwrap();
}

#[tokio::test]
async fn test_impersonating_actor_tenant_recorded_in_audit() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let tenant_id = common::next_tenant_id();
    let operator_tenant = common::next_tenant_id();
    let reports = common::create_feature_object(&pool, "Reports").await;
    let service = build_service(&pool).await;

    let mut ctx = OperatorContext::new(tenant_id, 9);
    ctx.actor_tenant_id = Some(operator_tenant);
    ctx.trace_id = Some("trace-123".to_string());

    service
        .update_entitlements(
            &ctx,
            &[EntitlementUpdateItem {
                object_id: reports,
                status: STATUS_ENABLED,
                permission_code: "EDIT".to_string(),
            }],
        )
        .await
        .unwrap();

    let (records, _) = service
        .list_audit(tenant_id, &AuditQuery::default())
        .await
        .unwrap();
    assert_eq!(records[0].operator_tenant_id, operator_tenant);
    assert_eq!(records[0].trace_id, Some("trace-123".to_string()));

    common::cleanup_tenant(&pool, tenant_id).await.unwrap();
}
