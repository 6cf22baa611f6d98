//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::domain::PermissionLattice;
use crate::migration;
use crate::repository::{
    AuditRepositoryImpl, CatalogRepository, CatalogRepositoryImpl, EntitlementRepositoryImpl,
    GrantRepositoryImpl, MembershipRepositoryImpl,
};
use crate::service::{AssignmentService, CatalogService, EntitlementService, ResolverService};
use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub lattice: Arc<PermissionLattice>,
    pub catalog_service: Arc<CatalogService<CatalogRepositoryImpl>>,
    pub resolver_service: Arc<
        ResolverService<
            CatalogRepositoryImpl,
            MembershipRepositoryImpl,
            GrantRepositoryImpl,
            EntitlementRepositoryImpl,
        >,
    >,
    pub assignment_service: Arc<
        AssignmentService<MembershipRepositoryImpl, GrantRepositoryImpl, EntitlementRepositoryImpl>,
    >,
    pub entitlement_service: Arc<
        EntitlementService<CatalogRepositoryImpl, EntitlementRepositoryImpl, AuditRepositoryImpl>,
    >,
}

/// Build the HTTP router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready))
        // Catalog endpoints
        .route(
            "/api/v1/catalog/permissions",
            get(api::catalog::list_permission_codes),
        )
        .route(
            "/api/v1/catalog/objects",
            get(api::catalog::list_feature_objects),
        )
        // Effective permission resolution
        .route(
            "/api/v1/users/{user_id}/permissions",
            get(api::permission::resolve_user_permissions),
        )
        // Role grants
        .route(
            "/api/v1/roles/{role_id}/grants",
            get(api::permission::list_role_grants).put(api::permission::replace_role_grants),
        )
        // User overrides
        .route(
            "/api/v1/users/{user_id}/overrides",
            get(api::permission::list_user_overrides)
                .put(api::permission::replace_user_overrides),
        )
        // Tenant entitlements
        .route(
            "/api/v1/entitlements",
            get(api::entitlement::list_entitlements)
                .put(api::entitlement::update_entitlements),
        )
        .route(
            "/api/v1/entitlements/audit",
            get(api::entitlement::list_audit),
        )
        .route(
            "/api/v1/entitlements/{object_id}",
            get(api::entitlement::get_entitlement),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server: migrate, connect, build state, serve.
pub async fn run(config: Config) -> Result<()> {
    migration::run_migrations(&config).await?;

    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    let catalog_repo = Arc::new(CatalogRepositoryImpl::new(db_pool.clone()));
    let membership_repo = Arc::new(MembershipRepositoryImpl::new(db_pool.clone()));
    let grant_repo = Arc::new(GrantRepositoryImpl::new(db_pool.clone()));
    let entitlement_repo = Arc::new(EntitlementRepositoryImpl::new(db_pool.clone()));
    let audit_repo = Arc::new(AuditRepositoryImpl::new(db_pool.clone()));

    // The permission catalog is fixed reference data; load it once and share
    // the lattice across all services.
    let codes = catalog_repo.list_permission_codes().await?;
    let lattice = Arc::new(PermissionLattice::from_catalog(codes)?);
    info!(codes = lattice.len(), "Permission lattice loaded");

    let catalog_service = Arc::new(CatalogService::new(catalog_repo.clone()));
    let resolver_service = Arc::new(ResolverService::new(
        lattice.clone(),
        catalog_repo.clone(),
        membership_repo.clone(),
        grant_repo.clone(),
        entitlement_repo.clone(),
    ));
    let assignment_service = Arc::new(AssignmentService::new(
        lattice.clone(),
        membership_repo.clone(),
        grant_repo.clone(),
        entitlement_repo.clone(),
    ));
    let entitlement_service = Arc::new(EntitlementService::new(
        lattice.clone(),
        catalog_repo.clone(),
        entitlement_repo.clone(),
        audit_repo.clone(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        db_pool,
        lattice,
        catalog_service,
        resolver_service,
        assignment_service,
        entitlement_service,
    };

    let app = create_router(state);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
