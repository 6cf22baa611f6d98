//! Repository layer: async traits over the MySQL store
//!
//! Every trait carries `mockall::automock` under cfg(test) so services can
//! be unit-tested without a database.

pub mod audit;
pub mod catalog;
pub mod entitlement;
pub mod grants;
pub mod membership;

pub use audit::{AuditRepository, AuditRepositoryImpl};
pub use catalog::{CatalogRepository, CatalogRepositoryImpl};
pub use entitlement::{
    CapChange, ChangeOperator, EntitlementRepository, EntitlementRepositoryImpl,
};
pub use grants::{GrantRepository, GrantRepositoryImpl};
pub use membership::{MembershipRepository, MembershipRepositoryImpl};
