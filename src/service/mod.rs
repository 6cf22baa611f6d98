//! Service layer: business rules over the repository traits
//!
//! Services are generic over their repositories so unit tests run against
//! mockall doubles. Concrete wiring happens in `server::AppState`.

pub mod assignment;
pub mod catalog;
pub mod entitlement;
pub mod resolver;

pub use assignment::AssignmentService;
pub use catalog::CatalogService;
pub use entitlement::EntitlementService;
pub use resolver::ResolverService;
