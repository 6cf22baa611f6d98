//! Explicit operator context
//!
//! Every write entry point receives the acting tenant and user as explicit
//! arguments; there is no ambient "current tenant" state anywhere in the
//! core. When a platform operator acts on behalf of another tenant,
//! `actor_tenant_id` carries the operator's own tenant, distinct from the
//! tenant being modified.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorContext {
    /// The tenant whose data is being read or modified.
    pub tenant_id: i64,
    /// The acting user.
    pub user_id: i64,
    /// The actor's own tenant when impersonating, otherwise absent.
    pub actor_tenant_id: Option<i64>,
    /// Request trace id propagated into audit records.
    pub trace_id: Option<String>,
}

impl OperatorContext {
    pub fn new(tenant_id: i64, user_id: i64) -> Self {
        Self {
            tenant_id,
            user_id,
            actor_tenant_id: None,
            trace_id: None,
        }
    }

    /// Tenant recorded as the operator's origin in audit records.
    pub fn operator_tenant_id(&self) -> i64 {
        self.actor_tenant_id.unwrap_or(self.tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tenant_defaults_to_target_tenant() {
        let ctx = OperatorContext::new(10, 77);
        assert_eq!(ctx.operator_tenant_id(), 10);
    }

    #[test]
    fn test_operator_tenant_when_impersonating() {
        let ctx = OperatorContext {
            actor_tenant_id: Some(1),
            ..OperatorContext::new(10, 77)
        };
        assert_eq!(ctx.operator_tenant_id(), 1);
    }
}
