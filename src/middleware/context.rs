//! Operator context extraction
//!
//! Every tenant-scoped endpoint needs to know who is acting and on which
//! tenant. The gateway forwards that as headers; `OperatorContext` is the
//! extractor handlers take as an argument.
//!
//! Headers:
//! - `X-Tenant-Id` (required): tenant the request operates on
//! - `X-User-Id` (required): acting user
//! - `X-Actor-Tenant-Id` (optional): actor's home tenant when operating
//!   across tenants; audit records carry this instead of the target tenant
//! - `X-Request-Id` (optional): trace id propagated into audit records

use crate::domain::OperatorContext;
use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::header::HeaderMap;
use axum::http::request::Parts;

const TENANT_ID_HEADER: &str = "x-tenant-id";
const USER_ID_HEADER: &str = "x-user-id";
const ACTOR_TENANT_ID_HEADER: &str = "x-actor-tenant-id";
const REQUEST_ID_HEADER: &str = "x-request-id";

fn required_id(headers: &HeaderMap, name: &str) -> Result<i64, AppError> {
    let value = headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {name} header")))?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Invalid {name} header")))
}

fn optional_id(headers: &HeaderMap, name: &str) -> Result<Option<i64>, AppError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(Some)
            .ok_or_else(|| AppError::Unauthorized(format!("Invalid {name} header"))),
    }
}

impl<S> FromRequestParts<S> for OperatorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = required_id(&parts.headers, TENANT_ID_HEADER)?;
        let user_id = required_id(&parts.headers, USER_ID_HEADER)?;
        let actor_tenant_id = optional_id(&parts.headers, ACTOR_TENANT_ID_HEADER)?;
        let trace_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut ctx = OperatorContext::new(tenant_id, user_id);
        ctx.actor_tenant_id = actor_tenant_id;
        ctx.trace_id = trace_id;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::header::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_required_id_parses() {
        let map = headers(&[("x-tenant-id", "42")]);
        assert_eq!(required_id(&map, TENANT_ID_HEADER).unwrap(), 42);
    }

    #[test]
    fn test_missing_required_header_is_unauthorized() {
        let map = headers(&[]);
        assert!(matches!(
            required_id(&map, TENANT_ID_HEADER),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_required_header_is_unauthorized() {
        let map = headers(&[("x-tenant-id", "not-a-number")]);
        assert!(matches!(
            required_id(&map, TENANT_ID_HEADER),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_optional_id_absent_is_none() {
        let map = headers(&[]);
        assert_eq!(optional_id(&map, ACTOR_TENANT_ID_HEADER).unwrap(), None);
    }

    #[test]
    fn test_optional_id_present_but_invalid_is_rejected() {
        let map = headers(&[("x-actor-tenant-id", "abc")]);
        assert!(optional_id(&map, ACTOR_TENANT_ID_HEADER).is_err());
    }
}
