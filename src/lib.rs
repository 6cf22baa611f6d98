//! Featuregate Core - Feature Entitlement Service Backend
//!
//! This crate provides the permission resolution engine for the admin
//! platform: role-grant aggregation, per-user overrides, tenant feature
//! entitlement ceilings, and the audit trail of entitlement changes.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
