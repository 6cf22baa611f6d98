//! Permission catalog and the permission lattice
//!
//! Permission codes form a total order by numeric level (e.g. NONE < VIEW <
//! EDIT < ADMIN). The lattice is built once at startup from the permission
//! catalog and shared read-only; every lookup goes through normalized codes
//! so case and whitespace differences in stored data cannot change results.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

use crate::error::{AppError, Result};

/// A permission catalog entry: an ordered authorization tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PermissionCode {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub level: i32,
}

/// Immutable total order over permission codes, indexed by normalized code.
#[derive(Debug, Clone)]
pub struct PermissionLattice {
    by_code: HashMap<String, PermissionCode>,
    bottom: PermissionCode,
}

/// Trim and uppercase a raw permission code. Empty input yields `None`.
fn normalize_raw(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

impl PermissionLattice {
    /// Build the lattice from the permission catalog.
    ///
    /// The catalog is seeded once and treated as static; an empty catalog or
    /// duplicate normalized codes is a startup configuration error.
    pub fn from_catalog(catalog: Vec<PermissionCode>) -> Result<Self> {
        let mut by_code: HashMap<String, PermissionCode> = HashMap::with_capacity(catalog.len());
        for entry in catalog {
            let key = normalize_raw(&entry.code).ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("permission catalog contains a blank code"))
            })?;
            if by_code.insert(key.clone(), entry).is_some() {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "permission catalog contains duplicate code {key}"
                )));
            }
        }
        let bottom = by_code
            .values()
            .min_by_key(|p| p.level)
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("permission catalog is empty")))?;
        Ok(Self { by_code, bottom })
    }

    /// Resolve a raw code to its catalog entry; unknown codes yield `None`,
    /// never an error. Callers decide whether `None` is fatal.
    pub fn normalize(&self, raw: &str) -> Option<&PermissionCode> {
        let key = normalize_raw(raw)?;
        self.by_code.get(&key)
    }

    /// The lattice's bottom element (the `NONE`-equivalent).
    pub fn bottom(&self) -> &PermissionCode {
        &self.bottom
    }

    /// Number of catalog entries in the lattice.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Level of a raw code, if it resolves.
    pub fn level_of(&self, raw: &str) -> Option<i32> {
        self.normalize(raw).map(|p| p.level)
    }

    /// Highest-level code among the operands.
    ///
    /// Absent or unresolvable operands are skipped; an empty or
    /// all-unresolvable input yields the bottom element, never `None`.
    pub fn max_code(&self, codes: &[Option<&str>]) -> &PermissionCode {
        codes
            .iter()
            .filter_map(|c| c.and_then(|raw| self.normalize(raw)))
            .max_by_key(|p| p.level)
            .unwrap_or(&self.bottom)
    }

    /// Lower-level code of the two operands.
    ///
    /// An absent or unresolvable operand is *no constraint*: the other
    /// operand is returned. Both absent yields `None`.
    pub fn min_code(&self, a: Option<&str>, b: Option<&str>) -> Option<&PermissionCode> {
        let a = a.and_then(|raw| self.normalize(raw));
        let b = b.and_then(|raw| self.normalize(raw));
        match (a, b) {
            (Some(a), Some(b)) => Some(if a.level <= b.level { a } else { b }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}
