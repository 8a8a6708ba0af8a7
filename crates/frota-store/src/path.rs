//! # Store Paths
//!
//! Slash-separated addresses into the document tree, and the collection
//! layout used by Frota Rent.
//!
//! ```text
//! vehicles/{vehicleId}
//! contracts_active/{contractId}
//! contracts_terminated/{contractId}
//! damages/{contractId}
//! audit/{category}/{contractId}
//! ```
//!
//! Leading and trailing slashes are ignored. The empty path is the root;
//! it can be read and subscribed to but never written.

use std::fmt;

use crate::error::{StoreError, StoreResult};

pub const VEHICLES: &str = "vehicles";
pub const CONTRACTS_ACTIVE: &str = "contracts_active";
pub const CONTRACTS_TERMINATED: &str = "contracts_terminated";
pub const DAMAGES: &str = "damages";
pub const AUDIT: &str = "audit";

/// Characters a key may not contain.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

// =============================================================================
// StorePath
// =============================================================================

/// A validated path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn root() -> Self {
        StorePath {
            segments: Vec::new(),
        }
    }

    /// Parses `raw`, rejecting empty inner segments and forbidden characters.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            validate_segment(raw, segment)?;
            segments.push(segment.to_string());
        }
        Ok(StorePath { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, the key of the node.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<StorePath> {
        if self.is_root() {
            return None;
        }
        Some(StorePath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, key: &str) -> StoreResult<StorePath> {
        let mut child = self.clone();
        for segment in key.trim_matches('/').split('/') {
            validate_segment(key, segment)?;
            child.segments.push(segment.to_string());
        }
        Ok(child)
    }

    /// Strict ancestor test: `a/b` is an ancestor of `a/b/c`, not of itself.
    pub fn is_ancestor_of(&self, other: &StorePath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// True when one path is equal to or contains the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }

    /// Segments of `self` below `ancestor`; empty when equal.
    pub fn relative_to<'a>(&'a self, ancestor: &StorePath) -> &'a [String] {
        &self.segments[ancestor.segments.len().min(self.segments.len())..]
    }

    /// Every strict ancestor except the root, shortest first.
    pub fn ancestors(&self) -> impl Iterator<Item = StorePath> + '_ {
        (1..self.segments.len()).map(move |n| StorePath {
            segments: self.segments[..n].to_vec(),
        })
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

fn validate_segment(raw: &str, segment: &str) -> StoreResult<()> {
    if segment.trim().is_empty() {
        return Err(StoreError::invalid_path(raw, "empty segment"));
    }
    if let Some(c) = segment.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
        return Err(StoreError::invalid_path(
            raw,
            format!("segment '{}' contains '{}'", segment, c.escape_default()),
        ));
    }
    Ok(())
}

// =============================================================================
// Collection Paths
// =============================================================================

pub fn vehicle(id: &str) -> String {
    format!("{}/{}", VEHICLES, id)
}

pub fn active_contract(id: &str) -> String {
    format!("{}/{}", CONTRACTS_ACTIVE, id)
}

pub fn terminated_contract(id: &str) -> String {
    format!("{}/{}", CONTRACTS_TERMINATED, id)
}

pub fn damage_record(contract_id: &str) -> String {
    format!("{}/{}", DAMAGES, contract_id)
}

pub fn audit_category(category: &str) -> String {
    format!("{}/{}", AUDIT, category)
}

pub fn audit_entry(category: &str, id: &str) -> String {
    format!("{}/{}/{}", AUDIT, category, id)
}

// =============================================================================
// Unit Tests
// =============================================================================
