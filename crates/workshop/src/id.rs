// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity newtypes and user-id generation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies one concurrent caller for the duration of a single occupancy
/// session (enter through leave). Stable across every internal park/resume.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one physical workplace; assigned once at construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkplaceId(pub String);

impl WorkplaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for WorkplaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints user identities
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> UserId;
}

/// UUID-based generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> UserId {
        UserId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Sequential generator for testing
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("user")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> UserId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        UserId::new(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
