// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external workplace resource

use async_trait::async_trait;

/// A stateful resource whose action must never run concurrently with itself.
///
/// The coordinator guarantees at most one occupant per workplace, so `run` is
/// only ever invoked by the single user currently granted the workplace.
/// Implementations must not call back into the coordinator from `run`.
#[async_trait]
pub trait Workplace: Send + Sync {
    async fn run(&self);
}
