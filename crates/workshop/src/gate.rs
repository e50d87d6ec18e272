// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot countdown gate for workplace handoff
//!
//! The coordinator wires a fresh gate pair for every occupancy transition; a
//! gate is never rearmed. A rotation of k users shares one gate with k
//! outstanding arrivals, which makes the ring a barrier.

use tokio::sync::watch;

/// A one-shot countdown gate.
///
/// Starts with a fixed number of outstanding arrivals; `wait` resolves once
/// every arrival has been recorded. Clones share the same count.
#[derive(Clone, Debug)]
pub(crate) struct Gate {
    remaining: watch::Sender<usize>,
}

impl Gate {
    /// A gate that requires `count` arrivals before it opens.
    pub(crate) fn new(count: usize) -> Self {
        let (tx, _) = watch::channel(count);
        Self { remaining: tx }
    }

    /// A gate that is already open.
    pub(crate) fn open() -> Self {
        Self::new(0)
    }

    /// Record one arrival. Arrivals beyond the initial count are no-ops.
    pub(crate) fn arrive(&self) {
        self.remaining.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Wait until every arrival has been recorded.
    pub(crate) async fn wait(&self) {
        let mut rx = self.remaining.subscribe();
        // The sender half lives in self, so the channel cannot close.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
