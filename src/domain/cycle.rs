//! Per-cycle state owned by the controller.
//!
//! A cycle is one full sweep over every price window. Its context is built
//! fresh at cycle start and dropped at cycle end; nothing here is persisted,
//! so an item seen in cycle N is emitted again in cycle N+1 (price history).

use chrono::{DateTime, Local};
use std::collections::HashSet;

/// Tracks the normalized identities already emitted in the active cycle.
#[derive(Debug, Default)]
pub struct CycleDeduplicator {
    seen_identities: HashSet<String>,
}

impl CycleDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time an identity is offered, `false` afterwards.
    pub fn admit(&mut self, identity: &str) -> bool {
        if self.seen_identities.contains(identity) {
            return false;
        }
        self.seen_identities.insert(identity.to_owned())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.seen_identities.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.seen_identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_identities.is_empty()
    }
}

#[derive(Debug)]
pub struct CycleContext {
    pub cycle_id: u64,
    pub started_at: DateTime<Local>,
    pub deduplicator: CycleDeduplicator,
}

impl CycleContext {
    pub fn new(cycle_id: u64) -> Self {
        Self {
            cycle_id,
            started_at: Local::now(),
            deduplicator: CycleDeduplicator::new(),
        }
    }
}
