//! Identifier generation for nodes, edges, and branch rules.
//!
//! Identifiers are generated once at creation and never reused. The trait
//! boundary exists so tests can run with deterministic ids.

use std::sync::atomic::{AtomicU64, Ordering};

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Production generator backed by UUID v4.
#[derive(Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic generator for tests: `prefix-0`, `prefix-1`, ...
pub struct SequentialIdGenerator {
    pub prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, id)
    }
}
