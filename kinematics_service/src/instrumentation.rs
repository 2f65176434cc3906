//! Timing and event hooks around the service's expensive steps.
//!
//! Hooks observe; they never change what a request returns.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Block names reported by the service.
pub mod blocks {
    pub const COMPUTE_IK: &str = "compute_ik";
    pub const COMPUTE_FK: &str = "compute_fk";
    pub const SCENE_READ_LOCK: &str = "scene_read_lock";
    pub const IK_SOLVE: &str = "ik_solve";
}

/// Event names reported by the service.
pub mod events {
    pub const REJECTED_REQUEST: &str = "rejected_request";
    pub const HELD_LOCK_SOLVE: &str = "held_lock_solve";
    pub const SNAPSHOT_SOLVE: &str = "snapshot_solve";
}

pub trait Instrumentation: Send + Sync {
    fn begin(&self, _block: &'static str) {}

    fn end(&self, _block: &'static str, _elapsed: Duration) {}

    fn event(&self, _name: &'static str) {}
}

impl dyn Instrumentation + '_ {
    /// Report `block` as begun now and ended when the guard drops.
    pub fn scoped(&self, block: &'static str) -> ScopedBlock<'_> {
        self.begin(block);
        ScopedBlock {
            instrumentation: self,
            block,
            started: Instant::now(),
        }
    }
}

pub struct ScopedBlock<'a> {
    instrumentation: &'a dyn Instrumentation,
    block: &'static str,
    started: Instant,
}

impl Drop for ScopedBlock<'_> {
    fn drop(&mut self) {
        self.instrumentation
            .end(self.block, self.started.elapsed());
    }
}

#[derive(Debug, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

/// Aggregates counts and durations per name.
#[derive(Debug, Default)]
pub struct CountingInstrumentation {
    events: Mutex<HashMap<&'static str, u64>>,
    blocks: Mutex<HashMap<&'static str, BlockStats>>,
}

impl CountingInstrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self, name: &str) -> u64 {
        self.events.lock().get(name).copied().unwrap_or(0)
    }

    pub fn block(&self, name: &str) -> BlockStats {
        self.blocks.lock().get(name).copied().unwrap_or_default()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
        self.blocks.lock().clear();
    }
}

impl Instrumentation for CountingInstrumentation {
    fn end(&self, block: &'static str, elapsed: Duration) {
        let mut blocks = self.blocks.lock();
        let stats = blocks.entry(block).or_default();
        stats.count += 1;
        stats.total += elapsed;
        stats.max = stats.max.max(elapsed);
    }

    fn event(&self, name: &'static str) {
        *self.events.lock().entry(name).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn scoped_block_records_on_drop() {
        let counting = CountingInstrumentation::new();
        let instrumentation: &dyn Instrumentation = &counting;
        {
            let _block = instrumentation.scoped(blocks::IK_SOLVE);
            thread::sleep(Duration::from_millis(5));
            assert_eq!(counting.block(blocks::IK_SOLVE).count, 0);
        }
        let stats = counting.block(blocks::IK_SOLVE);
        assert_eq!(stats.count, 1);
        assert!(stats.total >= Duration::from_millis(5));
        assert_eq!(stats.max, stats.total);
    }

    #[test]
    fn events_accumulate_until_cleared() {
        let counting = CountingInstrumentation::new();
        counting.event(events::SNAPSHOT_SOLVE);
        counting.event(events::SNAPSHOT_SOLVE);
        assert_eq!(counting.event_count(events::SNAPSHOT_SOLVE), 2);
        assert_eq!(counting.event_count(events::HELD_LOCK_SOLVE), 0);
        counting.clear();
        assert_eq!(counting.event_count(events::SNAPSHOT_SOLVE), 0);
    }
}
