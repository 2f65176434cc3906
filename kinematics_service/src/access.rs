//! How long a request holds the shared scene.
//!
//! Validity checks read the scene on every candidate, so a checked solve must
//! keep the read lock until the solver returns. Everything else copies what
//! it needs and lets writers in again right away.

use std::time::{Duration, Instant};

use scene::{LockedSceneRead, PlanningSceneMonitor, SceneSnapshot};

use crate::instrumentation::{Instrumentation, blocks};
use crate::msg::PositionIkRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Keep the read lock for the whole solve.
    HeldThroughSolve,
    /// Copy the state under the lock, then solve without it.
    SnapshotAndRelease,
}

impl LockPolicy {
    pub fn for_request(request: &PositionIkRequest) -> Self {
        if request.avoid_collisions || !request.constraints.is_empty() {
            Self::HeldThroughSolve
        } else {
            Self::SnapshotAndRelease
        }
    }
}

/// Read access to the monitor that reports slow lock acquisition.
pub struct SceneAccess<'a> {
    monitor: &'a PlanningSceneMonitor,
    instrumentation: &'a dyn Instrumentation,
    warn_after: Duration,
}

impl<'a> SceneAccess<'a> {
    pub fn new(
        monitor: &'a PlanningSceneMonitor,
        instrumentation: &'a dyn Instrumentation,
        warn_after: Duration,
    ) -> Self {
        Self {
            monitor,
            instrumentation,
            warn_after,
        }
    }

    /// Read lock held until the caller releases it.
    pub fn lock_read(&self) -> LockedSceneRead<'a> {
        self.timed(|monitor| monitor.lock_scene_read())
    }

    /// Private copy of the current state; the lock is already released.
    pub fn snapshot(&self) -> SceneSnapshot {
        self.timed(|monitor| monitor.snapshot())
    }

    fn timed<R>(&self, acquire: impl FnOnce(&'a PlanningSceneMonitor) -> R) -> R {
        let _block = self.instrumentation.scoped(blocks::SCENE_READ_LOCK);
        let started = Instant::now();
        let acquired = acquire(self.monitor);
        let waited = started.elapsed();
        if waited > self.warn_after {
            log::warn!("waited {waited:?} for the planning scene read lock");
        }
        acquired
    }
}
