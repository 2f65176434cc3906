//! Shared access to the one process-wide [`PlanningScene`].
//!
//! Readers either hold a [`LockedSceneRead`] for as long as they need a
//! consistent scene, or take a [`SceneSnapshot`], which copies the state and
//! releases the lock before returning. Writers go through
//! [`PlanningSceneMonitor::update_scene`].

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use kinematics::{RobotModel, RobotState};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::planning_scene::PlanningScene;
use crate::transforms::FrameTransforms;

pub struct PlanningSceneMonitor {
    robot_model: Arc<RobotModel>,
    scene: RwLock<PlanningScene>,
    read_acquisitions: AtomicU64,
    write_acquisitions: AtomicU64,
}

impl PlanningSceneMonitor {
    pub fn new(scene: PlanningScene) -> Self {
        Self {
            robot_model: Arc::clone(scene.robot_model()),
            scene: RwLock::new(scene),
            read_acquisitions: AtomicU64::new(0),
            write_acquisitions: AtomicU64::new(0),
        }
    }

    /// The model never changes, so it is available without locking.
    pub fn robot_model(&self) -> &Arc<RobotModel> {
        &self.robot_model
    }

    /// Shared read access until the returned guard is dropped or released.
    pub fn lock_scene_read(&self) -> LockedSceneRead<'_> {
        let guard = self.scene.read();
        self.read_acquisitions.fetch_add(1, Ordering::Relaxed);
        LockedSceneRead { guard }
    }

    /// Copy the current state and frames; the lock is released on return.
    pub fn snapshot(&self) -> SceneSnapshot {
        let scene = self.lock_scene_read();
        SceneSnapshot {
            state: scene.current_state().clone(),
            transforms: scene.shared_transforms(),
        }
    }

    pub fn current_state(&self) -> RobotState {
        self.lock_scene_read().current_state().clone()
    }

    /// Run `f` with exclusive access to the scene.
    pub fn update_scene<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PlanningScene) -> R,
    {
        let mut scene = self.scene.write();
        self.write_acquisitions.fetch_add(1, Ordering::Relaxed);
        f(&mut scene)
    }

    /// Like [`update_scene`](Self::update_scene), but gives up after `timeout`.
    pub fn try_update_scene_for<F, R>(&self, timeout: Duration, f: F) -> Option<R>
    where
        F: FnOnce(&mut PlanningScene) -> R,
    {
        let mut scene = self.scene.try_write_for(timeout)?;
        self.write_acquisitions.fetch_add(1, Ordering::Relaxed);
        Some(f(&mut scene))
    }

    /// Number of read locks taken so far (guards and snapshots).
    pub fn read_acquisitions(&self) -> u64 {
        self.read_acquisitions.load(Ordering::Relaxed)
    }

    pub fn write_acquisitions(&self) -> u64 {
        self.write_acquisitions.load(Ordering::Relaxed)
    }
}

/// Scoped shared-read access to the scene.
pub struct LockedSceneRead<'a> {
    guard: RwLockReadGuard<'a, PlanningScene>,
}

impl LockedSceneRead<'_> {
    /// Give up read access. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Deref for LockedSceneRead<'_> {
    type Target = PlanningScene;

    fn deref(&self) -> &PlanningScene {
        &self.guard
    }
}

/// Request-private copy of what a reader needs, taken under a short lock.
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    pub state: RobotState,
    pub transforms: Arc<FrameTransforms>,
}
