//! Progress reporting for long voxelization runs

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::math::Axis;

/// Pipeline stage a progress update belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Classify,
    GapFill(Axis),
}

/// Snapshot of completed work within one phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completed fraction in `[0, 1]`
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// Receives progress updates from worker threads.
///
/// Updates are sent once per finished batch and may arrive from any worker,
/// so `completed` is not guaranteed to increase between two calls.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Observer that discards every update
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _progress: Progress) {}
}

/// Shared completion counter for one phase
pub(crate) struct ProgressTracker<'a> {
    phase: Phase,
    total: usize,
    completed: AtomicUsize,
    observer: &'a dyn ProgressObserver,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(phase: Phase, total: usize, observer: &'a dyn ProgressObserver) -> Self {
        Self {
            phase,
            total,
            completed: AtomicUsize::new(0),
            observer,
        }
    }

    /// Record `count` finished items and notify the observer
    pub fn advance(&self, count: usize) {
        let completed = self.completed.fetch_add(count, Ordering::Relaxed) + count;
        self.observer.on_progress(Progress {
            phase: self.phase,
            completed,
            total: self.total,
        });
    }
}
