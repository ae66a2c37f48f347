use std::cell::UnsafeCell;
use std::sync::atomic::Ordering;

use crate::stage::{AtomicStage, Stage};
use crate::task::Task;

/// Fixed per-worker mailbox holding at most one pending task.
///
/// Synchronized purely through the atomic stage field. Publishers serialize
/// among themselves with the `Empty -> Loading` compare-exchange; the owning
/// worker needs no claim step because no other thread ever consumes this
/// slot. The release-store of `Ready` publishes the task cell write, and the
/// worker's acquire-load covers the read. The slot itself is padded to a full
/// cache line by its container so neighbouring stage fields never share one.
pub(crate) struct Slot {
    stage: AtomicStage,
    task: UnsafeCell<Option<Task>>,
}

// the task cell is only touched by the claiming publisher (Loading) or the
// owning worker (Ready), never both, so shared references are sound
unsafe impl Sync for Slot {}

impl Slot {
    pub(crate) fn new() -> Self {
        Slot {
            stage: AtomicStage::new(Stage::Empty),
            task: UnsafeCell::new(None),
        }
    }

    #[inline]
    pub(crate) fn stage(&self) -> Stage {
        self.stage.load(Ordering::Acquire)
    }

    /// Attempt the publisher claim, `Empty -> Loading`. On success the caller
    /// owns the task cell until it publishes.
    #[inline]
    pub(crate) fn try_claim(&self) -> bool {
        self.stage
            .compare_exchange(Stage::Empty, Stage::Loading, Ordering::Acquire, Ordering::Relaxed)
    }

    /// Write the task and release it to the worker, `Loading -> Ready`.
    ///
    /// # Safety
    /// The calling thread must hold the claim from a successful [`try_claim`].
    pub(crate) unsafe fn publish(&self, task: Task) {
        unsafe { *self.task.get() = Some(task) };
        self.stage.store(Stage::Ready, Ordering::Release);
    }

    /// Worker-side poll: on `Ready`, transition to `Running` and take the
    /// task. Only the slot's dedicated worker may call this.
    #[inline]
    pub(crate) fn take_ready(&self) -> Option<Task> {
        if self.stage.load(Ordering::Acquire) != Stage::Ready {
            return None;
        }
        self.stage.store(Stage::Running, Ordering::Relaxed);
        let task = unsafe { (*self.task.get()).take() };
        debug_assert!(task.is_some(), "ready slot without a task");
        task
    }

    /// Worker-side completion, `Running -> Done`.
    #[inline]
    pub(crate) fn finish(&self) {
        self.stage.store(Stage::Done, Ordering::Release);
    }

    /// Return a `Done` slot to `Empty` for reuse. Called by the publisher
    /// after its barrier, or by the worker itself for detached tasks (no
    /// publisher will ever come back for those).
    #[inline]
    pub(crate) fn reclaim(&self) {
        debug_assert_eq!(self.stage(), Stage::Done);
        self.stage.store(Stage::Empty, Ordering::Release);
    }
}
