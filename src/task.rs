use std::mem::ManuallyDrop;

// task function signature, takes a raw pointer to the call's context
pub(crate) type RawCall = unsafe fn(*const ());

/// A single-use invocable stored in a slot.
///
/// Two flavours share one representation:
/// - borrowed: `param` points into the publishing caller's stack. Sound
///   because every blocking dispatch barriers on `Done` for all of its
///   published slots before returning, so the pointee outlives the worker's
///   call.
/// - detached: `param` owns a boxed `FnOnce` created by [`Task::detached`];
///   the trampoline reconstitutes and consumes the box.
pub(crate) struct Task {
    param: *const (),
    call: RawCall,
    // frees `param` if the task is dropped without ever running
    drop_fn: Option<unsafe fn(*const ())>,
    detached: bool,
}

// tasks cross exactly one thread boundary, publisher to owning worker,
// under the slot's release/acquire handoff
unsafe impl Send for Task {}

impl Task {
    /// Wrap a pointer into the caller's stack. The caller must keep the
    /// pointee alive until it has observed `Done` on the slot.
    pub(crate) fn borrowed(param: *const (), call: RawCall) -> Self {
        Task {
            param,
            call,
            drop_fn: None,
            detached: false,
        }
    }

    /// Take ownership of a fire-and-forget closure.
    pub(crate) fn detached(f: Box<dyn FnOnce() + Send>) -> Self {
        // double-box so `param` stays a thin pointer
        let raw = Box::into_raw(Box::new(f)) as *const ();
        Task {
            param: raw,
            call: run_detached,
            drop_fn: Some(drop_detached),
            detached: true,
        }
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.detached
    }

    /// Execute the task, consuming it.
    ///
    /// # Safety
    /// For borrowed tasks the pointee must still be alive; the slot handoff
    /// protocol guarantees this for every published task.
    pub(crate) unsafe fn run(self) {
        let task = ManuallyDrop::new(self);
        unsafe { (task.call)(task.param) };
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        // only reached when a task was published but never executed,
        // e.g. a slot torn down right after a shutdown race
        if let Some(drop_fn) = self.drop_fn {
            unsafe { drop_fn(self.param) };
        }
    }
}

unsafe fn run_detached(param: *const ()) {
    let f = unsafe { Box::from_raw(param as *mut Box<dyn FnOnce() + Send>) };
    f();
}

unsafe fn drop_detached(param: *const ()) {
    drop(unsafe { Box::from_raw(param as *mut Box<dyn FnOnce() + Send>) });
}

/// One contiguous chunk of a range-parallel call, laid out on the caller's
/// stack and published by pointer.
pub(crate) struct RangeCall<F> {
    pub(crate) start: u64,
    pub(crate) end: u64,
    pub(crate) f: *const F,
}

pub(crate) unsafe fn range_trampoline<F: Fn(u64, u64) + Sync>(param: *const ()) {
    let call = unsafe { &*(param as *const RangeCall<F>) };
    unsafe { (*call.f)(call.start, call.end) };
}
