use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_utils::Backoff;

use crate::denormal;
use crate::pool::Shared;
use crate::profiler::Transition;
use crate::task::Task;

pub(crate) fn spawn_worker(
    index: usize,
    shared: Arc<Shared>,
    name: String,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name).spawn(move || {
        if shared.denormal_as_zero {
            denormal::set_denormal_as_zero();
        }
        run(index, &shared);
    })
}

// worker i services slot i and nothing else; mutual exclusion on the task
// cell follows from this static ownership, not from locking
fn run(index: usize, shared: &Shared) {
    let slot = &shared.slots[index];
    let idle = shared.idle;
    let backoff = Backoff::new();
    let mut spins = 0u32;

    loop {
        if let Some(task) = slot.take_ready() {
            execute(index, shared, task);
            backoff.reset();
            spins = 0;
            continue;
        }

        if shared.is_shutdown() {
            // a task published just before the shutdown flag was raised may
            // only become visible after the flag does; the acquire load of
            // the flag orders the Ready store before this final poll
            if let Some(task) = slot.take_ready() {
                execute(index, shared, task);
            }
            break;
        }

        if spins < idle.max_spins {
            backoff.snooze();
            spins += 1;
        } else {
            thread::sleep(idle.sleep);
        }
    }
}

/// Turns an unwind into process termination. Armed before running a task,
/// defused with `mem::forget` once the task returns. A panic escaping a task
/// would otherwise strand its slot in `Running`, hang any caller barriering
/// on it, and lose the error in a discarded join result.
pub(crate) struct AbortOnUnwind;

impl Drop for AbortOnUnwind {
    fn drop(&mut self) {
        log::error!("task panicked inside the pool; aborting");
        std::process::abort();
    }
}

fn execute(index: usize, shared: &Shared, task: Task) {
    let slot = &shared.slots[index];
    shared.profiler.record(index, Transition::Started);
    let detached = task.is_detached();
    // kernels submitted to the pool must not fail; unwinding here is fatal
    let guard = AbortOnUnwind;
    // the publisher either barriers on Done before returning (borrowed) or
    // handed us ownership (detached)
    unsafe { task.run() };
    std::mem::forget(guard);
    // record before the releasing store so the event order matches the
    // per-slot transition order even under a racing publisher
    shared.profiler.record(index, Transition::Finished);
    slot.finish();
    if detached {
        // nobody will come back for a fire-and-forget slot
        shared.profiler.record(index, Transition::Reclaimed);
        slot.reclaim();
    }
}
