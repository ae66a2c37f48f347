use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A stage transition observed on a slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Transition {
    Claimed,
    Published,
    Started,
    Finished,
    Reclaimed,
}

impl Transition {
    fn name(self) -> &'static str {
        match self {
            Transition::Claimed => "claimed",
            Transition::Published => "published",
            Transition::Started => "started",
            Transition::Finished => "finished",
            Transition::Reclaimed => "reclaimed",
        }
    }
}

struct Event {
    slot: usize,
    transition: Transition,
    at: Duration,
}

struct Window {
    started: Option<Instant>,
    events: Vec<Event>,
}

/// Optional instrumentation bracketing a measurement window.
///
/// Disabled is the steady state: recording then costs one relaxed atomic
/// load, no allocation and no syscalls. The enabled path takes a mutex and
/// may allocate, which is acceptable inside an explicit profiling window.
pub(crate) struct Profiler {
    enabled: AtomicBool,
    window: Mutex<Window>,
}

impl Profiler {
    pub(crate) fn new() -> Self {
        Profiler {
            enabled: AtomicBool::new(false),
            window: Mutex::new(Window {
                started: None,
                events: Vec::new(),
            }),
        }
    }

    pub(crate) fn start(&self) {
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        window.events.clear();
        window.started = Some(Instant::now());
        self.enabled.store(true, Ordering::Release);
    }

    pub(crate) fn stop(&self) -> String {
        self.enabled.store(false, Ordering::Release);
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        let elapsed = match window.started.take() {
            Some(started) => started.elapsed(),
            None => return String::from("profiling was never started"),
        };

        let mut report = String::new();
        let _ = writeln!(
            report,
            "profiled {:?}: {} slot events",
            elapsed,
            window.events.len()
        );
        let slot_count = window
            .events
            .iter()
            .map(|e| e.slot + 1)
            .max()
            .unwrap_or(0);
        for slot in 0..slot_count {
            let count = |t: Transition| {
                window
                    .events
                    .iter()
                    .filter(|e| e.slot == slot && e.transition == t)
                    .count()
            };
            let _ = writeln!(
                report,
                "slot {}: claimed {} published {} started {} finished {} reclaimed {}",
                slot,
                count(Transition::Claimed),
                count(Transition::Published),
                count(Transition::Started),
                count(Transition::Finished),
                count(Transition::Reclaimed),
            );
        }
        for event in &window.events {
            let _ = writeln!(
                report,
                "{:?} slot {} {}",
                event.at,
                event.slot,
                event.transition.name()
            );
        }
        window.events.clear();
        report
    }

    #[inline]
    pub(crate) fn record(&self, slot: usize, transition: Transition) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        self.record_enabled(slot, transition);
    }

    #[cold]
    fn record_enabled(&self, slot: usize, transition: Transition) {
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(started) = window.started {
            let at = started.elapsed();
            window.events.push(Event {
                slot,
                transition,
                at,
            });
        }
    }
}
