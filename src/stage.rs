use std::sync::atomic::{AtomicU8, Ordering};

/// Handoff state of a slot.
///
/// Every slot cycles through these stages in strict order:
/// `Empty -> Loading -> Ready -> Running -> Done -> Empty`.
/// The publishing caller performs `Empty -> Loading -> Ready` and
/// `Done -> Empty`; the slot's dedicated worker performs
/// `Ready -> Running -> Done`. No other transitions exist.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Stage {
    Empty = 0,
    Loading = 1,
    Ready = 2,
    Running = 3,
    Done = 4,
}

impl Stage {
    pub(crate) fn from_raw(raw: u8) -> Stage {
        match raw {
            0 => Stage::Empty,
            1 => Stage::Loading,
            2 => Stage::Ready,
            3 => Stage::Running,
            4 => Stage::Done,
            // the atomic is only ever written with Stage discriminants
            _ => unreachable!("corrupt slot stage"),
        }
    }
}

// thin wrapper so the rest of the crate speaks Stage, not u8
pub(crate) struct AtomicStage(AtomicU8);

impl AtomicStage {
    pub(crate) const fn new(stage: Stage) -> Self {
        AtomicStage(AtomicU8::new(stage as u8))
    }

    #[inline]
    pub(crate) fn load(&self, order: Ordering) -> Stage {
        Stage::from_raw(self.0.load(order))
    }

    #[inline]
    pub(crate) fn store(&self, stage: Stage, order: Ordering) {
        self.0.store(stage as u8, order);
    }

    #[inline]
    pub(crate) fn compare_exchange(
        &self,
        current: Stage,
        new: Stage,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        self.0
            .compare_exchange(current as u8, new as u8, success, failure)
            .is_ok()
    }
}
