//! Per-session monotonic timestamp filter.

use crate::domain::errors::FrameError;

/// Keeps the last accepted frame timestamp of one session.
///
/// Equal timestamps pass so a repeated frame is tolerated; only a strictly
/// older timestamp is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceGuard {
    last: u32,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `candidate` if it is not older than the last accepted timestamp
    pub fn accept(&mut self, candidate: u32) -> bool {
        if candidate < self.last {
            return false;
        }
        self.last = candidate;
        true
    }

    /// Same as [`accept`](Self::accept), reporting the rejection as an error
    pub fn check(&mut self, candidate: u32) -> Result<(), FrameError> {
        let last = self.last;
        if self.accept(candidate) {
            Ok(())
        } else {
            Err(FrameError::StaleFrame { last, candidate })
        }
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    /// Forget the stored timestamp (session teardown)
    pub fn reset(&mut self) {
        self.last = 0;
    }
}
