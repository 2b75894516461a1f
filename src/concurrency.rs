//! Re-entrancy guards for sort and filter passes
//!
//! Records and datasets carry one flag per long-running pass. A pass enters the
//! flag before touching any state; a second caller arriving while the flag is
//! held gets `None` back and must drop its request. Nothing is queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared busy flag
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    busy: Arc<AtomicBool>,
}

impl BusyFlag {
    /// Create a new, idle flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to mark the flag busy
    ///
    /// Returns a guard that clears the flag on drop, or `None` when another
    /// pass already holds it.
    pub fn try_enter(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                busy: self.busy.clone(),
            })
    }

    /// Whether a pass currently holds the flag
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Clears its [`BusyFlag`] when dropped
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
