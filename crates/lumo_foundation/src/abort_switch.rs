//! Cooperative cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, level-triggered abort flag.
///
/// Cloning an `AbortSwitch` yields another handle to the *same* flag, so a
/// render controller, every worker thread and every long-running job can
/// hold one. Once aborted, the switch stays aborted until [`clear`] is
/// called at the start of the next run.
///
/// [`clear`]: AbortSwitch::clear
#[derive(Debug, Clone, Default)]
pub struct AbortSwitch {
    aborted: Arc<AtomicBool>,
}

impl AbortSwitch {
    /// Create a cleared switch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the switch for a fresh run.
    pub fn clear(&self) {
        self.aborted.store(false, Ordering::Release);
    }

    /// Request cancellation.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// True if both handles refer to the same flag.
    pub fn same_switch(&self, other: &AbortSwitch) -> bool {
        Arc::ptr_eq(&self.aborted, &other.aborted)
    }
}
