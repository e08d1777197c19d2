//! Cooperative cancellation shared between the caller and the driver.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Flags {
    stop_after_level: AtomicBool,
    cancelled: AtomicBool,
}

/// Cheap cloneable handle for stopping a running search.
///
/// * [`CancelToken::stop_after_level`] lets the current level finish and
///   skips any further refinement.
/// * [`CancelToken::cancel`] abandons the current level: pending points are
///   skipped and results that arrive afterwards are discarded. Evaluations
///   already running are not interrupted; the driver's `run` returns once
///   they come back.
#[derive(Clone, Default, Debug)]
pub struct CancelToken(Arc<Flags>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn stop_after_level(&self) {
        self.0.stop_after_level.store(true, Ordering::Release);
    }

    /// Hard stop. Does not interrupt an evaluator call in progress; its
    /// result is dropped when it returns.
    #[inline]
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }

    /// True after either kind of stop request.
    #[inline]
    pub fn is_stop_requested(&self) -> bool {
        self.is_cancelled() || self.0.stop_after_level.load(Ordering::Acquire)
    }
}

impl PartialEq for CancelToken {
    /// Equality is based on identity (same underlying Arc), not current value.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CancelToken {}

impl fmt::Display for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CancelToken(stop requested: {}, cancelled: {})",
            self.is_stop_requested(),
            self.is_cancelled()
        )
    }
}
