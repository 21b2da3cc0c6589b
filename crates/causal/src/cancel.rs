//! Cooperative cancellation.
//!
//! Long-running loops poll a [`CancelToken`] once per outer iteration and
//! return their best committed result when it fires. Cloning a token shares
//! the underlying flag, so a caller can keep one clone and hand another to a
//! search running on a different thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
