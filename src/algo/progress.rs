//! Progress reporting and cancellation for long-running algorithms.
//!
//! Algorithms report once per outer iteration and check
//! [`Progress::is_cancelled`] at the same granularity; inner loops are never
//! interrupted.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use halfmesh::algo::progress::Progress;
//!
//! let stop = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&stop);
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! })
//! .with_cancel(move || flag.load(Ordering::Relaxed));
//!
//! assert!(!progress.is_cancelled());
//! stop.store(true, Ordering::Relaxed);
//! assert!(progress.is_cancelled());
//! ```

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step (0-based)
/// - `total`: Total number of steps
/// - `message`: Description of the current operation
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
    cancel: Option<Box<dyn Fn() -> bool + Send + Sync>>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            cancel: None,
        }
    }

    /// Attach a cancellation check, polled by [`is_cancelled`](Self::is_cancelled).
    pub fn with_cancel<F>(mut self, cancel: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.cancel = Some(Box::new(cancel));
        self
    }

    /// Whether the caller asked to stop.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|cancel| cancel())
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Report progress within a sub-range.
    ///
    /// Maps progress from `[0, sub_total]` to `[range_current, range_current + 1]`
    /// within a total of `range_total` steps. This enables hierarchical progress
    /// where sub-operations report their progress within an allocated slice.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // 10 outer iterations; report the smoothing sub-step of iteration 3.
    /// progress.report_sub(sub_iteration, 5, 3, 10, "Tangential smoothing");
    /// ```
    #[inline]
    pub fn report_sub(
        &self,
        sub_current: usize,
        sub_total: usize,
        range_current: usize,
        range_total: usize,
        message: &str,
    ) {
        if sub_total == 0 || range_total == 0 {
            return;
        }
        // Map sub-progress to the range [range_current, range_current + 1)
        // Using fixed-point math to avoid floating point: multiply by 1000 for precision
        let sub_fraction = (sub_current * 1000) / sub_total;
        let effective = range_current * 1000 + sub_fraction;
        let total_scaled = range_total * 1000;
        (self.callback)(effective, total_scaled, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_report_sub_scales_into_range() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |c, t, _| sink.lock().unwrap().push((c, t)));

        progress.report_sub(1, 2, 3, 10, "half of step 3");
        progress.report_sub(1, 0, 3, 10, "ignored");
        assert_eq!(*seen.lock().unwrap(), vec![(3500, 10000)]);
    }

    #[test]
    fn test_none_is_not_cancelled() {
        assert!(!Progress::none().is_cancelled());
        assert!(Progress::none().with_cancel(|| true).is_cancelled());
    }
}
