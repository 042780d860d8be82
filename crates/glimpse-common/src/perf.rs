//! Timing for hot paths.

use std::time::{Duration, Instant};

/// Logs how long a scope took when dropped.
///
/// Runs at `debug`, or at `warn` once past the threshold set with
/// [`TimingGuard::warn_after`].
#[must_use = "the guard measures until it is dropped"]
pub struct TimingGuard {
    label: &'static str,
    start: Instant,
    warn_after: Option<Duration>,
}

impl TimingGuard {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
            warn_after: None,
        }
    }

    pub fn warn_after(mut self, threshold: Duration) -> Self {
        self.warn_after = Some(threshold);
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_slow(&self) -> bool {
        self.warn_after
            .is_some_and(|threshold| self.elapsed() > threshold)
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed().as_secs_f64() * 1000.0;
        if self.is_slow() {
            tracing::warn!(target: "glimpse::perf", elapsed_ms, "slow {}", self.label);
        } else {
            tracing::debug!(target: "glimpse::perf", elapsed_ms, "{}", self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_threshold_is_never_slow() {
        let guard = TimingGuard::new("pass");
        std::thread::sleep(Duration::from_millis(2));
        assert!(guard.elapsed() >= Duration::from_millis(2));
        assert!(!guard.is_slow());
    }

    #[test]
    fn threshold_marks_slow_scopes() {
        let guard = TimingGuard::new("pass").warn_after(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(1));
        assert!(guard.is_slow());

        let guard = TimingGuard::new("pass").warn_after(Duration::from_secs(3600));
        assert!(!guard.is_slow());
    }
}
