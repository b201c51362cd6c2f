// crates/resilience/src/debounce.rs
//! Trailing-edge debouncing
//!
//! A [`Debouncer`] holds at most one pending value. Every `schedule` replaces the pending value
//! and restarts the quiet window, so only the last value of a burst is ever delivered.
//! With a max wait set, a burst that never goes quiet still fires no later than `max_wait`
//! after its first value was scheduled.
//! The debouncer is an owned object: dropping or cancelling it guarantees nothing fires later.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
    /// Latest instant this burst may fire at
    cap: Option<Instant>,
}

/// Owned trailing-edge debounce timer
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    max_wait: Option<Duration>,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    /// Creates a debouncer with the given quiet window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            max_wait: None,
            pending: None,
        }
    }

    /// Bounds how long a burst can postpone its first delivery
    ///
    /// A value pending for `max_wait` fires even if `schedule` keeps being called.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Returns the quiet window
    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Schedules `value` to fire one window from now, or at the burst's max wait if sooner
    ///
    /// Returns true if a pending value was superseded.
    pub fn schedule(&mut self, value: T) -> bool {
        let now = Instant::now();
        let (superseded, cap) = match self.pending.take() {
            Some(pending) => (true, pending.cap),
            None => (false, self.max_wait.map(|max_wait| now + max_wait)),
        };

        let quiet = now + self.window;
        let deadline = match cap {
            Some(cap) => quiet.min(cap),
            None => quiet,
        };
        self.pending = Some(Pending {
            value,
            deadline,
            cap,
        });
        superseded
    }

    /// Cancels the pending value, returning it if there was one
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    /// Returns true if a value is waiting for its window to elapse
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the instant the pending value will fire
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Resolves with the pending value once its window elapses
    ///
    /// Never resolves while nothing is scheduled. Cancel-safe: dropping the future before it
    /// resolves leaves the pending value in place, which makes it usable in `tokio::select!`.
    pub async fn fired(&mut self) -> T {
        loop {
            match self.deadline() {
                Some(deadline) => {
                    tokio::time::sleep_until(deadline).await;
                    if let Some(pending) = self.pending.take() {
                        return pending.value;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_window() {
        let mut debouncer = Debouncer::new(Duration::from_secs(2));
        let start = Instant::now();
        debouncer.schedule(7);

        let value = debouncer.fired().await;
        assert_eq!(value, 7);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_value_wins_and_window_restarts() {
        let mut debouncer = Debouncer::new(Duration::from_secs(2));
        let start = Instant::now();

        assert!(!debouncer.schedule(1));
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(debouncer.schedule(2));
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(debouncer.schedule(3));

        let value = debouncer.fired().await;
        assert_eq!(value, 3);
        assert!(start.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_bounds_a_burst_that_never_goes_quiet() {
        let mut debouncer =
            Debouncer::new(Duration::from_secs(2)).with_max_wait(Duration::from_secs(2));
        let start = Instant::now();

        debouncer.schedule(0);
        for value in 1..=3 {
            tokio::time::advance(Duration::from_millis(500)).await;
            debouncer.schedule(value);
        }
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_secs(2)));

        assert_eq!(debouncer.fired().await, 3);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_millis(2500));

        // The next burst gets a fresh cap
        let restart = Instant::now();
        debouncer.schedule(4);
        assert_eq!(debouncer.deadline(), Some(restart + Duration::from_secs(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_stream_fires_once_per_max_wait() {
        let mut debouncer =
            Debouncer::new(Duration::from_secs(2)).with_max_wait(Duration::from_millis(1900));
        let mut delivered = Vec::new();

        for value in 1..=20 {
            debouncer.schedule(value);
            let step = tokio::time::sleep(Duration::from_millis(500));
            tokio::pin!(step);
            loop {
                tokio::select! {
                    _ = &mut step => break,
                    fired = debouncer.fired() => delivered.push(fired),
                }
            }
        }

        assert_eq!(delivered, vec![4, 8, 12, 16, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.schedule("late");
        assert_eq!(debouncer.cancel(), Some("late"));
        assert_eq!(debouncer.cancel(), None);

        let result =
            tokio::time::timeout(Duration::from_secs(10), debouncer.fired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_pending_value() {
        let mut debouncer = Debouncer::new(Duration::from_secs(2));
        debouncer.schedule(5);

        let early = tokio::time::timeout(Duration::from_secs(1), debouncer.fired()).await;
        assert!(early.is_err());
        assert!(debouncer.is_pending());

        assert_eq!(debouncer.fired().await, 5);
    }

    #[test]
    fn test_deadline_tracks_schedule() {
        let mut debouncer: Debouncer<()> = Debouncer::new(Duration::from_secs(1));
        assert!(debouncer.deadline().is_none());
        debouncer.schedule(());
        assert!(debouncer.deadline().is_some());
        assert_eq!(debouncer.window(), Duration::from_secs(1));
        assert_eq!(debouncer.max_wait(), None);
    }
}
