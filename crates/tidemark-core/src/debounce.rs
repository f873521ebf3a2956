//! Burst-collapsing debounce.
//!
//! `chat:list_update` pushes arrive in storms when many members change state
//! at once. Each push is a full snapshot, not a delta, so intermediate
//! payloads within a burst are legitimately droppable: only the last one
//! matters. [`Debouncer`] is the reusable form of that rule, replacing ad hoc
//! timer juggling per feature.

use std::time::Duration;

/// Trailing-edge debouncer: collapses bursts of offers within a window to
/// the last offered value.
///
/// Tick-driven rather than timer-driven so it works identically under real
/// and virtual clocks. `I` is any instant type whose difference is a
/// [`Duration`].
#[derive(Debug, Clone)]
pub struct Debouncer<T, I> {
    window: Duration,
    pending: Option<(T, I)>,
}

impl<T, I> Debouncer<T, I>
where
    I: Copy + Ord + std::ops::Sub<Output = Duration>,
{
    /// Create a debouncer with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Offer a value, replacing any value still pending and restarting the
    /// quiet window.
    pub fn offer(&mut self, value: T, now: I) {
        self.pending = Some((value, now));
    }

    /// Emit the pending value once the window has elapsed since the last
    /// offer. Returns `None` while still inside the window or when nothing
    /// is pending.
    pub fn poll(&mut self, now: I) -> Option<T> {
        match &self.pending {
            Some((_, offered_at)) if now - *offered_at >= self.window => {
                self.pending.take().map(|(value, _)| value)
            },
            _ => None,
        }
    }

    /// Whether a value is waiting for its window to elapse.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value immediately, ignoring the window. Used at
    /// teardown so a final snapshot is not lost.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tidemark_harness::SimEnv;

    use super::Debouncer;
    use tidemark_core::env::Environment;

    const WINDOW: Duration = Duration::from_millis(200);

    #[test]
    fn collapses_burst_to_last_value() {
        let env = SimEnv::with_seed(1);
        let mut debouncer = Debouncer::new(WINDOW);

        // Three offers within 50ms of each other
        debouncer.offer(1, env.now());
        env.advance(Duration::from_millis(25));
        debouncer.offer(2, env.now());
        env.advance(Duration::from_millis(25));
        debouncer.offer(3, env.now());

        // Still inside the window: nothing emitted
        env.advance(Duration::from_millis(100));
        assert_eq!(debouncer.poll(env.now()), None);

        // Window elapsed since the LAST offer: exactly one emission
        env.advance(Duration::from_millis(100));
        assert_eq!(debouncer.poll(env.now()), Some(3));
        assert_eq!(debouncer.poll(env.now()), None);
        assert!(!debouncer.is_armed());
    }

    #[test]
    fn each_offer_restarts_the_window() {
        let env = SimEnv::with_seed(1);
        let mut debouncer = Debouncer::new(WINDOW);

        debouncer.offer("a", env.now());
        env.advance(Duration::from_millis(150));
        debouncer.offer("b", env.now());
        env.advance(Duration::from_millis(150));
        // 300ms since "a" but only 150ms since "b"
        assert_eq!(debouncer.poll(env.now()), None);

        env.advance(Duration::from_millis(50));
        assert_eq!(debouncer.poll(env.now()), Some("b"));
    }

    #[test]
    fn flush_bypasses_the_window() {
        let env = SimEnv::with_seed(1);
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.offer(9, env.now());
        assert_eq!(debouncer.flush(), Some(9));
        assert_eq!(debouncer.flush(), None);
    }
}
