use std::time::{Duration, Instant};

/// Repeating refresh schedule owned by the view that displays drop state.
///
/// The next cycle is scheduled one interval after the previous one
/// completes, so slow refreshes never overlap. A stopped timer is never due.
#[derive(Clone, Debug)]
pub struct RefreshTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl RefreshTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts the schedule with an immediate first cycle.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn due(&self, now: Instant) -> bool {
        self.next_due.map(|at| now >= at).unwrap_or(false)
    }

    /// Marks the current cycle finished and schedules the next one.
    pub fn complete(&mut self, now: Instant) {
        if self.is_running() {
            self.next_due = Some(now + self.interval);
        }
    }

    /// Pulls the next cycle forward to `now` without changing the interval.
    pub fn trigger(&mut self, now: Instant) {
        if self.is_running() {
            self.next_due = Some(now);
        }
    }

    /// How long an event loop may block before the next cycle is due.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|at| at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_timer_is_never_due() {
        let timer = RefreshTimer::new(Duration::from_secs(20));
        let now = Instant::now();
        assert!(!timer.is_running());
        assert!(!timer.due(now + Duration::from_secs(3600)));
        assert_eq!(timer.time_until_due(now), None);
    }

    #[test]
    fn test_first_cycle_runs_immediately() {
        let mut timer = RefreshTimer::new(Duration::from_secs(20));
        let now = Instant::now();
        timer.start(now);
        assert!(timer.due(now));
        assert_eq!(timer.time_until_due(now), Some(Duration::ZERO));
    }

    #[test]
    fn test_reschedules_after_completion() {
        let mut timer = RefreshTimer::new(Duration::from_secs(20));
        let start = Instant::now();
        timer.start(start);

        // A slow cycle finishing 5s late pushes the next one out from completion.
        let finished = start + Duration::from_secs(5);
        timer.complete(finished);
        assert!(!timer.due(start + Duration::from_secs(20)));
        assert!(timer.due(finished + Duration::from_secs(20)));
        assert_eq!(
            timer.time_until_due(finished + Duration::from_secs(15)),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_stop_cancels_pending_cycle() {
        let mut timer = RefreshTimer::new(Duration::from_secs(20));
        let now = Instant::now();
        timer.start(now);
        timer.complete(now);
        timer.stop();
        assert!(!timer.due(now + Duration::from_secs(60)));
        timer.complete(now);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_trigger_pulls_cycle_forward() {
        let mut timer = RefreshTimer::new(Duration::from_secs(20));
        let now = Instant::now();
        timer.start(now);
        timer.complete(now);
        assert!(!timer.due(now + Duration::from_secs(1)));
        timer.trigger(now + Duration::from_secs(1));
        assert!(timer.due(now + Duration::from_secs(1)));
    }
}
