use chrono::{DateTime, Duration, Utc};

use quml_core::time::{as_millis, millis};

/// Edge-triggered session timer notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Warning { remaining_ms: u64 },
    Expired,
}

/// Session duration tracking against a hard limit.
///
/// The timer is deadline based: it never runs on its own, callers poll it
/// with the current instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerController {
    total_ms: u64,
    warning_ms: Option<u64>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    warned: bool,
    expired: bool,
}

impl TimerController {
    #[must_use]
    pub fn new(total_ms: u64, warning_ms: Option<u64>) -> Self {
        Self {
            total_ms,
            warning_ms,
            started_at: None,
            stopped_at: None,
            warned: false,
            expired: false,
        }
    }

    /// Record the start instant. Later calls are ignored.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
            tracing::debug!(total_ms = self.total_ms, "session timer started");
        }
    }

    /// Freeze elapsed time, e.g. when the session ends.
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_some() && self.stopped_at.is_none() {
            self.stopped_at = Some(now);
        }
    }

    /// Back to the never-started state.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.stopped_at = None;
        self.warned = false;
        self.expired = false;
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.expired
    }

    #[must_use]
    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    #[must_use]
    pub fn warning_ms(&self) -> Option<u64> {
        self.warning_ms
    }

    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.started_at {
            Some(start) => {
                let end = self.stopped_at.unwrap_or(now);
                (end - start).max(Duration::zero())
            }
            None => Duration::zero(),
        }
    }

    #[must_use]
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        as_millis(self.elapsed(now))
    }

    /// Time left before the hard limit, clamped at zero.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (millis(self.total_ms) - self.elapsed(now)).max(Duration::zero())
    }

    #[must_use]
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        as_millis(self.remaining(now))
    }

    /// Events that became due since the last poll; each fires at most once
    /// per run. Nothing fires before `start` or after `stop`.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }

        let remaining_ms = self.remaining_ms(now);
        if let Some(warning_ms) = self.warning_ms {
            if !self.warned && remaining_ms <= warning_ms {
                self.warned = true;
                events.push(TimerEvent::Warning { remaining_ms });
            }
        }
        if !self.expired && remaining_ms == 0 {
            self.expired = true;
            events.push(TimerEvent::Expired);
        }
        events
    }
}

/// Single-owner cancellable deadline.
///
/// Scheduling always cancels whatever was pending first, so at most one
/// action is ever armed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled<T> {
    slot: Option<(DateTime<Utc>, T)>,
}

impl<T> Default for Scheduled<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> Scheduled<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `action` for `at`, returning the action it displaced.
    pub fn schedule(&mut self, at: DateTime<Utc>, action: T) -> Option<T> {
        let displaced = self.cancel();
        self.slot = Some((at, action));
        displaced
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.slot.take().map(|(_, action)| action)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.slot.as_ref().map(|(at, _)| *at)
    }

    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.slot.as_ref().map(|(_, action)| action)
    }

    /// Disarm and return the action if its deadline has passed.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<T> {
        match &self.slot {
            Some((at, _)) if *at <= now => self.cancel(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quml_core::time::fixed_now;

    #[test]
    fn start_is_idempotent() {
        let t0 = fixed_now();
        let mut timer = TimerController::new(10_000, None);
        assert_eq!(timer.elapsed_ms(t0 + millis(500)), 0);
        timer.start(t0);
        timer.start(t0 + millis(3_000));
        assert_eq!(timer.elapsed_ms(t0 + millis(4_000)), 4_000);
    }

    #[test]
    fn remaining_clamps_at_zero() {
        let t0 = fixed_now();
        let mut timer = TimerController::new(1_000, None);
        timer.start(t0);
        assert_eq!(timer.remaining_ms(t0 + millis(400)), 600);
        assert_eq!(timer.remaining_ms(t0 + millis(5_000)), 0);
    }

    #[test]
    fn warning_and_expiry_fire_once() {
        let t0 = fixed_now();
        let mut timer = TimerController::new(10_000, Some(3_000));
        timer.start(t0);

        assert!(timer.poll(t0 + millis(6_000)).is_empty());
        assert_eq!(
            timer.poll(t0 + millis(7_500)),
            vec![TimerEvent::Warning { remaining_ms: 2_500 }]
        );
        assert!(timer.poll(t0 + millis(8_000)).is_empty());
        assert_eq!(timer.poll(t0 + millis(10_000)), vec![TimerEvent::Expired]);
        assert!(timer.poll(t0 + millis(20_000)).is_empty());
        assert!(timer.has_expired());
    }

    #[test]
    fn late_poll_reports_both_edges() {
        let t0 = fixed_now();
        let mut timer = TimerController::new(10_000, Some(3_000));
        timer.start(t0);
        assert_eq!(
            timer.poll(t0 + millis(12_000)),
            vec![
                TimerEvent::Warning { remaining_ms: 0 },
                TimerEvent::Expired
            ]
        );
    }

    #[test]
    fn stop_freezes_and_reset_rearms() {
        let t0 = fixed_now();
        let mut timer = TimerController::new(10_000, None);
        timer.start(t0);
        timer.stop(t0 + millis(2_000));
        assert_eq!(timer.elapsed_ms(t0 + millis(9_000)), 2_000);
        assert!(timer.poll(t0 + millis(50_000)).is_empty());

        timer.reset();
        assert!(!timer.is_started());
        timer.start(t0 + millis(60_000));
        assert_eq!(timer.elapsed_ms(t0 + millis(61_000)), 1_000);
    }

    #[test]
    fn scheduling_cancels_previous_action() {
        let t0 = fixed_now();
        let mut slot = Scheduled::new();
        assert_eq!(slot.schedule(t0 + millis(100), "first"), None);
        assert_eq!(slot.schedule(t0 + millis(200), "second"), Some("first"));
        assert_eq!(slot.take_due(t0 + millis(150)), None);
        assert_eq!(slot.take_due(t0 + millis(200)), Some("second"));
        assert!(!slot.is_armed());
    }
}
