use std::time::{Duration, Instant};

use crate::theme::ThemeId;

/// Trailing-edge debounce timer driven by caller-supplied instants.
#[derive(Debug)]
pub struct DebounceTimer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once the quiescence window has elapsed; disarms itself.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderAttempt {
    pub seq: u64,
    pub source: String,
    pub theme: ThemeId,
}

/// Issues at most one sequence-numbered attempt per quiescent period and
/// gates result application on the latest-issued watermark. A superseded
/// in-flight call is not aborted; its result is discarded on arrival.
#[derive(Debug)]
pub struct RenderController {
    timer: DebounceTimer,
    queued: Option<(String, ThemeId)>,
    next_seq: u64,
    watermark: u64,
}

impl RenderController {
    pub fn new(interval: Duration) -> Self {
        Self {
            timer: DebounceTimer::new(interval),
            queued: None,
            next_seq: 1,
            watermark: 0,
        }
    }

    pub fn note_change(&mut self, source: &str, theme: ThemeId, now: Instant) {
        self.queued = Some((source.to_string(), theme));
        self.timer.schedule(now);
    }

    /// Drop the pending attempt and invalidate in-flight results, so a
    /// cleared display is never overwritten by a pre-clear result.
    pub fn cancel_pending(&mut self) {
        self.queued = None;
        self.timer.cancel();
        self.watermark = 0;
    }

    pub fn has_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn poll(&mut self, now: Instant) -> Option<RenderAttempt> {
        if !self.timer.fire(now) {
            return None;
        }
        let (source, theme) = self.queued.take()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.watermark = seq;
        Some(RenderAttempt { seq, source, theme })
    }

    /// Issue the queued attempt immediately, skipping the remaining wait.
    pub fn flush(&mut self) -> Option<RenderAttempt> {
        self.timer.cancel();
        let (source, theme) = self.queued.take()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.watermark = seq;
        Some(RenderAttempt { seq, source, theme })
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq != 0 && seq == self.watermark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn timer_restarts_on_each_schedule() {
        let base = Instant::now();
        let mut timer = DebounceTimer::new(Duration::from_millis(500));
        timer.schedule(at(base, 0));
        assert!(!timer.fire(at(base, 400)));
        timer.schedule(at(base, 400));
        assert!(!timer.fire(at(base, 700)));
        assert!(timer.fire(at(base, 900)));
        // Disarmed after firing.
        assert!(!timer.fire(at(base, 2000)));
    }

    #[test]
    fn one_attempt_per_quiescent_period_with_final_text() {
        let base = Instant::now();
        let mut controller = RenderController::new(Duration::from_millis(500));
        controller.note_change("a", ThemeId::Notion, at(base, 0));
        controller.note_change("ab", ThemeId::Notion, at(base, 100));
        controller.note_change("abc", ThemeId::Notion, at(base, 200));

        assert!(controller.poll(at(base, 600)).is_none());
        let attempt = controller.poll(at(base, 700)).expect("attempt due");
        assert_eq!(attempt.source, "abc");
        assert_eq!(attempt.seq, 1);
        assert!(controller.poll(at(base, 5000)).is_none());
    }

    #[test]
    fn watermark_tracks_latest_issued() {
        let base = Instant::now();
        let mut controller = RenderController::new(Duration::from_millis(500));
        controller.note_change("a", ThemeId::Notion, at(base, 0));
        let first = controller.poll(at(base, 500)).unwrap();
        assert!(controller.is_current(first.seq));

        controller.note_change("b", ThemeId::Notion, at(base, 600));
        let second = controller.poll(at(base, 1100)).unwrap();
        assert!(controller.is_current(second.seq));
        assert!(!controller.is_current(first.seq));
    }

    #[test]
    fn cancel_invalidates_in_flight_results() {
        let base = Instant::now();
        let mut controller = RenderController::new(Duration::from_millis(500));
        controller.note_change("a", ThemeId::Notion, at(base, 0));
        let attempt = controller.poll(at(base, 500)).unwrap();
        controller.cancel_pending();
        assert!(!controller.is_current(attempt.seq));
    }
}
