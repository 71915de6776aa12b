// Fixed-period deadline grid

use std::time::{Duration, Instant};

/// Fixed-period deadline grid on the monotonic clock.
///
/// The grid is anchored once; advancing adds one period regardless of how
/// long the work took. When the work overran by more than a whole period,
/// the missed slots are skipped rather than fired back to back.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    next: Instant,
    period: Duration,
}

impl Deadline {
    pub fn new(start: Instant, period: Duration) -> Self {
        Self { next: start, period }
    }

    pub fn next(&self) -> Instant {
        self.next
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn reset(&mut self, start: Instant) {
        self.next = start;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// Moves to the next slot and returns how many slots were skipped.
    pub fn advance(&mut self, now: Instant) -> u32 {
        self.next += self.period;
        if now < self.next || self.period.is_zero() {
            return 0;
        }
        let late = now - self.next;
        let skipped = u32::try_from(late.as_nanos() / self.period.as_nanos()).unwrap_or(u32::MAX);
        // skipped * period never exceeds `late`, so the slot stays at or before `now`
        match self.period.checked_mul(skipped) {
            Some(jump) => self.next += jump,
            None => self.next = now,
        }
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn test_advance_keeps_grid() {
        let t0 = Instant::now();
        let mut d = Deadline::new(t0, SEC);
        assert!(d.is_due(t0));

        // fast work: next slot is one period after the previous slot
        assert_eq!(d.advance(t0 + Duration::from_millis(200)), 0);
        assert_eq!(d.next(), t0 + SEC);
        assert!(!d.is_due(t0 + Duration::from_millis(999)));

        // a late tick does not shift the grid
        assert_eq!(d.advance(t0 + Duration::from_millis(1_400)), 0);
        assert_eq!(d.next(), t0 + 2 * SEC);
    }

    #[test]
    fn test_slow_work_skips_instead_of_bursting() {
        let t0 = Instant::now();
        let mut d = Deadline::new(t0, SEC);

        // work started at t0 and took 3.5s
        let skipped = d.advance(t0 + Duration::from_millis(3_500));
        assert_eq!(skipped, 2);
        assert_eq!(d.next(), t0 + 3 * SEC);
        assert!(d.is_due(t0 + Duration::from_millis(3_500)));

        assert_eq!(d.advance(t0 + Duration::from_millis(3_600)), 0);
        assert_eq!(d.next(), t0 + 4 * SEC);
    }

    #[test]
    fn test_tiny_period_saturates_skip_count() {
        let t0 = Instant::now();
        let mut d = Deadline::new(t0, Duration::from_nanos(1));
        let now = t0 + 10 * SEC;

        assert_eq!(d.advance(now), u32::MAX);
        assert!(d.next() <= now);
        assert!(d.is_due(now));
    }

    #[test]
    fn test_reset_reanchors() {
        let t0 = Instant::now();
        let mut d = Deadline::new(t0, SEC);
        let later = t0 + 10 * SEC;
        d.reset(later);
        assert_eq!(d.advance(later), 0);
        assert_eq!(d.next(), later + SEC);
    }
}
