//! §4.5 "Readahead controller": an adaptive size that grows while the
//! consumer keeps catching up to the prefetch frontier, holds steady while
//! it's still inside the prefetched window, and collapses back to baseline
//! under eviction pressure.

use std::time::{Duration, Instant};

/// Adaptive readahead state machine.
///
/// Tracks two offsets alongside the current size: `next_offset` (§4.5
/// `nextReadaheadOffset`, the frontier reached by the last launched
/// prefetch) and `mark_offset` (`readaheadMarkOffset`, the frontier at the
/// time that prefetch was launched). [`Self::plan`] implements the
/// growth/skip decision from §4.5 steps 2-6; [`Self::advance`] records how
/// far a launched prefetch actually reached.
#[derive(Debug)]
pub struct ReadaheadController {
    current_size: u64,
    default_size: u64,
    max_size: u64,
    cooldown: Duration,
    next_offset: u64,
    mark_offset: u64,
    require_reset: bool,
    reset_timestamp: Option<Instant>,
}

impl ReadaheadController {
    pub fn new(default_size: u64, max_size: u64, cooldown: Duration) -> Self {
        Self {
            current_size: default_size,
            default_size,
            max_size,
            cooldown,
            next_offset: 0,
            mark_offset: 0,
            require_reset: false,
            reset_timestamp: None,
        }
    }

    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// The offset a launched prefetch should start from.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Whether the controller is within its post-reset cooldown window. A
    /// reader in cooldown does not prefetch at all (§4.5 step 2).
    pub fn is_cooling_down(&self, now: Instant) -> bool {
        matches!(self.reset_timestamp, Some(t) if now.duration_since(t) < self.cooldown)
    }

    /// §4.5 steps 2-6: decide whether to launch a prefetch for a consumer
    /// currently positioned at `next_read_offset`, and at what size.
    ///
    /// Returns `None` if readahead should be skipped this call: either the
    /// cooldown from a recent eviction-pressure reset hasn't lapsed, or the
    /// consumer hasn't yet reached the mark left by the last launch.
    pub fn plan(&mut self, now: Instant, next_read_offset: u64) -> Option<u64> {
        if self.is_cooling_down(now) {
            return None;
        }
        if self.require_reset {
            self.next_offset = 0;
            self.mark_offset = 0;
            self.current_size = self.default_size;
            self.require_reset = false;
        }
        if next_read_offset >= self.next_offset {
            // Consumer has caught up to (or passed) the prefetch frontier:
            // the previous readahead size was justified, so double it.
            self.next_offset = next_read_offset;
            self.current_size = self.current_size.saturating_mul(2).min(self.max_size);
        } else if next_read_offset <= self.mark_offset {
            // Consumer hasn't even reached the last launch's starting mark.
            return None;
        }
        // Otherwise the consumer is between the mark and the frontier:
        // proceed at the current size without doubling it further.
        self.mark_offset = self.next_offset;
        Some(self.current_size)
    }

    /// §4.5 step 7: record that a launched prefetch extended known data out
    /// to `new_frontier`. A no-op if nothing new was acquired.
    pub fn advance(&mut self, new_frontier: u64) {
        if new_frontier > self.next_offset {
            self.next_offset = new_frontier;
        }
    }

    /// A prefetched block was evicted before being read (§4.4
    /// `handleBlockFree` on an unread entry): stop prefetching for one
    /// cooldown period. The frontier/mark offsets and size are only
    /// collapsed to baseline the next time [`Self::plan`] runs and finds the
    /// cooldown has lapsed (§4.5 step 3), matching the original's deferred
    /// reset.
    pub fn reset(&mut self, now: Instant) {
        self.require_reset = true;
        self.reset_timestamp = Some(now);
    }

    /// A random-access seek or other non-sequential access: collapse to
    /// baseline immediately, with no cooldown, since the access pattern
    /// changing (not memory pressure) is what invalidated the old state.
    pub fn skip(&mut self) {
        self.next_offset = 0;
        self.mark_offset = 0;
        self.current_size = self.default_size;
        self.require_reset = false;
        self.reset_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_when_consumer_reaches_frontier_and_caps_at_max() {
        let mut c = ReadaheadController::new(100, 350, Duration::from_secs(60));
        let now = Instant::now();

        // Consumer at the initial frontier (0): catches up, doubles.
        assert_eq!(c.plan(now, 0), Some(200));
        c.advance(200);
        // Consumer caught up to the new frontier again: doubles, capped.
        assert_eq!(c.plan(now, 200), Some(350));
        c.advance(350);
        assert_eq!(c.plan(now, 350), Some(350));
    }

    #[test]
    fn skip_rule_withholds_until_consumer_passes_the_mark() {
        let mut c = ReadaheadController::new(100, 1000, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(c.plan(now, 0), Some(200));
        c.advance(200);

        // Consumer still at the mark (0): skip, no doubling.
        assert_eq!(c.plan(now, 0), None);

        // Consumer has moved past the mark but not reached the frontier:
        // proceed at the current size, still without doubling.
        assert_eq!(c.plan(now, 150), Some(200));

        // Consumer reaches the frontier: doubles again.
        assert_eq!(c.plan(now, 200), Some(400));
    }

    #[test]
    fn reset_defers_collapse_until_cooldown_lapses() {
        let mut c = ReadaheadController::new(100, 1000, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(c.plan(now, 0), Some(200));
        c.advance(200);
        assert_eq!(c.plan(now, 200), Some(400));
        c.advance(400);

        c.reset(now);
        assert!(c.is_cooling_down(now));
        // Within the cooldown window, readahead is skipped entirely.
        assert_eq!(c.plan(now, 400), None);

        let later = now + Duration::from_secs(61);
        assert!(!c.is_cooling_down(later));
        // Cooldown lapsed: state collapses to baseline before the growth
        // check, so this call starts over at `default_size`.
        assert_eq!(c.plan(later, 0), Some(200));
    }

    #[test]
    fn skip_drops_to_baseline_without_cooldown() {
        let mut c = ReadaheadController::new(100, 1000, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(c.plan(now, 0), Some(200));
        c.skip();
        assert!(!c.is_cooling_down(now));
        assert_eq!(c.plan(now, 0), Some(200));
    }
}
