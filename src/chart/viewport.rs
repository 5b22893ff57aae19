//! Visible logical range and scroll preservation across prepends.

use serde::{Deserialize, Serialize};

/// A visible window in bar indices. Fractional values are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicalRange {
    pub from: f64,
    pub to: f64,
}

impl LogicalRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    pub fn width(&self) -> f64 {
        self.to - self.from
    }

    pub fn shifted(&self, by: f64) -> Self {
        Self {
            from: self.from + by,
            to: self.to + by,
        }
    }

    /// Indices of loaded bars inside the window, clamped to `len`.
    pub fn index_span(&self, len: usize) -> Option<(usize, usize)> {
        if len == 0 {
            return None;
        }
        let last = (len - 1) as f64;
        let start = self.from.floor().clamp(0.0, last) as usize;
        let end = self.to.ceil().clamp(0.0, last) as usize;
        (start <= end).then_some((start, end))
    }
}

/// Holds the range captured before a prepend until it is re-applied once.
#[derive(Debug, Default)]
pub struct ScrollPreserver {
    captured: Option<LogicalRange>,
}

impl ScrollPreserver {
    pub fn capture(&mut self, range: LogicalRange) {
        self.captured = Some(range);
    }

    pub fn is_armed(&self) -> bool {
        self.captured.is_some()
    }

    /// Shift the captured range by `inserted`. Returns `None` (and leaves the
    /// view alone) when nothing was captured or the new `from` falls outside
    /// `[0, new_len)`.
    pub fn apply(&mut self, inserted: usize, new_len: usize) -> Option<LogicalRange> {
        let captured = self.captured.take()?;
        let shifted = captured.shifted(inserted as f64);
        if shifted.from >= 0.0 && shifted.from < new_len as f64 {
            Some(shifted)
        } else {
            tracing::debug!(
                from = shifted.from,
                new_len,
                "Preserved range out of bounds, leaving view unchanged"
            );
            None
        }
    }

    pub fn clear(&mut self) {
        self.captured = None;
    }
}

/// What the chart is showing.
#[derive(Debug)]
pub struct Viewport {
    range: Option<LogicalRange>,
    follow_tail: bool,
    preserver: ScrollPreserver,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            range: None,
            follow_tail: true,
            preserver: ScrollPreserver::default(),
        }
    }
}

impl Viewport {
    pub fn range(&self) -> Option<LogicalRange> {
        self.range
    }

    /// True until the user reports a range after a reset.
    pub fn follows_tail(&self) -> bool {
        self.follow_tail
    }

    pub fn set_range(&mut self, range: LogicalRange) {
        self.range = Some(range);
        self.follow_tail = false;
    }

    pub fn reset_to_tail(&mut self) {
        self.range = None;
        self.follow_tail = true;
        self.preserver.clear();
    }

    pub fn before_prepend(&mut self) {
        if let Some(range) = self.range {
            self.preserver.capture(range);
        }
    }

    /// Returns the new range when the captured one was re-applied.
    pub fn after_prepend(&mut self, inserted: usize, new_len: usize) -> Option<LogicalRange> {
        let range = self.preserver.apply(inserted, new_len)?;
        self.range = Some(range);
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_by_inserted_count() {
        let mut p = ScrollPreserver::default();
        p.capture(LogicalRange::new(100.0, 150.0));
        assert_eq!(p.apply(20, 520), Some(LogicalRange::new(120.0, 170.0)));
    }

    #[test]
    fn test_out_of_bounds_abandons() {
        let mut p = ScrollPreserver::default();
        p.capture(LogicalRange::new(-30.0, 20.0));
        assert_eq!(p.apply(10, 100), None);

        p.capture(LogicalRange::new(95.0, 120.0));
        assert_eq!(p.apply(10, 100), None);
    }

    #[test]
    fn test_apply_is_one_shot() {
        let mut p = ScrollPreserver::default();
        p.capture(LogicalRange::new(1.0, 2.0));
        assert!(p.apply(1, 10).is_some());
        assert!(!p.is_armed());
        assert_eq!(p.apply(1, 10), None);
    }

    #[test]
    fn test_viewport_leaves_range_on_abandon() {
        let mut v = Viewport::default();
        v.set_range(LogicalRange::new(-5.0, 10.0));
        v.before_prepend();
        assert_eq!(v.after_prepend(0, 50), None);
        assert_eq!(v.range(), Some(LogicalRange::new(-5.0, 10.0)));
    }

    #[test]
    fn test_reset_to_tail_drops_capture() {
        let mut v = Viewport::default();
        v.set_range(LogicalRange::new(10.0, 20.0));
        assert!(!v.follows_tail());
        v.before_prepend();
        v.reset_to_tail();
        assert!(v.follows_tail());
        assert_eq!(v.range(), None);
        assert_eq!(v.after_prepend(5, 100), None);
    }

    #[test]
    fn test_index_span_clamps() {
        let r = LogicalRange::new(-3.5, 8.2);
        assert_eq!(r.index_span(5), Some((0, 4)));
        assert_eq!(r.index_span(0), None);
    }
}
