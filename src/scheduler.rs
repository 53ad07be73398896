//! Coalesced redraw bookkeeping.
//!
//! State changes mark regions dirty while a message is handled; the GUI
//! drains the set once afterwards and clears only the canvas caches that
//! changed. Marking the same region twice costs nothing.

use std::collections::BTreeSet;

use crate::summary::goal_line_offset;

/// A separately cached part of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Gauge,
    Weekly,
    Calendar,
    Entries,
    Macros,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Gauge,
        Region::Weekly,
        Region::Calendar,
        Region::Entries,
        Region::Macros,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct RenderScheduler {
    dirty: BTreeSet<Region>,
    flushes: u64,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, region: Region) {
        self.dirty.insert(region);
    }

    pub fn mark_all(&mut self) {
        self.dirty.extend(Region::ALL);
    }

    pub fn is_dirty(&self, region: Region) -> bool {
        self.dirty.contains(&region)
    }

    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drain the dirty set. Returns regions in a stable order; an empty
    /// flush is not counted.
    pub fn flush(&mut self) -> Vec<Region> {
        if self.dirty.is_empty() {
            return Vec::new();
        }
        self.flushes += 1;
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    /// Number of non-empty flushes so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }
}

/// Tracks the measured height of the weekly bar track and reports a new
/// goal-line offset only when the height really changed.
#[derive(Debug, Clone, Default)]
pub struct TrackMeasure {
    height: Option<f64>,
}

impl TrackMeasure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a measurement. Sub-half-pixel jitter is ignored.
    pub fn measure(&mut self, height: f64) -> Option<f64> {
        if !height.is_finite() || height <= 0.0 {
            return None;
        }
        match self.height {
            Some(previous) if (previous - height).abs() < 0.5 => None,
            _ => {
                self.height = Some(height);
                Some(goal_line_offset(height))
            }
        }
    }

    pub fn height(&self) -> Option<f64> {
        self.height
    }

    pub fn offset(&self) -> Option<f64> {
        self.height.map(goal_line_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== RenderScheduler Tests ====================

    #[test]
    fn test_marks_are_coalesced() {
        let mut scheduler = RenderScheduler::new();
        scheduler.mark(Region::Weekly);
        scheduler.mark(Region::Gauge);
        scheduler.mark(Region::Weekly);
        assert!(scheduler.is_dirty(Region::Weekly));

        assert_eq!(scheduler.flush(), vec![Region::Gauge, Region::Weekly]);
        assert!(!scheduler.has_pending());
        assert_eq!(scheduler.flush_count(), 1);
    }

    #[test]
    fn test_empty_flush_is_not_counted() {
        let mut scheduler = RenderScheduler::new();
        assert!(scheduler.flush().is_empty());
        assert_eq!(scheduler.flush_count(), 0);

        scheduler.mark_all();
        assert_eq!(scheduler.flush().len(), Region::ALL.len());
        assert_eq!(scheduler.flush_count(), 1);
    }

    // ==================== TrackMeasure Tests ====================

    #[test]
    fn test_first_measure_reports_offset() {
        let mut track = TrackMeasure::new();
        let offset = track.measure(140.0).unwrap();
        assert!((offset - 40.0).abs() < 1e-9);
        assert_eq!(track.height(), Some(140.0));
    }

    #[test]
    fn test_unchanged_height_is_silent() {
        let mut track = TrackMeasure::new();
        track.measure(140.0);
        assert_eq!(track.measure(140.0), None);
        assert_eq!(track.measure(140.3), None);
        assert!(track.measure(280.0).is_some());
        assert!((track.offset().unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_heights_ignored() {
        let mut track = TrackMeasure::new();
        assert_eq!(track.measure(0.0), None);
        assert_eq!(track.measure(f64::NAN), None);
        assert_eq!(track.offset(), None);
    }
}
