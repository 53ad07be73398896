//! Month grid for the date picker and the calendar card.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::dates::{days_in_month, month_name, shift_month};
use crate::drawing::{Anchor, Drawing, Point, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day: u32,
    pub has_entry: bool,
    pub selected: bool,
    pub is_today: bool,
}

pub type CalendarRow = [Option<CalendarCell>; 7];

/// Sunday-first weeks of `(year, month)`. Only the first and last rows are
/// padded with `None`.
pub fn month_grid(
    year: i32,
    month: u32,
    data_dates: &BTreeSet<NaiveDate>,
    selected: NaiveDate,
    today: NaiveDate,
) -> Vec<CalendarRow> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let lead = first.weekday().num_days_from_sunday() as usize;
    let total = days_in_month(year, month) as usize;

    let mut rows = Vec::with_capacity((lead + total).div_ceil(7));
    let mut row: CalendarRow = [None; 7];
    let mut col = lead;

    for date in first.iter_days().take(total) {
        row[col] = Some(CalendarCell {
            date,
            day: date.day(),
            has_entry: data_dates.contains(&date),
            selected: date == selected,
            is_today: date == today,
        });
        col += 1;
        if col == 7 {
            rows.push(row);
            row = [None; 7];
            col = 0;
        }
    }
    if col > 0 {
        rows.push(row);
    }
    rows
}

/// The month currently shown by a calendar. Navigation returns the month
/// whose data dates have to be fetched before the grid is redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarView {
    pub year: i32,
    pub month: u32,
}

impl CalendarView {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn prev_month(&mut self) -> (i32, u32) {
        self.shift(-1)
    }

    pub fn next_month(&mut self) -> (i32, u32) {
        self.shift(1)
    }

    pub fn prev_year(&mut self) -> (i32, u32) {
        self.shift(-12)
    }

    pub fn next_year(&mut self) -> (i32, u32) {
        self.shift(12)
    }

    /// Jump to a month; `None` when the month number is invalid.
    pub fn set_month(&mut self, year: i32, month: u32) -> Option<(i32, u32)> {
        if !(1..=12).contains(&month) {
            return None;
        }
        self.year = year;
        self.month = month;
        Some((year, month))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn title(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }

    fn shift(&mut self, delta: i32) -> (i32, u32) {
        let (year, month) = shift_month(self.year, self.month, delta);
        self.year = year;
        self.month = month;
        (year, month)
    }
}

const CELL: f64 = 30.0;
const HEADER: f64 = 40.0;

/// Calendar card drawing: title, weekday header and the grid.
pub fn build_calendar(view: CalendarView, rows: &[CalendarRow]) -> Drawing {
    let width = CELL * 7.0;
    let mut d = Drawing::new(width, HEADER + CELL * rows.len() as f64);

    d.bold_text(Point::new(width / 2.0, 10.0), view.title(), 12.0, Tone::Text);
    for (i, name) in ["S", "M", "T", "W", "T", "F", "S"].iter().enumerate() {
        d.text(
            Point::new(CELL * i as f64 + CELL / 2.0, 30.0),
            *name,
            9.0,
            Tone::Muted,
            Anchor::Middle,
        );
    }

    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let Some(cell) = cell else { continue };
            let origin = Point::new(CELL * c as f64 + 2.0, HEADER + CELL * r as f64 + 2.0);
            if cell.selected {
                d.outline(origin, CELL - 4.0, CELL - 4.0, 4.0, Tone::Accent);
            } else if cell.is_today {
                d.outline(origin, CELL - 4.0, CELL - 4.0, 4.0, Tone::Muted);
            }
            let tone = if cell.has_entry { Tone::Good } else { Tone::Text };
            d.text(
                Point::new(origin.x + (CELL - 4.0) / 2.0, origin.y + (CELL - 4.0) / 2.0),
                cell.day.to_string(),
                10.0,
                tone,
                Anchor::Middle,
            );
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_february_2024_layout() {
        // 2024-02-01 is a Thursday
        let rows = month_grid(2024, 2, &BTreeSet::new(), date(2024, 2, 14), date(2024, 2, 20));
        assert_eq!(rows.len(), 5);
        assert!(rows[0][..4].iter().all(Option::is_none));
        assert_eq!(rows[0][4].map(|c| c.day), Some(1));
        // 29th lands on Thursday of the last row
        assert_eq!(rows[4][4].map(|c| c.day), Some(29));
        assert!(rows[4][5..].iter().all(Option::is_none));
    }

    #[test]
    fn test_flags() {
        let data: BTreeSet<NaiveDate> = [date(2024, 2, 3), date(2024, 2, 14)].into();
        let rows = month_grid(2024, 2, &data, date(2024, 2, 14), date(2024, 2, 20));
        let cells: Vec<CalendarCell> = rows.iter().flatten().flatten().copied().collect();
        assert_eq!(cells.iter().filter(|c| c.has_entry).count(), 2);
        let selected: Vec<u32> = cells.iter().filter(|c| c.selected).map(|c| c.day).collect();
        assert_eq!(selected, vec![14]);
        let today: Vec<u32> = cells.iter().filter(|c| c.is_today).map(|c| c.day).collect();
        assert_eq!(today, vec![20]);
    }

    #[test]
    fn test_month_starting_sunday_has_no_leading_padding() {
        // 2023-10-01 is a Sunday
        let rows = month_grid(2023, 10, &BTreeSet::new(), date(2023, 10, 1), date(2023, 10, 1));
        assert_eq!(rows[0][0].map(|c| c.day), Some(1));
    }

    #[test]
    fn test_invalid_month_is_empty() {
        assert!(month_grid(2024, 13, &BTreeSet::new(), date(2024, 1, 1), date(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_navigation_wraps_year() {
        let mut view = CalendarView::containing(date(2024, 1, 15));
        assert_eq!(view.prev_month(), (2023, 12));
        assert_eq!(view.next_month(), (2024, 1));
        assert_eq!(view.next_year(), (2025, 1));
        assert_eq!(view.set_month(2024, 0), None);
        assert_eq!(view.set_month(2024, 7), Some((2024, 7)));
        assert_eq!(view.title(), "July 2024");
        assert!(view.contains(date(2024, 7, 31)));
    }

    #[test]
    fn test_calendar_drawing_lists_every_day() {
        let view = CalendarView::containing(date(2024, 2, 1));
        let rows = month_grid(2024, 2, &BTreeSet::new(), date(2024, 2, 1), date(2024, 2, 1));
        let d = build_calendar(view, &rows);
        assert!(d.texts().any(|t| t == "February 2024"));
        assert!(d.texts().any(|t| t == "29"));
        assert_eq!(d.height, HEADER + CELL * 5.0);
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn grid_shape_holds_for_any_month(year in 1900i32..2200, month in 1u32..=12) {
                let rows = month_grid(year, month, &BTreeSet::new(), date(year, month, 1), date(year, month, 1));
                let filled: usize = rows.iter().map(|r| r.iter().flatten().count()).sum();
                prop_assert_eq!(filled, days_in_month(year, month) as usize);

                let last = rows.len() - 1;
                for (i, row) in rows.iter().enumerate() {
                    if i != 0 && i != last {
                        prop_assert!(row.iter().all(Option::is_some));
                    }
                }
                // padding is only at the start of the first row and the end of the last
                let first_filled = rows[0].iter().position(Option::is_some).unwrap();
                prop_assert!(rows[0][first_filled..].iter().all(Option::is_some));
                let last_filled = rows[last].iter().rposition(Option::is_some).unwrap();
                prop_assert!(rows[last][..=last_filled].iter().all(Option::is_some));
            }
        }
    }
}
