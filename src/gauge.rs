//! Semicircular calorie gauge.
//!
//! The gauge spans the angle domain `[-180°, 0°]` (left end to right end,
//! through the top) in a fixed 200×120 view box. Everything here is pure
//! geometry; [`build_gauge`] turns it into a [`Drawing`].

use crate::drawing::{Anchor, Drawing, Point, Tone, polar};
use crate::models::{DailyData, DaySummary, GoalType, Profile, display_calories};

pub const VIEW_WIDTH: f64 = 200.0;
pub const VIEW_HEIGHT: f64 = 120.0;
pub const CENTER: Point = Point::new(100.0, 100.0);
pub const RADIUS: f64 = 80.0;
pub const STROKE_WIDTH: f64 = 16.0;

pub const START_ANGLE: f64 = -180.0;
pub const END_ANGLE: f64 = 0.0;

/// Tick spacing of the calorie gauge.
pub const CALORIE_TICK_INTERVAL: f64 = 500.0;

/// Tick count targeted by [`nice_tick_interval`].
pub const TARGET_TICKS: usize = 8;

/// Most ticks drawn on one gauge. Wider spans fall back to a nice interval.
pub const MAX_TICKS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeInput {
    pub current: f64,
    pub goal: f64,
    pub goal_type: GoalType,
    /// Calories left against the goal, when the backend reports it.
    pub remaining: Option<f64>,
    /// Domain overrides from card configuration.
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl GaugeInput {
    pub fn new(current: f64, goal: f64, goal_type: GoalType) -> Self {
        Self {
            current,
            goal,
            goal_type,
            remaining: None,
            min: None,
            max: None,
        }
    }

    /// Gauge for one day. The weekly summary row wins because it carries
    /// the backend's goal and remaining calories; otherwise the day's
    /// entries are totalled against the profile goal.
    pub fn for_day(profile: &Profile, daily: &DailyData, summary: Option<&DaySummary>) -> Self {
        match summary {
            Some(day) => Self::new(day.display_calories(), day.daily_goal, day.goal_type)
                .with_remaining(day.remaining),
            None => {
                let goal_type = profile.goal_type();
                Self::new(
                    display_calories(daily.food_total(), daily.exercise_total(), goal_type),
                    profile.daily_goal(),
                    goal_type,
                )
            }
        }
    }

    pub fn with_remaining(mut self, remaining: Option<f64>) -> Self {
        self.remaining = remaining;
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn min_value(&self) -> f64 {
        self.min.unwrap_or(0.0)
    }

    pub fn max_value(&self) -> f64 {
        self.max
            .unwrap_or(self.goal * self.goal_type.gauge_multiplier())
    }
}

/// Fraction of the domain `[min, max]` covered by `value`, clamped to `[0, 1]`.
/// A degenerate domain maps everything to 0.
pub fn ratio(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if !(span > 0.0) || !value.is_finite() {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

pub fn angle_for(value: f64, min: f64, max: f64) -> f64 {
    START_ANGLE + ratio(value, min, max) * (END_ANGLE - START_ANGLE)
}

pub fn needle_angle(input: &GaugeInput) -> f64 {
    angle_for(input.current, input.min_value(), input.max_value())
}

pub fn goal_angle(input: &GaugeInput) -> f64 {
    angle_for(input.goal, input.min_value(), input.max_value())
}

/// Point on the gauge circle for an angle in degrees.
pub fn point_at(angle: f64, radius: f64) -> Point {
    polar(CENTER, radius, angle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Over,
    Under,
}

impl Status {
    pub fn tone(&self) -> Tone {
        match self {
            Status::Over => Tone::Bad,
            Status::Under => Tone::Good,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Over => "Over",
            Status::Under => "Under",
        }
    }
}

/// Over/under status and its magnitude. `remaining`, when reported, decides.
pub fn status(input: &GaugeInput) -> (Status, f64) {
    match input.remaining {
        Some(remaining) if remaining < 0.0 => (Status::Over, -remaining),
        Some(remaining) => (Status::Under, remaining),
        None => {
            let delta = input.current - input.goal;
            if delta > 0.0 {
                (Status::Over, delta)
            } else {
                (Status::Under, -delta)
            }
        }
    }
}

/// A 1/2/5×10ⁿ interval giving roughly `target` ticks across `[0, max]`.
pub fn nice_tick_interval(max: f64, target: usize) -> f64 {
    if !(max > 0.0) || target == 0 {
        return 1.0;
    }
    let raw = max / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub angle: f64,
    pub inner: Point,
    pub outer: Point,
    pub label_at: Point,
    pub label: String,
}

/// Ticks at every multiple of `interval` inside `[min, max]`, at most
/// [`MAX_TICKS`] of them.
pub fn ticks(min: f64, max: f64, interval: f64) -> Vec<Tick> {
    if !(interval > 0.0) || !(max > min) || !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    let span = max - min;
    let interval = if span / interval > MAX_TICKS as f64 {
        nice_tick_interval(span, TARGET_TICKS)
    } else {
        interval
    };
    let inner_r = RADIUS - STROKE_WIDTH / 2.0;
    let outer_r = RADIUS + STROKE_WIDTH / 2.0;
    let label_r = outer_r + 8.0;

    let first = (min / interval).ceil() as i64;
    let last = (max / interval).floor() as i64;
    (first..=last)
        .map(|i| {
            let value = i as f64 * interval;
            let angle = angle_for(value, min, max);
            Tick {
                value,
                angle,
                inner: point_at(angle, inner_r),
                outer: point_at(angle, outer_r),
                label_at: point_at(angle, label_r),
                label: format!("{}", value.round() as i64),
            }
        })
        .collect()
}

/// Build the calorie gauge drawing.
pub fn build_gauge(input: &GaugeInput) -> Drawing {
    build_with_ticks(input, CALORIE_TICK_INTERVAL, "Cal")
}

/// Build a gram gauge (macros) with a dynamic tick interval.
pub fn build_gram_gauge(input: &GaugeInput, unit: &str) -> Drawing {
    let interval = nice_tick_interval(input.max_value() - input.min_value(), TARGET_TICKS);
    build_with_ticks(input, interval, unit)
}

fn build_with_ticks(input: &GaugeInput, interval: f64, unit: &str) -> Drawing {
    let min = input.min_value();
    let max = input.max_value();
    let mut d = Drawing::new(VIEW_WIDTH, VIEW_HEIGHT);

    d.arc(CENTER, RADIUS, START_ANGLE, END_ANGLE, STROKE_WIDTH, Tone::Track);

    let goal_at = goal_angle(input);
    if goal_at > START_ANGLE {
        d.arc(CENTER, RADIUS, START_ANGLE, goal_at, STROKE_WIDTH, Tone::Good);
    }
    if goal_at < END_ANGLE {
        d.arc(CENTER, RADIUS, goal_at, END_ANGLE, STROKE_WIDTH, Tone::Bad);
    }

    for tick in ticks(min, max, interval) {
        d.line(tick.inner, tick.outer, 1.0, Tone::Background);
        let anchor = if tick.angle < -100.0 {
            Anchor::End
        } else if tick.angle > -80.0 {
            Anchor::Start
        } else {
            Anchor::Middle
        };
        d.text(tick.label_at, tick.label, 6.0, Tone::Muted, anchor);
    }

    let needle = needle_angle(input);
    d.line(CENTER, point_at(needle, RADIUS - 4.0), 3.0, Tone::Text);

    let (state, magnitude) = status(input);
    d.bold_text(
        Point::new(CENTER.x, CENTER.y - 22.0),
        format!("{}", input.current.round() as i64),
        18.0,
        Tone::Text,
    );
    d.text(
        Point::new(CENTER.x, CENTER.y + 12.0),
        format!("{} {} {}", magnitude.round() as i64, unit, state.label()),
        10.0,
        state.tone(),
        Anchor::Middle,
    );
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(current: f64) -> GaugeInput {
        GaugeInput::new(current, 2000.0, GoalType::FixedIntake)
    }

    #[test]
    fn test_for_day_prefers_summary_row() {
        let profile = Profile {
            daily_goal: Some(1800.0),
            goal_type: Some(GoalType::FixedNetCalories),
            ..Profile::default()
        };
        let daily: DailyData = serde_json::from_value(serde_json::json!({
            "food_entries": [{"id": "f1", "timestamp": "2025-03-05T08:00:00", "food_item": "Egg", "calories": 500}],
            "exercise_entries": [{"id": "e1", "timestamp": "2025-03-05T09:00:00", "exercise_type": "Run", "calories_burned": 200}]
        }))
        .unwrap();

        let from_entries = GaugeInput::for_day(&profile, &daily, None);
        assert_eq!(from_entries.current, 300.0);
        assert_eq!(from_entries.goal, 1800.0);
        assert_eq!(from_entries.remaining, None);

        let row = DaySummary {
            food: 500.0,
            exercise: 200.0,
            daily_goal: 2000.0,
            goal_type: GoalType::FixedIntake,
            remaining: Some(1500.0),
            ..DaySummary::default()
        };
        let from_row = GaugeInput::for_day(&profile, &daily, Some(&row));
        assert_eq!(from_row.current, 500.0);
        assert_eq!(from_row.goal, 2000.0);
        assert_eq!(from_row.remaining, Some(1500.0));
    }

    // ==================== Angle Tests ====================

    #[test]
    fn test_max_value_uses_goal_type_multiplier() {
        assert_eq!(input(0.0).max_value(), 2800.0);
        let bulk = GaugeInput::new(0.0, 2000.0, GoalType::VariableBulk);
        assert!((bulk.max_value() - 2200.0).abs() < 1e-9);
    }

    #[test]
    fn test_needle_angle_endpoints_and_middle() {
        assert_eq!(needle_angle(&input(0.0)), -180.0);
        assert_eq!(needle_angle(&input(1400.0)), -90.0);
        assert_eq!(needle_angle(&input(2800.0)), 0.0);
    }

    #[test]
    fn test_needle_angle_is_clamped() {
        assert_eq!(needle_angle(&input(-500.0)), -180.0);
        assert_eq!(needle_angle(&input(10_000.0)), 0.0);
        assert_eq!(needle_angle(&input(f64::NAN)), -180.0);
    }

    #[test]
    fn test_goal_angle_at_1_over_1_4() {
        let expected = -180.0 + 180.0 / 1.4;
        assert!((goal_angle(&input(0.0)) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_card_bounds_override_domain() {
        let gauge = input(1500.0).with_bounds(Some(1000.0), Some(2000.0));
        assert_eq!(needle_angle(&gauge), -90.0);
        // goal at the max bound: no red arc
        let d = build_gauge(&gauge);
        let red = d
            .shapes
            .iter()
            .filter(|s| matches!(s, crate::drawing::Shape::Arc { tone: Tone::Bad, .. }))
            .count();
        assert_eq!(red, 0);
    }

    #[test]
    fn test_zero_goal_does_not_panic() {
        let gauge = GaugeInput::new(100.0, 0.0, GoalType::FixedIntake);
        assert_eq!(needle_angle(&gauge), -180.0);
        let _ = build_gauge(&gauge);
    }

    #[test]
    fn test_point_at_top() {
        let p = point_at(-90.0, RADIUS);
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 20.0).abs() < 1e-9);
    }

    // ==================== Status Tests ====================

    #[test]
    fn test_status_from_remaining_sign() {
        let over = input(1000.0).with_remaining(Some(-120.0));
        assert_eq!(status(&over), (Status::Over, 120.0));
        let under = input(3000.0).with_remaining(Some(250.0));
        assert_eq!(status(&under), (Status::Under, 250.0));
    }

    #[test]
    fn test_status_derived_from_current() {
        assert_eq!(status(&input(2100.0)), (Status::Over, 100.0));
        assert_eq!(status(&input(1500.0)), (Status::Under, 500.0));
        assert_eq!(status(&input(2000.0)), (Status::Under, 0.0));
    }

    // ==================== Tick Tests ====================

    #[test]
    fn test_calorie_ticks_every_500() {
        let values: Vec<f64> = ticks(0.0, 2800.0, CALORIE_TICK_INTERVAL)
            .iter()
            .map(|t| t.value)
            .collect();
        assert_eq!(values, vec![0.0, 500.0, 1000.0, 1500.0, 2000.0, 2500.0]);
    }

    #[test]
    fn test_tick_label_outside_arc() {
        let tick = &ticks(0.0, 2800.0, 500.0)[0];
        assert_eq!(tick.angle, -180.0);
        assert!(tick.label_at.x < tick.outer.x);
        assert!(tick.outer.x < tick.inner.x);
    }

    #[test]
    fn test_huge_bounds_cap_tick_count() {
        let wide = ticks(0.0, 1e12, CALORIE_TICK_INTERVAL);
        assert!(!wide.is_empty());
        assert!(wide.len() <= MAX_TICKS);
        assert_eq!(wide[1].value - wide[0].value, nice_tick_interval(1e12, TARGET_TICKS));

        let negative = ticks(-1e12, 2000.0, CALORIE_TICK_INTERVAL);
        assert!(negative.len() <= MAX_TICKS);
        assert!(ticks(0.0, f64::INFINITY, CALORIE_TICK_INTERVAL).is_empty());

        let gauge = input(1500.0).with_bounds(Some(0.0), Some(1e12));
        assert!(build_gauge(&gauge).texts().count() <= MAX_TICKS + 4);
    }

    #[test]
    fn test_nice_tick_interval() {
        assert_eq!(nice_tick_interval(100.0, 8), 20.0);
        assert_eq!(nice_tick_interval(280.0, 8), 50.0);
        assert_eq!(nice_tick_interval(8.0, 8), 1.0);
        assert_eq!(nice_tick_interval(0.0, 8), 1.0);
    }

    #[test]
    fn test_gauge_drawing_texts() {
        let d = build_gauge(&input(2200.0));
        let texts: Vec<&str> = d.texts().collect();
        assert!(texts.contains(&"2200"));
        assert!(texts.contains(&"200 Cal Over"));
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn needle_is_monotonic_and_in_domain(
                a in -5_000.0f64..10_000.0,
                b in -5_000.0f64..10_000.0,
                goal in 1.0f64..6_000.0,
            ) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                let lo_angle = needle_angle(&GaugeInput::new(lo, goal, GoalType::FixedDeficit));
                let hi_angle = needle_angle(&GaugeInput::new(hi, goal, GoalType::FixedDeficit));
                prop_assert!(lo_angle <= hi_angle);
                prop_assert!((START_ANGLE..=END_ANGLE).contains(&lo_angle));
                prop_assert!((START_ANGLE..=END_ANGLE).contains(&hi_angle));
            }

            #[test]
            fn tick_count_is_bounded(min in -1e15f64..0.0, span in 1.0f64..1e15) {
                let count = ticks(min, min + span, CALORIE_TICK_INTERVAL).len();
                prop_assert!(count <= MAX_TICKS, "min {} span {} count {}", min, span, count);
            }

            #[test]
            fn nice_interval_gives_reasonable_tick_count(max in 1.0f64..100_000.0) {
                let interval = nice_tick_interval(max, TARGET_TICKS);
                let count = (max / interval).floor() as usize + 1;
                prop_assert!((3..=TARGET_TICKS + 1).contains(&count), "max {} interval {} count {}", max, interval, count);
            }
        }
    }
}
