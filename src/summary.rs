//! Weekly bar chart and the weekly aggregate.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::dates::{week_dates, weekday_short};
use crate::drawing::{Anchor, Drawing, Point, Tone};
use crate::models::{BAR_HEADROOM, KG_PER_LB, WeeklySummary, WeightUnit};

/// Calories per pound of body weight.
pub const CALORIES_PER_LB: f64 = 3500.0;

// ==================== Bars ====================

#[derive(Debug, Clone, PartialEq)]
pub struct DayBar {
    pub date: NaiveDate,
    pub weekday: &'static str,
    pub value: f64,
    pub goal: f64,
    /// Share of the track (0–100) filled up to the goal.
    pub green_pct: f64,
    /// Share of the track (0–100) above the goal.
    pub red_pct: f64,
    pub has_data: bool,
    pub is_today: bool,
    pub is_selected: bool,
}

/// Split a day's value into `(green%, red%)` of `goal * 1.4`.
pub fn bar_split(value: f64, goal: f64) -> (f64, f64) {
    let max_rep = goal * BAR_HEADROOM;
    if !(max_rep > 0.0) {
        return (0.0, 0.0);
    }
    let green = goal.min(value).max(0.0) / max_rep * 100.0;
    let red = (value.min(max_rep) - goal).max(0.0) / max_rep * 100.0;
    (green, red)
}

/// Distance of the goal line from the top of a bar track.
pub fn goal_line_offset(track_height: f64) -> f64 {
    (1.0 - 1.0 / BAR_HEADROOM) * track_height
}

/// Bars for the week containing `selected`.
pub fn week_bars(
    summary: &WeeklySummary,
    selected: NaiveDate,
    today: NaiveDate,
    default_goal: f64,
) -> [DayBar; 7] {
    week_dates(selected).map(|date| {
        let (value, goal, has_data) = match summary.get(date) {
            Some(day) => (day.display_calories(), day.daily_goal, true),
            None => (0.0, default_goal, false),
        };
        let (green_pct, red_pct) = bar_split(value, goal);
        DayBar {
            date,
            weekday: weekday_short(date),
            value,
            goal,
            green_pct,
            red_pct,
            has_data,
            is_today: date == today,
            is_selected: date == selected,
        }
    })
}

// ==================== Aggregate ====================

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAggregate {
    /// Calories over goal across active days; negative means under.
    pub over_goal: f64,
    /// BMR-based deficit in calories, when any active day had BMR data.
    pub deficit: Option<f64>,
    pub active_days: usize,
    pub unit: WeightUnit,
}

impl WeeklyAggregate {
    /// Projected weight change in `unit`; positive means lost.
    pub fn weight_change(&self) -> Option<f64> {
        if self.active_days == 0 {
            return Some(0.0);
        }
        self.deficit.map(|deficit| {
            let lbs = deficit / CALORIES_PER_LB;
            match self.unit {
                WeightUnit::Lbs => lbs,
                WeightUnit::Kg => lbs * KG_PER_LB,
            }
        })
    }

    pub fn is_over(&self) -> bool {
        self.over_goal.round() > 0.0
    }

    pub fn calorie_text(&self) -> String {
        let n = self.over_goal.abs().round() as i64;
        if self.is_over() {
            format!("{} Cal Over Goal", n)
        } else {
            format!("{} Cal Under Goal", n)
        }
    }

    pub fn calorie_tone(&self) -> Tone {
        if self.is_over() { Tone::Bad } else { Tone::Good }
    }

    pub fn weight_text(&self) -> Option<String> {
        self.weight_change().map(|w| {
            let direction = if w >= 0.0 { "lost" } else { "gained" };
            format!("{:.1} {} {}", w.abs(), self.unit, direction)
        })
    }

    pub fn weight_tone(&self) -> Tone {
        match self.weight_change() {
            Some(w) if w < 0.0 => Tone::Bad,
            _ => Tone::Good,
        }
    }
}

/// Accumulate the week of `selected`. `now` scales today's BMR by the share
/// of the day already elapsed.
pub fn weekly_aggregate(
    summary: &WeeklySummary,
    selected: NaiveDate,
    now: NaiveDateTime,
    unit: WeightUnit,
) -> WeeklyAggregate {
    let today = now.date();
    let mut over_goal = 0.0;
    let mut deficit = 0.0;
    let mut has_bmr = false;
    let mut active_days = 0;

    for date in week_dates(selected) {
        let Some(day) = summary.get(date).filter(|d| d.has_activity()) else {
            continue;
        };
        active_days += 1;
        over_goal += day.over_goal();
        if let Some(bmr) = day.bmr_and_neat {
            let bmr = if date == today {
                bmr * f64::from(now.hour()) / 24.0
            } else {
                bmr
            };
            deficit += bmr + day.exercise - day.food;
            has_bmr = true;
        }
    }

    WeeklyAggregate {
        over_goal,
        deficit: has_bmr.then_some(deficit),
        active_days,
        unit,
    }
}

// ==================== Drawing ====================

pub const CHART_WIDTH: f64 = 280.0;
pub const CHART_HEIGHT: f64 = 180.0;
const TRACK_TOP: f64 = 10.0;
const TRACK_HEIGHT: f64 = 120.0;
const BAR_WIDTH: f64 = 24.0;

/// Weekly bar chart with the goal line and the aggregate underneath.
pub fn build_weekly_chart(bars: &[DayBar; 7], aggregate: &WeeklyAggregate) -> Drawing {
    let mut d = Drawing::new(CHART_WIDTH, CHART_HEIGHT);
    let slot = CHART_WIDTH / 7.0;
    let bottom = TRACK_TOP + TRACK_HEIGHT;

    for (i, bar) in bars.iter().enumerate() {
        let x = slot * i as f64 + (slot - BAR_WIDTH) / 2.0;
        d.outline(Point::new(x, TRACK_TOP), BAR_WIDTH, TRACK_HEIGHT, 3.0, Tone::Track);

        let green_h = TRACK_HEIGHT * bar.green_pct / 100.0;
        let red_h = TRACK_HEIGHT * bar.red_pct / 100.0;
        if green_h > 0.0 {
            d.rect(Point::new(x, bottom - green_h), BAR_WIDTH, green_h, Tone::Good);
        }
        if red_h > 0.0 {
            d.rect(
                Point::new(x, bottom - green_h - red_h),
                BAR_WIDTH,
                red_h,
                Tone::Bad,
            );
        }

        let label_tone = if bar.is_selected {
            Tone::Accent
        } else if bar.is_today {
            Tone::Text
        } else {
            Tone::Muted
        };
        d.text(
            Point::new(x + BAR_WIDTH / 2.0, bottom + 10.0),
            bar.weekday,
            9.0,
            label_tone,
            Anchor::Middle,
        );
    }

    let goal_y = TRACK_TOP + goal_line_offset(TRACK_HEIGHT);
    d.dashed_line(
        Point::new(0.0, goal_y),
        Point::new(CHART_WIDTH, goal_y),
        1.0,
        Tone::Warning,
    );

    d.text(
        Point::new(CHART_WIDTH / 2.0, bottom + 28.0),
        aggregate.calorie_text(),
        11.0,
        aggregate.calorie_tone(),
        Anchor::Middle,
    );
    if let Some(weight) = aggregate.weight_text() {
        d.text(
            Point::new(CHART_WIDTH / 2.0, bottom + 42.0),
            weight,
            10.0,
            aggregate.weight_tone(),
            Anchor::Middle,
        );
    }
    d
}
