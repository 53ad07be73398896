//! Standalone dashboard cards rendered to SVG.
//!
//! Each `[[cards]]` entry in the configuration names a card kind and,
//! optionally, the profile it shows. Cards are drawn headlessly from the
//! same builders the panel uses.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::calendar::{CalendarView, build_calendar, month_grid};
use crate::client::CalorieClient;
use crate::drawing::{Anchor, Drawing, Point, Tone};
use crate::error::{ClientError, ClientResult};
use crate::gauge::{GaugeInput, build_gauge, build_gram_gauge};
use crate::models::{DailyData, GoalType, Macros, Profile, WeeklySummary};
use crate::summary::{build_weekly_chart, week_bars, weekly_aggregate};

/// Entity id prefix of calorie tracker profiles.
pub const PROFILE_ENTITY_PREFIX: &str = "sensor.calorie_tracker_";

const TITLE_HEIGHT: f64 = 24.0;

/// Share of the daily goal assigned to each macro, and its kcal per gram.
const PROTEIN_SPLIT: (f64, f64) = (0.30, 4.0);
const FAT_SPLIT: (f64, f64) = (0.30, 9.0);
const CARBS_SPLIT: (f64, f64) = (0.40, 4.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Gauge,
    Weekly,
    Calendar,
    Macros,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Gauge => "gauge",
            CardKind::Weekly => "weekly",
            CardKind::Calendar => "calendar",
            CardKind::Macros => "macros",
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gauge" => Ok(CardKind::Gauge),
            "weekly" => Ok(CardKind::Weekly),
            "calendar" => Ok(CardKind::Calendar),
            "macros" => Ok(CardKind::Macros),
            other => Err(format!(
                "unknown card kind '{}' (expected gauge, weekly, calendar or macros)",
                other
            )),
        }
    }
}

/// One `[[cards]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CardConfig {
    pub kind: CardKind,
    #[serde(default)]
    pub profile_entity_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Caps the rendered height; the drawing is scaled, not cropped.
    #[serde(default)]
    pub max_height: Option<f64>,
    /// Gauge domain overrides.
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl CardConfig {
    pub fn new(kind: CardKind) -> Self {
        Self {
            kind,
            profile_entity_id: None,
            title: None,
            max_height: None,
            min: None,
            max: None,
        }
    }
}

/// The explicit entity, or the first calorie tracker profile.
pub fn resolve_entity(config: &CardConfig, profiles: &[Profile]) -> Option<String> {
    if let Some(entity) = config
        .profile_entity_id
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
    {
        return Some(entity.to_string());
    }
    profiles
        .iter()
        .find(|p| p.entity_id.starts_with(PROFILE_ENTITY_PREFIX))
        .map(|p| p.entity_id.clone())
}

/// Everything a card may draw from.
#[derive(Debug, Clone, Default)]
pub struct CardData {
    pub profile: Profile,
    pub daily: DailyData,
    pub weekly: WeeklySummary,
    pub month_dates: BTreeSet<NaiveDate>,
    pub selected: NaiveDate,
    pub now: NaiveDateTime,
}

/// Fetch what `config.kind` needs for `selected`.
pub async fn load_card_data(
    client: &CalorieClient,
    config: &CardConfig,
    profiles: &[Profile],
    selected: NaiveDate,
    now: NaiveDateTime,
) -> ClientResult<CardData> {
    let entity = resolve_entity(config, profiles).ok_or_else(|| {
        ClientError::Validation("no calorie tracker profile found for card".into())
    })?;
    let profile = profiles
        .iter()
        .find(|p| p.entity_id == entity)
        .cloned()
        .unwrap_or_else(|| {
            warn!(entity = %entity, "Card profile not listed, using defaults");
            Profile {
                entity_id: entity.clone(),
                ..Profile::default()
            }
        });
    debug!(kind = %config.kind, entity = %entity, %selected, "Loading card data");

    let mut data = CardData {
        profile,
        selected,
        now,
        ..CardData::default()
    };
    let goal = data.profile.daily_goal();
    match config.kind {
        CardKind::Gauge => {
            data.daily = client.get_daily_data(&entity, Some(selected)).await?;
            data.weekly = client
                .get_weekly_summary(&entity, Some(selected), goal)
                .await?;
        }
        CardKind::Weekly => {
            data.weekly = client
                .get_weekly_summary(&entity, Some(selected), goal)
                .await?;
        }
        CardKind::Calendar => {
            let view = CalendarView::containing(selected);
            data.month_dates = client
                .get_month_data_days(&entity, view.year, view.month)
                .await?;
        }
        CardKind::Macros => {
            data.daily = client.get_daily_data(&entity, Some(selected)).await?;
        }
    }
    Ok(data)
}

/// Build the card's drawing, title included.
pub fn build_card(config: &CardConfig, data: &CardData) -> Drawing {
    let today = data.now.date();
    let drawing = match config.kind {
        CardKind::Gauge => {
            let input = GaugeInput::for_day(&data.profile, &data.daily, data.weekly.get(data.selected))
                .with_bounds(config.min, config.max);
            build_gauge(&input)
        }
        CardKind::Weekly => {
            let bars = week_bars(&data.weekly, data.selected, today, data.profile.daily_goal());
            let aggregate = weekly_aggregate(
                &data.weekly,
                data.selected,
                data.now,
                data.profile.weight_unit(),
            );
            build_weekly_chart(&bars, &aggregate)
        }
        CardKind::Calendar => {
            let view = CalendarView::containing(data.selected);
            let rows = month_grid(view.year, view.month, &data.month_dates, data.selected, today);
            build_calendar(view, &rows)
        }
        CardKind::Macros => build_macros(
            data.daily.macros.as_ref(),
            data.profile.daily_goal(),
            config,
        ),
    };

    match config.title.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(title) => with_title(drawing, title),
        None => drawing,
    }
}

/// Render the card as a standalone SVG document.
pub fn render_card(config: &CardConfig, data: &CardData) -> String {
    build_card(config, data).to_svg(config.max_height)
}

fn with_title(drawing: Drawing, title: &str) -> Drawing {
    let width = drawing.width;
    let mut titled = drawing.offset_y(TITLE_HEIGHT);
    titled.text(
        Point::new(width / 2.0, TITLE_HEIGHT * 0.65),
        title,
        13.0,
        Tone::Text,
        Anchor::Middle,
    );
    titled
}

/// Gram target for one macro out of the daily calorie goal.
pub fn macro_target(daily_goal: f64, (share, kcal_per_gram): (f64, f64)) -> f64 {
    (daily_goal * share / kcal_per_gram).round()
}

fn build_macros(macros: Option<&Macros>, daily_goal: f64, config: &CardConfig) -> Drawing {
    let macros = macros.cloned().unwrap_or_default();
    let gauge = |label: &str, grams: f64, split: (f64, f64)| {
        let input = GaugeInput::new(grams, macro_target(daily_goal, split), GoalType::FixedIntake)
            .with_bounds(config.min, None);
        let mut d = build_gram_gauge(&input, "g").offset_y(16.0);
        d.text(Point::new(d.width / 2.0, 12.0), label, 11.0, Tone::Muted, Anchor::Middle);
        d
    };

    gauge("Protein", macros.protein, PROTEIN_SPLIT)
        .beside(gauge("Fat", macros.fat, FAT_SPLIT), 10.0)
        .beside(gauge("Carbs", macros.carbs, CARBS_SPLIT), 10.0)
}
