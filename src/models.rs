//! Payload types exchanged with the calorie tracker backend.
//!
//! Everything the backend sends is decoded here, once, into fixed records.
//! In particular the weekly summary tuples (legacy length-6 and extended
//! length-9) become [`DaySummary`] values so that the chart, gauge and
//! aggregate code never looks at tuple lengths again.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::dates::{parse_date, parse_local_timestamp};
use crate::error::ClientError;

/// Daily goal used when a profile has none configured.
pub const DEFAULT_DAILY_GOAL: f64 = 2000.0;

/// Headroom above the goal that bars and the default gauge can represent.
pub const BAR_HEADROOM: f64 = 1.4;

/// Gauge headroom for bulking goals, where overshooting is the point.
pub const BULK_HEADROOM: f64 = 1.1;

// ==================== Goal Type ====================

/// Accounting mode of a profile's calorie goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GoalType {
    #[default]
    FixedIntake,
    FixedSurplus,
    FixedDeficit,
    FixedNetCalories,
    VariableCut,
    VariableBulk,
}

impl GoalType {
    pub const ALL: [GoalType; 6] = [
        GoalType::FixedIntake,
        GoalType::FixedSurplus,
        GoalType::FixedDeficit,
        GoalType::FixedNetCalories,
        GoalType::VariableCut,
        GoalType::VariableBulk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::FixedIntake => "fixed_intake",
            GoalType::FixedSurplus => "fixed_surplus",
            GoalType::FixedDeficit => "fixed_deficit",
            GoalType::FixedNetCalories => "fixed_net_calories",
            GoalType::VariableCut => "variable_cut",
            GoalType::VariableBulk => "variable_bulk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        GoalType::ALL.into_iter().find(|g| g.as_str() == s.trim())
    }

    /// Lenient decoding: unknown modes fall back to `FixedIntake`.
    pub fn parse_or_default(s: &str) -> Self {
        GoalType::parse(s).unwrap_or_else(|| {
            tracing::warn!(goal_type = s, "unknown goal type, treating as fixed_intake");
            GoalType::default()
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            GoalType::FixedIntake => "Fixed intake",
            GoalType::FixedSurplus => "Fixed surplus",
            GoalType::FixedDeficit => "Fixed deficit",
            GoalType::FixedNetCalories => "Fixed net calories",
            GoalType::VariableCut => "Variable cut",
            GoalType::VariableBulk => "Variable bulk",
        }
    }

    /// Whether exercise offsets food in the displayed total.
    pub fn counts_exercise(&self) -> bool {
        !matches!(self, GoalType::FixedIntake)
    }

    /// Gauge maximum as a multiple of the goal.
    pub fn gauge_multiplier(&self) -> f64 {
        match self {
            GoalType::VariableBulk => BULK_HEADROOM,
            _ => BAR_HEADROOM,
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for GoalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GoalType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(GoalType::parse_or_default(&s))
    }
}

/// Calories shown for a day: gross intake for `fixed_intake`, net of
/// exercise for every other goal type.
pub fn display_calories(food: f64, exercise: f64, goal_type: GoalType) -> f64 {
    if goal_type.counts_exercise() {
        food - exercise
    } else {
        food
    }
}

// ==================== Units ====================

pub const KG_PER_LB: f64 = 0.453_592_37;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightUnit {
    #[default]
    Lbs,
    Kg,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Lbs => "lbs",
            WeightUnit::Kg => "kg",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lbs" | "lb" | "pounds" => Some(WeightUnit::Lbs),
            "kg" | "kgs" | "kilograms" => Some(WeightUnit::Kg),
            _ => None,
        }
    }

    /// Convert a value expressed in pounds into this unit.
    pub fn from_lbs(&self, lbs: f64) -> f64 {
        match self {
            WeightUnit::Lbs => lbs,
            WeightUnit::Kg => lbs * KG_PER_LB,
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WeightUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WeightUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(WeightUnit::parse(&s).unwrap_or_default())
    }
}

// ==================== Log Entries ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Food,
    Exercise,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Food => "food",
            EntryKind::Exercise => "exercise",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    #[serde(default)]
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub food_item: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calories: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    #[serde(default)]
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub exercise_type: String,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub calories_burned: Option<f64>,
    #[serde(default, alias = "duration", deserialize_with = "lenient_opt_f64")]
    pub duration_minutes: Option<f64>,
}

impl FoodEntry {
    pub fn time(&self) -> Option<NaiveDateTime> {
        parse_local_timestamp(&self.timestamp)
    }
}

impl ExerciseEntry {
    pub fn time(&self) -> Option<NaiveDateTime> {
        parse_local_timestamp(&self.timestamp)
    }

    pub fn burned(&self) -> f64 {
        self.calories_burned.unwrap_or(0.0)
    }
}

/// A logged entry of either kind, as shown in the daily list.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Food(FoodEntry),
    Exercise(ExerciseEntry),
}

impl LogEntry {
    pub fn id(&self) -> &str {
        match self {
            LogEntry::Food(e) => &e.id,
            LogEntry::Exercise(e) => &e.id,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            LogEntry::Food(_) => EntryKind::Food,
            LogEntry::Exercise(_) => EntryKind::Exercise,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            LogEntry::Food(e) => &e.timestamp,
            LogEntry::Exercise(e) => &e.timestamp,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LogEntry::Food(e) => &e.food_item,
            LogEntry::Exercise(e) => &e.exercise_type,
        }
    }

    pub fn calories(&self) -> f64 {
        match self {
            LogEntry::Food(e) => e.calories,
            LogEntry::Exercise(e) => e.burned(),
        }
    }
}

/// Body of a `create_entry` / `update_entry` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NewEntry {
    Food {
        food_item: String,
        calories: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Exercise {
        exercise_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        calories_burned: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

impl NewEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            NewEntry::Food { .. } => EntryKind::Food,
            NewEntry::Exercise { .. } => EntryKind::Exercise,
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self {
            NewEntry::Food { timestamp, .. } | NewEntry::Exercise { timestamp, .. } => {
                timestamp.as_deref()
            }
        }
    }
}

// ==================== Profile ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub entity_id: String,
    #[serde(default)]
    pub spoken_name: String,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub daily_goal: Option<f64>,
    #[serde(default)]
    pub goal_type: Option<GoalType>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub starting_weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub goal_weight: Option<f64>,
    #[serde(default)]
    pub weight_unit: Option<WeightUnit>,
    #[serde(default)]
    pub include_exercise_in_net: Option<bool>,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub height: Option<f64>,
    #[serde(default)]
    pub height_unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub body_fat_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub activity_multiplier: Option<f64>,
    #[serde(default)]
    pub config_entry_id: Option<String>,
    #[serde(default)]
    pub preferred_image_analyzer: Option<String>,
}

impl Profile {
    pub fn daily_goal(&self) -> f64 {
        self.daily_goal
            .filter(|g| *g > 0.0)
            .unwrap_or(DEFAULT_DAILY_GOAL)
    }

    pub fn weight_unit(&self) -> WeightUnit {
        self.weight_unit.unwrap_or_default()
    }

    pub fn goal_type(&self) -> GoalType {
        self.goal_type.unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        if self.spoken_name.is_empty() {
            &self.entity_id
        } else {
            &self.spoken_name
        }
    }
}

/// Body of `calorie_tracker/update_profile`: every editable field, sent
/// together. Unset optional fields are omitted rather than cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub spoken_name: String,
    pub daily_goal: i64,
    pub goal_type: GoalType,
    pub weight_unit: WeightUnit,
    pub include_exercise_in_net: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_multiplier: Option<f64>,
}

/// Reply of `calorie_tracker/get_user_profile`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfiles {
    #[serde(default)]
    pub default_profile: Option<Profile>,
    #[serde(default)]
    pub all_profiles: Vec<Profile>,
}

// ==================== Daily Data ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub alcohol: Option<f64>,
}

/// Reply of `calorie_tracker/get_daily_data`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DailyData {
    #[serde(default)]
    pub food_entries: Vec<FoodEntry>,
    #[serde(default)]
    pub exercise_entries: Vec<ExerciseEntry>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub body_fat_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub bmr_and_neat: Option<f64>,
    #[serde(default)]
    pub macros: Option<Macros>,
    #[serde(default)]
    pub config_entry_id: Option<String>,
}

impl DailyData {
    pub fn food_total(&self) -> f64 {
        self.food_entries.iter().map(|e| e.calories).sum()
    }

    pub fn exercise_total(&self) -> f64 {
        self.exercise_entries.iter().map(ExerciseEntry::burned).sum()
    }

    /// Food and exercise entries merged in timestamp order.
    pub fn entries(&self) -> Vec<LogEntry> {
        let mut entries: Vec<LogEntry> = self
            .food_entries
            .iter()
            .cloned()
            .map(LogEntry::Food)
            .chain(self.exercise_entries.iter().cloned().map(LogEntry::Exercise))
            .collect();
        entries.sort_by(|a, b| a.timestamp().cmp(b.timestamp()));
        entries
    }

    pub fn find(&self, kind: EntryKind, id: &str) -> Option<LogEntry> {
        match kind {
            EntryKind::Food => self
                .food_entries
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(LogEntry::Food),
            EntryKind::Exercise => self
                .exercise_entries
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(LogEntry::Exercise),
        }
    }
}

// ==================== Weekly Summary ====================

/// One day of the weekly summary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DaySummary {
    pub food: f64,
    pub exercise: f64,
    /// BMR plus NEAT; `None` when the backend has no BMR inputs for the day.
    pub bmr_and_neat: Option<f64>,
    pub daily_goal: f64,
    pub goal_type: GoalType,
    pub weight: Option<f64>,
    /// Calories left against the goal, reported by newer backends. When
    /// present it decides over/under instead of `daily_goal - display`.
    pub remaining: Option<f64>,
}

impl DaySummary {
    pub fn display_calories(&self) -> f64 {
        display_calories(self.food, self.exercise, self.goal_type)
    }

    pub fn has_activity(&self) -> bool {
        self.food != 0.0 || self.exercise != 0.0
    }

    pub fn has_bmr(&self) -> bool {
        self.bmr_and_neat.is_some()
    }

    /// Calories over goal (negative when under).
    pub fn over_goal(&self) -> f64 {
        match self.remaining {
            Some(remaining) => -remaining,
            None => self.display_calories() - self.daily_goal,
        }
    }

    /// Decode one summary value.
    ///
    /// Accepts the tuple layout `[food, exercise, bmr_and_neat, daily_goal,
    /// goal_type, weight?, _, _, remaining?]` and the oldest layout where a
    /// day was only its net calorie number.
    pub fn from_value(value: &Value, default_goal: f64) -> Result<Self, ClientError> {
        match value {
            Value::Number(_) => Ok(DaySummary {
                food: number(Some(value)).unwrap_or(0.0),
                daily_goal: default_goal,
                ..DaySummary::default()
            }),
            Value::Array(items) if items.len() >= 5 => {
                let field = |i: usize| items.get(i);
                Ok(DaySummary {
                    food: number(field(0)).unwrap_or(0.0),
                    exercise: number(field(1)).unwrap_or(0.0),
                    bmr_and_neat: number(field(2)).filter(|b| *b > 0.0),
                    daily_goal: number(field(3))
                        .filter(|g| *g > 0.0)
                        .unwrap_or(default_goal),
                    goal_type: field(4)
                        .and_then(Value::as_str)
                        .map(GoalType::parse_or_default)
                        .unwrap_or_default(),
                    weight: number(field(5)),
                    remaining: number(field(8)),
                })
            }
            Value::Array(items) => Err(ClientError::Decode(format!(
                "weekly summary tuple has {} fields, expected at least 5",
                items.len()
            ))),
            other => Err(ClientError::Decode(format!(
                "unexpected weekly summary value: {}",
                other
            ))),
        }
    }
}

/// The weekly summary keyed by local date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklySummary {
    days: BTreeMap<NaiveDate, DaySummary>,
}

impl WeeklySummary {
    /// Decode the `weekly_summary` object. Malformed days are dropped and
    /// logged so one bad tuple does not blank the whole chart.
    pub fn decode(value: &Value, default_goal: f64) -> Self {
        let Some(map) = value.as_object() else {
            if !value.is_null() {
                tracing::warn!("weekly summary is not an object: {}", value);
            }
            return Self::default();
        };

        let days = map
            .iter()
            .filter_map(|(key, raw)| {
                let Some(date) = parse_date(key) else {
                    tracing::warn!(key, "weekly summary key is not a date");
                    return None;
                };
                match DaySummary::from_value(raw, default_goal) {
                    Ok(day) => Some((date, day)),
                    Err(e) => {
                        tracing::warn!(key, "dropping weekly summary day: {}", e);
                        None
                    }
                }
            })
            .collect();

        Self { days }
    }

    pub fn from_days(days: impl IntoIterator<Item = (NaiveDate, DaySummary)>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DaySummary> {
        self.days.get(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &DaySummary)> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Decode the `days[]` reply of `get_month_data_days`.
pub fn decode_data_dates(value: &Value) -> BTreeSet<NaiveDate> {
    value
        .get("days")
        .and_then(Value::as_array)
        .map(|days| {
            days.iter()
                .filter_map(Value::as_str)
                .filter_map(|s| s.get(..10).and_then(parse_date))
                .collect()
        })
        .unwrap_or_default()
}

// ==================== Linked / Discovered Components ====================

/// A third-party integration entry linked to a profile (e.g. a Peloton
/// account whose workouts are logged automatically).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedComponent {
    pub domain: String,
    pub entry_id: String,
    pub title: String,
}

impl LinkedComponent {
    /// Decode `{ "linked_components": { domain: [entry | entry_id] } }`.
    pub fn decode_all(value: &Value) -> Vec<LinkedComponent> {
        let root = value.get("linked_components").unwrap_or(value);
        let Some(domains) = root.as_object() else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for (domain, entries) in domains {
            for entry in entries.as_array().into_iter().flatten() {
                let linked = match entry {
                    Value::String(entry_id) => Some(LinkedComponent {
                        domain: domain.clone(),
                        entry_id: entry_id.clone(),
                        title: entry_id.clone(),
                    }),
                    Value::Object(fields) => fields
                        .get("entry_id")
                        .or_else(|| fields.get("config_entry_id"))
                        .and_then(Value::as_str)
                        .map(|entry_id| LinkedComponent {
                            domain: domain.clone(),
                            entry_id: entry_id.to_string(),
                            title: fields
                                .get("title")
                                .and_then(Value::as_str)
                                .unwrap_or(entry_id)
                                .to_string(),
                        }),
                    _ => None,
                };
                out.extend(linked);
            }
        }
        out
    }
}

/// A linkable integration found by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredComponent {
    pub domain: String,
    #[serde(alias = "config_entry_id")]
    pub entry_id: String,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub linked_profile: Option<String>,
}

impl DiscoveredComponent {
    pub fn decode_all(value: &Value) -> Vec<DiscoveredComponent> {
        let list = value
            .get("discovered_data")
            .or_else(|| value.get("components"))
            .unwrap_or(value);
        list.as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        serde_json::from_value(item.clone())
                            .map_err(|e| tracing::warn!("skipping discovered component: {}", e))
                            .ok()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A dated goal from `get_goals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub goal_type: GoalType,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub goal_value: f64,
    #[serde(default)]
    pub start_date: Option<String>,
}

// ==================== Host-native payloads ====================

/// A conversation agent offered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationAgent {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// An assist pipeline offered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssistPipeline {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub conversation_engine: Option<String>,
}

// ==================== Lenient numbers ====================

/// Read a JSON number, or a string holding one.
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(number(value.as_ref()))
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    lenient_opt_f64(deserializer).map(|v| v.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ==================== display_calories Tests ====================

    #[test]
    fn test_display_calories_fixed_intake_is_gross() {
        assert_eq!(display_calories(2500.0, 300.0, GoalType::FixedIntake), 2500.0);
        assert_eq!(display_calories(0.0, 300.0, GoalType::FixedIntake), 0.0);
    }

    #[test]
    fn test_display_calories_other_goal_types_are_net() {
        for goal_type in GoalType::ALL
            .into_iter()
            .filter(|g| *g != GoalType::FixedIntake)
        {
            assert_eq!(display_calories(2500.0, 300.0, goal_type), 2200.0);
        }
    }

    #[test]
    fn test_gauge_multiplier_is_pinned() {
        assert_eq!(GoalType::VariableBulk.gauge_multiplier(), 1.1);
        for goal_type in GoalType::ALL
            .into_iter()
            .filter(|g| *g != GoalType::VariableBulk)
        {
            assert_eq!(goal_type.gauge_multiplier(), 1.4, "{}", goal_type);
        }
    }

    #[test]
    fn test_goal_type_round_trip_and_fallback() {
        for goal_type in GoalType::ALL {
            let encoded = serde_json::to_value(goal_type).unwrap();
            let decoded: GoalType = serde_json::from_value(encoded).unwrap();
            assert_eq!(decoded, goal_type);
        }
        let unknown: GoalType = serde_json::from_value(json!("keto_mode")).unwrap();
        assert_eq!(unknown, GoalType::FixedIntake);
    }

    // ==================== DaySummary Decoding Tests ====================

    #[test]
    fn test_decode_legacy_tuple() {
        let value = json!([1800, 200, 2100, 2000, "fixed_net_calories", 180.5]);
        let day = DaySummary::from_value(&value, 1500.0).unwrap();
        assert_eq!(day.food, 1800.0);
        assert_eq!(day.exercise, 200.0);
        assert_eq!(day.bmr_and_neat, Some(2100.0));
        assert_eq!(day.daily_goal, 2000.0);
        assert_eq!(day.goal_type, GoalType::FixedNetCalories);
        assert_eq!(day.weight, Some(180.5));
        assert_eq!(day.remaining, None);
        assert_eq!(day.over_goal(), -400.0);
    }

    #[test]
    fn test_decode_extended_tuple_uses_remaining() {
        let value = json!([1800, 200, 2100, 2000, "fixed_intake", null, null, null, -150]);
        let day = DaySummary::from_value(&value, 1500.0).unwrap();
        assert_eq!(day.remaining, Some(-150.0));
        // remaining wins over goal - display (which would be 200 under)
        assert_eq!(day.over_goal(), 150.0);
    }

    #[test]
    fn test_decode_missing_bmr_and_goal() {
        let value = json!([500, 0, null, 0, "fixed_intake", null]);
        let day = DaySummary::from_value(&value, 1750.0).unwrap();
        assert!(!day.has_bmr());
        assert_eq!(day.daily_goal, 1750.0);
    }

    #[test]
    fn test_decode_bare_number() {
        let day = DaySummary::from_value(&json!(1234), 2000.0).unwrap();
        assert_eq!(day.food, 1234.0);
        assert_eq!(day.display_calories(), 1234.0);
        assert_eq!(day.daily_goal, 2000.0);
    }

    #[test]
    fn test_decode_short_tuple_is_error() {
        assert!(DaySummary::from_value(&json!([1, 2, 3]), 2000.0).is_err());
        assert!(DaySummary::from_value(&json!("x"), 2000.0).is_err());
    }

    #[test]
    fn test_weekly_summary_drops_bad_days() {
        let value = json!({
            "2024-01-07": [100, 0, 2000, 2000, "fixed_intake", null],
            "2024-01-08": [1, 2],
            "not-a-date": [100, 0, 2000, 2000, "fixed_intake", null],
        });
        let summary = WeeklySummary::decode(&value, 2000.0);
        assert_eq!(summary.len(), 1);
        assert!(summary.get(date(2024, 1, 7)).is_some());
    }

    #[test]
    fn test_weekly_summary_non_object_is_empty() {
        assert!(WeeklySummary::decode(&json!(null), 2000.0).is_empty());
        assert!(WeeklySummary::decode(&json!([1, 2]), 2000.0).is_empty());
    }

    // ==================== Payload Decoding Tests ====================

    #[test]
    fn test_daily_data_decoding_and_totals() {
        let value = json!({
            "food_entries": [
                {"id": "a", "timestamp": "2024-01-05T12:00:00", "food_item": "Soup", "calories": 300},
                {"id": "b", "timestamp": "2024-01-05T08:00:00", "food_item": "Egg", "calories": 90}
            ],
            "exercise_entries": [
                {"id": "c", "timestamp": "2024-01-05T10:00:00", "exercise_type": "Run",
                 "calories_burned": 250, "duration_minutes": 30},
                {"id": "d", "timestamp": "2024-01-05T18:00:00", "exercise_type": "Walk",
                 "calories_burned": null}
            ],
            "weight": 180.2,
            "bmr_and_neat": "2100",
            "macros": {"protein": 120, "fat": 60, "carbs": 200}
        });
        let data: DailyData = serde_json::from_value(value).unwrap();
        assert_eq!(data.food_total(), 390.0);
        assert_eq!(data.exercise_total(), 250.0);
        assert_eq!(data.bmr_and_neat, Some(2100.0));
        assert_eq!(data.macros.as_ref().map(|m| m.protein), Some(120.0));

        let entries = data.entries();
        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Egg", "Run", "Soup", "Walk"]);
        assert!(data.find(EntryKind::Exercise, "c").is_some());
        assert!(data.find(EntryKind::Food, "c").is_none());
    }

    #[test]
    fn test_profile_listing_only_has_names() {
        let profiles: UserProfiles = serde_json::from_value(json!({
            "default_profile": null,
            "all_profiles": [{"entity_id": "sensor.calorie_tracker_sam", "spoken_name": "Sam"}]
        }))
        .unwrap();
        assert!(profiles.default_profile.is_none());
        let sam = &profiles.all_profiles[0];
        assert_eq!(sam.daily_goal(), DEFAULT_DAILY_GOAL);
        assert_eq!(sam.weight_unit(), WeightUnit::Lbs);
        assert_eq!(sam.display_name(), "Sam");
    }

    #[test]
    fn test_new_entry_serialization() {
        let food = NewEntry::Food {
            food_item: "Egg".into(),
            calories: 90,
            timestamp: Some("2024-01-05T08:00:00".into()),
        };
        assert_eq!(
            serde_json::to_value(&food).unwrap(),
            json!({"food_item": "Egg", "calories": 90, "timestamp": "2024-01-05T08:00:00"})
        );

        let exercise = NewEntry::Exercise {
            exercise_type: "Run".into(),
            calories_burned: Some(250),
            duration_minutes: None,
            timestamp: None,
        };
        assert_eq!(
            serde_json::to_value(&exercise).unwrap(),
            json!({"exercise_type": "Run", "calories_burned": 250})
        );
    }

    #[test]
    fn test_decode_data_dates() {
        let dates = decode_data_dates(&json!({"days": ["2024-01-03", "2024-01-05T00:00", 7]}));
        assert_eq!(dates.len(), 2);
        assert!(dates.contains(&date(2024, 1, 5)));
    }

    #[test]
    fn test_linked_components_accept_ids_and_objects() {
        let linked = LinkedComponent::decode_all(&json!({
            "linked_components": {
                "peloton": ["abc123", {"entry_id": "def456", "title": "Peloton (Alex)"}]
            }
        }));
        assert_eq!(linked.len(), 2);
        assert_eq!(linked[0].title, "abc123");
        assert_eq!(linked[1].title, "Peloton (Alex)");
        assert!(linked.iter().all(|l| l.domain == "peloton"));
    }

    #[test]
    fn test_discovered_components() {
        let found = DiscoveredComponent::decode_all(&json!({
            "discovered_data": [
                {"domain": "peloton", "config_entry_id": "x1", "name": "Peloton"},
                {"title": "missing domain"}
            ]
        }));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entry_id, "x1");
        assert_eq!(found[0].title, "Peloton");
    }

    #[test]
    fn test_weight_unit_conversion() {
        assert_eq!(WeightUnit::Lbs.from_lbs(1.0), 1.0);
        assert!((WeightUnit::Kg.from_lbs(1.0) - 0.45359237).abs() < 1e-12);
        assert_eq!(WeightUnit::parse("KG"), Some(WeightUnit::Kg));
        assert_eq!(WeightUnit::parse("stone"), None);
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn display_calories_matches_goal_mode(food in 0.0f64..10_000.0, exercise in 0.0f64..5_000.0) {
                prop_assert_eq!(display_calories(food, exercise, GoalType::FixedIntake), food);
                for goal_type in GoalType::ALL.into_iter().filter(|g| *g != GoalType::FixedIntake) {
                    prop_assert_eq!(display_calories(food, exercise, goal_type), food - exercise);
                }
            }
        }
    }
}
