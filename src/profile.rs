//! Profile editor: a local draft of the active profile, submitted as one
//! full-field update, plus linked device management.

use std::collections::BTreeSet;

use crate::models::{DiscoveredComponent, GoalType, LinkedComponent, Profile, ProfileUpdate, WeightUnit};

pub const RESTART_TITLE: &str = "Restart required";
pub const RESTART_NOTICE: &str =
    "The profile name changed. Restart Home Assistant to rename the tracker's sensors.";

/// Editable profile fields as typed by the user.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileDraft {
    pub spoken_name: String,
    pub daily_goal: String,
    pub goal_type: GoalType,
    pub weight_unit: WeightUnit,
    pub include_exercise_in_net: bool,
    pub starting_weight: String,
    pub goal_weight: String,
    pub birth_year: String,
    pub sex: String,
    pub height: String,
    pub height_unit: String,
    pub body_fat_pct: String,
    pub activity_multiplier: String,
    /// Config entry id of the preferred image analyzer.
    pub preferred_analyzer: Option<String>,
}

fn opt_text(value: Option<f64>) -> String {
    value.map(|v| format!("{}", v)).unwrap_or_default()
}

fn parse_opt(input: &str, field: &str) -> Result<Option<f64>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(format!("{} must be a non-negative number", field)),
    }
}

fn non_empty(input: &str) -> Option<String> {
    let input = input.trim();
    (!input.is_empty()).then(|| input.to_string())
}

impl ProfileDraft {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            spoken_name: profile.spoken_name.clone(),
            daily_goal: format!("{}", profile.daily_goal().round() as i64),
            goal_type: profile.goal_type(),
            weight_unit: profile.weight_unit(),
            include_exercise_in_net: profile.include_exercise_in_net.unwrap_or(true),
            starting_weight: opt_text(profile.starting_weight),
            goal_weight: opt_text(profile.goal_weight),
            birth_year: profile.birth_year.map(|y| y.to_string()).unwrap_or_default(),
            sex: profile.sex.clone().unwrap_or_default(),
            height: opt_text(profile.height),
            height_unit: profile.height_unit.clone().unwrap_or_default(),
            body_fat_pct: opt_text(profile.body_fat_pct),
            activity_multiplier: opt_text(profile.activity_multiplier),
            preferred_analyzer: profile.preferred_image_analyzer.clone(),
        }
    }

    /// Validate every field into a full update.
    pub fn to_update(&self) -> Result<ProfileUpdate, String> {
        let spoken_name = self.spoken_name.trim();
        if spoken_name.is_empty() {
            return Err("Name is required".to_string());
        }
        let daily_goal = match parse_opt(&self.daily_goal, "Daily goal")? {
            Some(goal) if goal > 0.0 => goal.round() as i64,
            _ => return Err("Daily goal must be greater than zero".to_string()),
        };
        let birth_year = match non_empty(&self.birth_year) {
            None => None,
            Some(year) => match year.parse::<i32>() {
                Ok(y) if (1900..=2100).contains(&y) => Some(y),
                _ => return Err("Birth year must be a four-digit year".to_string()),
            },
        };
        let body_fat_pct = parse_opt(&self.body_fat_pct, "Body fat %")?;
        if body_fat_pct.is_some_and(|p| p >= 100.0) {
            return Err("Body fat % must be below 100".to_string());
        }

        Ok(ProfileUpdate {
            spoken_name: spoken_name.to_string(),
            daily_goal,
            goal_type: self.goal_type,
            weight_unit: self.weight_unit,
            include_exercise_in_net: self.include_exercise_in_net,
            starting_weight: parse_opt(&self.starting_weight, "Starting weight")?,
            goal_weight: parse_opt(&self.goal_weight, "Goal weight")?,
            birth_year,
            sex: non_empty(&self.sex),
            height: parse_opt(&self.height, "Height")?,
            height_unit: non_empty(&self.height_unit),
            body_fat_pct,
            activity_multiplier: parse_opt(&self.activity_multiplier, "Activity multiplier")?,
        })
    }
}

/// Work the profile editor needs done by the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileIntent {
    Save {
        update: ProfileUpdate,
        restart_required: bool,
    },
    SetPreferredAnalyzer(String),
    Unlink { domain: String, entry_id: String },
    Link(Vec<DiscoveredComponent>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileEditor {
    original: Option<Profile>,
    pub draft: Option<ProfileDraft>,
    pub error: Option<String>,
    pub restart_required: bool,
    pending_unlink: Option<LinkedComponent>,
    selected_discovered: BTreeSet<String>,
}

impl ProfileEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, profile: &Profile) {
        self.original = Some(profile.clone());
        self.draft = Some(ProfileDraft::from_profile(profile));
        self.error = None;
        self.pending_unlink = None;
        self.selected_discovered.clear();
    }

    pub fn close(&mut self) {
        self.original = None;
        self.draft = None;
        self.error = None;
        self.pending_unlink = None;
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft_mut(&mut self) -> Option<&mut ProfileDraft> {
        self.draft.as_mut()
    }

    /// Validate the draft. On success the editor closes and the intents to
    /// run are returned; on failure the message is kept in `error`.
    pub fn save(&mut self) -> Vec<ProfileIntent> {
        let (Some(draft), Some(original)) = (&self.draft, &self.original) else {
            return Vec::new();
        };
        let update = match draft.to_update() {
            Ok(update) => update,
            Err(e) => {
                self.error = Some(e);
                return Vec::new();
            }
        };

        let restart_required = update.spoken_name != original.spoken_name;
        let mut intents = vec![ProfileIntent::Save {
            update,
            restart_required,
        }];
        if let Some(analyzer) = &draft.preferred_analyzer {
            if original.preferred_image_analyzer.as_ref() != Some(analyzer) {
                intents.push(ProfileIntent::SetPreferredAnalyzer(analyzer.clone()));
            }
        }

        self.restart_required |= restart_required;
        self.close();
        intents
    }

    // ---------- linked devices ----------

    pub fn pending_unlink(&self) -> Option<&LinkedComponent> {
        self.pending_unlink.as_ref()
    }

    /// Ask for confirmation before unlinking.
    pub fn request_unlink(&mut self, component: LinkedComponent) {
        self.pending_unlink = Some(component);
    }

    pub fn cancel_unlink(&mut self) {
        self.pending_unlink = None;
    }

    pub fn confirm_unlink(&mut self) -> Option<ProfileIntent> {
        self.pending_unlink.take().map(|c| ProfileIntent::Unlink {
            domain: c.domain,
            entry_id: c.entry_id,
        })
    }

    pub fn is_discovered_selected(&self, entry_id: &str) -> bool {
        self.selected_discovered.contains(entry_id)
    }

    pub fn toggle_discovered(&mut self, entry_id: &str) {
        if !self.selected_discovered.remove(entry_id) {
            self.selected_discovered.insert(entry_id.to_string());
        }
    }

    pub fn link_selected(&mut self, discovered: &[DiscoveredComponent]) -> Option<ProfileIntent> {
        let chosen: Vec<DiscoveredComponent> = discovered
            .iter()
            .filter(|c| self.selected_discovered.contains(&c.entry_id))
            .cloned()
            .collect();
        if chosen.is_empty() {
            return None;
        }
        self.selected_discovered.clear();
        Some(ProfileIntent::Link(chosen))
    }
}

/// Linked components grouped by integration domain, in domain order.
pub fn group_by_domain(linked: &[LinkedComponent]) -> Vec<(String, Vec<LinkedComponent>)> {
    let mut groups: Vec<(String, Vec<LinkedComponent>)> = Vec::new();
    for component in linked {
        match groups.iter_mut().find(|(d, _)| *d == component.domain) {
            Some((_, items)) => items.push(component.clone()),
            None => groups.push((component.domain.clone(), vec![component.clone()])),
        }
    }
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            entity_id: "sensor.calorie_tracker_sam".into(),
            spoken_name: "Sam".into(),
            daily_goal: Some(1800.0),
            goal_type: Some(GoalType::FixedDeficit),
            starting_weight: Some(200.0),
            goal_weight: Some(180.0),
            weight_unit: Some(WeightUnit::Lbs),
            include_exercise_in_net: Some(true),
            birth_year: Some(1990),
            preferred_image_analyzer: Some("openai-1".into()),
            ..Profile::default()
        }
    }

    fn linked(domain: &str, id: &str) -> LinkedComponent {
        LinkedComponent {
            domain: domain.into(),
            entry_id: id.into(),
            title: id.into(),
        }
    }

    #[test]
    fn test_draft_is_seeded_from_profile() {
        let draft = ProfileDraft::from_profile(&profile());
        assert_eq!(draft.spoken_name, "Sam");
        assert_eq!(draft.daily_goal, "1800");
        assert_eq!(draft.starting_weight, "200");
        assert_eq!(draft.birth_year, "1990");
        assert_eq!(draft.height, "");
    }

    #[test]
    fn test_save_submits_full_update_without_restart() {
        let mut editor = ProfileEditor::new();
        editor.open(&profile());
        editor.draft_mut().unwrap().daily_goal = "1700".into();

        let intents = editor.save();
        assert_eq!(intents.len(), 1);
        match &intents[0] {
            ProfileIntent::Save {
                update,
                restart_required,
            } => {
                assert!(!restart_required);
                assert_eq!(update.daily_goal, 1700);
                assert_eq!(update.goal_type, GoalType::FixedDeficit);
                assert_eq!(update.goal_weight, Some(180.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!editor.is_editing());
        assert!(!editor.restart_required);
    }

    #[test]
    fn test_name_change_requires_restart() {
        let mut editor = ProfileEditor::new();
        editor.open(&profile());
        editor.draft_mut().unwrap().spoken_name = "Samantha".into();
        let intents = editor.save();
        assert!(matches!(
            intents[0],
            ProfileIntent::Save {
                restart_required: true,
                ..
            }
        ));
        assert!(editor.restart_required);
    }

    #[test]
    fn test_analyzer_change_adds_intent() {
        let mut editor = ProfileEditor::new();
        editor.open(&profile());
        editor.draft_mut().unwrap().preferred_analyzer = Some("gemini-2".into());
        let intents = editor.save();
        assert_eq!(
            intents.last(),
            Some(&ProfileIntent::SetPreferredAnalyzer("gemini-2".into()))
        );
    }

    #[test]
    fn test_invalid_draft_keeps_editor_open() {
        let mut editor = ProfileEditor::new();
        editor.open(&profile());
        editor.draft_mut().unwrap().daily_goal = "zero".into();
        assert!(editor.save().is_empty());
        assert!(editor.is_editing());
        assert!(editor.error.is_some());

        editor.draft_mut().unwrap().daily_goal = "2000".into();
        editor.draft_mut().unwrap().birth_year = "90".into();
        assert!(editor.save().is_empty());
        assert_eq!(editor.error.as_deref(), Some("Birth year must be a four-digit year"));
    }

    #[test]
    fn test_unlink_requires_confirmation() {
        let mut editor = ProfileEditor::new();
        assert!(editor.confirm_unlink().is_none());

        editor.request_unlink(linked("peloton", "abc"));
        editor.cancel_unlink();
        assert!(editor.confirm_unlink().is_none());

        editor.request_unlink(linked("peloton", "abc"));
        assert_eq!(
            editor.confirm_unlink(),
            Some(ProfileIntent::Unlink {
                domain: "peloton".into(),
                entry_id: "abc".into()
            })
        );
        assert!(editor.pending_unlink().is_none());
    }

    #[test]
    fn test_link_selected_discovered() {
        let discovered = vec![
            DiscoveredComponent {
                domain: "peloton".into(),
                entry_id: "p1".into(),
                title: "Peloton".into(),
                linked_profile: None,
            },
            DiscoveredComponent {
                domain: "peloton".into(),
                entry_id: "p2".into(),
                title: "Peloton 2".into(),
                linked_profile: None,
            },
        ];
        let mut editor = ProfileEditor::new();
        assert!(editor.link_selected(&discovered).is_none());
        editor.toggle_discovered("p2");
        assert!(editor.is_discovered_selected("p2"));
        match editor.link_selected(&discovered) {
            Some(ProfileIntent::Link(items)) => assert_eq!(items[0].entry_id, "p2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_group_by_domain() {
        let groups = group_by_domain(&[
            linked("peloton", "a"),
            linked("garmin", "b"),
            linked("peloton", "c"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "garmin");
        assert_eq!(groups[1].1.len(), 2);
    }
}
