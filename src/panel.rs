//! Panel controller.
//!
//! Owns the selected date, the active profile and everything fetched for
//! it. Network work is split into owned request values (`LoadRequest`,
//! `MonthRequest`, `BootstrapRequest`, `Job`) whose futures are `'static`,
//! so the GUI can hand them to its runtime; the matching `apply_*` /
//! `complete` methods fold the results back in. Every load carries the
//! generation it was issued under and stale results are dropped.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::api::{Analyzer, PhotoAnalysis, PhotoApiClient};
use crate::calendar::{CalendarRow, CalendarView, month_grid};
use crate::cards::CardData;
use crate::client::{CalorieClient, ConversationReply, CurrentUser};
use crate::dates::today;
use crate::editor::{Editor, EditorIntent};
use crate::error::{ClientError, ClientResult};
use crate::gauge::GaugeInput;
use crate::models::{
    ConversationAgent, DailyData, DiscoveredComponent, LinkedComponent, LogEntry, NewEntry,
    Profile, ProfileUpdate, UserProfiles, WeeklySummary, WeightUnit,
};
use crate::profile::{ProfileEditor, ProfileIntent, RESTART_NOTICE, RESTART_TITLE};
use crate::scheduler::{Region, RenderScheduler};
use crate::summary::{DayBar, WeeklyAggregate, week_bars, weekly_aggregate};
use crate::traits::{Clock, Notifier};

pub const SESSION_EXPIRED_TITLE: &str = "Session expired";
pub const SESSION_EXPIRED_NOTICE: &str =
    "Home Assistant rejected the access token. Update HASS_TOKEN and restart the panel.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelStatus {
    #[default]
    Loading,
    Ready,
    /// The user has no calorie tracker profile.
    NoProfile,
    SessionExpired,
}

/// Pick the profile to show: the explicit entity, the user's default, or
/// the first listed profile.
pub fn resolve_profile(profiles: &UserProfiles, explicit: Option<&str>) -> Option<Profile> {
    if let Some(entity) = explicit {
        let found = profiles
            .all_profiles
            .iter()
            .chain(profiles.default_profile.iter())
            .find(|p| p.entity_id == entity);
        match found {
            Some(profile) => return Some(profile.clone()),
            None => warn!(entity, "Requested profile not found, falling back to default"),
        }
    }
    profiles
        .default_profile
        .clone()
        .or_else(|| profiles.all_profiles.first().cloned())
}

// ==================== Bootstrap ====================

/// Everything fetched once per session (and again after profile changes).
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    pub user: Option<CurrentUser>,
    pub profiles: UserProfiles,
    pub active: Option<Profile>,
    pub discovered: Vec<DiscoveredComponent>,
    pub agents: Vec<ConversationAgent>,
    pub analyzers: Vec<Analyzer>,
    pub preferred_analyzer: Option<Analyzer>,
}

pub struct BootstrapRequest {
    client: CalorieClient,
    photo_api: Option<PhotoApiClient>,
    user_id: Option<String>,
    explicit_entity: Option<String>,
}

impl BootstrapRequest {
    /// Only the profile lookup is fatal; optional capabilities degrade to
    /// empty lists.
    pub async fn fetch(self) -> ClientResult<Bootstrap> {
        let user = match self.client.current_user().await {
            Ok(user) => Some(user),
            Err(e) if e.is_unauthorized() => return Err(e),
            Err(e) if self.user_id.is_some() => {
                warn!("Could not read current user: {}", e);
                None
            }
            Err(e) => return Err(e),
        };
        let user_id = self
            .user_id
            .clone()
            .or_else(|| user.as_ref().map(|u| u.id.clone()))
            .unwrap_or_default();

        let profiles = self.client.get_user_profile(&user_id).await?;
        let active = resolve_profile(&profiles, self.explicit_entity.as_deref());

        let discovered = optional(self.client.get_discovered_data().await, "discovered data")?;
        let agents = optional(
            self.client.list_conversation_agents().await,
            "conversation agents",
        )?;

        let mut analyzers = Vec::new();
        let mut preferred_analyzer = None;
        if let Some(api) = &self.photo_api {
            analyzers = optional(api.fetch_analyzers().await, "image analyzers")?;
            if let Some(entry) = active.as_ref().and_then(|p| p.config_entry_id.as_deref()) {
                preferred_analyzer =
                    optional(api.get_preferred_analyzer(entry).await, "preferred analyzer")?;
            }
        }

        info!(
            profiles = profiles.all_profiles.len(),
            analyzers = analyzers.len(),
            agents = agents.len(),
            "Session bootstrapped"
        );
        Ok(Bootstrap {
            user,
            profiles,
            active,
            discovered,
            agents,
            analyzers,
            preferred_analyzer,
        })
    }
}

fn optional<T: Default>(result: ClientResult<T>, what: &str) -> ClientResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_unauthorized() => Err(e),
        Err(e) => {
            warn!("Failed to load {}: {}", what, e);
            Ok(T::default())
        }
    }
}

// ==================== Loads ====================

/// Fetch of everything shown for one profile and date.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub generation: u64,
    pub month_generation: u64,
    pub entity_id: String,
    pub date: NaiveDate,
    pub default_goal: f64,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone)]
pub struct LoadResult {
    pub generation: u64,
    pub month_generation: u64,
    pub daily: ClientResult<DailyData>,
    pub weekly: ClientResult<WeeklySummary>,
    pub month_dates: ClientResult<BTreeSet<NaiveDate>>,
    pub linked: ClientResult<Vec<LinkedComponent>>,
}

impl LoadRequest {
    pub async fn fetch(self, client: CalorieClient) -> LoadResult {
        debug!(generation = self.generation, entity = %self.entity_id, date = %self.date, "Loading");
        let (daily, weekly, month_dates, linked) = tokio::join!(
            client.get_daily_data(&self.entity_id, Some(self.date)),
            client.get_weekly_summary(&self.entity_id, Some(self.date), self.default_goal),
            client.get_month_data_days(&self.entity_id, self.year, self.month),
            client.get_linked_components(&self.entity_id),
        );
        LoadResult {
            generation: self.generation,
            month_generation: self.month_generation,
            daily,
            weekly,
            month_dates,
            linked,
        }
    }
}

/// Fetch of the calendar's data dates after month navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthRequest {
    pub generation: u64,
    pub entity_id: String,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone)]
pub struct MonthResult {
    pub generation: u64,
    pub dates: ClientResult<BTreeSet<NaiveDate>>,
}

impl MonthRequest {
    pub async fn fetch(self, client: CalorieClient) -> MonthResult {
        MonthResult {
            generation: self.generation,
            dates: client
                .get_month_data_days(&self.entity_id, self.year, self.month)
                .await,
        }
    }
}

// ==================== Jobs ====================

/// User actions the panel runs against the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Editor(EditorIntent),
    Profile(ProfileIntent),
    /// Make the active profile the current user's default.
    MakeDefault,
}

#[derive(Debug, Clone, PartialEq)]
enum JobAction {
    Create(NewEntry),
    Update { entry_id: String, entry: NewEntry },
    Delete { entry_id: String, kind: crate::models::EntryKind },
    LogWeight { weight: f64, date: NaiveDate },
    AnalyzePhoto { analyzer: Analyzer, photo: crate::api::PhotoUpload },
    SendChat { agent_id: String, text: String, conversation_id: Option<String> },
    SaveProfile { update: ProfileUpdate, restart_required: bool },
    SetPreferredAnalyzer { profile_entry: String, analyzer: Analyzer },
    Unlink { domain: String, entry_id: String },
    Link(Vec<DiscoveredComponent>),
    MakeDefault { username: String },
}

/// What has to be refetched after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Data,
    Profiles,
}

#[derive(Debug, Clone)]
pub enum JobResult {
    Mutation {
        result: ClientResult<()>,
        refresh: Refresh,
        restart_required: bool,
    },
    Photo(ClientResult<PhotoAnalysis>),
    Chat(ClientResult<ConversationReply>),
}

/// Work left after a job completes.
#[derive(Debug, Clone, PartialEq)]
pub enum Followup {
    None,
    Reload(LoadRequest),
    RefreshProfiles,
}

/// One backend call with everything it needs owned.
pub struct Job {
    client: CalorieClient,
    photo_api: Option<PhotoApiClient>,
    entity_id: String,
    action: JobAction,
}

impl Job {
    pub async fn run(self) -> JobResult {
        let client = &self.client;
        let entity = self.entity_id.as_str();
        let (result, refresh, restart_required) = match self.action {
            JobAction::Create(entry) => (client.create_entry(entity, &entry).await, Refresh::Data, false),
            JobAction::Update { entry_id, entry } => (
                client.update_entry(entity, &entry_id, &entry).await,
                Refresh::Data,
                false,
            ),
            JobAction::Delete { entry_id, kind } => (
                client.delete_entry(entity, &entry_id, kind).await,
                Refresh::Data,
                false,
            ),
            JobAction::LogWeight { weight, date } => (
                client.log_weight(entity, weight, Some(date)).await,
                Refresh::Data,
                false,
            ),
            JobAction::AnalyzePhoto { analyzer, photo } => {
                let Some(api) = &self.photo_api else {
                    return JobResult::Photo(Err(ClientError::Validation(
                        "Photo analysis is not configured".into(),
                    )));
                };
                return JobResult::Photo(
                    api.upload_photo(&analyzer.config_entry_id, analyzer.model.as_deref(), photo)
                        .await,
                );
            }
            JobAction::SendChat {
                agent_id,
                text,
                conversation_id,
            } => {
                return JobResult::Chat(
                    client
                        .process_conversation(&text, &agent_id, conversation_id.as_deref())
                        .await,
                );
            }
            JobAction::SaveProfile {
                update,
                restart_required,
            } => (
                client.update_profile(entity, &update).await,
                Refresh::Profiles,
                restart_required,
            ),
            JobAction::SetPreferredAnalyzer {
                profile_entry,
                analyzer,
            } => {
                let result = match &self.photo_api {
                    Some(api) => api.set_preferred_analyzer(&profile_entry, &analyzer).await,
                    None => Err(ClientError::Validation(
                        "Photo analysis is not configured".into(),
                    )),
                };
                (result, Refresh::Profiles, false)
            }
            JobAction::Unlink { domain, entry_id } => (
                client.unlink_linked_component(entity, &domain, &entry_id).await,
                Refresh::Profiles,
                false,
            ),
            JobAction::Link(components) => (
                client.link_discovered_components(entity, &components).await,
                Refresh::Profiles,
                false,
            ),
            JobAction::MakeDefault { username } => (
                client.set_default_profile(entity, &username).await,
                Refresh::Profiles,
                false,
            ),
        };
        JobResult::Mutation {
            result,
            refresh,
            restart_required,
        }
    }
}

// ==================== Panel ====================

pub struct Panel {
    client: CalorieClient,
    photo_api: Option<PhotoApiClient>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    user_id: Option<String>,
    explicit_entity: Option<String>,
    display_unit: WeightUnit,

    pub status: PanelStatus,
    pub error: Option<String>,
    pub today: NaiveDate,
    pub selected_date: NaiveDate,
    pub calendar: CalendarView,

    pub user: Option<CurrentUser>,
    pub active_profile: Option<Profile>,
    pub all_profiles: Vec<Profile>,
    pub default_entity: Option<String>,
    pub daily: DailyData,
    pub weekly: WeeklySummary,
    pub month_dates: BTreeSet<NaiveDate>,
    pub linked: Vec<LinkedComponent>,
    pub discovered: Vec<DiscoveredComponent>,
    pub agents: Vec<ConversationAgent>,
    pub analyzers: Vec<Analyzer>,
    fetched_preferred: Option<(String, Analyzer)>,
    /// Failed mutation message that survives the resync load.
    mutation_error: Option<String>,

    pub editor: Editor,
    pub profile_editor: ProfileEditor,
    pub scheduler: RenderScheduler,

    generation: u64,
    month_generation: u64,
}

impl Panel {
    pub fn new(
        client: CalorieClient,
        photo_api: Option<PhotoApiClient>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let today = today(clock.as_ref());
        Self {
            client,
            photo_api,
            clock,
            notifier,
            user_id: None,
            explicit_entity: None,
            display_unit: WeightUnit::default(),
            status: PanelStatus::Loading,
            error: None,
            today,
            selected_date: today,
            calendar: CalendarView::containing(today),
            user: None,
            active_profile: None,
            all_profiles: Vec::new(),
            default_entity: None,
            daily: DailyData::default(),
            weekly: WeeklySummary::default(),
            month_dates: BTreeSet::new(),
            linked: Vec::new(),
            discovered: Vec::new(),
            agents: Vec::new(),
            analyzers: Vec::new(),
            fetched_preferred: None,
            mutation_error: None,
            editor: Editor::new(),
            profile_editor: ProfileEditor::new(),
            scheduler: RenderScheduler::new(),
            generation: 0,
            month_generation: 0,
        }
    }

    /// Host user whose profiles are listed (resolved via the host when unset).
    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Profile to open instead of the user's default.
    pub fn with_profile(mut self, entity_id: Option<String>) -> Self {
        self.explicit_entity = entity_id;
        self
    }

    /// Weight unit for profiles that do not set one.
    pub fn with_display_unit(mut self, unit: WeightUnit) -> Self {
        self.display_unit = unit;
        self
    }

    pub fn client(&self) -> CalorieClient {
        self.client.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.active_profile.as_ref().map(|p| p.entity_id.as_str())
    }

    pub fn is_default_profile(&self) -> bool {
        self.entity_id().is_some() && self.entity_id() == self.default_entity.as_deref()
    }

    // ---------- bootstrap ----------

    pub fn bootstrap_request(&self) -> BootstrapRequest {
        BootstrapRequest {
            client: self.client.clone(),
            photo_api: self.photo_api.clone(),
            user_id: self.user_id.clone(),
            explicit_entity: self
                .entity_id()
                .map(str::to_string)
                .or_else(|| self.explicit_entity.clone()),
        }
    }

    pub fn apply_bootstrap(&mut self, result: ClientResult<Bootstrap>) -> Option<LoadRequest> {
        let mut boot = match result {
            Ok(boot) => boot,
            Err(e) => {
                self.record_failure("load profiles", &e);
                return None;
            }
        };
        let unit = self.display_unit;
        for profile in boot
            .profiles
            .all_profiles
            .iter_mut()
            .chain(boot.profiles.default_profile.iter_mut())
            .chain(boot.active.iter_mut())
        {
            profile.weight_unit.get_or_insert(unit);
        }
        if let (None, Some(user)) = (&self.user_id, &boot.user) {
            self.user_id = Some(user.id.clone());
        }
        self.user = boot.user;
        self.default_entity = boot.profiles.default_profile.as_ref().map(|p| p.entity_id.clone());
        self.all_profiles = boot.profiles.all_profiles;
        self.discovered = boot.discovered;
        self.agents = boot.agents;
        self.analyzers = boot.analyzers;
        self.fetched_preferred = match (&boot.active, boot.preferred_analyzer) {
            (Some(profile), Some(analyzer)) => Some((profile.entity_id.clone(), analyzer)),
            _ => None,
        };

        match boot.active {
            Some(profile) => {
                info!(entity = %profile.entity_id, "Active profile");
                self.active_profile = Some(profile);
                self.status = PanelStatus::Ready;
                self.begin_load()
            }
            None => {
                warn!("No calorie tracker profile for this user");
                self.active_profile = None;
                self.status = PanelStatus::NoProfile;
                None
            }
        }
    }

    // ---------- loads ----------

    /// Start a load of the selected date, superseding any load in flight.
    pub fn begin_load(&mut self) -> Option<LoadRequest> {
        if self.status == PanelStatus::SessionExpired {
            return None;
        }
        let profile = self.active_profile.as_ref()?;
        self.generation += 1;
        // a full load also covers the visible month
        self.month_generation += 1;
        Some(LoadRequest {
            generation: self.generation,
            month_generation: self.month_generation,
            entity_id: profile.entity_id.clone(),
            date: self.selected_date,
            default_goal: profile.daily_goal(),
            year: self.calendar.year,
            month: self.calendar.month,
        })
    }

    /// Fold a load result in. Returns `false` when it was superseded.
    pub fn apply_load(&mut self, result: LoadResult) -> bool {
        if result.generation != self.generation {
            debug!(
                stale = result.generation,
                current = self.generation,
                "Dropping superseded load"
            );
            return false;
        }
        self.error = self.mutation_error.take();
        self.daily = self.loaded(result.daily, "daily data");
        self.weekly = self.loaded(result.weekly, "weekly summary");
        // month navigation after this request owns the calendar
        if result.month_generation == self.month_generation {
            self.month_dates = self.loaded(result.month_dates, "calendar");
        } else {
            debug!(stale = result.month_generation, "Keeping newer month dates");
        }
        self.linked = self.loaded(result.linked, "linked components");
        self.scheduler.mark_all();
        true
    }

    pub fn apply_month(&mut self, result: MonthResult) -> bool {
        if result.generation != self.month_generation {
            debug!(stale = result.generation, "Dropping superseded month load");
            return false;
        }
        self.month_dates = self.loaded(result.dates, "calendar");
        self.scheduler.mark(Region::Calendar);
        true
    }

    fn loaded<T: Default>(&mut self, result: ClientResult<T>, what: &str) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                self.record_failure(&format!("load {}", what), &e);
                T::default()
            }
        }
    }

    fn record_failure(&mut self, action: &str, e: &ClientError) {
        if e.is_unauthorized() {
            self.expire_session();
            return;
        }
        warn!("Failed to {}: {}", action, e);
        self.error = Some(format!("Failed to {}: {}", action, e));
    }

    fn expire_session(&mut self) {
        if self.status == PanelStatus::SessionExpired {
            return;
        }
        error!("Session expired");
        self.status = PanelStatus::SessionExpired;
        self.editor.close_all_modals();
        self.profile_editor.close();
        if let Err(e) = self
            .notifier
            .notify(SESSION_EXPIRED_TITLE, SESSION_EXPIRED_NOTICE)
        {
            warn!("Failed to send notification: {}", e);
        }
    }

    // ---------- navigation ----------

    pub fn select_date(&mut self, date: NaiveDate) -> Option<LoadRequest> {
        self.selected_date = date;
        if !self.calendar.contains(date) {
            self.calendar = CalendarView::containing(date);
        }
        self.scheduler.mark_all();
        self.begin_load()
    }

    pub fn go_to_today(&mut self) -> Option<LoadRequest> {
        self.today = today(self.clock.as_ref());
        self.select_date(self.today)
    }

    pub fn shift_day(&mut self, days: i64) -> Option<LoadRequest> {
        let date = self.selected_date + chrono::Duration::days(days);
        self.select_date(date)
    }

    /// Show another month in the calendar without changing the selection.
    pub fn show_month(&mut self, year: i32, month: u32) -> Option<MonthRequest> {
        let (year, month) = self.calendar.set_month(year, month)?;
        self.month_request(year, month)
    }

    pub fn shift_month(&mut self, delta: i32) -> Option<MonthRequest> {
        let (year, month) = match delta {
            -12 => self.calendar.prev_year(),
            12 => self.calendar.next_year(),
            d if d < 0 => self.calendar.prev_month(),
            _ => self.calendar.next_month(),
        };
        self.month_request(year, month)
    }

    fn month_request(&mut self, year: i32, month: u32) -> Option<MonthRequest> {
        self.scheduler.mark(Region::Calendar);
        if self.status == PanelStatus::SessionExpired {
            return None;
        }
        let entity_id = self.entity_id()?.to_string();
        self.month_generation += 1;
        Some(MonthRequest {
            generation: self.month_generation,
            entity_id,
            year,
            month,
        })
    }

    pub fn switch_profile(&mut self, entity_id: &str) -> Option<LoadRequest> {
        let profile = self
            .all_profiles
            .iter()
            .find(|p| p.entity_id == entity_id)
            .cloned()?;
        info!(entity = entity_id, "Switching profile");
        self.active_profile = Some(profile);
        self.editor.close_all_modals();
        self.profile_editor.close();
        self.begin_load()
    }

    /// Clock tick. Follows midnight when today was selected and refreshes
    /// the in-progress BMR share.
    pub fn tick(&mut self) -> Option<LoadRequest> {
        let now_today = today(self.clock.as_ref());
        self.scheduler.mark(Region::Weekly);
        if now_today == self.today {
            return None;
        }
        let followed = self.selected_date == self.today;
        self.today = now_today;
        self.scheduler.mark_all();
        if followed {
            info!(date = %now_today, "Day rolled over");
            self.select_date(now_today)
        } else {
            None
        }
    }

    // ---------- derived views ----------

    pub fn gauge_input(&self) -> GaugeInput {
        let profile = self.active_profile.clone().unwrap_or_default();
        GaugeInput::for_day(&profile, &self.daily, self.weekly.get(self.selected_date))
    }

    pub fn week_bars(&self) -> [DayBar; 7] {
        let goal = self
            .active_profile
            .as_ref()
            .map(Profile::daily_goal)
            .unwrap_or(crate::models::DEFAULT_DAILY_GOAL);
        week_bars(&self.weekly, self.selected_date, self.today, goal)
    }

    pub fn weekly_aggregate(&self) -> WeeklyAggregate {
        let unit = self
            .active_profile
            .as_ref()
            .map(Profile::weight_unit)
            .unwrap_or_default();
        weekly_aggregate(&self.weekly, self.selected_date, self.clock.now_local(), unit)
    }

    pub fn month_rows(&self) -> Vec<CalendarRow> {
        month_grid(
            self.calendar.year,
            self.calendar.month,
            &self.month_dates,
            self.selected_date,
            self.today,
        )
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.daily.entries()
    }

    /// Loaded state in the shape the card builders take.
    pub fn card_data(&self) -> CardData {
        CardData {
            profile: self.active_profile.clone().unwrap_or_default(),
            daily: self.daily.clone(),
            weekly: self.weekly.clone(),
            month_dates: self.month_dates.clone(),
            selected: self.selected_date,
            now: self.clock.now_local(),
        }
    }

    /// The preferred analyzer of the active profile, if still offered.
    pub fn preferred_analyzer(&self) -> Option<&Analyzer> {
        let entity = self.entity_id()?;
        let wanted = self
            .active_profile
            .as_ref()
            .and_then(|p| p.preferred_image_analyzer.as_deref());
        if let Some(id) = wanted {
            if let Some(found) = self.analyzers.iter().find(|a| a.config_entry_id == id) {
                return Some(found);
            }
        }
        self.fetched_preferred
            .as_ref()
            .filter(|(owner, _)| owner == entity)
            .map(|(_, analyzer)| analyzer)
    }

    // ---------- editor shortcuts ----------

    pub fn open_photo(&mut self) {
        let preferred = self.preferred_analyzer().cloned();
        self.editor.open_photo(self.analyzers.clone(), preferred.as_ref());
    }

    pub fn open_chat(&mut self) {
        self.editor.open_chat(&self.agents);
    }

    pub fn open_profile_editor(&mut self) {
        if let Some(profile) = &self.active_profile {
            self.profile_editor.open(profile);
        }
    }

    pub fn submit_entry(&mut self) -> Option<Intent> {
        self.editor
            .submit(self.selected_date, self.clock.now_local())
            .map(Intent::Editor)
    }

    pub fn confirm_review(&mut self) -> Vec<Intent> {
        self.editor
            .confirm_review(self.selected_date, self.clock.now_local())
            .into_iter()
            .map(Intent::Editor)
            .collect()
    }

    pub fn save_profile(&mut self) -> Vec<Intent> {
        self.profile_editor
            .save()
            .into_iter()
            .map(Intent::Profile)
            .collect()
    }

    // ---------- jobs ----------

    /// Turn an intent into a job for the active profile.
    pub fn job(&mut self, intent: Intent) -> Option<Job> {
        if self.status == PanelStatus::SessionExpired {
            return None;
        }
        let Some(entity_id) = self.entity_id().map(str::to_string) else {
            self.error = Some("No profile selected".into());
            return None;
        };

        let action = match intent {
            Intent::Editor(EditorIntent::Create(entry)) => JobAction::Create(entry),
            Intent::Editor(EditorIntent::Update { entry_id, entry }) => {
                JobAction::Update { entry_id, entry }
            }
            Intent::Editor(EditorIntent::Delete { entry_id, kind }) => {
                JobAction::Delete { entry_id, kind }
            }
            Intent::Editor(EditorIntent::LogWeight { weight, date }) => {
                JobAction::LogWeight { weight, date }
            }
            Intent::Editor(EditorIntent::AnalyzePhoto { analyzer, photo }) => {
                JobAction::AnalyzePhoto { analyzer, photo }
            }
            Intent::Editor(EditorIntent::SendChat {
                agent_id,
                text,
                conversation_id,
            }) => JobAction::SendChat {
                agent_id,
                text,
                conversation_id,
            },
            Intent::Profile(ProfileIntent::Save {
                update,
                restart_required,
            }) => JobAction::SaveProfile {
                update,
                restart_required,
            },
            Intent::Profile(ProfileIntent::SetPreferredAnalyzer(id)) => {
                let analyzer = self.analyzers.iter().find(|a| a.config_entry_id == id).cloned();
                let profile_entry = self
                    .active_profile
                    .as_ref()
                    .and_then(|p| p.config_entry_id.clone())
                    .or_else(|| self.daily.config_entry_id.clone());
                match (analyzer, profile_entry) {
                    (Some(analyzer), Some(profile_entry)) => JobAction::SetPreferredAnalyzer {
                        profile_entry,
                        analyzer,
                    },
                    _ => {
                        warn!(analyzer = %id, "Cannot set preferred analyzer");
                        self.error = Some("That image analyzer is no longer available".into());
                        return None;
                    }
                }
            }
            Intent::Profile(ProfileIntent::Unlink { domain, entry_id }) => {
                JobAction::Unlink { domain, entry_id }
            }
            Intent::Profile(ProfileIntent::Link(components)) => JobAction::Link(components),
            Intent::MakeDefault => {
                let Some(username) = self.user.as_ref().map(|u| u.name.clone()) else {
                    self.error = Some("Current user is unknown".into());
                    return None;
                };
                JobAction::MakeDefault { username }
            }
        };
        debug!(?action, "Job");

        Some(Job {
            client: self.client.clone(),
            photo_api: self.photo_api.clone(),
            entity_id,
            action,
        })
    }

    /// Fold a job result in and say what to refetch.
    pub fn complete(&mut self, result: JobResult) -> Followup {
        match result {
            JobResult::Photo(result) => {
                if let Err(e) = &result {
                    if e.is_unauthorized() {
                        self.expire_session();
                        return Followup::None;
                    }
                }
                self.editor.photo_finished(result);
                Followup::None
            }
            JobResult::Chat(result) => {
                if let Err(e) = &result {
                    if e.is_unauthorized() {
                        self.expire_session();
                        return Followup::None;
                    }
                }
                self.editor.chat_replied(result);
                Followup::None
            }
            JobResult::Mutation {
                result: Err(e), ..
            } => {
                self.record_failure("save changes", &e);
                if e.is_unauthorized() {
                    Followup::None
                } else {
                    self.mutation_error = self.error.clone();
                    // resync with whatever the backend has
                    self.begin_load().map_or(Followup::None, Followup::Reload)
                }
            }
            JobResult::Mutation {
                result: Ok(()),
                refresh,
                restart_required,
            } => {
                if restart_required {
                    if let Err(e) = self.notifier.notify(RESTART_TITLE, RESTART_NOTICE) {
                        warn!("Failed to send notification: {}", e);
                    }
                }
                match refresh {
                    Refresh::Data => self.begin_load().map_or(Followup::None, Followup::Reload),
                    Refresh::Profiles => Followup::RefreshProfiles,
                }
            }
        }
    }

    // ---------- headless driving ----------

    /// Bootstrap and load in one go.
    pub async fn start(&mut self) {
        let result = self.bootstrap_request().fetch().await;
        if let Some(request) = self.apply_bootstrap(result) {
            self.load(request).await;
        }
    }

    pub async fn load(&mut self, request: LoadRequest) {
        let result = request.fetch(self.client()).await;
        self.apply_load(result);
    }

    pub async fn load_month(&mut self, request: MonthRequest) {
        let result = request.fetch(self.client()).await;
        self.apply_month(result);
    }

    /// Run one intent and its followup to completion.
    pub async fn execute(&mut self, intent: Intent) {
        let Some(job) = self.job(intent) else {
            return;
        };
        let result = job.run().await;
        match self.complete(result) {
            Followup::None => {}
            Followup::Reload(request) => self.load(request).await,
            Followup::RefreshProfiles => self.start().await,
        }
    }
}
