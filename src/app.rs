use std::{path::PathBuf, sync::Arc, time::Duration};

use calorie_panel::{
    CalorieClient, PhotoApiClient, PhotoUpload,
    calendar::CalendarCell,
    cards::{CardConfig, CardKind, build_card},
    config::AppConfig,
    dates::parse_date,
    drawing::Drawing,
    editor::{ChatRole, EntryForm, Modal},
    error::ClientError,
    gauge::build_gauge,
    models::{EntryKind, GoalType, LinkedComponent, LogEntry, WeightUnit},
    panel::{
        Bootstrap, Followup, Intent, JobResult, LoadRequest, LoadResult, MonthRequest,
        MonthResult, Panel, PanelStatus, SESSION_EXPIRED_NOTICE, SESSION_EXPIRED_TITLE,
    },
    profile::{ProfileDraft, RESTART_NOTICE, group_by_domain},
    scheduler::Region,
    style,
    summary::{DayBar, WeeklyAggregate},
    traits::{Clock, Notifier},
    widgets::{
        drawing::DrawingWidget,
        weekly_chart::{ChartEvent, WeeklyChart},
    },
};
use chrono::NaiveDate;
use iced::{
    Alignment, Border, Color, Element, Length, Shadow, Subscription, Task, Theme, Vector,
    widget::{
        Column, Row, Space, button,
        canvas::{Cache, Canvas},
        center, checkbox, column, container, mouse_area, opaque, row, scrollable, stack, text,
        text_input,
    },
};
use thiserror::Error;
use tracing::{debug, info};

/// Typed Application Errors
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("{0}")]
    Photo(String),
    #[error("{0}")]
    Validation(String),
}

impl From<ClientError> for AppError {
    fn from(e: ClientError) -> Self {
        AppError::Photo(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Dashboard,
    Profile,
}

/// Field edits of the profile draft.
#[derive(Debug, Clone)]
pub enum DraftField {
    Name(String),
    DailyGoal(String),
    GoalType(GoalType),
    WeightUnit(WeightUnit),
    IncludeExercise(bool),
    StartingWeight(String),
    GoalWeight(String),
    BirthYear(String),
    Sex(String),
    Height(String),
    HeightUnit(String),
    BodyFat(String),
    Activity(String),
    PreferredAnalyzer(String),
}

impl DraftField {
    fn apply(self, draft: &mut ProfileDraft) {
        match self {
            DraftField::Name(v) => draft.spoken_name = v,
            DraftField::DailyGoal(v) => draft.daily_goal = v,
            DraftField::GoalType(v) => draft.goal_type = v,
            DraftField::WeightUnit(v) => draft.weight_unit = v,
            DraftField::IncludeExercise(v) => draft.include_exercise_in_net = v,
            DraftField::StartingWeight(v) => draft.starting_weight = v,
            DraftField::GoalWeight(v) => draft.goal_weight = v,
            DraftField::BirthYear(v) => draft.birth_year = v,
            DraftField::Sex(v) => draft.sex = v,
            DraftField::Height(v) => draft.height = v,
            DraftField::HeightUnit(v) => draft.height_unit = v,
            DraftField::BodyFat(v) => draft.body_fat_pct = v,
            DraftField::Activity(v) => draft.activity_multiplier = v,
            DraftField::PreferredAnalyzer(v) => draft.preferred_analyzer = Some(v),
        }
    }
}

/// Field edits of the add/edit entry form.
#[derive(Debug, Clone)]
pub enum FormField {
    Name(String),
    Calories(String),
    Duration(String),
    Time(String),
}

struct UiState {
    current_view: ViewMode,
    is_loading: bool,
    date_input: String,
    weight_input: String,
    photo_path: String,
    toast: Option<String>,
}

/// Drawings and chart data rebuilt only when their region is flushed.
struct ViewCache {
    gauge: Drawing,
    macros: Drawing,
    bars: [DayBar; 7],
    aggregate: WeeklyAggregate,
    gauge_cache: Cache,
    weekly_cache: Cache,
    macros_cache: Cache,
}

impl ViewCache {
    fn new(panel: &Panel) -> Self {
        Self {
            gauge: build_gauge(&panel.gauge_input()),
            macros: build_card(&CardConfig::new(CardKind::Macros), &panel.card_data()),
            bars: panel.week_bars(),
            aggregate: panel.weekly_aggregate(),
            gauge_cache: Cache::new(),
            weekly_cache: Cache::new(),
            macros_cache: Cache::new(),
        }
    }
}

pub struct CaloriePanelApp {
    config: Arc<AppConfig>,
    panel: Panel,
    error: Option<AppError>,
    ui: UiState,
    views: ViewCache,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    RefreshNow,
    Chart(ChartEvent),

    // Backend results
    Bootstrapped(Result<Bootstrap, ClientError>),
    Loaded(LoadResult),
    MonthLoaded(MonthResult),
    JobFinished(JobResult),
    ClearToast,

    // Navigation
    SwitchView(ViewMode),
    SwitchProfile(String),
    MakeDefault,
    ShiftDay(i64),
    GoToToday,
    SelectDate(NaiveDate),
    ShiftMonth(i32),
    DateInputChanged(String),
    ApplyDate,

    // Entries
    OpenAdd(EntryKind),
    EditEntry(LogEntry),
    DeleteEntry(LogEntry),
    Form(FormField),
    SubmitForm,
    CloseModal,
    WeightInputChanged(String),
    LogWeight,

    // Photo flow
    OpenPhoto,
    ChooseAnalyzer(usize),
    PhotoPathChanged(String),
    UploadPhoto,
    PhotoRead(Result<PhotoUpload, AppError>),
    ToggleReviewItem(usize),
    ReviewCalories(usize, String),
    ConfirmReview,

    // Chat flow
    OpenChat,
    ChatInput(String),
    SendChat,

    // Profile editor
    EditProfile,
    Draft(DraftField),
    SaveProfile,
    CancelProfile,
    RequestUnlink(LinkedComponent),
    ConfirmUnlink,
    CancelUnlink,
    ToggleDiscovered(String),
    LinkSelected,
    DismissRestartNotice,
}

impl CaloriePanelApp {
    pub fn new(
        config: Arc<AppConfig>,
        client: CalorieClient,
        photo_api: PhotoApiClient,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, Task<Message>) {
        let panel = Panel::new(client, Some(photo_api), clock, notifier)
            .with_user(config.hass.user_id.clone())
            .with_profile(config.hass.profile_entity_id.clone())
            .with_display_unit(config.display.weight_unit);
        let views = ViewCache::new(&panel);

        let app = Self {
            config,
            error: None,
            ui: UiState {
                current_view: ViewMode::default(),
                is_loading: true,
                date_input: panel.selected_date.format("%Y-%m-%d").to_string(),
                weight_input: String::new(),
                photo_path: String::new(),
                toast: None,
            },
            panel,
            views,
        };

        let task = app.bootstrap();
        (app, task)
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);
        self.flush_views();
        task
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                let request = self.panel.tick();
                self.load(request)
            }
            Message::RefreshNow => {
                self.error = None;
                if self.panel.active_profile.is_some() {
                    let request = self.panel.begin_load();
                    self.load(request)
                } else {
                    self.ui.is_loading = true;
                    self.bootstrap()
                }
            }
            Message::Chart(ChartEvent::TrackMeasured(offset)) => {
                debug!(offset, "Goal line re-measured");
                self.panel.scheduler.mark(Region::Weekly);
                Task::none()
            }
            Message::Chart(ChartEvent::DaySelected(index)) => {
                match self.views.bars.get(index).map(|bar| bar.date) {
                    Some(date) => self.select_date(date),
                    None => Task::none(),
                }
            }

            // --- Backend results ---
            Message::Bootstrapped(result) => {
                self.ui.is_loading = false;
                let request = self.panel.apply_bootstrap(result);
                self.load(request)
            }
            Message::Loaded(result) => {
                if self.panel.apply_load(result) {
                    self.ui.is_loading = false;
                }
                Task::none()
            }
            Message::MonthLoaded(result) => {
                self.panel.apply_month(result);
                Task::none()
            }
            Message::JobFinished(result) => {
                let saved = matches!(&result, JobResult::Mutation { result: Ok(()), .. });
                let followup = self.panel.complete(result);
                let toast = if saved {
                    self.show_toast("Saved")
                } else {
                    Task::none()
                };
                Task::batch([self.follow(followup), toast])
            }
            Message::ClearToast => {
                self.ui.toast = None;
                Task::none()
            }

            // --- Navigation ---
            Message::SwitchView(mode) => {
                self.ui.current_view = mode;
                Task::none()
            }
            Message::SwitchProfile(entity_id) => {
                let request = self.panel.switch_profile(&entity_id);
                self.load(request)
            }
            Message::MakeDefault => self.run(Intent::MakeDefault),
            Message::ShiftDay(days) => {
                let request = self.panel.shift_day(days);
                self.sync_date_input();
                self.load(request)
            }
            Message::GoToToday => {
                let request = self.panel.go_to_today();
                self.sync_date_input();
                self.load(request)
            }
            Message::SelectDate(date) => self.select_date(date),
            Message::ShiftMonth(delta) => {
                let request = self.panel.shift_month(delta);
                self.load_month(request)
            }
            Message::DateInputChanged(value) => {
                self.ui.date_input = value;
                Task::none()
            }
            Message::ApplyDate => match parse_date(&self.ui.date_input) {
                Some(date) => {
                    self.error = None;
                    self.select_date(date)
                }
                None => {
                    self.error = Some(AppError::Validation(
                        "Invalid date format. Use YYYY-MM-DD".into(),
                    ));
                    Task::none()
                }
            },

            // --- Entries ---
            Message::OpenAdd(kind) => {
                self.panel.editor.open_add(kind);
                Task::none()
            }
            Message::EditEntry(entry) => {
                self.panel.editor.open_edit(&entry);
                Task::none()
            }
            Message::DeleteEntry(entry) => {
                let intent = self.panel.editor.delete(&entry);
                self.run(Intent::Editor(intent))
            }
            Message::Form(field) => {
                if let Some(form) = self.panel.editor.form_mut() {
                    form.error = None;
                    match field {
                        FormField::Name(v) => form.name = v,
                        FormField::Calories(v) => form.calories = v,
                        FormField::Duration(v) => form.duration = v,
                        FormField::Time(v) => form.time = v,
                    }
                }
                Task::none()
            }
            Message::SubmitForm => match self.panel.submit_entry() {
                Some(intent) => self.run(intent),
                None => Task::none(),
            },
            Message::CloseModal => {
                self.panel.editor.close_all_modals();
                self.panel.profile_editor.cancel_unlink();
                Task::none()
            }
            Message::WeightInputChanged(value) => {
                self.ui.weight_input = value;
                Task::none()
            }
            Message::LogWeight => {
                match self
                    .panel
                    .editor
                    .log_weight(&self.ui.weight_input, self.panel.selected_date)
                {
                    Ok(intent) => {
                        self.error = None;
                        self.ui.weight_input.clear();
                        self.run(Intent::Editor(intent))
                    }
                    Err(e) => {
                        self.error = Some(AppError::Validation(e));
                        Task::none()
                    }
                }
            }

            // --- Photo flow ---
            Message::OpenPhoto => {
                self.ui.photo_path.clear();
                self.panel.open_photo();
                Task::none()
            }
            Message::ChooseAnalyzer(index) => {
                self.panel.editor.choose_analyzer(index);
                Task::none()
            }
            Message::PhotoPathChanged(path) => {
                self.ui.photo_path = path;
                Task::none()
            }
            Message::UploadPhoto => {
                let path = self.ui.photo_path.trim();
                if path.is_empty() {
                    self.panel.editor.start_upload(Err(ClientError::Validation(
                        "Choose an image file".into(),
                    )));
                    return Task::none();
                }
                Task::perform(read_photo(PathBuf::from(path)), Message::PhotoRead)
            }
            Message::PhotoRead(result) => {
                let photo = result.map_err(|e| ClientError::Validation(e.to_string()));
                match self.panel.editor.start_upload(photo) {
                    Some(intent) => self.run(Intent::Editor(intent)),
                    None => Task::none(),
                }
            }
            Message::ToggleReviewItem(index) => {
                self.panel.editor.toggle_review_item(index);
                Task::none()
            }
            Message::ReviewCalories(index, value) => {
                if let Some(item) = self
                    .panel
                    .editor
                    .review_items_mut()
                    .and_then(|items| items.get_mut(index))
                {
                    item.calories = value;
                }
                Task::none()
            }
            Message::ConfirmReview => {
                let intents = self.panel.confirm_review();
                self.run_all(intents)
            }

            // --- Chat flow ---
            Message::OpenChat => {
                self.panel.open_chat();
                Task::none()
            }
            Message::ChatInput(value) => {
                if let Some(chat) = self.panel.editor.chat_mut() {
                    chat.input = value;
                }
                Task::none()
            }
            Message::SendChat => match self.panel.editor.send_chat() {
                Some(intent) => self.run(Intent::Editor(intent)),
                None => Task::none(),
            },

            // --- Profile editor ---
            Message::EditProfile => {
                self.panel.open_profile_editor();
                self.ui.current_view = ViewMode::Profile;
                Task::none()
            }
            Message::Draft(field) => {
                if let Some(draft) = self.panel.profile_editor.draft_mut() {
                    field.apply(draft);
                }
                self.panel.profile_editor.error = None;
                Task::none()
            }
            Message::SaveProfile => {
                let intents = self.panel.save_profile();
                self.run_all(intents)
            }
            Message::CancelProfile => {
                self.panel.profile_editor.close();
                Task::none()
            }
            Message::RequestUnlink(component) => {
                self.panel.profile_editor.request_unlink(component);
                Task::none()
            }
            Message::ConfirmUnlink => match self.panel.profile_editor.confirm_unlink() {
                Some(intent) => self.run(Intent::Profile(intent)),
                None => Task::none(),
            },
            Message::CancelUnlink => {
                self.panel.profile_editor.cancel_unlink();
                Task::none()
            }
            Message::ToggleDiscovered(entry_id) => {
                self.panel.profile_editor.toggle_discovered(&entry_id);
                Task::none()
            }
            Message::LinkSelected => {
                let discovered = self.panel.discovered.clone();
                match self.panel.profile_editor.link_selected(&discovered) {
                    Some(intent) => self.run(Intent::Profile(intent)),
                    None => Task::none(),
                }
            }
            Message::DismissRestartNotice => {
                self.panel.profile_editor.restart_required = false;
                Task::none()
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let content = match self.panel.status {
            PanelStatus::SessionExpired => return self.view_session_expired(),
            PanelStatus::Loading => self.view_placeholder("Loading calorie tracker..."),
            PanelStatus::NoProfile => self.view_placeholder(
                "No calorie tracker profile is set up for this user. Add one in the Calorie Tracker integration.",
            ),
            PanelStatus::Ready => match self.ui.current_view {
                ViewMode::Dashboard => self.view_dashboard(),
                ViewMode::Profile => self.view_profile(),
            },
        };

        let main_area = container(column![
            self.view_header(),
            Space::new().height(20),
            content
        ])
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(30);

        let app_layout: Element<'_, Message> = row![self.view_sidebar(), main_area]
            .width(Length::Fill)
            .height(Length::Fill)
            .into();

        let with_modal = match self.view_modal() {
            Some(modal) => stack![
                app_layout,
                opaque(
                    mouse_area(center(opaque(modal)).style(|_| container::Style {
                        background: Some(style::BACKDROP.into()),
                        ..Default::default()
                    }))
                    .on_press(Message::CloseModal)
                )
            ]
            .into(),
            None => app_layout,
        };

        if let Some(msg) = &self.ui.toast {
            let toast = container(text(msg).size(14).color(style::TEXT_BRIGHT))
                .padding([12, 24])
                .style(|_| container::Style {
                    background: Some(style::BG_CARD.into()),
                    border: Border {
                        radius: 20.0.into(),
                        width: 1.0,
                        color: style::ACCENT_GREEN,
                    },
                    shadow: Shadow {
                        color: Color::from_rgba(0.0, 0.0, 0.0, 0.5),
                        offset: Vector::new(0.0, 4.0),
                        blur_radius: 10.0,
                    },
                    ..Default::default()
                });
            stack![
                with_modal,
                container(toast)
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .align_x(Alignment::Center)
                    .padding(30)
            ]
            .into()
        } else {
            with_modal
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let ui_interval = Duration::from_secs(self.config.refresh.ui_interval_secs);
        iced::time::every(ui_interval).map(|_| Message::Tick)
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    // --- VIEW COMPONENTS ---

    fn view_sidebar(&self) -> Element<'_, Message> {
        let sidebar_width = self.config.window.sidebar_width;

        let brand = column![
            text("CALORIE")
                .size(32)
                .font(iced::font::Font::MONOSPACE)
                .color(style::ACCENT_BLUE),
            text("TRACKER").size(14).color(style::TEXT_MUTED),
        ];

        let nav_btn = |label: String, active: bool, msg: Message| {
            let bg = if active {
                style::ACCENT_BLUE
            } else {
                Color::TRANSPARENT
            };
            let txt = if active {
                style::BG_DARK
            } else {
                style::TEXT_MUTED
            };
            button(text(label).color(txt).size(16))
                .on_press(msg)
                .style(move |_, _| button::Style {
                    background: Some(bg.into()),
                    border: Border {
                        radius: 8.0.into(),
                        ..Default::default()
                    },
                    text_color: txt,
                    ..Default::default()
                })
                .width(Length::Fill)
                .padding(12)
        };

        let mut profiles = Column::new().spacing(6);
        for profile in &self.panel.all_profiles {
            let active = self.panel.entity_id() == Some(profile.entity_id.as_str());
            let is_default = self.panel.default_entity.as_deref() == Some(profile.entity_id.as_str());
            let label = if is_default {
                format!("{} ★", profile.display_name())
            } else {
                profile.display_name().to_string()
            };
            profiles = profiles.push(nav_btn(
                label,
                active,
                Message::SwitchProfile(profile.entity_id.clone()),
            ));
        }

        let make_default: Element<'_, Message> =
            if self.panel.active_profile.is_some() && !self.panel.is_default_profile() {
                button(text("Make default").size(12))
                    .on_press(Message::MakeDefault)
                    .padding([6, 12])
                    .style(secondary_btn_style)
                    .into()
            } else {
                Space::new().height(0).into()
            };

        let goal_summary: Element<'_, Message> = match &self.panel.active_profile {
            Some(profile) => column![
                text(profile.display_name().to_string())
                    .size(18)
                    .color(style::TEXT_BRIGHT),
                text(format!(
                    "{} Cal · {}",
                    profile.daily_goal().round() as i64,
                    profile.goal_type().label()
                ))
                .size(12)
                .color(style::TEXT_MUTED),
            ]
            .spacing(4)
            .into(),
            None => Space::new().height(0).into(),
        };

        container(column![
            brand,
            Space::new().height(30),
            goal_summary,
            Space::new().height(30),
            nav_btn(
                "Dashboard".into(),
                self.ui.current_view == ViewMode::Dashboard,
                Message::SwitchView(ViewMode::Dashboard)
            ),
            Space::new().height(10),
            nav_btn(
                "Profile".into(),
                self.ui.current_view == ViewMode::Profile,
                Message::SwitchView(ViewMode::Profile)
            ),
            Space::new().height(30),
            text("PROFILES").size(12).color(style::TEXT_MUTED),
            Space::new().height(10),
            profiles,
            Space::new().height(10),
            make_default,
        ])
        .width(Length::Fixed(sidebar_width))
        .height(Length::Fill)
        .style(|_| container::Style {
            background: Some(style::BG_CARD.into()),
            border: Border {
                color: style::STROKE_DIM,
                width: 1.0,
                ..Default::default()
            },
            ..Default::default()
        })
        .padding(20)
        .into()
    }

    fn view_header(&self) -> Element<'_, Message> {
        let error = self
            .error
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| self.panel.error.clone());

        let status = if self.ui.is_loading {
            row![
                text("Updating").size(14).color(style::TEXT_MUTED),
                text("...").size(14).color(style::ACCENT_BLUE)
            ]
            .spacing(5)
        } else if let Some(e) = error {
            row![
                container(text("!").size(12).color(style::BG_DARK))
                    .padding([2, 6])
                    .style(|_| container::Style {
                        background: Some(style::ACCENT_RED.into()),
                        border: Border {
                            radius: 10.0.into(),
                            ..Default::default()
                        },
                        ..Default::default()
                    }),
                text(e).size(14).color(style::ACCENT_RED)
            ]
            .spacing(8)
            .align_y(Alignment::Center)
        } else {
            row![
                container(Space::new().width(8).height(8)).style(|_| container::Style {
                    background: Some(style::ACCENT_GREEN.into()),
                    border: Border {
                        radius: 4.0.into(),
                        ..Default::default()
                    },
                    ..Default::default()
                }),
                text("Up to date").size(14).color(style::TEXT_MUTED)
            ]
            .spacing(8)
            .align_y(Alignment::Center)
        };

        let date_nav = row![
            button(text("‹").size(18))
                .on_press(Message::ShiftDay(-1))
                .padding([4, 12])
                .style(secondary_btn_style),
            button(text("Today").size(12))
                .on_press(Message::GoToToday)
                .padding([6, 12])
                .style(secondary_btn_style),
            button(text("›").size(18))
                .on_press(Message::ShiftDay(1))
                .padding([4, 12])
                .style(secondary_btn_style),
            styled_input("YYYY-MM-DD", &self.ui.date_input, Message::DateInputChanged)
                .on_submit(Message::ApplyDate)
                .width(Length::Fixed(110.0)),
            button(text("Go").size(12))
                .on_press(Message::ApplyDate)
                .padding([6, 12])
                .style(primary_btn_style),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        let title = match self.ui.current_view {
            ViewMode::Dashboard => self.panel.selected_date.format("%A, %B %-d %Y").to_string(),
            ViewMode::Profile => "Profile".to_string(),
        };

        row![
            text(title).size(28).color(style::TEXT_BRIGHT),
            Space::new().width(20),
            date_nav,
            Space::new().width(Length::Fill),
            status,
            Space::new().width(10),
            button(text("↻").size(18))
                .on_press(Message::RefreshNow)
                .padding(10)
                .style(|_, _| button::Style {
                    background: Some(style::BG_CARD.into()),
                    text_color: style::TEXT_BRIGHT,
                    border: Border {
                        radius: 8.0.into(),
                        ..Default::default()
                    },
                    ..Default::default()
                })
        ]
        .align_y(Alignment::Center)
        .into()
    }

    fn view_placeholder(&self, message: &'static str) -> Element<'_, Message> {
        center(card_container(
            text(message).size(16).color(style::TEXT_MUTED),
        ))
        .into()
    }

    fn view_session_expired(&self) -> Element<'_, Message> {
        center(card_container(
            column![
                text(SESSION_EXPIRED_TITLE).size(24).color(style::ACCENT_RED),
                text(SESSION_EXPIRED_NOTICE).size(14).color(style::TEXT_MUTED),
            ]
            .spacing(12)
            .max_width(420),
        ))
        .style(|_| container::Style {
            background: Some(style::BG_DARK.into()),
            ..Default::default()
        })
        .into()
    }

    fn view_dashboard(&self) -> Element<'_, Message> {
        let gauge = Canvas::new(DrawingWidget {
            drawing: &self.views.gauge,
            cache: &self.views.gauge_cache,
        })
        .width(Length::Fill)
        .height(Length::Fixed(220.0));

        let gauge_card = card_container(column![
            text("Today's Calories").size(16).color(style::TEXT_MUTED),
            Space::new().height(10),
            gauge,
        ])
        .width(Length::FillPortion(1));

        let chart = Canvas::new(WeeklyChart {
            bars: &self.views.bars,
            cache: &self.views.weekly_cache,
        })
        .width(Length::Fill)
        .height(Length::Fixed(180.0));
        let chart_element = Element::from(chart).map(Message::Chart);

        let aggregate = &self.views.aggregate;
        let weight_line: Element<'_, Message> = match aggregate.weight_text() {
            Some(weight) => text(weight)
                .size(14)
                .color(style::tone_color(aggregate.weight_tone()))
                .into(),
            None => Space::new().height(0).into(),
        };

        let weekly_card = card_container(column![
            text("This Week").size(16).color(style::TEXT_MUTED),
            Space::new().height(10),
            chart_element,
            Space::new().height(10),
            text(aggregate.calorie_text())
                .size(16)
                .color(style::tone_color(aggregate.calorie_tone())),
            weight_line,
        ])
        .width(Length::FillPortion(1));

        let top_row = row![gauge_card, weekly_card]
            .spacing(20)
            .height(Length::Fixed(320.0));

        let mut lower = column![
            row![
                card_container(self.view_calendar()).width(Length::Shrink),
                card_container(self.view_entries()).width(Length::Fill),
            ]
            .spacing(20)
        ]
        .spacing(20);

        if self.panel.daily.macros.is_some() {
            let macros = Canvas::new(DrawingWidget {
                drawing: &self.views.macros,
                cache: &self.views.macros_cache,
            })
            .width(Length::Fill)
            .height(Length::Fixed(160.0));
            lower = lower.push(card_container(column![
                text("Macros").size(16).color(style::TEXT_MUTED),
                Space::new().height(10),
                macros,
            ]));
        }

        scrollable(column![top_row, Space::new().height(20), lower])
            .height(Length::Fill)
            .width(Length::Fill)
            .into()
    }

    fn view_calendar(&self) -> Element<'_, Message> {
        let nav = |label: &'static str, delta: i32| {
            button(text(label).size(14))
                .on_press(Message::ShiftMonth(delta))
                .padding([2, 8])
                .style(secondary_btn_style)
        };

        let header = row![
            nav("«", -12),
            nav("‹", -1),
            text(self.panel.calendar.title())
                .size(14)
                .color(style::TEXT_BRIGHT)
                .width(Length::Fill)
                .center(),
            nav("›", 1),
            nav("»", 12),
        ]
        .spacing(4)
        .align_y(Alignment::Center)
        .width(Length::Fixed(CELL * 7.0 + 24.0));

        let weekdays = Row::with_children(["S", "M", "T", "W", "T", "F", "S"].map(|d| {
            Element::from(
                text(d)
                    .size(11)
                    .color(style::TEXT_MUTED)
                    .width(Length::Fixed(CELL))
                    .center(),
            )
        }))
        .spacing(4);

        let mut grid = Column::new().spacing(4);
        for week in self.panel.month_rows() {
            let cells = week.map(calendar_cell);
            grid = grid.push(Row::with_children(cells).spacing(4));
        }

        column![header, weekdays, grid].spacing(10).into()
    }

    fn view_entries(&self) -> Element<'_, Message> {
        let daily = &self.panel.daily;

        let totals = row![
            text(format!("Food {} Cal", daily.food_total().round() as i64))
                .size(13)
                .color(style::TEXT_BRIGHT),
            text(format!("Exercise {} Cal", daily.exercise_total().round() as i64))
                .size(13)
                .color(style::ACCENT_CYAN),
            text(match daily.weight {
                Some(w) => format!("Weight {:.1} {}", w, self.weight_unit()),
                None => "No weight logged".to_string(),
            })
            .size(13)
            .color(style::TEXT_MUTED),
        ]
        .spacing(20);

        let entries = self.panel.entries();
        let list: Element<'_, Message> = if entries.is_empty() {
            text("Nothing logged for this day")
                .size(14)
                .color(style::TEXT_MUTED)
                .into()
        } else {
            let mut list = Column::new().spacing(6);
            for entry in entries {
                let (sign, color) = match entry.kind() {
                    EntryKind::Food => ("", style::TEXT_BRIGHT),
                    EntryKind::Exercise => ("-", style::ACCENT_CYAN),
                };
                let time = entry.timestamp().get(11..16).unwrap_or("--:--").to_string();
                list = list.push(
                    row![
                        text(time).size(12).color(style::TEXT_MUTED).width(Length::Fixed(50.0)),
                        text(entry.name().to_string())
                            .size(14)
                            .color(color)
                            .width(Length::Fill),
                        text(format!("{}{} Cal", sign, entry.calories().round() as i64))
                            .size(14)
                            .color(color),
                        button(text("Edit").size(12))
                            .on_press(Message::EditEntry(entry.clone()))
                            .padding([4, 10])
                            .style(secondary_btn_style),
                        button(text("Delete").size(12))
                            .on_press(Message::DeleteEntry(entry))
                            .padding([4, 10])
                            .style(danger_btn_style),
                    ]
                    .spacing(10)
                    .align_y(Alignment::Center),
                );
            }
            scrollable(list).height(Length::Fixed(220.0)).into()
        };

        let actions = row![
            button(text("+ Food").size(12))
                .on_press(Message::OpenAdd(EntryKind::Food))
                .padding([6, 12])
                .style(primary_btn_style),
            button(text("+ Exercise").size(12))
                .on_press(Message::OpenAdd(EntryKind::Exercise))
                .padding([6, 12])
                .style(primary_btn_style),
            button(text("Photo").size(12))
                .on_press(Message::OpenPhoto)
                .padding([6, 12])
                .style(secondary_btn_style),
            button(text("Chat").size(12))
                .on_press(Message::OpenChat)
                .padding([6, 12])
                .style(secondary_btn_style),
            Space::new().width(Length::Fill),
            styled_input("Weight", &self.ui.weight_input, Message::WeightInputChanged)
                .on_submit(Message::LogWeight)
                .width(Length::Fixed(80.0)),
            button(text("Log weight").size(12))
                .on_press(Message::LogWeight)
                .padding([6, 12])
                .style(secondary_btn_style),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        column![
            text("Entries").size(16).color(style::TEXT_MUTED),
            totals,
            list,
            actions,
        ]
        .spacing(12)
        .into()
    }

    fn view_profile(&self) -> Element<'_, Message> {
        let editor = &self.panel.profile_editor;

        let restart: Element<'_, Message> = if editor.restart_required {
            card_container(
                row![
                    text(RESTART_NOTICE).size(14).color(style::ACCENT_ORANGE).width(Length::Fill),
                    button(text("Dismiss").size(12))
                        .on_press(Message::DismissRestartNotice)
                        .padding([6, 12])
                        .style(secondary_btn_style),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            )
            .into()
        } else {
            Space::new().height(0).into()
        };

        let details: Element<'_, Message> = match &editor.draft {
            Some(draft) => self.view_profile_form(draft),
            None => self.view_profile_summary(),
        };

        scrollable(
            column![
                restart,
                card_container(details),
                card_container(self.view_linked()),
            ]
            .spacing(20),
        )
        .height(Length::Fill)
        .width(Length::Fill)
        .into()
    }

    fn view_profile_summary(&self) -> Element<'_, Message> {
        let Some(profile) = &self.panel.active_profile else {
            return text("No profile selected").color(style::TEXT_MUTED).into();
        };
        let line = |label: &'static str, value: String| {
            row![
                text(label).size(13).color(style::TEXT_MUTED).width(Length::Fixed(160.0)),
                text(value).size(13).color(style::TEXT_BRIGHT),
            ]
        };
        let unit = profile.weight_unit();
        let weight = |w: Option<f64>| {
            w.map(|w| format!("{} {}", w, unit))
                .unwrap_or_else(|| "-".to_string())
        };
        let preferred = self
            .panel
            .preferred_analyzer()
            .map(|a| a.label())
            .unwrap_or_else(|| "None".to_string());

        column![
            row![
                text(profile.display_name().to_string())
                    .size(22)
                    .color(style::TEXT_BRIGHT)
                    .width(Length::Fill),
                button(text("Edit").size(12))
                    .on_press(Message::EditProfile)
                    .padding([6, 12])
                    .style(primary_btn_style),
            ]
            .align_y(Alignment::Center),
            line("Daily goal", format!("{} Cal", profile.daily_goal().round() as i64)),
            line("Goal type", profile.goal_type().label().to_string()),
            line("Starting weight", weight(profile.starting_weight)),
            line("Goal weight", weight(profile.goal_weight)),
            line(
                "Exercise in net",
                if profile.include_exercise_in_net.unwrap_or(true) {
                    "Yes".to_string()
                } else {
                    "No".to_string()
                }
            ),
            line("Image analyzer", preferred),
        ]
        .spacing(8)
        .into()
    }

    fn view_profile_form<'a>(&'a self, draft: &'a ProfileDraft) -> Element<'a, Message> {
        let field = |label: &'static str, value: &str, f: fn(String) -> DraftField| {
            row![
                text(label).size(13).color(style::TEXT_MUTED).width(Length::Fixed(160.0)),
                styled_input(label, value, move |v| Message::Draft(f(v))).width(Length::Fixed(220.0)),
            ]
            .spacing(10)
            .align_y(Alignment::Center)
        };

        let goal_types = Row::with_children(GoalType::ALL.map(|goal_type| {
            choice_btn(
                goal_type.label(),
                draft.goal_type == goal_type,
                Message::Draft(DraftField::GoalType(goal_type)),
            )
        }))
        .spacing(6);

        let units = Row::with_children([WeightUnit::Lbs, WeightUnit::Kg].map(|unit| {
            choice_btn(
                unit.as_str(),
                draft.weight_unit == unit,
                Message::Draft(DraftField::WeightUnit(unit)),
            )
        }))
        .spacing(6);

        let analyzers: Element<'_, Message> = if self.panel.analyzers.is_empty() {
            text("No image analyzers available")
                .size(13)
                .color(style::TEXT_MUTED)
                .into()
        } else {
            Row::with_children(self.panel.analyzers.iter().map(|analyzer| {
                let active = draft.preferred_analyzer.as_deref()
                    == Some(analyzer.config_entry_id.as_str());
                let btn = button(text(analyzer.label()).size(12))
                    .on_press(Message::Draft(DraftField::PreferredAnalyzer(
                        analyzer.config_entry_id.clone(),
                    )))
                    .padding([6, 12])
                    .style(move |theme, status| {
                        if active {
                            primary_btn_style(theme, status)
                        } else {
                            secondary_btn_style(theme, status)
                        }
                    });
                Element::from(btn)
            }))
            .spacing(6)
            .into()
        };

        let error: Element<'_, Message> = match &self.panel.profile_editor.error {
            Some(e) => text(e.clone()).size(13).color(style::ACCENT_RED).into(),
            None => Space::new().height(0).into(),
        };

        column![
            text("Edit profile").size(22).color(style::TEXT_BRIGHT),
            field("Name", &draft.spoken_name, DraftField::Name),
            field("Daily goal (Cal)", &draft.daily_goal, DraftField::DailyGoal),
            row![
                text("Goal type").size(13).color(style::TEXT_MUTED).width(Length::Fixed(160.0)),
                goal_types,
            ]
            .align_y(Alignment::Center),
            row![
                text("Weight unit").size(13).color(style::TEXT_MUTED).width(Length::Fixed(160.0)),
                units,
            ]
            .align_y(Alignment::Center),
            row![
                text("Exercise in net").size(13).color(style::TEXT_MUTED).width(Length::Fixed(160.0)),
                toggle(draft.include_exercise_in_net, |v| Message::Draft(
                    DraftField::IncludeExercise(v)
                )),
            ]
            .align_y(Alignment::Center),
            field("Starting weight", &draft.starting_weight, DraftField::StartingWeight),
            field("Goal weight", &draft.goal_weight, DraftField::GoalWeight),
            field("Birth year", &draft.birth_year, DraftField::BirthYear),
            field("Sex", &draft.sex, DraftField::Sex),
            field("Height", &draft.height, DraftField::Height),
            field("Height unit", &draft.height_unit, DraftField::HeightUnit),
            field("Body fat %", &draft.body_fat_pct, DraftField::BodyFat),
            field("Activity multiplier", &draft.activity_multiplier, DraftField::Activity),
            row![
                text("Image analyzer").size(13).color(style::TEXT_MUTED).width(Length::Fixed(160.0)),
                analyzers,
            ]
            .align_y(Alignment::Center),
            error,
            row![
                button(text("Save").size(14))
                    .on_press(Message::SaveProfile)
                    .padding([8, 20])
                    .style(primary_btn_style),
                button(text("Cancel").size(14))
                    .on_press(Message::CancelProfile)
                    .padding([8, 20])
                    .style(secondary_btn_style),
            ]
            .spacing(10),
        ]
        .spacing(10)
        .into()
    }

    fn view_linked(&self) -> Element<'_, Message> {
        let mut linked = Column::new().spacing(8);
        let groups = group_by_domain(&self.panel.linked);
        if groups.is_empty() {
            linked = linked.push(text("No linked devices").size(13).color(style::TEXT_MUTED));
        }
        for (domain, components) in groups {
            linked = linked.push(text(domain).size(13).color(style::ACCENT_BLUE));
            for component in components {
                linked = linked.push(
                    row![
                        text(component.title.clone())
                            .size(13)
                            .color(style::TEXT_BRIGHT)
                            .width(Length::Fill),
                        button(text("Unlink").size(12))
                            .on_press(Message::RequestUnlink(component))
                            .padding([4, 10])
                            .style(danger_btn_style),
                    ]
                    .align_y(Alignment::Center),
                );
            }
        }

        let editor = &self.panel.profile_editor;
        let linkable: Vec<_> = self
            .panel
            .discovered
            .iter()
            .filter(|c| c.linked_profile.is_none())
            .collect();
        let discovered: Element<'_, Message> = if linkable.is_empty() {
            text("No new devices found").size(13).color(style::TEXT_MUTED).into()
        } else {
            let mut list = Column::new().spacing(6);
            for component in linkable {
                let entry_id = component.entry_id.clone();
                list = list.push(
                    row![
                        toggle(editor.is_discovered_selected(&component.entry_id), move |_| {
                            Message::ToggleDiscovered(entry_id.clone())
                        }),
                        text(format!("{} ({})", component.title, component.domain))
                            .size(13)
                            .color(style::TEXT_BRIGHT),
                    ]
                    .spacing(8)
                    .align_y(Alignment::Center),
                );
            }
            column![
                list,
                button(text("Link selected").size(12))
                    .on_press(Message::LinkSelected)
                    .padding([6, 12])
                    .style(primary_btn_style),
            ]
            .spacing(10)
            .into()
        };

        column![
            text("Linked devices").size(16).color(style::TEXT_MUTED),
            linked,
            Space::new().height(10),
            text("Discovered").size(16).color(style::TEXT_MUTED),
            discovered,
        ]
        .spacing(10)
        .into()
    }

    fn view_modal(&self) -> Option<Element<'_, Message>> {
        if let Some(component) = self.panel.profile_editor.pending_unlink() {
            return Some(modal_card(
                "Unlink device?",
                column![
                    text(format!(
                        "{} ({}) will stop logging to this profile.",
                        component.title, component.domain
                    ))
                    .size(14)
                    .color(style::TEXT_MUTED),
                    row![
                        button(text("Unlink").size(14))
                            .on_press(Message::ConfirmUnlink)
                            .padding([8, 20])
                            .style(danger_btn_style),
                        button(text("Cancel").size(14))
                            .on_press(Message::CancelUnlink)
                            .padding([8, 20])
                            .style(secondary_btn_style),
                    ]
                    .spacing(10),
                ]
                .spacing(16),
            ));
        }

        let body: Element<'_, Message> = match self.panel.editor.modal() {
            Modal::Idle => return None,
            Modal::AddPopup(form) => {
                let title = match form.kind {
                    EntryKind::Food => "Add food",
                    EntryKind::Exercise => "Add exercise",
                };
                return Some(modal_card(title, entry_form(form)));
            }
            Modal::EditPopup { form, .. } => {
                return Some(modal_card("Edit entry", entry_form(form)));
            }
            Modal::AnalyzerSelect(analyzers) => {
                let mut list = Column::new().spacing(8);
                for (index, analyzer) in analyzers.iter().enumerate() {
                    list = list.push(
                        button(text(analyzer.label()).size(14))
                            .on_press(Message::ChooseAnalyzer(index))
                            .width(Length::Fill)
                            .padding([8, 12])
                            .style(secondary_btn_style),
                    );
                }
                return Some(modal_card("Choose an image analyzer", list));
            }
            Modal::PhotoUpload { analyzer, error } => column![
                text(format!("Analyzer: {}", analyzer.label()))
                    .size(13)
                    .color(style::TEXT_MUTED),
                styled_input("Path to a JPEG, PNG or GIF", &self.ui.photo_path, Message::PhotoPathChanged)
                    .on_submit(Message::UploadPhoto)
                    .width(Length::Fill),
                inline_error(error.as_deref()),
                modal_actions("Analyze", Message::UploadPhoto),
            ]
            .spacing(12)
            .into(),
            Modal::PhotoProcessing { analyzer } => column![
                text(format!("Analyzing photo with {}...", analyzer.label()))
                    .size(14)
                    .color(style::TEXT_MUTED),
            ]
            .into(),
            Modal::PhotoReview { items, error } => {
                let mut list = Column::new().spacing(8);
                for (index, item) in items.iter().enumerate() {
                    list = list.push(
                        row![
                            toggle(item.selected, move |_| Message::ToggleReviewItem(index)),
                            text(item.food_item.clone())
                                .size(14)
                                .color(style::TEXT_BRIGHT)
                                .width(Length::Fill),
                            styled_input("Cal", &item.calories, move |v| {
                                Message::ReviewCalories(index, v)
                            })
                            .width(Length::Fixed(80.0)),
                        ]
                        .spacing(8)
                        .align_y(Alignment::Center),
                    );
                }
                column![
                    list,
                    inline_error(error.as_deref()),
                    modal_actions("Log selected", Message::ConfirmReview),
                ]
                .spacing(12)
                .into()
            }
            Modal::ChatAssist(chat) => {
                let mut transcript = Column::new().spacing(8);
                for line in &chat.transcript {
                    let (who, color) = match line.role {
                        ChatRole::User => ("You", style::TEXT_BRIGHT),
                        ChatRole::Assistant => ("Assistant", style::ACCENT_CYAN),
                    };
                    transcript = transcript.push(
                        column![
                            text(who).size(11).color(style::TEXT_MUTED),
                            text(line.text.clone()).size(14).color(color),
                        ]
                        .spacing(2),
                    );
                }
                if chat.waiting {
                    transcript = transcript.push(text("...").size(14).color(style::ACCENT_BLUE));
                }
                column![
                    text(format!("Agent: {}", chat.agent.name))
                        .size(12)
                        .color(style::TEXT_MUTED),
                    scrollable(transcript).height(Length::Fixed(240.0)),
                    inline_error(chat.error.as_deref()),
                    row![
                        styled_input("Describe what you ate", &chat.input, Message::ChatInput)
                            .on_submit(Message::SendChat)
                            .width(Length::Fill),
                        button(text("Send").size(14))
                            .on_press_maybe((!chat.waiting).then_some(Message::SendChat))
                            .padding([8, 16])
                            .style(primary_btn_style),
                    ]
                    .spacing(8),
                ]
                .spacing(12)
                .into()
            }
            Modal::MissingCapability(capability) => {
                let mut list = Column::new().spacing(4);
                for integration in capability.remedial_integrations() {
                    list = list.push(text(format!("• {}", integration)).size(13).color(style::TEXT_BRIGHT));
                }
                return Some(modal_card(
                    capability.title(),
                    column![
                        text("Set up one of these integrations in Home Assistant:")
                            .size(13)
                            .color(style::TEXT_MUTED),
                        list,
                    ]
                    .spacing(10),
                ));
            }
        };

        let title = match self.panel.editor.modal() {
            Modal::ChatAssist(_) => "Log with chat",
            Modal::PhotoReview { .. } => "Review detected food",
            _ => "Log from photo",
        };
        Some(modal_card(title, body))
    }

    // --- LOGIC HELPERS ---

    fn bootstrap(&self) -> Task<Message> {
        Task::perform(self.panel.bootstrap_request().fetch(), Message::Bootstrapped)
    }

    fn load(&mut self, request: Option<LoadRequest>) -> Task<Message> {
        let Some(request) = request else {
            return Task::none();
        };
        self.ui.is_loading = true;
        Task::perform(request.fetch(self.panel.client()), Message::Loaded)
    }

    fn load_month(&self, request: Option<MonthRequest>) -> Task<Message> {
        match request {
            Some(request) => Task::perform(request.fetch(self.panel.client()), Message::MonthLoaded),
            None => Task::none(),
        }
    }

    fn run(&mut self, intent: Intent) -> Task<Message> {
        match self.panel.job(intent) {
            Some(job) => Task::perform(job.run(), Message::JobFinished),
            None => Task::none(),
        }
    }

    fn run_all(&mut self, intents: Vec<Intent>) -> Task<Message> {
        let tasks: Vec<_> = intents.into_iter().map(|intent| self.run(intent)).collect();
        Task::batch(tasks)
    }

    fn follow(&mut self, followup: Followup) -> Task<Message> {
        match followup {
            Followup::None => Task::none(),
            Followup::Reload(request) => self.load(Some(request)),
            Followup::RefreshProfiles => self.bootstrap(),
        }
    }

    fn select_date(&mut self, date: NaiveDate) -> Task<Message> {
        let request = self.panel.select_date(date);
        self.sync_date_input();
        self.load(request)
    }

    fn sync_date_input(&mut self) {
        self.ui.date_input = self.panel.selected_date.format("%Y-%m-%d").to_string();
    }

    fn show_toast(&mut self, message: &str) -> Task<Message> {
        self.ui.toast = Some(message.to_string());
        Task::perform(
            async {
                tokio::time::sleep(Duration::from_secs(3)).await;
            },
            |_| Message::ClearToast,
        )
    }

    fn weight_unit(&self) -> WeightUnit {
        self.panel
            .active_profile
            .as_ref()
            .map(|p| p.weight_unit())
            .unwrap_or(self.config.display.weight_unit)
    }

    /// Rebuild what changed since the last update and drop stale geometry.
    fn flush_views(&mut self) {
        let regions = self.panel.scheduler.flush();
        if regions.is_empty() {
            return;
        }
        debug!(?regions, "Redraw");
        for region in regions {
            match region {
                Region::Gauge => {
                    self.views.gauge = build_gauge(&self.panel.gauge_input());
                    self.views.gauge_cache.clear();
                }
                Region::Weekly => {
                    self.views.bars = self.panel.week_bars();
                    self.views.aggregate = self.panel.weekly_aggregate();
                    self.views.weekly_cache.clear();
                }
                Region::Macros => {
                    self.views.macros =
                        build_card(&CardConfig::new(CardKind::Macros), &self.panel.card_data());
                    self.views.macros_cache.clear();
                }
                // Native widgets, rebuilt on every view
                Region::Calendar | Region::Entries => {}
            }
        }
    }
}

async fn read_photo(path: PathBuf) -> Result<PhotoUpload, AppError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::Io(format!("{}: {}", path.display(), e)))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    info!(file = %file_name, bytes = bytes.len(), "Photo selected");
    Ok(PhotoUpload::new(file_name, bytes)?)
}

// --- HELPER FUNCTIONS ---
const CELL: f32 = 32.0;

fn card_container<'a>(
    content: impl Into<Element<'a, Message>>,
) -> container::Container<'a, Message> {
    container(content).padding(24).style(|_| container::Style {
        background: Some(style::BG_CARD.into()),
        border: Border {
            color: Color::TRANSPARENT,
            width: 0.0,
            radius: 16.0.into(),
        },
        shadow: Shadow {
            color: Color::from_rgba(0.0, 0.0, 0.0, 0.3),
            offset: Vector::new(0.0, 4.0),
            blur_radius: 10.0,
        },
        ..Default::default()
    })
}

fn calendar_cell<'a>(cell: Option<CalendarCell>) -> Element<'a, Message> {
    let Some(cell) = cell else {
        return Space::new()
            .width(Length::Fixed(CELL))
            .height(Length::Fixed(CELL))
            .into();
    };
    let (bg, fg) = if cell.selected {
        (style::ACCENT_BLUE, style::BG_DARK)
    } else if cell.has_entry {
        (style::BG_DARK, style::ACCENT_GREEN)
    } else {
        (Color::TRANSPARENT, style::TEXT_MUTED)
    };
    let ring = if cell.is_today {
        style::ACCENT_BLUE
    } else {
        Color::TRANSPARENT
    };
    button(text(cell.day.to_string()).size(12).center())
        .on_press(Message::SelectDate(cell.date))
        .width(Length::Fixed(CELL))
        .height(Length::Fixed(CELL))
        .padding(0)
        .style(move |_, _| button::Style {
            background: Some(bg.into()),
            text_color: fg,
            border: Border {
                radius: 6.0.into(),
                width: 1.0,
                color: ring,
            },
            ..Default::default()
        })
        .into()
}

fn modal_card<'a>(title: &'a str, body: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    card_container(
        column![
            row![
                text(title).size(20).color(style::TEXT_BRIGHT).width(Length::Fill),
                button(text("✕").size(14))
                    .on_press(Message::CloseModal)
                    .padding([4, 10])
                    .style(secondary_btn_style),
            ]
            .align_y(Alignment::Center),
            body.into(),
        ]
        .spacing(16),
    )
    .width(Length::Fixed(460.0))
    .into()
}

fn modal_actions<'a>(label: &'a str, on_confirm: Message) -> Element<'a, Message> {
    row![
        button(text(label).size(14))
            .on_press(on_confirm)
            .padding([8, 20])
            .style(primary_btn_style),
        button(text("Cancel").size(14))
            .on_press(Message::CloseModal)
            .padding([8, 20])
            .style(secondary_btn_style),
    ]
    .spacing(10)
    .into()
}

fn entry_form(form: &EntryForm) -> Element<'_, Message> {
    let (name_label, calories_label) = match form.kind {
        EntryKind::Food => ("Food item", "Calories"),
        EntryKind::Exercise => ("Exercise type", "Calories burned"),
    };
    let mut fields = column![
        styled_input(name_label, &form.name, |v| Message::Form(FormField::Name(v)))
            .on_submit(Message::SubmitForm)
            .width(Length::Fill),
        styled_input(calories_label, &form.calories, |v| Message::Form(FormField::Calories(v)))
            .on_submit(Message::SubmitForm)
            .width(Length::Fill),
    ]
    .spacing(10);
    if form.kind == EntryKind::Exercise {
        fields = fields.push(
            styled_input("Duration (minutes)", &form.duration, |v| {
                Message::Form(FormField::Duration(v))
            })
            .on_submit(Message::SubmitForm)
            .width(Length::Fill),
        );
    }
    fields = fields.push(
        styled_input("Time (HH:MM)", &form.time, |v| Message::Form(FormField::Time(v)))
            .on_submit(Message::SubmitForm)
            .width(Length::Fixed(120.0)),
    );

    column![
        fields,
        inline_error(form.error.as_deref()),
        modal_actions("Save", Message::SubmitForm),
    ]
    .spacing(12)
    .into()
}

fn inline_error(error: Option<&str>) -> Element<'_, Message> {
    match error {
        Some(e) => text(e).size(13).color(style::ACCENT_RED).into(),
        None => Space::new().height(0).into(),
    }
}

fn styled_input<'a>(
    placeholder: &str,
    val: &str,
    on_change: impl Fn(String) -> Message + 'a,
) -> text_input::TextInput<'a, Message> {
    text_input(placeholder, val)
        .on_input(on_change)
        .padding(8)
        .size(12)
        .style(|_, status| {
            let border_color = if matches!(status, iced::widget::text_input::Status::Focused { .. })
            {
                style::ACCENT_BLUE
            } else {
                style::STROKE_DIM
            };
            text_input::Style {
                background: style::BG_DARK.into(),
                border: Border {
                    color: border_color,
                    width: 1.0,
                    radius: 6.0.into(),
                },
                icon: style::TEXT_MUTED,
                placeholder: style::TEXT_MUTED,
                value: style::TEXT_BRIGHT,
                selection: style::ACCENT_BLUE,
            }
        })
}

fn toggle<'a>(is_checked: bool, on_toggle: impl Fn(bool) -> Message + 'a) -> Element<'a, Message> {
    checkbox(is_checked)
        .on_toggle(on_toggle)
        .size(14)
        .style(move |_theme, _status| checkbox::Style {
            icon_color: style::TEXT_BRIGHT,
            background: if is_checked {
                style::ACCENT_BLUE.into()
            } else {
                style::BG_DARK.into()
            },
            border: Border {
                radius: 4.0.into(),
                width: 1.0,
                color: style::STROKE_DIM,
            },
            text_color: None,
        })
        .into()
}

fn choice_btn(label: &str, active: bool, msg: Message) -> Element<'_, Message> {
    button(text(label.to_string()).size(12))
        .on_press(msg)
        .padding([6, 12])
        .style(move |_, _| {
            if active {
                primary_btn_style(&Theme::Dark, iced::widget::button::Status::Active)
            } else {
                secondary_btn_style(&Theme::Dark, iced::widget::button::Status::Active)
            }
        })
        .into()
}

fn primary_btn_style(_: &Theme, _: iced::widget::button::Status) -> button::Style {
    button::Style {
        background: Some(style::ACCENT_BLUE.into()),
        text_color: style::BG_DARK,
        border: Border {
            radius: 6.0.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn secondary_btn_style(_: &Theme, _: iced::widget::button::Status) -> button::Style {
    button::Style {
        background: Some(style::BG_DARK.into()),
        text_color: style::TEXT_BRIGHT,
        border: Border {
            radius: 6.0.into(),
            color: style::STROKE_DIM,
            width: 1.0,
        },
        ..Default::default()
    }
}

fn danger_btn_style(_: &Theme, _: iced::widget::button::Status) -> button::Style {
    button::Style {
        background: Some(style::BG_DARK.into()),
        text_color: style::ACCENT_RED,
        border: Border {
            radius: 6.0.into(),
            color: style::ACCENT_RED,
            width: 1.0,
        },
        ..Default::default()
    }
}
