//! Daily entry editor.
//!
//! The editor is a modal state machine; at most one modal is open at a
//! time. It never talks to the network itself: user actions that need the
//! backend come out as [`EditorIntent`]s, and their outcomes are fed back
//! through the `*_finished` / `*_replied` methods.

use chrono::{NaiveDate, NaiveDateTime};

use crate::api::{Analyzer, PhotoAnalysis, PhotoUpload};
use crate::client::ConversationReply;
use crate::dates::{compose_timestamp, entry_timestamp, parse_time};
use crate::error::ClientResult;
use crate::models::{ConversationAgent, EntryKind, LogEntry, NewEntry};

/// Agents that ship with the host and cannot log food.
pub const BUILTIN_AGENTS: [&str; 2] = ["conversation.home_assistant", "homeassistant"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ImageAnalyzer,
    ConversationAgent,
}

impl Capability {
    pub fn title(&self) -> &'static str {
        match self {
            Capability::ImageAnalyzer => "No image analyzer configured",
            Capability::ConversationAgent => "No conversation agent configured",
        }
    }

    /// Integrations that provide the capability.
    pub fn remedial_integrations(&self) -> &'static [&'static str] {
        match self {
            Capability::ImageAnalyzer => &[
                "OpenAI Conversation",
                "Google Generative AI",
                "Azure OpenAI Conversation",
            ],
            Capability::ConversationAgent => &[
                "OpenAI Conversation",
                "Google Generative AI",
                "Azure OpenAI Conversation",
                "Anthropic",
            ],
        }
    }
}

// ==================== Forms ====================

#[derive(Debug, Clone, PartialEq)]
pub struct EntryForm {
    pub kind: EntryKind,
    pub name: String,
    pub calories: String,
    pub duration: String,
    /// `HH:MM`; empty means "now" for new entries.
    pub time: String,
    pub error: Option<String>,
}

impl EntryForm {
    pub fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            name: String::new(),
            calories: String::new(),
            duration: String::new(),
            time: String::new(),
            error: None,
        }
    }

    pub fn from_entry(entry: &LogEntry) -> Self {
        let time = entry
            .timestamp()
            .get(11..16)
            .unwrap_or_default()
            .to_string();
        let duration = match entry {
            LogEntry::Exercise(e) => e
                .duration_minutes
                .map(|d| format!("{}", d.round() as i64))
                .unwrap_or_default(),
            LogEntry::Food(_) => String::new(),
        };
        Self {
            kind: entry.kind(),
            name: entry.name().to_string(),
            calories: format!("{}", entry.calories().round() as i64),
            duration,
            time,
            error: None,
        }
    }

    /// Validate the form into an entry with the given timestamp.
    pub fn to_entry(&self, timestamp: Option<String>) -> Result<NewEntry, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(match self.kind {
                EntryKind::Food => "Food item is required".to_string(),
                EntryKind::Exercise => "Exercise type is required".to_string(),
            });
        }
        match self.kind {
            EntryKind::Food => {
                let calories = parse_amount(&self.calories, "Calories")?
                    .ok_or_else(|| "Calories are required".to_string())?;
                Ok(NewEntry::Food {
                    food_item: name.to_string(),
                    calories,
                    timestamp,
                })
            }
            EntryKind::Exercise => {
                let calories_burned = parse_amount(&self.calories, "Calories burned")?;
                let duration_minutes = parse_amount(&self.duration, "Duration")?;
                if calories_burned.is_none() && duration_minutes.is_none() {
                    return Err("Enter calories burned or a duration".to_string());
                }
                Ok(NewEntry::Exercise {
                    exercise_type: name.to_string(),
                    calories_burned,
                    duration_minutes,
                    timestamp,
                })
            }
        }
    }
}

/// Optional non-negative whole number; decimals are rounded.
fn parse_amount(input: &str, field: &str) -> Result<Option<i64>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v.round() as i64)),
        _ => Err(format!("{} must be a non-negative number", field)),
    }
}

// ==================== Photo review ====================

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewItem {
    pub food_item: String,
    pub calories: String,
    pub selected: bool,
}

// ==================== Chat ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatState {
    pub agent: ConversationAgent,
    pub transcript: Vec<ChatLine>,
    pub input: String,
    pub conversation_id: Option<String>,
    pub waiting: bool,
    pub error: Option<String>,
}

/// First agent that is not one of the host's built-in agents.
pub fn default_agent(agents: &[ConversationAgent]) -> Option<&ConversationAgent> {
    agents
        .iter()
        .find(|a| !BUILTIN_AGENTS.contains(&a.id.as_str()))
}

// ==================== State machine ====================

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Modal {
    #[default]
    Idle,
    AddPopup(EntryForm),
    EditPopup {
        entry_id: String,
        original_timestamp: String,
        form: EntryForm,
    },
    AnalyzerSelect(Vec<Analyzer>),
    PhotoUpload {
        analyzer: Analyzer,
        error: Option<String>,
    },
    PhotoProcessing {
        analyzer: Analyzer,
    },
    PhotoReview {
        items: Vec<ReviewItem>,
        error: Option<String>,
    },
    ChatAssist(ChatState),
    MissingCapability(Capability),
}

/// Work the editor needs done by the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorIntent {
    Create(NewEntry),
    Update { entry_id: String, entry: NewEntry },
    Delete { entry_id: String, kind: EntryKind },
    LogWeight { weight: f64, date: NaiveDate },
    AnalyzePhoto { analyzer: Analyzer, photo: PhotoUpload },
    SendChat {
        agent_id: String,
        text: String,
        conversation_id: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Editor {
    modal: Modal,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn is_open(&self) -> bool {
        self.modal != Modal::Idle
    }

    pub fn close_all_modals(&mut self) {
        self.modal = Modal::Idle;
    }

    fn open(&mut self, modal: Modal) {
        self.close_all_modals();
        self.modal = modal;
    }

    // ---------- manual entries ----------

    pub fn open_add(&mut self, kind: EntryKind) {
        self.open(Modal::AddPopup(EntryForm::new(kind)));
    }

    pub fn open_edit(&mut self, entry: &LogEntry) {
        self.open(Modal::EditPopup {
            entry_id: entry.id().to_string(),
            original_timestamp: entry.timestamp().to_string(),
            form: EntryForm::from_entry(entry),
        });
    }

    /// The open add/edit form, for field updates.
    pub fn form_mut(&mut self) -> Option<&mut EntryForm> {
        match &mut self.modal {
            Modal::AddPopup(form) | Modal::EditPopup { form, .. } => Some(form),
            _ => None,
        }
    }

    /// Validate and submit the open form. Validation problems stay on the
    /// form and yield `None`.
    pub fn submit(&mut self, selected: NaiveDate, now: NaiveDateTime) -> Option<EditorIntent> {
        let intent = match &mut self.modal {
            Modal::AddPopup(form) => {
                let timestamp = if form.time.trim().is_empty() {
                    Some(entry_timestamp(selected, now))
                } else {
                    match parse_time(&form.time) {
                        Some(time) => Some(entry_timestamp(selected, selected.and_time(time))),
                        None => {
                            form.error = Some("Time must be HH:MM".to_string());
                            return None;
                        }
                    }
                };
                match form.to_entry(timestamp) {
                    Ok(entry) => EditorIntent::Create(entry),
                    Err(e) => {
                        form.error = Some(e);
                        return None;
                    }
                }
            }
            Modal::EditPopup {
                entry_id,
                original_timestamp,
                form,
            } => {
                let timestamp = if form.time.trim().is_empty() {
                    None
                } else {
                    match compose_timestamp(original_timestamp, &form.time) {
                        Some(ts) => Some(ts),
                        None => {
                            form.error = Some("Time must be HH:MM".to_string());
                            return None;
                        }
                    }
                };
                match form.to_entry(timestamp) {
                    Ok(entry) => EditorIntent::Update {
                        entry_id: entry_id.clone(),
                        entry,
                    },
                    Err(e) => {
                        form.error = Some(e);
                        return None;
                    }
                }
            }
            _ => return None,
        };
        self.close_all_modals();
        Some(intent)
    }

    pub fn delete(&mut self, entry: &LogEntry) -> EditorIntent {
        self.close_all_modals();
        EditorIntent::Delete {
            entry_id: entry.id().to_string(),
            kind: entry.kind(),
        }
    }

    // ---------- photo flow ----------

    /// Start the photo flow with the analyzers the backend offers.
    pub fn open_photo(&mut self, analyzers: Vec<Analyzer>, preferred: Option<&Analyzer>) {
        let preferred = preferred.and_then(|p| {
            analyzers
                .iter()
                .find(|a| a.config_entry_id == p.config_entry_id)
                .cloned()
        });
        let only = match analyzers.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };
        let modal = match preferred.or(only) {
            _ if analyzers.is_empty() => Modal::MissingCapability(Capability::ImageAnalyzer),
            Some(analyzer) => Modal::PhotoUpload {
                analyzer,
                error: None,
            },
            None => Modal::AnalyzerSelect(analyzers),
        };
        self.open(modal);
    }

    pub fn choose_analyzer(&mut self, index: usize) {
        let Modal::AnalyzerSelect(analyzers) = &self.modal else {
            return;
        };
        if let Some(analyzer) = analyzers.get(index).cloned() {
            self.open(Modal::PhotoUpload {
                analyzer,
                error: None,
            });
        }
    }

    /// A photo was picked; upload it with the chosen analyzer.
    pub fn start_upload(&mut self, photo: ClientResult<PhotoUpload>) -> Option<EditorIntent> {
        let Modal::PhotoUpload { analyzer, error } = &mut self.modal else {
            return None;
        };
        match photo {
            Ok(photo) => {
                let analyzer = analyzer.clone();
                self.modal = Modal::PhotoProcessing {
                    analyzer: analyzer.clone(),
                };
                Some(EditorIntent::AnalyzePhoto { analyzer, photo })
            }
            Err(e) => {
                *error = Some(e.to_string());
                None
            }
        }
    }

    pub fn photo_finished(&mut self, result: ClientResult<PhotoAnalysis>) {
        let Modal::PhotoProcessing { analyzer } = &self.modal else {
            return;
        };
        let analyzer = analyzer.clone();
        self.modal = match result {
            Ok(analysis) if !analysis.food_items.is_empty() => Modal::PhotoReview {
                items: analysis
                    .food_items
                    .into_iter()
                    .map(|f| ReviewItem {
                        food_item: f.food_item,
                        calories: format!("{}", f.calories.round() as i64),
                        selected: true,
                    })
                    .collect(),
                error: None,
            },
            Ok(_) => Modal::PhotoUpload {
                analyzer,
                error: Some("No food was detected in this photo".to_string()),
            },
            Err(e) => Modal::PhotoUpload {
                analyzer,
                error: Some(e.to_string()),
            },
        };
    }

    pub fn review_items_mut(&mut self) -> Option<&mut Vec<ReviewItem>> {
        match &mut self.modal {
            Modal::PhotoReview { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn toggle_review_item(&mut self, index: usize) {
        if let Some(item) = self.review_items_mut().and_then(|items| items.get_mut(index)) {
            item.selected = !item.selected;
        }
    }

    /// Confirm the reviewed items: one create per selected item, all with
    /// the same timestamp.
    pub fn confirm_review(&mut self, selected: NaiveDate, now: NaiveDateTime) -> Vec<EditorIntent> {
        let Modal::PhotoReview { items, error } = &mut self.modal else {
            return Vec::new();
        };
        let timestamp = entry_timestamp(selected, now);
        let mut intents = Vec::new();
        for item in items.iter().filter(|i| i.selected) {
            let mut form = EntryForm::new(EntryKind::Food);
            form.name = item.food_item.clone();
            form.calories = item.calories.clone();
            match form.to_entry(Some(timestamp.clone())) {
                Ok(entry) => intents.push(EditorIntent::Create(entry)),
                Err(e) => {
                    *error = Some(format!("{}: {}", item.food_item, e));
                    return Vec::new();
                }
            }
        }
        if intents.is_empty() {
            *error = Some("Select at least one item".to_string());
            return intents;
        }
        self.close_all_modals();
        intents
    }

    // ---------- chat flow ----------

    pub fn open_chat(&mut self, agents: &[ConversationAgent]) {
        let modal = match default_agent(agents) {
            Some(agent) => Modal::ChatAssist(ChatState {
                agent: agent.clone(),
                transcript: Vec::new(),
                input: String::new(),
                conversation_id: None,
                waiting: false,
                error: None,
            }),
            None => Modal::MissingCapability(Capability::ConversationAgent),
        };
        self.open(modal);
    }

    pub fn chat_mut(&mut self) -> Option<&mut ChatState> {
        match &mut self.modal {
            Modal::ChatAssist(chat) => Some(chat),
            _ => None,
        }
    }

    pub fn send_chat(&mut self) -> Option<EditorIntent> {
        let chat = self.chat_mut()?;
        let text = chat.input.trim().to_string();
        if text.is_empty() || chat.waiting {
            return None;
        }
        chat.input.clear();
        chat.error = None;
        chat.waiting = true;
        chat.transcript.push(ChatLine {
            role: ChatRole::User,
            text: text.clone(),
        });
        Some(EditorIntent::SendChat {
            agent_id: chat.agent.id.clone(),
            text,
            conversation_id: chat.conversation_id.clone(),
        })
    }

    /// Record the agent's reply. The first conversation id is kept for the
    /// rest of the session.
    pub fn chat_replied(&mut self, result: ClientResult<ConversationReply>) {
        let Some(chat) = self.chat_mut() else {
            return;
        };
        chat.waiting = false;
        match result {
            Ok(reply) => {
                if chat.conversation_id.is_none() {
                    chat.conversation_id = reply.conversation_id;
                }
                chat.transcript.push(ChatLine {
                    role: ChatRole::Assistant,
                    text: reply.speech,
                });
            }
            Err(e) => chat.error = Some(e.to_string()),
        }
    }

    // ---------- weight ----------

    pub fn log_weight(&self, input: &str, date: NaiveDate) -> Result<EditorIntent, String> {
        match input.trim().parse::<f64>() {
            Ok(weight) if weight.is_finite() && weight > 0.0 => {
                Ok(EditorIntent::LogWeight { weight, date })
            }
            _ => Err("Weight must be a positive number".to_string()),
        }
    }
}
