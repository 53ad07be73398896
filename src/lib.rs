//! Calorie Panel Library
//!
//! Client, view-model and drawing code for the Home Assistant calorie
//! tracker panel. The `gui` feature adds the desktop front end.

pub mod api;
pub mod calendar;
pub mod cards;
pub mod client;
pub mod config;
pub mod dates;
pub mod drawing;
pub mod editor;
pub mod error;
pub mod gauge;
pub mod hass;
pub mod models;
pub mod panel;
pub mod profile;
pub mod scheduler;
pub mod summary;
pub mod traits;

// GUI-only modules
#[cfg(feature = "gui")]
pub mod style;
#[cfg(feature = "gui")]
pub mod widgets;

// Re-export commonly used types
pub use api::{Analyzer, PhotoAnalysis, PhotoApiClient, PhotoUpload};
pub use cards::{CardConfig, CardKind, render_card};
pub use client::CalorieClient;
pub use config::AppConfig;
pub use drawing::{Drawing, Tone};
pub use error::{ClientError, ClientResult};
pub use hass::{HassConnection, MockConnection, WsConnection};
pub use models::{DailyData, DaySummary, GoalType, Profile, WeeklySummary, WeightUnit};
pub use panel::{Intent, Panel, PanelStatus};
pub use traits::{Clock, LogNotifier, MockClock, MockNotifier, Notifier, SystemClock};
#[cfg(feature = "gui")]
pub use traits::SystemNotifier;
