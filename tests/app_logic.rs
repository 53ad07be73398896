//! Integration tests for panel behavior using mock dependencies.
//!
//! These tests drive the panel end to end against a MockConnection and
//! use MockClock and MockNotifier for deterministic, reproducible runs.

use std::sync::Arc;

use calorie_panel::{
    CalorieClient, ClientError, MockClock, MockConnection, MockNotifier, Panel, PanelStatus,
    editor::Modal,
    models::EntryKind,
    panel::Intent,
};
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use serde_json::json;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// Backend with one user, two profiles and a single food entry today.
fn backend() -> Arc<MockConnection> {
    let mock = Arc::new(MockConnection::new());
    mock.respond("auth/current_user", json!({"id": "user-1", "name": "sam"}))
        .respond(
            "calorie_tracker/get_user_profile",
            json!({
                "default_profile": {
                    "entity_id": "sensor.calorie_tracker_sam",
                    "spoken_name": "Sam",
                    "daily_goal": 1800
                },
                "all_profiles": [
                    {"entity_id": "sensor.calorie_tracker_sam", "spoken_name": "Sam", "daily_goal": 1800},
                    {"entity_id": "sensor.calorie_tracker_alex", "spoken_name": "Alex", "daily_goal": 2200}
                ]
            }),
        )
        .respond("calorie_tracker/get_discovered_data", json!({}))
        .respond("conversation/agent/list", json!({"agents": []}))
        .respond("assist_pipeline/pipeline/list", json!({"pipelines": []}))
        .respond(
            "calorie_tracker/get_daily_data",
            json!({
                "food_entries": [
                    {"id": "f1", "timestamp": "2025-03-05T07:45:00", "food_item": "Oatmeal", "calories": 300}
                ],
                "exercise_entries": [],
                "weight": 181.5
            }),
        )
        .respond("calorie_tracker/get_weekly_summary", json!({"weekly_summary": {}}))
        .respond("calorie_tracker/get_month_data_days", json!({"days": ["2025-03-05"]}))
        .respond("calorie_tracker/get_linked_components", json!({}));
    mock
}

async fn started(mock: Arc<MockConnection>) -> (Panel, Arc<MockClock>, Arc<MockNotifier>) {
    let clock = Arc::new(MockClock::new(at(2025, 3, 5, 12, 0)));
    let notifier = Arc::new(MockNotifier::new());
    let mut panel = Panel::new(CalorieClient::new(mock), None, clock.clone(), notifier.clone());
    panel.start().await;
    assert_eq!(panel.status, PanelStatus::Ready);
    (panel, clock, notifier)
}

// ==================== Entry Editing Tests ====================

#[tokio::test]
async fn test_add_food_creates_then_reloads() {
    let mock = backend();
    mock.respond("calorie_tracker/create_entry", json!({"success": true}));
    let (mut panel, _, _) = started(mock.clone()).await;
    assert_eq!(panel.entries().len(), 1);

    panel.editor.open_add(EntryKind::Food);
    let form = panel.editor.form_mut().unwrap();
    form.name = "Toast".into();
    form.calories = "120".into();
    form.time = "08:30".into();

    let intent = panel.submit_entry().expect("Valid form should submit");
    assert!(!panel.editor.is_open());
    panel.execute(intent).await;

    let create = &mock.calls_of("calorie_tracker/create_entry")[0];
    assert_eq!(create["entity_id"], "sensor.calorie_tracker_sam");
    assert_eq!(create["entry_type"], "food");
    assert_eq!(create["entry"]["food_item"], "Toast");
    assert_eq!(create["entry"]["calories"], 120);
    assert!(
        create["entry"]["timestamp"]
            .as_str()
            .unwrap()
            .starts_with("2025-03-05T08:30")
    );
    // Initial load plus the reload after the mutation
    assert_eq!(mock.calls_of("calorie_tracker/get_daily_data").len(), 2);
    assert!(panel.error.is_none());
}

#[tokio::test]
async fn test_invalid_form_stays_open() {
    let mock = backend();
    let (mut panel, _, _) = started(mock.clone()).await;

    panel.editor.open_add(EntryKind::Food);
    let form = panel.editor.form_mut().unwrap();
    form.name = "Toast".into();
    form.calories = "lots".into();

    assert!(panel.submit_entry().is_none());
    match panel.editor.modal() {
        Modal::AddPopup(form) => assert!(form.error.is_some()),
        other => panic!("Form should stay open, got {:?}", other),
    }
    assert!(mock.calls_of("calorie_tracker/create_entry").is_empty());
}

#[tokio::test]
async fn test_delete_entry() {
    let mock = backend();
    mock.respond("calorie_tracker/delete_entry", json!({"success": true}));
    let (mut panel, _, _) = started(mock.clone()).await;

    let entry = panel.entries().remove(0);
    let intent = panel.editor.delete(&entry);
    panel.execute(Intent::Editor(intent)).await;

    let delete = &mock.calls_of("calorie_tracker/delete_entry")[0];
    assert_eq!(delete["entry_id"], "f1");
    assert_eq!(delete["entry_type"], "food");
}

#[tokio::test]
async fn test_log_weight_uses_selected_date() {
    let mock = backend();
    mock.respond("calorie_tracker/log_weight", json!({"success": true}));
    let (mut panel, _, _) = started(mock.clone()).await;

    let request = panel.shift_day(-2).unwrap();
    panel.load(request).await;
    let intent = panel
        .editor
        .log_weight("180.2", panel.selected_date)
        .unwrap();
    panel.execute(Intent::Editor(intent)).await;

    let call = &mock.calls_of("calorie_tracker/log_weight")[0];
    assert_eq!(call["weight"], 180.2);
    assert_eq!(call["date"], "2025-03-03");
    assert!(panel.editor.log_weight("-4", panel.selected_date).is_err());
}

#[tokio::test]
async fn test_failed_mutation_reports_and_resyncs() {
    let mock = backend();
    mock.respond(
        "calorie_tracker/create_entry",
        json!({"success": false, "error": "Entry rejected"}),
    );
    let (mut panel, _, _) = started(mock.clone()).await;

    panel.editor.open_add(EntryKind::Exercise);
    let form = panel.editor.form_mut().unwrap();
    form.name = "Rowing".into();
    form.duration = "30".into();
    let intent = panel.submit_entry().unwrap();
    panel.execute(intent).await;

    let error = panel.error.clone().expect("Failure should be reported");
    assert!(error.contains("Entry rejected"));
    assert_eq!(mock.calls_of("calorie_tracker/get_daily_data").len(), 2);
    assert_eq!(panel.status, PanelStatus::Ready);
}

// ==================== Session Tests ====================

#[tokio::test]
async fn test_unauthorized_mutation_expires_session() {
    let mock = backend();
    mock.fail("calorie_tracker/delete_entry", ClientError::Unauthorized);
    let (mut panel, _, notifier) = started(mock.clone()).await;

    let entry = panel.entries().remove(0);
    let intent = panel.editor.delete(&entry);
    panel.execute(Intent::Editor(intent)).await;

    assert_eq!(panel.status, PanelStatus::SessionExpired);
    assert_eq!(notifier.notification_count(), 1);
    assert!(panel.begin_load().is_none());
    assert!(panel.job(Intent::MakeDefault).is_none());
}

#[tokio::test]
async fn test_no_profiles_shows_setup_state() {
    let mock = backend();
    mock.respond(
        "calorie_tracker/get_user_profile",
        json!({"default_profile": null, "all_profiles": []}),
    );
    let clock = Arc::new(MockClock::new(at(2025, 3, 5, 12, 0)));
    let mut panel = Panel::new(
        CalorieClient::new(mock.clone()),
        None,
        clock,
        Arc::new(MockNotifier::new()),
    );

    panel.start().await;

    assert_eq!(panel.status, PanelStatus::NoProfile);
    assert!(mock.calls_of("calorie_tracker/get_daily_data").is_empty());
}

// ==================== Profile Tests ====================

#[tokio::test]
async fn test_rename_notifies_restart_and_refreshes_profiles() {
    let mock = backend();
    mock.respond("calorie_tracker/update_profile", json!({"success": true}));
    let (mut panel, _, notifier) = started(mock.clone()).await;

    panel.open_profile_editor();
    panel.profile_editor.draft_mut().unwrap().spoken_name = "Samantha".into();
    for intent in panel.save_profile() {
        panel.execute(intent).await;
    }

    let update = &mock.calls_of("calorie_tracker/update_profile")[0];
    assert_eq!(update["spoken_name"], "Samantha");
    assert_eq!(update["entity_id"], "sensor.calorie_tracker_sam");
    assert!(panel.profile_editor.restart_required);
    assert_eq!(notifier.notification_count(), 1);
    assert_eq!(mock.calls_of("calorie_tracker/get_user_profile").len(), 2);
}

#[tokio::test]
async fn test_switch_and_make_default() {
    let mock = backend();
    mock.respond("calorie_tracker/update_profile", json!({"success": true}));
    let (mut panel, _, _) = started(mock.clone()).await;
    assert!(panel.is_default_profile());

    let request = panel.switch_profile("sensor.calorie_tracker_alex").unwrap();
    assert_eq!(request.entity_id, "sensor.calorie_tracker_alex");
    panel.load(request).await;
    assert!(!panel.is_default_profile());

    let job = panel.job(Intent::MakeDefault).expect("User is known");
    let followup = panel.complete(job.run().await);
    assert_eq!(followup, calorie_panel::panel::Followup::RefreshProfiles);

    let call = &mock.calls_of("calorie_tracker/update_profile")[0];
    assert_eq!(call["entity_id"], "sensor.calorie_tracker_alex");
    assert_eq!(call["username"], "sam");
}

// ==================== Capability Tests ====================

#[tokio::test]
async fn test_chat_and_photo_without_capabilities() {
    let (mut panel, _, _) = started(backend()).await;

    panel.open_chat();
    assert!(matches!(panel.editor.modal(), Modal::MissingCapability(_)));

    panel.editor.close_all_modals();
    panel.open_photo();
    assert!(matches!(panel.editor.modal(), Modal::MissingCapability(_)));
}

// ==================== Clock Tests ====================

/// Midnight moves the selection along when today was selected.
#[tokio::test]
async fn test_day_rollover_follows_today() {
    let (mut panel, clock, _) = started(backend()).await;

    clock.advance(ChronoDuration::hours(13));
    let request = panel.tick().expect("Rollover should reload");

    assert_eq!(request.date, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
    assert_eq!(panel.selected_date, panel.today);
}

/// A past day stays selected across midnight.
#[tokio::test]
async fn test_day_rollover_keeps_past_selection() {
    let (mut panel, clock, _) = started(backend()).await;
    let request = panel.shift_day(-1).unwrap();
    panel.load(request).await;

    clock.set_time(at(2025, 3, 6, 0, 5));

    assert!(panel.tick().is_none());
    assert_eq!(panel.selected_date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
    assert_eq!(panel.today, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
}
