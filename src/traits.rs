//! Abstractions for time and side effects to enable testing.
//!
//! This module provides traits for:
//! - `Clock`: Abstracting local wall-clock access for deterministic testing
//! - `Notifier`: Abstracting user-facing notices (restart required, session
//!   expired) so panel logic can be tested without a desktop session

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{Local, NaiveDateTime};

// ==================== Clock Trait ====================

/// Trait for abstracting time access.
///
/// The panel works exclusively in the viewer's local calendar: entry
/// timestamps carry no zone and week buckets are local dates, so the clock
/// hands out naive local time.
pub trait Clock: Send + Sync {
    /// Get the current local wall-clock time.
    fn now_local(&self) -> NaiveDateTime;
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Mock clock for testing with controllable time.
#[derive(Debug, Clone)]
pub struct MockClock {
    time: Arc<Mutex<NaiveDateTime>>,
}

impl MockClock {
    /// Create a new mock clock set to the given local time.
    pub fn new(time: NaiveDateTime) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    /// Set the mock clock to a new time.
    pub fn set_time(&self, time: NaiveDateTime) {
        if let Ok(mut guard) = self.time.lock() {
            *guard = time;
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        if let Ok(mut guard) = self.time.lock() {
            *guard += duration;
        }
    }
}

impl Clock for MockClock {
    fn now_local(&self) -> NaiveDateTime {
        match self.time.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ==================== Notifier Trait ====================

/// Trait for abstracting user notifications.
pub trait Notifier: Send + Sync {
    /// Send a notification with the given title and body.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Desktop notifier implementation using notify-rust.
#[cfg(feature = "gui")]
#[derive(Debug, Clone, Default)]
pub struct SystemNotifier;

#[cfg(feature = "gui")]
impl Notifier for SystemNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("Calorie Panel")
            .show()?;
        Ok(())
    }
}

/// Notifier that only logs; used by the headless renderer.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        tracing::info!(title, body, "notice");
        Ok(())
    }
}

/// Mock notifier for testing that records all notifications.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNotifier {
    /// Create a new mock notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all notifications that have been sent.
    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Get the count of notifications sent.
    pub fn notification_count(&self) -> usize {
        self.notifications.lock().map(|n| n.len()).unwrap_or(0)
    }

    /// Clear all recorded notifications.
    pub fn clear(&self) {
        if let Ok(mut n) = self.notifications.lock() {
            n.clear();
        }
    }

    /// Check if any notification was sent.
    pub fn was_called(&self) -> bool {
        self.notification_count() > 0
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        if let Ok(mut n) = self.notifications.lock() {
            n.push((title.to_string(), body.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_system_clock_is_close_to_local_now() {
        let clock = SystemClock;
        let before = Local::now().naive_local();
        let clock_time = clock.now_local();
        let after = Local::now().naive_local();

        assert!(clock_time >= before);
        assert!(clock_time <= after);
    }

    #[test]
    fn test_mock_clock_returns_set_time() {
        let clock = MockClock::new(at(14, 30));
        assert_eq!(clock.now_local(), at(14, 30));
    }

    #[test]
    fn test_mock_clock_can_be_updated() {
        let clock = MockClock::new(at(10, 0));
        clock.set_time(at(14, 0));
        assert_eq!(clock.now_local(), at(14, 0));
    }

    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new(at(10, 0));
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now_local(), at(12, 0));
    }

    #[test]
    fn test_mock_notifier_records_notifications() {
        let notifier = MockNotifier::new();

        assert!(!notifier.was_called());
        notifier.notify("Title 1", "Body 1").unwrap();
        notifier.notify("Title 2", "Body 2").unwrap();

        assert_eq!(notifier.notification_count(), 2);
        let notifications = notifier.get_notifications();
        assert_eq!(
            notifications[0],
            ("Title 1".to_string(), "Body 1".to_string())
        );
    }

    #[test]
    fn test_mock_notifier_clear() {
        let notifier = MockNotifier::new();
        notifier.notify("Test", "Test").unwrap();
        notifier.clear();
        assert!(!notifier.was_called());
    }

    #[test]
    fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify("Restart required", "body").is_ok());
    }
}
