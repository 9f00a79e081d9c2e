use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::Alert;
use super::trigger::AlertTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AlertTrigger,
    System,
    News,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AlertTrigger => "alert_trigger",
            NotificationKind::System => "system",
            NotificationKind::News => "news",
        }
    }
}

/// User-visible message handed to every notification sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn alert_created(alert: &Alert) -> Self {
        Self {
            kind: NotificationKind::System,
            title: "Alert created".into(),
            body: Some(alert.title.clone()),
            payload: serde_json::to_value(alert).ok(),
            created_at: Utc::now(),
        }
    }

    pub fn status_changed(alert: &Alert) -> Self {
        Self {
            kind: NotificationKind::System,
            title: format!("Alert {}", alert.status),
            body: Some(alert.title.clone()),
            payload: serde_json::to_value(alert).ok(),
            created_at: Utc::now(),
        }
    }

    pub fn alert_triggered(alert: &Alert, trigger: &AlertTrigger) -> Self {
        Self {
            kind: NotificationKind::AlertTrigger,
            title: format!("{} triggered", alert.symbol),
            body: Some(format!("{} @ {}", alert.title, trigger.price)),
            payload: serde_json::to_value(trigger).ok(),
            created_at: Utc::now(),
        }
    }
}
