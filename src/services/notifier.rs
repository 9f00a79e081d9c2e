use async_trait::async_trait;
use serde_json::json;

use crate::models::{Notification, NotificationKind};

/// Delivery channel for user-visible notifications.
///
/// Errors are reported to the caller for logging only; a failed delivery never
/// undoes the state change that produced the notification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short channel name recorded on triggers ("telegram", "dashboard").
    fn channel(&self) -> &'static str;

    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Telegram notification service. Only alert triggers are forwarded.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            chat_id,
        }
    }

    /// Send a Telegram message.
    pub async fn send(&self, message: &str) -> anyhow::Result<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("Telegram sendMessage returned {}", resp.status());
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for Notifier {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        if notification.kind != NotificationKind::AlertTrigger {
            return Ok(());
        }
        self.send(&format_notification(notification)).await
    }
}

/// Format a notification as a Telegram Markdown message.
pub fn format_notification(notification: &Notification) -> String {
    match &notification.body {
        Some(body) => format!("*{}*\n{}", notification.title, body),
        None => format!("*{}*", notification.title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_notification() {
        let n = Notification {
            kind: NotificationKind::AlertTrigger,
            title: "NVDA triggered".into(),
            body: Some("NVDA above $900 @ 901.20".into()),
            payload: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            format_notification(&n),
            "*NVDA triggered*\nNVDA above $900 @ 901.20"
        );

        let bare = Notification { body: None, ..n };
        assert_eq!(format_notification(&bare), "*NVDA triggered*");
    }
}
