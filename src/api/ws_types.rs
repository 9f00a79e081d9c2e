use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{Alert, AlertTrigger, Notification, NotificationKind};
use crate::services::notifier::NotificationSink;

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "alert_update")]
    AlertUpdate(Alert),

    #[serde(rename = "alert_triggered")]
    AlertTriggered(AlertTrigger),

    #[serde(rename = "notification")]
    Notification(Notification),
}

impl WsMessage {
    /// Ticker the message concerns, when it concerns one.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            WsMessage::AlertUpdate(a) => Some(&a.symbol),
            WsMessage::AlertTriggered(t) => Some(&t.ticker),
            WsMessage::Notification(_) => None,
        }
    }
}

/// Forwards manager notifications to dashboard WebSocket clients.
#[derive(Debug, Clone)]
pub struct DashboardSink {
    tx: broadcast::Sender<WsMessage>,
}

impl DashboardSink {
    pub fn new(tx: broadcast::Sender<WsMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl NotificationSink for DashboardSink {
    fn channel(&self) -> &'static str {
        "dashboard"
    }

    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let payload = notification.payload.clone();
        let structured = match (notification.kind, payload) {
            (NotificationKind::AlertTrigger, Some(p)) => {
                serde_json::from_value::<AlertTrigger>(p).ok().map(WsMessage::AlertTriggered)
            }
            (NotificationKind::System, Some(p)) => {
                serde_json::from_value::<Alert>(p).ok().map(WsMessage::AlertUpdate)
            }
            _ => None,
        };

        // No connected clients is not a delivery failure.
        if let Some(msg) = structured {
            let _ = self.tx.send(msg);
        }
        let _ = self.tx.send(WsMessage::Notification(notification.clone()));
        Ok(())
    }
}
