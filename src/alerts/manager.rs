use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::{AlertStore, StoreError};
use crate::errors::AlertError;
use crate::models::{
    Alert, AlertFilter, AlertStatus, AlertTrigger, NewAlert, Notification, TriggerReview,
};
use crate::services::notifier::NotificationSink;

use super::evaluate::score_move;
use super::lifecycle::{build_alert, plan_transition};

pub const DEFAULT_EVALUATION_WINDOW_MINUTES: i32 = 60;

/// Most decimal places accepted on a trigger price.
pub const MAX_PRICE_SCALE: u32 = 8;

/// Owns alert records and every status change made to them.
///
/// All mutation goes through the store's compare-and-set; a lost race comes
/// back as `AlertError::Conflict` and leaves the stored alert untouched.
pub struct AlertManager {
    store: Arc<dyn AlertStore>,
    sinks: Vec<Arc<dyn NotificationSink>>,
    store_timeout: Duration,
    evaluation_window_minutes: i32,
}

impl AlertManager {
    pub fn new(store: Arc<dyn AlertStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            sinks: Vec::new(),
            store_timeout,
            evaluation_window_minutes: DEFAULT_EVALUATION_WINDOW_MINUTES,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_evaluation_window(mut self, minutes: i32) -> Self {
        self.evaluation_window_minutes = minutes;
        self
    }

    pub fn evaluation_window_minutes(&self) -> i32 {
        self.evaluation_window_minutes
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, AlertError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(res) => res.map_err(AlertError::from),
            Err(_) => {
                tracing::warn!(op, timeout = ?self.store_timeout, "Store call timed out");
                Err(AlertError::Persistence(format!(
                    "{op} timed out after {:?}",
                    self.store_timeout
                )))
            }
        }
    }

    async fn emit(&self, notification: &Notification) {
        for sink in &self.sinks {
            let result = tokio::time::timeout(self.store_timeout, sink.notify(notification)).await;
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(_) => "timed out".to_string(),
            };
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::warn!(
                channel = sink.channel(),
                kind = notification.kind.as_str(),
                error = %error,
                "Notification delivery failed"
            );
        }
    }

    pub async fn ping(&self) -> Result<(), AlertError> {
        self.bounded("ping", self.store.ping()).await
    }

    pub async fn create_alert(&self, input: NewAlert) -> Result<Alert, AlertError> {
        let alert = build_alert(input, Utc::now())?;
        self.bounded("insert_alert", self.store.insert_alert(&alert))
            .await?;

        metrics::counter!("alerts_created_total").increment(1);
        tracing::info!(
            alert_id = %alert.id,
            symbol = %alert.symbol,
            alert_type = %alert.alert_type,
            "Alert created"
        );

        self.emit(&Notification::alert_created(&alert)).await;
        Ok(alert)
    }

    pub async fn get_alert(&self, id: Uuid) -> Result<Alert, AlertError> {
        self.bounded("get_alert", self.store.get_alert(id)).await
    }

    /// Move an alert to `to`. `snooze_until` is required (and must be in the
    /// future) when snoozing and ignored otherwise.
    pub async fn update_status(
        &self,
        id: Uuid,
        to: AlertStatus,
        snooze_until: Option<DateTime<Utc>>,
    ) -> Result<Alert, AlertError> {
        let current = self.get_alert(id).await?;
        let change = plan_transition(&current, to, snooze_until, Utc::now())?;

        let updated = self
            .bounded("update_alert_status", self.store.update_alert_status(id, &change))
            .await
            .inspect_err(|e| self.note_conflict(e))?;

        // triggered -> triggered leaves the record as it was.
        if change.from == change.to {
            tracing::debug!(alert_id = %id, status = %to, "Status unchanged");
            return Ok(updated);
        }

        metrics::counter!("alert_transitions_total", "to" => to.as_str()).increment(1);
        tracing::info!(
            alert_id = %id,
            from = %change.from,
            to = %change.to,
            "Alert status changed"
        );

        self.emit(&Notification::status_changed(&updated)).await;
        Ok(updated)
    }

    /// Fire an active alert at `price`, recording the trigger for later
    /// settlement in the same write as the status change.
    pub async fn fire(&self, id: Uuid, price: Decimal) -> Result<(Alert, AlertTrigger), AlertError> {
        let price = price.normalize();
        if price <= Decimal::ZERO {
            return Err(AlertError::validation("trigger price must be positive"));
        }
        if price.scale() > MAX_PRICE_SCALE {
            return Err(AlertError::validation(format!(
                "trigger price has more than {MAX_PRICE_SCALE} decimal places"
            )));
        }

        let current = self.get_alert(id).await?;
        if current.status != AlertStatus::Active {
            return Err(AlertError::InvalidTransition {
                from: current.status,
                to: AlertStatus::Triggered,
            });
        }

        let now = Utc::now();
        let change = plan_transition(&current, AlertStatus::Triggered, None, now)?;
        let trigger = AlertTrigger {
            id: Uuid::new_v4(),
            alert_id: id,
            ticker: current.symbol.clone(),
            price,
            bias: current.alert_type.bias(),
            evaluation_window_minutes: self.evaluation_window_minutes,
            triggered_at: now,
            outcome: None,
            pnl_after_window: None,
            dismissed: false,
            acknowledged_at: None,
            delivered_channels: self.sinks.iter().map(|s| s.channel().to_string()).collect(),
        };

        let alert = self
            .bounded("fire_alert", self.store.fire_alert(id, &change, &trigger))
            .await
            .inspect_err(|e| self.note_conflict(e))?;

        metrics::counter!("alerts_triggered_total").increment(1);
        metrics::counter!("alert_transitions_total", "to" => AlertStatus::Triggered.as_str())
            .increment(1);
        tracing::info!(
            alert_id = %id,
            symbol = %alert.symbol,
            price = %price,
            "Alert triggered"
        );

        self.emit(&Notification::alert_triggered(&alert, &trigger)).await;
        Ok((alert, trigger))
    }

    /// Score a trigger against the price observed after its window.
    pub async fn settle_trigger(
        &self,
        trigger: &AlertTrigger,
        price_after: Decimal,
    ) -> Result<AlertTrigger, AlertError> {
        let (pnl, outcome) =
            score_move(trigger.bias, trigger.price, price_after).ok_or_else(|| {
                AlertError::validation(format!(
                    "move from {} to {price_after} is out of range",
                    trigger.price
                ))
            })?;

        let settled = self
            .bounded(
                "record_trigger_outcome",
                self.store.record_trigger_outcome(trigger.id, outcome, pnl),
            )
            .await
            .map_err(|e| e.for_trigger())?;

        tracing::info!(
            trigger_id = %trigger.id,
            ticker = %trigger.ticker,
            outcome = outcome.as_str(),
            pnl = %pnl,
            "Trigger settled"
        );
        Ok(settled)
    }

    /// Mark a trigger as seen. The first acknowledgement time is kept.
    pub async fn acknowledge_trigger(
        &self,
        alert_id: Uuid,
        trigger_id: Uuid,
    ) -> Result<AlertTrigger, AlertError> {
        self.review_trigger(alert_id, trigger_id, TriggerReview::Acknowledge)
            .await
    }

    /// Hide a trigger from the alert's feed; dismissing also acknowledges it.
    pub async fn dismiss_trigger(
        &self,
        alert_id: Uuid,
        trigger_id: Uuid,
    ) -> Result<AlertTrigger, AlertError> {
        self.review_trigger(alert_id, trigger_id, TriggerReview::Dismiss)
            .await
    }

    pub async fn review_trigger(
        &self,
        alert_id: Uuid,
        trigger_id: Uuid,
        review: TriggerReview,
    ) -> Result<AlertTrigger, AlertError> {
        let trigger = self
            .bounded(
                "review_trigger",
                self.store
                    .review_trigger(alert_id, trigger_id, review, Utc::now()),
            )
            .await
            .map_err(|e| e.for_trigger())?;

        tracing::info!(
            alert_id = %alert_id,
            trigger_id = %trigger_id,
            review = review.as_str(),
            "Trigger reviewed"
        );
        Ok(trigger)
    }

    /// Permanently remove an alert. Deleting a missing id succeeds.
    pub async fn delete_alert(&self, id: Uuid) -> Result<(), AlertError> {
        self.bounded("delete_alert", self.store.delete_alert(id)).await?;
        tracing::info!(alert_id = %id, "Alert deleted");
        Ok(())
    }

    pub async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, AlertError> {
        self.bounded("list_alerts", self.store.list_alerts(filter)).await
    }

    pub async fn list_all(&self) -> Result<Vec<Alert>, AlertError> {
        self.list(&AlertFilter::all()).await
    }

    pub async fn list_active(&self) -> Result<Vec<Alert>, AlertError> {
        self.list(&AlertFilter::with_status(AlertStatus::Active)).await
    }

    pub async fn triggers(&self, alert_id: Uuid) -> Result<Vec<AlertTrigger>, AlertError> {
        self.bounded("list_triggers", self.store.list_triggers(alert_id))
            .await
    }

    pub async fn pending_triggers(&self, now: DateTime<Utc>) -> Result<Vec<AlertTrigger>, AlertError> {
        self.bounded("pending_triggers", self.store.pending_triggers(now))
            .await
    }

    /// Return snoozed alerts whose snooze has run out to `active`.
    /// Alerts changed concurrently are skipped.
    pub async fn reactivate_expired(&self, now: DateTime<Utc>) -> Result<Vec<Alert>, AlertError> {
        let snoozed = self
            .list(&AlertFilter::with_status(AlertStatus::Snoozed))
            .await?;

        let mut woken = Vec::new();
        for alert in snoozed {
            if alert.snoozed_until.map_or(true, |until| until > now) {
                continue;
            }
            match self.update_status(alert.id, AlertStatus::Active, None).await {
                Ok(a) => woken.push(a),
                Err(AlertError::Conflict { .. }) | Err(AlertError::NotFound(_)) => {
                    tracing::debug!(alert_id = %alert.id, "Snoozed alert changed before wake-up");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(woken)
    }

    fn note_conflict(&self, e: &AlertError) {
        if let AlertError::Conflict { id, expected, actual } = e {
            metrics::counter!("alert_transition_conflicts_total").increment(1);
            tracing::warn!(
                alert_id = %id,
                expected = %expected,
                actual = %actual,
                "Alert status changed concurrently"
            );
        }
    }
}
