use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AlertStore, StoreError};
use crate::alerts::StatusChange;
use crate::models::{Alert, AlertFilter, AlertTrigger, TriggerOutcome, TriggerReview};

#[derive(Default)]
struct Tables {
    alerts: HashMap<Uuid, Alert>,
    triggers: Vec<AlertTrigger>,
}

/// In-process store used when no `DATABASE_URL` is configured, and in tests.
#[derive(Default)]
pub struct MemoryAlertStore {
    tables: RwLock<Tables>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare_and_set(
    alerts: &mut HashMap<Uuid, Alert>,
    id: Uuid,
    change: &StatusChange,
) -> Result<Alert, StoreError> {
    let alert = alerts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
    if alert.status != change.from {
        return Err(StoreError::Conflict {
            id,
            expected: change.from,
            actual: alert.status,
        });
    }

    change.apply(alert);
    Ok(alert.clone())
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<Uuid, StoreError> {
        let mut tables = self.tables.write().await;
        tables.alerts.insert(alert.id, alert.clone());
        Ok(alert.id)
    }

    async fn get_alert(&self, id: Uuid) -> Result<Alert, StoreError> {
        let tables = self.tables.read().await;
        tables.alerts.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<Alert, StoreError> {
        let mut tables = self.tables.write().await;
        compare_and_set(&mut tables.alerts, id, change)
    }

    async fn fire_alert(
        &self,
        id: Uuid,
        change: &StatusChange,
        trigger: &AlertTrigger,
    ) -> Result<Alert, StoreError> {
        let mut tables = self.tables.write().await;
        let alert = compare_and_set(&mut tables.alerts, id, change)?;
        tables.triggers.push(trigger.clone());
        Ok(alert)
    }

    async fn delete_alert(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.alerts.remove(&id);
        tables.triggers.retain(|t| t.alert_id != id);
        Ok(())
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<Alert> = tables
            .alerts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    async fn list_triggers(&self, alert_id: Uuid) -> Result<Vec<AlertTrigger>, StoreError> {
        let tables = self.tables.read().await;
        let mut triggers: Vec<AlertTrigger> = tables
            .triggers
            .iter()
            .filter(|t| t.alert_id == alert_id)
            .cloned()
            .collect();
        triggers.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        Ok(triggers)
    }

    async fn pending_triggers(&self, now: DateTime<Utc>) -> Result<Vec<AlertTrigger>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .triggers
            .iter()
            .filter(|t| t.is_due(now))
            .cloned()
            .collect())
    }

    async fn record_trigger_outcome(
        &self,
        trigger_id: Uuid,
        outcome: TriggerOutcome,
        pnl_after_window: Decimal,
    ) -> Result<AlertTrigger, StoreError> {
        let mut tables = self.tables.write().await;
        let trigger = tables
            .triggers
            .iter_mut()
            .find(|t| t.id == trigger_id)
            .ok_or(StoreError::NotFound(trigger_id))?;

        trigger.outcome = Some(outcome);
        trigger.pnl_after_window = Some(pnl_after_window);
        Ok(trigger.clone())
    }

    async fn review_trigger(
        &self,
        alert_id: Uuid,
        trigger_id: Uuid,
        review: TriggerReview,
        at: DateTime<Utc>,
    ) -> Result<AlertTrigger, StoreError> {
        let mut tables = self.tables.write().await;
        let trigger = tables
            .triggers
            .iter_mut()
            .find(|t| t.id == trigger_id && t.alert_id == alert_id)
            .ok_or(StoreError::NotFound(trigger_id))?;

        trigger.apply_review(review, at);
        Ok(trigger.clone())
    }
}
