pub mod alert_repo;
pub mod memory;

pub use alert_repo::PgAlertStore;
pub use memory::MemoryAlertStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::alerts::StatusChange;
use crate::models::{
    Alert, AlertFilter, AlertStatus, AlertTrigger, TriggerOutcome, TriggerReview,
};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(Uuid),

    #[error("alert {id} is {actual}, expected {expected}")]
    Conflict {
        id: Uuid,
        expected: AlertStatus,
        actual: AlertStatus,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.into())
    }
}

/// Durable home of alerts and their triggers.
///
/// Status writes are compare-and-set: `update_alert_status` and `fire_alert`
/// only apply when the stored status still equals `change.from`.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_alert(&self, alert: &Alert) -> Result<Uuid, StoreError>;

    async fn get_alert(&self, id: Uuid) -> Result<Alert, StoreError>;

    async fn update_alert_status(&self, id: Uuid, change: &StatusChange)
        -> Result<Alert, StoreError>;

    /// Status change plus trigger record, written together or not at all.
    async fn fire_alert(
        &self,
        id: Uuid,
        change: &StatusChange,
        trigger: &AlertTrigger,
    ) -> Result<Alert, StoreError>;

    /// Removes the alert and its triggers. Missing ids are not an error.
    async fn delete_alert(&self, id: Uuid) -> Result<(), StoreError>;

    /// Matching alerts, newest `created_at` first.
    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError>;

    async fn list_triggers(&self, alert_id: Uuid) -> Result<Vec<AlertTrigger>, StoreError>;

    /// Unsettled triggers whose evaluation window ended at or before `now`.
    async fn pending_triggers(&self, now: DateTime<Utc>) -> Result<Vec<AlertTrigger>, StoreError>;

    async fn record_trigger_outcome(
        &self,
        trigger_id: Uuid,
        outcome: TriggerOutcome,
        pnl_after_window: Decimal,
    ) -> Result<AlertTrigger, StoreError>;

    /// Acknowledge or dismiss a trigger of `alert_id`. A trigger that belongs
    /// to another alert is `NotFound`.
    async fn review_trigger(
        &self,
        alert_id: Uuid,
        trigger_id: Uuid,
        review: TriggerReview,
        at: DateTime<Utc>,
    ) -> Result<AlertTrigger, StoreError>;
}
