use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::{AlertStore, StoreError};
use crate::alerts::StatusChange;
use crate::models::{
    Alert, AlertFilter, AlertSource, AlertStatus, AlertTrigger, AlertType, Bias, Timeframe,
    TriggerOutcome, TriggerReview,
};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Database row for the alerts table. Enum columns are stored as TEXT.
#[derive(Debug, Clone, FromRow)]
struct AlertRow {
    id: Uuid,
    symbol: String,
    alert_type: String,
    status: String,
    source: String,
    title: String,
    description: Option<String>,
    target_value: Option<Decimal>,
    percentage_value: Option<Decimal>,
    timeframe: String,
    conditions: Option<serde_json::Value>,
    snoozed_until: Option<DateTime<Utc>>,
    triggered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: row.id,
            symbol: row.symbol,
            alert_type: AlertType::from_str(&row.alert_type)
                .ok_or_else(|| anyhow!("unknown alert_type {:?}", row.alert_type))?,
            status: AlertStatus::from_str(&row.status)
                .ok_or_else(|| anyhow!("unknown status {:?}", row.status))?,
            source: AlertSource::from_str(&row.source).unwrap_or_default(),
            title: row.title,
            description: row.description,
            target_value: row.target_value,
            percentage_value: row.percentage_value,
            timeframe: Timeframe::from_str(&row.timeframe).unwrap_or_default(),
            conditions: row.conditions,
            snoozed_until: row.snoozed_until,
            triggered_at: row.triggered_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct TriggerRow {
    id: Uuid,
    alert_id: Uuid,
    ticker: String,
    price: Decimal,
    bias: String,
    evaluation_window_minutes: i32,
    triggered_at: DateTime<Utc>,
    outcome: Option<String>,
    pnl_after_window: Option<Decimal>,
    dismissed: bool,
    acknowledged_at: Option<DateTime<Utc>>,
    delivered_channels: Vec<String>,
}

impl From<TriggerRow> for AlertTrigger {
    fn from(row: TriggerRow) -> Self {
        AlertTrigger {
            id: row.id,
            alert_id: row.alert_id,
            ticker: row.ticker,
            price: row.price,
            bias: Bias::from_str(&row.bias).unwrap_or(Bias::Bullish),
            evaluation_window_minutes: row.evaluation_window_minutes,
            triggered_at: row.triggered_at,
            outcome: row.outcome.as_deref().and_then(TriggerOutcome::from_str),
            pnl_after_window: row.pnl_after_window,
            dismissed: row.dismissed,
            acknowledged_at: row.acknowledged_at,
            delivered_channels: row.delivered_channels,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Conditional status write; on a miss, tells a vanished row from a lost race.
async fn compare_and_set(
    conn: &mut PgConnection,
    id: Uuid,
    change: &StatusChange,
) -> Result<Alert, StoreError> {
    let updated = sqlx::query_as::<_, AlertRow>(
        r#"
        UPDATE alerts
        SET status = $3, snoozed_until = $4, triggered_at = $5
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(change.from.as_str())
    .bind(change.to.as_str())
    .bind(change.snoozed_until)
    .bind(change.triggered_at)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = updated {
        return row.try_into();
    }

    let current: Option<(String,)> = sqlx::query_as("SELECT status FROM alerts WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match current {
        None => Err(StoreError::NotFound(id)),
        Some((status,)) => Err(StoreError::Conflict {
            id,
            expected: change.from,
            actual: AlertStatus::from_str(&status)
                .ok_or_else(|| anyhow!("unknown status {status:?}"))?,
        }),
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<Uuid, StoreError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO alerts (id, symbol, alert_type, status, source, title, description,
                                target_value, percentage_value, timeframe, conditions,
                                snoozed_until, triggered_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(alert.id)
        .bind(&alert.symbol)
        .bind(alert.alert_type.as_str())
        .bind(alert.status.as_str())
        .bind(alert.source.as_str())
        .bind(&alert.title)
        .bind(&alert.description)
        .bind(alert.target_value)
        .bind(alert.percentage_value)
        .bind(alert.timeframe.as_str())
        .bind(&alert.conditions)
        .bind(alert.snoozed_until)
        .bind(alert.triggered_at)
        .bind(alert.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn get_alert(&self, id: Uuid) -> Result<Alert, StoreError> {
        let row = sqlx::query_as::<_, AlertRow>("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        row.try_into()
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<Alert, StoreError> {
        let mut conn = self.pool.acquire().await?;
        compare_and_set(&mut conn, id, change).await
    }

    async fn fire_alert(
        &self,
        id: Uuid,
        change: &StatusChange,
        trigger: &AlertTrigger,
    ) -> Result<Alert, StoreError> {
        let mut tx = self.pool.begin().await?;

        let alert = compare_and_set(&mut tx, id, change).await?;

        sqlx::query(
            r#"
            INSERT INTO alert_triggers (id, alert_id, ticker, price, bias,
                                        evaluation_window_minutes, triggered_at,
                                        dismissed, delivered_channels)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(trigger.id)
        .bind(trigger.alert_id)
        .bind(&trigger.ticker)
        .bind(trigger.price)
        .bind(trigger.bias.as_str())
        .bind(trigger.evaluation_window_minutes)
        .bind(trigger.triggered_at)
        .bind(trigger.dismissed)
        .bind(&trigger.delivered_channels)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(alert)
    }

    async fn delete_alert(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM alerts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT * FROM alerts
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR symbol = UPPER($2))
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.symbol.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Alert::try_from).collect()
    }

    async fn list_triggers(&self, alert_id: Uuid) -> Result<Vec<AlertTrigger>, StoreError> {
        let rows = sqlx::query_as::<_, TriggerRow>(
            "SELECT * FROM alert_triggers WHERE alert_id = $1 ORDER BY triggered_at DESC",
        )
        .bind(alert_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AlertTrigger::from).collect())
    }

    async fn pending_triggers(&self, now: DateTime<Utc>) -> Result<Vec<AlertTrigger>, StoreError> {
        let rows = sqlx::query_as::<_, TriggerRow>(
            r#"
            SELECT * FROM alert_triggers
            WHERE outcome IS NULL
              AND triggered_at + make_interval(mins => evaluation_window_minutes) <= $1
            ORDER BY triggered_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AlertTrigger::from).collect())
    }

    async fn record_trigger_outcome(
        &self,
        trigger_id: Uuid,
        outcome: TriggerOutcome,
        pnl_after_window: Decimal,
    ) -> Result<AlertTrigger, StoreError> {
        let row = sqlx::query_as::<_, TriggerRow>(
            r#"
            UPDATE alert_triggers
            SET outcome = $2, pnl_after_window = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(trigger_id)
        .bind(outcome.as_str())
        .bind(pnl_after_window)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(trigger_id))?;

        Ok(row.into())
    }

    async fn review_trigger(
        &self,
        alert_id: Uuid,
        trigger_id: Uuid,
        review: TriggerReview,
        at: DateTime<Utc>,
    ) -> Result<AlertTrigger, StoreError> {
        let row = sqlx::query_as::<_, TriggerRow>(
            r#"
            UPDATE alert_triggers
            SET acknowledged_at = COALESCE(acknowledged_at, $3),
                dismissed = dismissed OR $4
            WHERE id = $1 AND alert_id = $2
            RETURNING *
            "#,
        )
        .bind(trigger_id)
        .bind(alert_id)
        .bind(at)
        .bind(review == TriggerReview::Dismiss)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(trigger_id))?;

        Ok(row.into())
    }
}
