use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{interval, Duration};

use crate::alerts::evaluate::{condition_met, price_of};
use crate::alerts::AlertManager;
use crate::errors::AlertError;
use crate::models::StockMetricSnapshot;
use crate::services::snapshot_source::SnapshotSource;

/// Counts from one monitor pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub reactivated: usize,
    pub fired: usize,
    pub settled: usize,
}

/// Run the alert monitor loop. Each tick wakes expired snoozes, fires active
/// alerts whose condition holds in the latest snapshots, and settles triggers
/// whose evaluation window has elapsed.
pub async fn run_alert_monitor(
    manager: Arc<AlertManager>,
    source: Arc<dyn SnapshotSource>,
    interval_secs: u64,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs));

    loop {
        ticker.tick().await;

        match run_tick(&manager, source.as_ref(), Utc::now()).await {
            Ok(summary) if summary != TickSummary::default() => {
                tracing::info!(
                    reactivated = summary.reactivated,
                    fired = summary.fired,
                    settled = summary.settled,
                    "Alert monitor tick"
                );
            }
            Ok(_) => tracing::debug!("Alert monitor: nothing to do"),
            Err(e) => tracing::error!(error = %e, "Alert monitor tick failed"),
        }
    }
}

pub async fn run_tick(
    manager: &AlertManager,
    source: &dyn SnapshotSource,
    now: DateTime<Utc>,
) -> anyhow::Result<TickSummary> {
    let mut summary = TickSummary {
        reactivated: manager.reactivate_expired(now).await?.len(),
        ..Default::default()
    };

    let snapshots = source.fetch_snapshots().await?;
    let by_symbol: HashMap<String, &StockMetricSnapshot> = snapshots
        .iter()
        .map(|s| (s.symbol.to_uppercase(), s))
        .collect();

    for alert in manager.list_active().await? {
        let Some(snapshot) = by_symbol.get(&alert.symbol) else {
            continue;
        };
        if !condition_met(&alert, snapshot) {
            continue;
        }
        let Some(price) = price_of(snapshot) else {
            tracing::warn!(symbol = %alert.symbol, "Snapshot price unusable, skipping alert");
            continue;
        };

        match manager.fire(alert.id, price).await {
            Ok(_) => summary.fired += 1,
            // Cancelled, snoozed or deleted between listing and firing.
            Err(AlertError::Conflict { .. })
            | Err(AlertError::InvalidTransition { .. })
            | Err(AlertError::NotFound(_)) => {
                tracing::debug!(alert_id = %alert.id, "Alert changed before it could fire");
            }
            Err(e) => return Err(e.into()),
        }
    }

    for trigger in manager.pending_triggers(now).await? {
        let Some(price_after) = by_symbol
            .get(&trigger.ticker.to_uppercase())
            .and_then(|s| price_of(s))
        else {
            tracing::debug!(ticker = %trigger.ticker, "No snapshot to settle trigger yet");
            continue;
        };

        match manager.settle_trigger(&trigger, price_after).await {
            Ok(_) => summary.settled += 1,
            // Alert deleted since listing; the trigger went with it.
            Err(AlertError::TriggerNotFound(_)) => {
                tracing::debug!(trigger_id = %trigger.id, "Trigger removed before settlement");
            }
            Err(AlertError::Validation(reason)) => {
                tracing::warn!(trigger_id = %trigger.id, %reason, "Trigger cannot be scored");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}
