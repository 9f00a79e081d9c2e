mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use tickerwatch::alerts::{AlertManager, StatusChange};
use tickerwatch::db::{AlertStore, MemoryAlertStore, StoreError};
use tickerwatch::models::{
    Alert, AlertFilter, AlertStatus, AlertTrigger, AlertType, Bias, NewAlert,
    StockMetricSnapshot, TriggerOutcome, TriggerReview,
};
use tickerwatch::services::alert_monitor::{run_tick, TickSummary};
use tickerwatch::services::snapshot_source::{SnapshotSource, StaticSnapshotSource};

use common::{memory_manager, price_above, price_below, snapshots};

struct OfflineSource;

#[async_trait]
impl SnapshotSource for OfflineSource {
    async fn fetch_snapshots(&self) -> anyhow::Result<Vec<StockMetricSnapshot>> {
        anyhow::bail!("feed offline")
    }
}

/// Memory store whose pending list also reports a trigger that no longer
/// exists, as when its alert is deleted mid-tick.
#[derive(Default)]
struct VanishingTriggerStore {
    inner: MemoryAlertStore,
}

fn ghost_trigger() -> AlertTrigger {
    AlertTrigger {
        id: Uuid::new_v4(),
        alert_id: Uuid::new_v4(),
        ticker: "NVDA".into(),
        price: Decimal::from(800),
        bias: Bias::Bullish,
        evaluation_window_minutes: 60,
        triggered_at: Utc::now() - Duration::hours(2),
        outcome: None,
        pnl_after_window: None,
        dismissed: false,
        acknowledged_at: None,
        delivered_channels: vec![],
    }
}

#[async_trait]
impl AlertStore for VanishingTriggerStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<Uuid, StoreError> {
        self.inner.insert_alert(alert).await
    }

    async fn get_alert(&self, id: Uuid) -> Result<Alert, StoreError> {
        self.inner.get_alert(id).await
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<Alert, StoreError> {
        self.inner.update_alert_status(id, change).await
    }

    async fn fire_alert(
        &self,
        id: Uuid,
        change: &StatusChange,
        trigger: &AlertTrigger,
    ) -> Result<Alert, StoreError> {
        self.inner.fire_alert(id, change, trigger).await
    }

    async fn delete_alert(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete_alert(id).await
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
        self.inner.list_alerts(filter).await
    }

    async fn list_triggers(&self, alert_id: Uuid) -> Result<Vec<AlertTrigger>, StoreError> {
        self.inner.list_triggers(alert_id).await
    }

    async fn pending_triggers(&self, now: DateTime<Utc>) -> Result<Vec<AlertTrigger>, StoreError> {
        let mut pending = vec![ghost_trigger()];
        pending.extend(self.inner.pending_triggers(now).await?);
        Ok(pending)
    }

    async fn record_trigger_outcome(
        &self,
        trigger_id: Uuid,
        outcome: TriggerOutcome,
        pnl_after_window: Decimal,
    ) -> Result<AlertTrigger, StoreError> {
        self.inner
            .record_trigger_outcome(trigger_id, outcome, pnl_after_window)
            .await
    }

    async fn review_trigger(
        &self,
        alert_id: Uuid,
        trigger_id: Uuid,
        review: TriggerReview,
        at: DateTime<Utc>,
    ) -> Result<AlertTrigger, StoreError> {
        self.inner.review_trigger(alert_id, trigger_id, review, at).await
    }
}

async fn status(manager: &AlertManager, id: Uuid) -> AlertStatus {
    manager.get_alert(id).await.unwrap().status
}

async fn outcome(manager: &AlertManager, id: Uuid) -> Option<TriggerOutcome> {
    manager.triggers(id).await.unwrap()[0].outcome
}

fn repriced(changes: &[(&str, f64)]) -> StaticSnapshotSource {
    let mut snaps = snapshots();
    for snap in &mut snaps {
        if let Some((_, price)) = changes.iter().find(|(sym, _)| *sym == snap.symbol) {
            snap.price = *price;
        }
    }
    StaticSnapshotSource::new(snaps)
}

#[tokio::test]
async fn test_tick_fires_wakes_and_settles() {
    let manager = memory_manager();
    let start = Utc::now();

    let nvda = manager.create_alert(price_above("NVDA", 850)).await.unwrap();
    let tsla = manager.create_alert(price_below("TSLA", 150)).await.unwrap();
    let amd = manager
        .create_alert(NewAlert {
            symbol: "AMD".into(),
            alert_type: Some(AlertType::PercentChange),
            title: "AMD 1% move".into(),
            percentage_value: Some(Decimal::ONE),
            ..Default::default()
        })
        .await
        .unwrap();
    let meta = manager
        .create_alert(NewAlert {
            symbol: "META".into(),
            alert_type: Some(AlertType::VolumeSpike),
            title: "META unusual volume".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let googl = manager.create_alert(price_above("GOOGL", 100)).await.unwrap();
    manager
        .update_status(googl.id, AlertStatus::Snoozed, Some(start + Duration::minutes(10)))
        .await
        .unwrap();

    // First pass: the snooze has run out and every met condition fires.
    let first = StaticSnapshotSource::new(snapshots());
    let summary = run_tick(&manager, &first, start + Duration::minutes(20))
        .await
        .unwrap();
    assert_eq!(
        summary,
        TickSummary {
            reactivated: 1,
            fired: 3,
            settled: 0,
        }
    );

    assert_eq!(status(&manager, nvda.id).await, AlertStatus::Triggered);
    assert_eq!(status(&manager, amd.id).await, AlertStatus::Triggered);
    assert_eq!(status(&manager, googl.id).await, AlertStatus::Triggered);
    assert_eq!(status(&manager, tsla.id).await, AlertStatus::Active);
    assert_eq!(status(&manager, meta.id).await, AlertStatus::Active);

    // Second pass: windows have elapsed, triggers are scored on new prices.
    let later = repriced(&[("NVDA", 900.0), ("AMD", 170.0), ("GOOGL", 152.3)]);
    let summary = run_tick(&manager, &later, start + Duration::hours(2)).await.unwrap();
    assert_eq!(summary.fired, 0);
    assert_eq!(summary.settled, 3);

    assert_eq!(outcome(&manager, nvda.id).await, Some(TriggerOutcome::Win));
    assert_eq!(outcome(&manager, amd.id).await, Some(TriggerOutcome::Loss));
    assert_eq!(outcome(&manager, googl.id).await, Some(TriggerOutcome::Flat));

    // Nothing left to do.
    let summary = run_tick(&manager, &later, start + Duration::hours(3)).await.unwrap();
    assert_eq!(summary, TickSummary::default());
}

#[tokio::test]
async fn test_unmatched_symbols_are_left_alone() {
    let manager = memory_manager();
    let alert = manager.create_alert(price_above("IBM", 1)).await.unwrap();

    let summary = run_tick(&manager, &StaticSnapshotSource::new(snapshots()), Utc::now())
        .await
        .unwrap();

    assert_eq!(summary.fired, 0);
    assert_eq!(
        manager.get_alert(alert.id).await.unwrap().status,
        AlertStatus::Active
    );
}

#[tokio::test]
async fn test_source_failure_still_wakes_snoozed_alerts() {
    let manager = memory_manager();
    let now = Utc::now();
    let alert = manager.create_alert(price_above("AAPL", 200)).await.unwrap();
    manager
        .update_status(alert.id, AlertStatus::Snoozed, Some(now + Duration::minutes(5)))
        .await
        .unwrap();

    let result = run_tick(&manager, &OfflineSource, now + Duration::minutes(6)).await;

    assert!(result.is_err());
    assert_eq!(
        manager.get_alert(alert.id).await.unwrap().status,
        AlertStatus::Active
    );
}

#[tokio::test]
async fn test_vanished_trigger_does_not_stop_settlement() {
    let store = Arc::new(VanishingTriggerStore::default());
    let manager = AlertManager::new(store, std::time::Duration::from_secs(5));
    let start = Utc::now();
    let nvda = manager.create_alert(price_above("NVDA", 850)).await.unwrap();

    let source = StaticSnapshotSource::new(snapshots());
    run_tick(&manager, &source, start).await.unwrap();
    assert_eq!(status(&manager, nvda.id).await, AlertStatus::Triggered);

    let later = repriced(&[("NVDA", 900.0)]);
    let summary = run_tick(&manager, &later, start + Duration::hours(2))
        .await
        .unwrap();

    assert_eq!(summary.settled, 1);
    assert_eq!(outcome(&manager, nvda.id).await, Some(TriggerOutcome::Win));
}
