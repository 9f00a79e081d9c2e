use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use tickerwatch::alerts::AlertManager;
use tickerwatch::api::router::create_router;
use tickerwatch::api::ws_types::WsMessage;
use tickerwatch::config::AppConfig;
use tickerwatch::db::{AlertStore, MemoryAlertStore};
use tickerwatch::models::{
    AlertType, AnalystAction, EarningsResult, GuidanceChange, NewAlert, RevenueGrowth,
    StockMetricSnapshot,
};
use tickerwatch::services::snapshot_source::StaticSnapshotSource;
use tickerwatch::AppState;

/// Connect to the test database and run all migrations. Returns `None` when
/// TEST_DATABASE_URL is unset so Postgres-backed tests can bow out.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Rows persist between tests; assert only on ids a test created.
    Some(pool)
}

/// Manager over a fresh in-memory store with a generous timeout.
#[allow(dead_code)]
pub fn memory_manager() -> AlertManager {
    let store: Arc<dyn AlertStore> = Arc::new(MemoryAlertStore::new());
    AlertManager::new(store, Duration::from_secs(5))
}

/// Full router over an in-memory store and the fixture snapshots.
#[allow(dead_code)]
pub fn build_test_app() -> (axum::Router, Arc<AlertManager>) {
    let (ws_tx, _) = tokio::sync::broadcast::channel::<WsMessage>(16);
    let metrics_handle = tickerwatch::metrics::init_metrics();
    let alerts = Arc::new(memory_manager());

    let config = AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..AppConfig::default()
    };

    let state = AppState {
        alerts: alerts.clone(),
        snapshots: Arc::new(StaticSnapshotSource::new(snapshots())),
        config,
        ws_tx,
        metrics_handle,
    };

    (create_router(state), alerts)
}

#[allow(dead_code)]
pub fn price_above(symbol: &str, target: i64) -> NewAlert {
    NewAlert {
        symbol: symbol.into(),
        alert_type: Some(AlertType::PriceAbove),
        title: format!("{symbol} above ${target}"),
        target_value: Some(Decimal::from(target)),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn price_below(symbol: &str, target: i64) -> NewAlert {
    NewAlert {
        symbol: symbol.into(),
        alert_type: Some(AlertType::PriceBelow),
        title: format!("{symbol} below ${target}"),
        target_value: Some(Decimal::from(target)),
        ..Default::default()
    }
}

#[allow(clippy::too_many_arguments)]
fn snapshot(
    symbol: &str,
    name: &str,
    price: f64,
    change_percent: f64,
    cap: f64,
    ratio: f64,
    ath: f64,
    guidance: Option<GuidanceChange>,
    analyst: Option<AnalystAction>,
    earnings: Option<EarningsResult>,
    ma: (f64, f64, f64),
) -> StockMetricSnapshot {
    StockMetricSnapshot {
        symbol: symbol.into(),
        name: name.into(),
        price,
        change: price * change_percent / 100.0,
        change_percent,
        market_cap_billions: cap,
        volume: (ratio * 10_000_000.0) as u64,
        avg_volume_30d: 10_000_000,
        volume_ratio: ratio,
        guidance_change: guidance,
        revenue_growth: RevenueGrowth::Increasing,
        recent_analyst_action: analyst,
        earnings_result: earnings,
        ath_distance_percent: ath,
        ma20: ma.0,
        ma50: ma.1,
        ma200: ma.2,
    }
}

/// Five-symbol universe used across the screener and monitor tests.
#[allow(dead_code)]
pub fn snapshots() -> Vec<StockMetricSnapshot> {
    vec![
        snapshot(
            "NVDA", "NVIDIA Corporation", 875.28, 2.4, 2150.0, 2.1, -5.0,
            Some(GuidanceChange::Raised), Some(AnalystAction::Upgrade), Some(EarningsResult::Beat),
            (860.0, 820.0, 640.0),
        ),
        snapshot(
            "AMD", "Advanced Micro Devices", 178.6, -1.2, 290.0, 1.8, -22.0,
            None, Some(AnalystAction::Upgrade), Some(EarningsResult::Beat),
            (172.0, 168.0, 150.0),
        ),
        snapshot(
            "TSLA", "Tesla, Inc.", 182.5, -3.1, 580.0, 1.2, -54.0,
            Some(GuidanceChange::Lowered), Some(AnalystAction::Downgrade), Some(EarningsResult::Miss),
            (175.0, 190.0, 210.0),
        ),
        snapshot(
            "GOOGL", "Alphabet Inc.", 152.3, 0.6, 1900.0, 0.9, -8.0,
            None, None, Some(EarningsResult::Beat),
            (150.0, 145.0, 138.0),
        ),
        snapshot(
            "META", "Meta Platforms, Inc.", 505.0, 1.1, 1290.0, 1.1, -2.0,
            Some(GuidanceChange::Raised), None, None,
            (498.0, 480.0, 400.0),
        ),
    ]
}
