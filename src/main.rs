use std::sync::Arc;

use tokio::sync::broadcast;

use tickerwatch::alerts::AlertManager;
use tickerwatch::api::router::create_router;
use tickerwatch::api::ws_types::{DashboardSink, WsMessage};
use tickerwatch::config::AppConfig;
use tickerwatch::db::{self, AlertStore, MemoryAlertStore, PgAlertStore};
use tickerwatch::services::alert_monitor::run_alert_monitor;
use tickerwatch::services::notifier::Notifier;
use tickerwatch::services::snapshot_source::{
    FileSnapshotSource, SnapshotSource, StaticSnapshotSource,
};
use tickerwatch::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = tickerwatch::metrics::init_metrics();

    // --- Alert store ---
    let store: Arc<dyn AlertStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            tracing::info!("Database connected");
            Arc::new(PgAlertStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set — alerts are kept in memory and lost on restart");
            Arc::new(MemoryAlertStore::new())
        }
    };

    // --- Notification fan-out ---
    let (ws_tx, _) = broadcast::channel::<WsMessage>(256);

    let mut manager = AlertManager::new(store, config.store_timeout())
        .with_evaluation_window(config.trigger_evaluation_window_minutes)
        .with_sink(Arc::new(DashboardSink::new(ws_tx.clone())));

    if let (true, Some(token), Some(chat_id)) = (
        config.has_telegram(),
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    ) {
        manager = manager.with_sink(Arc::new(Notifier::new(token, chat_id)));
        tracing::info!("Telegram notifications enabled");
    }
    let alerts = Arc::new(manager);

    // --- Snapshot source ---
    let snapshots: Arc<dyn SnapshotSource> = match &config.snapshots_path {
        Some(path) => {
            tracing::info!(path = %path, "Reading metric snapshots from file");
            Arc::new(FileSnapshotSource::new(path))
        }
        None => {
            tracing::warn!("SNAPSHOTS_PATH not set — screener and monitor see no snapshots");
            Arc::new(StaticSnapshotSource::default())
        }
    };

    // --- Alert monitor ---
    if config.monitor_enabled {
        let monitor_alerts = alerts.clone();
        let monitor_source = snapshots.clone();
        let interval_secs = config.monitor_interval_secs;
        tokio::spawn(async move {
            run_alert_monitor(monitor_alerts, monitor_source, interval_secs).await;
        });
        tracing::info!(interval_secs, "Alert monitor spawned");
    } else {
        tracing::info!("Alert monitor disabled (MONITOR_ENABLED=false)");
    }

    let state = AppState {
        alerts,
        snapshots,
        config,
        ws_tx,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
