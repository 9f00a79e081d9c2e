pub mod alerts;
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod screener;
pub mod services;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::alerts::AlertManager;
use crate::api::ws_types::WsMessage;
use crate::config::AppConfig;
use crate::services::snapshot_source::SnapshotSource;

#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<AlertManager>,
    pub snapshots: Arc<dyn SnapshotSource>,
    pub config: AppConfig,
    pub ws_tx: broadcast::Sender<WsMessage>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
