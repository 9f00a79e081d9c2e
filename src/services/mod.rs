pub mod alert_monitor;
pub mod notifier;
pub mod snapshot_source;
