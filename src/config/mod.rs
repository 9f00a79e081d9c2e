use std::env;

const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string; alerts live in memory when unset.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,

    // Alerts
    pub store_timeout_ms: u64,
    pub snooze_default_hours: i64,
    pub trigger_evaluation_window_minutes: i32,

    // Monitor
    pub monitor_enabled: bool,
    pub monitor_interval_secs: u64,
    pub snapshots_path: Option<String>,

    // Notifications
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub notifications_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".into(),
            port: 8080,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            snooze_default_hours: 24,
            trigger_evaluation_window_minutes: 60,
            monitor_enabled: false,
            monitor_interval_secs: 60,
            snapshots_path: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            notifications_enabled: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            store_timeout_ms: env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.store_timeout_ms),
            snooze_default_hours: env::var("SNOOZE_DEFAULT_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.snooze_default_hours),
            trigger_evaluation_window_minutes: env::var("TRIGGER_EVALUATION_WINDOW_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.trigger_evaluation_window_minutes),

            monitor_enabled: env::var("MONITOR_ENABLED")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            monitor_interval_secs: env::var("MONITOR_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.monitor_interval_secs),
            snapshots_path: env::var("SNAPSHOTS_PATH").ok().filter(|s| !s.is_empty()),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            notifications_enabled: env::var("NOTIFICATIONS_ENABLED")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
        })
    }

    /// Returns true if Telegram delivery is configured and switched on.
    pub fn has_telegram(&self) -> bool {
        self.notifications_enabled
            && self.telegram_bot_token.is_some()
            && self.telegram_chat_id.is_some()
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.store_timeout_ms)
    }
}
