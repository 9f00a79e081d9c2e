use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AlertType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceAbove,
    PriceBelow,
    PercentChange,
    VolumeSpike,
    TechnicalIndicator,
    NewsEvent,
    Earnings,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PriceAbove => "price_above",
            AlertType::PriceBelow => "price_below",
            AlertType::PercentChange => "percent_change",
            AlertType::VolumeSpike => "volume_spike",
            AlertType::TechnicalIndicator => "technical_indicator",
            AlertType::NewsEvent => "news_event",
            AlertType::Earnings => "earnings",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "price_above" => Some(AlertType::PriceAbove),
            "price_below" => Some(AlertType::PriceBelow),
            "percent_change" => Some(AlertType::PercentChange),
            "volume_spike" => Some(AlertType::VolumeSpike),
            "technical_indicator" => Some(AlertType::TechnicalIndicator),
            "news_event" => Some(AlertType::NewsEvent),
            "earnings" => Some(AlertType::Earnings),
            _ => None,
        }
    }

    /// Price-threshold alerts carry a `target_value`.
    pub fn needs_target_value(&self) -> bool {
        matches!(self, AlertType::PriceAbove | AlertType::PriceBelow)
    }

    /// Percent-change alerts carry a `percentage_value`.
    pub fn needs_percentage_value(&self) -> bool {
        matches!(self, AlertType::PercentChange)
    }

    /// Direction a fired alert is scored against when its trigger is settled.
    pub fn bias(&self) -> Bias {
        match self {
            AlertType::PriceBelow => Bias::Bearish,
            _ => Bias::Bullish,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlertStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Triggered,
    Snoozed,
    Cancelled,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Triggered => "triggered",
            AlertStatus::Snoozed => "snoozed",
            AlertStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AlertStatus::Active),
            "triggered" => Some(AlertStatus::Triggered),
            "snoozed" => Some(AlertStatus::Snoozed),
            "cancelled" => Some(AlertStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Timeframe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "1hr")]
    OneHour,
    #[default]
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1min",
            Timeframe::FiveMinutes => "5min",
            Timeframe::FifteenMinutes => "15min",
            Timeframe::ThirtyMinutes => "30min",
            Timeframe::OneHour => "1hr",
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1min" => Some(Timeframe::OneMinute),
            "5min" => Some(Timeframe::FiveMinutes),
            "15min" => Some(Timeframe::FifteenMinutes),
            "30min" => Some(Timeframe::ThirtyMinutes),
            "1hr" => Some(Timeframe::OneHour),
            "daily" => Some(Timeframe::Daily),
            "weekly" => Some(Timeframe::Weekly),
            "monthly" => Some(Timeframe::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlertSource / Bias
// ---------------------------------------------------------------------------

/// Who proposed the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    #[default]
    User,
    Ai,
    Community,
}

impl AlertSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSource::User => "user",
            AlertSource::Ai => "ai",
            AlertSource::Community => "community",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(AlertSource::User),
            "ai" => Some(AlertSource::Ai),
            "community" => Some(AlertSource::Community),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
}

impl Bias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bias::Bullish => "bullish",
            Bias::Bearish => "bearish",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bullish" => Some(Bias::Bullish),
            "bearish" => Some(Bias::Bearish),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Alert — the stored record, also the JSON contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub symbol: String,
    pub alert_type: AlertType,
    pub status: AlertStatus,
    #[serde(default)]
    pub source: AlertSource,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_value: Option<Decimal>,
    #[serde(default)]
    pub percentage_value: Option<Decimal>,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
    #[serde(default)]
    pub snoozed_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Alert: id={} symbol={} type={} status={}",
            self.id, self.symbol, self.alert_type, self.status,
        )
    }
}

/// Caller input for alert creation. Validated by `alerts::lifecycle::build_alert`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub symbol: String,
    pub alert_type: Option<AlertType>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_value: Option<Decimal>,
    #[serde(default)]
    pub percentage_value: Option<Decimal>,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
    #[serde(default)]
    pub source: Option<AlertSource>,
}

/// Query filter handed to the store; `None` fields are unconstrained.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub symbol: Option<String>,
}

impl AlertFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: AlertStatus) -> Self {
        Self {
            status: Some(status),
            symbol: None,
        }
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.status.map_or(true, |s| alert.status == s)
            && self
                .symbol
                .as_deref()
                .map_or(true, |sym| alert.symbol.eq_ignore_ascii_case(sym))
    }
}
