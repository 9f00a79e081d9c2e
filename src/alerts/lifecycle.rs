use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::AlertError;
use crate::models::{Alert, AlertStatus, AlertType, NewAlert};

/// The write half of a status transition, applied by the store as one
/// compare-and-set against the status it was planned from.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub from: AlertStatus,
    pub to: AlertStatus,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub triggered_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    /// Apply the change to an in-memory copy of the alert.
    pub fn apply(&self, alert: &mut Alert) {
        alert.status = self.to;
        alert.snoozed_until = self.snoozed_until;
        alert.triggered_at = self.triggered_at;
    }
}

/// Allowed edges of the status machine.
///
/// `triggered -> triggered` is accepted as a no-op so repeated firings keep the
/// first `triggered_at`; `triggered -> active` re-arms a fired alert.
pub fn is_allowed(from: AlertStatus, to: AlertStatus) -> bool {
    use AlertStatus::*;

    matches!(
        (from, to),
        (Active, Triggered)
            | (Active, Snoozed)
            | (Active, Cancelled)
            | (Snoozed, Active)
            | (Snoozed, Cancelled)
            | (Triggered, Triggered)
            | (Triggered, Active)
            | (Triggered, Cancelled)
    )
}

/// Validate a transition of `alert` to `to` and compute the resulting fields.
pub fn plan_transition(
    alert: &Alert,
    to: AlertStatus,
    snooze_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<StatusChange, AlertError> {
    let from = alert.status;
    if !is_allowed(from, to) {
        return Err(AlertError::InvalidTransition { from, to });
    }

    let snoozed_until = if to == AlertStatus::Snoozed {
        let until = snooze_until
            .ok_or_else(|| AlertError::validation("snoozeUntil is required when snoozing"))?;
        if until <= now {
            return Err(AlertError::validation(format!(
                "snoozeUntil must be in the future (got {until})"
            )));
        }
        Some(until)
    } else {
        None
    };

    let triggered_at = match to {
        AlertStatus::Triggered => Some(alert.triggered_at.unwrap_or(now)),
        _ => alert.triggered_at,
    };

    Ok(StatusChange {
        from,
        to,
        snoozed_until,
        triggered_at,
    })
}

/// Validate creation input and build the record to insert.
pub fn build_alert(input: NewAlert, now: DateTime<Utc>) -> Result<Alert, AlertError> {
    let symbol = input.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AlertError::validation("symbol is required"));
    }

    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(AlertError::validation("title is required"));
    }

    let alert_type = input
        .alert_type
        .ok_or_else(|| AlertError::validation("alertType is required"))?;

    match (alert_type.needs_target_value(), input.target_value) {
        (true, None) => {
            return Err(AlertError::validation(format!(
                "targetValue is required for {alert_type} alerts"
            )))
        }
        (false, Some(_)) => {
            return Err(AlertError::validation(format!(
                "targetValue is only allowed for price_above/price_below alerts, not {alert_type}"
            )))
        }
        _ => {}
    }

    match (alert_type.needs_percentage_value(), input.percentage_value) {
        (true, None) => {
            return Err(AlertError::validation(
                "percentageValue is required for percent_change alerts",
            ))
        }
        (false, Some(_)) => {
            return Err(AlertError::validation(format!(
                "percentageValue is only allowed for percent_change alerts, not {alert_type}"
            )))
        }
        _ => {}
    }

    Ok(Alert {
        id: Uuid::new_v4(),
        symbol,
        alert_type,
        status: AlertStatus::Active,
        source: input.source.unwrap_or_default(),
        title,
        description: input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        target_value: input.target_value,
        percentage_value: input.percentage_value,
        timeframe: input.timeframe.unwrap_or_default(),
        conditions: input.conditions,
        snoozed_until: None,
        triggered_at: None,
        created_at: now,
    })
}

/// Default title offered by the alert form for a symbol/type pair.
pub fn suggest_title(
    symbol: &str,
    alert_type: AlertType,
    target_value: Option<Decimal>,
    percentage_value: Option<Decimal>,
) -> String {
    let symbol = symbol.trim().to_uppercase();
    let detail = match alert_type {
        AlertType::PriceAbove => target_value
            .map(|v| format!("above ${v}"))
            .unwrap_or_else(|| "price alert".into()),
        AlertType::PriceBelow => target_value
            .map(|v| format!("below ${v}"))
            .unwrap_or_else(|| "price alert".into()),
        AlertType::PercentChange => percentage_value
            .map(|v| format!("{v}% change"))
            .unwrap_or_else(|| "percentage change".into()),
        AlertType::VolumeSpike => "unusual volume".into(),
        AlertType::TechnicalIndicator => "technical signal".into(),
        AlertType::NewsEvent => "news alert".into(),
        AlertType::Earnings => "earnings announcement".into(),
    };

    format!("{symbol} {detail}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
