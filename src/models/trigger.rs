use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::Bias;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    Win,
    Loss,
    Flat,
}

impl TriggerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerOutcome::Win => "win",
            TriggerOutcome::Loss => "loss",
            TriggerOutcome::Flat => "flat",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "win" => Some(TriggerOutcome::Win),
            "loss" => Some(TriggerOutcome::Loss),
            "flat" => Some(TriggerOutcome::Flat),
            _ => None,
        }
    }
}

/// What a user did with a trigger in their feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReview {
    Acknowledge,
    Dismiss,
}

impl TriggerReview {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReview::Acknowledge => "acknowledge",
            TriggerReview::Dismiss => "dismiss",
        }
    }
}

/// One firing of an alert, settled once its evaluation window has elapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTrigger {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub ticker: String,
    pub price: Decimal,
    pub bias: Bias,
    pub evaluation_window_minutes: i32,
    pub triggered_at: DateTime<Utc>,
    pub outcome: Option<TriggerOutcome>,
    /// Percentage move in the alert's direction after the window.
    pub pnl_after_window: Option<Decimal>,
    #[serde(default)]
    pub dismissed: bool,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_channels: Vec<String>,
}

impl AlertTrigger {
    pub fn window_ends_at(&self) -> DateTime<Utc> {
        self.triggered_at + Duration::minutes(i64::from(self.evaluation_window_minutes))
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    /// Unsettled and past its evaluation window.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_settled() && self.window_ends_at() <= now
    }

    /// Record a review at `at`. Reviews never clear an earlier acknowledgement
    /// or dismissal.
    pub fn apply_review(&mut self, review: TriggerReview, at: DateTime<Utc>) {
        self.acknowledged_at.get_or_insert(at);
        if review == TriggerReview::Dismiss {
            self.dismissed = true;
        }
    }
}

/// Aggregate over settled triggers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerStats {
    pub total: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_rate: Decimal,
    pub avg_return: Decimal,
}

impl TriggerStats {
    pub fn from_triggers(triggers: &[AlertTrigger]) -> Self {
        let settled: Vec<&AlertTrigger> = triggers.iter().filter(|t| t.is_settled()).collect();
        let total = settled.len() as i64;
        let wins = settled
            .iter()
            .filter(|t| t.outcome == Some(TriggerOutcome::Win))
            .count() as i64;
        let losses = settled
            .iter()
            .filter(|t| t.outcome == Some(TriggerOutcome::Loss))
            .count() as i64;
        let sum: Decimal = settled.iter().filter_map(|t| t.pnl_after_window).sum();

        let (win_rate, avg_return) = if total > 0 {
            (
                Decimal::from(wins) / Decimal::from(total),
                sum / Decimal::from(total),
            )
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        Self {
            total,
            wins,
            losses,
            win_rate,
            avg_return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(outcome: Option<TriggerOutcome>, pnl: Option<i64>) -> AlertTrigger {
        AlertTrigger {
            id: Uuid::new_v4(),
            alert_id: Uuid::new_v4(),
            ticker: "NVDA".into(),
            price: Decimal::from(100),
            bias: Bias::Bullish,
            evaluation_window_minutes: 60,
            triggered_at: Utc::now(),
            outcome,
            pnl_after_window: pnl.map(Decimal::from),
            dismissed: false,
            acknowledged_at: None,
            delivered_channels: vec![],
        }
    }

    #[test]
    fn test_stats_ignore_unsettled() {
        let stats = TriggerStats::from_triggers(&[
            trigger(Some(TriggerOutcome::Win), Some(6)),
            trigger(Some(TriggerOutcome::Loss), Some(-2)),
            trigger(Some(TriggerOutcome::Win), Some(2)),
            trigger(Some(TriggerOutcome::Flat), Some(0)),
            trigger(None, None),
        ]);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.win_rate, Decimal::new(5, 1));
        assert_eq!(stats.avg_return, Decimal::new(15, 1));
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let stats = TriggerStats::from_triggers(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.win_rate, Decimal::ZERO);
    }

    #[test]
    fn test_review_keeps_first_acknowledgement() {
        let mut t = trigger(None, None);
        let first = t.triggered_at + Duration::minutes(1);

        t.apply_review(TriggerReview::Acknowledge, first);
        assert_eq!(t.acknowledged_at, Some(first));
        assert!(!t.dismissed);

        t.apply_review(TriggerReview::Dismiss, first + Duration::minutes(5));
        assert_eq!(t.acknowledged_at, Some(first));
        assert!(t.dismissed);

        t.apply_review(TriggerReview::Acknowledge, first + Duration::minutes(9));
        assert!(t.dismissed);
    }

    #[test]
    fn test_due_after_window() {
        let t = trigger(None, None);
        assert!(!t.is_due(t.triggered_at));
        assert!(t.is_due(t.window_ends_at()));
        assert!(!trigger(Some(TriggerOutcome::Win), Some(1)).is_due(Utc::now() + Duration::days(1)));
    }
}
