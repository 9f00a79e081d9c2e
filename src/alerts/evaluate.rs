use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::models::{Alert, AlertType, Bias, StockMetricSnapshot, TriggerOutcome};
use crate::screener::VOLUME_ANOMALY_RATIO;

/// Whether `alert`'s condition holds against a snapshot of its symbol.
///
/// Technical, news and earnings alerts depend on signals a snapshot does not
/// carry and never fire here.
pub fn condition_met(alert: &Alert, snapshot: &StockMetricSnapshot) -> bool {
    if !alert.symbol.eq_ignore_ascii_case(&snapshot.symbol) {
        return false;
    }

    let threshold = |v: Option<Decimal>| v.and_then(|d| d.to_f64());

    match alert.alert_type {
        AlertType::PriceAbove => {
            threshold(alert.target_value).is_some_and(|target| snapshot.price >= target)
        }
        AlertType::PriceBelow => {
            threshold(alert.target_value).is_some_and(|target| snapshot.price <= target)
        }
        AlertType::PercentChange => threshold(alert.percentage_value)
            .is_some_and(|pct| snapshot.change_percent.abs() >= pct.abs()),
        AlertType::VolumeSpike => snapshot.volume_ratio > VOLUME_ANOMALY_RATIO,
        AlertType::TechnicalIndicator | AlertType::NewsEvent | AlertType::Earnings => false,
    }
}

/// Snapshot price as a `Decimal`, rounded to cents. `None` for non-finite prices.
pub fn price_of(snapshot: &StockMetricSnapshot) -> Option<Decimal> {
    if !snapshot.price.is_finite() || snapshot.price <= 0.0 {
        return None;
    }
    Decimal::from_f64(snapshot.price).map(|p| p.round_dp(2))
}

/// Percentage move from `entry` to `exit` in the direction of `bias`, with
/// the outcome it implies. `None` when the move does not fit in a `Decimal`.
pub fn score_move(bias: Bias, entry: Decimal, exit: Decimal) -> Option<(Decimal, TriggerOutcome)> {
    if entry.is_zero() {
        return Some((Decimal::ZERO, TriggerOutcome::Flat));
    }

    let raw = exit
        .checked_sub(entry)?
        .checked_div(entry)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    let pnl = match bias {
        Bias::Bullish => raw,
        Bias::Bearish => -raw,
    }
    .round_dp(4);

    let outcome = if pnl > Decimal::ZERO {
        TriggerOutcome::Win
    } else if pnl < Decimal::ZERO {
        TriggerOutcome::Loss
    } else {
        TriggerOutcome::Flat
    };

    Some((pnl, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::lifecycle::build_alert;
    use crate::models::{NewAlert, RevenueGrowth};
    use chrono::Utc;

    fn snapshot(symbol: &str, price: f64, change_percent: f64, volume_ratio: f64) -> StockMetricSnapshot {
        StockMetricSnapshot {
            symbol: symbol.into(),
            name: format!("{symbol} Inc"),
            price,
            change: 0.0,
            change_percent,
            market_cap_billions: 100.0,
            volume: 1_000_000,
            avg_volume_30d: 1_000_000,
            volume_ratio,
            guidance_change: None,
            revenue_growth: RevenueGrowth::Increasing,
            recent_analyst_action: None,
            earnings_result: None,
            ath_distance_percent: -10.0,
            ma20: price,
            ma50: price,
            ma200: price,
        }
    }

    fn alert(alert_type: AlertType, target: Option<i64>, pct: Option<i64>) -> Alert {
        build_alert(
            NewAlert {
                symbol: "nvda".into(),
                alert_type: Some(alert_type),
                title: "test".into(),
                target_value: target.map(Decimal::from),
                percentage_value: pct.map(Decimal::from),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_price_thresholds_inclusive() {
        let above = alert(AlertType::PriceAbove, Some(900), None);
        assert!(condition_met(&above, &snapshot("NVDA", 900.0, 0.0, 1.0)));
        assert!(!condition_met(&above, &snapshot("NVDA", 899.99, 0.0, 1.0)));

        let below = alert(AlertType::PriceBelow, Some(800), None);
        assert!(condition_met(&below, &snapshot("NVDA", 800.0, 0.0, 1.0)));
        assert!(!condition_met(&below, &snapshot("NVDA", 800.5, 0.0, 1.0)));
    }

    #[test]
    fn test_percent_change_uses_magnitude() {
        let pct = alert(AlertType::PercentChange, None, Some(3));
        assert!(condition_met(&pct, &snapshot("NVDA", 10.0, -3.5, 1.0)));
        assert!(!condition_met(&pct, &snapshot("NVDA", 10.0, 2.9, 1.0)));
    }

    #[test]
    fn test_volume_spike_and_other_symbols() {
        let spike = alert(AlertType::VolumeSpike, None, None);
        assert!(condition_met(&spike, &snapshot("NVDA", 10.0, 0.0, 1.59)));
        assert!(!condition_met(&spike, &snapshot("NVDA", 10.0, 0.0, 1.5)));
        assert!(!condition_met(&spike, &snapshot("AMD", 10.0, 0.0, 3.0)));
    }

    #[test]
    fn test_unobservable_types_never_fire() {
        let news = alert(AlertType::NewsEvent, None, None);
        assert!(!condition_met(&news, &snapshot("NVDA", 10.0, 50.0, 9.0)));
    }

    #[test]
    fn test_score_move_respects_bias() {
        let (pnl, outcome) =
            score_move(Bias::Bullish, Decimal::from(100), Decimal::from(110)).unwrap();
        assert_eq!(pnl, Decimal::from(10));
        assert_eq!(outcome, TriggerOutcome::Win);

        let (pnl, outcome) =
            score_move(Bias::Bearish, Decimal::from(100), Decimal::from(110)).unwrap();
        assert_eq!(pnl, Decimal::from(-10));
        assert_eq!(outcome, TriggerOutcome::Loss);

        let (_, outcome) =
            score_move(Bias::Bullish, Decimal::from(100), Decimal::from(100)).unwrap();
        assert_eq!(outcome, TriggerOutcome::Flat);
    }

    #[test]
    fn test_score_move_overflow_is_none() {
        let tiny = Decimal::new(1, 28);
        assert_eq!(score_move(Bias::Bullish, tiny, Decimal::from(5)), None);
        assert_eq!(score_move(Bias::Bearish, tiny, Decimal::from(5)), None);
        assert_eq!(score_move(Bias::Bullish, Decimal::ONE, Decimal::MAX), None);
    }
}
