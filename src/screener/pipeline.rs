use std::fmt;

use crate::errors::ScreenerError;
use crate::models::{AnalystAction, EarningsResult, GuidanceChange, RevenueGrowth, StockMetricSnapshot};

use super::criteria::{MaComparison, MovingAverageSpec, ScreenerCriteria};

/// Volume above this multiple of the 30-day average counts as anomalous.
pub const VOLUME_ANOMALY_RATIO: f64 = 1.5;

/// One independent predicate derived from the criteria.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Case-insensitive substring of symbol or name (stored lower-cased).
    Text(String),
    MarketCap { min: Option<f64>, max: Option<f64> },
    Guidance(GuidanceChange),
    Revenue(RevenueGrowth),
    Analyst(AnalystAction),
    Earnings(EarningsResult),
    VolumeAnomaly,
    MovingAverage(MovingAverageSpec),
    /// Minimum distance from the all-time high, in either direction.
    AthDistance(f64),
}

impl Filter {
    pub fn matches(&self, s: &StockMetricSnapshot) -> bool {
        match self {
            Filter::Text(needle) => {
                s.symbol.to_lowercase().contains(needle) || s.name.to_lowercase().contains(needle)
            }
            Filter::MarketCap { min, max } => {
                min.map_or(true, |m| s.market_cap_billions >= m)
                    && max.map_or(true, |m| s.market_cap_billions <= m)
            }
            Filter::Guidance(g) => s.guidance_change == Some(*g),
            Filter::Revenue(r) => s.revenue_growth == *r,
            Filter::Analyst(a) => s.recent_analyst_action == Some(*a),
            Filter::Earnings(e) => s.earnings_result == Some(*e),
            Filter::VolumeAnomaly => s.volume_ratio > VOLUME_ANOMALY_RATIO,
            Filter::MovingAverage(spec) => {
                match (s.moving_average(spec.period1), s.moving_average(spec.period2)) {
                    (Some(ma1), Some(ma2)) => match spec.comparison {
                        MaComparison::Above => ma1 > ma2,
                        MaComparison::Below => ma1 < ma2,
                        MaComparison::Cross => false,
                    },
                    _ => false,
                }
            }
            Filter::AthDistance(threshold) => s.ath_distance_percent.abs() >= threshold.abs(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::Text(_) => "symbol",
            Filter::MarketCap { .. } => "market_cap",
            Filter::Guidance(_) => "guidance_change",
            Filter::Revenue(_) => "revenue_growth",
            Filter::Analyst(_) => "analyst_action",
            Filter::Earnings(_) => "earnings_result",
            Filter::VolumeAnomaly => "volume_anomaly",
            Filter::MovingAverage(_) => "moving_average",
            Filter::AthDistance(_) => "ath_distance",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated set of filters, AND-ed together.
#[derive(Debug, Clone, Default)]
pub struct Screener {
    filters: Vec<Filter>,
}

impl Screener {
    pub fn new(criteria: &ScreenerCriteria) -> Result<Self, ScreenerError> {
        criteria.validate()?;

        let mut filters = Vec::new();
        if let Some(text) = &criteria.symbol {
            filters.push(Filter::Text(text.to_lowercase()));
        }
        if criteria.market_cap_min.is_some() || criteria.market_cap_max.is_some() {
            filters.push(Filter::MarketCap {
                min: criteria.market_cap_min,
                max: criteria.market_cap_max,
            });
        }
        if let Some(g) = criteria.guidance_change {
            filters.push(Filter::Guidance(g));
        }
        if let Some(r) = criteria.revenue_growth {
            filters.push(Filter::Revenue(r));
        }
        if let Some(a) = criteria.analyst_action {
            filters.push(Filter::Analyst(a));
        }
        if let Some(e) = criteria.earnings_result {
            filters.push(Filter::Earnings(e));
        }
        if criteria.volume_anomaly {
            filters.push(Filter::VolumeAnomaly);
        }
        if let Some(ma) = criteria.moving_average {
            filters.push(Filter::MovingAverage(ma));
        }
        if let Some(d) = criteria.ath_distance {
            filters.push(Filter::AthDistance(d));
        }

        Ok(Self { filters })
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn matches(&self, snapshot: &StockMetricSnapshot) -> bool {
        self.filters.iter().all(|f| f.matches(snapshot))
    }

    /// Matching snapshots in their input order.
    pub fn apply(&self, snapshots: &[StockMetricSnapshot]) -> Vec<StockMetricSnapshot> {
        snapshots
            .iter()
            .filter(|s| self.matches(s))
            .cloned()
            .collect()
    }
}

/// Validate `criteria` and filter `snapshots` with it.
pub fn run(
    snapshots: &[StockMetricSnapshot],
    criteria: &ScreenerCriteria,
) -> Result<Vec<StockMetricSnapshot>, ScreenerError> {
    let screener = Screener::new(criteria)?;
    let matched = screener.apply(snapshots);

    metrics::counter!("screener_runs_total").increment(1);
    metrics::histogram!("screener_matches").record(matched.len() as f64);
    tracing::debug!(
        filters = screener.filters().len(),
        input = snapshots.len(),
        matched = matched.len(),
        "Screener run complete"
    );

    Ok(matched)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    fn snap(
        symbol: &str,
        name: &str,
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
            price: 100.0,
            change: 1.0,
            change_percent: 1.0,
            market_cap_billions: cap,
            volume: 1_000_000,
            avg_volume_30d: 1_000_000,
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

    fn universe() -> Vec<StockMetricSnapshot> {
        vec![
            snap(
                "NVDA",
                "NVIDIA Corporation",
                2160.0,
                1.59,
                -8.2,
                Some(GuidanceChange::Raised),
                Some(AnalystAction::Upgrade),
                Some(EarningsResult::Beat),
                (840.50, 780.25, 650.75),
            ),
            snap(
                "AMD",
                "Advanced Micro Devices",
                231.0,
                1.48,
                -35.6,
                None,
                Some(AnalystAction::Downgrade),
                Some(EarningsResult::Miss),
                (138.75, 125.30, 110.45),
            ),
            snap(
                "TSLA",
                "Tesla Inc",
                792.0,
                1.96,
                -67.8,
                Some(GuidanceChange::Raised),
                Some(AnalystAction::Upgrade),
                Some(EarningsResult::Beat),
                (235.60, 220.15, 185.90),
            ),
        ]
    }

    fn symbols(result: &[StockMetricSnapshot]) -> Vec<&str> {
        result.iter().map(|s| s.symbol.as_str()).collect()
    }

    #[test]
    fn test_empty_criteria_keeps_everything_in_order() {
        let input = universe();
        let out = run(&input, &ScreenerCriteria::default()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_volume_anomaly_is_strictly_above_ratio() {
        let input = universe()[..2].to_vec();
        let criteria = ScreenerCriteria {
            volume_anomaly: true,
            ..Default::default()
        };
        assert_eq!(symbols(&run(&input, &criteria).unwrap()), vec!["NVDA"]);
    }

    #[test]
    fn test_market_cap_closed_interval() {
        let criteria = ScreenerCriteria {
            market_cap_min: Some(1000.0),
            market_cap_max: Some(2200.0),
            ..Default::default()
        };
        assert_eq!(symbols(&run(&universe(), &criteria).unwrap()), vec!["NVDA"]);

        let min_only = ScreenerCriteria {
            market_cap_min: Some(792.0),
            ..Default::default()
        };
        assert_eq!(
            symbols(&run(&universe(), &min_only).unwrap()),
            vec!["NVDA", "TSLA"]
        );

        let max_only = ScreenerCriteria {
            market_cap_max: Some(231.0),
            ..Default::default()
        };
        assert_eq!(symbols(&run(&universe(), &max_only).unwrap()), vec!["AMD"]);
    }

    #[test]
    fn test_ath_distance_is_minimum_magnitude() {
        let criteria = ScreenerCriteria {
            ath_distance: Some(-20.0),
            ..Default::default()
        };
        assert_eq!(
            symbols(&run(&universe(), &criteria).unwrap()),
            vec!["AMD", "TSLA"]
        );

        let positive = ScreenerCriteria {
            ath_distance: Some(20.0),
            ..Default::default()
        };
        assert_eq!(
            symbols(&run(&universe(), &positive).unwrap()),
            vec!["AMD", "TSLA"]
        );
    }

    #[test]
    fn test_text_matches_symbol_or_name() {
        let by_name = ScreenerCriteria {
            symbol: Some("micro".into()),
            ..Default::default()
        };
        assert_eq!(symbols(&run(&universe(), &by_name).unwrap()), vec!["AMD"]);

        let by_symbol = ScreenerCriteria {
            symbol: Some("tsl".into()),
            ..Default::default()
        };
        assert_eq!(symbols(&run(&universe(), &by_symbol).unwrap()), vec!["TSLA"]);
    }

    #[test]
    fn test_categorical_filters_combine() {
        let criteria = ScreenerCriteria {
            guidance_change: Some(GuidanceChange::Raised),
            analyst_action: Some(AnalystAction::Upgrade),
            earnings_result: Some(EarningsResult::Beat),
            volume_anomaly: true,
            ath_distance: Some(-50.0),
            ..Default::default()
        };
        assert_eq!(symbols(&run(&universe(), &criteria).unwrap()), vec!["TSLA"]);

        let none_match = ScreenerCriteria {
            revenue_growth: Some(RevenueGrowth::Decreasing),
            ..Default::default()
        };
        assert!(run(&universe(), &none_match).unwrap().is_empty());
    }

    #[test]
    fn test_moving_average_comparison() {
        let above = ScreenerCriteria {
            moving_average: Some(MovingAverageSpec {
                period1: 20,
                period2: 200,
                comparison: MaComparison::Above,
            }),
            ..Default::default()
        };
        assert_eq!(run(&universe(), &above).unwrap().len(), 3);

        let below = ScreenerCriteria {
            moving_average: Some(MovingAverageSpec {
                period1: 20,
                period2: 200,
                comparison: MaComparison::Below,
            }),
            ..Default::default()
        };
        assert!(run(&universe(), &below).unwrap().is_empty());
    }

    #[test]
    fn test_direct_criteria_are_validated() {
        let nan = ScreenerCriteria {
            market_cap_min: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(
            run(&universe(), &nan),
            Err(ScreenerError::Validation(_))
        ));

        let odd_period = ScreenerCriteria {
            moving_average: Some(MovingAverageSpec {
                period1: 10,
                period2: 50,
                comparison: MaComparison::Above,
            }),
            ..Default::default()
        };
        assert!(run(&universe(), &odd_period).is_err());
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let criteria = ScreenerCriteria {
            volume_anomaly: true,
            ..Default::default()
        };
        assert!(run(&[], &criteria).unwrap().is_empty());
    }
}
