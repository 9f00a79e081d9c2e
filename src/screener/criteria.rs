use serde::{Deserialize, Serialize};

use crate::errors::ScreenerError;
use crate::models::{AnalystAction, EarningsResult, GuidanceChange, RevenueGrowth};

/// Moving-average periods the snapshots carry precomputed.
pub const SUPPORTED_MA_PERIODS: [u32; 3] = [20, 50, 200];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaComparison {
    Above,
    Below,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingAverageSpec {
    pub period1: u32,
    pub period2: u32,
    pub comparison: MaComparison,
}

/// Validated screener criteria. Every field is optional; `None` means the
/// corresponding predicate does not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerCriteria {
    pub symbol: Option<String>,
    pub market_cap_min: Option<f64>,
    pub market_cap_max: Option<f64>,
    pub guidance_change: Option<GuidanceChange>,
    pub revenue_growth: Option<RevenueGrowth>,
    pub analyst_action: Option<AnalystAction>,
    pub earnings_result: Option<EarningsResult>,
    pub volume_anomaly: bool,
    pub moving_average: Option<MovingAverageSpec>,
    pub ath_distance: Option<f64>,
}

impl ScreenerCriteria {
    /// Re-check invariants for criteria built directly rather than parsed
    /// from a `ScreenerRequest`.
    pub fn validate(&self) -> Result<(), ScreenerError> {
        for (field, value) in [
            ("marketCapMin", self.market_cap_min),
            ("marketCapMax", self.market_cap_max),
            ("athDistance", self.ath_distance),
        ] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(invalid(format!("{field} must be a finite number")));
            }
        }

        if let (Some(min), Some(max)) = (self.market_cap_min, self.market_cap_max) {
            if min > max {
                return Err(invalid(format!(
                    "marketCapMin {min} is greater than marketCapMax {max}"
                )));
            }
        }

        if let Some(ma) = &self.moving_average {
            if ma.comparison == MaComparison::Cross {
                return Err(invalid(
                    "maComparison \"cross\" needs price history and is not supported",
                ));
            }
            for period in [ma.period1, ma.period2] {
                if !SUPPORTED_MA_PERIODS.contains(&period) {
                    return Err(invalid(format!(
                        "moving-average period must be one of {SUPPORTED_MA_PERIODS:?}, got {period}"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A numeric field as it arrives from a form: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

/// Unvalidated criteria as posted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerRequest {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub market_cap_min: Option<NumberInput>,
    #[serde(default)]
    pub market_cap_max: Option<NumberInput>,
    #[serde(default)]
    pub guidance_change: Option<String>,
    #[serde(default)]
    pub revenue_growth: Option<String>,
    #[serde(default)]
    pub analyst_action: Option<String>,
    #[serde(default)]
    pub earnings_result: Option<String>,
    #[serde(default)]
    pub volume_anomaly: Option<bool>,
    #[serde(default)]
    pub ma1_period: Option<NumberInput>,
    #[serde(default)]
    pub ma2_period: Option<NumberInput>,
    #[serde(default)]
    pub ma_comparison: Option<String>,
    #[serde(default)]
    pub ath_distance: Option<NumberInput>,
}

fn invalid(msg: impl Into<String>) -> ScreenerError {
    ScreenerError::Validation(msg.into())
}

fn parse_number(field: &str, input: Option<NumberInput>) -> Result<Option<f64>, ScreenerError> {
    let value = match input {
        None => return Ok(None),
        Some(NumberInput::Number(n)) => n,
        Some(NumberInput::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map_err(|_| invalid(format!("{field} is not a number: {s:?}")))?
        }
    };

    if !value.is_finite() {
        return Err(invalid(format!("{field} must be a finite number")));
    }
    Ok(Some(value))
}

/// Enum-valued filter; empty or `"any"` leaves it unconstrained.
fn parse_choice<T>(
    field: &str,
    input: Option<String>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ScreenerError> {
    let Some(raw) = input else {
        return Ok(None);
    };
    let word = raw.trim().to_lowercase();
    if word.is_empty() || word == "any" {
        return Ok(None);
    }
    parse(&word)
        .map(Some)
        .ok_or_else(|| invalid(format!("unknown {field} value {raw:?}")))
}

fn parse_period(field: &str, input: Option<NumberInput>) -> Result<Option<u32>, ScreenerError> {
    let Some(value) = parse_number(field, input)? else {
        return Ok(None);
    };
    SUPPORTED_MA_PERIODS
        .iter()
        .copied()
        .find(|p| f64::from(*p) == value)
        .map(Some)
        .ok_or_else(|| {
            invalid(format!(
                "{field} must be one of {SUPPORTED_MA_PERIODS:?}, got {value}"
            ))
        })
}

impl TryFrom<ScreenerRequest> for ScreenerCriteria {
    type Error = ScreenerError;

    fn try_from(req: ScreenerRequest) -> Result<Self, Self::Error> {
        let market_cap_min = parse_number("marketCapMin", req.market_cap_min)?;
        let market_cap_max = parse_number("marketCapMax", req.market_cap_max)?;
        if let (Some(min), Some(max)) = (market_cap_min, market_cap_max) {
            if min > max {
                return Err(invalid(format!(
                    "marketCapMin {min} is greater than marketCapMax {max}"
                )));
            }
        }

        let guidance_change = parse_choice("guidanceChange", req.guidance_change, |w| match w {
            "raised" => Some(GuidanceChange::Raised),
            "lowered" => Some(GuidanceChange::Lowered),
            _ => None,
        })?;
        let revenue_growth = parse_choice("revenueGrowth", req.revenue_growth, |w| match w {
            "increasing" => Some(RevenueGrowth::Increasing),
            "decreasing" => Some(RevenueGrowth::Decreasing),
            _ => None,
        })?;
        let analyst_action = parse_choice("analystAction", req.analyst_action, |w| match w {
            "upgrade" => Some(AnalystAction::Upgrade),
            "downgrade" => Some(AnalystAction::Downgrade),
            _ => None,
        })?;
        let earnings_result = parse_choice("earningsResult", req.earnings_result, |w| match w {
            "beat" => Some(EarningsResult::Beat),
            "miss" => Some(EarningsResult::Miss),
            _ => None,
        })?;

        let period1 = parse_period("ma1Period", req.ma1_period)?;
        let period2 = parse_period("ma2Period", req.ma2_period)?;
        let comparison = parse_choice("maComparison", req.ma_comparison, |w| match w {
            "above" => Some(MaComparison::Above),
            "below" => Some(MaComparison::Below),
            "cross" => Some(MaComparison::Cross),
            _ => None,
        })?;

        let moving_average = match (period1, period2, comparison) {
            (None, None, None) => None,
            (_, _, Some(MaComparison::Cross)) => {
                return Err(invalid(
                    "maComparison \"cross\" needs price history and is not supported",
                ))
            }
            (Some(period1), Some(period2), Some(comparison)) => Some(MovingAverageSpec {
                period1,
                period2,
                comparison,
            }),
            _ => {
                return Err(invalid(
                    "ma1Period, ma2Period and maComparison must be given together",
                ))
            }
        };

        let symbol = req
            .symbol
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(ScreenerCriteria {
            symbol,
            market_cap_min,
            market_cap_max,
            guidance_change,
            revenue_growth,
            analyst_action,
            earnings_result,
            volume_anomaly: req.volume_anomaly.unwrap_or(false),
            moving_average,
            ath_distance: parse_number("athDistance", req.ath_distance)?,
        })
    }
}
