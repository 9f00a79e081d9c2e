use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceChange {
    Raised,
    Lowered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueGrowth {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalystAction {
    Upgrade,
    Downgrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningsResult {
    Beat,
    Miss,
}

/// Point-in-time metrics for one symbol, the screener's input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMetricSnapshot {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    #[serde(alias = "marketCap", deserialize_with = "de_market_cap")]
    pub market_cap_billions: f64,
    pub volume: u64,
    pub avg_volume_30d: u64,
    pub volume_ratio: f64,
    #[serde(default)]
    pub guidance_change: Option<GuidanceChange>,
    pub revenue_growth: RevenueGrowth,
    #[serde(default, alias = "recentAction")]
    pub recent_analyst_action: Option<AnalystAction>,
    #[serde(default)]
    pub earnings_result: Option<EarningsResult>,
    #[serde(alias = "athDistance")]
    pub ath_distance_percent: f64,
    pub ma20: f64,
    pub ma50: f64,
    pub ma200: f64,
}

impl StockMetricSnapshot {
    /// Precomputed moving average for `period`, if the snapshot carries one.
    pub fn moving_average(&self, period: u32) -> Option<f64> {
        match period {
            20 => Some(self.ma20),
            50 => Some(self.ma50),
            200 => Some(self.ma200),
            _ => None,
        }
    }
}

/// Parse a market-cap display string ("$2.16T", "$231B", "$850M") into billions.
pub fn parse_market_cap_billions(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    let suffix = cleaned.chars().last()?.to_ascii_uppercase();
    let digits = if matches!(suffix, 'T' | 'B' | 'M') {
        &cleaned[..cleaned.len() - 1]
    } else {
        cleaned.as_str()
    };

    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    Some(match suffix {
        'T' => value * 1000.0,
        'M' => value / 1000.0,
        _ => value,
    })
}

fn de_market_cap<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => parse_market_cap_billions(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid market cap: {s}"))),
    }
}
