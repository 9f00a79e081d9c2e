pub mod alert;
pub mod notification;
pub mod snapshot;
pub mod trigger;

pub use alert::{Alert, AlertFilter, AlertSource, AlertStatus, AlertType, Bias, NewAlert, Timeframe};
pub use notification::{Notification, NotificationKind};
pub use snapshot::{
    parse_market_cap_billions, AnalystAction, EarningsResult, GuidanceChange, RevenueGrowth,
    StockMetricSnapshot,
};
pub use trigger::{AlertTrigger, TriggerOutcome, TriggerReview, TriggerStats};
