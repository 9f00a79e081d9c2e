pub mod evaluate;
pub mod lifecycle;
pub mod manager;

pub use evaluate::{condition_met, score_move};
pub use lifecycle::{build_alert, is_allowed, plan_transition, suggest_title, StatusChange};
pub use manager::AlertManager;
