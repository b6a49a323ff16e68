pub mod actions;
pub mod audit;
pub mod auth;
pub mod config;
pub mod control;
pub mod dashboard;
pub mod health;
pub mod market;

pub use actions::ActionAck;
pub use audit::{AuditEvent, AuditFilter, AuditSummary, Severity};
pub use auth::{LoginResponse, User};
pub use config::{BotConfig, GlobalConfig, Percent, RsiThresholds, Schedule, UpdateAck};
pub use control::{BotControlInfo, BotControlOverview, UnicoBotStatus};
pub use dashboard::{BotStatus, DashboardSummary, Page, Position, Side, Trade};
pub use health::Health;
pub use market::{
    BotPerformance, BotStrategyProfile, IndicatorSnapshot, IndicatorsOverview, PnlChart,
    PnlPoint, Trend,
};
