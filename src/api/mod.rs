pub mod client;

pub use client::ApiClient;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::ApiError;
use crate::models::{
    ActionAck, AuditEvent, AuditFilter, AuditSummary, BotConfig, BotControlOverview,
    BotPerformance, BotStatus, DashboardSummary, GlobalConfig, Health, IndicatorsOverview,
    LoginResponse, Page, PnlChart, Position, Trade, UpdateAck, User,
};

/// The full inferred REST contract of the trading backend.
///
/// `ApiClient` is the production implementation; tests drive the stores and
/// page controllers against a mock instead of a live server.
#[async_trait]
pub trait Backend: Send + Sync {
    // Auth
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError>;
    async fn me(&self) -> Result<User, ApiError>;

    // Dashboard reads
    async fn summary(&self) -> Result<DashboardSummary, ApiError>;
    async fn bots_status(&self) -> Result<Vec<BotStatus>, ApiError>;
    async fn positions(&self, page: u32, per_page: u32) -> Result<Page<Position>, ApiError>;
    async fn trades(&self, page: u32, per_page: u32) -> Result<Page<Trade>, ApiError>;
    async fn pnl_chart(&self, period: &str) -> Result<PnlChart, ApiError>;
    async fn indicators(&self) -> Result<IndicatorsOverview, ApiError>;
    async fn comparison(&self) -> Result<Vec<BotPerformance>, ApiError>;

    // Config
    async fn global_config(&self) -> Result<GlobalConfig, ApiError>;
    async fn update_global_config(&self, cfg: &GlobalConfig) -> Result<UpdateAck, ApiError>;
    async fn bot_configs(&self) -> Result<IndexMap<String, BotConfig>, ApiError>;
    async fn update_bot_config(&self, name: &str, cfg: &BotConfig) -> Result<UpdateAck, ApiError>;
    async fn enable_bot(&self, name: &str) -> Result<UpdateAck, ApiError>;
    async fn disable_bot(&self, name: &str) -> Result<UpdateAck, ApiError>;

    // Actions
    async fn start_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError>;
    async fn stop_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError>;
    async fn restart_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError>;
    async fn emergency_stop(&self) -> Result<ActionAck, ApiError>;
    async fn clear_emergency(&self) -> Result<ActionAck, ApiError>;
    async fn liquidate_all(&self, confirm: bool) -> Result<ActionAck, ApiError>;
    async fn close_position(&self, id: u64, reason: Option<&str>) -> Result<ActionAck, ApiError>;
    async fn restart_bot_type(&self, bot_type: &str, reason: &str) -> Result<ActionAck, ApiError>;
    async fn restart_all(&self, reason: &str) -> Result<ActionAck, ApiError>;
    async fn stop_bot_type(&self, bot_type: &str, reason: &str) -> Result<ActionAck, ApiError>;

    // Bot control (specialized bots + exclusive-mode UnicoBot)
    async fn bot_control(&self) -> Result<BotControlOverview, ApiError>;
    async fn toggle_bot(&self, bot_type: &str, enabled: bool) -> Result<ActionAck, ApiError>;
    async fn set_unico_bot(&self, enabled: bool) -> Result<ActionAck, ApiError>;
    async fn restart_system(&self) -> Result<ActionAck, ApiError>;

    // Audit
    async fn audit_events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, ApiError>;
    async fn audit_summary(&self) -> Result<AuditSummary, ApiError>;
    async fn audit_export(&self, event_type: Option<&str>) -> Result<ActionAck, ApiError>;

    // Diagnostics
    async fn health(&self) -> Result<Health, ApiError>;
}
