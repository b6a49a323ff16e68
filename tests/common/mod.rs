#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use indexmap::IndexMap;

use bot_ops_console::api::Backend;
use bot_ops_console::error::ApiError;
use bot_ops_console::models::{
    ActionAck, AuditEvent, AuditFilter, AuditSummary, BotConfig, BotControlInfo,
    BotControlOverview, BotPerformance, BotStatus, DashboardSummary, GlobalConfig, Health,
    IndicatorsOverview, LoginResponse, Page, Percent, PnlChart, Position, Severity, Side, Trade,
    UpdateAck, User,
};

pub const MOCK_TOKEN: &str = "mock-token";

#[derive(Default)]
pub struct MockState {
    pub summary: DashboardSummary,
    pub bots: Vec<BotStatus>,
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub bot_configs: IndexMap<String, BotConfig>,
    pub global: GlobalConfig,
    pub control: BotControlOverview,
    pub performances: Vec<BotPerformance>,
    pub audit_events: Vec<AuditEvent>,
    pub health_ok: bool,

    // Failure switches
    pub reject_login: bool,
    pub reject_me: bool,
    pub reject_toggle: bool,
    pub fail_summary: bool,

    /// Bots whose config mutations come back with `restart_scheduled`.
    pub restart_flagged: HashSet<String>,
    pub global_restart: bool,

    // Observed side effects
    pub closed: Vec<(u64, Option<String>)>,
    pub actions: Vec<String>,
}

/// In-memory stand-in for the trading backend.
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        MockBackend {
            state: Mutex::new(MockState {
                health_ok: true,
                ..MockState::default()
            }),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn user() -> User {
        User {
            id: 1,
            username: "operator".to_string(),
            role: "admin".to_string(),
            is_active: true,
        }
    }

    fn paginate<T: Clone>(items: &[T], page: u32, per_page: u32) -> Page<T> {
        let per_page = per_page.max(1) as usize;
        let total = items.len() as u64;
        let pages = (items.len().div_ceil(per_page)).max(1) as u32;
        let start = (page.max(1) as usize - 1) * per_page;
        let slice = items
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect::<Vec<_>>();
        Page {
            items: slice,
            total,
            page: page.max(1),
            pages,
        }
    }
}

pub fn sample_position(id: u64, symbol: &str) -> Position {
    Position {
        id,
        bot_name: "bot_estavel".to_string(),
        symbol: symbol.to_string(),
        side: Side::Buy,
        entry_price: 100.0,
        current_price: 101.0,
        quantity: 1.0,
        pnl: 1.0,
        pnl_percent: 1.0,
        opened_at: Utc::now() - Duration::minutes(30),
        stop_loss: Some(99.0),
        take_profit: Some(103.0),
    }
}

pub fn sample_trade(id: u64, symbol: &str, bot: &str) -> Trade {
    Trade {
        id,
        bot_name: bot.to_string(),
        symbol: symbol.to_string(),
        side: Side::Buy,
        entry_price: 100.0,
        exit_price: 102.0,
        quantity: 1.0,
        pnl: 2.0,
        pnl_percent: 2.0,
        opened_at: Utc::now() - Duration::minutes(90),
        closed_at: Utc::now(),
        duration_minutes: 90.0,
    }
}

pub fn sample_bot_config(name: &str) -> BotConfig {
    BotConfig {
        name: name.to_string(),
        enabled: true,
        amount_per_trade: 50.0,
        take_profit: Percent(1.5),
        stop_loss: Percent(1.0),
        max_positions: 3,
        symbols: vec!["BTC/USDT".to_string()],
        ..BotConfig::default()
    }
}

pub fn sample_control_bot(bot_type: &str, enabled: bool) -> BotControlInfo {
    BotControlInfo {
        name: format!("bot_{bot_type}"),
        bot_type: bot_type.to_string(),
        enabled,
        status: "running".to_string(),
        win_rate: 55.0,
        total_trades: 40,
        pnl_today: 3.5,
        open_positions: 1,
    }
}

pub fn sample_audit_event(event_type: &str, source: &str, severity: Severity) -> AuditEvent {
    AuditEvent {
        timestamp: Utc::now(),
        event_type: event_type.to_string(),
        severity,
        source: source.to_string(),
        target: "bot_estavel".to_string(),
        action: "restart".to_string(),
        details: serde_json::Map::new(),
        user_id: Some("1".to_string()),
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn login(&self, username: &str, _password: &str) -> Result<LoginResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("login:{username}"));
        if state.reject_login {
            return Err(ApiError::Unauthorized {
                detail: "Invalid credentials".to_string(),
            });
        }
        Ok(LoginResponse {
            access_token: MOCK_TOKEN.to_string(),
            user: Self::user(),
        })
    }

    async fn me(&self) -> Result<User, ApiError> {
        if self.state.lock().unwrap().reject_me {
            return Err(ApiError::Unauthorized {
                detail: "Token expired".to_string(),
            });
        }
        Ok(Self::user())
    }

    async fn summary(&self) -> Result<DashboardSummary, ApiError> {
        let state = self.state.lock().unwrap();
        if state.fail_summary {
            return Err(ApiError::Status {
                status: 500,
                detail: "summary unavailable".to_string(),
            });
        }
        Ok(state.summary.clone())
    }

    async fn bots_status(&self) -> Result<Vec<BotStatus>, ApiError> {
        Ok(self.state.lock().unwrap().bots.clone())
    }

    async fn positions(&self, page: u32, per_page: u32) -> Result<Page<Position>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(Self::paginate(&state.positions, page, per_page))
    }

    async fn trades(&self, page: u32, per_page: u32) -> Result<Page<Trade>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(Self::paginate(&state.trades, page, per_page))
    }

    async fn pnl_chart(&self, period: &str) -> Result<PnlChart, ApiError> {
        Ok(PnlChart {
            period: period.to_string(),
            points: Vec::new(),
        })
    }

    async fn indicators(&self) -> Result<IndicatorsOverview, ApiError> {
        Ok(IndicatorsOverview::default())
    }

    async fn comparison(&self) -> Result<Vec<BotPerformance>, ApiError> {
        Ok(self.state.lock().unwrap().performances.clone())
    }

    async fn global_config(&self) -> Result<GlobalConfig, ApiError> {
        Ok(self.state.lock().unwrap().global.clone())
    }

    async fn update_global_config(&self, cfg: &GlobalConfig) -> Result<UpdateAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.global = cfg.clone();
        Ok(UpdateAck {
            restart_scheduled: state.global_restart,
            message: None,
        })
    }

    async fn bot_configs(&self) -> Result<IndexMap<String, BotConfig>, ApiError> {
        Ok(self.state.lock().unwrap().bot_configs.clone())
    }

    async fn update_bot_config(&self, name: &str, cfg: &BotConfig) -> Result<UpdateAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.bot_configs.insert(name.to_string(), cfg.clone());
        Ok(UpdateAck {
            restart_scheduled: state.restart_flagged.contains(name),
            message: None,
        })
    }

    async fn enable_bot(&self, name: &str) -> Result<UpdateAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_toggle {
            return Err(ApiError::Status {
                status: 422,
                detail: "toggle rejected".to_string(),
            });
        }
        if let Some(cfg) = state.bot_configs.get_mut(name) {
            cfg.enabled = true;
        }
        Ok(UpdateAck {
            restart_scheduled: state.restart_flagged.contains(name),
            message: None,
        })
    }

    async fn disable_bot(&self, name: &str) -> Result<UpdateAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_toggle {
            return Err(ApiError::Status {
                status: 422,
                detail: "toggle rejected".to_string(),
            });
        }
        if let Some(cfg) = state.bot_configs.get_mut(name) {
            cfg.enabled = false;
        }
        Ok(UpdateAck {
            restart_scheduled: state.restart_flagged.contains(name),
            message: None,
        })
    }

    async fn start_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("start:{}", name.unwrap_or("*")));
        Ok(ActionAck::default())
    }

    async fn stop_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("stop:{}", name.unwrap_or("*")));
        Ok(ActionAck::default())
    }

    async fn restart_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("restart:{}", name.unwrap_or("*")));
        Ok(ActionAck::default())
    }

    async fn emergency_stop(&self) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push("emergency_stop".to_string());
        Ok(ActionAck::with_message("Emergency stop engaged"))
    }

    async fn clear_emergency(&self) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push("clear_emergency".to_string());
        Ok(ActionAck::default())
    }

    async fn liquidate_all(&self, confirm: bool) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("liquidate:{confirm}"));
        Ok(ActionAck::default())
    }

    async fn close_position(&self, id: u64, reason: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.closed.push((id, reason.map(str::to_string)));
        state.positions.retain(|p| p.id != id);
        Ok(ActionAck::with_message(format!("Position {id} closed")))
    }

    async fn restart_bot_type(&self, bot_type: &str, reason: &str) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .actions
            .push(format!("restart_bot_type:{bot_type}:{reason}"));
        Ok(ActionAck::default())
    }

    async fn restart_all(&self, reason: &str) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("restart_all:{reason}"));
        Ok(ActionAck::default())
    }

    async fn stop_bot_type(&self, bot_type: &str, reason: &str) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .actions
            .push(format!("stop_bot_type:{bot_type}:{reason}"));
        Ok(ActionAck::default())
    }

    async fn bot_control(&self) -> Result<BotControlOverview, ApiError> {
        Ok(self.state.lock().unwrap().control.clone())
    }

    async fn toggle_bot(&self, bot_type: &str, enabled: bool) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_toggle {
            return Err(ApiError::Status {
                status: 422,
                detail: "toggle rejected".to_string(),
            });
        }
        if let Some(bot) = state
            .control
            .bots
            .iter_mut()
            .find(|b| b.bot_type == bot_type)
        {
            bot.enabled = enabled;
        }
        state.actions.push(format!("toggle:{bot_type}:{enabled}"));
        Ok(ActionAck::default())
    }

    async fn set_unico_bot(&self, enabled: bool) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        if let Some(ref mut unico) = state.control.unico_bot {
            unico.enabled = enabled;
        }
        if enabled {
            for bot in &mut state.control.bots {
                bot.enabled = false;
            }
        }
        state.actions.push(format!("unico:{enabled}"));
        Ok(ActionAck::default())
    }

    async fn restart_system(&self) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push("restart_system".to_string());
        Ok(ActionAck::default())
    }

    async fn audit_events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .audit_events
            .iter()
            .filter(|e| filter.matches(e))
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn audit_summary(&self) -> Result<AuditSummary, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(AuditSummary {
            total_events: state.audit_events.len() as u64,
            ..AuditSummary::default()
        })
    }

    async fn audit_export(&self, event_type: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .actions
            .push(format!("export:{}", event_type.unwrap_or("*")));
        Ok(ActionAck::with_message("Export written to audit_export.csv"))
    }

    async fn health(&self) -> Result<Health, ApiError> {
        let state = self.state.lock().unwrap();
        if !state.health_ok {
            return Err(ApiError::Status {
                status: 503,
                detail: "backend unavailable".to_string(),
            });
        }
        Ok(Health {
            status: "healthy".to_string(),
            version: "1.0.0".to_string(),
            uptime_seconds: 3600,
            uptime_human: "1h 0m".to_string(),
            timestamp: Some(Utc::now()),
        })
    }
}
