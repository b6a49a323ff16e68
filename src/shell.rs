use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use crate::api::Backend;
use crate::config::Config;
use crate::models::{Health, Severity};
use crate::pages::{
    AuditPage, BotControlPage, ComparisonPage, ConfigPage, DashboardPage, IndicatorsPage,
    PositionsPage, SortKey, TradesPage,
};
use crate::poll::Poller;
use crate::state::{AuthPhase, AuthStore, DashboardStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Positions,
    Trades,
    BotControl,
    Config,
    Indicators,
    Audit,
    Comparison,
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "login" => Ok(Route::Login),
            "dashboard" | "dash" => Ok(Route::Dashboard),
            "positions" | "pos" => Ok(Route::Positions),
            "trades" => Ok(Route::Trades),
            "control" | "bots" => Ok(Route::BotControl),
            "config" | "cfg" => Ok(Route::Config),
            "indicators" | "ind" => Ok(Route::Indicators),
            "audit" => Ok(Route::Audit),
            "comparison" | "compare" => Ok(Route::Comparison),
            other => Err(format!("unknown page {other:?}")),
        }
    }
}

/// Destructive action awaiting a `yes`. Anything else typed cancels it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAction {
    EmergencyStop,
    LiquidateAll,
    RestartAll,
    RestartSystem,
    ActivateUnico,
    ClosePosition(u64),
}

impl PendingAction {
    fn prompt(&self) -> String {
        match self {
            PendingAction::EmergencyStop => {
                "EMERGENCY STOP: halt all bots and block new entries. Confirm? (yes/no)".to_string()
            }
            PendingAction::LiquidateAll => {
                "Liquidate ALL open positions at market. Confirm? (yes/no)".to_string()
            }
            PendingAction::RestartAll => "Restart every bot. Confirm? (yes/no)".to_string(),
            PendingAction::RestartSystem => {
                "Restart the whole backend process. Confirm? (yes/no)".to_string()
            }
            PendingAction::ActivateUnico => {
                "Activating the exclusive bot pauses all specialized bots. Confirm? (yes/no)"
                    .to_string()
            }
            PendingAction::ClosePosition(id) => {
                format!("Close position #{id} at market. Confirm? (yes/no)")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct HealthState {
    online: bool,
    health: Health,
}

/// Background `/health` poll, independent of whichever page is mounted.
struct HealthMonitor {
    state: Arc<RwLock<HealthState>>,
    _poller: Poller,
}

impl HealthMonitor {
    fn new(cfg: &Config, backend: Arc<dyn Backend>) -> Self {
        let state = Arc::new(RwLock::new(HealthState::default()));

        let poller = Poller::spawn(Duration::from_secs(cfg.health_poll_secs), {
            let backend = backend.clone();
            let state = Arc::downgrade(&state);
            move || {
                let backend = backend.clone();
                let state = state.clone();
                async move {
                    if let Some(state) = state.upgrade() {
                        Self::probe(&backend, &state).await;
                    }
                }
            }
        });

        HealthMonitor {
            state,
            _poller: poller,
        }
    }

    async fn probe(backend: &Arc<dyn Backend>, state: &Arc<RwLock<HealthState>>) {
        match backend.health().await {
            Ok(health) => {
                *state.write().await = HealthState {
                    online: true,
                    health,
                };
            }
            Err(e) => {
                warn!("Health probe failed: {}", e);
                state.write().await.online = false;
            }
        }
    }

    async fn status_line(&self) -> String {
        let state = self.state.read().await.clone();
        if state.online {
            format!(
                "backend {} v{} up {}",
                state.health.status, state.health.version, state.health.uptime_human
            )
        } else {
            "backend OFFLINE".to_string()
        }
    }
}

/// Only the mounted page keeps its controller (and thus its poller) alive;
/// navigating away drops it, which aborts its background fetches.
enum ActivePage {
    Login,
    Dashboard(DashboardPage),
    Positions(PositionsPage),
    Trades(TradesPage),
    BotControl(BotControlPage),
    Config(ConfigPage),
    Indicators(IndicatorsPage),
    Audit(AuditPage),
    Comparison(ComparisonPage),
}

pub enum LineOutcome {
    Output(String),
    Quit,
}

/// Top-level command loop: navigation with the auth guard, the confirmation
/// gate for destructive actions, and dispatch into the mounted page.
pub struct Shell {
    cfg: Arc<Config>,
    backend: Arc<dyn Backend>,
    auth: Arc<AuthStore>,
    dashboard_store: Arc<DashboardStore>,
    health: HealthMonitor,
    unauthorized_rx: watch::Receiver<u64>,
    route: Route,
    page: ActivePage,
    pending: Option<PendingAction>,
}

impl Shell {
    pub fn new(
        cfg: Arc<Config>,
        backend: Arc<dyn Backend>,
        auth: Arc<AuthStore>,
        unauthorized_rx: watch::Receiver<u64>,
    ) -> Self {
        let dashboard_store = Arc::new(DashboardStore::new(backend.clone()));
        let health = HealthMonitor::new(&cfg, backend.clone());
        Shell {
            cfg,
            backend,
            auth,
            dashboard_store,
            health,
            unauthorized_rx,
            route: Route::Login,
            page: ActivePage::Login,
            pending: None,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// Navigate with the auth guard: every route except the login screen
    /// requires an authenticated session and redirects there otherwise.
    pub async fn try_navigate(&mut self, route: Route) -> Route {
        let target = if route != Route::Login && !self.auth.is_authenticated().await {
            Route::Login
        } else {
            route
        };
        self.mount(target).await;
        target
    }

    async fn mount(&mut self, route: Route) {
        // Drop the old page first so its poller stops before the new one starts.
        self.page = ActivePage::Login;
        self.route = route;

        self.page = match route {
            Route::Login => ActivePage::Login,
            Route::Dashboard => {
                let page = DashboardPage::new(
                    &self.cfg,
                    self.backend.clone(),
                    self.dashboard_store.clone(),
                );
                page.mount().await;
                ActivePage::Dashboard(page)
            }
            Route::Positions => {
                let page = PositionsPage::new(
                    &self.cfg,
                    self.backend.clone(),
                    self.dashboard_store.clone(),
                );
                page.mount().await;
                ActivePage::Positions(page)
            }
            Route::Trades => {
                let page = TradesPage::new(&self.cfg, self.backend.clone());
                page.mount().await;
                ActivePage::Trades(page)
            }
            Route::BotControl => {
                let page = BotControlPage::new(&self.cfg, self.backend.clone());
                page.mount().await;
                ActivePage::BotControl(page)
            }
            Route::Config => {
                let page = ConfigPage::new(&self.cfg, self.backend.clone());
                page.mount().await;
                ActivePage::Config(page)
            }
            Route::Indicators => {
                let page = IndicatorsPage::new(&self.cfg, self.backend.clone());
                page.mount().await;
                ActivePage::Indicators(page)
            }
            Route::Audit => {
                let page = AuditPage::new(&self.cfg, self.backend.clone());
                page.mount().await;
                ActivePage::Audit(page)
            }
            Route::Comparison => {
                let page = ComparisonPage::new(&self.cfg, self.backend.clone());
                page.mount().await;
                ActivePage::Comparison(page)
            }
        };
    }

    async fn render(&self) -> String {
        let body = match &self.page {
            ActivePage::Login => match self.auth.phase().await {
                AuthPhase::Error(msg) => format!("== Login ==\n[ERR] {msg}\nlogin <user> <pass>"),
                AuthPhase::Authenticating => "== Login ==\nsigning in...".to_string(),
                _ => "== Login ==\nlogin <user> <pass>".to_string(),
            },
            ActivePage::Dashboard(p) => p.render().await,
            ActivePage::Positions(p) => p.render().await,
            ActivePage::Trades(p) => p.render().await,
            ActivePage::BotControl(p) => p.render().await,
            ActivePage::Config(p) => p.render().await,
            ActivePage::Indicators(p) => p.render().await,
            ActivePage::Audit(p) => p.render().await,
            ActivePage::Comparison(p) => p.render().await,
        };
        format!("{body}\n[{}]", self.health.status_line().await)
    }

    /// Reaction to the adapter's unauthorized signal: drop the session, clear
    /// any pending confirmation, and land back on the login screen.
    pub async fn on_unauthorized(&mut self) -> String {
        self.auth.force_logout().await;
        self.pending = None;
        self.mount(Route::Login).await;
        "Session expired; please log in again.".to_string()
    }

    async fn confirm(&mut self, action: PendingAction) -> String {
        let prompt = action.prompt();
        self.pending = Some(action);
        prompt
    }

    async fn execute_pending(&mut self, action: PendingAction) -> String {
        match action {
            PendingAction::EmergencyStop => match self.backend.emergency_stop().await {
                Ok(ack) => {
                    info!("Emergency stop issued");
                    ack.message
                        .unwrap_or_else(|| "Emergency stop engaged.".to_string())
                }
                Err(e) => e.user_message("Emergency stop failed"),
            },
            PendingAction::LiquidateAll => match self.backend.liquidate_all(true).await {
                Ok(ack) => ack
                    .message
                    .unwrap_or_else(|| "Liquidating all positions.".to_string()),
                Err(e) => e.user_message("Liquidation failed"),
            },
            PendingAction::RestartAll => {
                if let ActivePage::BotControl(page) = &self.page {
                    page.restart_all().await;
                    page.render().await
                } else {
                    match self.backend.restart_all("manual_restart_all_ui").await {
                        Ok(ack) => ack
                            .message
                            .unwrap_or_else(|| "Restarting all bots.".to_string()),
                        Err(e) => e.user_message("Restart failed"),
                    }
                }
            }
            PendingAction::RestartSystem => {
                if let ActivePage::BotControl(page) = &self.page {
                    page.restart_system().await;
                    page.render().await
                } else {
                    match self.backend.restart_system().await {
                        Ok(ack) => ack
                            .message
                            .unwrap_or_else(|| "System restart requested.".to_string()),
                        Err(e) => e.user_message("System restart failed"),
                    }
                }
            }
            PendingAction::ActivateUnico => {
                if let ActivePage::BotControl(page) = &self.page {
                    page.set_unico(true).await;
                    page.render().await
                } else {
                    "Open the control page to manage the exclusive bot.".to_string()
                }
            }
            PendingAction::ClosePosition(id) => {
                if let ActivePage::Positions(page) = &self.page {
                    page.close_position(id, Some("manual_close_ui")).await;
                    page.render().await
                } else {
                    "Open the positions page to close positions.".to_string()
                }
            }
        }
    }

    /// One line of operator input. `Quit` ends the loop.
    pub async fn handle_line(&mut self, line: &str) -> LineOutcome {
        let line = line.trim();

        // A pending confirmation swallows the next line entirely.
        if let Some(action) = self.pending.take() {
            return if matches!(line.to_ascii_lowercase().as_str(), "yes" | "y") {
                LineOutcome::Output(self.execute_pending(action).await)
            } else {
                LineOutcome::Output("Cancelled.".to_string())
            };
        }

        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        match cmd {
            "" | "show" => LineOutcome::Output(self.render().await),
            "quit" | "exit" => LineOutcome::Quit,
            "help" => LineOutcome::Output(Self::help_text()),
            "health" => LineOutcome::Output(self.health.status_line().await),

            "login" => match args.as_slice() {
                [user, pass] => {
                    let result = self.auth.login(user, pass).await;
                    if result.is_ok() {
                        self.try_navigate(Route::Dashboard).await;
                    }
                    LineOutcome::Output(self.render().await)
                }
                _ => LineOutcome::Output("usage: login <user> <pass>".to_string()),
            },
            "logout" => {
                self.auth.logout().await;
                self.mount(Route::Login).await;
                LineOutcome::Output("Logged out.".to_string())
            }
            "whoami" => LineOutcome::Output(match self.auth.user().await {
                Some(user) => format!("{} ({})", user.username, user.role),
                None => "not signed in".to_string(),
            }),

            "go" => match args.first().map(|s| Route::from_str(s)) {
                Some(Ok(route)) => {
                    let landed = self.try_navigate(route).await;
                    let mut out = self.render().await;
                    if landed != route {
                        out = format!("Sign in first.\n{out}");
                    }
                    LineOutcome::Output(out)
                }
                Some(Err(e)) => LineOutcome::Output(e),
                None => LineOutcome::Output("usage: go <page>".to_string()),
            },

            // Globally available safety controls.
            "estop" => LineOutcome::Output(self.confirm(PendingAction::EmergencyStop).await),
            "estop-clear" => LineOutcome::Output(match self.backend.clear_emergency().await {
                Ok(ack) => ack
                    .message
                    .unwrap_or_else(|| "Emergency stop cleared.".to_string()),
                Err(e) => e.user_message("Could not clear emergency stop"),
            }),
            "liquidate" => LineOutcome::Output(self.confirm(PendingAction::LiquidateAll).await),

            _ => LineOutcome::Output(self.page_command(cmd, &args).await),
        }
    }

    /// Commands whose meaning depends on the mounted page.
    async fn page_command(&mut self, cmd: &str, args: &[&str]) -> String {
        match (&self.page, cmd) {
            (ActivePage::Dashboard(page), "start") => {
                page.start_bot(args.first().copied()).await;
                page.render().await
            }
            (ActivePage::Dashboard(page), "stop") => {
                page.stop_bot(args.first().copied()).await;
                page.render().await
            }
            (ActivePage::Dashboard(page), "restart") => {
                page.restart_bot(args.first().copied()).await;
                page.render().await
            }
            (ActivePage::Dashboard(page), "period") => match args.first() {
                Some(period) => {
                    page.set_chart_period(period).await;
                    page.render().await
                }
                None => "usage: period <7d|30d|90d>".to_string(),
            },

            (ActivePage::Positions(page), "next") => {
                page.next_page().await;
                page.render().await
            }
            (ActivePage::Positions(page), "prev") => {
                page.prev_page().await;
                page.render().await
            }
            (ActivePage::Positions(_), "close") => match args.first().and_then(|s| s.parse().ok()) {
                Some(id) => self.confirm(PendingAction::ClosePosition(id)).await,
                None => "usage: close <position-id>".to_string(),
            },

            (ActivePage::Trades(page), "next") => {
                page.next_page().await;
                page.render().await
            }
            (ActivePage::Trades(page), "prev") => {
                page.prev_page().await;
                page.render().await
            }
            (ActivePage::Trades(page), "filter") => {
                page.set_filter(&args.join(" ")).await;
                page.render().await
            }

            (ActivePage::BotControl(page), "toggle") => match args.first() {
                Some(bot_type) => {
                    page.toggle_bot(bot_type).await;
                    page.render().await
                }
                None => "usage: toggle <bot-type>".to_string(),
            },
            (ActivePage::BotControl(page), "restart") => match args.first() {
                Some(bot_type) => {
                    page.restart_bot(bot_type).await;
                    page.render().await
                }
                None => "usage: restart <bot-type>".to_string(),
            },
            (ActivePage::BotControl(page), "stop") => match args.first() {
                Some(bot_type) => {
                    page.stop_bot(bot_type).await;
                    page.render().await
                }
                None => "usage: stop <bot-type>".to_string(),
            },
            (ActivePage::BotControl(_), "restart-all") => {
                self.confirm(PendingAction::RestartAll).await
            }
            (ActivePage::BotControl(_), "restart-system") => {
                self.confirm(PendingAction::RestartSystem).await
            }
            (ActivePage::BotControl(page), "unico") => match args.first().copied() {
                Some("on") => self.confirm(PendingAction::ActivateUnico).await,
                Some("off") => {
                    page.set_unico(false).await;
                    page.render().await
                }
                _ => "usage: unico <on|off>".to_string(),
            },

            (ActivePage::Config(page), "select") => match args.first() {
                Some(name) => {
                    page.select_bot(name).await;
                    page.render().await
                }
                None => "usage: select <bot>".to_string(),
            },
            (ActivePage::Config(page), "set") => match args {
                ["amount", v] => match v.parse() {
                    Ok(v) => {
                        page.set_amount(v).await;
                        page.render().await
                    }
                    Err(_) => "amount must be a number".to_string(),
                },
                ["tp", v] => match v.parse() {
                    Ok(v) => {
                        page.set_take_profit(v).await;
                        page.render().await
                    }
                    Err(_) => "take profit must be a number".to_string(),
                },
                ["sl", v] => match v.parse() {
                    Ok(v) => {
                        page.set_stop_loss(v).await;
                        page.render().await
                    }
                    Err(_) => "stop loss must be a number".to_string(),
                },
                ["max", v] => match v.parse() {
                    Ok(v) => {
                        page.set_max_positions(v).await;
                        page.render().await
                    }
                    Err(_) => "max positions must be an integer".to_string(),
                },
                _ => "usage: set <amount|tp|sl|max> <value>".to_string(),
            },
            (ActivePage::Config(page), "profile") => match args.first().map(|s| s.parse()) {
                Some(Ok(profile)) => {
                    page.apply_risk_profile(profile).await;
                    page.render().await
                }
                Some(Err(e)) => e,
                None => "usage: profile <ultra_conservative|conservative|normal|aggressive|ultra_aggressive>".to_string(),
            },
            (ActivePage::Config(page), "toggle") => match args.first() {
                Some(name) => {
                    page.toggle_enabled(name).await;
                    page.render().await
                }
                None => "usage: toggle <bot>".to_string(),
            },
            (ActivePage::Config(page), "tp-add") => match args.first().and_then(|s| s.parse().ok()) {
                Some(pct) => {
                    page.tp_add(pct).await;
                    page.render().await
                }
                None => "usage: tp-add <percent>".to_string(),
            },
            (ActivePage::Config(page), "tp-set") => match args {
                [label, v] => match v.parse() {
                    Ok(pct) => {
                        page.tp_set(label, pct).await;
                        page.render().await
                    }
                    Err(_) => "percent must be a number".to_string(),
                },
                _ => "usage: tp-set <label> <percent>".to_string(),
            },
            (ActivePage::Config(page), "tp-del") => match args.first() {
                Some(label) => {
                    page.tp_remove(label).await;
                    page.render().await
                }
                None => "usage: tp-del <label>".to_string(),
            },
            (ActivePage::Config(page), "rsi-add") => match args {
                [buy, sell] => match (buy.parse(), sell.parse()) {
                    (Ok(buy), Ok(sell)) => {
                        page.rsi_add(buy, sell).await;
                        page.render().await
                    }
                    _ => "thresholds must be numbers".to_string(),
                },
                _ => "usage: rsi-add <buy> <sell>".to_string(),
            },
            (ActivePage::Config(page), "rsi-set") => match args {
                [label, buy, sell] => match (buy.parse(), sell.parse()) {
                    (Ok(buy), Ok(sell)) => {
                        page.rsi_set(label, buy, sell).await;
                        page.render().await
                    }
                    _ => "thresholds must be numbers".to_string(),
                },
                _ => "usage: rsi-set <label> <buy> <sell>".to_string(),
            },
            (ActivePage::Config(page), "rsi-del") => match args.first() {
                Some(label) => {
                    page.rsi_remove(label).await;
                    page.render().await
                }
                None => "usage: rsi-del <label>".to_string(),
            },
            (ActivePage::Config(page), "save") => {
                page.save().await;
                page.render().await
            }

            (ActivePage::Indicators(page), "auto") => {
                let on = page.toggle_auto_refresh().await;
                format!("auto-refresh {}", if on { "on" } else { "off" })
            }

            (ActivePage::Audit(page), "filter") => {
                let mut event_type = None;
                let mut source = None;
                let mut severity = None;
                for arg in args {
                    match arg.split_once('=') {
                        Some(("type", v)) => event_type = Some(v.to_string()),
                        Some(("source", v)) => source = Some(v.to_string()),
                        Some(("severity", v)) => match v.parse::<Severity>() {
                            Ok(s) => severity = Some(s),
                            Err(e) => return e,
                        },
                        _ => return "usage: filter [type=..] [source=..] [severity=..]".to_string(),
                    }
                }
                page.set_filter(event_type, source, severity).await;
                page.render().await
            }
            (ActivePage::Audit(page), "limit") => match args.first().and_then(|s| s.parse().ok()) {
                Some(limit) => {
                    page.set_limit(limit).await;
                    page.render().await
                }
                None => "usage: limit <n>".to_string(),
            },
            (ActivePage::Audit(page), "export") => {
                page.export().await;
                page.render().await
            }

            (ActivePage::Comparison(page), "sort") => match args.first().copied() {
                Some("pnl") => {
                    page.set_sort(SortKey::TotalPnl).await;
                    page.render().await
                }
                Some("win") => {
                    page.set_sort(SortKey::WinRate).await;
                    page.render().await
                }
                Some("trades") => {
                    page.set_sort(SortKey::Trades).await;
                    page.render().await
                }
                _ => "usage: sort <pnl|win|trades>".to_string(),
            },

            _ => format!("unknown command {cmd:?} (try help)"),
        }
    }

    fn help_text() -> String {
        [
            "pages:   go <dashboard|positions|trades|control|config|indicators|audit|comparison>",
            "session: login <user> <pass> | logout | whoami",
            "safety:  estop | estop-clear | liquidate",
            "misc:    show | health | help | quit",
            "each page adds its own commands; type show to see its data",
        ]
        .join("\n")
    }

    /// Interactive loop. Ends on quit, EOF, or Ctrl-C.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.auth.check_session().await;
        let initial = if self.auth.is_authenticated().await {
            Route::Dashboard
        } else {
            Route::Login
        };
        self.try_navigate(initial).await;
        println!("{}", self.render().await);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut unauthorized_rx = self.unauthorized_rx.clone();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted; shutting down");
                    break;
                }
                changed = unauthorized_rx.changed() => {
                    if changed.is_ok() {
                        let msg = self.on_unauthorized().await;
                        println!("{msg}");
                    }
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => match self.handle_line(&line).await {
                            LineOutcome::Output(out) => println!("{out}"),
                            LineOutcome::Quit => break,
                        },
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }
}
