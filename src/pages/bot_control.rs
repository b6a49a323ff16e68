use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::Backend;
use crate::config::Config;
use crate::format::{format_signed_currency, format_win_rate};
use crate::models::BotControlOverview;
use crate::pages::{active_notice, Notice};
use crate::poll::Poller;

// Reasons recorded in the audit trail for operator-initiated lifecycle actions.
const REASON_RESTART: &str = "manual_restart_ui";
const REASON_STOP: &str = "manual_stop_ui";
const REASON_RESTART_ALL: &str = "manual_restart_all_ui";

#[derive(Debug, Clone, Default)]
struct ControlState {
    overview: BotControlOverview,
    loading: bool,
    notice: Option<Notice>,
}

/// Per-bot enable toggles, lifecycle restarts and the exclusive-mode bot.
///
/// Toggles flip optimistically and roll back if the call fails; everything
/// heavier is fire-and-refetch, with a settling delay after restarts since the
/// backend reports the old state for a few seconds.
pub struct BotControlPage {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<ControlState>>,
    notice_ttl: Duration,
    settle_delay: Duration,
    _poller: Poller,
}

impl BotControlPage {
    pub fn new(cfg: &Config, backend: Arc<dyn Backend>) -> Self {
        let state = Arc::new(RwLock::new(ControlState::default()));

        let poller = Poller::spawn(Duration::from_secs(cfg.fast_poll_secs), {
            let backend = backend.clone();
            let state = Arc::downgrade(&state);
            move || {
                let backend = backend.clone();
                let state = state.clone();
                async move {
                    if let Some(state) = state.upgrade() {
                        Self::refresh(&backend, &state).await;
                    }
                }
            }
        });

        BotControlPage {
            backend,
            state,
            notice_ttl: Duration::from_secs(cfg.notice_ttl_secs),
            settle_delay: Duration::from_secs(cfg.settle_delay_secs),
            _poller: poller,
        }
    }

    pub async fn mount(&self) {
        self.state.write().await.loading = true;
        Self::refresh(&self.backend, &self.state).await;
        self.state.write().await.loading = false;
    }

    async fn refresh(backend: &Arc<dyn Backend>, state: &Arc<RwLock<ControlState>>) {
        match backend.bot_control().await {
            Ok(overview) => state.write().await.overview = overview,
            Err(e) => warn!("Bot control fetch failed: {}", e),
        }
    }

    pub async fn overview(&self) -> BotControlOverview {
        self.state.read().await.overview.clone()
    }

    /// Flip one specialized bot's enabled flag. The flag flips locally first;
    /// a failed call puts it back and surfaces the backend's message.
    pub async fn toggle_bot(&self, bot_type: &str) {
        let target = {
            let mut state = self.state.write().await;
            if state.overview.unico_active() {
                state.notice = Some(Notice::error(
                    "Specialized bots are paused while the exclusive bot is active",
                ));
                return;
            }
            let Some(bot) = state
                .overview
                .bots
                .iter_mut()
                .find(|b| b.bot_type == bot_type)
            else {
                state.notice = Some(Notice::error(format!("Unknown bot type {bot_type:?}")));
                return;
            };
            bot.enabled = !bot.enabled;
            bot.enabled
        };

        match self.backend.toggle_bot(bot_type, target).await {
            Ok(ack) => {
                let mut state = self.state.write().await;
                state.notice = Some(Notice::success(ack.message.unwrap_or_else(|| {
                    format!(
                        "{bot_type} {}",
                        if target { "enabled" } else { "disabled" }
                    )
                })));
            }
            Err(e) => {
                let mut state = self.state.write().await;
                if let Some(bot) = state
                    .overview
                    .bots
                    .iter_mut()
                    .find(|b| b.bot_type == bot_type)
                {
                    bot.enabled = !target;
                }
                state.notice = Some(Notice::error(e.user_message("Toggle failed")));
            }
        }
    }

    /// Switch the exclusive-mode bot on or off. Activation pauses every
    /// specialized bot backend-side; the shell gates this behind a
    /// confirmation before calling in.
    pub async fn set_unico(&self, enabled: bool) {
        match self.backend.set_unico_bot(enabled).await {
            Ok(ack) => {
                info!(
                    "Exclusive bot {}",
                    if enabled { "activated" } else { "deactivated" }
                );
                self.state.write().await.notice = Some(Notice::success(
                    ack.message.unwrap_or_else(|| {
                        if enabled {
                            "Exclusive bot activated; specialized bots paused".to_string()
                        } else {
                            "Exclusive bot deactivated".to_string()
                        }
                    }),
                ));
                Self::refresh(&self.backend, &self.state).await;
            }
            Err(e) => {
                self.state.write().await.notice =
                    Some(Notice::error(e.user_message("Exclusive bot switch failed")));
            }
        }
    }

    pub async fn restart_bot(&self, bot_type: &str) {
        let result = self.backend.restart_bot_type(bot_type, REASON_RESTART).await;
        self.finish_lifecycle(result, format!("Restarting {bot_type}"))
            .await;
    }

    pub async fn stop_bot(&self, bot_type: &str) {
        let result = self.backend.stop_bot_type(bot_type, REASON_STOP).await;
        self.finish_lifecycle(result, format!("Stopping {bot_type}"))
            .await;
    }

    pub async fn restart_all(&self) {
        let result = self.backend.restart_all(REASON_RESTART_ALL).await;
        self.finish_lifecycle(result, "Restarting all bots".to_string())
            .await;
    }

    /// Full backend process restart; shell-confirmed.
    pub async fn restart_system(&self) {
        let result = self.backend.restart_system().await;
        self.finish_lifecycle(result, "System restart requested".to_string())
            .await;
    }

    async fn finish_lifecycle(
        &self,
        result: Result<crate::models::ActionAck, crate::error::ApiError>,
        fallback: String,
    ) {
        match result {
            Ok(ack) => {
                self.state.write().await.notice =
                    Some(Notice::success(ack.message.unwrap_or(fallback)));
                self.schedule_settle_refetch();
            }
            Err(e) => {
                self.state.write().await.notice =
                    Some(Notice::error(e.user_message("Action failed")));
            }
        }
    }

    /// Refetch once the backend has settled. Weak handle: if the page was
    /// unmounted in the meantime, the write is simply skipped.
    fn schedule_settle_refetch(&self) {
        let backend = self.backend.clone();
        let state: Weak<RwLock<ControlState>> = Arc::downgrade(&self.state);
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(state) = state.upgrade() {
                Self::refresh(&backend, &state).await;
            }
        });
    }

    pub async fn render(&self) -> String {
        let state = self.state.read().await.clone();

        let mut out = String::new();
        out.push_str("== Bot Control ==\n");
        if let Some(notice) = active_notice(&state.notice, self.notice_ttl) {
            out.push_str(&notice.render());
            out.push('\n');
        }

        if let Some(ref unico) = state.overview.unico_bot {
            out.push_str(&format!(
                "Exclusive bot: {} [{}] portfolio {} strategy {}\n",
                unico.name,
                if unico.enabled { "ACTIVE" } else { "off" },
                unico.portfolio_size,
                unico.strategy,
            ));
            if unico.enabled {
                out.push_str("  (specialized bots are paused while active)\n");
            }
        }

        out.push_str("Bots:\n");
        if state.overview.bots.is_empty() && state.loading {
            out.push_str("  loading...\n");
        }
        for bot in &state.overview.bots {
            out.push_str(&format!(
                "  {:<20} [{}] {:<8} win {} trades {} today {} open {}\n",
                bot.name,
                if bot.enabled { "on " } else { "off" },
                bot.status,
                format_win_rate(bot.win_rate),
                bot.total_trades,
                format_signed_currency(bot.pnl_today),
                bot.open_positions,
            ));
        }
        out
    }
}
