use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::api::Backend;
use crate::config::Config;
use crate::format::{format_currency, format_signed_currency, format_win_rate};
use crate::models::PnlChart;
use crate::pages::{active_notice, Notice};
use crate::poll::Poller;
use crate::state::DashboardStore;

#[derive(Debug, Clone, Default)]
struct ChartState {
    period: String,
    chart: PnlChart,
    loading: bool,
    notice: Option<Notice>,
}

/// Landing page: account summary, per-bot status table and the PnL chart.
///
/// The summary rides the slow poll, the bot table the fast one. Both go
/// through the shared `DashboardStore`, so this page keeps the Positions page
/// warm and vice versa.
pub struct DashboardPage {
    backend: Arc<dyn Backend>,
    store: Arc<DashboardStore>,
    chart: Arc<RwLock<ChartState>>,
    notice_ttl: Duration,
    _fast_poller: Poller,
    _slow_poller: Poller,
}

impl DashboardPage {
    pub fn new(cfg: &Config, backend: Arc<dyn Backend>, store: Arc<DashboardStore>) -> Self {
        let chart = Arc::new(RwLock::new(ChartState {
            period: "7d".to_string(),
            ..ChartState::default()
        }));

        let fast_poller = Poller::spawn(Duration::from_secs(cfg.fast_poll_secs), {
            let store = Arc::downgrade(&store);
            move || {
                let store = store.clone();
                async move {
                    if let Some(store) = store.upgrade() {
                        store.fetch_bots().await;
                    }
                }
            }
        });

        let slow_poller = Poller::spawn(Duration::from_secs(cfg.slow_poll_secs), {
            let store = Arc::downgrade(&store);
            move || {
                let store = store.clone();
                async move {
                    if let Some(store) = store.upgrade() {
                        store.fetch_summary().await;
                    }
                }
            }
        });

        DashboardPage {
            backend,
            store,
            chart,
            notice_ttl: Duration::from_secs(cfg.notice_ttl_secs),
            _fast_poller: fast_poller,
            _slow_poller: slow_poller,
        }
    }

    pub async fn mount(&self) {
        tokio::join!(
            self.store.fetch_summary(),
            self.store.fetch_bots(),
            self.fetch_chart(),
        );
    }

    pub async fn set_chart_period(&self, period: &str) {
        self.chart.write().await.period = period.to_string();
        self.fetch_chart().await;
    }

    async fn fetch_chart(&self) {
        let period = {
            let mut chart = self.chart.write().await;
            chart.loading = true;
            chart.period.clone()
        };
        let result = self.backend.pnl_chart(&period).await;
        let mut chart = self.chart.write().await;
        chart.loading = false;
        match result {
            Ok(data) => chart.chart = data,
            Err(e) => warn!("PnL chart fetch failed: {}", e),
        }
    }

    pub async fn start_bot(&self, name: Option<&str>) {
        let result = self.store.start_bot(name).await;
        let mut chart = self.chart.write().await;
        chart.notice = Some(match result {
            Ok(ack) => Notice::success(ack.message.unwrap_or_else(|| "Bot started".to_string())),
            Err(e) => Notice::error(e.user_message("Could not start bot")),
        });
    }

    pub async fn stop_bot(&self, name: Option<&str>) {
        let result = self.store.stop_bot(name).await;
        let mut chart = self.chart.write().await;
        chart.notice = Some(match result {
            Ok(ack) => Notice::success(ack.message.unwrap_or_else(|| "Bot stopped".to_string())),
            Err(e) => Notice::error(e.user_message("Could not stop bot")),
        });
    }

    pub async fn restart_bot(&self, name: Option<&str>) {
        let result = self.store.restart_bot(name).await;
        let mut chart = self.chart.write().await;
        chart.notice = Some(match result {
            Ok(ack) => Notice::success(ack.message.unwrap_or_else(|| "Bot restarting".to_string())),
            Err(e) => Notice::error(e.user_message("Could not restart bot")),
        });
    }

    pub async fn render(&self) -> String {
        let data = self.store.snapshot().await;
        let chart = self.chart.read().await.clone();

        let mut out = String::new();
        out.push_str("== Dashboard ==\n");
        if let Some(notice) = active_notice(&chart.notice, self.notice_ttl) {
            out.push_str(&notice.render());
            out.push('\n');
        }
        if let Some(ref err) = data.last_error {
            out.push_str(&format!("[ERR] {err}\n"));
        }

        let s = &data.summary;
        out.push_str(&format!(
            "Balance {} (available {}, in positions {})\n",
            format_currency(s.total_balance),
            format_currency(s.available_balance),
            format_currency(s.in_positions),
        ));
        out.push_str(&format!(
            "PnL today {} | week {} | month {}\n",
            format_signed_currency(s.pnl_today),
            format_signed_currency(s.pnl_week),
            format_signed_currency(s.pnl_month),
        ));
        out.push_str(&format!(
            "Trades {} | win rate {} | active bots {} | open positions {}\n",
            s.total_trades,
            format_win_rate(s.win_rate),
            s.active_bots,
            s.open_positions,
        ));

        out.push_str("\nBots:\n");
        if data.bots_loading && data.bots.is_empty() {
            out.push_str("  loading...\n");
        }
        for bot in &data.bots {
            out.push_str(&format!(
                "  {:<20} {:<8} today {:>10} | total {:>10} | win {} | open {}\n",
                bot.name,
                if bot.is_running() { "RUNNING" } else { &bot.status },
                format_signed_currency(bot.pnl_today),
                format_signed_currency(bot.pnl_total),
                format_win_rate(bot.win_rate),
                bot.open_positions,
            ));
        }

        out.push_str(&format!("\nPnL chart ({}):\n", chart.period));
        for point in &chart.chart.points {
            out.push_str(&format!(
                "  {} {:>10} (cum {})\n",
                point.date,
                format_signed_currency(point.pnl),
                format_signed_currency(point.cumulative),
            ));
        }
        out
    }
}
