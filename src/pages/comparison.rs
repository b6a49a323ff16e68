use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::api::Backend;
use crate::config::Config;
use crate::format::{format_minutes, format_signed_currency, format_win_rate};
use crate::models::BotPerformance;
use crate::poll::Poller;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    TotalPnl,
    WinRate,
    Trades,
}

#[derive(Debug, Clone, Default)]
struct ComparisonState {
    performances: Vec<BotPerformance>,
    sort: SortKey,
    loading: bool,
}

/// Side-by-side lifetime performance of every bot, slow-polled.
pub struct ComparisonPage {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<ComparisonState>>,
    _poller: Poller,
}

impl ComparisonPage {
    pub fn new(cfg: &Config, backend: Arc<dyn Backend>) -> Self {
        let state = Arc::new(RwLock::new(ComparisonState::default()));

        let poller = Poller::spawn(Duration::from_secs(cfg.slow_poll_secs), {
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

        ComparisonPage {
            backend,
            state,
            _poller: poller,
        }
    }

    pub async fn mount(&self) {
        self.state.write().await.loading = true;
        Self::refresh(&self.backend, &self.state).await;
        self.state.write().await.loading = false;
    }

    async fn refresh(backend: &Arc<dyn Backend>, state: &Arc<RwLock<ComparisonState>>) {
        match backend.comparison().await {
            Ok(performances) => state.write().await.performances = performances,
            Err(e) => warn!("Comparison fetch failed: {}", e),
        }
    }

    pub async fn set_sort(&self, sort: SortKey) {
        self.state.write().await.sort = sort;
    }

    fn sorted(mut rows: Vec<BotPerformance>, sort: SortKey) -> Vec<BotPerformance> {
        match sort {
            SortKey::TotalPnl => {
                rows.sort_by(|a, b| b.total_pnl.total_cmp(&a.total_pnl));
            }
            SortKey::WinRate => {
                rows.sort_by(|a, b| b.win_rate.total_cmp(&a.win_rate));
            }
            SortKey::Trades => {
                rows.sort_by(|a, b| b.total_trades.cmp(&a.total_trades));
            }
        }
        rows
    }

    pub async fn render(&self) -> String {
        let state = self.state.read().await.clone();
        let rows = Self::sorted(state.performances, state.sort);

        let mut out = String::new();
        out.push_str("== Comparison ==\n");
        if rows.is_empty() && state.loading {
            out.push_str("  loading...\n");
        }
        for p in &rows {
            let streak = if p.current_streak >= 0 {
                format!("W{}", p.current_streak)
            } else {
                format!("L{}", -p.current_streak)
            };
            out.push_str(&format!(
                "  {:<20} [{}] total {:>10} today {:>9} | {} trades, win {} | avg {} / {} | best {} worst {} | streak {}\n",
                p.bot_name,
                if p.enabled { "on " } else { "off" },
                format_signed_currency(p.total_pnl),
                format_signed_currency(p.daily_pnl),
                p.total_trades,
                format_win_rate(p.win_rate),
                format_signed_currency(p.avg_profit_per_trade),
                format_minutes(p.avg_duration_min.round() as i64),
                format_signed_currency(p.best_trade),
                format_signed_currency(p.worst_trade),
                streak,
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perf(name: &str, pnl: f64, win_rate: f64, trades: u64) -> BotPerformance {
        BotPerformance {
            bot_name: name.to_string(),
            total_pnl: pnl,
            win_rate,
            total_trades: trades,
            ..BotPerformance::default()
        }
    }

    #[test]
    fn sorts_descending_by_each_key() {
        let rows = vec![
            perf("a", 5.0, 40.0, 100),
            perf("b", 15.0, 60.0, 20),
            perf("c", -3.0, 80.0, 50),
        ];

        let by_pnl = ComparisonPage::sorted(rows.clone(), SortKey::TotalPnl);
        assert_eq!(by_pnl[0].bot_name, "b");
        assert_eq!(by_pnl[2].bot_name, "c");

        let by_win = ComparisonPage::sorted(rows.clone(), SortKey::WinRate);
        assert_eq!(by_win[0].bot_name, "c");

        let by_trades = ComparisonPage::sorted(rows, SortKey::Trades);
        assert_eq!(by_trades[0].bot_name, "a");
    }
}
