use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::api::Backend;
use crate::config::Config;
use crate::format::{format_currency, format_minutes, format_percent, format_signed_currency};
use crate::models::{Page, Trade};
use crate::pages::{active_notice, Notice};

const PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Default)]
struct TradesState {
    trades: Page<Trade>,
    current_page: u32,
    filter: String,
    loading: bool,
    /// Bumped per fetch; a slow response from a superseded fetch is dropped.
    epoch: u64,
    notice: Option<Notice>,
}

/// Trade history. No poller: history only grows, so a fetch on mount and on
/// page change is enough. The text filter is applied client-side to the page
/// in hand, matching symbol or bot name as a case-insensitive substring.
pub struct TradesPage {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<TradesState>>,
    notice_ttl: Duration,
}

impl TradesPage {
    pub fn new(cfg: &Config, backend: Arc<dyn Backend>) -> Self {
        TradesPage {
            backend,
            state: Arc::new(RwLock::new(TradesState {
                current_page: 1,
                ..TradesState::default()
            })),
            notice_ttl: Duration::from_secs(cfg.notice_ttl_secs),
        }
    }

    pub async fn mount(&self) {
        self.fetch().await;
    }

    pub async fn goto_page(&self, page: u32) {
        self.state.write().await.current_page = page.max(1);
        self.fetch().await;
    }

    pub async fn next_page(&self) {
        let (page, pages) = {
            let state = self.state.read().await;
            (state.current_page, state.trades.pages)
        };
        if page < pages {
            self.goto_page(page + 1).await;
        }
    }

    pub async fn prev_page(&self) {
        let page = self.state.read().await.current_page;
        if page > 1 {
            self.goto_page(page - 1).await;
        }
    }

    pub async fn set_filter(&self, filter: &str) {
        self.state.write().await.filter = filter.to_string();
    }

    async fn fetch(&self) {
        let (page, epoch) = {
            let mut state = self.state.write().await;
            state.loading = true;
            state.epoch += 1;
            (state.current_page, state.epoch)
        };

        let result = self.backend.trades(page, PER_PAGE).await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return;
        }
        state.loading = false;
        match result {
            Ok(trades) => state.trades = trades,
            Err(e) => {
                warn!("Trades fetch failed: {}", e);
                state.notice = Some(Notice::error(e.user_message("Could not load trades")));
            }
        }
    }

    fn matches_filter(trade: &Trade, filter: &str) -> bool {
        if filter.is_empty() {
            return true;
        }
        let needle = filter.to_lowercase();
        trade.symbol.to_lowercase().contains(&needle)
            || trade.bot_name.to_lowercase().contains(&needle)
    }

    pub async fn render(&self) -> String {
        let state = self.state.read().await.clone();

        let mut out = String::new();
        out.push_str("== Trades ==\n");
        if let Some(notice) = active_notice(&state.notice, self.notice_ttl) {
            out.push_str(&notice.render());
            out.push('\n');
        }
        if !state.filter.is_empty() {
            out.push_str(&format!("filter: {:?}\n", state.filter));
        }

        let visible: Vec<&Trade> = state
            .trades
            .items
            .iter()
            .filter(|t| Self::matches_filter(t, &state.filter))
            .collect();

        if visible.is_empty() {
            out.push_str(if state.loading {
                "  loading...\n"
            } else {
                "  no trades\n"
            });
        }
        for t in &visible {
            out.push_str(&format!(
                "  #{:<6} {:<16} {:<10} {} in {} out {} pnl {} ({}) {}\n",
                t.id,
                t.bot_name,
                t.symbol,
                t.side,
                format_currency(t.entry_price),
                format_currency(t.exit_price),
                format_signed_currency(t.pnl),
                format_percent(t.pnl_percent),
                format_minutes(t.duration_minutes.round() as i64),
            ));
        }
        out.push_str(&format!(
            "page {}/{} ({} trades total)\n",
            state.trades.page, state.trades.pages, state.trades.total
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Side;

    fn trade(symbol: &str, bot: &str) -> Trade {
        Trade {
            id: 1,
            bot_name: bot.to_string(),
            symbol: symbol.to_string(),
            side: Side::Buy,
            entry_price: 10.0,
            exit_price: 11.0,
            quantity: 1.0,
            pnl: 1.0,
            pnl_percent: 10.0,
            opened_at: Utc::now(),
            closed_at: Utc::now(),
            duration_minutes: 30.0,
        }
    }

    #[test]
    fn filter_matches_symbol_or_bot_case_insensitive() {
        let t = trade("BTC/USDT", "bot_estavel");
        assert!(TradesPage::matches_filter(&t, ""));
        assert!(TradesPage::matches_filter(&t, "btc"));
        assert!(TradesPage::matches_filter(&t, "ESTAVEL"));
        assert!(!TradesPage::matches_filter(&t, "eth"));
    }
}
