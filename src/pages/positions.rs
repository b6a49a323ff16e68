use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::api::Backend;
use crate::config::Config;
use crate::format::{format_currency, format_elapsed, format_percent, format_signed_currency};
use crate::pages::{active_notice, Notice};
use crate::poll::Poller;
use crate::state::DashboardStore;

const PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Default)]
struct PageState {
    current_page: u32,
    notice: Option<Notice>,
}

/// Open positions with pagination and a per-row close action.
///
/// Polls every fast tick; the position list is server-owned, so a close is
/// fire-and-refetch rather than a local removal.
pub struct PositionsPage {
    backend: Arc<dyn Backend>,
    store: Arc<DashboardStore>,
    state: Arc<RwLock<PageState>>,
    notice_ttl: Duration,
    _poller: Poller,
}

impl PositionsPage {
    pub fn new(cfg: &Config, backend: Arc<dyn Backend>, store: Arc<DashboardStore>) -> Self {
        let state = Arc::new(RwLock::new(PageState {
            current_page: 1,
            notice: None,
        }));

        let poller = Poller::spawn(Duration::from_secs(cfg.fast_poll_secs), {
            let store = Arc::downgrade(&store);
            let state = Arc::downgrade(&state);
            move || {
                let store = store.clone();
                let state = state.clone();
                async move {
                    let (Some(store), Some(state)) = (store.upgrade(), state.upgrade()) else {
                        return;
                    };
                    let page = state.read().await.current_page;
                    store.fetch_positions(page, PER_PAGE).await;
                }
            }
        });

        PositionsPage {
            backend,
            store,
            state,
            notice_ttl: Duration::from_secs(cfg.notice_ttl_secs),
            _poller: poller,
        }
    }

    pub async fn mount(&self) {
        let page = self.state.read().await.current_page;
        self.store.fetch_positions(page, PER_PAGE).await;
    }

    pub async fn goto_page(&self, page: u32) {
        let page = page.max(1);
        self.state.write().await.current_page = page;
        self.store.fetch_positions(page, PER_PAGE).await;
    }

    pub async fn next_page(&self) {
        let (page, pages) = {
            let state = self.state.read().await;
            let data = self.store.snapshot().await;
            (state.current_page, data.positions.pages)
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

    /// Close one position. The row disappears on the refetch once the backend
    /// has actually closed it, never locally.
    pub async fn close_position(&self, id: u64, reason: Option<&str>) {
        let result = self.backend.close_position(id, reason).await;
        let notice = match result {
            Ok(ack) => {
                Notice::success(ack.message.unwrap_or_else(|| format!("Position {id} closed")))
            }
            Err(e) => Notice::error(e.user_message("Could not close position")),
        };
        self.state.write().await.notice = Some(notice);

        let page = self.state.read().await.current_page;
        self.store.fetch_positions(page, PER_PAGE).await;
    }

    pub async fn render(&self) -> String {
        let data = self.store.snapshot().await;
        let state = self.state.read().await.clone();
        let now = Utc::now();

        let mut out = String::new();
        out.push_str("== Positions ==\n");
        if let Some(notice) = active_notice(&state.notice, self.notice_ttl) {
            out.push_str(&notice.render());
            out.push('\n');
        }
        if let Some(ref err) = data.last_error {
            out.push_str(&format!("[ERR] {err}\n"));
        }

        let page = &data.positions;
        if page.items.is_empty() {
            out.push_str(if data.positions_loading {
                "  loading...\n"
            } else {
                "  no open positions\n"
            });
        }
        for p in &page.items {
            out.push_str(&format!(
                "  #{:<5} {:<16} {:<10} {} entry {} now {} pnl {} ({}) held {}\n",
                p.id,
                p.bot_name,
                p.symbol,
                p.side,
                format_currency(p.entry_price),
                format_currency(p.current_price),
                format_signed_currency(p.pnl),
                format_percent(p.pnl_percent),
                format_elapsed(p.opened_at, now),
            ));
        }
        out.push_str(&format!(
            "page {}/{} ({} open)\n",
            page.page, page.pages, page.total
        ));
        out
    }
}
