use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::api::Backend;
use crate::config::Config;
use crate::format::format_currency;
use crate::models::IndicatorsOverview;
use crate::poll::Poller;

#[derive(Debug, Clone)]
struct IndicatorsState {
    overview: IndicatorsOverview,
    auto_refresh: bool,
    loading: bool,
}

/// Live per-symbol indicator readout plus each bot's strategy card.
///
/// The poller runs for the life of the page but only fetches while
/// auto-refresh is on; toggling it off freezes the readout for inspection.
pub struct IndicatorsPage {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<IndicatorsState>>,
    _poller: Poller,
}

impl IndicatorsPage {
    pub fn new(cfg: &Config, backend: Arc<dyn Backend>) -> Self {
        let state = Arc::new(RwLock::new(IndicatorsState {
            overview: IndicatorsOverview::default(),
            auto_refresh: true,
            loading: false,
        }));

        let poller = Poller::spawn(Duration::from_secs(cfg.fast_poll_secs), {
            let backend = backend.clone();
            let state = Arc::downgrade(&state);
            move || {
                let backend = backend.clone();
                let state = state.clone();
                async move {
                    let Some(state) = state.upgrade() else { return };
                    if state.read().await.auto_refresh {
                        Self::refresh(&backend, &state).await;
                    }
                }
            }
        });

        IndicatorsPage {
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

    async fn refresh(backend: &Arc<dyn Backend>, state: &Arc<RwLock<IndicatorsState>>) {
        match backend.indicators().await {
            Ok(overview) => state.write().await.overview = overview,
            Err(e) => warn!("Indicators fetch failed: {}", e),
        }
    }

    pub async fn toggle_auto_refresh(&self) -> bool {
        let mut state = self.state.write().await;
        state.auto_refresh = !state.auto_refresh;
        state.auto_refresh
    }

    pub async fn render(&self) -> String {
        let state = self.state.read().await.clone();

        let mut out = String::new();
        out.push_str(&format!(
            "== Indicators == (auto-refresh {})\n",
            if state.auto_refresh { "on" } else { "off" }
        ));

        if state.overview.indicators.is_empty() && state.loading {
            out.push_str("  loading...\n");
        }
        for ind in &state.overview.indicators {
            let signal = match (ind.buy_signal, ind.sell_signal) {
                (true, false) => " BUY!",
                (false, true) => " SELL!",
                _ => "",
            };
            out.push_str(&format!(
                "  {:<12} {:>12} rsi {:>5.1} macd {:>8.4} trend {:<9} ({:.0}%) vol x{:.2}{}{}\n",
                ind.symbol,
                format_currency(ind.price),
                ind.rsi,
                ind.macd,
                ind.trend.to_string(),
                ind.trend_strength,
                ind.volume_ratio,
                signal,
                ind.bot_assigned
                    .as_deref()
                    .map(|b| format!(" [{b}]"))
                    .unwrap_or_default(),
            ));
        }

        if !state.overview.bots_config.is_empty() {
            out.push_str("\nStrategies:\n");
            for bot in &state.overview.bots_config {
                out.push_str(&format!(
                    "  {:<20} {} / {} {:?}\n    buy:  {}\n    sell: {}\n",
                    bot.name,
                    bot.speed_profile,
                    bot.strategy_type,
                    bot.symbols,
                    bot.buy_conditions,
                    bot.sell_conditions,
                ));
            }
        }
        out
    }
}
