use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::warn;

use crate::api::Backend;
use crate::config::Config;
use crate::models::{BotConfig, GlobalConfig, Percent, RsiThresholds};
use crate::pages::{active_notice, Notice};

/// Preset multipliers applied to a bot's current parameters. The same scale
/// never drives values outside the safety limits below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskProfile {
    UltraConservative,
    Conservative,
    Normal,
    Aggressive,
    UltraAggressive,
}

struct Multipliers {
    take_profit: f64,
    stop_loss: f64,
    max_positions: f64,
    amount: f64,
}

impl RiskProfile {
    fn multipliers(self) -> Multipliers {
        match self {
            RiskProfile::UltraConservative => Multipliers {
                take_profit: 0.5,
                stop_loss: 0.5,
                max_positions: 0.3,
                amount: 0.3,
            },
            RiskProfile::Conservative => Multipliers {
                take_profit: 0.7,
                stop_loss: 0.7,
                max_positions: 0.5,
                amount: 0.5,
            },
            RiskProfile::Normal => Multipliers {
                take_profit: 1.0,
                stop_loss: 1.0,
                max_positions: 1.0,
                amount: 1.0,
            },
            RiskProfile::Aggressive => Multipliers {
                take_profit: 1.2,
                stop_loss: 1.2,
                max_positions: 1.0,
                amount: 1.0,
            },
            RiskProfile::UltraAggressive => Multipliers {
                take_profit: 1.3,
                stop_loss: 1.3,
                max_positions: 1.0,
                amount: 1.0,
            },
        }
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "ultra_conservative" => Ok(RiskProfile::UltraConservative),
            "conservative" => Ok(RiskProfile::Conservative),
            "normal" => Ok(RiskProfile::Normal),
            "aggressive" => Ok(RiskProfile::Aggressive),
            "ultra_aggressive" => Ok(RiskProfile::UltraAggressive),
            other => Err(format!("unknown risk profile {other:?}")),
        }
    }
}

// Hard bounds on what a profile (or a typo) can produce.
const STOP_LOSS_RANGE: (f64, f64) = (0.5, 5.0);
const TAKE_PROFIT_RANGE: (f64, f64) = (0.3, 5.0);
const MAX_POSITIONS_RANGE: (u32, u32) = (1, 5);
const AMOUNT_RANGE: (f64, f64) = (10.0, 100.0);

/// Scale a bot's parameters by a profile, clamped to the safety limits.
pub fn apply_profile(cfg: &mut BotConfig, profile: RiskProfile) {
    let m = profile.multipliers();
    cfg.take_profit = Percent(
        (cfg.take_profit.0 * m.take_profit).clamp(TAKE_PROFIT_RANGE.0, TAKE_PROFIT_RANGE.1),
    );
    cfg.stop_loss =
        Percent((cfg.stop_loss.0 * m.stop_loss).clamp(STOP_LOSS_RANGE.0, STOP_LOSS_RANGE.1));
    cfg.max_positions = ((cfg.max_positions as f64 * m.max_positions).round() as u32)
        .clamp(MAX_POSITIONS_RANGE.0, MAX_POSITIONS_RANGE.1);
    cfg.amount_per_trade =
        (cfg.amount_per_trade * m.amount).clamp(AMOUNT_RANGE.0, AMOUNT_RANGE.1);
}

#[derive(Debug, Clone, Default)]
struct ConfigState {
    global: GlobalConfig,
    bots: IndexMap<String, BotConfig>,
    selected: Option<String>,
    dirty_bots: HashSet<String>,
    global_dirty: bool,
    loading: bool,
    notice: Option<Notice>,
}

/// Editable trading parameters. The whole page is a form: fetched once on
/// mount, edited locally, pushed on an explicit save. No poller, so a poll
/// tick can never clobber half-typed values.
pub struct ConfigPage {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<ConfigState>>,
    notice_ttl: Duration,
}

impl ConfigPage {
    pub fn new(cfg: &Config, backend: Arc<dyn Backend>) -> Self {
        ConfigPage {
            backend,
            state: Arc::new(RwLock::new(ConfigState::default())),
            notice_ttl: Duration::from_secs(cfg.notice_ttl_secs),
        }
    }

    pub async fn mount(&self) {
        self.state.write().await.loading = true;
        let (global, bots) = tokio::join!(self.backend.global_config(), self.backend.bot_configs());

        let mut state = self.state.write().await;
        state.loading = false;
        match global {
            Ok(g) => state.global = g,
            Err(e) => {
                warn!("Global config fetch failed: {}", e);
                state.notice = Some(Notice::error(e.user_message("Could not load config")));
            }
        }
        match bots {
            Ok(b) => {
                if state.selected.is_none() {
                    state.selected = b.keys().next().cloned();
                }
                state.bots = b;
                state.dirty_bots.clear();
                state.global_dirty = false;
            }
            Err(e) => {
                warn!("Bot configs fetch failed: {}", e);
                state.notice = Some(Notice::error(e.user_message("Could not load bot configs")));
            }
        }
    }

    pub async fn select_bot(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        if state.bots.contains_key(name) {
            state.selected = Some(name.to_string());
            true
        } else {
            state.notice = Some(Notice::error(format!("Unknown bot {name:?}")));
            false
        }
    }

    async fn edit_selected(&self, edit: impl FnOnce(&mut BotConfig)) {
        let mut state = self.state.write().await;
        let Some(name) = state.selected.clone() else {
            state.notice = Some(Notice::error("No bot selected"));
            return;
        };
        if let Some(cfg) = state.bots.get_mut(&name) {
            edit(cfg);
            state.dirty_bots.insert(name);
        }
    }

    pub async fn set_amount(&self, amount: f64) {
        self.edit_selected(|cfg| cfg.amount_per_trade = amount).await;
    }

    pub async fn set_take_profit(&self, pct: f64) {
        self.edit_selected(|cfg| cfg.take_profit = Percent(pct)).await;
    }

    pub async fn set_stop_loss(&self, pct: f64) {
        self.edit_selected(|cfg| cfg.stop_loss = Percent(pct)).await;
    }

    pub async fn set_max_positions(&self, n: u32) {
        self.edit_selected(|cfg| cfg.max_positions = n).await;
    }

    pub async fn apply_risk_profile(&self, profile: RiskProfile) {
        self.edit_selected(|cfg| apply_profile(cfg, profile)).await;
    }

    pub async fn set_global(&self, monthly_target: f64, risk_per_trade: f64, max_daily_loss: f64) {
        let mut state = self.state.write().await;
        state.global.monthly_target = monthly_target;
        state.global.risk_per_trade = risk_per_trade;
        state.global.max_daily_loss = max_daily_loss;
        state.global_dirty = true;
    }

    // Dynamic take-profit schedule rows
    pub async fn tp_add(&self, pct: f64) {
        self.edit_selected(|cfg| {
            cfg.dynamic_take_profit.add_with_default_label(Percent(pct));
        })
        .await;
    }

    pub async fn tp_set(&self, label: &str, pct: f64) {
        self.edit_selected(|cfg| cfg.dynamic_take_profit.set(label, Percent(pct)))
            .await;
    }

    pub async fn tp_remove(&self, label: &str) {
        self.edit_selected(|cfg| {
            cfg.dynamic_take_profit.remove(label);
        })
        .await;
    }

    // Dynamic RSI schedule rows
    pub async fn rsi_add(&self, buy: f64, sell: f64) {
        self.edit_selected(|cfg| {
            cfg.dynamic_rsi.add_with_default_label(RsiThresholds {
                buy: Percent(buy),
                sell: Percent(sell),
            });
        })
        .await;
    }

    pub async fn rsi_set(&self, label: &str, buy: f64, sell: f64) {
        self.edit_selected(|cfg| {
            cfg.dynamic_rsi.set(
                label,
                RsiThresholds {
                    buy: Percent(buy),
                    sell: Percent(sell),
                },
            )
        })
        .await;
    }

    pub async fn rsi_remove(&self, label: &str) {
        self.edit_selected(|cfg| {
            cfg.dynamic_rsi.remove(label);
        })
        .await;
    }

    /// Flip a bot's enabled flag through the dedicated enable/disable routes.
    /// Optimistic: the flag flips locally first and rolls back on failure.
    pub async fn toggle_enabled(&self, name: &str) {
        let target = {
            let mut state = self.state.write().await;
            let Some(cfg) = state.bots.get_mut(name) else {
                state.notice = Some(Notice::error(format!("Unknown bot {name:?}")));
                return;
            };
            cfg.enabled = !cfg.enabled;
            cfg.enabled
        };

        let result = if target {
            self.backend.enable_bot(name).await
        } else {
            self.backend.disable_bot(name).await
        };

        let mut state = self.state.write().await;
        match result {
            Ok(ack) => {
                let mut text = format!(
                    "{name} {}",
                    if target { "enabled" } else { "disabled" }
                );
                if ack.restart_scheduled {
                    text.push_str(" (restart scheduled)");
                }
                state.notice = Some(Notice::success(text));
            }
            Err(e) => {
                if let Some(cfg) = state.bots.get_mut(name) {
                    cfg.enabled = !target;
                }
                state.notice = Some(Notice::error(e.user_message("Toggle failed")));
            }
        }
    }

    /// Push everything edited since the last fetch. One notice summarizes how
    /// many saved items need a backend restart to take effect.
    pub async fn save(&self) {
        let (global, dirty) = {
            let state = self.state.read().await;
            let global = state.global_dirty.then(|| state.global.clone());
            let dirty: Vec<(String, BotConfig)> = state
                .dirty_bots
                .iter()
                .filter_map(|name| state.bots.get(name).map(|cfg| (name.clone(), cfg.clone())))
                .collect();
            (global, dirty)
        };

        if global.is_none() && dirty.is_empty() {
            self.state.write().await.notice = Some(Notice::info("Nothing to save"));
            return;
        }

        let mut restarts = 0usize;
        let mut failures: Vec<String> = Vec::new();

        if let Some(ref g) = global {
            match self.backend.update_global_config(g).await {
                Ok(ack) => {
                    if ack.restart_scheduled {
                        restarts += 1;
                    }
                }
                Err(e) => failures.push(e.user_message("global config save failed")),
            }
        }

        let mut saved_bots: Vec<String> = Vec::new();
        for (name, cfg) in &dirty {
            match self.backend.update_bot_config(name, cfg).await {
                Ok(ack) => {
                    if ack.restart_scheduled {
                        restarts += 1;
                    }
                    saved_bots.push(name.clone());
                }
                Err(e) => failures.push(e.user_message(&format!("{name} save failed"))),
            }
        }

        let mut state = self.state.write().await;
        if global.is_some() && failures.is_empty() {
            state.global_dirty = false;
        }
        for name in &saved_bots {
            state.dirty_bots.remove(name);
        }

        state.notice = Some(if failures.is_empty() {
            if restarts > 0 {
                Notice::success(format!(
                    "Configuration saved. {restarts} item(s) scheduled for restart."
                ))
            } else {
                Notice::success("Configuration saved.")
            }
        } else {
            Notice::error(failures.join("; "))
        });
    }

    pub async fn render(&self) -> String {
        let state = self.state.read().await.clone();

        let mut out = String::new();
        out.push_str("== Config ==\n");
        if let Some(notice) = active_notice(&state.notice, self.notice_ttl) {
            out.push_str(&notice.render());
            out.push('\n');
        }

        let g = &state.global;
        out.push_str(&format!(
            "Global: monthly target {:.1}% | risk/trade {:.1}% | max daily loss {:.1}%{}\n",
            g.monthly_target,
            g.risk_per_trade,
            g.max_daily_loss,
            if state.global_dirty { " *" } else { "" },
        ));

        for (name, cfg) in state.bots.iter() {
            let marker = match (&state.selected, state.dirty_bots.contains(name)) {
                (Some(sel), true) if sel == name => "> *",
                (Some(sel), false) if sel == name => ">  ",
                (_, true) => "  *",
                _ => "   ",
            };
            out.push_str(&format!(
                "{marker}{:<20} [{}] amount ${:.0} tp {:.2}% sl {:.2}% max {} {:?}\n",
                name,
                if cfg.enabled { "on " } else { "off" },
                cfg.amount_per_trade,
                cfg.take_profit.0,
                cfg.stop_loss.0,
                cfg.max_positions,
                cfg.symbols,
            ));
            for (label, pct) in cfg.dynamic_take_profit.iter() {
                out.push_str(&format!("      tp@{label}: {:.2}%\n", pct.0));
            }
            for (label, rsi) in cfg.dynamic_rsi.iter() {
                out.push_str(&format!(
                    "      rsi@{label}: buy<{:.0} sell>{:.0}\n",
                    rsi.buy.0, rsi.sell.0
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> BotConfig {
        BotConfig {
            name: "bot_estavel".to_string(),
            enabled: true,
            amount_per_trade: 50.0,
            take_profit: Percent(1.5),
            stop_loss: Percent(1.0),
            max_positions: 3,
            ..BotConfig::default()
        }
    }

    #[test]
    fn profile_scales_parameters() {
        let mut cfg = base_config();
        apply_profile(&mut cfg, RiskProfile::Conservative);
        assert!((cfg.take_profit.0 - 1.05).abs() < 1e-9);
        assert!((cfg.stop_loss.0 - 0.7).abs() < 1e-9);
        assert_eq!(cfg.max_positions, 2);
        assert!((cfg.amount_per_trade - 25.0).abs() < 1e-9);
    }

    #[test]
    fn profile_respects_safety_limits() {
        let mut cfg = base_config();
        cfg.stop_loss = Percent(0.6);
        cfg.amount_per_trade = 20.0;
        apply_profile(&mut cfg, RiskProfile::UltraConservative);
        // 0.6 * 0.5 = 0.3, clamped up to the 0.5 floor
        assert!((cfg.stop_loss.0 - 0.5).abs() < 1e-9);
        // 20 * 0.3 = 6, clamped up to the $10 floor
        assert!((cfg.amount_per_trade - 10.0).abs() < 1e-9);
        assert_eq!(cfg.max_positions, 1);

        let mut cfg = base_config();
        cfg.take_profit = Percent(4.5);
        apply_profile(&mut cfg, RiskProfile::UltraAggressive);
        // 4.5 * 1.3 = 5.85, clamped to the 5.0 ceiling
        assert!((cfg.take_profit.0 - 5.0).abs() < 1e-9);
    }

    #[test]
    fn normal_profile_is_identity_within_limits() {
        let mut cfg = base_config();
        let before = cfg.clone();
        apply_profile(&mut cfg, RiskProfile::Normal);
        assert_eq!(cfg, before);
    }

    #[test]
    fn profile_parses_both_spellings() {
        assert_eq!(
            "ultra-conservative".parse::<RiskProfile>().unwrap(),
            RiskProfile::UltraConservative
        );
        assert_eq!(
            "AGGRESSIVE".parse::<RiskProfile>().unwrap(),
            RiskProfile::Aggressive
        );
        assert!("reckless".parse::<RiskProfile>().is_err());
    }
}
