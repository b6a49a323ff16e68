use serde::Deserialize;

/// One specialized bot as shown on the BotControl page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotControlInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bot_type: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub pnl_today: f64,
    #[serde(default)]
    pub open_positions: u32,
}

/// The exclusive-mode bot. When enabled, the backend pauses every specialized
/// bot; the client only renders that fact and gates the toggles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnicoBotStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub portfolio_size: u32,
    #[serde(default)]
    pub strategy: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotControlOverview {
    #[serde(default)]
    pub bots: Vec<BotControlInfo>,
    #[serde(default)]
    pub unico_bot: Option<UnicoBotStatus>,
}

impl BotControlOverview {
    pub fn unico_active(&self) -> bool {
        self.unico_bot.as_ref().is_some_and(|u| u.enabled)
    }
}
