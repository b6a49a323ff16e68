use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[serde(alias = "ALTA")]
    Up,
    #[serde(alias = "QUEDA")]
    Down,
    #[default]
    #[serde(alias = "LATERAL")]
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "UP"),
            Trend::Down => write!(f, "DOWN"),
            Trend::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

/// Server-computed indicator snapshot for one symbol; display values only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub rsi: f64,
    #[serde(default)]
    pub macd: f64,
    #[serde(default)]
    pub macd_signal: f64,
    #[serde(default)]
    pub trend: Trend,
    #[serde(default)]
    pub trend_strength: f64,
    #[serde(default)]
    pub sma20: f64,
    #[serde(default)]
    pub ema9: f64,
    #[serde(default)]
    pub ema21: f64,
    #[serde(default)]
    pub volume_ratio: f64,
    #[serde(default)]
    pub buy_signal: bool,
    #[serde(default)]
    pub sell_signal: bool,
    #[serde(default)]
    pub bot_assigned: Option<String>,
}

/// How a bot's strategy reads the indicators, shown alongside the snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotStrategyProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub speed_profile: String,
    #[serde(default)]
    pub strategy_type: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub buy_conditions: String,
    #[serde(default)]
    pub sell_conditions: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorsOverview {
    #[serde(default)]
    pub indicators: Vec<IndicatorSnapshot>,
    #[serde(default)]
    pub bots_config: Vec<BotStrategyProfile>,
}

/// Per-bot lifetime performance for the Comparison page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotPerformance {
    #[serde(default)]
    pub bot_type: String,
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub wins: u64,
    #[serde(default)]
    pub losses: u64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub total_pnl: f64,
    #[serde(default)]
    pub daily_pnl: f64,
    #[serde(default)]
    pub avg_profit_per_trade: f64,
    #[serde(default)]
    pub avg_duration_min: f64,
    #[serde(default)]
    pub best_trade: f64,
    #[serde(default)]
    pub worst_trade: f64,
    #[serde(default)]
    pub current_streak: i64,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PnlPoint {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub cumulative: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PnlChart {
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub points: Vec<PnlPoint>,
}
