use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Aggregate account snapshot, replaced wholesale on each successful fetch.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DashboardSummary {
    #[serde(default)]
    pub total_balance: f64,
    #[serde(default)]
    pub available_balance: f64,
    #[serde(default)]
    pub in_positions: f64,
    #[serde(default)]
    pub pnl_today: f64,
    #[serde(default)]
    pub pnl_week: f64,
    #[serde(default)]
    pub pnl_month: f64,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub active_bots: u32,
    #[serde(default)]
    pub open_positions: u32,
    #[serde(default)]
    pub win_rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotStatus {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub pnl_today: f64,
    #[serde(default)]
    pub pnl_total: f64,
    #[serde(default)]
    pub trades_today: u64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub open_positions: u32,
    #[serde(default)]
    pub capital_allocated: f64,
}

impl BotStatus {
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// An open position. `id` is stable across fetches while the position is open;
/// it disappears from the result set once closed server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub id: u64,
    pub bot_name: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub current_price: f64,
    pub quantity: f64,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub pnl_percent: f64,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
}

/// A closed position: an immutable historical record.
#[derive(Debug, Clone, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub bot_name: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub pnl_percent: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: f64,
}

/// Server-side pagination envelope.
///
/// The explicit bound stops the derive from also requiring `T: Default` for
/// the defaulted `items` field; `Vec<T>` has its own empty default.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct Page<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub pages: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Page {
            items: Vec::new(),
            total: 0,
            page: 1,
            pages: 1,
        }
    }
}
