use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Numeric config value that tolerates the server's percent-suffixed string
/// encoding (`"1.5%"`, `"1.5"` or `1.5`) and always serializes back as a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Percent(pub f64);

impl From<f64> for Percent {
    fn from(v: f64) -> Self {
        Percent(v)
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(Percent(n)),
            Repr::Text(s) => {
                let trimmed = s.trim().trim_end_matches('%').trim();
                trimmed
                    .parse::<f64>()
                    .map(Percent)
                    .map_err(|_| D::Error::custom(format!("invalid numeric value {s:?}")))
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("schedule label {0:?} already exists")]
pub struct DuplicateLabel(pub String);

/// Ordered mapping from a free-form time-window label ("60min") to a payload.
///
/// All add/edit/remove goes through these methods so label collisions and key
/// generation stay in one place instead of ad-hoc map mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Schedule<T>(IndexMap<String, T>);

impl<T> Default for Schedule<T> {
    fn default() -> Self {
        Schedule(IndexMap::new())
    }
}

impl<T> Schedule<T> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, label: &str) -> Option<&T> {
        self.0.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.0.iter()
    }

    /// Insert a new row under an explicit label; collisions are rejected.
    pub fn add(&mut self, label: &str, value: T) -> Result<(), DuplicateLabel> {
        if self.0.contains_key(label) {
            return Err(DuplicateLabel(label.to_string()));
        }
        self.0.insert(label.to_string(), value);
        Ok(())
    }

    /// Insert a new row under a generated non-colliding label, stepping
    /// through `60min`, `90min`, `120min`, ... until a free slot is found.
    pub fn add_with_default_label(&mut self, value: T) -> String {
        let mut minutes = 60u32;
        loop {
            let label = format!("{minutes}min");
            if !self.0.contains_key(&label) {
                self.0.insert(label.clone(), value);
                return label;
            }
            minutes += 30;
        }
    }

    /// Overwrite (or create) a row.
    pub fn set(&mut self, label: &str, value: T) {
        self.0.insert(label.to_string(), value);
    }

    /// Remove a row, preserving the order of the remaining entries.
    pub fn remove(&mut self, label: &str) -> Option<T> {
        self.0.shift_remove(label)
    }
}

/// Time-window RSI entry/exit thresholds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RsiThresholds {
    pub buy: Percent,
    pub sell: Percent,
}

/// Per-bot trading parameters as edited on the Config page. The whole struct is
/// local form state between fetch and explicit save.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub amount_per_trade: f64,
    #[serde(default)]
    pub take_profit: Percent,
    #[serde(default)]
    pub stop_loss: Percent,
    #[serde(default)]
    pub max_positions: u32,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Schedule::is_empty")]
    pub dynamic_take_profit: Schedule<Percent>,
    #[serde(default, skip_serializing_if = "Schedule::is_empty")]
    pub dynamic_rsi: Schedule<RsiThresholds>,
}

/// Global (cross-bot) parameters. Unknown server keys round-trip untouched
/// through `extra` so a save never drops fields this client does not edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    #[serde(default)]
    pub monthly_target: f64,
    #[serde(default)]
    pub risk_per_trade: f64,
    #[serde(default)]
    pub max_daily_loss: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Acknowledgement of a config mutation. `restart_scheduled` means the change
/// only takes effect after a backend component restart; a missing flag on the
/// wire counts as `false`.
#[derive(Debug, Clone, Default)]
pub struct UpdateAck {
    pub restart_scheduled: bool,
    pub message: Option<String>,
}
