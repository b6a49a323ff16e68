use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Liveness probe payload from `GET /health`, polled independently of routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub uptime_human: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
