use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity {other:?}")),
        }
    }
}

/// Append-only, server-owned audit record; the client only reads and filters.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditSummary {
    #[serde(default)]
    pub total_events: u64,
    #[serde(default)]
    pub by_type: HashMap<String, u64>,
    #[serde(default)]
    pub by_severity: HashMap<String, u64>,
    #[serde(default)]
    pub by_source: HashMap<String, u64>,
}

/// Query-side filter for `GET /audit/events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFilter {
    pub limit: u32,
    pub event_type: Option<String>,
    pub source: Option<String>,
    pub severity: Option<Severity>,
}

impl Default for AuditFilter {
    fn default() -> Self {
        AuditFilter {
            limit: 100,
            event_type: None,
            source: None,
            severity: None,
        }
    }
}

impl AuditFilter {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(ref t) = self.event_type {
            if &event.event_type != t {
                return false;
            }
        }
        if let Some(ref s) = self.source {
            if &event.source != s {
                return false;
            }
        }
        if let Some(sev) = self.severity {
            if event.severity != sev {
                return false;
            }
        }
        true
    }
}
