use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::api::Backend;
use crate::config::Config;
use crate::models::{AuditEvent, AuditFilter, AuditSummary, Severity};
use crate::pages::{active_notice, Notice};

#[derive(Debug, Clone, Default)]
struct AuditState {
    events: Vec<AuditEvent>,
    summary: AuditSummary,
    filter: AuditFilter,
    loading: bool,
    /// Fetches for an already-changed filter are dropped on arrival.
    epoch: u64,
    notice: Option<Notice>,
}

/// Read-only audit trail with server-side filtering and CSV export.
///
/// No poller: the trail is refetched on mount and whenever the filter
/// changes, never on a timer.
pub struct AuditPage {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<AuditState>>,
    notice_ttl: Duration,
}

impl AuditPage {
    pub fn new(cfg: &Config, backend: Arc<dyn Backend>) -> Self {
        AuditPage {
            backend,
            state: Arc::new(RwLock::new(AuditState::default())),
            notice_ttl: Duration::from_secs(cfg.notice_ttl_secs),
        }
    }

    pub async fn mount(&self) {
        Self::refresh(&self.backend, &self.state).await;
    }

    async fn refresh(backend: &Arc<dyn Backend>, state: &Arc<RwLock<AuditState>>) {
        let (filter, epoch) = {
            let mut s = state.write().await;
            s.loading = true;
            s.epoch += 1;
            (s.filter.clone(), s.epoch)
        };

        let (events, summary) = tokio::join!(backend.audit_events(&filter), backend.audit_summary());

        let mut s = state.write().await;
        if s.epoch != epoch {
            return;
        }
        s.loading = false;
        match events {
            Ok(events) => s.events = events,
            Err(e) => {
                warn!("Audit fetch failed: {}", e);
                s.notice = Some(Notice::error(e.user_message("Could not load audit events")));
            }
        }
        if let Ok(summary) = summary {
            s.summary = summary;
        }
    }

    pub async fn set_filter(
        &self,
        event_type: Option<String>,
        source: Option<String>,
        severity: Option<Severity>,
    ) {
        {
            let mut state = self.state.write().await;
            state.filter.event_type = event_type;
            state.filter.source = source;
            state.filter.severity = severity;
        }
        Self::refresh(&self.backend, &self.state).await;
    }

    pub async fn set_limit(&self, limit: u32) {
        self.state.write().await.filter.limit = limit.max(1);
        Self::refresh(&self.backend, &self.state).await;
    }

    /// Ask the backend to export the (optionally type-filtered) trail.
    pub async fn export(&self) {
        let event_type = self.state.read().await.filter.event_type.clone();
        let result = self.backend.audit_export(event_type.as_deref()).await;
        self.state.write().await.notice = Some(match result {
            Ok(ack) => Notice::success(
                ack.message
                    .unwrap_or_else(|| "Audit export started".to_string()),
            ),
            Err(e) => Notice::error(e.user_message("Export failed")),
        });
    }

    pub async fn render(&self) -> String {
        let state = self.state.read().await.clone();

        let mut out = String::new();
        out.push_str("== Audit ==\n");
        if let Some(notice) = active_notice(&state.notice, self.notice_ttl) {
            out.push_str(&notice.render());
            out.push('\n');
        }

        let f = &state.filter;
        out.push_str(&format!(
            "filter: limit {} type {} source {} severity {}\n",
            f.limit,
            f.event_type.as_deref().unwrap_or("*"),
            f.source.as_deref().unwrap_or("*"),
            f.severity.map(|s| s.to_string()).unwrap_or_else(|| "*".to_string()),
        ));
        out.push_str(&format!("{} events total\n", state.summary.total_events));

        if state.events.is_empty() && state.loading {
            out.push_str("  loading...\n");
        }
        for event in &state.events {
            out.push_str(&format!(
                "  {} [{:<8}] {:<24} {} -> {} {}\n",
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                event.severity.to_string(),
                event.event_type,
                event.source,
                event.target,
                event.action,
            ));
        }
        out
    }
}
