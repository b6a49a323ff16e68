pub mod audit;
pub mod bot_control;
pub mod comparison;
pub mod config_page;
pub mod dashboard;
pub mod indicators;
pub mod positions;
pub mod trades;

pub use audit::AuditPage;
pub use bot_control::BotControlPage;
pub use comparison::{ComparisonPage, SortKey};
pub use config_page::ConfigPage;
pub use dashboard::DashboardPage;
pub use indicators::IndicatorsPage;
pub use positions::PositionsPage;
pub use trades::TradesPage;

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// Transient status line shown after an action. Auto-dismisses: render paths
/// drop it once its TTL has elapsed rather than running a dismissal timer.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    posted_at: Instant,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Notice::post(NoticeKind::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice::post(NoticeKind::Error, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Notice::post(NoticeKind::Info, text)
    }

    fn post(kind: NoticeKind, text: impl Into<String>) -> Self {
        Notice {
            kind,
            text: text.into(),
            posted_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.posted_at.elapsed() >= ttl
    }

    pub fn render(&self) -> String {
        let tag = match self.kind {
            NoticeKind::Success => "OK",
            NoticeKind::Error => "ERR",
            NoticeKind::Info => "--",
        };
        format!("[{tag}] {}", self.text)
    }
}

/// Still-visible notice, or `None` once expired.
pub fn active_notice(notice: &Option<Notice>, ttl: Duration) -> Option<&Notice> {
    notice.as_ref().filter(|n| !n.is_expired(ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_expires_after_ttl() {
        let notice = Notice::success("saved");
        assert!(!notice.is_expired(Duration::from_secs(4)));
        assert!(notice.is_expired(Duration::ZERO));
    }

    #[test]
    fn active_notice_filters_expired() {
        let notice = Some(Notice::info("hello"));
        assert!(active_notice(&notice, Duration::from_secs(4)).is_some());
        assert!(active_notice(&notice, Duration::ZERO).is_none());
    }
}
