use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::{ActionAck, BotStatus, DashboardSummary, Page, Position};

/// Snapshot of everything the dashboard and positions pages read.
///
/// Stale-while-revalidate: a failed fetch records `last_error` but never blanks
/// the previously shown data.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub summary: DashboardSummary,
    pub bots: Vec<BotStatus>,
    pub positions: Page<Position>,

    pub summary_loading: bool,
    pub bots_loading: bool,
    pub positions_loading: bool,

    pub last_error: Option<String>,
}

/// Shared store behind the Dashboard and Positions pages. Both poll through
/// it, so one page's refresh keeps the other warm.
pub struct DashboardStore {
    backend: Arc<dyn Backend>,
    inner: RwLock<DashboardData>,
}

impl DashboardStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        DashboardStore {
            backend,
            inner: RwLock::new(DashboardData::default()),
        }
    }

    pub async fn snapshot(&self) -> DashboardData {
        self.inner.read().await.clone()
    }

    pub async fn fetch_summary(&self) {
        self.inner.write().await.summary_loading = true;
        let result = self.backend.summary().await;
        let mut data = self.inner.write().await;
        data.summary_loading = false;
        match result {
            Ok(summary) => {
                data.summary = summary;
                data.last_error = None;
            }
            Err(e) => {
                warn!("Summary fetch failed: {}", e);
                data.last_error = Some(e.user_message("Could not load summary"));
            }
        }
    }

    pub async fn fetch_bots(&self) {
        self.inner.write().await.bots_loading = true;
        let result = self.backend.bots_status().await;
        let mut data = self.inner.write().await;
        data.bots_loading = false;
        match result {
            Ok(bots) => {
                data.bots = bots;
                data.last_error = None;
            }
            Err(e) => {
                warn!("Bot status fetch failed: {}", e);
                data.last_error = Some(e.user_message("Could not load bot status"));
            }
        }
    }

    pub async fn fetch_positions(&self, page: u32, per_page: u32) {
        self.inner.write().await.positions_loading = true;
        let result = self.backend.positions(page, per_page).await;
        let mut data = self.inner.write().await;
        data.positions_loading = false;
        match result {
            Ok(positions) => {
                data.positions = positions;
                data.last_error = None;
            }
            Err(e) => {
                warn!("Positions fetch failed: {}", e);
                data.last_error = Some(e.user_message("Could not load positions"));
            }
        }
    }

    pub async fn start_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let ack = self.backend.start_bot(name).await?;
        self.fetch_bots().await;
        Ok(ack)
    }

    pub async fn stop_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let ack = self.backend.stop_bot(name).await?;
        self.fetch_bots().await;
        Ok(ack)
    }

    pub async fn restart_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let ack = self.backend.restart_bot(name).await?;
        self.fetch_bots().await;
        Ok(ack)
    }
}
