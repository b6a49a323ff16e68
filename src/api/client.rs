use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{header::AUTHORIZATION, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::Backend;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    ActionAck, AuditEvent, AuditFilter, AuditSummary, BotConfig, BotControlOverview,
    BotPerformance, BotStatus, DashboardSummary, GlobalConfig, Health, IndicatorsOverview,
    LoginResponse, Page, PnlChart, Position, Trade, UpdateAck, User,
};
use crate::session::TokenStore;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotStatusList {
    #[serde(default)]
    bots: Vec<BotStatus>,
}

#[derive(Debug, Deserialize)]
struct PerformanceList {
    #[serde(default)]
    performances: Vec<BotPerformance>,
}

#[derive(Debug, Deserialize)]
struct AuditEventList {
    #[serde(default)]
    events: Vec<AuditEvent>,
}

/// `{success, message, error, data}` wrapper used by the action, config and
/// audit route groups. Dashboard reads come back bare.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl RawEnvelope {
    fn failure_detail(error: Option<String>, detail: Option<String>) -> ApiError {
        ApiError::Status {
            status: 200,
            detail: error.or(detail).unwrap_or_default(),
        }
    }

    fn into_ack(self) -> Result<ActionAck, ApiError> {
        if !self.success {
            return Err(Self::failure_detail(self.error, self.detail));
        }
        let message = self.message.or_else(|| {
            self.data
                .as_ref()
                .and_then(|d| d.get("message"))
                .and_then(|v| v.as_str())
                .map(String::from)
        });
        Ok(ActionAck { message })
    }

    fn into_update_ack(self) -> Result<UpdateAck, ApiError> {
        if !self.success {
            return Err(Self::failure_detail(self.error, self.detail));
        }
        let restart_scheduled = self
            .data
            .as_ref()
            .and_then(|d| d.get("restart_scheduled"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(UpdateAck {
            restart_scheduled,
            message: self.message,
        })
    }

    fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(Self::failure_detail(self.error, self.detail));
        }
        let data = self.data.ok_or_else(|| ApiError::Status {
            status: 200,
            detail: "missing data in response".to_string(),
        })?;
        Ok(serde_json::from_value(data)?)
    }
}

/// HTTP adapter over the trading backend.
///
/// Attaches the persisted bearer token to every call, and centralizes 401
/// handling: the token is cleared and the `unauthorized` watch channel bumped
/// so the shell can force navigation to the login route. Other failures
/// propagate unmodified; there is no retry and no application-level timeout.
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    unauthorized: watch::Sender<u64>,
}

impl ApiClient {
    pub fn new(cfg: &Config, tokens: Arc<TokenStore>) -> Self {
        let (unauthorized, _) = watch::channel(0);
        ApiClient {
            http: Client::new(),
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            tokens,
            unauthorized,
        }
    }

    /// Receiver that changes whenever the adapter observes a 401.
    pub fn watch_unauthorized(&self) -> watch::Receiver<u64> {
        self.unauthorized.subscribe()
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        debug!("{} {}", method, path);

        let mut req = self.http.request(method, format!("{}{}", self.base_url, path));
        if !query.is_empty() {
            req = req.query(query);
        }
        let had_session = match self.tokens.get() {
            Some(token) => {
                req = req.header(AUTHORIZATION, format!("Bearer {token}"));
                true
            }
            None => false,
        };
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.detail.or(b.error))
                .unwrap_or_default();

            if status == StatusCode::UNAUTHORIZED {
                // A rejected login is not an expired session; only signal the
                // shell when a token was actually presented.
                if had_session {
                    warn!("401 on {path}; clearing session");
                    self.expire_session();
                }
                return Err(ApiError::Unauthorized { detail });
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(resp.json::<T>().await?)
    }

    fn expire_session(&self) {
        self.tokens.clear();
        self.unauthorized.send_modify(|n| *n = n.wrapping_add(1));
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, query, None).await
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.request(
            Method::POST,
            "/auth/login",
            &[],
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    async fn me(&self) -> Result<User, ApiError> {
        self.get("/auth/me", &[]).await
    }

    async fn summary(&self) -> Result<DashboardSummary, ApiError> {
        self.get("/dashboard/summary", &[]).await
    }

    async fn bots_status(&self) -> Result<Vec<BotStatus>, ApiError> {
        let list: BotStatusList = self.get("/dashboard/bots/status", &[]).await?;
        Ok(list.bots)
    }

    async fn positions(&self, page: u32, per_page: u32) -> Result<Page<Position>, ApiError> {
        self.get(
            "/dashboard/positions",
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    async fn trades(&self, page: u32, per_page: u32) -> Result<Page<Trade>, ApiError> {
        self.get(
            "/dashboard/trades",
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    async fn pnl_chart(&self, period: &str) -> Result<PnlChart, ApiError> {
        self.get("/dashboard/chart/pnl", &[("period", period.to_string())])
            .await
    }

    async fn indicators(&self) -> Result<IndicatorsOverview, ApiError> {
        self.get("/dashboard/indicators", &[]).await
    }

    async fn comparison(&self) -> Result<Vec<BotPerformance>, ApiError> {
        let list: PerformanceList = self.get("/dashboard/comparison", &[]).await?;
        Ok(list.performances)
    }

    async fn global_config(&self) -> Result<GlobalConfig, ApiError> {
        self.get("/config/global", &[]).await
    }

    async fn update_global_config(&self, cfg: &GlobalConfig) -> Result<UpdateAck, ApiError> {
        let env: RawEnvelope = self
            .request(
                Method::PUT,
                "/config/global",
                &[],
                Some(serde_json::to_value(cfg)?),
            )
            .await?;
        env.into_update_ack()
    }

    async fn bot_configs(&self) -> Result<IndexMap<String, BotConfig>, ApiError> {
        self.get("/config/bots", &[]).await
    }

    async fn update_bot_config(&self, name: &str, cfg: &BotConfig) -> Result<UpdateAck, ApiError> {
        let env: RawEnvelope = self
            .request(
                Method::PUT,
                &format!("/config/bots/{name}"),
                &[],
                Some(serde_json::to_value(cfg)?),
            )
            .await?;
        env.into_update_ack()
    }

    async fn enable_bot(&self, name: &str) -> Result<UpdateAck, ApiError> {
        let env: RawEnvelope = self
            .request(Method::POST, &format!("/config/bots/{name}/enable"), &[], None)
            .await?;
        env.into_update_ack()
    }

    async fn disable_bot(&self, name: &str) -> Result<UpdateAck, ApiError> {
        let env: RawEnvelope = self
            .request(Method::POST, &format!("/config/bots/{name}/disable"), &[], None)
            .await?;
        env.into_update_ack()
    }

    async fn start_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut query = Vec::new();
        if let Some(name) = name {
            query.push(("bot_name", name.to_string()));
        }
        let env: RawEnvelope = self
            .request(Method::POST, "/actions/bot/start", &query, None)
            .await?;
        env.into_ack()
    }

    async fn stop_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut query = Vec::new();
        if let Some(name) = name {
            query.push(("bot_name", name.to_string()));
        }
        let env: RawEnvelope = self
            .request(Method::POST, "/actions/bot/stop", &query, None)
            .await?;
        env.into_ack()
    }

    async fn restart_bot(&self, name: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut query = Vec::new();
        if let Some(name) = name {
            query.push(("bot_name", name.to_string()));
        }
        let env: RawEnvelope = self
            .request(Method::POST, "/actions/bot/restart", &query, None)
            .await?;
        env.into_ack()
    }

    async fn emergency_stop(&self) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(Method::POST, "/actions/emergency/stop", &[], None)
            .await?;
        env.into_ack()
    }

    async fn clear_emergency(&self) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(Method::POST, "/actions/emergency/clear", &[], None)
            .await?;
        env.into_ack()
    }

    async fn liquidate_all(&self, confirm: bool) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(
                Method::POST,
                "/actions/liquidate/all",
                &[("confirm", confirm.to_string())],
                None,
            )
            .await?;
        env.into_ack()
    }

    async fn close_position(&self, id: u64, reason: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut query = Vec::new();
        if let Some(reason) = reason {
            query.push(("reason", reason.to_string()));
        }
        let env: RawEnvelope = self
            .request(
                Method::POST,
                &format!("/actions/position/{id}/close"),
                &query,
                None,
            )
            .await?;
        env.into_ack()
    }

    async fn restart_bot_type(&self, bot_type: &str, reason: &str) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(
                Method::POST,
                "/actions/restart-bot",
                &[],
                Some(json!({ "bot_type": bot_type, "reason": reason })),
            )
            .await?;
        env.into_ack()
    }

    async fn restart_all(&self, reason: &str) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(
                Method::POST,
                "/actions/restart-all",
                &[],
                Some(json!({ "reason": reason })),
            )
            .await?;
        env.into_ack()
    }

    async fn stop_bot_type(&self, bot_type: &str, reason: &str) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(
                Method::POST,
                "/actions/stop-bot",
                &[],
                Some(json!({ "bot_type": bot_type, "reason": reason })),
            )
            .await?;
        env.into_ack()
    }

    async fn bot_control(&self) -> Result<BotControlOverview, ApiError> {
        self.get("/bots/control", &[]).await
    }

    async fn toggle_bot(&self, bot_type: &str, enabled: bool) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(
                Method::POST,
                "/bots/control/toggle",
                &[],
                Some(json!({ "bot_type": bot_type, "enabled": enabled })),
            )
            .await?;
        env.into_ack()
    }

    async fn set_unico_bot(&self, enabled: bool) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(
                Method::POST,
                "/bots/control/unico-bot",
                &[],
                Some(json!({ "enabled": enabled })),
            )
            .await?;
        env.into_ack()
    }

    async fn restart_system(&self) -> Result<ActionAck, ApiError> {
        let env: RawEnvelope = self
            .request(Method::POST, "/bots/control/restart", &[], None)
            .await?;
        env.into_ack()
    }

    async fn audit_events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, ApiError> {
        let mut query = vec![("limit", filter.limit.to_string())];
        if let Some(ref t) = filter.event_type {
            query.push(("event_type", t.clone()));
        }
        if let Some(ref s) = filter.source {
            query.push(("source", s.clone()));
        }
        if let Some(sev) = filter.severity {
            query.push(("severity", sev.as_str().to_string()));
        }
        let env: RawEnvelope = self.get("/audit/events", &query).await?;
        let list: AuditEventList = env.into_data()?;
        Ok(list.events)
    }

    async fn audit_summary(&self) -> Result<AuditSummary, ApiError> {
        let env: RawEnvelope = self.get("/audit/events/summary", &[]).await?;
        env.into_data()
    }

    async fn audit_export(&self, event_type: Option<&str>) -> Result<ActionAck, ApiError> {
        let mut query = Vec::new();
        if let Some(t) = event_type {
            query.push(("event_type", t.to_string()));
        }
        let env: RawEnvelope = self
            .request(Method::POST, "/audit/export", &query, None)
            .await?;
        env.into_ack()
    }

    async fn health(&self) -> Result<Health, ApiError> {
        self.get("/health", &[]).await
    }
}
