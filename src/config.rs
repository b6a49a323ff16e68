use std::sync::Arc;

/// Console configuration, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the trading backend, including the `/api` prefix.
    pub api_base_url: String,
    /// File the bearer token is persisted to across restarts.
    pub token_file: String,

    // Polling periods (seconds)
    pub fast_poll_secs: u64,
    pub slow_poll_secs: u64,
    pub health_poll_secs: u64,

    /// How long transient success/error notices stay visible.
    pub notice_ttl_secs: u64,
    /// Delay before re-fetching after a mutation that needs server-side settling.
    pub settle_delay_secs: u64,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            token_file: ".ops_console_token".to_string(),
            fast_poll_secs: 10,
            slow_poll_secs: 30,
            health_poll_secs: 30,
            notice_ttl_secs: 4,
            settle_delay_secs: 2,
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let num = |key: &str, default: u64| -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };

        let defaults = Config::default();
        Config {
            api_base_url: env("OPS_API_URL", &defaults.api_base_url),
            token_file: env("OPS_TOKEN_FILE", &defaults.token_file),
            fast_poll_secs: num("OPS_FAST_POLL_SECS", defaults.fast_poll_secs),
            slow_poll_secs: num("OPS_SLOW_POLL_SECS", defaults.slow_poll_secs),
            health_poll_secs: num("OPS_HEALTH_POLL_SECS", defaults.health_poll_secs),
            notice_ttl_secs: num("OPS_NOTICE_TTL_SECS", defaults.notice_ttl_secs),
            settle_delay_secs: num("OPS_SETTLE_DELAY_SECS", defaults.settle_delay_secs),
            log_level: env("OPS_LOG_LEVEL", &defaults.log_level),
        }
    }

    pub fn shared(self) -> Arc<Config> {
        Arc::new(self)
    }
}
