use thiserror::Error;

/// Failure taxonomy for every backend call.
///
/// A 401 anywhere becomes `Unauthorized`; the adapter has already cleared the
/// persisted token by the time the caller sees it. Everything else propagates
/// unmodified so each page controller can pick its own user-facing message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized: {detail}")]
    Unauthorized { detail: String },

    #[error("API error {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Server-supplied detail text, if any came back with the failure.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail } | ApiError::Status { detail, .. }
                if !detail.is_empty() =>
            {
                Some(detail)
            }
            _ => None,
        }
    }

    /// Detail text when present, otherwise the caller's generic fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}
