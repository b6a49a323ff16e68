/// Acknowledgement of a fire-and-forget mutation. The caller never merges this
/// into local state; it re-fetches to observe the effect.
#[derive(Debug, Clone, Default)]
pub struct ActionAck {
    pub message: Option<String>,
}

impl ActionAck {
    pub fn with_message(message: impl Into<String>) -> Self {
        ActionAck {
            message: Some(message.into()),
        }
    }
}
