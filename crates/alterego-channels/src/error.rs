use thiserror::Error;

/// Errors that can occur within any channel adapter.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The underlying transport could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The channel rejected the supplied credentials or token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// A previously valid login session is no longer accepted.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// The platform asked us to slow down.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// An operation exceeded its allowed time budget.
    #[error("Operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The channel-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The adapter does not support this operation (e.g. polling a push-only channel).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl ChannelError {
    /// Whether the adapter must re-run `connect` before it can be used again.
    pub fn needs_reconnect(&self) -> bool {
        matches!(
            self,
            ChannelError::SessionExpired(_)
                | ChannelError::AuthFailed(_)
                | ChannelError::ConnectionFailed(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            ChannelError::ConnectionFailed(_) => "CONNECTION_FAILED",
            ChannelError::SendFailed(_) => "SEND_FAILED",
            ChannelError::AuthFailed(_) => "AUTH_FAILED",
            ChannelError::SessionExpired(_) => "SESSION_EXPIRED",
            ChannelError::RateLimited { .. } => "RATE_LIMITED",
            ChannelError::Timeout { .. } => "TIMEOUT",
            ChannelError::ConfigError(_) => "CONFIG_ERROR",
            ChannelError::Unsupported(_) => "UNSUPPORTED",
        }
    }
}
