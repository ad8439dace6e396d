use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlterEgoError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup validation found one or more unusable settings.
    #[error("Invalid configuration: {}", .problems.join("; "))]
    InvalidConfig { problems: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AlterEgoError {
    /// Short error code string, used in log fields and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AlterEgoError::Config(_) => "CONFIG_ERROR",
            AlterEgoError::InvalidConfig { .. } => "INVALID_CONFIG",
            AlterEgoError::Io(_) => "IO_ERROR",
            AlterEgoError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AlterEgoError>;
