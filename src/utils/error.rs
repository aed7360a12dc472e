use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigiaError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Notify error: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VigiaError {
    /// Whether this error disables the job it occurred in. Fetch and parse
    /// failures are assumed non-transient (page markup changed or the
    /// listing is gone); store and delivery failures are retried on the
    /// next cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VigiaError::Network(_) | VigiaError::Parse(_))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, VigiaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = VigiaError::Parse("missing price element".to_string());
        assert_eq!(err.to_string(), "Parse error: missing price element");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: VigiaError = io_err.into();
        assert!(matches!(err, VigiaError::Io(_)));
    }

    #[test]
    fn test_terminal_classification() {
        assert!(VigiaError::Parse("bad markup".to_string()).is_terminal());
        assert!(!VigiaError::Notify("delivery failed".to_string()).is_terminal());
        assert!(!VigiaError::Store(sqlx::Error::PoolClosed).is_terminal());
        assert!(!VigiaError::Internal("oops".to_string()).is_terminal());
    }
}
