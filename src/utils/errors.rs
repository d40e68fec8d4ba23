use thiserror::Error;

/// Main error type for the session proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upstream pipeline timed out")]
    UpstreamTimeout,

    #[error("Upstream pipeline unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream pipeline error ({0}): {1}")]
    UpstreamError(u16, String),

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProxyError {
    /// True when the caller sent something the proxy refuses to forward
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProxyError::InvalidRequest(_))
    }

    /// Text shown to the chat user in place of an answer
    pub fn user_message(&self) -> String {
        match self {
            ProxyError::InvalidRequest(reason) => format!("Invalid request: {}", reason),
            ProxyError::UpstreamTimeout => {
                "Request timeout: the assistant took too long to respond. Please try again."
                    .to_string()
            }
            ProxyError::UpstreamUnavailable(_) => {
                "Service unavailable: could not reach the assistant. Please try again later."
                    .to_string()
            }
            ProxyError::UpstreamError(status, _) => format!(
                "Service error: the assistant returned status {}. Please try again later.",
                status
            ),
            ProxyError::MalformedResponse(_) => {
                "Service error: the assistant returned an unreadable reply.".to_string()
            }
            ProxyError::ConfigError(_) | ProxyError::IoError(_) => "Service unavailable".to_string(),
        }
    }
}
