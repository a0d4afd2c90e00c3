//! Failure classes of a gateway call.

/// Why a backend call failed.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced an HTTP response (connect, timeout, TLS, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend returned status {0}")]
    BadStatus(u16),

    /// 2xx response whose payload lacks the expected shape.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::BadStatus(code) => Some(*code),
            _ => None,
        }
    }
}
