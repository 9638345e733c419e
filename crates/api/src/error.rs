use domain::Envelope;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure: connection refused, DNS, TLS, timeout.
    #[error("cannot reach server: {0}")]
    Unreachable(String),

    /// The server answered, but not with the expected success signal.
    #[error("request rejected (status {status}, code {})", .code.as_deref().unwrap_or("-"))]
    Rejected {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    /// Missing or schema-violating body.
    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("client setup failed: {0}")]
    Setup(String),
}

impl ApiError {
    pub(crate) fn rejected(status: StatusCode, envelope: Option<&Envelope>) -> Self {
        ApiError::Rejected {
            status: status.as_u16(),
            code: envelope.and_then(|e| e.code.clone()),
            message: envelope.and_then(|e| e.message().map(str::to_string)),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Unreachable(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            ApiError::Setup(e.to_string())
        } else if e.is_decode() {
            ApiError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Rejected {
                status: status.as_u16(),
                code: None,
                message: None,
            }
        } else {
            ApiError::Unreachable(e.to_string())
        }
    }
}
