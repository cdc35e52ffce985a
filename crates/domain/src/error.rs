/// Shared error type used across all crates in this workspace.
///
/// Variants map to the fixed HTTP status table at the API boundary
/// (`mandrake::error::ApiError`); see `Error::kind`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("busy: {0}")]
    Busy(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("{0}")]
    Other(String),
}

/// Error kind, used to pick an HTTP status at the API boundary (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    ValidationError,
    NotFound,
    Conflict,
    Busy,
    ServiceUnavailable,
    NotImplemented,
    Internal,
}

impl Error {
    /// Classify this error for the HTTP boundary. Anything not one of the
    /// explicitly named kinds is `Internal` ("anything else" row of the
    /// error table).
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::ValidationError(_) => ErrorKind::ValidationError,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Busy(_) => ErrorKind::Busy,
            Error::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::Io(_)
            | Error::Json(_)
            | Error::Http(_)
            | Error::Timeout(_)
            | Error::Provider { .. }
            | Error::Config(_)
            | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification_matches_error_table() {
        assert_eq!(Error::BadRequest("x".into()).kind(), ErrorKind::BadRequest);
        assert_eq!(Error::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::Busy("x".into()).kind(), ErrorKind::Busy);
        assert_eq!(Error::Other("x".into()).kind(), ErrorKind::Internal);
    }
}
