use thiserror::Error;

/// Uniform failure returned by every store, service and query call.
///
/// Cloneable so one failed fetch can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("{message}")]
    Backend {
        message: String,
        code: Option<String>,
    },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected row shape: {0}")]
    Decode(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            code: None,
        }
    }

    /// Human-readable text suitable for an alert or error banner
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_bare_message() {
        let err = Error::Backend {
            message: "permission denied for table listing".into(),
            code: Some("42501".into()),
        };
        assert_eq!(err.message(), "permission denied for table listing");
    }

    #[test]
    fn not_found_is_detectable() {
        assert!(Error::NotFound("listing not found".into()).is_not_found());
        assert!(!Error::backend("boom").is_not_found());
    }
}
