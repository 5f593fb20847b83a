use http::StatusCode;
use indexmap::IndexMap;

use crate::types::ErrorBody;

/// Everything that can go wrong talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        field_errors: IndexMap<String, String>,
    },

    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("unexpected response for {context}")]
    Malformed {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Classify a non-2xx response. `what` names the resource for
    /// not-found messages.
    pub fn from_response(status: StatusCode, body: &str, what: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .clone()
            .or_else(|| {
                let text = body.trim();
                (!text.is_empty() && text.len() < 200 && !text.starts_with('<'))
                    .then(|| text.to_owned())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_owned()
            });

        match status {
            StatusCode::NOT_FOUND => Self::NotFound {
                what: what.to_owned(),
            },
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Self::Forbidden { message },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation {
                message,
                field_errors: parsed.errors,
            },
            _ => Self::Status { status, message },
        }
    }

    pub fn malformed(context: &str, source: serde_json::Error) -> Self {
        Self::Malformed {
            context: context.to_owned(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Field-level messages from a validation failure.
    pub fn field_errors(&self) -> IndexMap<String, String> {
        match self {
            Self::Validation { field_errors, .. } => field_errors.clone(),
            _ => IndexMap::new(),
        }
    }

    /// One line suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(e) if e.is_timeout() => "the server took too long to respond".to_owned(),
            Self::Transport(_) => "cannot reach the server".to_owned(),
            Self::NotFound { what } => format!("{what} not found"),
            Self::Forbidden { .. } => "you don't have permission to do that".to_owned(),
            Self::Validation { message, .. } => message.clone(),
            Self::Status { status, .. } if status.is_server_error() => {
                format!("server error ({})", status.as_u16())
            }
            Self::Status { status, message } => format!("{message} ({})", status.as_u16()),
            Self::Malformed { .. } => "unexpected response from the server".to_owned(),
        }
    }

    /// Wording for a failed delete of `what`.
    pub fn delete_message(&self, what: &str) -> String {
        match self {
            Self::Forbidden { .. } => format!("you don't have permission to delete this {what}"),
            Self::NotFound { .. } => format!("{what} not found or already deleted"),
            other => other.user_message(),
        }
    }
}
