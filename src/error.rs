//! Error types for the dynamic reports library.

/// All errors that can occur while driving a report view.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// HTTP transport failed.
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or a placeholder.
        message: String,
    },

    /// The server rejected a remote call (access error, validation, ...).
    #[error("remote call `{method}` failed ({code}): {message}")]
    Remote {
        /// Model method that was called.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// Server-provided error message.
        message: String,
    },

    /// The server did not accept the configured credentials.
    #[error("authentication rejected for `{login}`")]
    Authentication {
        /// Login that was rejected.
        login: String,
    },

    /// The configured server URL is not a valid base URL.
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required configuration value was not provided.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// The host failed to render a template.
    #[error("template `{template}` failed to render: {message}")]
    Render {
        /// Template identifier.
        template: String,
        /// Renderer error message.
        message: String,
    },

    /// An in-process backend failed (e.g. a poisoned lock).
    #[error("backend error: {0}")]
    Backend(Box<dyn core::error::Error + Send + Sync>),
}

impl ReportError {
    /// Returns `true` if the error came from the remote side: transport,
    /// HTTP status, a rejected call, or rejected credentials.
    ///
    /// These are never recovered locally; the view keeps its last
    /// rendered content.
    #[inline]
    #[must_use]
    pub const fn is_remote_call(&self) -> bool {
        match *self {
            #[cfg(any(feature = "async", feature = "blocking"))]
            Self::Http(_) => true,
            Self::Api { .. } | Self::Remote { .. } | Self::Authentication { .. } => true,
            Self::Url(_)
            | Self::Serialization(_)
            | Self::MissingConfig(_)
            | Self::Render { .. }
            | Self::Backend(_) => false,
        }
    }
}

/// Convenience alias for results with [`ReportError`].
pub type Result<T> = core::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = ReportError::from(serde_err);
        assert!(matches!(err, ReportError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
        assert!(!err.is_remote_call());
    }

    #[test]
    fn remote_display_names_method() {
        let err = ReportError::Remote {
            method: "create".to_owned(),
            code: 200,
            message: "Access Denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("`create`"));
        assert!(msg.contains("Access Denied"));
        assert!(err.is_remote_call());
    }

    #[test]
    fn api_and_auth_are_remote_calls() {
        let api = ReportError::Api {
            status: 502,
            message: "bad gateway".to_owned(),
        };
        assert!(api.is_remote_call());
        let auth = ReportError::Authentication {
            login: "admin".to_owned(),
        };
        assert!(auth.is_remote_call());
        assert!(auth.to_string().contains("admin"));
    }

    #[test]
    fn render_error_is_local() {
        let err = ReportError::Render {
            template: "report.ledger_table".to_owned(),
            message: "boom".to_owned(),
        };
        assert!(!err.is_remote_call());
        assert!(err.to_string().contains("report.ledger_table"));
    }

    #[test]
    fn backend_display() {
        let inner = std::io::Error::other("lock poisoned");
        let err = ReportError::Backend(Box::new(inner));
        assert!(err.to_string().contains("lock poisoned"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReportError>();
    }
}
