//! Error types for cloudflare-ddns.

use crate::selector::ResolutionError;
use thiserror::Error;

/// Result type alias for cloudflare-ddns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
///
/// Provider calls can fail at three distinct layers: the request never got a
/// response (`Network`), the response had a non-2xx status (`Http`), or the
/// provider answered but reported failure or sent a malformed envelope
/// (`Api`). None of them may be mistaken for success.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Missing or invalid setting.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure: connect, timeout, body read.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status code.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The provider reported failure, or its envelope could not be used.
    #[error("API error: {0}")]
    Api(String),

    /// No single record could be chosen to manage.
    #[error("Record resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DdnsError {
    /// Short name of the layer that failed, used as a log field.
    pub fn layer(&self) -> &'static str {
        match self {
            DdnsError::Config(_) => "config",
            DdnsError::Network(_) => "transport",
            DdnsError::Http { .. } => "http",
            DdnsError::Api(_) => "application",
            DdnsError::Resolution(_) => "resolution",
            DdnsError::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_names() {
        assert_eq!(DdnsError::Network("refused".into()).layer(), "transport");
        assert_eq!(
            DdnsError::Http {
                status: 403,
                message: "forbidden".into()
            }
            .layer(),
            "http"
        );
        assert_eq!(DdnsError::Api("success=false".into()).layer(), "application");
        assert_eq!(
            DdnsError::from(ResolutionError::NoTargetSpecified).layer(),
            "resolution"
        );
    }

    #[test]
    fn test_http_display() {
        let err = DdnsError::Http {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }
}
