/*
 * Responsibility
 * - Error taxonomy handed to callers of the session core (validation / auth failure / network)
 * - Each variant carries exactly one user-visible message
 * - Startup errors (config, http client) are kept apart from per-call errors
 */
use thiserror::Error;

use crate::config::ConfigError;

/// Shown whenever the auth endpoint cannot be reached or answers without an envelope.
pub const NETWORK_FALLBACK_MESSAGE: &str =
    "Unable to reach the authentication service. Please try again later.";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Input failed pre-submission checks; the gateway was never called.
    #[error("{0}")]
    Validation(String),

    /// The server answered with `success: false`; the message is passed through unmodified.
    #[error("{0}")]
    AuthFailure(String),

    /// Transport failure or a body that is not an envelope. The cause is kept for logs only.
    #[error("{}", NETWORK_FALLBACK_MESSAGE)]
    Network {
        #[source]
        source: Option<BoxError>,
    },
}

impl SessionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self::AuthFailure(message.into())
    }

    pub fn network<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Network {
            source: Some(source.into()),
        }
    }

    pub fn unstructured() -> Self {
        Self::Network { source: None }
    }

    /// The single normalized text a UI shows for this error.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
