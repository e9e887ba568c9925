/*
 * Responsibility
 * - Credential exchange with `POST {apiUrl}/auth/login` and `GET {apiUrl}/auth/logout`
 * - Classify every outcome once: tokens / server message / fixed network fallback
 * - No retries and no session-store writes here (the facade owns the store)
 */
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SessionError;
use crate::middleware::http::AuthorizedClient;
use crate::services::auth::credentials::Credentials;
use crate::services::auth::dto::{ApiResponse, AuthTokens, LoginRequest};

/// Network side of the session: login and logout against the auth endpoint.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthTokens, SessionError>;

    async fn logout(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Clone)]
pub struct HttpAuthGateway {
    http: AuthorizedClient,
    login_url: String,
    logout_url: String,
}

impl HttpAuthGateway {
    pub fn new(http: AuthorizedClient, config: &Config) -> Self {
        Self {
            http,
            login_url: config.login_url(),
            logout_url: config.logout_url(),
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<(StatusCode, Vec<u8>), SessionError> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            warn!(error = %e, %status, "failed to read auth response body");
            SessionError::network(e)
        })?;
        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl AuthApi for HttpAuthGateway {
    async fn login(&self, credentials: &Credentials) -> Result<AuthTokens, SessionError> {
        debug!(email = credentials.email(), "login request");

        let body = LoginRequest {
            email: credentials.email(),
            password: credentials.password(),
        };
        let response = self
            .http
            .post_json(&self.login_url, &body)
            .await
            .map_err(|e| {
                warn!(error = %e, "login request failed");
                SessionError::network(e)
            })?;

        let (status, body) = Self::read_body(response).await?;
        classify_login(status, &body)
    }

    async fn logout(&self) -> Result<(), SessionError> {
        let response = self.http.get(&self.logout_url).await.map_err(|e| {
            warn!(error = %e, "logout request failed");
            SessionError::network(e)
        })?;

        let (status, body) = Self::read_body(response).await?;
        classify_logout(status, &body)
    }
}

fn parse_envelope(body: &[u8]) -> Option<ApiResponse<Value>> {
    serde_json::from_slice::<ApiResponse<Value>>(body).ok()
}

/// Map a login response to tokens or a normalized error.
///
/// The envelope decides, whatever the HTTP status: `success:false` yields the
/// server message verbatim, a success envelope without a usable access token
/// or a body that is not an envelope yields the network fallback.
pub fn classify_login(status: StatusCode, body: &[u8]) -> Result<AuthTokens, SessionError> {
    let Some(envelope) = parse_envelope(body) else {
        warn!(%status, "login response is not an envelope");
        return Err(SessionError::unstructured());
    };

    if !envelope.success {
        warn!(%status, message = %envelope.message, "login rejected");
        return Err(SessionError::auth_failure(envelope.message));
    }

    let tokens = envelope
        .data
        .and_then(|data| serde_json::from_value::<AuthTokens>(data).ok())
        .filter(|tokens| !tokens.access_token.is_empty());

    match tokens {
        Some(tokens) => {
            info!(%status, "login accepted");
            Ok(tokens)
        }
        None => {
            warn!(%status, "login envelope carries no access token");
            Err(SessionError::unstructured())
        }
    }
}

/// A logout is acknowledged on 2xx unless the body is an envelope with `success:false`.
pub fn classify_logout(status: StatusCode, body: &[u8]) -> Result<(), SessionError> {
    let envelope = parse_envelope(body);

    match (status.is_success(), envelope) {
        (true, Some(envelope)) if !envelope.success => {
            warn!(%status, message = %envelope.message, "logout rejected");
            Err(SessionError::auth_failure(envelope.message))
        }
        (true, _) => {
            info!(%status, "logout acknowledged");
            Ok(())
        }
        (false, Some(envelope)) => {
            warn!(%status, message = %envelope.message, "logout rejected");
            Err(SessionError::auth_failure(envelope.message))
        }
        (false, None) => {
            warn!(%status, "logout failed without envelope");
            Err(SessionError::unstructured())
        }
    }
}
