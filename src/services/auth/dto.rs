use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope returned by every REST endpoint.
///
/// `data` is kept untyped here: failure envelopes carry `null` or a string
/// where success envelopes carry the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Tokens issued by a successful login.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .finish()
    }
}

/// Request body for `POST /auth/login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}
