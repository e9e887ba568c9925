/*
 * Responsibility
 * - Read the client configuration once at process start (API_URL, TOKEN_NAME, ALLOWED_DOMAINS ...)
 * - Validate values (fail at startup instead of at request time)
 * - Components receive the resolved `Config`; nothing reads the environment later
 */
use std::fmt;
use std::time::Duration;

use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/rest/api/v1";
pub const DEFAULT_TOKEN_NAME: &str = "access_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,

    // Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    // Session storage key holding the access token.
    pub token_name: String,
    // `host[:port]` entries allowed to receive the bearer header.
    pub allowed_domains: Vec<String>,

    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same parsing as [`Config::from_env`], against an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let api_url = lookup("API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = normalize_api_url(&api_url)?;

        let token_name = lookup("TOKEN_NAME")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string());

        let mut allowed_domains = lookup("ALLOWED_DOMAINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        if allowed_domains.is_empty() {
            allowed_domains.push(authority_of(&api_url)?);
        }

        let request_timeout_seconds = match lookup("REQUEST_TIMEOUT_SECONDS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"))?,
            None => 30,
        };

        Ok(Self {
            app_env,
            api_url,
            token_name,
            allowed_domains,
            request_timeout: Duration::from_secs(request_timeout_seconds),
        })
    }

    /// Configuration pointing at `api_url` with every other value defaulted.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        let api_url = api_url.to_string();
        Self::from_lookup(move |key| match key {
            "API_URL" => Some(api_url.clone()),
            _ => None,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    pub fn login_url(&self) -> String {
        self.endpoint("auth/login")
    }

    pub fn logout_url(&self) -> String {
        self.endpoint("auth/logout")
    }

    pub fn register_url(&self) -> String {
        self.endpoint("auth/register")
    }

    /// URL prefixes that never receive an injected bearer header.
    pub fn exclusion_prefixes(&self) -> Vec<String> {
        vec![self.login_url(), self.register_url()]
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw).map_err(|_| ConfigError::Invalid("API_URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::Invalid("API_URL"));
    }
    // Canonical form, so prefixes built from it match request URLs as sent.
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn authority_of(api_url: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(api_url).map_err(|_| ConfigError::Invalid("API_URL"))?;
    let host = parsed.host_str().ok_or(ConfigError::Invalid("API_URL"))?;
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
