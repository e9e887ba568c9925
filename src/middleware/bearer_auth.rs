/*
 * Responsibility
 * - Attach `Authorization: Bearer <token>` to outbound requests
 * - Skip excluded URLs (login / register) and hosts outside the allowed domains
 * - No expiration check: an expired token that is present is still sent
 */
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Request;
use http::header::{AUTHORIZATION, HeaderValue};
use tower::{Layer, Service};
use url::Url;

use crate::config::Config;
use crate::services::session::SessionStore;

/// Ordered URL prefixes that never receive the header. Fixed after construction.
///
/// A prefix starting with `/` is compared with the URL path, any other prefix
/// with the full URL. Absolute prefixes are stored in the same canonical form
/// `Url` gives request URLs (lowercase host, no default port, no dot segments).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    prefixes: Vec<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for prefix in prefixes {
            let prefix = canonical_prefix(prefix.into());
            if !prefix.is_empty() && !out.contains(&prefix) {
                out.push(prefix);
            }
        }
        Self { prefixes: out }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.exclusion_prefixes())
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_excluded(&self, url: &Url) -> bool {
        self.prefixes.iter().any(|prefix| {
            if prefix.starts_with('/') {
                url.path().starts_with(prefix.as_str())
            } else {
                url.as_str().starts_with(prefix.as_str())
            }
        })
    }
}

fn canonical_prefix(prefix: String) -> String {
    if prefix.starts_with('/') {
        return prefix;
    }
    match Url::parse(&prefix) {
        Ok(url) => url.into(),
        Err(_) => prefix,
    }
}

/// `host[:port]` entries eligible for the header. Empty means no host is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedDomains {
    domains: Vec<String>,
}

impl AllowedDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.into().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
        .to_ascii_lowercase();

        self.domains.iter().any(|d| *d == authority)
    }
}

/// Decides, per request URL, which header value (if any) to inject.
#[derive(Clone, Debug)]
pub struct BearerAuthPolicy {
    store: SessionStore,
    exclusions: Arc<ExclusionSet>,
    allowed: Arc<AllowedDomains>,
}

impl BearerAuthPolicy {
    pub fn new(store: SessionStore, exclusions: ExclusionSet, allowed: AllowedDomains) -> Self {
        Self {
            store,
            exclusions: Arc::new(exclusions),
            allowed: Arc::new(allowed),
        }
    }

    pub fn from_config(config: &Config, store: SessionStore) -> Self {
        Self::new(
            store,
            ExclusionSet::from_config(config),
            AllowedDomains::new(config.allowed_domains.iter().cloned()),
        )
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    pub fn authorization_for(&self, url: &Url) -> Option<HeaderValue> {
        if self.exclusions.is_excluded(url) {
            tracing::debug!(url = %url, "bearer skipped: excluded route");
            return None;
        }
        if !self.allowed.is_allowed(url) {
            tracing::debug!(url = %url, "bearer skipped: domain not allowed");
            return None;
        }

        // An empty stored value attaches nothing, same as no token.
        let token = self.store.get_token().filter(|t| !t.is_empty())?;

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                tracing::debug!(url = %url, "bearer attached");
                Some(value)
            }
            Err(_) => {
                tracing::warn!(url = %url, "stored token is not a valid header value");
                None
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct BearerAuthLayer {
    policy: BearerAuthPolicy,
}

impl BearerAuthLayer {
    pub fn new(policy: BearerAuthPolicy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuth {
            inner,
            policy: self.policy.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BearerAuth<S> {
    inner: S,
    policy: BearerAuthPolicy,
}

impl<S, B> Service<Request<B>> for BearerAuth<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        match Url::parse(&req.uri().to_string()) {
            Ok(url) => {
                if let Some(value) = self.policy.authorization_for(&url) {
                    req.headers_mut().insert(AUTHORIZATION, value);
                }
            }
            Err(_) => tracing::debug!(uri = %req.uri(), "bearer skipped: not an absolute URL"),
        }
        self.inner.call(req)
    }
}
