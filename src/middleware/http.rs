//! Outbound HTTP stack shared by the auth gateway and every other API call.
//!
//! Responsibility:
//! - Request-Id generation (X-Request-Id) for correlation with server logs
//! - Bearer injection (see `bearer_auth`)
//! - Global timeout
//!
//! The layers run over `http::Request<reqwest::Body>`; conversion to and from
//! reqwest's own types happens only at the transport and in [`AuthorizedClient::execute`].
//! Every request the application sends should go through [`AuthorizedClient`];
//! a request built elsewhere never sees the interceptor.

use std::time::Duration;

use http::header::HeaderName;
use serde::Serialize;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt, service_fn};
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};

use crate::config::Config;
use crate::error::SetupError;
use crate::middleware::bearer_auth::{BearerAuthLayer, BearerAuthPolicy};
use crate::services::session::SessionStore;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub type HttpRequest = http::Request<reqwest::Body>;
pub type HttpResponse = http::Response<reqwest::Body>;
pub type HttpService = BoxCloneSyncService<HttpRequest, HttpResponse, BoxError>;

/// HTTP client whose requests all pass through the bearer interceptor.
///
/// Cheap to clone; clones share the transport and the session store.
#[derive(Clone)]
pub struct AuthorizedClient {
    // Only used to build `reqwest::Request`s.
    builder: reqwest::Client,
    service: HttpService,
}

impl std::fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedClient").finish_non_exhaustive()
    }
}

impl AuthorizedClient {
    pub fn new(config: &Config, store: SessionStore) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder().build()?;
        let policy = BearerAuthPolicy::from_config(config, store);

        let transport_client = client.clone();
        let transport = service_fn(move |req: HttpRequest| {
            let client = transport_client.clone();
            async move {
                let req = reqwest::Request::try_from(req)?;
                let res = client.execute(req).await?;
                Ok::<_, BoxError>(HttpResponse::from(res))
            }
        });

        Ok(Self::with_transport(
            client,
            config.request_timeout,
            policy,
            transport,
        ))
    }

    /// Build the stack over an arbitrary transport service.
    ///
    /// Layers (outermost first): timeout, request id, bearer, transport.
    pub fn with_transport<T>(
        builder: reqwest::Client,
        timeout: Duration,
        policy: BearerAuthPolicy,
        transport: T,
    ) -> Self
    where
        T: Service<HttpRequest, Response = HttpResponse> + Clone + Send + Sync + 'static,
        T::Error: Into<BoxError>,
        T::Future: Send + 'static,
    {
        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .layer(SetRequestIdLayer::new(
                HeaderName::from_static(REQUEST_ID_HEADER),
                MakeRequestUuid,
            ))
            .layer(BearerAuthLayer::new(policy))
            .service(transport);

        Self {
            builder,
            service: BoxCloneSyncService::new(service),
        }
    }

    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        let request = HttpRequest::try_from(request)?;
        let mut service = self.service.clone();
        let response = service.ready().await?.call(request).await?;
        Ok(reqwest::Response::from(response))
    }

    pub async fn get(&self, url: &str) -> Result<reqwest::Response, BoxError> {
        let request = self.builder.get(url).build()?;
        self.execute(request).await
    }

    pub async fn post_json<B>(&self, url: &str, body: &B) -> Result<reqwest::Response, BoxError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.builder.post(url).json(body).build()?;
        self.execute(request).await
    }
}
