/// Factory: build the process-wide `SessionService` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::error::SetupError;
use crate::middleware::http::AuthorizedClient;
use crate::services::auth::HttpAuthGateway;
use crate::services::session::{SessionService, SessionStorage, SessionStore};

/// The gateway's client is built over the session's own store, so logout carries its bearer token.
pub fn build_session_service(
    config: &Config,
    storage: Arc<dyn SessionStorage>,
) -> Result<Arc<SessionService>, SetupError> {
    let store = SessionStore::new(storage, &config.token_name);
    let http = AuthorizedClient::new(config, store.clone())?;
    let gateway = HttpAuthGateway::new(http, config);
    Ok(Arc::new(SessionService::new(store, Arc::new(gateway))))
}
