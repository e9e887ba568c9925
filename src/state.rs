/*
 * Responsibility
 * - The shared context built once at startup (config, session facade, http client)
 * - Clone is cheap (Arc inside); hand it to every consumer instead of reaching for globals
 */
use std::sync::Arc;

use crate::config::Config;
use crate::error::SetupError;
use crate::middleware::http::AuthorizedClient;
use crate::services::build_session_service;
use crate::services::session::{SessionService, SessionStorage};

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionService>,
    pub http: AuthorizedClient,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn SessionStorage>) -> Result<Self, SetupError> {
        let session = build_session_service(&config, storage)?;
        // API calls read the same store the session writes.
        let http = AuthorizedClient::new(&config, session.store().clone())?;

        Ok(Self {
            config: Arc::new(config),
            session,
            http,
        })
    }
}
