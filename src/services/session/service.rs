/*
 * Responsibility
 * - The single session facade the application talks to
 *   (is_authenticated / login / logout / get_claim / is_expired)
 * - Store writes happen strictly after the gateway confirms; the status channel
 *   is published after the write
 * - Loading flag is held for the duration of every gateway call
 *
 * Lifecycle
 * - Built once at startup (`AppState::new`) and shared by reference (`Arc`)
 * - Dropped at shutdown; an explicit `logout` is the only thing that clears the session
 */
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::info;

use crate::error::SessionError;
use crate::services::auth::{AuthApi, AuthTokens, Credentials};
use crate::services::session::store::SessionStore;
use crate::services::session::token_codec::{self, ClaimLookup};

/// Session state as seen through the facade's own transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    LoggedOut,
    LoggedIn,
}

/// UI "loading" indicator. True while at least one gateway call is in flight.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicUsize>);

impl LoadingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag until the returned guard is dropped.
    pub fn begin(&self) -> LoadingGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        LoadingGuard(self.0.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

#[must_use = "the loading flag drops back as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LoadingGuard(Arc<AtomicUsize>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct SessionService {
    store: SessionStore,
    gateway: Arc<dyn AuthApi>,
    loading: LoadingFlag,
    status: watch::Sender<SessionStatus>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("store", &self.store)
            .field("loading", &self.loading.is_loading())
            .field("status", &*self.status.borrow())
            .finish()
    }
}

impl SessionService {
    pub fn new(store: SessionStore, gateway: Arc<dyn AuthApi>) -> Self {
        let initial = if store.get_token().is_some() {
            SessionStatus::LoggedIn
        } else {
            SessionStatus::LoggedOut
        };
        let (status, _) = watch::channel(initial);

        Self {
            store,
            gateway,
            loading: LoadingFlag::new(),
            status,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Presence check only. An expired token still counts; see [`SessionService::is_expired`].
    pub fn is_authenticated(&self) -> bool {
        self.store.get_token().is_some()
    }

    /// Re-decodes the stored token against the current clock. No token is expired.
    pub fn is_expired(&self) -> bool {
        match self.store.get_token() {
            Some(token) => token_codec::is_expired(&token),
            None => true,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.store.get_token() {
            Some(token) => token_codec::is_expired_at(&token, now),
            None => true,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        token_codec::expires_at(&self.store.get_token()?)
    }

    pub fn claim(&self, field: &str) -> ClaimLookup {
        match self.store.get_token() {
            Some(token) => token_codec::lookup_claim(&token, field),
            None => ClaimLookup::Undecodable,
        }
    }

    /// `None`: no session / undecodable token. `Some("")`: token without `field`.
    pub fn get_claim(&self, field: &str) -> Option<String> {
        self.claim(field).into_string()
    }

    pub fn username(&self) -> String {
        self.get_claim("username").unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Receives a new status after each login/logout transition has been applied to the store.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Validate, exchange credentials, then store the access token.
    ///
    /// The previous token is untouched unless a new one is confirmed.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, SessionError> {
        let credentials = Credentials::new(email, password)?;

        let tokens = {
            let _loading = self.loading.begin();
            self.gateway.login(&credentials).await?
        };

        self.store.set_token(&tokens.access_token);
        self.status.send_replace(SessionStatus::LoggedIn);
        info!("session started");

        Ok(tokens)
    }

    /// Clears the session only once the server acknowledged the logout.
    ///
    /// On failure the stored token is left in place.
    pub async fn logout(&self) -> Result<(), SessionError> {
        {
            let _loading = self.loading.begin();
            self.gateway.logout().await?;
        }

        self.store.clear_session();
        self.status.send_replace(SessionStatus::LoggedOut);
        info!("session cleared");

        Ok(())
    }
}
