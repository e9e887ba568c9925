//! Client-side session core for the task manager API.
//!
//! - [`services::session::SessionStore`]: the current access token, keyed by `TOKEN_NAME`
//! - [`services::session::token_codec`]: decoding, claim lookup, expiration
//! - [`services::auth::HttpAuthGateway`]: login / logout exchange
//! - [`middleware::bearer_auth`]: bearer header injection with exclusions
//! - [`services::session::SessionService`]: the facade built once in [`state::AppState`]
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
