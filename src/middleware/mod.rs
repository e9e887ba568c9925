/*
 * Responsibility
 * - Outbound request middleware (tower layers over `http::Request<reqwest::Body>`)
 * - bearer_auth: authorization header injection, http: the composed client stack
 */
pub mod bearer_auth;
pub mod http;

pub use bearer_auth::{AllowedDomains, BearerAuthLayer, BearerAuthPolicy, ExclusionSet};
pub use self::http::AuthorizedClient;
