/*
 * Responsibility
 * - Session core: token storage, token decoding, auth exchange and the facade over them
 * - No HTTP framework types leak out except the outbound reqwest stack
 */
pub mod auth;
pub mod factory;
pub mod session;

pub use factory::build_session_service;
