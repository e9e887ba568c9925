pub mod service;
pub mod store;
pub mod token_codec;

pub use service::{LoadingFlag, LoadingGuard, SessionService, SessionStatus};
pub use store::{MemorySessionStorage, SessionStorage, SessionStore};
pub use token_codec::{ClaimLookup, Claims};
