pub mod credentials;
pub mod dto;
pub mod gateway;

pub use credentials::Credentials;
pub use dto::{ApiResponse, AuthTokens};
pub use gateway::{AuthApi, HttpAuthGateway};
