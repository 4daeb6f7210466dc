pub mod config;
pub mod error;
pub mod handlers;
pub mod news;
pub mod server;
pub mod token;

pub use config::{EdgeConfig, MediaCredentials};
pub use error::ApiError;
pub use server::{create_router, run, AppContext};
pub use token::{JoinClaims, JoinToken, MediaTokenIssuer, TokenError};
