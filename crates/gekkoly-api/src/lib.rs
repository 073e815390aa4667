// gekkoly-api: Async Rust client for the myGekko QueryApi.

pub mod client;
pub mod credentials;
pub mod error;
pub mod transport;

pub use client::QueryApiClient;
pub use credentials::Credentials;
pub use error::{ApiError, status_message};
pub use transport::TransportConfig;
