//! Feed API: wire types, domain types, transport and client.

pub mod api_types;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::FeedClient;
pub use transport::{HttpTransport, ReqwestTransport};
