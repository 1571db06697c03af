pub mod client;
pub mod error;
pub mod session;
pub mod types;

pub use client::UpstreamClient;
pub use error::UpstreamError;
pub use session::Session;
pub use types::{ContentItem, Envelope};
