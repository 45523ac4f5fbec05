pub mod api_types;
pub mod client;
pub mod source;

pub use api_types::RemoteBlogRow;
pub use client::PostgrestClient;
pub use source::{Direction, RemoteSource};
