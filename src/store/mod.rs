//! Remote content store: the `ContentApi` seam, its GitHub and in-memory
//! backends, and the `ContentClient` the rest of the crate talks to.

pub mod api;
pub mod client;
pub mod error;
pub mod github;
pub mod memory;
pub mod paths;
pub mod retry;
pub mod types;

pub use api::ContentApi;
pub use client::ContentClient;
pub use error::StoreError;
pub use github::GithubApi;
pub use memory::MemoryContentApi;
pub use retry::{BackoffPolicy, RetryPolicy};
pub use types::{DirEntry, EntryKind, FileContents, PutRequest, RemoteContents, WriteReceipt};
