//! Storage backends for gated files
//!
//! Files are stored either under a local directory or in an S3-compatible
//! bucket. The resolver inspects which backend is active to decide between
//! pre-signed remote URLs and indirect gated URLs.

mod backend;
mod local;
mod object_client;

pub use backend::FileStorage;
pub use local::LocalStorage;
pub use object_client::ObjectStorageClient;
