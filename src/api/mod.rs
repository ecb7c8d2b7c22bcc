//! Access to the remote blog service.
//!
//! - [`gateway`]: raw HTTP calls against `/blogs`
//! - [`cache`]: keyed read cache with staleness window and coalescing
//! - [`queries`]: the cached facade the rest of the app uses

pub mod cache;
pub mod gateway;
pub mod queries;
pub mod types;

pub use cache::{QueryCache, QueryKey, QueryStatus};
pub use gateway::{BlogClient, GatewayError};
pub use queries::BlogQueries;
pub use types::{Category, NewPost, Post, PostPatch};
