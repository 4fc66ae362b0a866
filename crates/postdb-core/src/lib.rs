// crates/postdb-core/src/lib.rs

pub mod api; // Request facade + tagged outcomes
pub mod codec;
pub mod common;
pub mod config;
#[cfg(feature = "details")]
pub mod details;
pub mod error;
pub mod gateway;
pub mod model;
pub mod resolver;
pub mod search;
pub mod store;
pub mod text;
pub mod traits;

// Re-exports
pub use crate::api::{Outcome, PostDb};
pub use crate::common::{DbStats, Entity, Page, QUERY_RESULT_CAP};
pub use crate::error::{PostDbError, Result};
pub use crate::model::*;
pub use crate::codec::PostcodeParts;
pub use crate::config::LookupConfig;
#[cfg(feature = "details")]
pub use crate::details::DetailsClient;
pub use crate::search::QueryType;
pub use crate::store::MemoryStore;
#[cfg(feature = "sqlite")]
pub use crate::store::SqliteStore;
pub use crate::text::slugify;
// Export the Storage Port (Crucial for custom backends!)
pub use crate::traits::PostcodeStore;
