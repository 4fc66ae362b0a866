// crates/postdb-core/src/store/mod.rs

//! # Stores
//!
//! Implementations of the [`PostcodeStore`](crate::traits::PostcodeStore) port.
//!
//! - [`MemoryStore`]: flat in-process tables, persisted as a bincode snapshot.
//! - `SqliteStore` (feature `sqlite`): the relational layout with unique
//!   indexes doing the invariant enforcement.

mod memory;
mod snapshot;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::{MemoryStore, Tables};
pub use snapshot::SNAPSHOT_SUFFIX;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
