// crates/postdb-core/src/error.rs
use crate::common::Entity;
use thiserror::Error;

/// Everything that can go wrong in the core.
///
/// "Legitimate absence" (an unregistered postcode, a search without hits) is
/// never an error; those paths return empty results instead.
#[derive(Debug, Error)]
pub enum PostDbError {
    /// A slug chain (or code lookup) broke at this level.
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Already exists, {entity}: {key}")]
    AlreadyExists { entity: Entity, key: String },

    /// `entity` names the missing parent, `id` the value that was referenced.
    #[error("{entity} id does not exist: {id}")]
    ParentNotFound { entity: Entity, id: u32 },

    #[error("Cannot delete {entity} (id: {id}). It is referenced by {dependent} rows")]
    ReferentialConflict {
        entity: Entity,
        id: u32,
        dependent: Entity,
    },

    #[error("Invalid query type: {0}")]
    InvalidQueryType(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Upstream lookup failed: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl PostDbError {
    /// HTTP-style status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::ParentNotFound { .. } => 404,
            Self::AlreadyExists { .. } | Self::ReferentialConflict { .. } => 409,
            Self::InvalidQueryType(_) | Self::Validation(_) => 400,
            Self::Upstream(_) => 502,
            _ => 500,
        }
    }

    /// `true` for the conflict family (duplicate key or blocked delete).
    pub fn is_conflict(&self) -> bool {
        self.status_code() == 409
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn already_exists(entity: Entity, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PostDbError>;
