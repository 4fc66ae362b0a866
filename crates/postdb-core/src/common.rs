// crates/postdb-core/src/common.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of rows a free-text listing (`query` mode) may return at most.
/// In that mode `skip`/`limit` are ignored.
pub const QUERY_RESULT_CAP: usize = 80;

/// Simple aggregate statistics for the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbStats {
    pub countries: usize,
    pub counties: usize,
    pub districts: usize,
    pub wards: usize,
    pub outcodes: usize,
    pub incodes: usize,
    pub postcodes: usize,
}

/// Every entity kind the store knows about.
///
/// Used to say *which* level a slug chain broke at, and which table a
/// conflict happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Country,
    County,
    District,
    Ward,
    Outcode,
    Incode,
    Postcode,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Country => "Country",
            Entity::County => "County",
            Entity::District => "District",
            Entity::Ward => "Ward",
            Entity::Outcode => "Outcode",
            Entity::Incode => "Incode",
            Entity::Postcode => "Postcode",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Offset pagination (`skip` rows, then at most `limit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Page {
    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }

    /// Apply this page to an iterator.
    pub fn apply<I: Iterator>(&self, iter: I) -> std::iter::Take<std::iter::Skip<I>> {
        iter.skip(self.skip).take(self.limit)
    }
}
