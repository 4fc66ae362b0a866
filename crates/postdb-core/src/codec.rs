// crates/postdb-core/src/codec.rs

//! Postcode decomposition into (outcode, incode) and the lookups built on it.

use crate::common::{Entity, Page, QUERY_RESULT_CAP};
use crate::error::{PostDbError, Result};
use crate::model::{Incode, Outcode, PostcodeDetail, PostcodePair, WardId};
use crate::text::normalize_code;
use crate::traits::PostcodeStore;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Length of the inward half of every postcode.
pub const INCODE_LEN: usize = 3;
/// Shortest (`M11AE`) and longest (`SW1A1AA`) postcodes once spaces are removed.
pub const COMPACT_MIN: usize = 5;
pub const COMPACT_MAX: usize = 7;

/// A postcode split into its two normalized halves.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PostcodeParts {
    pub outcode: String,
    pub incode: String,
}

impl PostcodeParts {
    /// Split a full postcode. Spacing and case do not matter:
    /// `"SW1A 1AA"`, `"sw1a1aa"` and `"SW1A-1AA"` all give `("sw1a", "1aa")`.
    ///
    /// Only the shape is checked (5..=7 ASCII alphanumerics); whether the
    /// halves exist is left to the lookup.
    pub fn split(full: &str) -> Result<Self> {
        let compact: String = full
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if !compact.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PostDbError::validation(format!(
                "postcode may only contain letters and digits: {full:?}"
            )));
        }
        if !(COMPACT_MIN..=COMPACT_MAX).contains(&compact.len()) {
            return Err(PostDbError::validation(format!(
                "postcode must be {COMPACT_MIN} to {COMPACT_MAX} characters: {full:?}"
            )));
        }

        let (outcode, incode) = compact.split_at(compact.len() - INCODE_LEN);
        Ok(Self {
            outcode: outcode.to_owned(),
            incode: incode.to_owned(),
        })
    }

    /// Display form, e.g. `SW1A 1AA`.
    pub fn full(&self) -> String {
        format!("{} {}", self.outcode, self.incode).to_ascii_uppercase()
    }
}

impl FromStr for PostcodeParts {
    type Err = PostDbError;

    fn from_str(s: &str) -> Result<Self> {
        Self::split(s)
    }
}

impl fmt::Display for PostcodeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

impl From<PostcodeParts> for PostcodePair {
    fn from(p: PostcodeParts) -> Self {
        PostcodePair::new(p.outcode, p.incode)
    }
}

/// `Some(needle)` when a free-text query was actually given.
fn query_needle(query: Option<&str>) -> Option<String> {
    query.map(normalize_code).filter(|q| !q.is_empty())
}

/// Read-side operations over the outcode/incode tables.
pub struct Codec<'a, S: PostcodeStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PostcodeStore + ?Sized> Codec<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// With a query: substring match, at most [`QUERY_RESULT_CAP`] rows, `page`
    /// ignored. Without: the outcode table, paginated.
    pub fn list_outcodes(&self, page: Page, query: Option<&str>) -> Result<Vec<Outcode>> {
        match query_needle(query) {
            Some(needle) => {
                debug!(needle = %needle, "outcode query");
                self.store.search_outcodes(&needle, QUERY_RESULT_CAP)
            }
            None => self.store.outcodes(page),
        }
    }

    /// With a query: substring match as in [`Self::list_outcodes`].
    /// Without: the distinct incodes used together with `outcode`, which then
    /// has to exist.
    pub fn list_incodes(
        &self,
        outcode: Option<&str>,
        page: Page,
        query: Option<&str>,
    ) -> Result<Vec<Incode>> {
        if let Some(needle) = query_needle(query) {
            debug!(needle = %needle, "incode query");
            return self.store.search_incodes(&needle, QUERY_RESULT_CAP);
        }

        let code = outcode.map(normalize_code).unwrap_or_default();
        let outcode = self
            .store
            .outcode_by_code(&code)?
            .ok_or(PostDbError::NotFound(Entity::Outcode))?;
        self.store.incodes_for_outcode(outcode.id, page)
    }

    /// Join a postcode through the whole hierarchy.
    ///
    /// `Ok(None)` when either half is unknown or the pair was never
    /// registered.
    pub fn resolve_postcode(&self, outcode: &str, incode: &str) -> Result<Option<PostcodeDetail>> {
        let Some(out) = self.store.outcode_by_code(&normalize_code(outcode))? else {
            debug!(outcode, "unknown outcode");
            return Ok(None);
        };
        let Some(inc) = self.store.incode_by_code(&normalize_code(incode))? else {
            debug!(incode, "unknown incode");
            return Ok(None);
        };
        self.store.postcode_detail(out.id, inc.id)
    }

    /// [`PostcodeParts::split`] followed by [`Self::resolve_postcode`].
    pub fn resolve(&self, full: &str) -> Result<Option<PostcodeDetail>> {
        let parts = PostcodeParts::split(full)?;
        self.resolve_postcode(&parts.outcode, &parts.incode)
    }

    /// Outcodes starting with `prefix`, paginated.
    pub fn list_by_area_prefix(&self, prefix: &str, page: Page) -> Result<Vec<Outcode>> {
        self.store
            .match_outcodes_by_prefix(&normalize_code(prefix), page)
    }

    /// Postcodes sharing a ward.
    pub fn related(&self, ward_id: WardId, page: Page) -> Result<Vec<PostcodePair>> {
        if self.store.ward_by_id(ward_id)?.is_none() {
            return Err(PostDbError::NotFound(Entity::Ward));
        }
        self.store.postcodes_in_ward(ward_id, Some(page))
    }
}
