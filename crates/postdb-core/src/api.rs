// crates/postdb-core/src/api.rs

//! Request-level facade.
//!
//! `PostDb` validates raw input, hands it to the codec, resolver, search
//! engine or gateway, and tags read results with an [`Outcome`] so callers can
//! tell "found", "legitimately absent", "broken at level X" and "bad request"
//! apart without inspecting errors.

use crate::codec::Codec;
use crate::common::{DbStats, Entity, Page};
use crate::error::{PostDbError, Result};
use crate::gateway::MutationGateway;
use crate::model::{
    Country, CountryId, CountryPatch, CountryWithCounties, County, CountyWithDistricts, District,
    DistrictWithWards, Incode, NewCountry, NewCounty, NewDistrict, NewIncode, NewOutcode,
    NewPostcode, NewWard, Node, Outcode, Postcode, PostcodeDetail, PostcodePair, Ward, WardId,
    WardPostcodes,
};
use crate::resolver::Resolver;
use crate::search::{QueryType, SearchEngine};
use crate::traits::PostcodeStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "details")]
use crate::details::DetailsClient;

/// Tagged result of a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum Outcome<T> {
    Found(T),
    /// Nothing there, and that is a valid answer.
    Empty,
    /// A slug chain or code lookup broke at this level.
    NotFoundAt(Entity),
    /// The request itself was malformed.
    Invalid(String),
}

impl<T> Outcome<T> {
    /// Lift a lookup result: lookup and input failures become tags, anything
    /// else stays an error.
    pub fn from_lookup(result: Result<T>) -> Result<Self> {
        match result {
            Ok(value) => Ok(Outcome::Found(value)),
            Err(PostDbError::NotFound(level)) => Ok(Outcome::NotFoundAt(level)),
            Err(err @ (PostDbError::Validation(_) | PostDbError::InvalidQueryType(_))) => {
                Ok(Outcome::Invalid(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Like [`Self::from_lookup`], with `Ok(None)` meaning `Empty`.
    pub fn from_optional(result: Result<Option<T>>) -> Result<Self> {
        Ok(match Outcome::<Option<T>>::from_lookup(result)? {
            Outcome::Found(Some(value)) => Outcome::Found(value),
            Outcome::Found(None) | Outcome::Empty => Outcome::Empty,
            Outcome::NotFoundAt(level) => Outcome::NotFoundAt(level),
            Outcome::Invalid(reason) => Outcome::Invalid(reason),
        })
    }

    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    /// HTTP-style status a transport layer would answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Found(_) | Outcome::Empty => 200,
            Outcome::NotFoundAt(_) => 404,
            Outcome::Invalid(_) => 400,
        }
    }
}

/// The postcode database: one storage backend plus an optional lookup client.
///
/// Cloning is cheap; clones share the store.
pub struct PostDb<S: PostcodeStore> {
    store: Arc<S>,
    #[cfg(feature = "details")]
    details: Option<Arc<DetailsClient>>,
}

impl<S: PostcodeStore> Clone for PostDb<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            #[cfg(feature = "details")]
            details: self.details.clone(),
        }
    }
}

impl<S: PostcodeStore> PostDb<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            #[cfg(feature = "details")]
            details: None,
        }
    }

    #[cfg(feature = "details")]
    pub fn with_details(mut self, client: DetailsClient) -> Self {
        self.details = Some(Arc::new(client));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn codec(&self) -> Codec<'_, S> {
        Codec::new(&*self.store)
    }

    fn resolver(&self) -> Resolver<'_, S> {
        Resolver::new(&*self.store)
    }

    fn gateway(&self) -> MutationGateway<'_, S> {
        MutationGateway::new(&*self.store)
    }

    // --- Codes ----------------------------------------------------------------

    pub fn list_outcodes(&self, page: Page, query: Option<&str>) -> Result<Vec<Outcode>> {
        self.codec().list_outcodes(page, query)
    }

    /// `NotFoundAt(Outcode)` when listing by an outcode that does not exist.
    pub fn list_incodes(
        &self,
        outcode: Option<&str>,
        page: Page,
        query: Option<&str>,
    ) -> Result<Outcome<Vec<Incode>>> {
        Outcome::from_lookup(self.codec().list_incodes(outcode, page, query))
    }

    pub fn resolve_postcode(&self, outcode: &str, incode: &str) -> Result<Outcome<PostcodeDetail>> {
        Outcome::from_optional(self.codec().resolve_postcode(outcode, incode))
    }

    /// Resolve a full postcode such as `"SW1A 1AA"`.
    pub fn resolve(&self, postcode: &str) -> Result<Outcome<PostcodeDetail>> {
        Outcome::from_optional(self.codec().resolve(postcode))
    }

    pub fn list_by_area_prefix(&self, prefix: &str, page: Page) -> Result<Vec<Outcode>> {
        self.codec().list_by_area_prefix(prefix, page)
    }

    pub fn related_postcodes(&self, ward_id: WardId, page: Page) -> Result<Outcome<Vec<PostcodePair>>> {
        Outcome::from_lookup(self.codec().related(ward_id, page))
    }

    // --- Hierarchy --------------------------------------------------------------

    pub fn get_county(&self, country: &str) -> Result<Outcome<CountryWithCounties>> {
        Outcome::from_lookup(self.resolver().get_county(country))
    }

    pub fn get_district(&self, country: &str, county: &str) -> Result<Outcome<CountyWithDistricts>> {
        Outcome::from_lookup(self.resolver().get_district(country, county))
    }

    pub fn get_ward(
        &self,
        country: &str,
        county: &str,
        district: &str,
    ) -> Result<Outcome<DistrictWithWards>> {
        Outcome::from_lookup(self.resolver().get_ward(country, county, district))
    }

    /// `Empty` when the chain does not resolve (the level is not reported).
    pub fn get_postcodes(
        &self,
        country: &str,
        county: &str,
        district: &str,
        ward: &str,
    ) -> Result<Outcome<WardPostcodes>> {
        Outcome::from_optional(
            self.resolver()
                .list_postcodes(country, county, district, ward),
        )
    }

    /// Walk 1 to 4 slugs and return the deepest node.
    pub fn browse(&self, chain: &[&str]) -> Result<Outcome<Node>> {
        Outcome::from_lookup(self.resolver().get(chain))
    }

    // --- Search -----------------------------------------------------------------

    /// `query_type` is parsed here; an unknown type is `Invalid`.
    pub fn search(&self, query: &str, query_type: &str, page: Page) -> Result<Outcome<Vec<PostcodePair>>> {
        Outcome::from_lookup(
            query_type
                .parse::<QueryType>()
                .and_then(|qt| SearchEngine::new(&*self.store).search(query, qt, page)),
        )
    }

    pub fn stats(&self) -> Result<DbStats> {
        self.store.stats()
    }

    #[cfg(feature = "details")]
    pub fn lookup_details(&self, postcode: &str) -> Result<serde_json::Value> {
        match &self.details {
            Some(client) => client.lookup(postcode),
            None => Err(PostDbError::Upstream("no details lookup configured".into())),
        }
    }

    // --- Mutations --------------------------------------------------------------

    pub fn create_country(&self, input: NewCountry) -> Result<Country> {
        self.gateway().create_country(input.validate()?)
    }

    pub fn create_county(&self, input: NewCounty) -> Result<County> {
        self.gateway().create_county(input.validate()?)
    }

    pub fn create_district(&self, input: NewDistrict) -> Result<District> {
        self.gateway().create_district(input.validate()?)
    }

    pub fn create_ward(&self, input: NewWard) -> Result<Ward> {
        self.gateway().create_ward(input.validate()?)
    }

    pub fn create_outcode(&self, input: NewOutcode) -> Result<Outcode> {
        self.gateway().create_outcode(input.validate()?)
    }

    pub fn create_incode(&self, input: NewIncode) -> Result<Incode> {
        self.gateway().create_incode(input.validate()?)
    }

    pub fn create_postcode(&self, input: NewPostcode) -> Result<Postcode> {
        self.gateway().create_postcode(input.validate()?)
    }

    pub fn update_country(&self, id: CountryId, patch: CountryPatch) -> Result<Country> {
        self.gateway().update_country(id, patch.validate()?)
    }

    pub fn delete_country(&self, id: CountryId) -> Result<()> {
        self.gateway().delete_country(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn outcome_serializes_with_a_tag() {
        let found: Outcome<u32> = Outcome::Found(7);
        assert_eq!(
            serde_json::to_value(&found).unwrap(),
            serde_json::json!({"outcome": "found", "data": 7})
        );
        let broken: Outcome<u32> = Outcome::NotFoundAt(Entity::District);
        assert_eq!(
            serde_json::to_value(&broken).unwrap(),
            serde_json::json!({"outcome": "not_found_at", "data": "district"})
        );
        let empty: Outcome<u32> = Outcome::Empty;
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            serde_json::json!({"outcome": "empty"})
        );
    }

    #[test]
    fn plumbing_errors_are_not_folded_into_outcomes() {
        let err: Result<Outcome<()>> = Outcome::from_lookup(Err(PostDbError::Storage("disk".into())));
        assert!(err.is_err());
        let conflict: Result<Outcome<()>> =
            Outcome::from_lookup(Err(PostDbError::already_exists(Entity::Ward, "x")));
        assert!(conflict.is_err());
    }

    #[test]
    fn unknown_query_type_is_invalid_not_error() {
        let db = PostDb::new(MemoryStore::new());
        let outcome = db.search("sw1a", "street", Page::default()).unwrap();
        assert!(matches!(outcome, Outcome::Invalid(_)));
        assert_eq!(outcome.status_code(), 400);
    }

    #[test]
    fn raw_input_is_validated_before_the_gateway() {
        let db = PostDb::new(MemoryStore::new());
        let err = db
            .create_country(NewCountry {
                name: "United Kingdom".into(),
                iso: "GBR1".into(),
            })
            .unwrap_err();
        assert!(matches!(err, PostDbError::Validation(_)));
        assert_eq!(db.stats().unwrap().countries, 0);
    }

    #[cfg(feature = "details")]
    #[test]
    fn details_without_client_is_upstream_failure() {
        let db = PostDb::new(MemoryStore::new());
        assert!(matches!(db.lookup_details("E1 6AN"), Err(PostDbError::Upstream(_))));
    }
}
