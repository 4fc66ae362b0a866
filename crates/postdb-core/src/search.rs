// crates/postdb-core/src/search.rs

//! Partial postcode search over the split outcode/incode tables.

use crate::common::Page;
use crate::error::{PostDbError, Result};
use crate::model::{IncodeId, OutcodeId, PostcodePair};
use crate::traits::PostcodeStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// What a search query is matched against. Only `Postcode` is implemented;
/// the others are accepted and always come back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Postcode,
    Ward,
    District,
    County,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Postcode => "postcode",
            QueryType::Ward => "ward",
            QueryType::District => "district",
            QueryType::County => "county",
        }
    }
}

impl FromStr for QueryType {
    type Err = PostDbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postcode" => Ok(QueryType::Postcode),
            "ward" => Ok(QueryType::Ward),
            "district" => Ok(QueryType::District),
            "county" => Ok(QueryType::County),
            _ => Err(PostDbError::InvalidQueryType(s.to_string())),
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcode token and (optional) incode token of a query.
///
/// The query is lowercased, its first hyphen becomes a space, and the first
/// two whitespace-separated words are kept. `None` for a blank query.
pub fn tokenize(query: &str) -> Option<(String, Option<String>)> {
    let normalized = query.to_lowercase().replacen('-', " ", 1);
    let mut words = normalized.split_whitespace();
    let outcode = words.next()?.to_string();
    let incode = words.next().map(str::to_string);
    Some((outcode, incode))
}

pub struct SearchEngine<'a, S: PostcodeStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PostcodeStore + ?Sized> SearchEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Dispatch on `query_type`; see [`Self::search_postcodes`].
    pub fn search(&self, query: &str, query_type: QueryType, page: Page) -> Result<Vec<PostcodePair>> {
        match query_type {
            QueryType::Postcode => self.search_postcodes(query, page),
            QueryType::Ward | QueryType::District | QueryType::County => {
                debug!(%query_type, "query type not searchable yet");
                Ok(Vec::new())
            }
        }
    }

    /// Prefix-match the first token against outcodes and the second against
    /// incodes, then page through the postcodes combining both.
    ///
    /// The incode filter only applies when the second token matched at
    /// least one incode; otherwise every postcode of the matched outcodes is a
    /// candidate.
    pub fn search_postcodes(&self, query: &str, page: Page) -> Result<Vec<PostcodePair>> {
        let Some((outcode, incode)) = tokenize(query) else {
            return Ok(Vec::new());
        };

        let outcode_ids: Vec<OutcodeId> = self
            .store
            .all_outcodes_with_prefix(&outcode)?
            .into_iter()
            .map(|o| o.id)
            .collect();
        if outcode_ids.is_empty() {
            debug!(outcode = %outcode, "no outcode matches");
            return Ok(Vec::new());
        }

        let incode_ids: Option<Vec<IncodeId>> = match incode {
            Some(incode) => {
                let ids: Vec<IncodeId> = self
                    .store
                    .all_incodes_with_prefix(&incode)?
                    .into_iter()
                    .map(|i| i.id)
                    .collect();
                (!ids.is_empty()).then_some(ids)
            }
            None => None,
        };

        debug!(
            outcodes = outcode_ids.len(),
            incodes = incode_ids.as_ref().map(Vec::len),
            "postcode search"
        );
        self.store
            .postcodes_matching(&outcode_ids, incode_ids.as_deref(), page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewPostcode;
    use crate::store::MemoryStore;
    use crate::traits::NodeRecord;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const CODES: &[(&str, &str)] = &[
        ("sw1a", "1aa"),
        ("sw1a", "2aa"),
        ("sw1p", "3bt"),
        ("sw2", "1aa"),
        ("e1", "6an"),
    ];

    fn fixture() -> MemoryStore {
        let store = MemoryStore::new();
        let c = store.insert_country("England", "england", None).unwrap();
        let rec = |parent_id| NodeRecord {
            name: "X",
            slug: "x",
            code: "X",
            parent_id,
        };
        let county = store.insert_county(rec(c.id)).unwrap();
        let district = store.insert_district(rec(county.id)).unwrap();
        let ward = store.insert_ward(rec(district.id)).unwrap();

        for (out, inc) in CODES {
            let out_id = match store.outcode_by_code(out).unwrap() {
                Some(o) => o.id,
                None => store.insert_outcode(out).unwrap().id,
            };
            let inc_id = match store.incode_by_code(inc).unwrap() {
                Some(i) => i.id,
                None => store.insert_incode(inc).unwrap().id,
            };
            store
                .insert_postcode(&NewPostcode {
                    outcode_id: out_id,
                    incode_id: inc_id,
                    ward_id: ward.id,
                    latitude: 51.5,
                    longitude: -0.1,
                })
                .unwrap();
        }
        store
    }

    fn all() -> Page {
        Page::new(0, 100)
    }

    #[test]
    fn query_type_parsing() {
        assert_eq!("Postcode".parse::<QueryType>().unwrap(), QueryType::Postcode);
        assert_eq!(" ward ".parse::<QueryType>().unwrap(), QueryType::Ward);
        let err = "street".parse::<QueryType>().unwrap_err();
        assert!(matches!(err, PostDbError::InvalidQueryType(ref s) if s == "street"));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn tokenize_splits_on_first_hyphen_and_whitespace() {
        assert_eq!(tokenize("   "), None);
        assert_eq!(tokenize("SW1A"), Some(("sw1a".into(), None)));
        assert_eq!(
            tokenize("SW1A-1AA"),
            Some(("sw1a".into(), Some("1aa".into())))
        );
        assert_eq!(
            tokenize("sw1a  1aa extra"),
            Some(("sw1a".into(), Some("1aa".into())))
        );
    }

    #[test]
    fn full_postcode_returns_exactly_that_pair() {
        let store = fixture();
        let engine = SearchEngine::new(&store);
        let hits = engine.search("sw1a 1aa", QueryType::Postcode, all()).unwrap();
        assert_eq!(hits, vec![PostcodePair::new("sw1a", "1aa")]);
    }

    #[test]
    fn unknown_outcode_short_circuits() {
        let store = fixture();
        let engine = SearchEngine::new(&store);
        assert!(engine.search_postcodes("zz9 9zz", all()).unwrap().is_empty());
        assert!(engine.search_postcodes("", all()).unwrap().is_empty());
    }

    #[test]
    fn unmatched_incode_token_does_not_filter() {
        let store = fixture();
        let engine = SearchEngine::new(&store);
        let hits = engine.search_postcodes("sw1a 9zz", all()).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn reserved_query_types_are_empty() {
        let store = fixture();
        let engine = SearchEngine::new(&store);
        for qt in [QueryType::Ward, QueryType::District, QueryType::County] {
            assert!(engine.search("sw1a", qt, all()).unwrap().is_empty());
        }
    }

    #[test]
    fn results_are_paginated_in_id_order() {
        let store = fixture();
        let engine = SearchEngine::new(&store);
        let first = engine.search_postcodes("sw", Page::new(0, 2)).unwrap();
        let second = engine.search_postcodes("sw", Page::new(2, 2)).unwrap();
        assert_eq!(
            first,
            vec![PostcodePair::new("sw1a", "1aa"), PostcodePair::new("sw1a", "2aa")]
        );
        assert_eq!(
            second,
            vec![PostcodePair::new("sw1p", "3bt"), PostcodePair::new("sw2", "1aa")]
        );
    }

    proptest! {
        #[test]
        fn longer_outcode_prefix_never_adds_matches(
            idx in 0usize..CODES.len(),
            cut in 1usize..4,
        ) {
            let store = fixture();
            let engine = SearchEngine::new(&store);
            let code = CODES[idx].0;
            let short = &code[..cut.min(code.len())];

            let wide: HashSet<_> = engine.search_postcodes(short, all()).unwrap().into_iter().collect();
            let narrow: HashSet<_> = engine.search_postcodes(code, all()).unwrap().into_iter().collect();
            prop_assert!(narrow.is_subset(&wide));
        }
    }
}
