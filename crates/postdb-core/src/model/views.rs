// crates/postdb-core/src/model/views.rs

//! Read payloads: a resolved node plus its immediate children, shaped for
//! breadcrumb-style drill-down.

use super::domain::{Country, County, District, Incode, Outcode, Postcode, Ward};
use serde::{Deserialize, Serialize};

/// Child listing entry (`code`, `name`, `slug`); surrogate keys are not exposed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub code: String,
    pub name: String,
    pub slug: String,
}

impl From<&County> for NodeSummary {
    fn from(c: &County) -> Self {
        Self {
            code: c.code.clone(),
            name: c.name.clone(),
            slug: c.slug.clone(),
        }
    }
}

impl From<&District> for NodeSummary {
    fn from(d: &District) -> Self {
        Self {
            code: d.code.clone(),
            name: d.name.clone(),
            slug: d.slug.clone(),
        }
    }
}

impl From<&Ward> for NodeSummary {
    fn from(w: &Ward) -> Self {
        Self {
            code: w.code.clone(),
            name: w.name.clone(),
            slug: w.slug.clone(),
        }
    }
}

/// A postcode projected to its two display codes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostcodePair {
    pub outcode: String,
    pub incode: String,
}

impl PostcodePair {
    pub fn new(outcode: impl Into<String>, incode: impl Into<String>) -> Self {
        Self {
            outcode: outcode.into(),
            incode: incode.into(),
        }
    }

    /// Display form, e.g. `SW1A 1AA`.
    pub fn full(&self) -> String {
        format!("{} {}", self.outcode, self.incode).to_ascii_uppercase()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryWithCounties {
    #[serde(flatten)]
    pub country: Country,
    pub counties: Vec<NodeSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyWithDistricts {
    #[serde(flatten)]
    pub county: County,
    pub districts: Vec<NodeSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictWithWards {
    #[serde(flatten)]
    pub district: District,
    pub wards: Vec<NodeSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardPostcodes {
    #[serde(flatten)]
    pub ward: Ward,
    pub postcodes: Vec<PostcodePair>,
}

/// Result of walking a slug chain of depth 1..=4.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum Node {
    Country(CountryWithCounties),
    County(CountyWithDistricts),
    District(DistrictWithWards),
    Ward(WardPostcodes),
}

/// A postcode joined up through the whole hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostcodeDetail {
    pub postcode: Postcode,
    pub outcode: Outcode,
    pub incode: Incode,
    pub ward: Ward,
    pub district: District,
    pub county: County,
    pub country: Country,
}

impl PostcodeDetail {
    pub fn pair(&self) -> PostcodePair {
        PostcodePair::new(&self.outcode.code, &self.incode.code)
    }
}
