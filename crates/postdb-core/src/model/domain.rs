// crates/postdb-core/src/model/domain.rs
use serde::{Deserialize, Serialize};

// Opaque surrogate keys, allocated by the store starting at 1.
pub type CountryId = u32;
pub type CountyId = u32;
pub type DistrictId = u32;
pub type WardId = u32;
pub type OutcodeId = u32;
pub type IncodeId = u32;
pub type PostcodeId = u32;

/// A Country entry. `name` and `slug` are globally unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    pub slug: String,
    pub iso: Option<String>, // e.g. "GB"
}

/// A County entry; `(slug, country_id)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct County {
    pub id: CountyId,
    pub name: String,
    pub slug: String,
    pub code: String,
    pub country_id: CountryId,
}

/// A District entry; `(slug, county_id)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    pub id: DistrictId,
    pub name: String,
    pub slug: String,
    pub code: String,
    pub county_id: CountyId,
}

/// A Ward entry; `(slug, district_id)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ward {
    pub id: WardId,
    pub name: String,
    pub slug: String,
    pub code: String,
    pub district_id: DistrictId,
}

/// First half of a postcode (area + district), stored lowercase, e.g. `sw1a`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcode {
    pub id: OutcodeId,
    pub code: String,
}

/// Second half of a postcode (sector + unit), stored lowercase, e.g. `1aa`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incode {
    pub id: IncodeId,
    pub code: String,
}

/// Junction row joining one Outcode and one Incode into a full postcode.
///
/// `(outcode_id, incode_id)` is unique system-wide; the ward is not part of
/// the key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Postcode {
    pub id: PostcodeId,
    pub outcode_id: OutcodeId,
    pub incode_id: IncodeId,
    pub latitude: f64,
    pub longitude: f64,
    pub ward_id: WardId,
}
