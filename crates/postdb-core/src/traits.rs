// crates/postdb-core/src/traits.rs
use crate::common::{DbStats, Page};
use crate::error::Result;
use crate::model::{
    Country, CountryId, County, CountyId, District, DistrictId, Incode, IncodeId, NewPostcode,
    Outcode, OutcodeId, Postcode, PostcodeDetail, PostcodePair, Ward, WardId,
};

/// The four slugs naming a ward, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WardChain<'a> {
    pub country: &'a str,
    pub county: &'a str,
    pub district: &'a str,
    pub ward: &'a str,
}

/// Fields shared by the three parented hierarchy levels (county, district, ward).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub code: &'a str,
    pub parent_id: u32,
}

/// Storage port: every typed read and write the engine needs.
///
/// Components receive an implementation explicitly; there is no ambient
/// connection. Lookups by code expect the normalized (lowercase) form, and all
/// listings are ordered by id.
///
/// Implementations are the authoritative guard for the uniqueness and parent
/// invariants: an `insert_*` that would duplicate a unique key must fail with
/// [`PostDbError::AlreadyExists`](crate::PostDbError::AlreadyExists), one that
/// references a missing parent with `ParentNotFound`, and `delete_country`
/// must refuse with `ReferentialConflict` while counties reference it. Each of
/// these checks must be atomic with the write it protects.
pub trait PostcodeStore: Send + Sync {
    // --- Hierarchy -------------------------------------------------------

    fn country_by_id(&self, id: CountryId) -> Result<Option<Country>>;
    fn country_by_slug(&self, slug: &str) -> Result<Option<Country>>;
    fn county_by_id(&self, id: CountyId) -> Result<Option<County>>;
    fn county_by_slug(&self, country_id: CountryId, slug: &str) -> Result<Option<County>>;
    fn district_by_id(&self, id: DistrictId) -> Result<Option<District>>;
    fn district_by_slug(&self, county_id: CountyId, slug: &str) -> Result<Option<District>>;
    fn ward_by_id(&self, id: WardId) -> Result<Option<Ward>>;
    fn ward_by_slug(&self, district_id: DistrictId, slug: &str) -> Result<Option<Ward>>;

    fn counties_of(&self, country_id: CountryId) -> Result<Vec<County>>;
    fn districts_of(&self, county_id: CountyId) -> Result<Vec<District>>;
    fn wards_of(&self, district_id: DistrictId) -> Result<Vec<Ward>>;
    fn count_counties_of(&self, country_id: CountryId) -> Result<usize>;

    /// Resolve all four slugs in one pass (a single join, not four lookups).
    fn resolve_ward_chain(&self, chain: &WardChain<'_>) -> Result<Option<Ward>>;

    // --- Postcode halves ---------------------------------------------------

    fn outcode_by_id(&self, id: OutcodeId) -> Result<Option<Outcode>>;
    fn outcode_by_code(&self, code: &str) -> Result<Option<Outcode>>;
    fn incode_by_id(&self, id: IncodeId) -> Result<Option<Incode>>;
    fn incode_by_code(&self, code: &str) -> Result<Option<Incode>>;

    fn outcodes(&self, page: Page) -> Result<Vec<Outcode>>;
    /// `code LIKE prefix%`, paginated.
    fn match_outcodes_by_prefix(&self, prefix: &str, page: Page) -> Result<Vec<Outcode>>;
    /// `code LIKE prefix%`, every match.
    fn all_outcodes_with_prefix(&self, prefix: &str) -> Result<Vec<Outcode>>;
    /// `code LIKE prefix%`, every match.
    fn all_incodes_with_prefix(&self, prefix: &str) -> Result<Vec<Incode>>;
    /// `code LIKE %needle%`, at most `cap` rows.
    fn search_outcodes(&self, needle: &str, cap: usize) -> Result<Vec<Outcode>>;
    /// `code LIKE %needle%`, at most `cap` rows.
    fn search_incodes(&self, needle: &str, cap: usize) -> Result<Vec<Incode>>;
    /// Distinct incodes used together with `outcode_id`, paginated.
    fn incodes_for_outcode(&self, outcode_id: OutcodeId, page: Page) -> Result<Vec<Incode>>;

    // --- Postcodes ----------------------------------------------------------

    fn postcode_by_parts(
        &self,
        outcode_id: OutcodeId,
        incode_id: IncodeId,
    ) -> Result<Option<Postcode>>;

    /// The postcode joined through ward, district, county and country.
    fn postcode_detail(
        &self,
        outcode_id: OutcodeId,
        incode_id: IncodeId,
    ) -> Result<Option<PostcodeDetail>>;

    /// Postcodes of one ward as display pairs; `None` means every row.
    fn postcodes_in_ward(&self, ward_id: WardId, page: Option<Page>) -> Result<Vec<PostcodePair>>;

    /// Postcodes whose outcode is in `outcode_ids` and, when `incode_ids` is
    /// given, whose incode is in `incode_ids`.
    fn postcodes_matching(
        &self,
        outcode_ids: &[OutcodeId],
        incode_ids: Option<&[IncodeId]>,
        page: Page,
    ) -> Result<Vec<PostcodePair>>;

    fn stats(&self) -> Result<DbStats>;

    // --- Writes ---------------------------------------------------------------

    fn insert_country(&self, name: &str, slug: &str, iso: Option<&str>) -> Result<Country>;
    fn insert_county(&self, record: NodeRecord<'_>) -> Result<County>;
    fn insert_district(&self, record: NodeRecord<'_>) -> Result<District>;
    fn insert_ward(&self, record: NodeRecord<'_>) -> Result<Ward>;
    fn insert_outcode(&self, code: &str) -> Result<Outcode>;
    fn insert_incode(&self, code: &str) -> Result<Incode>;
    fn insert_postcode(&self, record: &NewPostcode) -> Result<Postcode>;

    /// Overwrite name, slug and iso of an existing country.
    fn update_country(&self, country: &Country) -> Result<Country>;
    fn delete_country(&self, id: CountryId) -> Result<()>;
}
