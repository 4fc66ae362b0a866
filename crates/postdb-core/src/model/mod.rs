// crates/postdb-core/src/model/mod.rs
pub mod domain;
pub mod input;
pub mod views;

pub use domain::{
    Country, CountryId, County, CountyId, District, DistrictId, Incode, IncodeId, Outcode,
    OutcodeId, Postcode, PostcodeId, Ward, WardId,
};
pub use input::{
    CountryPatch, NewCountry, NewCounty, NewDistrict, NewIncode, NewOutcode, NewPostcode,
    NewWard, Validated,
};
pub use views::{
    CountryWithCounties, CountyWithDistricts, DistrictWithWards, Node, NodeSummary,
    PostcodeDetail, PostcodePair, WardPostcodes,
};
