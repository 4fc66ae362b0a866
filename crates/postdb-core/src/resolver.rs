// crates/postdb-core/src/resolver.rs

//! Slug-chain resolution for drill-down navigation.
//!
//! Each `get_*` walks country -> county -> district -> ward one level at a
//! time and stops at the first slug that does not resolve under its parent,
//! reporting that level in [`PostDbError::NotFound`].

use crate::common::Entity;
use crate::error::{PostDbError, Result};
use crate::model::{
    Country, County, CountryWithCounties, CountyWithDistricts, District, DistrictWithWards, Node,
    NodeSummary, Ward, WardPostcodes,
};
use crate::traits::{PostcodeStore, WardChain};
use tracing::debug;

pub struct Resolver<'a, S: PostcodeStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PostcodeStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn country(&self, slug: &str) -> Result<Country> {
        self.store
            .country_by_slug(slug)?
            .ok_or(PostDbError::NotFound(Entity::Country))
    }

    pub fn county(&self, country: &Country, slug: &str) -> Result<County> {
        self.store
            .county_by_slug(country.id, slug)?
            .ok_or(PostDbError::NotFound(Entity::County))
    }

    pub fn district(&self, county: &County, slug: &str) -> Result<District> {
        self.store
            .district_by_slug(county.id, slug)?
            .ok_or(PostDbError::NotFound(Entity::District))
    }

    pub fn ward(&self, district: &District, slug: &str) -> Result<Ward> {
        self.store
            .ward_by_slug(district.id, slug)?
            .ok_or(PostDbError::NotFound(Entity::Ward))
    }

    /// Country fields plus every county in it.
    pub fn get_county(&self, country: &str) -> Result<CountryWithCounties> {
        let country = self.country(country)?;
        let counties = self.store.counties_of(country.id)?;
        Ok(CountryWithCounties {
            country,
            counties: counties.iter().map(NodeSummary::from).collect(),
        })
    }

    /// County fields plus every district in it.
    pub fn get_district(&self, country: &str, county: &str) -> Result<CountyWithDistricts> {
        let country = self.country(country)?;
        let county = self.county(&country, county)?;
        let districts = self.store.districts_of(county.id)?;
        Ok(CountyWithDistricts {
            county,
            districts: districts.iter().map(NodeSummary::from).collect(),
        })
    }

    /// District fields plus every ward in it.
    pub fn get_ward(&self, country: &str, county: &str, district: &str) -> Result<DistrictWithWards> {
        let country = self.country(country)?;
        let county = self.county(&country, county)?;
        let district = self.district(&county, district)?;
        let wards = self.store.wards_of(district.id)?;
        Ok(DistrictWithWards {
            district,
            wards: wards.iter().map(NodeSummary::from).collect(),
        })
    }

    /// Walk a chain of 1 to 4 slugs and return the deepest node with its children.
    pub fn get(&self, chain: &[&str]) -> Result<Node> {
        debug!(?chain, "resolving slug chain");
        match *chain {
            [country] => self.get_county(country).map(Node::Country),
            [country, county] => self.get_district(country, county).map(Node::County),
            [country, county, district] => {
                self.get_ward(country, county, district).map(Node::District)
            }
            [country, county, district, ward] => {
                let country = self.country(country)?;
                let county = self.county(&country, county)?;
                let district = self.district(&county, district)?;
                let ward = self.ward(&district, ward)?;
                let postcodes = self.store.postcodes_in_ward(ward.id, None)?;
                Ok(Node::Ward(WardPostcodes { ward, postcodes }))
            }
            _ => Err(PostDbError::validation(format!(
                "slug chain must have 1 to 4 levels, got {}",
                chain.len()
            ))),
        }
    }

    /// A ward and all its postcodes, resolving the four slugs in one lookup.
    ///
    /// `Ok(None)` if the chain does not resolve, without saying where it broke.
    pub fn list_postcodes(
        &self,
        country: &str,
        county: &str,
        district: &str,
        ward: &str,
    ) -> Result<Option<WardPostcodes>> {
        let chain = WardChain {
            country,
            county,
            district,
            ward,
        };
        let Some(ward) = self.store.resolve_ward_chain(&chain)? else {
            debug!(?chain, "ward chain did not resolve");
            return Ok(None);
        };
        let postcodes = self.store.postcodes_in_ward(ward.id, None)?;
        Ok(Some(WardPostcodes { ward, postcodes }))
    }
}
