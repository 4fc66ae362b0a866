// crates/postdb-core/src/model/input.rs

//! Typed mutation inputs.
//!
//! A transport layer deserializes one of these, calls `validate()`, and hands
//! the resulting [`Validated`] value to the mutation gateway. The gateway only
//! accepts `Validated<T>`, so unchecked input cannot reach the store.

use super::domain::{CountryId, CountyId, DistrictId, IncodeId, OutcodeId, WardId};
use crate::error::{PostDbError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

pub const COUNTRY_NAME_MAX: usize = 50;
pub const COUNTY_NAME_MAX: usize = 50;
pub const LOCAL_NAME_MAX: usize = 100; // districts + wards
pub const ISO_MAX: usize = 3;
pub const AREA_CODE_MAX: usize = 9;
pub const OUTCODE_MAX: usize = 4;
pub const INCODE_MAX: usize = 3;

/// Proof that an input passed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct Validated<T>(T);

impl<T> Validated<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

fn required(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(PostDbError::validation(format!("{field} is required")));
    }
    if len > max {
        return Err(PostDbError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// A postcode half: required, bounded, ASCII letters and digits only.
fn postcode_half(value: &str, max: usize) -> Result<()> {
    required("code", value, max)?;
    if !value.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PostDbError::validation(format!(
            "code may only contain letters and digits: {value:?}"
        )));
    }
    Ok(())
}

fn required_id(field: &str, id: u32) -> Result<()> {
    if id == 0 {
        return Err(PostDbError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Treat `Some("")`/whitespace as "not provided".
fn provided(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCountry {
    pub name: String,
    pub iso: String,
}

impl NewCountry {
    pub fn validate(self) -> Result<Validated<Self>> {
        required("name", &self.name, COUNTRY_NAME_MAX)?;
        required("iso", &self.iso, ISO_MAX)?;
        Ok(Validated(self))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCounty {
    pub name: String,
    pub code: String,
    pub country_id: CountryId,
}

impl NewCounty {
    pub fn validate(self) -> Result<Validated<Self>> {
        required("name", &self.name, COUNTY_NAME_MAX)?;
        required("code", &self.code, AREA_CODE_MAX)?;
        required_id("countryId", self.country_id)?;
        Ok(Validated(self))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDistrict {
    pub name: String,
    pub code: String,
    pub county_id: CountyId,
}

impl NewDistrict {
    pub fn validate(self) -> Result<Validated<Self>> {
        required("name", &self.name, LOCAL_NAME_MAX)?;
        required("code", &self.code, AREA_CODE_MAX)?;
        required_id("countyId", self.county_id)?;
        Ok(Validated(self))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWard {
    pub name: String,
    pub code: String,
    pub district_id: DistrictId,
}

impl NewWard {
    pub fn validate(self) -> Result<Validated<Self>> {
        required("name", &self.name, LOCAL_NAME_MAX)?;
        required("code", &self.code, AREA_CODE_MAX)?;
        required_id("districtId", self.district_id)?;
        Ok(Validated(self))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOutcode {
    pub code: String,
}

impl NewOutcode {
    pub fn validate(self) -> Result<Validated<Self>> {
        postcode_half(&self.code, OUTCODE_MAX)?;
        Ok(Validated(self))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIncode {
    pub code: String,
}

impl NewIncode {
    pub fn validate(self) -> Result<Validated<Self>> {
        postcode_half(&self.code, INCODE_MAX)?;
        Ok(Validated(self))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPostcode {
    pub outcode_id: OutcodeId,
    pub incode_id: IncodeId,
    pub ward_id: WardId,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewPostcode {
    pub fn validate(self) -> Result<Validated<Self>> {
        required_id("outcodeId", self.outcode_id)?;
        required_id("incodeId", self.incode_id)?;
        required_id("wardId", self.ward_id)?;
        if !(self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude)) {
            return Err(PostDbError::validation("latitude must be within [-90, 90]"));
        }
        if !(self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude)) {
            return Err(PostDbError::validation(
                "longitude must be within [-180, 180]",
            ));
        }
        Ok(Validated(self))
    }
}

/// Merge-patch for a Country: omitted or empty fields keep the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub iso: Option<String>,
}

impl CountryPatch {
    pub fn validate(self) -> Result<Validated<Self>> {
        if let Some(name) = provided(&self.name) {
            required("name", name, COUNTRY_NAME_MAX)?;
        }
        if let Some(iso) = provided(&self.iso) {
            required("iso", iso, ISO_MAX)?;
        }
        Ok(Validated(self))
    }

    pub fn name(&self) -> Option<&str> {
        provided(&self.name)
    }

    pub fn iso(&self) -> Option<&str> {
        provided(&self.iso)
    }
}
