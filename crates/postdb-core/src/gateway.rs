// crates/postdb-core/src/gateway.rs

//! All writes go through here.
//!
//! Each create derives the slug, checks uniqueness within the parent scope,
//! then checks that the parent exists, and only then asks the store to
//! insert. The store repeats the checks atomically with the write, so a
//! racing duplicate still ends up as `AlreadyExists`.

use crate::common::Entity;
use crate::error::{PostDbError, Result};
use crate::model::{
    Country, CountryId, CountryPatch, County, District, Incode, NewCountry, NewCounty,
    NewDistrict, NewIncode, NewOutcode, NewPostcode, NewWard, Outcode, Postcode, Validated, Ward,
};
use crate::text::{normalize_code, slugify};
use crate::traits::{NodeRecord, PostcodeStore};
use std::fmt::Debug;
use tracing::{info, warn};

fn slug_for(name: &str) -> Result<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(PostDbError::validation(format!(
            "name {name:?} has no letters or digits to build a slug from"
        )));
    }
    Ok(slug)
}

fn logged<T: Debug>(entity: Entity, action: &str, result: Result<T>) -> Result<T> {
    match &result {
        Ok(row) => info!(%entity, action, ?row, "mutation committed"),
        Err(err) => warn!(%entity, action, error = %err, "mutation rejected"),
    }
    result
}

fn parent_missing(entity: Entity, id: u32) -> PostDbError {
    PostDbError::ParentNotFound { entity, id }
}

pub struct MutationGateway<'a, S: PostcodeStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PostcodeStore + ?Sized> MutationGateway<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn create_country(&self, input: Validated<NewCountry>) -> Result<Country> {
        logged(Entity::Country, "create", self.insert_country(input.into_inner()))
    }

    pub fn create_county(&self, input: Validated<NewCounty>) -> Result<County> {
        logged(Entity::County, "create", self.insert_county(input.into_inner()))
    }

    pub fn create_district(&self, input: Validated<NewDistrict>) -> Result<District> {
        logged(Entity::District, "create", self.insert_district(input.into_inner()))
    }

    pub fn create_ward(&self, input: Validated<NewWard>) -> Result<Ward> {
        logged(Entity::Ward, "create", self.insert_ward(input.into_inner()))
    }

    pub fn create_outcode(&self, input: Validated<NewOutcode>) -> Result<Outcode> {
        logged(Entity::Outcode, "create", self.insert_outcode(&input.code))
    }

    pub fn create_incode(&self, input: Validated<NewIncode>) -> Result<Incode> {
        logged(Entity::Incode, "create", self.insert_incode(&input.code))
    }

    pub fn create_postcode(&self, input: Validated<NewPostcode>) -> Result<Postcode> {
        logged(Entity::Postcode, "create", self.insert_postcode(&input))
    }

    /// Merge-patch a country: absent or empty fields keep their stored value,
    /// and the slug is recomputed from the resulting name.
    pub fn update_country(&self, id: CountryId, patch: Validated<CountryPatch>) -> Result<Country> {
        logged(Entity::Country, "update", self.patch_country(id, &patch))
    }

    /// Refused with `ReferentialConflict` while any county references the country.
    pub fn delete_country(&self, id: CountryId) -> Result<()> {
        logged(Entity::Country, "delete", self.remove_country(id))
    }

    fn insert_country(&self, input: NewCountry) -> Result<Country> {
        let name = input.name.trim();
        let slug = slug_for(name)?;
        if self.store.country_by_slug(&slug)?.is_some() {
            return Err(PostDbError::already_exists(Entity::Country, name));
        }
        self.store
            .insert_country(name, &slug, Some(input.iso.trim()))
    }

    fn insert_county(&self, input: NewCounty) -> Result<County> {
        let name = input.name.trim();
        let slug = slug_for(name)?;
        if self.store.county_by_slug(input.country_id, &slug)?.is_some() {
            return Err(PostDbError::already_exists(Entity::County, name));
        }
        if self.store.country_by_id(input.country_id)?.is_none() {
            return Err(parent_missing(Entity::Country, input.country_id));
        }
        self.store.insert_county(NodeRecord {
            name,
            slug: &slug,
            code: input.code.trim(),
            parent_id: input.country_id,
        })
    }

    fn insert_district(&self, input: NewDistrict) -> Result<District> {
        let name = input.name.trim();
        let slug = slug_for(name)?;
        if self.store.district_by_slug(input.county_id, &slug)?.is_some() {
            return Err(PostDbError::already_exists(Entity::District, name));
        }
        if self.store.county_by_id(input.county_id)?.is_none() {
            return Err(parent_missing(Entity::County, input.county_id));
        }
        self.store.insert_district(NodeRecord {
            name,
            slug: &slug,
            code: input.code.trim(),
            parent_id: input.county_id,
        })
    }

    fn insert_ward(&self, input: NewWard) -> Result<Ward> {
        let name = input.name.trim();
        let slug = slug_for(name)?;
        if self.store.ward_by_slug(input.district_id, &slug)?.is_some() {
            return Err(PostDbError::already_exists(Entity::Ward, name));
        }
        if self.store.district_by_id(input.district_id)?.is_none() {
            return Err(parent_missing(Entity::District, input.district_id));
        }
        self.store.insert_ward(NodeRecord {
            name,
            slug: &slug,
            code: input.code.trim(),
            parent_id: input.district_id,
        })
    }

    fn insert_outcode(&self, code: &str) -> Result<Outcode> {
        let code = normalize_code(code);
        if self.store.outcode_by_code(&code)?.is_some() {
            return Err(PostDbError::already_exists(Entity::Outcode, code));
        }
        self.store.insert_outcode(&code)
    }

    fn insert_incode(&self, code: &str) -> Result<Incode> {
        let code = normalize_code(code);
        if self.store.incode_by_code(&code)?.is_some() {
            return Err(PostDbError::already_exists(Entity::Incode, code));
        }
        self.store.insert_incode(&code)
    }

    fn insert_postcode(&self, input: &NewPostcode) -> Result<Postcode> {
        if self
            .store
            .postcode_by_parts(input.outcode_id, input.incode_id)?
            .is_some()
        {
            return Err(PostDbError::already_exists(
                Entity::Postcode,
                format!("outcodeId {} / incodeId {}", input.outcode_id, input.incode_id),
            ));
        }
        if self.store.outcode_by_id(input.outcode_id)?.is_none() {
            return Err(parent_missing(Entity::Outcode, input.outcode_id));
        }
        if self.store.incode_by_id(input.incode_id)?.is_none() {
            return Err(parent_missing(Entity::Incode, input.incode_id));
        }
        if self.store.ward_by_id(input.ward_id)?.is_none() {
            return Err(parent_missing(Entity::Ward, input.ward_id));
        }
        self.store.insert_postcode(input)
    }

    fn patch_country(&self, id: CountryId, patch: &CountryPatch) -> Result<Country> {
        let existing = self
            .store
            .country_by_id(id)?
            .ok_or(PostDbError::NotFound(Entity::Country))?;

        let name = patch.name().unwrap_or(&existing.name).to_string();
        let iso = patch.iso().map(str::to_string).or(existing.iso);
        let slug = slug_for(&name)?;

        self.store.update_country(&Country {
            id,
            name,
            slug,
            iso,
        })
    }

    fn remove_country(&self, id: CountryId) -> Result<()> {
        if self.store.country_by_id(id)?.is_none() {
            return Err(PostDbError::NotFound(Entity::Country));
        }
        let dependents = self.store.count_counties_of(id)?;
        if dependents > 0 {
            return Err(PostDbError::ReferentialConflict {
                entity: Entity::Country,
                id,
                dependent: Entity::County,
            });
        }
        self.store.delete_country(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeSummary;
    use crate::resolver::Resolver;
    use crate::store::MemoryStore;

    fn country(name: &str, iso: &str) -> Validated<NewCountry> {
        NewCountry {
            name: name.into(),
            iso: iso.into(),
        }
        .validate()
        .unwrap()
    }

    fn county(name: &str, code: &str, country_id: u32) -> Validated<NewCounty> {
        NewCounty {
            name: name.into(),
            code: code.into(),
            country_id,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn created_county_shows_up_under_its_country() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);

        let uk = gw.create_country(country("United Kingdom", "GB")).unwrap();
        assert_eq!(uk.slug, "united-kingdom");
        assert_eq!(uk.id, 1);
        let london = gw.create_county(county("Greater London", "LND", 1)).unwrap();
        assert_eq!(london.slug, "greater-london");

        let view = Resolver::new(&store).get_county("united-kingdom").unwrap();
        assert_eq!(view.country.iso.as_deref(), Some("GB"));
        assert_eq!(
            view.counties,
            vec![NodeSummary {
                code: "LND".into(),
                name: "Greater London".into(),
                slug: "greater-london".into(),
            }]
        );
    }

    #[test]
    fn same_name_under_same_parent_collides() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);
        gw.create_country(country("England", "ENG")).unwrap();
        gw.create_county(county("Kent", "K1", 1)).unwrap();

        // Different spelling, same slug.
        let err = gw.create_county(county("  KENT ", "K2", 1)).unwrap_err();
        assert!(err.is_conflict());
        assert!(matches!(err, PostDbError::AlreadyExists { entity: Entity::County, .. }));

        let err = gw.create_country(country("england", "EN")).unwrap_err();
        assert!(matches!(err, PostDbError::AlreadyExists { entity: Entity::Country, .. }));
    }

    #[test]
    fn uniqueness_is_checked_before_parent_existence() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);

        let err = gw.create_county(county("Kent", "K1", 7)).unwrap_err();
        assert!(matches!(err, PostDbError::ParentNotFound { entity: Entity::Country, id: 7 }));
    }

    #[test]
    fn punctuation_only_names_are_rejected() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);
        let err = gw.create_country(country("!!!", "XX")).unwrap_err();
        assert!(matches!(err, PostDbError::Validation(_)));
    }

    #[test]
    fn codes_are_stored_lowercase() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);
        let out = gw
            .create_outcode(NewOutcode { code: "SW1A".into() }.validate().unwrap())
            .unwrap();
        assert_eq!(out.code, "sw1a");
        let err = gw
            .create_outcode(NewOutcode { code: "sw1a".into() }.validate().unwrap())
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn postcode_parents_are_checked_in_order() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);
        gw.create_outcode(NewOutcode { code: "e1".into() }.validate().unwrap())
            .unwrap();
        let input = NewPostcode {
            outcode_id: 1,
            incode_id: 4,
            ward_id: 9,
            latitude: 51.5,
            longitude: -0.05,
        };
        let err = gw.create_postcode(input.validate().unwrap()).unwrap_err();
        assert!(matches!(err, PostDbError::ParentNotFound { entity: Entity::Incode, id: 4 }));
    }

    #[test]
    fn update_merges_and_recomputes_slug() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);
        gw.create_country(country("Great Britain", "GB")).unwrap();

        let patch = CountryPatch {
            name: Some("United Kingdom".into()),
            iso: Some(String::new()),
        };
        let updated = gw.update_country(1, patch.validate().unwrap()).unwrap();
        assert_eq!(updated.slug, "united-kingdom");
        assert_eq!(updated.iso.as_deref(), Some("GB"));

        let err = gw
            .update_country(99, CountryPatch::default().validate().unwrap())
            .unwrap_err();
        assert!(matches!(err, PostDbError::NotFound(Entity::Country)));
    }

    #[test]
    fn update_cannot_take_another_countrys_name() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);
        gw.create_country(country("Wales", "WLS")).unwrap();
        gw.create_country(country("Scotland", "SCT")).unwrap();

        let patch = CountryPatch {
            name: Some("Wales".into()),
            iso: None,
        };
        let err = gw.update_country(2, patch.validate().unwrap()).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn delete_is_guarded_by_dependent_counties() {
        let store = MemoryStore::new();
        let gw = MutationGateway::new(&store);
        gw.create_country(country("England", "ENG")).unwrap();
        gw.create_country(country("Wales", "WLS")).unwrap();
        gw.create_county(county("Kent", "K1", 1)).unwrap();

        let err = gw.delete_country(1).unwrap_err();
        assert!(matches!(
            err,
            PostDbError::ReferentialConflict { entity: Entity::Country, id: 1, dependent: Entity::County }
        ));

        gw.delete_country(2).unwrap();
        assert!(store.country_by_id(2).unwrap().is_none());
        assert!(matches!(gw.delete_country(2), Err(PostDbError::NotFound(Entity::Country))));
    }
}
