// crates/postdb-core/src/store/memory.rs
use crate::common::{DbStats, Entity, Page};
use crate::error::{PostDbError, Result};
use crate::model::{
    Country, CountryId, County, CountyId, District, DistrictId, Incode, IncodeId, NewPostcode,
    Outcode, OutcodeId, Postcode, PostcodeDetail, PostcodePair, Ward, WardId,
};
use crate::traits::{NodeRecord, PostcodeStore, WardChain};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The raw tables. Every vector is sorted by id.
///
/// Rows are only ever appended (ids grow monotonically), except countries
/// which may be deleted; `country_seq` keeps deleted ids from being reused.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tables {
    pub countries: Vec<Country>,
    pub counties: Vec<County>,
    pub districts: Vec<District>,
    pub wards: Vec<Ward>,
    pub outcodes: Vec<Outcode>,
    pub incodes: Vec<Incode>,
    pub postcodes: Vec<Postcode>,
    #[serde(default)]
    country_seq: u32,
}

fn by_id<T>(rows: &[T], id: u32, key: impl Fn(&T) -> u32) -> Option<&T> {
    rows.binary_search_by_key(&id, key)
        .ok()
        .map(|idx| &rows[idx])
}

fn next_id<T>(rows: &[T], key: impl Fn(&T) -> u32) -> u32 {
    rows.last().map(key).unwrap_or(0) + 1
}

impl Tables {
    fn sort_by_id(&mut self) {
        self.countries.sort_by_key(|r| r.id);
        self.counties.sort_by_key(|r| r.id);
        self.districts.sort_by_key(|r| r.id);
        self.wards.sort_by_key(|r| r.id);
        self.outcodes.sort_by_key(|r| r.id);
        self.incodes.sort_by_key(|r| r.id);
        self.postcodes.sort_by_key(|r| r.id);
    }

    fn country(&self, id: CountryId) -> Option<&Country> {
        by_id(&self.countries, id, |c| c.id)
    }

    fn county(&self, id: CountyId) -> Option<&County> {
        by_id(&self.counties, id, |c| c.id)
    }

    fn district(&self, id: DistrictId) -> Option<&District> {
        by_id(&self.districts, id, |d| d.id)
    }

    fn ward(&self, id: WardId) -> Option<&Ward> {
        by_id(&self.wards, id, |w| w.id)
    }

    fn outcode(&self, id: OutcodeId) -> Option<&Outcode> {
        by_id(&self.outcodes, id, |o| o.id)
    }

    fn incode(&self, id: IncodeId) -> Option<&Incode> {
        by_id(&self.incodes, id, |i| i.id)
    }

    fn country_by_slug(&self, slug: &str) -> Option<&Country> {
        self.countries.iter().find(|c| c.slug == slug)
    }

    fn county_by_slug(&self, country_id: CountryId, slug: &str) -> Option<&County> {
        self.counties
            .iter()
            .find(|c| c.country_id == country_id && c.slug == slug)
    }

    fn district_by_slug(&self, county_id: CountyId, slug: &str) -> Option<&District> {
        self.districts
            .iter()
            .find(|d| d.county_id == county_id && d.slug == slug)
    }

    fn ward_by_slug(&self, district_id: DistrictId, slug: &str) -> Option<&Ward> {
        self.wards
            .iter()
            .find(|w| w.district_id == district_id && w.slug == slug)
    }

    fn postcode_by_parts(&self, outcode_id: OutcodeId, incode_id: IncodeId) -> Option<&Postcode> {
        self.postcodes
            .iter()
            .find(|p| p.outcode_id == outcode_id && p.incode_id == incode_id)
    }

    /// Inner join postcode -> outcode/incode; rows with a dangling half drop out.
    fn pair(&self, p: &Postcode) -> Option<PostcodePair> {
        let outcode = self.outcode(p.outcode_id)?;
        let incode = self.incode(p.incode_id)?;
        Some(PostcodePair::new(&outcode.code, &incode.code))
    }

    fn detail(&self, p: &Postcode) -> Option<PostcodeDetail> {
        let ward = self.ward(p.ward_id)?;
        let district = self.district(ward.district_id)?;
        let county = self.county(district.county_id)?;
        let country = self.country(county.country_id)?;
        Some(PostcodeDetail {
            postcode: p.clone(),
            outcode: self.outcode(p.outcode_id)?.clone(),
            incode: self.incode(p.incode_id)?.clone(),
            ward: ward.clone(),
            district: district.clone(),
            county: county.clone(),
            country: country.clone(),
        })
    }

    pub fn stats(&self) -> DbStats {
        DbStats {
            countries: self.countries.len(),
            counties: self.counties.len(),
            districts: self.districts.len(),
            wards: self.wards.len(),
            outcodes: self.outcodes.len(),
            incodes: self.incodes.len(),
            postcodes: self.postcodes.len(),
        }
    }
}

/// In-process store: flat tables behind a `RwLock`.
///
/// Each write takes the write lock for its whole check-and-insert, so the
/// uniqueness and parent checks below are atomic with the insert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing tables; rows are re-sorted by id so lookups can bisect.
    pub fn from_tables(mut tables: Tables) -> Self {
        tables.sort_by_id();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// A consistent copy of every table.
    pub fn snapshot(&self) -> Result<Tables> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| PostDbError::Storage(format!("Lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| PostDbError::Storage(format!("Lock poisoned: {e}")))
    }

    fn insert_node<T: Clone>(
        rows: &mut Vec<T>,
        id_of: impl Fn(&T) -> u32,
        build: impl FnOnce(u32) -> T,
    ) -> T {
        let row = build(next_id(rows, id_of));
        rows.push(row.clone());
        row
    }
}

impl PostcodeStore for MemoryStore {
    fn country_by_id(&self, id: CountryId) -> Result<Option<Country>> {
        Ok(self.read()?.country(id).cloned())
    }

    fn country_by_slug(&self, slug: &str) -> Result<Option<Country>> {
        Ok(self.read()?.country_by_slug(slug).cloned())
    }

    fn county_by_id(&self, id: CountyId) -> Result<Option<County>> {
        Ok(self.read()?.county(id).cloned())
    }

    fn county_by_slug(&self, country_id: CountryId, slug: &str) -> Result<Option<County>> {
        Ok(self.read()?.county_by_slug(country_id, slug).cloned())
    }

    fn district_by_id(&self, id: DistrictId) -> Result<Option<District>> {
        Ok(self.read()?.district(id).cloned())
    }

    fn district_by_slug(&self, county_id: CountyId, slug: &str) -> Result<Option<District>> {
        Ok(self.read()?.district_by_slug(county_id, slug).cloned())
    }

    fn ward_by_id(&self, id: WardId) -> Result<Option<Ward>> {
        Ok(self.read()?.ward(id).cloned())
    }

    fn ward_by_slug(&self, district_id: DistrictId, slug: &str) -> Result<Option<Ward>> {
        Ok(self.read()?.ward_by_slug(district_id, slug).cloned())
    }

    fn counties_of(&self, country_id: CountryId) -> Result<Vec<County>> {
        let t = self.read()?;
        Ok(t.counties
            .iter()
            .filter(|c| c.country_id == country_id)
            .cloned()
            .collect())
    }

    fn districts_of(&self, county_id: CountyId) -> Result<Vec<District>> {
        let t = self.read()?;
        Ok(t.districts
            .iter()
            .filter(|d| d.county_id == county_id)
            .cloned()
            .collect())
    }

    fn wards_of(&self, district_id: DistrictId) -> Result<Vec<Ward>> {
        let t = self.read()?;
        Ok(t.wards
            .iter()
            .filter(|w| w.district_id == district_id)
            .cloned()
            .collect())
    }

    fn count_counties_of(&self, country_id: CountryId) -> Result<usize> {
        let t = self.read()?;
        Ok(t.counties
            .iter()
            .filter(|c| c.country_id == country_id)
            .count())
    }

    fn resolve_ward_chain(&self, chain: &WardChain<'_>) -> Result<Option<Ward>> {
        let t = self.read()?;
        let ward = t
            .country_by_slug(chain.country)
            .and_then(|c| t.county_by_slug(c.id, chain.county))
            .and_then(|c| t.district_by_slug(c.id, chain.district))
            .and_then(|d| t.ward_by_slug(d.id, chain.ward));
        Ok(ward.cloned())
    }

    fn outcode_by_id(&self, id: OutcodeId) -> Result<Option<Outcode>> {
        Ok(self.read()?.outcode(id).cloned())
    }

    fn outcode_by_code(&self, code: &str) -> Result<Option<Outcode>> {
        let t = self.read()?;
        Ok(t.outcodes.iter().find(|o| o.code == code).cloned())
    }

    fn incode_by_id(&self, id: IncodeId) -> Result<Option<Incode>> {
        Ok(self.read()?.incode(id).cloned())
    }

    fn incode_by_code(&self, code: &str) -> Result<Option<Incode>> {
        let t = self.read()?;
        Ok(t.incodes.iter().find(|i| i.code == code).cloned())
    }

    fn outcodes(&self, page: Page) -> Result<Vec<Outcode>> {
        let t = self.read()?;
        Ok(page.apply(t.outcodes.iter()).cloned().collect())
    }

    fn match_outcodes_by_prefix(&self, prefix: &str, page: Page) -> Result<Vec<Outcode>> {
        let t = self.read()?;
        let hits = t.outcodes.iter().filter(|o| o.code.starts_with(prefix));
        Ok(page.apply(hits).cloned().collect())
    }

    fn all_outcodes_with_prefix(&self, prefix: &str) -> Result<Vec<Outcode>> {
        let t = self.read()?;
        Ok(t.outcodes
            .iter()
            .filter(|o| o.code.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn all_incodes_with_prefix(&self, prefix: &str) -> Result<Vec<Incode>> {
        let t = self.read()?;
        Ok(t.incodes
            .iter()
            .filter(|i| i.code.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn search_outcodes(&self, needle: &str, cap: usize) -> Result<Vec<Outcode>> {
        let t = self.read()?;
        Ok(t.outcodes
            .iter()
            .filter(|o| o.code.contains(needle))
            .take(cap)
            .cloned()
            .collect())
    }

    fn search_incodes(&self, needle: &str, cap: usize) -> Result<Vec<Incode>> {
        let t = self.read()?;
        Ok(t.incodes
            .iter()
            .filter(|i| i.code.contains(needle))
            .take(cap)
            .cloned()
            .collect())
    }

    fn incodes_for_outcode(&self, outcode_id: OutcodeId, page: Page) -> Result<Vec<Incode>> {
        let t = self.read()?;
        let ids: BTreeSet<IncodeId> = t
            .postcodes
            .iter()
            .filter(|p| p.outcode_id == outcode_id)
            .map(|p| p.incode_id)
            .collect();
        let rows = ids.into_iter().filter_map(|id| t.incode(id));
        Ok(page.apply(rows).cloned().collect())
    }

    fn postcode_by_parts(
        &self,
        outcode_id: OutcodeId,
        incode_id: IncodeId,
    ) -> Result<Option<Postcode>> {
        Ok(self
            .read()?
            .postcode_by_parts(outcode_id, incode_id)
            .cloned())
    }

    fn postcode_detail(
        &self,
        outcode_id: OutcodeId,
        incode_id: IncodeId,
    ) -> Result<Option<PostcodeDetail>> {
        let t = self.read()?;
        Ok(t.postcode_by_parts(outcode_id, incode_id)
            .and_then(|p| t.detail(p)))
    }

    fn postcodes_in_ward(&self, ward_id: WardId, page: Option<Page>) -> Result<Vec<PostcodePair>> {
        let t = self.read()?;
        let pairs = t
            .postcodes
            .iter()
            .filter(|p| p.ward_id == ward_id)
            .filter_map(|p| t.pair(p));
        Ok(match page {
            Some(page) => page.apply(pairs).collect(),
            None => pairs.collect(),
        })
    }

    fn postcodes_matching(
        &self,
        outcode_ids: &[OutcodeId],
        incode_ids: Option<&[IncodeId]>,
        page: Page,
    ) -> Result<Vec<PostcodePair>> {
        let t = self.read()?;
        let outcodes: HashSet<OutcodeId> = outcode_ids.iter().copied().collect();
        let incodes: Option<HashSet<IncodeId>> = incode_ids.map(|ids| ids.iter().copied().collect());

        let hits = t
            .postcodes
            .iter()
            .filter(|p| outcodes.contains(&p.outcode_id))
            .filter(|p| incodes.as_ref().map_or(true, |ids| ids.contains(&p.incode_id)))
            .filter_map(|p| t.pair(p));
        Ok(page.apply(hits).collect())
    }

    fn stats(&self) -> Result<DbStats> {
        Ok(self.read()?.stats())
    }

    fn insert_country(&self, name: &str, slug: &str, iso: Option<&str>) -> Result<Country> {
        let mut t = self.write()?;
        if t.countries.iter().any(|c| c.slug == slug || c.name == name) {
            return Err(PostDbError::already_exists(Entity::Country, name));
        }
        let id = t.country_seq.max(next_id(&t.countries, |c| c.id) - 1) + 1;
        t.country_seq = id;
        let country = Country {
            id,
            name: name.to_owned(),
            slug: slug.to_owned(),
            iso: iso.map(str::to_owned),
        };
        t.countries.push(country.clone());
        Ok(country)
    }

    fn insert_county(&self, r: NodeRecord<'_>) -> Result<County> {
        let mut t = self.write()?;
        if t.county_by_slug(r.parent_id, r.slug).is_some() {
            return Err(PostDbError::already_exists(Entity::County, r.name));
        }
        if t.country(r.parent_id).is_none() {
            return Err(PostDbError::ParentNotFound {
                entity: Entity::Country,
                id: r.parent_id,
            });
        }
        Ok(Self::insert_node(&mut t.counties, |c| c.id, |id| County {
            id,
            name: r.name.to_owned(),
            slug: r.slug.to_owned(),
            code: r.code.to_owned(),
            country_id: r.parent_id,
        }))
    }

    fn insert_district(&self, r: NodeRecord<'_>) -> Result<District> {
        let mut t = self.write()?;
        if t.district_by_slug(r.parent_id, r.slug).is_some() {
            return Err(PostDbError::already_exists(Entity::District, r.name));
        }
        if t.county(r.parent_id).is_none() {
            return Err(PostDbError::ParentNotFound {
                entity: Entity::County,
                id: r.parent_id,
            });
        }
        Ok(Self::insert_node(&mut t.districts, |d| d.id, |id| District {
            id,
            name: r.name.to_owned(),
            slug: r.slug.to_owned(),
            code: r.code.to_owned(),
            county_id: r.parent_id,
        }))
    }

    fn insert_ward(&self, r: NodeRecord<'_>) -> Result<Ward> {
        let mut t = self.write()?;
        if t.ward_by_slug(r.parent_id, r.slug).is_some() {
            return Err(PostDbError::already_exists(Entity::Ward, r.name));
        }
        if t.district(r.parent_id).is_none() {
            return Err(PostDbError::ParentNotFound {
                entity: Entity::District,
                id: r.parent_id,
            });
        }
        Ok(Self::insert_node(&mut t.wards, |w| w.id, |id| Ward {
            id,
            name: r.name.to_owned(),
            slug: r.slug.to_owned(),
            code: r.code.to_owned(),
            district_id: r.parent_id,
        }))
    }

    fn insert_outcode(&self, code: &str) -> Result<Outcode> {
        let mut t = self.write()?;
        if t.outcodes.iter().any(|o| o.code == code) {
            return Err(PostDbError::already_exists(Entity::Outcode, code));
        }
        Ok(Self::insert_node(&mut t.outcodes, |o| o.id, |id| Outcode {
            id,
            code: code.to_owned(),
        }))
    }

    fn insert_incode(&self, code: &str) -> Result<Incode> {
        let mut t = self.write()?;
        if t.incodes.iter().any(|i| i.code == code) {
            return Err(PostDbError::already_exists(Entity::Incode, code));
        }
        Ok(Self::insert_node(&mut t.incodes, |i| i.id, |id| Incode {
            id,
            code: code.to_owned(),
        }))
    }

    fn insert_postcode(&self, r: &NewPostcode) -> Result<Postcode> {
        let mut t = self.write()?;
        if t.postcode_by_parts(r.outcode_id, r.incode_id).is_some() {
            return Err(PostDbError::already_exists(
                Entity::Postcode,
                format!("outcodeId {} / incodeId {}", r.outcode_id, r.incode_id),
            ));
        }
        let missing = if t.outcode(r.outcode_id).is_none() {
            Some((Entity::Outcode, r.outcode_id))
        } else if t.incode(r.incode_id).is_none() {
            Some((Entity::Incode, r.incode_id))
        } else if t.ward(r.ward_id).is_none() {
            Some((Entity::Ward, r.ward_id))
        } else {
            None
        };
        if let Some((entity, id)) = missing {
            return Err(PostDbError::ParentNotFound { entity, id });
        }
        Ok(Self::insert_node(&mut t.postcodes, |p| p.id, |id| Postcode {
            id,
            outcode_id: r.outcode_id,
            incode_id: r.incode_id,
            latitude: r.latitude,
            longitude: r.longitude,
            ward_id: r.ward_id,
        }))
    }

    fn update_country(&self, country: &Country) -> Result<Country> {
        let mut t = self.write()?;
        if t
            .countries
            .iter()
            .any(|c| c.id != country.id && (c.slug == country.slug || c.name == country.name))
        {
            return Err(PostDbError::already_exists(Entity::Country, &country.name));
        }
        let idx = t
            .countries
            .binary_search_by_key(&country.id, |c| c.id)
            .map_err(|_| PostDbError::NotFound(Entity::Country))?;
        t.countries[idx] = country.clone();
        Ok(country.clone())
    }

    fn delete_country(&self, id: CountryId) -> Result<()> {
        let mut t = self.write()?;
        let idx = t
            .countries
            .binary_search_by_key(&id, |c| c.id)
            .map_err(|_| PostDbError::NotFound(Entity::Country))?;
        if t.counties.iter().any(|c| c.country_id == id) {
            return Err(PostDbError::ReferentialConflict {
                entity: Entity::Country,
                id,
                dependent: Entity::County,
            });
        }
        t.countries.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node<'a>(name: &'a str, slug: &'a str, parent_id: u32) -> NodeRecord<'a> {
        NodeRecord {
            name,
            slug,
            code: "X01",
            parent_id,
        }
    }

    #[test]
    fn ids_start_at_one_and_grow() {
        let store = MemoryStore::new();
        let a = store.insert_outcode("sw1a").unwrap();
        let b = store.insert_outcode("sw1p").unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[test]
    fn deleted_country_ids_are_not_reused() {
        let store = MemoryStore::new();
        store.insert_country("A", "a", None).unwrap();
        let b = store.insert_country("B", "b", None).unwrap();
        store.delete_country(b.id).unwrap();
        let c = store.insert_country("C", "c", None).unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn store_rejects_duplicates_itself() {
        let store = MemoryStore::new();
        let uk = store.insert_country("United Kingdom", "united-kingdom", Some("GB")).unwrap();
        store.insert_county(node("Kent", "kent", uk.id)).unwrap();

        let err = store.insert_county(node("KENT", "kent", uk.id)).unwrap_err();
        assert!(matches!(
            err,
            PostDbError::AlreadyExists {
                entity: Entity::County,
                ..
            }
        ));
        let err = store.insert_county(node("Kent", "kent", 42)).unwrap_err();
        assert!(matches!(
            err,
            PostDbError::ParentNotFound {
                entity: Entity::Country,
                id: 42
            }
        ));
    }

    #[test]
    fn dangling_postcode_rows_drop_out_of_joins() {
        let mut tables = Tables::default();
        tables.outcodes.push(Outcode {
            id: 1,
            code: "sw1a".into(),
        });
        tables.postcodes.push(Postcode {
            id: 1,
            outcode_id: 1,
            incode_id: 7,
            latitude: 0.0,
            longitude: 0.0,
            ward_id: 1,
        });
        let store = MemoryStore::from_tables(tables);
        assert!(store
            .postcodes_matching(&[1], None, Page::default())
            .unwrap()
            .is_empty());
        assert!(store.postcode_detail(1, 7).unwrap().is_none());
    }

    #[test]
    fn out_of_order_tables_still_resolve() {
        let mut tables = Tables::default();
        for (id, code) in [(3, "e1"), (1, "sw1a"), (2, "sw1p")] {
            tables.outcodes.push(Outcode {
                id,
                code: code.into(),
            });
        }
        tables.incodes.push(Incode {
            id: 1,
            code: "1aa".into(),
        });
        tables.postcodes.push(Postcode {
            id: 1,
            outcode_id: 1,
            incode_id: 1,
            latitude: 51.5,
            longitude: -0.14,
            ward_id: 1,
        });
        let store = MemoryStore::from_tables(tables);

        assert_eq!(store.outcode_by_id(1).unwrap().unwrap().code, "sw1a");
        assert_eq!(store.outcode_by_id(3).unwrap().unwrap().code, "e1");
        assert_eq!(store.insert_outcode("n1").unwrap().id, 4);
    }
}
