// crates/postdb-core/src/store/sqlite.rs

//! SQLite-backed store.
//!
//! The schema carries the invariants as UNIQUE indexes; writes run their
//! checks and the insert inside one IMMEDIATE transaction, and a UNIQUE
//! violation that still slips through is reported as `AlreadyExists`.

use crate::common::{DbStats, Entity, Page};
use crate::error::{PostDbError, Result};
use crate::model::{
    Country, CountryId, County, CountyId, District, DistrictId, Incode, IncodeId, NewPostcode,
    Outcode, OutcodeId, Postcode, PostcodeDetail, PostcodePair, Ward, WardId,
};
use crate::traits::{NodeRecord, PostcodeStore, WardChain};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS countries (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    iso  TEXT
);

CREATE TABLE IF NOT EXISTS counties (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    slug       TEXT NOT NULL,
    code       TEXT NOT NULL,
    country_id INTEGER NOT NULL REFERENCES countries(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_county_slug_country ON counties(slug, country_id);

CREATE TABLE IF NOT EXISTS districts (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT NOT NULL,
    slug      TEXT NOT NULL,
    code      TEXT NOT NULL,
    county_id INTEGER NOT NULL REFERENCES counties(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_district_slug_county ON districts(slug, county_id);

CREATE TABLE IF NOT EXISTS wards (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL,
    code        TEXT NOT NULL,
    district_id INTEGER NOT NULL REFERENCES districts(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_ward_slug_district ON wards(slug, district_id);

CREATE TABLE IF NOT EXISTS outcodes (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS incodes (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS postcodes (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    outcode_id INTEGER NOT NULL REFERENCES outcodes(id),
    incode_id  INTEGER NOT NULL REFERENCES incodes(id),
    latitude   REAL NOT NULL,
    longitude  REAL NOT NULL,
    ward_id    INTEGER NOT NULL REFERENCES wards(id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_postcode ON postcodes(outcode_id, incode_id);
CREATE INDEX IF NOT EXISTS idx_postcodes_outcode ON postcodes(outcode_id);
CREATE INDEX IF NOT EXISTS idx_postcodes_ward ON postcodes(ward_id);
";

const POSTCODE_DETAIL_SQL: &str = "
SELECT p.id, p.outcode_id, p.incode_id, p.latitude, p.longitude, p.ward_id,
       o.code, i.code,
       w.name, w.slug, w.code, w.district_id,
       d.name, d.slug, d.code, d.county_id,
       c.name, c.slug, c.code, c.country_id,
       k.name, k.slug, k.iso
FROM postcodes p
JOIN outcodes o  ON o.id = p.outcode_id
JOIN incodes i   ON i.id = p.incode_id
JOIN wards w     ON w.id = p.ward_id
JOIN districts d ON d.id = w.district_id
JOIN counties c  ON c.id = d.county_id
JOIN countries k ON k.id = c.country_id
WHERE p.outcode_id = ?1 AND p.incode_id = ?2
LIMIT 1";

/// SQLite implementation of [`PostcodeStore`].
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening SQLite database at {:?}", path);
        let conn = Connection::open(path)?;
        // Some filesystems cannot do WAL; the default journal still works.
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode = WAL;") {
            warn!(error = %e, "WAL journal unavailable, using the default journal");
        }
        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite database");
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA synchronous = NORMAL;")?;
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            info!("Creating database schema v{}", SCHEMA_VERSION);
            conn.execute_batch(SCHEMA)?;
            conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PostDbError::Storage(format!("Lock poisoned: {e}")))
    }

    /// Run `f` inside an IMMEDIATE transaction; any error rolls back.
    fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    fn optional<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        let conn = self.lock()?;
        Ok(conn.query_row(sql, params, map).optional()?)
    }

    fn list<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, map)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

// --- Row mapping ---------------------------------------------------------------

fn country_row(row: &Row<'_>) -> rusqlite::Result<Country> {
    Ok(Country {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        iso: row.get(3)?,
    })
}

fn county_row(row: &Row<'_>) -> rusqlite::Result<County> {
    Ok(County {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        code: row.get(3)?,
        country_id: row.get(4)?,
    })
}

fn district_row(row: &Row<'_>) -> rusqlite::Result<District> {
    Ok(District {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        code: row.get(3)?,
        county_id: row.get(4)?,
    })
}

fn ward_row(row: &Row<'_>) -> rusqlite::Result<Ward> {
    Ok(Ward {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        code: row.get(3)?,
        district_id: row.get(4)?,
    })
}

fn outcode_row(row: &Row<'_>) -> rusqlite::Result<Outcode> {
    Ok(Outcode {
        id: row.get(0)?,
        code: row.get(1)?,
    })
}

fn incode_row(row: &Row<'_>) -> rusqlite::Result<Incode> {
    Ok(Incode {
        id: row.get(0)?,
        code: row.get(1)?,
    })
}

fn postcode_row(row: &Row<'_>) -> rusqlite::Result<Postcode> {
    Ok(Postcode {
        id: row.get(0)?,
        outcode_id: row.get(1)?,
        incode_id: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        ward_id: row.get(5)?,
    })
}

fn pair_row(row: &Row<'_>) -> rusqlite::Result<PostcodePair> {
    Ok(PostcodePair {
        outcode: row.get(0)?,
        incode: row.get(1)?,
    })
}

fn detail_row(row: &Row<'_>) -> rusqlite::Result<PostcodeDetail> {
    let postcode = postcode_row(row)?;
    let ward = Ward {
        id: postcode.ward_id,
        name: row.get(8)?,
        slug: row.get(9)?,
        code: row.get(10)?,
        district_id: row.get(11)?,
    };
    let district = District {
        id: ward.district_id,
        name: row.get(12)?,
        slug: row.get(13)?,
        code: row.get(14)?,
        county_id: row.get(15)?,
    };
    let county = County {
        id: district.county_id,
        name: row.get(16)?,
        slug: row.get(17)?,
        code: row.get(18)?,
        country_id: row.get(19)?,
    };
    let country = Country {
        id: county.country_id,
        name: row.get(20)?,
        slug: row.get(21)?,
        iso: row.get(22)?,
    };
    Ok(PostcodeDetail {
        outcode: Outcode {
            id: postcode.outcode_id,
            code: row.get(6)?,
        },
        incode: Incode {
            id: postcode.incode_id,
            code: row.get(7)?,
        },
        postcode,
        ward,
        district,
        county,
        country,
    })
}

// --- Helpers -------------------------------------------------------------------

/// Escape `LIKE` wildcards so user input only matches literally.
fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn prefix_pattern(prefix: &str) -> String {
    format!("{}%", like_escape(prefix))
}

fn substring_pattern(needle: &str) -> String {
    format!("%{}%", like_escape(needle))
}

fn sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn row_id(tx: &Transaction<'_>) -> Result<u32> {
    u32::try_from(tx.last_insert_rowid())
        .map_err(|_| PostDbError::Storage("row id out of range".into()))
}

fn exists(tx: &Transaction<'_>, sql: &str, params: impl rusqlite::Params) -> Result<bool> {
    Ok(tx.query_row(sql, params, |row| row.get(0))?)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Map a UNIQUE/PRIMARY KEY violation to `AlreadyExists`, anything else to `Sqlite`.
fn insert_error(err: rusqlite::Error, entity: Entity, key: &str) -> PostDbError {
    use rusqlite::ffi;
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            PostDbError::already_exists(entity, key)
        }
        _ => PostDbError::Sqlite(err),
    }
}

/// Where a parented hierarchy level lives.
struct NodeTable {
    entity: Entity,
    parent: Entity,
    table: &'static str,
    parent_table: &'static str,
    parent_column: &'static str,
}

const COUNTIES: NodeTable = NodeTable {
    entity: Entity::County,
    parent: Entity::Country,
    table: "counties",
    parent_table: "countries",
    parent_column: "country_id",
};

const DISTRICTS: NodeTable = NodeTable {
    entity: Entity::District,
    parent: Entity::County,
    table: "districts",
    parent_table: "counties",
    parent_column: "county_id",
};

const WARDS: NodeTable = NodeTable {
    entity: Entity::Ward,
    parent: Entity::District,
    table: "wards",
    parent_table: "districts",
    parent_column: "district_id",
};

impl SqliteStore {
    fn insert_node<T>(
        &self,
        t: &NodeTable,
        r: NodeRecord<'_>,
        build: impl FnOnce(u32) -> T,
    ) -> Result<T> {
        self.with_tx(|tx| {
            let dup_sql = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = ?1 AND {} = ?2)",
                t.table, t.parent_column
            );
            if exists(tx, &dup_sql, params![r.slug, r.parent_id])? {
                return Err(PostDbError::already_exists(t.entity, r.name));
            }
            let parent_sql = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
                t.parent_table
            );
            if !exists(tx, &parent_sql, params![r.parent_id])? {
                return Err(PostDbError::ParentNotFound {
                    entity: t.parent,
                    id: r.parent_id,
                });
            }
            let insert_sql = format!(
                "INSERT INTO {} (name, slug, code, {}) VALUES (?1, ?2, ?3, ?4)",
                t.table, t.parent_column
            );
            tx.execute(&insert_sql, params![r.name, r.slug, r.code, r.parent_id])
                .map_err(|e| insert_error(e, t.entity, r.name))?;
            Ok(build(row_id(tx)?))
        })
    }

    fn insert_code(&self, entity: Entity, table: &str, code: &str) -> Result<u32> {
        self.with_tx(|tx| {
            let dup_sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE code = ?1)");
            if exists(tx, &dup_sql, params![code])? {
                return Err(PostDbError::already_exists(entity, code));
            }
            tx.execute(&format!("INSERT INTO {table} (code) VALUES (?1)"), params![code])
                .map_err(|e| insert_error(e, entity, code))?;
            row_id(tx)
        })
    }
}

impl PostcodeStore for SqliteStore {
    fn country_by_id(&self, id: CountryId) -> Result<Option<Country>> {
        self.optional(
            "SELECT id, name, slug, iso FROM countries WHERE id = ?1",
            params![id],
            country_row,
        )
    }

    fn country_by_slug(&self, slug: &str) -> Result<Option<Country>> {
        self.optional(
            "SELECT id, name, slug, iso FROM countries WHERE slug = ?1 LIMIT 1",
            params![slug],
            country_row,
        )
    }

    fn county_by_id(&self, id: CountyId) -> Result<Option<County>> {
        self.optional(
            "SELECT id, name, slug, code, country_id FROM counties WHERE id = ?1",
            params![id],
            county_row,
        )
    }

    fn county_by_slug(&self, country_id: CountryId, slug: &str) -> Result<Option<County>> {
        self.optional(
            "SELECT id, name, slug, code, country_id FROM counties
             WHERE slug = ?1 AND country_id = ?2 LIMIT 1",
            params![slug, country_id],
            county_row,
        )
    }

    fn district_by_id(&self, id: DistrictId) -> Result<Option<District>> {
        self.optional(
            "SELECT id, name, slug, code, county_id FROM districts WHERE id = ?1",
            params![id],
            district_row,
        )
    }

    fn district_by_slug(&self, county_id: CountyId, slug: &str) -> Result<Option<District>> {
        self.optional(
            "SELECT id, name, slug, code, county_id FROM districts
             WHERE slug = ?1 AND county_id = ?2 LIMIT 1",
            params![slug, county_id],
            district_row,
        )
    }

    fn ward_by_id(&self, id: WardId) -> Result<Option<Ward>> {
        self.optional(
            "SELECT id, name, slug, code, district_id FROM wards WHERE id = ?1",
            params![id],
            ward_row,
        )
    }

    fn ward_by_slug(&self, district_id: DistrictId, slug: &str) -> Result<Option<Ward>> {
        self.optional(
            "SELECT id, name, slug, code, district_id FROM wards
             WHERE slug = ?1 AND district_id = ?2 LIMIT 1",
            params![slug, district_id],
            ward_row,
        )
    }

    fn counties_of(&self, country_id: CountryId) -> Result<Vec<County>> {
        self.list(
            "SELECT id, name, slug, code, country_id FROM counties WHERE country_id = ?1 ORDER BY id",
            params![country_id],
            county_row,
        )
    }

    fn districts_of(&self, county_id: CountyId) -> Result<Vec<District>> {
        self.list(
            "SELECT id, name, slug, code, county_id FROM districts WHERE county_id = ?1 ORDER BY id",
            params![county_id],
            district_row,
        )
    }

    fn wards_of(&self, district_id: DistrictId) -> Result<Vec<Ward>> {
        self.list(
            "SELECT id, name, slug, code, district_id FROM wards WHERE district_id = ?1 ORDER BY id",
            params![district_id],
            ward_row,
        )
    }

    fn count_counties_of(&self, country_id: CountryId) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM counties WHERE country_id = ?1",
            params![country_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    fn resolve_ward_chain(&self, chain: &WardChain<'_>) -> Result<Option<Ward>> {
        self.optional(
            "SELECT w.id, w.name, w.slug, w.code, w.district_id
             FROM wards w
             JOIN districts d ON d.id = w.district_id
             JOIN counties c  ON c.id = d.county_id
             JOIN countries k ON k.id = c.country_id
             WHERE k.slug = ?1 AND c.slug = ?2 AND d.slug = ?3 AND w.slug = ?4
             LIMIT 1",
            params![chain.country, chain.county, chain.district, chain.ward],
            ward_row,
        )
    }

    fn outcode_by_id(&self, id: OutcodeId) -> Result<Option<Outcode>> {
        self.optional(
            "SELECT id, code FROM outcodes WHERE id = ?1",
            params![id],
            outcode_row,
        )
    }

    fn outcode_by_code(&self, code: &str) -> Result<Option<Outcode>> {
        self.optional(
            "SELECT id, code FROM outcodes WHERE code = ?1 LIMIT 1",
            params![code],
            outcode_row,
        )
    }

    fn incode_by_id(&self, id: IncodeId) -> Result<Option<Incode>> {
        self.optional(
            "SELECT id, code FROM incodes WHERE id = ?1",
            params![id],
            incode_row,
        )
    }

    fn incode_by_code(&self, code: &str) -> Result<Option<Incode>> {
        self.optional(
            "SELECT id, code FROM incodes WHERE code = ?1 LIMIT 1",
            params![code],
            incode_row,
        )
    }

    fn outcodes(&self, page: Page) -> Result<Vec<Outcode>> {
        self.list(
            "SELECT id, code FROM outcodes ORDER BY id LIMIT ?1 OFFSET ?2",
            params![sql_int(page.limit), sql_int(page.skip)],
            outcode_row,
        )
    }

    fn match_outcodes_by_prefix(&self, prefix: &str, page: Page) -> Result<Vec<Outcode>> {
        self.list(
            "SELECT id, code FROM outcodes WHERE code LIKE ?1 ESCAPE '\\'
             ORDER BY id LIMIT ?2 OFFSET ?3",
            params![prefix_pattern(prefix), sql_int(page.limit), sql_int(page.skip)],
            outcode_row,
        )
    }

    fn all_outcodes_with_prefix(&self, prefix: &str) -> Result<Vec<Outcode>> {
        self.list(
            "SELECT id, code FROM outcodes WHERE code LIKE ?1 ESCAPE '\\' ORDER BY id",
            params![prefix_pattern(prefix)],
            outcode_row,
        )
    }

    fn all_incodes_with_prefix(&self, prefix: &str) -> Result<Vec<Incode>> {
        self.list(
            "SELECT id, code FROM incodes WHERE code LIKE ?1 ESCAPE '\\' ORDER BY id",
            params![prefix_pattern(prefix)],
            incode_row,
        )
    }

    fn search_outcodes(&self, needle: &str, cap: usize) -> Result<Vec<Outcode>> {
        self.list(
            "SELECT id, code FROM outcodes WHERE code LIKE ?1 ESCAPE '\\' ORDER BY id LIMIT ?2",
            params![substring_pattern(needle), sql_int(cap)],
            outcode_row,
        )
    }

    fn search_incodes(&self, needle: &str, cap: usize) -> Result<Vec<Incode>> {
        self.list(
            "SELECT id, code FROM incodes WHERE code LIKE ?1 ESCAPE '\\' ORDER BY id LIMIT ?2",
            params![substring_pattern(needle), sql_int(cap)],
            incode_row,
        )
    }

    fn incodes_for_outcode(&self, outcode_id: OutcodeId, page: Page) -> Result<Vec<Incode>> {
        self.list(
            "SELECT id, code FROM incodes
             WHERE id IN (SELECT DISTINCT incode_id FROM postcodes WHERE outcode_id = ?1)
             ORDER BY id LIMIT ?2 OFFSET ?3",
            params![outcode_id, sql_int(page.limit), sql_int(page.skip)],
            incode_row,
        )
    }

    fn postcode_by_parts(
        &self,
        outcode_id: OutcodeId,
        incode_id: IncodeId,
    ) -> Result<Option<Postcode>> {
        self.optional(
            "SELECT id, outcode_id, incode_id, latitude, longitude, ward_id FROM postcodes
             WHERE outcode_id = ?1 AND incode_id = ?2 LIMIT 1",
            params![outcode_id, incode_id],
            postcode_row,
        )
    }

    fn postcode_detail(
        &self,
        outcode_id: OutcodeId,
        incode_id: IncodeId,
    ) -> Result<Option<PostcodeDetail>> {
        self.optional(
            POSTCODE_DETAIL_SQL,
            params![outcode_id, incode_id],
            detail_row,
        )
    }

    fn postcodes_in_ward(&self, ward_id: WardId, page: Option<Page>) -> Result<Vec<PostcodePair>> {
        let page = page.unwrap_or(Page::new(0, usize::MAX));
        self.list(
            "SELECT o.code, i.code FROM postcodes p
             JOIN outcodes o ON o.id = p.outcode_id
             JOIN incodes i  ON i.id = p.incode_id
             WHERE p.ward_id = ?1
             ORDER BY p.id LIMIT ?2 OFFSET ?3",
            params![ward_id, sql_int(page.limit), sql_int(page.skip)],
            pair_row,
        )
    }

    fn postcodes_matching(
        &self,
        outcode_ids: &[OutcodeId],
        incode_ids: Option<&[IncodeId]>,
        page: Page,
    ) -> Result<Vec<PostcodePair>> {
        if outcode_ids.is_empty() || incode_ids.is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT o.code, i.code FROM postcodes p
             JOIN outcodes o ON o.id = p.outcode_id
             JOIN incodes i  ON i.id = p.incode_id
             WHERE p.outcode_id IN ({})",
            placeholders(outcode_ids.len())
        );
        let mut values: Vec<i64> = outcode_ids.iter().map(|&id| i64::from(id)).collect();
        if let Some(ids) = incode_ids {
            sql.push_str(&format!(" AND p.incode_id IN ({})", placeholders(ids.len())));
            values.extend(ids.iter().map(|&id| i64::from(id)));
        }
        sql.push_str(" ORDER BY p.id LIMIT ? OFFSET ?");
        values.push(sql_int(page.limit));
        values.push(sql_int(page.skip));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), pair_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn stats(&self) -> Result<DbStats> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(DbStats {
            countries: count("countries")?,
            counties: count("counties")?,
            districts: count("districts")?,
            wards: count("wards")?,
            outcodes: count("outcodes")?,
            incodes: count("incodes")?,
            postcodes: count("postcodes")?,
        })
    }

    fn insert_country(&self, name: &str, slug: &str, iso: Option<&str>) -> Result<Country> {
        self.with_tx(|tx| {
            if exists(
                tx,
                "SELECT EXISTS(SELECT 1 FROM countries WHERE slug = ?1 OR name = ?2)",
                params![slug, name],
            )? {
                return Err(PostDbError::already_exists(Entity::Country, name));
            }
            tx.execute(
                "INSERT INTO countries (name, slug, iso) VALUES (?1, ?2, ?3)",
                params![name, slug, iso],
            )
            .map_err(|e| insert_error(e, Entity::Country, name))?;
            Ok(Country {
                id: row_id(tx)?,
                name: name.to_owned(),
                slug: slug.to_owned(),
                iso: iso.map(str::to_owned),
            })
        })
    }

    fn insert_county(&self, r: NodeRecord<'_>) -> Result<County> {
        self.insert_node(&COUNTIES, r, |id| County {
            id,
            name: r.name.to_owned(),
            slug: r.slug.to_owned(),
            code: r.code.to_owned(),
            country_id: r.parent_id,
        })
    }

    fn insert_district(&self, r: NodeRecord<'_>) -> Result<District> {
        self.insert_node(&DISTRICTS, r, |id| District {
            id,
            name: r.name.to_owned(),
            slug: r.slug.to_owned(),
            code: r.code.to_owned(),
            county_id: r.parent_id,
        })
    }

    fn insert_ward(&self, r: NodeRecord<'_>) -> Result<Ward> {
        self.insert_node(&WARDS, r, |id| Ward {
            id,
            name: r.name.to_owned(),
            slug: r.slug.to_owned(),
            code: r.code.to_owned(),
            district_id: r.parent_id,
        })
    }

    fn insert_outcode(&self, code: &str) -> Result<Outcode> {
        let id = self.insert_code(Entity::Outcode, "outcodes", code)?;
        Ok(Outcode {
            id,
            code: code.to_owned(),
        })
    }

    fn insert_incode(&self, code: &str) -> Result<Incode> {
        let id = self.insert_code(Entity::Incode, "incodes", code)?;
        Ok(Incode {
            id,
            code: code.to_owned(),
        })
    }

    fn insert_postcode(&self, r: &NewPostcode) -> Result<Postcode> {
        let key = format!("outcodeId {} / incodeId {}", r.outcode_id, r.incode_id);
        self.with_tx(|tx| {
            if exists(
                tx,
                "SELECT EXISTS(SELECT 1 FROM postcodes WHERE outcode_id = ?1 AND incode_id = ?2)",
                params![r.outcode_id, r.incode_id],
            )? {
                return Err(PostDbError::already_exists(Entity::Postcode, key.as_str()));
            }
            let parents = [
                (Entity::Outcode, "outcodes", r.outcode_id),
                (Entity::Incode, "incodes", r.incode_id),
                (Entity::Ward, "wards", r.ward_id),
            ];
            for (entity, table, id) in parents {
                let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
                if !exists(tx, &sql, params![id])? {
                    return Err(PostDbError::ParentNotFound { entity, id });
                }
            }
            tx.execute(
                "INSERT INTO postcodes (outcode_id, incode_id, latitude, longitude, ward_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![r.outcode_id, r.incode_id, r.latitude, r.longitude, r.ward_id],
            )
            .map_err(|e| insert_error(e, Entity::Postcode, &key))?;
            Ok(Postcode {
                id: row_id(tx)?,
                outcode_id: r.outcode_id,
                incode_id: r.incode_id,
                latitude: r.latitude,
                longitude: r.longitude,
                ward_id: r.ward_id,
            })
        })
    }

    fn update_country(&self, country: &Country) -> Result<Country> {
        self.with_tx(|tx| {
            if !exists(
                tx,
                "SELECT EXISTS(SELECT 1 FROM countries WHERE id = ?1)",
                params![country.id],
            )? {
                return Err(PostDbError::NotFound(Entity::Country));
            }
            if exists(
                tx,
                "SELECT EXISTS(SELECT 1 FROM countries WHERE id != ?1 AND (slug = ?2 OR name = ?3))",
                params![country.id, country.slug, country.name],
            )? {
                return Err(PostDbError::already_exists(Entity::Country, &country.name));
            }
            tx.execute(
                "UPDATE countries SET name = ?1, slug = ?2, iso = ?3 WHERE id = ?4",
                params![country.name, country.slug, country.iso, country.id],
            )
            .map_err(|e| insert_error(e, Entity::Country, &country.name))?;
            Ok(country.clone())
        })
    }

    fn delete_country(&self, id: CountryId) -> Result<()> {
        self.with_tx(|tx| {
            if !exists(tx, "SELECT EXISTS(SELECT 1 FROM countries WHERE id = ?1)", params![id])? {
                return Err(PostDbError::NotFound(Entity::Country));
            }
            if exists(
                tx,
                "SELECT EXISTS(SELECT 1 FROM counties WHERE country_id = ?1)",
                params![id],
            )? {
                return Err(PostDbError::ReferentialConflict {
                    entity: Entity::Country,
                    id,
                    dependent: Entity::County,
                });
            }
            tx.execute("DELETE FROM countries WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}
