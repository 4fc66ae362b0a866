//! Basic usage example for postdb-rs
//!
//! This example demonstrates how to:
//! - Build a small hierarchy through the mutation gateway
//! - Drill down by slug
//! - Resolve and search postcodes
//! - Persist the in-memory store as a snapshot

use postdb_core::{
    MemoryStore, NewCountry, NewCounty, NewDistrict, NewIncode, NewOutcode, NewPostcode, NewWard,
    Outcome, Page, PostDb, Result,
};

fn main() -> Result<()> {
    println!("=== PostDB-RS Basic Usage Example ===\n");

    let db = PostDb::new(MemoryStore::new());

    // Example 1: Create the hierarchy
    println!("--- Example 1: Create country > county > district > ward ---");
    let uk = db.create_country(NewCountry {
        name: "United Kingdom".into(),
        iso: "GB".into(),
    })?;
    let london = db.create_county(NewCounty {
        name: "Greater London".into(),
        code: "LND".into(),
        country_id: uk.id,
    })?;
    let westminster = db.create_district(NewDistrict {
        name: "City of Westminster".into(),
        code: "E09000033".into(),
        county_id: london.id,
    })?;
    let ward = db.create_ward(NewWard {
        name: "St James's".into(),
        code: "E05013806".into(),
        district_id: westminster.id,
    })?;
    println!("Slugs: {} / {} / {} / {}\n", uk.slug, london.slug, westminster.slug, ward.slug);

    // Example 2: Register postcodes (each half is stored once)
    println!("--- Example 2: Register postcodes ---");
    let sw1a = db.create_outcode(NewOutcode { code: "SW1A".into() })?;
    for (incode, lat, lon) in [("1AA", 51.501, -0.1416), ("2AA", 51.5034, -0.1276)] {
        let incode = db.create_incode(NewIncode { code: incode.into() })?;
        db.create_postcode(NewPostcode {
            outcode_id: sw1a.id,
            incode_id: incode.id,
            ward_id: ward.id,
            latitude: lat,
            longitude: lon,
        })?;
    }
    println!("{:?}\n", db.stats()?);

    // Example 3: Drill down
    println!("--- Example 3: Browse by slug ---");
    if let Outcome::Found(country) = db.get_county("united-kingdom")? {
        for county in &country.counties {
            println!("{} -> {} ({})", country.country.name, county.name, county.code);
        }
    }
    if let Outcome::Found(listing) = db.get_postcodes(
        "united-kingdom",
        "greater-london",
        "city-of-westminster",
        "st-james-s",
    )? {
        for pair in &listing.postcodes {
            println!("  {}", pair.full());
        }
    }
    println!();

    // Example 4: Resolve a full postcode
    println!("--- Example 4: Resolve SW1A 1AA ---");
    match db.resolve("SW1A 1AA")? {
        Outcome::Found(detail) => println!(
            "{} is in {}, {}, {} ({:.4}, {:.4})",
            detail.pair().full(),
            detail.ward.name,
            detail.district.name,
            detail.county.name,
            detail.postcode.latitude,
            detail.postcode.longitude
        ),
        other => println!("not resolved: {other:?}"),
    }
    println!();

    // Example 5: Partial search
    println!("--- Example 5: Search ---");
    for query in ["sw1", "sw1a 2", "sw1a-1aa"] {
        let hits = db.search(query, "postcode", Page::default())?;
        println!("{query:>10}: {:?}", hits.found().unwrap_or_default());
    }
    println!();

    // Example 6: Snapshot to disk and back
    println!("--- Example 6: Snapshot ---");
    let path = std::env::temp_dir().join("postdb-demo.bin");
    db.store().save_as(&path)?;
    let reloaded = PostDb::new(MemoryStore::load_from_path(&path)?);
    println!("Reloaded from {}: {:?}", path.display(), reloaded.stats()?);

    Ok(())
}
