//! Error handling example for postdb-rs
//!
//! Shows how conflicts, broken slug chains and malformed input surface.

use postdb_core::{
    CountryPatch, MemoryStore, NewCountry, NewCounty, Outcome, Page, PostDb, PostDbError, Result,
};

fn main() -> Result<()> {
    println!("=== PostDB-RS Error Handling Example ===\n");

    let db = PostDb::new(MemoryStore::new());
    let england = db.create_country(NewCountry {
        name: "England".into(),
        iso: "ENG".into(),
    })?;
    db.create_county(NewCounty {
        name: "Kent".into(),
        code: "E10000016".into(),
        country_id: england.id,
    })?;

    // Example 1: Duplicate within the same parent
    println!("--- Example 1: Duplicate county ---");
    match db.create_county(NewCounty {
        name: "KENT".into(),
        code: "X".into(),
        country_id: england.id,
    }) {
        Err(e @ PostDbError::AlreadyExists { .. }) => println!("  {e} (status {})", e.status_code()),
        other => println!("  unexpected: {other:?}"),
    }
    println!();

    // Example 2: Missing parent
    println!("--- Example 2: Missing parent ---");
    if let Err(e) = db.create_county(NewCounty {
        name: "Surrey".into(),
        code: "E10000030".into(),
        country_id: 99,
    }) {
        println!("  {e} (status {})", e.status_code());
    }
    println!();

    // Example 3: Broken slug chains report the level
    println!("--- Example 3: Broken slug chains ---");
    for chain in [&["wales"][..], &["england", "surrey"][..], &["england", "kent", "dover"][..]] {
        match db.browse(chain)? {
            Outcome::NotFoundAt(level) => println!("  {chain:?}: {level} not found"),
            Outcome::Found(_) => println!("  {chain:?}: found"),
            other => println!("  {chain:?}: {other:?}"),
        }
    }
    println!();

    // Example 4: Legitimate absence vs malformed input
    println!("--- Example 4: Empty vs invalid ---");
    for postcode in ["SW1A 1AA", "not a postcode"] {
        println!("  {postcode:?}: {:?}", db.resolve(postcode)?);
    }
    println!("  search type 'street': {:?}", db.search("sw1a", "street", Page::default())?);
    println!();

    // Example 5: Referential delete guard
    println!("--- Example 5: Delete guard ---");
    if let Err(e) = db.delete_country(england.id) {
        println!("  {e}");
    }
    let renamed = db.update_country(
        england.id,
        CountryPatch {
            name: Some("England & Wales".into()),
            iso: None,
        },
    )?;
    println!("  renamed: {} ({})", renamed.name, renamed.slug);

    Ok(())
}
