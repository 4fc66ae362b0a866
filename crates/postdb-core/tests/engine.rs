//! End-to-end behaviour of the facade, run against every store backend.

use postdb_core::{
    CountryPatch, Entity, MemoryStore, NewCountry, NewCounty, NewDistrict, NewIncode, NewOutcode,
    NewPostcode, NewWard, Node, Outcome, Page, PostDb, PostDbError, PostcodePair, PostcodeStore,
    QUERY_RESULT_CAP,
};
use std::thread;

/// England > Greater London > Westminster > St James's, holding
/// SW1A 1AA, SW1A 2AA and SW1P 3BT; plus E1 6AN in Tower Hamlets > Spitalfields.
fn seed<S: PostcodeStore>(db: &PostDb<S>) {
    db.create_country(NewCountry {
        name: "England".into(),
        iso: "ENG".into(),
    })
    .unwrap();
    db.create_county(NewCounty {
        name: "Greater London".into(),
        code: "E11000009".into(),
        country_id: 1,
    })
    .unwrap();
    for name in ["Westminster", "Tower Hamlets"] {
        db.create_district(NewDistrict {
            name: name.into(),
            code: "E09".into(),
            county_id: 1,
        })
        .unwrap();
    }
    db.create_ward(NewWard {
        name: "St James's".into(),
        code: "E05013806".into(),
        district_id: 1,
    })
    .unwrap();
    db.create_ward(NewWard {
        name: "Spitalfields & Banglatown".into(),
        code: "E05009333".into(),
        district_id: 2,
    })
    .unwrap();

    let postcodes = [
        ("SW1A", "1AA", 1),
        ("sw1a", "2aa", 1),
        ("SW1P", "3BT", 1),
        ("E1", "6AN", 2),
    ];
    for (out, inc, ward_id) in postcodes {
        let outcode_id = match db.store().outcode_by_code(&out.to_lowercase()).unwrap() {
            Some(o) => o.id,
            None => db.create_outcode(NewOutcode { code: out.into() }).unwrap().id,
        };
        let incode_id = match db.store().incode_by_code(&inc.to_lowercase()).unwrap() {
            Some(i) => i.id,
            None => db.create_incode(NewIncode { code: inc.into() }).unwrap().id,
        };
        db.create_postcode(NewPostcode {
            outcode_id,
            incode_id,
            ward_id,
            latitude: 51.5,
            longitude: -0.1,
        })
        .unwrap();
    }
}

macro_rules! for_each_backend {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[test]
                fn $name() {
                    super::$name(postdb_core::PostDb::new(postdb_core::MemoryStore::new()));
                }
            )*
        }

        #[cfg(feature = "sqlite")]
        mod sqlite {
            $(
                #[test]
                fn $name() {
                    let store = postdb_core::SqliteStore::open_in_memory().unwrap();
                    super::$name(postdb_core::PostDb::new(store));
                }
            )*
        }
    };
}

for_each_backend!(
    country_with_counties_after_create,
    slug_chain_breaks_at_the_right_level,
    ward_listing_distinguishes_absence,
    every_stored_postcode_resolves_to_itself,
    unregistered_postcode_is_empty,
    search_full_postcode,
    search_prefix_is_a_superset,
    listings_switch_on_query,
    incodes_listing_needs_a_known_outcode,
    area_prefix_listing_pages,
    related_postcodes_by_ward,
    duplicates_and_missing_parents,
    country_update_and_delete,
    stats_count_every_table,
);

fn country_with_counties_after_create<S: PostcodeStore>(db: PostDb<S>) {
    let uk = db
        .create_country(NewCountry {
            name: "United Kingdom".into(),
            iso: "GB".into(),
        })
        .unwrap();
    assert_eq!(uk.slug, "united-kingdom");
    db.create_county(NewCounty {
        name: "Greater London".into(),
        code: "LND".into(),
        country_id: uk.id,
    })
    .unwrap();

    let view = db.get_county("united-kingdom").unwrap().found().unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["name"], "United Kingdom");
    assert_eq!(json["iso"], "GB");
    assert_eq!(
        json["counties"],
        serde_json::json!([{"code": "LND", "name": "Greater London", "slug": "greater-london"}])
    );
}

fn slug_chain_breaks_at_the_right_level<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);

    assert_eq!(
        db.get_county("scotland").unwrap(),
        Outcome::NotFoundAt(Entity::Country)
    );
    assert_eq!(
        db.get_district("england", "kent").unwrap(),
        Outcome::NotFoundAt(Entity::County)
    );
    // Westminster exists, but "st-james-s" is a ward, not a district.
    assert_eq!(
        db.get_ward("england", "greater-london", "st-james-s").unwrap(),
        Outcome::NotFoundAt(Entity::District)
    );

    let district = db
        .get_ward("england", "greater-london", "westminster")
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(district.wards.len(), 1);
    assert_eq!(district.wards[0].slug, "st-james-s");

    match db.browse(&["england", "greater-london"]).unwrap() {
        Outcome::Found(Node::County(county)) => assert_eq!(county.districts.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(db.browse(&[]).unwrap(), Outcome::Invalid(_)));
}

fn ward_listing_distinguishes_absence<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);

    let listing = db
        .get_postcodes("england", "greater-london", "westminster", "st-james-s")
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(
        listing.postcodes,
        vec![
            PostcodePair::new("sw1a", "1aa"),
            PostcodePair::new("sw1a", "2aa"),
            PostcodePair::new("sw1p", "3bt"),
        ]
    );

    // Ward belongs to the other district.
    assert_eq!(
        db.get_postcodes("england", "greater-london", "westminster", "spitalfields-banglatown")
            .unwrap(),
        Outcome::Empty
    );
}

fn every_stored_postcode_resolves_to_itself<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);
    let all = db.search("", "postcode", Page::new(0, 100)).unwrap();
    assert_eq!(all, Outcome::Found(vec![]));

    for pair in [
        PostcodePair::new("sw1a", "1aa"),
        PostcodePair::new("sw1a", "2aa"),
        PostcodePair::new("sw1p", "3bt"),
        PostcodePair::new("e1", "6an"),
    ] {
        let detail = db
            .resolve_postcode(&pair.outcode, &pair.incode)
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(detail.pair(), pair);
        assert_eq!(detail.country.slug, "england");
        assert_eq!(detail.county.id, detail.district.county_id);
        assert_eq!(detail.ward.id, detail.postcode.ward_id);

        let by_full = db.resolve(&pair.full()).unwrap().found().unwrap();
        assert_eq!(by_full, detail);
    }
}

fn unregistered_postcode_is_empty<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);
    // Both halves exist, the pair does not.
    assert_eq!(db.resolve_postcode("e1", "1aa").unwrap(), Outcome::Empty);
    assert_eq!(db.resolve_postcode("zz9", "9zz").unwrap(), Outcome::Empty);
    assert!(matches!(db.resolve("not a postcode").unwrap(), Outcome::Invalid(_)));
}

fn search_full_postcode<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);
    for query in ["sw1a 1aa", "SW1A-1AA"] {
        assert_eq!(
            db.search(query, "postcode", Page::default()).unwrap(),
            Outcome::Found(vec![PostcodePair::new("sw1a", "1aa")])
        );
    }
    assert_eq!(
        db.search("sw1a", "ward", Page::default()).unwrap(),
        Outcome::Found(vec![])
    );
}

fn search_prefix_is_a_superset<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);
    let wide = db.search("sw1", "postcode", Page::default()).unwrap().found().unwrap();
    let narrow = db.search("sw1a", "postcode", Page::default()).unwrap().found().unwrap();
    assert_eq!(wide.len(), 3);
    assert_eq!(narrow.len(), 2);
    assert!(narrow.iter().all(|p| wide.contains(p)));
}

fn listings_switch_on_query<S: PostcodeStore>(db: PostDb<S>) {
    for n in 0..100 {
        db.create_outcode(NewOutcode {
            code: format!("n{n}"),
        })
        .unwrap();
    }

    // Query mode ignores the page and caps the result.
    let hits = db.list_outcodes(Page::new(0, 5), Some("N")).unwrap();
    assert_eq!(hits.len(), QUERY_RESULT_CAP);
    let hits = db.list_outcodes(Page::new(50, 5), Some("9")).unwrap();
    assert_eq!(hits.len(), 19);

    let page = db.list_outcodes(Page::new(10, 5), None).unwrap();
    let codes: Vec<_> = page.iter().map(|o| o.code.as_str()).collect();
    assert_eq!(codes, ["n10", "n11", "n12", "n13", "n14"]);

    // Blank query counts as no query.
    assert_eq!(db.list_outcodes(Page::default(), Some("  ")).unwrap().len(), 20);
}

fn incodes_listing_needs_a_known_outcode<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);

    let incodes = db
        .list_incodes(Some("SW1A"), Page::default(), None)
        .unwrap()
        .found()
        .unwrap();
    let codes: Vec<_> = incodes.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, ["1aa", "2aa"]);

    assert_eq!(
        db.list_incodes(Some("zz9"), Page::default(), None).unwrap(),
        Outcome::NotFoundAt(Entity::Outcode)
    );
    assert_eq!(
        db.list_incodes(None, Page::default(), None).unwrap(),
        Outcome::NotFoundAt(Entity::Outcode)
    );

    // Query mode does not need the outcode at all.
    let hits = db
        .list_incodes(Some("zz9"), Page::default(), Some("a"))
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(hits.len(), 3);
}

fn area_prefix_listing_pages<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);
    let sw = db.list_by_area_prefix("SW", Page::default()).unwrap();
    assert_eq!(sw.len(), 2);
    let second = db.list_by_area_prefix("sw", Page::new(1, 1)).unwrap();
    assert_eq!(second[0].code, "sw1p");
    assert!(db.list_by_area_prefix("%", Page::default()).unwrap().is_empty());
}

fn related_postcodes_by_ward<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);
    let related = db.related_postcodes(1, Page::new(1, 10)).unwrap().found().unwrap();
    assert_eq!(
        related,
        vec![PostcodePair::new("sw1a", "2aa"), PostcodePair::new("sw1p", "3bt")]
    );
    assert_eq!(
        db.related_postcodes(42, Page::default()).unwrap(),
        Outcome::NotFoundAt(Entity::Ward)
    );
}

fn duplicates_and_missing_parents<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);

    let err = db
        .create_ward(NewWard {
            name: "St. James's".into(),
            code: "X".into(),
            district_id: 1,
        })
        .unwrap_err();
    assert!(matches!(err, PostDbError::AlreadyExists { entity: Entity::Ward, .. }));

    // Same ward name under another district is fine.
    db.create_ward(NewWard {
        name: "St James's".into(),
        code: "X".into(),
        district_id: 2,
    })
    .unwrap();

    let err = db
        .create_district(NewDistrict {
            name: "Camden".into(),
            code: "E09000007".into(),
            county_id: 9,
        })
        .unwrap_err();
    assert!(matches!(err, PostDbError::ParentNotFound { entity: Entity::County, id: 9 }));
    assert_eq!(err.status_code(), 404);

    let err = db
        .create_postcode(NewPostcode {
            outcode_id: 1,
            incode_id: 1,
            ward_id: 2,
            latitude: 0.0,
            longitude: 0.0,
        })
        .unwrap_err();
    assert!(matches!(err, PostDbError::AlreadyExists { entity: Entity::Postcode, .. }));

    let err = db.create_incode(NewIncode { code: "1aaa".into() }).unwrap_err();
    assert!(matches!(err, PostDbError::Validation(_)));
}

fn country_update_and_delete<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);
    let wales = db
        .create_country(NewCountry {
            name: "Wales".into(),
            iso: "WLS".into(),
        })
        .unwrap();

    let renamed = db
        .update_country(
            wales.id,
            CountryPatch {
                name: Some("Cymru".into()),
                iso: None,
            },
        )
        .unwrap();
    assert_eq!(renamed.slug, "cymru");
    assert_eq!(renamed.iso.as_deref(), Some("WLS"));
    assert!(db.get_county("cymru").unwrap().is_found());
    assert_eq!(db.get_county("wales").unwrap(), Outcome::NotFoundAt(Entity::Country));

    let err = db.delete_country(1).unwrap_err();
    assert!(matches!(err, PostDbError::ReferentialConflict { id: 1, .. }));
    assert_eq!(err.status_code(), 409);

    db.delete_country(wales.id).unwrap();
    assert!(db.store().country_by_id(wales.id).unwrap().is_none());
}

fn stats_count_every_table<S: PostcodeStore>(db: PostDb<S>) {
    seed(&db);
    let stats = db.stats().unwrap();
    assert_eq!(
        (stats.countries, stats.counties, stats.districts, stats.wards),
        (1, 1, 2, 2)
    );
    assert_eq!((stats.outcodes, stats.incodes, stats.postcodes), (3, 4, 4));
}

#[test]
fn racing_identical_inserts_create_one_row() {
    let db = PostDb::new(MemoryStore::new());
    db.create_country(NewCountry {
        name: "England".into(),
        iso: "ENG".into(),
    })
    .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            thread::spawn(move || {
                db.create_county(NewCounty {
                    name: "Kent".into(),
                    code: "E10000016".into(),
                    country_id: 1,
                })
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(PostDbError::is_conflict));
    assert_eq!(db.stats().unwrap().counties, 1);
}
