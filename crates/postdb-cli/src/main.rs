//! postdb — command-line interface for postdb-core
//!
//! Every operation of the engine is a subcommand. Results are printed as JSON
//! on stdout; logs go to stderr.
//!
//! Usage examples
//! --------------
//!
//! - Build up a hierarchy (snapshot backend, saved after each write)
//!   $ postdb add country "United Kingdom" --iso GB
//!   $ postdb add county "Greater London" --code LND --country-id 1
//!
//! - Drill down by slug
//!   $ postdb browse united-kingdom greater-london
//!
//! - Resolve and search postcodes
//!   $ postdb postcode "SW1A 1AA"
//!   $ postdb search "sw1a 1a"
//!
//! - Use SQLite instead of a snapshot
//!   $ postdb --backend sqlite --db postdb.sqlite stats
//!
//! Read commands that do not find anything print a tagged outcome
//! (`not_found_at` / `invalid`) and exit with status 2.
mod args;

use crate::args::{AddCommand, Backend, CliArgs, Commands};
use anyhow::Context;
use clap::Parser;
use postdb_core::{
    CountryPatch, MemoryStore, NewCountry, NewCounty, NewDistrict, NewIncode, NewOutcode,
    NewPostcode, NewWard, Outcome, PostDb, PostcodeStore,
};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// What a command produced: a plain value, or a tagged read outcome.
enum Output {
    Plain(Value),
    Tagged { value: Value, status: u16 },
}

fn plain<T: Serialize>(value: T) -> anyhow::Result<Output> {
    Ok(Output::Plain(serde_json::to_value(value)?))
}

fn tagged<T: Serialize>(outcome: Outcome<T>) -> anyhow::Result<Output> {
    let status = outcome.status_code();
    Ok(Output::Tagged {
        value: serde_json::to_value(outcome)?,
        status,
    })
}

fn run<S: PostcodeStore>(db: &PostDb<S>, command: Commands) -> anyhow::Result<Output> {
    match command {
        Commands::Stats => plain(db.stats()?),

        Commands::Outcodes { query, page } => {
            plain(db.list_outcodes(page.into(), query.as_deref())?)
        }

        Commands::Incodes {
            outcode,
            query,
            page,
        } => tagged(db.list_incodes(outcode.as_deref(), page.into(), query.as_deref())?),

        Commands::Postcode { postcode, incode } => match incode {
            Some(incode) => tagged(db.resolve_postcode(&postcode, &incode)?),
            None => tagged(db.resolve(&postcode)?),
        },

        Commands::Area { prefix, page } => plain(db.list_by_area_prefix(&prefix, page.into())?),

        Commands::Browse { slugs } => {
            let chain: Vec<&str> = slugs.iter().map(String::as_str).collect();
            tagged(db.browse(&chain)?)
        }

        Commands::Postcodes {
            country,
            county,
            district,
            ward,
        } => tagged(db.get_postcodes(&country, &county, &district, &ward)?),

        Commands::Search {
            query,
            query_type,
            page,
        } => tagged(db.search(&query, &query_type, page.into())?),

        Commands::Related { ward_id, page } => tagged(db.related_postcodes(ward_id, page.into())?),

        Commands::Details { postcode } => details(db, &postcode),

        Commands::Add(add) => match add {
            AddCommand::Country { name, iso } => plain(db.create_country(NewCountry { name, iso })?),
            AddCommand::County {
                name,
                code,
                country_id,
            } => plain(db.create_county(NewCounty {
                name,
                code,
                country_id,
            })?),
            AddCommand::District {
                name,
                code,
                county_id,
            } => plain(db.create_district(NewDistrict {
                name,
                code,
                county_id,
            })?),
            AddCommand::Ward {
                name,
                code,
                district_id,
            } => plain(db.create_ward(NewWard {
                name,
                code,
                district_id,
            })?),
            AddCommand::Outcode { code } => plain(db.create_outcode(NewOutcode { code })?),
            AddCommand::Incode { code } => plain(db.create_incode(NewIncode { code })?),
            AddCommand::Postcode {
                outcode_id,
                incode_id,
                ward_id,
                latitude,
                longitude,
            } => plain(db.create_postcode(NewPostcode {
                outcode_id,
                incode_id,
                ward_id,
                latitude,
                longitude,
            })?),
        },

        Commands::UpdateCountry { id, name, iso } => {
            plain(db.update_country(id, CountryPatch { name, iso })?)
        }

        Commands::DeleteCountry { id } => {
            db.delete_country(id)?;
            plain(serde_json::json!({ "deleted": id }))
        }
    }
}

#[cfg(feature = "details")]
fn details<S: PostcodeStore>(db: &PostDb<S>, postcode: &str) -> anyhow::Result<Output> {
    Ok(Output::Plain(db.lookup_details(postcode)?))
}

#[cfg(not(feature = "details"))]
fn details<S: PostcodeStore>(_db: &PostDb<S>, _postcode: &str) -> anyhow::Result<Output> {
    anyhow::bail!("built without the `details` feature")
}

/// Attach the lookup client when `--details-url` or `POSTDB_DETAILS_URL` is set.
#[cfg(feature = "details")]
fn with_lookup<S: PostcodeStore>(db: PostDb<S>, args: &CliArgs) -> anyhow::Result<PostDb<S>> {
    use postdb_core::{DetailsClient, LookupConfig};

    let Some(config) = LookupConfig::from_flag_or_env(args.details_url.as_deref()) else {
        return Ok(db);
    };
    let config = config.with_timeout(std::time::Duration::from_secs(args.details_timeout_secs));
    Ok(db.with_details(DetailsClient::new(config)?))
}

#[cfg(not(feature = "details"))]
fn with_lookup<S: PostcodeStore>(db: PostDb<S>, _args: &CliArgs) -> anyhow::Result<PostDb<S>> {
    Ok(db)
}

fn print(output: Output) -> anyhow::Result<ExitCode> {
    let (value, code) = match output {
        Output::Plain(value) => (value, ExitCode::SUCCESS),
        Output::Tagged { value, status } if status == 200 => (value, ExitCode::SUCCESS),
        Output::Tagged { value, .. } => (value, ExitCode::from(2)),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(code)
}

fn default_path(backend: Backend) -> PathBuf {
    let dir = MemoryStore::default_data_dir();
    match backend {
        Backend::Snapshot => dir.join(MemoryStore::default_snapshot_filename()),
        Backend::Sqlite => dir.join("postdb.sqlite"),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let path = args.db.clone().unwrap_or_else(|| default_path(args.backend));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    debug!(path = %path.display(), backend = ?args.backend, "opening store");
    let mutation = args.command.is_mutation();

    match args.backend {
        Backend::Snapshot => {
            let store = MemoryStore::load_or_default(&path)
                .with_context(|| format!("loading snapshot {}", path.display()))?;
            let db = with_lookup(PostDb::new(store), &args)?;
            let output = run(&db, args.command)?;
            if mutation {
                db.store()
                    .save_as(&path)
                    .with_context(|| format!("saving snapshot {}", path.display()))?;
            }
            print(output)
        }
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let store = postdb_core::SqliteStore::open(&path)
                .with_context(|| format!("opening database {}", path.display()))?;
            let db = with_lookup(PostDb::new(store), &args)?;
            let output = run(&db, args.command)?;
            print(output)
        }
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => anyhow::bail!("built without the `sqlite` feature"),
    }
}
