use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use postdb_core::Page;
use std::path::PathBuf;

/// CLI arguments for postdb-cli
#[derive(Debug, Parser)]
#[command(
    name = "postdb",
    version,
    about = "Resolve, search and edit the UK postcode hierarchy"
)]
pub struct CliArgs {
    /// Store location (snapshot file or SQLite database)
    #[arg(long = "db", env = "POSTDB_PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Storage backend
    #[arg(
        long,
        env = "POSTDB_BACKEND",
        value_enum,
        default_value_t = Backend::Snapshot,
        global = true
    )]
    pub backend: Backend,

    /// Base URL of the third-party detail lookup (postcode is appended);
    /// falls back to POSTDB_DETAILS_URL
    #[arg(long = "details-url", global = true)]
    pub details_url: Option<String>,

    /// Timeout for the detail lookup
    #[arg(long = "details-timeout-secs", default_value_t = 10, global = true)]
    pub details_timeout_secs: u64,

    /// More log output on stderr (-v debug, -vv trace); RUST_LOG wins if set
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// In-memory tables persisted as a bincode snapshot
    Snapshot,
    /// SQLite database file
    Sqlite,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct PageArgs {
    /// Rows to skip
    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    /// Rows to return
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl From<PageArgs> for Page {
    fn from(p: PageArgs) -> Self {
        Page::new(p.skip, p.limit)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show a summary of the database contents
    Stats,

    /// List outcodes, or search them with --query (at most 80, paging ignored)
    Outcodes {
        #[arg(short, long)]
        query: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// List incodes used with an outcode, or search them with --query
    Incodes {
        /// Outcode whose incodes to list (e.g. SW1A)
        outcode: Option<String>,
        #[arg(short, long)]
        query: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Resolve a postcode through the whole hierarchy
    Postcode {
        /// Full postcode (e.g. "SW1A 1AA"), or the outcode when INCODE is given
        postcode: String,
        /// Incode, when the outcode was passed separately
        incode: Option<String>,
    },

    /// Outcodes starting with a prefix
    Area {
        prefix: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Walk 1-4 slugs (country [county [district [ward]]]) and show the node
    Browse {
        #[arg(required = true, num_args = 1..=4)]
        slugs: Vec<String>,
    },

    /// Postcodes of a ward, resolving all four slugs at once
    Postcodes {
        country: String,
        county: String,
        district: String,
        ward: String,
    },

    /// Partial postcode search
    Search {
        query: String,
        /// postcode | ward | district | county
        #[arg(short = 't', long = "type", default_value = "postcode")]
        query_type: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Postcodes sharing a ward, by ward id
    Related {
        ward_id: u32,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Fetch details from the third-party lookup
    Details { postcode: String },

    /// Create an entity
    #[command(subcommand)]
    Add(AddCommand),

    /// Change a country's name and/or iso code
    UpdateCountry {
        id: u32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        iso: Option<String>,
    },

    /// Delete a country that no county references
    DeleteCountry { id: u32 },
}

#[derive(Debug, Subcommand)]
pub enum AddCommand {
    Country {
        name: String,
        #[arg(long)]
        iso: String,
    },
    County {
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long = "country-id")]
        country_id: u32,
    },
    District {
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long = "county-id")]
        county_id: u32,
    },
    Ward {
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long = "district-id")]
        district_id: u32,
    },
    Outcode { code: String },
    Incode { code: String },
    Postcode {
        #[arg(long = "outcode-id")]
        outcode_id: u32,
        #[arg(long = "incode-id")]
        incode_id: u32,
        #[arg(long = "ward-id")]
        ward_id: u32,
        #[arg(long = "lat", allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long = "lon", allow_hyphen_values = true)]
        longitude: f64,
    },
}

impl Commands {
    /// Whether the command writes and the snapshot has to be saved afterwards.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Commands::Add(_) | Commands::UpdateCountry { .. } | Commands::DeleteCountry { .. }
        )
    }
}
