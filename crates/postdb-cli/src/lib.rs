//! postdb-cli
//! ==========
//!
//! Command-line interface for the `postdb-core` postcode hierarchy.
//!
//! The binary (`postdb`) is the deliverable; this library target only exists
//! so the crate gets a documentation page.
//!
//! Quick start
//! -----------
//!
//! ```text
//! cargo install postdb-cli
//! postdb --help
//! postdb add country "United Kingdom" --iso GB
//! postdb browse united-kingdom
//! postdb search "sw1a 1aa"
//! ```
//!
//! Global options can also come from the environment: `POSTDB_PATH`,
//! `POSTDB_BACKEND` (`snapshot` or `sqlite`) and `POSTDB_DETAILS_URL`.
//!
//! For programmatic access use [`postdb-core`] directly.
//!
//! Links
//! -----
//! - Repository: <https://github.com/holg/postdb-rs>
//! - Core crate: <https://docs.rs/postdb-core>
//!
#![cfg_attr(docsrs, feature(doc_cfg))]
