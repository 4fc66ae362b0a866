// crates/postdb-core/src/store/snapshot.rs

//! Snapshot persistence for [`MemoryStore`].
//!
//! The tables are written with bincode; with the `compact` feature the stream
//! is gzipped as well. Reading and writing use the same bincode options.

use super::memory::{MemoryStore, Tables};
use crate::error::{PostDbError, Result};
use bincode::Options;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

#[cfg(feature = "compact")]
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

#[cfg(not(feature = "compact"))]
pub const SNAPSHOT_SUFFIX: &str = ".bin";
#[cfg(feature = "compact")]
pub const SNAPSHOT_SUFFIX: &str = ".comp.bin";

// 256MB ceiling on decoded snapshots
const SNAPSHOT_LIMIT: u64 = 256 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(SNAPSHOT_LIMIT)
        .allow_trailing_bytes()
}

impl MemoryStore {
    pub fn default_data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    /// `postdb.comp.bin` with `compact`, `postdb.bin` without.
    pub fn default_snapshot_filename() -> String {
        format!("postdb{SNAPSHOT_SUFFIX}")
    }

    /// Decode a snapshot from raw (already decompressed) bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let tables: Tables = options().deserialize(data)?;
        Ok(Self::from_tables(tables))
    }

    /// Encode the current tables to raw (uncompressed) bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let tables = self.snapshot()?;
        Ok(options().serialize(&tables)?)
    }

    /// Load a snapshot written by [`MemoryStore::save_as`].
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = open_stream(path)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let store = Self::from_bytes(&data)?;
        debug!(path = %path.display(), "loaded snapshot");
        Ok(store)
    }

    /// Load the snapshot at `path`, or start empty if the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_path(path)
        } else {
            info!(path = %path.display(), "no snapshot yet, starting empty");
            Ok(Self::new())
        }
    }

    /// Write every table to `path`.
    ///
    /// The snapshot is encoded into a temporary file next to `path` and only
    /// renamed over it once fully written, so a failed save keeps the old one.
    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tables = self.snapshot()?;

        write_replacing(path, |out| {
            #[cfg(feature = "compact")]
            {
                let mut encoder = GzEncoder::new(out, Compression::default());
                options().serialize_into(&mut encoder, &tables)?;
                encoder.finish()?;
            }
            #[cfg(not(feature = "compact"))]
            options().serialize_into(out, &tables)?;
            Ok(())
        })?;

        info!(path = %path.display(), stats = ?tables.stats(), "snapshot written");
        Ok(())
    }
}

/// Runs `encode` against a temp file in `path`'s directory, then renames it
/// over `path`. On any error the temp file is dropped and `path` is untouched.
fn write_replacing(
    path: &Path,
    encode: impl FnOnce(&mut dyn Write) -> Result<()>,
) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut writer = BufWriter::new(NamedTempFile::new_in(dir)?);

    if let Err(e) = encode(&mut writer) {
        warn!(path = %path.display(), error = %e, "snapshot not written");
        return Err(e);
    }

    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Opens a file, buffers it, and wraps it in a Gzip decoder when `compact` is on.
fn open_stream(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| {
        PostDbError::Storage(format!("Snapshot not found at {}: {}", path.display(), e))
    })?;

    let reader = BufReader::new(file);

    #[cfg(feature = "compact")]
    {
        Ok(Box::new(GzDecoder::new(reader)))
    }

    #[cfg(not(feature = "compact"))]
    {
        Ok(Box::new(reader))
    }
}
