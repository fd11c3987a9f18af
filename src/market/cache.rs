//! # market::cache
//!
//! Per-instrument file cache of the last successfully fetched snapshot.
//!
//! The cache is the fallback when the live fetch fails or the session is
//! closed.  It stores the decoded [`RawSnapshot`], i.e. the fields the engine
//! consumes, not the provider's raw body.  A missing, truncated or otherwise
//! undecodable file reads as "absent"; the error is logged, never raised.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::CacheError;
use crate::models::RawSnapshot;

#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the cache with `snapshot`.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, snapshot: &RawSnapshot) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, snapshot)?;
        writer.flush()?;

        debug!(path = %self.path.display(), "Snapshot cached");
        Ok(())
    }

    /// Last saved snapshot, or `None` if never written or unreadable.
    pub fn load(&self) -> Option<RawSnapshot> {
        if !self.path.exists() {
            return None;
        }

        match self.try_load() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cache read failed");
                None
            }
        }
    }

    fn try_load(&self) -> Result<RawSnapshot, CacheError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
