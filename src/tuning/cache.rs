//! On-disk cache of tuning results
//!
//! Grid searches are the slow part of the pipeline. Results are stored as
//! JSON per model together with a SHA-256 fingerprint of everything that
//! determines them; a stale fingerprint is treated as a miss.

use super::search::TuneResults;
use crate::data::{Fold, Frame};
use crate::error::Result;
use crate::models::{Hyperparameters, ModelKind};
use crate::recipe::Recipe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    created_at: DateTime<Utc>,
    results: TuneResults,
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    kind: ModelKind,
    candidates: &'a [Hyperparameters],
    recipe: Recipe,
    frame: &'a Frame,
    folds: &'a [Fold],
    seed: u64,
}

/// Directory of cached `TuneResults`, one file per model
#[derive(Debug, Clone)]
pub struct TuneCache {
    dir: PathBuf,
}

impl TuneCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, kind: ModelKind) -> PathBuf {
        self.dir.join(format!("tune_{}.json", kind.name()))
    }

    /// Hex digest of the grid, the recipe steps, the training rows, the
    /// folds and the seed
    pub fn fingerprint(
        kind: ModelKind,
        candidates: &[Hyperparameters],
        recipe: Recipe,
        frame: &Frame,
        folds: &[Fold],
        seed: u64,
    ) -> Result<String> {
        let input = FingerprintInput {
            kind,
            candidates,
            recipe,
            frame,
            folds,
            seed,
        };
        let bytes = serde_json::to_vec(&input)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Cached results for `kind`, if present and matching `fingerprint`
    pub fn load(&self, kind: ModelKind, fingerprint: &str) -> Option<TuneResults> {
        let path = self.path(kind);
        let content = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unreadable cache file {:?}: {}", path, e);
                return None;
            }
        };
        if entry.fingerprint != fingerprint {
            debug!(model = kind.name(), "cache fingerprint changed");
            return None;
        }
        debug!(model = kind.name(), created_at = %entry.created_at, "cache hit");
        Some(entry.results)
    }

    /// Write results and return the file path
    pub fn store(&self, results: &TuneResults, fingerprint: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(results.kind);
        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            created_at: Utc::now(),
            results: results.clone(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&entry)?)?;
        Ok(path)
    }
}
