//! Artifact bundle persistence
//!
//! A bundle is one directory holding everything a training run produced:
//!
//! ```text
//! <root>/<bundle>/
//!   manifest.json        run id, timestamp, vocabulary checksums, model list
//!   user_encoder.bin     gzip(bincode) user encoder
//!   item_encoder.bin     gzip(bincode) item encoder
//!   models/<Name>.bin    gzip(bincode) fitted model with its feature domain
//!   metrics.jsonl        {run_id} header, then one {Model, MSE, MAE, R2} record per line
//! ```
//!
//! Every file except the manifest carries the run id of the manifest. A bundle is written
//! to a staging directory and renamed into place. Loading succeeds only when
//! all files agree on the run id and the encoder checksums match both the
//! manifest and every model's feature domain; anything else is reported as
//! `ArtifactError::Unavailable`.

use crate::encoder::{IdentifierEncoder, ItemEncoder, UserEncoder, Vocabulary};
use crate::metrics::ModelMetrics;
use crate::trainer::{TrainedModel, TrainingRun};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const MANIFEST_FILE: &str = "manifest.json";
const USER_ENCODER_FILE: &str = "user_encoder.bin";
const ITEM_ENCODER_FILE: &str = "item_encoder.bin";
const METRICS_FILE: &str = "metrics.jsonl";
const MODELS_DIR: &str = "models";
const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ArtifactError {
    /// The bundle cannot be used; retraining is required
    #[error("Artifact bundle '{bundle}' unavailable: {reason}")]
    Unavailable { bundle: String, reason: String },

    #[error("Model '{0}' is not in the bundle")]
    UnknownModel(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

fn unavailable(bundle: &str, reason: String) -> ArtifactError {
    ArtifactError::Unavailable {
        bundle: bundle.to_string(),
        reason,
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub file: String,
}

/// Bundle metadata, stored as `manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub format_version: u32,
    pub bundle: String,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_vocab_size: usize,
    pub item_vocab_size: usize,
    pub user_checksum: String,
    pub item_checksum: String,
    pub models: Vec<ModelEntry>,
}

#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    run_id: Uuid,
    payload: T,
}

/// First line of `metrics.jsonl`
#[derive(Serialize, Deserialize)]
struct MetricsHeader {
    run_id: Uuid,
}

/// A loaded, consistency-checked bundle
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub manifest: BundleManifest,
    pub users: UserEncoder,
    pub items: ItemEncoder,
    pub models: Vec<TrainedModel>,
    pub metrics: Vec<ModelMetrics>,
}

impl ArtifactBundle {
    /// Wrap a finished training run as an in-memory bundle
    pub fn from_run(bundle: &str, run: TrainingRun) -> Self {
        let manifest = BundleManifest {
            format_version: FORMAT_VERSION,
            bundle: bundle.to_string(),
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            user_vocab_size: run.users.len(),
            item_vocab_size: run.items.len(),
            user_checksum: run.users.checksum(),
            item_checksum: run.items.checksum(),
            models: run
                .models
                .iter()
                .map(|m| ModelEntry {
                    name: m.name.clone(),
                    file: format!("{}/{}.bin", MODELS_DIR, m.name),
                })
                .collect(),
        };
        Self {
            manifest,
            users: run.users,
            items: run.items,
            models: run.models,
            metrics: run.metrics,
        }
    }

    pub fn model(&self, name: &str) -> ArtifactResult<&TrainedModel> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| ArtifactError::UnknownModel(name.to_string()))
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

/// Reads and writes bundles under a root directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bundle_dir(&self, bundle: &str) -> PathBuf {
        self.root.join(bundle)
    }

    pub fn exists(&self, bundle: &str) -> bool {
        self.bundle_dir(bundle).join(MANIFEST_FILE).is_file()
    }

    /// Write the bundle, replacing any previous bundle of the same name.
    ///
    /// On failure the staging directory is removed and the previous bundle,
    /// if any, stays in place.
    pub fn save(&self, bundle: &ArtifactBundle) -> ArtifactResult<()> {
        let name = &bundle.manifest.bundle;
        let run_id = bundle.manifest.run_id;
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;

        let staging = self.root.join(format!(".{}.staging-{}", name, run_id.simple()));
        if let Err(e) = write_bundle(&staging, bundle) {
            discard(&staging);
            return Err(e);
        }

        let target = self.bundle_dir(name);
        let previous = self.root.join(format!(".{}.previous-{}", name, run_id.simple()));
        let replacing = target.exists();
        if replacing {
            if let Err(source) = fs::rename(&target, &previous) {
                discard(&staging);
                return Err(io_error(&target)(source));
            }
        }
        if let Err(source) = fs::rename(&staging, &target) {
            if replacing {
                if let Err(e) = fs::rename(&previous, &target) {
                    warn!("Could not restore previous bundle '{}': {}", name, e);
                }
            }
            discard(&staging);
            return Err(io_error(&target)(source));
        }
        if replacing {
            discard(&previous);
        }

        info!(
            "Saved artifact bundle '{}' (run {}, {} models) to {}",
            name,
            run_id,
            bundle.models.len(),
            target.display()
        );
        Ok(())
    }

    /// Load and cross-check a bundle; any defect yields `Unavailable`
    pub fn load(&self, bundle: &str) -> ArtifactResult<ArtifactBundle> {
        let unavailable = |reason: String| unavailable(bundle, reason);
        let dir = self.bundle_dir(bundle);

        let manifest = read_manifest(&dir).map_err(&unavailable)?;
        let run_id = manifest.run_id;

        let users: UserEncoder =
            read_encoder(&dir.join(USER_ENCODER_FILE), run_id).map_err(&unavailable)?;
        let items: ItemEncoder =
            read_encoder(&dir.join(ITEM_ENCODER_FILE), run_id).map_err(&unavailable)?;
        if users.checksum() != manifest.user_checksum || items.checksum() != manifest.item_checksum {
            return Err(unavailable("encoder checksum does not match the manifest".to_string()));
        }

        let mut models = Vec::with_capacity(manifest.models.len());
        for entry in &manifest.models {
            let model: TrainedModel = read_compressed(&dir.join(&entry.file), run_id).map_err(&unavailable)?;
            if model.name != entry.name {
                return Err(unavailable(format!("{} holds model {}", entry.file, model.name)));
            }
            if !model.domain.matches(&users, &items) {
                return Err(unavailable(format!(
                    "model {} was fitted against a different vocabulary",
                    model.name
                )));
            }
            models.push(model);
        }

        let metrics = read_metrics(&dir.join(METRICS_FILE), run_id).map_err(&unavailable)?;
        let recorded: Vec<&str> = metrics.iter().map(|m| m.model.as_str()).collect();
        let expected: Vec<&str> = manifest.models.iter().map(|e| e.name.as_str()).collect();
        if recorded != expected {
            return Err(unavailable(format!(
                "metrics cover {:?}, manifest lists {:?}",
                recorded, expected
            )));
        }

        info!("Loaded artifact bundle '{}' (run {})", bundle, run_id);
        Ok(ArtifactBundle {
            manifest,
            users,
            items,
            models,
            metrics,
        })
    }

    /// Metric records of a saved bundle
    pub fn load_metrics(&self, bundle: &str) -> ArtifactResult<Vec<ModelMetrics>> {
        let dir = self.bundle_dir(bundle);
        let manifest = read_manifest(&dir).map_err(|reason| unavailable(bundle, reason))?;
        read_metrics(&dir.join(METRICS_FILE), manifest.run_id).map_err(|reason| unavailable(bundle, reason))
    }

    /// Delete a bundle; true when it existed
    pub fn remove(&self, bundle: &str) -> ArtifactResult<bool> {
        let dir = self.bundle_dir(bundle);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(io_error(&dir))?;
        debug!("Removed artifact bundle '{}'", bundle);
        Ok(true)
    }
}

fn write_bundle(staging: &Path, bundle: &ArtifactBundle) -> ArtifactResult<()> {
    let run_id = bundle.manifest.run_id;
    let models_dir = staging.join(MODELS_DIR);
    fs::create_dir_all(&models_dir).map_err(io_error(&models_dir))?;

    write_compressed(&staging.join(USER_ENCODER_FILE), run_id, &bundle.users)?;
    write_compressed(&staging.join(ITEM_ENCODER_FILE), run_id, &bundle.items)?;
    for (entry, model) in bundle.manifest.models.iter().zip(&bundle.models) {
        write_compressed(&staging.join(&entry.file), run_id, model)?;
    }
    write_metrics(&staging.join(METRICS_FILE), run_id, &bundle.metrics)?;

    let manifest_path = staging.join(MANIFEST_FILE);
    let manifest = serde_json::to_vec_pretty(&bundle.manifest)?;
    fs::write(&manifest_path, manifest).map_err(io_error(&manifest_path))
}

fn discard(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!("Could not remove {}: {}", dir.display(), e);
    }
}

fn read_manifest(dir: &Path) -> Result<BundleManifest, String> {
    let path = dir.join(MANIFEST_FILE);
    let bytes = fs::read(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let manifest: BundleManifest =
        serde_json::from_slice(&bytes).map_err(|e| format!("{}: {}", path.display(), e))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(format!("format version {} is not supported", manifest.format_version));
    }
    Ok(manifest)
}

fn write_compressed<T: Serialize>(path: &Path, run_id: Uuid, payload: &T) -> ArtifactResult<()> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    bincode::serialize_into(&mut encoder, &Stamped { run_id, payload })?;
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(io_error(path))?;
    Ok(())
}

fn read_compressed<T: DeserializeOwned>(path: &Path, run_id: Uuid) -> Result<T, String> {
    let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let stamped: Stamped<T> = bincode::deserialize_from(GzDecoder::new(BufReader::new(file)))
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    if stamped.run_id != run_id {
        return Err(format!(
            "{} belongs to run {}, manifest names run {}",
            path.display(),
            stamped.run_id,
            run_id
        ));
    }
    Ok(stamped.payload)
}

fn read_encoder<K: Vocabulary>(path: &Path, run_id: Uuid) -> Result<IdentifierEncoder<K>, String> {
    let encoder: IdentifierEncoder<K> = read_compressed(path, run_id)?;
    encoder
        .restored()
        .ok_or_else(|| format!("{} does not hold a valid {} encoder", path.display(), K::KIND))
}

fn write_metrics(path: &Path, run_id: Uuid, metrics: &[ModelMetrics]) -> ArtifactResult<()> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &MetricsHeader { run_id })?;
    writer.write_all(b"\n").map_err(io_error(path))?;
    for record in metrics {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n").map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))?;
    Ok(())
}

fn read_metrics(path: &Path, run_id: Uuid) -> Result<Vec<ModelMetrics>, String> {
    let at = |e: &dyn std::fmt::Display| format!("{}: {}", path.display(), e);
    let file = File::open(path).map_err(|e| at(&e))?;
    let mut lines = BufReader::new(file).lines();

    let header: MetricsHeader = match lines.next() {
        Some(line) => serde_json::from_str(&line.map_err(|e| at(&e))?).map_err(|e| at(&e))?,
        None => return Err(at(&"missing run header")),
    };
    if header.run_id != run_id {
        return Err(format!(
            "{} belongs to run {}, manifest names run {}",
            path.display(),
            header.run_id,
            run_id
        ));
    }

    let mut records = Vec::new();
    for line in lines {
        let line = line.map_err(|e| at(&e))?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line).map_err(|e| at(&e))?);
    }
    Ok(records)
}
