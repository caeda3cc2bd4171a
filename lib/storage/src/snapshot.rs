// Dataset snapshots: gzip-compressed JSON written atomically
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AllowOverwrite, AtomicFile};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use remedex_core::SymptomRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use crate::solution::SolutionDetail;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Which embedding model produced the stored vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingInfo {
    pub model_id: String,
    pub dim: usize,
}

/// Everything the service loads at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub embedding: EmbeddingInfo,
    /// Declared sources; derived from the symptom records when empty.
    #[serde(default)]
    pub sources: Vec<String>,
    pub symptoms: Vec<SymptomRecord>,
    #[serde(default)]
    pub solutions: BTreeMap<String, SolutionDetail>,
}

impl DatasetSnapshot {
    pub fn new(embedding: EmbeddingInfo) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            created_at: Utc::now(),
            embedding,
            sources: Vec::new(),
            symptoms: Vec::new(),
            solutions: BTreeMap::new(),
        }
    }
}

/// Snapshot file summary, as reported after a write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub path: String,
    pub creation_time: String,
    pub size: u64,
    pub checksum: String,
    pub symptoms: usize,
    pub solutions: usize,
}

fn is_plain_json(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("json")
}

/// SHA-256 of a file, hex encoded.
pub fn checksum_file(path: &Path) -> Result<String> {
    let file_data = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&file_data)))
}

/// Write `snapshot` to `path`, replacing any existing file atomically.
///
/// Paths ending in `.json` are written uncompressed, anything else is gzip.
pub fn write_snapshot(path: &Path, snapshot: &DatasetSnapshot) -> Result<SnapshotDescription> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json_data = serde_json::to_vec(snapshot)?;
    let plain = is_plain_json(path);
    AtomicFile::new(path, AllowOverwrite)
        .write(|file| -> std::io::Result<()> {
            if plain {
                let mut writer = BufWriter::new(file);
                writer.write_all(&json_data)?;
                writer.flush()
            } else {
                let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
                encoder.write_all(&json_data)?;
                encoder.finish()?.flush()
            }
        })
        .map_err(|e| anyhow!("failed to write snapshot {}: {}", path.display(), e))?;

    let metadata = fs::metadata(path)?;
    Ok(SnapshotDescription {
        path: path.display().to_string(),
        creation_time: snapshot.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        size: metadata.len(),
        checksum: checksum_file(path)?,
        symptoms: snapshot.symptoms.len(),
        solutions: snapshot.solutions.len(),
    })
}

/// Read a snapshot, accepting gzip or plain JSON regardless of extension.
pub fn read_snapshot(path: &Path) -> Result<DatasetSnapshot> {
    let file = File::open(path).with_context(|| format!("cannot open snapshot {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;

    let json_data = if raw.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(raw.as_slice());
        let mut json_data = Vec::new();
        decoder
            .read_to_end(&mut json_data)
            .with_context(|| format!("corrupt gzip stream in {}", path.display()))?;
        json_data
    } else {
        raw
    };

    let snapshot: DatasetSnapshot = serde_json::from_slice(&json_data)
        .with_context(|| format!("malformed snapshot {}", path.display()))?;
    if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
        return Err(anyhow!(
            "snapshot format version {} is newer than supported version {}",
            snapshot.format_version,
            SNAPSHOT_FORMAT_VERSION
        ));
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedex_core::Vector;
    use tempfile::tempdir;

    fn sample() -> DatasetSnapshot {
        let mut snapshot = DatasetSnapshot::new(EmbeddingInfo { model_id: "test".into(), dim: 2 });
        snapshot.sources = vec!["clarke".into()];
        snapshot.symptoms.push(SymptomRecord::new("Arnica", "Head", "clarke", Vector::new(vec![1.0, 0.0])));
        snapshot.solutions.insert(
            "Arnica".into(),
            SolutionDetail { description: Some("Bruised feeling".into()), ..Default::default() },
        );
        snapshot
    }

    #[test]
    fn test_gzip_snapshot_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.snapshot");
        let description = write_snapshot(&path, &sample()).unwrap();

        assert_eq!(description.symptoms, 1);
        assert_eq!(description.checksum.len(), 64);
        assert_eq!(fs::read(&path).unwrap()[..2], GZIP_MAGIC);

        let loaded = read_snapshot(&path).unwrap();
        assert_eq!(loaded.embedding.dim, 2);
        assert_eq!(loaded.symptoms[0].solution_name, "Arnica");
        assert_eq!(loaded.solutions["Arnica"].description.as_deref(), Some("Bruised feeling"));
    }

    #[test]
    fn test_plain_json_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        write_snapshot(&path, &sample()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"model_id\":\"test\""));
        assert_eq!(read_snapshot(&path).unwrap().sources, vec!["clarke"]);
    }

    #[test]
    fn test_overwrite_changes_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.snapshot");
        let first = write_snapshot(&path, &sample()).unwrap();

        let mut changed = sample();
        changed.sources.push("boericke".into());
        let second = write_snapshot(&path, &changed).unwrap();
        assert_ne!(first.checksum, second.checksum);
        assert_eq!(second.checksum, checksum_file(&path).unwrap());
    }

    #[test]
    fn test_newer_format_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut snapshot = sample();
        snapshot.format_version = SNAPSHOT_FORMAT_VERSION + 1;
        write_snapshot(&path, &snapshot).unwrap();
        assert!(read_snapshot(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(read_snapshot(&dir.path().join("absent.snapshot")).is_err());
    }
}
