//! Snapshot persistence.
//!
//! The whole store state is written as one blob under one key. The blob
//! store itself is a plain synchronous key-value interface so the same store
//! logic runs against memory, files, or browser `localStorage`.

use crate::id::EntityId;
use crate::metrics::Metrics;
use crate::model::{Company, Feature, FeatureList, Snapshot, Transform};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage rejected write: {0}")]
    Write(String),
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
    #[error("failed to decode snapshot: {0}")]
    Decode(String),
    #[error("inconsistent snapshot: {0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Synchronous key-value blob storage.
pub trait BlobStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError>;
    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistError>;
}

// ─── Codecs ──────────────────────────────────────────────────────────────

/// Wire format of the snapshot blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Human-readable JSON, the `localStorage` format.
    #[default]
    Json,
    /// Compact MessagePack (named fields).
    #[serde(alias = "msgpack")]
    MessagePack,
}

impl Codec {
    pub fn encode(self, snapshot: &Snapshot) -> Result<Vec<u8>, PersistError> {
        match self {
            Codec::Json => {
                serde_json::to_vec(snapshot).map_err(|e| PersistError::Encode(e.to_string()))
            }
            Codec::MessagePack => rmp_serde::to_vec_named(snapshot)
                .map_err(|e| PersistError::Encode(e.to_string())),
        }
    }

    /// Decode and validate a blob.
    pub fn decode(self, bytes: &[u8]) -> Result<Snapshot, PersistError> {
        let mut snapshot: Snapshot = match self {
            Codec::Json => {
                serde_json::from_slice(bytes).map_err(|e| PersistError::Decode(e.to_string()))?
            }
            Codec::MessagePack => {
                rmp_serde::from_slice(bytes).map_err(|e| PersistError::Decode(e.to_string()))?
            }
        };
        validate(&snapshot)?;
        for company in &mut snapshot.companies {
            company.metrics.fill_missing();
        }
        Ok(snapshot)
    }
}

/// Reject snapshots that would put the store in an impossible state.
///
/// Dangling arrows are not an error here; the store drops them on load.
pub fn validate(snapshot: &Snapshot) -> Result<(), PersistError> {
    if !snapshot.transform.is_valid() {
        return Err(PersistError::Invalid(format!(
            "bad transform {:?}",
            snapshot.transform
        )));
    }
    let mut seen = HashSet::new();
    for c in &snapshot.companies {
        if !seen.insert(c.id) {
            return Err(PersistError::Invalid(format!("duplicate company id {}", c.id)));
        }
        if !(c.x.is_finite() && c.y.is_finite()) {
            return Err(PersistError::Invalid(format!("company {} has no position", c.id)));
        }
    }
    for g in &snapshot.groups {
        let finite = [g.x, g.y, g.width, g.height].iter().all(|v| v.is_finite());
        if !finite {
            return Err(PersistError::Invalid(format!("group {} has bad bounds", g.id)));
        }
    }
    Ok(())
}

// ─── Seed data ───────────────────────────────────────────────────────────

fn feature(id: &str, name: &str, value: &str) -> Feature {
    Feature {
        id: EntityId::intern(id),
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn seeded_company(
    id: &str,
    name: &str,
    (x, y): (f64, f64),
    quantitative: FeatureList,
    qualitative: FeatureList,
) -> Company {
    Company {
        id: EntityId::intern(id),
        name: name.to_string(),
        x,
        y,
        metrics: Metrics::from_catalog(),
        quantitative,
        qualitative,
    }
}

/// The demonstration dataset used when nothing usable is stored.
pub fn seed_snapshot() -> Snapshot {
    use smallvec::smallvec;

    Snapshot {
        companies: vec![
            seeded_company(
                "comp-1",
                "DeepMind",
                (300.0, 200.0),
                smallvec![
                    feature("q1-1", "Employees", "1,000+"),
                    feature("q1-2", "Founded", "2010"),
                ],
                smallvec![
                    feature("l1-1", "Focus", "Artificial General Intelligence"),
                    feature("l1-2", "Acquisition", "Google in 2014"),
                ],
            ),
            seeded_company(
                "comp-2",
                "OpenAI",
                (600.0, 350.0),
                smallvec![
                    feature("q2-1", "Valuation", "$80B+"),
                    feature("q2-2", "Founded", "2015"),
                ],
                smallvec![feature("l2-1", "Product", "ChatGPT, DALL-E")],
            ),
            seeded_company(
                "comp-3",
                "Anthropic",
                (400.0, 500.0),
                smallvec![feature("q3-1", "Funding", "$7B+")],
                smallvec![feature("l3-1", "Focus", "Constitutional AI")],
            ),
        ],
        groups: Vec::new(),
        arrows: Vec::new(),
        transform: Transform::IDENTITY,
    }
}

// ─── Blob stores ─────────────────────────────────────────────────────────

/// In-memory blob store.
///
/// Clones share the same underlying map, so a test can keep a handle and
/// inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    fail_writes: Rc<Cell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key.
    pub fn with_blob(self, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.blobs.borrow_mut().insert(key.to_string(), bytes.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.borrow().get(key).cloned()
    }

    /// Make every subsequent write fail, as a full quota would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl BlobStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        if self.fail_writes.get() {
            return Err(PersistError::Write("quota exceeded".to_string()));
        }
        self.blobs
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(safe)
    }
}

impl BlobStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves a half-written blob.
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
