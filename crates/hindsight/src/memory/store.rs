//! Append-only feedback storage: records, their vectors, the index over them,
//! and persistence to `query_memory.json` + `query_vectors.npy`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{MemoryError, Result};

use super::index::{FlatIndex, Neighbor, VectorIndex};
use super::matrix::VectorMatrix;
use super::record::{FeedbackRecord, PersistedRecord};

pub const RECORDS_FILE: &str = "query_memory.json";
pub const VECTORS_FILE: &str = "query_vectors.npy";

/// Records and vectors kept as parallel arrays: `vectors.row(i)` always
/// belongs to `records[i]`.
pub struct FeedbackStore {
  data_dir: PathBuf,
  records: Vec<FeedbackRecord>,
  vectors: VectorMatrix,
  index: Box<dyn VectorIndex>,
}

impl std::fmt::Debug for FeedbackStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FeedbackStore")
      .field("data_dir", &self.data_dir)
      .field("records", &self.records.len())
      .field("dimension", &self.vectors.dimension())
      .field("indexed", &self.index.len())
      .finish()
  }
}

impl FeedbackStore {
  /// Open the store in `data_dir` with an exact flat index.
  ///
  /// Never fails: missing or unreadable files give an empty store.
  pub fn open(data_dir: impl Into<PathBuf>) -> Self {
    Self::open_with_index(data_dir, Box::new(FlatIndex::new()))
  }

  pub fn open_with_index(data_dir: impl Into<PathBuf>, index: Box<dyn VectorIndex>) -> Self {
    let mut store =
      Self { data_dir: data_dir.into(), records: Vec::new(), vectors: VectorMatrix::new(), index };
    store.load();
    store
  }

  pub fn data_dir(&self) -> &Path {
    &self.data_dir
  }

  pub fn records_path(&self) -> PathBuf {
    self.data_dir.join(RECORDS_FILE)
  }

  pub fn vectors_path(&self) -> PathBuf {
    self.data_dir.join(VECTORS_FILE)
  }

  pub fn records(&self) -> &[FeedbackRecord] {
    &self.records
  }

  pub fn vectors(&self) -> &VectorMatrix {
    &self.vectors
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn dimension(&self) -> Option<usize> {
    self.vectors.dimension()
  }

  /// Rows currently searchable. Lags `len()` only after an index failure.
  pub fn indexed(&self) -> usize {
    self.index.len()
  }

  /// Replace in-memory state with what is on disk.
  pub fn load(&mut self) {
    let (records, vectors) = match self.read_from_disk() {
      Ok(Some(loaded)) => loaded,
      Ok(None) => {
        debug!("no persisted feedback in {}, starting empty", self.data_dir.display());
        (Vec::new(), VectorMatrix::new())
      }
      Err(e) => {
        warn!("could not load feedback from {}: {e}; starting empty", self.data_dir.display());
        (Vec::new(), VectorMatrix::new())
      }
    };

    self.records = records;
    self.vectors = vectors;

    if let Err(e) = self.index.rebuild(&self.vectors) {
      warn!("index rebuild failed after load, retrieval disabled until next rebuild: {e}");
      // Whatever the index held before described other data.
      self.index.clear();
    }

    info!(
      "loaded {} feedback records (dimension {:?}) from {}",
      self.records.len(),
      self.vectors.dimension(),
      self.data_dir.display()
    );
  }

  fn read_from_disk(&self) -> Result<Option<(Vec<FeedbackRecord>, VectorMatrix)>> {
    let records_path = self.records_path();
    let vectors_path = self.vectors_path();
    if !records_path.exists() || !vectors_path.exists() {
      return Ok(None);
    }

    let raw = fs::read(&records_path).map_err(|e| MemoryError::io(&records_path, e))?;
    let stored: Vec<PersistedRecord> = serde_json::from_slice(&raw)?;
    let mut records: Vec<FeedbackRecord> = stored.into_iter().map(FeedbackRecord::from).collect();

    let raw = fs::read(&vectors_path).map_err(|e| MemoryError::io(&vectors_path, e))?;
    let mut vectors = VectorMatrix::from_npy(&raw)?;

    if records.len() != vectors.rows() {
      let keep = records.len().min(vectors.rows());
      warn!(
        "feedback files out of sync ({} records, {} vectors); keeping the first {keep}",
        records.len(),
        vectors.rows()
      );
      records.truncate(keep);
      vectors.truncate(keep);
    }

    Ok(Some((records, vectors)))
  }

  /// Append one record with its vector.
  ///
  /// Rejects vectors that don't fit the store before touching any state.
  /// Index and persistence failures are logged, not returned: the in-memory
  /// append stands either way.
  pub fn append(&mut self, record: FeedbackRecord, vector: &[f32]) -> Result<()> {
    if vector.iter().any(|v| !v.is_finite()) {
      return Err(MemoryError::NonFiniteVector);
    }
    self.vectors.push(vector)?;
    self.records.push(record);

    self.refresh_index();

    if let Err(e) = self.save() {
      warn!("feedback kept in memory but not persisted: {e}");
    }
    Ok(())
  }

  fn refresh_index(&mut self) {
    let rows = self.vectors.rows();
    let result = if self.index.len() + 1 == rows {
      match self.vectors.row(rows - 1) {
        Some(row) => self.index.add(row),
        None => Ok(()),
      }
    } else {
      self.index.rebuild(&self.vectors)
    };

    if let Err(e) = result {
      warn!(
        "index refresh failed, still serving {} of {rows} rows: {e}",
        self.index.len()
      );
    }
  }

  /// Write both files, vectors first, each via temp file + rename.
  pub fn save(&self) -> Result<()> {
    let stored: Vec<PersistedRecord> = self.records.iter().map(PersistedRecord::from).collect();
    let records_json = serde_json::to_vec_pretty(&stored)?;

    write_atomic(&self.vectors_path(), &self.vectors.to_npy())?;
    write_atomic(&self.records_path(), &records_json)?;
    debug!("persisted {} feedback records", self.records.len());
    Ok(())
  }

  /// The `k` nearest indexed records to `query`, ascending by distance.
  pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Neighbor, &FeedbackRecord)>> {
    let k = k.min(self.records.len());
    let hits = self.index.search(query, k)?;
    Ok(hits.into_iter().filter_map(|n| self.records.get(n.index).map(|r| (n, r))).collect())
  }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
  let dir = path.parent().unwrap_or_else(|| Path::new("."));
  fs::create_dir_all(dir).map_err(|e| MemoryError::io(dir, e))?;

  let mut tmp = NamedTempFile::new_in(dir).map_err(|e| MemoryError::io(dir, e))?;
  tmp.write_all(bytes).map_err(|e| MemoryError::io(tmp.path(), e))?;
  tmp.as_file().sync_all().map_err(|e| MemoryError::io(path, e))?;
  tmp.persist(path).map_err(|e| MemoryError::io(path, e.error))?;
  Ok(())
}
