//! Nearest-neighbor search over stored vectors.
//!
//! `VectorIndex` is the seam between the store and whatever search structure
//! backs it. `FlatIndex` is exact brute-force squared-L2, which is fine up to
//! low tens of thousands of rows; anything larger should swap in an
//! approximate implementation behind the same trait.

use crate::error::IndexError;

use super::matrix::VectorMatrix;

/// One search hit: squared Euclidean distance and the row it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
  pub distance: f32,
  pub index: usize,
}

impl Neighbor {
  /// Heuristic normalization of distance into `[0, 1]`.
  ///
  /// Not a true cosine similarity; for unit vectors it is `1 - (1 - cos)`.
  pub fn similarity(&self) -> f32 {
    similarity_from_distance(self.distance)
  }
}

pub fn similarity_from_distance(distance: f32) -> f32 {
  if distance.is_nan() {
    return 0.0;
  }
  (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

/// Search structure over the rows of a `VectorMatrix`.
///
/// Implementations must leave their state untouched when `add` or `rebuild`
/// fails, so callers can keep serving the last good index.
pub trait VectorIndex: Send + Sync {
  fn dimension(&self) -> Option<usize>;

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Index one more row after the current last row
  fn add(&mut self, vector: &[f32]) -> Result<(), IndexError>;

  /// Drop every indexed row
  fn clear(&mut self);

  /// Replace the index contents with every row of `vectors`
  fn rebuild(&mut self, vectors: &VectorMatrix) -> Result<(), IndexError>;

  /// Up to `k` nearest rows, ascending by distance
  fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError>;
}

/// Exact squared-L2 search over a private copy of the vectors
#[derive(Debug, Default, Clone)]
pub struct FlatIndex {
  dimension: usize,
  data: Vec<f32>,
}

impl FlatIndex {
  pub fn new() -> Self {
    Self::default()
  }

  fn check(&self, expected: Option<usize>, vector: &[f32]) -> Result<(), IndexError> {
    if vector.is_empty() {
      return Err(IndexError::ZeroDimension);
    }
    if let Some(expected) = expected {
      if expected != vector.len() {
        return Err(IndexError::DimensionMismatch { expected, actual: vector.len() });
      }
    }
    if vector.iter().any(|v| !v.is_finite()) {
      return Err(IndexError::NonFinite);
    }
    Ok(())
  }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
  a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorIndex for FlatIndex {
  fn dimension(&self) -> Option<usize> {
    (self.dimension > 0).then_some(self.dimension)
  }

  fn len(&self) -> usize {
    if self.dimension == 0 {
      0
    } else {
      self.data.len() / self.dimension
    }
  }

  fn add(&mut self, vector: &[f32]) -> Result<(), IndexError> {
    self.check(self.dimension(), vector)?;
    self.dimension = vector.len();
    self.data.extend_from_slice(vector);
    Ok(())
  }

  fn clear(&mut self) {
    self.dimension = 0;
    self.data.clear();
  }

  fn rebuild(&mut self, vectors: &VectorMatrix) -> Result<(), IndexError> {
    let dimension = vectors.dimension();
    for row in vectors.iter_rows() {
      self.check(dimension, row)?;
    }
    self.dimension = dimension.unwrap_or(0);
    self.data = vectors.as_slice().to_vec();
    Ok(())
  }

  fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
    if self.is_empty() || k == 0 {
      return Ok(Vec::new());
    }
    self.check(self.dimension(), query)?;

    let mut hits: Vec<Neighbor> = self
      .data
      .chunks_exact(self.dimension)
      .enumerate()
      .map(|(index, row)| Neighbor { distance: squared_l2(query, row), index })
      .collect();

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index)));
    hits.truncate(k.min(self.len()));
    Ok(hits)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn index_of(rows: &[Vec<f32>]) -> FlatIndex {
    let mut index = FlatIndex::new();
    index.rebuild(&VectorMatrix::from_rows(rows).unwrap()).unwrap();
    index
  }

  #[test]
  fn test_search_orders_by_distance() {
    let index = index_of(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![0.9, 0.1]]);
    let hits = index.search(&[1.0, 0.0], 3).unwrap();

    let order: Vec<usize> = hits.iter().map(|h| h.index).collect();
    assert_eq!(order, vec![1, 2, 0]);
    assert_eq!(hits[0].distance, 0.0);
    assert!((hits[2].distance - 2.0).abs() < 1e-6);
  }

  #[test]
  fn test_search_caps_k_at_len() {
    let index = index_of(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
    assert_eq!(index.search(&[1.0, 0.0], 10).unwrap().len(), 2);
    assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
  }

  #[test]
  fn test_ties_break_by_row_order() {
    let index = index_of(&[vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0]]);
    let order: Vec<usize> = index.search(&[0.0, 1.0], 3).unwrap().iter().map(|h| h.index).collect();
    assert_eq!(order, vec![0, 1, 2]);
  }

  #[test]
  fn test_empty_index_returns_nothing() {
    let index = FlatIndex::new();
    assert!(index.search(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());
  }

  #[test]
  fn test_search_rejects_wrong_dimension() {
    let index = index_of(&[vec![1.0, 0.0]]);
    assert_eq!(
      index.search(&[1.0, 0.0, 0.0], 1),
      Err(IndexError::DimensionMismatch { expected: 2, actual: 3 })
    );
  }

  #[test]
  fn test_failed_add_keeps_previous_state() {
    let mut index = index_of(&[vec![1.0, 0.0]]);
    assert!(index.add(&[1.0, 0.0, 0.0]).is_err());
    assert!(index.add(&[f32::NAN, 0.0]).is_err());
    assert_eq!(index.len(), 1);
    assert_eq!(index.dimension(), Some(2));

    index.add(&[0.0, 1.0]).unwrap();
    assert_eq!(index.len(), 2);
  }

  #[test]
  fn test_clear_forgets_dimension() {
    let mut index = index_of(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
    index.clear();
    assert!(index.is_empty());
    assert_eq!(index.dimension(), None);

    index.add(&[1.0, 0.0, 0.0]).unwrap();
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn test_failed_rebuild_keeps_previous_state() {
    let mut index = index_of(&[vec![1.0, 0.0]]);
    let poisoned = VectorMatrix::from_rows(&[vec![0.0, 1.0], vec![f32::INFINITY, 0.0]]).unwrap();

    assert_eq!(index.rebuild(&poisoned), Err(IndexError::NonFinite));
    assert_eq!(index.len(), 1);
    assert_eq!(index.search(&[1.0, 0.0], 1).unwrap()[0].distance, 0.0);
  }

  #[test]
  fn test_similarity_is_clamped() {
    assert_eq!(similarity_from_distance(0.0), 1.0);
    assert_eq!(similarity_from_distance(1.0), 0.5);
    assert_eq!(similarity_from_distance(2.0), 0.0);
    assert_eq!(similarity_from_distance(7.5), 0.0);
    assert_eq!(similarity_from_distance(f32::NAN), 0.0);
    assert_eq!(Neighbor { distance: 0.5, index: 0 }.similarity(), 0.75);
  }
}
