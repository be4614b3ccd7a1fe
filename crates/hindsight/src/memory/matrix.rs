//! Dense row-major vector storage and the `.npy` file codec.
//!
//! The vector file is a NumPy array of shape `(n, d)`. We write version 1.0
//! little-endian `f32`; we read versions 1.0 through 3.0 with `<f4` or `<f8`
//! data so files produced by NumPy tooling load as-is.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{MemoryError, Result};

const MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGNMENT: usize = 64;

static DESCR: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"['"]descr['"]\s*:\s*['"]([^'"]+)['"]"#).expect("valid regex"));
static FORTRAN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"['"]fortran_order['"]\s*:\s*(True|False)"#).expect("valid regex"));
static SHAPE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"['"]shape['"]\s*:\s*\(([^)]*)\)"#).expect("valid regex"));

/// `n` rows of `dimension` floats, stored contiguously.
///
/// An empty matrix has no fixed dimension until its first row is pushed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorMatrix {
  dimension: usize,
  data: Vec<f32>,
}

impl VectorMatrix {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
    let mut matrix = Self::new();
    for row in rows {
      matrix.push(row)?;
    }
    Ok(matrix)
  }

  /// Row width, or `None` while the matrix is empty
  pub fn dimension(&self) -> Option<usize> {
    (self.dimension > 0).then_some(self.dimension)
  }

  pub fn rows(&self) -> usize {
    if self.dimension == 0 {
      0
    } else {
      self.data.len() / self.dimension
    }
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn row(&self, index: usize) -> Option<&[f32]> {
    if index >= self.rows() {
      return None;
    }
    let start = index * self.dimension;
    Some(&self.data[start..start + self.dimension])
  }

  pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
    self.data.chunks_exact(self.dimension.max(1))
  }

  /// Append a row, fixing the dimension on the first push.
  pub fn push(&mut self, row: &[f32]) -> Result<()> {
    if row.is_empty() {
      return Err(MemoryError::DimensionMismatch {
        expected: self.dimension,
        actual: 0,
      });
    }
    match self.dimension() {
      Some(expected) if expected != row.len() => {
        Err(MemoryError::DimensionMismatch { expected, actual: row.len() })
      }
      _ => {
        self.dimension = row.len();
        self.data.extend_from_slice(row);
        Ok(())
      }
    }
  }

  /// Keep only the first `rows` rows.
  pub fn truncate(&mut self, rows: usize) {
    self.data.truncate(rows * self.dimension);
    if self.data.is_empty() {
      self.dimension = 0;
    }
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// Serialize as a `.npy` v1.0 `<f4` array of shape `(n, d)`.
  pub fn to_npy(&self) -> Vec<u8> {
    let header = format!(
      "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
      self.rows(),
      self.dimension
    );

    // magic + version + u16 length + header + padding + newline
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
    let header_len = header.len() + padding + 1;

    let mut bytes = Vec::with_capacity(unpadded + padding + self.data.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header_len as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend(std::iter::repeat(b' ').take(padding));
    bytes.push(b'\n');
    for value in &self.data {
      bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
  }

  /// Parse a `.npy` array of shape `(n, d)`, `(0,)` or `(0, d)`.
  pub fn from_npy(bytes: &[u8]) -> Result<Self> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
      return Err(MemoryError::invalid_vectors("missing NPY magic"));
    }

    let major = bytes[MAGIC.len()];
    let (header_len, header_start) = match major {
      1 => (read_u16(bytes, 8)? as usize, 10),
      2 | 3 => (read_u32(bytes, 8)? as usize, 12),
      other => return Err(MemoryError::invalid_vectors(format!("unsupported NPY version {other}"))),
    };

    let header_end = header_start + header_len;
    let header = bytes
      .get(header_start..header_end)
      .ok_or_else(|| MemoryError::invalid_vectors("truncated header"))?;
    let header = std::str::from_utf8(header)
      .map_err(|_| MemoryError::invalid_vectors("header is not valid text"))?;

    let layout = HeaderLayout::parse(header)?;
    let payload = &bytes[header_end..];
    let values = layout.decode(payload)?;

    let mut matrix = Self::new();
    if layout.rows > 0 && layout.dimension > 0 {
      matrix.dimension = layout.dimension;
      matrix.data = values;
    }
    Ok(matrix)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dtype {
  F32,
  F64,
}

impl Dtype {
  fn width(self) -> usize {
    match self {
      Dtype::F32 => 4,
      Dtype::F64 => 8,
    }
  }
}

#[derive(Debug)]
struct HeaderLayout {
  dtype: Dtype,
  rows: usize,
  dimension: usize,
}

impl HeaderLayout {
  fn parse(header: &str) -> Result<Self> {
    let descr = DESCR
      .captures(header)
      .map(|c| c[1].to_string())
      .ok_or_else(|| MemoryError::invalid_vectors("header has no descr"))?;
    let dtype = match descr.as_str() {
      "<f4" | "f4" => Dtype::F32,
      "<f8" | "f8" => Dtype::F64,
      other => return Err(MemoryError::invalid_vectors(format!("unsupported dtype {other}"))),
    };

    if FORTRAN.captures(header).is_some_and(|c| &c[1] == "True") {
      return Err(MemoryError::invalid_vectors("fortran-ordered arrays are not supported"));
    }

    let shape = SHAPE
      .captures(header)
      .map(|c| c[1].to_string())
      .ok_or_else(|| MemoryError::invalid_vectors("header has no shape"))?;
    let dims = shape
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|s| s.trim_end_matches('L').parse::<usize>())
      .collect::<std::result::Result<Vec<_>, _>>()
      .map_err(|_| MemoryError::invalid_vectors(format!("bad shape ({shape})")))?;

    let (rows, dimension) = match dims.as_slice() {
      [0] => (0, 0),
      [rows, dimension] => (*rows, *dimension),
      _ => return Err(MemoryError::invalid_vectors(format!("expected a 2-D array, got ({shape})"))),
    };

    Ok(Self { dtype, rows, dimension })
  }

  /// Shape values come straight from the file, so the byte count is
  /// computed with checked arithmetic and must match the payload exactly.
  fn decode(&self, payload: &[u8]) -> Result<Vec<f32>> {
    let needed = self
      .rows
      .checked_mul(self.dimension)
      .and_then(|count| count.checked_mul(self.dtype.width()))
      .ok_or_else(|| MemoryError::invalid_vectors("shape overflows"))?;
    if payload.len() != needed {
      return Err(MemoryError::invalid_vectors(format!(
        "expected {needed} data bytes, found {}",
        payload.len()
      )));
    }

    let values = match self.dtype {
      Dtype::F32 => payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect(),
      Dtype::F64 => payload
        .chunks_exact(8)
        .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
        .collect(),
    };
    Ok(values)
  }
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
  bytes
    .get(at..at + 2)
    .map(|b| u16::from_le_bytes([b[0], b[1]]))
    .ok_or_else(|| MemoryError::invalid_vectors("truncated header length"))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
  bytes
    .get(at..at + 4)
    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    .ok_or_else(|| MemoryError::invalid_vectors("truncated header length"))
}
