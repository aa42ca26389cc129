//! Flat inner-product index over unit-normalized embedding vectors.
//!
//! Vectors are stored row-major in a single buffer. All rows are unit length,
//! so the inner product with a unit query is the cosine similarity in
//! `[-1, 1]`; no distance conversion is involved anywhere.

use super::IndexError;

/// Epsilon guarding normalization of (near-)zero vectors.
const NORM_EPSILON: f32 = 1e-10;

/// Dense similarity index: one unit vector per corpus entry, scanned exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseIndex {
    dim: usize,
    data: Vec<f32>,
}

impl DenseIndex {
    /// Create an empty index for vectors of the given dimensionality.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    /// Vector dimensionality accepted by this index.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector, normalizing it to unit length first.
    ///
    /// Rows must be appended in corpus-entry order; the caller owns the
    /// positional alignment with its entry sequence.
    pub fn push(&mut self, vector: Vec<f32>) -> Result<(), IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        self.data.extend(l2_normalize(vector));
        Ok(())
    }

    /// Borrow the stored unit vector at row `i`.
    ///
    /// # Panics
    /// Panics when `i` is out of range; callers index within `0..len()`.
    pub fn vector(&self, i: usize) -> &[f32] {
        let start = i * self.dim;
        &self.data[start..start + self.dim]
    }

    /// Return the `k` nearest rows to `query` by inner product, best first.
    ///
    /// The query is normalized before scoring, so returned scores are cosine
    /// similarities. Ties break by ascending row index for determinism.
    pub fn search(&self, query: Vec<f32>, k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }
        let query = l2_normalize(query);

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|row| {
                let dot = self
                    .vector(row)
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (row, dot)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Raw row-major buffer, used by persistence.
    pub(crate) fn raw_data(&self) -> &[f32] {
        &self.data
    }

    /// Rebuild an index from a persisted row-major buffer.
    pub(crate) fn from_raw(dim: usize, data: Vec<f32>) -> Result<Self, IndexError> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(IndexError::Corrupt(format!(
                "dense buffer of {} floats is not a multiple of dimension {dim}",
                data.len()
            )));
        }
        Ok(Self { dim, data })
    }
}

/// Scale a vector to unit length, guarding zero norms with a small epsilon.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt() + NORM_EPSILON;
    for value in &mut vector {
        *value /= norm;
    }
    vector
}
