use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::MemoryError;
use crate::vector::{Orientation, SharedVector};

/// An ordered collection of shared vectors with a uniform orientation.
///
/// When the orientation is `Row`, element `i` is row `i` and the vector
/// length is the column count; when it is `Column`, element `i` is column `i`
/// and the vector length is the row count. An empty matrix has no
/// orientation.
///
/// Bulk loads replace the vector array wholesale under the matrix's own
/// lock; element data is only ever touched through the individual vectors'
/// locks, so row tasks on disjoint vectors proceed in parallel.
#[derive(Debug, Default)]
pub struct SharedMatrix {
    vectors: RwLock<Vec<Arc<SharedVector>>>,
}

impl SharedMatrix {
    /// Creates an empty matrix.
    pub fn new() -> SharedMatrix {
        SharedMatrix {
            vectors: RwLock::new(Vec::new()),
        }
    }

    /// Creates a matrix from row-major data.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<SharedMatrix, MemoryError> {
        let matrix = SharedMatrix::new();
        matrix.load_row_major(rows)?;
        Ok(matrix)
    }

    /// Replaces the contents with `rows`, one row-oriented vector per input
    /// row. The input must be rectangular and is copied defensively. Empty
    /// input yields an empty matrix.
    pub fn load_row_major(&self, rows: &[Vec<f64>]) -> Result<(), MemoryError> {
        check_rectangular(rows)?;
        log::trace!(
            "loading {}x{} row-major",
            rows.len(),
            rows.first().map_or(0, Vec::len)
        );
        let vectors = rows
            .iter()
            .map(|row| Arc::new(SharedVector::new(row, Orientation::Row)))
            .collect();
        *self.vectors.write() = vectors;
        Ok(())
    }

    /// Replaces the contents with the columns of the row-major input: column
    /// `c` becomes a column-oriented vector holding `rows[0][c], rows[1][c],
    /// …`, so a later [`read_row_major`](Self::read_row_major) returns the
    /// input unchanged.
    pub fn load_column_major(&self, rows: &[Vec<f64>]) -> Result<(), MemoryError> {
        check_rectangular(rows)?;
        let column_count = rows.first().map_or(0, Vec::len);
        let vectors = (0..column_count)
            .map(|c| {
                let column: Vec<f64> = rows.iter().map(|row| row[c]).collect();
                Arc::new(SharedVector::new(&column, Orientation::Column))
            })
            .collect();
        *self.vectors.write() = vectors;
        Ok(())
    }

    /// Materializes the matrix as row-major data.
    ///
    /// Takes a snapshot of the vector array, acquires every element's read
    /// lock in index order, and re-verifies the matrix invariants before
    /// copying out: misuse of the vector API can leave the elements with
    /// mixed orientations or lengths, which surfaces here as
    /// [`MemoryError::InconsistentOrientation`] /
    /// [`MemoryError::InconsistentLength`]. Handles both row- and
    /// column-oriented element sets.
    pub fn read_row_major(&self) -> Result<Vec<Vec<f64>>, MemoryError> {
        let local = self.vectors.read().clone();
        if local.is_empty() {
            return Ok(Vec::new());
        }

        let guards: Vec<_> = local.iter().map(|vector| vector.read()).collect();

        let orientation = guards[0].orientation();
        if guards.iter().any(|g| g.orientation() != orientation) {
            log::warn!("matrix readout found mixed vector orientations");
            return Err(MemoryError::InconsistentOrientation);
        }
        let len = guards[0].len();
        if guards.iter().any(|g| g.len() != len) {
            return Err(MemoryError::InconsistentLength);
        }

        let out = match orientation {
            Orientation::Row => guards.iter().map(|g| g.values().to_vec()).collect(),
            Orientation::Column => {
                let rows = len;
                let cols = guards.len();
                (0..rows)
                    .map(|r| (0..cols).map(|c| guards[c].values()[r]).collect())
                    .collect()
            }
        };
        Ok(out)
    }

    /// The vector at `index`, if present.
    pub fn vector(&self, index: usize) -> Option<Arc<SharedVector>> {
        self.vectors.read().get(index).cloned()
    }

    /// Number of stored vectors (rows when row-oriented, columns otherwise).
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }

    /// The common orientation, or `None` for an empty matrix.
    pub fn orientation(&self) -> Option<Orientation> {
        self.vectors.read().first().map(|v| v.orientation())
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<SharedVector>> {
        self.vectors.read().clone()
    }
}

fn check_rectangular(rows: &[Vec<f64>]) -> Result<(), MemoryError> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    for (index, row) in rows.iter().enumerate().skip(1) {
        if row.len() != first.len() {
            return Err(MemoryError::RaggedInput {
                index,
                found: row.len(),
                expected: first.len(),
            });
        }
    }
    Ok(())
}
