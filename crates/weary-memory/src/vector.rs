use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::MemoryError;
use crate::matrix::SharedMatrix;

/// Whether a vector is conceptually a row or a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Row,
    Column,
}

impl Orientation {
    pub fn opposite(self) -> Orientation {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Row => write!(f, "row"),
            Orientation::Column => write!(f, "column"),
        }
    }
}

/// Lock-order key allocator. Ids are process-unique and monotone, which gives
/// cross-vector operations a stable global acquisition order.
static NEXT_VECTOR_ID: AtomicU64 = AtomicU64::new(0);

/// The lock-guarded state of a [`SharedVector`]: element values plus the
/// orientation tag. Readers holding a guard from [`SharedVector::read`]
/// observe a consistent (length, orientation, values) snapshot.
#[derive(Debug)]
pub struct VectorData {
    pub(crate) values: Vec<f64>,
    pub(crate) orientation: Orientation,
}

impl VectorData {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

/// An orientation-tagged sequence of doubles behind a reader/writer lock.
///
/// Values and orientation may change under the write lock; the length is
/// fixed except through [`SharedVector::vec_mat_mul`], which replaces the
/// storage wholesale. Vectors are shared across row tasks as
/// `Arc<SharedVector>`.
#[derive(Debug)]
pub struct SharedVector {
    id: u64,
    data: RwLock<VectorData>,
}

impl SharedVector {
    /// Creates a vector by copying `values`.
    pub fn new(values: &[f64], orientation: Orientation) -> SharedVector {
        SharedVector {
            id: NEXT_VECTOR_ID.fetch_add(1, Ordering::Relaxed),
            data: RwLock::new(VectorData {
                values: values.to_vec(),
                orientation,
            }),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Element at `index`, or `None` out of bounds. Snapshot read.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.data.read().get(index)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn orientation(&self) -> Orientation {
        self.data.read().orientation
    }

    /// Acquires the read lock, letting the caller hold it across several
    /// reads. The matrix-level readout uses this to pin every element vector
    /// while it materializes.
    pub fn read(&self) -> RwLockReadGuard<'_, VectorData> {
        self.data.read()
    }

    /// Acquires the write lock for exclusive multi-step access.
    pub fn write(&self) -> RwLockWriteGuard<'_, VectorData> {
        self.data.write()
    }

    /// Flips the orientation tag. Values are untouched.
    pub fn transpose(&self) {
        let mut data = self.data.write();
        data.orientation = data.orientation.opposite();
    }

    /// Negates every element in place.
    pub fn negate(&self) {
        let mut data = self.data.write();
        for value in &mut data.values {
            *value = -*value;
        }
    }

    /// Elementwise adds `other` into `self`.
    ///
    /// Requires equal lengths and equal orientations. The two locks are
    /// taken in global id order (write on `self`, read on `other`), so
    /// symmetric concurrent adds on the same pair cannot deadlock. Adding a
    /// vector to itself is detected and doubles the elements under a single
    /// write lock.
    pub fn add(&self, other: &SharedVector) -> Result<(), MemoryError> {
        if self.id == other.id {
            let mut data = self.data.write();
            for value in &mut data.values {
                *value *= 2.0;
            }
            return Ok(());
        }

        let (mut this, other) = if self.id < other.id {
            let this = self.data.write();
            let other = other.data.read();
            (this, other)
        } else {
            let other = other.data.read();
            let this = self.data.write();
            (this, other)
        };

        if this.len() != other.len() {
            return Err(MemoryError::LengthMismatch {
                left: this.len(),
                right: other.len(),
            });
        }
        if this.orientation != other.orientation {
            return Err(MemoryError::OrientationMismatch {
                left: this.orientation,
                right: other.orientation,
            });
        }
        for (value, addend) in this.values.iter_mut().zip(other.values.iter()) {
            *value += *addend;
        }
        Ok(())
    }

    /// Dot product of a row with a column (or a column with a row).
    ///
    /// Requires equal lengths and *opposite* orientations. A vector dotted
    /// with itself necessarily shares its own orientation, so aliasing is
    /// rejected before any lock is taken twice.
    pub fn dot(&self, other: &SharedVector) -> Result<f64, MemoryError> {
        if self.id == other.id {
            let orientation = self.orientation();
            return Err(MemoryError::OrientationMismatch {
                left: orientation,
                right: orientation,
            });
        }

        let (this, other) = if self.id < other.id {
            let this = self.data.read();
            let other = other.data.read();
            (this, other)
        } else {
            let other = other.data.read();
            let this = self.data.read();
            (this, other)
        };

        if this.len() != other.len() {
            return Err(MemoryError::LengthMismatch {
                left: this.len(),
                right: other.len(),
            });
        }
        if this.orientation == other.orientation {
            return Err(MemoryError::OrientationMismatch {
                left: this.orientation,
                right: other.orientation,
            });
        }
        let sum = this
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum();
        Ok(sum)
    }

    /// Row-vector × matrix product, in place.
    ///
    /// Requires `self` to be a row, `matrix` to be non-empty and
    /// column-oriented, and every column to have length `self.len()`. On
    /// success the storage is replaced by the product, whose length is the
    /// matrix's column count; the orientation stays `Row`. All validation
    /// happens before the first element is written.
    pub fn vec_mat_mul(&self, matrix: &SharedMatrix) -> Result<(), MemoryError> {
        let columns = matrix.snapshot();
        if columns.is_empty() {
            return Err(MemoryError::EmptyMatrix);
        }

        let mut data = self.data.write();
        if data.orientation != Orientation::Row {
            return Err(MemoryError::WrongOrientation {
                expected: Orientation::Row,
                found: data.orientation,
            });
        }

        let mut product = Vec::with_capacity(columns.len());
        for column in &columns {
            // A column cannot alias this row without first violating the
            // matrix orientation invariant; refuse rather than deadlock.
            if column.id == self.id {
                return Err(MemoryError::WrongOrientation {
                    expected: Orientation::Column,
                    found: data.orientation,
                });
            }
            let column = column.read();
            if column.orientation != Orientation::Column {
                return Err(MemoryError::WrongOrientation {
                    expected: Orientation::Column,
                    found: column.orientation,
                });
            }
            if column.len() != data.len() {
                return Err(MemoryError::InnerDimensionMismatch {
                    vector: data.len(),
                    column: column.len(),
                });
            }
            let entry = data
                .values
                .iter()
                .zip(column.values.iter())
                .map(|(a, b)| a * b)
                .sum();
            product.push(entry);
        }

        data.values = product;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[f64]) -> SharedVector {
        SharedVector::new(values, Orientation::Row)
    }

    fn col(values: &[f64]) -> SharedVector {
        SharedVector::new(values, Orientation::Column)
    }

    fn assert_values(vector: &SharedVector, expected: &[f64]) {
        assert_eq!(vector.len(), expected.len());
        for (i, want) in expected.iter().enumerate() {
            let got = vector.get(i).unwrap();
            assert!(
                (got - want).abs() < 1e-9,
                "mismatch at index {i}: {got} vs {want}"
            );
        }
    }

    #[test]
    fn construction_copies_values() {
        let mut source = vec![1.0, 2.0, 3.0];
        let v = row(&source);
        source[0] = 99.0;
        assert_values(&v, &[1.0, 2.0, 3.0]);
        assert_eq!(v.orientation(), Orientation::Row);
    }

    #[test]
    fn get_out_of_bounds_is_none() {
        let v = row(&[1.0]);
        assert_eq!(v.get(0), Some(1.0));
        assert_eq!(v.get(1), None);
    }

    #[test]
    fn empty_vector() {
        let v = row(&[]);
        assert_eq!(v.len(), 0);
        assert!(v.is_empty());
    }

    #[test]
    fn transpose_flips_orientation_only() {
        let v = row(&[1.0, 2.0]);
        v.transpose();
        assert_eq!(v.orientation(), Orientation::Column);
        assert_values(&v, &[1.0, 2.0]);
        v.transpose();
        assert_eq!(v.orientation(), Orientation::Row);
    }

    #[test]
    fn negate_twice_is_identity() {
        let v = row(&[1.0, -2.0, 0.0]);
        v.negate();
        assert_values(&v, &[-1.0, 2.0, 0.0]);
        v.negate();
        assert_values(&v, &[1.0, -2.0, 0.0]);
    }

    #[test]
    fn add_row_vectors() {
        let a = row(&[1.0, 2.0, 3.0]);
        let b = row(&[4.0, 5.0, 6.0]);
        a.add(&b).unwrap();
        assert_values(&a, &[5.0, 7.0, 9.0]);
        assert_values(&b, &[4.0, 5.0, 6.0]);
        assert_eq!(a.orientation(), Orientation::Row);
    }

    #[test]
    fn add_column_vectors() {
        let a = col(&[1.0, 2.0]);
        let b = col(&[10.0, 20.0]);
        a.add(&b).unwrap();
        assert_values(&a, &[11.0, 22.0]);
        assert_eq!(a.orientation(), Orientation::Column);
    }

    #[test]
    fn add_single_element() {
        let a = row(&[5.0]);
        let b = row(&[3.0]);
        a.add(&b).unwrap();
        assert_values(&a, &[8.0]);
    }

    #[test]
    fn add_empty_vectors_is_a_no_op() {
        let a = row(&[]);
        let b = row(&[]);
        a.add(&b).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn add_length_mismatch() {
        let a = row(&[1.0, 2.0, 3.0]);
        let b = row(&[4.0, 5.0]);
        let err = a.add(&b).unwrap_err();
        assert_eq!(err, MemoryError::LengthMismatch { left: 3, right: 2 });
        assert_values(&a, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn add_orientation_mismatch() {
        let a = row(&[1.0, 2.0]);
        let b = col(&[3.0, 4.0]);
        let err = a.add(&b).unwrap_err();
        assert_eq!(
            err,
            MemoryError::OrientationMismatch {
                left: Orientation::Row,
                right: Orientation::Column,
            }
        );
    }

    #[test]
    fn add_self_doubles() {
        let a = row(&[1.0, -2.0, 3.0]);
        a.add(&a).unwrap();
        assert_values(&a, &[2.0, -4.0, 6.0]);
    }

    #[test]
    fn dot_row_with_column() {
        let a = row(&[1.0, 2.0, 3.0]);
        let b = col(&[4.0, 5.0, 6.0]);
        assert!((a.dot(&b).unwrap() - 32.0).abs() < 1e-9);
        assert!((b.dot(&a).unwrap() - 32.0).abs() < 1e-9);
    }

    #[test]
    fn dot_length_mismatch() {
        let a = row(&[1.0, 2.0]);
        let b = col(&[1.0, 2.0, 3.0]);
        let err = a.dot(&b).unwrap_err();
        assert_eq!(err, MemoryError::LengthMismatch { left: 2, right: 3 });
    }

    #[test]
    fn dot_same_orientation_rejected() {
        let a = row(&[1.0, 2.0]);
        let b = row(&[3.0, 4.0]);
        assert_eq!(
            a.dot(&b).unwrap_err(),
            MemoryError::OrientationMismatch {
                left: Orientation::Row,
                right: Orientation::Row,
            }
        );
    }

    #[test]
    fn dot_self_rejected() {
        let a = row(&[1.0, 2.0]);
        assert!(matches!(
            a.dot(&a).unwrap_err(),
            MemoryError::OrientationMismatch { .. }
        ));
    }

    #[test]
    fn vec_mat_mul_replaces_storage() {
        // [1 2 3] x [[1,2],[3,4],[5,6]] = [22 28]
        let v = row(&[1.0, 2.0, 3.0]);
        let m = SharedMatrix::new();
        m.load_column_major(&[
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 6.0],
        ])
        .unwrap();
        v.vec_mat_mul(&m).unwrap();
        assert_values(&v, &[22.0, 28.0]);
        assert_eq!(v.orientation(), Orientation::Row);
    }

    #[test]
    fn vec_mat_mul_requires_row_vector() {
        let v = col(&[1.0, 2.0]);
        let m = SharedMatrix::new();
        m.load_column_major(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(
            v.vec_mat_mul(&m).unwrap_err(),
            MemoryError::WrongOrientation {
                expected: Orientation::Row,
                found: Orientation::Column,
            }
        );
        assert_values(&v, &[1.0, 2.0]);
    }

    #[test]
    fn vec_mat_mul_requires_column_matrix() {
        let v = row(&[1.0, 2.0]);
        let m = SharedMatrix::new();
        m.load_row_major(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert!(matches!(
            v.vec_mat_mul(&m).unwrap_err(),
            MemoryError::WrongOrientation { .. }
        ));
    }

    #[test]
    fn vec_mat_mul_empty_matrix() {
        let v = row(&[1.0, 2.0]);
        let m = SharedMatrix::new();
        assert_eq!(v.vec_mat_mul(&m).unwrap_err(), MemoryError::EmptyMatrix);
    }

    #[test]
    fn vec_mat_mul_inner_dimension_mismatch() {
        let v = row(&[1.0, 2.0]);
        let m = SharedMatrix::new();
        m.load_column_major(&[
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 6.0],
        ])
        .unwrap();
        // columns have length 3, the vector has length 2
        assert_eq!(
            v.vec_mat_mul(&m).unwrap_err(),
            MemoryError::InnerDimensionMismatch { vector: 2, column: 3 }
        );
        assert_values(&v, &[1.0, 2.0]);
    }

    #[test]
    fn locks_released_after_errors() {
        let a = row(&[1.0, 2.0, 3.0]);
        let b = row(&[4.0, 5.0]);
        let _ = a.add(&b);
        let _ = a.dot(&b);
        // Both vectors must still be write-lockable and usable.
        {
            let mut guard = a.write();
            guard.values[0] = 7.0;
        }
        drop(b.write());
        assert_eq!(a.get(0), Some(7.0));
        let c = row(&[1.0, 1.0, 1.0]);
        a.add(&c).unwrap();
        assert_values(&a, &[8.0, 3.0, 4.0]);
    }
}
