use thiserror::Error;

use crate::vector::Orientation;

/// Errors raised by shared vector and matrix operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    #[error("vector length mismatch: left has {left}, right has {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("vector orientation mismatch: left is {left}, right is {right}")]
    OrientationMismatch { left: Orientation, right: Orientation },

    #[error("expected a {expected} vector, found a {found} vector")]
    WrongOrientation { expected: Orientation, found: Orientation },

    #[error("matrix is empty")]
    EmptyMatrix,

    #[error("inner dimension mismatch: vector has length {vector}, matrix columns have length {column}")]
    InnerDimensionMismatch { vector: usize, column: usize },

    #[error("ragged input: slice {index} has length {found}, expected {expected}")]
    RaggedInput {
        index: usize,
        found: usize,
        expected: usize,
    },

    #[error("inconsistent vector orientations in matrix")]
    InconsistentOrientation,

    #[error("inconsistent vector lengths in matrix")]
    InconsistentLength,
}
