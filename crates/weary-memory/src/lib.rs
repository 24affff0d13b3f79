//! Shared linear-algebra memory: orientation-tagged vectors and matrices.
//!
//! This crate provides the two shared data structures the evaluation engine
//! fans row-parallel work over:
//!
//! - [`SharedVector`]: a fixed-length sequence of `f64` values tagged with an
//!   [`Orientation`], guarded by a reader/writer lock. Row tasks mutate
//!   individual vectors concurrently.
//! - [`SharedMatrix`]: an ordered collection of `Arc<SharedVector>` sharing a
//!   uniform orientation, with bulk load and row-major readout.
//!
//! # Thread Safety
//!
//! Element data is guarded per vector by a `parking_lot::RwLock`; the matrix
//! guards only the vector *array* with its own lock, so disjoint rows can be
//! mutated in parallel. Cross-vector operations (`add`, `dot`) acquire both
//! locks in a global order keyed on a stable per-vector id, so symmetric
//! concurrent calls cannot deadlock. Aliased operands are detected by id and
//! short-circuited instead of re-acquiring a held lock.

mod error;
mod matrix;
mod vector;

pub use error::MemoryError;
pub use matrix::SharedMatrix;
pub use vector::{Orientation, SharedVector, VectorData};
