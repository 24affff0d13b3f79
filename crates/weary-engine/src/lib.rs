//! Expression-tree evaluation over shared matrices.
//!
//! A [`ComputationNode`] tree describes a matrix expression built from
//! `add`, `multiply`, `negate` and `transpose`. The [`Engine`] repeatedly
//! finds the deepest resolvable node, stages its operands into two shared
//! matrix buffers, fans one task per row out to a fatigue-aware
//! [`weary_sched::Executor`], waits for the drain barrier, and materializes
//! the node's value, repeating until the root is resolved.

mod engine;
mod error;
mod node;
mod rewrite;

pub use engine::Engine;
pub use error::EngineError;
pub use node::{ComputationNode, Matrix, OpKind};
