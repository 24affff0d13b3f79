use thiserror::Error;

use weary_memory::{MemoryError, Orientation};
use weary_sched::SchedError;

use crate::node::OpKind;

/// Errors raised while building or evaluating a computation tree.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{kind} expects {expected} operand(s), got {found}")]
    WrongArity {
        kind: OpKind,
        expected: usize,
        found: usize,
    },

    #[error("node is not ready for computation")]
    NotResolvable,

    #[error("operand matrix is empty")]
    EmptyOperand,

    #[error("operand shapes do not match: {left_rows}x{left_cols} vs {right_rows}x{right_cols}")]
    ShapeMismatch {
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    #[error("inner dimensions do not match: left has {left_cols} columns, right has {right_rows} rows")]
    InnerDimensionMismatch {
        left_cols: usize,
        right_rows: usize,
    },

    #[error("operand buffer is not {expected}-oriented")]
    WrongOperandOrientation { expected: Orientation },

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Sched(#[from] SchedError),
}
