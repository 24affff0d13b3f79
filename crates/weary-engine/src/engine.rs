use std::sync::Arc;

use weary_memory::{Orientation, SharedMatrix};
use weary_sched::{Executor, Task};

use crate::error::EngineError;
use crate::node::{ComputationNode, OpKind};

/// The evaluation driver.
///
/// Owns two long-lived shared matrix buffers (`left`, `right`) and the
/// worker pool. One operator node is evaluated at a time: its operands are
/// staged into the buffers, one task per row of `left` is fanned out, the
/// drain barrier guarantees completion, and the result is read back into the
/// node. Row tasks share the buffers by `Arc`, touch disjoint row vectors,
/// and only ever read `right`.
pub struct Engine {
    left: Arc<SharedMatrix>,
    right: Arc<SharedMatrix>,
    executor: Executor,
}

impl Engine {
    /// Creates an engine backed by `num_threads` workers.
    pub fn new(num_threads: usize) -> Result<Engine, EngineError> {
        Ok(Engine {
            left: Arc::new(SharedMatrix::new()),
            right: Arc::new(SharedMatrix::new()),
            executor: Executor::new(num_threads)?,
        })
    }

    /// Evaluates the tree rooted at `root` until it is fully resolved. The
    /// result is the root's matrix. The worker pool survives across calls
    /// and is shut down when the engine is dropped.
    pub fn run(&mut self, root: &mut ComputationNode) -> Result<(), EngineError> {
        self.run_with(root, |_| {})
    }

    /// Like [`run`](Self::run), invoking `on_resolved` after every node
    /// resolution (used for progress reporting).
    pub fn run_with(
        &mut self,
        root: &mut ComputationNode,
        mut on_resolved: impl FnMut(&ComputationNode),
    ) -> Result<(), EngineError> {
        root.associative_nesting();
        loop {
            let Some(node) = root.find_resolvable() else {
                return Ok(());
            };
            self.load_and_compute(node)?;
            on_resolved(node);
        }
    }

    /// Evaluates one resolvable operator node: stages operands, validates
    /// shapes, fans out row tasks, drains, and installs the result.
    pub fn load_and_compute(&mut self, node: &mut ComputationNode) -> Result<(), EngineError> {
        let kind = node.kind().ok_or(EngineError::NotResolvable)?;
        if node.is_resolved() || !node.children().iter().all(ComputationNode::is_resolved) {
            return Err(EngineError::NotResolvable);
        }

        let children = node.children();
        let tasks = match kind {
            OpKind::Add => {
                self.left.load_row_major(operand(&children[0])?)?;
                self.right.load_row_major(operand(&children[1])?)?;
                self.add_tasks()?
            }
            OpKind::Multiply => {
                self.left.load_row_major(operand(&children[0])?)?;
                self.right.load_column_major(operand(&children[1])?)?;
                self.multiply_tasks()?
            }
            OpKind::Negate => {
                self.left.load_row_major(operand(&children[0])?)?;
                self.unary_tasks(kind)?
            }
            OpKind::Transpose => {
                self.left.load_row_major(operand(&children[0])?)?;
                self.unary_tasks(kind)?
            }
        };

        log::debug!("{kind}: dispatching {} row task(s)", tasks.len());
        self.executor.submit_all(tasks)?;

        let result = self.left.read_row_major()?;
        node.resolve(result);
        Ok(())
    }

    /// Per-worker statistics of the underlying pool.
    pub fn worker_report(&self) -> String {
        self.executor.worker_report()
    }

    /// Stops the worker pool. Also happens on drop; afterwards any further
    /// evaluation fails.
    pub fn shutdown(&mut self) {
        self.executor.shutdown();
    }

    /// One `left.row(i).add(right.row(i))` task per row. Both buffers must
    /// be non-empty, row-oriented and of identical shape.
    fn add_tasks(&self) -> Result<Vec<Task>, EngineError> {
        let (left_rows, left_cols) = require_loaded(&self.left, Orientation::Row)?;
        let (right_rows, right_cols) = require_loaded(&self.right, Orientation::Row)?;
        if left_rows != right_rows || left_cols != right_cols {
            return Err(EngineError::ShapeMismatch {
                left_rows,
                left_cols,
                right_rows,
                right_cols,
            });
        }

        let mut tasks: Vec<Task> = Vec::with_capacity(left_rows);
        for index in 0..left_rows {
            let (row, addend) = match (self.left.vector(index), self.right.vector(index)) {
                (Some(row), Some(addend)) => (row, addend),
                _ => return Err(EngineError::EmptyOperand),
            };
            tasks.push(Box::new(move || {
                if let Err(err) = row.add(&addend) {
                    log::error!("row addition failed after validation: {err}");
                }
            }));
        }
        Ok(tasks)
    }

    /// One `left.row(i).vec_mat_mul(right)` task per row. `left` must be
    /// row-oriented, `right` column-oriented, with the inner dimension
    /// matching the length of `right`'s columns.
    fn multiply_tasks(&self) -> Result<Vec<Task>, EngineError> {
        let (left_rows, left_cols) = require_loaded(&self.left, Orientation::Row)?;
        let (_, right_rows) = require_loaded(&self.right, Orientation::Column)?;
        if left_cols != right_rows {
            return Err(EngineError::InnerDimensionMismatch {
                left_cols,
                right_rows,
            });
        }

        let mut tasks: Vec<Task> = Vec::with_capacity(left_rows);
        for index in 0..left_rows {
            let row = self.left.vector(index).ok_or(EngineError::EmptyOperand)?;
            let right = Arc::clone(&self.right);
            tasks.push(Box::new(move || {
                if let Err(err) = row.vec_mat_mul(&right) {
                    log::error!("row multiplication failed after validation: {err}");
                }
            }));
        }
        Ok(tasks)
    }

    /// One in-place task per row for `negate` / `transpose`.
    fn unary_tasks(&self, kind: OpKind) -> Result<Vec<Task>, EngineError> {
        let (rows, _) = require_loaded(&self.left, Orientation::Row)?;
        let mut tasks: Vec<Task> = Vec::with_capacity(rows);
        for index in 0..rows {
            let row = self.left.vector(index).ok_or(EngineError::EmptyOperand)?;
            let task: Task = match kind {
                OpKind::Negate => Box::new(move || row.negate()),
                OpKind::Transpose => Box::new(move || row.transpose()),
                OpKind::Add | OpKind::Multiply => return Err(EngineError::NotResolvable),
            };
            tasks.push(task);
        }
        Ok(tasks)
    }
}

/// A child's materialized matrix; resolvable nodes always have one.
fn operand(child: &ComputationNode) -> Result<&crate::node::Matrix, EngineError> {
    child.matrix().ok_or(EngineError::NotResolvable)
}

/// Validates that a staged buffer is non-empty with the expected
/// orientation, returning `(vector count, vector length)`.
fn require_loaded(
    matrix: &SharedMatrix,
    expected: Orientation,
) -> Result<(usize, usize), EngineError> {
    let count = matrix.len();
    let len = match matrix.vector(0) {
        Some(vector) => vector.len(),
        None => 0,
    };
    if count == 0 || len == 0 {
        return Err(EngineError::EmptyOperand);
    }
    if matrix.orientation() != Some(expected) {
        return Err(EngineError::WrongOperandOrientation { expected });
    }
    Ok((count, len))
}
