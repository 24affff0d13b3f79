use std::fmt;

use crate::error::EngineError;

/// Row-major matrix data as exchanged with parsers and writers.
pub type Matrix = Vec<Vec<f64>>;

/// Operator kinds of the expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Multiply,
    Negate,
    Transpose,
}

impl OpKind {
    pub fn arity(self) -> usize {
        match self {
            OpKind::Add | OpKind::Multiply => 2,
            OpKind::Negate | OpKind::Transpose => 1,
        }
    }

    /// Whether chains of this operator may be re-nested without changing
    /// the result.
    pub(crate) fn is_associative(self) -> bool {
        matches!(self, OpKind::Add | OpKind::Multiply)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Add => write!(f, "add"),
            OpKind::Multiply => write!(f, "multiply"),
            OpKind::Negate => write!(f, "negate"),
            OpKind::Transpose => write!(f, "transpose"),
        }
    }
}

/// A node in the expression tree: a leaf carrying a materialized matrix, or
/// an operator over ordered children with a slot for its result.
///
/// A leaf is resolved on construction. An operator becomes resolved when
/// [`resolve`](ComputationNode::resolve) installs its value, after which it
/// behaves like a leaf for its parent.
#[derive(Debug, Clone)]
pub struct ComputationNode {
    pub(crate) state: NodeState,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeState {
    Leaf {
        matrix: Matrix,
    },
    Operator {
        kind: OpKind,
        children: Vec<ComputationNode>,
        result: Option<Matrix>,
    },
}

impl ComputationNode {
    /// A leaf node; resolved immediately.
    pub fn leaf(matrix: Matrix) -> ComputationNode {
        ComputationNode {
            state: NodeState::Leaf { matrix },
        }
    }

    /// An operator node. Fails when the child count does not match the
    /// operator's arity.
    pub fn operator(
        kind: OpKind,
        children: Vec<ComputationNode>,
    ) -> Result<ComputationNode, EngineError> {
        if children.len() != kind.arity() {
            return Err(EngineError::WrongArity {
                kind,
                expected: kind.arity(),
                found: children.len(),
            });
        }
        Ok(ComputationNode {
            state: NodeState::Operator {
                kind,
                children,
                result: None,
            },
        })
    }

    pub fn is_resolved(&self) -> bool {
        match &self.state {
            NodeState::Leaf { .. } => true,
            NodeState::Operator { result, .. } => result.is_some(),
        }
    }

    /// The materialized value: a leaf's matrix, or an operator's result once
    /// resolved.
    pub fn matrix(&self) -> Option<&Matrix> {
        match &self.state {
            NodeState::Leaf { matrix } => Some(matrix),
            NodeState::Operator { result, .. } => result.as_ref(),
        }
    }

    /// The operator kind; `None` for leaves.
    pub fn kind(&self) -> Option<OpKind> {
        match &self.state {
            NodeState::Leaf { .. } => None,
            NodeState::Operator { kind, .. } => Some(*kind),
        }
    }

    pub fn children(&self) -> &[ComputationNode] {
        match &self.state {
            NodeState::Leaf { .. } => &[],
            NodeState::Operator { children, .. } => children,
        }
    }

    /// Installs the node's value and marks it resolved.
    pub fn resolve(&mut self, matrix: Matrix) {
        match &mut self.state {
            NodeState::Leaf { matrix: slot } => *slot = matrix,
            NodeState::Operator { result, .. } => *result = Some(matrix),
        }
    }

    /// The deepest unresolved node whose children are all resolved, or
    /// `None` once this subtree is fully resolved.
    pub fn find_resolvable(&mut self) -> Option<&mut ComputationNode> {
        if self.is_resolved() {
            return None;
        }
        if self.children().iter().all(ComputationNode::is_resolved) {
            return Some(self);
        }
        match &mut self.state {
            NodeState::Operator { children, .. } => children
                .iter_mut()
                .find_map(ComputationNode::find_resolvable),
            NodeState::Leaf { .. } => None,
        }
    }

    /// Number of unresolved operator nodes in this subtree.
    pub fn unresolved_count(&self) -> usize {
        match &self.state {
            NodeState::Leaf { .. } => 0,
            NodeState::Operator { children, result, .. } => {
                if result.is_some() {
                    0
                } else {
                    1 + children
                        .iter()
                        .map(ComputationNode::unresolved_count)
                        .sum::<usize>()
                }
            }
        }
    }
}
