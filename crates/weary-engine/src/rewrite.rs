//! Associative re-nesting of the expression tree.
//!
//! Chains of the associative binary operators (`add`, `multiply`) arrive
//! from parsers as left- or right-leaning combs, which serialize evaluation:
//! each operator has to wait for the one below it. Flattening a maximal
//! same-kind chain into its operand list and rebuilding it as a balanced
//! binary tree exposes independently resolvable subtrees instead, without
//! changing the result. Operand order is preserved throughout, since
//! `multiply` is associative but not commutative.

use crate::node::{ComputationNode, NodeState, OpKind};

impl ComputationNode {
    /// Normalizes the tree in place. Applied once before evaluation.
    pub fn associative_nesting(&mut self) {
        let state = std::mem::replace(
            &mut self.state,
            NodeState::Leaf { matrix: Vec::new() },
        );
        self.state = nest(state);
    }
}

fn nest(state: NodeState) -> NodeState {
    match state {
        NodeState::Leaf { .. } => state,
        NodeState::Operator { result: Some(_), .. } => state,
        NodeState::Operator {
            kind,
            children,
            result: None,
        } if kind.is_associative() => {
            let mut operands = Vec::new();
            for child in children {
                flatten(child, kind, &mut operands);
            }
            rebalance(kind, operands).state
        }
        NodeState::Operator {
            kind,
            children,
            result: None,
        } => {
            let children = children
                .into_iter()
                .map(|mut child| {
                    child.associative_nesting();
                    child
                })
                .collect();
            NodeState::Operator {
                kind,
                children,
                result: None,
            }
        }
    }
}

/// Collects the operand list of a maximal `kind` chain, in order. Nodes of a
/// different kind (and resolved nodes, which behave as leaves) terminate the
/// chain and are normalized recursively as operands.
fn flatten(node: ComputationNode, kind: OpKind, operands: &mut Vec<ComputationNode>) {
    match node.state {
        NodeState::Operator {
            kind: child_kind,
            children,
            result: None,
        } if child_kind == kind => {
            for child in children {
                flatten(child, kind, operands);
            }
        }
        state => {
            let mut operand = ComputationNode { state };
            operand.associative_nesting();
            operands.push(operand);
        }
    }
}

/// Rebuilds an operand list as an order-preserving balanced binary tree by
/// pairing adjacent operands level by level.
fn rebalance(kind: OpKind, mut operands: Vec<ComputationNode>) -> ComputationNode {
    debug_assert!(operands.len() >= 2);
    while operands.len() > 1 {
        let mut level = Vec::with_capacity(operands.len().div_ceil(2));
        let mut iter = operands.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => level.push(ComputationNode {
                    state: NodeState::Operator {
                        kind,
                        children: vec![left, right],
                        result: None,
                    },
                }),
                None => level.push(left),
            }
        }
        operands = level;
    }
    operands
        .pop()
        .unwrap_or_else(|| ComputationNode::leaf(Vec::new()))
}
