//! Reading expression trees and writing result matrices.
//!
//! A tree node is either a 2-D number array (a leaf matrix) or an object
//! `{"op": "add"|"multiply"|"negate"|"transpose", "args": [node, ...]}`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use weary_engine::{ComputationNode, Matrix, OpKind};

use crate::error::CliError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Leaf(Matrix),
    Operator { op: OpSpec, args: Vec<NodeSpec> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpSpec {
    Add,
    Multiply,
    Negate,
    Transpose,
}

impl From<OpSpec> for OpKind {
    fn from(op: OpSpec) -> OpKind {
        match op {
            OpSpec::Add => OpKind::Add,
            OpSpec::Multiply => OpKind::Multiply,
            OpSpec::Negate => OpKind::Negate,
            OpSpec::Transpose => OpKind::Transpose,
        }
    }
}

#[derive(Serialize)]
struct ResultFile<'a> {
    matrix: &'a Matrix,
}

/// Parses the expression-tree file at `path`.
pub fn read_tree(path: &Path) -> Result<NodeSpec, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::io("read", path.to_path_buf(), e))?;
    serde_json::from_str(&contents).map_err(|e| CliError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Builds the computation tree, validating leaf rectangularity and operator
/// arity.
pub fn into_node(spec: NodeSpec) -> Result<ComputationNode, CliError> {
    match spec {
        NodeSpec::Leaf(matrix) => {
            check_rectangular(&matrix)?;
            Ok(ComputationNode::leaf(matrix))
        }
        NodeSpec::Operator { op, args } => {
            let children = args
                .into_iter()
                .map(into_node)
                .collect::<Result<Vec<_>, _>>()?;
            ComputationNode::operator(op.into(), children).map_err(CliError::from)
        }
    }
}

/// Writes the result matrix as `{"matrix": [[...]]}`.
pub fn write_matrix(path: &Path, matrix: &Matrix) -> Result<(), CliError> {
    let contents = serde_json::to_string_pretty(&ResultFile { matrix })
        .map_err(|e| CliError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
    std::fs::write(path, contents).map_err(|e| CliError::io("write", path.to_path_buf(), e))
}

/// Default output path: the input name with a `.out.json` extension.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension("out.json")
}

fn check_rectangular(matrix: &Matrix) -> Result<(), CliError> {
    let Some(first) = matrix.first() else {
        return Ok(());
    };
    for (row, values) in matrix.iter().enumerate().skip(1) {
        if values.len() != first.len() {
            return Err(CliError::RaggedLeaf {
                row,
                found: values.len(),
                expected: first.len(),
            });
        }
    }
    Ok(())
}
