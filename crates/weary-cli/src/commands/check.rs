use std::path::PathBuf;

use crate::error::CliError;
use crate::io::{self, NodeSpec, OpSpec};

pub fn handle_check(file: PathBuf) -> Result<(), CliError> {
    let spec = io::read_tree(&file)?;
    // Surface leaf/arity problems exactly as `run` would.
    io::into_node(spec.clone())?;
    let (rows, cols) = infer_shape(&spec)?;
    println!("ok: result shape {rows}x{cols}");
    Ok(())
}

/// Propagates matrix shapes through the tree without evaluating anything.
fn infer_shape(spec: &NodeSpec) -> Result<(usize, usize), CliError> {
    match spec {
        NodeSpec::Leaf(matrix) => {
            let rows = matrix.len();
            let cols = matrix.first().map_or(0, Vec::len);
            if rows == 0 || cols == 0 {
                return Err(CliError::Shape {
                    message: "leaf matrix is empty".to_string(),
                });
            }
            Ok((rows, cols))
        }
        NodeSpec::Operator { op, args } => {
            let shapes = args
                .iter()
                .map(infer_shape)
                .collect::<Result<Vec<_>, _>>()?;
            match (op, shapes.as_slice()) {
                (OpSpec::Add, [left, right]) => {
                    if left != right {
                        return Err(CliError::Shape {
                            message: format!(
                                "cannot add {}x{} to {}x{}",
                                left.0, left.1, right.0, right.1
                            ),
                        });
                    }
                    Ok(*left)
                }
                (OpSpec::Multiply, [left, right]) => {
                    if left.1 != right.0 {
                        return Err(CliError::Shape {
                            message: format!(
                                "cannot multiply {}x{} by {}x{}",
                                left.0, left.1, right.0, right.1
                            ),
                        });
                    }
                    Ok((left.0, right.1))
                }
                (OpSpec::Negate, [only]) => Ok(*only),
                (OpSpec::Transpose, [only]) => Ok((only.1, only.0)),
                _ => Err(CliError::Shape {
                    message: format!("{op:?} has the wrong number of operands"),
                }),
            }
        }
    }
}
