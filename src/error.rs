//! Error types

use std::fmt;

use crate::reference::Ref;
use crate::types::{DecompositionType, Var};

/// Errors reported by the manager, the order-file reader and the circuit
/// synthesizer.
#[derive(Debug)]
pub enum KfddError {
    /// Numeric operation code outside the supported set.
    UnknownOperation(u32),
    /// Operand handle that does not point at a live node.
    NullOperand(Ref),
    /// Primary name longer than the configured limit.
    NameLength { name: String, limit: usize },
    /// Primary name already registered.
    PrimaryExists(String),
    /// Primary table is full.
    PrimaryLimit(usize),
    /// The named output is not registered.
    OutputMissing(String),
    /// The label is not registered as a primary input.
    UnknownLabel(u32),
    /// Assignment does not cover every label.
    Evaluation { expected: usize, got: usize },
    /// Malformed `.order` file.
    OrderFile { line: usize, message: String },
    /// Child of a new node that is not strictly below the node's label.
    OrderViolation { var: Var, child: Ref },
    /// Node shape the circuit synthesizer has no gate sequence for.
    UnsupportedCase {
        decomposition: DecompositionType,
        description: String,
    },
    Io(std::io::Error),
}

impl fmt::Display for KfddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KfddError::UnknownOperation(op) => write!(f, "unknown operation code {}", op),
            KfddError::NullOperand(r) => write!(f, "operand {} does not point at a live node", r),
            KfddError::NameLength { name, limit } => {
                write!(f, "name '{}' is longer than {} bytes", name, limit)
            }
            KfddError::PrimaryExists(name) => write!(f, "primary '{}' already exists", name),
            KfddError::PrimaryLimit(limit) => {
                write!(f, "primary table is full ({} entries)", limit)
            }
            KfddError::OutputMissing(name) => write!(f, "no primary output named '{}'", name),
            KfddError::UnknownLabel(label) => write!(f, "label {} is not a primary input", label),
            KfddError::Evaluation { expected, got } => write!(
                f,
                "assignment covers {} variables, but {} are registered",
                got, expected
            ),
            KfddError::OrderFile { line, message } => {
                write!(f, "order file, line {}: {}", line, message)
            }
            KfddError::OrderViolation { var, child } => {
                write!(f, "child {} of a {} node is not below {}", child, var, var)
            }
            KfddError::UnsupportedCase {
                decomposition,
                description,
            } => write!(
                f,
                "no gate sequence for {} node with {}",
                decomposition, description
            ),
            KfddError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for KfddError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KfddError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KfddError {
    fn from(e: std::io::Error) -> Self {
        KfddError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, KfddError>;
