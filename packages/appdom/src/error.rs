//! Error types for document operations.

use thiserror::Error;

use crate::id::NodeId;
use crate::name::NameError;
use crate::node::NodeType;

/// Failure of a node-store operation. Apart from [`DomError::Name`], these
/// indicate a bug in the calling editor logic: the operation aborts and the
/// document is left unchanged, never partially repaired.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("node {id} has type {actual:?}, expected {expected:?}")]
    UnexpectedType {
        id: NodeId,
        expected: NodeType,
        actual: NodeType,
    },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Expected, user-facing naming problem (syntax or uniqueness).
    #[error(transparent)]
    Name(#[from] NameError),
}
