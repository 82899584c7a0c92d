//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::address::Address;
use crate::domain::arena::ConstructKind;

/// Domain errors represent violations of the construct-tree contract.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("duplicate name '{name}' in scope {scope}")]
    DuplicateName { scope: Address, name: String },

    #[error("key collision at {address}: '{key}' is both a data key and a child entry")]
    KeyCollision { address: Address, key: String },

    #[error("cannot encode value at {pointer} (node {address}): {reason}")]
    Encoding {
        address: Address,
        pointer: String,
        reason: String,
    },

    #[error("cannot add a {child} under {parent} ({parent_kind})")]
    InvalidParent {
        parent: Address,
        parent_kind: ConstructKind,
        child: ConstructKind,
    },

    #[error("node handle does not belong to this app")]
    UnknownNode,

    #[error("app is finalized: no constructs can be added after synthesis")]
    Finalized,

    #[error("unsupported value at {pointer}: {reason}")]
    UnsupportedValue { pointer: String, reason: String },

    #[error("duplicate artifact '{name}': produced by {first} and {second}")]
    DuplicateArtifact {
        name: String,
        first: Address,
        second: Address,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
