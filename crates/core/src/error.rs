use thiserror::Error;

use crate::{ClassId, InstanceId, LinkId, VariableId};

/// Errors raised by the model registry and the instance store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("unknown {0}")]
    UnknownClass(ClassId),

    #[error("unknown {0}")]
    UnknownVariable(VariableId),

    #[error("unknown {0}")]
    UnknownLink(LinkId),

    #[error("unknown {0}")]
    UnknownInstance(InstanceId),

    #[error("process `{process}` targets {variable}, which is not owned by {class}")]
    ForeignTarget {
        process: String,
        variable: VariableId,
        class: ClassId,
    },

    #[error("process `{process}` uses {link}, which does not connect {from} to {to}")]
    MismatchedLink {
        process: String,
        link: LinkId,
        from: ClassId,
        to: ClassId,
    },

    #[error("{0} belongs to a process taxon and cannot be deactivated")]
    TaxonDeactivation(InstanceId),

    #[error("expected {expected} values but got {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// A failure reported by user model code.
    #[error("{0}")]
    Custom(String),
}

impl ModelError {
    /// Creates a [`ModelError::Custom`] from any displayable message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}
