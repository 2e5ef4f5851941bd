use thiserror::Error;

use abibridge_core::SchemaError;

#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Wrong number (or wrong set, for object params) of call arguments.
    #[error("wrong arguments for action `{action}`: expected {expected}, got {actual}")]
    Arity {
        action: String,
        expected: String,
        actual: String,
    },

    /// A wire value outside what its ABI type allows. Signals that the schema
    /// and the deployed contract have drifted apart.
    #[error("invalid value for `{field}`: expected {expected}, got {found}")]
    Domain {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("no {kind} named `{name}` in the contract ABI")]
    Reference { kind: &'static str, name: String },

    /// `tag` is the discriminant as received: an index or a branch type name.
    #[error("variant `{variant}` has {branches} branch(es), none matches discriminant {tag}")]
    Discriminant {
        variant: String,
        tag: String,
        branches: usize,
    },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl RuntimeError {
    pub(crate) fn domain(field: impl Into<String>, expected: &'static str, found: &serde_json::Value) -> Self {
        RuntimeError::Domain {
            field: field.into(),
            expected,
            found: found.to_string(),
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
