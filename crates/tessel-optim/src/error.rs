//! Errors reported by the substitution passes.

use derive_more::{Display, Error};

pub type OptimResult<T> = Result<T, OptimError>;

/// Contract violations detected before a pass touches the tree.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
pub enum OptimError {
    /// A load or store names a tensor the registry does not know.
    #[display("tensor `{name}` is not in the tensor registry")]
    UnknownTensor { name: String },

    /// A load or store whose tensor slot is not a tensor reference.
    #[display("{access} does not address a tensor (found `{found}`)")]
    MissingTensor {
        access: &'static str,
        found: &'static str,
    },

    #[display("expected a `for` or `poly_for` root, found `{found}`")]
    NotALoop { found: &'static str },
}
