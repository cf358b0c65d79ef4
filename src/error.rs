//! Error types for MODO operations.

use thiserror::Error;

/// Result type alias using MODO Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during MODO operations.
///
/// All variants represent configuration errors detected at construction
/// time. The element kernels themselves perform no recovery: slice-length
/// misuse is a programming error and panics, while numerical degeneracy
/// (a non-positive Jacobian determinant) is a correctness precondition on
/// the caller's mesh and is not detected here.
#[derive(Error, Debug)]
pub enum Error {
    /// Element configuration errors (invalid order/node-count combinations).
    #[error("element error: {0}")]
    Element(String),

    /// Invalid section or material properties.
    #[error("invalid section: {0}")]
    InvalidSection(String),

    /// Design-variable bookkeeping errors.
    #[error("design variable error: {0}")]
    DesignVariable(String),
}
