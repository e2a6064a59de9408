//! Error types

/// Errors raised while setting up or solving a capacitance problem
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A conductor name was empty
    #[error("A conductor name must not be an empty string")]
    EmptyConductorName,
    /// A conductor name contained a reserved character
    #[error("'%' or ',' characters are not allowed in this conductor name: '{0}'")]
    InvalidConductorName(String),
    /// No conductor display name starts with the given fragment
    #[error("Cannot find conductor name starting with '{0}'")]
    ConductorNotFound(String),
    /// More than one conductor display name starts with the given fragment
    #[error("Cannot find unique conductor name starting with '{0}'")]
    ConductorNotUnique(String),
    /// A rename referred to a conductor that does not exist
    #[error("Unknown conductor name '{0}'")]
    UnknownConductor(String),
    /// Inconsistent problem setup
    #[error("Configuration Error: {0}")]
    Configuration(String),
    /// An iterative solve ran out of iterations
    #[error("Solve for conductor {column} ({name}) did not converge after {iterations} iterations")]
    NonConvergence {
        /// 1-based conductor number of the failing column
        column: usize,
        /// Display name of the conductor
        name: String,
        /// Number of iterations performed
        iterations: usize,
    },
    /// A dense factorisation failed
    #[error("Linear Algebra Error: {0}")]
    LinearAlgebra(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
