//! Error handling for the graver domain model.
//!
//! One error enum covers the whole geometry core. The taxonomy is small and
//! deliberate:
//! - invalid arguments are caught at the boundary and surfaced immediately
//! - infeasible geometry is a hard failure, never silently approximated
//! - out-of-range indexing is a hard failure
//!
//! Iterative numeric routines (Carlson, Newton) are explicitly NOT part of
//! this taxonomy: they return their best estimate on iteration-cap
//! exhaustion instead of failing.

use thiserror::Error;

/// Geometry core error type.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed input caught at the call boundary
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// A geometric construction has no solution
    #[error("Infeasible geometry: {reason}")]
    GeometryInfeasible {
        /// Why the construction cannot be satisfied.
        reason: String,
    },

    /// Index into a path or path group beyond bounds
    #[error("Index {index} out of range (length {len})")]
    OutOfRange {
        /// The offending index.
        index: usize,
        /// The length of the indexed collection.
        len: usize,
    },
}

impl Error {
    /// Shorthand for an `InvalidArgument` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `GeometryInfeasible` error.
    pub fn infeasible(reason: impl Into<String>) -> Self {
        Self::GeometryInfeasible {
            reason: reason.into(),
        }
    }
}

/// Result type alias for geometry core operations.
pub type Result<T> = std::result::Result<T, Error>;
