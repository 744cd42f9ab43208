//! Error kinds raised by scene setup and by the realisation loop.
//!
//! See spec.md §7. These are kinds, not a type hierarchy: every fallible
//! entry point in this crate returns `Result<T, SolveError>`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    /// Caller violated a contract: null input, out-of-range index,
    /// inconsistent sizes, unknown variant tag, non-positive focal length,
    /// negative extinction, non-positive refractive index, non-monotone
    /// spectrum wavelengths, mismatched sun/atmosphere spectral ranges.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Allocation failure. Setup unwinds and returns this to the caller.
    #[error("allocation failed: {0}")]
    MemoryError(String),

    /// Operational inconsistency: medium mismatch at a dielectric boundary,
    /// an empty sampling scene, attaching a resource already attached
    /// elsewhere.
    #[error("bad operation: {0}")]
    BadOperation(String),

    /// A downstream sink (receiver hit log, image tile writer) failed.
    #[error("sink write failed: {0}")]
    IoError(String),

    /// Internal invariant violation. Always fatal.
    #[error("unreachable: {0}")]
    Unreachable(String),
}

pub type Result<T> = std::result::Result<T, SolveError>;
