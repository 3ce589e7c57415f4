//! Error types for the transport pipeline
//!
//! Failures are fatal for the whole batch: the computation is deterministic,
//! so a malformed input reproduces the identical failure on retry and there
//! is no partial output to salvage. Numerical degeneracy in the correction
//! wind is deliberately not an error; it is counted and logged (see the
//! budget diagnostics) because clamping or aborting would hide a physically
//! meaningful budget failure.

/// Errors that abort a batch computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A snapshot or derived field disagrees with the declared grid/level dimensions
    ShapeMismatch {
        /// Which array failed validation (e.g. "temperature", "surface pressure")
        context: &'static str,
        /// Expected element count
        expected: usize,
        /// Element count actually supplied
        actual: usize,
    },
    /// Fewer than two time steps supplied; tendencies need distinct endpoints
    InsufficientBatch {
        /// Number of steps that were supplied
        steps: usize,
    },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::ShapeMismatch {
                context,
                expected,
                actual,
            } => write!(
                f,
                "Shape mismatch in {context}: expected {expected} elements, got {actual}"
            ),
            TransportError::InsufficientBatch { steps } => write!(
                f,
                "Batch has {steps} step(s); at least 2 are required for tendency terms"
            ),
        }
    }
}

impl std::error::Error for TransportError {}
