//! Engine error type.
//!
//! The engine treats almost everything as a per-item telemetry event, not an
//! error return. The single condition that fails the whole call is running
//! out of memory for the working buffers.

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Allocation of the sample/chunk buffers failed at scan start, or the
    /// chunk buffer could not grow to the size selected for a file.
    #[error("out of memory allocating scan buffers")]
    OutOfMemory(#[from] TryReserveError),
}
