//! Reusable read buffers, allocated once per scan.
//!
//! Two buffers back all file reads: a fixed 64 KiB sample buffer and a chunk
//! buffer that grows on demand (never shrinks) to the chunk size selected for
//! each file. Allocation is fallible: on constrained hardware an allocation
//! failure must abort the scan cleanly instead of aborting the process, so
//! growth goes through `try_reserve_exact`.

use crate::error::ScanError;
use crate::policy::SAMPLE_REGION;

/// Initial chunk buffer capacity; covers every auto-selected chunk size.
const INITIAL_CHUNK: usize = 1024 * 1024;

pub struct ScanBuffers {
    sample: Vec<u8>,
    chunk: Vec<u8>,
}

fn alloc_zeroed(len: usize) -> Result<Vec<u8>, ScanError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, 0);
    Ok(v)
}

impl ScanBuffers {
    pub fn new() -> Result<Self, ScanError> {
        Ok(Self {
            sample: alloc_zeroed(SAMPLE_REGION)?,
            chunk: alloc_zeroed(INITIAL_CHUNK)?,
        })
    }

    /// The fixed-size sample buffer.
    pub fn sample_mut(&mut self) -> &mut [u8] {
        &mut self.sample
    }

    /// Grow the chunk buffer to at least `need` bytes and return it.
    pub fn chunk_mut(&mut self, need: usize) -> Result<&mut [u8], ScanError> {
        if need > self.chunk.len() {
            self.chunk.try_reserve_exact(need - self.chunk.len())?;
            self.chunk.resize(need, 0);
        }
        Ok(&mut self.chunk)
    }
}
