//! mediacheck Core — the read-integrity scan engine.
//!
//! This crate contains the whole diagnostic engine with zero frontend
//! dependencies: it walks a directory tree, reads file contents under a
//! configurable policy, and produces a structured account of I/O health.
//! Rendering, input handling, and persistence belong to the frontends.
//!
//! # Modules
//!
//! - [`policy`] — Read-only scan policy, presets, and tuning heuristics.
//! - [`stats`] — Telemetry aggregate with fixed-capacity lists.
//! - [`engine`] — Cooperative recursive traversal and the `scan` entry point.
//! - [`filters`] — Directory/file skip predicates.
//! - [`checksum`] — Rolling CRC-32 used for consistency verification.
//! - [`report`] — Verdict and advisory text derived from final stats.
//! - [`format`] — Human-readable sizes, counts, and durations.
pub mod checksum;
pub mod engine;
pub mod error;
pub mod filters;
pub mod format;
pub mod policy;
pub mod report;
pub mod stats;

mod buffers;
mod read;

pub use engine::{scan, CancelToken};
pub use error::ScanError;
pub use policy::{ChunkMode, Preset, ScanPolicy, ScanTarget, Tuning, SAMPLE_REGION};
pub use report::{next_steps, Verdict};
pub use stats::{FailKind, ScanStats};
