// Error types
//
// Two kinds of failure exist here. Marker classification errors mean the
// host renderer broke the sentinel contract, and there is no safe way to keep
// going. Everything else (config, loading the dispatch table, building layers)
// is ordinary setup failure and travels as anyhow::Error.

use std::fmt;
use thiserror::Error;

/// A recognized marker carried a payload outside the contract
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MarkerError {
    #[error("invalid capture index {0} (expected 0 or 2)")]
    InvalidCaptureIndex(i64),
    #[error("invalid capture index payload {0}")]
    NonFiniteCaptureIndex(f32),
    #[error("invalid frame index {0} for depth clear (expected 0 or 1)")]
    InvalidFrameIndex(u32),
}

/// Abort on a broken host contract.
///
/// Release builds use `panic = "abort"`, so this takes the whole process down
/// instead of letting the host keep rendering into corrupted state.
#[track_caller]
pub fn protocol_violation(what: impl fmt::Display) -> ! {
    log::error!("Protocol violation: {}", what);
    panic!("protocol violation: {}", what);
}
