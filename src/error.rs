use std::path::PathBuf;

use thiserror::Error;

/// Failure conditions of a bridge run.
///
/// Only `FileNotFound` aborts a run; the rest are collected per material and
/// surfaced through the batch report.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("interchange file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("record truncated while unwrapping a linked shader in material '{material}' (line {line})")]
    TruncatedRecord { material: String, line: usize },

    #[error("target node has no socket named '{socket}'")]
    MissingTargetSocket { socket: String },

    #[error("source asset missing on disk: {path}")]
    MissingSourceAsset { path: PathBuf },

    #[error("shader link nesting depth {depth} exceeds the serializer bound")]
    LinkDepthExceeded { depth: usize },
}
