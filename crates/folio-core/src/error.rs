// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Pipeline errors --
    /// No images to assemble, or a source document with zero pages.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Source document unreadable or corrupt.
    #[error("failed to open document: {0}")]
    OpenFailure(String),

    /// A page could not be rendered or its raster/byte encoding failed.
    #[error("encoding failed: {0}")]
    EncodeFailure(String),

    /// Destination not writable or the destination path cannot be built.
    #[error("write failed: {0}")]
    WriteFailure(String),

    // -- Collaborators --
    #[error("access to {0} was not granted")]
    PermissionDenied(String),

    #[error("asset source error: {0}")]
    Bridge(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FolioError {
    /// Whether this error ends the whole operation rather than one unit of it.
    ///
    /// `OpenFailure` and `EncodeFailure` only ever abort a single document or
    /// page; everything else is reported to the caller as a failed operation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::OpenFailure(_) | Self::EncodeFailure(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
