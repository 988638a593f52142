// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Labelpress.

use thiserror::Error;

use crate::types::ErrorClass;

/// Top-level error type for all Labelpress operations.
#[derive(Debug, Error)]
pub enum LabelpressError {
    // -- Remote source errors --
    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("remote returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // -- Per-item validation --
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("invalid base64 for {name}: {reason}")]
    InvalidPayload { name: String, reason: String },

    #[error("filename is empty")]
    EmptyName,

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Persistence --
    #[error("verification failed for {path}: expected {expected} bytes, found {actual}")]
    VerificationFailed {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("no destination folder configured")]
    NoDestination,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Dispatch --
    #[error("no printer selected")]
    NoPrinterSelected,

    #[error("print strategy '{strategy}' failed: {reason}")]
    PrintStrategy { strategy: String, reason: String },

    #[error("all print strategies failed for '{device}': {detail}")]
    DispatchFailed { device: String, detail: String },

    // -- Startup --
    #[error("ledger unavailable: {0}")]
    Ledger(String),

    #[error("event log unavailable: {0}")]
    EventLog(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LabelpressError {
    /// Map this error onto the pipeline's failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::HttpStatus { .. } => {
                ErrorClass::Transport
            }
            Self::MalformedResponse(_) | Self::Serialization(_) => ErrorClass::MalformedResponse,
            Self::InvalidEntry(_)
            | Self::InvalidPayload { .. }
            | Self::EmptyName
            | Self::PdfError(_)
            | Self::ImageError(_) => ErrorClass::Validation,
            Self::VerificationFailed { .. } | Self::NoDestination | Self::Io(_) => {
                ErrorClass::Persistence
            }
            Self::NoPrinterSelected | Self::PrintStrategy { .. } | Self::DispatchFailed { .. } => {
                ErrorClass::Dispatch
            }
            Self::Ledger(_) | Self::EventLog(_) | Self::Config(_) => ErrorClass::Fatal,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LabelpressError>;
