//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`Error`] covers all failure modes including:
//! - Clip loading and decoding errors
//! - Blend input validation and unsupported value types
//! - Cache corruption and disposed clips
//! - Splice configuration errors
//!
//! Target resolution failures are intentionally *not* fatal: the retargeter
//! drops the affected curve and logs a warning. [`Error::Resolution`] exists
//! for hosts that want to surface unresolved names as diagnostics.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, Error>`.
//!
//! ```rust,ignore
//! use signmix::errors::{Error, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::animation::values::ValueType;

/// The main error type for signmix.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Loading Errors
    // ========================================================================
    /// A source file was missing, unparseable, or contained no clips.
    #[error("Failed to load '{path}': {reason}")]
    LoadFailure {
        /// Directory + filename of the source
        path: String,
        /// Human-readable cause
        reason: String,
    },

    /// glTF parsing error.
    #[error("glTF error: {0}")]
    Gltf(String),

    /// Data URI parsing error.
    #[error("Data URI error: {0}")]
    DataUri(String),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    // ========================================================================
    // Retargeting Errors
    // ========================================================================
    /// A track name matched nothing on the target character.
    #[error("Target '{0}' could not be resolved on the character")]
    Resolution(String),

    // ========================================================================
    // Blending Errors
    // ========================================================================
    /// The value type cannot be blended.
    #[error("Blending is not supported for value type {0:?}")]
    BlendTypeUnsupported(ValueType),

    /// Curves of one (target, property) group carry different value types.
    #[error("Cannot blend curves of different value types: {0:?} and {1:?}")]
    MixedValueTypes(ValueType, ValueType),

    /// None of the curves passed to the blender had any keyframe.
    #[error("No keyframes found in any blend input")]
    EmptyBlend,

    /// Blend input was rejected before any work was done.
    #[error("Invalid blend input: {0}")]
    InvalidBlendInput(String),

    // ========================================================================
    // Clip & Cache Errors
    // ========================================================================
    /// A cached master clip failed validation.
    #[error("Cache entry '{0}' is corrupted")]
    CacheCorruption(String),

    /// The clip was disposed and can no longer be used.
    #[error("Clip '{0}' has been disposed")]
    ClipDisposed(String),

    /// Keyframe data violates the curve invariants.
    #[error("Invalid keyframes: {0}")]
    InvalidKeyframes(String),

    // ========================================================================
    // Playback Errors
    // ========================================================================
    /// Splice parameters were rejected.
    #[error("Invalid splice configuration: {0}")]
    SpliceConfigInvalid(String),

    // ========================================================================
    // I/O & Format Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<gltf::Error> for Error {
    fn from(err: gltf::Error) -> Self {
        Error::Gltf(err.to_string())
    }
}

impl Error {
    /// Wraps any error as a [`Error::LoadFailure`] for the given source path.
    pub(crate) fn load_failure(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::LoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
