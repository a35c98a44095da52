//! Host-side errors.
//!
//! Every failure kind the protocol can produce is recovered at the call
//! boundary and surfaced to the immediate caller with context; nothing is
//! swallowed and nothing is retried inside the core.

use std::path::PathBuf;
use thiserror::Error;
use wasmfold_codec::CodecError;

/// Host runtime errors.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to compile module {module}: {reason}")]
    Compile { module: String, reason: String },

    #[error("failed to instantiate module {module}: {reason}")]
    Instantiation { module: String, reason: String },

    #[error("module {module} does not export a linear memory named \"memory\"")]
    MissingMemory { module: String },

    #[error(
        "module {module}: export {export} is missing or is not (i32, u32) -> i32: {reason}"
    )]
    ExportShape {
        module: String,
        export: String,
        reason: String,
    },

    #[error(
        "module {module}: encoded argument needs {needed} bytes but guest memory holds {available}"
    )]
    Capacity {
        module: String,
        needed: usize,
        available: usize,
    },

    #[error("module {module}: argument for {export} could not be encoded: {source}")]
    EncodeArgument {
        module: String,
        export: String,
        #[source]
        source: CodecError,
    },

    #[error("module {module}: result of {export} did not decode: {source}")]
    DecodeResult {
        module: String,
        export: String,
        #[source]
        source: CodecError,
    },

    #[error("module {module}: call to {export} trapped: {reason}")]
    Trap {
        module: String,
        export: String,
        reason: String,
    },

    #[error("memory access out of bounds: offset={offset}, len={len}, memory size={size}")]
    MemoryOutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Host result type.
pub type HostResult<T> = Result<T, HostError>;
