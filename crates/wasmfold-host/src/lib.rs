//! Wasmfold host runtime.
//!
//! Drives the host-to-guest plugin invocation protocol: structured values
//! cross the wasm boundary even though exported function signatures carry
//! only integers. The convention, fixed on both sides:
//!
//! - byte 0 of guest memory is reserved; bytes 1..=4 are the Length Slot
//!   (u32, native endian); the payload region starts at byte 5
//! - the host zeroes the Length Slot, writes the encoded argument at
//!   offset 5, and calls `_name(5, encoded_len)`
//! - the guest decodes, transforms, encodes, writes the result length into
//!   the Length Slot, and returns the result's start offset
//! - the host re-acquires a fresh memory view, reads the Length Slot and
//!   the result bytes from it, and decodes
//!
//! One logical caller per instance; every call is a blocking round trip.
//! See `wasmfold-codec` for the encoding and `wasmfold-guest` +
//! `#[plugin_export]` for the generated guest half.

mod error;
mod instance;
mod memory;
mod pipeline;
mod runtime;

pub use error::{HostError, HostResult};
pub use instance::{PluginInstance, PluginMetrics};
pub use memory::MemoryView;
pub use pipeline::{
    DEFAULT_EXPORT, ErrorPolicy, ManifestEntry, PluginPipeline, WASM_EXTENSION, apply_plugins,
    scan_plugin_dir,
};
pub use runtime::{MemoryLimits, PluginModule, RuntimeConfig, WasmRuntime};

pub use wasmfold_codec as codec;
