//! Guest-side support for wasmfold plugins.
//!
//! A plugin author writes an ordinary typed function and marks it with
//! [`plugin_export`]:
//!
//! ```
//! use wasmfold_guest::plugin_export;
//!
//! #[plugin_export]
//! pub fn double(s: String) -> String {
//!     s.repeat(2)
//! }
//! ```
//!
//! The attribute generates a `_double(ptr, len) -> offset` export; the
//! functions in this crate are the pieces that generated shim calls into.
//! `double` itself stays callable for unit tests that never cross the
//! boundary.

pub use wasmfold_codec::{CodecError, CodecResult, header};
pub use wasmfold_macros::plugin_export;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Reconstructs the argument bytes the host wrote into this module's linear
/// memory.
///
/// # Safety
///
/// `ptr` and `len` must describe the payload region the host just passed to
/// the exported shim, and the slice must not be read after the guest writes
/// to that region. Only meaningful inside a wasm guest, where `ptr` is an
/// offset into the module's own linear memory.
pub unsafe fn payload_view(ptr: i32, len: u32) -> &'static [u8] {
    if len == 0 {
        return &[];
    }
    unsafe { core::slice::from_raw_parts(ptr as usize as *const u8, len as usize) }
}

/// Decodes an argument from its boundary encoding.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    wasmfold_codec::decode(bytes)
}

/// Encodes a result into its boundary encoding.
pub fn encode_result<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    wasmfold_codec::encode(value)
}

/// Hands an encoded result over to the host.
///
/// Writes the result's byte length into the Length Slot with a raw memory
/// write, then leaks the buffer and returns its start offset. The leak is
/// the contract: the host reads the region after this call returns, so the
/// guest must not free or reuse it first. One buffer per call stays live;
/// there is no reclamation inside the guest.
pub fn publish(bytes: Vec<u8>) -> i32 {
    let len = bytes.len() as u32;
    let offset = bytes.as_ptr() as usize as i32;
    // The slot sits at offset 1 and is not 4-byte aligned.
    unsafe {
        core::ptr::write_unaligned(header::LEN_SLOT_OFFSET as *mut u32, len);
    }
    core::mem::forget(bytes);
    offset
}
