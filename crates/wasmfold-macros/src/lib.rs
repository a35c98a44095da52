//! Procedural macros for wasmfold plugins.
//!
//! This crate provides the `#[plugin_export]` attribute that rewrites a plain
//! `fn name(Argument) -> Result` into the `_name(ptr, len) -> offset` export
//! the wasmfold host invokes, so plugin authors never touch raw memory.

extern crate proc_macro;

use proc_macro::TokenStream;

mod shim;

/// Marks a function as a plugin transformation exported across the wasm
/// boundary.
///
/// The function must be a free, non-async function taking exactly one
/// argument and returning a value; both types must be serde-serializable.
/// The attribute leaves the function itself untouched (it stays directly
/// callable from guest-side unit tests) and adds a second, exported function
/// named with a leading underscore that decodes the argument from linear
/// memory, calls the original, and publishes the encoded result through the
/// Length Slot.
///
/// Violating the one-argument shape is a compile error: the exported
/// signature carries exactly two integers for the argument and one for the
/// result, so no other arity can cross.
#[proc_macro_attribute]
pub fn plugin_export(attr: TokenStream, item: TokenStream) -> TokenStream {
    shim::expand(attr.into(), item.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
