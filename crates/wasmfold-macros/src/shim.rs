//! Shim construction, split into a parse half and an emit half.
//!
//! The parse half checks the boundary preconditions and reduces the wrapped
//! function to an [`ExportShim`] value; the emit half renders that value into
//! Rust tokens. Keeping the IR free of output syntax keeps the preconditions
//! unit-testable and the emitter swappable.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, FnArg, Ident, Item, ItemFn, Result, ReturnType};

/// Everything the emitter needs to render one export: the untouched original
/// function and the name of the exported symbol that shadows it.
#[derive(Debug)]
pub(crate) struct ExportShim {
    func: ItemFn,
    shim_ident: Ident,
}

impl ExportShim {
    #[cfg(test)]
    fn shim_name(&self) -> String {
        self.shim_ident.to_string()
    }
}

pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> Result<TokenStream> {
    if !attr.is_empty() {
        return Err(Error::new_spanned(attr, "plugin_export takes no arguments"));
    }
    let func = match syn::parse2::<Item>(item)? {
        Item::Fn(func) => func,
        other => {
            return Err(Error::new_spanned(
                other,
                "plugin_export can only be applied to functions",
            ));
        }
    };
    parse_shim(func).map(emit)
}

/// Validates the wrapped function against the boundary preconditions and
/// builds the shim IR.
pub(crate) fn parse_shim(func: ItemFn) -> Result<ExportShim> {
    if let Some(receiver) = func
        .sig
        .inputs
        .iter()
        .find(|arg| matches!(arg, FnArg::Receiver(_)))
    {
        return Err(Error::new_spanned(
            receiver,
            "plugin_export functions cannot take self; only free functions can be exported",
        ));
    }
    if func.sig.inputs.len() != 1 {
        return Err(Error::new_spanned(
            &func.sig,
            format!(
                "plugin_export functions must take exactly 1 argument, this one takes {}",
                func.sig.inputs.len()
            ),
        ));
    }
    if matches!(func.sig.output, ReturnType::Default) {
        return Err(Error::new_spanned(
            &func.sig,
            "plugin_export functions must return a value",
        ));
    }
    if let Some(asyncness) = &func.sig.asyncness {
        return Err(Error::new_spanned(
            asyncness,
            "plugin_export functions cannot be async; boundary calls are synchronous",
        ));
    }

    let shim_ident = Ident::new(&format!("_{}", func.sig.ident), func.sig.ident.span());
    Ok(ExportShim { func, shim_ident })
}

/// Renders the IR: the original function verbatim, then the exported shim.
///
/// The shim body stays minimal; the raw-memory steps live behind helpers in
/// `wasmfold-guest`. Decode and encode failures have no return channel, so
/// they panic, which surfaces to the host as a call trap.
pub(crate) fn emit(shim: ExportShim) -> TokenStream {
    let ExportShim { func, shim_ident } = shim;
    let ident = &func.sig.ident;

    quote! {
        #func

        #[unsafe(no_mangle)]
        pub extern "C" fn #shim_ident(ptr: i32, len: u32) -> i32 {
            let payload = unsafe { ::wasmfold_guest::payload_view(ptr, len) };
            let argument = match ::wasmfold_guest::decode_payload(payload) {
                Ok(argument) => argument,
                Err(err) => panic!(
                    "{}: malformed argument payload: {}",
                    stringify!(#shim_ident),
                    err
                ),
            };
            let result = #ident(argument);
            let encoded = match ::wasmfold_guest::encode_result(&result) {
                Ok(encoded) => encoded,
                Err(err) => panic!(
                    "{}: result could not be encoded: {}",
                    stringify!(#shim_ident),
                    err
                ),
            };
            ::wasmfold_guest::publish(encoded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn single_argument_function_is_accepted() {
        let func: ItemFn = parse_quote! {
            pub fn double(s: String) -> String {
                s.repeat(2)
            }
        };
        let shim = parse_shim(func).unwrap();
        assert_eq!(shim.shim_name(), "_double");
    }

    #[test]
    fn zero_arguments_fail_at_generation_time() {
        let func: ItemFn = parse_quote! {
            fn nothing() -> u32 { 0 }
        };
        let err = parse_shim(func).unwrap_err();
        assert!(err.to_string().contains("exactly 1 argument"), "{err}");
    }

    #[test]
    fn two_arguments_fail_at_generation_time() {
        let func: ItemFn = parse_quote! {
            fn add(a: u32, b: u32) -> u32 { a + b }
        };
        let err = parse_shim(func).unwrap_err();
        assert!(err.to_string().contains("this one takes 2"), "{err}");
    }

    #[test]
    fn receiver_is_rejected() {
        let func: ItemFn = parse_quote! {
            fn method(&self) -> u32 { 0 }
        };
        let err = parse_shim(func).unwrap_err();
        assert!(err.to_string().contains("cannot take self"), "{err}");
    }

    #[test]
    fn missing_return_type_is_rejected() {
        let func: ItemFn = parse_quote! {
            fn sink(s: String) {}
        };
        let err = parse_shim(func).unwrap_err();
        assert!(err.to_string().contains("must return a value"), "{err}");
    }

    #[test]
    fn async_function_is_rejected() {
        let func: ItemFn = parse_quote! {
            async fn later(s: String) -> String { s }
        };
        let err = parse_shim(func).unwrap_err();
        assert!(err.to_string().contains("cannot be async"), "{err}");
    }

    #[test]
    fn non_function_items_are_rejected() {
        let err = expand(TokenStream::new(), quote! { struct NotAFn; }).unwrap_err();
        assert!(err.to_string().contains("only be applied to functions"), "{err}");
    }

    #[test]
    fn emitted_tokens_keep_original_and_add_export() {
        let func: ItemFn = parse_quote! {
            pub fn double(s: String) -> String { s.repeat(2) }
        };
        let tokens = emit(parse_shim(func).unwrap()).to_string();
        assert!(tokens.contains("pub fn double"), "{tokens}");
        assert!(tokens.contains("fn _double"), "{tokens}");
        assert!(tokens.contains("no_mangle"), "{tokens}");
        assert!(tokens.contains("publish"), "{tokens}");
    }
}
