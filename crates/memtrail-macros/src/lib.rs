use proc_macro::TokenStream;

#[cfg(not(feature = "memtrail-off"))]
use quote::quote;
#[cfg(not(feature = "memtrail-off"))]
use syn::parse::Parser;
#[cfg(not(feature = "memtrail-off"))]
use syn::{parse_macro_input, ItemFn, LitStr};

/// Installs the allocation-tracking lifecycle guard around the annotated
/// entry point.
///
/// The guard initializes tracking when the function is entered and, in
/// automatic mode, prints the leak report and destroys the ledger when the
/// function returns - on every exit path, including propagated errors.
///
/// # Parameters
///
/// * `mode` - `"automatic"` (default) or `"manual"`. In manual mode nothing
///   happens at exit; call `memtrail::report()` and `memtrail::teardown()`
///   explicitly.
///
/// # Examples
///
/// ```rust,no_run
/// #[memtrail::main]
/// fn main() {
///     // Tracked allocations here; report prints on return.
/// }
/// ```
///
/// Manual mode:
///
/// ```rust,no_run
/// #[memtrail::main(mode = "manual")]
/// fn main() {
///     memtrail::report();
///     memtrail::teardown();
/// }
/// ```
///
/// Async entry points pass through unchanged; place `#[tokio::main]` (or
/// equivalent) above this attribute.
#[cfg(not(feature = "memtrail-off"))]
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let mut mode = quote!(memtrail::Mode::Automatic);

    // Parse named args like: mode=".."
    if !attr.is_empty() {
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("mode") {
                meta.input.parse::<syn::Token![=]>()?;
                let lit: LitStr = meta.input.parse()?;
                mode = match lit.value().as_str() {
                    "automatic" => quote!(memtrail::Mode::Automatic),
                    "manual" => quote!(memtrail::Mode::Manual),
                    other => {
                        return Err(meta.error(format!(
                            "Unknown mode {:?}. Expected \"automatic\" or \"manual\"",
                            other
                        )))
                    }
                };
                return Ok(());
            }

            Err(meta.error("Unknown parameter. Supported: mode=\"automatic\"|\"manual\""))
        });

        if let Err(e) = parser.parse2(proc_macro2::TokenStream::from(attr)) {
            return e.to_compile_error().into();
        }
    }

    let guard_init = quote! {
        let _memtrail = memtrail::GuardBuilder::new().mode(#mode).build();
    };

    let body = quote! {
        #guard_init
        #block
    };

    let wrapped_body = if sig.asyncness.is_some() {
        quote! { async { #body }.await }
    } else {
        body
    };

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #wrapped_body
        }
    };

    output.into()
}

/// With the `memtrail-off` feature the attribute leaves the entry point
/// untouched.
#[cfg(feature = "memtrail-off")]
#[proc_macro_attribute]
pub fn main(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}
