use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Error, Fields};

/// Derives the byte conversions for a fieldless `#[repr(u8)]` enum whose variants carry
/// explicit discriminants matching the codes stored in a PVR header.
///
/// Generates `From<Enum> for u8` and `TryFrom<u8> for Enum`. The error type of the latter is
/// the unrecognized byte itself, so that callers can still report the raw code.
#[proc_macro_derive(FormatCode)]
pub fn derive_format_code(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data) = &input.data else {
        return Error::new_spanned(name, "FormatCode can only be derived for enums")
            .to_compile_error()
            .into();
    };

    let mut arms = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Error::new_spanned(variant, "FormatCode variants cannot carry data")
                .to_compile_error()
                .into();
        }
        if variant.discriminant.is_none() {
            return Error::new_spanned(variant, "FormatCode variants need an explicit code")
                .to_compile_error()
                .into();
        }

        let ident = &variant.ident;
        arms.push(quote! {
            code if code == #name::#ident as u8 => Ok(#name::#ident),
        });
    }

    let expanded = quote! {
        impl From<#name> for u8 {
            fn from(value: #name) -> Self {
                value as u8
            }
        }

        impl TryFrom<u8> for #name {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    #(#arms)*
                    code => Err(code),
                }
            }
        }
    };

    TokenStream::from(expanded)
}
