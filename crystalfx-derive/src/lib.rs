//! Derive macros for crystalfx.
//!
//! This crate provides one derive macro:
//!
//! - [`Tunables`] - Exposes struct fields as debug tunables
//!
//! # Usage
//!
//! The macro is re-exported from the main `crystalfx` crate. You don't need
//! to add this crate directly:
//!
//! ```ignore
//! use crystalfx::prelude::*;
//!
//! #[derive(Tunables)]
//! struct FlowTuning {
//!     #[tune(label = "uSpeed", min = 0.001, max = 1.0, step = 0.001)]
//!     speed: f32,
//!     #[tune(label = "Color")]
//!     color: Color,
//!     // No #[tune]: not exposed.
//!     seed: f32,
//! }
//! ```
//!
//! # Generated Items
//!
//! `impl crystalfx::debug::Tunables` with:
//!
//! - `tunables()` - One entry per `#[tune]` field, in declaration order, keyed
//!   by the field name
//! - `set_tunable(key, value)` - Converts through `TunableField`, clamps numeric
//!   values to `min`/`max`, and rejects unknown keys or mismatched types
//!
//! # Attribute Keys
//!
//! - `label = "..."` - Display name (defaults to the field name)
//! - `min = <expr>`, `max = <expr>` - Range, applied on write
//! - `step = <expr>` - Slider step hint

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Expr, Fields, LitStr};

/// Parsed `#[tune(...)]` arguments.
#[derive(Default)]
struct TuneArgs {
    label: Option<LitStr>,
    min: Option<Expr>,
    max: Option<Expr>,
    step: Option<Expr>,
}

fn parse_tune_args(attr: &syn::Attribute) -> syn::Result<TuneArgs> {
    let mut args = TuneArgs::default();
    // Bare `#[tune]` is allowed.
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(args);
    }
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("label") {
            args.label = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("min") {
            args.min = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("max") {
            args.max = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("step") {
            args.step = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("expected `label`, `min`, `max` or `step`"));
        }
        Ok(())
    })?;
    Ok(args)
}

fn option_f32(expr: &Option<Expr>) -> proc_macro2::TokenStream {
    match expr {
        Some(e) => quote! { ::core::option::Option::Some((#e) as f32) },
        None => quote! { ::core::option::Option::None },
    }
}

/// Derive macro for debug tunables.
///
/// Only fields marked `#[tune]` or `#[tune(...)]` are exposed. Their types
/// must implement `crystalfx::debug::TunableField` (`f32`, `Color`, `bool`).
///
/// # Example
///
/// ```ignore
/// #[derive(Tunables)]
/// struct CrystalOptions {
///     #[tune(label = "Hover Amplitude", min = 0.001, max = 0.4)]
///     hover_amplitude: f32,
/// }
///
/// let mut options = CrystalOptions { hover_amplitude: 0.1 };
/// options.set_tunable("hover_amplitude", TunableValue::Float(1.0))?;
/// assert_eq!(options.hover_amplitude, 0.4);
/// ```
///
/// # Panics
///
/// The macro panics at compile time if:
/// - Applied to an enum or a tuple struct
#[proc_macro_derive(Tunables, attributes(tune))]
pub fn derive_tunables(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("Tunables derive only supports structs with named fields"),
        },
        _ => panic!("Tunables derive only supports structs"),
    };

    let mut entries = Vec::new();
    let mut setters = Vec::new();

    for field in fields.iter() {
        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("tune")) else {
            continue;
        };
        let args = match parse_tune_args(attr) {
            Ok(args) => args,
            Err(err) => return err.to_compile_error().into(),
        };

        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let key = field_name.to_string();
        let label = args
            .label
            .map(|l| l.value())
            .unwrap_or_else(|| key.clone());
        let ty = &field.ty;
        let min = option_f32(&args.min);
        let max = option_f32(&args.max);
        let step = option_f32(&args.step);

        entries.push(quote! {
            ::crystalfx::debug::Tunable {
                key: #key,
                label: #label,
                value: ::crystalfx::debug::TunableField::to_tunable_value(&self.#field_name),
                min: #min,
                max: #max,
                step: #step,
            }
        });

        setters.push(quote! {
            #key => {
                let v = <#ty as ::crystalfx::debug::TunableField>::from_tunable_value(value)
                    .ok_or_else(|| ::crystalfx::error::TuneError::TypeMismatch(key.to_string()))?;
                self.#field_name = ::crystalfx::debug::TunableField::clamp_to(v, #min, #max);
                ::core::result::Result::Ok(())
            }
        });
    }

    let expanded = quote! {
        impl #impl_generics ::crystalfx::debug::Tunables for #name #ty_generics #where_clause {
            fn tunables(&self) -> ::std::vec::Vec<::crystalfx::debug::Tunable> {
                ::std::vec![
                    #(#entries),*
                ]
            }

            fn set_tunable(
                &mut self,
                key: &str,
                value: ::crystalfx::debug::TunableValue,
            ) -> ::core::result::Result<(), ::crystalfx::error::TuneError> {
                match key {
                    #(#setters)*
                    _ => ::core::result::Result::Err(
                        ::crystalfx::error::TuneError::UnknownKey(key.to_string()),
                    ),
                }
            }
        }
    };

    TokenStream::from(expanded)
}
