//! Procedural macros for the mirai client.
//!
//! This crate provides:
//!
//! - `#[derive(VariantWrapper)]` - Turns a closed enum of single-payload
//!   variants into a typed tagged union (kind enum, typed access, exhaustive
//!   visitor and optionally the tagged JSON codec)
//!
//! # VariantWrapper Derive Macro
//!
//! ```rust,ignore
//! use mirai_core::VariantWrapper;
//!
//! #[derive(Debug, Clone, PartialEq, VariantWrapper)]
//! #[variant(kind = "SegmentKind", wire)]
//! pub enum Segment {
//!     At(At),
//!     #[variant(tag = "AtAll")]
//!     AtAll(AtAll),
//!     Plain(Plain),
//! }
//! ```

mod variant;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives the variant-wrapper machinery for an enum.
///
/// Every variant must be a one-field tuple variant and every payload type
/// must be distinct, since the payload type is what selects the variant in
/// `get::<P>()`, `get_if::<P>()` and `dispatch::<P>(..)`.
///
/// This generates:
/// - a fieldless kind enum with `ALL`, `as_str()` and `from_tag()`
/// - `impl VariantWrapper` with `kind()`
/// - `From<Payload>` and `impl Payload<Wrapper>` for every payload type
/// - a visitor trait with one required method per variant, plus `apply()`
/// - with `wire`: `impl TaggedWire`, the `{"type": tag, ..fields}` codec
///
/// # Attributes
///
/// - `#[variant(kind = "...")]` - Name of the kind enum (default: `{Name}Kind`)
/// - `#[variant(visitor = "...")]` - Name of the visitor trait (default: `{Name}Visitor`)
/// - `#[variant(wire)]` - Also generate the tagged JSON codec
/// - `#[variant(tag = "...")]` *(on a variant)* - Wire tag (default: the variant name)
#[proc_macro_derive(VariantWrapper, attributes(variant))]
pub fn derive_variant_wrapper(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match variant::derive_variant_wrapper(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
