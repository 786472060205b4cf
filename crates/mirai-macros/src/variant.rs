//! `#[derive(VariantWrapper)]` implementation.
//!
//! # Overview
//!
//! The derive targets a closed enum whose variants each wrap one payload
//! type. Given
//!
//! ```rust,ignore
//! #[derive(VariantWrapper)]
//! #[variant(kind = "SegmentKind", wire)]
//! pub enum Segment {
//!     At(At),
//!     Plain(Plain),
//! }
//! ```
//!
//! it generates:
//!
//! 1. `enum SegmentKind { At, Plain }` with `ALL`, `as_str()`, `from_tag()`
//! 2. `impl VariantWrapper for Segment` (the `kind()` discriminant)
//! 3. `impl From<At> for Segment` and `impl Payload<Segment> for At`, per variant
//! 4. `trait SegmentVisitor { type Output; fn visit_at(..); fn visit_plain(..); }`
//!    and `Segment::apply(&mut visitor)`
//! 5. with `wire`, `impl TaggedWire for Segment`
//!
//! # Enum-level attributes `#[variant(...)]`
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `kind` | `"SegmentKind"` | No | Name of the generated kind enum |
//! | `visitor` | `"SegmentVisitor"` | No | Name of the generated visitor trait |
//! | `wire` | — | No | Generate the tagged JSON codec |
//!
//! # Variant-level attributes `#[variant(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `tag` | `"FlashImage"` | Wire tag (defaults to the variant name) |

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type, Variant, Visibility,
    spanned::Spanned,
};

// ============================================================================
// Attribute structures
// ============================================================================

/// Enum-level `#[variant(…)]` settings.
struct EnumAttrs {
    kind: Ident,
    visitor: Ident,
    wire: bool,
}

/// One parsed variant.
struct VariantInfo {
    ident: Ident,
    payload: Type,
    tag: LitStr,
    visit: Ident,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_variant_wrapper(input: &DeriveInput) -> syn::Result<TokenStream> {
    let data = match &input.data {
        Data::Enum(data) => data,
        Data::Struct(_) => {
            return Err(syn::Error::new(
                input.span(),
                "VariantWrapper can only be derived for enums",
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "VariantWrapper cannot be derived for unions",
            ));
        }
    };

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "VariantWrapper does not support generic enums",
        ));
    }

    let attrs = parse_enum_attrs(&input.attrs, &input.ident)?;
    let variants = data
        .variants
        .iter()
        .map(parse_variant)
        .collect::<syn::Result<Vec<_>>>()?;

    if variants.is_empty() {
        return Err(syn::Error::new(
            input.ident.span(),
            "VariantWrapper requires at least one variant",
        ));
    }
    check_unique(&variants)?;

    let name = &input.ident;
    let vis = &input.vis;

    let mut tokens = generate_kind(vis, name, &attrs.kind, &variants);
    tokens.extend(generate_wrapper(name, &attrs.kind, &variants));
    tokens.extend(generate_payloads(name, &attrs.kind, &variants));
    tokens.extend(generate_visitor(vis, name, &attrs.visitor, &variants));
    if attrs.wire {
        tokens.extend(generate_wire(name, &attrs.kind, &variants));
    }
    Ok(tokens)
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_enum_attrs(attrs: &[Attribute], name: &Ident) -> syn::Result<EnumAttrs> {
    let mut kind: Option<Ident> = None;
    let mut visitor: Option<Ident> = None;
    let mut wire = false;

    for attr in attrs {
        if !attr.path().is_ident("variant") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("kind") {
                kind = Some(meta.value()?.parse::<LitStr>()?.parse::<Ident>()?);
            } else if meta.path.is_ident("visitor") {
                visitor = Some(meta.value()?.parse::<LitStr>()?.parse::<Ident>()?);
            } else if meta.path.is_ident("wire") {
                wire = true;
            } else {
                return Err(meta.error("expected `kind`, `visitor` or `wire`"));
            }
            Ok(())
        })?;
    }

    Ok(EnumAttrs {
        kind: kind.unwrap_or_else(|| format_ident!("{}Kind", name)),
        visitor: visitor.unwrap_or_else(|| format_ident!("{}Visitor", name)),
        wire,
    })
}

fn parse_variant(variant: &Variant) -> syn::Result<VariantInfo> {
    let payload = match &variant.fields {
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => fields.unnamed[0].ty.clone(),
        _ => {
            return Err(syn::Error::new(
                variant.span(),
                "each variant must wrap exactly one payload type, e.g. `At(At)`",
            ));
        }
    };

    let mut tag: Option<LitStr> = None;
    for attr in &variant.attrs {
        if !attr.path().is_ident("variant") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                tag = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `tag`"))
            }
        })?;
    }

    let ident = variant.ident.clone();
    let tag = tag.unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let visit = format_ident!("visit_{}", to_snake_case(&ident.to_string()));

    Ok(VariantInfo {
        ident,
        payload,
        tag,
        visit,
    })
}

/// Payload types select variants, so they must be distinct; so must tags.
fn check_unique(variants: &[VariantInfo]) -> syn::Result<()> {
    let mut payloads = HashSet::new();
    let mut tags = HashSet::new();

    for v in variants {
        let payload = &v.payload;
        if !payloads.insert(quote!(#payload).to_string()) {
            return Err(syn::Error::new(
                v.payload.span(),
                "payload type is already used by another variant",
            ));
        }
        if !tags.insert(v.tag.value()) {
            return Err(syn::Error::new(
                v.tag.span(),
                "wire tag is already used by another variant",
            ));
        }
    }
    Ok(())
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// ============================================================================
// Kind enum
// ============================================================================

fn generate_kind(
    vis: &Visibility,
    name: &Ident,
    kind: &Ident,
    variants: &[VariantInfo],
) -> TokenStream {
    let idents: Vec<&Ident> = variants.iter().map(|v| &v.ident).collect();
    let tags: Vec<&LitStr> = variants.iter().map(|v| &v.tag).collect();
    let doc = format!("Discriminant of [`{name}`], one variant per payload kind.");

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #vis enum #kind {
            #( #idents, )*
        }

        impl #kind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [#kind] = &[ #( #kind::#idents, )* ];

            /// The wire tag of this kind.
            pub const fn as_str(self) -> &'static str {
                match self {
                    #( #kind::#idents => #tags, )*
                }
            }

            /// Looks a wire tag up, `None` if no kind carries it.
            pub fn from_tag(tag: &str) -> ::std::option::Option<Self> {
                match tag {
                    #( #tags => ::std::option::Option::Some(#kind::#idents), )*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::mirai_core::variant::VariantKind for #kind {
            fn all() -> &'static [Self] {
                #kind::ALL
            }

            fn as_str(self) -> &'static str {
                #kind::as_str(self)
            }

            fn from_tag(tag: &str) -> ::std::option::Option<Self> {
                #kind::from_tag(tag)
            }
        }

        impl ::std::fmt::Display for #kind {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(#kind::as_str(*self))
            }
        }
    }
}

// ============================================================================
// Wrapper and payload impls
// ============================================================================

fn generate_wrapper(name: &Ident, kind: &Ident, variants: &[VariantInfo]) -> TokenStream {
    let idents: Vec<&Ident> = variants.iter().map(|v| &v.ident).collect();

    quote! {
        impl ::mirai_core::variant::VariantWrapper for #name {
            type Kind = #kind;

            fn kind(&self) -> #kind {
                match self {
                    #( #name::#idents(_) => #kind::#idents, )*
                }
            }
        }
    }
}

fn generate_payloads(name: &Ident, kind: &Ident, variants: &[VariantInfo]) -> TokenStream {
    let impls = variants.iter().map(|v| {
        let ident = &v.ident;
        let payload = &v.payload;

        quote! {
            impl ::std::convert::From<#payload> for #name {
                fn from(value: #payload) -> Self {
                    #name::#ident(value)
                }
            }

            impl ::mirai_core::variant::Payload<#name> for #payload {
                const KIND: #kind = #kind::#ident;

                fn extract(wrapper: &#name) -> ::std::option::Option<&Self> {
                    match wrapper {
                        #name::#ident(value) => ::std::option::Option::Some(value),
                        #[allow(unreachable_patterns)]
                        _ => ::std::option::Option::None,
                    }
                }

                fn extract_mut(wrapper: &mut #name) -> ::std::option::Option<&mut Self> {
                    match wrapper {
                        #name::#ident(value) => ::std::option::Option::Some(value),
                        #[allow(unreachable_patterns)]
                        _ => ::std::option::Option::None,
                    }
                }

                fn take(wrapper: #name) -> ::std::result::Result<Self, #name> {
                    match wrapper {
                        #name::#ident(value) => ::std::result::Result::Ok(value),
                        #[allow(unreachable_patterns)]
                        other => ::std::result::Result::Err(other),
                    }
                }
            }
        }
    });

    quote! { #( #impls )* }
}

// ============================================================================
// Visitor
// ============================================================================

fn generate_visitor(
    vis: &Visibility,
    name: &Ident,
    visitor: &Ident,
    variants: &[VariantInfo],
) -> TokenStream {
    let idents: Vec<&Ident> = variants.iter().map(|v| &v.ident).collect();
    let visits: Vec<&Ident> = variants.iter().map(|v| &v.visit).collect();
    let payloads: Vec<&Type> = variants.iter().map(|v| &v.payload).collect();
    let trait_doc = format!(
        "Exhaustive visitor over [`{name}`]; every kind has a required method."
    );
    let apply_doc = format!("Hands the live payload to the matching `{visitor}` method.");

    quote! {
        #[doc = #trait_doc]
        #vis trait #visitor {
            /// Value produced by every arm.
            type Output;

            #( fn #visits(&mut self, value: &#payloads) -> Self::Output; )*
        }

        impl #name {
            #[doc = #apply_doc]
            pub fn apply<V: #visitor>(&self, visitor: &mut V) -> V::Output {
                match self {
                    #( #name::#idents(value) => visitor.#visits(value), )*
                }
            }
        }
    }
}

// ============================================================================
// Tagged wire codec
// ============================================================================

fn generate_wire(name: &Ident, kind: &Ident, variants: &[VariantInfo]) -> TokenStream {
    let idents: Vec<&Ident> = variants.iter().map(|v| &v.ident).collect();
    let tags: Vec<&LitStr> = variants.iter().map(|v| &v.tag).collect();
    let payloads: Vec<&Type> = variants.iter().map(|v| &v.payload).collect();

    quote! {
        impl ::mirai_core::wire::TaggedWire for #name {
            fn encode(&self) -> ::mirai_core::wire::Value {
                match self {
                    #( #name::#idents(value) => ::mirai_core::wire::tagged(#tags, value), )*
                }
            }

            fn decode_kind(
                kind: #kind,
                value: &::mirai_core::wire::Value,
            ) -> ::mirai_core::error::DecodeResult<Self> {
                match kind {
                    #( #kind::#idents => ::mirai_core::wire::untag::<#payloads>(value).map(#name::#idents), )*
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("At"), "at");
        assert_eq!(to_snake_case("AtAll"), "at_all");
        assert_eq!(to_snake_case("FlashImage"), "flash_image");
        assert_eq!(
            to_snake_case("BotOfflineEventActive"),
            "bot_offline_event_active"
        );
    }

    #[test]
    fn test_rejects_struct() {
        let input: DeriveInput = syn::parse_quote! {
            struct NotAnEnum { a: i32 }
        };
        assert!(derive_variant_wrapper(&input).is_err());
    }

    #[test]
    fn test_rejects_duplicate_payload() {
        let input: DeriveInput = syn::parse_quote! {
            enum Twice { A(Payload), B(Payload) }
        };
        let err = derive_variant_wrapper(&input).unwrap_err();
        assert!(err.to_string().contains("already used"));
    }

    #[test]
    fn test_rejects_struct_variant() {
        let input: DeriveInput = syn::parse_quote! {
            enum Bad { A { value: i32 } }
        };
        assert!(derive_variant_wrapper(&input).is_err());
    }

    #[test]
    fn test_custom_names_and_tags() {
        let input: DeriveInput = syn::parse_quote! {
            #[variant(kind = "ShapeTag", visitor = "ShapeVisit", wire)]
            pub enum Shape {
                Circle(Circle),
                #[variant(tag = "box")]
                Square(Square),
            }
        };
        let tokens = derive_variant_wrapper(&input).unwrap().to_string();
        assert!(tokens.contains("enum ShapeTag"));
        assert!(tokens.contains("trait ShapeVisit"));
        assert!(tokens.contains("visit_square"));
        assert!(tokens.contains("\"box\""));
        assert!(tokens.contains("TaggedWire"));
    }
}
