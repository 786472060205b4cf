//! Closed tagged unions.
//!
//! [`VariantWrapper`] is implemented by `#[derive(VariantWrapper)]` for enums
//! whose variants each wrap one distinct payload type, such as
//! [`Segment`](crate::Segment) and [`Event`](crate::Event). The payload type
//! doubles as the selector:
//!
//! ```rust,ignore
//! use mirai_core::{Plain, Segment, VariantWrapper};
//!
//! let segment = Segment::plain("hello");
//! assert_eq!(segment.get::<Plain>()?.text, "hello");
//! assert!(segment.get_if::<At>().is_none());
//!
//! segment.dispatch(|plain: &Plain| println!("{}", plain.text));
//! ```
//!
//! Exhaustive handling goes through the generated visitor trait and
//! `apply()`; leaving out a kind there is a compile error.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::TypeMismatch;

/// The fieldless discriminant of a [`VariantWrapper`].
pub trait VariantKind: Copy + Eq + Hash + Debug + 'static {
    /// Every kind, in declaration order.
    fn all() -> &'static [Self];

    /// The wire tag of this kind.
    fn as_str(self) -> &'static str;

    /// Reverse of [`as_str`](VariantKind::as_str).
    fn from_tag(tag: &str) -> Option<Self>;
}

/// A payload type that selects one variant of `W`.
pub trait Payload<W: VariantWrapper>: Sized + Into<W> {
    /// The kind of the variant wrapping this payload.
    const KIND: W::Kind;

    /// Borrows the payload if `wrapper` holds this kind.
    fn extract(wrapper: &W) -> Option<&Self>;

    /// Mutably borrows the payload if `wrapper` holds this kind.
    fn extract_mut(wrapper: &mut W) -> Option<&mut Self>;

    /// Moves the payload out, handing the wrapper back on mismatch.
    fn take(wrapper: W) -> Result<Self, W>;
}

/// A closed tagged union over distinct payload types.
pub trait VariantWrapper: Sized {
    /// The discriminant type.
    type Kind: VariantKind;

    /// The live discriminant.
    fn kind(&self) -> Self::Kind;

    /// Whether the live kind is `P`'s.
    fn holds<P: Payload<Self>>(&self) -> bool {
        self.kind() == P::KIND
    }

    /// Typed access.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatch`] if the live kind is not `P`'s.
    fn get<P: Payload<Self>>(&self) -> Result<&P, TypeMismatch> {
        P::extract(self).ok_or_else(|| TypeMismatch {
            expected: P::KIND.as_str(),
            actual: self.kind().as_str(),
        })
    }

    /// Typed access that never fails.
    fn get_if<P: Payload<Self>>(&self) -> Option<&P> {
        P::extract(self)
    }

    /// Mutable typed access.
    fn get_mut<P: Payload<Self>>(&mut self) -> Option<&mut P> {
        P::extract_mut(self)
    }

    /// Unwraps into the payload, or hands `self` back on mismatch.
    fn into_inner<P: Payload<Self>>(self) -> Result<P, Self> {
        P::take(self)
    }

    /// Runs `handler` only if the live kind is `P`'s; otherwise a no-op.
    ///
    /// `P` is usually inferred from the closure's argument type. Returns
    /// whether the handler ran.
    fn dispatch<P, F>(&self, handler: F) -> bool
    where
        P: Payload<Self>,
        F: FnOnce(&P),
    {
        match P::extract(self) {
            Some(payload) => {
                handler(payload);
                true
            }
            None => false,
        }
    }
}
