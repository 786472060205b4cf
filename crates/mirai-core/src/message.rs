//! The mutable message builder and text escaping.
//!
//! [`Message`] owns a [`MessageChain`] and keeps one invariant: no two
//! adjacent segments are both `Plain`. Every mutation goes through
//! [`Message::push`], which merges text into a trailing `Plain`.
//!
//! ```rust,ignore
//! use mirai_core::Message;
//!
//! let mut msg = Message::from("Hello, ").at(10001000).plain("!");
//! msg += " Bye";
//! assert_eq!(msg.len(), 3);
//! assert!(msg.ends_with("! Bye"));
//! ```

use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MalformedEscape;
use crate::segment::{MessageChain, Segment, combine_adjacent_text};

// ============================================================================
// Escaping
// ============================================================================

/// Escapes text so that it cannot be confused with a segment placeholder.
///
/// | Literal | Escaped |
/// |---------|---------|
/// | `\` | `\\` |
/// | `[` | `\[` |
/// | `]` | `\]` |
/// | `{` | `[[` |
/// | `}` | `]]` |
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '[' => escaped.push_str("\\["),
            ']' => escaped.push_str("\\]"),
            '{' => escaped.push_str("[["),
            '}' => escaped.push_str("]]"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Reverses [`escape`].
///
/// # Errors
///
/// Returns [`MalformedEscape`] at the first backslash or bracket that does
/// not start one of the escape pairs.
pub fn unescape(text: &str) -> Result<String, MalformedEscape> {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((position, c)) = chars.next() {
        let malformed = |reason| MalformedEscape { position, reason };
        match c {
            '\\' => match chars.next() {
                Some((_, e @ ('\\' | '[' | ']'))) => unescaped.push(e),
                Some(_) => return Err(malformed("unknown escape after backslash")),
                None => return Err(malformed("dangling backslash")),
            },
            '[' => match chars.next() {
                Some((_, '[')) => unescaped.push('{'),
                _ => return Err(malformed("unpaired '['")),
            },
            ']' => match chars.next() {
                Some((_, ']')) => unescaped.push('}'),
                _ => return Err(malformed("unpaired ']'")),
            },
            _ => unescaped.push(c),
        }
    }
    Ok(unescaped)
}

// ============================================================================
// Plain-text Queries
// ============================================================================

// Shared by `Message` and `StringifiedMessage`.

pub(crate) fn extract_text(chain: &[Segment]) -> String {
    chain.iter().filter_map(Segment::as_plain).collect()
}

pub(crate) fn starts_with(chain: &[Segment], pattern: &str) -> bool {
    chain
        .first()
        .and_then(Segment::as_plain)
        .is_some_and(|text| text.starts_with(pattern))
}

pub(crate) fn ends_with(chain: &[Segment], pattern: &str) -> bool {
    chain
        .last()
        .and_then(Segment::as_plain)
        .is_some_and(|text| text.ends_with(pattern))
}

pub(crate) fn contains(chain: &[Segment], pattern: &str) -> bool {
    chain
        .iter()
        .filter_map(Segment::as_plain)
        .any(|text| text.contains(pattern))
}

// ============================================================================
// Message
// ============================================================================

/// A message under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    chain: MessageChain,
}

impl Message {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a chain, merging adjacent `Plain` runs.
    pub fn from_chain(mut chain: MessageChain) -> Self {
        combine_adjacent_text(&mut chain);
        Self { chain }
    }

    /// Appends a segment, merging text into a trailing `Plain`.
    pub fn push(&mut self, segment: impl Into<Segment>) {
        let segment = segment.into();
        if let (Some(Segment::Plain(last)), Segment::Plain(next)) =
            (self.chain.last_mut(), &segment)
        {
            last.text.push_str(&next.text);
            return;
        }
        self.chain.push(segment);
    }

    /// Appends every segment of `other`.
    ///
    /// Only the first segment can merge; the rest already satisfy the
    /// invariant.
    pub fn append(&mut self, other: Message) {
        let mut rest = other.chain.into_iter();
        if let Some(first) = rest.next() {
            self.push(first);
        }
        self.chain.extend(rest);
    }

    // --------------------------------
    // Accessors
    // --------------------------------

    /// The underlying chain.
    pub fn chain(&self) -> &[Segment] {
        &self.chain
    }

    /// Unwraps into the underlying chain.
    pub fn into_chain(self) -> MessageChain {
        self.chain
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether there are no segments.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Iterates over the segments.
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.chain.iter()
    }

    // --------------------------------
    // Text queries
    // --------------------------------

    /// Concatenates the text of every `Plain` segment.
    ///
    /// Lossy: mentions, images and the rest are dropped, so equal text does
    /// not imply equal messages.
    pub fn extract_text(&self) -> String {
        extract_text(&self.chain)
    }

    /// Whether the first segment is `Plain` and starts with `pattern`.
    pub fn starts_with(&self, pattern: &str) -> bool {
        starts_with(&self.chain, pattern)
    }

    /// Whether the last segment is `Plain` and ends with `pattern`.
    pub fn ends_with(&self, pattern: &str) -> bool {
        ends_with(&self.chain, pattern)
    }

    /// Whether any `Plain` segment contains `pattern`.
    pub fn contains(&self, pattern: &str) -> bool {
        contains(&self.chain, pattern)
    }
}

// ----------------------------------------------------------------------------
// Builder methods
// ----------------------------------------------------------------------------

impl Message {
    /// Appends a segment.
    pub fn with(mut self, segment: impl Into<Segment>) -> Self {
        self.push(segment);
        self
    }

    /// Appends text.
    pub fn plain(self, text: impl Into<String>) -> Self {
        self.with(Segment::plain(text))
    }

    /// Appends a mention.
    pub fn at(self, target: i64) -> Self {
        self.with(Segment::at(target))
    }

    /// Appends a mention of everyone.
    pub fn at_all(self) -> Self {
        self.with(Segment::at_all())
    }

    /// Appends an emoji by id.
    pub fn face(self, face_id: i32) -> Self {
        self.with(Segment::face(face_id))
    }

    /// Appends an image by server id.
    pub fn image_from_id(self, image_id: impl Into<String>) -> Self {
        self.with(Segment::image_from_id(image_id))
    }

    /// Appends an image by URL.
    pub fn image_from_url(self, url: impl Into<String>) -> Self {
        self.with(Segment::image_from_url(url))
    }

    /// Appends an image by server path.
    pub fn image_from_path(self, path: impl Into<String>) -> Self {
        self.with(Segment::image_from_path(path))
    }

    /// Appends a flash image by server id.
    pub fn flash_image_from_id(self, image_id: impl Into<String>) -> Self {
        self.with(Segment::flash_image_from_id(image_id))
    }

    /// Appends a flash image by URL.
    pub fn flash_image_from_url(self, url: impl Into<String>) -> Self {
        self.with(Segment::flash_image_from_url(url))
    }

    /// Appends an XML card.
    pub fn xml(self, xml: impl Into<String>) -> Self {
        self.with(Segment::xml(xml))
    }

    /// Appends a JSON card.
    pub fn json(self, json: impl Into<String>) -> Self {
        self.with(Segment::json(json))
    }

    /// Appends a mini-app card.
    pub fn app(self, content: impl Into<String>) -> Self {
        self.with(Segment::app(content))
    }

    /// Appends a poke.
    pub fn poke(self, name: impl Into<String>) -> Self {
        self.with(Segment::poke(name))
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Segment> for Message {
    fn from(segment: Segment) -> Self {
        Self {
            chain: vec![segment],
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        if text.is_empty() {
            return Self::new();
        }
        Self::from(Segment::plain(text))
    }
}

impl From<MessageChain> for Message {
    fn from(chain: MessageChain) -> Self {
        Self::from_chain(chain)
    }
}

impl From<Message> for MessageChain {
    fn from(message: Message) -> Self {
        message.chain
    }
}

impl FromIterator<Segment> for Message {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        let mut message = Self::new();
        message.extend(iter);
        message
    }
}

impl Extend<Segment> for Message {
    fn extend<I: IntoIterator<Item = Segment>>(&mut self, iter: I) {
        for segment in iter {
            self.push(segment);
        }
    }
}

impl IntoIterator for Message {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.chain.into_iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.chain.iter()
    }
}

// ============================================================================
// Operators
// ============================================================================

impl AddAssign<Message> for Message {
    fn add_assign(&mut self, rhs: Message) {
        self.append(rhs);
    }
}

impl AddAssign<Segment> for Message {
    fn add_assign(&mut self, rhs: Segment) {
        self.push(rhs);
    }
}

impl AddAssign<&str> for Message {
    fn add_assign(&mut self, rhs: &str) {
        self.push(Segment::plain(rhs));
    }
}

impl<T> Add<T> for Message
where
    Message: AddAssign<T>,
{
    type Output = Message;

    fn add(mut self, rhs: T) -> Message {
        self += rhs;
        self
    }
}

// ============================================================================
// Equality
// ============================================================================

impl PartialEq<str> for Message {
    fn eq(&self, other: &str) -> bool {
        match self.chain.as_slice() {
            [] => other.is_empty(),
            [Segment::Plain(plain)] => plain.text == other,
            _ => false,
        }
    }
}

impl PartialEq<&str> for Message {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

// ============================================================================
// Display / Serialization
// ============================================================================

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chain
            .iter()
            .try_for_each(|segment| write!(f, "{segment}"))
    }
}

impl Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.chain.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        MessageChain::deserialize(deserializer).map(Self::from_chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_adjacent_plain(message: &Message) -> bool {
        message
            .chain()
            .windows(2)
            .all(|pair| !(pair[0].is_plain() && pair[1].is_plain()))
    }

    #[test]
    fn test_push_merges_plain() {
        let mut msg = Message::new();
        msg.push(Segment::plain("Hello"));
        msg.push(Segment::plain(", "));
        msg.push(Segment::at(1));
        msg.push(Segment::plain("world"));
        assert_eq!(
            msg.chain(),
            [Segment::plain("Hello, "), Segment::at(1), Segment::plain("world")]
        );
    }

    #[test]
    fn test_concatenation_keeps_invariant() {
        let a = Message::from("a").at(1).plain("b");
        let b = Message::from("c").face(2).plain("d");
        let sum = a.clone() + b.clone();
        assert!(no_adjacent_plain(&sum));
        assert_eq!(sum.len(), 5);
        assert_eq!(sum.chain()[2], Segment::plain("bc"));

        let mut acc = a;
        acc += "x";
        acc += Segment::plain("y");
        acc += b;
        assert!(no_adjacent_plain(&acc));
        assert_eq!(acc.chain()[2], Segment::plain("bxyc"));
    }

    #[test]
    fn test_from_chain_combines() {
        let msg = Message::from_chain(vec![
            Segment::plain("a"),
            Segment::plain("b"),
            Segment::at_all(),
        ]);
        assert_eq!(msg.chain(), [Segment::plain("ab"), Segment::at_all()]);

        let collected: Message = vec![Segment::plain("x"), Segment::plain("y")]
            .into_iter()
            .collect();
        assert_eq!(collected, "xy");
    }

    #[test]
    fn test_string_equality() {
        assert_eq!(Message::from("hi"), "hi");
        assert_eq!(Message::new(), "");
        assert_eq!(Message::from(""), Message::new());
        assert_ne!(Message::from("hi").at(1), "hi");
    }

    #[test]
    fn test_text_queries() {
        let msg = Message::from("/echo ").at(1).plain(" tail");
        assert!(msg.starts_with("/echo"));
        assert!(msg.ends_with("tail"));
        assert!(msg.contains("ech"));
        assert!(!msg.contains("{at"));
        assert_eq!(msg.extract_text(), "/echo  tail");

        let leading_at = Message::new().at(1).plain("/echo");
        assert!(!leading_at.starts_with("/echo"));
    }

    #[test]
    fn test_display() {
        let msg = Message::from("a{").at(2).face(3).image_from_id("id");
        assert_eq!(msg.to_string(), "a[[{at:2}{face:3}{image:id}");
    }

    #[test]
    fn test_serde_bare_array() {
        let msg = Message::from("hi").at_all();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!([{ "type": "Plain", "text": "hi" }, { "type": "AtAll" }])
        );

        let back: Message = serde_json::from_value(json!([
            { "type": "Plain", "text": "a" },
            { "type": "Plain", "text": "b" }
        ]))
        .unwrap();
        assert_eq!(back, "ab");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r"a\b[c]{d}"), r"a\\b\[c\][[d]]");
        for text in ["", "plain", r"\[{}]", "[[]]", "{{}}", r"\\", "中文{x}"] {
            assert_eq!(unescape(&escape(text)).unwrap(), text);
        }
    }

    #[test]
    fn test_unescape_rejects_malformed() {
        let err = unescape(r"ab\x").unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(unescape("[x").unwrap_err().reason, "unpaired '['");
        assert_eq!(unescape("x]").unwrap_err().position, 1);
        assert_eq!(unescape("\\").unwrap_err().reason, "dangling backslash");
    }
}
