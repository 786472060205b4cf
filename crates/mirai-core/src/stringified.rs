//! Read-only message view for pattern matching.
//!
//! A [`StringifiedMessage`] caches a flat string of its chain: `Plain` text is
//! [escaped](crate::escape), every other segment becomes `\<Kind>:<index>`,
//! where `index` is the segment's position in the chain. Since escaped text
//! never contains a lone backslash, placeholders cannot collide with text:
//!
//! ```rust,ignore
//! let msg = StringifiedMessage::new(vec![
//!     Segment::plain("hi "),
//!     Segment::at(123),
//!     Segment::plain(" [x]"),
//! ]);
//! assert_eq!(msg.stringified(), r"hi \At:1 \[x\]");
//! assert_eq!(msg.segment_at(1), Some(&Segment::at(123)));
//! ```

use std::fmt::{self, Write as _};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::VariantWrapper;
use crate::message::{self, Message, escape};
use crate::segment::{MessageChain, Segment, combine_adjacent_text};

/// An immutable chain with its cached stringified form.
#[derive(Debug, Clone, Default)]
pub struct StringifiedMessage {
    chain: MessageChain,
    stringified: String,
}

impl StringifiedMessage {
    /// Wraps a chain, merging adjacent `Plain` runs.
    pub fn new(chain: MessageChain) -> Self {
        let mut message = Self::default();
        message.set_chain(chain);
        message
    }

    /// Replaces the chain and regenerates the cached string.
    pub fn set_chain(&mut self, mut chain: MessageChain) {
        combine_adjacent_text(&mut chain);
        self.stringified = stringify(&chain);
        self.chain = chain;
    }

    /// The underlying chain.
    pub fn chain(&self) -> &[Segment] {
        &self.chain
    }

    /// Unwraps into the underlying chain.
    pub fn into_chain(self) -> MessageChain {
        self.chain
    }

    /// Converts into a [`Message`] for editing, e.g. to reply with it.
    pub fn into_message(self) -> Message {
        Message::from_chain(self.chain)
    }

    /// The cached stringified form.
    pub fn stringified(&self) -> &str {
        &self.stringified
    }

    /// Resolves a placeholder index back to its segment.
    pub fn segment_at(&self, index: usize) -> Option<&Segment> {
        self.chain.get(index)
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether there are no segments.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Concatenates the text of every `Plain` segment. Lossy, as
    /// [`Message::extract_text`].
    pub fn extract_text(&self) -> String {
        message::extract_text(&self.chain)
    }

    /// Whether the first segment is `Plain` and starts with `pattern`.
    pub fn starts_with(&self, pattern: &str) -> bool {
        message::starts_with(&self.chain, pattern)
    }

    /// Whether the last segment is `Plain` and ends with `pattern`.
    pub fn ends_with(&self, pattern: &str) -> bool {
        message::ends_with(&self.chain, pattern)
    }

    /// Whether any `Plain` segment contains `pattern`.
    pub fn contains(&self, pattern: &str) -> bool {
        message::contains(&self.chain, pattern)
    }
}

fn stringify(chain: &[Segment]) -> String {
    let mut out = String::new();
    for (index, segment) in chain.iter().enumerate() {
        match segment.as_plain() {
            Some(text) => out.push_str(&escape(text)),
            // Writing to a String cannot fail.
            None => {
                let _ = write!(out, "\\{}:{}", segment.kind(), index);
            }
        }
    }
    out
}

impl PartialEq for StringifiedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.chain == other.chain
    }
}

impl From<MessageChain> for StringifiedMessage {
    fn from(chain: MessageChain) -> Self {
        Self::new(chain)
    }
}

impl From<Message> for StringifiedMessage {
    fn from(message: Message) -> Self {
        Self::new(message.into_chain())
    }
}

impl fmt::Display for StringifiedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringified)
    }
}

impl Serialize for StringifiedMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.chain.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StringifiedMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        MessageChain::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StringifiedMessage {
        StringifiedMessage::new(vec![
            Segment::plain("hi "),
            Segment::at(123),
            Segment::plain(" [x]"),
            Segment::plain("{y}"),
            Segment::flash_image_from_id("f"),
        ])
    }

    #[test]
    fn test_stringified_placeholders() {
        let msg = sample();
        assert_eq!(msg.len(), 4);
        assert_eq!(msg.stringified(), r"hi \At:1 \[x\][[y]]\FlashImage:3");
        assert_eq!(msg.segment_at(1), Some(&Segment::at(123)));
        assert_eq!(msg.segment_at(3), Some(&Segment::flash_image_from_id("f")));
        assert_eq!(msg.segment_at(4), None);
        assert_eq!(msg.to_string(), msg.stringified());
    }

    #[test]
    fn test_set_chain_regenerates() {
        let mut msg = sample();
        msg.set_chain(vec![Segment::face(1), Segment::plain("ok")]);
        assert_eq!(msg.stringified(), r"\Face:0ok");
        assert!(msg.ends_with("ok"));
        assert!(!msg.starts_with("ok"));
    }

    #[test]
    fn test_text_queries() {
        let msg = sample();
        assert_eq!(msg.extract_text(), "hi  [x]{y}");
        assert!(msg.starts_with("hi"));
        assert!(!msg.ends_with("}"));
        assert!(msg.contains("[x]"));
        assert!(!msg.contains(r"\At"));
    }

    #[test]
    fn test_equality_and_conversion() {
        let msg = sample();
        let message = msg.clone().into_message();
        assert_eq!(StringifiedMessage::from(message), msg);
        assert_ne!(msg, StringifiedMessage::default());
        assert!(StringifiedMessage::default().stringified().is_empty());
    }
}
