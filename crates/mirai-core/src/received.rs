//! Inbound messages.
//!
//! The server sends a received message as one chain whose head carries a
//! `Source` and, for replies, a `Quote`. [`ReceivedMessage`] lifts those two
//! into fields and keeps the rest as a [`StringifiedMessage`].

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecodeResult;
use tracing::trace;

use crate::segment::{MessageChain, Quote, Segment, Source};
use crate::stringified::StringifiedMessage;
use crate::wire::{self, TaggedWire, Value};

/// A message received from a friend, a group or a temporary session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceivedMessage {
    /// Id and time; zeroed if the server sent none.
    pub source: Source,
    /// The quoted message, if this is a reply.
    pub quote: Option<Quote>,
    /// Everything else.
    pub content: StringifiedMessage,
}

impl ReceivedMessage {
    /// Decodes a received chain.
    ///
    /// The first `Source` and the first `Quote` are lifted out; repeated
    /// ones are dropped. When a quote is present the mention the server
    /// prepends to the content is removed, see [`strip_reply_mention`].
    pub fn decode(value: &Value) -> DecodeResult<Self> {
        let mut source = None;
        let mut quote = None;
        let mut chain = MessageChain::new();
        for node in wire::array(value)? {
            match wire::type_tag(node)? {
                "Source" => {
                    let decoded: Source = wire::untag(node)?;
                    source.get_or_insert(decoded);
                }
                "Quote" => {
                    let decoded: Quote = wire::untag(node)?;
                    quote.get_or_insert(decoded);
                }
                _ => chain.push(Segment::decode(node)?),
            }
        }
        if quote.is_some() {
            strip_reply_mention(&mut chain);
        }
        Ok(Self {
            source: source.unwrap_or_default(),
            quote,
            content: StringifiedMessage::new(chain),
        })
    }

    /// Encodes back to a single chain: `Source`, then `Quote`, then content.
    pub fn encode(&self) -> Value {
        let mut nodes = Vec::with_capacity(self.content.len() + 2);
        nodes.push(self.source.encode());
        if let Some(quote) = &self.quote {
            nodes.push(quote.encode());
        }
        nodes.extend(self.content.chain().iter().map(Segment::encode));
        Value::Array(nodes)
    }

    /// Id of this message, for quoting or recalling it.
    pub fn id(&self) -> i32 {
        self.source.id
    }
}

/// Removes the `At` the server puts in front of the content of a reply.
///
/// The injected mention names the quoted sender (or is a zero-target
/// placeholder), so any leading `At` goes. Returns whether one was removed.
pub fn strip_reply_mention(chain: &mut MessageChain) -> bool {
    if matches!(chain.first(), Some(Segment::At(_))) {
        chain.remove(0);
        trace!("Stripped reply mention");
        true
    } else {
        false
    }
}

impl Serialize for ReceivedMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.encode().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReceivedMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::decode(&value).map_err(D::Error::custom)
    }
}
