//! Message receipt events.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::received::ReceivedMessage;
use crate::types::{Friend, Member};
use crate::wire::{self, Value};

/// A message posted in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub message_chain: ReceivedMessage,
    /// The member who sent it.
    pub sender: Member,
}

/// A private message from a friend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendMessage {
    pub message_chain: ReceivedMessage,
    pub sender: Friend,
}

/// A private message from a group member who is not a friend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempMessage {
    pub message_chain: ReceivedMessage,
    /// The member who sent it; `sender.group` is the group the session
    /// goes through.
    pub sender: Member,
}

fn field<'a>(value: &'a Value, name: &str) -> DecodeResult<&'a Value> {
    value
        .get(name)
        .ok_or_else(|| DecodeError::MissingField(name.to_string()))
}

// Decoded by hand so chain errors keep their kind instead of passing
// through serde as text.
macro_rules! impl_message_decode {
    ($($event:ident),* $(,)?) => {
        $(
            impl $event {
                /// Decodes the event object; the `type` tag is not checked.
                pub fn decode(value: &Value) -> DecodeResult<Self> {
                    Ok(Self {
                        message_chain: ReceivedMessage::decode(field(value, "messageChain")?)?,
                        sender: wire::untag(field(value, "sender")?)?,
                    })
                }
            }
        )*
    };
}

impl_message_decode!(GroupMessage, FriendMessage, TempMessage);
