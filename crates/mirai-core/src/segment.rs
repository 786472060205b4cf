//! Message segment types.
//!
//! A segment is one typed unit of a message chain: a run of text, a mention,
//! an image, and so on. On the wire every segment is a JSON object carrying a
//! `type` tag plus camelCase fields:
//!
//! | Kind | Wire |
//! |------|------|
//! | `At` | `{"type":"At","target":123,"display":"@nick"}` |
//! | `AtAll` | `{"type":"AtAll"}` |
//! | `Face` | `{"type":"Face","faceId":14,"name":"微笑"}` |
//! | `Plain` | `{"type":"Plain","text":"hello"}` |
//! | `Image` / `FlashImage` | `{"type":"Image","imageId":"{..}.png","url":"..","path":".."}` |
//! | `Xml` / `Json` / `App` | `{"type":"Xml","xml":".."}`, `{"type":"Json","json":".."}`, `{"type":"App","content":".."}` |
//! | `Poke` | `{"type":"Poke","name":"ChuoYiChuo"}` |
//!
//! [`Source`] and [`Quote`] share the shape but only ever appear at the head
//! of a received chain; they are lifted out by
//! [`ReceivedMessage`](crate::ReceivedMessage) and never decode as a
//! [`Segment`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mirai_core::{Segment, Plain, VariantWrapper};
//!
//! let text = Segment::plain("Hello, ");
//! let at = Segment::at(10001000);
//! assert_eq!(text.get::<Plain>()?.text, "Hello, ");
//! ```

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::VariantWrapper;
use crate::error::{DecodeError, DecodeResult};
use crate::message::escape;
use crate::wire::{self, TaggedWire, Value};

/// An ordered sequence of segments.
pub type MessageChain = Vec<Segment>;

// ============================================================================
// Segment Enum
// ============================================================================

/// One node of a message chain.
///
/// Equality is per-kind and deliberately loose for some kinds; see the
/// payload types.
#[derive(Debug, Clone, PartialEq, VariantWrapper)]
#[variant(kind = "SegmentKind", wire)]
pub enum Segment {
    /// Mentions a member.
    At(At),
    /// Mentions everyone in the group.
    AtAll(AtAll),
    /// Built-in QQ emoji.
    Face(Face),
    /// A run of plain text.
    Plain(Plain),
    /// Image.
    Image(Image),
    /// Flash image, visible once.
    FlashImage(FlashImage),
    /// XML card.
    Xml(Xml),
    /// JSON card.
    Json(Json),
    /// Mini-app card.
    App(App),
    /// Poke ("戳一戳") message.
    Poke(Poke),
}

// ============================================================================
// Payload Types
// ============================================================================

/// Mentions a member. Compared by `target` only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct At {
    /// QQ of the mentioned member.
    pub target: i64,
    /// Text shown in place of the mention, e.g. `@nick`.
    pub display: String,
}

impl PartialEq for At {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

/// Mentions everyone. All values are equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtAll {}

/// Built-in emoji, by id or by name.
///
/// Two faces with ids compare by id; otherwise they compare by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    /// Emoji id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_id: Option<i32>,
    /// Emoji name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PartialEq for Face {
    fn eq(&self, other: &Self) -> bool {
        match (self.face_id, other.face_id) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => self.name == other.name,
        }
    }
}

/// Plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plain {
    /// The text.
    pub text: String,
}

/// Image referenced by server id, URL, or a path relative to the server's
/// image directory.
///
/// Equality uses the first reference both sides carry, in the order
/// id, URL; failing that the paths are compared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Server-side image id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    /// Remote URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Local path on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        image_eq(
            [&self.image_id, &self.url, &self.path],
            [&other.image_id, &other.url, &other.path],
        )
    }
}

/// Flash image. Same references and equality as [`Image`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashImage {
    /// Server-side image id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    /// Remote URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Local path on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl PartialEq for FlashImage {
    fn eq(&self, other: &Self) -> bool {
        image_eq(
            [&self.image_id, &self.url, &self.path],
            [&other.image_id, &other.url, &other.path],
        )
    }
}

impl From<Image> for FlashImage {
    fn from(image: Image) -> Self {
        Self {
            image_id: image.image_id,
            url: image.url,
            path: image.path,
        }
    }
}

fn image_eq(lhs: [&Option<String>; 3], rhs: [&Option<String>; 3]) -> bool {
    if let (Some(a), Some(b)) = (lhs[0], rhs[0]) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (lhs[1], rhs[1]) {
        return a == b;
    }
    lhs[2] == rhs[2]
}

/// XML card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xml {
    /// Raw XML.
    #[serde(default)]
    pub xml: String,
}

/// JSON card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Json {
    /// Raw JSON text.
    #[serde(default)]
    pub json: String,
}

/// Mini-app card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Raw app content.
    #[serde(default)]
    pub content: String,
}

/// Poke message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poke {
    /// Poke name, e.g. `ChuoYiChuo`.
    #[serde(default)]
    pub name: String,
}

// ============================================================================
// Structural Segments
// ============================================================================

/// Identity of a received message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Message id, usable for quoting and recalling.
    pub id: i32,
    /// Unix timestamp.
    pub time: i32,
}

impl Source {
    /// Encodes with the `Source` tag.
    pub fn encode(&self) -> Value {
        wire::tagged("Source", self)
    }
}

/// Reference to a quoted message.
///
/// Equality ignores `origin`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Id of the quoted message.
    pub id: i32,
    /// Group of the quoted message, 0 for friend messages.
    pub group_id: i64,
    /// Sender of the quoted message.
    pub sender_id: i64,
    /// Receiver of the quoted message.
    pub target_id: i64,
    /// Content of the quoted message.
    #[serde(deserialize_with = "deserialize_origin")]
    pub origin: MessageChain,
}

impl PartialEq for Quote {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.group_id == other.group_id
            && self.sender_id == other.sender_id
            && self.target_id == other.target_id
    }
}

impl Quote {
    /// Encodes with the `Quote` tag.
    pub fn encode(&self) -> Value {
        wire::tagged("Quote", self)
    }
}

fn deserialize_origin<'de, D>(deserializer: D) -> Result<MessageChain, D::Error>
where
    D: Deserializer<'de>,
{
    let mut origin = MessageChain::deserialize(deserializer)?;
    strip_quote_mention(&mut origin);
    Ok(origin)
}

/// Removes the placeholder `At { target: 0 }` the server puts in front of a
/// quote's `origin`. Only that exact placeholder goes; returns whether one
/// did.
pub(crate) fn strip_quote_mention(chain: &mut MessageChain) -> bool {
    match chain.first() {
        Some(Segment::At(at)) if at.target == 0 => {
            chain.remove(0);
            trace!("Stripped quote placeholder mention");
            true
        }
        _ => false,
    }
}

// ============================================================================
// Segment Builder Methods
// ============================================================================

impl Segment {
    /// Creates a plain text segment.
    pub fn plain(text: impl Into<String>) -> Self {
        Segment::Plain(Plain { text: text.into() })
    }

    /// Creates a mention; the server fills in the display text.
    pub fn at(target: i64) -> Self {
        Segment::At(At {
            target,
            display: String::new(),
        })
    }

    /// Creates a mention of everyone.
    pub fn at_all() -> Self {
        Segment::AtAll(AtAll {})
    }

    // --------------------------------
    // Face
    // --------------------------------

    /// Creates an emoji segment by id.
    pub fn face(face_id: i32) -> Self {
        Segment::Face(Face {
            face_id: Some(face_id),
            name: None,
        })
    }

    /// Creates an emoji segment by name.
    pub fn face_named(name: impl Into<String>) -> Self {
        Segment::Face(Face {
            face_id: None,
            name: Some(name.into()),
        })
    }

    // --------------------------------
    // Image
    // --------------------------------

    /// Creates an image segment from a server-side image id.
    pub fn image_from_id(image_id: impl Into<String>) -> Self {
        Segment::Image(Image {
            image_id: Some(image_id.into()),
            ..Default::default()
        })
    }

    /// Creates an image segment from a URL.
    pub fn image_from_url(url: impl Into<String>) -> Self {
        Segment::Image(Image {
            url: Some(url.into()),
            ..Default::default()
        })
    }

    /// Creates an image segment from a path on the server.
    pub fn image_from_path(path: impl Into<String>) -> Self {
        Segment::Image(Image {
            path: Some(path.into()),
            ..Default::default()
        })
    }

    /// Creates a flash image segment from a server-side image id.
    pub fn flash_image_from_id(image_id: impl Into<String>) -> Self {
        Segment::FlashImage(FlashImage {
            image_id: Some(image_id.into()),
            ..Default::default()
        })
    }

    /// Creates a flash image segment from a URL.
    pub fn flash_image_from_url(url: impl Into<String>) -> Self {
        Segment::FlashImage(FlashImage {
            url: Some(url.into()),
            ..Default::default()
        })
    }

    /// Creates a flash image segment from a path on the server.
    pub fn flash_image_from_path(path: impl Into<String>) -> Self {
        Segment::FlashImage(FlashImage {
            path: Some(path.into()),
            ..Default::default()
        })
    }

    // --------------------------------
    // Cards
    // --------------------------------

    /// Creates an XML card.
    pub fn xml(xml: impl Into<String>) -> Self {
        Segment::Xml(Xml { xml: xml.into() })
    }

    /// Creates a JSON card.
    pub fn json(json: impl Into<String>) -> Self {
        Segment::Json(Json { json: json.into() })
    }

    /// Creates a mini-app card.
    pub fn app(content: impl Into<String>) -> Self {
        Segment::App(App {
            content: content.into(),
        })
    }

    /// Creates a poke.
    pub fn poke(name: impl Into<String>) -> Self {
        Segment::Poke(Poke { name: name.into() })
    }

    // --------------------------------
    // Accessors
    // --------------------------------

    /// Text of a `Plain` segment.
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Segment::Plain(plain) => Some(&plain.text),
            _ => None,
        }
    }

    /// Whether this is a `Plain` segment.
    pub fn is_plain(&self) -> bool {
        matches!(self, Segment::Plain(_))
    }
}

// ============================================================================
// Serialization / Deserialization
// ============================================================================

impl Segment {
    /// Decodes one segment.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::UnknownSegmentKind`] for tags outside the ten payload
    ///   kinds, `Source` and `Quote` included
    /// - [`DecodeError::MissingField`] without `text` (Plain) or
    ///   `target`/`display` (At)
    pub fn decode(value: &Value) -> DecodeResult<Self> {
        let tag = wire::type_tag(value)?;
        let kind = SegmentKind::from_tag(tag)
            .ok_or_else(|| DecodeError::UnknownSegmentKind(tag.to_string()))?;
        Self::decode_kind(kind, value)
    }
}

impl Serialize for Segment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.encode().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Segment::decode(&value).map_err(D::Error::custom)
    }
}

/// Decodes a JSON array of segments.
pub fn decode_chain(value: &Value) -> DecodeResult<MessageChain> {
    wire::array(value)?.iter().map(Segment::decode).collect()
}

// ============================================================================
// Chain Normalization
// ============================================================================

/// Merges every run of adjacent `Plain` segments into one.
pub fn combine_adjacent_text(chain: &mut MessageChain) {
    if chain.len() < 2 {
        return;
    }
    let mut merged = MessageChain::with_capacity(chain.len());
    for segment in chain.drain(..) {
        if let Segment::Plain(next) = &segment {
            if let Some(Segment::Plain(last)) = merged.last_mut() {
                last.text.push_str(&next.text);
                continue;
            }
        }
        merged.push(segment);
    }
    *chain = merged;
}

// ============================================================================
// Display
// ============================================================================

/// Renders the per-segment display form, e.g. `{at:123}`.
struct DisplayForm;

impl SegmentVisitor for DisplayForm {
    type Output = String;

    fn visit_at(&mut self, value: &At) -> String {
        format!("{{at:{}}}", value.target)
    }

    fn visit_at_all(&mut self, _: &AtAll) -> String {
        "{atall}".to_string()
    }

    fn visit_face(&mut self, value: &Face) -> String {
        match value.face_id {
            Some(id) => format!("{{face:{id}}}"),
            None => "{face:?}".to_string(),
        }
    }

    fn visit_plain(&mut self, value: &Plain) -> String {
        escape(&value.text)
    }

    fn visit_image(&mut self, value: &Image) -> String {
        format!("{{image:{}}}", escaped_or_unknown(&value.image_id))
    }

    fn visit_flash_image(&mut self, value: &FlashImage) -> String {
        format!("{{flash_image:{}}}", escaped_or_unknown(&value.image_id))
    }

    fn visit_xml(&mut self, value: &Xml) -> String {
        format!("{{xml:{}}}", escape(&value.xml))
    }

    fn visit_json(&mut self, value: &Json) -> String {
        format!("{{json:{}}}", escape(&value.json))
    }

    fn visit_app(&mut self, value: &App) -> String {
        format!("{{app:{}}}", escape(&value.content))
    }

    fn visit_poke(&mut self, value: &Poke) -> String {
        format!("{{poke:{}}}", value.name)
    }
}

fn escaped_or_unknown(id: &Option<String>) -> String {
    id.as_deref().map_or_else(|| "?".to_string(), escape)
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.apply(&mut DisplayForm))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::VariantKind;
    use serde_json::json;

    #[test]
    fn test_segment_serialize() {
        let at = serde_json::to_value(Segment::at(10001000)).unwrap();
        assert_eq!(
            at,
            json!({ "type": "At", "target": 10001000, "display": "" })
        );

        let face = serde_json::to_value(Segment::face(178)).unwrap();
        assert_eq!(face, json!({ "type": "Face", "faceId": 178 }));

        let flash = serde_json::to_value(Segment::flash_image_from_url("http://a/1.jpg")).unwrap();
        assert_eq!(flash, json!({ "type": "FlashImage", "url": "http://a/1.jpg" }));

        assert_eq!(
            serde_json::to_value(Segment::at_all()).unwrap(),
            json!({ "type": "AtAll" })
        );
    }

    #[test]
    fn test_segment_deserialize() {
        let segment: Segment =
            serde_json::from_str(r#"{"type":"Plain","text":"Hello World"}"#).unwrap();
        assert_eq!(segment.as_plain(), Some("Hello World"));

        let segment = Segment::decode(&json!({
            "type": "Image",
            "imageId": "{01E9451B-70ED-EAE3-B37C-101F1EEBF5B5}.jpg",
            "url": "http://example.com/123.jpg",
            "path": null
        }))
        .unwrap();
        let image = segment.get::<Image>().unwrap();
        assert!(image.image_id.is_some());
        assert!(image.path.is_none());

        let segment = Segment::decode(&json!({ "type": "Xml" })).unwrap();
        assert_eq!(segment, Segment::xml(""));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Segment::decode(&json!({ "type": "Voice", "voiceId": "x" })),
            Err(DecodeError::UnknownSegmentKind("Voice".to_string()))
        );
        assert_eq!(
            Segment::decode(&json!({ "type": "Source", "id": 1, "time": 2 })),
            Err(DecodeError::UnknownSegmentKind("Source".to_string()))
        );
        assert_eq!(
            Segment::decode(&json!({ "type": "Plain" })),
            Err(DecodeError::MissingField("text".to_string()))
        );
        assert_eq!(
            Segment::decode(&json!({ "type": "At", "target": 1 })),
            Err(DecodeError::MissingField("display".to_string()))
        );
        assert_eq!(
            Segment::decode(&json!({ "text": "no tag" })),
            Err(DecodeError::MissingField("type".to_string()))
        );
    }

    #[test]
    fn test_every_kind_round_trips() {
        let segments = vec![
            Segment::At(At {
                target: 42,
                display: "@someone".to_string(),
            }),
            Segment::at_all(),
            Segment::Face(Face {
                face_id: Some(14),
                name: Some("微笑".to_string()),
            }),
            Segment::plain("text"),
            Segment::image_from_id("{A}.png"),
            Segment::flash_image_from_path("a/b.png"),
            Segment::xml("<xml/>"),
            Segment::json("{}"),
            Segment::app("app"),
            Segment::poke("ChuoYiChuo"),
        ];
        let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, SegmentKind::ALL);

        for segment in segments {
            let decoded = Segment::decode(&segment.encode()).unwrap();
            assert_eq!(decoded, segment);
        }
    }

    #[test]
    fn test_kind_tags() {
        for kind in SegmentKind::all() {
            assert_eq!(SegmentKind::from_tag(kind.as_str()), Some(*kind));
        }
        assert_eq!(SegmentKind::FlashImage.as_str(), "FlashImage");
        assert_eq!(SegmentKind::from_tag("Quote"), None);
    }

    #[test]
    fn test_image_equality() {
        let by_id = |id: &str, url: &str| {
            Segment::Image(Image {
                image_id: Some(id.to_string()),
                url: Some(url.to_string()),
                path: None,
            })
        };
        assert_eq!(by_id("a", "http://1"), by_id("a", "http://2"));
        assert_ne!(by_id("a", "http://1"), by_id("b", "http://1"));

        let url_only = Segment::image_from_url("http://1");
        assert_eq!(by_id("b", "http://1"), url_only);
        assert_ne!(url_only, Segment::image_from_url("http://2"));
        assert_ne!(Segment::image_from_id("a"), Segment::flash_image_from_id("a"));
    }

    #[test]
    fn test_loose_equality() {
        let at = Segment::At(At {
            target: 1,
            display: "@a".to_string(),
        });
        assert_eq!(at, Segment::at(1));
        assert_ne!(at, Segment::at(2));

        let named = Segment::Face(Face {
            face_id: Some(1),
            name: Some("a".to_string()),
        });
        assert_eq!(named, Segment::face(1));
        assert_eq!(Segment::face_named("a"), named);
        assert_ne!(Segment::face(1), Segment::face(2));
    }

    #[test]
    fn test_typed_access() {
        let segment = Segment::plain("hi");
        assert!(segment.holds::<Plain>());
        assert_eq!(segment.get::<Plain>().unwrap().text, "hi");

        let err = segment.get::<At>().unwrap_err();
        assert_eq!(err.expected, "At");
        assert_eq!(err.actual, "Plain");
        assert!(segment.get_if::<At>().is_none());

        let mut seen = String::new();
        assert!(segment.dispatch(|plain: &Plain| seen.push_str(&plain.text)));
        assert!(!segment.dispatch(|_: &At| unreachable!()));
        assert_eq!(seen, "hi");

        let mut segment = segment;
        if let Some(plain) = segment.get_mut::<Plain>() {
            plain.text.push('!');
        }
        let plain: Plain = segment.into_inner().unwrap();
        assert_eq!(plain.text, "hi!");
        assert!(Segment::at(1).into_inner::<Plain>().is_err());
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Segment::at(123).to_string(), "{at:123}");
        assert_eq!(Segment::face(14).to_string(), "{face:14}");
        assert_eq!(Segment::face_named("smile").to_string(), "{face:?}");
        assert_eq!(Segment::plain("a{b}").to_string(), "a[[b]]");
        assert_eq!(Segment::image_from_url("u").to_string(), "{image:?}");
        assert_eq!(
            Segment::flash_image_from_id("{X}.png").to_string(),
            "{flash_image:[[X]].png}"
        );
        assert_eq!(Segment::poke("Poke").to_string(), "{poke:Poke}");
    }

    #[test]
    fn test_combine_adjacent_text() {
        let mut chain = vec![
            Segment::plain("a"),
            Segment::plain("b"),
            Segment::at(1),
            Segment::plain("c"),
            Segment::plain("d"),
            Segment::plain("e"),
        ];
        combine_adjacent_text(&mut chain);
        assert_eq!(
            chain,
            vec![Segment::plain("ab"), Segment::at(1), Segment::plain("cde")]
        );
    }

    #[test]
    fn test_quote_origin_strips_placeholder() {
        let quote: Quote = serde_json::from_value(json!({
            "id": 5,
            "groupId": 100,
            "senderId": 200,
            "targetId": 100,
            "origin": [
                { "type": "At", "target": 0, "display": "" },
                { "type": "Plain", "text": "quoted" }
            ]
        }))
        .unwrap();
        assert_eq!(quote.origin, vec![Segment::plain("quoted")]);

        let encoded = quote.encode();
        assert_eq!(encoded["type"], "Quote");
        assert_eq!(encoded["senderId"], 200);

        let mut chain = vec![Segment::at(7), Segment::plain("x")];
        assert!(!strip_quote_mention(&mut chain));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_decode_chain() {
        let chain = decode_chain(&json!([
            { "type": "Plain", "text": "a" },
            { "type": "AtAll" }
        ]))
        .unwrap();
        assert_eq!(chain, vec![Segment::plain("a"), Segment::at_all()]);
        assert!(decode_chain(&json!({ "type": "Plain" })).is_err());
    }
}
