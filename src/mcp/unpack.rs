//! Unpacking of tool-call results.
//!
//! A tool call returns an opaque value whose shape depends on the server and
//! transport: a container wrapping the payload in one of several fields, a
//! list of text content blocks, a single text block, or an already
//! structured value. [`RawToolResult`] classifies the value into one of those
//! shapes and [`unpack`] turns it into either parsed JSON or plain text.
//! Unpacking never fails.

use serde_json::{Map, Value};

/// Payload fields of a wrapping container, in priority order
pub const WRAPPED_FIELDS: [&str; 4] = ["data", "result", "content", "value"];

/// A text content block (`{"type": "text", "text": "..."}`)
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read the text of a block-shaped value
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_object()
            .and_then(|o| o.get("text"))
            .and_then(Value::as_str)
            .map(Self::new)
    }
}

/// A container exposing its payload through one of [`WRAPPED_FIELDS`]
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedPayload {
    fields: Map<String, Value>,
}

impl WrappedPayload {
    pub fn data(&self) -> Option<&Value> {
        self.field("data")
    }

    pub fn result(&self) -> Option<&Value> {
        self.field("result")
    }

    pub fn content(&self) -> Option<&Value> {
        self.field("content")
    }

    pub fn value(&self) -> Option<&Value> {
        self.field("value")
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// The first non-null payload field, in priority order
    pub fn first_present(&self) -> Option<&Value> {
        let accessors: [fn(&Self) -> Option<&Value>; 4] =
            [Self::data, Self::result, Self::content, Self::value];
        accessors.iter().find_map(|get| get(self))
    }

    /// The whole container as a JSON object
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Payload shapes that carry content directly
#[derive(Debug, Clone, PartialEq)]
pub enum ToolContent {
    /// Ordered, non-empty list of text blocks
    TextBlocks(Vec<TextBlock>),
    /// A single text block
    Text(TextBlock),
    /// Anything else: a list, a mapping or a scalar
    Raw(Value),
}

impl ToolContent {
    /// Classify a value that is known not to be a wrapper
    pub fn from_value(value: Value) -> Self {
        if let Some(items) = value.as_array() {
            let leads_with_text = items.first().and_then(TextBlock::from_value).is_some();
            if leads_with_text {
                return ToolContent::TextBlocks(
                    items.iter().filter_map(TextBlock::from_value).collect(),
                );
            }
        }

        if let Some(block) = TextBlock::from_value(&value) {
            return ToolContent::Text(block);
        }

        ToolContent::Raw(value)
    }
}

/// An opaque tool-call result
#[derive(Debug, Clone, PartialEq)]
pub enum RawToolResult {
    Wrapped(WrappedPayload),
    Content(ToolContent),
}

impl RawToolResult {
    /// Classify a JSON value into one of the recognized shapes
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) if WRAPPED_FIELDS.iter().any(|f| fields.contains_key(*f)) => {
                RawToolResult::Wrapped(WrappedPayload { fields })
            }
            other => RawToolResult::Content(ToolContent::from_value(other)),
        }
    }

    /// A list of text blocks (as returned by MCP `tools/call`)
    pub fn text_blocks<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawToolResult::Content(ToolContent::TextBlocks(
            texts.into_iter().map(TextBlock::new).collect(),
        ))
    }
}

impl From<Value> for RawToolResult {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// Result of unpacking: parsed JSON or plain (usually diagnostic) text
#[derive(Debug, Clone, PartialEq)]
pub enum Unpacked {
    Json(Value),
    Text(String),
}

impl Unpacked {
    /// An empty record list
    pub fn empty() -> Self {
        Unpacked::Json(Value::Array(Vec::new()))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Unpacked::Text(s) => Some(s),
            Unpacked::Json(_) => None,
        }
    }

    /// Number of records when the payload is a list
    pub fn record_count(&self) -> usize {
        match self {
            Unpacked::Json(Value::Array(items)) => items.len(),
            Unpacked::Json(Value::Object(_)) => 1,
            _ => 0,
        }
    }

    /// JSON form used when embedding the payload in a prompt
    pub fn to_json(&self) -> Value {
        match self {
            Unpacked::Json(v) => v.clone(),
            Unpacked::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Unpack a tool result into parsed JSON or text.
///
/// 1. A wrapper yields its first non-null payload field (or itself when all
///    are null).
/// 2. Text blocks are joined with newlines and parsed as JSON, falling back
///    to the joined text.
/// 3. A single text block is parsed the same way.
/// 4. Structured values are returned unchanged; a bare string is text.
pub fn unpack(raw: RawToolResult) -> Unpacked {
    let content = match raw {
        RawToolResult::Wrapped(wrapped) => match wrapped.first_present() {
            Some(inner) => ToolContent::from_value(inner.clone()),
            None => ToolContent::Raw(wrapped.into_value()),
        },
        RawToolResult::Content(content) => content,
    };

    match content {
        ToolContent::TextBlocks(blocks) if !blocks.is_empty() => {
            let text = blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            parse_or_text(text)
        }
        ToolContent::TextBlocks(_) => Unpacked::empty(),
        ToolContent::Text(block) => parse_or_text(block.text),
        ToolContent::Raw(Value::String(s)) => Unpacked::Text(s),
        ToolContent::Raw(value) => Unpacked::Json(value),
    }
}

fn parse_or_text(text: String) -> Unpacked {
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Unpacked::Json(value),
        Err(_) => Unpacked::Text(text),
    }
}
