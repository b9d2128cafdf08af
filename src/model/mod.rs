//! # The document model
//!
//! Documents arrive as JSON trees of `{ "type", "data", "children" }` nodes.
//! The [`de`] module reads that wire form loosely and checks it into the
//! closed, typed tree defined here. Node types this crate does not know are
//! kept as `Unsupported` so that the renderer can skip them explicitly.
pub mod de;

use serde::{Serialize, Serializer};
use std::fmt;

pub use de::{MalformedNode, ParseError};

/// The root of a document, an unnamed container of blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub children: Vec<Block>,
}

impl Document {
    /// Parse and validate a document from its JSON wire form
    pub fn from_json(input: &str) -> Result<Self, ParseError> {
        let raw: de::RawDocument = serde_json::from_str(input)?;
        Ok(raw.validate()?)
    }

    /// Validate a document that was already read into a [`serde_json::Value`]
    pub fn from_value(value: serde_json::Value) -> Result<Self, ParseError> {
        let raw: de::RawDocument = serde_json::from_value(value)?;
        Ok(raw.validate()?)
    }

    /// All gist embeds at the top level of the document, in order
    pub fn gists(&self) -> impl Iterator<Item = &GistData> {
        self.children.iter().filter_map(|block| match block {
            Block::Gist { data } => Some(data),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderData {
    /// The requested heading level, as authored (not yet clamped)
    pub size: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub resource: String,
    pub caption: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalData {
    pub prompt: Option<String>,
}

/// The `owner/id` pair that names a gist
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GistSource {
    pub owner: String,
    pub id: String,
}

impl fmt::Display for GistSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.id)
    }
}

impl Serialize for GistSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl GistSource {
    /// Split an `owner/id` string, rejecting empty halves
    pub fn parse(source: &str) -> Option<Self> {
        let (owner, id) = source.split_once('/')?;
        if owner.is_empty() || id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_owned(),
            id: id.to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GistData {
    pub source: GistSource,
    /// Restrict the embed to a single file of the gist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// An item of an ordered or unordered list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItem {
    pub children: Vec<Inline>,
}

/// A single line of a code or terminal block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub value: String,
}

/// A top-level node of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph { children: Vec<Inline> },
    Header { data: HeaderData },
    Note { children: Vec<Inline> },
    Image { data: ImageData },
    UnorderedList { children: Vec<ListItem> },
    OrderedList { children: Vec<ListItem> },
    Code { children: Vec<Line> },
    Terminal { data: TerminalData, children: Vec<Line> },
    Gist { data: GistData },
    /// A node with a `type` that is not a known block type
    Unsupported { tag: String },
}

/// A text-formatting node within a paragraph, note or list item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { value: String },
    Strong { value: String },
    Italic { value: String },
    Link { url: String, value: String },
    /// A node with a `type` that is not a known inline type
    Unsupported { tag: String },
}

impl Block {
    /// The wire name of this block's type
    pub fn tag(&self) -> &str {
        match self {
            Block::Paragraph { .. } => "PARAGRAPH",
            Block::Header { .. } => "HEADER",
            Block::Note { .. } => "NOTE",
            Block::Image { .. } => "IMAGE",
            Block::UnorderedList { .. } => "UNORDERED_LIST",
            Block::OrderedList { .. } => "ORDERED_LIST",
            Block::Code { .. } => "CODE",
            Block::Terminal { .. } => "TERMINAL",
            Block::Gist { .. } => "GIST",
            Block::Unsupported { tag } => tag.as_str(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Block::Unsupported { .. })
    }
}

impl Inline {
    pub fn tag(&self) -> &str {
        match self {
            Inline::Text { .. } => "TEXT",
            Inline::Strong { .. } => "STRONG_TEXT",
            Inline::Italic { .. } => "ITALIC_TEXT",
            Inline::Link { .. } => "LINK",
            Inline::Unsupported { tag } => tag.as_str(),
        }
    }
}
