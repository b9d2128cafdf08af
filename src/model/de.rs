//! Reading and checking the JSON wire form of documents

use super::{
    Block, Document, GistData, GistSource, HeaderData, ImageData, Inline, Line, ListItem,
    TerminalData,
};
use displaydoc::Display;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Display)]
/// {tag} node at {path} has no valid `{field}` field
pub struct MalformedNode {
    /// The `type` of the offending node
    pub tag: String,
    /// The field that was missing or had the wrong JSON type
    pub field: &'static str,
    /// Where the node sits in the document, e.g. `document.children[2]`
    pub path: String,
}

/// Error when reading a document
#[derive(Debug, Error, Display)]
pub enum ParseError {
    /// Invalid document JSON: {0}
    Json(#[from] serde_json::Error),
    /// Malformed document: {0}
    Malformed(#[from] MalformedNode),
}

/// Treat an explicit `null` like a missing field
pub fn deserialize_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let opt = Option::<T>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// The document root as it appears on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub children: Vec<RawNode>,
}

/// A node as it appears on the wire, before its payload is checked
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub data: Map<String, Value>,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub children: Vec<RawNode>,
}

const ROOT: &str = "document";

fn child_path(parent: &str, index: usize) -> String {
    format!("{}.children[{}]", parent, index)
}

impl RawDocument {
    /// Check every node of the tree against the shape its `type` requires
    pub fn validate(&self) -> Result<Document, MalformedNode> {
        let children = self
            .children
            .iter()
            .enumerate()
            .map(|(i, node)| node.to_block(&child_path(ROOT, i)))
            .collect::<Result<_, _>>()?;
        Ok(Document { children })
    }
}

impl RawNode {
    fn malformed(&self, field: &'static str, path: &str) -> MalformedNode {
        MalformedNode {
            tag: self.tag.clone(),
            field,
            path: path.to_owned(),
        }
    }

    fn string(&self, field: &'static str, path: &str) -> Result<String, MalformedNode> {
        match self.data.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(self.malformed(field, path)),
        }
    }

    fn opt_string(&self, field: &'static str, path: &str) -> Result<Option<String>, MalformedNode> {
        match self.data.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.malformed(field, path)),
        }
    }

    fn integer(&self, field: &'static str, path: &str) -> Result<i64, MalformedNode> {
        self.data
            .get(field)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.malformed(field, path))
    }

    fn inlines(&self, path: &str) -> Result<Vec<Inline>, MalformedNode> {
        self.children
            .iter()
            .enumerate()
            .map(|(i, node)| node.to_inline(&child_path(path, i)))
            .collect()
    }

    fn items(&self, path: &str) -> Result<Vec<ListItem>, MalformedNode> {
        self.children
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let children = node.inlines(&child_path(path, i))?;
                Ok(ListItem { children })
            })
            .collect()
    }

    fn lines(&self, path: &str) -> Result<Vec<Line>, MalformedNode> {
        self.children
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let value = node.string("value", &child_path(path, i))?;
                Ok(Line { value })
            })
            .collect()
    }

    /// Check this node as a top-level block
    pub fn to_block(&self, path: &str) -> Result<Block, MalformedNode> {
        let block = match self.tag.as_str() {
            "PARAGRAPH" => Block::Paragraph {
                children: self.inlines(path)?,
            },
            "HEADER" => Block::Header {
                data: HeaderData {
                    size: self.integer("size", path)?,
                    value: self.string("value", path)?,
                },
            },
            "NOTE" => Block::Note {
                children: self.inlines(path)?,
            },
            "IMAGE" => Block::Image {
                data: ImageData {
                    resource: self.string("resource", path)?,
                    caption: self.opt_string("caption", path)?.unwrap_or_default(),
                },
            },
            "UNORDERED_LIST" => Block::UnorderedList {
                children: self.items(path)?,
            },
            "ORDERED_LIST" => Block::OrderedList {
                children: self.items(path)?,
            },
            "CODE" => Block::Code {
                children: self.lines(path)?,
            },
            "TERMINAL" => Block::Terminal {
                data: TerminalData {
                    // An empty prompt falls back to the default, just like a missing one
                    prompt: self
                        .opt_string("prompt", path)?
                        .filter(|prompt| !prompt.is_empty()),
                },
                children: self.lines(path)?,
            },
            "GIST" => {
                let source = self.string("source", path)?;
                Block::Gist {
                    data: GistData {
                        source: GistSource::parse(&source)
                            .ok_or_else(|| self.malformed("source", path))?,
                        file: self.opt_string("file", path)?,
                    },
                }
            }
            _ => Block::Unsupported {
                tag: self.tag.clone(),
            },
        };
        Ok(block)
    }

    /// Check this node as an inline node
    pub fn to_inline(&self, path: &str) -> Result<Inline, MalformedNode> {
        let inline = match self.tag.as_str() {
            "TEXT" => Inline::Text {
                value: self.string("value", path)?,
            },
            "STRONG_TEXT" => Inline::Strong {
                value: self.string("value", path)?,
            },
            "ITALIC_TEXT" => Inline::Italic {
                value: self.string("value", path)?,
            },
            "LINK" => Inline::Link {
                url: self.string("url", path)?,
                value: self.string("value", path)?,
            },
            _ => Inline::Unsupported {
                tag: self.tag.clone(),
            },
        };
        Ok(inline)
    }
}
