//! # The view tree
//!
//! This is what the renderer hands to the host. Elements mirror a small set
//! of HTML tags; the host is free to map them onto whatever it displays.
use crate::model::GistData;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "&'static str")]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Section,
    Img,
    Ul,
    Ol,
    Li,
    Pre,
    Br,
    Strong,
    I,
    A,
}

impl From<Tag> for &'static str {
    fn from(tag: Tag) -> &'static str {
        match tag {
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::H5 => "h5",
            Tag::H6 => "h6",
            Tag::Section => "section",
            Tag::Img => "img",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Pre => "pre",
            Tag::Br => "br",
            Tag::Strong => "strong",
            Tag::I => "i",
            Tag::A => "a",
        }
    }
}

impl Tag {
    /// The heading tag for a level, which must already be within `1..=6`
    pub fn heading(level: u8) -> Option<Tag> {
        match level {
            1 => Some(Tag::H1),
            2 => Some(Tag::H2),
            3 => Some(Tag::H3),
            4 => Some(Tag::H4),
            5 => Some(Tag::H5),
            6 => Some(Tag::H6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: Tag,
    /// Position among the siblings, used by the host to match up re-renders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewNode>,
}

impl Element {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            key: None,
            class: None,
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: usize) -> Self {
        self.key = Some(key);
        self
    }

    pub fn class<S: Into<String>>(mut self, class: S) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn attr<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child<N: Into<ViewNode>>(mut self, child: N) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I: IntoIterator<Item = ViewNode>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }
}

/// A gist embed that still has to be mounted on an [`EmbedBridge`](crate::embed::EmbedBridge)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedView {
    pub key: usize,
    pub gist: GistData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewNode {
    Text {
        text: String,
    },
    Element(Element),
    /// Markup from a third party, inserted without sanitization.
    ///
    /// Only ever produced from gist payloads, which are trusted as much as the
    /// gist host itself. A host that shows documents from a less trusted
    /// source must sanitize this before inserting it.
    RawHtml {
        html: String,
    },
    Embed(EmbedView),
}

impl From<Element> for ViewNode {
    fn from(element: Element) -> Self {
        ViewNode::Element(element)
    }
}

impl ViewNode {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ViewNode::Text { text: text.into() }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            ViewNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// The text of this node and all of its descendants, concatenated
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            ViewNode::Text { text } => out.push_str(text),
            ViewNode::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
            ViewNode::RawHtml { .. } | ViewNode::Embed(_) => {}
        }
    }

    /// All unmounted embeds in this tree, in document order
    pub fn embeds(&self) -> Vec<&EmbedView> {
        let mut out = Vec::new();
        self.collect_embeds(&mut out);
        out
    }

    fn collect_embeds<'a>(&'a self, out: &mut Vec<&'a EmbedView>) {
        match self {
            ViewNode::Embed(embed) => out.push(embed),
            ViewNode::Element(element) => {
                for child in &element.children {
                    child.collect_embeds(out);
                }
            }
            ViewNode::Text { .. } | ViewNode::RawHtml { .. } => {}
        }
    }

    /// Replace every embed in the tree with the node `f` returns for it
    pub fn map_embeds<F: FnMut(&EmbedView) -> ViewNode>(self, f: &mut F) -> ViewNode {
        match self {
            ViewNode::Embed(embed) => f(&embed),
            ViewNode::Element(mut element) => {
                element.children = element
                    .children
                    .into_iter()
                    .map(|child| child.map_embeds(f))
                    .collect();
                ViewNode::Element(element)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Element, Tag, ViewNode};
    use serde_json::json;

    #[test]
    fn test_serialize() {
        let node: ViewNode = Element::new(Tag::H2)
            .key(3)
            .child(ViewNode::text("Title"))
            .into();
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "kind": "element",
                "tag": "h2",
                "key": 3,
                "children": [{ "kind": "text", "text": "Title" }]
            })
        );
    }

    #[test]
    fn test_heading_tags() {
        assert_eq!(Tag::heading(1), Some(Tag::H1));
        assert_eq!(Tag::heading(4), Some(Tag::H4));
        assert_eq!(Tag::heading(6), Some(Tag::H6));
        assert_eq!(Tag::heading(0), None);
        assert_eq!(Tag::heading(7), None);
    }

    #[test]
    fn test_text_content() {
        let node: ViewNode = Element::new(Tag::P)
            .child(ViewNode::text("a "))
            .child(Element::new(Tag::Strong).child(ViewNode::text("b")))
            .child(ViewNode::RawHtml {
                html: "<b>ignored</b>".into(),
            })
            .into();
        assert_eq!(node.text_content(), "a b");
    }
}
