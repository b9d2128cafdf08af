//! One renderer per block type

use super::rich_text::render_rich_text;
use super::view::{Element, EmbedView, Tag, ViewNode};
use crate::model::{GistData, HeaderData, ImageData, Inline, Line, ListItem, TerminalData};
use tracing::warn;

pub const CODE_CLASS: &str = "grace-code";
pub const CODE_LIST_CLASS: &str = "grace-code-list";
pub const DEFAULT_PROMPT: &str = "$";

pub fn paragraph(children: &[Inline], index: usize) -> ViewNode {
    Element::new(Tag::P)
        .key(index)
        .children(render_rich_text(children))
        .into()
}

/// Heading levels outside of `1..=6` are clamped to the nearest valid one
pub fn heading_level(size: i64) -> u8 {
    let level = size.clamp(1, 6) as u8;
    if i64::from(level) != size {
        warn!("Header size {} out of range, using h{}", size, level);
    }
    level
}

pub fn header(data: &HeaderData, index: usize) -> ViewNode {
    let tag = Tag::heading(heading_level(data.size)).unwrap_or(Tag::H6);
    Element::new(tag)
        .key(index)
        .child(ViewNode::text(data.value.as_str()))
        .into()
}

pub fn note(children: &[Inline], index: usize) -> ViewNode {
    Element::new(Tag::Section)
        .key(index)
        .child(Element::new(Tag::P).children(render_rich_text(children)))
        .into()
}

pub fn image(data: &ImageData, index: usize) -> ViewNode {
    Element::new(Tag::Img)
        .key(index)
        .attr("src", data.resource.as_str())
        .attr("alt", data.caption.as_str())
        .into()
}

fn list(tag: Tag, items: &[ListItem], index: usize) -> ViewNode {
    let items = items.iter().enumerate().map(|(i, item)| {
        Element::new(Tag::Li)
            .key(i)
            .children(render_rich_text(&item.children))
            .into()
    });
    Element::new(tag).key(index).children(items).into()
}

pub fn unordered_list(items: &[ListItem], index: usize) -> ViewNode {
    list(Tag::Ul, items, index)
}

pub fn ordered_list(items: &[ListItem], index: usize) -> ViewNode {
    list(Tag::Ol, items, index)
}

/// Each line is followed by a break; `trailing_break` decides whether the
/// last line gets one too
pub fn code(lines: &[Line], index: usize, trailing_break: bool) -> ViewNode {
    let mut content = Vec::with_capacity(lines.len() * 2);
    for (i, line) in lines.iter().enumerate() {
        content.push(ViewNode::text(line.value.as_str()));
        if trailing_break || i + 1 < lines.len() {
            content.push(Element::new(Tag::Br).key(i).into());
        }
    }
    Element::new(Tag::Div)
        .key(index)
        .child(Element::new(Tag::Pre).class(CODE_CLASS).children(content))
        .into()
}

pub fn terminal(data: &TerminalData, lines: &[Line], index: usize) -> ViewNode {
    let prompt = data.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);
    let items = lines.iter().enumerate().map(|(i, line)| {
        Element::new(Tag::Li)
            .key(i)
            .attr("prefix", prompt)
            .child(ViewNode::text(line.value.as_str()))
            .into()
    });
    Element::new(Tag::Div)
        .key(index)
        .child(
            Element::new(Tag::Pre)
                .class(CODE_CLASS)
                .child(Element::new(Tag::Ul).class(CODE_LIST_CLASS).children(items)),
        )
        .into()
}

pub fn gist(data: &GistData, index: usize) -> ViewNode {
    ViewNode::Embed(EmbedView {
        key: index,
        gist: data.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GistSource;
    use rstest::rstest;

    fn lines(values: &[&str]) -> Vec<Line> {
        values
            .iter()
            .map(|v| Line {
                value: (*v).to_owned(),
            })
            .collect()
    }

    fn prompts(node: &ViewNode) -> Vec<String> {
        let pre = &node.as_element().unwrap().children[0];
        let ul = &pre.as_element().unwrap().children[0];
        ul.as_element()
            .unwrap()
            .children
            .iter()
            .map(|li| li.as_element().unwrap().attrs["prefix"].clone())
            .collect()
    }

    #[rstest]
    #[case(2, Tag::H2)]
    #[case(1, Tag::H1)]
    #[case(6, Tag::H6)]
    #[case(0, Tag::H1)]
    #[case(-4, Tag::H1)]
    #[case(7, Tag::H6)]
    #[case(1000, Tag::H6)]
    fn test_header_level(#[case] size: i64, #[case] expected: Tag) {
        let data = HeaderData {
            size,
            value: "Title".into(),
        };
        let node = header(&data, 0);
        let element = node.as_element().unwrap();
        assert_eq!(element.tag, expected);
        assert_eq!(node.text_content(), "Title");
    }

    #[test]
    fn test_note_is_a_callout() {
        let node = note(&[Inline::Text { value: "hi".into() }], 4);
        let section = node.as_element().unwrap();
        assert_eq!(section.tag, Tag::Section);
        assert_eq!(section.key, Some(4));
        let p = section.children[0].as_element().unwrap();
        assert_eq!(p.tag, Tag::P);
        assert_eq!(node.text_content(), "hi");
    }

    #[test]
    fn test_image() {
        let node = image(
            &ImageData {
                resource: "https://example.com/cat.png".into(),
                caption: "A cat".into(),
            },
            1,
        );
        let img = node.as_element().unwrap();
        assert_eq!(img.tag, Tag::Img);
        assert_eq!(img.attrs["src"], "https://example.com/cat.png");
        assert_eq!(img.attrs["alt"], "A cat");
        assert!(img.children.is_empty());
    }

    #[test]
    fn test_ordered_list_keeps_items_in_order() {
        let items: Vec<ListItem> = ["one", "two", "three"]
            .iter()
            .map(|v| ListItem {
                children: vec![Inline::Text {
                    value: (*v).to_owned(),
                }],
            })
            .collect();
        let node = ordered_list(&items, 0);
        let ol = node.as_element().unwrap();
        assert_eq!(ol.tag, Tag::Ol);
        assert_eq!(ol.children.len(), 3);
        for (i, (li, text)) in ol.children.iter().zip(&["one", "two", "three"]).enumerate() {
            assert_eq!(li.as_element().unwrap().tag, Tag::Li);
            assert_eq!(li.as_element().unwrap().key, Some(i));
            assert_eq!(li.text_content(), *text);
        }

        assert_eq!(unordered_list(&items, 0).as_element().unwrap().tag, Tag::Ul);
    }

    #[test]
    fn test_code_breaks() {
        let with = code(&lines(&["a", "b"]), 0, true);
        let pre = with.as_element().unwrap().children[0].as_element().unwrap();
        assert_eq!(pre.class.as_deref(), Some(CODE_CLASS));
        let tags: Vec<Option<Tag>> = pre
            .children
            .iter()
            .map(|c| c.as_element().map(|e| e.tag))
            .collect();
        assert_eq!(tags, vec![None, Some(Tag::Br), None, Some(Tag::Br)]);

        let without = code(&lines(&["a", "b"]), 0, false);
        let pre = without.as_element().unwrap().children[0].as_element().unwrap();
        assert_eq!(pre.children.len(), 3);
        assert_eq!(without.text_content(), "ab");
    }

    #[test]
    fn test_terminal_prompts() {
        let default = terminal(&TerminalData::default(), &lines(&["ls", "pwd"]), 0);
        assert_eq!(prompts(&default), vec!["$", "$"]);

        let root = terminal(
            &TerminalData {
                prompt: Some("#".into()),
            },
            &lines(&["whoami", "id", "exit"]),
            0,
        );
        assert_eq!(prompts(&root), vec!["#", "#", "#"]);
        assert_eq!(root.text_content(), "whoamiidexit");
    }

    #[test]
    fn test_gist_is_an_embed_leaf() {
        let data = GistData {
            source: GistSource::parse("octocat/1").unwrap(),
            file: Some("hello.rs".into()),
        };
        match gist(&data, 5) {
            ViewNode::Embed(embed) => {
                assert_eq!(embed.key, 5);
                assert_eq!(embed.gist, data);
            }
            other => panic!("expected an embed, got {:?}", other),
        }
    }
}
