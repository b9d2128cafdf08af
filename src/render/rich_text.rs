use super::view::{Element, Tag, ViewNode};
use crate::model::Inline;
use tracing::trace;

/// Render one inline node, or `None` if its type is not supported
pub fn render_inline(inline: &Inline) -> Option<ViewNode> {
    let node = match inline {
        Inline::Text { value } => ViewNode::text(value.as_str()),
        Inline::Strong { value } => Element::new(Tag::Strong)
            .child(ViewNode::text(value.as_str()))
            .into(),
        Inline::Italic { value } => Element::new(Tag::I)
            .child(ViewNode::text(value.as_str()))
            .into(),
        Inline::Link { url, value } => Element::new(Tag::A)
            .attr("href", url.as_str())
            .child(ViewNode::text(value.as_str()))
            .into(),
        Inline::Unsupported { tag } => {
            trace!("Skipping unsupported inline node {:?}", tag);
            return None;
        }
    };
    Some(node)
}

/// Render a run of inline nodes into fragments, keeping their order
pub fn render_rich_text(inlines: &[Inline]) -> Vec<ViewNode> {
    inlines.iter().filter_map(render_inline).collect()
}

#[cfg(test)]
mod tests {
    use super::render_rich_text;
    use crate::model::Inline;
    use crate::render::view::{Element, Tag, ViewNode};

    #[test]
    fn test_fragments_in_order() {
        let inlines = vec![
            Inline::Text { value: "a".into() },
            Inline::Strong { value: "b".into() },
            Inline::Italic { value: "c".into() },
            Inline::Link {
                url: "u".into(),
                value: "d".into(),
            },
        ];

        assert_eq!(
            render_rich_text(&inlines),
            vec![
                ViewNode::text("a"),
                Element::new(Tag::Strong).child(ViewNode::text("b")).into(),
                Element::new(Tag::I).child(ViewNode::text("c")).into(),
                Element::new(Tag::A)
                    .attr("href", "u")
                    .child(ViewNode::text("d"))
                    .into(),
            ]
        );
    }

    #[test]
    fn test_unsupported_is_skipped() {
        let inlines = vec![
            Inline::Text { value: "x".into() },
            Inline::Unsupported {
                tag: "STRIKE".into(),
            },
            Inline::Text { value: "y".into() },
        ];
        assert_eq!(
            render_rich_text(&inlines),
            vec![ViewNode::text("x"), ViewNode::text("y")]
        );
        assert!(render_rich_text(&[]).is_empty());
    }
}
