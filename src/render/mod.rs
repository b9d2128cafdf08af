//! # Rendering documents
//!
//! The renderer walks a [`Document`] and turns each block into a view node.
//! It never touches shared state, so one renderer can be used from many
//! threads at once. Gists are the exception to "render means done": they are
//! emitted as [`EmbedView`](view::EmbedView) leaves which the host mounts on
//! an [`EmbedBridge`](crate::embed::EmbedBridge).
pub mod blocks;
pub mod rich_text;
pub mod view;

use crate::model::{Block, Document};
use tracing::trace;
use view::{Element, Tag, ViewNode};

pub use rich_text::{render_inline, render_rich_text};

/// The class of the outer container if the caller does not pick one
pub const DEFAULT_CONTAINER_CLASS: &str = "grace-general";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Class of the outer container when `render` is not given one
    pub container_class: String,
    /// Emit a line break after the last line of a code block
    pub code_trailing_break: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            container_class: DEFAULT_CONTAINER_CLASS.to_owned(),
            code_trailing_break: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl From<RenderOptions> for Renderer {
    fn from(options: RenderOptions) -> Self {
        Self { options }
    }
}

/// Render a document with the default options
pub fn render(document: Option<&Document>, container_class: Option<&str>) -> Option<ViewNode> {
    Renderer::default().render(document, container_class)
}

impl Renderer {
    /// Render a whole document into a container `div`
    ///
    /// Returns `None` if there is no document to render.
    pub fn render(
        &self,
        document: Option<&Document>,
        container_class: Option<&str>,
    ) -> Option<ViewNode> {
        let document = document?;
        let class = container_class.unwrap_or(self.options.container_class.as_str());
        let container = Element::new(Tag::Div)
            .class(class)
            .children(self.render_blocks(&document.children));
        Some(container.into())
    }

    /// Render blocks in order, dropping the ones that are not supported
    pub fn render_blocks(&self, blocks: &[Block]) -> Vec<ViewNode> {
        blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| self.render_block(block, index))
            .collect()
    }

    /// Render the block at `index`, or `None` if its type is not supported
    pub fn render_block(&self, block: &Block, index: usize) -> Option<ViewNode> {
        let node = match block {
            Block::Paragraph { children } => blocks::paragraph(children, index),
            Block::Header { data } => blocks::header(data, index),
            Block::Note { children } => blocks::note(children, index),
            Block::Image { data } => blocks::image(data, index),
            Block::UnorderedList { children } => blocks::unordered_list(children, index),
            Block::OrderedList { children } => blocks::ordered_list(children, index),
            Block::Code { children } => {
                blocks::code(children, index, self.options.code_trailing_break)
            }
            Block::Terminal { data, children } => blocks::terminal(data, children, index),
            Block::Gist { data } => blocks::gist(data, index),
            Block::Unsupported { tag } => {
                trace!("Skipping unsupported block {:?} at {}", tag, index);
                return None;
            }
        };
        Some(node)
    }
}
