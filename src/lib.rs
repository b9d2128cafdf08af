//! # grace
//!
//! Renders rich-text documents (a JSON tree of paragraphs, headers, lists,
//! code and terminal blocks, images and gist embeds) into a view tree that a
//! host application can display.
//!
//! ```
//! use grace::model::Document;
//! use grace::render::render;
//!
//! let doc = Document::from_json(r#"{"children": [
//!     {"type": "HEADER", "data": {"size": 1, "value": "Hello"}}
//! ]}"#).unwrap();
//! let view = render(Some(&doc), None).unwrap();
//! assert_eq!(view.text_content(), "Hello");
//! ```
pub mod config;
pub mod embed;
pub mod model;
pub mod render;
pub mod util;

pub use model::Document;
pub use render::{render, Renderer};
