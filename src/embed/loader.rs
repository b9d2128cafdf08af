//! # Document head resources
//!
//! Embeds need a script to be loaded (the JSONP request) and a stylesheet to
//! be attached. Both go through a [`ResourceLoader`], and everything a
//! loader adds on behalf of an embed is removed again by `unload`.
use super::callbacks::CallbackId;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// An element that was added to the document head
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeadElement {
    Script { owner: u64, src: String },
    Stylesheet { owner: u64, href: String },
}

impl HeadElement {
    pub fn owner(&self) -> CallbackId {
        match self {
            HeadElement::Script { owner, .. } | HeadElement::Stylesheet { owner, .. } => {
                CallbackId::from(*owner)
            }
        }
    }
}

pub trait ResourceLoader: Send + Sync {
    /// Load the script at `src` on behalf of the embed `owner`
    fn load_script(&self, owner: CallbackId, src: &str);
    /// Attach the stylesheet at `href` on behalf of the embed `owner`
    fn load_stylesheet(&self, owner: CallbackId, href: &str);
    /// Remove everything that was loaded for `owner`
    fn unload(&self, owner: CallbackId);
}

/// An in-memory document head
///
/// Records what would have been inserted into a page, which is all a
/// renderer without a browser can do with scripts and stylesheets.
#[derive(Debug, Default)]
pub struct DocumentHead {
    elements: Mutex<Vec<HeadElement>>,
}

impl DocumentHead {
    fn lock(&self) -> MutexGuard<'_, Vec<HeadElement>> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, element: HeadElement) {
        let mut elements = self.lock();
        if elements.contains(&element) {
            trace!("Already loaded: {:?}", element);
        } else {
            elements.push(element);
        }
    }

    /// A snapshot of the current head, in insertion order
    pub fn elements(&self) -> Vec<HeadElement> {
        self.lock().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                HeadElement::Script { src, .. } => Some(src.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn stylesheets(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                HeadElement::Stylesheet { href, .. } => Some(href.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl ResourceLoader for DocumentHead {
    fn load_script(&self, owner: CallbackId, src: &str) {
        self.insert(HeadElement::Script {
            owner: owner.int_val(),
            src: src.to_owned(),
        });
    }

    fn load_stylesheet(&self, owner: CallbackId, href: &str) {
        self.insert(HeadElement::Stylesheet {
            owner: owner.int_val(),
            href: href.to_owned(),
        });
    }

    fn unload(&self, owner: CallbackId) {
        self.lock().retain(|e| e.owner() != owner);
    }
}
