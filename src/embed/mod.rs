//! # Third-party gist embeds
//!
//! Mounting a gist renders a placeholder right away and then, off the render
//! path, registers a JSONP callback, asks the [`ResourceLoader`] to load the
//! gist script and waits for the script to call back with the gist's HTML.
//!
//! ```text
//! mount ─▶ PlaceholderRendered ─┬─▶ ContentInjected
//!                               └─▶ EmbedFailed
//! ```
//!
//! Both outcomes are final. Unmounting (or dropping the [`MountedGist`])
//! cancels the callback and unloads everything the embed added to the head.
pub mod callbacks;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod loader;

pub use callbacks::{CallbackClient, CallbackError, CallbackId, Completion, GistPayload};
pub use loader::{DocumentHead, HeadElement, ResourceLoader};

use crate::model::GistData;
use crate::render::view::{Element, EmbedView, Tag, ViewNode};
use derive_new::new;
use displaydoc::Display;
use futures_util::future::{select, Either};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_GIST_ENDPOINT: &str = "https://gist.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Class of the inner `div` of an embed that could not be loaded
pub const FAILED_CLASS: &str = "grace-gist-failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedState {
    PlaceholderRendered,
    ContentInjected { html: String },
    EmbedFailed { reason: String },
}

impl EmbedState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, EmbedState::PlaceholderRendered)
    }
}

/// Error when mounting an embed
#[derive(Debug, Error, Display)]
pub enum EmbedError {
    /// Could not register a callback: {0}
    Callback(#[from] CallbackError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Base URL of the gist host
    pub endpoint: String,
    /// How long to wait for the callback before giving up
    pub timeout: Duration,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GIST_ENDPOINT.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Mounts gist embeds and shares one callback server and loader among them
#[derive(Clone, new)]
pub struct EmbedBridge {
    callbacks: CallbackClient,
    loader: Arc<dyn ResourceLoader>,
    options: EmbedOptions,
}

impl fmt::Debug for EmbedBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedBridge")
            .field("callbacks", &self.callbacks)
            .field("options", &self.options)
            .finish()
    }
}

impl EmbedBridge {
    pub fn callbacks(&self) -> &CallbackClient {
        &self.callbacks
    }

    /// The JSONP URL for `gist` that calls back to `id`
    pub fn gist_url(&self, gist: &GistData, id: CallbackId) -> String {
        let mut url = format!(
            "{}/{}/{}.json?callback={}",
            self.options.endpoint.trim_end_matches('/'),
            urlencoding::encode(&gist.source.owner),
            urlencoding::encode(&gist.source.id),
            id
        );
        if let Some(file) = &gist.file {
            url.push_str("&file=");
            url.push_str(&urlencoding::encode(file));
        }
        url
    }

    /// Mount an embed leaf produced by the renderer
    pub async fn mount(&self, embed: &EmbedView) -> Result<MountedGist, EmbedError> {
        let registration = self.callbacks.register().await?;
        let id = registration.id;
        let url = self.gist_url(&embed.gist, id);
        info!("Mounting gist {} as {}", embed.gist.source, id);

        let (state_tx, state_rx) = watch::channel(EmbedState::PlaceholderRendered);
        let (ter_tx, ter_rx) = oneshot::channel::<()>();

        self.loader.load_script(id, &url);

        let task = tokio::spawn(drive(
            id,
            registration.completion,
            ter_rx,
            state_tx,
            self.loader.clone(),
            self.callbacks.clone(),
            self.options.timeout,
        ));

        Ok(MountedGist {
            id,
            key: embed.key,
            url,
            state: state_rx,
            teardown: ter_tx,
            task,
        })
    }

    /// Mount every embed in a rendered view tree, in document order
    pub async fn mount_all(&self, view: &ViewNode) -> Result<Vec<MountedGist>, EmbedError> {
        let mut mounted = Vec::new();
        for embed in view.embeds() {
            mounted.push(self.mount(embed).await?);
        }
        Ok(mounted)
    }
}

async fn cancel(callbacks: &CallbackClient, id: CallbackId) {
    if let Err(e) = callbacks.cancel(id).await {
        error!("Could not cancel {}: {}", id, e);
    }
}

/// The lifecycle of one mounted embed
async fn drive(
    id: CallbackId,
    completion: oneshot::Receiver<Completion>,
    teardown: oneshot::Receiver<()>,
    state: watch::Sender<EmbedState>,
    loader: Arc<dyn ResourceLoader>,
    callbacks: CallbackClient,
    timeout: Duration,
) {
    let waiting = Box::pin(time::timeout(timeout, completion));
    match select(teardown, waiting).await {
        Either::Left((_, _waiting)) => {
            debug!("{} unmounted before its payload arrived", id);
            cancel(&callbacks, id).await;
        }
        Either::Right((outcome, teardown)) => {
            // The completion is a oneshot, so this runs at most once per embed
            let next = match outcome {
                Ok(Ok(Ok(payload))) => {
                    loader.load_stylesheet(id, &payload.stylesheet);
                    info!("{} received its content", id);
                    EmbedState::ContentInjected { html: payload.div }
                }
                Ok(Ok(Err(reason))) => {
                    warn!("{} failed: {}", id, reason);
                    EmbedState::EmbedFailed { reason }
                }
                Ok(Err(_)) => EmbedState::EmbedFailed {
                    reason: String::from("callback was dropped"),
                },
                Err(_) => {
                    warn!("{} timed out after {:?}", id, timeout);
                    EmbedState::EmbedFailed {
                        reason: format!("no response within {:?}", timeout),
                    }
                }
            };
            cancel(&callbacks, id).await;
            if state.send(next).is_err() {
                trace!("Nobody is watching {} anymore", id);
            }
            let _ = teardown.await;
        }
    }

    loader.unload(id);
    trace!("{} cleaned up", id);
}

/// A gist embed that is (or was) waiting for its content
#[derive(Debug)]
pub struct MountedGist {
    id: CallbackId,
    key: usize,
    url: String,
    state: watch::Receiver<EmbedState>,
    teardown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl MountedGist {
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// The key of the embed leaf this was mounted from
    pub fn key(&self) -> usize {
        self.key
    }

    /// The script URL that was requested
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> EmbedState {
        self.state.borrow().clone()
    }

    /// Wait until the embed has either its content or has failed
    pub async fn settled(&mut self) -> EmbedState {
        loop {
            let current = self.state();
            if current.is_settled() {
                return current;
            }
            if self.state.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// The view for the current state
    pub fn view(&self) -> ViewNode {
        let inner = match &*self.state.borrow() {
            EmbedState::PlaceholderRendered => Element::new(Tag::Div),
            EmbedState::ContentInjected { html } => {
                Element::new(Tag::Div).child(ViewNode::RawHtml { html: html.clone() })
            }
            EmbedState::EmbedFailed { .. } => Element::new(Tag::Div).class(FAILED_CLASS),
        };
        Element::new(Tag::Div).key(self.key).child(inner).into()
    }

    /// Tear the embed down and wait until its resources are gone
    pub async fn unmount(self) {
        let _ = self.teardown.send(());
        if let Err(e) = self.task.await {
            error!("Embed {} did not shut down cleanly: {}", self.id, e);
        }
    }
}
