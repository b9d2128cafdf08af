//! # Callback correlation
//!
//! A JSONP response is a script that calls a function by name. This module
//! hands out those names and keeps track of which mounted embed is waiting
//! for which name. The `CallbackServer` owns the map and answers the
//! `CallbackRequest`s that `CallbackClient` handles send to it.
use crate::util::{IdGenerator, SharedCounter};
use displaydoc::Display;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

const CALLBACK_PREFIX: &str = "embed_gist_callback_";

/// ID of a pending JSONP callback
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl CallbackId {
    /// Integer value
    pub fn int_val(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CALLBACK_PREFIX, self.0)
    }
}

impl From<CallbackId> for u64 {
    fn from(c_id: CallbackId) -> u64 {
        c_id.0
    }
}

impl From<u64> for CallbackId {
    fn from(id: u64) -> CallbackId {
        CallbackId(id)
    }
}

impl FromStr for CallbackId {
    type Err = CallbackError;
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        name.strip_prefix(CALLBACK_PREFIX)
            .and_then(|n| n.parse().ok())
            .map(CallbackId)
            .ok_or_else(|| CallbackError::UnknownCallback(name.to_owned()))
    }
}

/// The argument the gist host passes to the callback
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GistPayload {
    /// The rendered gist, as an HTML fragment
    pub div: String,
    /// The stylesheet the fragment needs
    pub stylesheet: String,
}

/// What a registered callback eventually receives
pub type Completion = Result<GistPayload, String>;

/// A freshly registered callback
#[derive(Debug)]
pub struct Registration {
    pub id: CallbackId,
    pub completion: oneshot::Receiver<Completion>,
}

/// Request to the callback server
#[derive(Debug)]
pub enum CallbackRequest {
    /// Allocate a new callback name
    Register {
        response: oneshot::Sender<Registration>,
    },
    /// Call the callback with the given name
    Invoke {
        name: String,
        outcome: Completion,
        response: oneshot::Sender<Result<(), CallbackError>>,
    },
    /// Forget about a callback, no matter whether it was called
    Cancel { id: CallbackId },
}

/// Error when talking to the callback server
#[derive(Debug, Error, Display)]
pub enum CallbackError {
    /// Recieving from the callback server failed
    RecvFailed(#[from] oneshot::error::RecvError),
    /// Sending to the callback server failed
    SendFailed(#[from] mpsc::error::SendError<CallbackRequest>),
    /// No callback {0:?} is waiting
    UnknownCallback(String),
    /// The embed waiting on {0} is gone
    Abandoned(CallbackId),
}

/// The task that owns all pending callbacks
pub struct CallbackServer {
    inner: mpsc::Receiver<CallbackRequest>,
    ids: Box<dyn IdGenerator<CallbackId>>,
    pending: HashMap<CallbackId, oneshot::Sender<Completion>>,
}

impl fmt::Debug for CallbackServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackServer")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl CallbackServer {
    pub fn new<G>(inner: mpsc::Receiver<CallbackRequest>, ids: G) -> Self
    where
        G: IdGenerator<CallbackId> + 'static,
    {
        Self {
            inner,
            ids: Box::new(ids),
            pending: HashMap::new(),
        }
    }

    /// Number of callbacks that are still waiting
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn handle_request(&mut self, request: CallbackRequest) {
        match request {
            CallbackRequest::Register { response } => {
                let id = self.ids.next_id();
                let (tx, rx) = oneshot::channel();
                if self.pending.insert(id, tx).is_some() {
                    warn!("Id generator handed out {} twice", id);
                }
                let registration = Registration { id, completion: rx };
                if let Err(registration) = response.send(registration) {
                    debug!("Embed dropped while registering {}", registration.id);
                    self.pending.remove(&registration.id);
                } else {
                    trace!("Registered {}", id);
                }
            }
            CallbackRequest::Invoke {
                name,
                outcome,
                response,
            } => {
                let res = self.invoke(name, outcome);
                if response.send(res).is_err() {
                    trace!("Caller went away before the invocation finished");
                }
            }
            CallbackRequest::Cancel { id } => {
                if self.pending.remove(&id).is_some() {
                    trace!("Cancelled {}", id);
                }
            }
        }
    }

    fn invoke(&mut self, name: String, outcome: Completion) -> Result<(), CallbackError> {
        let id: CallbackId = name.parse()?;
        let tx = self
            .pending
            .remove(&id)
            .ok_or(CallbackError::UnknownCallback(name))?;
        tx.send(outcome).map_err(|_| CallbackError::Abandoned(id))
    }

    /// The main loop of the server, runs until all clients are gone
    pub async fn run(mut self) {
        while let Some(request) = self.inner.recv().await {
            self.handle_request(request);
        }
        info!("All callback clients gone, {} left pending", self.pending());
    }
}

/// A handle to a callback server
#[derive(Debug, Clone)]
pub struct CallbackClient(mpsc::Sender<CallbackRequest>);

impl From<mpsc::Sender<CallbackRequest>> for CallbackClient {
    fn from(inner: mpsc::Sender<CallbackRequest>) -> Self {
        Self(inner)
    }
}

impl CallbackClient {
    /// Start a callback server on the current runtime and return a handle to it
    pub fn spawn<G>(ids: G) -> Self
    where
        G: IdGenerator<CallbackId> + 'static,
    {
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(CallbackServer::new(rx, ids).run());
        Self(tx)
    }

    /// Start a callback server whose ids are unique across the process
    ///
    /// Use this whenever more than one server hands out names for the same
    /// page, otherwise their callbacks and head resources collide.
    pub fn spawn_shared() -> Self {
        Self::spawn(SharedCounter::default())
    }

    /// Allocate a callback name and the receiver its payload will arrive on
    pub async fn register(&self) -> Result<Registration, CallbackError> {
        let (tx, rx) = oneshot::channel();
        self.0
            .send(CallbackRequest::Register { response: tx })
            .await?;
        Ok(rx.await?)
    }

    async fn deliver(&self, name: &str, outcome: Completion) -> Result<(), CallbackError> {
        let (tx, rx) = oneshot::channel();
        self.0
            .send(CallbackRequest::Invoke {
                name: name.to_owned(),
                outcome,
                response: tx,
            })
            .await?;
        rx.await?
    }

    /// Call the callback `name` with a payload, as the JSONP script would
    pub async fn invoke(&self, name: &str, payload: GistPayload) -> Result<(), CallbackError> {
        self.deliver(name, Ok(payload)).await
    }

    /// Tell the callback `name` that its script could not be loaded
    pub async fn fail<S: Into<String>>(&self, name: &str, reason: S) -> Result<(), CallbackError> {
        self.deliver(name, Err(reason.into())).await
    }

    /// Drop the callback `id`; later invocations of it are rejected
    pub async fn cancel(&self, id: CallbackId) -> Result<(), CallbackError> {
        self.0.send(CallbackRequest::Cancel { id }).await?;
        Ok(())
    }
}
