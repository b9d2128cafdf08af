//! # Fetching JSONP scripts without a browser
//!
//! [`JsonpLoader`] records resources in a [`DocumentHead`] like any other
//! loader, but also downloads each script and "runs" it: the body is
//! expected to be `callback_name({...})`, which is routed to the callback
//! server just like a browser would call the global function.
use super::callbacks::{CallbackClient, CallbackId, GistPayload};
use super::loader::{DocumentHead, ResourceLoader};
use displaydoc::Display;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

/// Error when running a JSONP script
#[derive(Debug, Error, Display)]
pub enum JsonpError {
    /// Request failed: {0}
    Http(#[from] reqwest::Error),
    /// Script is not a single callback invocation
    NotACall,
    /// Callback argument is not a gist payload: {0}
    Payload(#[from] serde_json::Error),
}

/// Split `name({...});` into the callback name and its parsed argument
pub fn parse_jsonp(script: &str) -> Result<(&str, GistPayload), JsonpError> {
    let script = script.trim().trim_end_matches(';').trim_end();
    let open = script.find('(').ok_or(JsonpError::NotACall)?;
    if !script.ends_with(')') {
        return Err(JsonpError::NotACall);
    }
    let name = script[..open].trim();
    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if !valid_name {
        return Err(JsonpError::NotACall);
    }
    let argument = &script[open + 1..script.len() - 1];
    let payload = serde_json::from_str(argument)?;
    Ok((name, payload))
}

/// A loader that actually fetches the JSONP scripts it is asked to load
///
/// Each script is fetched on its own task, which `unload` aborts if the
/// request is still running.
#[derive(Debug, Clone)]
pub struct JsonpLoader {
    head: Arc<DocumentHead>,
    callbacks: CallbackClient,
    http: reqwest::Client,
    running: Arc<Mutex<HashMap<CallbackId, JoinHandle<()>>>>,
}

impl JsonpLoader {
    /// Create a loader whose requests give up after `timeout`
    pub fn new(
        head: Arc<DocumentHead>,
        callbacks: CallbackClient,
        timeout: Duration,
    ) -> Result<Self, JsonpError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            head,
            callbacks,
            http,
            running: Arc::default(),
        })
    }

    fn running(&self) -> MutexGuard<'_, HashMap<CallbackId, JoinHandle<()>>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(http: &reqwest::Client, src: &str) -> Result<String, JsonpError> {
        let response = http.get(src).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn run_script(
        http: reqwest::Client,
        callbacks: CallbackClient,
        owner: CallbackId,
        src: String,
    ) {
        let name = owner.to_string();
        let outcome = match Self::fetch(&http, &src).await {
            Ok(body) => match parse_jsonp(&body) {
                Ok((called, payload)) if called == name => callbacks.invoke(&name, payload).await,
                Ok((called, _)) => {
                    warn!("Script for {} called {} instead", name, called);
                    callbacks.fail(&name, format!("script called {}", called)).await
                }
                Err(e) => callbacks.fail(&name, e.to_string()).await,
            },
            Err(e) => {
                error!("Could not load {}: {}", src, e);
                callbacks.fail(&name, e.to_string()).await
            }
        };
        if let Err(e) = outcome {
            debug!("Result for {} was not delivered: {}", name, e);
        }
    }
}

impl ResourceLoader for JsonpLoader {
    fn load_script(&self, owner: CallbackId, src: &str) {
        self.head.load_script(owner, src);
        let task = tokio::spawn(Self::run_script(
            self.http.clone(),
            self.callbacks.clone(),
            owner,
            src.to_owned(),
        ));
        if let Some(previous) = self.running().insert(owner, task) {
            previous.abort();
        }
    }

    fn load_stylesheet(&self, owner: CallbackId, href: &str) {
        self.head.load_stylesheet(owner, href);
    }

    fn unload(&self, owner: CallbackId) {
        if let Some(task) = self.running().remove(&owner) {
            trace!("Stopping the script of {}", owner);
            task.abort();
        }
        self.head.unload(owner);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_jsonp, JsonpError, JsonpLoader};
    use crate::embed::{CallbackClient, DocumentHead, EmbedBridge, EmbedOptions, EmbedState};
    use crate::model::{GistData, GistSource};
    use crate::render::view::EmbedView;
    use crate::util::Counter;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    const STYLESHEET: &str = "https://github.githubassets.com/gist-embed.css";

    fn gist() -> EmbedView {
        EmbedView {
            key: 0,
            gist: GistData {
                source: GistSource::parse("octocat/1").unwrap(),
                file: None,
            },
        }
    }

    fn script(name: &str) -> String {
        let payload = json!({ "div": "<div class=\"gist\"></div>", "stylesheet": STYLESHEET });
        format!("{}({});", name, payload)
    }

    /// Read a request head and return the callback name it asks for
    async fn read_callback(socket: &mut TcpStream) -> String {
        let mut request: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
        }
        let request = String::from_utf8_lossy(&request);
        request
            .split("callback=")
            .nth(1)
            .and_then(|rest| rest.split(|c: char| c == '&' || c == ' ').next())
            .unwrap_or_default()
            .to_owned()
    }

    /// Serve one response per connection, built from the requested callback name
    async fn serve<F>(respond: F) -> String
    where
        F: Fn(&str) -> (&'static str, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let name = read_callback(&mut socket).await;
                let (status, body) = respond(&name);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/javascript\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        endpoint
    }

    fn bridge(endpoint: String) -> (EmbedBridge, Arc<DocumentHead>) {
        let head = Arc::new(DocumentHead::default());
        let callbacks = CallbackClient::spawn(Counter::default());
        let loader =
            JsonpLoader::new(head.clone(), callbacks.clone(), Duration::from_secs(5)).unwrap();
        let options = EmbedOptions {
            endpoint,
            timeout: Duration::from_secs(5),
        };
        (EmbedBridge::new(callbacks, Arc::new(loader), options), head)
    }

    #[tokio::test]
    async fn test_fetched_script_reaches_its_callback() {
        let endpoint = serve(|name| ("200 OK", script(name))).await;
        let (bridge, head) = bridge(endpoint);
        let mut mounted = bridge.mount(&gist()).await.unwrap();

        assert_eq!(
            mounted.settled().await,
            EmbedState::ContentInjected {
                html: "<div class=\"gist\"></div>".into()
            }
        );
        assert_eq!(head.stylesheets(), vec![STYLESHEET.to_owned()]);

        mounted.unmount().await;
        assert!(head.is_empty());
    }

    #[tokio::test]
    async fn test_script_calling_another_name_fails() {
        let endpoint = serve(|_| ("200 OK", script("embed_gist_callback_999"))).await;
        let (bridge, head) = bridge(endpoint);
        let mut mounted = bridge.mount(&gist()).await.unwrap();

        match mounted.settled().await {
            EmbedState::EmbedFailed { reason } => {
                assert!(reason.contains("embed_gist_callback_999"), "{}", reason)
            }
            other => panic!("expected a failure, got {:?}", other),
        }
        assert!(head.stylesheets().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_fails_the_embed() {
        let endpoint = serve(|_| ("404 Not Found", String::new())).await;
        let (bridge, head) = bridge(endpoint);
        let mut mounted = bridge.mount(&gist()).await.unwrap();

        assert!(matches!(
            mounted.settled().await,
            EmbedState::EmbedFailed { .. }
        ));
        assert!(head.stylesheets().is_empty());
    }

    #[tokio::test]
    async fn test_unmount_stops_a_hanging_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let (requested_tx, requested_rx) = oneshot::channel();
        let (closed_tx, closed_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_callback(&mut socket).await;
            let _ = requested_tx.send(());
            // never answer, just wait for the client to hang up
            let mut rest = [0u8; 64];
            while let Ok(n) = socket.read(&mut rest).await {
                if n == 0 {
                    break;
                }
            }
            let _ = closed_tx.send(());
        });

        let (bridge, head) = bridge(endpoint);
        let mounted = bridge.mount(&gist()).await.unwrap();
        requested_rx.await.unwrap();
        assert_eq!(mounted.state(), EmbedState::PlaceholderRendered);

        mounted.unmount().await;
        assert!(head.is_empty());
        assert!(timeout(Duration::from_secs(2), closed_rx).await.is_ok());
    }

    #[test]
    fn test_parse_jsonp() {
        let script = r#"embed_gist_callback_3({"div":"<div id=\"gist1\"></div>","stylesheet":"https://github.githubassets.com/gist-embed.css","description":"x"});"#;
        let (name, payload) = parse_jsonp(script).unwrap();
        assert_eq!(name, "embed_gist_callback_3");
        assert_eq!(payload.div, "<div id=\"gist1\"></div>");
        assert_eq!(
            payload.stylesheet,
            "https://github.githubassets.com/gist-embed.css"
        );
    }

    #[test]
    fn test_parse_jsonp_rejects_other_scripts() {
        assert!(matches!(
            parse_jsonp("alert(document.cookie) + 1"),
            Err(JsonpError::NotACall)
        ));
        assert!(matches!(
            parse_jsonp("window.x = 1"),
            Err(JsonpError::NotACall)
        ));
        assert!(matches!(
            parse_jsonp("a.b({\"div\": \"\", \"stylesheet\": \"\"})"),
            Err(JsonpError::NotACall)
        ));
        assert!(matches!(
            parse_jsonp("cb({\"div\": 1})"),
            Err(JsonpError::Payload(_))
        ));
    }
}
