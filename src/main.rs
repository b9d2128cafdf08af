use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use grace::config::{Flags, Setup};
use grace::embed::{CallbackClient, DocumentHead, EmbedBridge, ResourceLoader};
use grace::render::view::ViewNode;
use grace::{Document, Renderer};
use std::collections::HashMap;
use std::sync::Arc;
use structopt::StructOpt;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            #[cfg(debug_assertions)]
            "warn,grace=trace",
            #[cfg(not(debug_assertions))]
            "warn,grace=info",
        )
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .init();
}

async fn read_document(setup: &Setup) -> Result<Document> {
    let input = match &setup.document {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("Could not read {}", path.display()))?,
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .wrap_err("Could not read stdin")?;
            input
        }
    };
    Document::from_json(&input).wrap_err("Could not parse document")
}

#[cfg(feature = "fetch")]
fn make_loader(
    setup: &Setup,
    head: Arc<DocumentHead>,
    callbacks: CallbackClient,
) -> Result<Arc<dyn ResourceLoader>> {
    let loader = grace::embed::fetch::JsonpLoader::new(head, callbacks, setup.embed.timeout)
        .wrap_err("Could not set up the HTTP client")?;
    Ok(Arc::new(loader))
}

#[cfg(not(feature = "fetch"))]
fn make_loader(
    _setup: &Setup,
    head: Arc<DocumentHead>,
    _callbacks: CallbackClient,
) -> Result<Arc<dyn ResourceLoader>> {
    tracing::warn!("Built without the `fetch` feature, gists will time out");
    Ok(head)
}

/// Mount all gists of `view`, wait for them and swap in their content
async fn resolve_embeds(setup: &Setup, view: ViewNode) -> Result<ViewNode> {
    let head = Arc::new(DocumentHead::default());
    let callbacks = CallbackClient::spawn_shared();
    let loader = make_loader(setup, head.clone(), callbacks.clone())?;
    let bridge = EmbedBridge::new(callbacks, loader, setup.embed.clone());

    let mut mounted = bridge
        .mount_all(&view)
        .await
        .wrap_err("Could not mount gists")?;
    info!("Waiting for {} gists", mounted.len());

    let mut views = HashMap::new();
    for gist in mounted.iter_mut() {
        gist.settled().await;
        views.insert(gist.key(), gist.view());
    }

    let stylesheets = head.stylesheets();
    if !stylesheets.is_empty() {
        info!("Gists need these stylesheets: {:?}", stylesheets);
    }
    for gist in mounted {
        gist.unmount().await;
    }

    Ok(view.map_embeds(&mut |embed| {
        views
            .remove(&embed.key)
            .unwrap_or_else(|| ViewNode::Embed(embed.clone()))
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    color_eyre::install()?;

    let flags = Flags::from_args();
    let setup = flags.load_cfg().await?;

    let document = read_document(&setup).await?;
    let renderer = Renderer::from(setup.render.clone());
    let mut view = match renderer.render(Some(&document), None) {
        Some(view) => view,
        None => return Ok(()),
    };

    let gists = document.gists().count();
    if setup.fetch && gists > 0 {
        info!("Document embeds {} gists", gists);
        view = resolve_embeds(&setup, view).await?;
    }

    let json = serde_json::to_string_pretty(&view).wrap_err("Could not serialize view")?;
    println!("{}", json);
    Ok(())
}
