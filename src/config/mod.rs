//! # Renderer configuration

use crate::embed::{EmbedOptions, DEFAULT_GIST_ENDPOINT};
use crate::render::{RenderOptions, DEFAULT_CONTAINER_CLASS};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;
use tokio::fs::read_to_string;
use tracing::instrument;

/// The commandline flags for the renderer
#[derive(Debug, StructOpt)]
#[structopt(name = "grace", about = "Render a rich-text document into a view tree")]
pub struct Flags {
    /// Which config file to use
    #[structopt(long = "cfg", short = "c")]
    pub cfg: Option<PathBuf>,
    /// Class of the outer container (overrides the config file)
    #[structopt(long = "class")]
    pub class: Option<String>,
    /// Fetch gist embeds and put their content into the output
    #[structopt(long = "fetch")]
    pub fetch: bool,
    /// How long to wait for each gist, in milliseconds (overrides the config file)
    #[structopt(long = "timeout")]
    pub timeout_ms: Option<u64>,
    /// The document to render (reads stdin if absent)
    #[structopt(parse(from_os_str))]
    pub document: Option<PathBuf>,
}

/// The setup that we are actually using
#[derive(Debug)]
pub struct Setup {
    pub render: RenderOptions,
    pub embed: EmbedOptions,
    /// Whether to fetch gists
    pub fetch: bool,
    /// Where to read the document from, `None` for stdin
    pub document: Option<PathBuf>,
}

/// The code block options
#[derive(Debug, Deserialize)]
pub struct Code {
    /// Whether the last line of a code block gets a line break, too
    #[serde(default = "default_true")]
    pub trailing_break: bool,
}

impl Default for Code {
    fn default() -> Self {
        Self {
            trailing_break: true,
        }
    }
}

/// The gist embed options
#[derive(Debug, Deserialize)]
pub struct Gist {
    /// Base URL of the gist host
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// How long to wait for a gist, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for Gist {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// A configuration for the renderer
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Class of the outer container
    #[serde(default)]
    pub container_class: Option<String>,
    /// The code block options
    #[serde(default)]
    pub code: Code,
    /// The gist options
    #[serde(default)]
    pub gist: Gist,
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_GIST_ENDPOINT.to_owned()
}

fn default_timeout_ms() -> u64 {
    crate::embed::DEFAULT_TIMEOUT.as_millis() as u64
}

impl Config {
    /// Turn the file configuration into a setup, with `flags` taking precedence
    pub fn into_setup(self, flags: &Flags) -> Setup {
        let container_class = flags
            .class
            .clone()
            .or(self.container_class)
            .unwrap_or_else(|| DEFAULT_CONTAINER_CLASS.to_owned());
        let timeout_ms = flags.timeout_ms.unwrap_or(self.gist.timeout_ms);
        Setup {
            render: RenderOptions {
                container_class,
                code_trailing_break: self.code.trailing_break,
            },
            embed: EmbedOptions {
                endpoint: self.gist.endpoint,
                timeout: Duration::from_millis(timeout_ms),
            },
            fetch: flags.fetch,
            document: flags.document.clone(),
        }
    }
}

impl Flags {
    #[instrument]
    /// Load the configuration from a file
    pub async fn load_cfg(&self) -> Result<Setup> {
        let config = if let Some(cfg) = &self.cfg {
            let cfg_string: String = read_to_string(cfg)
                .await
                .wrap_err("Could not read config file")?;
            toml::from_str(&cfg_string).wrap_err("Could not parse config file")?
        } else {
            Config::default()
        };
        Ok(config.into_setup(self))
    }
}
