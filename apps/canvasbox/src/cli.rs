//! # CLI Module
//!
//! Command-line interface for browsing chapters and rendering previews.
//!
//! Every command is a plain `cmd_*` function writing to a caller-provided
//! writer, so tests drive them without spawning the binary.

use crate::api::{self, ApiState};
use crate::client::ContentClient;
use crate::config::{
    BaseUrlOverride, Config, ENV_ENABLE_BASE_URL_EDITOR, ENV_ENABLE_LIVE_RELOAD,
};
use crate::live::LiveReload;
use crate::store::ChapterStore;
use canvasbox_core::{ContentLocator, DEFAULT_TEMPLATE, NodeKind, Theme, create_iframe_doc};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Result type of every command.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

// =============================================================================
// ARGUMENTS
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "canvasbox")]
#[command(about = "Browse chapter trees and preview chapter sandboxes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Chapters base URL (overrides environment and persisted override)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Page origin used to resolve a relative base URL
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Enable the live-reload channel
    #[arg(long, global = true)]
    pub live: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and print the resolved chapter tree
    Tree {
        /// Print JSON instead of an outline
        #[arg(long)]
        json: bool,
    },

    /// Print one node of the tree
    Show {
        /// Full entry of the node (e.g. /basics/triangle)
        full_entry: String,
    },

    /// Render the sandbox document of an instance
    Preview {
        /// Full entry of the instance
        full_entry: String,

        /// Use the dark theme
        #[arg(long)]
        dark: bool,

        /// Surface colour as an `r, g, b` triple
        #[arg(long)]
        surface: Option<String>,

        /// Template file (defaults to the built-in template)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Reload the tree on every rebuild pushed by the content server
    Watch,

    /// Run the preview server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Manage the persisted base URL override
    BaseUrl {
        #[command(subcommand)]
        action: BaseUrlAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum BaseUrlAction {
    /// Print the effective base URL
    Get,
    /// Persist a base URL override
    Set { url: String },
    /// Remove the persisted override
    Reset,
}

// =============================================================================
// SETUP
// =============================================================================

/// Read the environment and apply global flags.
pub fn load_config(cli: &Cli) -> CliResult<Config> {
    let mut config = Config::from_env()?;
    if let Some(origin) = &cli.origin {
        config.set_origin(origin)?;
    }
    if cli.live {
        config.enable_live_reload = true;
    }
    Ok(config)
}

/// Locator for `config`, with `base_url` taking precedence when given.
pub fn build_locator(config: &Config, base_url: Option<&str>) -> CliResult<ContentLocator> {
    match base_url {
        Some(url) => Ok(ContentLocator::new(url, config.origin.clone())),
        None => Ok(config.locator()?),
    }
}

// =============================================================================
// TREE / SHOW
// =============================================================================

/// Load the prelude and print the tree.
pub async fn cmd_tree<W: Write>(store: &ChapterStore, json: bool, out: &mut W) -> CliResult<()> {
    store.load().await?;
    let state = store.state().await;
    if json {
        serde_json::to_writer_pretty(&mut *out, state.tree())?;
        writeln!(out)?;
    } else {
        write!(out, "{}", state.tree().to_text())?;
    }
    Ok(())
}

/// Load the prelude and print one node.
pub async fn cmd_show<W: Write>(
    store: &ChapterStore,
    full_entry: &str,
    out: &mut W,
) -> CliResult<()> {
    store.load().await?;

    let (node, parents) = {
        let state = store.state().await;
        let tree = state.tree();
        let node = tree
            .find(full_entry)
            .ok_or_else(|| format!("no chapter at {}", full_entry))?;
        let parents: Vec<String> = tree
            .parents_of(node.id)
            .map(|parent| parent.title.clone())
            .collect();
        (node.clone(), parents)
    };

    writeln!(out, "{}", node.title)?;
    writeln!(out, "  entry: {}", node.full_entry)?;
    if !parents.is_empty() {
        writeln!(out, "  parents: {}", parents.join(" / "))?;
    }
    if let Some(intro) = &node.intro {
        writeln!(out, "  intro: {}", intro)?;
    }

    match &node.kind {
        NodeKind::Directory { children } => {
            writeln!(out, "  children: {}", children.len())?;
        }
        NodeKind::Instance(instance) => {
            if !instance.import_maps.is_empty() {
                writeln!(out, "  imports:")?;
                for entry in &instance.import_maps {
                    writeln!(out, "    {} -> {}", entry.lib, entry.url)?;
                }
            }
            let client = store.client();
            if instance.has_preview_image {
                writeln!(out, "  preview: {}", client.preview_image_url(&node.full_entry)?)?;
            }
            if instance.has_description {
                let description = client.instance_description(&node.full_entry).await?;
                writeln!(out)?;
                writeln!(out, "{}", description.trim_end())?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// PREVIEW
// =============================================================================

/// Fetch an instance's sources and write its sandbox document.
pub async fn cmd_preview<W: Write>(
    store: &ChapterStore,
    full_entry: &str,
    theme: Theme,
    template: &str,
    out: &mut W,
) -> CliResult<()> {
    store.load().await?;

    let instance = {
        let state = store.state().await;
        let node = state
            .tree()
            .find(full_entry)
            .ok_or_else(|| format!("no chapter at {}", full_entry))?;
        node.as_instance()
            .cloned()
            .ok_or_else(|| format!("{} is a directory, not a chapter instance", full_entry))?
    };

    let client = store.client();
    let sources = client.instance_sources(full_entry, &instance).await?;
    let document = create_iframe_doc(
        template,
        client.locator().base_url(),
        &sources.content(theme, &instance.import_maps),
    )?;
    out.write_all(document.as_bytes())?;
    Ok(())
}

// =============================================================================
// WATCH / SERVE
// =============================================================================

/// Reload the tree on every rebuild until the stream closes or Ctrl+C.
pub async fn cmd_watch<W: Write>(
    store: &ChapterStore,
    live: &LiveReload,
    out: &mut W,
) -> CliResult<()> {
    if !live.is_enabled() {
        return Err(format!(
            "live reload is disabled; pass --live or set {}=true",
            ENV_ENABLE_LIVE_RELOAD
        )
        .into());
    }

    let count = store.load().await?;
    writeln!(out, "loaded {} nodes", count)?;

    let (id, mut rebuilds) = live.subscribe();
    let Some(mut reader) = live.init().await? else {
        live.off_rebuild(id);
        return Err("live reload connection already open".into());
    };

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            Some(()) = rebuilds.recv() => {
                match store.load().await {
                    Ok(count) => writeln!(out, "reloaded {} nodes", count)?,
                    Err(err) => tracing::warn!(%err, "reload after rebuild failed"),
                }
            }
            _ = &mut reader => {
                writeln!(out, "live reload stream closed")?;
                break;
            }
        }
    }

    live.off_rebuild(id);
    Ok(())
}

/// Load the tree and run the preview server.
pub async fn cmd_serve(store: Arc<ChapterStore>, live: LiveReload, port: u16) -> CliResult<()> {
    if let Err(err) = store.load().await {
        tracing::warn!(%err, "initial prelude load failed; POST /reload to retry");
    }
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let live = live.is_enabled().then_some(live);
    api::serve(ApiState::new(store, DEFAULT_TEMPLATE), addr, live).await
}

// =============================================================================
// BASE URL
// =============================================================================

fn override_store(config: &Config) -> CliResult<BaseUrlOverride> {
    config
        .base_url_override()
        .ok_or_else(|| "no state directory; set CANVASBOX_STATE_DIR".into())
}

/// Run a `base-url` action.
///
/// `flag` is the global `--base-url` value. `get` reports it as the effective
/// URL; `set` and `reset` refuse it, since it would shadow what they persist.
pub fn cmd_base_url<W: Write>(
    config: &Config,
    flag: Option<&str>,
    action: &BaseUrlAction,
    out: &mut W,
) -> CliResult<()> {
    match (action, flag) {
        (BaseUrlAction::Get, Some(url)) => {
            writeln!(out, "{} (flag)", url)?;
            Ok(())
        }
        (BaseUrlAction::Get, None) => cmd_base_url_get(config, out),
        (_, Some(_)) => Err("--base-url cannot be combined with base-url set or reset".into()),
        (BaseUrlAction::Set { url }, None) => cmd_base_url_set(config, url, out),
        (BaseUrlAction::Reset, None) => cmd_base_url_reset(config, out),
    }
}

/// Print the effective base URL and where it comes from.
pub fn cmd_base_url_get<W: Write>(config: &Config, out: &mut W) -> CliResult<()> {
    let stored = match config.base_url_override() {
        Some(store) => store.get()?,
        None => None,
    };
    match stored {
        Some(url) => writeln!(out, "{} (override)", url)?,
        None => writeln!(out, "{} (environment)", config.base_url)?,
    }
    Ok(())
}

/// Persist a base URL override.
pub fn cmd_base_url_set<W: Write>(config: &Config, url: &str, out: &mut W) -> CliResult<()> {
    if override_store(config)?.set(url)? {
        writeln!(out, "base URL set to {}", url)?;
    } else {
        writeln!(out, "{}", editor_disabled())?;
    }
    Ok(())
}

/// Remove the persisted override.
pub fn cmd_base_url_reset<W: Write>(config: &Config, out: &mut W) -> CliResult<()> {
    if override_store(config)?.reset()? {
        writeln!(out, "base URL reset to {}", config.base_url)?;
    } else {
        writeln!(out, "{}", editor_disabled())?;
    }
    Ok(())
}

fn editor_disabled() -> String {
    format!(
        "base URL editor is disabled; set {}=true to enable it",
        ENV_ENABLE_BASE_URL_EDITOR
    )
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    let mut stdout = std::io::stdout();

    if let Commands::BaseUrl { action } = &cli.command {
        return cmd_base_url(&config, cli.base_url.as_deref(), action, &mut stdout);
    }

    let locator = build_locator(&config, cli.base_url.as_deref())?;
    tracing::debug!(base_url = locator.base_url(), origin = %locator.origin(), "content locator");
    let client = ContentClient::new(locator);
    let store = Arc::new(ChapterStore::new(client.clone()));
    let live = LiveReload::new(client, config.enable_live_reload);

    match cli.command {
        Commands::Tree { json } => cmd_tree(&store, json, &mut stdout).await,
        Commands::Show { full_entry } => cmd_show(&store, &full_entry, &mut stdout).await,
        Commands::Preview {
            full_entry,
            dark,
            surface,
            template,
            out,
        } => {
            let template = match template {
                Some(path) => std::fs::read_to_string(path)?,
                None => DEFAULT_TEMPLATE.to_string(),
            };
            let theme = Theme { dark, surface };
            match out {
                Some(path) => {
                    let mut file = std::fs::File::create(&path)?;
                    cmd_preview(&store, &full_entry, theme, &template, &mut file).await?;
                    tracing::info!(path = %path.display(), "preview written");
                    Ok(())
                }
                None => cmd_preview(&store, &full_entry, theme, &template, &mut stdout).await,
            }
        }
        Commands::Watch => cmd_watch(&store, &live, &mut stdout).await,
        Commands::Serve { port } => cmd_serve(store, live, port).await,
        Commands::BaseUrl { .. } => Ok(()),
    }
}
