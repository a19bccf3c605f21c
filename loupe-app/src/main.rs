//! # Loupe
//!
//! Desktop host for the canvas note previewer: opens a JSON Canvas file from
//! a vault, and previews or edits the note selected on it in a side panel.
//!
//! ## Usage
//!
//! ```bash
//! # Open a canvas from a vault
//! loupe --vault ~/notes --canvas ~/notes/ideas.canvas
//!
//! # Use a specific configuration file
//! loupe --config ./loupe.toml
//!
//! # Run in debug mode
//! loupe --debug
//! ```

use clap::{Arg, Command};
use loupe_canvas_preview::{CanvasPreviewPlugin, MarkdownRenderer};
use loupe_core::{Config, VaultStorage};
use loupe_plugin_api::{Plugin, PluginContext};
use std::path::PathBuf;
use std::sync::Arc;

mod app;
mod board;
mod dock;

/// Command line arguments for Loupe
#[derive(Debug, Clone, Default)]
pub struct AppArgs {
    /// Vault directory notes are read from and written to
    pub vault: Option<PathBuf>,
    /// Canvas file to open on startup
    pub canvas: Option<PathBuf>,
    /// Configuration file to use instead of the default location
    pub config: Option<PathBuf>,
    /// Enable debug logging
    pub debug: bool,
}

fn command() -> Command {
    Command::new("Loupe")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Loupe Team")
        .about("Preview and edit the notes on a canvas")
        .arg(
            Arg::new("vault")
                .short('v')
                .long("vault")
                .value_name("DIR")
                .help("Vault directory containing the notes")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("canvas")
                .short('c')
                .long("canvas")
                .value_name("FILE")
                .help("Canvas file to open on startup")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Parse command line arguments
fn parse_args_from<I, T>(args: I) -> Result<AppArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    Ok(AppArgs {
        vault: matches.get_one::<PathBuf>("vault").cloned(),
        canvas: matches.get_one::<PathBuf>("canvas").cloned(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        debug: matches.get_flag("debug"),
    })
}

/// Initialize logging based on arguments
fn init_logging(level: tracing::Level) {
    // eframe and winit log through the `log` facade.
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.as_str().to_lowercase()),
    )
    .try_init();

    loupe_core::init_tracing(level);
}

fn load_config(args: &AppArgs) -> anyhow::Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_or_default()?,
    };
    Ok(config)
}

/// Vault root from the command line, then the configuration, then the
/// canvas file's directory.
fn resolve_vault_root(args: &AppArgs, config: &Config) -> anyhow::Result<PathBuf> {
    args.vault
        .clone()
        .or_else(|| config.app.vault_root.clone())
        .or_else(|| {
            args.canvas
                .as_ref()
                .or(config.app.default_canvas.as_ref())
                .and_then(|canvas| canvas.parent().map(PathBuf::from))
        })
        .ok_or_else(|| anyhow::anyhow!("No vault given; pass --vault or set app.vault_root"))
}

fn main() -> anyhow::Result<()> {
    let args = parse_args_from(std::env::args_os()).unwrap_or_else(|e| e.exit());
    let config = load_config(&args)?;
    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        config.log_level()
    };
    init_logging(level);

    tracing::info!("Starting Loupe v{}", env!("CARGO_PKG_VERSION"));

    let vault_root = resolve_vault_root(&args, &config)?;
    tracing::info!(vault = %vault_root.display(), "Using vault");

    let runtime = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create Tokio runtime: {}", e))?,
    );

    let mut ctx = PluginContext::new();
    config.apply_to(&mut ctx);
    let events = ctx.events().subscribe();

    let dock = Arc::new(dock::DockHost::new());
    let mut plugin = CanvasPreviewPlugin::new(
        Arc::new(VaultStorage::new(vault_root)),
        Arc::new(MarkdownRenderer::new()),
        dock.clone(),
    );
    plugin.initialize(&mut ctx)?;
    let plugin = Arc::new(plugin);

    let options = eframe::NativeOptions::default();
    let app_runtime = Arc::clone(&runtime);
    let app_plugin = Arc::clone(&plugin);
    let run_result = eframe::run_native(
        "Loupe",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::LoupeApp::new(
                cc,
                &args,
                &config,
                app_runtime,
                app_plugin,
                dock,
                events,
            )))
        }),
    );

    // Unsaved edits are written before the process exits.
    runtime.block_on(plugin.close_all());

    if let Err(e) = run_result {
        anyhow::bail!("Application exited with error: {}", e);
    }
    tracing::info!("Loupe exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = parse_args_from([
            "loupe",
            "--vault",
            "/notes",
            "--canvas",
            "/notes/ideas.canvas",
            "-d",
        ])
        .unwrap();

        assert_eq!(args.vault, Some(PathBuf::from("/notes")));
        assert_eq!(args.canvas, Some(PathBuf::from("/notes/ideas.canvas")));
        assert!(args.config.is_none());
        assert!(args.debug);
    }

    #[test]
    fn test_parse_args_rejects_unknown_flags() {
        assert!(parse_args_from(["loupe", "--theme", "dark"]).is_err());
    }

    #[test]
    fn test_vault_root_resolution() {
        let mut config = Config::default();
        let args = AppArgs {
            canvas: Some(PathBuf::from("/notes/board.canvas")),
            ..Default::default()
        };
        assert_eq!(
            resolve_vault_root(&args, &config).unwrap(),
            PathBuf::from("/notes")
        );

        config.app.vault_root = Some(PathBuf::from("/vault"));
        assert_eq!(
            resolve_vault_root(&args, &config).unwrap(),
            PathBuf::from("/vault")
        );

        let explicit = AppArgs {
            vault: Some(PathBuf::from("/explicit")),
            ..args
        };
        assert_eq!(
            resolve_vault_root(&explicit, &config).unwrap(),
            PathBuf::from("/explicit")
        );

        assert!(resolve_vault_root(&AppArgs::default(), &Config::default()).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loupe.toml");
        std::fs::write(&path, "[app]\nlog_level = \"debug\"\n").unwrap();

        let args = AppArgs {
            config: Some(path),
            ..Default::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
    }
}
