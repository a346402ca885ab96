// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! shapebatch CLI entrypoint.
//!
//! # Usage
//! ```text
//! shapebatch [--config-dir <DIR>] <command> [options]
//! ```
//!
//! Commands:
//! - `config show`: print the effective engine config as JSON.
//! - `config init`: write the default config to the config directory.
//! - `demo`: run a headless session against the mock backend and print the
//!   resulting buckets and per-frame outcomes.
//!
//! Logs go to stderr; set `RUST_LOG` to raise verbosity.

// The CLI is expected to print to stdout.
#![allow(clippy::print_stdout)]

mod demo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use shapebatch_config_fs::FsConfigStore;
use shapebatch_core::{BatchConfig, ConfigService, CONFIG_KEY};
use shapebatch_port::ViewportContext;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "shapebatch developer CLI")]
struct Cli {
    /// Config directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect or initialize the engine config
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Run a headless batching session against the mock backend
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective config as JSON
    Show,
    /// Write the default config
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

/// Viewport context selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ContextArg {
    /// Legacy viewport (flag-gated, pass ends with the draw by default).
    Legacy,
    /// Viewport 2.0 (stamp-gated, host-signalled end-of-pass by default).
    Viewport2,
}

impl From<ContextArg> for ViewportContext {
    fn from(arg: ContextArg) -> Self {
        match arg {
            ContextArg::Legacy => Self::Legacy,
            ContextArg::Viewport2 => Self::Viewport2,
        }
    }
}

/// Options for `shapebatch demo`.
#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Viewport context to drive
    #[arg(long, value_enum, default_value_t = ContextArg::Viewport2)]
    pub context: ContextArg,
    /// Number of shapes to register
    #[arg(long, default_value_t = 12)]
    pub shapes: u16,
    /// Number of distinct render-param variants across shapes
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..))]
    pub variants: u8,
    /// Number of frames to draw and select
    #[arg(long, default_value_t = 3)]
    pub frames: u64,
    /// Host depth-selection capability (omit to leave it unresolved)
    #[arg(long)]
    pub depth_selection: Option<bool>,
    /// Point pick (nearest hit only) instead of area selection
    #[arg(long)]
    pub single: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let service = ConfigService::new(open_store(cli.config_dir.as_deref())?);
    match cli.cmd {
        Command::Config(ConfigCommand::Show) => {
            let config = service.load_batch_config()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Config(ConfigCommand::Init { force }) => {
            let existing = service.load::<BatchConfig>(CONFIG_KEY)?;
            if existing.is_some() && !force {
                println!("config already present; pass --force to overwrite");
            } else {
                service.save_batch_config(&BatchConfig::default())?;
                let path = service.into_inner().base().join(format!("{CONFIG_KEY}.json"));
                info!(path = %path.display(), "wrote default config");
                println!("wrote {}", path.display());
            }
        }
        Command::Demo(args) => {
            let config = service.load_batch_config()?;
            let summary = demo::run(config, &args)?;
            println!("{}", summary.buckets);
            println!("{}", summary.frames);
        }
    }
    Ok(())
}

fn open_store(dir: Option<&std::path::Path>) -> Result<FsConfigStore> {
    match dir {
        Some(dir) => FsConfigStore::with_root(dir)
            .with_context(|| format!("opening config dir {}", dir.display())),
        None => FsConfigStore::new().context("resolving platform config dir"),
    }
}
