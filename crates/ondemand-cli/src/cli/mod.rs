//! CLI for ondemand: catalog inspection, one-off fetches, maintenance and the callback service.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ondemand_core::config;
use std::net::SocketAddr;
use std::path::PathBuf;

use commands::{
    run_checksum, run_clean, run_favorites, run_fetch, run_fetch_url, run_list, run_serve,
    FetchArgs,
};

/// Top-level CLI for ondemand.
#[derive(Debug, Parser)]
#[command(name = "ondemand")]
#[command(about = "On-demand model artifact catalogs and cached downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List catalog categories, or the names in one category.
    List {
        /// Category key (e.g. loras, checkpoints).
        category: Option<String>,
    },

    /// List names from the remote favorites catalog.
    Favorites,

    /// Fetch a catalog artifact into the models directory.
    Fetch {
        /// Artifact kind: category key (loras) or directory name (vae).
        kind: String,
        /// Display name as listed by `ondemand list <category>`.
        name: String,
        #[command(flatten)]
        args: FetchArgs,
    },

    /// Fetch an arbitrary URL into a directory.
    FetchUrl {
        /// Direct HTTP/HTTPS URL.
        url: String,
        /// Destination directory (created if missing).
        dir: PathBuf,
        #[command(flatten)]
        args: FetchArgs,
        /// Expected SHA-256 (hex); checked when cache_policy = "verify_sha256".
        #[arg(long, value_name = "HEX")]
        sha256: Option<String>,
    },

    /// Run the HTTP callback service for UI selection changes.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8188", value_name = "ADDR")]
        bind: SocketAddr,
        /// Download a newly selected LoRA in the background.
        #[arg(long)]
        prefetch: bool,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Remove leftover `.part` staging files from interrupted downloads.
    Clean {
        /// Directory to clean; every kind directory under the models root if omitted.
        dir: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::List { category } => run_list(&cfg, category.as_deref())?,
            CliCommand::Favorites => run_favorites(&cfg).await?,
            CliCommand::Fetch { kind, name, args } => run_fetch(&cfg, &kind, &name, args).await?,
            CliCommand::FetchUrl {
                url,
                dir,
                args,
                sha256,
            } => run_fetch_url(&cfg, url, dir, args, sha256).await?,
            CliCommand::Serve { bind, prefetch } => run_serve(&cfg, bind, prefetch).await?,
            CliCommand::Checksum { path } => run_checksum(&path)?,
            CliCommand::Clean { dir } => run_clean(&cfg, dir.as_deref())?,
        }

        Ok(())
    }
}
