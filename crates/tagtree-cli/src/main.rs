//! Tagtree CLI - Command-line interface for tagtree
//!
//! Builds the tag graph for a workspace and prints it as a tree, offers
//! completions, exports it, or keeps it live while files change.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "tagtree")]
#[command(author = "Tagtree Contributors")]
#[command(version)]
#[command(about = "Browse the tags your files declare as a tree", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config for a workspace
    Init {
        /// Workspace root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Print the tag tree
    Tree {
        /// Workspace root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Expand this node instead of listing the top level
        #[arg(short, long)]
        node: Option<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Complete a tag or file name
    Complete {
        /// Name prefix
        prefix: String,

        /// Maximum results to return
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Workspace root (defaults to current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// Show graph statistics
    Status {
        /// Workspace root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Export the graph to JSON
    Export {
        /// Output file
        #[arg(short, long, default_value = "tagtree-graph.json")]
        output: PathBuf,

        /// Workspace root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Keep the graph live and reprint the tree on every change
    Watch {
        /// Workspace root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Tree { path, node, json } => commands::tree(&path, node.as_deref(), json).await,
        Commands::Complete {
            prefix,
            limit,
            path,
        } => commands::complete(&path, &prefix, limit).await,
        Commands::Status { path } => commands::status(&path).await,
        Commands::Export { output, path } => commands::export(&path, &output).await,
        Commands::Watch { path } => commands::watch(&path).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
