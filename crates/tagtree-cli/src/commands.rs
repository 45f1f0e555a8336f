//! CLI command implementations.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tagtree_core::{NodeCategory, TagTreeConfig, CONFIG_DIR};
use tagtree_graph::{Relation, TreeItem};
use tagtree_watcher::{FsReader, GraphMaintainer, ScanReport, Session};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Per-user config consulted when a workspace has none of its own.
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tagtree").join("config.json"))
}

fn open_session(path: &Path) -> Result<Session> {
    let fallback = user_config_path();
    let config = TagTreeConfig::load(path, fallback.as_deref())?;
    Ok(Session::open(path, config)?)
}

/// Runs the initial scan behind a spinner.
async fn scan(maintainer: &mut GraphMaintainer<FsReader>) -> Result<ScanReport> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Scanning files...");

    let report = maintainer.initial_scan().await;

    spinner.finish_and_clear();

    if !report.failures.is_empty() {
        eprintln!("{} {} files could not be read:", "⚠".yellow(), report.failures.len());
        for (file, error) in report.failures.iter().take(5) {
            eprintln!("  {} - {}", file.red(), error);
        }
        if report.failures.len() > 5 {
            eprintln!("  ... and {} more", report.failures.len() - 5);
        }
    }

    Ok(report)
}

async fn scanned_session(path: &Path) -> Result<(Session, ScanReport)> {
    let session = open_session(path)?;
    let mut maintainer = session.maintainer(FsReader);
    let report = scan(&mut maintainer).await?;
    Ok((session, report))
}

/// Write a default config for a workspace.
pub fn init(path: &Path) -> Result<()> {
    let config_path = TagTreeConfig::workspace_path(path);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let written = TagTreeConfig::default().write(path)?;

    println!("{} Initialized tagtree in {}", "✓".green(), path.display());
    println!("  Config written to {}", written.display());
    println!("  Run {} to see the tree", "tagtree tree".cyan());

    Ok(())
}

/// Print the top level of the tree, or one node's children.
pub async fn tree(path: &Path, node: Option<&str>, json: bool) -> Result<()> {
    let (session, _) = scanned_session(path).await?;

    if let Some(name) = node {
        if session.index().read().await.node(name).is_none() {
            return Err(format!("Node '{}' not found in graph", name).into());
        }
    }

    let items = session.children(node).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("{}", "Nothing tagged yet".dimmed());
    } else {
        for item in &items {
            print_item(item);
        }
    }

    Ok(())
}

fn print_item(item: &TreeItem) {
    let marker = match item.relation {
        Relation::Root => "•",
        Relation::Both => "↔",
        Relation::Inbound => "←",
        Relation::Outbound => "→",
    };

    let name = match item.node.category() {
        NodeCategory::Tag => format!("#{}", item.node.name).cyan(),
        NodeCategory::File => item.node.name.normal(),
    };

    let star = if item.node.starred { " ★" } else { "" };

    let mut line = format!("  {} {}{}", marker.dimmed(), name, star.yellow());
    if let Some(location) = item.node.kind.location() {
        line.push_str(&format!(" {}", location.display().to_string().dimmed()));
    }
    if item.relation == Relation::Root {
        let links = item.node.inbound.len() + item.node.outbound.len();
        line.push_str(&format!(" {}", format!("({})", links).dimmed()));
    }
    println!("{}", line);
}

/// Complete a tag or file name.
pub async fn complete(path: &Path, prefix: &str, limit: usize) -> Result<()> {
    let (session, _) = scanned_session(path).await?;
    let matches = session.suggest(prefix, limit).await;

    if matches.is_empty() {
        println!("No names start with \"{}\"", prefix);
        return Ok(());
    }

    for node in matches {
        let kind = match node.category() {
            NodeCategory::Tag => "tag".yellow(),
            NodeCategory::File => "file".blue(),
        };
        println!("  {} {}", kind, node.name.cyan());
    }

    Ok(())
}

/// Show graph statistics.
pub async fn status(path: &Path) -> Result<()> {
    if !path.join(CONFIG_DIR).exists() {
        println!("{} No workspace config here, using defaults", "•".blue());
        println!("  Run {} to create one", "tagtree init".cyan());
    }

    let (session, report) = scanned_session(path).await?;
    let stats = session.index().read().await.stats();
    let config = session.config();

    println!("{}", "Tagtree Status".cyan().bold());
    println!();
    println!("  {} {}", "Root:".dimmed(), session.root().display());
    println!("  {} {}", "Files:".dimmed(), report.files_tracked);
    println!("  {} {}", "Tags:".dimmed(), stats.tags);
    println!("  {} {}", "File nodes:".dimmed(), stats.files);
    println!("  {} {}", "Edges:".dimmed(), stats.edges);
    println!("  {} {:?}", "Grammar:".dimmed(), config.grammar);
    println!("  {} {}", "Extensions:".dimmed(), config.extensions.join(", "));
    println!("  {} {}ms", "Scan time:".dimmed(), report.duration_ms);

    Ok(())
}

/// Export the graph to JSON.
pub async fn export(path: &Path, output: &Path) -> Result<()> {
    let (session, _) = scanned_session(path).await?;
    let index = session.index();
    let index = index.read().await;

    let export = serde_json::json!({
        "version": "1.0",
        "stats": index.stats(),
        "nodes": index.nodes(),
        "edges": index.edges(),
    });

    fs::write(output, serde_json::to_string_pretty(&export)?)?;
    println!("{} Exported to {}", "✓".green(), output.display());

    Ok(())
}

/// Keep the graph live and reprint the tree on every change.
pub async fn watch(path: &Path) -> Result<()> {
    let session = open_session(path)?;
    let mut maintainer = session.maintainer(FsReader);
    scan(&mut maintainer).await?;
    print_roots(&session).await;

    let mut changes = session.notifier().subscribe();
    let (tx, rx) = mpsc::channel(256);
    let watcher = session.spawn_watcher(tx);
    let worker = tokio::spawn(async move { maintainer.run(rx).await });

    info!("Watching {}", session.root().display());
    println!("  Press {} to stop", "Ctrl+C".cyan());

    loop {
        tokio::select! {
            changed = changes.recv() => match changed {
                Ok(_) => print_roots(&session).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} change notifications", skipped);
                    print_roots(&session).await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watcher.abort();
    worker.abort();
    Ok(())
}

async fn print_roots(session: &Session) {
    println!();
    println!("{}", "Tag tree".cyan().bold());
    for item in session.children(None).await {
        print_item(&item);
    }
}
