use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use notemv_core::docpath::title_of;
use notemv_core::reference::Reference;
use notemv_core::{CorpusIndex, RenameEngine, RenameError, RenameReport};
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod fs_store;

use config::Config;
use fs_store::FsStore;

/// Rename markdown documents without breaking the links between them.
#[derive(Parser)]
#[command(name = "notemv", version, about)]
struct Args {
    /// Vault root directory. Defaults to the config's root, then `.`.
    #[arg(long, env = "NOTEMV_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Config file. Defaults to `notemv.toml` in the vault root.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rename a document and rewrite every reference to it.
    Rename {
        /// Document to rename, relative to the vault root.
        path: String,
        /// New title, without extension.
        new_title: String,
    },
    /// Show a document's outgoing references and backlinks.
    Links {
        /// Document to inspect, relative to the vault root.
        path: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("notemv=warn,notemv_core=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<(Config, PathBuf)> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(args.root.as_deref().unwrap_or_else(|| ".".as_ref()))?,
    };
    let root = args
        .root
        .clone()
        .or_else(|| config.root.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, root))
}

fn print_report(report: &RenameReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "{} {} -> {}",
        "renamed".green().bold(),
        report.old_path,
        report.new_path
    );
    if report.rewritten.is_empty() {
        println!("no documents needed updating");
    } else {
        println!("updated {} document(s):", report.rewritten.len());
        for path in &report.rewritten {
            println!("  {path}");
        }
    }
    Ok(())
}

fn print_links(
    path: &str,
    outgoing: &[Reference],
    backlinks: &[String],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        let payload = serde_json::json!({
            "path": path,
            "outgoing": outgoing,
            "backlinks": backlinks,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    println!("{} ({})", "outgoing".bold(), outgoing.len());
    for r in outgoing {
        match &r.resolved {
            Some(target) => println!("  {} -> {}", r.raw, target.green()),
            None => println!("  {} -> {}", r.raw, "unresolved".yellow()),
        }
    }
    println!("{} ({})", "backlinks".bold(), backlinks.len());
    for source in backlinks {
        println!("  {source}");
    }
    Ok(())
}

fn print_error(err: &RenameError, json: bool) {
    if json {
        let payload = serde_json::json!({ "error": err.to_string() });
        println!("{payload}");
    } else {
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let (config, root) = load_config(&args)?;
    anyhow::ensure!(
        root.is_dir(),
        "vault root {} is not a directory",
        root.display()
    );

    let store = Arc::new(FsStore::new(root));
    let (index, index_rx) = CorpusIndex::new(store.clone());
    index
        .rebuild_all()
        .await
        .context("initial corpus scan failed")?;

    match &args.command {
        Command::Links { path } => {
            let outgoing = index.references_of(path);
            let backlinks = index.referencing_documents(path, title_of(path));
            print_links(path, &outgoing, &backlinks, args.json)
        }
        Command::Rename { path, new_title } => {
            tokio::spawn(index.clone().run_worker(index_rx));
            let (engine, worker) = RenameEngine::new(store, index, config.settings);
            tokio::spawn(worker.run());

            match engine.rename(path, new_title).await {
                Ok(report) => print_report(&report, args.json),
                Err(err) => {
                    print_error(&err, args.json);
                    std::process::exit(1);
                }
            }
        }
    }
}
