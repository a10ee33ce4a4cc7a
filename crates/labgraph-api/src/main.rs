//! CLI entry point for the LabGraph API server and bulk tools.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use labgraph_graph::bulk::dated_root;
use labgraph_graph::GraphClient;

use labgraph_api::config::LabGraphConfig;
use labgraph_api::run_server;
use labgraph_api::state::{AppState, GraphSessions};

#[derive(Parser)]
#[command(name = "labgraph")]
#[command(about = "REST API and bulk tools for the LabGraph knowledge graph")]
struct Cli {
    /// Config file prefix (default: labgraph).
    #[arg(short, long, default_value = "labgraph", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API.
    Serve {
        /// Listen address, overriding `server.bind_addr`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Export every table to CSV under a dated directory.
    Export {
        /// Base directory, overriding `bulk.export_dir`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Import every table from a CSV export.
    Import {
        /// Export root to read, overriding `bulk.import_dir`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete every node and relationship.
    Wipe {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let config = LabGraphConfig::load(&cli.config)?;

    if let Command::Wipe { yes: false } = cli.command {
        anyhow::bail!("Refusing to delete the whole graph without --yes");
    }

    let graph = GraphClient::connect(&config.neo4j).await?;

    match cli.command {
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.server.bind_addr.clone());
            let stores = GraphSessions::new(graph, config.server.id_retry_attempts);
            run_server(AppState::new(Arc::new(stores)), &bind_addr).await?;
        }
        Command::Export { dir } => {
            let base = dir.unwrap_or_else(|| config.bulk.export_dir.clone());
            let root = dated_root(&base, chrono::Local::now().date_naive());
            let report = graph.export_all(&root).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Import { dir } => {
            let root = dir.unwrap_or_else(|| config.bulk.import_dir.clone());
            let report = graph.import_all(&root).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Wipe { .. } => {
            let deleted = graph.delete_all().await?;
            println!("Deleted {deleted} nodes");
        }
    }

    Ok(())
}
