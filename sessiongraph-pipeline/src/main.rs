//! sessiongraph: turn coding-session logs into knowledge graphs
//!
//! # Subcommands
//! - `parse`  : parse session logs and print corpus statistics
//! - `analyze`: parse, extract entities per message, write session and merged graphs
//! - `merge`  : merge existing graph files into one
//! - `stats`  : show the effective configuration and cache size

use clap::{Parser, Subcommand};
use sessiongraph_core::{CacheStore, SessionGraphConfig};
use sessiongraph_ingest::{export_session_summaries, process_directory, CorpusStats};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use sessiongraph_pipeline::subsystems::{
    backend::create_backend_from_config,
    batch::{merge_graph_files, run_batch, UNIFIED_GRAPH_FILE},
    orchestrator::ExtractionOrchestrator,
};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "sessiongraph", version, about = "Build knowledge graphs from coding-session logs")]
struct Cli {
    #[arg(short, long, default_value = "sessiongraph.toml")]
    config: String,

    /// Serve cached extractions only; never call the live backend
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse session logs and print corpus statistics as JSON
    Parse {
        /// Directory of session logs (overrides [ingest] input_dir)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Also write per-session summaries to this file
        #[arg(long)]
        summaries: Option<PathBuf>,
    },

    /// Run extraction over all sessions and write graph files
    Analyze {
        /// Directory of session logs (overrides [ingest] input_dir)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory for graphs (overrides [batch] output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Messages analyzed per session (overrides [batch] max_messages_per_session)
        #[arg(short = 'n', long)]
        max_messages: Option<usize>,
    },

    /// Merge graph files; earlier files win on duplicate entity names
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = UNIFIED_GRAPH_FILE)]
        output: PathBuf,
    },

    /// Show configuration and cache overview
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let mut config = match SessionGraphConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Parse { input, summaries } => {
            if let Some(input) = input {
                config.ingest.input_dir = input.display().to_string();
            }

            let sessions = process_directory(
                &config.input_dir(),
                config.ingest.recursive,
                &config.ingest.project_markers,
            );
            let stats = CorpusStats::from_sessions(&sessions);
            println!("{}", serde_json::to_string_pretty(&stats)?);

            if let Some(path) = summaries {
                export_session_summaries(&sessions, &path)?;
            }
        }

        Commands::Analyze {
            input,
            output,
            max_messages,
        } => {
            if let Some(input) = input {
                config.ingest.input_dir = input.display().to_string();
            }
            if let Some(output) = output {
                config.batch.output_dir = output.display().to_string();
            }
            if let Some(n) = max_messages {
                config.batch.max_messages_per_session = n;
            }

            let backend = match create_backend_from_config(&config, cli.offline) {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("Failed to create extraction backend: {}", e);
                    std::process::exit(1);
                }
            };

            tracing::info!(
                backend = backend.name(),
                model = backend.model(),
                input_dir = %config.input_dir().display(),
                "Starting analysis"
            );

            let mut orchestrator = ExtractionOrchestrator::from_config(&config, backend);
            let report = run_batch(&config, &mut orchestrator).await?;

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "sessions": report.sessions,
                    "messages_analyzed": report.messages_analyzed,
                    "graph_files": report.graph_files.len(),
                    "unified_graph": report.unified_graph,
                    "total_entities": report.total_entities,
                    "total_relationships": report.total_relationships,
                    "analyzer": report.stats.to_json(),
                }))?
            );
        }

        Commands::Merge { files, output } => {
            let merged = merge_graph_files(&files, &output)?;
            println!(
                "Merged {} file(s): {} entities, {} relationships -> {}",
                files.len(),
                merged.entities.len(),
                merged.relationships.len(),
                output.display()
            );
        }

        Commands::Stats => {
            let cache_dir = config.cache_dir();
            let cache_entries = CacheStore::count_entries(&cache_dir);

            println!("Backend:      {}", if cli.offline { "offline" } else { config.extraction.backend.as_str() });
            println!("Model:        {}", config.extraction.model);
            println!("Min interval: {} ms", config.extraction.min_call_interval_ms);
            println!("Input dir:    {}", config.input_dir().display());
            println!("Output dir:   {}", config.output_dir().display());
            println!("Cache dir:    {}", cache_dir.display());
            println!("Cache size:   {} entries", cache_entries);
        }
    }

    Ok(())
}
