//! Graph Stream Generator — entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use graph_stream_gen::{OutputFormat, SamplingPolicy};
use graph_stream_gen_cli::config::{resolve_input_path, Overrides};

#[derive(Parser)]
#[command(
    name = "gsg",
    about = "Graph Stream Generator — synthesize multi-stream graph event logs from pattern templates",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Print results as JSON (machine-readable).
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate stream artifacts from an input document.
    Generate {
        /// Input document. Falls back to $GSG_INPUT, then ./gsg.json.
        input: Option<String>,

        /// Directory the artifacts are written to.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Random seed (overrides the document's randomSeed).
        #[arg(long)]
        seed: Option<u64>,

        /// Stream artifact layout (edges, json).
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Existing-vertex sampling policy (uniform, degree).
        #[arg(long)]
        sampling: Option<SamplingPolicy>,
    },

    /// Validate an input document and print its parameters and patterns.
    Validate {
        /// Input document. Falls back to $GSG_INPUT, then ./gsg.json.
        input: Option<String>,
    },

    /// Convert a JSON-format stream artifact to GraphML.
    ExportGraphml {
        /// Stream artifact written with --format json.
        input: PathBuf,

        /// Output file (default: <input>.graphml).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   gsg completions bash > ~/.local/share/bash-completion/completions/gsg
    ///   gsg completions zsh > ~/.zfunc/_gsg
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            input,
            out_dir,
            seed,
            format,
            sampling,
        } => {
            let input = resolve_input_path(input.as_deref());
            let overrides = Overrides {
                seed,
                format,
                sampling,
            };
            tracing::info!("Graph Stream Generator v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Input: {}", input.display());
            let summary = graph_stream_gen_cli::generate(&input, &out_dir, &overrides)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", graph_stream_gen_cli::render_summary(&summary));
            }
        }

        Commands::Validate { input } => {
            let input = resolve_input_path(input.as_deref());
            match graph_stream_gen_cli::validate(&input) {
                Ok(report) => print!("{report}"),
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    std::process::exit(1);
                }
            }
        }

        Commands::ExportGraphml { input, output } => {
            let (path, summary) = graph_stream_gen_cli::export_graphml(&input, output.as_deref())?;
            if cli.json {
                let info = serde_json::json!({
                    "output": path.display().to_string(),
                    "nodes": summary.nodes,
                    "edges": summary.edges,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!(
                    "Exported {} to {} ({} nodes, {} edges)",
                    input.display(),
                    path.display(),
                    summary.nodes,
                    summary.edges
                );
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "gsg", &mut std::io::stdout());
        }
    }

    Ok(())
}
