//! Wavegraph CLI - validate, inspect and run graph documents

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;

use wavegraph::graph::Topology;
use wavegraph::{
    ComponentRegistry, EngineConfig, FixSuggestion, Graph, GraphSpec, Pipeline, RunConfig,
    WaveError,
};

#[derive(Parser)]
#[command(name = "wavegraph")]
#[command(about = "Wavegraph - typed component-graph runner")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a graph document for construction and validation errors
    Validate {
        /// Path to a .yaml or .json graph document
        file: PathBuf,
    },

    /// Print components, sockets, edges and cycles of a graph document
    Inspect {
        /// Path to a .yaml or .json graph document
        file: PathBuf,
    },

    /// Run a graph document and print its outputs as JSON
    Run {
        /// Path to a .yaml or .json graph document
        file: PathBuf,

        /// Run input as component.socket=<json>; bare text is taken as a string
        #[arg(short, long = "input", value_name = "SOCKET=VALUE")]
        inputs: Vec<String>,

        /// Maximum firings per component
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Wall-clock limit for the whole run
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Fire one component at a time
        #[arg(long)]
        sequential: bool,

        /// Config file instead of ~/.config/wavegraph/config.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate { file } => validate_graph(&file),
        Commands::Inspect { file } => inspect_graph(&file),
        Commands::Run {
            file,
            inputs,
            max_iterations,
            timeout_ms,
            sequential,
            config,
        } => {
            let overrides = RunOverrides {
                max_iterations,
                timeout_ms,
                sequential,
                config,
            };
            run_graph(&file, &inputs, overrides).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

struct RunOverrides {
    max_iterations: Option<u32>,
    timeout_ms: Option<u64>,
    sequential: bool,
    config: Option<PathBuf>,
}

fn load_graph(file: &Path) -> Result<Graph, WaveError> {
    let source = std::fs::read_to_string(file).map_err(|e| WaveError::Serialization {
        reason: format!("cannot read {}: {}", file.display(), e),
    })?;
    let spec = match file.extension().and_then(|ext| ext.to_str()) {
        Some("json") => GraphSpec::from_json(&source)?,
        _ => GraphSpec::from_yaml(&source)?,
    };
    spec.build(&ComponentRegistry::with_builtins())
}

fn validate_graph(file: &Path) -> Result<(), WaveError> {
    let graph = load_graph(file)?;
    graph.validate()?;

    println!("{} Graph '{}' is valid", "✓".green(), file.display());
    println!("  Components: {}", graph.len());
    println!("  Connections: {}", graph.edges().len());
    Ok(())
}

fn inspect_graph(file: &Path) -> Result<(), WaveError> {
    let graph = load_graph(file)?;

    println!("{}", "Components:".cyan().bold());
    for (name, desc) in graph.components() {
        println!("  {} ({}, {})", name.to_string().bold(), desc.type_name(), desc.kind());
        for socket in desc.input_sockets().values() {
            let mut flags = Vec::new();
            if socket.required {
                flags.push("required");
            }
            if socket.variadic {
                flags.push("variadic");
            }
            println!("    ← {}: {} {}", socket.name, socket.ty, flags.join(" ").dimmed());
        }
        for socket in desc.output_sockets().values() {
            let flag = if socket.conditional { "conditional" } else { "" };
            println!("    → {}: {} {}", socket.name, socket.ty, flag.dimmed());
        }
    }

    println!("{}", "Connections:".cyan().bold());
    for edge in graph.edges() {
        println!("  {}", edge);
    }

    println!("{}", "Graph inputs:".cyan().bold());
    for endpoint in graph.input_endpoints() {
        println!("  {}", endpoint);
    }
    println!("{}", "Graph outputs:".cyan().bold());
    for endpoint in graph.output_endpoints() {
        println!("  {}", endpoint);
    }

    let topology = Topology::from_graph(&graph);
    let cycles: Vec<String> = topology
        .cycles()
        .map(|members| {
            members
                .iter()
                .map(|m| &**m)
                .collect::<Vec<_>>()
                .join(" → ")
        })
        .collect();
    if !cycles.is_empty() {
        println!("{}", "Cycles:".cyan().bold());
        for cycle in cycles {
            println!("  {}", cycle);
        }
    }

    match graph.validate() {
        Ok(()) => println!("{} valid", "✓".green()),
        Err(e) => println!("{} {}", "✗".red(), e),
    }
    Ok(())
}

fn parse_inputs(raw: &[String]) -> Result<BTreeMap<String, Value>, WaveError> {
    raw.iter()
        .map(|entry| {
            let (key, value) = entry.split_once('=').ok_or_else(|| WaveError::InvalidRunInput {
                socket: entry.clone(),
                reason: "expected component.socket=<value>".to_string(),
            })?;
            Ok((key.trim().to_string(), parse_value(key, value)?))
        })
        .collect()
}

/// JSON when it looks like JSON, bare text otherwise
///
/// Values opening with `{`, `[` or `"` must parse, so a typo is an error
/// rather than a string.
fn parse_value(key: &str, raw: &str) -> Result<Value, WaveError> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(e) if raw.trim_start().starts_with(['{', '[', '"']) => Err(WaveError::InvalidRunInput {
            socket: key.trim().to_string(),
            reason: format!("invalid JSON: {}", e),
        }),
        Err(_) => Ok(Value::String(raw.to_string())),
    }
}

async fn run_graph(file: &Path, raw_inputs: &[String], overrides: RunOverrides) -> Result<(), WaveError> {
    let engine = match &overrides.config {
        Some(path) => EngineConfig::from_file(path)?.with_env()?,
        None => EngineConfig::load()?,
    };
    let mut config: RunConfig = engine.run_config()?;
    if let Some(max) = overrides.max_iterations {
        config = config.with_max_iterations(max);
    }
    if let Some(ms) = overrides.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    if overrides.sequential {
        config = config.sequential();
    }

    let inputs = parse_inputs(raw_inputs)?;
    let pipeline = Pipeline::new(load_graph(file)?)?;
    let output = pipeline.run(inputs, &config).await?;

    let rendered = serde_json::to_string_pretty(&output.outputs).map_err(|e| WaveError::Serialization {
        reason: e.to_string(),
    })?;
    println!("{}", rendered);
    eprintln!(
        "{} {} waves, run {}",
        "✓".green(),
        output.waves,
        output.run_id.as_str().dimmed()
    );
    Ok(())
}
