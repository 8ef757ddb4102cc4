//! Command-line interface for proto-decode
//!
//! # Usage Examples
//!
//! ## Decode a JSONL event stream
//! ```bash
//! # Events read from stdin, decoded events written to stdout
//! proto-decode decode \
//!   --proto-file /path/to/meshtastic/mqtt.proto \
//!   --message-type meshtastic.ServiceEnvelope < events.jsonl
//!
//! # Custom payload keys, events read from a file
//! proto-decode decode \
//!   --proto-file schemas/device.proto \
//!   --message-type demo.Envelope \
//!   --input-key raw --output-key parsed \
//!   --input events.jsonl
//!
//! # Validate the pipeline without emitting output events
//! proto-decode decode --proto-file schemas/device.proto \
//!   --message-type demo.Envelope --dry-run < events.jsonl
//! ```
//!
//! ## Inspect a schema
//! ```bash
//! # List the fully-qualified message types a schema defines
//! proto-decode schema --proto-file schemas/device.proto
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use proto_decode::{AgentConfig, DecoderAgent, Event};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "proto-decode")]
#[command(about = "Decode base64-encoded protobuf event payloads against a .proto schema")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a stream of JSONL events (one JSON object per line)
    Decode {
        #[command(flatten)]
        config: AgentConfig,

        /// Input JSONL file (defaults to stdin)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Decode and log without emitting output events
        #[arg(long)]
        dry_run: bool,
    },
    /// Load a schema and list the message types it defines
    Schema {
        /// Path to the root .proto schema file
        #[arg(long)]
        proto_file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            config,
            input,
            dry_run,
        } => decode_stream(config, input, dry_run),
        Commands::Schema { proto_file } => list_schema(&proto_file),
    }
}

fn decode_stream(config: AgentConfig, input: Option<PathBuf>, dry_run: bool) -> anyhow::Result<()> {
    let agent = DecoderAgent::new(config)?;

    let reader: Box<dyn BufRead> = match input {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut processed = 0u64;
    let mut emitted = 0u64;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.context("failed to read input line")?;
        if line.trim().is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("line {}: invalid JSON, skipping: {e}", line_number + 1);
                continue;
            }
        };
        let event: &Event = match value.as_object() {
            Some(event) => event,
            None => {
                tracing::warn!("line {}: not a JSON object, skipping", line_number + 1);
                continue;
            }
        };

        processed += 1;
        for decoded in agent.receive(vec![event.clone()]) {
            emitted += 1;
            if dry_run {
                tracing::info!("dry-run: {}", serde_json::Value::Object(decoded));
            } else {
                serde_json::to_writer(&mut out, &serde_json::Value::Object(decoded))
                    .context("failed to write output event")?;
                out.write_all(b"\n")?;
            }
        }
    }

    tracing::info!("processed {processed} events, emitted {emitted}");
    Ok(())
}

fn list_schema(proto_file: &Path) -> anyhow::Result<()> {
    let registry = proto_codec::load_schema(proto_file)
        .with_context(|| format!("failed to load schema {}", proto_file.display()))?;
    for name in registry.message_names() {
        println!("{name}");
    }
    Ok(())
}
