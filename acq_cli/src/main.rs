use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use acq_core::layout::V_30;
use acq_core::{
    field_offsets, ByteOrder, DecodedHeaderIdentity, DecodedRecord, FormatDescriptor, Reader,
    MAIN_HEADER,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "acq",
    about = "Detect, inspect, and debug the header layout of AcqKnowledge files",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the byte order and format version of a file
    Detect {
        /// AcqKnowledge file
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Detect the file identity and print the decoded main header
    Inspect {
        /// AcqKnowledge file
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the main header layout for a format version
    ///
    /// Offsets are computed from field widths only, for comparison against
    /// published header documentation.
    Layout {
        /// Format version to resolve fields for
        #[arg(long, default_value_t = V_30)]
        version: u32,
        /// Byte order to show in the descriptor: little | big
        #[arg(short, long)]
        byte_order: Option<ByteOrder>,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_and_detect(file: &Path) -> anyhow::Result<Reader<std::fs::File>> {
    debug!(file = ?file, "opening");
    let mut reader =
        Reader::open(file).with_context(|| format!("opening input file {:?}", file))?;
    reader
        .detect_order_and_version()
        .with_context(|| format!("detecting byte order and version of {:?}", file))?;
    Ok(reader)
}

fn print_identity(identity: &DecodedHeaderIdentity) {
    println!("  byte order     : {}-endian", identity.byte_order);
    println!("  format version : {}", identity.version);
    let raw: Vec<String> = identity.raw.iter().map(|b| format!("{:02x}", b)).collect();
    println!("  version prefix : {}", raw.join(" "));
}

#[derive(Serialize)]
struct InspectReport<'a> {
    identity: &'a DecodedHeaderIdentity,
    header: &'a DecodedRecord,
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_detect(file: PathBuf, json: bool) -> anyhow::Result<()> {
    let reader = open_and_detect(&file)?;
    let identity = reader
        .identity()
        .context("detection succeeded without an identity")?;

    if json {
        println!("{}", serde_json::to_string_pretty(identity)?);
    } else {
        println!("=== AcqKnowledge file: {:?} ===", file);
        print_identity(identity);
    }
    Ok(())
}

fn run_inspect(file: PathBuf, json: bool) -> anyhow::Result<()> {
    let mut reader = open_and_detect(&file)?;
    let header = reader
        .read_main_header()
        .with_context(|| format!("decoding main header of {:?}", file))?;
    let identity = reader
        .identity()
        .context("detection succeeded without an identity")?;

    if json {
        let report = InspectReport {
            identity,
            header: &header,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let fields = reader.table().fields_for(identity.version);
    let offsets = field_offsets(&fields);

    println!("=== AcqKnowledge file: {:?} ===", file);
    println!();
    print_identity(identity);
    println!();
    println!("  {:>6}  {:<20}  {}", "offset", "field", "value");
    println!("  {}", "-".repeat(50));
    for (entry, (name, value)) in offsets.iter().zip(header.iter()) {
        println!("  {:>6}  {:<20}  {}", entry.offset, name, value);
    }
    Ok(())
}

fn run_layout(version: u32, byte_order: Option<ByteOrder>) -> anyhow::Result<()> {
    let fields = MAIN_HEADER.fields_for(version);
    let descriptor = FormatDescriptor::from_fields(&fields, byte_order);

    println!("=== Main header layout, version {} ===", version);
    println!();
    println!("  descriptor : {}", descriptor);
    println!("  length     : {} bytes", descriptor.byte_length());
    println!();
    println!(
        "  {:>6}  {:>5}  {:<6}  {:>7}  {}",
        "offset", "width", "code", "since", "field"
    );
    println!("  {}", "-".repeat(50));
    for (field, entry) in fields.iter().zip(field_offsets(&fields)) {
        println!(
            "  {:>6}  {:>5}  {:<6}  {:>7}  {}",
            entry.offset,
            entry.width,
            field.code.to_string(),
            field.min_version,
            entry.name
        );
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Detect { file, json } => run_detect(file, json),
        Commands::Inspect { file, json } => run_inspect(file, json),
        Commands::Layout {
            version,
            byte_order,
        } => run_layout(version, byte_order),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_layout_accepts_version_and_verbosity() {
        let cli = Cli::try_parse_from(["acq", "layout", "--version", "0"]).unwrap();
        match cli.command {
            Commands::Layout {
                version,
                byte_order,
            } => {
                assert_eq!(version, 0);
                assert_eq!(byte_order, None);
            }
            _ => panic!("expected the layout subcommand"),
        }

        let cli = Cli::try_parse_from(["acq", "layout", "-v", "-b", "big"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Commands::Layout {
                version: V_30,
                byte_order: Some(ByteOrder::Big),
            }
        ));
    }

    #[test]
    fn test_detect_parses_file_and_json() {
        let cli = Cli::try_parse_from(["acq", "-vv", "detect", "in.acq", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Detect { json: true, .. }));
    }
}
