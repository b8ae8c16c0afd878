//! Talk CLI
//!
//! Command-line front end for Talk schema definitions:
//! - Checking a corpus of `.talk` sources
//! - Dumping the generator-facing JSON view
//! - Listing the declared symbols

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use talk_dsl::{Key, Location, Namespace, ParseOutput};

mod config;
mod sources;

use config::TalkConfig;

#[derive(Parser)]
#[command(name = "talk")]
#[command(author, version, about = "Talk: schema definition language front end")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON config file (default: ./talk.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate sources; fails on the first error
    Check {
        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Emit the parsed corpus as JSON, grouped by top-level tag
    Dump {
        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Single-line JSON regardless of config
        #[arg(long)]
        compact: bool,
    },

    /// Print the symbol registry
    Symbols {
        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Print as JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = TalkConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { paths } => cmd_check(&paths, &config),
        Commands::Dump {
            paths,
            out,
            compact,
        } => cmd_dump(&paths, out.as_deref(), compact, &config),
        Commands::Symbols { paths, json } => cmd_symbols(&paths, json, &config),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(paths: &[PathBuf], config: &TalkConfig) -> Result<ParseOutput<'static>> {
    let files = sources::discover(paths, config)?;
    let output = talk_dsl::parse_files(&files)?;
    Ok(output)
}

fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

fn cmd_check(paths: &[PathBuf], config: &TalkConfig) -> Result<()> {
    let files = sources::discover(paths, config)?;
    println!(
        "{} {} source file(s)",
        "Checking".green().bold(),
        files.len()
    );

    let output = talk_dsl::parse_files(&files)?;
    for key in [Key::Class, Key::Enumeration, Key::Glossary, Key::Protocol] {
        println!("  {}: {}", key.as_str().cyan(), output.contexts(key).len());
    }

    println!("{}", "Valid.".green());
    Ok(())
}

fn cmd_dump(
    paths: &[PathBuf],
    out: Option<&Path>,
    compact: bool,
    config: &TalkConfig,
) -> Result<()> {
    let output = load(paths, config)?;
    let json = render_json(&output.results(), config.pretty && !compact)?;

    match out {
        Some(out) => {
            fs::write(out, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", out.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct SymbolRow<'a> {
    name: &'a str,
    #[serde(flatten)]
    location: &'a Location,
}

fn cmd_symbols(paths: &[PathBuf], json: bool, config: &TalkConfig) -> Result<()> {
    let output = load(paths, config)?;
    let registry = output.registry();

    if !json {
        print!("{registry}");
        return Ok(());
    }

    let table: BTreeMap<Namespace, Vec<SymbolRow<'_>>> = Namespace::ALL
        .into_iter()
        .map(|namespace| {
            let rows = registry
                .symbols(namespace)
                .into_iter()
                .map(|symbol| SymbolRow {
                    name: &symbol.name,
                    location: &symbol.location,
                })
                .collect();
            (namespace, rows)
        })
        .collect();
    println!("{}", render_json(&table, config.pretty)?);
    Ok(())
}
