//! Kalo - Main entrypoint.
//!
//! Loads configuration, initializes logging and runs one subcommand against a
//! trie built from an input file.

use clap::{Parser, Subcommand};
use kalo_lib::cli;
use kalo_lib::config::{KaloConfig, LogConfig};
use kalo_lib::data_structures::{KaloTrie, KaloTrieConfig};
use kalo_lib::error::{report_error, ErrorContext, KaloError, KaloResult};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line arguments for Kalo.
#[derive(Parser, Debug)]
#[clap(name = "kalo", version, author, about)]
struct Args {
    /// Path to configuration file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Command to execute
    #[clap(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Load `key=value` lines and print the resulting tree
    Print {
        /// Input file
        #[clap(short, long, value_parser)]
        input: PathBuf,
    },

    /// Load `key=value` lines and list the entries under a prefix
    Query {
        /// Input file
        #[clap(short, long, value_parser)]
        input: PathBuf,

        /// Key prefix; empty lists everything
        #[clap(short, long, default_value = "")]
        prefix: String,

        /// Emit JSON instead of tab separated lines
        #[clap(long)]
        json: bool,
    },

    /// Insert disjoint keys from several threads and verify them
    Stress {
        /// Writer threads (defaults to the configured value)
        #[clap(short, long)]
        threads: Option<usize>,

        /// Keys per thread (defaults to the configured value)
        #[clap(short, long)]
        keys: Option<usize>,
    },

    /// Validate the configuration file
    Validate,

    /// Generate a default configuration file
    GenConfig {
        /// Path to output configuration file
        #[clap(short, long, value_parser)]
        output: PathBuf,
    },
}

/// Initialize the logging system.
fn init_logging(log: &LogConfig) -> KaloResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_line_number(log.source_location)
        .with_file(log.source_location)
        .with_thread_names(true);

    let installed = if log.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.pretty().finish())
    };
    installed.map_err(|e| KaloError::Custom(format!("Failed to set global tracing subscriber: {e}")))
}

fn load_trie(input: &Path, config: &KaloConfig) -> KaloResult<KaloTrie<String>> {
    let reader = BufReader::new(File::open(input)?);
    let entries = cli::read_entries(reader)?;
    cli::build_trie(entries, KaloTrieConfig::from(&config.trie))
}

fn run(command: Command, config: &KaloConfig) -> KaloResult<()> {
    let stdout = io::stdout();
    match command {
        Command::Print { input } => {
            let trie = load_trie(&input, config)?;
            cli::print_trie(&trie, &mut stdout.lock())
        }
        Command::Query {
            input,
            prefix,
            json,
        } => {
            let trie = load_trie(&input, config)?;
            let count = cli::query_prefix(&trie, &prefix, json, &mut stdout.lock())?;
            info!("{} entries match prefix {:?}", count, prefix);
            Ok(())
        }
        Command::Stress { threads, keys } => {
            let report = cli::run_stress(
                threads.unwrap_or(config.stress.threads),
                keys.unwrap_or(config.stress.keys_per_thread),
                KaloTrieConfig::from(&config.trie),
            )?;
            serde_json::to_writer_pretty(stdout.lock(), &report)?;
            println!();
            if report.verified != report.inserted {
                return Err(KaloError::Custom(format!(
                    "{} of {} keys were not visible after the run",
                    report.inserted - report.verified,
                    report.inserted
                )));
            }
            Ok(())
        }
        Command::Validate => {
            info!("Configuration validated successfully");
            Ok(())
        }
        Command::GenConfig { output } => {
            info!("Generating default configuration");
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let toml = toml::to_string_pretty(&KaloConfig::default())
                .map_err(|e| KaloError::Custom(format!("Failed to serialize config: {e}")))?;
            std::fs::write(&output, toml)?;

            info!("Default configuration written to {:?}", output);
            Ok(())
        }
    }
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    // gen-config must work even when the existing config is broken.
    let config = match kalo_lib::init(args.config.as_deref()) {
        Ok(config) => config,
        Err(_) if matches!(args.command, Command::GenConfig { .. }) => KaloConfig::default(),
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.log) {
        eprintln!("{e}");
        process::exit(1);
    }

    if let Err(e) = run(args.command, &config) {
        report_error(ErrorContext::new(e, "kalo"));
        process::exit(1);
    }
}
