//! SECWS - Stateless IPv4 packet filter
//!
//! Command-line front end for the rule table and verdict engine.
//!
//! # Usage
//!
//! ```bash
//! secws load rules.txt                 # Replace the table from a text rule file
//! secws show                           # Print the table as text rules
//! secws show --raw                     # Print the table as hex records
//! secws clear                          # Empty the table
//! secws check --in enp0s8 --out enp0s9 --proto tcp \
//!     --src 10.0.1.5 --dst 10.0.2.5 --dport 22 --ack
//! secws config --save                  # Print (and write) the effective config
//! ```
//!
//! The table is persisted as raw records between invocations.

use clap::{Parser, Subcommand};
use secws::config;
use secws::core::codec::RECORD_WIDTH;
use secws::core::engine::PacketInfo;
use secws::core::firewall::{Protocol, parse_rules};
use secws::device::FirewallDevice;
use secws::{utils, validators};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "secws")]
#[command(about = "Stateless IPv4 packet filter - rule table and verdict engine", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Configuration file (defaults to the XDG config directory)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Persisted rule table (defaults to the XDG state directory)
    #[arg(long, value_name = "FILE", global = true)]
    state: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the rule table from a text rule file
    Load {
        /// One rule per line; `#` starts a comment
        file: PathBuf,
    },
    /// Print the current rule table
    Show {
        /// Print hex-encoded records instead of text rules
        #[arg(long)]
        raw: bool,
    },
    /// Remove every rule
    Clear,
    /// Print the verdict for a synthetic packet
    Check {
        /// Interface the packet arrived on
        #[arg(long = "in", value_name = "IFACE", value_parser = parse_interface)]
        ingress: String,
        /// Interface the packet leaves through
        #[arg(long = "out", value_name = "IFACE", value_parser = parse_interface)]
        egress: String,
        /// tcp, udp, icmp or other
        #[arg(long, value_parser = parse_protocol)]
        proto: Protocol,
        #[arg(long)]
        src: Ipv4Addr,
        #[arg(long)]
        dst: Ipv4Addr,
        #[arg(long, default_value_t = 0)]
        sport: u16,
        #[arg(long, default_value_t = 0)]
        dport: u16,
        /// TCP ACK flag set
        #[arg(long)]
        ack: bool,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to the configuration file
        #[arg(long)]
        save: bool,
    },
}

fn parse_interface(name: &str) -> Result<String, String> {
    validators::validate_interface(name)
}

fn parse_protocol(input: &str) -> Result<Protocol, String> {
    match input.to_ascii_lowercase().parse() {
        Ok(Protocol::Any) | Err(_) => Err(format!(
            "'{input}' is not one of tcp, udp, icmp, other"
        )),
        Ok(protocol) => Ok(protocol),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match handle_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Uses an explicit path as given. The XDG default gets its directory
/// created on first use.
fn resolve_file(
    cli_path: Option<PathBuf>,
    default: fn() -> Option<PathBuf>,
    flag: &str,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = cli_path {
        return Ok(path);
    }
    let path = default().ok_or_else(|| format!("Cannot determine default location; pass {flag}"))?;
    if let Some(dir) = path.parent() {
        utils::ensure_dir(dir)?;
    }
    Ok(path)
}

fn state_path(cli_path: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    resolve_file(cli_path, utils::rules_file_path, "--state")
}

fn hex(record: &[u8]) -> String {
    record.iter().map(|b| format!("{b:02x}")).collect()
}

fn handle_cli(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let engine_config = config::load_config(cli.config.as_deref());
    let device = FirewallDevice::new(&engine_config);

    // Only show and check read the state file
    match cli.command {
        Commands::Load { file } => {
            let state = state_path(cli.state)?;
            let text = std::fs::read_to_string(&file)
                .map_err(|e| format!("Cannot read {}: {e}", file.display()))?;
            let rules = parse_rules(&text)?;
            let count = rules.len();
            device.load_rules(rules)?;
            device.persist(&state)?;
            println!("✓ Loaded {count} rule(s) from {}", file.display());
        }
        Commands::Show { raw } => {
            device.restore(&state_path(cli.state)?)?;
            let records = device.rules_show();
            if records.is_empty() {
                println!("(no rules, default policy: {})", engine_config.default_policy);
            }
            if raw {
                for record in records.chunks_exact(RECORD_WIDTH) {
                    println!("{}", hex(record));
                }
            } else {
                for rule in device.table().snapshot().iter() {
                    println!("{rule}");
                }
            }
        }
        Commands::Clear => {
            let state = state_path(cli.state)?;
            device.rules_store(&[])?;
            device.persist(&state)?;
            println!("✓ Rule table cleared");
        }
        Commands::Check {
            ingress,
            egress,
            proto,
            src,
            dst,
            sport,
            dport,
            ack,
        } => {
            device.restore(&state_path(cli.state)?)?;
            let packet = PacketInfo {
                protocol: proto,
                src_addr: src,
                dst_addr: dst,
                src_port: sport,
                dst_port: dport,
                ack,
            };
            let direction = engine_config.interfaces.resolve(&ingress, &egress);
            let verdict = device.inspect(&packet, &ingress, &egress);
            println!("{direction} {verdict}");
        }
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&engine_config)?);
            if save {
                let path = resolve_file(cli.config, utils::config_file_path, "--config")?;
                config::save_config(&engine_config, Some(&path))?;
                println!("✓ Saved to {}", path.display());
            }
        }
    }

    Ok(())
}
