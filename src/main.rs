//! Command-line front end for the iterative resolver.
//!
//! Resolves one domain name to an IPv4 address by walking the delegation
//! chain from a root server, the way a recursive resolver does internally.
//!
//! # Usage
//!
//! ```bash
//! # Resolve from a.root-servers.net
//! iterative-resolver example.com
//!
//! # Show every server asked on the way
//! iterative-resolver --trace twitter.com
//!
//! # Start from another root and log each hop
//! iterative-resolver --root 199.9.14.201 --log-level debug example.org
//! ```
//!
//! Settings can also come from `iterative-resolver.toml` (see [`Config`]);
//! flags given here override the file.

use std::net::Ipv4Addr;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use iterative_resolver::config::{CliOverrides, Config};
use iterative_resolver::Resolver;

#[derive(Parser)]
#[command(name = "iterative-resolver")]
#[command(version)]
#[command(about = "Resolve a domain to an IPv4 address by following referrals from the root")]
struct Cli {
    /// Domain name to resolve, e.g. example.com
    domain: String,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Root server to start from
    #[arg(short = 'r', long)]
    root: Option<Ipv4Addr>,

    /// Read timeout per attempt in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Attempts per hop before giving up on a server
    #[arg(long)]
    attempts: Option<u32>,

    /// Referrals followed per name before giving up
    #[arg(long)]
    max_referrals: Option<usize>,

    /// How deep nameserver host name lookups may nest
    #[arg(long)]
    max_ns_depth: Option<usize>,

    /// Queries one resolution may send in total
    #[arg(long)]
    max_hops: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the chain of servers queried
    #[arg(short = 't', long)]
    trace: bool,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        root_server: cli.root,
        timeout_ms: cli.timeout_ms,
        attempts: cli.attempts,
        max_referrals: cli.max_referrals,
        max_ns_depth: cli.max_ns_depth,
        max_hops: cli.max_hops,
        log_level: cli.log_level.clone(),
    };
    let config = Config::load(cli.config.as_deref(), overrides)?;

    init_logging(&config.logging.level);

    let mut resolver = Resolver::from_config(&config.resolver);
    match resolver.resolve_with_trace(&cli.domain) {
        Ok(resolution) => {
            if cli.trace {
                println!("{}", resolution);
            } else {
                println!("{}", resolution.address);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(domain = %cli.domain, retryable = e.is_retryable(), "resolution failed");
            eprintln!("Error resolving {}: {}", cli.domain, e);
            Ok(ExitCode::FAILURE)
        }
    }
}
