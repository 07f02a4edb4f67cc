// # dnsync
//
// Keeps a subdomain's A/AAAA records equal to a list of addresses.
//
// This binary is a THIN integration layer:
// - Parse flags (with DNSYNC_* environment fallbacks)
// - Initialize logging and the runtime
// - Wire ConfigStore, the address file, the Cloudflare provider and the
//   engine together
// - Print the report and map the outcome to an exit code
//
// All reconciliation logic lives in dnsync-core.
//
// ## Usage
//
// ```bash
// dnsync init                       # prompt for credentials, write settings.txt
// dnsync run --ips ips.txt          # reconcile once
// dnsync run --dry-run              # show the plan without applying it
// dnsync run --json                 # machine-readable report on stdout
// ```
//
// Logs go to stderr; stdout carries only the report.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dnsync_core::setup::{Collector, SetupField, collect_configuration};
use dnsync_core::{
    ConfigStore, EngineConfig, ReconcileEngine, RunStatus, read_desired_addresses,
};
use dnsync_provider_cloudflare::CloudflareProvider;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible run outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsyncExitCode {
    /// Every planned operation succeeded (or nothing to do)
    Converged = 0,
    /// Configuration, input, authentication or fetch failure
    Fatal = 1,
    /// Run completed but at least one operation failed
    Degraded = 2,
}

impl From<DnsyncExitCode> for ExitCode {
    fn from(code: DnsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<RunStatus> for DnsyncExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Converged => DnsyncExitCode::Converged,
            RunStatus::Degraded => DnsyncExitCode::Degraded,
        }
    }
}

/// Reconcile a subdomain's A/AAAA records against a list of addresses
#[derive(Parser, Debug)]
#[command(name = "dnsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file written by `init`
    #[arg(long, env = "DNSYNC_CONFIG", default_value = "settings.txt", global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DNSYNC_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prompt for credentials, zone and subdomain, and save them
    Init {
        /// Do not look up the zone id (it is resolved on every run instead)
        #[arg(long)]
        skip_zone_lookup: bool,
    },

    /// Reconcile the subdomain once
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// File with one IP address per line
    #[arg(long, env = "DNSYNC_IPS", default_value = "ips.txt")]
    ips: PathBuf,

    /// Print the plan without creating or deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Attempts per provider call, first try included
    #[arg(long, env = "DNSYNC_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: usize,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "DNSYNC_RETRY_BASE_MS", default_value_t = 1000)]
    retry_base_ms: u64,

    /// Creates (or deletes) in flight at once
    #[arg(long, env = "DNSYNC_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,
}

impl RunArgs {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_attempts: self.max_attempts,
            base_delay_ms: self.retry_base_ms,
            concurrency: self.concurrency,
            ..EngineConfig::default()
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&cli.log_level))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsyncExitCode::Fatal.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsyncExitCode::Fatal.into();
        }
    };

    let outcome = rt.block_on(async {
        match cli.command {
            Commands::Init { skip_zone_lookup } => run_init(&cli.config, skip_zone_lookup)
                .await
                .map(|()| DnsyncExitCode::Converged),
            Commands::Run(args) => run_once(&cli.config, &args).await,
        }
    });

    match outcome {
        Ok(code) => code.into(),
        Err(e) => {
            error!("{:#}", e);
            DnsyncExitCode::Fatal.into()
        }
    }
}

/// `dnsync init`
async fn run_init(path: &Path, skip_zone_lookup: bool) -> Result<()> {
    let store = ConfigStore::new(path);

    let existing = if store.exists() {
        match store.load().await {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring unreadable settings at {}: {}", path.display(), e);
                None
            }
        }
    } else {
        None
    };

    let mut collector = StdinCollector::new();
    let mut config = collect_configuration(&mut collector, existing.as_ref())
        .context("Setup answers are not valid")?;

    if skip_zone_lookup {
        info!("Skipping zone lookup; it will run on every reconciliation");
    } else if config.zone_id.is_none() {
        let provider = CloudflareProvider::new(&config)?;
        let zone_id = provider
            .resolve_zone_id(&config.zone)
            .await
            .with_context(|| format!("Failed to look up zone {}", config.zone))?;
        config = config.with_zone_id(zone_id);
    }

    store
        .save(&config)
        .await
        .with_context(|| format!("Failed to save settings to {}", path.display()))?;

    info!("Saved settings for {} to {}", config.subdomain, path.display());
    println!("Saved settings to {}", path.display());
    Ok(())
}

/// `dnsync run`
async fn run_once(path: &Path, args: &RunArgs) -> Result<DnsyncExitCode> {
    let config = ConfigStore::new(path).load().await?;
    let desired = read_desired_addresses(&args.ips).await?;
    info!(
        "Loaded {} desired address(es) for {} from {}",
        desired.len(),
        config.subdomain,
        args.ips.display()
    );

    let provider = CloudflareProvider::new(&config)?;
    let engine = ReconcileEngine::new(Box::new(provider), &config, args.engine_config())?;

    if args.dry_run {
        let plan = engine.plan(&desired).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            println!("Dry run for {} ({} operation(s)):", config.subdomain, plan.operation_count());
            print!("{}", plan);
        }
        return Ok(DnsyncExitCode::Converged);
    }

    let report = engine.reconcile(&desired).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    Ok(report.status.into())
}

/// Reads setup answers from the terminal
///
/// Prompts go to stderr so stdout stays clean.
struct StdinCollector {
    input: std::io::StdinLock<'static>,
}

impl StdinCollector {
    fn new() -> Self {
        Self {
            input: std::io::stdin().lock(),
        }
    }
}

impl Collector for StdinCollector {
    fn prompt(&mut self, field: SetupField, current: Option<&str>) -> dnsync_core::Result<String> {
        let mut stderr = std::io::stderr();
        match current {
            Some(_) if field.is_secret() => write!(stderr, "{} [keep current]: ", field.label())?,
            Some(value) => write!(stderr, "{} [{}]: ", field.label(), value)?,
            None => write!(stderr, "{}: ", field.label())?,
        }
        stderr.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}
