//! npad: capability-addressed paste store CLI
//!
//! Commands:
//!   put [FILE]        - store FILE (or stdin), print the capability token
//!   get TOKEN         - write the paste behind TOKEN to stdout
//!   expired TOKEN     - print whether TOKEN has expired
//!   gc                - run one garbage-collection pass
//!   daemon            - run the garbage collector until interrupted
//!   config show       - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use npad_compress::CompressionAlgorithm;
use npad_core::config::{BackendKind, NpadConfig};
use npad_core::RetentionClass;
use npad_crypto::CipherAlgorithm;
use npad_storage::{build_backend, ObjectBackend};
use npad_store::{GarbageCollector, GcState, PasteStore, StoreSettings};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "npad",
    version,
    about = "Capability-addressed paste store",
    long_about = "npad: store pastes behind unguessable tokens, optionally compressed \
                  and encrypted, with automatic expiry"
)]
struct Cli {
    /// Path to npad.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "NPAD_CONFIG",
        default_value = "/etc/npad/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "NPAD_LOG")]
    log: Option<String>,

    /// Log format; overrides [log] format
    #[arg(long, env = "NPAD_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a paste and print its token
    Put {
        /// File to store (default: stdin)
        file: Option<PathBuf>,
        /// Retention class: 0 = 20min/10MB, 1 = 8h/8MB, 2 = 14days/2MB, 3 = never/200KB
        #[arg(long, default_value_t = 1)]
        class: u8,
        /// Optional label, truncated to 32 bytes
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Fetch a paste and write it to stdout
    Get {
        token: String,
        /// Skip decompression and emit the stored encoding
        #[arg(long)]
        raw: bool,
    },

    /// Print whether a token has expired
    Expired { token: String },

    /// Remove expired pastes once and print a summary
    Gc,

    /// Run the background garbage collector until Ctrl-C
    Daemon,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, from_file) = load_config(&cli.config).await?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match &cli.log_format {
        Some(format) => format.clone(),
        None => parse_log_format(&config.log.format),
    };
    init_logging(&level, &format);

    if !from_file {
        warn!("config file not found: {}  (using defaults)", cli.config.display());
    }

    match cli.command {
        Commands::Put { file, class, name } => {
            cmd_put(&config, file.as_deref(), class, &name).await
        }
        Commands::Get { token, raw } => cmd_get(&config, &token, raw),
        Commands::Expired { token } => cmd_expired(&config, &token),
        Commands::Gc => cmd_gc(&config).await,
        Commands::Daemon => cmd_daemon(&config).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config, from_file),
    }
}

// ── Config loading and logging ────────────────────────────────────────────────

/// Load the config file, falling back to defaults when it does not exist.
/// The flag reports whether a file was read.
async fn load_config(path: &Path) -> Result<(NpadConfig, bool)> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((NpadConfig::default(), false))
    }
}

fn parse_log_format(s: &str) -> LogFormat {
    if s.eq_ignore_ascii_case("json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    }
}

/// Logs go to stderr; stdout carries tokens and paste bodies.
fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Store construction ────────────────────────────────────────────────────────

fn open_store(config: &NpadConfig) -> Result<PasteStore> {
    let settings = StoreSettings::from_config(config).context("invalid store settings")?;
    let backend = open_backend(config)?;
    info!(
        dir = %config.store.dir.display(),
        "{settings}"
    );
    Ok(PasteStore::new(settings, backend))
}

fn open_backend(config: &NpadConfig) -> Result<Arc<dyn ObjectBackend>> {
    build_backend(&config.store)
        .with_context(|| format!("opening {} backend", config.store.backend))
}

// ── `npad put` ────────────────────────────────────────────────────────────────

async fn cmd_put(config: &NpadConfig, file: Option<&Path>, class: u8, name: &str) -> Result<()> {
    let class = RetentionClass::try_from(class)?;
    let data = read_input(file).await?;
    let store = open_store(config)?;

    if store.settings().backend == BackendKind::Memory {
        warn!("memory backend: this paste is lost when the process exits");
    }

    let token = store
        .store(&data, class, name)
        .with_context(|| format!("storing paste ({class})"))?;
    println!("{token}");
    Ok(())
}

async fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => tokio::task::spawn_blocking(|| {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            Ok::<_, anyhow::Error>(buf)
        })
        .await
        .context("stdin reader task")?,
    }
}

// ── `npad get` ────────────────────────────────────────────────────────────────

fn cmd_get(config: &NpadConfig, token: &str, raw: bool) -> Result<()> {
    let store = open_store(config)?;
    let body = match store.retrieve(token, raw) {
        Ok(body) => body,
        Err(e) if e.is_concealed_not_found() => {
            tracing::debug!("retrieve failed: {e}");
            anyhow::bail!("paste not found");
        }
        Err(e) => return Err(e).context("retrieving paste"),
    };

    if raw {
        let compressor = store.settings().compressor;
        if !compressor.is_passthrough() {
            let algorithm = compressor.algorithm();
            info!(
                encoding = %algorithm,
                extension = algorithm.file_extension(),
                "raw output is compressed"
            );
        }
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body).context("writing paste to stdout")?;
    stdout.flush().context("flushing stdout")?;
    Ok(())
}

// ── `npad expired` ────────────────────────────────────────────────────────────

fn cmd_expired(config: &NpadConfig, token: &str) -> Result<()> {
    let store = open_store(config)?;
    println!("{}", store.is_expired(token));
    Ok(())
}

// ── `npad gc` ─────────────────────────────────────────────────────────────────

async fn cmd_gc(config: &NpadConfig) -> Result<()> {
    let backend = open_backend(config)?;
    if backend.kind() == BackendKind::Memory {
        warn!("memory backend: a one-shot sweep only sees this process's pastes");
    }

    let mut gc = GarbageCollector::new(backend);
    let now = npad_core::clock::now_unix();
    let report = tokio::task::spawn_blocking(move || gc.sweep(now))
        .await
        .context("gc task")?
        .context("gc sweep")?;

    println!("Scanned:    {}", report.scanned);
    println!("Removed:    {}", report.removed);
    println!("Failed:     {}", report.failed);
    println!("Remaining:  {}", report.remaining);
    Ok(())
}

// ── `npad daemon` ─────────────────────────────────────────────────────────────

async fn cmd_daemon(config: &NpadConfig) -> Result<()> {
    let store = open_store(config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "npad daemon starting");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let collector = if config.gc.enabled {
        Some(npad_store::gc::spawn(
            store.backend().clone(),
            config.gc.initial_delay(),
            config.gc.interval(),
            shutdown_rx,
        ))
    } else {
        info!("gc disabled: expired pastes are kept");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("received SIGINT");

    let _ = shutdown_tx.send(true);
    if let Some((collector, status)) = collector {
        if status.state() == GcState::Sweeping {
            info!("waiting for the running gc sweep to finish");
        }
        collector.await.context("gc task")?;
    }
    info!("npad daemon exiting cleanly");
    Ok(())
}

// ── `npad config show` ────────────────────────────────────────────────────────

fn cmd_config_show(config: &NpadConfig, config_path: &Path, from_file: bool) -> Result<()> {
    if from_file {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    match StoreSettings::from_config(config) {
        Ok(settings) => println!("# Effective: {settings}"),
        Err(e) => println!("# Invalid: {e}"),
    }
    println!("# Compression: {}", join_names(CompressionAlgorithm::ALL));
    println!("# Encryption:  NONE, {}", join_names(CipherAlgorithm::ALL));
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn join_names<T: std::fmt::Display>(names: impl IntoIterator<Item = T>) -> String {
    names
        .into_iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
