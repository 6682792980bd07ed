// # dnsync - Git-Declared DNS Sync
//
// This binary is a THIN integration layer: all reconciliation logic lives in
// dnsync-core. It is meant to run once per push in CI.
//
// The binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering the remote store and history source plugins
// 4. Running one sync and mapping its outcome to an exit code
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Cloudflare
// - `CLOUDFLARE_API_TOKEN`: API token with Zone:DNS:Edit permission (required)
// - `CLOUDFLARE_ZONE_ID`: Zone holding the managed records (required)
//
// ### History
// - `DNSYNC_REPO_DIR`: Repository root (default: `.`)
// - `DNSYNC_RECORDS_DIR`: Declaration directory (default: `records`)
// - `DNSYNC_BASE_REF`: Start of the range (default: `HEAD~1`)
// - `DNSYNC_HEAD_REF`: End of the range (default: `HEAD`)
//
// ### Engine
// - `DNSYNC_MAX_WORKERS`: Record names applied concurrently (default: 1)
// - `DNSYNC_MODE`: `live` or `dry-run` (default: `live`)
// - `DNSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: `info`)
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// export CLOUDFLARE_ZONE_ID=your_zone
// export DNSYNC_MODE=dry-run
//
// dnsync
// ```

use anyhow::{Context, Result};
use dnsync_core::{
    EngineConfig, Error as SyncError, HistoryConfig, ProviderConfig, Registry, SyncConfig,
    SyncEngine, SyncReport,
};
use std::env;
use std::process::ExitCode;
use tokio::sync::oneshot;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for the outcomes a CI job needs to tell apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsyncExitCode {
    /// Every planned op applied (or nothing to do)
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// History, parsing or lookup failure; nothing was mutated
    RuntimeError = 2,
    /// The declared records break a DNS coexistence rule; nothing was mutated
    ConstraintViolation = 3,
    /// Some ops failed or were not attempted
    PartialFailure = 4,
}

impl From<DnsyncExitCode> for ExitCode {
    fn from(code: DnsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl DnsyncExitCode {
    fn for_error(e: &anyhow::Error) -> Self {
        match e.downcast_ref::<SyncError>() {
            Some(SyncError::Constraint(_)) => DnsyncExitCode::ConstraintViolation,
            Some(SyncError::Config(_)) => DnsyncExitCode::ConfigError,
            _ => DnsyncExitCode::RuntimeError,
        }
    }

    fn for_report(report: &SyncReport) -> Self {
        if report.is_success() {
            DnsyncExitCode::Success
        } else {
            DnsyncExitCode::PartialFailure
        }
    }
}

/// Application configuration
///
/// Holds the API token, so it has no `Debug` impl.
struct Config {
    api_token: String,
    zone_id: String,
    repo_dir: String,
    records_dir: String,
    base_ref: String,
    head_ref: String,
    max_workers: usize,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let raw_workers = var("DNSYNC_MAX_WORKERS", "1");
        let max_workers: usize = raw_workers
            .trim()
            .parse()
            .with_context(|| format!("DNSYNC_MAX_WORKERS must be a positive integer. Got: {}", raw_workers))?;

        let dry_run = match var("DNSYNC_MODE", "live").to_lowercase().as_str() {
            "live" => false,
            "dry-run" => true,
            other => anyhow::bail!("DNSYNC_MODE '{}' is not valid. Valid modes: live, dry-run", other),
        };

        Ok(Self {
            api_token: lookup("CLOUDFLARE_API_TOKEN").unwrap_or_default(),
            zone_id: lookup("CLOUDFLARE_ZONE_ID").unwrap_or_default(),
            repo_dir: var("DNSYNC_REPO_DIR", "."),
            records_dir: var("DNSYNC_RECORDS_DIR", "records"),
            base_ref: var("DNSYNC_BASE_REF", "HEAD~1"),
            head_ref: var("DNSYNC_HEAD_REF", "HEAD"),
            max_workers,
            dry_run,
            log_level: var("DNSYNC_LOG_LEVEL", "info"),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN is required. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            );
        }

        if self.zone_id.trim().is_empty() {
            anyhow::bail!(
                "CLOUDFLARE_ZONE_ID is required. \
                Set it via: export CLOUDFLARE_ZONE_ID=your_zone_id"
            );
        }

        if !(1..=32).contains(&self.max_workers) {
            anyhow::bail!(
                "DNSYNC_MAX_WORKERS must be between 1 and 32. Got: {}",
                self.max_workers
            );
        }

        self.level()?;
        self.to_sync_config().validate()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DNSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            provider: ProviderConfig::Cloudflare {
                api_token: self.api_token.trim().to_string(),
                zone_id: self.zone_id.trim().to_string(),
            },
            history: HistoryConfig::Git {
                repo_dir: self.repo_dir.clone(),
                records_dir: self.records_dir.clone(),
                base_ref: self.base_ref.clone(),
                head_ref: self.head_ref.clone(),
            },
            engine: EngineConfig {
                max_workers: self.max_workers,
                dry_run: self.dry_run,
            },
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnsyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    info!(
        "Starting dnsync [mode: {}]",
        if config.dry_run { "DRY-RUN" } else { "LIVE" }
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsyncExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_sync(config.to_sync_config()).await {
            Ok(report) => {
                println!("{}", report);
                DnsyncExitCode::for_report(&report)
            }
            Err(e) => {
                error!("Sync failed: {:#}", e);
                DnsyncExitCode::for_error(&e)
            }
        }
    });

    code.into()
}

/// Run one sync
async fn run_sync(config: SyncConfig) -> Result<SyncReport> {
    let registry = Registry::new();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare remote store");
        dnsync_provider_cloudflare::register(&registry);
    }

    #[cfg(feature = "git")]
    {
        info!("Registering git history source");
        dnsync_history_git::register(&registry);
    }

    let store = registry.create_store(&config.provider, config.engine.dry_run)?;
    let history = registry.create_history(&config.history)?;
    info!(
        "Syncing {} history into {}",
        history.source_name(),
        store.provider_name()
    );

    let engine = SyncEngine::new(history, store, &config.engine)?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signals = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                warn!("Received {}, finishing in-flight ops only", signal);
                let _ = shutdown_tx.send(());
            }
            Err(e) => error!("Shutdown handling unavailable: {}", e),
        }
    });

    let report = engine.run_with_shutdown(Some(shutdown_rx)).await;
    signals.abort();

    Ok(report?)
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
