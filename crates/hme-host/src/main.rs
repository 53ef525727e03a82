//! HME host entry point.
//!
//! Loads configuration, builds the application registry, announces each
//! application and serves receiver connections until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML file, CLI overrides applied on top
//!  └─ build_registry()       -- samples, --app names, [[apps]] entries
//!  └─ announce_all()         -- one announcement per application
//!  └─ run_server()           -- accept loop (Tokio task)
//!       └─ Session::run()    -- one blocking thread per connected receiver
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hme_host::application::registry::AppRegistry;
use hme_host::application::samples;
use hme_host::infrastructure::network::discovery::{announce_all, LoggingAnnouncer};
use hme_host::infrastructure::network::server::{run_server, ServerSettings};
use hme_host::infrastructure::storage::config::{load_config, HostConfig, DEFAULT_CONFIG_FILE};

/// How long shutdown waits for running sessions before exiting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serves HME applications to receivers on the local network.
#[derive(Debug, Parser)]
#[command(name = "hme-host", about = "Runs the given HME applications", version)]
struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, short = 'c', env = "HME_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// TCP port to listen on; overrides `[server] port`.
    #[arg(long, short = 'p', env = "HME_PORT")]
    port: Option<u16>,

    /// Debug output; overrides `[server] log_level`.
    #[arg(long, short = 'd')]
    debug: bool,

    /// Register every sample application.
    #[arg(long, short = 's')]
    samples: bool,

    /// Register the named built-in application. May be repeated.
    #[arg(long = "app", short = 'a', value_name = "NAME")]
    apps: Vec<String>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut HostConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.debug {
            config.server.log_level = "debug".to_string();
        }
    }
}

/// Registers samples (with `--samples`), then `--app` names, then enabled
/// `[[apps]]` entries, whose title and resource directory take precedence.
fn build_registry(config: &HostConfig, with_samples: bool, names: &[String]) -> AppRegistry {
    let mut registry = AppRegistry::new();

    if with_samples {
        for entry in samples::all() {
            registry.register(entry);
        }
    }

    for name in names {
        match samples::sample(name) {
            Some(entry) => {
                registry.register(entry);
            }
            None => warn!("unknown application '{name}'; known: {:?}", samples::SAMPLE_NAMES),
        }
    }

    for app in config.apps.iter().filter(|a| a.enabled) {
        let Some(mut entry) = samples::sample(&app.name) else {
            warn!("config names unknown application '{}'", app.name);
            continue;
        };
        if let Some(title) = &app.title {
            entry = entry.with_title(title.clone());
        }
        if let Some(dir) = &app.resource_dir {
            entry = entry.with_resource_dir(dir.clone());
        }
        registry.register(entry);
    }

    for entry in registry.iter() {
        info!(
            "registering application '{}', title: '{}'",
            entry.name(),
            entry.title()
        );
    }
    registry
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    cli.apply(&mut config);

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let registry = build_registry(&config, cli.samples, &cli.apps);
    if registry.is_empty() {
        anyhow::bail!("no applications to serve; use --samples, --app NAME or [[apps]] in the config");
    }
    let settings = ServerSettings::from_config(&config.server)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the Tokio runtime")?;
    let result = runtime.block_on(serve(settings, registry));
    // Sessions blocked on socket reads would otherwise hold the process open.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn serve(settings: ServerSettings, registry: AppRegistry) -> anyhow::Result<()> {
    let announced = announce_all(&LoggingAnnouncer, &registry, settings.bind_addr.port());
    info!("announced {announced} of {} applications", registry.len());

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    run_server(settings, Arc::new(registry), running).await?;
    info!("HME host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hme_host::infrastructure::storage::config::AppConfigEntry;

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["hme-host"]);

        // Assert
        assert!(!cli.samples);
        assert!(!cli.debug);
        assert!(cli.apps.is_empty());
    }

    #[test]
    fn test_cli_repeated_app_flags() {
        let cli = Cli::parse_from(["hme-host", "--app", "clock", "-a", "hello", "--port", "7288"]);
        assert_eq!(cli.apps, vec!["clock", "hello"]);
        assert_eq!(cli.port, Some(7288));
    }

    #[test]
    fn test_cli_overrides_config() {
        // Arrange
        let cli = Cli::parse_from(["hme-host", "--port", "7000", "--debug"]);
        let mut config = HostConfig::default();

        // Act
        cli.apply(&mut config);

        // Assert
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn test_build_registry_with_samples() {
        let registry = build_registry(&HostConfig::default(), true, &[]);
        assert_eq!(registry.len(), samples::SAMPLE_NAMES.len());
    }

    #[test]
    fn test_build_registry_skips_unknown_names() {
        let registry = build_registry(
            &HostConfig::default(),
            false,
            &["clock".to_string(), "nonexistent".to_string()],
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.get("clock").is_some());
    }

    #[test]
    fn test_build_registry_applies_config_overrides() {
        // Arrange
        let mut config = HostConfig::default();
        config.apps.push(AppConfigEntry {
            name: "clock".to_string(),
            title: Some("Wall Clock".to_string()),
            resource_dir: Some(PathBuf::from("/srv/clock")),
            enabled: true,
        });
        let mut disabled = AppConfigEntry::new("animate");
        disabled.enabled = false;
        config.apps.push(disabled);

        // Act
        let registry = build_registry(&config, false, &[]);

        // Assert
        let clock = registry.get("clock").expect("clock registered");
        assert_eq!(clock.title(), "Wall Clock");
        assert_eq!(clock.resource_dir, Some(PathBuf::from("/srv/clock")));
        assert!(registry.get("animate").is_none());
    }
}
