//! Daemon orchestration -- configuration assembly and dispatcher lifecycle.
//!
//! The [`Orchestrator`] owns the validated configuration. It connects to the
//! container runtime, builds the dispatcher, and waits for either the first
//! fatal error or a shutdown signal.
//!
//! # Configuration precedence
//!
//! 1. CLI flags (applied by [`load_config`])
//! 2. Environment variables (`TAILPOST_{SECTION}_{FIELD}`)
//! 3. Config file (explicit `--config`, or `tailpost.toml` if present)
//! 4. Defaults

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use tailpost_container_tail::{
    BollardRuntime, ContainerRuntime, ContainerTailConfig, DispatcherBuilder, LogSink,
};
use tailpost_core::config::TailpostConfig;
use tailpost_core::error::TailpostError;

use crate::cli::DaemonCli;

/// Config file used when `--config` is not given. Missing is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "tailpost.toml";

/// Load configuration and apply environment and CLI overrides, then validate.
///
/// # Errors
///
/// Returns an error if an explicitly given config file is missing, the file
/// cannot be parsed, or the merged configuration is invalid.
pub async fn load_config(cli: &DaemonCli) -> Result<TailpostConfig> {
    let mut config = match &cli.config {
        Some(path) => TailpostConfig::load(path).await,
        None => TailpostConfig::load_or_default(Path::new(DEFAULT_CONFIG_PATH)).await,
    }
    .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    apply_cli_overrides(&mut config, cli);

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

/// Apply CLI flags on top of a loaded configuration.
pub fn apply_cli_overrides(config: &mut TailpostConfig, cli: &DaemonCli) {
    if !cli.services.is_empty() {
        config.tail.services = cli.services.clone();
    }
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(socket) = &cli.docker_socket {
        config.docker.socket = socket.clone();
    }
    if let Some(lines) = cli.backlog_lines {
        config.tail.backlog_lines = lines;
    }
    if cli.no_color {
        config.tail.color = false;
    }
}

/// The daemon orchestrator.
pub struct Orchestrator {
    config: TailpostConfig,
}

impl Orchestrator {
    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: TailpostConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        Ok(Self { config })
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &TailpostConfig {
        &self.config
    }

    /// Connect to Docker and tail until a fatal error or Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the Docker daemon is unreachable or the dispatcher
    /// reports a fatal error.
    pub async fn run(self) -> Result<()> {
        let tail_config = ContainerTailConfig::from_core(&self.config);
        let runtime = Arc::new(
            BollardRuntime::connect(&tail_config)
                .await
                .map_err(TailpostError::from)
                .map_err(|e| anyhow::anyhow!("failed to connect to docker: {}", e))?,
        );

        self.run_with(runtime, None, shutdown_signal()).await
    }

    /// Run the dispatcher on `runtime` until a fatal error or `shutdown` resolves.
    ///
    /// When `sink` is `None`, tailed output goes to standard error.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime ping fails or the dispatcher reports a
    /// fatal error. A completed `shutdown` future is a clean exit.
    pub async fn run_with<R, F>(
        self,
        runtime: Arc<R>,
        sink: Option<Arc<dyn LogSink>>,
        shutdown: F,
    ) -> Result<()>
    where
        R: ContainerRuntime,
        F: Future<Output = ()>,
    {
        runtime
            .ping()
            .await
            .map_err(TailpostError::from)
            .map_err(|e| anyhow::anyhow!("docker daemon not reachable: {}", e))?;

        tailpost_core::metrics::describe_all();

        let tail_config = ContainerTailConfig::from_core(&self.config);
        let services = tail_config.services.clone();

        let mut builder = DispatcherBuilder::new()
            .config(tail_config)
            .runtime(runtime);
        if let Some(sink) = sink {
            builder = builder.sink(sink);
        }
        let (dispatcher, fatal_rx) = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build dispatcher: {}", e))?;

        tracing::info!(services = ?services, "tailpost running");

        let result = tokio::select! {
            err = dispatcher.run(fatal_rx) => {
                tracing::error!(error = %err, "fatal error, shutting down");
                Err(anyhow::Error::from(TailpostError::from(err)))
            }
            () = shutdown => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
        };

        dispatcher.shutdown().await;
        tracing::info!("tailpost shut down");
        result
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(services: &[&str]) -> TailpostConfig {
        let mut config = TailpostConfig::default();
        config.tail.services = services.iter().map(|s| (*s).to_owned()).collect();
        config
    }

    #[test]
    fn cli_services_replace_config_services() {
        let mut config = config_with(&["web"]);
        let cli = DaemonCli {
            services: vec!["api".to_owned(), "worker".to_owned()],
            ..Default::default()
        };
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.tail.services, vec!["api", "worker"]);
    }

    #[test]
    fn empty_cli_services_keep_config_services() {
        let mut config = config_with(&["web"]);
        apply_cli_overrides(&mut config, &DaemonCli::default());
        assert_eq!(config.tail.services, vec!["web"]);
        assert!(config.tail.color);
    }

    #[test]
    fn cli_flags_override_fields() {
        let mut config = config_with(&["web"]);
        let cli = DaemonCli {
            log_level: Some("debug".to_owned()),
            log_format: Some("json".to_owned()),
            docker_socket: Some("/run/docker.sock".to_owned()),
            backlog_lines: Some(10),
            no_color: true,
            ..Default::default()
        };
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.docker.socket, "/run/docker.sock");
        assert_eq!(config.tail.backlog_lines, 10);
        assert!(!config.tail.color);
    }

    #[test]
    fn orchestrator_rejects_empty_services() {
        assert!(Orchestrator::new(TailpostConfig::default()).is_err());
        assert!(Orchestrator::new(config_with(&["web"])).is_ok());
    }
}
