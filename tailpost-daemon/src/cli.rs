//! CLI argument definitions for tailpost.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Tail the logs of docker compose services into one stream.
///
/// Attaches to running containers of the given services, follows container
/// start/stop events, and resumes a restarted container near its restart time.
#[derive(Parser, Debug, Default)]
#[command(name = "tailpost")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Service names to tail (compose service label values).
    ///
    /// Replaces `[tail] services` from the config file when given.
    #[arg(value_name = "SERVICES")]
    pub services: Vec<String>,

    /// Path to tailpost.toml configuration file.
    ///
    /// When omitted, `tailpost.toml` in the working directory is used if present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty, compact).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the Docker socket path.
    #[arg(long)]
    pub docker_socket: Option<String>,

    /// Override the number of backlog lines requested on first attach.
    #[arg(long)]
    pub backlog_lines: Option<usize>,

    /// Disable colored prefixes and notices.
    #[arg(long)]
    pub no_color: bool,

    /// Validate configuration and exit without connecting to Docker.
    #[arg(long)]
    pub validate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_services() {
        let cli = DaemonCli::parse_from(["tailpost", "web", "db"]);
        assert_eq!(cli.services, vec!["web", "db"]);
        assert!(cli.config.is_none());
        assert!(!cli.no_color);
    }

    #[test]
    fn parses_overrides() {
        let cli = DaemonCli::parse_from([
            "tailpost",
            "--config",
            "/tmp/t.toml",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--docker-socket",
            "/run/docker.sock",
            "--backlog-lines",
            "50",
            "--no-color",
            "--validate",
            "web",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("json"));
        assert_eq!(cli.docker_socket.as_deref(), Some("/run/docker.sock"));
        assert_eq!(cli.backlog_lines, Some(50));
        assert!(cli.no_color);
        assert!(cli.validate);
        assert_eq!(cli.services, vec!["web"]);
    }

    #[test]
    fn rejects_non_numeric_backlog() {
        let result = DaemonCli::try_parse_from(["tailpost", "--backlog-lines", "lots", "web"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        DaemonCli::command().debug_assert();
    }
}
