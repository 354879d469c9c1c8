use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};

use crate::config::validation::ConfigValidator;
use crate::core::{DispatchMode, PrefixMatching};

/// Every option can also be supplied through a `SERVICE_*` environment variable.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Static site and API gateway front door")]
pub struct Args {
    /// Interface to bind
    #[arg(long = "server-host", env = "SERVICE_SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long = "server-port", env = "SERVICE_SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// trace, debug, info, warn, error or fatal
    #[arg(long = "log-level", env = "SERVICE_SERVER_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[arg(
        long = "log-format",
        env = "SERVICE_SERVER_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Json
    )]
    pub log_format: LogFormat,

    /// Deadline for reading a request body
    #[arg(
        long = "read-timeout",
        env = "SERVICE_SERVER_TIMEOUT_READ",
        default_value = "15s",
        value_parser = humantime::parse_duration
    )]
    pub read_timeout: Duration,

    /// Deadline for streaming a response body
    #[arg(
        long = "write-timeout",
        env = "SERVICE_SERVER_TIMEOUT_WRITE",
        default_value = "10s",
        value_parser = humantime::parse_duration
    )]
    pub write_timeout: Duration,

    /// How long a kept-alive connection may wait for its next request
    #[arg(
        long = "idle-timeout",
        env = "SERVICE_SERVER_TIMEOUT_IDLE",
        default_value = "60s",
        value_parser = humantime::parse_duration
    )]
    pub idle_timeout: Duration,

    /// How long in-flight requests may run after a shutdown signal
    #[arg(
        long = "grace-period",
        env = "SERVICE_SERVER_TIMEOUT_GRACESHUT",
        default_value = "15s",
        value_parser = humantime::parse_duration
    )]
    pub grace_period: Duration,

    /// Deadline for a whole backend call, response body included
    #[arg(
        long = "upstream-timeout",
        env = "SERVICE_SERVER_TIMEOUT_UPSTREAM",
        default_value = "2m",
        value_parser = humantime::parse_duration
    )]
    pub upstream_timeout: Duration,

    /// Endpoint configuration file
    #[arg(long = "config", env = "SERVICE_CONFIG_PATH", default_value = "/path/to/config.json")]
    pub config_path: PathBuf,

    /// Reload the endpoint configuration when the file changes
    #[arg(
        long = "config-watch",
        env = "SERVICE_CONFIG_WATCH",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub watch_config: bool,

    #[arg(
        long = "dispatch-mode",
        env = "SERVICE_DISPATCH_MODE",
        value_enum,
        default_value_t = DispatchMode::FirstMatch
    )]
    pub dispatch_mode: DispatchMode,

    #[arg(
        long = "prefix-matching",
        env = "SERVICE_DISPATCH_PREFIX",
        value_enum,
        default_value_t = PrefixMatching::Strict
    )]
    pub prefix_matching: PrefixMatching,

    /// Serve static assets from this directory instead of the bundled ones.
    /// The directory must contain a `static/` folder.
    #[arg(long = "static-root", env = "SERVICE_STATIC_ROOT")]
    pub static_root: Option<PathBuf>,

    /// Expose Prometheus metrics on this address
    #[arg(long = "metrics-addr", env = "SERVICE_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Startup-resolved settings, shared read-only by every component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub log_format: LogFormat,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub grace_period: Duration,
    pub upstream_timeout: Duration,
    pub config_path: PathBuf,
    pub watch_config: bool,
    pub dispatch_mode: DispatchMode,
    pub prefix_matching: PrefixMatching,
    pub static_root: Option<PathBuf>,
    pub metrics_addr: Option<SocketAddr>,
}

impl Settings {
    pub fn from_args(args: Args) -> Result<Self> {
        let address = join_host_port(&args.host, args.port);
        let listen_addr = ConfigValidator::validate_listen_address(&address)
            .with_context(|| format!("Invalid server host '{}'", args.host))?;

        Ok(Self {
            listen_addr,
            log_level: args.log_level,
            log_format: args.log_format,
            read_timeout: args.read_timeout,
            write_timeout: args.write_timeout,
            idle_timeout: args.idle_timeout,
            grace_period: args.grace_period,
            upstream_timeout: args.upstream_timeout,
            config_path: args.config_path,
            watch_config: args.watch_config,
            dispatch_mode: args.dispatch_mode,
            prefix_matching: args.prefix_matching,
            static_root: args.static_root,
            metrics_addr: args.metrics_addr,
        })
    }

    /// Parse settings from the process arguments and environment.
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
