//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Supermodel - config resolution core of a multi-tenant config server.
#[derive(Parser, Debug)]
#[command(name = "supermodel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the server configuration file.
    #[arg(short, long, global = true, env = "SUPERMODEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the deployment manifest, overriding the configured one.
    #[arg(short, long, global = true, env = "SUPERMODEL_DEPLOYMENTS")]
    pub deployments: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the server configuration and deployment manifest.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show registry counters after loading the deployment manifest.
    Status,

    /// List the config definitions this server understands.
    Catalog,

    /// Print the aggregated load-balancer routing table.
    LbServices,

    /// Resolve one config for one config id.
    Resolve {
        /// Schema name.
        name: String,

        /// Config id of the requesting service.
        config_id: String,

        /// Schema namespace.
        #[arg(short, long, default_value = "cloud.config")]
        namespace: String,

        /// Hostname the request comes from.
        #[arg(long)]
        host: Option<String>,

        /// Requested compression (uncompressed, brotli).
        #[arg(long, default_value = "uncompressed")]
        compression: String,

        /// Payload checksum already held; enables long polling.
        #[arg(long, default_value = "")]
        checksum: String,

        /// Registry generation already seen.
        #[arg(long, default_value = "0")]
        generation: u64,

        /// Long-poll timeout in milliseconds (defaults to the configured one).
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Trace level, 0 disables tracing.
        #[arg(long, default_value = "0")]
        trace: u8,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
