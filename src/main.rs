//! Supermodel CLI entrypoint.
//!
//! Loads the server configuration and deployment manifest into an in-process
//! registry and answers one command against it.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use supermodel::catalog::{ConfigDefinitionCatalog, ConfigDefinitionKey};
use supermodel::cli::{Cli, Commands, OutputFormatter};
use supermodel::config::{ConfigParser, ConfigValidator, ServerConfig, find_config_file};
use supermodel::error::Result;
use supermodel::lbservices::LbServicesBuilder;
use supermodel::model::DeploymentManifest;
use supermodel::registry::{StatusReport, SuperModel};
use supermodel::resolver::{ConfigKey, ConfigResolver, RequestContext, Resolution};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    if let Some(deployments) = cli.deployments {
        config.deployments = Some(deployments);
    }

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(&config, warnings, formatter),
        Commands::Status => cmd_status(&config, formatter),
        Commands::Catalog => emit(&formatter.format_catalog(&ConfigDefinitionCatalog::builtin())),
        Commands::LbServices => cmd_lb_services(&config, formatter),
        Commands::Resolve {
            name,
            config_id,
            namespace,
            host,
            compression,
            checksum,
            generation,
            timeout_ms,
            trace,
        } => {
            let key = ConfigKey::new(config_id, ConfigDefinitionKey::new(name, namespace));
            let timeout =
                timeout_ms.map_or(config.long_poll.default_timeout(), Duration::from_millis);

            let mut request = RequestContext::new(key)
                .with_last_seen(checksum, generation)
                .with_compression(compression)
                .with_trace_level(trace)
                .with_timeout(timeout);
            if let Some(host) = host {
                request = request.with_client_hostname(host);
            }

            cmd_resolve(&config, &request, formatter).await
        }
    }
}

/// Loads the server configuration.
///
/// Uses the given path, else a `supermodel.yaml` found from the current
/// directory upwards, else defaults.
fn load_config(config_path: Option<&PathBuf>) -> Result<ServerConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.clone()),
        None => std::env::current_dir()
            .ok()
            .and_then(|dir| find_config_file(dir).ok()),
    };

    let base = config_file
        .as_ref()
        .and_then(|p| p.parent())
        .map_or_else(|| PathBuf::from("."), std::path::Path::to_path_buf);
    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;

    if config_file.is_none() {
        debug!("No configuration file found, using defaults");
    }
    parser.load_with_env(config_file.as_deref())
}

/// Builds a registry populated from the configured deployment manifest.
fn load_registry(config: &ServerConfig) -> Result<Arc<SuperModel>> {
    let super_model = Arc::new(SuperModel::new());

    match &config.deployments {
        Some(path) => {
            let manifest = DeploymentManifest::load_file(path)?;
            let deployed = manifest.deploy_into(&super_model)?;
            info!(
                applications = deployed,
                generation = super_model.generation(),
                "Registry loaded"
            );
        }
        None => warn!("No deployment manifest configured, registry is empty"),
    }

    Ok(super_model)
}

/// Validates configuration and manifest.
fn cmd_validate(
    config: &ServerConfig,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let validator = ConfigValidator::new();
    let result = validator.validate(config)?;
    emit(&formatter.format_validation("Server configuration", &result, show_warnings))?;

    if let Some(path) = &config.deployments {
        let manifest = DeploymentManifest::load_file(path)?;
        let result = validator.validate_manifest(&manifest, &ConfigDefinitionCatalog::builtin())?;
        emit(&formatter.format_validation(
            &format!("Deployment manifest {}", path.display()),
            &result,
            show_warnings,
        ))?;
    }

    Ok(())
}

/// Shows registry counters.
fn cmd_status(config: &ServerConfig, formatter: &OutputFormatter) -> Result<()> {
    let super_model = load_registry(config)?;
    let report = StatusReport::from_snapshot(&super_model.snapshot());
    emit(&formatter.format_status(&report))
}

/// Prints the aggregated routing table.
fn cmd_lb_services(config: &ServerConfig, formatter: &OutputFormatter) -> Result<()> {
    let super_model = load_registry(config)?;
    let view = LbServicesBuilder::new(config.zone.clone()).build(&super_model.snapshot());
    emit(&formatter.format_lb_services(&view))
}

/// Resolves one request, cancelling a long poll on Ctrl-C.
async fn cmd_resolve(
    config: &ServerConfig,
    request: &RequestContext,
    formatter: &OutputFormatter,
) -> Result<()> {
    let super_model = load_registry(config)?;
    let resolver = ConfigResolver::new(
        Arc::new(ConfigDefinitionCatalog::builtin()),
        super_model,
        config,
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = resolver.resolve(request, &cancel).await;
    interrupt.abort();
    let resolution = outcome?;

    let payload = match &resolution {
        Resolution::Fresh(fresh) => {
            let schema = resolver.catalog().lookup(request.key.definition())?;
            Some(schema.decode(&fresh.payload.decode()?)?)
        }
        Resolution::Unchanged { .. } => None,
    };

    emit(&formatter.format_resolution(&resolution, payload.as_ref()))
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.trim_end())?;
    Ok(())
}
