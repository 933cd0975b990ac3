//! Palisade gateway binary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use palisade_config::GatewayConfig;
use palisade_gateway::{FilterRegistry, GatewayServer, ShutdownSignal, VERSION};
use tracing::{error, info};

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

enum Parsed {
    Run(Args),
    Exit(ExitCode),
}

impl Args {
    fn parse() -> Parsed {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => match args.next() {
                    Some(path) => config = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("--config requires a path");
                        return Parsed::Exit(ExitCode::FAILURE);
                    }
                },
                "--help" | "-h" => {
                    print_help();
                    return Parsed::Exit(ExitCode::SUCCESS);
                }
                "--version" | "-v" => {
                    println!("palisade {VERSION}");
                    return Parsed::Exit(ExitCode::SUCCESS);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    return Parsed::Exit(ExitCode::FAILURE);
                }
            }
        }

        Parsed::Run(Self { config })
    }
}

fn print_help() {
    println!(
        r"Palisade - API gateway

USAGE:
    palisade [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    PALISADE_LISTEN_ADDR              Listen address (default: 0.0.0.0)
    PALISADE_LISTEN_PORT              Listen port (default: 8080)
    PALISADE_LOG_LEVEL                Log level (default: info)
    PALISADE_LOG_JSON                 JSON log output (default: true)
    PALISADE_JWT_SECRET               Secret for JWT verification
    PALISADE_CACHE_ENABLED            Enable the response cache (default: true)
    PALISADE_CACHE_DEFAULT_TTL        Default cache TTL in seconds (default: 60)
    PALISADE_CACHE_MAX_SIZE           Maximum cache entries (default: 1000)
    PALISADE_OAUTH2_INTROSPECTION_URI Token introspection endpoint
    PALISADE_OAUTH2_CLIENT_ID         Introspection client id
    PALISADE_OAUTH2_CLIENT_SECRET     Introspection client secret

A .env file in the working directory is read before the overrides apply.

EXAMPLES:
    palisade --config /etc/palisade/gateway.toml
    PALISADE_JWT_SECRET=change-me palisade
"
    );
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = GatewayConfig::load(args.config.as_ref())
        .context("failed to load configuration")?;

    palisade_telemetry::init_logging(&config.logging).context("failed to initialize logging")?;
    palisade_telemetry::init_metrics().context("failed to install metrics recorder")?;

    config.validate().context("invalid configuration")?;
    config
        .validate_filter_names(FilterRegistry::with_defaults().names())
        .context("invalid route filters")?;

    info!(
        version = VERSION,
        addr = %config.server.listen_addr,
        port = config.server.listen_port,
        routes = config.routes.len(),
        "Starting Palisade gateway"
    );

    let server = GatewayServer::new(&config).context("failed to build gateway")?;
    server.run(ShutdownSignal::with_os_signals()).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse() {
        Parsed::Run(args) => args,
        Parsed::Exit(code) => return code,
    };

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {e}");
        }
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Gateway failed");
            eprintln!("palisade: {e:#}");
            ExitCode::FAILURE
        }
    }
}
