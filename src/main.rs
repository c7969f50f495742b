use std::path::PathBuf;

use anyhow::{anyhow, Context};
use binder::build_router;
use clap::{Args, Parser, Subcommand};
use config::{generate_schema, parse_config, LogFormat, LogLevel, Logging};
use store::Store;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod binder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod route;
pub mod store;

#[derive(Parser, Debug)]
#[command(version, about = "HTTP Mock Server", long_about = None)]
struct CliFlags {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the mock server
    Start(StartArgs),
    /// Print the JSON schema of the configuration file
    ConfigSchema,
}

#[derive(Args, Debug)]
struct StartArgs {
    /// Port the server listens on
    #[clap(long, default_value_t = 8080)]
    port: u16,
    /// Address the server binds to
    #[clap(long, default_value = "0.0.0.0")]
    host: String,
    /// Path to the config file; JSON, or YAML for `.yaml`/`.yml`
    #[clap(long, default_value = "mocks.json")]
    config: PathBuf,
}

#[tokio::main]
/// Entrypoint into the application.
async fn main() -> anyhow::Result<()> {
    let opt = CliFlags::parse();

    match opt.command {
        Commands::ConfigSchema => {
            println!("{}", generate_schema()?);
            Ok(())
        }
        Commands::Start(args) => start_server(args).await,
    }
}

async fn start_server(args: StartArgs) -> anyhow::Result<()> {
    let user_config = parse_config(&args.config)
        .map_err(|e| anyhow!("Error reading config file: {}", e))?;

    init_logging(user_config.logging.as_ref())?;

    let store = Store::new();
    let app = build_router(&user_config.endpoints, &store)?;

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", args.host, args.port))?;
    info!("Mock server running on port {}", listener.local_addr()?.port());
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(logging: Option<&Logging>) -> anyhow::Result<()> {
    let (level, format) = match logging {
        Some(logging) => (log_level(logging.level), logging.format),
        None => (Level::INFO, LogFormat::Pretty),
    };

    let builder = FmtSubscriber::builder().with_max_level(level);
    match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish()),
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish()),
    }
    .context("setting default logger failed")
}

fn log_level(level: LogLevel) -> Level {
    match level {
        LogLevel::TRACE => Level::TRACE,
        LogLevel::DEBUG => Level::DEBUG,
        LogLevel::INFO => Level::INFO,
        LogLevel::WARN => Level::WARN,
        LogLevel::ERROR => Level::ERROR,
    }
}
