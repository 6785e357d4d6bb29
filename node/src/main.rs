use anyhow::Result;
use clap::{value_parser, Arg, Command};
use superfund_ai_service::{AdvisorService, ServiceConfig};
use superfund_rpc::{start_server, AppState};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod settings;
mod version;

use version::{git_commit_hash, SUPERFUND_VERSION};

fn cli() -> Command {
    Command::new("superfund-node")
        .version(SUPERFUND_VERSION)
        .about("Superfund advisor backend")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (TOML)"),
        )
        .arg(
            Arg::new("dataset")
                .short('d')
                .long("dataset")
                .value_name("CSV")
                .help("Dataset used for training and recommendations"),
        )
        .arg(
            Arg::new("target-column")
                .long("target-column")
                .value_name("NAME")
                .help("Column the model predicts"),
        )
        .arg(
            Arg::new("model-path")
                .long("model-path")
                .value_name("FILE")
                .help("Model artifact path"),
        )
        .arg(
            Arg::new("recipe-path")
                .long("recipe-path")
                .value_name("FILE")
                .help("Recipe artifact path"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .value_parser(value_parser!(u64))
                .help("Random seed for training"),
        )
        .arg(
            Arg::new("allowed-origin")
                .long("allowed-origin")
                .value_name("ORIGIN")
                .help("Origin allowed by CORS"),
        )
        .arg(
            Arg::new("rpc-host")
                .long("rpc-host")
                .value_name("HOST")
                .help("HTTP bind host"),
        )
        .arg(
            Arg::new("rpc-port")
                .long("rpc-port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("HTTP bind port"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (RUST_LOG takes precedence)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["pretty", "json"])
                .help("Log output format"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = settings::load_with_overrides(&matches)?;

    init_logging(&config)?;

    info!(
        "Starting Superfund advisor {} ({})",
        SUPERFUND_VERSION,
        git_commit_hash()
    );
    info!(
        dataset = %config.dataset_path.display(),
        model = %config.model_path.display(),
        recipe = %config.recipe_path.display(),
        "Configuration loaded"
    );

    let addr = format!("{}:{}", config.rpc_host, config.rpc_port);
    let service = AdvisorService::new(config);
    if !service.load_existing_model() {
        warn!("No trained model loaded; call /train before /predict");
    }

    start_server(AppState::new(service), &addr).await
}

fn init_logging(config: &ServiceConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}
