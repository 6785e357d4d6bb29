//! Layered configuration: defaults, optional TOML file, `SUPERFUND_*`
//! environment variables, then command line overrides.

use anyhow::{Context, Result};
use clap::ArgMatches;
use config::{Config, Environment, File as ConfigFile};
use std::path::{Path, PathBuf};
use superfund_ai_service::ServiceConfig;

pub const ENV_PREFIX: &str = "SUPERFUND";

/// Load the file and environment layers.
pub fn load(config_path: Option<&Path>, environment: Environment) -> Result<ServiceConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file {} not found (specified via --config)",
                path.display()
            );
        }
        builder = builder.add_source(ConfigFile::from(path));
    }

    builder = builder.add_source(environment);

    builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize::<ServiceConfig>()
        .context("Failed to parse configuration")
}

/// The process environment as a configuration source.
pub fn process_environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

pub fn load_with_overrides(matches: &ArgMatches) -> Result<ServiceConfig> {
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = load(config_path.as_deref(), process_environment())?;
    apply_overrides(matches, &mut config);
    config.validate()?;
    Ok(config)
}

pub fn apply_overrides(matches: &ArgMatches, config: &mut ServiceConfig) {
    if let Some(dataset) = matches.get_one::<String>("dataset") {
        config.dataset_path = PathBuf::from(dataset);
    }

    if let Some(target) = matches.get_one::<String>("target-column") {
        config.target_column = target.clone();
    }

    if let Some(model_path) = matches.get_one::<String>("model-path") {
        config.model_path = PathBuf::from(model_path);
    }

    if let Some(recipe_path) = matches.get_one::<String>("recipe-path") {
        config.recipe_path = PathBuf::from(recipe_path);
    }

    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.random_seed = *seed;
    }

    if let Some(origin) = matches.get_one::<String>("allowed-origin") {
        config.allowed_origin = origin.clone();
    }

    if let Some(rpc_host) = matches.get_one::<String>("rpc-host") {
        config.rpc_host = rpc_host.clone();
    }

    if let Some(rpc_port) = matches.get_one::<u16>("rpc-port") {
        config.rpc_port = *rpc_port;
    }

    if let Some(log_level) = matches.get_one::<String>("log-level") {
        config.log_level = log_level.clone();
    }

    if let Some(log_format) = matches.get_one::<String>("log-format") {
        config.log_format = log_format.clone();
    }
}
