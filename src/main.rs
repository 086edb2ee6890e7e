//! pixcache - inspect cache keys, decode plans and cache behavior.
//!
//! Every subcommand prints its result as JSON on stdout; logs go to stderr.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixcache::{
    build_spec,
    config::{Cli, Command, KeyConfig, MappingConfig, ReplayConfig},
    replay, resolve, ImageCacheService, ImageOptions, ImageSpec, ReplayScript,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Key(config) => run_key(config),
        Command::Mapping(config) => run_mapping(config),
        Command::Replay(config) => run_replay(config),
    }
}

// =============================================================================
// Key Command
// =============================================================================

#[derive(Serialize)]
struct KeyOutput<'a> {
    exact: &'a str,
    uri_group: &'a str,
    fingerprint: String,
    spec: &'a ImageSpec,
}

fn run_key(config: KeyConfig) -> ExitCode {
    let spec = match load_spec(&config.spec.options(), &config.spec) {
        Ok(spec) => spec,
        Err(e) => {
            error!("Invalid request: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let key = resolve(&spec);
    print_json(&KeyOutput {
        exact: key.exact(),
        uri_group: key.uri_group(),
        fingerprint: key.fingerprint(),
        spec: key.spec(),
    })
}

// =============================================================================
// Mapping Command
// =============================================================================

fn run_mapping(config: MappingConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let (source_width, source_height) = match &config.source_file {
        Some(path) => match image::image_dimensions(path) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => match (config.source_width, config.source_height) {
            (Some(width), Some(height)) => (width, height),
            _ => return ExitCode::FAILURE,
        },
    };

    let spec = match config
        .defaults()
        .and_then(|defaults| build_spec(&config.spec.options(), &defaults).map_err(|e| e.to_string()))
    {
        Ok(spec) => spec,
        Err(e) => {
            error!("Invalid request: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = ImageCacheService::new(config.cache.cache_config());
    match service.plan_decode(&spec, source_width, source_height) {
        Ok(plan) => print_json(&plan),
        Err(e) => {
            error!("Cannot plan decode: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Replay Command
// =============================================================================

fn run_replay(config: ReplayConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let script: ReplayScript = match std::fs::read_to_string(&config.script)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(script) => script,
        Err(e) => {
            error!("Failed to load {}: {}", config.script.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let cache_config = config.cache.cache_config();
    info!(
        "Replaying {} operation(s), capacity {}MB, compatible lookup {}",
        script.operations.len(),
        cache_config.capacity_bytes / (1024 * 1024),
        if cache_config.compatible_lookup { "on" } else { "off" }
    );

    let service = ImageCacheService::new(cache_config);
    match replay::run(&service, &script) {
        Ok(report) => print_json(&report),
        Err(e) => {
            error!("Replay failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn load_spec(
    options: &ImageOptions,
    args: &pixcache::config::SpecArgs,
) -> Result<ImageSpec, String> {
    let defaults = args.load_defaults()?;
    build_spec(options, &defaults).map_err(|e| e.to_string())
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pixcache=debug"
    } else {
        "pixcache=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
