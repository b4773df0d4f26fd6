// src/main.rs

use anyhow::{bail, Result};
use capstan::{
    check_core_ceiling, Bundler, Config, Error, PluginRef, PluginStore, PluginVersion, Resolution,
    Resolver,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "capstan")]
#[command(author, version, about = "CI plugin dependency resolver and offline bundle builder", long_about = None)]
struct Cli {
    /// Path to the run configuration
    #[arg(short, long, default_value = "capstan.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the full dependency set and print it
    Resolve {
        /// Also print the dependency tree of each requested plugin
        #[arg(long)]
        tree: bool,
    },
    /// Resolve, validate the core ceiling, and pack offline bundles
    Bundle {
        /// Override the configured bundle output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Resolve { tree } => run_resolve(&config, tree),
        Commands::Bundle { output } => run_bundle(&config, output),
    }
}

/// Resolve the configured plugin set through a store
fn resolve_set(
    config: &Config,
    store: &mut PluginStore,
) -> Result<(Vec<PluginRef>, Resolution)> {
    let requested = config.requested();
    if requested.is_empty() {
        bail!("no plugins listed in the configuration");
    }

    info!("Resolving {} requested plugins", requested.len());
    let resolution = Resolver::new(store).resolve(&requested)?;
    Ok((requested, resolution))
}

/// Parse the configured core version ceiling, if any
fn core_ceiling(config: &Config) -> Result<Option<PluginVersion>> {
    match &config.platform.max_core_version {
        Some(raw) => Ok(Some(PluginVersion::parse(raw)?)),
        None => Ok(None),
    }
}

/// Print upgrade notices and the name-ordered resolved set
fn print_resolution(resolution: &Resolution) {
    for notice in &resolution.notices {
        println!("{notice}");
    }
    println!();
    for plugin in resolution.plugins.values() {
        println!("{}; {}", plugin.display_name(), plugin.version);
    }
}

fn run_resolve(config: &Config, tree: bool) -> Result<()> {
    let mut store = PluginStore::new(&config.registry.cache_dir, &config.registry.url)?;
    let (requested, resolution) = resolve_set(config, &mut store)?;

    let ceiling = core_ceiling(config)?;
    let report = check_core_ceiling(&resolution, ceiling.as_ref())?;

    print_resolution(&resolution);
    println!();
    println!("Highest required core version: {}", report.highest);

    if tree {
        println!();
        print!("{}", resolution.render_forest(&requested));
    }

    // Reporting mode: violations are shown but do not fail the run
    for violation in &report.violations {
        println!("warning: {violation}");
    }

    Ok(())
}

fn run_bundle(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let mut store = PluginStore::new(&config.registry.cache_dir, &config.registry.url)?;
    let (_, resolution) = resolve_set(config, &mut store)?;

    let ceiling = core_ceiling(config)?;
    let report = check_core_ceiling(&resolution, ceiling.as_ref())?;

    print_resolution(&resolution);
    println!();
    println!("Highest required core version: {}", report.highest);

    if let Some(ceiling) = &ceiling {
        if !report.is_ok() {
            for violation in &report.violations {
                println!("{violation}");
            }
            return Err(Error::CoreVersionExceeded {
                ceiling: ceiling.to_string(),
                count: report.violations.len(),
            }
            .into());
        }
    }

    let output_dir = output.unwrap_or_else(|| config.bundle.output_dir.clone());
    let bundler = Bundler::new(output_dir, &config.bundle.stem, config.bundle.max_bundle_bytes);
    let bundles = bundler.pack(&resolution, &store)?;

    println!();
    for bundle in &bundles {
        println!(
            "{} ({} plugins, {} bytes)",
            bundle.path.display(),
            bundle.entries.len(),
            bundle.total_bytes
        );
    }

    Ok(())
}
