//! Main entry point for the posho satellite-search pipeline.
//!
//! Sets up logging and configuration, then dispatches the `scan`, `fit`,
//! and `members` subcommands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use posho_likelihood::{
    EnsembleSampler, Isochrone, LogLikelihood, Membership, ParamSpec, RichnessFit,
};
use posho_observation::{Catalog, Mask, Roi};

mod config;
mod report;
mod targets;

use crate::config::Configuration;
use crate::report::{FitReport, McmcSummary, ParamSummary, ScanReport, TargetInfo, write_json};

#[derive(Debug, Parser)]
#[command(
    name = "posho",
    version,
    about = "Satellite-search likelihood pipeline"
)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan the likelihood over the search region around a target
    Scan {
        /// Named target from the targets file
        #[arg(long, conflicts_with_all = ["lon", "lat"])]
        target: Option<String>,
        /// Galactic longitude (deg)
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        /// Galactic latitude (deg)
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, default_value = "scan.json")]
        output: PathBuf,
    },
    /// Maximize the richness at a fixed position
    Fit {
        #[arg(long, conflicts_with_all = ["lon", "lat"])]
        target: Option<String>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        /// Distance modulus; the configured default is used otherwise
        #[arg(long)]
        distance_modulus: Option<f64>,
        /// Sample the posterior after the fit
        #[arg(long)]
        mcmc: bool,
        #[arg(long, default_value = "fit.json")]
        output: PathBuf,
    },
    /// Write per-object membership probabilities at a fixed position
    Members {
        #[arg(long, conflicts_with_all = ["lon", "lat"])]
        target: Option<String>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long)]
        distance_modulus: Option<f64>,
        #[arg(long, default_value = "members.json")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let configuration = Configuration::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            target,
            lon,
            lat,
            output,
        } => run_scan(&configuration, target, lon, lat, &output),
        Commands::Fit {
            target,
            lon,
            lat,
            distance_modulus,
            mcmc,
            output,
        } => run_fit(&configuration, target, lon, lat, distance_modulus, mcmc, &output),
        Commands::Members {
            target,
            lon,
            lat,
            distance_modulus,
            output,
        } => run_members(&configuration, target, lon, lat, distance_modulus, &output),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("POSHO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_target(
    configuration: &Configuration,
    name: Option<String>,
    lon: Option<f64>,
    lat: Option<f64>,
) -> anyhow::Result<TargetInfo> {
    match (name, lon, lat) {
        (Some(name), None, None) => {
            let target = targets::find(configuration.targets_file(), &name)?;
            Ok(TargetInfo {
                name: target.name,
                lon: target.lon,
                lat: target.lat,
            })
        }
        (None, Some(lon), Some(lat)) => Ok(TargetInfo {
            name: "custom".to_string(),
            lon,
            lat,
        }),
        _ => anyhow::bail!("specify either --target or both --lon and --lat"),
    }
}

fn build_loglike(
    configuration: &Configuration,
    target: &TargetInfo,
    distance_modulus: f64,
) -> anyhow::Result<LogLikelihood> {
    let roi = Roi::new(target.lon, target.lat, &configuration.roi_params())?;
    let mask = match configuration.mask_files() {
        Some((path_1, path_2)) => Mask::from_json_files(&path_1, &path_2, &roi)?,
        None => Mask::uniform(&roi, configuration.maglim_1(), configuration.maglim_2()),
    };
    let catalog = Catalog::from_json_file(configuration.catalog_file())?;
    let isochrone =
        Isochrone::from_json_file(configuration.isochrone_file(), distance_modulus)?;
    let kernel = configuration.kernel(target.lon, target.lat)?;

    Ok(LogLikelihood::new(
        configuration.likelihood_params(),
        roi,
        mask,
        catalog,
        isochrone,
        kernel,
    )?)
}

fn run_scan(
    configuration: &Configuration,
    target: Option<String>,
    lon: Option<f64>,
    lat: Option<f64>,
    output: &Path,
) -> anyhow::Result<()> {
    let target = resolve_target(configuration, target, lon, lat)?;
    let distance_moduli = configuration.scan_distance_moduli();
    let first = *distance_moduli
        .first()
        .context("empty distance modulus grid")?;
    info!(
        target = %target.name,
        lon = target.lon,
        lat = target.lat,
        "starting scan"
    );

    let mut loglike = build_loglike(configuration, &target, first)?;
    let result = configuration
        .grid_scan()
        .run(&mut loglike, &distance_moduli)?;

    write_json(&ScanReport::new(target, result), output)?;
    Ok(())
}

fn run_fit(
    configuration: &Configuration,
    target: Option<String>,
    lon: Option<f64>,
    lat: Option<f64>,
    distance_modulus: Option<f64>,
    mcmc: bool,
    output: &Path,
) -> anyhow::Result<()> {
    let target = resolve_target(configuration, target, lon, lat)?;
    let distance_modulus =
        distance_modulus.unwrap_or_else(|| configuration.distance_modulus());

    let mut loglike = build_loglike(configuration, &target, distance_modulus)?;
    let fit =
        loglike.fit_richness(configuration.fit_atol(), configuration.fit_max_iter())?;
    info!(
        richness = fit.richness,
        ts = fit.ts(),
        "richness fit finished"
    );

    let mcmc_summary = if mcmc {
        Some(run_mcmc(configuration, &mut loglike, &target, fit)?)
    } else {
        None
    };

    write_json(
        &FitReport::new(target, distance_modulus, fit, mcmc_summary),
        output,
    )?;
    Ok(())
}

fn run_members(
    configuration: &Configuration,
    target: Option<String>,
    lon: Option<f64>,
    lat: Option<f64>,
    distance_modulus: Option<f64>,
    output: &Path,
) -> anyhow::Result<()> {
    let target = resolve_target(configuration, target, lon, lat)?;
    let distance_modulus =
        distance_modulus.unwrap_or_else(|| configuration.distance_modulus());

    let mut loglike = build_loglike(configuration, &target, distance_modulus)?;
    let fit =
        loglike.fit_richness(configuration.fit_atol(), configuration.fit_max_iter())?;
    info!(
        richness = fit.richness,
        ts = fit.ts(),
        "evaluating membership at the fitted richness"
    );

    Membership::from_loglike(&mut loglike)?.to_file(output)?;
    Ok(())
}

fn run_mcmc(
    configuration: &Configuration,
    loglike: &mut LogLikelihood,
    target: &TargetInfo,
    fit: RichnessFit,
) -> anyhow::Result<McmcSummary> {
    let half = 0.5 * configuration.roi_radius_interior();
    let extension = configuration.kernel_extension();
    let params = vec![
        ParamSpec::new("richness", 0.0, (10.0 * fit.richness).max(1000.0)),
        ParamSpec::new("lon", target.lon - half, target.lon + half),
        ParamSpec::new(
            "lat",
            (target.lat - half).max(-90.0),
            (target.lat + half).min(90.0),
        ),
        ParamSpec::new(
            "extension",
            (0.1 * extension).max(1e-3),
            (10.0 * extension).min(5.0),
        ),
    ];
    let seed_point = [fit.richness.max(1.0), target.lon, target.lat, extension];

    let walkers = configuration.mcmc_walkers();
    let steps = configuration.mcmc_steps();
    let burn = configuration.mcmc_burn().min(steps.saturating_sub(1));

    let sampler = EnsembleSampler::new(walkers, configuration.mcmc_stretch())?;
    let mut rng = StdRng::seed_from_u64(configuration.mcmc_seed());
    let chain = sampler.run(loglike, &params, &seed_point, steps, &mut rng)?;

    let mut summaries = Vec::with_capacity(params.len());
    for (dim, spec) in params.iter().enumerate() {
        let quantile = |q: f64| {
            chain
                .quantile(dim, q, burn)
                .context("no samples left after burn-in")
        };
        summaries.push(ParamSummary {
            name: spec.name.clone(),
            median: quantile(0.5)?,
            p16: quantile(0.16)?,
            p84: quantile(0.84)?,
        });
    }

    Ok(McmcSummary {
        walkers,
        steps,
        burn,
        acceptance_fraction: chain.acceptance_fraction(),
        params: summaries,
    })
}
