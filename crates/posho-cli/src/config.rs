//! Configuration management for the posho pipeline
//!
//! Configuration is layered: environment variables with the `posho` prefix,
//! then an optional YAML file (default `conf/posho.yml`), with typed
//! accessors providing defaults for every key. The data directory resolves
//! from `posho.data.dir`, then the `POSHO_DIR` environment variable, then
//! `./data`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};

use posho_common::{DATA_DIR_ENV, PoshoError, Result};
use posho_likelihood::{GridScan, Kernel, LikelihoodParams};
use posho_observation::RoiParams;

const DEFAULT_CONFIG_FILE: &str = "conf/posho.yml";

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    config: Config,
}

impl Configuration {
    /// Load the configuration, from an explicit file when given.
    ///
    /// The default file is optional; an explicitly requested file must exist.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Environment::with_prefix("posho")
                .separator(".")
                .try_parsing(true),
        );

        builder = match config_file {
            Some(path) => builder.add_source(File::from(path.to_path_buf())),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config = builder
            .build()
            .map_err(|e| PoshoError::Config(e.to_string()))?;
        Ok(Configuration { config })
    }

    // ========================================================================
    // Coordinates and region geometry
    // ========================================================================

    pub fn nside_pixel(&self) -> u32 {
        self.config.get_int("posho.coords.nside_pixel").unwrap_or(256) as u32
    }

    pub fn roi_radius(&self) -> f64 {
        self.config.get_float("posho.roi.radius").unwrap_or(2.0)
    }

    pub fn roi_radius_interior(&self) -> f64 {
        self.config
            .get_float("posho.roi.radius_interior")
            .unwrap_or(0.5)
    }

    pub fn roi_radius_annulus_inner(&self) -> f64 {
        self.config
            .get_float("posho.roi.radius_annulus_inner")
            .unwrap_or(1.0)
    }

    pub fn roi_params(&self) -> RoiParams {
        RoiParams {
            nside_pixel: self.nside_pixel(),
            radius: self.roi_radius(),
            radius_interior: self.roi_radius_interior(),
            radius_annulus_inner: self.roi_radius_annulus_inner(),
            mag_min: self.config.get_float("posho.binning.mag_min").unwrap_or(16.0),
            mag_max: self.config.get_float("posho.binning.mag_max").unwrap_or(24.0),
            mag_step: self.config.get_float("posho.binning.mag_step").unwrap_or(0.1),
            color_min: self
                .config
                .get_float("posho.binning.color_min")
                .unwrap_or(-0.5),
            color_max: self
                .config
                .get_float("posho.binning.color_max")
                .unwrap_or(1.0),
            color_step: self
                .config
                .get_float("posho.binning.color_step")
                .unwrap_or(0.05),
        }
    }

    // ========================================================================
    // Likelihood
    // ========================================================================

    pub fn likelihood_params(&self) -> LikelihoodParams {
        LikelihoodParams {
            delta_mag: self
                .config
                .get_float("posho.likelihood.delta_mag")
                .unwrap_or(0.01),
            band_1_detection: self
                .config
                .get_bool("posho.likelihood.band_1_detection")
                .unwrap_or(true),
            mass_steps: self
                .config
                .get_int("posho.likelihood.mass_steps")
                .unwrap_or(10000) as usize,
        }
    }

    pub fn fit_atol(&self) -> f64 {
        self.config.get_float("posho.fit.atol").unwrap_or(1e-3)
    }

    pub fn fit_max_iter(&self) -> usize {
        self.config.get_int("posho.fit.max_iter").unwrap_or(50) as usize
    }

    pub fn grid_scan(&self) -> GridScan {
        GridScan {
            atol: self.fit_atol(),
            max_iter: self.fit_max_iter(),
        }
    }

    // ========================================================================
    // Kernel
    // ========================================================================

    pub fn kernel_extension(&self) -> f64 {
        self.config
            .get_float("posho.kernel.extension")
            .unwrap_or(0.1)
    }

    /// Build the configured kernel at a sky position
    pub fn kernel(&self, lon: f64, lat: f64) -> Result<Kernel> {
        let kind = self
            .config
            .get_string("posho.kernel.type")
            .unwrap_or("plummer".to_string());
        match kind.as_str() {
            "plummer" => Kernel::plummer(lon, lat, self.kernel_extension()),
            "king" => {
                let truncation = self
                    .config
                    .get_float("posho.kernel.truncation")
                    .unwrap_or(3.0);
                Kernel::king(lon, lat, self.kernel_extension(), truncation)
            }
            other => Err(PoshoError::Config(format!(
                "unknown kernel type '{}'",
                other
            ))),
        }
    }

    // ========================================================================
    // Data files
    // ========================================================================

    pub fn data_dir(&self) -> PathBuf {
        self.config
            .get_string("posho.data.dir")
            .ok()
            .or_else(|| std::env::var(DATA_DIR_ENV).ok())
            .unwrap_or_else(|| "data".to_string())
            .into()
    }

    fn data_file(&self, key: &str, default_name: &str) -> PathBuf {
        let name = self
            .config
            .get_string(key)
            .unwrap_or_else(|_| default_name.to_string());
        self.data_file_name(name)
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.data_file("posho.catalog.file", "catalog.json")
    }

    pub fn isochrone_file(&self) -> PathBuf {
        self.data_file("posho.isochrone.file", "isochrone.json")
    }

    pub fn distance_modulus(&self) -> f64 {
        self.config
            .get_float("posho.isochrone.distance_modulus")
            .unwrap_or(18.0)
    }

    /// Sparse mask files, when configured; a uniform mask is used otherwise
    pub fn mask_files(&self) -> Option<(PathBuf, PathBuf)> {
        let path_1 = self.config.get_string("posho.mask.file_1").ok()?;
        let path_2 = self.config.get_string("posho.mask.file_2").ok()?;
        Some((
            self.data_file_name(path_1),
            self.data_file_name(path_2),
        ))
    }

    fn data_file_name(&self, name: String) -> PathBuf {
        let path = PathBuf::from(&name);
        if path.is_absolute() {
            path
        } else {
            self.data_dir().join(path)
        }
    }

    pub fn maglim_1(&self) -> f64 {
        self.config.get_float("posho.mask.maglim_1").unwrap_or(23.0)
    }

    pub fn maglim_2(&self) -> f64 {
        self.config.get_float("posho.mask.maglim_2").unwrap_or(23.0)
    }

    pub fn targets_file(&self) -> PathBuf {
        self.config
            .get_string("posho.targets.file")
            .unwrap_or_else(|_| "conf/targets.yml".to_string())
            .into()
    }

    // ========================================================================
    // Scan grid
    // ========================================================================

    pub fn scan_distance_moduli(&self) -> Vec<f64> {
        let min = self
            .config
            .get_float("posho.scan.distance_modulus_min")
            .unwrap_or(16.0);
        let max = self
            .config
            .get_float("posho.scan.distance_modulus_max")
            .unwrap_or(20.0);
        let step = self
            .config
            .get_float("posho.scan.distance_modulus_step")
            .unwrap_or(0.5);

        let mut out = Vec::new();
        let mut dm = min;
        while dm <= max + 1e-9 {
            out.push(dm);
            dm += step;
        }
        out
    }

    // ========================================================================
    // MCMC
    // ========================================================================

    pub fn mcmc_walkers(&self) -> usize {
        self.config.get_int("posho.mcmc.walkers").unwrap_or(20) as usize
    }

    pub fn mcmc_steps(&self) -> usize {
        self.config.get_int("posho.mcmc.steps").unwrap_or(500) as usize
    }

    pub fn mcmc_burn(&self) -> usize {
        self.config.get_int("posho.mcmc.burn").unwrap_or(100) as usize
    }

    pub fn mcmc_stretch(&self) -> f64 {
        self.config.get_float("posho.mcmc.stretch").unwrap_or(2.0)
    }

    pub fn mcmc_seed(&self) -> u64 {
        self.config.get_int("posho.mcmc.seed").unwrap_or(42) as u64
    }
}
