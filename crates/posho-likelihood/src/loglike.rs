//! The unbinned satellite-search log-likelihood
//!
//! Every catalog object in the search region is modeled as a mixture of a
//! satellite member population and the field background. With per-object
//! signal probability `u`, background expectation `b`, richness `rho`, and
//! the observable flux fraction `f`, the log-likelihood is
//!
//! ```text
//! ell = -sum(ln(1 - p)) - f * rho,   p = rho*u / (rho*u + b)
//! ```
//!
//! Signal probabilities factor into a color term (the isochrone convolved
//! with Gaussian photometric errors) and a spatial term (the kernel surface
//! density). Each term is resynchronized only when a parameter of its model
//! changes.

use tracing::{debug, info, warn};

use posho_common::binning::{arange, histogram_2d, take_2d};
use posho_common::stats::norm_cdf;
use posho_common::{Grid2, Parabola, PoshoError, Result};
use posho_observation::{Catalog, Mask, Roi};

use crate::isochrone::Isochrone;
use crate::kernel::Kernel;
use crate::model::{Model, Richness};

/// Floor on the per-object background expectation: an empty background CMD
/// cell would otherwise drive the membership probability to exactly one and
/// the log-likelihood to infinity.
const MIN_BACKGROUND: f64 = 1e-12;

/// Magnitude pad around the observable CMD window for signal cells
const CMD_PAD: f64 = 1.0;

/// Photometric-error window, in sigma, outside which a CMD cell cannot
/// contribute to an object
const ERROR_WINDOW_SIGMA: f64 = 5.0;

/// Tuning parameters of the likelihood
#[derive(Debug, Clone)]
pub struct LikelihoodParams {
    /// Width of the signal CMD bins in magnitudes
    pub delta_mag: f64,
    /// Detection band: true for band 1, false for band 2
    pub band_1_detection: bool,
    /// Number of masses sampled along the isochrone
    pub mass_steps: usize,
}

impl Default for LikelihoodParams {
    fn default() -> Self {
        LikelihoodParams {
            delta_mag: 0.01,
            band_1_detection: true,
            mass_steps: 10000,
        }
    }
}

/// Result of a richness maximization
#[derive(Debug, Clone, Copy)]
pub struct RichnessFit {
    pub richness: f64,
    pub loglike: f64,
    /// Number of likelihood evaluations spent
    pub n_eval: usize,
}

impl RichnessFit {
    fn zero() -> Self {
        RichnessFit {
            richness: 0.0,
            loglike: 0.0,
            n_eval: 0,
        }
    }

    /// Detection test statistic
    pub fn ts(&self) -> f64 {
        (2.0 * self.loglike).max(0.0)
    }
}

/// The satellite-search likelihood over one region of interest
pub struct LogLikelihood {
    params: LikelihoodParams,
    roi: Roi,
    mask: Mask,
    /// Observable objects over the full region
    catalog_roi: Catalog,
    /// Observable objects in the interior; the likelihood sums over these
    catalog: Catalog,

    richness_model: Richness,
    isochrone: Isochrone,
    kernel: Kernel,

    sync_color: bool,
    sync_spatial: bool,

    cmd_background: Grid2,
    /// Per-object background expectation
    b: Vec<f64>,
    u_color: Vec<f64>,
    u_spatial: Vec<f64>,
    /// Per interior pixel
    observable_fraction: Vec<f64>,
    /// Kernel surface density per interior pixel
    surface_intensity_sparse: Vec<f64>,
    /// Combined per-object signal probability
    u: Vec<f64>,
    /// Per-object membership probability at the current richness
    p: Vec<f64>,
    /// Observable flux fraction of the kernel
    f: f64,
}

impl LogLikelihood {
    pub fn new(
        params: LikelihoodParams,
        roi: Roi,
        mask: Mask,
        catalog: Catalog,
        isochrone: Isochrone,
        kernel: Kernel,
    ) -> Result<Self> {
        if params.delta_mag <= 0.0 {
            return Err(PoshoError::Config(format!(
                "delta_mag must be positive, got {}",
                params.delta_mag
            )));
        }

        // Observable-space cut over the full region
        debug!("clipping catalog to observable space");
        let cut = mask.restrict_to_observable(&catalog, &roi, params.band_1_detection);
        let mut catalog_roi = catalog.apply_cut(&cut);
        if catalog_roi.is_empty() {
            return Err(PoshoError::EmptyCatalog);
        }
        catalog_roi.spatial_bin(&roi);
        catalog_roi.project(&roi.projector);

        // Interior subset carries the likelihood sum
        let interior_cut: Vec<bool> = catalog_roi
            .pixel
            .iter()
            .map(|&pix| roi.contains_interior(pix))
            .collect();
        let catalog_interior = catalog_roi.apply_cut(&interior_cut);
        info!(
            region = catalog_roi.len(),
            interior = catalog_interior.len(),
            "using interior catalog for likelihood evaluation"
        );

        info!("calculating background CMD");
        let cmd_background =
            mask.background_cmd(&catalog_roi, &roi, params.band_1_detection)?;
        let delta_mag2 = params.delta_mag * params.delta_mag;
        let b: Vec<f64> = take_2d(
            &cmd_background,
            &catalog_interior.color,
            catalog_interior.mag(params.band_1_detection),
            &roi.bins_color,
            &roi.bins_mag,
        )
        .into_iter()
        .map(|density| (density * roi.area_pixel * delta_mag2).max(MIN_BACKGROUND))
        .collect();

        Ok(LogLikelihood {
            params,
            roi,
            mask,
            catalog_roi,
            catalog: catalog_interior,
            richness_model: Richness::new(),
            isochrone,
            kernel,
            sync_color: true,
            sync_spatial: true,
            cmd_background,
            b,
            u_color: Vec::new(),
            u_spatial: Vec::new(),
            observable_fraction: Vec::new(),
            surface_intensity_sparse: Vec::new(),
            u: Vec::new(),
            p: Vec::new(),
            f: 0.0,
        })
    }

    pub fn roi(&self) -> &Roi {
        &self.roi
    }

    /// The interior catalog the likelihood sums over
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Observable objects over the full region
    pub fn catalog_roi(&self) -> &Catalog {
        &self.catalog_roi
    }

    pub fn richness(&self) -> f64 {
        self.richness_model.value()
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn isochrone(&self) -> &Isochrone {
        &self.isochrone
    }

    /// Membership probability per interior object at the current parameters
    pub fn membership_probabilities(&self) -> &[f64] {
        &self.p
    }

    /// Background color-magnitude density the likelihood was built with
    pub fn background_cmd(&self) -> &Grid2 {
        &self.cmd_background
    }

    /// Observable flux fraction of the kernel at the current parameters
    pub fn flux_fraction(&self) -> f64 {
        self.f
    }

    /// Current value of every model parameter
    pub fn model_params(&self) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        let models: [&dyn Model; 3] = [&self.richness_model, &self.isochrone, &self.kernel];
        for model in models {
            for &name in model.param_names() {
                if let Some(value) = model.get_param(name) {
                    out.push((name.to_string(), value));
                }
            }
        }
        out
    }

    /// Set named parameters, marking the owning models for resync.
    ///
    /// The kernel center must stay inside the interior region; moving it out
    /// is an error, as a target outside the search region cannot be fit.
    pub fn set_params(&mut self, params: &[(&str, f64)]) -> Result<()> {
        for &(name, value) in params {
            if self.richness_model.set_param(name, value)? {
                continue;
            }
            if self.isochrone.set_param(name, value)? {
                self.sync_color = true;
                continue;
            }
            if self.kernel.set_param(name, value)? {
                self.sync_spatial = true;
                continue;
            }
            return Err(PoshoError::UnknownParameter(name.to_string()));
        }

        let pix = self.roi.ang2pix(self.kernel.lon(), self.kernel.lat());
        if !self.roi.contains_interior(pix) {
            return Err(PoshoError::OutsideInterior(
                self.kernel.lon(),
                self.kernel.lat(),
            ));
        }
        Ok(())
    }

    /// Recompute whatever the last parameter changes made stale
    pub fn sync(&mut self) -> Result<()> {
        if self.sync_color {
            self.observable_fraction = self.isochrone.observable_fraction(
                &self.mask,
                &self.roi,
                self.isochrone.distance_modulus(),
            );
            self.u_color = self.calc_signal_color()?;
            self.sync_color = false;
        }
        if self.sync_spatial {
            let (lons, lats): (Vec<f64>, Vec<f64>) =
                self.roi.interior_centers.iter().copied().unzip();
            self.surface_intensity_sparse = self.kernel.pdf(&lons, &lats);
            let intensity_object = self.kernel.pdf(&self.catalog.lon, &self.catalog.lat);
            self.u_spatial = intensity_object
                .into_iter()
                .map(|v| v * self.roi.area_pixel)
                .collect();
            self.sync_spatial = false;
        }

        // Combined signal probability and observable flux fraction
        self.u = self
            .u_spatial
            .iter()
            .zip(self.u_color.iter())
            .map(|(&s, &c)| s * c)
            .collect();
        self.f = self.roi.area_pixel
            * self
                .surface_intensity_sparse
                .iter()
                .zip(self.observable_fraction.iter())
                .map(|(&s, &o)| s * o)
                .sum::<f64>();

        let rho = self.richness_model.value();
        self.p = self
            .u
            .iter()
            .zip(self.b.iter())
            .map(|(&u, &b)| rho * u / (rho * u + b))
            .collect();
        Ok(())
    }

    /// Set parameters, synchronize, and evaluate the log-likelihood
    pub fn value(&mut self, params: &[(&str, f64)]) -> Result<f64> {
        self.set_params(params)?;
        self.sync()?;
        Ok(self.evaluate())
    }

    fn evaluate(&self) -> f64 {
        let rho = self.richness_model.value();
        let sum: f64 = self.p.iter().map(|&p| (1.0 - p).ln()).sum();
        -sum - self.f * rho
    }

    /// Signal color probability per interior object.
    ///
    /// The isochrone's number-weights are histogrammed onto apparent
    /// magnitude bins in both bands; cells outside the observable CMD window
    /// are dropped; each object then accumulates the product of its Gaussian
    /// error integrals over the surviving cells.
    fn calc_signal_color(&self) -> Result<Vec<f64>> {
        let sample = self.isochrone.sample(self.params.mass_steps);
        let dm = self.isochrone.distance_modulus();
        let delta = self.params.delta_mag;

        let app_1: Vec<f64> = sample.mag_1.iter().map(|&m| m + dm).collect();
        let app_2: Vec<f64> = sample.mag_2.iter().map(|&m| m + dm).collect();

        let bounds = |values: &[f64]| {
            let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            (lo, hi)
        };
        let (lo_1, hi_1) = bounds(&app_1);
        let (lo_2, hi_2) = bounds(&app_2);
        let bins_1 = arange(lo_1 - 0.5 * delta, hi_1 + delta, delta);
        let bins_2 = arange(lo_2 - 0.5 * delta, hi_2 + delta, delta);

        let hist = histogram_2d(&app_1, &app_2, Some(&sample.weight), &bins_1, &bins_2)?;

        // Keep cells whose detection-band center can be observed
        let clip = if self.params.band_1_detection {
            self.mask.mag_1_clip
        } else {
            self.mask.mag_2_clip
        };
        let bright_edge = self.roi.bins_mag[0];
        let (n1, n2) = hist.shape();
        let mut cells: Vec<(usize, usize, f64)> = Vec::new();
        for i1 in 0..n1 {
            for i2 in 0..n2 {
                let weight = hist.get(i1, i2);
                if weight <= 0.0 {
                    continue;
                }
                let center = if self.params.band_1_detection {
                    0.5 * (bins_1[i1] + bins_1[i1 + 1])
                } else {
                    0.5 * (bins_2[i2] + bins_2[i2 + 1])
                };
                if center < clip + CMD_PAD && center > bright_edge - CMD_PAD {
                    cells.push((i1, i2, weight));
                }
            }
        }
        debug!(cells = cells.len(), "signal CMD cells in observable window");

        let n = self.catalog.len();
        let mut u_color = vec![0.0; n];
        for k in 0..n {
            let m1 = self.catalog.mag_1[k];
            let e1 = self.catalog.mag_err_1[k];
            let m2 = self.catalog.mag_2[k];
            let e2 = self.catalog.mag_err_2[k];

            let mut acc = 0.0;
            for &(i1, i2, weight) in &cells {
                let arg_1_hi = (m1 - bins_1[i1]) / e1;
                let arg_1_lo = (m1 - bins_1[i1 + 1]) / e1;
                if arg_1_hi <= -ERROR_WINDOW_SIGMA || arg_1_lo >= ERROR_WINDOW_SIGMA {
                    continue;
                }
                let arg_2_hi = (m2 - bins_2[i2]) / e2;
                let arg_2_lo = (m2 - bins_2[i2 + 1]) / e2;
                if arg_2_hi <= -ERROR_WINDOW_SIGMA || arg_2_lo >= ERROR_WINDOW_SIGMA {
                    continue;
                }
                acc += (norm_cdf(arg_1_hi) - norm_cdf(arg_1_lo))
                    * (norm_cdf(arg_2_hi) - norm_cdf(arg_2_lo))
                    * weight;
            }
            u_color[k] = acc;
        }
        Ok(u_color)
    }

    /// Maximize the log-likelihood over richness.
    ///
    /// Starts from richness values corresponding to 0, 1, and 10 observable
    /// stars and repeatedly evaluates the vertex of a parabola fitted to
    /// (richness, 2 * log-likelihood), until the improvement drops below
    /// `atol` or the vertex leaves the physical range. The richness model is
    /// left set to the maximizing value.
    pub fn fit_richness(&mut self, atol: f64, max_iter: usize) -> Result<RichnessFit> {
        self.sync()?;

        // Finite kernels on the edge of the footprint can zero out or
        // corrupt every signal probability
        if self.u.iter().any(|v| v.is_nan()) {
            warn!("NaN signal probability found");
            return Ok(RichnessFit::zero());
        }
        if self.f <= 0.0 || !self.u.iter().any(|&v| v > 0.0) {
            warn!("signal probability is zero for all objects");
            return Ok(RichnessFit::zero());
        }

        let mut richness = vec![0.0, 1.0 / self.f, 10.0 / self.f];
        let mut loglike = Vec::with_capacity(richness.len());
        for i in 0..richness.len() {
            let r = richness[i];
            loglike.push(self.value(&[("richness", r)])?);
        }

        let mut iteration = 0;
        loop {
            let scaled: Vec<f64> = loglike.iter().map(|&v| 2.0 * v).collect();
            let parabola = Parabola::fit(&richness, &scaled)?;
            if !parabola.concave_down() || parabola.vertex_x() < 0.0 {
                break;
            }

            let vertex = parabola.vertex_x();
            let value = self.value(&[("richness", vertex)])?;
            let previous_max = loglike.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            richness.push(vertex);
            loglike.push(value);

            if (value - previous_max).abs() < atol {
                break;
            }
            iteration += 1;
            if iteration > max_iter {
                warn!("maximum number of iterations reached");
                break;
            }
        }

        let (best, _) = loglike
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .expect("at least three evaluations");
        let fit = RichnessFit {
            richness: richness[best],
            loglike: loglike[best],
            n_eval: loglike.len(),
        };
        // Leave the model at the maximum
        self.value(&[("richness", fit.richness)])?;
        Ok(fit)
    }
}
