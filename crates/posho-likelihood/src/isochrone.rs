//! Stellar isochrones and the initial mass function
//!
//! An isochrone is a track of (initial mass, absolute magnitude) points for
//! the two survey bands. Sampling interpolates the track onto a fine mass
//! grid with Salpeter IMF number-weights, which downstream code histograms
//! into apparent-magnitude space.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use posho_common::binning::linspace;
use posho_common::{PoshoError, Result};
use posho_observation::{Mask, Roi};

use crate::model::{Model, Parameter};

/// Salpeter initial-mass-function slope
const IMF_ALPHA: f64 = 2.35;

const DISTANCE_MODULUS_BOUNDS: (f64, f64) = (0.0, 30.0);

/// One isochrone track point as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsochronePoint {
    /// Initial stellar mass (solar masses)
    pub mass_init: f64,
    /// Absolute magnitude in band 1
    pub mag_1: f64,
    /// Absolute magnitude in band 2
    pub mag_2: f64,
}

/// IMF-weighted sampling of an isochrone track
#[derive(Debug, Clone)]
pub struct IsochroneSample {
    pub mass: Vec<f64>,
    /// Number-weights, normalized to sum to one
    pub weight: Vec<f64>,
    /// Absolute magnitudes at the sampled masses
    pub mag_1: Vec<f64>,
    pub mag_2: Vec<f64>,
}

/// Stellar track at a distance parameterized by the distance modulus
#[derive(Debug, Clone)]
pub struct Isochrone {
    points: Vec<IsochronePoint>,
    distance_modulus: Parameter,
}

impl Isochrone {
    pub fn new(mut points: Vec<IsochronePoint>, distance_modulus: f64) -> Result<Self> {
        if points.len() < 2 {
            return Err(PoshoError::Config(format!(
                "isochrone needs at least 2 track points, got {}",
                points.len()
            )));
        }
        points.sort_by(|a, b| a.mass_init.total_cmp(&b.mass_init));
        if points[0].mass_init <= 0.0 {
            return Err(PoshoError::Config(
                "isochrone masses must be positive".to_string(),
            ));
        }
        if points.windows(2).any(|w| w[0].mass_init == w[1].mass_init) {
            return Err(PoshoError::Config(
                "isochrone masses must be distinct".to_string(),
            ));
        }

        let mut parameter = Parameter::new(
            DISTANCE_MODULUS_BOUNDS.0,
            DISTANCE_MODULUS_BOUNDS.0,
            DISTANCE_MODULUS_BOUNDS.1,
        );
        parameter.set("distance_modulus", distance_modulus)?;

        Ok(Isochrone {
            points,
            distance_modulus: parameter,
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P, distance_modulus: f64) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let points: Vec<IsochronePoint> = serde_json::from_reader(BufReader::new(file))?;
        let isochrone = Self::new(points, distance_modulus)?;
        info!(
            path = %path.as_ref().display(),
            points = isochrone.points.len(),
            "loaded isochrone"
        );
        Ok(isochrone)
    }

    pub fn distance_modulus(&self) -> f64 {
        self.distance_modulus.value()
    }

    /// Linear interpolation of the absolute magnitudes at `mass`
    fn interpolate(&self, mass: f64) -> (f64, f64) {
        let points = &self.points;
        let i = match points.partition_point(|p| p.mass_init <= mass) {
            0 => 0,
            i if i >= points.len() => points.len() - 2,
            i => i - 1,
        };
        let (a, b) = (&points[i], &points[i + 1]);
        let t = ((mass - a.mass_init) / (b.mass_init - a.mass_init)).clamp(0.0, 1.0);
        (
            a.mag_1 + t * (b.mag_1 - a.mag_1),
            a.mag_2 + t * (b.mag_2 - a.mag_2),
        )
    }

    /// Sample the track onto `steps` masses with Salpeter number-weights
    pub fn sample(&self, steps: usize) -> IsochroneSample {
        let steps = steps.max(2);
        let mass_min = self.points[0].mass_init;
        let mass_max = self.points[self.points.len() - 1].mass_init;
        let mass = linspace(mass_min, mass_max, steps);

        let step = mass[1] - mass[0];
        let mut weight: Vec<f64> = mass
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                // Trapezoid end weights
                let width = if i == 0 || i == steps - 1 {
                    0.5 * step
                } else {
                    step
                };
                m.powf(-IMF_ALPHA) * width
            })
            .collect();
        let total: f64 = weight.iter().sum();
        for w in &mut weight {
            *w /= total;
        }

        let mut mag_1 = Vec::with_capacity(steps);
        let mut mag_2 = Vec::with_capacity(steps);
        for &m in &mass {
            let (m1, m2) = self.interpolate(m);
            mag_1.push(m1);
            mag_2.push(m2);
        }

        IsochroneSample {
            mass,
            weight,
            mag_1,
            mag_2,
        }
    }

    /// IMF-weighted mean stellar mass (solar masses per member star)
    pub fn stellar_mass(&self) -> f64 {
        let sample = self.sample(1000);
        sample
            .mass
            .iter()
            .zip(sample.weight.iter())
            .map(|(&m, &w)| m * w)
            .sum()
    }

    /// Fraction of the track's stellar probability observable in each
    /// interior pixel of the region, at the given distance modulus
    pub fn observable_fraction(&self, mask: &Mask, roi: &Roi, distance_modulus: f64) -> Vec<f64> {
        let sample = self.sample(1000);
        roi.pixels_interior
            .iter()
            .map(|&pix| {
                let (Some(lim_1), Some(lim_2)) = (mask.maglim_1(pix), mask.maglim_2(pix)) else {
                    return 0.0;
                };
                sample
                    .weight
                    .iter()
                    .zip(sample.mag_1.iter().zip(sample.mag_2.iter()))
                    .filter(|&(_, (&m1, &m2))| {
                        distance_modulus + m1 < lim_1 && distance_modulus + m2 < lim_2
                    })
                    .map(|(&w, _)| w)
                    .sum()
            })
            .collect()
    }
}

impl Model for Isochrone {
    fn name(&self) -> &'static str {
        "color"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["distance_modulus"]
    }

    fn get_param(&self, name: &str) -> Option<f64> {
        (name == "distance_modulus").then(|| self.distance_modulus.value())
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<bool> {
        if name != "distance_modulus" {
            return Ok(false);
        }
        self.distance_modulus.set(name, value)?;
        Ok(true)
    }
}
