//! Spatial surface-density kernels
//!
//! Kernels model the projected stellar density of a satellite as a radial
//! profile around a center. Profiles are normalized so that the flat-sky
//! surface integral is one, which makes `area_pixel * surface_density` a
//! per-direction detection probability.

use posho_common::{PoshoError, Result};
use posho_sky::projector::angsep;

use crate::model::{Model, Parameter};

const LON_BOUNDS: (f64, f64) = (0.0, 360.0);
const LAT_BOUNDS: (f64, f64) = (-90.0, 90.0);
const EXTENSION_BOUNDS: (f64, f64) = (1e-4, 5.0);

#[derive(Debug, Clone)]
enum KernelShape {
    Plummer,
    King {
        /// Truncation radius in units of the core radius
        truncation: f64,
        /// Unit-core-radius normalization integral
        norm_unit: f64,
    },
}

/// Radial satellite profile centered on (`lon`, `lat`) with angular scale
/// `extension` in degrees
#[derive(Debug, Clone)]
pub struct Kernel {
    shape: KernelShape,
    lon: Parameter,
    lat: Parameter,
    extension: Parameter,
}

impl Kernel {
    /// Plummer profile with half-light radius `extension`
    pub fn plummer(lon: f64, lat: f64, extension: f64) -> Result<Self> {
        Self::build(KernelShape::Plummer, lon, lat, extension)
    }

    /// King profile with core radius `extension`, truncated at
    /// `truncation * extension`
    pub fn king(lon: f64, lat: f64, extension: f64, truncation: f64) -> Result<Self> {
        if truncation <= 1.0 {
            return Err(PoshoError::Config(format!(
                "king truncation must exceed the core radius, got ratio {}",
                truncation
            )));
        }
        let norm_unit = king_unit_integral(truncation);
        Self::build(
            KernelShape::King {
                truncation,
                norm_unit,
            },
            lon,
            lat,
            extension,
        )
    }

    fn build(shape: KernelShape, lon: f64, lat: f64, extension: f64) -> Result<Self> {
        let mut kernel = Kernel {
            shape,
            lon: Parameter::new(LON_BOUNDS.0, LON_BOUNDS.0, LON_BOUNDS.1),
            lat: Parameter::new(0.0, LAT_BOUNDS.0, LAT_BOUNDS.1),
            extension: Parameter::new(EXTENSION_BOUNDS.0, EXTENSION_BOUNDS.0, EXTENSION_BOUNDS.1),
        };
        kernel.lon.set("lon", lon)?;
        kernel.lat.set("lat", lat)?;
        kernel.extension.set("extension", extension)?;
        Ok(kernel)
    }

    pub fn lon(&self) -> f64 {
        self.lon.value()
    }

    pub fn lat(&self) -> f64 {
        self.lat.value()
    }

    pub fn extension(&self) -> f64 {
        self.extension.value()
    }

    /// Surface density at angular separation `sep` degrees from the center,
    /// in deg^-2
    pub fn surface_density(&self, sep: f64) -> f64 {
        let a = self.extension.value();
        let r = sep / a;
        match &self.shape {
            KernelShape::Plummer => {
                let denom = 1.0 + r * r;
                1.0 / (std::f64::consts::PI * a * a * denom * denom)
            }
            KernelShape::King {
                truncation,
                norm_unit,
            } => {
                if r >= *truncation {
                    return 0.0;
                }
                let edge = 1.0 / (1.0 + truncation * truncation).sqrt();
                let value = 1.0 / (1.0 + r * r).sqrt() - edge;
                value * value / (norm_unit * a * a)
            }
        }
    }

    /// Surface density toward each of many directions
    pub fn pdf(&self, lons: &[f64], lats: &[f64]) -> Vec<f64> {
        let (lon0, lat0) = (self.lon.value(), self.lat.value());
        lons.iter()
            .zip(lats.iter())
            .map(|(&lon, &lat)| self.surface_density(angsep(lon0, lat0, lon, lat)))
            .collect()
    }
}

/// Flat-sky integral of the unnormalized King profile with unit core radius
fn king_unit_integral(truncation: f64) -> f64 {
    let edge = 1.0 / (1.0 + truncation * truncation).sqrt();
    let n = 2048;
    let dr = truncation / n as f64;
    let mut total = 0.0;
    for i in 0..n {
        let r0 = i as f64 * dr;
        let r1 = r0 + dr;
        let f = |r: f64| {
            let v = 1.0 / (1.0 + r * r).sqrt() - edge;
            v * v * 2.0 * std::f64::consts::PI * r
        };
        total += 0.5 * (f(r0) + f(r1)) * dr;
    }
    total
}

impl Model for Kernel {
    fn name(&self) -> &'static str {
        "spatial"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["lon", "lat", "extension"]
    }

    fn get_param(&self, name: &str) -> Option<f64> {
        match name {
            "lon" => Some(self.lon.value()),
            "lat" => Some(self.lat.value()),
            "extension" => Some(self.extension.value()),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<bool> {
        match name {
            "lon" => self.lon.set(name, value)?,
            "lat" => self.lat.set(name, value)?,
            "extension" => self.extension.set(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}
