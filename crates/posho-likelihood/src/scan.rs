//! Likelihood grid scan
//!
//! Places the kernel at every interior pixel center and maximizes the
//! richness at each distance modulus, producing a detection test-statistic
//! map over the search region.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use posho_common::Result;

use crate::loglike::LogLikelihood;

/// One grid point of a likelihood scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub pixel: u64,
    pub lon: f64,
    pub lat: f64,
    pub distance_modulus: f64,
    pub richness: f64,
    /// Detection test statistic, `2 * max loglike`, clamped at zero
    pub ts: f64,
}

/// Full scan output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub records: Vec<ScanRecord>,
    pub best: ScanRecord,
}

/// Richness-fit settings for a grid scan
#[derive(Debug, Clone)]
pub struct GridScan {
    pub atol: f64,
    pub max_iter: usize,
}

impl Default for GridScan {
    fn default() -> Self {
        GridScan {
            atol: 1e-3,
            max_iter: 50,
        }
    }
}

impl GridScan {
    /// Scan the interior pixels over the given distance moduli
    pub fn run(
        &self,
        loglike: &mut LogLikelihood,
        distance_moduli: &[f64],
    ) -> Result<ScanResult> {
        let grid: Vec<(u64, f64, f64)> = loglike
            .roi()
            .pixels_interior
            .iter()
            .zip(loglike.roi().interior_centers.iter())
            .map(|(&pix, &(lon, lat))| (pix, lon, lat))
            .collect();
        info!(
            pixels = grid.len(),
            distance_moduli = distance_moduli.len(),
            "starting likelihood scan"
        );

        let mut records = Vec::with_capacity(grid.len() * distance_moduli.len());
        for (pixel, lon, lat) in grid {
            loglike.set_params(&[("lon", lon), ("lat", lat)])?;
            for &dm in distance_moduli {
                loglike.set_params(&[("distance_modulus", dm)])?;
                let fit = loglike.fit_richness(self.atol, self.max_iter)?;
                records.push(ScanRecord {
                    pixel,
                    lon,
                    lat,
                    distance_modulus: dm,
                    richness: fit.richness,
                    ts: fit.ts(),
                });
            }
            debug!(pixel, lon, lat, "scanned pixel");
        }

        let best = records
            .iter()
            .max_by(|a, b| a.ts.total_cmp(&b.ts))
            .cloned()
            .ok_or_else(|| {
                posho_common::PoshoError::Numerical("scan produced no records".to_string())
            })?;
        info!(
            lon = best.lon,
            lat = best.lat,
            distance_modulus = best.distance_modulus,
            ts = best.ts,
            "likelihood scan finished"
        );

        Ok(ScanResult { records, best })
    }
}
