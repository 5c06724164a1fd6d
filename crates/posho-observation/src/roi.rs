//! Target-centered region of interest
//!
//! A `Roi` collects the HEALPix pixels around a target position into three
//! nested sets: the full region, the interior where a satellite is searched
//! for, and the outer annulus used to estimate the field background. It also
//! carries the color-magnitude binning shared by the mask and the likelihood.

use posho_common::binning::linspace;
use posho_common::{PoshoError, Result};
use posho_sky::healpix::{ang2pix, npix, pix2ang, pix_area_deg2, validate_nside};
use posho_sky::projector::{angsep, Projector};
use tracing::debug;

/// Geometry and binning parameters for building a region of interest
#[derive(Debug, Clone)]
pub struct RoiParams {
    pub nside_pixel: u32,
    /// Outer radius of the full region (deg)
    pub radius: f64,
    /// Radius of the search region (deg)
    pub radius_interior: f64,
    /// Inner radius of the background annulus (deg)
    pub radius_annulus_inner: f64,
    pub mag_min: f64,
    pub mag_max: f64,
    pub mag_step: f64,
    pub color_min: f64,
    pub color_max: f64,
    pub color_step: f64,
}

impl Default for RoiParams {
    fn default() -> Self {
        RoiParams {
            nside_pixel: 128,
            radius: 2.0,
            radius_interior: 0.5,
            radius_annulus_inner: 1.0,
            mag_min: 16.0,
            mag_max: 24.0,
            mag_step: 0.1,
            color_min: -0.5,
            color_max: 1.0,
            color_step: 0.05,
        }
    }
}

impl RoiParams {
    fn validate(&self) -> Result<()> {
        validate_nside(self.nside_pixel)?;
        if !(self.radius_interior > 0.0
            && self.radius_interior < self.radius_annulus_inner
            && self.radius_annulus_inner < self.radius)
        {
            return Err(PoshoError::Config(format!(
                "roi radii must satisfy 0 < interior ({}) < annulus inner ({}) < outer ({})",
                self.radius_interior, self.radius_annulus_inner, self.radius
            )));
        }
        if self.mag_step <= 0.0 || self.mag_max <= self.mag_min {
            return Err(PoshoError::Config(
                "invalid magnitude binning".to_string(),
            ));
        }
        if self.color_step <= 0.0 || self.color_max <= self.color_min {
            return Err(PoshoError::Config("invalid color binning".to_string()));
        }
        Ok(())
    }
}

/// Region of interest around a target position (galactic degrees)
#[derive(Debug, Clone)]
pub struct Roi {
    pub lon: f64,
    pub lat: f64,
    pub nside_pixel: u32,
    /// All pixels within the outer radius, sorted ascending
    pub pixels: Vec<u64>,
    /// Pixels within the interior (search) radius, sorted ascending
    pub pixels_interior: Vec<u64>,
    /// Pixels in the background annulus, sorted ascending
    pub pixels_annulus: Vec<u64>,
    /// Interior pixel centers, parallel to `pixels_interior`
    pub interior_centers: Vec<(f64, f64)>,
    /// Solid angle of one pixel (deg^2)
    pub area_pixel: f64,
    /// Magnitude bin edges of the CMD
    pub bins_mag: Vec<f64>,
    /// Color bin edges of the CMD
    pub bins_color: Vec<f64>,
    pub projector: Projector,
}

impl Roi {
    pub fn new(lon: f64, lat: f64, params: &RoiParams) -> Result<Self> {
        params.validate()?;
        let nside = params.nside_pixel;

        let mut pixels = Vec::new();
        let mut pixels_interior = Vec::new();
        let mut pixels_annulus = Vec::new();
        let mut interior_centers = Vec::new();

        for pix in 0..npix(nside) {
            let (plon, plat) = pix2ang(nside, pix);
            let sep = angsep(lon, lat, plon, plat);
            if sep > params.radius {
                continue;
            }
            pixels.push(pix);
            if sep <= params.radius_interior {
                pixels_interior.push(pix);
                interior_centers.push((plon, plat));
            }
            if sep >= params.radius_annulus_inner {
                pixels_annulus.push(pix);
            }
        }

        if pixels_interior.is_empty() {
            return Err(PoshoError::Config(format!(
                "interior radius {} contains no pixels at nside {}",
                params.radius_interior, nside
            )));
        }
        if pixels_annulus.is_empty() {
            return Err(PoshoError::Config(format!(
                "background annulus [{}, {}] contains no pixels at nside {}",
                params.radius_annulus_inner, params.radius, nside
            )));
        }

        debug!(
            lon,
            lat,
            pixels = pixels.len(),
            interior = pixels_interior.len(),
            annulus = pixels_annulus.len(),
            "built region of interest"
        );

        let n_mag = ((params.mag_max - params.mag_min) / params.mag_step).round() as usize + 1;
        let n_color =
            ((params.color_max - params.color_min) / params.color_step).round() as usize + 1;

        Ok(Roi {
            lon,
            lat,
            nside_pixel: nside,
            pixels,
            pixels_interior,
            pixels_annulus,
            interior_centers,
            area_pixel: pix_area_deg2(nside),
            bins_mag: linspace(params.mag_min, params.mag_max, n_mag),
            bins_color: linspace(params.color_min, params.color_max, n_color),
            projector: Projector::new(lon, lat),
        })
    }

    /// Pixel index of a direction at the region's resolution
    pub fn ang2pix(&self, lon: f64, lat: f64) -> u64 {
        ang2pix(self.nside_pixel, lon, lat)
    }

    pub fn contains(&self, pix: u64) -> bool {
        self.pixels.binary_search(&pix).is_ok()
    }

    pub fn contains_interior(&self, pix: u64) -> bool {
        self.pixels_interior.binary_search(&pix).is_ok()
    }

    pub fn contains_annulus(&self, pix: u64) -> bool {
        self.pixels_annulus.binary_search(&pix).is_ok()
    }

    /// Solid angle of the background annulus (deg^2)
    pub fn area_annulus(&self) -> f64 {
        self.pixels_annulus.len() as f64 * self.area_pixel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RoiParams {
        RoiParams {
            nside_pixel: 64,
            radius: 3.0,
            radius_interior: 1.0,
            radius_annulus_inner: 1.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_roi_pixel_sets_are_nested_and_sorted() {
        let roi = Roi::new(45.0, 30.0, &params()).unwrap();

        assert!(!roi.pixels.is_empty());
        assert!(roi.pixels.windows(2).all(|w| w[0] < w[1]));
        for &pix in &roi.pixels_interior {
            assert!(roi.contains(pix));
            assert!(!roi.contains_annulus(pix));
        }
        for &pix in &roi.pixels_annulus {
            assert!(roi.contains(pix));
        }
        assert_eq!(roi.pixels_interior.len(), roi.interior_centers.len());
    }

    #[test]
    fn test_roi_center_pixel_is_interior() {
        let roi = Roi::new(45.0, 30.0, &params()).unwrap();
        let pix = roi.ang2pix(45.0, 30.0);
        assert!(roi.contains_interior(pix));
    }

    #[test]
    fn test_roi_area_scales_with_radius() {
        let roi = Roi::new(120.0, -40.0, &params()).unwrap();
        let expected = std::f64::consts::PI * 3.0 * 3.0;
        let actual = roi.pixels.len() as f64 * roi.area_pixel;
        // Pixelized disk area within ~20% of the ideal disk
        assert!((actual - expected).abs() / expected < 0.2);
    }

    #[test]
    fn test_roi_bins() {
        let roi = Roi::new(45.0, 30.0, &params()).unwrap();
        assert_eq!(roi.bins_mag.len(), 81);
        assert_eq!(roi.bins_color.len(), 31);
        assert_eq!(roi.bins_mag[0], 16.0);
        assert_eq!(*roi.bins_mag.last().unwrap(), 24.0);
    }

    #[test]
    fn test_invalid_radii_rejected() {
        let mut p = params();
        p.radius_interior = 1.5;
        p.radius_annulus_inner = 1.0;
        assert!(Roi::new(45.0, 30.0, &p).is_err());
    }

    #[test]
    fn test_invalid_nside_rejected() {
        let mut p = params();
        p.nside_pixel = 100;
        assert!(Roi::new(45.0, 30.0, &p).is_err());
    }
}
