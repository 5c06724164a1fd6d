//! Survey mask and background estimation
//!
//! The mask records the limiting magnitude of each region pixel in both
//! bands. It drives the observable-space catalog cut and the empirical
//! background color-magnitude density that the likelihood compares every
//! object against.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use posho_common::binning::{centers, histogram_2d};
use posho_common::{Grid2, PoshoError, Result};

use crate::catalog::Catalog;
use crate::roi::Roi;

/// One sparse mask entry as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskPixel {
    pub pixel: u64,
    pub maglim: f64,
}

/// Per-pixel limiting magnitudes over a region of interest
#[derive(Debug, Clone)]
pub struct Mask {
    maglim_1: HashMap<u64, f64>,
    maglim_2: HashMap<u64, f64>,
    /// Deepest band-1 limit over the masked region
    pub mag_1_clip: f64,
    /// Deepest band-2 limit over the masked region
    pub mag_2_clip: f64,
}

impl Mask {
    /// Uniform-depth mask covering every pixel of the region
    pub fn uniform(roi: &Roi, maglim_1: f64, maglim_2: f64) -> Self {
        let maglim_1: HashMap<u64, f64> =
            roi.pixels.iter().map(|&p| (p, maglim_1)).collect();
        let maglim_2: HashMap<u64, f64> =
            roi.pixels.iter().map(|&p| (p, maglim_2)).collect();
        Self::from_maps(maglim_1, maglim_2)
    }

    /// Load sparse per-band maglim maps, restricted to the region's pixels.
    ///
    /// Pixels present in only one band are dropped: an object needs a depth
    /// in both bands to be observable.
    pub fn from_json_files<P: AsRef<Path>>(path_1: P, path_2: P, roi: &Roi) -> Result<Self> {
        let map_1 = read_maglim_map(path_1.as_ref(), roi)?;
        let mut map_2 = read_maglim_map(path_2.as_ref(), roi)?;

        let maglim_1: HashMap<u64, f64> = map_1
            .into_iter()
            .filter(|(pix, _)| map_2.contains_key(pix))
            .collect();
        map_2.retain(|pix, _| maglim_1.contains_key(pix));

        if maglim_1.is_empty() {
            return Err(PoshoError::Config(
                "mask covers no pixels of the region".to_string(),
            ));
        }
        info!(pixels = maglim_1.len(), "loaded mask");
        Ok(Self::from_maps(maglim_1, map_2))
    }

    fn from_maps(maglim_1: HashMap<u64, f64>, maglim_2: HashMap<u64, f64>) -> Self {
        let deepest = |map: &HashMap<u64, f64>| {
            map.values().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
        };
        let mag_1_clip = deepest(&maglim_1);
        let mag_2_clip = deepest(&maglim_2);
        Mask {
            maglim_1,
            maglim_2,
            mag_1_clip,
            mag_2_clip,
        }
    }

    pub fn maglim_1(&self, pix: u64) -> Option<f64> {
        self.maglim_1.get(&pix).copied()
    }

    pub fn maglim_2(&self, pix: u64) -> Option<f64> {
        self.maglim_2.get(&pix).copied()
    }

    /// Limiting magnitude of the detection band
    pub fn maglim(&self, pix: u64, band_1_detection: bool) -> Option<f64> {
        if band_1_detection {
            self.maglim_1(pix)
        } else {
            self.maglim_2(pix)
        }
    }

    /// Observable-space cut: object sits in a masked pixel, is brighter than
    /// both band limits there, has positive errors, and lands inside the
    /// region's color-magnitude binning.
    pub fn restrict_to_observable(
        &self,
        catalog: &Catalog,
        roi: &Roi,
        band_1_detection: bool,
    ) -> Vec<bool> {
        let mag_lo = roi.bins_mag[0];
        let mag_hi = *roi.bins_mag.last().expect("bins_mag is never empty");
        let color_lo = roi.bins_color[0];
        let color_hi = *roi.bins_color.last().expect("bins_color is never empty");

        (0..catalog.len())
            .map(|k| {
                let pix = roi.ang2pix(catalog.lon[k], catalog.lat[k]);
                let (Some(lim_1), Some(lim_2)) = (self.maglim_1(pix), self.maglim_2(pix))
                else {
                    return false;
                };
                let mag = if band_1_detection {
                    catalog.mag_1[k]
                } else {
                    catalog.mag_2[k]
                };
                catalog.mag_1[k] < lim_1
                    && catalog.mag_2[k] < lim_2
                    && catalog.mag_err_1[k] > 0.0
                    && catalog.mag_err_2[k] > 0.0
                    && mag >= mag_lo
                    && mag <= mag_hi
                    && catalog.color[k] >= color_lo
                    && catalog.color[k] <= color_hi
            })
            .collect()
    }

    /// Background color-magnitude density in deg^-2 mag^-2.
    ///
    /// Counts annulus objects into the region's (color, mag) bins and divides
    /// by the solid angle still observable at each magnitude and by the bin
    /// area. The catalog must have been spatially binned.
    pub fn background_cmd(
        &self,
        catalog: &Catalog,
        roi: &Roi,
        band_1_detection: bool,
    ) -> Result<Grid2> {
        let annulus_cut: Vec<bool> = catalog
            .pixel
            .iter()
            .map(|&pix| roi.contains_annulus(pix))
            .collect();
        let annulus = catalog.apply_cut(&annulus_cut);
        debug!(objects = annulus.len(), "estimating background CMD");

        let counts = histogram_2d(
            &annulus.color,
            annulus.mag(band_1_detection),
            None,
            &roi.bins_color,
            &roi.bins_mag,
        )?;

        // Solid angle of the annulus still observable at each magnitude
        let mag_centers = centers(&roi.bins_mag);
        let area_at_mag: Vec<f64> = mag_centers
            .iter()
            .map(|&m| {
                let observable = roi
                    .pixels_annulus
                    .iter()
                    .filter(|&&pix| {
                        self.maglim(pix, band_1_detection)
                            .is_some_and(|lim| lim > m)
                    })
                    .count();
                observable as f64 * roi.area_pixel
            })
            .collect();

        let delta_color = roi.bins_color[1] - roi.bins_color[0];
        let delta_mag = roi.bins_mag[1] - roi.bins_mag[0];

        let (nc, nm) = counts.shape();
        let mut density = Grid2::zeros(nc, nm);
        for ic in 0..nc {
            for im in 0..nm {
                let area = area_at_mag[im];
                if area > 0.0 {
                    let value = counts.get(ic, im) / (area * delta_color * delta_mag);
                    density.set(ic, im, value);
                }
            }
        }
        Ok(density)
    }
}

fn read_maglim_map(path: &Path, roi: &Roi) -> Result<HashMap<u64, f64>> {
    let file = File::open(path)?;
    let entries: Vec<MaskPixel> = serde_json::from_reader(BufReader::new(file))?;
    Ok(entries
        .into_iter()
        .filter(|e| roi.contains(e.pixel))
        .map(|e| (e.pixel, e.maglim))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::RoiParams;
    use std::io::Write;

    fn test_roi() -> Roi {
        let params = RoiParams {
            nside_pixel: 64,
            radius: 3.0,
            radius_interior: 1.0,
            radius_annulus_inner: 1.5,
            ..Default::default()
        };
        Roi::new(45.0, 30.0, &params).unwrap()
    }

    fn object_at(lon: f64, lat: f64, mag_1: f64, mag_2: f64) -> crate::CatalogObject {
        crate::CatalogObject {
            objid: 0,
            lon,
            lat,
            mag_1,
            mag_err_1: 0.02,
            mag_2,
            mag_err_2: 0.02,
        }
    }

    #[test]
    fn test_uniform_mask_clip() {
        let roi = test_roi();
        let mask = Mask::uniform(&roi, 23.5, 23.0);
        assert_eq!(mask.mag_1_clip, 23.5);
        assert_eq!(mask.mag_2_clip, 23.0);
        let pix = roi.pixels[0];
        assert_eq!(mask.maglim_1(pix), Some(23.5));
        assert_eq!(mask.maglim_2(pix), Some(23.0));
    }

    #[test]
    fn test_restrict_to_observable() {
        let roi = test_roi();
        let mask = Mask::uniform(&roi, 23.0, 23.0);
        let catalog = Catalog::from_objects(vec![
            object_at(45.0, 30.0, 20.0, 19.8),  // observable
            object_at(45.0, 30.0, 23.5, 19.8),  // too faint in band 1
            object_at(45.0, 30.0, 20.0, 23.5),  // too faint in band 2
            object_at(100.0, -20.0, 20.0, 19.8), // outside the region
            object_at(45.0, 30.0, 15.0, 14.8),  // brighter than the CMD range
        ]);
        let cut = mask.restrict_to_observable(&catalog, &roi, true);
        assert_eq!(cut, vec![true, false, false, false, false]);
    }

    #[test]
    fn test_background_cmd_density() {
        let roi = test_roi();
        let mask = Mask::uniform(&roi, 24.0, 24.0);

        // One object of color 0.5, mag 20.05 per annulus pixel center
        let objects: Vec<_> = roi
            .pixels_annulus
            .iter()
            .map(|&pix| {
                let (lon, lat) = posho_sky::healpix::pix2ang(roi.nside_pixel, pix);
                object_at(lon, lat, 20.05, 19.55)
            })
            .collect();
        let n = objects.len() as f64;
        let mut catalog = Catalog::from_objects(objects);
        catalog.spatial_bin(&roi);

        let density = mask.background_cmd(&catalog, &roi, true).unwrap();

        let delta_color = roi.bins_color[1] - roi.bins_color[0];
        let delta_mag = roi.bins_mag[1] - roi.bins_mag[0];
        let expected = n / (roi.area_annulus() * delta_color * delta_mag);

        // All weight lands in the cell holding the objects' (color, mag)
        let ic = posho_common::binning::bin_index(&roi.bins_color, catalog.color[0]).unwrap();
        let im = posho_common::binning::bin_index(&roi.bins_mag, catalog.mag_1[0]).unwrap();
        assert!((density.get(ic, im) - expected).abs() / expected < 1e-9);
        assert!(density.get(0, 0).abs() < 1e-12);
    }

    #[test]
    fn test_mask_from_json_files() {
        let roi = test_roi();
        let dir = tempfile::tempdir().unwrap();

        let entries_1: Vec<MaskPixel> = roi
            .pixels
            .iter()
            .map(|&pixel| MaskPixel { pixel, maglim: 23.5 })
            .collect();
        // Band 2 misses one pixel; that pixel must drop out entirely
        let entries_2: Vec<MaskPixel> = roi.pixels[1..]
            .iter()
            .map(|&pixel| MaskPixel { pixel, maglim: 23.0 })
            .collect();

        let path_1 = dir.path().join("maglim_1.json");
        let path_2 = dir.path().join("maglim_2.json");
        write!(
            File::create(&path_1).unwrap(),
            "{}",
            serde_json::to_string(&entries_1).unwrap()
        )
        .unwrap();
        write!(
            File::create(&path_2).unwrap(),
            "{}",
            serde_json::to_string(&entries_2).unwrap()
        )
        .unwrap();

        let mask = Mask::from_json_files(&path_1, &path_2, &roi).unwrap();
        assert_eq!(mask.maglim_1(roi.pixels[0]), None);
        assert_eq!(mask.maglim_1(roi.pixels[1]), Some(23.5));
        assert_eq!(mask.maglim_2(roi.pixels[1]), Some(23.0));
    }
}
