//! Photometric object catalogs
//!
//! Catalogs are stored column-wise: the likelihood reads whole columns at a
//! time and boolean cuts produce new catalogs. Input files are JSON arrays of
//! per-object records.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use posho_common::Result;
use posho_sky::projector::Projector;

use crate::roi::Roi;

/// One catalog record as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogObject {
    pub objid: u64,
    /// Galactic longitude (deg)
    pub lon: f64,
    /// Galactic latitude (deg)
    pub lat: f64,
    pub mag_1: f64,
    pub mag_err_1: f64,
    pub mag_2: f64,
    pub mag_err_2: f64,
}

/// Column-wise object catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub objid: Vec<u64>,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub mag_1: Vec<f64>,
    pub mag_err_1: Vec<f64>,
    pub mag_2: Vec<f64>,
    pub mag_err_2: Vec<f64>,
    /// `mag_1 - mag_2`
    pub color: Vec<f64>,
    /// HEALPix pixel per object, filled by `spatial_bin`
    pub pixel: Vec<u64>,
    /// Tangent-plane coordinates, filled by `project`
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Catalog {
    pub fn from_objects(objects: Vec<CatalogObject>) -> Self {
        let n = objects.len();
        let mut catalog = Catalog {
            objid: Vec::with_capacity(n),
            lon: Vec::with_capacity(n),
            lat: Vec::with_capacity(n),
            mag_1: Vec::with_capacity(n),
            mag_err_1: Vec::with_capacity(n),
            mag_2: Vec::with_capacity(n),
            mag_err_2: Vec::with_capacity(n),
            color: Vec::with_capacity(n),
            ..Default::default()
        };
        for obj in objects {
            catalog.objid.push(obj.objid);
            catalog.lon.push(obj.lon);
            catalog.lat.push(obj.lat);
            catalog.mag_1.push(obj.mag_1);
            catalog.mag_err_1.push(obj.mag_err_1);
            catalog.mag_2.push(obj.mag_2);
            catalog.mag_err_2.push(obj.mag_err_2);
            catalog.color.push(obj.mag_1 - obj.mag_2);
        }
        catalog
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let objects: Vec<CatalogObject> = serde_json::from_reader(BufReader::new(file))?;
        let catalog = Self::from_objects(objects);
        info!(
            path = %path.as_ref().display(),
            objects = catalog.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.objid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objid.is_empty()
    }

    /// Magnitude column of the detection band
    pub fn mag(&self, band_1_detection: bool) -> &[f64] {
        if band_1_detection {
            &self.mag_1
        } else {
            &self.mag_2
        }
    }

    /// Subset of rows where `cut` is true.
    ///
    /// `cut` must have one entry per object; derived columns that have been
    /// filled (`pixel`, `x`, `y`) are carried through the cut.
    pub fn apply_cut(&self, cut: &[bool]) -> Catalog {
        debug_assert_eq!(cut.len(), self.len());

        fn filter<T: Copy>(values: &[T], cut: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(cut.iter())
                .filter(|&(_, &keep)| keep)
                .map(|(&v, _)| v)
                .collect()
        }

        Catalog {
            objid: filter(&self.objid, cut),
            lon: filter(&self.lon, cut),
            lat: filter(&self.lat, cut),
            mag_1: filter(&self.mag_1, cut),
            mag_err_1: filter(&self.mag_err_1, cut),
            mag_2: filter(&self.mag_2, cut),
            mag_err_2: filter(&self.mag_err_2, cut),
            color: filter(&self.color, cut),
            pixel: filter(&self.pixel, cut),
            x: filter(&self.x, cut),
            y: filter(&self.y, cut),
        }
    }

    /// Assign each object its HEALPix pixel at the region's resolution
    pub fn spatial_bin(&mut self, roi: &Roi) {
        self.pixel = self
            .lon
            .iter()
            .zip(self.lat.iter())
            .map(|(&lon, &lat)| roi.ang2pix(lon, lat))
            .collect();
    }

    /// Project all objects onto the tangent plane
    pub fn project(&mut self, projector: &Projector) {
        let mut x = Vec::with_capacity(self.len());
        let mut y = Vec::with_capacity(self.len());
        for (&lon, &lat) in self.lon.iter().zip(self.lat.iter()) {
            let (px, py) = projector.project(lon, lat);
            x.push(px);
            y.push(py);
        }
        self.x = x;
        self.y = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_objects() -> Vec<CatalogObject> {
        vec![
            CatalogObject {
                objid: 1,
                lon: 45.0,
                lat: 30.0,
                mag_1: 20.0,
                mag_err_1: 0.02,
                mag_2: 19.5,
                mag_err_2: 0.03,
            },
            CatalogObject {
                objid: 2,
                lon: 45.2,
                lat: 29.9,
                mag_1: 21.0,
                mag_err_1: 0.05,
                mag_2: 20.8,
                mag_err_2: 0.06,
            },
            CatalogObject {
                objid: 3,
                lon: 44.8,
                lat: 30.1,
                mag_1: 18.0,
                mag_err_1: 0.01,
                mag_2: 17.2,
                mag_err_2: 0.01,
            },
        ]
    }

    #[test]
    fn test_from_objects_columns() {
        let catalog = Catalog::from_objects(sample_objects());
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.objid, vec![1, 2, 3]);
        assert!((catalog.color[0] - 0.5).abs() < 1e-12);
        assert!((catalog.color[2] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_apply_cut() {
        let catalog = Catalog::from_objects(sample_objects());
        let cut = vec![true, false, true];
        let subset = catalog.apply_cut(&cut);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.objid, vec![1, 3]);
        assert_eq!(subset.mag_1, vec![20.0, 18.0]);
    }

    #[test]
    fn test_project_centers_reference() {
        let mut catalog = Catalog::from_objects(sample_objects());
        let projector = Projector::new(45.0, 30.0);
        catalog.project(&projector);
        assert_eq!(catalog.x.len(), 3);
        assert!(catalog.x[0].abs() < 1e-12);
        assert!(catalog.y[0].abs() < 1e-12);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            "{}",
            serde_json::to_string(&sample_objects()).unwrap()
        )
        .unwrap();

        let catalog = Catalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.objid, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Catalog::from_json_file("/nonexistent/catalog.json").is_err());
    }
}
