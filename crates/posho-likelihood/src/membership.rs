//! Per-object membership output
//!
//! After a fit, every interior object carries a membership probability. The
//! output records the object photometry in both galactic and celestial
//! coordinates together with the model parameters that produced it.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use posho_common::Result;
use posho_sky::projector::gal2cel;

use crate::loglike::LogLikelihood;

/// One object with its membership probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub objid: u64,
    /// Galactic coordinates (deg)
    pub lon: f64,
    pub lat: f64,
    /// Celestial coordinates (deg)
    pub ra: f64,
    pub dec: f64,
    pub mag_1: f64,
    pub mag_err_1: f64,
    pub mag_2: f64,
    pub mag_err_2: f64,
    pub color: f64,
    /// Membership probability at the fitted parameters
    pub prob: f64,
}

/// Membership probabilities for every interior object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Model parameter values the probabilities were evaluated at
    pub params: BTreeMap<String, f64>,
    pub records: Vec<MembershipRecord>,
}

impl Membership {
    /// Evaluate membership probabilities at the current model parameters
    pub fn from_loglike(loglike: &mut LogLikelihood) -> Result<Self> {
        loglike.sync()?;

        let catalog = loglike.catalog();
        let probabilities = loglike.membership_probabilities();
        let mut records = Vec::with_capacity(catalog.len());
        for k in 0..catalog.len() {
            let (ra, dec) = gal2cel(catalog.lon[k], catalog.lat[k]);
            records.push(MembershipRecord {
                objid: catalog.objid[k],
                lon: catalog.lon[k],
                lat: catalog.lat[k],
                ra,
                dec,
                mag_1: catalog.mag_1[k],
                mag_err_1: catalog.mag_err_1[k],
                mag_2: catalog.mag_2[k],
                mag_err_2: catalog.mag_err_2[k],
                color: catalog.color[k],
                prob: probabilities[k],
            });
        }

        let params = loglike.model_params().into_iter().collect();
        Ok(Membership { params, records })
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_json(BufWriter::new(file))?;
        info!(
            path = %path.as_ref().display(),
            objects = self.records.len(),
            "wrote membership probabilities"
        );
        Ok(())
    }
}
