//! JSON reports written by the pipeline commands

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use posho_common::Result;
use posho_likelihood::{ScanRecord, ScanResult};

/// Position a command ran against
#[derive(Debug, Clone, Serialize)]
pub struct TargetInfo {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub target: TargetInfo,
    pub generated_at: String,
    pub best: ScanRecord,
    pub records: Vec<ScanRecord>,
}

impl ScanReport {
    pub fn new(target: TargetInfo, result: ScanResult) -> Self {
        ScanReport {
            target,
            generated_at: Utc::now().to_rfc3339(),
            best: result.best,
            records: result.records,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParamSummary {
    pub name: String,
    pub median: f64,
    pub p16: f64,
    pub p84: f64,
}

#[derive(Debug, Serialize)]
pub struct McmcSummary {
    pub walkers: usize,
    pub steps: usize,
    pub burn: usize,
    pub acceptance_fraction: f64,
    pub params: Vec<ParamSummary>,
}

#[derive(Debug, Serialize)]
pub struct FitReport {
    pub target: TargetInfo,
    pub generated_at: String,
    pub distance_modulus: f64,
    pub richness: f64,
    pub loglike: f64,
    pub ts: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcmc: Option<McmcSummary>,
}

impl FitReport {
    pub fn new(
        target: TargetInfo,
        distance_modulus: f64,
        fit: posho_likelihood::RichnessFit,
        mcmc: Option<McmcSummary>,
    ) -> Self {
        FitReport {
            target,
            generated_at: Utc::now().to_rfc3339(),
            distance_modulus,
            richness: fit.richness,
            loglike: fit.loglike,
            ts: fit.ts(),
            mcmc,
        }
    }
}

/// Serialize any report to pretty JSON
pub fn write_json<T: Serialize, P: AsRef<Path>>(report: &T, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    info!(path = %path.as_ref().display(), "wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_report_round_trip() {
        let record = ScanRecord {
            pixel: 42,
            lon: 220.0,
            lat: 50.0,
            distance_modulus: 17.5,
            richness: 310.0,
            ts: 64.2,
        };
        let report = ScanReport::new(
            TargetInfo {
                name: "seg_1".to_string(),
                lon: 220.0,
                lat: 50.0,
            },
            ScanResult {
                records: vec![record.clone()],
                best: record,
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        write_json(&report, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["target"]["name"], "seg_1");
        assert_eq!(value["best"]["pixel"], 42);
        assert_eq!(value["records"].as_array().unwrap().len(), 1);
        assert!(value["generated_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_fit_report_omits_empty_mcmc() {
        let report = FitReport {
            target: TargetInfo {
                name: "custom".to_string(),
                lon: 10.0,
                lat: 20.0,
            },
            generated_at: Utc::now().to_rfc3339(),
            distance_modulus: 18.0,
            richness: 120.0,
            loglike: 30.0,
            ts: 60.0,
            mcmc: None,
        };
        let text = serde_json::to_string(&report).unwrap();
        assert!(!text.contains("mcmc"));
    }
}
