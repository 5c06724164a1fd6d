//! Named target positions
//!
//! Targets live in a YAML list so a survey's candidate table can be checked
//! in next to the configuration and selected by name on the command line.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use posho_common::{PoshoError, Result};

/// One named sky position (galactic degrees)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

/// Load the full target list
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Target>> {
    let file = File::open(path.as_ref())?;
    let targets: Vec<Target> = serde_yaml::from_reader(BufReader::new(file))?;
    Ok(targets)
}

/// Look one target up by name
pub fn find<P: AsRef<Path>>(path: P, name: &str) -> Result<Target> {
    let targets = load(path.as_ref())?;
    targets
        .into_iter()
        .find(|t| t.name == name)
        .ok_or_else(|| {
            PoshoError::Config(format!(
                "target '{}' not found in {}",
                name,
                path.as_ref().display()
            ))
        })
}
