//! Posho Likelihood - the satellite-search engine
//!
//! This crate implements the unbinned maximum-likelihood search for faint
//! stellar satellites:
//! - `Model`/`Parameter`: bounded, named model parameters
//! - `Kernel`: spatial surface-density profiles (Plummer, King)
//! - `Isochrone`: stellar tracks weighted by an initial mass function
//! - `LogLikelihood`: the signal/background mixture likelihood and the
//!   richness maximization
//! - `GridScan`: likelihood scans over sky pixels and distance moduli
//! - `EnsembleSampler`: affine-invariant MCMC over model parameters
//! - `Membership`: per-object membership probability output

pub mod isochrone;
pub mod kernel;
pub mod loglike;
pub mod mcmc;
pub mod membership;
pub mod model;
pub mod scan;

// Re-exports for convenience
pub use isochrone::{Isochrone, IsochronePoint, IsochroneSample};
pub use kernel::Kernel;
pub use loglike::{LikelihoodParams, LogLikelihood, RichnessFit};
pub use mcmc::{Chain, EnsembleSampler, ParamSpec};
pub use membership::Membership;
pub use model::{Model, Parameter, Richness};
pub use scan::{GridScan, ScanRecord, ScanResult};
