//! Posho Observation - survey data handling
//!
//! This crate provides the observational inputs of a likelihood analysis:
//! - `Catalog`: columnar photometric object catalogs
//! - `Roi`: target-centered pixel regions with their CMD binning
//! - `Mask`: per-pixel limiting magnitudes and the background CMD estimate

pub mod catalog;
pub mod mask;
pub mod roi;

// Re-exports for convenience
pub use catalog::{Catalog, CatalogObject};
pub use mask::{Mask, MaskPixel};
pub use roi::{Roi, RoiParams};
