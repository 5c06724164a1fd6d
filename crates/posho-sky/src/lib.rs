//! Posho Sky - pixelization and spherical geometry
//!
//! This crate provides:
//! - RING-scheme HEALPix pixelization (`ang2pix`, `pix2ang`)
//! - Angular separations and galactic/celestial transforms
//! - The gnomonic tangent-plane projector used for region-local coordinates
//!
//! All angles at the public surface are in degrees; longitudes are
//! normalized to `[0, 360)` and latitudes to `[-90, 90]`.

pub mod healpix;
pub mod projector;

// Re-exports for convenience
pub use healpix::{ang2pix, npix, pix2ang, pix_area_deg2, validate_nside};
pub use projector::{angsep, cel2gal, gal2cel, Projector};
