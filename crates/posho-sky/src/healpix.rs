//! RING-scheme HEALPix pixelization
//!
//! Equal-area pixelization of the sphere following the canonical HEALPix
//! construction: polar cap rings of `4 * ring` pixels and equatorial rings
//! of `4 * nside` pixels, indexed north to south in RING order.

use posho_common::{FULL_SKY_DEG2, PoshoError, Result};
use std::f64::consts::PI;

/// Number of pixels over the full sky
pub fn npix(nside: u32) -> u64 {
    12 * nside as u64 * nside as u64
}

/// Solid angle of a single pixel in square degrees
pub fn pix_area_deg2(nside: u32) -> f64 {
    FULL_SKY_DEG2 / npix(nside) as f64
}

/// Resolutions must be a positive power of two
pub fn validate_nside(nside: u32) -> Result<()> {
    if nside == 0 || !nside.is_power_of_two() {
        return Err(PoshoError::Config(format!(
            "nside must be a positive power of two, got {}",
            nside
        )));
    }
    Ok(())
}

/// RING-scheme pixel containing the direction (`lon`, `lat`) in degrees
pub fn ang2pix(nside: u32, lon_deg: f64, lat_deg: f64) -> u64 {
    let nside_l = nside as i64;
    let z = lat_deg.to_radians().sin();
    let za = z.abs();

    let mut phi = lon_deg.to_radians() % (2.0 * PI);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    let tt = phi / (0.5 * PI); // in [0, 4)

    if za <= 2.0 / 3.0 {
        // Equatorial region: pixel from the crossing of the two edge lines
        let temp1 = nside as f64 * (0.5 + tt);
        let temp2 = nside as f64 * z * 0.75;
        let jp = (temp1 - temp2).floor() as i64; // ascending edge line
        let jm = (temp1 + temp2).floor() as i64; // descending edge line

        let ir = nside_l + 1 + jp - jm; // ring counted from z = 2/3
        let kshift = 1 - (ir & 1);
        let nl4 = 4 * nside_l;
        let ip = ((jp + jm - nside_l + kshift + 1) / 2).rem_euclid(nl4);

        let ncap = 2 * nside_l * (nside_l - 1);
        (ncap + (ir - 1) * nl4 + ip) as u64
    } else {
        // Polar caps
        let tp = tt.fract();
        let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = (tp * tmp).floor() as i64;
        let jm = ((1.0 - tp) * tmp).floor() as i64;

        let ir = jp + jm + 1; // ring counted from the pole
        let ip = ((tt * ir as f64).floor() as i64).rem_euclid(4 * ir);

        if z > 0.0 {
            (2 * ir * (ir - 1) + ip) as u64
        } else {
            (npix(nside) as i64 - 2 * ir * (ir + 1) + ip) as u64
        }
    }
}

/// Center of a RING-scheme pixel as (`lon`, `lat`) in degrees
pub fn pix2ang(nside: u32, pix: u64) -> (f64, f64) {
    let nside_l = nside as i64;
    let npix_l = npix(nside) as i64;
    let ncap = 2 * nside_l * (nside_l - 1);
    let p = pix as i64;

    let (z, phi) = if p < ncap {
        // North polar cap
        let iring = (1 + isqrt(1 + 2 * p)) >> 1;
        let iphi = p + 1 - 2 * iring * (iring - 1);
        let z = 1.0 - (iring * iring) as f64 / (3.0 * (nside_l * nside_l) as f64);
        let phi = (iphi as f64 - 0.5) * PI / (2.0 * iring as f64);
        (z, phi)
    } else if p < npix_l - ncap {
        // Equatorial region
        let ip = p - ncap;
        let nl4 = 4 * nside_l;
        let iring = ip / nl4 + nside_l;
        let iphi = ip % nl4 + 1;
        // Odd rings are shifted by half a pixel
        let fodd = if (iring + nside_l) & 1 == 1 { 1.0 } else { 0.5 };
        let z = (2 * nside_l - iring) as f64 * 2.0 / (3.0 * nside_l as f64);
        let phi = (iphi as f64 - fodd) * PI / (2.0 * nside_l as f64);
        (z, phi)
    } else {
        // South polar cap
        let ip = npix_l - p;
        let iring = (1 + isqrt(2 * ip - 1)) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let z = -1.0 + (iring * iring) as f64 / (3.0 * (nside_l * nside_l) as f64);
        let phi = (iphi as f64 - 0.5) * PI / (2.0 * iring as f64);
        (z, phi)
    };

    let lat = z.clamp(-1.0, 1.0).asin().to_degrees();
    let mut lon = phi.to_degrees();
    if lon >= 360.0 {
        lon -= 360.0;
    }
    (lon, lat)
}

fn isqrt(v: i64) -> i64 {
    let mut r = (v as f64).sqrt() as i64;
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    while r * r > v {
        r -= 1;
    }
    r
}
