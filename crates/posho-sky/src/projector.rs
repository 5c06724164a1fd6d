//! Angular separations, frame transforms, and tangent-plane projection

/// J2000 rotation from celestial (equatorial) to galactic cartesian frames.
/// Rows are the galactic basis vectors expressed in the celestial frame.
const CEL_TO_GAL: [[f64; 3]; 3] = [
    [-0.054_875_560_4, -0.873_437_090_2, -0.483_835_015_5],
    [0.494_109_427_9, -0.444_829_630_0, 0.746_982_244_5],
    [-0.867_666_149_0, -0.198_076_373_4, 0.455_983_776_2],
];

fn ang2vec(lon_deg: f64, lat_deg: f64) -> [f64; 3] {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    [
        lat.cos() * lon.cos(),
        lat.cos() * lon.sin(),
        lat.sin(),
    ]
}

fn vec2ang(v: [f64; 3]) -> (f64, f64) {
    let lat = v[2].clamp(-1.0, 1.0).asin().to_degrees();
    let mut lon = v[1].atan2(v[0]).to_degrees();
    if lon < 0.0 {
        lon += 360.0;
    }
    (lon, lat)
}

/// Great-circle separation between two directions, in degrees (haversine)
pub fn angsep(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlam = (lon2 - lon1).to_radians();

    let h = (dphi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (dlam / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin().to_degrees()
}

/// Galactic (l, b) to celestial (ra, dec), J2000, degrees
pub fn gal2cel(lon: f64, lat: f64) -> (f64, f64) {
    let g = ang2vec(lon, lat);
    // Transpose applies the inverse rotation
    let c = [
        CEL_TO_GAL[0][0] * g[0] + CEL_TO_GAL[1][0] * g[1] + CEL_TO_GAL[2][0] * g[2],
        CEL_TO_GAL[0][1] * g[0] + CEL_TO_GAL[1][1] * g[1] + CEL_TO_GAL[2][1] * g[2],
        CEL_TO_GAL[0][2] * g[0] + CEL_TO_GAL[1][2] * g[1] + CEL_TO_GAL[2][2] * g[2],
    ];
    vec2ang(c)
}

/// Celestial (ra, dec) to galactic (l, b), J2000, degrees
pub fn cel2gal(lon: f64, lat: f64) -> (f64, f64) {
    let c = ang2vec(lon, lat);
    let g = [
        CEL_TO_GAL[0][0] * c[0] + CEL_TO_GAL[0][1] * c[1] + CEL_TO_GAL[0][2] * c[2],
        CEL_TO_GAL[1][0] * c[0] + CEL_TO_GAL[1][1] * c[1] + CEL_TO_GAL[1][2] * c[2],
        CEL_TO_GAL[2][0] * c[0] + CEL_TO_GAL[2][1] * c[1] + CEL_TO_GAL[2][2] * c[2],
    ];
    vec2ang(g)
}

/// Gnomonic tangent-plane projector anchored at a reference direction.
///
/// Projected (x, y) are in degrees on the tangent plane, with (0, 0) at the
/// reference point, x increasing with longitude and y with latitude.
#[derive(Debug, Clone)]
pub struct Projector {
    lon_ref: f64,
    lat_ref: f64,
    sin_lat: f64,
    cos_lat: f64,
}

impl Projector {
    pub fn new(lon_ref: f64, lat_ref: f64) -> Self {
        let lat_r = lat_ref.to_radians();
        Projector {
            lon_ref,
            lat_ref,
            sin_lat: lat_r.sin(),
            cos_lat: lat_r.cos(),
        }
    }

    pub fn lon_ref(&self) -> f64 {
        self.lon_ref
    }

    pub fn lat_ref(&self) -> f64 {
        self.lat_ref
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let dlon = (lon - self.lon_ref).to_radians();
        let lat_r = lat.to_radians();
        let cos_c = self.sin_lat * lat_r.sin() + self.cos_lat * lat_r.cos() * dlon.cos();

        let x = lat_r.cos() * dlon.sin() / cos_c;
        let y = (self.cos_lat * lat_r.sin() - self.sin_lat * lat_r.cos() * dlon.cos()) / cos_c;
        (x.to_degrees(), y.to_degrees())
    }

    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x.to_radians();
        let y = y.to_radians();
        let rho = (x * x + y * y).sqrt();
        if rho == 0.0 {
            return (self.lon_ref, self.lat_ref);
        }
        let c = rho.atan();

        let lat = (c.cos() * self.sin_lat + y * c.sin() * self.cos_lat / rho)
            .clamp(-1.0, 1.0)
            .asin()
            .to_degrees();
        let mut lon = self.lon_ref
            + (x * c.sin())
                .atan2(rho * self.cos_lat * c.cos() - y * self.sin_lat * c.sin())
                .to_degrees();
        lon = lon.rem_euclid(360.0);
        (lon, lat)
    }
}

/// Normalize a longitude into `[0, 360)`
pub fn wrap_lon(lon: f64) -> f64 {
    let mut v = lon % 360.0;
    if v < 0.0 {
        v += 360.0;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angsep_basics() {
        assert!(angsep(10.0, 20.0, 10.0, 20.0).abs() < 1e-12);
        assert!((angsep(0.0, 0.0, 90.0, 0.0) - 90.0).abs() < 1e-9);
        assert!((angsep(0.0, -90.0, 0.0, 90.0) - 180.0).abs() < 1e-9);
        // Symmetric
        let a = angsep(12.0, 34.0, 56.0, 78.0);
        let b = angsep(56.0, 78.0, 12.0, 34.0);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_angsep_near_pole_scaling() {
        // One degree of longitude shrinks with latitude
        let sep = angsep(0.0, 80.0, 1.0, 80.0);
        assert!((sep - (80.0f64).to_radians().cos()).abs() < 1e-3);
    }

    #[test]
    fn test_gal2cel_galactic_center() {
        let (ra, dec) = gal2cel(0.0, 0.0);
        assert!((ra - 266.405).abs() < 0.01);
        assert!((dec + 28.936).abs() < 0.01);
    }

    #[test]
    fn test_gal2cel_north_galactic_pole() {
        let (ra, dec) = gal2cel(33.0, 90.0);
        assert!((ra - 192.859).abs() < 0.01);
        assert!((dec - 27.128).abs() < 0.01);
    }

    #[test]
    fn test_frame_round_trip() {
        for &(l, b) in &[(0.0, 0.0), (220.17, 50.0), (86.4, -34.7), (359.9, 5.0)] {
            let (ra, dec) = gal2cel(l, b);
            let (l2, b2) = cel2gal(ra, dec);
            assert!(angsep(l, b, l2, b2) < 1e-9);
        }
    }

    #[test]
    fn test_projector_center() {
        let proj = Projector::new(120.0, -45.0);
        let (x, y) = proj.project(120.0, -45.0);
        assert!(x.abs() < 1e-12);
        assert!(y.abs() < 1e-12);
    }

    #[test]
    fn test_projector_round_trip() {
        let proj = Projector::new(80.0, 10.0);
        for &(lon, lat) in &[(81.0, 10.5), (79.2, 9.1), (80.0, 12.0), (77.5, 10.0)] {
            let (x, y) = proj.project(lon, lat);
            let (lon2, lat2) = proj.unproject(x, y);
            assert!(angsep(lon, lat, lon2, lat2) < 1e-9);
        }
    }

    #[test]
    fn test_projector_small_offsets_match_angsep() {
        let proj = Projector::new(200.0, -60.0);
        let (x, y) = proj.project(200.1, -60.05);
        let r = (x * x + y * y).sqrt();
        let sep = angsep(200.0, -60.0, 200.1, -60.05);
        assert!((r - sep).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_lon() {
        assert_eq!(wrap_lon(0.0), 0.0);
        assert_eq!(wrap_lon(360.0), 0.0);
        assert!((wrap_lon(-10.0) - 350.0).abs() < 1e-12);
        assert!((wrap_lon(725.0) - 5.0).abs() < 1e-12);
    }

    proptest::proptest! {
        #[test]
        fn prop_projector_round_trip(dlon in -3.0f64..3.0, dlat in -3.0f64..3.0) {
            let proj = Projector::new(150.0, 25.0);
            let (x, y) = proj.project(150.0 + dlon, 25.0 + dlat);
            let (lon, lat) = proj.unproject(x, y);
            proptest::prop_assert!(angsep(150.0 + dlon, 25.0 + dlat, lon, lat) < 1e-8);
        }
    }
}
