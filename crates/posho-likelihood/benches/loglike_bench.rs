// Benchmarks for likelihood evaluation
// Measures single evaluations and full richness fits on a synthetic field

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use posho_likelihood::{
    Isochrone, IsochronePoint, Kernel, LikelihoodParams, LogLikelihood,
};
use posho_observation::{Catalog, CatalogObject, Mask, Roi, RoiParams};
use posho_sky::projector::Projector;

const LON0: f64 = 45.0;
const LAT0: f64 = 30.0;

fn synthetic_loglike() -> LogLikelihood {
    let params = RoiParams {
        nside_pixel: 256,
        radius: 3.0,
        radius_interior: 1.0,
        radius_annulus_inner: 1.5,
        mag_step: 0.5,
        color_step: 0.25,
        ..Default::default()
    };
    let roi = Roi::new(LON0, LAT0, &params).unwrap();
    let mask = Mask::uniform(&roi, 23.5, 23.5);

    let projector = Projector::new(LON0, LAT0);
    let mut rng = StdRng::seed_from_u64(7);
    let mut objects = Vec::new();
    while objects.len() < 3000 {
        let x: f64 = rng.random_range(-3.0..3.0);
        let y: f64 = rng.random_range(-3.0..3.0);
        if (x * x + y * y).sqrt() > 3.0 {
            continue;
        }
        let (lon, lat) = projector.unproject(x, y);
        let mag_1 = rng.random_range(16.5..23.4);
        let color = rng.random_range(-0.45..0.95);
        objects.push(CatalogObject {
            objid: objects.len() as u64,
            lon,
            lat,
            mag_1,
            mag_err_1: 0.05,
            mag_2: mag_1 - color,
            mag_err_2: 0.05,
        });
    }

    let isochrone = Isochrone::new(
        vec![
            IsochronePoint {
                mass_init: 0.2,
                mag_1: 9.0,
                mag_2: 8.4,
            },
            IsochronePoint {
                mass_init: 0.5,
                mag_1: 7.0,
                mag_2: 6.6,
            },
            IsochronePoint {
                mass_init: 0.8,
                mag_1: 5.0,
                mag_2: 4.8,
            },
        ],
        17.0,
    )
    .unwrap();
    let kernel = Kernel::plummer(LON0, LAT0, 0.3).unwrap();

    LogLikelihood::new(
        LikelihoodParams {
            delta_mag: 0.1,
            band_1_detection: true,
            mass_steps: 1000,
        },
        roi,
        mask,
        Catalog::from_objects(objects),
        isochrone,
        kernel,
    )
    .unwrap()
}

fn bench_value_richness_only(c: &mut Criterion) {
    let mut loglike = synthetic_loglike();
    loglike.value(&[("richness", 100.0)]).unwrap();

    c.bench_function("value_richness_only", |b| {
        let mut rho = 0.0;
        b.iter(|| {
            rho += 1.0;
            loglike.value(black_box(&[("richness", rho)])).unwrap()
        })
    });
}

fn bench_value_with_spatial_resync(c: &mut Criterion) {
    let mut loglike = synthetic_loglike();
    loglike.value(&[("richness", 100.0)]).unwrap();

    c.bench_function("value_spatial_resync", |b| {
        let mut offset = 0.0;
        b.iter(|| {
            offset = (offset + 0.01) % 0.2;
            loglike
                .value(black_box(&[("lon", LON0 + offset), ("lat", LAT0)]))
                .unwrap()
        })
    });
}

fn bench_fit_richness(c: &mut Criterion) {
    let mut loglike = synthetic_loglike();

    c.bench_function("fit_richness", |b| {
        b.iter(|| loglike.fit_richness(black_box(1e-3), 50).unwrap())
    });
}

criterion_group!(
    benches,
    bench_value_richness_only,
    bench_value_with_spatial_resync,
    bench_fit_richness
);
criterion_main!(benches);
