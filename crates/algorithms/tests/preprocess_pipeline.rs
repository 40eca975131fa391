//! End-to-end tests of the preprocessing pipeline at the default 256x256
//! image size, across every observation shape.

use ndarray::{Array2, Array3, ArrayD, Axis, IxDyn};

use canopy_algorithms::features::{
    parse_observation, BandSource, FeatureBundle, FeatureExtractor, PreprocessorConfig,
    SatelliteObservation,
};
use canopy_algorithms::imagery::{ndvi, normalize, DEFAULT_EPSILON};
use canopy_core::raster::Raster;

const SIZE: usize = 256;

fn constant(value: f64) -> Raster<f64> {
    Raster::filled(SIZE, SIZE, value)
}

fn seeded() -> FeatureExtractor {
    FeatureExtractor::new(PreprocessorConfig::default().with_seed(2024))
}

fn assert_unit_range(name: &str, band: &Raster<f32>) {
    for &v in band.iter() {
        assert!(
            v.is_nan() || (0.0..=1.0).contains(&v),
            "{} value out of [0, 1]: {}",
            name,
            v
        );
    }
}

fn assert_configured_shape(bundle: &FeatureBundle) {
    assert_eq!(bundle.ndvi.shape(), (SIZE, SIZE));
    assert_eq!(bundle.nir.shape(), (SIZE, SIZE));
    assert_eq!(bundle.red.shape(), (SIZE, SIZE));
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn constant_bands_end_to_end() {
    let obs = SatelliteObservation::from_bands(Some(constant(300.0)), Some(constant(100.0)));
    let bundle = FeatureExtractor::default().extract_features(&obs).unwrap();

    assert_configured_shape(&bundle);
    assert_eq!(bundle.ndvi_mean, 0.5);
    for layer in [&bundle.ndvi, &bundle.nir, &bundle.red] {
        assert!(layer.iter().all(|&v| v == 0.0), "Constant layers normalize to zero");
    }
}

#[test]
fn no_data_default() {
    let bundle = FeatureExtractor::default()
        .extract_features(&SatelliteObservation::NoData)
        .unwrap();

    assert_configured_shape(&bundle);
    assert_eq!(bundle.ndvi_mean, 0.0);
    for layer in [&bundle.ndvi, &bundle.nir, &bundle.red] {
        assert!(layer.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn missing_bands_fallback() {
    let obs = SatelliteObservation::Structured(Default::default());
    let report = FeatureExtractor::default().extract_report(&obs).unwrap();

    assert_configured_shape(&report.bundle);
    assert_eq!(report.nir_source, BandSource::Synthetic);
    assert_eq!(report.red_source, BandSource::Synthetic);
    assert!(report.bundle.ndvi_mean.is_finite());
    assert_unit_range("ndvi", &report.bundle.ndvi);
    assert_unit_range("nir", &report.bundle.nir);
    assert_unit_range("red", &report.bundle.red);
}

#[test]
fn shape_preserved_for_every_input_kind() {
    let mut stack = Array3::<f64>::zeros((SIZE, SIZE, 6));
    stack.index_axis_mut(Axis(2), 0).fill(40.0);
    stack.index_axis_mut(Axis(2), 3).fill(160.0);

    let inputs = vec![
        SatelliteObservation::NoData,
        SatelliteObservation::from_bands(Some(constant(10.0)), None),
        SatelliteObservation::Stacked(stack),
        SatelliteObservation::from(Array2::<f64>::ones((SIZE, SIZE))),
        SatelliteObservation::Unbanded(ArrayD::zeros(IxDyn(&[3, 3, 3, 3]))),
        SatelliteObservation::Stacked(Array3::zeros((16, 16, 6))),
    ];

    let extractor = seeded();
    for obs in &inputs {
        let bundle = extractor.extract_features(obs).unwrap();
        assert_configured_shape(&bundle);
    }
}

#[test]
fn stacked_observation_uses_canonical_indices() {
    let mut stack = Array3::<f64>::zeros((SIZE, SIZE, 6));
    stack.index_axis_mut(Axis(2), 0).fill(50.0);
    stack.index_axis_mut(Axis(2), 1).fill(9999.0);
    stack.index_axis_mut(Axis(2), 3).fill(200.0);

    let bundle = FeatureExtractor::default()
        .extract_features(&SatelliteObservation::Stacked(stack))
        .unwrap();

    assert!((bundle.ndvi_mean - 0.6).abs() < 1e-6, "got {}", bundle.ndvi_mean);
}

#[test]
fn zero_denominator_pixels_are_zero() {
    let mut nir = constant(200.0);
    let mut red = constant(50.0);
    nir.set(10, 10, 0.0).unwrap();
    red.set(10, 10, 0.0).unwrap();

    let raw = ndvi(&nir.cast::<f32>().unwrap(), &red.cast::<f32>().unwrap()).unwrap();
    assert_eq!(raw.get(10, 10).unwrap(), 0.0);
    assert!(raw.iter().all(|v| v.is_finite()));

    let obs = SatelliteObservation::from_bands(Some(nir), Some(red));
    let bundle = FeatureExtractor::default().extract_features(&obs).unwrap();
    assert!(bundle.ndvi.iter().all(|v| v.is_finite()));
    assert_eq!(bundle.ndvi.get(10, 10).unwrap(), 0.0);
    assert!(bundle.ndvi.get(0, 0).unwrap() > 0.99);
}

#[test]
fn nan_pixels_are_excluded_from_mean() {
    let mut nir = constant(300.0);
    for col in 0..SIZE {
        nir.set(0, col, f64::NAN).unwrap();
    }
    nir.set(1, 0, 900.0).unwrap();
    let obs = SatelliteObservation::from_bands(Some(nir), Some(constant(100.0)));

    let report = FeatureExtractor::default().extract_report(&obs).unwrap();
    let valid = SIZE * SIZE - SIZE;
    let expected = (0.5 * (valid - 1) as f64 + 0.8) / valid as f64;

    assert_eq!(report.ndvi_stats.valid_pixels, valid);
    assert!((report.bundle.ndvi_mean - expected).abs() < 1e-6);
    assert!(report.bundle.ndvi.get(0, 5).unwrap().is_nan());
}

#[test]
fn all_nan_input_gives_nan_mean() {
    let obs = SatelliteObservation::from_bands(Some(constant(f64::NAN)), Some(constant(100.0)));
    let bundle = FeatureExtractor::default().extract_features(&obs).unwrap();

    assert!(bundle.ndvi_mean.is_nan());
    assert_configured_shape(&bundle);
}

#[test]
fn seeded_synthetic_bands_are_reproducible() {
    let obs = SatelliteObservation::NoData;
    let unbanded = SatelliteObservation::from(Array2::<f64>::zeros((2, 2)));

    let a = seeded().extract_features(&unbanded).unwrap();
    let b = seeded().extract_features(&unbanded).unwrap();
    assert_eq!(a, b);

    // No-data never draws random numbers
    assert_eq!(
        seeded().extract_features(&obs).unwrap(),
        FeatureBundle::zeros(SIZE, SIZE).unwrap()
    );
}

#[test]
fn concurrent_calls_share_one_extractor() {
    let extractor = seeded();
    let obs = SatelliteObservation::from_bands(Some(constant(300.0)), Some(constant(100.0)));

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| extractor.preprocess(&obs).unwrap().ndvi_mean))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 0.5);
        }
    });
}

#[test]
fn region_sized_config() {
    let config = PreprocessorConfig::for_region_km(50.0).unwrap().with_seed(1);
    let bundle = FeatureExtractor::new(config)
        .extract_features(&SatelliteObservation::NoData)
        .unwrap();
    assert_eq!(bundle.shape(), (356, 356));
}

// ---------------------------------------------------------------------------
// JSON round trip through the collaborator payload format
// ---------------------------------------------------------------------------

#[test]
fn flat_json_payload_to_bundle_json() {
    let config = PreprocessorConfig::new(2, 2).unwrap();
    let json = r#"{"nirBand": [200, 200, 0, 300], "redBand": [50, 50, 0, 100]}"#;

    let obs = parse_observation(json, &config).unwrap();
    let bundle = FeatureExtractor::new(config).extract_features(&obs).unwrap();

    // raw NDVI: 0.6, 0.6, 0.0, 0.5
    assert!((bundle.ndvi_mean - 1.7 / 4.0).abs() < 1e-6);

    let value: serde_json::Value = serde_json::to_value(&bundle).unwrap();
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys.len(), 4);
    for key in ["ndvi", "nir", "red", "ndvi_mean"] {
        assert!(keys.contains(&key), "missing key {}", key);
    }
    assert_eq!(value["ndvi"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Normalizer properties at scale
// ---------------------------------------------------------------------------

#[test]
fn normalizer_invariants_on_large_bands() {
    let mut ramp: Raster<f32> = Raster::new(SIZE, SIZE);
    for row in 0..SIZE {
        for col in 0..SIZE {
            ramp.set(row, col, ((row * 31 + col * 17) % 4096) as f32 - 1000.0)
                .unwrap();
        }
    }
    let normalized = normalize(&ramp);
    assert_unit_range("ramp", &normalized);

    for c in [-250.0f32, 0.0, 3.0e4] {
        let flat = normalize(&Raster::filled(SIZE, SIZE, c));
        assert!(flat.iter().all(|v| f64::from(v.abs()) <= DEFAULT_EPSILON));
    }
}
