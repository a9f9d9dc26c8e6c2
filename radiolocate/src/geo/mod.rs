//! Geographic estimate math.
//!
//! Provides the confidence-weighted merge that every layer of the engine
//! uses to combine two location estimates, plus a haversine helper for
//! distance checks.

mod types;

pub use types::{
    FusionConfig, InvalidEstimate, LocationEstimate, DEFAULT_ACCURACY_FLOOR_M,
    DEFAULT_SHRINK_FACTOR, MIN_ACCURACY_M,
};

use std::f64::consts::PI;

/// Mean Earth radius in metres (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Merge two location estimates into one, weighted by confidence.
///
/// The merged centre is the weight-proportional average of the two input
/// centres, so it always lies on the segment between them and closer to
/// the tighter estimate. Weights sum, and the merged radius is
///
/// ```text
/// clamp(1 / (wa + wb), lower = max(min(ra, rb) * shrink, floor), upper = min(ra, rb))
/// ```
///
/// which never exceeds `max(ra, rb)` and monotonically tightens towards
/// the configured floor over repeated consistent merges.
///
/// Because the centre and the weight are plain weighted sums, folding a
/// set of estimates with `fuse` is order-independent. With the default
/// `shrink_factor` of 0.5 the tightening limit can never exceed the
/// harmonic radius `1 / (wa + wb)`, so the radius is a pure function of
/// the summed weight and the fold is associative to f64 precision;
/// larger shrink factors trade that exactness for slower convergence.
pub fn fuse(a: &LocationEstimate, b: &LocationEstimate, config: &FusionConfig) -> LocationEstimate {
    let weight = a.weight + b.weight;
    let latitude = (a.latitude * a.weight + b.latitude * b.weight) / weight;
    let longitude = (a.longitude * a.weight + b.longitude * b.weight) / weight;

    let min_radius = a.accuracy_m.min(b.accuracy_m);
    let accuracy_m = (1.0 / weight)
        .max(min_radius * config.shrink_factor)
        .max(config.accuracy_floor_m)
        .min(min_radius);

    LocationEstimate {
        latitude,
        longitude,
        accuracy_m,
        timestamp: a.timestamp.max(b.timestamp),
        weight,
    }
}

/// Fold a set of estimates into one with [`fuse`].
///
/// Returns `None` for an empty input.
pub fn fuse_all<'a, I>(estimates: I, config: &FusionConfig) -> Option<LocationEstimate>
where
    I: IntoIterator<Item = &'a LocationEstimate>,
{
    estimates.into_iter().fold(None, |acc, next| match acc {
        Some(current) => Some(fuse(&current, next, config)),
        None => Some(*next),
    })
}

/// Great-circle distance between two points in metres.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let to_rad = PI / 180.0;
    let dlat = (lat2 - lat1) * to_rad;
    let dlon = (lon2 - lon1) * to_rad;

    let a = (dlat / 2.0).sin().powi(2)
        + (lat1 * to_rad).cos() * (lat2 * to_rad).cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(lat: f64, lon: f64, accuracy: f64, secs: i64) -> LocationEstimate {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        LocationEstimate::new(lat, lon, accuracy, ts)
    }

    #[test]
    fn test_fresh_estimate_weight_is_inverse_accuracy() {
        let est = at(52.0, 13.0, 50.0, 0);
        assert!((est.weight - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_negative_accuracy_is_clamped() {
        let est = at(52.0, 13.0, -5.0, 0);
        assert_eq!(est.accuracy_m, 0.0);
        assert!(est.weight.is_finite());
    }

    #[test]
    fn test_fuse_never_exceeds_larger_radius() {
        let config = FusionConfig::default();
        let a = at(52.0, 13.0, 50.0, 0);
        let b = at(52.001, 13.001, 200.0, 1);

        let fused = fuse(&a, &b, &config);
        assert!(fused.accuracy_m <= a.accuracy_m.max(b.accuracy_m));
    }

    #[test]
    fn test_fuse_centre_is_convex_combination() {
        let config = FusionConfig::default();
        let a = at(52.0, 13.0, 50.0, 0);
        let b = at(52.0002, 13.0001, 30.0, 1);

        let fused = fuse(&a, &b, &config);
        assert!(fused.latitude >= a.latitude && fused.latitude <= b.latitude);
        assert!(fused.longitude >= a.longitude && fused.longitude <= b.longitude);
    }

    #[test]
    fn test_fuse_tighter_estimate_dominates_centre() {
        // The scenario from the provider's acceptance checks: a 50m fix
        // followed by a 30m fix a few metres away.
        let config = FusionConfig::default();
        let a = at(52.0, 13.0, 50.0, 0);
        let b = at(52.0002, 13.0001, 30.0, 1);

        let fused = fuse(&a, &b, &config);
        assert!(fused.accuracy_m <= 30.0);

        let to_a = haversine_m(fused.latitude, fused.longitude, a.latitude, a.longitude);
        let to_b = haversine_m(fused.latitude, fused.longitude, b.latitude, b.longitude);
        assert!(
            to_b < to_a,
            "fused centre should sit closer to the 30m input: {to_b} vs {to_a}"
        );
    }

    #[test]
    fn test_fuse_keeps_latest_timestamp() {
        let config = FusionConfig::default();
        let a = at(52.0, 13.0, 50.0, 10);
        let b = at(52.0, 13.0, 50.0, 5);

        let fused = fuse(&a, &b, &config);
        assert_eq!(fused.timestamp, a.timestamp);
    }

    #[test]
    fn test_repeated_fusion_tightens_to_floor_and_holds() {
        let config = FusionConfig::default();
        let mut current = at(52.0, 13.0, 40.0, 0);
        let mut previous_radius = current.accuracy_m;

        for i in 1..50 {
            let reading = at(52.0, 13.0, 40.0, i);
            current = fuse(&current, &reading, &config);
            assert!(
                current.accuracy_m <= previous_radius,
                "radius must never grow: {} -> {}",
                previous_radius,
                current.accuracy_m
            );
            assert!(current.accuracy_m >= config.accuracy_floor_m);
            previous_radius = current.accuracy_m;
        }
        assert_eq!(current.accuracy_m, config.accuracy_floor_m);
    }

    #[test]
    fn test_fuse_respects_input_tighter_than_floor() {
        // If a reading is already tighter than the floor the merge must
        // not widen it back out.
        let config = FusionConfig::default();
        let a = at(52.0, 13.0, 5.0, 0);
        let b = at(52.0, 13.0, 50.0, 1);

        let fused = fuse(&a, &b, &config);
        assert!(fused.accuracy_m <= 5.0);
    }

    #[test]
    fn test_fuse_all_empty_is_none() {
        let config = FusionConfig::default();
        assert!(fuse_all(std::iter::empty::<&LocationEstimate>(), &config).is_none());
    }

    #[test]
    fn test_fuse_all_single_is_identity() {
        let config = FusionConfig::default();
        let a = at(52.0, 13.0, 50.0, 0);
        let fused = fuse_all([a].iter(), &config).unwrap();
        assert_eq!(fused, a);
    }

    #[test]
    fn test_deserialize_accepts_serialized_estimate() {
        let est = at(52.0, 13.0, 50.0, 0);
        let json = serde_json::to_string(&est).unwrap();
        let parsed: LocationEstimate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, est);
    }

    #[test]
    fn test_deserialize_rejects_negative_accuracy() {
        let json = r#"{"latitude":52.0,"longitude":13.0,"accuracy_m":-5.0,
            "timestamp":"2024-01-01T00:00:00Z","weight":0.02}"#;
        let err = serde_json::from_str::<LocationEstimate>(json).unwrap_err();
        assert!(err.to_string().contains("accuracy"), "unexpected error: {err}");
    }

    #[test]
    fn test_deserialize_rejects_non_positive_weight() {
        for weight in ["0.0", "-1.0"] {
            let json = format!(
                r#"{{"latitude":52.0,"longitude":13.0,"accuracy_m":50.0,
                    "timestamp":"2024-01-01T00:00:00Z","weight":{weight}}}"#
            );
            let err = serde_json::from_str::<LocationEstimate>(&json).unwrap_err();
            assert!(err.to_string().contains("weight"), "unexpected error: {err}");
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Berlin Alexanderplatz to Brandenburg Gate, roughly 2.2km.
        let d = haversine_m(52.5219, 13.4132, 52.5163, 13.3777);
        assert!((2000.0..2600.0).contains(&d), "unexpected distance {d}");
    }

    #[test]
    fn test_haversine_zero_for_identical_points() {
        assert_eq!(haversine_m(52.0, 13.0, 52.0, 13.0), 0.0);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_estimate() -> impl Strategy<Value = LocationEstimate> {
            (
                -85.0..85.0_f64,
                -180.0..180.0_f64,
                10.0..5_000.0_f64,
                0i64..1_000_000,
            )
                .prop_map(|(lat, lon, acc, secs)| at(lat, lon, acc, secs))
        }

        proptest! {
            #[test]
            fn test_merge_monotonicity(a in arb_estimate(), b in arb_estimate()) {
                let config = FusionConfig::default();
                let fused = fuse(&a, &b, &config);
                prop_assert!(fused.accuracy_m <= a.accuracy_m.max(b.accuracy_m));
                prop_assert!(fused.accuracy_m >= 0.0);
            }

            #[test]
            fn test_merge_convexity(a in arb_estimate(), b in arb_estimate()) {
                let config = FusionConfig::default();
                let fused = fuse(&a, &b, &config);
                prop_assert!(fused.latitude >= a.latitude.min(b.latitude));
                prop_assert!(fused.latitude <= a.latitude.max(b.latitude));
                prop_assert!(fused.longitude >= a.longitude.min(b.longitude));
                prop_assert!(fused.longitude <= a.longitude.max(b.longitude));
            }

            #[test]
            fn test_merge_order_independence(
                a in arb_estimate(),
                b in arb_estimate(),
                c in arb_estimate()
            ) {
                let config = FusionConfig::default();
                let ab_c = fuse(&fuse(&a, &b, &config), &c, &config);
                let ac_b = fuse(&fuse(&a, &c, &config), &b, &config);
                let bc_a = fuse(&fuse(&b, &c, &config), &a, &config);

                for (x, y) in [(&ab_c, &ac_b), (&ab_c, &bc_a)] {
                    prop_assert!((x.latitude - y.latitude).abs() < 1e-9,
                        "latitude diverged: {} vs {}", x.latitude, y.latitude);
                    prop_assert!((x.longitude - y.longitude).abs() < 1e-9,
                        "longitude diverged: {} vs {}", x.longitude, y.longitude);
                    prop_assert!((x.accuracy_m - y.accuracy_m).abs() < 1e-6,
                        "radius diverged: {} vs {}", x.accuracy_m, y.accuracy_m);
                }
            }
        }
    }
}
