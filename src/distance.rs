/// Map a non-negative distance into `[0, 1)`.
///
/// Uses `d / (d + 1)`: monotone, `0` stays `0`, and every finite distance
/// stays strictly below `1`. An infinite distance maps to exactly `1`.
pub fn normalize(distance: f64) -> f64 {
    debug_assert!(
        distance.is_nan() || distance >= 0.0,
        "distances are non-negative, got {distance}"
    );

    if distance.is_nan() || distance <= 0.0 {
        return 0.0;
    }
    if distance.is_infinite() {
        return 1.0;
    }

    distance / (distance + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stays_zero() {
        assert_eq!(normalize(0.0), 0.0);
    }

    #[test]
    fn known_values() {
        assert!((normalize(1.0) - 0.5).abs() < 1e-12);
        assert!((normalize(4.0) - 0.8).abs() < 1e-12);
        assert!((normalize(9.0) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn monotone_and_bounded() {
        let samples = [0.0, 1e-9, 0.25, 1.0, 3.5, 10.0, 1e3, 1e9];
        for pair in samples.windows(2) {
            assert!(normalize(pair[0]) <= normalize(pair[1]));
        }
        for d in samples {
            assert!(normalize(d) < 1.0);
        }
    }

    #[test]
    fn infinity_maps_to_one() {
        assert_eq!(normalize(f64::INFINITY), 1.0);
    }
}
