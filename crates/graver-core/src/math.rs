//! Shared angle and tolerance helpers.

/// Compares two floats within a numerical precision of `ulp` units in the
/// last place, scaled to the magnitude of the compared values.
pub fn almost_equal(x: f64, y: f64, ulp: i32) -> bool {
    (x - y).abs() <= f64::EPSILON * (x + y).abs() * ulp as f64 * 1e2
        || (x - y).abs() < f64::MIN_POSITIVE
}

/// Normalizes an angle in degrees to the interval [-180, 180).
pub fn angle_norm(x: f64) -> f64 {
    let mut x = (x + 180.0) % 360.0;
    if x < 0.0 {
        x += 360.0;
    }
    x - 180.0
}

/// Normalizes an angle in radians to the interval [-pi, pi).
pub fn angle_norm_rad(x: f64) -> f64 {
    let mut x = (x + std::f64::consts::PI) % std::f64::consts::TAU;
    if x < 0.0 {
        x += std::f64::consts::TAU;
    }
    x - std::f64::consts::PI
}

/// Sign of a value, with sgn(0) = 1.
pub fn sgn(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_almost_equal() {
        assert!(almost_equal(1.0, 1.0, 6));
        assert!(almost_equal(1.0, 1.0 + 1e-14, 6));
        assert!(!almost_equal(1.0, 1.0 + 1e-9, 6));
        assert!(almost_equal(0.0, 0.0, 6));
        assert!(almost_equal(1e-320, 2e-320, 6));
    }

    #[test]
    fn test_angle_norm() {
        assert_eq!(angle_norm(0.0), 0.0);
        assert_eq!(angle_norm(180.0), -180.0);
        assert_eq!(angle_norm(-180.0), -180.0);
        assert_eq!(angle_norm(190.0), -170.0);
        assert_eq!(angle_norm(-190.0), 170.0);
        assert_eq!(angle_norm(720.0), 0.0);
        assert_eq!(angle_norm(365.0), 5.0);
    }

    #[test]
    fn test_angle_norm_rad() {
        use std::f64::consts::PI;
        assert!((angle_norm_rad(3.0 * PI) - (-PI)).abs() < 1e-12);
        assert!((angle_norm_rad(PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((angle_norm_rad(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sgn() {
        assert_eq!(sgn(3.0), 1.0);
        assert_eq!(sgn(-2.5), -1.0);
        assert_eq!(sgn(0.0), 1.0);
    }
}
