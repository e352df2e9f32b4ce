//! Elliptic-integral building blocks for arc-length computations.
//!
//! The Carlson symmetric integrals follow the duplication algorithms from
//! B.C. Carlson and E.M. Notis, "Algorithms for Incomplete Elliptic
//! Integrals", ACM TOMS 7, 3 (1981), pp. 398-403. The inverse uses Newton
//! iteration seeded with the closed-form guess from J.P. Boyd, Appl. Math.
//! Comp. 218 (2012), pp. 7005-7013.
//!
//! All iterative routines are bounded by [`ELLIPTIC_MAX_ITER`] and return
//! their last iterate when the budget runs out. Convergence is best-effort
//! by contract; cap exhaustion logs a warning but is never an error.

use std::f64::consts::{FRAC_PI_2, PI};

use tracing::warn;

use crate::error::{Error, Result};

/// Iteration cap for the Carlson and Newton loops.
pub const ELLIPTIC_MAX_ITER: u32 = 100;

/// Carlson RF duplication loop. Inputs must be non-negative.
fn rf(x: f64, y: f64, z: f64, errtol: f64) -> f64 {
    let mut xn = x;
    let mut yn = y.max(f64::MIN_POSITIVE);
    let mut zn = z;
    let mut mu;
    let (mut xndev, mut yndev, mut zndev);

    let mut iter = ELLIPTIC_MAX_ITER;
    loop {
        mu = (xn + yn + zn) / 3.0;
        xndev = 2.0 - (mu + xn) / mu;
        yndev = 2.0 - (mu + yn) / mu;
        zndev = 2.0 - (mu + zn) / mu;
        let eps = xndev.abs().max(yndev.abs()).max(zndev.abs());
        if eps < errtol {
            break;
        }
        let xnroot = xn.sqrt();
        let ynroot = yn.sqrt();
        let znroot = zn.sqrt();
        let lambda = xnroot * (ynroot + znroot) + ynroot * znroot;
        xn = (xn + lambda) / 4.0;
        yn = (yn + lambda) / 4.0;
        zn = (zn + lambda) / 4.0;
        iter -= 1;
        if iter == 0 {
            warn!("carlson_rf: iteration cap reached, returning last iterate");
            break;
        }
    }

    let e1 = xndev * yndev;
    let e2 = e1 - zndev * zndev;
    let e3 = e1 * zndev;
    let s = 1.0 + (e2 / 24.0 - 0.1 - 3.0 * e3 / 44.0) * e2 + e3 / 14.0;
    s / mu.sqrt()
}

/// Carlson RD duplication loop. Inputs must be non-negative.
fn rd(x: f64, y: f64, z: f64, errtol: f64) -> f64 {
    let mut xn = x;
    let mut yn = y.max(f64::EPSILON);
    let mut zn = z;
    let mut pow4 = 1.0;
    let mut sigma = 0.0;
    let mut mu;
    let (mut xndev, mut yndev, mut zndev);

    let mut iter = ELLIPTIC_MAX_ITER;
    loop {
        mu = (xn + yn + 3.0 * zn) / 5.0;
        xndev = (mu - xn) / mu;
        yndev = (mu - yn) / mu;
        zndev = (mu - zn) / mu;
        let eps = xndev.abs().max(yndev.abs()).max(zndev.abs());
        if eps < errtol {
            break;
        }
        let xnroot = xn.sqrt();
        let ynroot = yn.sqrt();
        let znroot = zn.sqrt();
        let lambda = xnroot * (ynroot + znroot) + ynroot * znroot;
        sigma += pow4 / (znroot * (zn + lambda));
        pow4 /= 4.0;
        xn = (xn + lambda) / 4.0;
        yn = (yn + lambda) / 4.0;
        zn = (zn + lambda) / 4.0;
        iter -= 1;
        if iter == 0 {
            warn!("carlson_rd: iteration cap reached, returning last iterate");
            break;
        }
    }

    let ea = xndev * yndev;
    let eb = zndev * zndev;
    let ec = ea - eb;
    let ed = ea - 6.0 * eb;
    let ef = ed + ec + ec;
    let s1 = ed * (9.0 / 88.0 * ed - 9.0 / 52.0 * zndev * ef - 3.0 / 14.0);
    let s2 = zndev * (ef / 6.0 + zndev * (zndev * ea * 3.0 / 26.0 - ec * 9.0 / 22.0));
    3.0 * sigma + pow4 * (1.0 + s1 + s2) / (mu * mu.sqrt())
}

/// Computes the Carlson symmetric integral RF(x, y, z).
///
/// All three parameters must be non-negative.
pub fn carlson_rf(x: f64, y: f64, z: f64, errtol: f64) -> Result<f64> {
    if x < 0.0 || y < 0.0 || z < 0.0 {
        return Err(Error::invalid("x, y and z must be non-negative"));
    }
    Ok(rf(x, y, z, errtol))
}

/// Computes the Carlson symmetric integral RD(x, y, z).
///
/// All three parameters must be non-negative.
pub fn carlson_rd(x: f64, y: f64, z: f64, errtol: f64) -> Result<f64> {
    if x < 0.0 || y < 0.0 || z < 0.0 {
        return Err(Error::invalid("x, y and z must be non-negative"));
    }
    Ok(rd(x, y, z, errtol))
}

/// Complete elliptic integral of the second kind E(k), for a modulus
/// k in [0, 1].
pub fn elliptic_e_complete(k: f64, errtol: f64) -> f64 {
    let kk = k * k;
    let y = (1.0 - kk).max(0.0);
    rf(0.0, y, 1.0, errtol) - kk / 3.0 * rd(0.0, y, 1.0, errtol)
}

/// Incomplete elliptic integral of the second kind E(phi, k).
///
/// The Carlson formulation covers phi in [-pi/2, pi/2]; the integrand is
/// periodic, so values beyond are derived by adding whole quarter-period
/// corrections (2*mf*E(k)) with the sign of the residual flipped on odd
/// quarter counts. phi may be any real; k must lie in [0, 1].
pub fn elliptic_e(phi: f64, k: f64, errtol: f64) -> f64 {
    let mf = if phi >= 0.0 {
        ((phi + FRAC_PI_2) / PI) as i64
    } else {
        ((phi - FRAC_PI_2) / PI) as i64
    };
    let c = phi.cos();
    let s = phi.sin();
    let x = c * c;
    let kk = k * k;
    let y = (1.0 - kk * s * s).max(0.0);
    let v = s * (rf(x, y, 1.0, errtol) - kk * s * s / 3.0 * rd(x, y, 1.0, errtol));
    let corr = if mf != 0 {
        2.0 * mf as f64 * elliptic_e_complete(k, errtol)
    } else {
        0.0
    };
    if mf & 1 != 0 {
        corr - v
    } else {
        corr + v
    }
}

/// Inverse of the incomplete elliptic integral of the second kind: finds
/// phi such that E(phi, k) = l.
///
/// Newton iteration from a closed-form seed, capped at
/// [`ELLIPTIC_MAX_ITER`] rounds; the last iterate is returned if the
/// tolerance is not reached.
pub fn inv_elliptic_e(l: f64, k: f64, errtol: f64) -> f64 {
    let e1 = elliptic_e_complete(k, errtol);
    let zeta = 1.0 - l / e1;
    let mu = 1.0 - k;
    let r = (zeta * zeta + mu * mu).sqrt();
    let theta = (mu / (l + f64::EPSILON)).atan();
    let mut res = FRAC_PI_2 + r.sqrt() * (theta - FRAC_PI_2);
    let mut nres;
    let mut iter = ELLIPTIC_MAX_ITER;
    loop {
        let s = res.sin();
        nres = res - (elliptic_e(res, k, errtol) - l) / (1.0 - k * s * s).sqrt();
        if (nres - res).abs() < errtol {
            break;
        }
        res = nres;
        iter -= 1;
        if iter == 0 {
            warn!("inv_elliptic_e: iteration cap reached, returning last iterate");
            break;
        }
    }
    nres
}
