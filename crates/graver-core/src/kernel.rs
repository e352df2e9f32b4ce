//! Interop with the planar-geometry kernel.
//!
//! Conversions between paths (in the cartesian frame) and `geo` primitives,
//! plus polyline offsetting through `cavalier_contours`. The kernel is
//! stateless, so everything here is a plain function.

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use tracing::trace;

use crate::point::Point;

/// Maximum angular step when flattening offset arcs, in radians.
const ARC_FLATTEN_STEP: f64 = std::f64::consts::PI / 32.0;

/// Duplicate-vertex tolerance when preparing rings for offsetting.
const DEDUP_TOL: f64 = 1e-9;

/// Cartesian projection of a point sequence: (x, y, z) with the c rotation
/// applied.
pub(crate) fn cartesian_coords(points: &[Point]) -> Vec<[f64; 3]> {
    points
        .iter()
        .map(|p| {
            let q = p.to_cartesian();
            [q.x, q.y, q.z]
        })
        .collect()
}

/// Open line string from cartesian coordinates (z dropped).
pub(crate) fn line_string(coords: &[[f64; 3]]) -> LineString<f64> {
    LineString::from(
        coords
            .iter()
            .map(|c| Coord { x: c[0], y: c[1] })
            .collect::<Vec<_>>(),
    )
}

/// Polygon from a contour and holes, all given as cartesian coordinate
/// sequences. `geo` closes rings implicitly.
pub(crate) fn polygon(contour: &[[f64; 3]], holes: &[Vec<[f64; 3]>]) -> Polygon<f64> {
    Polygon::new(
        line_string(contour),
        holes.iter().map(|h| line_string(h)).collect(),
    )
}

/// Union of a set of polygons, merged pairwise.
pub(crate) fn union_all(polygons: &[Polygon<f64>]) -> MultiPolygon<f64> {
    let mut merged = MultiPolygon::new(vec![]);
    for poly in polygons {
        let mp = MultiPolygon::new(vec![poly.clone()]);
        merged = if merged.0.is_empty() {
            mp
        } else {
            merged.union(&mp)
        };
    }
    merged
}

/// 2D length of a cartesian polyline.
pub(crate) fn length_2d(coords: &[[f64; 3]]) -> f64 {
    coords
        .windows(2)
        .map(|w| ((w[1][0] - w[0][0]).powi(2) + (w[1][1] - w[0][1]).powi(2)).sqrt())
        .sum()
}

/// Extracts the point at a given 2D arc-length position along a cartesian
/// polyline, interpolating z linearly. Positions beyond the ends clamp.
pub(crate) fn extract_point(coords: &[[f64; 3]], distance: f64) -> [f64; 3] {
    if coords.is_empty() {
        return [0.0, 0.0, 0.0];
    }
    if distance <= 0.0 {
        return coords[0];
    }
    let mut travelled = 0.0;
    for w in coords.windows(2) {
        let seg = ((w[1][0] - w[0][0]).powi(2) + (w[1][1] - w[0][1]).powi(2)).sqrt();
        if travelled + seg >= distance && seg > 0.0 {
            let f = (distance - travelled) / seg;
            return [
                w[0][0] + f * (w[1][0] - w[0][0]),
                w[0][1] + f * (w[1][1] - w[0][1]),
                w[0][2] + f * (w[1][2] - w[0][2]),
            ];
        }
        travelled += seg;
    }
    *coords.last().unwrap_or(&[0.0, 0.0, 0.0])
}

/// Prepares a closed ring for offsetting: removes duplicate and closing
/// vertices, enforces clockwise orientation.
fn prepare_ring(coords: &[[f64; 3]]) -> Polyline<f64> {
    let mut clean: Vec<[f64; 2]> = Vec::with_capacity(coords.len());
    for c in coords {
        if let Some(last) = clean.last() {
            let d = ((c[0] - last[0]).powi(2) + (c[1] - last[1]).powi(2)).sqrt();
            if d <= DEDUP_TOL {
                continue;
            }
        }
        clean.push([c[0], c[1]]);
    }
    if clean.len() > 1 {
        let d = ((clean[0][0] - clean[clean.len() - 1][0]).powi(2)
            + (clean[0][1] - clean[clean.len() - 1][1]).powi(2))
        .sqrt();
        if d <= DEDUP_TOL {
            clean.pop();
        }
    }
    let mut signed_area = 0.0;
    for i in 0..clean.len() {
        let p1 = clean[i];
        let p2 = clean[(i + 1) % clean.len()];
        signed_area += p1[0] * p2[1] - p2[0] * p1[1];
    }
    if signed_area > 0.0 {
        clean.reverse();
    }
    let mut polyline = Polyline::new();
    for p in clean {
        polyline.add_vertex(PlineVertex::new(p[0], p[1], 0.0));
    }
    polyline.set_is_closed(true);
    polyline
}

/// Flattens a possibly arc-carrying polyline into a closed coordinate ring.
fn flatten_polyline(polyline: &Polyline<f64>) -> Vec<[f64; 2]> {
    let n = polyline.vertex_count();
    let mut out: Vec<[f64; 2]> = Vec::with_capacity(n + 1);
    for i in 0..n {
        let v0 = polyline.at(i);
        let v1 = polyline.at((i + 1) % n);
        out.push([v0.x, v0.y]);
        if v0.bulge.abs() > 1e-12 {
            // bulge encodes the arc: sweep angle is 4*atan(bulge)
            let sweep = 4.0 * v0.bulge.atan();
            let chord = ((v1.x - v0.x).powi(2) + (v1.y - v0.y).powi(2)).sqrt();
            if chord > 0.0 {
                let radius = chord / (2.0 * (sweep / 2.0).sin().abs());
                let mx = (v0.x + v1.x) / 2.0;
                let my = (v0.y + v1.y) / 2.0;
                // centre sits along the chord normal
                let h = radius * (sweep / 2.0).cos() * sweep.signum();
                let nx = -(v1.y - v0.y) / chord;
                let ny = (v1.x - v0.x) / chord;
                let cx = mx - h * nx;
                let cy = my - h * ny;
                let a0 = (v0.y - cy).atan2(v0.x - cx);
                let steps = (sweep.abs() / ARC_FLATTEN_STEP).ceil() as usize;
                for s in 1..steps {
                    let a = a0 + sweep * s as f64 / steps as f64;
                    out.push([cx + radius * a.cos(), cy + radius * a.sin()]);
                }
            }
        }
    }
    if let Some(first) = out.first().copied() {
        out.push(first);
    }
    out
}

/// Offsets a closed cartesian ring. Positive amounts offset outward,
/// negative inward; an empty result means the ring vanished.
pub(crate) fn offset_ring(coords: &[[f64; 3]], amount: f64) -> Vec<Vec<[f64; 2]>> {
    let polyline = prepare_ring(coords);
    if polyline.vertex_count() < 3 {
        return vec![];
    }
    // ring is clockwise: a positive parallel offset moves outward
    let offsets = polyline.parallel_offset(amount);
    trace!(loops = offsets.len(), amount, "offset ring");
    offsets.iter().map(flatten_polyline).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [side, 0.0, 0.0],
            [side, side, 0.0],
            [0.0, side, 0.0],
            [0.0, 0.0, 0.0],
        ]
    }

    #[test]
    fn test_length_2d() {
        assert!((length_2d(&square(2.0)) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_extract_point() {
        let coords = vec![[0.0, 0.0, 0.0], [10.0, 0.0, 5.0]];
        let p = extract_point(&coords, 4.0);
        assert!((p[0] - 4.0).abs() < 1e-12);
        assert!(p[1].abs() < 1e-12);
        assert!((p[2] - 2.0).abs() < 1e-12);
        // clamps at the end
        let q = extract_point(&coords, 100.0);
        assert_eq!(q, [10.0, 0.0, 5.0]);
    }

    #[test]
    fn test_offset_ring_inward() {
        let loops = offset_ring(&square(10.0), -2.0);
        assert_eq!(loops.len(), 1);
        for p in &loops[0] {
            assert!(p[0] > 1.9 && p[0] < 8.1);
            assert!(p[1] > 1.9 && p[1] < 8.1);
        }
        // too large a reduction collapses the ring
        assert!(offset_ring(&square(10.0), -6.0).is_empty());
    }

    #[test]
    fn test_offset_ring_outward() {
        let loops = offset_ring(&square(10.0), 2.0);
        assert_eq!(loops.len(), 1);
        let xs: Vec<f64> = loops[0].iter().map(|p| p[0]).collect();
        let min = xs.iter().cloned().fold(f64::MAX, f64::min);
        let max = xs.iter().cloned().fold(f64::MIN, f64::max);
        assert!(min < -1.9);
        assert!(max > 11.9);
    }
}
