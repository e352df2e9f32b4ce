//! Planar surfaces bounded by contour and hole paths.
//!
//! A surface is a set of closed contour paths minus a set of closed hole
//! paths. It backs the area-level reasoning of the toolpath model: merging
//! overlapping outlines, boolean algebra, pocket milling paths and
//! height masking of toolpaths against a stock outline.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{BooleanOps, Contains, Coord, Line, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kernel;
use crate::path::Path;
use crate::pathgroup::PathGroup;
use crate::point::Point;

/// Boolean operation selector for [`Surface::boolean_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Difference,
    SymmetricDifference,
    Intersection,
}

/// A surface delimited by contours and holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    contours: Vec<Path>,
    holes: Vec<Path>,
}

impl Surface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a surface from one contour.
    pub fn from_contour(contour: Path) -> Self {
        Self {
            contours: vec![contour],
            holes: vec![],
        }
    }

    /// Creates a surface from contours and holes. Every hole applies to
    /// every contour.
    pub fn from_paths(contours: Vec<Path>, holes: Vec<Path>) -> Self {
        Self { contours, holes }
    }

    /// Creates a surface from the merged outline of another surface, with
    /// new holes.
    pub fn from_surface(surface: &Surface, holes: Vec<Path>) -> Self {
        let mut contours = Vec::new();
        for s in surface.combine() {
            contours.extend(s.contours.iter().cloned());
        }
        Self { contours, holes }
    }

    /// Creates a surface from the merged outlines of a contour surface and
    /// a hole surface.
    pub fn from_surfaces(surface: &Surface, holes: &Surface) -> Self {
        let mut hole_paths = Vec::new();
        for s in holes.combine() {
            hole_paths.extend(s.contours.iter().cloned());
        }
        Self::from_surface(surface, hole_paths)
    }

    pub fn contours(&self) -> &[Path] {
        &self.contours
    }

    pub fn holes(&self) -> &[Path] {
        &self.holes
    }

    pub fn set_contours(&mut self, contours: Vec<Path>) {
        self.contours = contours;
    }

    pub fn set_holes(&mut self, holes: Vec<Path>) {
        self.holes = holes;
    }

    /// True if any contour, with the holes subtracted, contains the point
    /// (in the cartesian frame).
    pub fn contains(&self, p: &Point) -> bool {
        let cart = p.to_cartesian();
        let point = geo::Point::new(cart.x, cart.y);
        let hole_rings: Vec<Vec<[f64; 3]>> = self
            .holes
            .iter()
            .filter(|h| h.len() > 2)
            .map(|h| h.closed_coords())
            .collect();
        self.contours.iter().any(|bnd| {
            kernel::polygon(&bnd.closed_coords(), &hole_rings).contains(&point)
        })
    }

    /// Merged representation: contour polygons (with holes) unioned into a
    /// multi-polygon. Degenerate contours are skipped.
    fn as_merged(&self) -> MultiPolygon<f64> {
        let hole_rings: Vec<Vec<[f64; 3]>> = self
            .holes
            .iter()
            .filter(|h| h.len() > 2)
            .map(|h| h.closed_coords())
            .collect();
        let polygons: Vec<Polygon<f64>> = self
            .contours
            .iter()
            .filter(|bnd| bnd.len() > 2)
            .map(|bnd| kernel::polygon(&bnd.closed_coords(), &hole_rings))
            .collect();
        kernel::union_all(&polygons)
    }

    /// Merged representation grown by `clearance` (holes shrink).
    fn as_merged_with_clearance(&self, clearance: f64) -> MultiPolygon<f64> {
        let merged = self.as_merged();
        if clearance == 0.0 {
            return merged;
        }
        let mut polygons = Vec::new();
        for poly in &merged {
            let ext: Vec<[f64; 3]> =
                poly.exterior().coords().map(|c| [c.x, c.y, 0.0]).collect();
            for ring in kernel::offset_ring(&ext, clearance) {
                let contour: Vec<[f64; 3]> = ring.iter().map(|c| [c[0], c[1], 0.0]).collect();
                let mut holes = Vec::new();
                for int in poly.interiors() {
                    let hole: Vec<[f64; 3]> = int.coords().map(|c| [c.x, c.y, 0.0]).collect();
                    for hring in kernel::offset_ring(&hole, -clearance) {
                        holes.push(hring.iter().map(|c| [c[0], c[1], 0.0]).collect());
                    }
                }
                polygons.push(kernel::polygon(&contour, &holes));
            }
        }
        kernel::union_all(&polygons)
    }

    /// Decomposes the merged representation into one surface per disjoint
    /// polygon, with overlaps dissolved and hole structure recovered.
    pub fn combine(&self) -> Vec<Surface> {
        let merged = self.as_merged();
        debug!(polygons = merged.0.len(), "combined surface");
        merged.iter().map(surface_from_polygon).collect()
    }

    /// Average of the contour centroids. Holes are ignored.
    pub fn get_centroid(&self) -> Point {
        let n = self.contours.len();
        if n == 0 {
            return Point::default();
        }
        let mut acc = Point::default();
        for p in &self.contours {
            let c = p.get_centroid();
            acc.x += c.x;
            acc.y += c.y;
            acc.z += c.z;
        }
        Point::new(acc.x / n as f64, acc.y / n as f64, acc.z / n as f64, 0.0)
    }

    /// Applies a boolean operation against another surface, one result
    /// surface per disjoint polygon of this surface's merged form.
    pub fn boolean_operation(&self, other: &Surface, op: BooleanOp) -> Vec<Surface> {
        let this_merged = self.as_merged();
        let other_merged = other.as_merged();
        let mut new_surfaces = Vec::new();
        for poly in &this_merged {
            let mp = MultiPolygon::new(vec![poly.clone()]);
            let result = match op {
                BooleanOp::Union => mp.union(&other_merged),
                BooleanOp::Difference => mp.difference(&other_merged),
                BooleanOp::SymmetricDifference => mp.xor(&other_merged),
                BooleanOp::Intersection => mp.intersection(&other_merged),
            };
            for poly_j in &result {
                new_surfaces.push(surface_from_polygon(poly_j));
            }
        }
        new_surfaces
    }

    pub fn union(&self, other: &Surface) -> Vec<Surface> {
        self.boolean_operation(other, BooleanOp::Union)
    }

    pub fn difference(&self, other: &Surface) -> Vec<Surface> {
        self.boolean_operation(other, BooleanOp::Difference)
    }

    pub fn intersection(&self, other: &Surface) -> Vec<Surface> {
        self.boolean_operation(other, BooleanOp::Intersection)
    }

    /// Concentric milling paths covering each contour with a tool of the
    /// given diameter, stepping inward by `increment`. Paths come out
    /// innermost first. A contour too small for any inset but reached by at
    /// least one pass gets a single plunge point at its centroid; a contour
    /// with fewer than 3 points cannot be milled at all.
    pub fn get_milling_paths(&self, tool_size: f64, increment: f64) -> Result<Vec<Path>> {
        if increment <= 0.0 {
            return Err(Error::invalid("increment must be larger than 0"));
        }
        let mut paths = Vec::new();
        for bnd in &self.contours {
            if bnd.len() < 3 {
                return Err(Error::infeasible("contour is not a closed outline"));
            }
            let cartesian = bnd.to_cartesian();
            let mut reduction = tool_size / 2.0;
            loop {
                let new_path = cartesian.buffer(-reduction);
                if new_path.is_empty() {
                    break;
                }
                paths.push(new_path);
                reduction += increment;
            }
            // skip the centroid plunge if the tool never fit at all
            if reduction > tool_size / 2.0 {
                paths.push(Path::from(vec![bnd.get_centroid()]));
            }
        }
        paths.reverse();
        Ok(paths)
    }

    /// The area actually removed by [`Surface::get_milling_paths`] with the
    /// same parameters: each milling loop swept by the tool radius, merged.
    pub fn get_milled_surface(&self, tool_size: f64, increment: f64) -> Result<Vec<Surface>> {
        let paths = self.get_milling_paths(tool_size, increment)?;
        let mut new_paths = Vec::with_capacity(paths.len());
        for p in paths {
            if p.len() >= 4 {
                new_paths.push(p.buffer(tool_size / 2.0));
            }
        }
        Ok(Surface::from_paths(new_paths, vec![]).combine())
    }

    /// Masks toolpaths against this surface grown by `clearance`: points on
    /// the chosen side (outside or inside) are raised to `safe_height`.
    ///
    /// With `fix_contours`, every crossing of a path segment with the
    /// surface boundary is bracketed by interpolated points so the height
    /// change happens at the boundary rather than at the nearest original
    /// point. The bracket points are interpolated in the original
    /// coordinates, c included.
    pub fn correct_height(
        &self,
        paths: &[Path],
        clearance: f64,
        safe_height: f64,
        outside: bool,
        fix_contours: bool,
    ) -> Vec<Path> {
        let merged = self.as_merged_with_clearance(clearance);
        let boundary: Vec<Line<f64>> = merged
            .iter()
            .flat_map(|poly| {
                std::iter::once(poly.exterior())
                    .chain(poly.interiors().iter())
                    .flat_map(|ring| ring.lines())
            })
            .collect();

        let mut new_paths = Vec::with_capacity(paths.len());
        for path in paths {
            if path.is_empty() {
                new_paths.push(Path::new());
                continue;
            }
            let mut new_path = if fix_contours {
                self.fix_path_contours(path, &boundary)
            } else {
                path.clone()
            };
            for pt in new_path.iter_mut() {
                let cart = pt.to_cartesian();
                // boundary-exclusive: a point on the outline counts as outside
                let inside = merged.contains(&geo::Point::new(cart.x, cart.y));
                // outside flag raises outside points, otherwise inside points
                if inside != outside {
                    pt.z = safe_height;
                }
            }
            new_paths.push(new_path);
        }
        new_paths
    }

    /// [`Surface::correct_height`] over a whole path group.
    pub fn correct_height_group(
        &self,
        group: &PathGroup,
        clearance: f64,
        safe_height: f64,
        outside: bool,
        fix_contours: bool,
    ) -> PathGroup {
        PathGroup::from(self.correct_height(group.paths(), clearance, safe_height, outside, fix_contours))
    }

    /// Inserts bracketed boundary-crossing points into a path.
    fn fix_path_contours(&self, path: &Path, boundary: &[Line<f64>]) -> Path {
        let mut new_path = Path::new();
        for i in 1..path.len() {
            new_path.push(path[i - 1]);
            let p0 = path[i - 1].to_cartesian();
            let p1 = path[i].to_cartesian();
            let segment = Line::new(Coord { x: p0.x, y: p0.y }, Coord { x: p1.x, y: p1.y });
            let seg_len = ((p1.x - p0.x).powi(2) + (p1.y - p0.y).powi(2)).sqrt();
            if seg_len == 0.0 {
                continue;
            }

            // positions of boundary crossings along the segment
            let mut crossings: Vec<f64> = Vec::new();
            for edge in boundary {
                match line_intersection(segment, *edge) {
                    Some(LineIntersection::SinglePoint { intersection, .. }) => {
                        let d = ((intersection.x - p0.x).powi(2)
                            + (intersection.y - p0.y).powi(2))
                        .sqrt();
                        crossings.push(d);
                    }
                    Some(LineIntersection::Collinear { intersection }) => {
                        for c in [intersection.start, intersection.end] {
                            let d = ((c.x - p0.x).powi(2) + (c.y - p0.y).powi(2)).sqrt();
                            crossings.push(d);
                        }
                    }
                    None => {}
                }
            }
            if crossings.is_empty() {
                continue;
            }

            // bracket each crossing so there is a point on each side
            let mut positions: Vec<f64> = Vec::with_capacity(3 * crossings.len());
            for curr_pos in crossings {
                positions.push(curr_pos.min((curr_pos - 1e-3).max(1e-3)));
                positions.push(curr_pos);
                positions.push(curr_pos.max((curr_pos + 1e-3).min(seg_len - 1e-3)));
            }
            positions.sort_by(f64::total_cmp);

            let seg_coords = [[p0.x, p0.y, p0.z], [p1.x, p1.y, p1.z]];
            let seg_length2 =
                (p1.x - p0.x).powi(2) + (p1.y - p0.y).powi(2) + (p1.z - p0.z).powi(2);
            for pos in positions {
                let c = kernel::extract_point(&seg_coords, pos);
                let dseg_length2 =
                    (c[0] - p0.x).powi(2) + (c[1] - p0.y).powi(2) + (c[2] - p0.z).powi(2);
                let rel_pos = if seg_length2 > 0.0 {
                    (dseg_length2 / seg_length2).sqrt()
                } else {
                    0.0
                };
                // interpolate in the original coordinates, c included
                let p0_orig = path[i - 1];
                let p1_orig = path[i];
                new_path.push(p0_orig + rel_pos * (p1_orig - p0_orig));
            }
        }
        new_path.push(path[path.len() - 1]);
        new_path
    }
}

impl From<Path> for Surface {
    fn from(contour: Path) -> Self {
        Surface::from_contour(contour)
    }
}

/// Surface from a `geo` polygon: exterior ring becomes the contour,
/// interior rings become holes. z and c of the result are zero.
fn surface_from_polygon(poly: &Polygon<f64>) -> Surface {
    let contour = path_from_ring(poly.exterior().coords());
    let holes = poly
        .interiors()
        .iter()
        .map(|ring| path_from_ring(ring.coords()))
        .collect();
    Surface::from_paths(vec![contour], holes)
}

fn path_from_ring<'a>(coords: impl Iterator<Item = &'a Coord<f64>>) -> Path {
    coords.map(|c| Point::xy(c.x, c.y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_at(x: f64, y: f64, side: f64) -> Path {
        Path::from(vec![
            Point::xy(x, y),
            Point::xy(x + side, y),
            Point::xy(x + side, y + side),
            Point::xy(x, y + side),
            Point::xy(x, y),
        ])
    }

    #[test]
    fn test_combine_disjoint() {
        let s = Surface::from_paths(vec![square_at(0.0, 0.0, 2.0), square_at(5.0, 0.0, 2.0)], vec![]);
        let combined = s.combine();
        assert_eq!(combined.len(), 2);
        for c in &combined {
            assert!(c.holes().is_empty());
        }
    }

    #[test]
    fn test_combine_overlapping() {
        let s = Surface::from_paths(vec![square_at(0.0, 0.0, 2.0), square_at(1.0, 0.0, 2.0)], vec![]);
        let combined = s.combine();
        assert_eq!(combined.len(), 1);
        assert!(combined[0].holes().is_empty());
        let xs: Vec<f64> = combined[0].contours()[0].iter().map(|p| p.x).collect();
        assert!(xs.iter().cloned().fold(f64::MIN, f64::max) > 2.9);
    }

    #[test]
    fn test_combine_with_hole() {
        let s = Surface::from_paths(vec![square_at(0.0, 0.0, 10.0)], vec![square_at(4.0, 4.0, 2.0)]);
        let combined = s.combine();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].holes().len(), 1);
    }

    #[test]
    fn test_contains() {
        let s = Surface::from_paths(vec![square_at(0.0, 0.0, 10.0)], vec![square_at(4.0, 4.0, 2.0)]);
        assert!(s.contains(&Point::xy(1.0, 1.0)));
        assert!(!s.contains(&Point::xy(5.0, 5.0)));
        assert!(!s.contains(&Point::xy(20.0, 1.0)));
    }

    #[test]
    fn test_centroid() {
        let s = Surface::from_paths(vec![square_at(0.0, 0.0, 2.0), square_at(4.0, 0.0, 2.0)], vec![]);
        let c = s.get_centroid();
        assert!((c.x - 3.0).abs() < 1e-9);
        assert!((c.y - 1.0).abs() < 1e-9);
        assert_eq!(Surface::new().get_centroid(), Point::default());
    }

    #[test]
    fn test_boolean_operations() {
        let a = Surface::from_contour(square_at(0.0, 0.0, 4.0));
        let b = Surface::from_contour(square_at(2.0, 0.0, 4.0));
        let inter = a.intersection(&b);
        assert_eq!(inter.len(), 1);
        let xs: Vec<f64> = inter[0].contours()[0].iter().map(|p| p.x).collect();
        assert!(xs.iter().cloned().fold(f64::MAX, f64::min) > 1.9);
        assert!(xs.iter().cloned().fold(f64::MIN, f64::max) < 4.1);
        let diff = a.difference(&b);
        assert_eq!(diff.len(), 1);
        let xs: Vec<f64> = diff[0].contours()[0].iter().map(|p| p.x).collect();
        assert!(xs.iter().cloned().fold(f64::MIN, f64::max) < 2.1);
        let uni = a.union(&b);
        assert_eq!(uni.len(), 1);
        // disjoint intersection is empty
        let far = Surface::from_contour(square_at(100.0, 0.0, 1.0));
        assert!(a.intersection(&far).is_empty());
    }

    #[test]
    fn test_milling_paths() {
        let s = Surface::from_contour(square_at(0.0, 0.0, 10.0));
        assert!(s.get_milling_paths(4.0, 0.0).is_err());
        let degenerate = Surface::from_contour(Path::from(vec![
            Point::xy(0.0, 0.0),
            Point::xy(1.0, 0.0),
        ]));
        assert!(matches!(
            degenerate.get_milling_paths(4.0, 4.0),
            Err(Error::GeometryInfeasible { .. })
        ));
        let paths = s.get_milling_paths(4.0, 4.0).unwrap();
        // innermost first: the centroid plunge, then the single inset ring
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].len(), 1);
        assert!((paths[0][0].x - 5.0).abs() < 1e-9);
        assert!((paths[0][0].y - 5.0).abs() < 1e-9);
        for p in &paths[1] {
            assert!(p.x > 1.9 && p.x < 8.1);
            assert!(p.y > 1.9 && p.y < 8.1);
        }
    }

    #[test]
    fn test_milled_surface() {
        let s = Surface::from_contour(square_at(0.0, 0.0, 10.0));
        let milled = s.get_milled_surface(4.0, 4.0).unwrap();
        assert_eq!(milled.len(), 1);
        assert!(milled[0].contains(&Point::xy(5.0, 5.0)));
        // swept area reaches back out to the original contour
        assert!(milled[0].contains(&Point::xy(0.5, 5.0)));
    }

    #[test]
    fn test_correct_height_outside() {
        let s = Surface::from_contour(square_at(0.0, 0.0, 10.0));
        let path = Path::from_components(
            &[-2.0, 5.0, 12.0],
            &[5.0, 5.0, 5.0],
            &[-1.0, -1.0, -1.0],
            &[],
        );
        let fixed = s.correct_height(&[path.clone()], 0.0, 5.0, true, false);
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0][0].z, 5.0);
        assert_eq!(fixed[0][1].z, -1.0);
        assert_eq!(fixed[0][2].z, 5.0);
        // inside masking raises the middle point instead
        let masked = s.correct_height(&[path], 0.0, 5.0, false, false);
        assert_eq!(masked[0][0].z, -1.0);
        assert_eq!(masked[0][1].z, 5.0);
    }

    #[test]
    fn test_correct_height_fix_contours() {
        let s = Surface::from_contour(square_at(0.0, 0.0, 10.0));
        let path = Path::from_components(&[-2.0, 12.0], &[5.0, 5.0], &[-1.0, -1.0], &[]);
        let fixed = s.correct_height(&[path], 0.0, 5.0, true, true);
        assert_eq!(fixed.len(), 1);
        // two crossings, three bracket points each
        assert_eq!(fixed[0].len(), 8);
        // crossing brackets sit around x = 0 and x = 10
        assert!((fixed[0][2].x - 0.0).abs() < 0.1);
        assert!((fixed[0][5].x - 10.0).abs() < 0.1);
        // points inside keep their depth, outside go to safe height
        assert_eq!(fixed[0][0].z, 5.0);
        assert_eq!(fixed[0][4].z, -1.0);
        assert_eq!(fixed[0][7].z, 5.0);
    }

    #[test]
    fn test_correct_height_boundary_point_is_outside() {
        let s = Surface::from_contour(square_at(0.0, 0.0, 10.0));
        let path = Path::from_components(&[0.0, 5.0], &[5.0, 5.0], &[-1.0, -1.0], &[]);
        // the point on the outline is not over the surface
        let masked = s.correct_height(&[path.clone()], 0.0, 5.0, false, false);
        assert_eq!(masked[0][0].z, -1.0);
        assert_eq!(masked[0][1].z, 5.0);
        let fixed = s.correct_height(&[path], 0.0, 5.0, true, false);
        assert_eq!(fixed[0][0].z, 5.0);
        assert_eq!(fixed[0][1].z, -1.0);
    }

    #[test]
    fn test_correct_height_empty_path() {
        let s = Surface::from_contour(square_at(0.0, 0.0, 10.0));
        let fixed = s.correct_height(&[Path::new()], 0.0, 5.0, true, false);
        assert_eq!(fixed.len(), 1);
        assert!(fixed[0].is_empty());
    }

    #[test]
    fn test_correct_height_clearance() {
        let s = Surface::from_contour(square_at(0.0, 0.0, 10.0));
        let path = Path::from_components(&[-1.0], &[5.0], &[-2.0], &[]);
        // point 1 outside, but within a clearance of 2
        let fixed = s.correct_height(&[path.clone()], 2.0, 5.0, true, false);
        assert_eq!(fixed[0][0].z, -2.0);
        let strict = s.correct_height(&[path], 0.0, 5.0, true, false);
        assert_eq!(strict[0][0].z, 5.0);
    }
}
