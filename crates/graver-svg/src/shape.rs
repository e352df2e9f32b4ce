//! Shapes: curves, ellipses and rectangles, plus transform composition.
//!
//! A shape is a segment collection together with the stack of SVG
//! `transform` attribute strings collected from the element and its
//! ancestors. `to_path` rasterizes the segments and applies the composed
//! transform in one 4x4 matrix pass.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use graver_core::{Path, Point};
use nalgebra::Matrix4;
use regex::Regex;
use tracing::trace;

use crate::curve::Curve;
use crate::error::{Result, SvgError};
use crate::segment::{Arc, Line, Segment};

/// An ellipse, from `<ellipse>` or `<circle>` elements.
#[derive(Debug, Clone)]
pub struct Ellipse {
    arc: Segment,
}

impl Ellipse {
    /// Creates an ellipse from its centre and radii.
    pub fn new(centre: [f64; 2], radii: [f64; 2]) -> Self {
        Self {
            arc: Segment::Arc(Arc::from_centre(centre, radii, 0.0, TAU, 0.0)),
        }
    }

    /// Centre point of the ellipse.
    pub fn centre(&self) -> [f64; 2] {
        self.arc.centre()
    }

    fn interpolate(&self, dl: f64) -> Vec<[f64; 2]> {
        self.arc.interpolate(dl)
    }
}

/// A rectangle, from `<rect>` elements. Corner radii turn the four corners
/// into quarter arcs.
#[derive(Debug, Clone)]
pub struct Rectangle {
    segments: Vec<Segment>,
    centre: [f64; 2],
}

impl Rectangle {
    /// Creates a rectangle at (x, y) with the given width and height;
    /// `corner_radii` rounds the corners.
    pub fn new(x: f64, y: f64, width: f64, height: f64, corner_radii: Option<[f64; 2]>) -> Self {
        let (w, h) = (width, height);
        let centre = [x + w / 2.0, y + h / 2.0];
        let segments = match corner_radii {
            None => vec![
                Segment::Line(Line::new([x, y], [x + w, y])),
                Segment::Line(Line::new([x + w, y], [x + w, y + h])),
                Segment::Line(Line::new([x + w, y + h], [x, y + h])),
                Segment::Line(Line::new([x, y + h], [x, y])),
            ],
            Some([rx, ry]) => vec![
                Segment::Line(Line::new([x + rx, y], [x + w - rx, y])),
                Segment::Arc(Arc::from_centre(
                    [x + w - rx, y + ry],
                    [rx, ry],
                    FRAC_PI_2,
                    PI,
                    PI,
                )),
                Segment::Line(Line::new([x + w, y + ry], [x + w, y + h - ry])),
                Segment::Arc(Arc::from_centre(
                    [x + w - rx, y + h - ry],
                    [rx, ry],
                    0.0,
                    FRAC_PI_2,
                    0.0,
                )),
                Segment::Line(Line::new([x + w - rx, y + h], [x + rx, y + h])),
                Segment::Arc(Arc::from_centre(
                    [x + rx, y + h - ry],
                    [rx, ry],
                    FRAC_PI_2,
                    PI,
                    0.0,
                )),
                Segment::Line(Line::new([x, y + h - ry], [x, y + ry])),
                Segment::Arc(Arc::from_centre([x + rx, y + ry], [rx, ry], 0.0, FRAC_PI_2, PI)),
            ],
        };
        Self { segments, centre }
    }

    /// Centre point of the rectangle.
    pub fn centre(&self) -> [f64; 2] {
        self.centre
    }

    /// The outline segments, in drawing order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn interpolate(&self, dl: f64) -> Vec<[f64; 2]> {
        let mut points = Vec::new();
        for seg in &self.segments {
            points.extend(seg.interpolate(dl));
        }
        points
    }
}

/// The geometric payload of a shape.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// A `<path>`, `<polyline>` or `<polygon>` curve.
    Curve(Curve),
    /// An `<ellipse>` or `<circle>`.
    Ellipse(Ellipse),
    /// A `<rect>`.
    Rectangle(Rectangle),
}

/// A drawable shape with its transform attribute stack.
///
/// `transforms[0]` is the element's own transform; ancestors are appended
/// outwards during document traversal.
#[derive(Debug, Clone)]
pub struct Shape {
    /// Shape geometry.
    pub kind: ShapeKind,
    /// Raw SVG transform strings, innermost first.
    pub transforms: Vec<String>,
}

impl Shape {
    /// Wraps a shape kind with an empty transform stack.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            transforms: Vec::new(),
        }
    }

    /// Resamples the shape outline with constant step size `dl`.
    pub fn interpolate(&self, dl: f64) -> Vec<[f64; 2]> {
        match &self.kind {
            ShapeKind::Curve(c) => c.interpolate(dl),
            ShapeKind::Ellipse(e) => e.interpolate(dl),
            ShapeKind::Rectangle(r) => r.interpolate(dl),
        }
    }

    /// Shape centre point; curves report the origin.
    pub fn centre(&self) -> Point {
        let c = match &self.kind {
            ShapeKind::Curve(_) => [0.0, 0.0],
            ShapeKind::Ellipse(e) => e.centre(),
            ShapeKind::Rectangle(r) => r.centre(),
        };
        Point::xy(c[0], c[1])
    }

    /// Rasterizes the shape into a path and applies the composed transform
    /// stack.
    pub fn to_path(&self, dl: f64) -> Result<Path> {
        let path: Path = self
            .interpolate(dl)
            .into_iter()
            .map(|p| Point::xy(p[0], p[1]))
            .collect();
        match self.transform_matrix()? {
            Some(matrix) => Ok(path.matrix_transform(&matrix)),
            None => Ok(path),
        }
    }

    /// Composes the transform stack into one matrix. Within each transform
    /// string operations apply right to left; stack entries apply innermost
    /// first. Returns `None` when the stack holds no operation at all.
    pub fn transform_matrix(&self) -> Result<Option<Matrix4<f64>>> {
        let op_re = Regex::new(r"([A-Za-z]+)\s*\(([^)]*)\)").expect("invalid transform regex");
        let number_re = Regex::new(r"[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?")
            .expect("invalid number regex");
        let mut matrix = Matrix4::identity();
        let mut has_transforms = false;
        for transform in &self.transforms {
            let ops: Vec<(&str, Vec<f64>)> = op_re
                .captures_iter(transform)
                .map(|caps| {
                    let name = caps.get(1).map_or("", |m| m.as_str());
                    let params = number_re
                        .find_iter(caps.get(2).map_or("", |m| m.as_str()))
                        .filter_map(|m| m.as_str().parse::<f64>().ok())
                        .collect();
                    (name, params)
                })
                .collect();
            for (name, params) in ops.iter().rev() {
                matrix = operation_matrix(name, params)? * matrix;
                has_transforms = true;
            }
        }
        if has_transforms {
            trace!(?matrix, "composed transform");
            Ok(Some(matrix))
        } else {
            Ok(None)
        }
    }
}

/// The 4x4 matrix of a single transform operation.
fn operation_matrix(name: &str, params: &[f64]) -> Result<Matrix4<f64>> {
    let get = |i: usize| params.get(i).copied().unwrap_or(0.0);
    let mut m = Matrix4::identity();
    match name {
        "translate" => {
            m[(0, 3)] = get(0);
            m[(1, 3)] = get(1);
        }
        "scale" => {
            let sx = get(0);
            let sy = params.get(1).copied().unwrap_or(sx);
            m[(0, 0)] = sx;
            m[(1, 1)] = sy;
        }
        "rotate" => {
            let (s, c) = get(0).to_radians().sin_cos();
            m[(0, 0)] = c;
            m[(0, 1)] = -s;
            m[(1, 0)] = s;
            m[(1, 1)] = c;
        }
        "skewX" => {
            m[(0, 1)] = get(0).to_radians().tan();
        }
        "skewY" => {
            m[(1, 0)] = get(0).to_radians().tan();
        }
        "matrix" => {
            m[(0, 0)] = get(0);
            m[(1, 0)] = get(1);
            m[(0, 1)] = get(2);
            m[(1, 1)] = get(3);
            m[(0, 3)] = get(4);
            m[(1, 3)] = get(5);
        }
        other => {
            return Err(SvgError::UnknownTransform {
                name: other.to_string(),
            })
        }
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn assert_pt(p: &Point, x: f64, y: f64) {
        assert!((p.x - x).abs() < TOL, "x: {} vs {}", p.x, x);
        assert!((p.y - y).abs() < TOL, "y: {} vs {}", p.y, y);
    }

    #[test]
    fn test_plain_rectangle_segments() {
        let rect = Rectangle::new(400.0, 100.0, 400.0, 200.0, None);
        assert_eq!(rect.segments().len(), 4);
        for seg in rect.segments() {
            assert!(matches!(seg, Segment::Line(_)));
        }
        let c = rect.centre();
        assert!((c[0] - 600.0).abs() < TOL);
        assert!((c[1] - 200.0).abs() < TOL);
    }

    #[test]
    fn test_rounded_rectangle_segments() {
        let rect = Rectangle::new(100.0, 100.0, 400.0, 200.0, Some([50.0, 40.0]));
        assert_eq!(rect.segments().len(), 8);
        let arcs = rect
            .segments()
            .iter()
            .filter(|s| matches!(s, Segment::Arc(_)))
            .count();
        assert_eq!(arcs, 4);
        // top edge is inset by rx on both sides
        let top = &rect.segments()[0];
        assert!((top.point(0.0)[0] - 150.0).abs() < TOL);
        assert!((top.point(1.0)[0] - 450.0).abs() < TOL);
        // first corner arc starts where the top edge ends
        let corner = &rect.segments()[1];
        let start = corner.point(0.0);
        assert!((start[0] - 450.0).abs() < 1e-9);
        assert!((start[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_ellipse_outline() {
        let ellipse = Ellipse::new([600.0, 200.0], [100.0, 100.0]);
        let c = ellipse.centre();
        assert!((c[0] - 600.0).abs() < TOL);
        assert!((c[1] - 200.0).abs() < TOL);
        let pts = ellipse.interpolate(10.0);
        for p in &pts {
            let r = ((p[0] - 600.0).powi(2) + (p[1] - 200.0).powi(2)).sqrt();
            assert!((r - 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_to_path_without_transforms() {
        let shape = Shape::new(ShapeKind::Curve(Curve::parse("M0,0 L10,0").unwrap()));
        let path = shape.to_path(2.5).unwrap();
        assert_eq!(path.len(), 5);
        assert_pt(&path[4], 10.0, 0.0);
    }

    #[test]
    fn test_translate_then_scale() {
        // rightmost op applies first: translate, then scale
        let mut shape = Shape::new(ShapeKind::Curve(Curve::parse("M1,1 L2,1").unwrap()));
        shape.transforms.push("scale(2) translate(3,4)".into());
        let path = shape.to_path(10.0).unwrap();
        assert_pt(&path[0], 8.0, 10.0);
        assert_pt(&path[1], 10.0, 10.0);
    }

    #[test]
    fn test_ancestor_transforms_apply_after_own() {
        let mut shape = Shape::new(ShapeKind::Curve(Curve::parse("M1,0 L2,0").unwrap()));
        shape.transforms.push("scale(2)".into());
        shape.transforms.push("translate(10,0)".into());
        let path = shape.to_path(10.0).unwrap();
        assert_pt(&path[0], 12.0, 0.0);
        assert_pt(&path[1], 14.0, 0.0);
    }

    #[test]
    fn test_rotate_transform() {
        let mut shape = Shape::new(ShapeKind::Curve(Curve::parse("M1,0 L2,0").unwrap()));
        shape.transforms.push("rotate(90)".into());
        let path = shape.to_path(10.0).unwrap();
        assert_pt(&path[0], 0.0, 1.0);
        assert_pt(&path[1], 0.0, 2.0);
    }

    #[test]
    fn test_matrix_transform_entries() {
        let mut shape = Shape::new(ShapeKind::Curve(Curve::parse("M1,2 L3,4").unwrap()));
        shape.transforms.push("matrix(1,0,0,1,5,-5)".into());
        let path = shape.to_path(10.0).unwrap();
        assert_pt(&path[0], 6.0, -3.0);
        assert_pt(&path[1], 8.0, -1.0);
    }

    #[test]
    fn test_unknown_transform_is_an_error() {
        let mut shape = Shape::new(ShapeKind::Curve(Curve::parse("M0,0 L1,0").unwrap()));
        shape.transforms.push("spin(45)".into());
        assert!(matches!(
            shape.to_path(10.0),
            Err(SvgError::UnknownTransform { .. })
        ));
    }

    #[test]
    fn test_empty_transform_strings_are_ignored() {
        let mut shape = Shape::new(ShapeKind::Curve(Curve::parse("M1,1 L2,2").unwrap()));
        shape.transforms.push(String::new());
        shape.transforms.push(String::new());
        assert!(shape.transform_matrix().unwrap().is_none());
    }
}
