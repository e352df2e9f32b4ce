//! SVG document loading and layer extraction.
//!
//! A [`File`] keeps the raw document text and re-parses it per query with
//! `roxmltree`; documents are small and the tree borrows the text, so this
//! keeps the type self-contained. Layers are the immediate `<g>` children
//! of the root, matched on any of the attributes `id`, `name`, `label` or
//! `inkscape:label` since drawing tools disagree on where layer names live.

use std::fs;
use std::path::Path as FsPath;

use graver_core::{Path, Point};
use roxmltree::{Document, Node};
use tracing::debug;

use crate::curve::Curve;
use crate::error::{Result, SvgError};
use crate::shape::{Ellipse, Rectangle, Shape, ShapeKind};

/// Inkscape namespace used for the `inkscape:label` layer attribute.
const INKSCAPE_NS: &str = "http://www.inkscape.org/namespaces/inkscape";

/// Font size used to resolve `em` lengths.
const EM_SIZE: f64 = 16.0;

/// A loaded SVG document.
pub struct File {
    text: String,
    centre: Point,
}

impl File {
    /// Opens and parses an SVG file from disk.
    pub fn open(path: impl AsRef<FsPath>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SvgError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_memory(text)
    }

    /// Parses an SVG document from a string buffer.
    pub fn from_memory(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let centre = {
            let doc = Document::parse(&text)?;
            let vb = view_box(doc.root_element())?;
            Point::xy(vb[0] + vb[2] / 2.0, vb[1] + vb[3] / 2.0)
        };
        debug!(cx = centre.x, cy = centre.y, "loaded SVG document");
        Ok(Self { text, centre })
    }

    /// Drawing centre derived from the viewBox.
    pub fn centre(&self) -> Point {
        self.centre
    }

    /// The viewBox as (x, y, width, height).
    pub fn get_size(&self) -> Result<[f64; 4]> {
        let doc = Document::parse(&self.text)?;
        view_box(doc.root_element())
    }

    /// Extracts the shapes of a layer, with the transform attributes of the
    /// layer and all intermediate containers accumulated on each shape.
    pub fn get_shapes(&self, layer_name: &str) -> Result<Vec<Shape>> {
        let doc = Document::parse(&self.text)?;
        let layer = find_layer(&doc, layer_name)?;
        shapes_under(layer)
    }

    /// Converts the shapes of a layer into paths with step size `dl`,
    /// shifted so the drawing centre sits at the origin.
    pub fn get_paths(&self, layer_name: &str, dl: f64) -> Result<Vec<Path>> {
        let shapes = self.get_shapes(layer_name)?;
        let inv_centre = -self.centre;
        shapes
            .iter()
            .map(|s| s.to_path(dl).map(|p| p.shift(&inv_centre)))
            .collect()
    }

    /// Centre points of the ellipse and rectangle shapes of a layer,
    /// shifted by the negated drawing centre. Used for drill patterns.
    pub fn get_points(&self, layer_name: &str) -> Result<Vec<Point>> {
        let shapes = self.get_shapes(layer_name)?;
        Ok(shapes
            .iter()
            .filter(|s| matches!(s.kind, ShapeKind::Ellipse(_) | ShapeKind::Rectangle(_)))
            .map(|s| s.centre() - self.centre)
            .collect())
    }
}

fn view_box(root: Node) -> Result<[f64; 4]> {
    let raw = root
        .attribute("viewBox")
        .ok_or_else(|| SvgError::attribute("svg", "viewBox"))?;
    let mut vb = [0.0; 4];
    let mut parts = raw.split_whitespace();
    for v in vb.iter_mut() {
        *v = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SvgError::attribute("svg", "viewBox"))?;
    }
    Ok(vb)
}

fn find_layer<'a, 'input>(
    doc: &'a Document<'input>,
    name: &str,
) -> Result<Node<'a, 'input>> {
    doc.root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "g")
        .find(|n| {
            ["id", "name", "label"]
                .iter()
                .any(|attr| n.attribute(*attr) == Some(name))
                || n.attribute((INKSCAPE_NS, "label")) == Some(name)
        })
        .ok_or_else(|| SvgError::LayerNotFound {
            name: name.to_string(),
        })
}

fn shapes_under(node: Node) -> Result<Vec<Shape>> {
    let mut shapes = Vec::new();
    let base_transform = node.attribute("transform").unwrap_or_default();
    for child in node.children().filter(Node::is_element) {
        let kind = match child.tag_name().name() {
            "path" => Some(ShapeKind::Curve(Curve::parse(required(&child, "d")?)?)),
            "polyline" => {
                let points = required(&child, "points")?;
                Some(ShapeKind::Curve(Curve::parse(&format!("M{points}"))?))
            }
            "polygon" => {
                let points = required(&child, "points")?;
                Some(ShapeKind::Curve(Curve::parse(&format!("M{points}z"))?))
            }
            "circle" | "ellipse" => Some(ShapeKind::Ellipse(ellipse_from(&child)?)),
            "rect" => Some(ShapeKind::Rectangle(rectangle_from(&child)?)),
            _ => None,
        };
        if let Some(kind) = kind {
            let mut shape = Shape::new(kind);
            shape
                .transforms
                .push(child.attribute("transform").unwrap_or_default().to_string());
            shape.transforms.push(base_transform.to_string());
            shapes.push(shape);
        } else if child.has_children() {
            // unknown containers (nested groups etc.) are recursed into
            let mut nested = shapes_under(child)?;
            for shape in &mut nested {
                shape.transforms.push(base_transform.to_string());
            }
            shapes.append(&mut nested);
        }
    }
    Ok(shapes)
}

fn required<'a>(node: &Node<'a, '_>, attr: &str) -> Result<&'a str> {
    node.attribute(attr)
        .ok_or_else(|| SvgError::attribute(node.tag_name().name(), attr))
}

/// Parses a length attribute value, resolving px/%/em units; percentages
/// are relative to `rel`.
fn parse_length(raw: &str, rel: f64) -> Option<f64> {
    let s = raw.trim();
    for end in (1..=s.len()).rev() {
        if let Ok(value) = s[..end].parse::<f64>() {
            return Some(match &s[end..] {
                "%" => value * rel / 100.0,
                "em" => value * EM_SIZE,
                _ => value,
            });
        }
    }
    None
}

fn number(node: &Node, attr: &str, rel: f64) -> Result<f64> {
    let raw = required(node, attr)?;
    parse_length(raw, rel).ok_or_else(|| SvgError::attribute(node.tag_name().name(), attr))
}

fn ellipse_from(node: &Node) -> Result<Ellipse> {
    let cx = number(node, "cx", 0.0)?;
    let cy = number(node, "cy", 0.0)?;
    let radii = if node.has_attribute("rx") {
        let rx = number(node, "rx", 0.0)?;
        let ry = if node.has_attribute("ry") {
            number(node, "ry", 0.0)?
        } else {
            rx
        };
        [rx, ry]
    } else if node.has_attribute("r") {
        let r = number(node, "r", 0.0)?;
        [r, r]
    } else {
        [0.0, 0.0]
    };
    Ok(Ellipse::new([cx, cy], radii))
}

fn rectangle_from(node: &Node) -> Result<Rectangle> {
    let x = node
        .attribute("x")
        .and_then(|v| parse_length(v, 0.0))
        .unwrap_or(0.0);
    let y = node
        .attribute("y")
        .and_then(|v| parse_length(v, 0.0))
        .unwrap_or(0.0);
    let w = number(node, "width", 0.0)?;
    let h = number(node, "height", 0.0)?;
    let has_rx = node.has_attribute("rx");
    let has_ry = node.has_attribute("ry");
    let corner_radii = if has_rx || has_ry {
        let rx = if has_rx { number(node, "rx", w)? } else { 0.0 };
        let ry = if has_ry { number(node, "ry", h)? } else { 0.0 };
        // a single corner radius applies to both axes
        Some(match (has_rx, has_ry) {
            (true, false) => [rx, rx],
            (false, true) => [ry, ry],
            _ => [rx, ry],
        })
    } else {
        None
    };
    Ok(Rectangle::new(x, y, w, h, corner_radii))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg"
     xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape"
     viewBox="0 0 1200 400">
  <g id="contours">
    <path d="M 100 100 L 300 100 L 200 300 z"/>
    <circle cx="600" cy="200" r="100"/>
  </g>
  <g inkscape:label="drills">
    <circle cx="200" cy="200" r="5"/>
    <rect x="400" y="100" width="400" height="200"/>
  </g>
  <g label="rounded">
    <rect x="100" y="100" width="400" height="200" rx="50" ry="40"/>
  </g>
  <g name="grouped" transform="translate(10,0)">
    <g transform="scale(2)">
      <path d="M1,1 L2,1"/>
    </g>
  </g>
</svg>"#;

    #[test]
    fn test_view_box_and_centre() {
        let file = File::from_memory(DOC).unwrap();
        assert_eq!(file.get_size().unwrap(), [0.0, 0.0, 1200.0, 400.0]);
        let c = file.centre();
        assert!((c.x - 600.0).abs() < 1e-12);
        assert!((c.y - 200.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_view_box() {
        assert!(matches!(
            File::from_memory("<svg xmlns='http://www.w3.org/2000/svg'/>"),
            Err(SvgError::BadAttribute { .. })
        ));
    }

    #[test]
    fn test_layer_lookup_by_all_attributes() {
        let file = File::from_memory(DOC).unwrap();
        for layer in ["contours", "drills", "rounded", "grouped"] {
            assert!(file.get_shapes(layer).is_ok(), "layer {layer} not found");
        }
        assert!(matches!(
            file.get_shapes("missing"),
            Err(SvgError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_shapes_of_layer() {
        let file = File::from_memory(DOC).unwrap();
        let shapes = file.get_shapes("contours").unwrap();
        assert_eq!(shapes.len(), 2);
        assert!(matches!(shapes[0].kind, ShapeKind::Curve(_)));
        assert!(matches!(shapes[1].kind, ShapeKind::Ellipse(_)));
        let c = shapes[1].centre();
        assert!((c.x - 600.0).abs() < 1e-12);
        assert!((c.y - 200.0).abs() < 1e-12);
    }

    #[test]
    fn test_rounded_rect_shape() {
        let file = File::from_memory(DOC).unwrap();
        let shapes = file.get_shapes("rounded").unwrap();
        assert_eq!(shapes.len(), 1);
        match &shapes[0].kind {
            ShapeKind::Rectangle(r) => assert_eq!(r.segments().len(), 8),
            other => panic!("expected rectangle, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_group_transforms_accumulate() {
        let file = File::from_memory(DOC).unwrap();
        let shapes = file.get_shapes("grouped").unwrap();
        assert_eq!(shapes.len(), 1);
        // own (empty), inner group, outer layer
        assert_eq!(shapes[0].transforms.len(), 3);
        let paths = file.get_paths("grouped", 10.0).unwrap();
        // scaled by 2, translated by 10, then shifted by -(600,200)
        assert!((paths[0][0].x - (2.0 + 10.0 - 600.0)).abs() < 1e-9);
        assert!((paths[0][0].y - (2.0 - 200.0)).abs() < 1e-9);
    }

    #[test]
    fn test_points_of_layer() {
        let file = File::from_memory(DOC).unwrap();
        let points = file.get_points("drills").unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].x - (200.0 - 600.0)).abs() < 1e-12);
        assert!((points[0].y - 0.0).abs() < 1e-12);
        assert!((points[1].x - 0.0).abs() < 1e-12);
        assert!((points[1].y - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_paths_are_centred() {
        let file = File::from_memory(DOC).unwrap();
        let paths = file.get_paths("contours", 10.0).unwrap();
        assert_eq!(paths.len(), 2);
        // the triangle starts at (100,100), shifted by -(600,200)
        assert!((paths[0][0].x + 500.0).abs() < 1e-9);
        assert!((paths[0][0].y + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_length_units() {
        assert_eq!(parse_length("50", 0.0), Some(50.0));
        assert_eq!(parse_length("50px", 0.0), Some(50.0));
        assert_eq!(parse_length("50%", 400.0), Some(200.0));
        assert_eq!(parse_length("1.5em", 0.0), Some(24.0));
        assert_eq!(parse_length("nope", 0.0), None);
    }
}
