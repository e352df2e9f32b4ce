//! # graver-svg
//!
//! SVG parsing for engraving toolpaths:
//! - `Segment`: parametric line/arc/cubic-Bézier segments with arc-length
//!   parametrization (elliptic integrals for arcs, quadrature for Béziers)
//! - `Curve`: the curve-command (`d` attribute) parser
//! - `Shape`: curves, ellipses and rectangles with transform composition
//! - `File`: document loading, layer lookup, shape/path/point extraction
//!
//! Rasterized shapes come out as `graver_core::Path` values in the drawing
//! plane (z and c zero), centred on the document viewBox.

pub mod curve;
pub mod error;
pub mod file;
pub mod segment;
pub mod shape;

pub use curve::Curve;
pub use error::{Result, SvgError};
pub use file::File;
pub use segment::{Arc, CubicBezier, Line, Segment};
pub use shape::{Ellipse, Rectangle, Shape, ShapeKind};
