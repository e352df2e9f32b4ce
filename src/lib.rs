//! # graver
//!
//! SVG curve parsing and path/surface geometry algebra for 4-axis CNC
//! engraving toolpaths.
//!
//! ## Architecture
//!
//! The workspace is split into two crates re-exported here:
//!
//! 1. **graver-core** - the geometry domain model: `Point` (x, y, z + rotary
//!    c axis), `Path`, `PathGroup`, `Surface`, the elliptic-integral and
//!    angle utilities backing the arc math
//! 2. **graver-svg** - SVG document parsing: parametric segments with
//!    arc-length parametrization, the curve-command parser, shapes with
//!    transform composition, and layer/path/point extraction
//!
//! ## Typical flow
//!
//! Load a drawing, pull a layer as paths, then shape the toolpaths with the
//! core algebra:
//!
//! ```no_run
//! use graver::{File, Point, SortPredicate, Surface};
//!
//! # fn main() -> anyhow::Result<()> {
//! let file = File::open("drawing.svg")?;
//! let paths = file.get_paths("contours", 0.1)?;
//!
//! let stock = Surface::from_paths(paths.clone(), vec![]);
//! let passes = stock.get_milling_paths(1.0, 0.4)?;
//!
//! let group = graver::PathGroup::from(passes);
//! let ordered = group.sort_paths(&Point::xy(0.0, 0.0), SortPredicate::EndToStart);
//! # let _ = ordered;
//! # Ok(())
//! # }
//! ```

pub use graver_core::{
    almost_equal, angle_norm, angle_norm_rad, elliptic, sgn, BooleanOp, DivComponent, Error, Path,
    PathGroup, Point, RampDirection, SortPredicate, Surface,
};
pub use graver_svg::{Curve, File, Segment, Shape, ShapeKind, SvgError};
