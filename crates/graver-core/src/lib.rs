//! # graver-core
//!
//! Domain model and numerics for 4-axis engraving toolpaths:
//! - `Point`: 3 linear axes + 1 rotary axis (x, y, z, c)
//! - `Path`: ordered point sequences with the full geometry-operation surface
//! - `PathGroup`: ordered path collections with sorting and group operations
//! - `Surface`: contour/hole polygon algebra, milling paths, height masking
//! - elliptic-integral and angle/tolerance utilities backing the arc math
//!
//! All operations are synchronous and functional in style: geometry
//! operations return new values, the documented exceptions
//! (`PathGroup::set_steps`, z writes in `Surface::correct_height`) mutate
//! in place.

pub mod elliptic;
pub mod error;
pub mod kernel;
pub mod math;
pub mod path;
pub mod pathgroup;
pub mod point;
pub mod surface;

pub use error::{Error, Result};
pub use math::{almost_equal, angle_norm, angle_norm_rad, sgn};
pub use path::{DivComponent, Path, RampDirection};
pub use pathgroup::{PathGroup, SortPredicate};
pub use point::Point;
pub use surface::{BooleanOp, Surface};
