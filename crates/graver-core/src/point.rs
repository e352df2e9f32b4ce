//! Point in 3+1-dimensional space.
//!
//! The representation corresponds to a 4-axis machine: three linear axes
//! (x, y, z) plus a rotary axis c, in degrees, coupled to the x-y plane by
//! rotation.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::math::almost_equal;

/// Number of ULPs used for coordinate comparisons.
const EQ_ULP: i32 = 6;

/// A point with 3 linear coordinates and 1 rotary coordinate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    /// Position along the x axis.
    pub x: f64,
    /// Position along the y axis.
    pub y: f64,
    /// Position along the z axis.
    pub z: f64,
    /// Position of the c axis, in degrees.
    pub c: f64,
}

impl Point {
    /// Creates a point with the given coordinates.
    pub fn new(x: f64, y: f64, z: f64, c: f64) -> Self {
        Self { x, y, z, c }
    }

    /// Creates a point in the x-y plane.
    pub fn xy(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }

    /// Distance from the origin.
    pub fn radius(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Angle in the x-y plane with respect to the x axis, including the
    /// rotary contribution. Degrees by default.
    pub fn angle(&self, radians: bool) -> f64 {
        if radians {
            self.c.to_radians() + self.y.atan2(self.x)
        } else {
            self.c + self.y.atan2(self.x).to_degrees()
        }
    }

    /// Angle in the z direction with respect to the x-y plane.
    pub fn elevation(&self, radians: bool) -> f64 {
        let proj = (self.x * self.x + self.y * self.y).sqrt();
        if radians {
            self.z.atan2(proj)
        } else {
            self.z.atan2(proj).to_degrees()
        }
    }

    /// Euclidean distance to another point, with both ends projected to
    /// the cartesian frame (c rotation applied).
    pub fn distance_to(&self, p: &Point) -> f64 {
        let (s1, c1) = self.c.to_radians().sin_cos();
        let x1 = self.x * c1 - self.y * s1;
        let y1 = self.y * c1 + self.x * s1;
        let (s2, c2) = p.c.to_radians().sin_cos();
        let x2 = p.x * c2 - p.y * s2;
        let y2 = p.y * c2 + p.x * s2;
        ((x1 - x2).powi(2) + (y1 - y2).powi(2) + (self.z - p.z).powi(2)).sqrt()
    }

    /// Copy with the c component projected onto the x-y plane: rotates
    /// (x, y) by c and zeroes c.
    pub fn to_cartesian(&self) -> Point {
        let (s, c) = self.c.to_radians().sin_cos();
        Point::new(self.x * c - self.y * s, self.y * c + self.x * s, self.z, 0.0)
    }

    /// Copy with the y component absorbed into the rotary axis: stores the
    /// planar radius in x and the planar angle in c.
    pub fn to_polar(&self) -> Point {
        Point::new(
            (self.x * self.x + self.y * self.y).sqrt(),
            0.0,
            self.z,
            self.angle(false),
        )
    }

    /// Copy projected onto a cylinder of the given radius around the x
    /// axis, using c as the angular position.
    pub fn to_cylindrical(&self, radius: f64) -> Point {
        let (s, c) = self.c.to_radians().sin_cos();
        Point::new(self.x, radius * c + self.y, radius * s + self.z, 0.0)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={}, y={}, z={}, c={}", self.x, self.y, self.z, self.c)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        almost_equal(self.x, other.x, EQ_ULP)
            && almost_equal(self.y, other.y, EQ_ULP)
            && almost_equal(self.z, other.z, EQ_ULP)
            && almost_equal(self.c, other.c, EQ_ULP)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, q: Point) -> Point {
        Point::new(self.x + q.x, self.y + q.y, self.z + q.z, self.c + q.c)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, q: Point) {
        self.x += q.x;
        self.y += q.y;
        self.z += q.z;
        self.c += q.c;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, q: Point) -> Point {
        Point::new(self.x - q.x, self.y - q.y, self.z - q.z, self.c - q.c)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, q: Point) {
        self.x -= q.x;
        self.y -= q.y;
        self.z -= q.z;
        self.c -= q.c;
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, v: f64) -> Point {
        Point::new(self.x * v, self.y * v, self.z * v, self.c * v)
    }
}

impl Mul<Point> for f64 {
    type Output = Point;
    fn mul(self, p: Point) -> Point {
        p * self
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, v: f64) -> Point {
        Point::new(self.x / v, self.y / v, self.z / v, self.c / v)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y, -self.z, -self.c)
    }
}
