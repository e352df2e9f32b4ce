//! Toolpath as an ordered sequence of points.
//!
//! A path carries no segment information: it is a polyline in the 4-axis
//! coordinate space. Geometry operations return new paths; the points of
//! the receiver are never mutated.

use std::ops::{Add, Index, IndexMut, Mul, Neg};

use geo::{Centroid, ConvexHull, SimplifyIdx};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kernel;
use crate::math::{almost_equal, angle_norm, angle_norm_rad};
use crate::point::Point;

/// Ramp orientation relative to a discontinuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampDirection {
    /// Ramp leading out of a milling pass.
    Forward,
    /// Ramp leading into a milling pass.
    Backward,
    /// Both ramp kinds.
    Both,
}

/// Component pair for [`Path::divergence`]: d(first)/d(second).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivComponent {
    DxDx,
    DxDy,
    DxDz,
    DyDx,
    DyDy,
    DyDz,
    DzDx,
    DzDy,
    DzDz,
}

/// An ordered sequence of points forming a toolpath.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Point>,
}

impl Path {
    /// Creates an empty path.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Creates an empty path with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Creates a path from per-axis coordinate columns. Columns may differ
    /// in length; missing values are zero-filled.
    pub fn from_components(xs: &[f64], ys: &[f64], zs: &[f64], cs: &[f64]) -> Self {
        let n = xs.len().max(ys.len()).max(zs.len()).max(cs.len());
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            points.push(Point::new(
                xs.get(i).copied().unwrap_or(0.0),
                ys.get(i).copied().unwrap_or(0.0),
                zs.get(i).copied().unwrap_or(0.0),
                cs.get(i).copied().unwrap_or(0.0),
            ));
        }
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends a point.
    pub fn push(&mut self, p: Point) {
        self.points.push(p);
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Point> {
        self.points.get_mut(index)
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Point> {
        self.points.iter_mut()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Cartesian projection of the path, open.
    pub(crate) fn open_coords(&self) -> Vec<[f64; 3]> {
        kernel::cartesian_coords(&self.points)
    }

    /// Cartesian projection of the path, closed with an exact duplicate of
    /// the first coordinate.
    pub(crate) fn closed_coords(&self) -> Vec<[f64; 3]> {
        let mut coords = self.open_coords();
        if self.is_closed() {
            coords.pop();
        }
        if let Some(first) = coords.first().copied() {
            coords.push(first);
        }
        coords
    }

    /// True if the path has at least 3 points and its cartesian endpoints
    /// coincide.
    pub fn is_closed(&self) -> bool {
        if self.points.len() <= 2 {
            return false;
        }
        let c0 = self.points[0].to_cartesian();
        let c1 = self.points[self.points.len() - 1].to_cartesian();
        almost_equal(c0.x, c1.x, 6) && almost_equal(c0.y, c1.y, 6) && almost_equal(c0.z, c1.z, 6)
    }

    /// Copy with the first point appended at the end if the path is open.
    pub fn close(&self) -> Path {
        let mut new_path = self.clone();
        if !self.is_closed() {
            if let Some(first) = self.points.first().copied() {
                new_path.points.push(first);
            }
        }
        new_path
    }

    /// Copy with the point order reversed.
    pub fn flip(&self) -> Path {
        let mut new_path = self.clone();
        new_path.points.reverse();
        new_path
    }

    /// Winding of the path, determined from the accumulated normal of
    /// consecutive edge pairs in the cartesian frame. The dominant normal
    /// axis is z, falling back to y then x for paths lying in a plane
    /// containing z.
    pub fn is_ccw(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let cart: Vec<Point> = self.points.iter().map(|p| p.to_cartesian()).collect();
        let last = if self.is_closed() { n - 3 } else { n - 2 };
        let mut normal = Point::default();
        for i in 0..last {
            let pt1 = cart[i + 1] - cart[i];
            let pt2 = cart[i + 2] - cart[i + 1];
            normal.x += pt1.y * pt2.z - pt2.y * pt1.z;
            normal.y += pt1.z * pt2.x - pt2.z * pt1.x;
            normal.z += pt1.x * pt2.y - pt2.x * pt1.y;
        }
        let normal = normal * (1.0 / normal.radius());
        if !almost_equal(normal.z, 0.0, 6) {
            normal.z > 0.0
        } else if !almost_equal(normal.y, 0.0, 6) {
            normal.y > 0.0
        } else {
            normal.x > 0.0
        }
    }

    /// Centroid of the path. For 3 points or more this is the 2D polygon
    /// centroid of the closed cartesian ring with z averaged separately;
    /// for shorter paths it is the cartesian average.
    pub fn get_centroid(&self) -> Point {
        let n = self.points.len();
        if n > 2 {
            let ring = self.closed_coords();
            let polygon = kernel::polygon(&ring, &[]);
            // polygon centroid is 2D only, z is averaged over the ring
            let max_n = if self.is_closed() { n - 1 } else { n } as f64;
            let z = self.points.iter().map(|p| p.z / max_n).sum::<f64>();
            match polygon.centroid() {
                Some(c) => Point::new(c.x(), c.y(), z, 0.0),
                None => Point::default(),
            }
        } else if n >= 1 {
            let mut avg = Point::default();
            for p in &self.points {
                let q = p.to_cartesian();
                avg.x += q.x / n as f64;
                avg.y += q.y / n as f64;
                avg.z += q.z / n as f64;
            }
            avg
        } else {
            Point::default()
        }
    }

    /// Largest distance from the centroid to any point.
    pub fn get_largest_radius(&self) -> f64 {
        let centroid = self.get_centroid();
        let mut rmax = 0.0;
        for p in &self.points {
            let ri = ((p.x - centroid.x).powi(2)
                + (p.y - centroid.y).powi(2)
                + (p.z - centroid.z).powi(2))
            .sqrt();
            if ri > rmax {
                rmax = ri;
            }
        }
        rmax
    }

    /// Distance from the centroid, per point.
    pub fn get_radii(&self) -> Vec<f64> {
        let centroid = self.get_centroid();
        self.points
            .iter()
            .map(|p| {
                ((p.x - centroid.x).powi(2)
                    + (p.y - centroid.y).powi(2)
                    + (p.z - centroid.z).powi(2))
                .sqrt()
            })
            .collect()
    }

    /// Planar angle per point, unwrapped so that consecutive values never
    /// jump by more than a half turn.
    pub fn get_angles(&self, radians: bool) -> Vec<f64> {
        let n = self.points.len();
        let mut angles = Vec::with_capacity(n);
        if n == 0 {
            return angles;
        }
        let corr = if radians { angle_norm_rad } else { angle_norm };
        angles.push(self.points[0].angle(radians));
        for i in 1..n {
            let a = self.points[i].angle(radians);
            angles.push(angles[i - 1] + corr(a - angles[i - 1]));
        }
        angles
    }

    /// Elevation angle per point.
    pub fn get_elevations(&self, radians: bool) -> Vec<f64> {
        self.points.iter().map(|p| p.elevation(radians)).collect()
    }

    /// 2D length of the cartesian polyline.
    pub fn get_length(&self) -> f64 {
        kernel::length_2d(&self.open_coords())
    }

    /// Translation in the cartesian frame; z and c add directly.
    pub fn shift(&self, p: &Point) -> Path {
        let mut new_path = Path::with_capacity(self.points.len());
        for q in &self.points {
            let (s, c) = q.c.to_radians().sin_cos();
            let x = c * q.x - s * q.y + p.x;
            let y = s * q.x + c * q.y + p.y;
            new_path
                .points
                .push(Point::new(x * c + y * s, -x * s + y * c, q.z + p.z, q.c + p.c));
        }
        new_path
    }

    /// Scales about `ct` by the given factor.
    pub fn scale(&self, factor: f64, ct: &Point) -> Path {
        let mut new_path = self.clone();
        for pt in &mut new_path.points {
            let (s, c) = pt.c.to_radians().sin_cos();
            let xb = (c * pt.x - s * pt.y) * factor;
            let yb = (c * pt.y + s * pt.x) * factor;
            pt.x = c * xb + s * yb;
            pt.y = c * yb - s * xb;
            pt.z *= factor;
        }
        new_path.shift(&(-*ct * factor))
    }

    /// Mirrors along the chosen axes.
    pub fn mirror(&self, along_x: bool, along_y: bool, along_z: bool) -> Path {
        if !along_x && !along_y && !along_z {
            return self.clone();
        }
        let mut new_path = self.clone();
        for pt in &mut new_path.points {
            if along_x {
                pt.x = -pt.x;
            }
            if along_y {
                pt.y = -pt.y;
            }
            if along_z {
                pt.z = -pt.z;
            }
        }
        new_path
    }

    /// Rigid rotation by yaw (about z), pitch (about y) and roll (about x).
    /// The c component is preserved.
    pub fn rotate(&self, yaw: f64, pitch: f64, roll: f64, radians: bool) -> Path {
        let factor = if radians { 1.0 } else { std::f64::consts::PI / 180.0 };
        let (yaw_s, yaw_c) = (yaw * factor).sin_cos();
        let (pitch_s, pitch_c) = (pitch * factor).sin_cos();
        let (roll_s, roll_c) = (roll * factor).sin_cos();
        let mut new_path = Path::with_capacity(self.points.len());
        for p in &self.points {
            new_path.points.push(Point::new(
                yaw_c * pitch_c * p.x
                    + (yaw_c * pitch_s * roll_s - yaw_s * roll_c) * p.y
                    + (yaw_c * pitch_s * roll_c + yaw_s * roll_s) * p.z,
                yaw_s * pitch_c * p.x
                    + (yaw_s * pitch_s * roll_s + yaw_c * roll_c) * p.y
                    + (yaw_s * pitch_s * roll_c - yaw_c * roll_s) * p.z,
                -pitch_s * p.x + pitch_c * roll_s * p.y + pitch_c * roll_c * p.z,
                p.c,
            ));
        }
        new_path
    }

    /// Applies an affine transform to the cartesian coordinates, then
    /// reinserts the rotary component. Only the first three rows of the
    /// matrix are used.
    pub fn matrix_transform(&self, m: &Matrix4<f64>) -> Path {
        let mut new_path = self.clone();
        for pt in &mut new_path.points {
            let (s, c) = pt.c.to_radians().sin_cos();
            let xa = c * pt.x - s * pt.y;
            let ya = c * pt.y + s * pt.x;
            let xb = m[(0, 0)] * xa + m[(0, 1)] * ya + m[(0, 2)] * pt.z + m[(0, 3)];
            let yb = m[(1, 0)] * xa + m[(1, 1)] * ya + m[(1, 2)] * pt.z + m[(1, 3)];
            pt.z = m[(2, 0)] * xa + m[(2, 1)] * ya + m[(2, 2)] * pt.z + m[(2, 3)];
            pt.x = c * xb + s * yb;
            pt.y = c * yb - s * xb;
        }
        new_path
    }

    /// Grows the path away from its centroid so that the largest radius
    /// increases by `amount`.
    pub fn inflate(&self, amount: f64) -> Path {
        let rmax = self.get_largest_radius();
        self.scale((rmax + amount) / rmax, &self.get_centroid())
    }

    /// Offsets the closed outline of the path by `amount` (positive grows
    /// outward). Returns the boundary of the offset polygon; z and c of the
    /// result are zero.
    pub fn buffer(&self, amount: f64) -> Path {
        let ring = self.closed_coords();
        let loops = kernel::offset_ring(&ring, amount);
        // keep the dominant loop of the offset result
        let best = loops.into_iter().max_by(|a, b| {
            let area = |ring: &Vec<[f64; 2]>| {
                let mut sum = 0.0;
                for w in ring.windows(2) {
                    sum += w[0][0] * w[1][1] - w[1][0] * w[0][1];
                }
                sum.abs()
            };
            area(a).total_cmp(&area(b))
        });
        let mut new_path = Path::new();
        if let Some(ring) = best {
            for p in ring {
                new_path.points.push(Point::xy(p[0], p[1]));
            }
        }
        new_path
    }

    /// Convex hull of the closed outline, as exterior boundary paths.
    pub fn convex_hull(&self) -> Vec<Path> {
        let ls = kernel::line_string(&self.closed_coords());
        let hull = ls.convex_hull();
        let mut path = Path::new();
        for c in hull.exterior().coords() {
            path.points.push(Point::xy(c.x, c.y));
        }
        if path.is_empty() {
            vec![]
        } else {
            vec![path]
        }
    }

    /// Douglas-Peucker simplification with the given distance tolerance.
    /// Retained points keep their original z and c components.
    pub fn simplify(&self, tolerance: f64) -> Path {
        if self.points.len() < 3 {
            return self.clone();
        }
        let ls = kernel::line_string(&self.open_coords());
        let keep = ls.simplify_idx(&tolerance);
        let mut new_path = Path::with_capacity(keep.len());
        for i in keep {
            new_path.points.push(self.points[i]);
        }
        new_path
    }

    /// Resamples the cartesian polyline at an even spacing no larger than
    /// `dl`. The rotary component of the result is zero.
    pub fn interpolate(&self, dl: f64) -> Path {
        let coords = self.open_coords();
        let length = kernel::length_2d(&coords);
        let np = (length / dl).ceil();
        let dl = length / np;
        let mut new_path = Path::with_capacity(np as usize + 1);
        for n in 0..=(np as usize) {
            let c = kernel::extract_point(&coords, dl * n as f64);
            new_path.points.push(Point::new(c[0], c[1], c[2], 0.0));
        }
        new_path
    }

    /// Copy with every point projected to the cartesian frame.
    pub fn to_cartesian(&self) -> Path {
        Path {
            points: self.points.iter().map(|p| p.to_cartesian()).collect(),
        }
    }

    /// Copy in polar coordinates about the centroid: radius in x, unwrapped
    /// planar angle in c.
    pub fn to_polar(&self) -> Path {
        let rs = self.get_radii();
        let ts = self.get_angles(false);
        let mut new_path = Path::with_capacity(self.points.len());
        for (i, p) in self.points.iter().enumerate() {
            new_path.points.push(Point::new(rs[i], 0.0, p.z, ts[i]));
        }
        new_path
    }

    /// Copy projected onto a cylinder of the given radius along the x axis.
    pub fn to_cylindrical(&self, radius: f64) -> Path {
        Path {
            points: self.points.iter().map(|p| p.to_cylindrical(radius)).collect(),
        }
    }

    /// Finite-difference derivative d(first)/d(second) of the chosen
    /// component pair, evaluated in the cartesian frame. Interior points use
    /// a 3-point stencil on non-uniform spacing, the ends one-sided
    /// differences.
    pub fn divergence(&self, cmp: DivComponent) -> Result<Vec<f64>> {
        let n = self.points.len();
        if n <= 1 {
            return Err(Error::invalid("path must contain more than one point"));
        }
        if matches!(cmp, DivComponent::DxDx | DivComponent::DyDy | DivComponent::DzDz) {
            return Ok(vec![1.0; n]);
        }
        let cart = self.to_cartesian();
        let mut us = Vec::with_capacity(n);
        let mut ds = Vec::with_capacity(n);
        for p in &cart.points {
            let (u, d) = match cmp {
                DivComponent::DxDy => (p.x, p.y),
                DivComponent::DxDz => (p.x, p.z),
                DivComponent::DyDx => (p.y, p.x),
                DivComponent::DyDz => (p.y, p.z),
                DivComponent::DzDx => (p.z, p.x),
                DivComponent::DzDy => (p.z, p.y),
                _ => unreachable!(),
            };
            us.push(u);
            ds.push(d);
        }
        let mut div = Vec::with_capacity(n);
        div.push((us[1] - us[0]) / (ds[1] - ds[0]));
        for i in 1..n - 1 {
            let hs = ds[i] - ds[i - 1];
            let hd = ds[i + 1] - ds[i];
            let hs2 = hs * hs;
            let hd2 = hd * hd;
            div.push((hs2 * us[i + 1] + (hd2 - hs2) * us[i] - hd2 * us[i - 1]) / (hs * hd * (hs + hd)));
        }
        div.push((us[n - 1] - us[n - 2]) / (ds[n - 1] - ds[n - 2]));
        Ok(div)
    }

    /// Tangent angle of the cartesian polyline at each point.
    pub fn tangent_angle(&self, radians: bool) -> Result<Vec<f64>> {
        let n = self.points.len();
        if n <= 1 {
            return Err(Error::invalid("path must contain more than one point"));
        }
        let cart = self.to_cartesian();
        let p = &cart.points;
        let factor = if radians { 1.0 } else { 180.0 / std::f64::consts::PI };
        let mut grd = Vec::with_capacity(n);
        grd.push((p[1].y - p[0].y).atan2(p[1].x - p[0].x) * factor);
        for i in 1..n - 1 {
            let hs = p[i].x - p[i - 1].x;
            let hd = p[i + 1].x - p[i].x;
            let hs2 = hs * hs;
            let hd2 = hd * hd;
            grd.push(
                ((p[i].y - p[i - 1].y) * hd2 + (p[i + 1].y - p[i].y) * hs2)
                    .atan2((hd + hs) * hd * hs)
                    * factor,
            );
        }
        grd.push((p[n - 1].y - p[n - 2].y).atan2(p[n - 1].x - p[n - 2].x) * factor);
        Ok(grd)
    }

    /// Removes travel moves above the given height, inserting vertical
    /// plunge and retract points at the crossings. The rotary component is
    /// re-anchored at each crossing so that removed zones do not accumulate
    /// whole turns.
    pub fn simplify_above(&self, height: f64) -> Path {
        let n = self.points.len();
        if n == 0 {
            return self.clone();
        }
        let mut new_path = Path::new();
        let mut c_correction = 0.0;
        let mut last_c = self.points[0].c;
        let mut is_above = self.points[0].z > height;
        for i in 0..n - 1 {
            if self.points[i].z <= height {
                let mut p = self.points[i];
                p.c += c_correction;
                new_path.points.push(p);
                if self.points[i + 1].z > height && !is_above {
                    c_correction -= ((self.points[i].c - last_c) / 360.0).round() * 360.0;
                    last_c = self.points[i].c;
                    is_above = true;
                    new_path.points.push(Point::new(
                        self.points[i].x,
                        self.points[i].y,
                        self.points[i + 1].z,
                        self.points[i].c + c_correction,
                    ));
                }
            } else if self.points[i + 1].z <= height && is_above {
                c_correction -= ((self.points[i + 1].c - last_c) / 360.0).round() * 360.0;
                last_c = self.points[i + 1].c;
                is_above = false;
                new_path.points.push(Point::new(
                    self.points[i + 1].x,
                    self.points[i + 1].y,
                    self.points[i].z,
                    self.points[i + 1].c + c_correction,
                ));
            }
        }
        if self.points[n - 1].z <= height {
            let mut p = self.points[n - 1];
            p.c += c_correction;
            new_path.points.push(p);
        }
        new_path
    }

    /// Splits the path into runs of points at or below the given height.
    pub fn split_above(&self, height: f64) -> Vec<Path> {
        if self.points.is_empty() {
            return vec![];
        }
        let mut new_paths = Vec::new();
        let mut new_path = Path::new();
        let mut c_correction = 0.0;
        let mut create_new = false;
        let mut last_c = self.points[0].c;
        for p in &self.points {
            if p.z <= height {
                if create_new {
                    c_correction -= ((p.c - last_c) / 360.0).round() * 360.0;
                    last_c = p.c;
                    new_path = Path::new();
                    create_new = false;
                }
                let mut q = *p;
                q.c += c_correction;
                new_path.points.push(q);
            } else if !create_new {
                if !new_path.is_empty() {
                    new_paths.push(std::mem::take(&mut new_path));
                }
                create_new = true;
            }
        }
        if !create_new && !new_path.is_empty() {
            new_paths.push(new_path);
        }
        new_paths
    }

    /// Raises z around plunge/retract discontinuities to form ramps of the
    /// given height and length. `limit_height` separates cutting moves
    /// (at or below) from travel moves.
    pub fn create_ramps(
        &self,
        limit_height: f64,
        ramp_height: f64,
        ramp_length: f64,
        direction: RampDirection,
    ) -> Path {
        let n = self.points.len();
        if n < 2 {
            return self.clone();
        }
        let mut new_path = self.clone();
        let closed = self.is_closed();
        let mut disconts: Vec<usize> = Vec::new();
        if !closed && self.points[0].z <= limit_height {
            disconts.push(0);
        }
        for i in 0..n - 1 {
            if self.points[i + 1].z <= limit_height && self.points[i].z > limit_height {
                // backward ramp
                disconts.push(i + 1);
            } else if self.points[i + 1].z > limit_height && self.points[i].z <= limit_height {
                // forward ramp
                disconts.push(i);
            }
        }
        if !closed && self.points[n - 1].z <= limit_height {
            disconts.push(n - 1);
        }
        debug!(count = disconts.len(), "ramp discontinuities");

        for i in 0..disconts.len() {
            let d_idx = disconts[i];
            let mut disc_type = RampDirection::Both;
            if d_idx == 0 {
                disc_type = RampDirection::Backward;
            } else if self.points[d_idx - 1].z > limit_height {
                disc_type = RampDirection::Backward;
            } else if d_idx == n - 1 {
                disc_type = RampDirection::Forward;
            } else if self.points[d_idx + 1].z > limit_height {
                disc_type = RampDirection::Forward;
            }
            if direction != disc_type && direction != RampDirection::Both {
                continue;
            }

            // previous/next discontinuity bounds the ramp, never step over it
            let next_idx = if disc_type == RampDirection::Forward {
                let ni = if i > 0 { disconts[i - 1] } else { 0 };
                if ni > 0 && self.points[ni - 1].z <= limit_height {
                    continue;
                }
                ni
            } else {
                let ni = if i < disconts.len() - 1 {
                    disconts[i + 1]
                } else {
                    n - 1
                };
                if ni < n - 1 && self.points[ni + 1].z <= limit_height {
                    continue;
                }
                ni
            };
            if next_idx == d_idx {
                continue;
            }

            let increment: isize = if disc_type == RampDirection::Forward { -1 } else { 1 };
            let mut idx = d_idx as isize;
            let mut coords: Vec<[f64; 3]> = Vec::new();
            loop {
                let q = self.points[idx as usize].to_cartesian();
                coords.push([q.x, q.y, q.z]);
                let delta = kernel::length_2d(&coords);
                if delta >= ramp_length {
                    break;
                }
                let pt = &mut new_path.points[idx as usize];
                pt.z += ramp_height * (1.0 - delta / ramp_length);
                pt.z = pt.z.min(ramp_height);
                idx += increment;
                if increment < 0 && idx < next_idx as isize {
                    break;
                }
                if increment > 0 && idx > next_idx as isize {
                    break;
                }
            }
        }
        new_path
    }

    /// Backward ramps only.
    pub fn create_backward_ramps(&self, limit_height: f64, ramp_height: f64, ramp_length: f64) -> Path {
        self.create_ramps(limit_height, ramp_height, ramp_length, RampDirection::Backward)
    }

    /// Forward ramps only.
    pub fn create_forward_ramps(&self, limit_height: f64, ramp_height: f64, ramp_length: f64) -> Path {
        self.create_ramps(limit_height, ramp_height, ramp_length, RampDirection::Forward)
    }

    /// Rotates the point order so the path starts at the plunge
    /// discontinuity closest to `ref_point`. Closed paths stay closed; the
    /// rotary component is unwrapped after the rotation.
    pub fn rearrange(&self, limit_height: f64, ref_point: &Point) -> Path {
        let n = self.points.len();
        let mut discont = 0;
        let mut min_dist = f64::MAX;
        let closed = self.is_closed();
        let mut new_path = self.clone();
        if closed {
            new_path.points.pop();
        }
        for i in 0..n.saturating_sub(1) {
            if self.points[i].z >= limit_height && self.points[i + 1].z < limit_height {
                let cur_dist = self.points[i].distance_to(ref_point);
                if cur_dist < min_dist {
                    min_dist = cur_dist;
                    discont = i;
                }
            }
        }
        if discont > 0 {
            new_path.points.rotate_left(discont);
            for i in 1..new_path.points.len() {
                new_path.points[i].c = new_path.points[i - 1].c
                    + angle_norm(new_path.points[i].c - new_path.points[i - 1].c);
            }
        }
        if closed {
            if let Some(first) = new_path.points.first().copied() {
                new_path.points.push(first);
            }
        }
        new_path
    }
}

impl Index<usize> for Path {
    type Output = Point;
    fn index(&self, index: usize) -> &Point {
        &self.points[index]
    }
}

impl IndexMut<usize> for Path {
    fn index_mut(&mut self, index: usize) -> &mut Point {
        &mut self.points[index]
    }
}

impl From<Vec<Point>> for Path {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}

impl FromIterator<Point> for Path {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;
    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Concatenation. The rotary component of the appended points is unwrapped
/// against the last point of the receiver.
impl Add<&Path> for &Path {
    type Output = Path;
    fn add(self, q: &Path) -> Path {
        let np = self.points.len();
        let mut new_path = self.clone();
        new_path.points.reserve(q.points.len());
        for (i, p) in q.points.iter().enumerate() {
            new_path.points.push(*p);
            if np + i > 0 {
                let prev = new_path.points[np + i - 1].c;
                new_path.points[np + i].c = prev + angle_norm(p.c - prev);
            }
        }
        new_path
    }
}

/// Point append, with the same unwrapping as path concatenation.
impl Add<Point> for &Path {
    type Output = Path;
    fn add(self, q: Point) -> Path {
        let n = self.points.len();
        let mut new_path = self.clone();
        new_path.points.push(q);
        if n > 0 {
            let prev = new_path.points[n - 1].c;
            new_path.points[n].c = prev + angle_norm(q.c - prev);
        }
        new_path
    }
}

impl Neg for &Path {
    type Output = Path;
    fn neg(self) -> Path {
        Path {
            points: self.points.iter().map(|p| -*p).collect(),
        }
    }
}

/// Replication. Each repetition is unwrapped against the end of the
/// previous one.
impl Mul<usize> for &Path {
    type Output = Path;
    fn mul(self, n: usize) -> Path {
        let np = self.points.len();
        let mut new_path = Path::with_capacity(n * np);
        for i in 0..n {
            for q in &self.points {
                new_path.points.push(*q);
            }
            if i > 0 {
                for ip in 0..np {
                    let prev = new_path.points[i * np + ip - 1].c;
                    new_path.points[i * np + ip].c = prev + angle_norm(self.points[ip].c - prev);
                }
            }
        }
        new_path
    }
}
