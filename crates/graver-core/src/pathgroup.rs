//! Ordered collections of paths.
//!
//! A path group models one milling job: its paths are machined in order.
//! Most operations lift the corresponding [`Path`] operation member-wise;
//! the group-level operations (sorting, steps, envelope) reason about the
//! relationship between paths.

use std::ops::{Add, Index, IndexMut, Mul};

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::math::angle_norm;
use crate::path::{Path, RampDirection};
use crate::point::Point;
use crate::surface::Surface;

/// Distance predicate used by [`PathGroup::sort_paths`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPredicate {
    /// Distance between the start points of consecutive paths.
    StartToStart,
    /// Distance from the end of a path to the start of the next.
    EndToStart,
    /// Distance between the end points of consecutive paths.
    EndToEnd,
}

/// An ordered collection of paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathGroup {
    paths: Vec<Path>,
}

impl PathGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn push(&mut self, path: Path) {
        self.paths.push(path);
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Path> {
        self.paths.iter()
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Member-wise cartesian projection.
    pub fn to_cartesian(&self) -> PathGroup {
        self.map(|p| p.to_cartesian())
    }

    /// Member-wise polar projection.
    pub fn to_polar(&self) -> PathGroup {
        self.map(|p| p.to_polar())
    }

    /// Member-wise cylindrical projection.
    pub fn to_cylindrical(&self, radius: f64) -> PathGroup {
        self.map(|p| p.to_cylindrical(radius))
    }

    /// Outline of the merged area covered by the paths of the group.
    pub fn get_envelope(&self) -> Vec<Path> {
        let mut paths = Vec::new();
        for s in Surface::from_paths(self.paths.clone(), vec![]).combine() {
            paths.extend(s.contours().iter().cloned());
        }
        paths
    }

    /// Deltas between the start points of consecutive paths.
    pub fn get_steps(&self) -> Vec<Point> {
        let mut steps = Vec::with_capacity(self.paths.len().saturating_sub(1));
        for i in 1..self.paths.len() {
            steps.push(self.paths[i][0] - self.paths[i - 1][0]);
        }
        steps
    }

    /// Rewrites the start-point deltas in place: path `i` is translated so
    /// that its start sits at `steps[i-1]` from the start of path `i-1`.
    /// Extra steps are ignored, missing ones leave the tail untouched.
    pub fn set_steps(&mut self, steps: &[Point]) {
        if self.paths.len() < 2 || steps.is_empty() {
            return;
        }
        let ns = (self.paths.len() - 1).min(steps.len());
        for i in 1..=ns {
            if self.paths[i].is_empty() || self.paths[i - 1].is_empty() {
                continue;
            }
            let dp = self.paths[i][0] - self.paths[i - 1][0];
            let delta = steps[i - 1] - dp;
            for pt in self.paths[i].iter_mut() {
                *pt += delta;
            }
        }
    }

    /// Largest distance from any path centroid to one of its points.
    pub fn get_radius(&self) -> f64 {
        let mut rmax: f64 = 0.0;
        for p in &self.paths {
            for r in p.get_radii() {
                rmax = rmax.max(r);
            }
        }
        rmax
    }

    /// Centroid of the area covered by the group.
    pub fn get_centroid(&self) -> Point {
        Surface::from_paths(self.paths.clone(), vec![]).get_centroid()
    }

    pub fn shift(&self, pt: &Point) -> PathGroup {
        self.map(|p| p.shift(pt))
    }

    pub fn scale(&self, factor: f64, ct: &Point) -> PathGroup {
        self.map(|p| p.scale(factor, ct))
    }

    /// Scales the group so that its radius becomes `target_size`.
    pub fn scale_to_size(&self, target_size: f64, ct: &Point) -> PathGroup {
        self.scale(target_size / self.get_radius(), ct)
    }

    pub fn mirror(&self, along_x: bool, along_y: bool, along_z: bool) -> PathGroup {
        self.map(|p| p.mirror(along_x, along_y, along_z))
    }

    pub fn rotate(&self, yaw: f64, pitch: f64, roll: f64, radians: bool) -> PathGroup {
        self.map(|p| p.rotate(yaw, pitch, roll, radians))
    }

    pub fn matrix_transform(&self, m: &Matrix4<f64>) -> PathGroup {
        self.map(|p| p.matrix_transform(m))
    }

    pub fn inflate(&self, amount: f64) -> PathGroup {
        self.map(|p| p.inflate(amount))
    }

    pub fn buffer(&self, amount: f64) -> PathGroup {
        self.map(|p| p.buffer(amount))
    }

    pub fn simplify(&self, tolerance: f64) -> PathGroup {
        self.map(|p| p.simplify(tolerance))
    }

    pub fn interpolate(&self, dl: f64) -> PathGroup {
        self.map(|p| p.interpolate(dl))
    }

    pub fn flip(&self) -> PathGroup {
        self.map(|p| p.flip())
    }

    /// Member-wise [`Path::simplify_above`]. Paths that had no point at or
    /// below the height are discarded.
    pub fn simplify_above(&self, height: f64) -> PathGroup {
        let mut new_group = PathGroup::new();
        for p in &self.paths {
            let new_path = p.simplify_above(height);
            let below = p.iter().filter(|pt| pt.z <= height).count();
            if below > 0 {
                new_group.paths.push(new_path);
            }
        }
        new_group
    }

    /// Member-wise [`Path::split_above`], flattened into one group.
    pub fn split_above(&self, height: f64) -> PathGroup {
        let mut new_group = PathGroup::new();
        for p in &self.paths {
            new_group.paths.extend(p.split_above(height));
        }
        new_group
    }

    pub fn create_ramps(
        &self,
        limit_height: f64,
        ramp_height: f64,
        ramp_length: f64,
        direction: RampDirection,
    ) -> PathGroup {
        self.map(|p| p.create_ramps(limit_height, ramp_height, ramp_length, direction))
    }

    pub fn create_forward_ramps(&self, limit_height: f64, ramp_height: f64, ramp_length: f64) -> PathGroup {
        self.create_ramps(limit_height, ramp_height, ramp_length, RampDirection::Forward)
    }

    pub fn create_backward_ramps(&self, limit_height: f64, ramp_height: f64, ramp_length: f64) -> PathGroup {
        self.create_ramps(limit_height, ramp_height, ramp_length, RampDirection::Backward)
    }

    /// Greedy nearest-neighbour ordering of the paths, starting from the
    /// path whose start is closest to `ref_point`. After ordering, the
    /// rotary component of each path is shifted by whole turns so that
    /// consecutive start angles stay within a half turn of each other.
    pub fn sort_paths(&self, ref_point: &Point, predicate: SortPredicate) -> PathGroup {
        let n = self.paths.len();
        if n == 0 {
            return PathGroup::new();
        }
        let mut min_dist = f64::MAX;
        let mut start = 0;
        for (i, p) in self.paths.iter().enumerate() {
            let cur_dist = p[0].distance_to(ref_point);
            if cur_dist < min_dist {
                min_dist = cur_dist;
                start = i;
                if min_dist == 0.0 {
                    break;
                }
            }
        }
        let mut new_group = PathGroup::new();
        let mut unassigned: Vec<&Path> = Vec::with_capacity(n - 1);
        for (i, p) in self.paths.iter().enumerate() {
            if i == start {
                new_group.paths.push(p.clone());
            } else {
                unassigned.push(p);
            }
        }
        let mut p0 = &self.paths[start];
        while !unassigned.is_empty() {
            let mut min_dist = f64::MAX;
            let mut pmin = 0;
            for (i, p) in unassigned.iter().enumerate() {
                let cur_dist = match predicate {
                    SortPredicate::StartToStart => p0[0].distance_to(&p[0]),
                    SortPredicate::EndToStart => p0[p0.len() - 1].distance_to(&p[0]),
                    SortPredicate::EndToEnd => p0[p0.len() - 1].distance_to(&p[p.len() - 1]),
                };
                if cur_dist <= min_dist {
                    min_dist = cur_dist;
                    pmin = i;
                    if min_dist == 0.0 {
                        break;
                    }
                }
            }
            p0 = unassigned.remove(pmin);
            new_group.paths.push(p0.clone());
        }
        // chain start angles: add whole turns so consecutive starts stay close
        for i in 1..n {
            let prev = new_group.paths[i - 1][0].c;
            let cur = new_group.paths[i][0].c;
            let dangle = prev - cur + angle_norm(cur - prev);
            for pt in new_group.paths[i].iter_mut() {
                pt.c += dangle;
            }
        }
        debug!(paths = n, "sorted path group");
        new_group
    }

    /// Masks the group against a surface; see [`Surface::correct_height`].
    pub fn correct_height(
        &self,
        surface: &Surface,
        clearance: f64,
        safe_height: f64,
        outside: bool,
        fix_contours: bool,
    ) -> PathGroup {
        surface.correct_height_group(self, clearance, safe_height, outside, fix_contours)
    }

    /// Member-wise [`Path::rearrange`], chaining the reference point: each
    /// path starts near where the previous one starts.
    pub fn rearrange(&self, limit_height: f64) -> PathGroup {
        let mut new_group = PathGroup::new();
        if self.paths.is_empty() {
            return new_group;
        }
        let mut ref_point = self.paths[0].first().copied().unwrap_or_default();
        for p in &self.paths {
            let new_path = p.rearrange(limit_height, &ref_point);
            if let Some(first) = new_path.first() {
                ref_point = *first;
            }
            new_group.paths.push(new_path);
        }
        new_group
    }

    /// Reorders (and possibly duplicates or drops) paths by index.
    pub fn reorder(&self, order: &[usize]) -> Result<PathGroup> {
        let n = self.paths.len();
        let mut new_group = PathGroup::new();
        for &i in order {
            if i >= n {
                return Err(Error::OutOfRange { index: i, len: n });
            }
            new_group.paths.push(self.paths[i].clone());
        }
        Ok(new_group)
    }

    fn map(&self, f: impl Fn(&Path) -> Path) -> PathGroup {
        PathGroup {
            paths: self.paths.iter().map(f).collect(),
        }
    }
}

impl Index<usize> for PathGroup {
    type Output = Path;
    fn index(&self, index: usize) -> &Path {
        &self.paths[index]
    }
}

impl IndexMut<usize> for PathGroup {
    fn index_mut(&mut self, index: usize) -> &mut Path {
        &mut self.paths[index]
    }
}

impl From<Vec<Path>> for PathGroup {
    fn from(paths: Vec<Path>) -> Self {
        Self { paths }
    }
}

impl FromIterator<Path> for PathGroup {
    fn from_iter<T: IntoIterator<Item = Path>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PathGroup {
    type Item = &'a Path;
    type IntoIter = std::slice::Iter<'a, Path>;
    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl Add<&PathGroup> for &PathGroup {
    type Output = PathGroup;
    fn add(self, q: &PathGroup) -> PathGroup {
        let mut new_group = self.clone();
        new_group.paths.extend(q.paths.iter().cloned());
        new_group
    }
}

impl Add<&Path> for &PathGroup {
    type Output = PathGroup;
    fn add(self, q: &Path) -> PathGroup {
        let mut new_group = self.clone();
        new_group.paths.push(q.clone());
        new_group
    }
}

impl Mul<usize> for &PathGroup {
    type Output = PathGroup;
    fn mul(self, n: usize) -> PathGroup {
        let mut new_group = PathGroup::new();
        new_group.paths.reserve(n * self.paths.len());
        for _ in 0..n {
            new_group.paths.extend(self.paths.iter().cloned());
        }
        new_group
    }
}
