//! Parser for curve command strings (the `d` attribute of `<path>`).
//!
//! Supports the full command set M/L/H/V/C/S/Q/T/A/Z in absolute and
//! relative form, including implicit command repetition ("M 1 2 3 4" reads
//! as a move followed by a line). Quadratic commands are converted to cubic
//! segments by exact degree elevation, so the segment model stays at three
//! variants.

use regex::Regex;
use tracing::debug;

use crate::error::{Result, SvgError};
use crate::segment::{Arc, CubicBezier, Line, Segment};

/// Argument count per command letter.
fn arity(command: char) -> usize {
    match command {
        'M' | 'm' | 'L' | 'l' | 'T' | 't' => 2,
        'H' | 'h' | 'V' | 'v' => 1,
        'S' | 's' | 'Q' | 'q' => 4,
        'C' | 'c' => 6,
        'A' | 'a' => 7,
        _ => 0,
    }
}

/// Cubic control points equivalent to a quadratic curve through `q`.
fn elevate(p0: [f64; 2], q: [f64; 2], p3: [f64; 2]) -> ([f64; 2], [f64; 2]) {
    let c1 = [
        p0[0] + 2.0 / 3.0 * (q[0] - p0[0]),
        p0[1] + 2.0 / 3.0 * (q[1] - p0[1]),
    ];
    let c2 = [
        p3[0] + 2.0 / 3.0 * (q[0] - p3[0]),
        p3[1] + 2.0 / 3.0 * (q[1] - p3[1]),
    ];
    (c1, c2)
}

/// Reflection of `ctrl` through `p`.
fn reflect(p: [f64; 2], ctrl: [f64; 2]) -> [f64; 2] {
    [2.0 * p[0] - ctrl[0], 2.0 * p[1] - ctrl[1]]
}

/// A complex curve assembled from elementary segments.
#[derive(Debug, Clone, Default)]
pub struct Curve {
    segments: Vec<Segment>,
    is_closed: bool,
}

impl Curve {
    /// Parses a curve command string, e.g. "M 10,10 L 5,0" or "M10 10l3 5".
    pub fn parse(data: &str) -> Result<Self> {
        let command_re = Regex::new(r"([MmLlHhVvCcSsQqTtAaZz])([^MmLlHhVvCcSsQqTtAaZz]*)")
            .expect("invalid command regex");
        let number_re = Regex::new(r"[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?")
            .expect("invalid number regex");

        let mut segments: Vec<Segment> = Vec::new();
        let mut current = ' ';
        let mut previous = ' ';
        let mut p0 = [0.0, 0.0];
        // trailing control points feeding the smooth commands
        let mut cubic_ctrl = [0.0, 0.0];
        let mut quad_ctrl = [0.0, 0.0];

        for caps in command_re.captures_iter(data) {
            current = caps[1].as_bytes()[0] as char;
            let args: Vec<f64> = number_re
                .find_iter(&caps[2])
                .map(|m| {
                    m.as_str()
                        .parse::<f64>()
                        .map_err(|_| SvgError::curve(format!("bad number '{}'", m.as_str())))
                })
                .collect::<Result<_>>()?;

            let mut i = 0;
            while i < args.len() {
                let n = arity(current);
                if i + n > args.len() {
                    return Err(SvgError::curve(format!(
                        "truncated arguments for command '{current}'"
                    )));
                }
                let relative = current.is_ascii_lowercase();
                let mut p1 = p0;
                match current {
                    'M' | 'm' => {
                        p1 = [args[i], args[i + 1]];
                        if relative {
                            p1 = [p1[0] + p0[0], p1[1] + p0[1]];
                        }
                        // implicit repeats of a move are lines
                        current = if current == 'M' { 'L' } else { 'l' };
                    }
                    'L' | 'l' => {
                        p1 = [args[i], args[i + 1]];
                        if relative {
                            p1 = [p1[0] + p0[0], p1[1] + p0[1]];
                        }
                        segments.push(Segment::Line(Line::new(p0, p1)));
                    }
                    'H' | 'h' => {
                        p1 = [args[i], p0[1]];
                        if relative {
                            p1[0] += p0[0];
                        }
                        segments.push(Segment::Line(Line::new(p0, p1)));
                    }
                    'V' | 'v' => {
                        p1 = [p0[0], args[i]];
                        if relative {
                            p1[1] += p0[1];
                        }
                        segments.push(Segment::Line(Line::new(p0, p1)));
                    }
                    'C' | 'c' => {
                        let mut c1 = [args[i], args[i + 1]];
                        let mut c2 = [args[i + 2], args[i + 3]];
                        p1 = [args[i + 4], args[i + 5]];
                        if relative {
                            c1 = [c1[0] + p0[0], c1[1] + p0[1]];
                            c2 = [c2[0] + p0[0], c2[1] + p0[1]];
                            p1 = [p1[0] + p0[0], p1[1] + p0[1]];
                        }
                        segments.push(Segment::CubicBezier(CubicBezier::new(p0, c1, c2, p1)));
                        cubic_ctrl = c2;
                    }
                    'S' | 's' => {
                        let c1 = if matches!(previous, 'C' | 'c' | 'S' | 's') {
                            reflect(p0, cubic_ctrl)
                        } else {
                            p0
                        };
                        let mut c2 = [args[i], args[i + 1]];
                        p1 = [args[i + 2], args[i + 3]];
                        if relative {
                            c2 = [c2[0] + p0[0], c2[1] + p0[1]];
                            p1 = [p1[0] + p0[0], p1[1] + p0[1]];
                        }
                        segments.push(Segment::CubicBezier(CubicBezier::new(p0, c1, c2, p1)));
                        cubic_ctrl = c2;
                    }
                    'Q' | 'q' => {
                        let mut q = [args[i], args[i + 1]];
                        p1 = [args[i + 2], args[i + 3]];
                        if relative {
                            q = [q[0] + p0[0], q[1] + p0[1]];
                            p1 = [p1[0] + p0[0], p1[1] + p0[1]];
                        }
                        let (c1, c2) = elevate(p0, q, p1);
                        segments.push(Segment::CubicBezier(CubicBezier::new(p0, c1, c2, p1)));
                        quad_ctrl = q;
                    }
                    'T' | 't' => {
                        let q = if matches!(previous, 'Q' | 'q' | 'T' | 't') {
                            reflect(p0, quad_ctrl)
                        } else {
                            p0
                        };
                        p1 = [args[i], args[i + 1]];
                        if relative {
                            p1 = [p1[0] + p0[0], p1[1] + p0[1]];
                        }
                        let (c1, c2) = elevate(p0, q, p1);
                        segments.push(Segment::CubicBezier(CubicBezier::new(p0, c1, c2, p1)));
                        quad_ctrl = q;
                    }
                    'A' | 'a' => {
                        let radii = [args[i], args[i + 1]];
                        let tilt = args[i + 2].to_radians();
                        let large_arc = args[i + 3] != 0.0;
                        let sweep = args[i + 4] != 0.0;
                        p1 = [args[i + 5], args[i + 6]];
                        if relative {
                            p1 = [p1[0] + p0[0], p1[1] + p0[1]];
                        }
                        if radii[0] != 0.0 && radii[1] != 0.0 {
                            segments.push(Segment::Arc(Arc::from_endpoints(
                                p0, p1, radii, tilt, large_arc, sweep,
                            )?));
                        } else {
                            // a degenerate radius would call for a line per the
                            // TR; such arcs are dropped instead
                            debug!("dropping zero-radius arc segment");
                        }
                    }
                    _ => {}
                }
                previous = current;
                p0 = p1;
                i += n.max(1);
            }
        }

        let mut is_closed = false;
        if matches!(current, 'Z' | 'z') && !segments.is_empty() {
            let from = segments[segments.len() - 1].point(1.0);
            let to = segments[0].point(0.0);
            segments.push(Segment::Line(Line::new(from, to)));
            is_closed = true;
        }
        Ok(Self {
            segments,
            is_closed,
        })
    }

    /// The elementary segments of the curve, in drawing order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the curve ended with a close command.
    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    /// Resamples the whole curve with constant step size `dl`. Each segment
    /// contributes its start but not its end point; the final end point is
    /// appended for open curves only.
    pub fn interpolate(&self, dl: f64) -> Vec<[f64; 2]> {
        let mut points = Vec::new();
        for seg in &self.segments {
            points.extend(seg.interpolate(dl));
        }
        if !self.is_closed {
            if let Some(last) = self.segments.last() {
                points.push(last.point(1.0));
            }
        }
        points
    }
}
