// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis curves, parameter intervals and perpendicular frames.
//!
//! Beam axes are either straight lines or polylines. A line is parameterised
//! by arc length over `[0, length]`; a polyline with `n` vertices by vertex
//! index over `[0, n - 1]`, one unit per segment.

use nalgebra::{Point3, Vector3};

use crate::error::{Error, Result};
use crate::intersect::closest_point_on_segment;

/// Closed parameter interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    #[inline]
    pub fn mid(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    /// Inclusive containment, widened by `epsilon` on both sides.
    #[inline]
    pub fn includes(&self, t: f64, epsilon: f64) -> bool {
        t >= self.min - epsilon && t <= self.max + epsilon
    }

    #[inline]
    pub fn clamp(&self, t: f64) -> f64 {
        t.clamp(self.min, self.max)
    }
}

/// One end of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveEnd {
    Start,
    End,
}

impl CurveEnd {
    pub fn opposite(self) -> Self {
        match self {
            CurveEnd::Start => CurveEnd::End,
            CurveEnd::End => CurveEnd::Start,
        }
    }
}

/// Right-handed orthonormal frame. `z_axis` is the frame normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
    pub z_axis: Vector3<f64>,
}

impl Frame {
    /// Builds a frame with the given normal and an arbitrary but stable
    /// in-plane X axis. Returns `None` for a zero normal.
    pub fn from_normal(origin: Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        let z_axis = normal.try_normalize(1e-12)?;

        // Reference axis least parallel to the normal for a stable cross product
        let (ax, ay, az) = (z_axis.x.abs(), z_axis.y.abs(), z_axis.z.abs());
        let reference = if ax <= ay && ax <= az {
            Vector3::x()
        } else if ay <= az {
            Vector3::y()
        } else {
            Vector3::z()
        };

        let x_axis = reference.cross(&z_axis).normalize();
        let y_axis = z_axis.cross(&x_axis);
        Some(Self {
            origin,
            x_axis,
            y_axis,
            z_axis,
        })
    }

    /// Rotates the in-plane axes by `angle` radians about the frame normal.
    pub fn rotate_about_normal(&mut self, angle: f64) {
        let (sin, cos) = angle.sin_cos();
        let x = self.x_axis * cos + self.y_axis * sin;
        let y = self.y_axis * cos - self.x_axis * sin;
        self.x_axis = x;
        self.y_axis = y;
    }

    /// Signed angle from `from` to `to`, both projected into the frame plane,
    /// measured counter-clockwise about the frame normal.
    pub fn signed_angle(&self, from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
        let a = from - self.z_axis * from.dot(&self.z_axis);
        let b = to - self.z_axis * to.dot(&self.z_axis);
        a.cross(&b).dot(&self.z_axis).atan2(a.dot(&b))
    }

    #[inline]
    pub fn point_at(&self, u: f64, v: f64) -> Point3<f64> {
        self.origin + self.x_axis * u + self.y_axis * v
    }
}

/// A straight piece of a curve together with its parameter span.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment {
    pub t0: f64,
    pub t1: f64,
    pub a: Point3<f64>,
    pub b: Point3<f64>,
}

impl Segment {
    #[inline]
    pub fn param(&self, u: f64) -> f64 {
        self.t0 + u * (self.t1 - self.t0)
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }
}

/// Beam axis curve.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// Straight segment, domain `[0, length]`.
    Line { from: Point3<f64>, to: Point3<f64> },
    /// Polyline through at least two vertices, domain `[0, n - 1]`.
    Polyline(Vec<Point3<f64>>),
}

impl Curve {
    pub fn line(from: Point3<f64>, to: Point3<f64>) -> Self {
        Curve::Line { from, to }
    }

    /// Creates a polyline, dropping consecutive duplicate vertices.
    pub fn polyline(points: Vec<Point3<f64>>) -> Result<Self> {
        let mut cleaned: Vec<Point3<f64>> = Vec::with_capacity(points.len());
        for p in points {
            if cleaned.last().map_or(true, |last| (p - last).norm() > 1e-12) {
                cleaned.push(p);
            }
        }
        if cleaned.len() < 2 {
            return Err(Error::DegenerateGeometry(
                "polyline needs at least two distinct vertices".to_string(),
            ));
        }
        Ok(Curve::Polyline(cleaned))
    }

    /// Control vertices in curve order.
    pub fn vertices(&self) -> Vec<Point3<f64>> {
        match self {
            Curve::Line { from, to } => vec![*from, *to],
            Curve::Polyline(points) => points.clone(),
        }
    }

    pub(crate) fn segments(&self) -> Vec<Segment> {
        match self {
            Curve::Line { from, to } => vec![Segment {
                t0: 0.0,
                t1: (to - from).norm(),
                a: *from,
                b: *to,
            }],
            Curve::Polyline(points) => points
                .windows(2)
                .enumerate()
                .map(|(i, w)| Segment {
                    t0: i as f64,
                    t1: (i + 1) as f64,
                    a: w[0],
                    b: w[1],
                })
                .collect(),
        }
    }

    pub fn domain(&self) -> Interval {
        match self {
            Curve::Line { from, to } => Interval::new(0.0, (to - from).norm()),
            Curve::Polyline(points) => Interval::new(0.0, (points.len().max(1) - 1) as f64),
        }
    }

    pub fn length(&self) -> f64 {
        self.segments().iter().map(Segment::length).sum()
    }

    pub fn start(&self) -> Point3<f64> {
        match self {
            Curve::Line { from, .. } => *from,
            Curve::Polyline(points) => points.first().copied().unwrap_or_else(Point3::origin),
        }
    }

    pub fn end(&self) -> Point3<f64> {
        match self {
            Curve::Line { to, .. } => *to,
            Curve::Polyline(points) => points.last().copied().unwrap_or_else(Point3::origin),
        }
    }

    pub fn point_at_end(&self, end: CurveEnd) -> Point3<f64> {
        match end {
            CurveEnd::Start => self.start(),
            CurveEnd::End => self.end(),
        }
    }

    /// Segment index and local `[0, 1]` coordinate for a parameter.
    fn locate(&self, t: f64) -> (Segment, f64) {
        let segments = self.segments();
        let t = self.domain().clamp(t);
        let index = match self {
            Curve::Line { .. } => 0,
            Curve::Polyline(_) => (t.floor() as usize).min(segments.len().saturating_sub(1)),
        };
        // Fewer than two vertices: collapse onto the start point
        let Some(&seg) = segments.get(index) else {
            let p = self.start();
            return (Segment { t0: 0.0, t1: 0.0, a: p, b: p }, 0.0);
        };
        let span = seg.t1 - seg.t0;
        let u = if span > 0.0 { (t - seg.t0) / span } else { 0.0 };
        (seg, u.clamp(0.0, 1.0))
    }

    pub fn point_at(&self, t: f64) -> Point3<f64> {
        let (seg, u) = self.locate(t);
        seg.a + (seg.b - seg.a) * u
    }

    /// Unit tangent. At an interior polyline vertex the two adjacent segment
    /// directions are averaged.
    pub fn tangent_at(&self, t: f64) -> Vector3<f64> {
        let direction = |a: &Point3<f64>, b: &Point3<f64>| {
            (b - a).try_normalize(1e-15).unwrap_or_else(Vector3::zeros)
        };

        if let Curve::Polyline(points) = self {
            let t = self.domain().clamp(t);
            let rounded = t.round();
            let index = rounded as usize;
            if (t - rounded).abs() < 1e-9 && index > 0 && index + 1 < points.len() {
                let incoming = direction(&points[index - 1], &points[index]);
                let outgoing = direction(&points[index], &points[index + 1]);
                return (incoming + outgoing)
                    .try_normalize(1e-15)
                    .unwrap_or(outgoing);
            }
        }

        let (seg, _) = self.locate(t);
        direction(&seg.a, &seg.b)
    }

    pub fn tangent_at_end(&self, end: CurveEnd) -> Vector3<f64> {
        let domain = self.domain();
        match end {
            CurveEnd::Start => self.tangent_at(domain.min),
            CurveEnd::End => self.tangent_at(domain.max),
        }
    }

    /// Frame at `t` whose normal is the curve tangent.
    pub fn perpendicular_frame_at(&self, t: f64) -> Option<Frame> {
        Frame::from_normal(self.point_at(t), self.tangent_at(t))
    }

    /// Arc length from the curve start to parameter `t`.
    pub fn length_at(&self, t: f64) -> f64 {
        let t = self.domain().clamp(t);
        let mut length = 0.0;
        for seg in self.segments() {
            if t >= seg.t1 {
                length += seg.length();
            } else {
                let span = seg.t1 - seg.t0;
                if span > 0.0 && t > seg.t0 {
                    length += seg.length() * (t - seg.t0) / span;
                }
                break;
            }
        }
        length
    }

    /// Parameter at arc length `s` from the start, clamped to the curve.
    pub fn parameter_at_length(&self, s: f64) -> f64 {
        let mut remaining = s.max(0.0);
        let segments = self.segments();
        for seg in &segments {
            let len = seg.length();
            if remaining <= len {
                let u = if len > 0.0 { remaining / len } else { 0.0 };
                return seg.param(u);
            }
            remaining -= len;
        }
        self.domain().max
    }

    /// Arc length between `t` and the given end.
    pub fn length_from_end(&self, t: f64, end: CurveEnd) -> f64 {
        match end {
            CurveEnd::Start => self.length_at(t),
            CurveEnd::End => self.length() - self.length_at(t),
        }
    }

    /// End whose half of the domain contains `t`.
    pub fn closest_end(&self, t: f64) -> CurveEnd {
        if t <= self.domain().mid() {
            CurveEnd::Start
        } else {
            CurveEnd::End
        }
    }

    /// `count + 1` parameters dividing the curve into `count` pieces of equal
    /// arc length, both ends included.
    pub fn divide_by_count(&self, count: usize) -> Vec<f64> {
        let count = count.max(1);
        let length = self.length();
        let domain = self.domain();
        let mut params: Vec<f64> = (0..=count)
            .map(|i| self.parameter_at_length(length * i as f64 / count as f64))
            .collect();
        params[0] = domain.min;
        params[count] = domain.max;
        params
    }

    /// Parameters of polyline vertices strictly inside the domain.
    pub fn interior_vertex_parameters(&self) -> Vec<f64> {
        match self {
            Curve::Line { .. } => Vec::new(),
            Curve::Polyline(points) => (1..points.len().saturating_sub(1))
                .map(|i| i as f64)
                .collect(),
        }
    }

    /// Parameter of the curve point closest to `point`.
    pub fn closest_parameter(&self, point: &Point3<f64>) -> f64 {
        let mut best = (f64::INFINITY, self.domain().min);
        for seg in self.segments() {
            let (u, closest) = closest_point_on_segment(point, &seg.a, &seg.b);
            let dist_sq = (closest - point).norm_squared();
            if dist_sq < best.0 {
                best = (dist_sq, seg.param(u));
            }
        }
        best.1
    }

    /// A curve is closed when it has at least three segments and its ends
    /// coincide within `tolerance`.
    pub fn is_closed(&self, tolerance: f64) -> bool {
        match self {
            Curve::Line { .. } => false,
            Curve::Polyline(points) => {
                points.len() >= 4 && (points[0] - points[points.len() - 1]).norm() <= tolerance
            }
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            Curve::Line { from, to } => Curve::Line {
                from: *to,
                to: *from,
            },
            Curve::Polyline(points) => Curve::Polyline(points.iter().rev().copied().collect()),
        }
    }

    /// Chains curves whose endpoints coincide within `tolerance` into
    /// polylines. Curves are reversed as needed; input order decides which
    /// chain a curve joins first.
    pub fn join(curves: &[Curve], tolerance: f64) -> Vec<Curve> {
        let mut used = vec![false; curves.len()];
        let mut joined = Vec::new();

        for seed in 0..curves.len() {
            if used[seed] {
                continue;
            }
            used[seed] = true;
            let mut chain = curves[seed].vertices();

            loop {
                let mut extended = false;
                for (i, curve) in curves.iter().enumerate() {
                    if used[i] {
                        continue;
                    }
                    // Closed chains take no further pieces
                    let head = chain[0];
                    let tail = chain[chain.len() - 1];
                    if chain.len() >= 4 && (head - tail).norm() <= tolerance {
                        break;
                    }

                    let verts = curve.vertices();
                    let first = verts[0];
                    let last = verts[verts.len() - 1];
                    if (first - tail).norm() <= tolerance {
                        chain.extend(verts.iter().skip(1));
                    } else if (last - tail).norm() <= tolerance {
                        chain.extend(verts.iter().rev().skip(1));
                    } else if (last - head).norm() <= tolerance {
                        let mut prefix: Vec<_> = verts[..verts.len() - 1].to_vec();
                        prefix.extend(chain);
                        chain = prefix;
                    } else if (first - head).norm() <= tolerance {
                        let mut prefix: Vec<_> = verts.iter().skip(1).rev().copied().collect();
                        prefix.extend(chain);
                        chain = prefix;
                    } else {
                        continue;
                    }
                    used[i] = true;
                    extended = true;
                }
                if !extended {
                    break;
                }
            }

            joined.push(Curve::Polyline(chain));
        }

        joined
    }
}
