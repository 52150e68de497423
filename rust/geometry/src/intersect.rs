// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curve/curve and curve/solid intersection.

use nalgebra::{Point3, Vector3};

use crate::curve::Curve;
use crate::solid::Solid;

/// Intersection event between two curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveIntersection {
    /// The curves meet (within tolerance) at a single location.
    Point {
        point_a: Point3<f64>,
        point_b: Point3<f64>,
        param_a: f64,
        param_b: f64,
    },
    /// The curves run along each other over a parameter range.
    Overlap {
        start_a: f64,
        end_a: f64,
        start_b: f64,
        end_b: f64,
    },
}

impl CurveIntersection {
    pub fn is_point(&self) -> bool {
        matches!(self, CurveIntersection::Point { .. })
    }

    /// Location on curve A for point events.
    pub fn point_a(&self) -> Option<Point3<f64>> {
        match self {
            CurveIntersection::Point { point_a, .. } => Some(*point_a),
            CurveIntersection::Overlap { .. } => None,
        }
    }
}

/// Closest point on segment `ab` to `p`, with its `[0, 1]` coordinate.
pub fn closest_point_on_segment(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> (f64, Point3<f64>) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-30 {
        return (0.0, *a);
    }
    let u = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (u, a + ab * u)
}

/// Closest points between segments `p1q1` and `p2q2` (Ericson, RTCD 5.1.9).
/// Returns `(s, t, c1, c2)` with `c1 = p1 + s (q1 - p1)`, `c2 = p2 + t (q2 - p2)`.
pub fn closest_points_between_segments(
    p1: &Point3<f64>,
    q1: &Point3<f64>,
    p2: &Point3<f64>,
    q2: &Point3<f64>,
) -> (f64, f64, Point3<f64>, Point3<f64>) {
    const EPS: f64 = 1e-30;
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t) = if a <= EPS && e <= EPS {
        (0.0, 0.0)
    } else if a <= EPS {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= EPS {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPS {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (s, t, p1 + d1 * s, p2 + d2 * t)
}

/// Intersects two curves segment by segment.
///
/// Segments closer than `tolerance` produce a point event. Collinear
/// segments sharing more than `overlap_tolerance` of length produce an
/// overlap event instead. Events closer than `tolerance` to an earlier event
/// (a hit on a shared polyline vertex) are dropped.
pub fn intersect_curves(
    a: &Curve,
    b: &Curve,
    tolerance: f64,
    overlap_tolerance: f64,
) -> Vec<CurveIntersection> {
    let mut events: Vec<CurveIntersection> = Vec::new();

    for sa in a.segments() {
        for sb in b.segments() {
            if let Some(overlap) = segment_overlap(&sa, &sb, tolerance, overlap_tolerance) {
                events.push(overlap);
                continue;
            }

            let (s, t, ca, cb) = closest_points_between_segments(&sa.a, &sa.b, &sb.a, &sb.b);
            if (ca - cb).norm() > tolerance {
                continue;
            }

            let duplicate = events.iter().any(|event| match event {
                CurveIntersection::Point { point_a, .. } => (point_a - ca).norm() <= tolerance,
                CurveIntersection::Overlap { .. } => false,
            });
            if !duplicate {
                events.push(CurveIntersection::Point {
                    point_a: ca,
                    point_b: cb,
                    param_a: sa.param(s),
                    param_b: sb.param(t),
                });
            }
        }
    }

    events
}

/// Overlap event for two collinear segments sharing more than
/// `overlap_tolerance` of length.
fn segment_overlap(
    sa: &crate::curve::Segment,
    sb: &crate::curve::Segment,
    tolerance: f64,
    overlap_tolerance: f64,
) -> Option<CurveIntersection> {
    let da = sa.b - sa.a;
    let len_a = da.norm();
    if len_a < 1e-15 || sb.length() < 1e-15 {
        return None;
    }
    let dir = da / len_a;

    // Both endpoints of B must lie on the infinite line through A
    let off_line = |p: &Point3<f64>| {
        let v = p - sa.a;
        (v - dir * v.dot(&dir)).norm()
    };
    if off_line(&sb.a) > tolerance || off_line(&sb.b) > tolerance {
        return None;
    }

    let pb0 = (sb.a - sa.a).dot(&dir);
    let pb1 = (sb.b - sa.a).dot(&dir);
    let lo = pb0.min(pb1).max(0.0);
    let hi = pb0.max(pb1).min(len_a);
    if hi - lo <= overlap_tolerance.max(tolerance) {
        return None;
    }

    let param_on_b = |along: f64| {
        let p = sa.a + dir * along;
        let (u, _) = closest_point_on_segment(&p, &sb.a, &sb.b);
        sb.param(u)
    };

    Some(CurveIntersection::Overlap {
        start_a: sa.param(lo / len_a),
        end_a: sa.param(hi / len_a),
        start_b: param_on_b(lo),
        end_b: param_on_b(hi),
    })
}

/// Möller–Trumbore segment/triangle test. Returns the segment coordinate in
/// `[0, 1]` of the hit.
pub fn segment_triangle(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &[Point3<f64>; 3],
) -> Option<f64> {
    const EPS: f64 = 1e-14;
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let h = direction.cross(&e2);
    let det = e1.dot(&h);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - tri[0];
    let u = inv * s.dot(&h);
    if !(-1e-12..=1.0 + 1e-12).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = inv * direction.dot(&q);
    if v < -1e-12 || u + v > 1.0 + 1e-12 {
        return None;
    }
    let t = inv * e2.dot(&q);
    Some(t)
}

/// Parameters where `curve` crosses the surface of `solid`, ascending.
/// Hits whose points lie within `tolerance` of each other are merged.
pub fn intersect_curve_solid(curve: &Curve, solid: &Solid, tolerance: f64) -> Vec<f64> {
    let mut hits: Vec<(f64, Point3<f64>)> = Vec::new();

    for seg in curve.segments() {
        let direction = seg.b - seg.a;
        for tri in solid.triangle_points() {
            if let Some(u) = segment_triangle(&seg.a, &direction, &tri) {
                if (-1e-12..=1.0 + 1e-12).contains(&u) {
                    let u = u.clamp(0.0, 1.0);
                    hits.push((seg.param(u), seg.a + direction * u));
                }
            }
        }
    }

    hits.sort_by(|x, y| x.0.total_cmp(&y.0));
    let mut params: Vec<f64> = Vec::with_capacity(hits.len());
    let mut last: Option<Point3<f64>> = None;
    for (t, p) in hits {
        if last.map_or(true, |q| (p - q).norm() > tolerance) {
            params.push(t);
            last = Some(p);
        }
    }
    params
}
