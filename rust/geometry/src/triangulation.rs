// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar loop triangulation for section and cut caps.
//!
//! Wrapper around earcutr. Loops are projected into a basis whose normal is
//! the requested face normal so that the returned triangles wind
//! counter-clockwise around it.

use crate::{Error, Point2, Point3, Result, Vector3};

/// Triangulates a simple 2D polygon. Returns indices into `points`.
#[inline]
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    // FAST PATH: Triangle - no triangulation needed
    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }

    let mut vertices = Vec::with_capacity(n * 2);
    for p in points {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    let indices = earcutr::earcut(&vertices, &[], 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    if indices.is_empty() {
        return Err(Error::TriangulationError(
            "polygon produced no triangles".to_string(),
        ));
    }

    Ok(indices)
}

/// In-plane basis `(u, v)` with `u × v = normal`.
pub fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let reference = if ax <= ay && ax <= az {
        Vector3::new(1.0, 0.0, 0.0)
    } else if ay <= az {
        Vector3::new(0.0, 1.0, 0.0)
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    };

    let u_axis = reference.cross(normal).normalize();
    let v_axis = normal.cross(&u_axis).normalize();
    (u_axis, v_axis)
}

/// Projects 3D points into the plane basis anchored at `origin`.
#[inline]
pub fn project_to_2d_with_basis(
    points_3d: &[Point3<f64>],
    u_axis: &Vector3<f64>,
    v_axis: &Vector3<f64>,
    origin: &Point3<f64>,
) -> Vec<Point2<f64>> {
    points_3d
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(u_axis), v.dot(v_axis))
        })
        .collect()
}

/// Triangulates a closed planar loop so that every triangle winds
/// counter-clockwise around `normal`.
pub fn triangulate_loop(points: &[Point3<f64>], normal: &Vector3<f64>) -> Result<Vec<usize>> {
    let normal = normal.try_normalize(1e-15).ok_or_else(|| {
        Error::TriangulationError("loop normal is degenerate".to_string())
    })?;
    let Some(origin) = points.first() else {
        return Err(Error::TriangulationError("empty loop".to_string()));
    };

    let (u_axis, v_axis) = plane_basis(&normal);
    let projected = project_to_2d_with_basis(points, &u_axis, &v_axis, origin);
    let mut indices = triangulate_polygon(&projected)?;

    for tri in indices.chunks_exact_mut(3) {
        let a = projected[tri[0]];
        let b = projected[tri[1]];
        let c = projected[tri[2]];
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        if cross < 0.0 {
            tri.swap(1, 2);
        }
    }

    Ok(indices)
}

/// Polygon normal by Newell's method.
#[inline]
pub fn calculate_polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();

    if n < 3 {
        return Vector3::new(0.0, 0.0, 1.0);
    }

    let mut normal = Vector3::<f64>::zeros();

    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    let len = normal.norm();
    if len > 1e-10 {
        normal / len
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}
