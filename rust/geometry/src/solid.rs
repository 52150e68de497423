// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed triangle-mesh solids.
//!
//! A [`Solid`] is a watertight, outward-oriented triangle mesh in `f64`.
//! It is built by lofting closed planar sections and cut by
//! [`crate::clip`]. Queries (area, closest point, containment) work directly
//! on the triangles without acceleration structures: beam solids have a few
//! hundred triangles at most.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::intersect::segment_triangle;
use crate::triangulation::{calculate_polygon_normal, triangulate_loop};

/// Closed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solid {
    /// Vertex positions
    pub vertices: Vec<Point3<f64>>,
    /// Counter-clockwise (seen from outside) vertex index triples
    pub triangles: Vec<[u32; 3]>,
}

impl Solid {
    pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Triangle corner positions.
    pub fn triangle_points(&self) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        self.triangles.iter().map(move |t| {
            [
                self.vertices[t[0] as usize],
                self.vertices[t[1] as usize],
                self.vertices[t[2] as usize],
            ]
        })
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Total surface area.
    pub fn area(&self) -> f64 {
        self.triangle_points()
            .map(|[a, b, c]| (b - a).cross(&(c - a)).norm() * 0.5)
            .sum()
    }

    /// Signed enclosed volume (divergence theorem). Positive for an outward
    /// oriented closed mesh.
    pub fn signed_volume(&self) -> f64 {
        self.triangle_points()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
            .sum()
    }

    /// Reverses the orientation of every triangle.
    pub fn flip(&mut self) {
        for t in &mut self.triangles {
            t.swap(1, 2);
        }
    }

    /// `true` when every undirected edge is used by exactly two triangles.
    pub fn is_closed(&self) -> bool {
        if self.triangles.is_empty() {
            return false;
        }
        let mut counts: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        for t in &self.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts.values().all(|&c| c == 2)
    }

    /// Closest surface point to `point` and the outward normal there.
    ///
    /// When the closest point sits on an edge or corner shared by several
    /// faces, their normals are averaged.
    pub fn closest_point(&self, point: &Point3<f64>) -> Option<(Point3<f64>, Vector3<f64>)> {
        let mut best_dist = f64::INFINITY;
        let mut candidates: Vec<(f64, Point3<f64>, Vector3<f64>)> = Vec::new();

        for tri in self.triangle_points() {
            let normal = match (tri[1] - tri[0]).cross(&(tri[2] - tri[0])).try_normalize(1e-15) {
                Some(n) => n,
                None => continue,
            };
            let closest = closest_point_on_triangle(point, &tri);
            let dist = (closest - point).norm();
            best_dist = best_dist.min(dist);
            candidates.push((dist, closest, normal));
        }

        let tie = 1e-9 * (1.0 + best_dist);
        let mut location = None;
        let mut normal = Vector3::zeros();
        for (dist, closest, n) in candidates {
            if dist <= best_dist + tie {
                location.get_or_insert(closest);
                normal += n;
            }
        }

        let location = location?;
        let normal = normal.try_normalize(1e-15)?;
        Some((location, normal))
    }

    /// Point containment by ray parity. Points within `tolerance` of the
    /// surface count as inside.
    pub fn contains(&self, point: &Point3<f64>, tolerance: f64) -> bool {
        if let Some((closest, _)) = self.closest_point(point) {
            if (closest - point).norm() <= tolerance {
                return true;
            }
        }
        let Some(bounds) = self.bounds() else {
            return false;
        };
        if !bounds.contains_point(point) {
            return false;
        }

        // Skewed direction keeps the ray off axis-aligned edges and diagonals
        let direction = Vector3::new(0.6127, 0.7293, 0.3049).normalize()
            * (bounds.diagonal() * 4.0 + 1.0);
        let mut crossings = 0usize;
        for tri in self.triangle_points() {
            if let Some(t) = segment_triangle(point, &direction, &tri) {
                if t > 1e-12 && t <= 1.0 {
                    crossings += 1;
                }
            }
        }
        crossings % 2 == 1
    }

    /// Splits the mesh into edge-connected components.
    pub fn components(&self) -> Vec<Solid> {
        self.component_groups()
            .iter()
            .map(|group| self.subset(group))
            .collect()
    }

    /// Triangle indices of each vertex-connected component, in order of
    /// first appearance.
    pub(crate) fn component_groups(&self) -> Vec<Vec<usize>> {
        let mut parent: Vec<u32> = (0..self.vertices.len() as u32).collect();
        for t in &self.triangles {
            union(&mut parent, t[0], t[1]);
            union(&mut parent, t[1], t[2]);
        }

        let mut slots: FxHashMap<u32, usize> = FxHashMap::default();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (index, t) in self.triangles.iter().enumerate() {
            let root = find(&mut parent, t[0]);
            let slot = *slots.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(index);
        }
        groups
    }

    /// New solid made of the given triangles, with unused vertices dropped.
    pub(crate) fn subset(&self, triangles: &[usize]) -> Solid {
        let mut remap: FxHashMap<u32, u32> = FxHashMap::default();
        let mut piece = Solid::default();
        for &index in triangles {
            let t = self.triangles[index];
            let mut mapped = [0u32; 3];
            for (k, &v) in t.iter().enumerate() {
                mapped[k] = *remap.entry(v).or_insert_with(|| {
                    piece.vertices.push(self.vertices[v as usize]);
                    (piece.vertices.len() - 1) as u32
                });
            }
            piece.triangles.push(mapped);
        }
        piece
    }

    /// Lofts closed planar sections into one capped solid.
    ///
    /// Consecutive sections are joined by ruled quads; the first and last
    /// sections become planar caps. Every section must have the same number
    /// of vertices (at least three), listed without repeating the first.
    pub fn loft(sections: &[Vec<Point3<f64>>]) -> Result<Solid> {
        if sections.len() < 2 {
            return Err(Error::InvalidLoft(format!(
                "need at least two sections, got {}",
                sections.len()
            )));
        }
        let n = sections[0].len();
        if n < 3 {
            return Err(Error::InvalidLoft(
                "sections need at least three vertices".to_string(),
            ));
        }
        if sections.iter().any(|s| s.len() != n) {
            return Err(Error::InvalidLoft(
                "all sections must have the same vertex count".to_string(),
            ));
        }

        let mut solid = Solid {
            vertices: sections.iter().flatten().copied().collect(),
            triangles: Vec::with_capacity((sections.len() - 1) * n * 2 + 2 * (n - 2)),
        };

        for s in 0..sections.len() - 1 {
            let base = (s * n) as u32;
            let next = ((s + 1) * n) as u32;
            for i in 0..n as u32 {
                let j = (i + 1) % n as u32;
                solid.triangles.push([base + i, base + j, next + j]);
                solid.triangles.push([base + i, next + j, next + i]);
            }
        }

        let first = &sections[0];
        let last = &sections[sections.len() - 1];
        let last_base = ((sections.len() - 1) * n) as u32;
        let first_cap = triangulate_loop(first, &calculate_polygon_normal(first))?;
        let last_cap = triangulate_loop(last, &calculate_polygon_normal(last))?;

        // Start cap faces backwards, end cap forwards
        for tri in first_cap.chunks_exact(3) {
            solid
                .triangles
                .push([tri[0] as u32, tri[2] as u32, tri[1] as u32]);
        }
        for tri in last_cap.chunks_exact(3) {
            solid.triangles.push([
                last_base + tri[0] as u32,
                last_base + tri[1] as u32,
                last_base + tri[2] as u32,
            ]);
        }

        let volume = solid.signed_volume();
        if volume.abs() < 1e-15 {
            return Err(Error::InvalidLoft("lofted solid has no volume".to_string()));
        }
        if volume < 0.0 {
            solid.flip();
        }
        Ok(solid)
    }
}

fn find(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        let grand = parent[parent[x as usize] as usize];
        parent[x as usize] = grand;
        x = grand;
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra.max(rb) as usize] = ra.min(rb);
    }
}

/// Closest point on a triangle (Ericson, RTCD 5.1.5).
pub fn closest_point_on_triangle(p: &Point3<f64>, tri: &[Point3<f64>; 3]) -> Point3<f64> {
    let [a, b, c] = *tri;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn square(z: f64, half: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(-half, -half, z),
            Point3::new(half, -half, z),
            Point3::new(half, half, z),
            Point3::new(-half, half, z),
        ]
    }

    fn unit_prism() -> Solid {
        Solid::loft(&[square(0.0, 0.5), square(0.5, 0.5), square(1.0, 0.5)]).unwrap()
    }

    #[test]
    fn loft_is_closed_and_outward() {
        let solid = unit_prism();
        assert!(solid.is_closed());
        assert_relative_eq!(solid.signed_volume(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(solid.area(), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn loft_fixes_reversed_sections() {
        let reversed: Vec<Vec<Point3<f64>>> = [square(0.0, 0.5), square(1.0, 0.5)]
            .into_iter()
            .map(|s| s.into_iter().rev().collect())
            .collect();
        let solid = Solid::loft(&reversed).unwrap();
        assert!(solid.signed_volume() > 0.0);
    }

    #[test]
    fn loft_rejects_mismatched_sections() {
        let mut small = square(1.0, 0.5);
        small.pop();
        assert!(Solid::loft(&[square(0.0, 0.5), small]).is_err());
        assert!(Solid::loft(&[square(0.0, 0.5)]).is_err());
    }

    #[test]
    fn closest_point_and_normal_on_face() {
        let solid = unit_prism();
        let (p, n) = solid.closest_point(&Point3::new(2.0, 0.1, 0.3)).unwrap();
        assert_abs_diff_eq!(p, Point3::new(0.5, 0.1, 0.3), epsilon = 1e-12);
        assert_abs_diff_eq!(n, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn containment() {
        let solid = unit_prism();
        assert!(solid.contains(&Point3::new(0.1, 0.2, 0.3), 1e-9));
        assert!(!solid.contains(&Point3::new(0.1, 0.2, 1.3), 1e-9));
        assert!(!solid.contains(&Point3::new(0.7, 0.0, 0.5), 1e-9));
    }

    #[test]
    fn components_separate_disjoint_meshes() {
        let a = unit_prism();
        let mut b = unit_prism();
        for v in &mut b.vertices {
            v.x += 5.0;
        }
        let offset = a.vertices.len() as u32;
        let mut merged = a.clone();
        merged.vertices.extend(b.vertices.iter().copied());
        merged
            .triangles
            .extend(b.triangles.iter().map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]));

        let parts = merged.components();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(Solid::is_closed));
    }
}
