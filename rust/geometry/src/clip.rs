// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plane trimming and patch splitting of solids.
//!
//! Every triangle is classified against the cutting plane and clipped on its
//! own (Sutherland–Hodgman against a single plane). Vertices created on the
//! cut are keyed per side, so the two halves share no vertex and fall apart
//! into separate components. Each component's open loops on the plane are
//! then chained and capped, which keeps the pieces closed.
//!
//! A [`PlanarPatch`] bounds the cut: a crossing triangle whose cut segment
//! lies outside the patch is kept whole and the pieces stay connected there.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::solid::Solid;
use crate::triangulation::{plane_basis, triangulate_loop};

/// Plane given by a point and a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Point on the plane
    pub point: Point3<f64>,
    /// Normal vector (normalized)
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Create a new plane; the normal is normalized.
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// Signed distance from point to plane.
    /// Positive = in front, Negative = behind
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.point).dot(&self.normal)
    }

    /// Check if point is in front of plane
    #[inline]
    pub fn is_front(&self, point: &Point3<f64>) -> bool {
        self.signed_distance(point) >= 0.0
    }
}

/// Bounded rectangle lying on a plane, centred on the plane point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPatch {
    pub plane: Plane,
    pub u_axis: Vector3<f64>,
    pub v_axis: Vector3<f64>,
    pub half_u: f64,
    pub half_v: f64,
}

impl PlanarPatch {
    pub fn new(plane: Plane, half_u: f64, half_v: f64) -> Self {
        let (u_axis, v_axis) = plane_basis(&plane.normal);
        Self {
            plane,
            u_axis,
            v_axis,
            half_u: half_u.abs(),
            half_v: half_v.abs(),
        }
    }

    /// Square patch with half edge length `half_size`.
    pub fn square(plane: Plane, half_size: f64) -> Self {
        Self::new(plane, half_size, half_size)
    }

    /// `true` when the projection of `point` onto the plane falls inside the
    /// rectangle.
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        let v = point - self.plane.point;
        v.dot(&self.u_axis).abs() <= self.half_u && v.dot(&self.v_axis).abs() <= self.half_v
    }

    /// Rectangle corners, counter-clockwise around the plane normal.
    pub fn corners(&self) -> [Point3<f64>; 4] {
        let o = self.plane.point;
        let u = self.u_axis * self.half_u;
        let v = self.v_axis * self.half_v;
        [o - u - v, o + u - v, o + u + v, o - u + v]
    }
}

/// Keeps the parts of `solid` behind the plane (opposite its normal).
/// Returns every resulting closed piece.
pub fn trim(solid: &Solid, plane: &Plane, tolerance: f64) -> Vec<Solid> {
    let sectioned = Sectioner::new(solid, plane, None, tolerance).run();
    sectioned
        .pieces(Some(Side::Back))
        .into_iter()
        .filter_map(|piece| close_piece(piece, plane, tolerance))
        .collect()
}

/// Cuts `solid` with a bounded patch and returns every resulting piece on
/// either side.
pub fn split(solid: &Solid, patch: &PlanarPatch, tolerance: f64) -> Vec<Solid> {
    let sectioned = Sectioner::new(solid, &patch.plane, Some(patch), tolerance).run();
    sectioned
        .pieces(None)
        .into_iter()
        .filter_map(|piece| close_piece(piece, &patch.plane, tolerance))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Front,
    Back,
    On,
}

/// Identity of an output vertex. Cut and on-plane vertices carry the side
/// they were emitted for, so the halves never share them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VertexKey {
    Original(u32),
    Pinned(u32, Side),
    Cut(u32, u32, Side),
}

struct Sectioner<'a> {
    source: &'a Solid,
    patch: Option<&'a PlanarPatch>,
    distances: Vec<f64>,
    epsilon: f64,
    keys: FxHashMap<VertexKey, u32>,
    out: Solid,
    /// Side of each output triangle; `None` for crossing triangles kept whole
    sides: Vec<Option<Side>>,
}

struct Sectioned {
    solid: Solid,
    sides: Vec<Option<Side>>,
}

impl<'a> Sectioner<'a> {
    fn new(
        source: &'a Solid,
        plane: &Plane,
        patch: Option<&'a PlanarPatch>,
        tolerance: f64,
    ) -> Self {
        Self {
            source,
            patch,
            distances: source
                .vertices
                .iter()
                .map(|v| plane.signed_distance(v))
                .collect(),
            epsilon: tolerance.abs().max(1e-12),
            keys: FxHashMap::default(),
            out: Solid::default(),
            sides: Vec::with_capacity(source.triangles.len()),
        }
    }

    fn class(&self, v: u32) -> Class {
        let d = self.distances[v as usize];
        if d > self.epsilon {
            Class::Front
        } else if d < -self.epsilon {
            Class::Back
        } else {
            Class::On
        }
    }

    fn in_patch(&self, point: &Point3<f64>) -> bool {
        self.patch.map_or(true, |patch| patch.contains(point))
    }

    fn cut_position(&self, a: u32, b: u32) -> Point3<f64> {
        let (a, b) = (a.min(b), a.max(b));
        let da = self.distances[a as usize];
        let db = self.distances[b as usize];
        let pa = self.source.vertices[a as usize];
        let pb = self.source.vertices[b as usize];
        pa + (pb - pa) * (da / (da - db))
    }

    fn vertex(&mut self, key: VertexKey) -> u32 {
        if let Some(&index) = self.keys.get(&key) {
            return index;
        }
        let position = match key {
            VertexKey::Original(i) | VertexKey::Pinned(i, _) => self.source.vertices[i as usize],
            VertexKey::Cut(a, b, _) => self.cut_position(a, b),
        };
        let index = self.out.vertices.len() as u32;
        self.out.vertices.push(position);
        self.keys.insert(key, index);
        index
    }

    fn emit(&mut self, polygon: &[VertexKey], side: Option<Side>) {
        if polygon.len() < 3 {
            return;
        }
        let ids: SmallVec<[u32; 4]> = polygon.iter().map(|&k| self.vertex(k)).collect();
        for i in 1..ids.len() - 1 {
            let tri = [ids[0], ids[i], ids[i + 1]];
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
                self.out.triangles.push(tri);
                self.sides.push(side);
            }
        }
    }

    /// Key for an on-plane vertex of a one-sided triangle.
    fn on_plane_key(&self, v: u32, side: Side) -> VertexKey {
        if self.in_patch(&self.source.vertices[v as usize]) {
            VertexKey::Pinned(v, side)
        } else {
            VertexKey::Original(v)
        }
    }

    fn run(mut self) -> Sectioned {
        for index in 0..self.source.triangles.len() {
            let tri = self.source.triangles[index];
            let classes = tri.map(|v| self.class(v));
            let has_front = classes.contains(&Class::Front);
            let has_back = classes.contains(&Class::Back);

            match (has_front, has_back) {
                // Coplanar with the cut: the cap replaces it
                (false, false) => {}
                (true, false) | (false, true) => {
                    let side = if has_front { Side::Front } else { Side::Back };
                    let polygon: SmallVec<[VertexKey; 3]> = tri
                        .iter()
                        .zip(classes.iter())
                        .map(|(&v, &c)| match c {
                            Class::On => self.on_plane_key(v, side),
                            _ => VertexKey::Original(v),
                        })
                        .collect();
                    self.emit(&polygon, Some(side));
                }
                (true, true) => self.clip_crossing(tri, classes),
            }
        }

        Sectioned {
            solid: self.out,
            sides: self.sides,
        }
    }

    fn clip_crossing(&mut self, tri: [u32; 3], classes: [Class; 3]) {
        // Where this triangle meets the plane
        let mut crossing: SmallVec<[Point3<f64>; 3]> = SmallVec::new();
        for k in 0..3 {
            let (i, j) = (tri[k], tri[(k + 1) % 3]);
            match (classes[k], classes[(k + 1) % 3]) {
                (Class::On, _) => crossing.push(self.source.vertices[i as usize]),
                (Class::Front, Class::Back) | (Class::Back, Class::Front) => {
                    crossing.push(self.cut_position(i, j))
                }
                _ => {}
            }
        }
        let centroid = crossing
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / crossing.len().max(1) as f64;

        if !self.in_patch(&Point3::from(centroid)) {
            let polygon = tri.map(VertexKey::Original);
            self.emit(&polygon, None);
            return;
        }

        let mut front: SmallVec<[VertexKey; 4]> = SmallVec::new();
        let mut back: SmallVec<[VertexKey; 4]> = SmallVec::new();
        for k in 0..3 {
            let (i, j) = (tri[k], tri[(k + 1) % 3]);
            match classes[k] {
                Class::Front => front.push(VertexKey::Original(i)),
                Class::Back => back.push(VertexKey::Original(i)),
                Class::On => {
                    front.push(VertexKey::Pinned(i, Side::Front));
                    back.push(VertexKey::Pinned(i, Side::Back));
                }
            }
            if matches!(
                (classes[k], classes[(k + 1) % 3]),
                (Class::Front, Class::Back) | (Class::Back, Class::Front)
            ) {
                let (a, b) = (i.min(j), i.max(j));
                front.push(VertexKey::Cut(a, b, Side::Front));
                back.push(VertexKey::Cut(a, b, Side::Back));
            }
        }

        self.emit(&front, Some(Side::Front));
        self.emit(&back, Some(Side::Back));
    }
}

impl Sectioned {
    /// Components of the sectioned mesh. With `keep = Some(side)` only
    /// components lying entirely on that side are returned.
    fn pieces(&self, keep: Option<Side>) -> Vec<Solid> {
        self.solid
            .component_groups()
            .into_iter()
            .filter(|group| match keep {
                None => true,
                Some(side) => group.iter().all(|&t| self.sides[t] == Some(side)),
            })
            .map(|group| self.solid.subset(&group))
            .collect()
    }
}

/// Caps every open loop of `piece` lying on the plane. Pieces that end up
/// without volume are discarded.
fn close_piece(mut piece: Solid, plane: &Plane, tolerance: f64) -> Option<Solid> {
    let epsilon = tolerance.abs().max(1e-12) * 2.0;

    let mut directed: FxHashMap<(u32, u32), usize> = FxHashMap::default();
    for (index, t) in piece.triangles.iter().enumerate() {
        for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
            directed.insert((a, b), index);
        }
    }

    let on_plane = |v: u32| plane.signed_distance(&piece.vertices[v as usize]).abs() <= epsilon;

    // Cap loops run against the boundary edges: (a, b) open => cap has (b, a)
    let mut next: FxHashMap<u32, SmallVec<[u32; 2]>> = FxHashMap::default();
    for &(a, b) in directed.keys() {
        if !directed.contains_key(&(b, a)) && on_plane(a) && on_plane(b) {
            next.entry(b).or_default().push(a);
        }
    }

    let mut starts: Vec<u32> = next.keys().copied().collect();
    starts.sort_unstable();

    let mut caps: Vec<[u32; 3]> = Vec::new();
    for start in starts {
        let mut ring = vec![start];
        let mut current = start;
        let closed = loop {
            let Some(step) = next.get_mut(&current).and_then(|targets| targets.pop()) else {
                break false;
            };
            if step == start {
                break true;
            }
            if ring.contains(&step) {
                break false;
            }
            ring.push(step);
            current = step;
        };
        if !closed || ring.len() < 3 {
            continue;
        }

        let points: Vec<Point3<f64>> = ring.iter().map(|&v| piece.vertices[v as usize]).collect();

        // A piece behind the plane is capped facing along the normal
        let owner = directed
            .get(&(ring[1], ring[0]))
            .map(|&t| piece.triangles[t])
            .unwrap_or([ring[0], ring[1], ring[2]]);
        let centroid = owner
            .iter()
            .fold(Vector3::zeros(), |acc, &v| acc + piece.vertices[v as usize].coords)
            / 3.0;
        let outward = if plane.signed_distance(&Point3::from(centroid)) <= 0.0 {
            plane.normal
        } else {
            -plane.normal
        };

        match triangulate_loop(&points, &outward) {
            Ok(indices) => caps.extend(
                indices
                    .chunks_exact(3)
                    .map(|t| [ring[t[0]], ring[t[1]], ring[t[2]]]),
            ),
            Err(_) => continue,
        }
    }

    piece.triangles.extend(caps);
    if piece.signed_volume().abs() <= tolerance.abs().powi(3) || piece.triangles.len() < 4 {
        return None;
    }
    Some(piece)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bar(length: f64) -> Solid {
        let section = |x: f64| {
            vec![
                Point3::new(x, -0.5, -0.5),
                Point3::new(x, 0.5, -0.5),
                Point3::new(x, 0.5, 0.5),
                Point3::new(x, -0.5, 0.5),
            ]
        };
        let sections: Vec<_> = (0..=4).map(|i| section(length * i as f64 / 4.0)).collect();
        Solid::loft(&sections).unwrap()
    }

    #[test]
    fn trim_keeps_part_behind_plane() {
        let solid = bar(4.0);
        let plane = Plane::new(Point3::new(2.5, 0.0, 0.0), Vector3::x());
        let pieces = trim(&solid, &plane, 1e-9);
        assert_eq!(pieces.len(), 1);
        let piece = &pieces[0];
        assert!(piece.is_closed());
        assert_relative_eq!(piece.signed_volume(), 2.5, epsilon = 1e-9);
        let bounds = piece.bounds().unwrap();
        assert_relative_eq!(bounds.max.x, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn trim_through_existing_section_is_clean() {
        let solid = bar(4.0);
        let plane = Plane::new(Point3::new(1.0, 0.0, 0.0), -Vector3::x());
        let pieces = trim(&solid, &plane, 1e-9);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].is_closed());
        assert_relative_eq!(pieces[0].signed_volume(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn trim_is_idempotent() {
        let solid = bar(4.0);
        let plane = Plane::new(Point3::new(3.2, 0.0, 0.0), Vector3::new(1.0, 0.3, 0.0));
        let once = trim(&solid, &plane, 1e-9);
        let again = trim(&solid, &plane, 1e-9);
        assert_eq!(once, again);
    }

    #[test]
    fn trim_missing_the_solid_keeps_or_drops_everything() {
        let solid = bar(4.0);
        let behind = Plane::new(Point3::new(10.0, 0.0, 0.0), Vector3::x());
        assert_eq!(trim(&solid, &behind, 1e-9).len(), 1);
        let ahead = Plane::new(Point3::new(-10.0, 0.0, 0.0), Vector3::x());
        assert!(trim(&solid, &ahead, 1e-9).is_empty());
    }

    #[test]
    fn split_with_large_patch_yields_two_closed_pieces() {
        let solid = bar(4.0);
        let patch = PlanarPatch::square(Plane::new(Point3::new(1.5, 0.0, 0.0), Vector3::x()), 5.0);
        let pieces = split(&solid, &patch, 1e-9);
        assert_eq!(pieces.len(), 2);
        let total: f64 = pieces.iter().map(Solid::signed_volume).sum();
        assert_relative_eq!(total, 4.0, epsilon = 1e-9);
        assert!(pieces.iter().all(Solid::is_closed));
    }

    #[test]
    fn split_with_patch_off_the_solid_keeps_one_piece() {
        let solid = bar(4.0);
        let plane = Plane::new(Point3::new(1.5, 10.0, 0.0), Vector3::x());
        let patch = PlanarPatch::square(plane, 1.0);
        let pieces = split(&solid, &patch, 1e-9);
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn patch_containment() {
        let patch = PlanarPatch::new(Plane::new(Point3::origin(), Vector3::z()), 1.0, 2.0);
        assert!(patch.contains(&Point3::new(0.5, 0.5, 3.0)));
        assert!(!patch.contains(&Point3::new(5.0, 5.0, 0.0)));
        for corner in patch.corners() {
            assert_relative_eq!(corner.z, 0.0);
        }
    }
}
