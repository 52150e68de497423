// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry kernel interface.
//!
//! Frame assembly never touches curves or solids directly; it asks a
//! [`GeometryKernel`]. Every tolerance is passed in by the caller.

use std::fmt::Debug;

use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;
use crate::clip::{self, PlanarPatch, Plane};
use crate::curve::{Curve, CurveEnd, Frame, Interval};
use crate::error::Result;
use crate::intersect::{self, CurveIntersection};
use crate::solid::Solid;

/// Curve, solid and intersection operations used by beams and joints.
pub trait GeometryKernel: Send + Sync {
    /// Parametric axis curve
    type Curve: Clone + Debug + Send + Sync;
    /// Closed solid volume
    type Solid: Clone + Debug + Send + Sync;

    fn domain(&self, curve: &Self::Curve) -> Interval;

    fn length(&self, curve: &Self::Curve) -> f64;

    fn point_at(&self, curve: &Self::Curve, t: f64) -> Point3<f64>;

    /// Unit tangent at `t`.
    fn tangent_at(&self, curve: &Self::Curve, t: f64) -> Vector3<f64>;

    /// Frame at `t` whose normal is the tangent. `None` where the curve has
    /// no tangent.
    fn perpendicular_frame_at(&self, curve: &Self::Curve, t: f64) -> Option<Frame>;

    /// `count + 1` parameters splitting the curve into equal arc lengths,
    /// ends included.
    fn divide_by_count(&self, curve: &Self::Curve, count: usize) -> Vec<f64>;

    /// Parameters the loft must pass through in addition to the uniform
    /// samples (polyline corners).
    fn breakpoints(&self, _curve: &Self::Curve) -> Vec<f64> {
        Vec::new()
    }

    fn closest_parameter(&self, curve: &Self::Curve, point: &Point3<f64>) -> f64;

    /// Arc length between `t` and one end of the curve.
    fn length_from_end(&self, curve: &Self::Curve, t: f64, end: CurveEnd) -> f64;

    fn is_closed(&self, curve: &Self::Curve, tolerance: f64) -> bool;

    /// Chains curves with coincident endpoints.
    fn join_curves(&self, curves: &[Self::Curve], tolerance: f64) -> Vec<Self::Curve>;

    fn intersect_curves(
        &self,
        a: &Self::Curve,
        b: &Self::Curve,
        tolerance: f64,
        overlap_tolerance: f64,
    ) -> Vec<CurveIntersection>;

    /// Curve parameters where the curve crosses the solid boundary, ascending.
    fn intersect_curve_solid(
        &self,
        curve: &Self::Curve,
        solid: &Self::Solid,
        tolerance: f64,
    ) -> Vec<f64>;

    /// Lofts closed planar sections, given as vertex loops, into solids.
    fn loft(&self, sections: &[Vec<Point3<f64>>]) -> Result<Vec<Self::Solid>>;

    /// Pieces of `solid` behind `plane`.
    fn trim(&self, solid: &Self::Solid, plane: &Plane, tolerance: f64) -> Vec<Self::Solid>;

    /// Every piece of `solid` after cutting it with `patch`.
    fn split(&self, solid: &Self::Solid, patch: &PlanarPatch, tolerance: f64)
        -> Vec<Self::Solid>;

    /// Closest boundary point and the outward normal there.
    fn closest_point(
        &self,
        solid: &Self::Solid,
        point: &Point3<f64>,
    ) -> Option<(Point3<f64>, Vector3<f64>)>;

    fn contains(&self, solid: &Self::Solid, point: &Point3<f64>, tolerance: f64) -> bool;

    /// Surface area.
    fn area(&self, solid: &Self::Solid) -> f64;

    fn bounds(&self, solid: &Self::Solid) -> Option<Aabb>;
}

/// Kernel over [`Curve`] axes and triangle-mesh [`Solid`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshKernel;

impl MeshKernel {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryKernel for MeshKernel {
    type Curve = Curve;
    type Solid = Solid;

    #[inline]
    fn domain(&self, curve: &Curve) -> Interval {
        curve.domain()
    }

    #[inline]
    fn length(&self, curve: &Curve) -> f64 {
        curve.length()
    }

    #[inline]
    fn point_at(&self, curve: &Curve, t: f64) -> Point3<f64> {
        curve.point_at(t)
    }

    #[inline]
    fn tangent_at(&self, curve: &Curve, t: f64) -> Vector3<f64> {
        curve.tangent_at(t)
    }

    fn perpendicular_frame_at(&self, curve: &Curve, t: f64) -> Option<Frame> {
        curve.perpendicular_frame_at(t)
    }

    fn divide_by_count(&self, curve: &Curve, count: usize) -> Vec<f64> {
        curve.divide_by_count(count)
    }

    fn breakpoints(&self, curve: &Curve) -> Vec<f64> {
        curve.interior_vertex_parameters()
    }

    fn closest_parameter(&self, curve: &Curve, point: &Point3<f64>) -> f64 {
        curve.closest_parameter(point)
    }

    fn length_from_end(&self, curve: &Curve, t: f64, end: CurveEnd) -> f64 {
        curve.length_from_end(t, end)
    }

    fn is_closed(&self, curve: &Curve, tolerance: f64) -> bool {
        curve.is_closed(tolerance)
    }

    fn join_curves(&self, curves: &[Curve], tolerance: f64) -> Vec<Curve> {
        Curve::join(curves, tolerance)
    }

    fn intersect_curves(
        &self,
        a: &Curve,
        b: &Curve,
        tolerance: f64,
        overlap_tolerance: f64,
    ) -> Vec<CurveIntersection> {
        intersect::intersect_curves(a, b, tolerance, overlap_tolerance)
    }

    fn intersect_curve_solid(&self, curve: &Curve, solid: &Solid, tolerance: f64) -> Vec<f64> {
        intersect::intersect_curve_solid(curve, solid, tolerance)
    }

    fn loft(&self, sections: &[Vec<Point3<f64>>]) -> Result<Vec<Solid>> {
        Solid::loft(sections).map(|solid| vec![solid])
    }

    fn trim(&self, solid: &Solid, plane: &Plane, tolerance: f64) -> Vec<Solid> {
        clip::trim(solid, plane, tolerance)
    }

    fn split(&self, solid: &Solid, patch: &PlanarPatch, tolerance: f64) -> Vec<Solid> {
        clip::split(solid, patch, tolerance)
    }

    fn closest_point(
        &self,
        solid: &Solid,
        point: &Point3<f64>,
    ) -> Option<(Point3<f64>, Vector3<f64>)> {
        solid.closest_point(point)
    }

    fn contains(&self, solid: &Solid, point: &Point3<f64>, tolerance: f64) -> bool {
        solid.contains(point, tolerance)
    }

    fn area(&self, solid: &Solid) -> f64 {
        solid.area()
    }

    fn bounds(&self, solid: &Solid) -> Option<Aabb> {
        solid.bounds()
    }
}
