// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tragwerk Geometry
//!
//! The geometry kernel that beam frames are built on. [`GeometryKernel`] is the
//! seam the joint algorithms talk through; [`MeshKernel`] implements it on
//! polyline axes and closed triangle meshes using nalgebra and earcutr.

pub mod bounds;
pub mod clip;
pub mod curve;
pub mod error;
pub mod intersect;
pub mod kernel;
pub mod solid;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use bounds::Aabb;
pub use clip::{PlanarPatch, Plane};
pub use curve::{Curve, CurveEnd, Frame, Interval};
pub use error::{Error, Result};
pub use intersect::CurveIntersection;
pub use kernel::{GeometryKernel, MeshKernel};
pub use solid::Solid;
