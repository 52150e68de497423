// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tragwerk Core
//!
//! Assembles beams into a frame. Beam axes are intersected pairwise, nearby
//! intersection points are merged into joints, and every joint picks the beam
//! that runs through it. The other beams get an end condition so that their
//! volumes can be cut back to butt against the main beam.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tragwerk_core::{create_joints, Beam, FrameConfig};
//! use tragwerk_geometry::{Curve, MeshKernel, Point3, Vector3};
//!
//! let kernel = MeshKernel::new();
//! let config = FrameConfig::default();
//! let axis = Curve::line(Point3::origin(), Point3::new(4.0, 0.0, 0.0));
//! let beam = Beam::new(&kernel, axis, 0.1, 0.2, Vector3::z(), &config)?;
//!
//! let mut set = create_joints(&kernel, &[beam], &config)?;
//! for joint in &mut set.joints {
//!     joint.align(&kernel, &mut set.beams, &config)?;
//! }
//! for beam in &mut set.beams {
//!     beam.shorten_ends(&kernel, &config)?;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`beam`]: lofted beams, end overrides, trimming with fallback
//! - [`voxel`]: joint voxels and their key arena
//! - [`tree`]: the spatial merge index
//! - [`factory`]: pairwise intersection and clustering
//! - [`joint`]: main beam selection and contact normals

pub mod beam;
pub mod config;
pub mod error;
pub mod factory;
pub mod joint;
pub mod tree;
pub mod voxel;

pub use beam::{classify_parameter, Beam, EndOverride, EndTrim, TrimOutcome};
pub use config::{FrameConfig, TrimFallback};
pub use error::{Error, Result};
pub use factory::{create_joints, JointSet};
pub use joint::{Alignment, Joint, SkipReason};
pub use tree::SpatialMergeIndex;
pub use voxel::{JointKey, JointVoxel, VoxelArena};
