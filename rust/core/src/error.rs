// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for frame assembly.

use thiserror::Error;
use tragwerk_geometry::{CurveEnd, Point3};

/// Result type alias for frame assembly.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building beams and aligning joints.
///
/// The joint variants are structural violations: the geometry that put a
/// beam into a joint no longer holds when the joint is aligned. They abort
/// the whole frame.
#[derive(Error, Debug)]
pub enum Error {
    #[error("beam construction failed: {0}")]
    BeamConstruction(String),

    #[error("parameter {parameter} lies outside the axis domain [{min}, {max}]")]
    ParameterOutOfDomain { parameter: f64, min: f64, max: f64 },

    #[error("beam index {0} is not part of the frame")]
    UnknownBeam(usize),

    /// The axis closest point is farther from the joint centre than the
    /// joint radius.
    #[error("beam {beam} passes {distance:.6} from joint at {center}, outside radius {radius}")]
    AxisMissesJoint {
        beam: usize,
        center: Point3<f64>,
        distance: f64,
        radius: f64,
    },

    #[error("joint at {center} has {count} beams passing through it, no unique main beam")]
    AmbiguousMainBeam { center: Point3<f64>, count: usize },

    #[error("axis of beam {beam} does not meet the volume of main beam {main}")]
    NoContact { beam: usize, main: usize },

    #[error("degenerate trim at {end:?} end: {reason}")]
    DegenerateTrim { end: CurveEnd, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Geometry(#[from] tragwerk_geometry::Error),
}
