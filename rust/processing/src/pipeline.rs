// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame assembly pipeline.
//!
//! build beams → create joints → align every joint → shorten every beam.
//! Beam construction and shortening only touch one beam each and run on the
//! rayon pool when `config.parallel` is set. Joint creation and alignment
//! stay sequential.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};
use tragwerk_core::{
    create_joints, Alignment, Beam, FrameConfig, Joint, JointSet, Result, TrimOutcome,
};
use tragwerk_geometry::{GeometryKernel, Vector3};

/// Input for one beam.
#[derive(Debug, Clone)]
pub struct BeamSpec<C> {
    pub axis: C,
    pub width: f64,
    pub height: f64,
    pub up: Vector3<f64>,
}

impl<C> BeamSpec<C> {
    pub fn new(axis: C, width: f64, height: f64, up: Vector3<f64>) -> Self {
        Self {
            axis,
            width,
            height,
            up,
        }
    }
}

/// Assembled frame: trimmed beam copies, aligned joints and what happened
/// to each of them.
#[derive(Debug)]
pub struct FrameAssembly<K: GeometryKernel> {
    pub beams: Vec<Beam<K>>,
    pub joints: Vec<Joint>,
    /// Alignment of `joints[i]`
    pub alignments: Vec<Alignment>,
    /// Trim outcome of `beams[i]`
    pub outcomes: Vec<TrimOutcome>,
    pub elapsed: Duration,
}

/// Lofts one beam per spec, in input order.
pub fn build_beams<K: GeometryKernel>(
    kernel: &K,
    specs: Vec<BeamSpec<K::Curve>>,
    config: &FrameConfig,
) -> Result<Vec<Beam<K>>> {
    config.validate()?;
    let build = |spec: BeamSpec<K::Curve>| {
        Beam::new(kernel, spec.axis, spec.width, spec.height, spec.up, config)
    };

    let beams: Vec<Beam<K>> = if config.parallel {
        specs.into_par_iter().map(build).collect::<Result<_>>()?
    } else {
        specs.into_iter().map(build).collect::<Result<_>>()?
    };
    debug!(count = beams.len(), "Built beam volumes");
    Ok(beams)
}

/// Joins `beams` into a frame. The input beams are not modified.
///
/// Any structural error in a joint aborts the whole frame.
pub fn assemble<K: GeometryKernel>(
    kernel: &K,
    beams: &[Beam<K>],
    config: &FrameConfig,
) -> Result<FrameAssembly<K>> {
    let start = Instant::now();
    let JointSet {
        mut joints,
        mut beams,
    } = create_joints(kernel, beams, config)?;

    let mut alignments = Vec::with_capacity(joints.len());
    for joint in &mut joints {
        alignments.push(joint.align(kernel, &mut beams, config)?);
    }

    let shorten = |beam: &mut Beam<K>| beam.shorten_ends(kernel, config);
    let outcomes: Vec<TrimOutcome> = if config.parallel {
        beams.par_iter_mut().map(shorten).collect::<Result<_>>()?
    } else {
        beams.iter_mut().map(shorten).collect::<Result<_>>()?
    };

    let elapsed = start.elapsed();
    info!(
        beams = beams.len(),
        joints = joints.len(),
        skipped = alignments
            .iter()
            .filter(|a| matches!(a, Alignment::Skipped(_)))
            .count(),
        degraded = outcomes.iter().filter(|o| o.is_degraded()).count(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Assembled frame"
    );

    Ok(FrameAssembly {
        beams,
        joints,
        alignments,
        outcomes,
        elapsed,
    })
}

/// [`build_beams`] followed by [`assemble`].
pub fn process<K: GeometryKernel>(
    kernel: &K,
    specs: Vec<BeamSpec<K::Curve>>,
    config: &FrameConfig,
) -> Result<FrameAssembly<K>> {
    let beams = build_beams(kernel, specs, config)?;
    assemble(kernel, &beams, config)
}
