// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Joint detection.
//!
//! Every ordered pair of beam axes is intersected. Each point event gets a
//! candidate voxel; the spatial merge index either registers it as a new
//! joint or resolves it to the joint it falls into. Beams are recorded per
//! resolved joint, and one [`Joint`] is emitted per realised voxel.
//!
//! The pair search is quadratic in the number of beams. Insertion order
//! decides which candidate wins when boxes overlap, so this stage runs
//! sequentially.

use slotmap::SecondaryMap;
use smallvec::SmallVec;
use tracing::{debug, info};
use tragwerk_geometry::GeometryKernel;

use crate::beam::Beam;
use crate::config::FrameConfig;
use crate::error::Result;
use crate::joint::Joint;
use crate::tree::SpatialMergeIndex;
use crate::voxel::{JointKey, VoxelArena};

/// Joints of a frame together with the private beam copies they index.
#[derive(Debug)]
pub struct JointSet<K: GeometryKernel> {
    pub joints: Vec<Joint>,
    pub beams: Vec<Beam<K>>,
}

/// Detects joints between `beams`. The caller's beams are left untouched;
/// the returned set owns deep copies which joint alignment will modify.
pub fn create_joints<K: GeometryKernel>(
    kernel: &K,
    beams: &[Beam<K>],
    config: &FrameConfig,
) -> Result<JointSet<K>> {
    config.validate()?;

    let beams: Vec<Beam<K>> = beams.to_vec();
    let tolerance = config.tolerance * 2.0;

    let mut arena = VoxelArena::new();
    let mut index = SpatialMergeIndex::new(config.joint_radius, config.strict_merge);
    let mut members: SecondaryMap<JointKey, SmallVec<[usize; 4]>> = SecondaryMap::new();
    let mut events = 0usize;

    for i in 0..beams.len() {
        for j in 0..beams.len() {
            if i == j {
                continue;
            }
            let hits = kernel.intersect_curves(
                beams[i].axis(),
                beams[j].axis(),
                tolerance,
                config.overlap_tolerance,
            );

            for hit in hits {
                // Overlaps are not joints
                let Some(point) = hit.point_a() else {
                    debug!(i, j, "Ignoring axis overlap");
                    continue;
                };
                events += 1;

                let candidate = arena.reserve(point, config.joint_radius);
                let Some(voxel) = arena.get(candidate).copied() else {
                    continue;
                };
                let resolved = index.insert(voxel);
                if resolved != candidate {
                    arena.release(candidate);
                }

                if let Some(list) = members.entry(resolved) {
                    let list = list.or_default();
                    for beam in [i, j] {
                        if !list.contains(&beam) {
                            list.push(beam);
                        }
                    }
                }
            }
        }
    }

    let joints: Vec<Joint> = arena
        .iter()
        .filter_map(|voxel| {
            members
                .get(voxel.key())
                .map(|list| Joint::new(*voxel, list.iter().copied()))
        })
        .collect();

    info!(
        beams = beams.len(),
        intersections = events,
        joints = joints.len(),
        "Created joints"
    );
    Ok(JointSet { joints, beams })
}
