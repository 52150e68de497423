// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serialisable summary of an assembled frame.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tragwerk_core::{Alignment, EndTrim, SkipReason};
use tragwerk_geometry::{CurveEnd, GeometryKernel, Point3, Vector3};

use crate::pipeline::FrameAssembly;

/// Full frame report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    pub joints: Vec<JointReport>,
    pub beams: Vec<BeamReport>,
    pub stats: FrameStats,
}

/// One joint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointReport {
    pub center: [f64; 3],
    pub radius: f64,
    /// Member beam indices.
    pub beams: Vec<usize>,
    pub main_beam: Option<usize>,
    pub skipped: Option<SkipReason>,
    /// Contact normals, one per non-main member.
    pub end_tangents: Vec<[f64; 3]>,
    pub contact_points: Vec<[f64; 3]>,
}

/// One beam end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndReport {
    pub modified: bool,
    pub trim: EndTrim,
    /// Axis length removed at this end.
    pub trimmed_length: f64,
    pub tangent: [f64; 3],
}

/// One beam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamReport {
    pub index: usize,
    pub axis_length: f64,
    pub width: f64,
    pub height: f64,
    pub start: EndReport,
    pub end: EndReport,
    /// Surface area of the trimmed geometry.
    pub surface_area: f64,
    /// Joints this beam takes part in.
    pub joints: Vec<usize>,
}

/// Frame statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameStats {
    pub beam_count: usize,
    pub joint_count: usize,
    pub aligned_joints: usize,
    pub skipped_joints: usize,
    pub trimmed_ends: usize,
    /// Ends that fell back to a split or kept their volume.
    pub degraded_ends: usize,
    pub total_time_ms: u64,
}

impl FrameReport {
    pub fn from_assembly<K: GeometryKernel>(kernel: &K, frame: &FrameAssembly<K>) -> Self {
        let mut membership: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (joint_index, joint) in frame.joints.iter().enumerate() {
            for &beam in joint.beams() {
                membership.entry(beam).or_default().push(joint_index);
            }
        }

        let joints: Vec<JointReport> = frame
            .joints
            .iter()
            .zip(frame.alignments.iter())
            .map(|(joint, alignment)| JointReport {
                center: point(&joint.center()),
                radius: joint.voxel().radius(),
                beams: joint.beams().to_vec(),
                main_beam: match alignment {
                    Alignment::Aligned { main_beam } => Some(*main_beam),
                    Alignment::Skipped(_) => None,
                },
                skipped: match alignment {
                    Alignment::Skipped(reason) => Some(*reason),
                    Alignment::Aligned { .. } => None,
                },
                end_tangents: joint.end_tangents().iter().map(vector).collect(),
                contact_points: joint.contact_points().iter().map(point).collect(),
            })
            .collect();

        let beams: Vec<BeamReport> = frame
            .beams
            .iter()
            .zip(frame.outcomes.iter())
            .enumerate()
            .map(|(index, (beam, outcome))| {
                let tangents = beam.end_tangents(kernel);
                let end_report = |end: CurveEnd, tangent: &Vector3<f64>| EndReport {
                    modified: beam.is_modified(end),
                    trim: outcome.get(end),
                    trimmed_length: beam.trimmed_length(kernel, end),
                    tangent: vector(tangent),
                };
                BeamReport {
                    index,
                    axis_length: kernel.length(beam.axis()),
                    width: beam.width(),
                    height: beam.height(),
                    start: end_report(CurveEnd::Start, &tangents[0]),
                    end: end_report(CurveEnd::End, &tangents[1]),
                    surface_area: kernel.area(beam.geometry()),
                    joints: membership.remove(&index).unwrap_or_default(),
                }
            })
            .collect();

        let ends = || frame.outcomes.iter().flat_map(|o| [o.start, o.end]);
        let skipped_joints = frame
            .alignments
            .iter()
            .filter(|a| matches!(a, Alignment::Skipped(_)))
            .count();
        let stats = FrameStats {
            beam_count: beams.len(),
            joint_count: joints.len(),
            aligned_joints: frame.alignments.len() - skipped_joints,
            skipped_joints,
            trimmed_ends: ends().filter(|t| *t == EndTrim::Trimmed).count(),
            degraded_ends: ends()
                .filter(|t| matches!(t, EndTrim::SplitFallback | EndTrim::Kept))
                .count(),
            total_time_ms: frame.elapsed.as_millis() as u64,
        };

        Self {
            joints,
            beams,
            stats,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn point(p: &Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

fn vector(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}
