// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Joints and beam alignment.
//!
//! A joint is the set of beams whose axes meet inside one voxel. Aligning it
//! picks the beam that runs through the joint (the main beam) and records
//! on every other beam where its axis enters the main beam's volume and the
//! surface normal there. The main beam is not touched.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;
use tracing::{debug, warn};
use tragwerk_geometry::{CurveEnd, GeometryKernel};

use crate::beam::{classify_parameter, Beam};
use crate::config::FrameConfig;
use crate::error::{Error, Result};
use crate::voxel::{JointKey, JointVoxel};

/// Why a joint was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SkipReason {
    /// The member axes form a closed ring with no continuous member.
    ClosedLoop,
    /// Every member ends at the joint (corner or splice).
    EndpointMeeting,
}

/// Result of [`Joint::align`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Index of the main beam in the frame's beam list.
    Aligned { main_beam: usize },
    Skipped(SkipReason),
}

/// Beams meeting at one location.
#[derive(Debug, Clone)]
pub struct Joint {
    voxel: JointVoxel,
    beams: SmallVec<[usize; 4]>,
    alignment: Option<Alignment>,
    end_tangents: Vec<Vector3<f64>>,
    contact_points: Vec<Point3<f64>>,
}

impl Joint {
    /// Creates a joint over `beams`, indices into the frame's beam list.
    pub fn new(voxel: JointVoxel, beams: impl IntoIterator<Item = usize>) -> Self {
        let mut members: SmallVec<[usize; 4]> = SmallVec::new();
        for beam in beams {
            if !members.contains(&beam) {
                members.push(beam);
            }
        }
        Self {
            voxel,
            beams: members,
            alignment: None,
            end_tangents: Vec::new(),
            contact_points: Vec::new(),
        }
    }

    pub fn key(&self) -> JointKey {
        self.voxel.key()
    }

    pub fn beams(&self) -> &[usize] {
        &self.beams
    }

    pub fn center(&self) -> Point3<f64> {
        self.voxel.center()
    }

    pub fn voxel(&self) -> &JointVoxel {
        &self.voxel
    }

    /// `None` before alignment.
    pub fn alignment(&self) -> Option<Alignment> {
        self.alignment
    }

    pub fn main_beam(&self) -> Option<usize> {
        match self.alignment {
            Some(Alignment::Aligned { main_beam }) => Some(main_beam),
            _ => None,
        }
    }

    /// Contact normals pushed onto the non-main beams, in member order.
    pub fn end_tangents(&self) -> &[Vector3<f64>] {
        &self.end_tangents
    }

    /// Points where the non-main axes enter the main beam, in member order.
    pub fn contact_points(&self) -> &[Point3<f64>] {
        &self.contact_points
    }

    /// How each member relates to the joint centre: the end that sits at the
    /// joint, or `None` for a beam passing through.
    pub fn classify<K: GeometryKernel>(
        &self,
        kernel: &K,
        beams: &[Beam<K>],
        config: &FrameConfig,
    ) -> Result<SmallVec<[Option<CurveEnd>; 4]>> {
        let center = self.center();
        let reach = self.voxel.radius() + config.tolerance;
        self.beams
            .iter()
            .map(|&index| {
                let beam = beams.get(index).ok_or(Error::UnknownBeam(index))?;
                let t = kernel.closest_parameter(beam.axis(), &center);
                let distance = (kernel.point_at(beam.axis(), t) - center).norm();
                if distance > reach {
                    return Err(Error::AxisMissesJoint {
                        beam: index,
                        center,
                        distance,
                        radius: self.voxel.radius(),
                    });
                }
                Ok(classify_parameter(beam.domain(), t, config.tolerance))
            })
            .collect()
    }

    /// Picks the main beam and records an end condition on every other
    /// member. Calling it again returns the first result without touching
    /// the beams.
    pub fn align<K: GeometryKernel>(
        &mut self,
        kernel: &K,
        beams: &mut [Beam<K>],
        config: &FrameConfig,
    ) -> Result<Alignment> {
        if let Some(done) = self.alignment {
            return Ok(done);
        }

        let classes = self.classify(kernel, beams, config)?;
        let through: SmallVec<[usize; 4]> = self
            .beams
            .iter()
            .zip(classes.iter())
            .filter(|(_, class)| class.is_none())
            .map(|(&beam, _)| beam)
            .collect();

        let main = match through.len() {
            1 => through[0],
            0 => {
                let reason = if self.is_closed_loop(kernel, beams, config) {
                    SkipReason::ClosedLoop
                } else {
                    SkipReason::EndpointMeeting
                };
                warn!(center = %self.center(), ?reason, "Joint has no main beam, skipping");
                return Ok(self.finish(Alignment::Skipped(reason)));
            }
            count => {
                if count == self.beams.len() && self.is_closed_loop(kernel, beams, config) {
                    warn!(center = %self.center(), "Closed loop joint, skipping");
                    return Ok(self.finish(Alignment::Skipped(SkipReason::ClosedLoop)));
                }
                return Err(Error::AmbiguousMainBeam {
                    center: self.center(),
                    count,
                });
            }
        };

        // Contacts are computed against the main volume before any beam changes
        let mut contacts: Vec<(usize, CurveEnd, f64, Point3<f64>, Vector3<f64>)> = Vec::new();
        {
            let main_volume = beams[main].volume();
            for (&index, class) in self.beams.iter().zip(classes.iter()) {
                let Some(end) = *class else {
                    continue;
                };
                let beam = &beams[index];
                let hits = kernel.intersect_curve_solid(beam.axis(), main_volume, config.tolerance);
                let parameter = pick_contact(kernel, beam, &hits, end)
                    .ok_or(Error::NoContact { beam: index, main })?;
                let point = kernel.point_at(beam.axis(), parameter);
                let (_, normal) = kernel
                    .closest_point(main_volume, &point)
                    .ok_or(Error::NoContact { beam: index, main })?;
                contacts.push((index, end, parameter, point, normal));
            }
        }

        for (index, end, parameter, point, normal) in contacts {
            beams[index].set_end_condition(end, normal, parameter)?;
            self.end_tangents.push(normal);
            self.contact_points.push(point);
        }

        debug!(
            center = %self.center(),
            main_beam = main,
            contacts = self.contact_points.len(),
            "Aligned joint"
        );
        Ok(self.finish(Alignment::Aligned { main_beam: main }))
    }

    fn finish(&mut self, alignment: Alignment) -> Alignment {
        self.alignment = Some(alignment);
        alignment
    }

    /// `true` when the member axes chain into one closed curve.
    fn is_closed_loop<K: GeometryKernel>(
        &self,
        kernel: &K,
        beams: &[Beam<K>],
        config: &FrameConfig,
    ) -> bool {
        let axes: Vec<K::Curve> = self
            .beams
            .iter()
            .filter_map(|&index| beams.get(index))
            .map(|beam| beam.axis().clone())
            .collect();
        let joined = kernel.join_curves(&axes, config.tolerance);
        joined.len() == 1 && kernel.is_closed(&joined[0], config.tolerance)
    }
}

/// Intersection parameter to cut at. Hits in the half of the domain at
/// `end` are preferred, and among them the one nearest that end.
fn pick_contact<K: GeometryKernel>(
    kernel: &K,
    beam: &Beam<K>,
    hits: &[f64],
    end: CurveEnd,
) -> Option<f64> {
    let domain = beam.domain();
    let distance_to_end = |t: f64| kernel.length_from_end(beam.axis(), t, end);
    let on_side = |t: f64| {
        let half = if t <= domain.mid() {
            CurveEnd::Start
        } else {
            CurveEnd::End
        };
        half == end
    };

    let nearest = |side_only: bool| {
        hits.iter()
            .copied()
            .filter(|&t| !side_only || on_side(t))
            .min_by(|a, b| distance_to_end(*a).total_cmp(&distance_to_end(*b)))
    };

    nearest(true).or_else(|| nearest(false))
}
