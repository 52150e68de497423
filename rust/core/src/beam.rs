// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Beams: an axis, a rectangular cross-section and the solid lofted from it.
//!
//! The lofted volume is built once and never changes. Joint alignment
//! records per-end overrides; [`Beam::shorten_ends`] recomputes the current
//! geometry from the volume and those overrides, so it can be called any
//! number of times with the same result.

use std::fmt;

use nalgebra::Vector3;
use tracing::{debug, warn};
use tragwerk_geometry::{CurveEnd, GeometryKernel, Interval, PlanarPatch, Plane};

use crate::config::{FrameConfig, TrimFallback};
use crate::error::{Error, Result};

/// End condition recorded by joint alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndOverride {
    /// Outward surface normal of the main beam at the contact
    pub tangent: Vector3<f64>,
    /// Axis parameter of the contact
    pub parameter: f64,
}

/// What happened to one end during [`Beam::shorten_ends`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EndTrim {
    /// No override on this end
    #[default]
    Untouched,
    /// The plane trim left exactly one piece
    Trimmed,
    /// The bounded split fallback picked a piece
    SplitFallback,
    /// Trimming failed and the previous geometry was kept
    Kept,
}

/// Per-end result of [`Beam::shorten_ends`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrimOutcome {
    pub start: EndTrim,
    pub end: EndTrim,
}

impl TrimOutcome {
    pub fn get(&self, end: CurveEnd) -> EndTrim {
        match end {
            CurveEnd::Start => self.start,
            CurveEnd::End => self.end,
        }
    }

    fn set(&mut self, end: CurveEnd, trim: EndTrim) {
        match end {
            CurveEnd::Start => self.start = trim,
            CurveEnd::End => self.end = trim,
        }
    }

    /// `true` when some end kept geometry it should have cut.
    pub fn is_degraded(&self) -> bool {
        self.start == EndTrim::Kept || self.end == EndTrim::Kept
    }
}

/// Structural member with a rectangular cross-section.
///
/// Cloning is the deep copy used by the joint factory: axis, both solids and
/// the end overrides are duplicated.
pub struct Beam<K: GeometryKernel> {
    axis: K::Curve,
    domain: Interval,
    width: f64,
    height: f64,
    up: Vector3<f64>,
    evaluation_distance: f64,
    volume: K::Solid,
    geometry: K::Solid,
    start: Option<EndOverride>,
    end: Option<EndOverride>,
}

impl<K: GeometryKernel> Beam<K> {
    /// Lofts the beam volume along `axis`.
    ///
    /// Cross-sections are placed every `config.evaluation_distance` (and at
    /// every axis breakpoint). Each section's X axis follows `tangent × up`,
    /// so `width` runs across the beam and `height` along `up`.
    pub fn new(
        kernel: &K,
        axis: K::Curve,
        width: f64,
        height: f64,
        up: Vector3<f64>,
        config: &FrameConfig,
    ) -> Result<Self> {
        let step = config.evaluation_distance;
        for (name, value) in [("width", width), ("height", height), ("evaluation distance", step)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::BeamConstruction(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let up = up.try_normalize(1e-12).ok_or_else(|| {
            Error::BeamConstruction("up direction has zero length".to_string())
        })?;

        let length = kernel.length(&axis);
        if !length.is_finite() || length <= config.tolerance {
            return Err(Error::BeamConstruction(format!(
                "axis length {length} is below tolerance"
            )));
        }

        let domain = kernel.domain(&axis);
        let count = (length / step).ceil().max(1.0) as usize;
        let mut params = kernel.divide_by_count(&axis, count);
        params.extend(kernel.breakpoints(&axis));
        params.sort_by(f64::total_cmp);
        let merge = domain.length() * 1e-9;
        params.dedup_by(|a, b| (*a - *b).abs() <= merge);

        let (half_w, half_h) = (width / 2.0, height / 2.0);
        let mut sections = Vec::with_capacity(params.len());
        for &t in &params {
            let tangent = kernel.tangent_at(&axis, t);
            let mut frame = kernel.perpendicular_frame_at(&axis, t).ok_or_else(|| {
                Error::BeamConstruction(format!("no perpendicular frame at parameter {t}"))
            })?;
            let x_direction = tangent.cross(&up);
            if x_direction.norm() < 1e-9 {
                return Err(Error::BeamConstruction(format!(
                    "up direction is parallel to the axis at parameter {t}"
                )));
            }
            let angle = frame.signed_angle(&frame.x_axis, &x_direction);
            frame.rotate_about_normal(angle);
            sections.push(vec![
                frame.point_at(-half_w, -half_h),
                frame.point_at(half_w, -half_h),
                frame.point_at(half_w, half_h),
                frame.point_at(-half_w, half_h),
            ]);
        }

        let mut solids = kernel.loft(&sections)?;
        if solids.len() != 1 {
            return Err(Error::BeamConstruction(format!(
                "loft produced {} solids instead of one",
                solids.len()
            )));
        }
        let volume = solids.remove(0);
        debug!(sections = sections.len(), length, "Lofted beam volume");

        Ok(Self {
            axis,
            domain,
            width,
            height,
            up,
            evaluation_distance: step,
            geometry: volume.clone(),
            volume,
            start: None,
            end: None,
        })
    }

    pub fn axis(&self) -> &K::Curve {
        &self.axis
    }

    pub fn domain(&self) -> Interval {
        self.domain
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn up(&self) -> Vector3<f64> {
        self.up
    }

    pub fn evaluation_distance(&self) -> f64 {
        self.evaluation_distance
    }

    /// The untrimmed lofted solid.
    pub fn volume(&self) -> &K::Solid {
        &self.volume
    }

    /// The current, possibly trimmed, solid.
    pub fn geometry(&self) -> &K::Solid {
        &self.geometry
    }

    pub fn end_override(&self, end: CurveEnd) -> Option<&EndOverride> {
        match end {
            CurveEnd::Start => self.start.as_ref(),
            CurveEnd::End => self.end.as_ref(),
        }
    }

    pub fn is_modified(&self, end: CurveEnd) -> bool {
        self.end_override(end).is_some()
    }

    /// Records an override for one end. The geometry changes only on the
    /// next [`Beam::shorten_ends`].
    pub fn set_end_condition(
        &mut self,
        end: CurveEnd,
        tangent: Vector3<f64>,
        parameter: f64,
    ) -> Result<()> {
        let slack = self.domain.length() * 1e-9;
        if !parameter.is_finite() || !self.domain.includes(parameter, slack) {
            return Err(Error::ParameterOutOfDomain {
                parameter,
                min: self.domain.min,
                max: self.domain.max,
            });
        }
        let tangent = tangent.try_normalize(1e-12).ok_or_else(|| {
            tragwerk_geometry::Error::DegenerateGeometry(
                "end override tangent has zero length".to_string(),
            )
        })?;

        let value = Some(EndOverride {
            tangent,
            parameter: self.domain.clamp(parameter),
        });
        match end {
            CurveEnd::Start => self.start = value,
            CurveEnd::End => self.end = value,
        }
        Ok(())
    }

    /// Removes the override on one end.
    pub fn clear_end_condition(&mut self, end: CurveEnd) {
        match end {
            CurveEnd::Start => self.start = None,
            CurveEnd::End => self.end = None,
        }
    }

    /// Tangents at both ends: the override where one is set, the axis
    /// tangent otherwise.
    pub fn end_tangents(&self, kernel: &K) -> [Vector3<f64>; 2] {
        [CurveEnd::Start, CurveEnd::End].map(|end| match self.end_override(end) {
            Some(o) => o.tangent,
            None => kernel.tangent_at(&self.axis, self.end_parameter(end)),
        })
    }

    /// Axis length cut away at one end by its override.
    pub fn trimmed_length(&self, kernel: &K, end: CurveEnd) -> f64 {
        self.end_override(end)
            .map_or(0.0, |o| kernel.length_from_end(&self.axis, o.parameter, end))
    }

    fn end_parameter(&self, end: CurveEnd) -> f64 {
        match end {
            CurveEnd::Start => self.domain.min,
            CurveEnd::End => self.domain.max,
        }
    }

    /// Rebuilds the current geometry from the volume and the end overrides,
    /// cutting the start first and then the end.
    pub fn shorten_ends(&mut self, kernel: &K, config: &FrameConfig) -> Result<TrimOutcome> {
        let mut outcome = TrimOutcome::default();
        let mut current = self.volume.clone();

        for end in [CurveEnd::Start, CurveEnd::End] {
            let Some(over) = self.end_override(end).copied() else {
                continue;
            };
            let (next, trim) = self.cut(kernel, &current, end, &over, config)?;
            current = next;
            outcome.set(end, trim);
        }

        self.geometry = current;
        Ok(outcome)
    }

    fn cut(
        &self,
        kernel: &K,
        solid: &K::Solid,
        end: CurveEnd,
        over: &EndOverride,
        config: &FrameConfig,
    ) -> Result<(K::Solid, EndTrim)> {
        let origin = kernel.point_at(&self.axis, over.parameter);
        let plane = Plane::new(origin, -over.tangent);

        let mut pieces = kernel.trim(solid, &plane, config.tolerance);
        if pieces.len() == 1 {
            return Ok((pieces.remove(0), EndTrim::Trimmed));
        }

        warn!(
            ?end,
            pieces = pieces.len(),
            parameter = over.parameter,
            "Plane trim did not leave one piece"
        );
        match config.trim_fallback {
            TrimFallback::Fail => {
                return Err(Error::DegenerateTrim {
                    end,
                    reason: format!("plane trim left {} pieces", pieces.len()),
                })
            }
            TrimFallback::KeepUntrimmed => return Ok((solid.clone(), EndTrim::Kept)),
            TrimFallback::ContainingAxis | TrimFallback::SecondLargestArea => {}
        }

        // Large enough for the section even under an oblique cut
        let half_size = self.width.hypot(self.height);
        let patch = PlanarPatch::square(plane, half_size);
        let pieces = kernel.split(solid, &patch, config.tolerance);
        if pieces.len() != 2 {
            warn!(?end, pieces = pieces.len(), "Split fallback failed, keeping geometry");
            let reason = format!("split left {} pieces", pieces.len());
            return self.keep_or_fail(solid, end, reason, config);
        }

        let chosen = match config.trim_fallback {
            TrimFallback::SecondLargestArea => {
                let mut by_area: Vec<(f64, usize)> = pieces
                    .iter()
                    .enumerate()
                    .map(|(i, piece)| (kernel.area(piece), i))
                    .collect();
                by_area.sort_by(|a, b| b.0.total_cmp(&a.0));
                Some(by_area[1].1)
            }
            _ => {
                let probe = kernel.point_at(&self.axis, self.probe_parameter(end, over));
                let inside: Vec<usize> = (0..pieces.len())
                    .filter(|&i| kernel.contains(&pieces[i], &probe, config.tolerance))
                    .collect();
                match inside.as_slice() {
                    [only] => Some(*only),
                    _ => None,
                }
            }
        };

        match chosen {
            Some(index) => {
                debug!(?end, piece = index, "Split fallback selected a piece");
                let piece = pieces.into_iter().nth(index).unwrap_or_else(|| solid.clone());
                Ok((piece, EndTrim::SplitFallback))
            }
            None => {
                warn!(?end, "No split piece contains the axis, keeping geometry");
                self.keep_or_fail(solid, end, "no piece contains the axis".to_string(), config)
            }
        }
    }

    /// Axis parameter halfway between the cut and the other end's limit.
    fn probe_parameter(&self, end: CurveEnd, over: &EndOverride) -> f64 {
        let other = end.opposite();
        let limit = self
            .end_override(other)
            .map_or_else(|| self.end_parameter(other), |o| o.parameter);
        0.5 * (over.parameter + limit)
    }

    fn keep_or_fail(
        &self,
        solid: &K::Solid,
        end: CurveEnd,
        reason: String,
        config: &FrameConfig,
    ) -> Result<(K::Solid, EndTrim)> {
        if config.trim_fallback == TrimFallback::Fail {
            return Err(Error::DegenerateTrim { end, reason });
        }
        Ok((solid.clone(), EndTrim::Kept))
    }
}

impl<K: GeometryKernel> Clone for Beam<K> {
    fn clone(&self) -> Self {
        Self {
            axis: self.axis.clone(),
            domain: self.domain,
            width: self.width,
            height: self.height,
            up: self.up,
            evaluation_distance: self.evaluation_distance,
            volume: self.volume.clone(),
            geometry: self.geometry.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

impl<K: GeometryKernel> fmt::Debug for Beam<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Beam")
            .field("axis", &self.axis)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("up", &self.up)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

/// Axis end whose parameter lies within `epsilon` of `t`, where epsilon is
/// the domain length times `tolerance`. `None` means the axis passes
/// through `t`.
pub fn classify_parameter(domain: Interval, t: f64, tolerance: f64) -> Option<CurveEnd> {
    let epsilon = domain.length() * tolerance;
    if (t - domain.min).abs() <= epsilon {
        Some(CurveEnd::Start)
    } else if (domain.max - t).abs() <= epsilon {
        Some(CurveEnd::End)
    } else {
        None
    }
}
