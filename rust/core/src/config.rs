// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame configuration, loaded from environment variables or set in code.
//!
//! The tolerance is part of the configuration and is passed to every
//! operation that needs it; nothing reads it from global state.

use crate::error::{Error, Result};

/// What a beam does when a plane trim does not leave exactly one piece and
/// the bounded split fallback produced two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrimFallback {
    /// Keep the piece containing the axis between the cut and the other end.
    #[default]
    ContainingAxis,
    /// Keep the second largest piece by surface area.
    SecondLargestArea,
    /// Keep the geometry from before the cut.
    KeepUntrimmed,
    /// Abort with [`Error::DegenerateTrim`].
    Fail,
}

impl TrimFallback {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "containing_axis" | "containing-axis" => Some(Self::ContainingAxis),
            "second_largest_area" | "second-largest-area" => Some(Self::SecondLargestArea),
            "keep_untrimmed" | "keep-untrimmed" | "keep" => Some(Self::KeepUntrimmed),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// Frame assembly configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameConfig {
    /// Absolute model tolerance.
    pub tolerance: f64,
    /// Radius of the voxel placed around every axis intersection.
    pub joint_radius: f64,
    /// Distance between cross-sections when lofting beam volumes.
    pub evaluation_distance: f64,
    /// Minimum shared length for two axes to count as overlapping.
    pub overlap_tolerance: f64,
    pub trim_fallback: TrimFallback,
    /// Re-check sphere containment after the bounding box overlap.
    pub strict_merge: bool,
    /// Build and shorten beams on the rayon pool.
    pub parallel: bool,
}

impl FrameConfig {
    /// Load configuration from `TRAGWERK_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::built_in();
        Self {
            tolerance: env_parse("TRAGWERK_TOLERANCE", defaults.tolerance),
            joint_radius: env_parse("TRAGWERK_JOINT_RADIUS", defaults.joint_radius),
            evaluation_distance: env_parse(
                "TRAGWERK_EVALUATION_DISTANCE",
                defaults.evaluation_distance,
            ),
            overlap_tolerance: env_parse("TRAGWERK_OVERLAP_TOLERANCE", defaults.overlap_tolerance),
            trim_fallback: std::env::var("TRAGWERK_TRIM_FALLBACK")
                .ok()
                .and_then(|v| TrimFallback::parse(&v))
                .unwrap_or(defaults.trim_fallback),
            strict_merge: env_parse("TRAGWERK_STRICT_MERGE", defaults.strict_merge),
            parallel: env_parse("TRAGWERK_PARALLEL", defaults.parallel),
        }
    }

    /// Values used when no environment variable is set.
    pub fn built_in() -> Self {
        Self {
            tolerance: 1e-3,
            joint_radius: 0.05,
            evaluation_distance: 0.1,
            overlap_tolerance: 0.0,
            trim_fallback: TrimFallback::default(),
            strict_merge: false,
            parallel: true,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_joint_radius(mut self, joint_radius: f64) -> Self {
        self.joint_radius = joint_radius;
        self
    }

    pub fn with_evaluation_distance(mut self, evaluation_distance: f64) -> Self {
        self.evaluation_distance = evaluation_distance;
        self
    }

    pub fn with_trim_fallback(mut self, trim_fallback: TrimFallback) -> Self {
        self.trim_fallback = trim_fallback;
        self
    }

    pub fn with_strict_merge(mut self, strict_merge: bool) -> Self {
        self.strict_merge = strict_merge;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Rejects non-positive or non-finite distances.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tolerance", self.tolerance),
            ("joint_radius", self.joint_radius),
            ("evaluation_distance", self.evaluation_distance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !self.overlap_tolerance.is_finite() || self.overlap_tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "overlap_tolerance must be zero or positive, got {}",
                self.overlap_tolerance
            )));
        }
        Ok(())
    }
}

/// Built-in values. Use [`FrameConfig::from_env`] to honour `TRAGWERK_*`.
impl Default for FrameConfig {
    fn default() -> Self {
        Self::built_in()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
