// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tragwerk Processing
//!
//! Runs the whole frame pipeline over a list of beam inputs and produces a
//! JSON-ready report of joints, main beams and trims.
//!
//! ```rust,ignore
//! use tragwerk_processing::{process, BeamSpec, FrameReport};
//!
//! let frame = process(&kernel, specs, &FrameConfig::default())?;
//! println!("{}", FrameReport::from_assembly(&kernel, &frame).to_json()?);
//! ```

pub mod pipeline;
pub mod report;

pub use pipeline::{assemble, build_beams, process, BeamSpec, FrameAssembly};
pub use report::{BeamReport, EndReport, FrameReport, FrameStats, JointReport};
