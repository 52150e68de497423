// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use tragwerk_core::{Alignment, EndTrim, Error, FrameConfig, SkipReason};
use tragwerk_geometry::{Curve, CurveEnd, MeshKernel, Point3, Vector3};
use tragwerk_processing::{assemble, build_beams, process, BeamSpec, FrameReport};

fn spec(from: [f64; 3], to: [f64; 3]) -> BeamSpec<Curve> {
    BeamSpec::new(
        Curve::line(Point3::from(from), Point3::from(to)),
        0.2,
        0.2,
        Vector3::z(),
    )
}

fn tee_specs() -> Vec<BeamSpec<Curve>> {
    vec![
        spec([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0]),
        spec([0.0, -2.0, 0.0], [0.0, 0.0, 0.0]),
        spec([0.0, 2.0, 0.0], [0.0, 0.0, 0.0]),
    ]
}

fn config(parallel: bool) -> FrameConfig {
    FrameConfig::built_in()
        .with_evaluation_distance(0.5)
        .with_parallel(parallel)
}

#[test]
fn tee_frame_is_assembled() {
    let kernel = MeshKernel::new();
    let frame = process(&kernel, tee_specs(), &config(false)).unwrap();

    assert_eq!(frame.joints.len(), 1);
    assert_eq!(frame.alignments, vec![Alignment::Aligned { main_beam: 0 }]);
    assert_eq!(frame.outcomes[0].start, EndTrim::Untouched);
    assert_eq!(frame.outcomes[0].end, EndTrim::Untouched);
    assert_eq!(frame.outcomes[1].end, EndTrim::Trimmed);
    assert_eq!(frame.outcomes[2].end, EndTrim::Trimmed);
    assert!(frame.beams[1].is_modified(CurveEnd::End));
}

#[test]
fn parallel_and_sequential_agree() {
    let kernel = MeshKernel::new();
    let sequential = process(&kernel, tee_specs(), &config(false)).unwrap();
    let parallel = process(&kernel, tee_specs(), &config(true)).unwrap();

    assert_eq!(sequential.alignments, parallel.alignments);
    assert_eq!(sequential.outcomes, parallel.outcomes);
    for (a, b) in sequential.beams.iter().zip(parallel.beams.iter()) {
        assert_eq!(a.geometry(), b.geometry());
    }
}

#[test]
fn input_beams_are_not_modified() {
    let kernel = MeshKernel::new();
    let config = config(false);
    let beams = build_beams(&kernel, tee_specs(), &config).unwrap();
    let frame = assemble(&kernel, &beams, &config).unwrap();

    assert!(frame.beams[1].is_modified(CurveEnd::End));
    assert!(beams.iter().all(|b| !b.is_modified(CurveEnd::End)));
    assert!(beams.iter().all(|b| b.geometry() == b.volume()));
}

#[test]
fn corner_frame_is_skipped() {
    let kernel = MeshKernel::new();
    let specs = vec![
        spec([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]),
        spec([0.0, 2.0, 0.0], [0.0, 0.0, 0.0]),
    ];
    let frame = process(&kernel, specs, &config(false)).unwrap();
    assert_eq!(
        frame.alignments,
        vec![Alignment::Skipped(SkipReason::EndpointMeeting)]
    );
    assert!(frame.outcomes.iter().all(|o| *o == Default::default()));
}

#[test]
fn ambiguous_joint_aborts_the_frame() {
    let kernel = MeshKernel::new();
    let specs = vec![
        spec([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0]),
        spec([0.0, -2.0, 0.0], [0.0, 2.0, 0.0]),
    ];
    let result = process(&kernel, specs, &config(true));
    assert!(matches!(result, Err(Error::AmbiguousMainBeam { .. })));
}

#[test]
fn invalid_beam_input_is_reported() {
    let kernel = MeshKernel::new();
    let mut specs = tee_specs();
    specs[1].width = 0.0;
    assert!(build_beams(&kernel, specs, &config(true)).is_err());
}

#[test]
fn report_describes_the_tee() {
    let kernel = MeshKernel::new();
    let frame = process(&kernel, tee_specs(), &config(false)).unwrap();
    let report = FrameReport::from_assembly(&kernel, &frame);

    assert_eq!(report.stats.beam_count, 3);
    assert_eq!(report.stats.joint_count, 1);
    assert_eq!(report.stats.aligned_joints, 1);
    assert_eq!(report.stats.skipped_joints, 0);
    assert_eq!(report.stats.trimmed_ends, 2);
    assert_eq!(report.stats.degraded_ends, 0);

    let joint = &report.joints[0];
    assert_eq!(joint.main_beam, Some(0));
    assert!(joint.skipped.is_none());
    assert_eq!(joint.contact_points.len(), 2);

    let branch = &report.beams[1];
    assert!(branch.end.modified);
    assert!(!branch.start.modified);
    assert_relative_eq!(branch.end.trimmed_length, 0.1, epsilon = 1e-9);
    assert_relative_eq!(branch.end.tangent[1], -1.0, epsilon = 1e-9);
    assert_eq!(branch.joints, vec![0]);
    assert_eq!(report.beams[0].joints, vec![0]);
    assert_relative_eq!(report.beams[0].axis_length, 4.0, epsilon = 1e-12);
}

#[test]
fn report_serialises_to_json() {
    let kernel = MeshKernel::new();
    let frame = process(&kernel, tee_specs(), &config(false)).unwrap();
    let json = FrameReport::from_assembly(&kernel, &frame).to_json().unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["stats"]["joint_count"], 1);
    assert_eq!(value["joints"][0]["main_beam"], 0);
    assert_eq!(value["beams"][1]["end"]["trim"], "trimmed");
    assert_eq!(value["beams"][0]["start"]["trim"], "untouched");

    let parsed: FrameReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.beams.len(), 3);
}
