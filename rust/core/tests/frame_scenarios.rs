// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end frame scenarios on the mesh kernel.

use approx::assert_relative_eq;
use tragwerk_core::{
    create_joints, Alignment, Beam, EndTrim, Error, FrameConfig, JointSet, SkipReason,
    TrimFallback,
};
use tragwerk_geometry::{Curve, CurveEnd, GeometryKernel, MeshKernel, Point3, Vector3};

fn config() -> FrameConfig {
    FrameConfig::built_in()
        .with_evaluation_distance(0.5)
        .with_parallel(false)
}

fn line_beam(from: [f64; 3], to: [f64; 3], config: &FrameConfig) -> Beam<MeshKernel> {
    let axis = Curve::line(Point3::from(from), Point3::from(to));
    Beam::new(&MeshKernel, axis, 0.2, 0.2, Vector3::z(), config).unwrap()
}

fn align_all(set: &mut JointSet<MeshKernel>, config: &FrameConfig) -> Vec<Alignment> {
    let JointSet { joints, beams } = set;
    joints
        .iter_mut()
        .map(|joint| joint.align(&MeshKernel, beams, config).unwrap())
        .collect()
}

fn assert_joints_have_two_beams(set: &JointSet<MeshKernel>) {
    for joint in &set.joints {
        assert!(joint.beams().len() >= 2, "joint {:?} has one beam", joint.key());
    }
}

#[test]
fn crossing_beams_have_no_main_beam() {
    let config = config();
    let beams = vec![
        line_beam([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], &config),
        line_beam([0.0, -2.0, 0.0], [0.0, 2.0, 0.0], &config),
    ];
    let mut set = create_joints(&MeshKernel, &beams, &config).unwrap();
    assert_eq!(set.joints.len(), 1);
    assert_eq!(set.joints[0].beams().len(), 2);

    let JointSet { joints, beams } = &mut set;
    let result = joints[0].align(&MeshKernel, beams, &config);
    assert!(matches!(result, Err(Error::AmbiguousMainBeam { count: 2, .. })));
}

#[test]
fn tee_joint_trims_both_branches() {
    let config = config();
    let kernel = MeshKernel;
    let beams = vec![
        line_beam([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], &config),
        line_beam([0.0, -2.0, 0.0], [0.0, 0.0, 0.0], &config),
        line_beam([0.0, 2.0, 0.0], [0.0, 0.0, 0.0], &config),
    ];
    let mut set = create_joints(&kernel, &beams, &config).unwrap();
    assert_eq!(set.joints.len(), 1);
    assert_joints_have_two_beams(&set);

    let alignments = align_all(&mut set, &config);
    assert_eq!(alignments, vec![Alignment::Aligned { main_beam: 0 }]);

    let joint = &set.joints[0];
    assert_eq!(joint.contact_points().len(), 2);
    let main_volume = set.beams[0].volume();
    for point in joint.contact_points() {
        let (surface, _) = kernel.closest_point(main_volume, point).unwrap();
        assert!((surface - point).norm() <= config.tolerance);
    }

    for beam in &mut set.beams {
        beam.shorten_ends(&kernel, &config).unwrap();
    }
    assert!(!set.beams[0].is_modified(CurveEnd::Start));
    assert!(!set.beams[0].is_modified(CurveEnd::End));
    assert!(set.beams[1].is_modified(CurveEnd::End));
    assert!(set.beams[2].is_modified(CurveEnd::End));

    let below = set.beams[1].geometry().bounds().unwrap();
    let above = set.beams[2].geometry().bounds().unwrap();
    assert_relative_eq!(below.max.y, -0.1, epsilon = 1e-9);
    assert_relative_eq!(above.min.y, 0.1, epsilon = 1e-9);

    // The main beam keeps its full volume
    assert_eq!(set.beams[0].geometry(), set.beams[0].volume());
    assert_relative_eq!(set.beams[1].trimmed_length(&kernel, CurveEnd::End), 0.1, epsilon = 1e-9);
}

fn polyline_beam(points: &[[f64; 3]], config: &FrameConfig) -> Beam<MeshKernel> {
    let axis = Curve::polyline(points.iter().copied().map(Point3::from).collect()).unwrap();
    Beam::new(&MeshKernel, axis, 0.2, 0.2, Vector3::z(), config).unwrap()
}

#[test]
fn ring_of_beams_is_skipped_as_closed_loop() {
    let config = config();
    let beams = vec![
        polyline_beam(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0]], &config),
        polyline_beam(&[[0.0, 0.0, 0.0], [0.0, 2.0, 0.0], [2.0, 2.0, 0.0]], &config),
    ];
    let mut set = create_joints(&MeshKernel, &beams, &config).unwrap();
    assert_eq!(set.joints.len(), 2);
    assert_joints_have_two_beams(&set);

    let alignments = align_all(&mut set, &config);
    assert_eq!(
        alignments,
        vec![Alignment::Skipped(SkipReason::ClosedLoop); 2]
    );
    for beam in &set.beams {
        assert!(!beam.is_modified(CurveEnd::Start));
        assert!(!beam.is_modified(CurveEnd::End));
    }
    assert!(set.joints.iter().all(|joint| joint.main_beam().is_none()));
}

#[test]
fn separate_joints_stay_separate() {
    // Radius and spacing are exact in binary: the voxel boxes touch
    let config = config().with_joint_radius(0.125);
    let beams = vec![
        line_beam([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], &config),
        line_beam([0.0, -2.0, 0.0], [0.0, 0.0, 0.0], &config),
        line_beam([0.25, -2.0, 0.0], [0.25, 0.0, 0.0], &config),
    ];
    let mut set = create_joints(&MeshKernel, &beams, &config).unwrap();
    assert_eq!(set.joints.len(), 2);
    assert_joints_have_two_beams(&set);
    let mut subsets: Vec<Vec<usize>> = set
        .joints
        .iter()
        .map(|joint| {
            let mut members = joint.beams().to_vec();
            members.sort_unstable();
            members
        })
        .collect();
    subsets.sort();
    assert_eq!(subsets, vec![vec![0, 1], vec![0, 2]]);

    let alignments = align_all(&mut set, &config);
    assert!(alignments
        .iter()
        .all(|a| *a == Alignment::Aligned { main_beam: 0 }));
}

#[test]
fn overlapping_voxels_merge() {
    let config = config().with_joint_radius(0.13);
    let beams = vec![
        line_beam([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], &config),
        line_beam([0.0, -2.0, 0.0], [0.0, 0.0, 0.0], &config),
        line_beam([0.25, -2.0, 0.0], [0.25, 0.0, 0.0], &config),
    ];
    let set = create_joints(&MeshKernel, &beams, &config).unwrap();
    assert_eq!(set.joints.len(), 1);
    assert_eq!(set.joints[0].beams().len(), 3);
}

#[test]
fn isolated_beam_is_left_alone() {
    let config = config();
    let kernel = MeshKernel;
    let beams = vec![
        line_beam([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], &config),
        line_beam([0.0, -2.0, 0.0], [0.0, 0.0, 0.0], &config),
        line_beam([0.0, 0.0, 5.0], [3.0, 0.0, 5.0], &config),
    ];
    let mut set = create_joints(&kernel, &beams, &config).unwrap();
    assert!(set.joints.iter().all(|joint| !joint.beams().contains(&2)));
    align_all(&mut set, &config);

    let outcome = set.beams[2].shorten_ends(&kernel, &config).unwrap();
    assert_eq!(outcome.start, EndTrim::Untouched);
    assert_eq!(outcome.end, EndTrim::Untouched);
    assert_eq!(set.beams[2].geometry(), set.beams[2].volume());
}

#[test]
fn factory_works_on_copies() {
    let config = config();
    let beams = vec![
        line_beam([-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], &config),
        line_beam([0.0, -2.0, 0.0], [0.0, 0.0, 0.0], &config),
    ];
    let mut set = create_joints(&MeshKernel, &beams, &config).unwrap();
    align_all(&mut set, &config);
    assert!(set.beams[1].is_modified(CurveEnd::End));
    assert!(!beams[1].is_modified(CurveEnd::End));
}

#[test]
fn shorten_ends_is_idempotent() {
    let config = config();
    let kernel = MeshKernel;
    let mut beam = line_beam([0.0, 0.0, 0.0], [3.0, 0.0, 0.0], &config);
    beam.set_end_condition(CurveEnd::End, Vector3::new(-1.0, 0.3, 0.1), 2.3)
        .unwrap();
    beam.shorten_ends(&kernel, &config).unwrap();
    let first = beam.geometry().clone();
    beam.shorten_ends(&kernel, &config).unwrap();
    assert_eq!(beam.geometry(), &first);
}

#[test]
fn duplicate_does_not_touch_original() {
    let config = config();
    let kernel = MeshKernel;
    let original = line_beam([0.0, 0.0, 0.0], [3.0, 0.0, 0.0], &config);
    let mut copy = original.clone();
    copy.set_end_condition(CurveEnd::Start, Vector3::x(), 1.0).unwrap();
    copy.shorten_ends(&kernel, &config).unwrap();

    assert_ne!(copy.geometry(), original.geometry());
    assert_eq!(original.geometry(), original.volume());
    assert_eq!(copy.volume(), original.volume());
    assert!(!original.is_modified(CurveEnd::Start));
}

/// S-shaped beam whose last leg is cut near its end. The infinite cutting
/// plane also crosses the first and third legs, so the plane trim leaves
/// two pieces and the split fallback decides.
fn s_beam(config: &FrameConfig) -> Beam<MeshKernel> {
    let axis = Curve::polyline(vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(4.0, 0.0, 0.0),
        Point3::new(4.0, 2.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
        Point3::new(0.0, 4.0, 0.0),
        Point3::new(4.0, 4.0, 0.0),
    ])
    .unwrap();
    let mut beam = Beam::new(&MeshKernel, axis, 0.2, 0.2, Vector3::z(), config).unwrap();
    // Contact at (3.2, 4, 0) against a face whose normal points back along -X
    beam.set_end_condition(CurveEnd::End, -Vector3::x(), 4.8)
        .unwrap();
    beam
}

#[test]
fn split_fallback_keeps_the_piece_on_the_axis() {
    let config = config();
    let kernel = MeshKernel;
    let mut beam = s_beam(&config);
    let outcome = beam.shorten_ends(&kernel, &config).unwrap();
    assert_eq!(outcome.end, EndTrim::SplitFallback);

    let geometry = beam.geometry();
    assert!(kernel.contains(geometry, &Point3::new(1.0, 4.0, 0.0), 1e-9));
    assert!(kernel.contains(geometry, &Point3::new(3.6, 0.0, 0.0), 1e-9));
    assert!(!kernel.contains(geometry, &Point3::new(3.6, 4.0, 0.0), 1e-9));
}

#[test]
fn second_largest_area_picks_the_offcut() {
    let config = config().with_trim_fallback(TrimFallback::SecondLargestArea);
    let kernel = MeshKernel;
    let mut beam = s_beam(&config);
    let outcome = beam.shorten_ends(&kernel, &config).unwrap();
    assert_eq!(outcome.end, EndTrim::SplitFallback);
    assert!(kernel.contains(beam.geometry(), &Point3::new(3.6, 4.0, 0.0), 1e-9));
    assert!(!kernel.contains(beam.geometry(), &Point3::new(1.0, 4.0, 0.0), 1e-9));
}

#[test]
fn fallback_policies_keep_or_fail() {
    let kernel = MeshKernel;

    let keep = config().with_trim_fallback(TrimFallback::KeepUntrimmed);
    let mut beam = s_beam(&keep);
    let outcome = beam.shorten_ends(&kernel, &keep).unwrap();
    assert_eq!(outcome.end, EndTrim::Kept);
    assert!(outcome.is_degraded());
    assert_eq!(beam.geometry(), beam.volume());

    let fail = config().with_trim_fallback(TrimFallback::Fail);
    let mut beam = s_beam(&fail);
    let result = beam.shorten_ends(&kernel, &fail);
    assert!(matches!(
        result,
        Err(Error::DegenerateTrim {
            end: CurveEnd::End,
            ..
        })
    ));
}
