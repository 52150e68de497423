// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel operations exercised through the `GeometryKernel` trait.

use approx::assert_relative_eq;
use tragwerk_geometry::{
    Curve, CurveEnd, GeometryKernel, MeshKernel, PlanarPatch, Plane, Point3, Solid, Vector3,
};

/// Square 0.2 x 0.2 bar along +X from x = 0 to x = `length`.
fn bar(kernel: &MeshKernel, length: f64, samples: usize) -> Solid {
    let axis = Curve::line(Point3::origin(), Point3::new(length, 0.0, 0.0));
    let sections: Vec<Vec<Point3<f64>>> = kernel
        .divide_by_count(&axis, samples)
        .into_iter()
        .map(|t| {
            let frame = kernel.perpendicular_frame_at(&axis, t).unwrap();
            vec![
                frame.point_at(-0.1, -0.1),
                frame.point_at(0.1, -0.1),
                frame.point_at(0.1, 0.1),
                frame.point_at(-0.1, 0.1),
            ]
        })
        .collect();
    let mut solids = kernel.loft(&sections).unwrap();
    assert_eq!(solids.len(), 1);
    solids.remove(0)
}

#[test]
fn lofted_bar_has_expected_volume() {
    let kernel = MeshKernel::new();
    let solid = bar(&kernel, 3.0, 6);
    assert!(solid.is_closed());
    assert_relative_eq!(solid.signed_volume(), 0.12, epsilon = 1e-9);
    assert_relative_eq!(kernel.area(&solid), 4.0 * 0.2 * 3.0 + 2.0 * 0.04, epsilon = 1e-9);
}

#[test]
fn oblique_trim_stays_closed() {
    let kernel = MeshKernel::new();
    let solid = bar(&kernel, 3.0, 6);
    let plane = Plane::new(Point3::new(2.05, 0.0, 0.0), Vector3::new(1.0, 0.5, 0.2));
    let pieces = kernel.trim(&solid, &plane, 1e-9);
    assert_eq!(pieces.len(), 1);
    assert!(pieces[0].is_closed());
    // An oblique plane through the axis point removes the same volume as a
    // square cut there
    assert_relative_eq!(pieces[0].signed_volume(), 0.04 * 2.05, epsilon = 1e-9);
}

#[test]
fn split_with_patch_then_pick_by_containment() {
    let kernel = MeshKernel::new();
    let solid = bar(&kernel, 3.0, 3);
    let plane = Plane::new(Point3::new(0.75, 0.0, 0.0), Vector3::x());
    let patch = PlanarPatch::square(plane, 1.0);
    let pieces = kernel.split(&solid, &patch, 1e-9);
    assert_eq!(pieces.len(), 2);

    let probe = Point3::new(0.3, 0.0, 0.0);
    let kept: Vec<&Solid> = pieces
        .iter()
        .filter(|piece| kernel.contains(piece, &probe, 1e-9))
        .collect();
    assert_eq!(kept.len(), 1);
    assert_relative_eq!(kept[0].signed_volume(), 0.04 * 0.75, epsilon = 1e-9);
}

#[test]
fn axis_through_bar_hits_both_faces() {
    let kernel = MeshKernel::new();
    let solid = bar(&kernel, 3.0, 3);
    let crossing = Curve::line(Point3::new(1.5, -1.0, 0.0), Point3::new(1.5, 1.0, 0.0));
    let params = kernel.intersect_curve_solid(&crossing, &solid, 1e-9);
    assert_eq!(params.len(), 2);
    assert_relative_eq!(params[0], 0.9, epsilon = 1e-9);
    assert_relative_eq!(params[1], 1.1, epsilon = 1e-9);

    let (point, normal) = kernel
        .closest_point(&solid, &kernel.point_at(&crossing, params[0]))
        .unwrap();
    assert_relative_eq!(point.y, -0.1, epsilon = 1e-9);
    assert_relative_eq!(normal, -Vector3::y(), epsilon = 1e-9);
}

#[test]
fn length_from_end_on_polyline() {
    let kernel = MeshKernel::new();
    let axis = Curve::polyline(vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 3.0),
    ])
    .unwrap();
    assert_eq!(kernel.breakpoints(&axis), vec![1.0]);
    assert_relative_eq!(kernel.length_from_end(&axis, 0.5, CurveEnd::Start), 1.0);
    assert_relative_eq!(kernel.length_from_end(&axis, 0.5, CurveEnd::End), 4.0);
}
