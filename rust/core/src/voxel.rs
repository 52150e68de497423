// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Joint voxels and the arena that hands out their keys.
//!
//! A voxel is a bounding cube and sphere around a candidate joint location.
//! It is only a merge key; it says nothing about the beams' volumes.

use slotmap::{new_key_type, SlotMap};
use tragwerk_geometry::{Aabb, Point3};

new_key_type! {
    /// Key of a joint voxel, and of the joint built around it.
    pub struct JointKey;
}

/// Immutable bounding volume around a candidate joint point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointVoxel {
    key: JointKey,
    center: Point3<f64>,
    radius: f64,
    bounds: Aabb,
}

impl JointVoxel {
    pub fn new(key: JointKey, center: Point3<f64>, radius: f64) -> Self {
        let radius = radius.abs();
        Self {
            key,
            center,
            radius,
            bounds: Aabb::from_center_radius(center, radius),
        }
    }

    #[inline]
    pub fn key(&self) -> JointKey {
        self.key
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Strict sphere containment: `|center - point| < radius`.
    #[inline]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (self.center - point).norm() < self.radius
    }
}

/// Slot storage for voxels.
///
/// Keys of released candidates are reused by later reservations, so the key
/// space follows the number of realised joints rather than the number of
/// beam pairs tested.
#[derive(Debug, Default)]
pub struct VoxelArena {
    voxels: SlotMap<JointKey, JointVoxel>,
}

impl VoxelArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a candidate voxel and returns its key.
    pub fn reserve(&mut self, center: Point3<f64>, radius: f64) -> JointKey {
        self.voxels
            .insert_with_key(|key| JointVoxel::new(key, center, radius))
    }

    /// Frees a candidate that did not become a joint.
    pub fn release(&mut self, key: JointKey) -> Option<JointVoxel> {
        self.voxels.remove(key)
    }

    pub fn get(&self, key: JointKey) -> Option<&JointVoxel> {
        self.voxels.get(key)
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Live voxels in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &JointVoxel> {
        self.voxels.values()
    }
}
