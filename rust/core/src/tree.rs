// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial merge index for joint voxels.
//!
//! A grid hash over voxel bounding boxes. Inserting a voxel either finds a
//! registered voxel whose box overlaps the new one and returns that key, or
//! registers the new voxel under its own key. This is the "find-or-add" used
//! to cluster axis intersection points into joints.
//!
//! Box overlap is an approximation of "same joint": two points closer than
//! the radius can sit in boxes that only touch, and two points farther apart
//! can sit in overlapping boxes. `strict` adds a sphere containment check
//! after the box test.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tragwerk_geometry::Aabb;

use crate::voxel::{JointKey, JointVoxel};

type Cell = (i64, i64, i64);

/// Grid-hashed index over registered joint voxels.
#[derive(Debug)]
pub struct SpatialMergeIndex {
    cell_size: f64,
    strict: bool,
    /// Registered voxels in insertion order
    entries: Vec<JointVoxel>,
    grid: FxHashMap<Cell, SmallVec<[u32; 4]>>,
}

impl SpatialMergeIndex {
    /// Creates an index for voxels of radius `joint_radius`.
    pub fn new(joint_radius: f64, strict: bool) -> Self {
        Self {
            // One voxel box spans at most two cells per axis
            cell_size: (2.0 * joint_radius.abs()).max(f64::MIN_POSITIVE),
            strict,
            entries: Vec::new(),
            grid: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered voxels in insertion order.
    pub fn voxels(&self) -> &[JointVoxel] {
        &self.entries
    }

    /// Returns the key of the earliest registered voxel that the candidate
    /// merges into, or registers the candidate and returns its own key.
    pub fn insert(&mut self, voxel: JointVoxel) -> JointKey {
        if let Some(existing) = self.find(&voxel) {
            return existing.key();
        }

        let slot = self.entries.len() as u32;
        for cell in self.cells(voxel.bounds()) {
            self.grid.entry(cell).or_default().push(slot);
        }
        self.entries.push(voxel);
        voxel.key()
    }

    /// Earliest registered voxel the candidate would merge into.
    pub fn find(&self, voxel: &JointVoxel) -> Option<&JointVoxel> {
        let mut best: Option<u32> = None;
        for cell in self.cells(voxel.bounds()) {
            let Some(slots) = self.grid.get(&cell) else {
                continue;
            };
            for &slot in slots {
                if best.is_some_and(|b| b <= slot) {
                    continue;
                }
                if self.merges(&self.entries[slot as usize], voxel) {
                    best = Some(slot);
                }
            }
        }
        best.map(|slot| &self.entries[slot as usize])
    }

    fn merges(&self, existing: &JointVoxel, candidate: &JointVoxel) -> bool {
        if !existing.bounds().overlaps(candidate.bounds()) {
            return false;
        }
        !self.strict
            || existing.contains(&candidate.center())
            || candidate.contains(&existing.center())
    }

    fn cells(&self, bounds: &Aabb) -> impl Iterator<Item = Cell> {
        let lo = self.cell_of(bounds.min.x, bounds.min.y, bounds.min.z);
        let hi = self.cell_of(bounds.max.x, bounds.max.y, bounds.max.z);
        (lo.0..=hi.0).flat_map(move |x| {
            (lo.1..=hi.1).flat_map(move |y| (lo.2..=hi.2).map(move |z| (x, y, z)))
        })
    }

    fn cell_of(&self, x: f64, y: f64, z: f64) -> Cell {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
            (z / self.cell_size).floor() as i64,
        )
    }
}
