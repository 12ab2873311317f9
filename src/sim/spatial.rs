//! Bounding-box overlap queries over live dynamic bodies
//!
//! Terrain features use this to find affected balls without scanning the
//! whole world. Membership is the contract that matters: only bodies alive at
//! query time, never stale entries. The storage is a flat list scanned
//! linearly, which is plenty for the body counts a level carries.

use glam::Vec3;

use super::body::BodyId;

/// Axis-aligned bounding box in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box centered on `center` with half-extent `radius` on every axis
    pub fn around(center: Vec3, radius: f32) -> Self {
        Self {
            min: center - Vec3::splat(radius),
            max: center + Vec3::splat(radius),
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// Index of live body bounds, kept in lockstep with the body arena
#[derive(Debug, Default)]
pub struct SpatialIndex {
    entries: Vec<(BodyId, Aabb)>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body's bounds, replacing any previous entry for the id
    pub fn insert(&mut self, id: BodyId, bounds: Aabb) {
        if let Some(entry) = self.entries.iter_mut().find(|(e, _)| *e == id) {
            entry.1 = bounds;
        } else {
            self.entries.push((id, bounds));
        }
    }

    /// Unlink a body. Must happen before any later query in the same tick
    /// can observe the dead body.
    pub fn remove(&mut self, id: BodyId) {
        self.entries.retain(|(e, _)| *e != id);
    }

    /// Refresh a body's bounds after it moved
    pub fn update(&mut self, id: BodyId, bounds: Aabb) {
        self.insert(id, bounds);
    }

    /// All registered bodies whose bounds intersect `bounds`. No ordering
    /// guarantee.
    pub fn query_overlap(&self, bounds: &Aabb) -> Vec<BodyId> {
        self.entries
            .iter()
            .filter(|(_, b)| b.overlaps(bounds))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::BodyId;

    fn id(index: u32) -> BodyId {
        BodyId::from_raw(index, 0)
    }

    #[test]
    fn test_query_finds_overlapping() {
        let mut index = SpatialIndex::new();
        index.insert(id(1), Aabb::around(Vec3::new(1.0, 1.0, 0.0), 0.5));
        index.insert(id(2), Aabb::around(Vec3::new(10.0, 10.0, 0.0), 0.5));

        let hits = index.query_overlap(&Aabb::new(Vec3::ZERO, Vec3::splat(2.0)));
        assert_eq!(hits, vec![id(1)]);
    }

    #[test]
    fn test_removed_body_not_returned() {
        let mut index = SpatialIndex::new();
        index.insert(id(1), Aabb::around(Vec3::ZERO, 1.0));
        index.remove(id(1));
        let hits = index.query_overlap(&Aabb::around(Vec3::ZERO, 5.0));
        assert!(hits.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_replaces_bounds() {
        let mut index = SpatialIndex::new();
        index.insert(id(1), Aabb::around(Vec3::ZERO, 0.5));
        index.insert(id(1), Aabb::around(Vec3::new(20.0, 0.0, 0.0), 0.5));
        assert_eq!(index.len(), 1);
        assert!(
            index
                .query_overlap(&Aabb::around(Vec3::ZERO, 1.0))
                .is_empty()
        );
    }

    #[test]
    fn test_touching_boxes_overlap() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::ONE, Vec3::splat(2.0));
        assert!(a.overlaps(&b));
    }
}
