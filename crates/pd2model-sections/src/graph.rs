//! Object hierarchy linking.
//!
//! Object3D sections only name their parent by id, and a parent may appear
//! after its children in the file. Once every section is parsed, the
//! [`ObjectTable`] links each record to its parent, fills in the parents'
//! child lists, and computes world transforms top-down.
//!
//! Records live in one arena and refer to each other by id only. A record's
//! child list is a cache kept in step with the children's parent links by the
//! table's own operations.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::name::HashName;
use crate::object3d::Object3D;
use crate::transform::Transform;
use crate::{Error, Result};

/// An arena of Object3D records keyed by section id.
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    objects: Vec<Object3D>,
    index: FxHashMap<u32, usize>,
}

impl ObjectTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Ids must be unique.
    pub fn insert(&mut self, object: Object3D) -> Result<()> {
        if self.index.contains_key(&object.id) {
            return Err(Error::DuplicateId(object.id));
        }
        self.index.insert(object.id, self.objects.len());
        self.objects.push(object);
        Ok(())
    }

    /// Create a new linked record with an identity transform.
    pub fn create(&mut self, id: u32, name: HashName, parent: Option<u32>) -> Result<&mut Object3D> {
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        if let Some(parent) = parent {
            if !self.index.contains_key(&parent) {
                return Err(Error::DanglingParentReference { id, parent });
            }
            self.link(parent)?;
        }

        let mut object = Object3D::new(id, name);
        object.raw_parent_id = parent.unwrap_or(0);
        self.insert(object)?;
        self.link(id)?;
        self.get_mut(id).ok_or(Error::ObjectNotFound(id))
    }

    pub fn get(&self, id: u32) -> Option<&Object3D> {
        self.index.get(&id).map(|&i| &self.objects[i])
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Object3D> {
        self.index.get(&id).map(|&i| &mut self.objects[i])
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Object3D> {
        self.objects.iter()
    }

    /// Records without a parent, in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = &Object3D> {
        self.objects.iter().filter(|o| o.parent_id() == 0)
    }

    /// Live children of a record.
    pub fn children(&self, id: u32) -> Option<&[u32]> {
        self.get(id).map(Object3D::children)
    }

    fn index_of(&self, id: u32) -> Result<usize> {
        self.index.get(&id).copied().ok_or(Error::ObjectNotFound(id))
    }

    /// Link every record, in insertion order.
    ///
    /// Stops at the first failure; records linked before it stay linked.
    pub fn link_all(&mut self) -> Result<()> {
        for i in 0..self.objects.len() {
            let id = self.objects[i].id;
            self.link(id)?;
        }
        log::debug!("linked {} objects", self.objects.len());
        Ok(())
    }

    /// Link one record and, first, any unlinked ancestors.
    ///
    /// Linking an already linked record does nothing.
    pub fn link(&mut self, id: u32) -> Result<()> {
        // Walk up until a linked record or a root, child first.
        let mut pending: Vec<usize> = Vec::new();
        let mut visiting: FxHashSet<u32> = FxHashSet::default();
        let mut current = id;

        loop {
            let idx = self.index_of(current)?;
            let object = &self.objects[idx];
            if object.linked {
                break;
            }
            if !visiting.insert(current) {
                return Err(Error::CyclicHierarchy {
                    chain: self.cycle_chain(&pending, current),
                });
            }
            pending.push(idx);

            let parent = object.raw_parent_id;
            if parent == 0 {
                break;
            }
            if !self.index.contains_key(&parent) {
                return Err(Error::DanglingParentReference {
                    id: current,
                    parent,
                });
            }
            current = parent;
        }

        for &idx in pending.iter().rev() {
            self.link_index(idx);
        }
        Ok(())
    }

    fn cycle_chain(&self, pending: &[usize], repeated: u32) -> Vec<u32> {
        let ids: Vec<u32> = pending.iter().map(|&i| self.objects[i].id).collect();
        let start = ids.iter().position(|&id| id == repeated).unwrap_or(0);
        let mut chain = ids[start..].to_vec();
        chain.push(repeated);
        chain
    }

    /// Link a record whose parent, if any, is already linked.
    fn link_index(&mut self, idx: usize) {
        let id = self.objects[idx].id;
        let raw_parent = self.objects[idx].raw_parent_id;

        let parent = match raw_parent {
            0 => None,
            parent => self.index.get(&parent).copied(),
        };
        let parent_world = parent.map(|pidx| {
            let parent = &mut self.objects[pidx];
            if !parent.children.contains(&id) {
                parent.children.push(id);
            }
            parent.world_transform
        });

        let object = &mut self.objects[idx];
        object.parent = parent.map(|_| raw_parent);
        object.world_transform = world_of(object, parent_world.as_ref());
        object.linked = true;
        log::trace!("linked object {} to parent {}", id, raw_parent);
    }

    /// Move a record under a new parent, or make it a root.
    ///
    /// Both child lists are updated and the moved subtree's world transforms
    /// are recomputed. A record cannot be moved under itself or one of its
    /// descendants.
    pub fn set_parent(&mut self, id: u32, parent: Option<u32>) -> Result<()> {
        self.link(id)?;
        if let Some(parent) = parent {
            if !self.index.contains_key(&parent) {
                return Err(Error::DanglingParentReference { id, parent });
            }
            self.link(parent)?;
            if let Some(chain) = self.ancestor_path(parent, id) {
                return Err(Error::CyclicHierarchy { chain });
            }
        }

        let idx = self.index_of(id)?;
        if let Some(old) = self.objects[idx].parent {
            if let Some(&oidx) = self.index.get(&old) {
                self.objects[oidx].children.retain(|&c| c != id);
            }
        }
        if let Some(parent) = parent {
            let pidx = self.index_of(parent)?;
            let children = &mut self.objects[pidx].children;
            if !children.contains(&id) {
                children.push(id);
            }
        }
        self.objects[idx].parent = parent;

        self.update_transforms(id)
    }

    /// Path `from, ..., target, from` if `target` is `from` or one of its
    /// ancestors.
    fn ancestor_path(&self, from: u32, target: u32) -> Option<Vec<u32>> {
        let mut path = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            path.push(id);
            if id == target {
                path.push(from);
                return Some(path);
            }
            current = self.get(id).and_then(Object3D::parent);
        }
        None
    }

    /// Recompute world transforms for a record and its descendants.
    ///
    /// Does not relink; the record's parent must already be linked.
    pub fn update_transforms(&mut self, id: u32) -> Result<()> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let idx = self.index_of(current)?;
            let parent_world = match self.objects[idx].parent {
                Some(parent) => Some(self.objects[self.index_of(parent)?].world_transform),
                None => None,
            };
            let object = &mut self.objects[idx];
            object.world_transform = world_of(object, parent_world.as_ref());
            stack.extend(object.children.iter().rev());
        }
        Ok(())
    }

    /// Ids of all descendants of a record, in pre-order.
    pub fn descendants(&self, id: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack: Vec<u32> = self
            .children(id)
            .map(|c| c.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(children) = self.children(current) {
                stack.extend(children.iter().rev());
            }
        }
        out
    }
}

fn world_of(object: &Object3D, parent_world: Option<&Transform>) -> Transform {
    match parent_world {
        Some(parent_world) => Transform::compose(object.transform(), parent_world),
        None => *object.transform(),
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::object3d::tests::{identity_rows, payload};

    fn raw(id: u32, parent: u32, translation: [f32; 3]) -> Object3D {
        let mut rows = identity_rows();
        rows[12..15].copy_from_slice(&translation);
        let data = payload(u64::from(id), &[], rows, translation, parent, &[]);
        Object3D::parse(id, &data).unwrap()
    }

    fn table(objects: Vec<Object3D>) -> ObjectTable {
        let mut table = ObjectTable::new();
        for object in objects {
            table.insert(object).unwrap();
        }
        table
    }

    #[test]
    fn test_root_with_identity() {
        let mut t = table(vec![raw(1, 0, [0.0; 3])]);
        t.link_all().unwrap();

        let root = t.get(1).unwrap();
        assert!(root.is_linked());
        assert_eq!(root.parent(), None);
        assert_eq!(*root.world_transform(), Transform::IDENTITY);
    }

    #[test]
    fn test_child_translation() {
        let mut t = table(vec![raw(1, 0, [0.0; 3]), raw(2, 1, [5.0, 0.0, 0.0])]);
        t.link_all().unwrap();

        let child = t.get(2).unwrap();
        assert_eq!(child.parent(), Some(1));
        assert_eq!(child.world_transform().translation(), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(t.children(1).unwrap(), &[2]);
    }

    #[test]
    fn test_missing_parent() {
        let mut t = table(vec![raw(1, 99, [0.0; 3])]);
        match t.link_all() {
            Err(Error::DanglingParentReference { id, parent }) => {
                assert_eq!(id, 1);
                assert_eq!(parent, 99);
            }
            other => panic!("expected dangling parent, got {:?}", other),
        }
        assert!(!t.get(1).unwrap().is_linked());
    }

    #[test]
    fn test_forward_reference() {
        // Children listed before their parents.
        let mut t = table(vec![
            raw(3, 2, [0.0, 0.0, 1.0]),
            raw(2, 1, [0.0, 1.0, 0.0]),
            raw(1, 0, [1.0, 0.0, 0.0]),
        ]);
        t.link_all().unwrap();

        assert_eq!(
            t.get(3).unwrap().world_transform().translation(),
            Vec3::new(1.0, 1.0, 1.0)
        );
        assert_eq!(t.descendants(1), vec![2, 3]);
    }

    #[test]
    fn test_linking_twice_keeps_single_child_entry() {
        let mut t = table(vec![raw(1, 0, [0.0; 3]), raw(2, 1, [0.0; 3]), raw(3, 1, [0.0; 3])]);
        t.link(2).unwrap();
        t.link_all().unwrap();
        t.link_all().unwrap();
        t.link(3).unwrap();

        assert_eq!(t.children(1).unwrap(), &[2, 3]);
    }

    #[test]
    fn test_root_invariant() {
        let mut t = table(vec![
            raw(1, 0, [0.0; 3]),
            raw(2, 1, [0.0; 3]),
            raw(3, 0, [0.0; 3]),
            raw(4, 3, [0.0; 3]),
        ]);
        t.link_all().unwrap();

        for object in t.iter() {
            assert_eq!(object.parent().is_none(), object.raw_parent_id() == 0);
            if let Some(parent) = object.parent() {
                let siblings = t.children(parent).unwrap();
                assert_eq!(siblings.iter().filter(|&&c| c == object.id()).count(), 1);
            }
        }
        let roots: Vec<u32> = t.roots().map(Object3D::id).collect();
        assert_eq!(roots, vec![1, 3]);
    }

    #[test]
    fn test_world_is_local_composed_with_parent() {
        let mut t = table(vec![raw(1, 0, [1.0, 2.0, 3.0]), raw(2, 1, [4.0, 5.0, 6.0])]);
        t.link_all().unwrap();

        let parent = *t.get(1).unwrap().world_transform();
        let child = t.get(2).unwrap();
        assert_eq!(
            *child.world_transform(),
            Transform::compose(child.transform(), &parent)
        );
    }

    #[test]
    fn test_cycle_detected() {
        let mut t = table(vec![raw(1, 2, [0.0; 3]), raw(2, 1, [0.0; 3])]);
        match t.link(1) {
            Err(Error::CyclicHierarchy { chain }) => assert_eq!(chain, vec![1, 2, 1]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let mut t = table(vec![raw(5, 5, [0.0; 3])]);
        assert!(matches!(
            t.link_all(),
            Err(Error::CyclicHierarchy { chain }) if chain == vec![5, 5]
        ));
    }

    #[test]
    fn test_cycle_above_valid_records() {
        let mut t = table(vec![
            raw(1, 0, [0.0; 3]),
            raw(2, 1, [0.0; 3]),
            raw(3, 4, [0.0; 3]),
            raw(4, 3, [0.0; 3]),
        ]);
        assert!(t.link_all().is_err());
        // Records linked before the failure stay usable.
        assert!(t.get(1).unwrap().is_linked());
        assert_eq!(t.children(1).unwrap(), &[2]);
    }

    #[test]
    fn test_deep_chain() {
        let depth = 20_000u32;
        let objects = (1..=depth).map(|id| raw(id, id - 1, [1.0, 0.0, 0.0])).rev().collect();
        let mut t = table(objects);
        t.link_all().unwrap();

        let leaf = t.get(depth).unwrap();
        assert!(leaf.is_linked());
        assert_eq!(leaf.world_transform().translation().x, depth as f32);
    }

    #[test]
    fn test_duplicate_id() {
        let mut t = table(vec![raw(1, 0, [0.0; 3])]);
        assert!(matches!(t.insert(raw(1, 0, [0.0; 3])), Err(Error::DuplicateId(1))));
    }

    #[test]
    fn test_parent_id_uses_live_parent_once_linked() {
        let mut t = table(vec![raw(1, 0, [0.0; 3]), raw(2, 0, [0.0; 3]), raw(3, 1, [0.0; 3])]);
        assert_eq!(t.get(3).unwrap().parent_id(), 1);
        t.link_all().unwrap();

        t.set_parent(3, Some(2)).unwrap();
        let moved = t.get(3).unwrap();
        assert_eq!(moved.raw_parent_id(), 1);
        assert_eq!(moved.parent_id(), 2);

        t.set_parent(3, None).unwrap();
        assert_eq!(t.get(3).unwrap().parent_id(), 0);
    }

    #[test]
    fn test_set_parent_moves_child_lists_and_transforms() {
        let mut t = table(vec![
            raw(1, 0, [10.0, 0.0, 0.0]),
            raw(2, 0, [0.0, 20.0, 0.0]),
            raw(3, 1, [1.0, 0.0, 0.0]),
            raw(4, 3, [0.0, 0.0, 1.0]),
        ]);
        t.link_all().unwrap();

        t.set_parent(3, Some(2)).unwrap();
        assert!(t.children(1).unwrap().is_empty());
        assert_eq!(t.children(2).unwrap(), &[3]);
        assert_eq!(
            t.get(4).unwrap().world_transform().translation(),
            Vec3::new(1.0, 20.0, 1.0)
        );
    }

    #[test]
    fn test_set_parent_rejects_descendant() {
        let mut t = table(vec![raw(1, 0, [0.0; 3]), raw(2, 1, [0.0; 3]), raw(3, 2, [0.0; 3])]);
        t.link_all().unwrap();

        match t.set_parent(1, Some(3)) {
            Err(Error::CyclicHierarchy { chain }) => assert_eq!(chain, vec![3, 2, 1, 3]),
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(matches!(
            t.set_parent(1, Some(1)),
            Err(Error::CyclicHierarchy { .. })
        ));
        assert_eq!(t.get(1).unwrap().parent(), None);
    }

    #[test]
    fn test_update_transforms_after_local_change() {
        let mut t = table(vec![raw(1, 0, [0.0; 3]), raw(2, 1, [1.0, 0.0, 0.0])]);
        t.link_all().unwrap();

        t.get_mut(1)
            .unwrap()
            .set_transform(Transform::from_translation(Vec3::new(0.0, 3.0, 0.0)));
        t.update_transforms(1).unwrap();

        assert_eq!(
            t.get(2).unwrap().world_transform().translation(),
            Vec3::new(1.0, 3.0, 0.0)
        );
    }

    #[test]
    fn test_create() {
        let mut dict = crate::Hashlist::new();
        let mut t = table(vec![raw(1, 0, [2.0, 0.0, 0.0])]);
        t.link_all().unwrap();

        let name = HashName::from_string("new_node", &mut dict);
        let created = t.create(7, name, Some(1)).unwrap();
        assert!(created.is_linked());
        assert_eq!(*created.transform(), Transform::IDENTITY);
        assert_eq!(created.parent_id(), 1);
        assert_eq!(created.world_transform().translation(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(t.children(1).unwrap(), &[7]);

        assert!(matches!(
            t.create(8, HashName::from_hash(0), Some(42)),
            Err(Error::DanglingParentReference { id: 8, parent: 42 })
        ));
        assert!(matches!(
            t.create(7, HashName::from_hash(0), None),
            Err(Error::DuplicateId(7))
        ));
    }
}
