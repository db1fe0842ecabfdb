//! Body/geometry adjacency built from flat parent and owner arrays.

use std::collections::VecDeque;

use kinmark_model::{BodyId, GeomId, Model};

use crate::error::KinematicsError;

/// Read-only adjacency view over a model's bodies and geometries.
///
/// Built once per model and shared across projections. Child and geometry
/// lists are in ascending id order.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicTree {
    parents: Vec<Option<BodyId>>,
    body_children: Vec<Vec<BodyId>>,
    body_geoms: Vec<Vec<GeomId>>,
}

impl KinematicTree {
    /// Build from a parent-of array (indexed by body) and an owner-of array
    /// (indexed by geometry).
    ///
    /// A body whose parent is `None` or itself is a root.
    pub fn build(
        parent_of: &[Option<BodyId>],
        owner_of: &[BodyId],
    ) -> Result<Self, KinematicsError> {
        let nbody = parent_of.len();
        let mut parents = Vec::with_capacity(nbody);
        let mut body_children = vec![Vec::new(); nbody];
        let mut body_geoms = vec![Vec::new(); nbody];

        for (body, &parent) in parent_of.iter().enumerate() {
            match parent {
                Some(parent) if parent >= nbody => {
                    return Err(KinematicsError::ParentOutOfRange { body, parent });
                }
                Some(parent) if parent != body => {
                    body_children[parent].push(body);
                    parents.push(Some(parent));
                }
                // The world body is its own parent in the engine's arrays.
                _ => parents.push(None),
            }
        }

        for (geom, &body) in owner_of.iter().enumerate() {
            let geoms = body_geoms
                .get_mut(body)
                .ok_or(KinematicsError::OwnerOutOfRange { geom, body })?;
            geoms.push(geom);
        }

        Ok(Self {
            parents,
            body_children,
            body_geoms,
        })
    }

    /// Validate a model and build its tree.
    pub fn from_model(model: &Model) -> Result<Self, KinematicsError> {
        model.validate()?;
        Self::build(&model.parent_ids(), &model.owner_ids())
    }

    /// Number of bodies.
    pub fn body_count(&self) -> usize {
        self.parents.len()
    }

    /// Whether `body` is a body of this tree.
    pub fn contains(&self, body: BodyId) -> bool {
        body < self.parents.len()
    }

    /// Parent of `body`, or `None` for a root (or an unknown id).
    pub fn parent_of(&self, body: BodyId) -> Option<BodyId> {
        self.parents.get(body).copied().flatten()
    }

    /// Direct children of `body`, ascending.
    pub fn children_of(&self, body: BodyId) -> &[BodyId] {
        self.body_children.get(body).map(Vec::as_slice).unwrap_or_default()
    }

    /// Geometries owned by `body`, ascending.
    pub fn geoms_of(&self, body: BodyId) -> &[GeomId] {
        self.body_geoms.get(body).map(Vec::as_slice).unwrap_or_default()
    }

    /// Breadth-first walk of the subtree rooted at `root`.
    ///
    /// Yields `root`, then its children, then grandchildren, and so on.
    /// Each body is yielded at most once.
    pub fn breadth_first(&self, root: BodyId) -> BreadthFirst<'_> {
        let mut seen = vec![false; self.body_count()];
        let mut queue = VecDeque::new();
        if let Some(flag) = seen.get_mut(root) {
            *flag = true;
            queue.push_back(root);
        }
        BreadthFirst {
            tree: self,
            queue,
            seen,
        }
    }

    /// Every body reachable from `root`, including `root`, in breadth-first order.
    pub fn subtree(&self, root: BodyId) -> Vec<BodyId> {
        self.breadth_first(root).collect()
    }

    /// Depth of `body` below its root, or `None` if the parent chain loops.
    pub fn depth(&self, body: BodyId) -> Option<usize> {
        let mut depth = 0;
        let mut current = body;
        while let Some(parent) = self.parent_of(current) {
            depth += 1;
            if depth > self.body_count() {
                return None;
            }
            current = parent;
        }
        Some(depth)
    }
}

/// Iterator returned by [`KinematicTree::breadth_first`].
#[derive(Debug)]
pub struct BreadthFirst<'a> {
    tree: &'a KinematicTree,
    queue: VecDeque<BodyId>,
    seen: Vec<bool>,
}

impl Iterator for BreadthFirst<'_> {
    type Item = BodyId;

    fn next(&mut self) -> Option<BodyId> {
        let body = self.queue.pop_front()?;
        for &child in self.tree.children_of(body) {
            if let Some(flag) = self.seen.get_mut(child) {
                if !*flag {
                    *flag = true;
                    self.queue.push_back(child);
                }
            }
        }
        Some(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //      0
    //     / \
    //    1   2
    //   / \   \
    //  3   4   5
    fn sample() -> KinematicTree {
        let parents = [Some(0), Some(0), Some(0), Some(1), Some(1), Some(2)];
        let owners = [0, 3, 1, 3, 5];
        KinematicTree::build(&parents, &owners).unwrap()
    }

    #[test]
    fn test_adjacency() {
        let tree = sample();
        assert_eq!(tree.children_of(0), &[1, 2]);
        assert_eq!(tree.children_of(1), &[3, 4]);
        assert_eq!(tree.children_of(3), &[] as &[BodyId]);
        assert_eq!(tree.geoms_of(3), &[1, 3]);
        assert_eq!(tree.geoms_of(4), &[] as &[GeomId]);
    }

    #[test]
    fn test_self_parent_is_root() {
        let tree = sample();
        assert_eq!(tree.parent_of(0), None);
        assert_eq!(tree.parent_of(4), Some(1));
        assert!(!tree.children_of(0).contains(&0));
    }

    #[test]
    fn test_breadth_first_order() {
        let tree = sample();
        assert_eq!(tree.subtree(0), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(tree.subtree(1), vec![1, 3, 4]);
        assert_eq!(tree.subtree(5), vec![5]);
    }

    #[test]
    fn test_breadth_first_unknown_root_is_empty() {
        let tree = sample();
        assert_eq!(tree.breadth_first(42).count(), 0);
    }

    #[test]
    fn test_breadth_first_terminates_on_cycle() {
        // 1 -> 2 -> 1, detached from the world body.
        let tree = KinematicTree::build(&[None, Some(2), Some(1)], &[]).unwrap();
        assert_eq!(tree.subtree(1), vec![1, 2]);
        assert_eq!(tree.depth(1), None);
    }

    #[test]
    fn test_depth() {
        let tree = sample();
        assert_eq!(tree.depth(0), Some(0));
        assert_eq!(tree.depth(5), Some(2));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            KinematicTree::build(&[None, Some(7)], &[]),
            Err(KinematicsError::ParentOutOfRange { body: 1, parent: 7 })
        ));
        assert!(matches!(
            KinematicTree::build(&[None], &[0, 3]),
            Err(KinematicsError::OwnerOutOfRange { geom: 1, body: 3 })
        ));
    }
}
