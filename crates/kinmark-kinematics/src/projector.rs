//! Subtree marker projection.
//!
//! Given an override pose for one body (or geometry), recompute the world
//! pose of every body below it and of every ancestor up to a chosen root,
//! and turn every geometry those bodies own into a marker. Nothing in the
//! model is modified.
//!
//! ```text
//!            root            ▲ upward: parent = child ∘ local(child)⁻¹
//!             │              │
//!           target  ◀── override pose
//!            / \             │
//!           a   b            ▼ downward: child = parent ∘ local(child)
//! ```

use std::collections::BTreeMap;

use kinmark_math::{Pose, Vec3};
use kinmark_model::{Body, BodyId, GeomId, JointId, JointKind, Model};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::KinematicsError;
use crate::marker::{resolve_geom, Marker};
use crate::sink::MarkerSink;
use crate::tree::KinematicTree;

/// Slide joint values, keyed by joint id.
pub type JointValues = BTreeMap<JointId, f64>;

/// The part whose pose is overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Override is the body's own world pose.
    Body(BodyId),
    /// Override is the geometry's world pose; the owner's pose is derived.
    Geom(GeomId),
}

/// How slide joint values are used while walking up toward the root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideCompensation {
    /// Slide displacement is added going down and ignored going up.
    #[default]
    DownwardOnly,
    /// Slide displacement is added going down and subtracted going up, so
    /// upward reconstruction is the exact inverse of downward propagation.
    Symmetric,
}

/// One projection call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRequest {
    /// Overridden part.
    pub target: Target,
    /// Override pose, world frame.
    pub pose: Pose,
    /// Upper bound for upward propagation. `None` means the target body.
    pub root: Option<BodyId>,
    /// Slide joint values. `None` disables slide displacement entirely.
    pub joint_values: Option<JointValues>,
}

impl ProjectionRequest {
    /// Request with no root and no joint values.
    pub fn new(target: Target, pose: Pose) -> Self {
        Self {
            target,
            pose,
            root: None,
            joint_values: None,
        }
    }

    /// Set the upward bound.
    pub fn with_root(mut self, root: BodyId) -> Self {
        self.root = Some(root);
        self
    }

    /// Set slide joint values.
    pub fn with_joint_values(mut self, values: JointValues) -> Self {
        self.joint_values = Some(values);
        self
    }
}

/// Which pass produced a body pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// The target itself, seeded from the override.
    Target,
    /// Reached from the target through child links.
    Downward,
    /// Recovered on the way from the target to the root.
    Upward,
}

/// A body pose recovered during projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyVisit {
    /// Visited body.
    pub body: BodyId,
    /// Its world pose.
    pub pose: Pose,
    /// Pass that produced it.
    pub pass: Pass,
}

/// Result of a projection: visited bodies and their markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    visits: Vec<BodyVisit>,
    markers: Vec<Marker>,
}

impl Projection {
    /// Visited bodies: target, then downward in breadth-first order, then upward.
    pub fn visits(&self) -> &[BodyVisit] {
        &self.visits
    }

    /// World pose recovered for `body`, if it was visited.
    pub fn pose_of(&self, body: BodyId) -> Option<&Pose> {
        self.visits.iter().find(|v| v.body == body).map(|v| &v.pose)
    }

    /// Markers, in visit order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Consume the projection, keeping only the markers.
    pub fn into_markers(self) -> Vec<Marker> {
        self.markers
    }
}

/// Projects override poses through a model's kinematic tree.
///
/// Holds only shared references; one projector serves any number of calls
/// against the same model snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SubtreeProjector<'a> {
    model: &'a Model,
    tree: &'a KinematicTree,
    slide: SlideCompensation,
}

impl<'a> SubtreeProjector<'a> {
    /// Create a projector. `tree` must have been built from `model`.
    pub fn new(model: &'a Model, tree: &'a KinematicTree) -> Result<Self, KinematicsError> {
        if tree.body_count() != model.bodies.len() {
            return Err(KinematicsError::TreeMismatch {
                tree_bodies: tree.body_count(),
                model_bodies: model.bodies.len(),
            });
        }
        Ok(Self {
            model,
            tree,
            slide: SlideCompensation::default(),
        })
    }

    /// Choose how slide joints are treated on the upward pass.
    pub fn with_slide_compensation(mut self, slide: SlideCompensation) -> Self {
        self.slide = slide;
        self
    }

    /// Project, then emit every marker into `sink`.
    ///
    /// Returns the number of markers emitted. On error nothing is emitted.
    pub fn project_into(
        &self,
        request: &ProjectionRequest,
        sink: &mut impl MarkerSink,
    ) -> Result<usize, KinematicsError> {
        let projection = self.project(request)?;
        let count = projection.markers.len();
        for marker in projection.into_markers() {
            sink.add_marker(marker);
        }
        Ok(count)
    }

    /// Compute every body pose and marker for `request`.
    pub fn project(&self, request: &ProjectionRequest) -> Result<Projection, KinematicsError> {
        let (target, seed) = self.seed(request)?;
        let root = match request.root {
            Some(root) => self.body(root).map(|_| root)?,
            None => target,
        };
        let values = request.joint_values.as_ref();
        if let Some(values) = values {
            self.check_joint_values(values)?;
        }

        let mut poses: Vec<Option<Pose>> = vec![None; self.tree.body_count()];
        let mut visits = Vec::new();

        for body in self.tree.breadth_first(target) {
            let (pose, pass) = if body == target {
                (seed, Pass::Target)
            } else {
                let parent_pose = self
                    .tree
                    .parent_of(body)
                    .and_then(|parent| poses[parent])
                    .ok_or(KinematicsError::CyclicParents(body))?;
                let local = self.local_pose(body, values)?;
                (parent_pose.compose(&local), Pass::Downward)
            };
            trace!(body, ?pass, position = ?pose.position, "resolved body pose");
            poses[body] = Some(pose);
            visits.push(BodyVisit { body, pose, pass });
        }
        let downward = visits.len();

        let mut child = target;
        let mut child_pose = seed;
        while child != root {
            let Some(parent) = self.tree.parent_of(child) else {
                warn!(
                    root_body = %self.model.body_label(root),
                    target_body = %self.model.body_label(target),
                    "root is not an ancestor of target, stopped at tree root"
                );
                break;
            };
            if visits.len() - downward >= self.tree.body_count() {
                return Err(KinematicsError::CyclicParents(target));
            }
            let local = match self.slide {
                SlideCompensation::DownwardOnly => self.body(child)?.local_pose(),
                SlideCompensation::Symmetric => self.local_pose(child, values)?,
            };
            let parent_pose = child_pose.compose(&local.inverse());
            trace!(body = parent, position = ?parent_pose.position, "recovered ancestor pose");
            visits.push(BodyVisit {
                body: parent,
                pose: parent_pose,
                pass: Pass::Upward,
            });
            child = parent;
            child_pose = parent_pose;
        }

        let mut markers = Vec::new();
        for visit in &visits {
            for &geom_id in self.tree.geoms_of(visit.body) {
                let geom = self
                    .model
                    .geoms
                    .get(geom_id)
                    .ok_or(KinematicsError::UnknownGeom(geom_id))?;
                markers.push(resolve_geom(geom, &visit.pose)?);
            }
        }

        debug!(
            target_body = %self.model.body_label(target),
            root_body = %self.model.body_label(root),
            downward,
            upward = visits.len() - downward,
            markers = markers.len(),
            "projected subtree"
        );

        Ok(Projection { visits, markers })
    }

    /// Resolve the target to a body and its override pose.
    fn seed(&self, request: &ProjectionRequest) -> Result<(BodyId, Pose), KinematicsError> {
        match request.target {
            Target::Body(body) => {
                self.body(body)?;
                Ok((body, request.pose))
            }
            Target::Geom(geom_id) => {
                let geom = self
                    .model
                    .geoms
                    .get(geom_id)
                    .ok_or(KinematicsError::UnknownGeom(geom_id))?;
                self.body(geom.body)?;
                // body = override ∘ local(geom)⁻¹
                Ok((geom.body, request.pose.compose(&geom.local_pose().inverse())))
            }
        }
    }

    fn body(&self, id: BodyId) -> Result<&'a Body, KinematicsError> {
        if !self.tree.contains(id) {
            return Err(KinematicsError::UnknownBody(id));
        }
        self.model
            .bodies
            .get(id)
            .ok_or(KinematicsError::UnknownBody(id))
    }

    fn check_joint_values(&self, values: &JointValues) -> Result<(), KinematicsError> {
        for &joint_id in values.keys() {
            let joint = self
                .model
                .joints
                .get(joint_id)
                .ok_or(KinematicsError::UnknownJoint(joint_id))?;
            if joint.kind != JointKind::Slide {
                return Err(KinematicsError::NotASlideJoint {
                    joint: joint_id,
                    kind: joint.kind,
                });
            }
        }
        Ok(())
    }

    /// Local pose of `body` in its parent's frame, including slide displacement.
    fn local_pose(
        &self,
        body_id: BodyId,
        values: Option<&JointValues>,
    ) -> Result<Pose, KinematicsError> {
        let body = self.body(body_id)?;
        let mut local = body.local_pose();
        if let Some(values) = values {
            if let Some(offset) = self.slide_offset(body_id, body, values)? {
                local.position += offset;
            }
        }
        Ok(local)
    }

    /// Displacement of a body driven by exactly one slide joint.
    fn slide_offset(
        &self,
        body_id: BodyId,
        body: &Body,
        values: &JointValues,
    ) -> Result<Option<Vec3>, KinematicsError> {
        let [joint_id] = body.joints.as_slice() else {
            return Ok(None);
        };
        let joint = self
            .model
            .joints
            .get(*joint_id)
            .ok_or(KinematicsError::UnknownJoint(*joint_id))?;
        if joint.kind != JointKind::Slide {
            return Ok(None);
        }
        let value = values
            .get(joint_id)
            .copied()
            .ok_or(KinematicsError::MissingJointValue {
                joint: *joint_id,
                body: body_id,
            })?;
        Ok(Some(joint.axis_vec() * value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kinmark_math::{quat_from_wxyz, Tolerance};
    use kinmark_model::{Geom, GeomKind, Joint};

    fn body(name: &str, parent: Option<BodyId>, pos: [f64; 3]) -> Body {
        Body {
            name: Some(name.to_string()),
            parent,
            pos,
            quat: [1.0, 0.0, 0.0, 0.0],
            joints: Vec::new(),
        }
    }

    fn sphere(body: BodyId) -> Geom {
        Geom {
            name: None,
            body,
            kind: GeomKind::Sphere,
            pos: [0.0; 3],
            quat: [1.0, 0.0, 0.0, 0.0],
            size: Some([0.05, 0.0, 0.0]),
            mesh: None,
        }
    }

    // world -> a -> b -> c, c -> d (slide along z), a -> e
    fn chain() -> Model {
        let mut d = body("d", Some(3), [0.0; 3]);
        d.joints = vec![0];
        Model {
            bodies: vec![
                body("world", Some(0), [0.0; 3]),
                body("a", Some(0), [1.0, 0.0, 0.0]),
                body("b", Some(1), [0.0, 1.0, 0.0]),
                body("c", Some(2), [0.0, 0.0, 1.0]),
                d,
                body("e", Some(1), [0.0, 0.0, -1.0]),
            ],
            geoms: (0..6).map(sphere).collect(),
            joints: vec![Joint {
                name: Some("lift".to_string()),
                kind: JointKind::Slide,
                axis: [0.0, 0.0, 1.0],
            }],
            ..Model::default()
        }
    }

    fn at(x: f64, y: f64, z: f64) -> Pose {
        Pose::translation(x, y, z)
    }

    #[test]
    fn test_target_only_by_default() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let projection = projector
            .project(&ProjectionRequest::new(Target::Body(3), at(5.0, 5.0, 5.0)))
            .unwrap();
        let bodies: Vec<_> = projection.visits().iter().map(|v| v.body).collect();
        assert_eq!(bodies, vec![3, 4]);
        assert_eq!(projection.visits()[0].pass, Pass::Target);
        assert_eq!(projection.markers().len(), 2);
    }

    #[test]
    fn test_downward_includes_siblings_below_target() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let projection = projector
            .project(&ProjectionRequest::new(Target::Body(1), at(0.0, 0.0, 0.0)))
            .unwrap();
        let bodies: Vec<_> = projection.visits().iter().map(|v| v.body).collect();
        assert_eq!(bodies, vec![1, 2, 5, 3, 4]);
        assert_relative_eq!(projection.pose_of(5).unwrap().position, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_downward_rotates_offsets() {
        let mut model = chain();
        model.bodies[2].quat = [0.7071067811865476, 0.0, 0.0, 0.7071067811865476];
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let projection = projector
            .project(&ProjectionRequest::new(Target::Body(2), at(0.0, 0.0, 0.0)))
            .unwrap();
        // c sits straight above b regardless of b's yaw; d too.
        assert_relative_eq!(
            projection.pose_of(3).unwrap().position,
            Vec3::new(0.0, 0.0, 1.0),
            epsilon = 1e-12
        );

        let mut model = chain();
        model.bodies[3].pos = [1.0, 0.0, 0.0];
        model.bodies[2].quat = [0.7071067811865476, 0.0, 0.0, 0.7071067811865476];
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();
        let projection = projector
            .project(&ProjectionRequest::new(Target::Body(2), at(0.0, 0.0, 0.0)))
            .unwrap();
        // The override fixes b's orientation to identity, so the offset is not rotated.
        assert_relative_eq!(
            projection.pose_of(3).unwrap().position,
            Vec3::new(1.0, 0.0, 0.0),
            epsilon = 1e-12
        );

        let yaw = Pose::new(Vec3::zeros(), quat_from_wxyz([0.7071067811865476, 0.0, 0.0, 0.7071067811865476]));
        let projection = projector
            .project(&ProjectionRequest::new(Target::Body(2), yaw))
            .unwrap();
        assert_relative_eq!(
            projection.pose_of(3).unwrap().position,
            Vec3::new(0.0, 1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_upward_stops_at_root() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let request = ProjectionRequest::new(Target::Body(3), at(5.0, 5.0, 5.0)).with_root(1);
        let projection = projector.project(&request).unwrap();
        let upward: Vec<_> = projection
            .visits()
            .iter()
            .filter(|v| v.pass == Pass::Upward)
            .map(|v| v.body)
            .collect();
        assert_eq!(upward, vec![2, 1]);
        assert!(projection.pose_of(0).is_none());
        // e hangs off a but is not on the target's path.
        assert!(projection.pose_of(5).is_none());
    }

    #[test]
    fn test_unrelated_root_stops_at_world() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let request = ProjectionRequest::new(Target::Body(3), at(5.0, 5.0, 5.0)).with_root(5);
        let projection = projector.project(&request).unwrap();
        let upward: Vec<_> = projection
            .visits()
            .iter()
            .filter(|v| v.pass == Pass::Upward)
            .map(|v| v.body)
            .collect();
        assert_eq!(upward, vec![2, 1, 0]);
    }

    #[test]
    fn test_geom_target_converted_to_owner() {
        let mut model = chain();
        model.geoms[3].pos = [0.0, 0.0, 0.2];
        model.geoms[3].quat = [0.7071067811865476, 0.7071067811865476, 0.0, 0.0];
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let geom_pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), quat_from_wxyz([0.9, 0.1, 0.3, -0.2]));
        let projection = projector
            .project(&ProjectionRequest::new(Target::Geom(3), geom_pose))
            .unwrap();

        let owner = projection.pose_of(3).unwrap();
        let expected = owner.compose(&model.geoms[3].local_pose());
        assert!(Tolerance::DEFAULT.poses_equal(&expected, &geom_pose));
        // The target geom's own marker lands exactly on the override.
        assert!(Tolerance::DEFAULT.poses_equal(&projection.markers()[0].pose, &geom_pose));
    }

    #[test]
    fn test_slide_joint_displaces_child() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let request = ProjectionRequest::new(Target::Body(3), at(5.0, 5.0, 5.0))
            .with_joint_values(JointValues::from([(0, 2.0)]));
        let projection = projector.project(&request).unwrap();
        assert_relative_eq!(projection.pose_of(4).unwrap().position, Vec3::new(5.0, 5.0, 7.0));

        let request = ProjectionRequest::new(Target::Body(3), at(5.0, 5.0, 5.0));
        let projection = projector.project(&request).unwrap();
        assert_relative_eq!(projection.pose_of(4).unwrap().position, Vec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_slide_upward_downward_only_ignores_value() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let request = ProjectionRequest::new(Target::Body(4), at(5.0, 5.0, 7.0))
            .with_root(3)
            .with_joint_values(JointValues::from([(0, 2.0)]));
        let projection = projector.project(&request).unwrap();
        assert_relative_eq!(projection.pose_of(3).unwrap().position, Vec3::new(5.0, 5.0, 7.0));
    }

    #[test]
    fn test_slide_upward_symmetric_subtracts_value() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree)
            .unwrap()
            .with_slide_compensation(SlideCompensation::Symmetric);

        let request = ProjectionRequest::new(Target::Body(4), at(5.0, 5.0, 7.0))
            .with_root(3)
            .with_joint_values(JointValues::from([(0, 2.0)]));
        let projection = projector.project(&request).unwrap();
        assert_relative_eq!(projection.pose_of(3).unwrap().position, Vec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_contract_violations() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();
        let pose = Pose::identity();

        assert!(matches!(
            projector.project(&ProjectionRequest::new(Target::Body(42), pose)),
            Err(KinematicsError::UnknownBody(42))
        ));
        assert!(matches!(
            projector.project(&ProjectionRequest::new(Target::Geom(42), pose)),
            Err(KinematicsError::UnknownGeom(42))
        ));
        assert!(matches!(
            projector.project(&ProjectionRequest::new(Target::Body(1), pose).with_root(42)),
            Err(KinematicsError::UnknownBody(42))
        ));
        assert!(matches!(
            projector.project(
                &ProjectionRequest::new(Target::Body(1), pose)
                    .with_joint_values(JointValues::from([(9, 0.0)]))
            ),
            Err(KinematicsError::UnknownJoint(9))
        ));
    }

    #[test]
    fn test_missing_slide_value_emits_nothing() {
        let mut model = chain();
        model.joints.push(Joint {
            name: Some("other".to_string()),
            kind: JointKind::Slide,
            axis: [1.0, 0.0, 0.0],
        });
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let request = ProjectionRequest::new(Target::Body(1), Pose::identity())
            .with_joint_values(JointValues::from([(1, 0.5)]));
        let mut sink: Vec<Marker> = Vec::new();
        let result = projector.project_into(&request, &mut sink);
        assert!(matches!(
            result,
            Err(KinematicsError::MissingJointValue { joint: 0, body: 4 })
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_non_slide_value_rejected() {
        let mut model = chain();
        model.joints.push(Joint {
            name: Some("hinge".to_string()),
            kind: JointKind::Hinge,
            axis: [1.0, 0.0, 0.0],
        });
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let request = ProjectionRequest::new(Target::Body(1), Pose::identity())
            .with_joint_values(JointValues::from([(0, 0.0), (1, 0.5)]));
        assert!(matches!(
            projector.project(&request),
            Err(KinematicsError::NotASlideJoint { joint: 1, kind: JointKind::Hinge })
        ));
    }

    #[test]
    fn test_cyclic_parents_reported() {
        let mut model = chain();
        // b <-> c loop, cut off from the world body.
        model.bodies[2].parent = Some(3);
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let request = ProjectionRequest::new(Target::Body(3), Pose::identity()).with_root(0);
        assert!(matches!(
            projector.project(&request),
            Err(KinematicsError::CyclicParents(3))
        ));
    }

    #[test]
    fn test_tree_mismatch() {
        let model = chain();
        let tree = KinematicTree::build(&[None], &[]).unwrap();
        assert!(matches!(
            SubtreeProjector::new(&model, &tree),
            Err(KinematicsError::TreeMismatch { tree_bodies: 1, model_bodies: 6 })
        ));
    }

    #[test]
    fn test_project_into_counts() {
        let model = chain();
        let tree = KinematicTree::from_model(&model).unwrap();
        let projector = SubtreeProjector::new(&model, &tree).unwrap();

        let mut sink: Vec<Marker> = Vec::new();
        let request = ProjectionRequest::new(Target::Body(3), at(5.0, 5.0, 5.0)).with_root(0);
        let count = projector.project_into(&request, &mut sink).unwrap();
        assert_eq!(count, 5);
        assert_eq!(sink.len(), 5);
    }
}
