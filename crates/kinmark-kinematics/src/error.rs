//! Error types for tree construction and marker projection.

use kinmark_model::{BodyId, GeomId, GeomKind, JointId, ModelError};
use thiserror::Error;

/// Errors that can occur while building a kinematic tree or projecting markers.
///
/// Every variant is a contract violation between the caller and the model.
/// A projection that returns one of these has emitted nothing.
#[derive(Error, Debug)]
pub enum KinematicsError {
    /// The model failed validation.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Parent array refers to a body outside the array.
    #[error("Body {body} has parent {parent}, which is not a body")]
    ParentOutOfRange {
        /// Offending body.
        body: BodyId,
        /// Referenced parent id.
        parent: BodyId,
    },

    /// Owner array refers to a body outside the parent array.
    #[error("Geom {geom} is owned by body {body}, which is not a body")]
    OwnerOutOfRange {
        /// Offending geometry.
        geom: GeomId,
        /// Referenced owner id.
        body: BodyId,
    },

    /// Tree was built from a different model.
    #[error("Kinematic tree has {tree_bodies} bodies but model has {model_bodies}")]
    TreeMismatch {
        /// Bodies in the tree.
        tree_bodies: usize,
        /// Bodies in the model.
        model_bodies: usize,
    },

    /// Body id not present in the tree.
    #[error("Body not found: {0}")]
    UnknownBody(BodyId),

    /// Geometry id not present in the model.
    #[error("Geom not found: {0}")]
    UnknownGeom(GeomId),

    /// Joint id not present in the model.
    #[error("Joint not found: {0}")]
    UnknownJoint(JointId),

    /// Body name not present in the model.
    #[error("Body name not found: {0}")]
    UnknownBodyName(String),

    /// Geometry name not present in the model.
    #[error("Geom name not found: {0}")]
    UnknownGeomName(String),

    /// Joint name not present in the model.
    #[error("Joint name not found: {0}")]
    UnknownJointName(String),

    /// Both a body and a geometry were named as the target.
    #[error("Only one of target body ({body}) or target geom ({geom}) may be given")]
    AmbiguousTarget {
        /// Requested body name.
        body: String,
        /// Requested geometry name.
        geom: String,
    },

    /// Neither a body nor a geometry was named as the target.
    #[error("A target body or target geom is required")]
    MissingTarget,

    /// Joint value supplied for a joint that is not a slide joint.
    #[error("Joint {joint} is {kind:?}, only slide joint values are accepted")]
    NotASlideJoint {
        /// Offending joint.
        joint: JointId,
        /// Its actual kind.
        kind: kinmark_model::JointKind,
    },

    /// Joint values were supplied but omit a slide joint the traversal reaches.
    #[error("No value supplied for slide joint {joint} on body {body}")]
    MissingJointValue {
        /// Slide joint without a value.
        joint: JointId,
        /// Body it moves.
        body: BodyId,
    },

    /// Parent relation loops back on itself.
    #[error("Parent chain starting at body {0} does not reach a root")]
    CyclicParents(BodyId),

    /// Geometry's size/mesh fields do not match its kind.
    #[error("Geom of kind {kind:?} is missing its {missing}")]
    MalformedShape {
        /// Declared kind.
        kind: GeomKind,
        /// Which field is absent.
        missing: &'static str,
    },
}
