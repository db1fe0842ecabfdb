//! Error types for model loading and validation.

use thiserror::Error;

use crate::{BodyId, GeomId, GeomKind, JointId};

/// Errors that can occur while loading or validating a model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Malformed JSON.
    #[error("Failed to parse model: {0}")]
    Json(#[from] serde_json::Error),

    /// Model has no bodies (not even a world body).
    #[error("Model has no bodies")]
    Empty,

    /// Body refers to a parent that does not exist.
    #[error("Body {body} has parent {parent}, which is not a body")]
    ParentOutOfRange {
        /// Offending body.
        body: BodyId,
        /// Referenced parent id.
        parent: BodyId,
    },

    /// Geometry refers to an owner body that does not exist.
    #[error("Geom {geom} is owned by body {body}, which is not a body")]
    OwnerOutOfRange {
        /// Offending geometry.
        geom: GeomId,
        /// Referenced owner id.
        body: BodyId,
    },

    /// Body refers to a joint that does not exist.
    #[error("Body {body} refers to joint {joint}, which is not a joint")]
    JointOutOfRange {
        /// Offending body.
        body: BodyId,
        /// Referenced joint id.
        joint: JointId,
    },

    /// Geometry's size/mesh fields do not match its kind.
    #[error("Geom {geom} of kind {kind:?} must carry exactly one of size or mesh")]
    ShapeMismatch {
        /// Offending geometry.
        geom: GeomId,
        /// Declared kind.
        kind: GeomKind,
    },
}
