#![warn(missing_docs)]

//! Kinematic tree traversal and subtree marker projection.
//!
//! This crate answers "what would this part of the robot look like if it
//! were over there": given an override pose for one body or geometry, it
//! recomputes world poses for the subtree below it and the ancestor chain
//! above it, and emits a debug marker for every geometry along the way.
//! The simulation state is only read.
//!
//! # Features
//!
//! - Parent/child and body/geometry adjacency from flat id arrays
//! - Breadth-first subtree traversal that never revisits a body
//! - Geometry-to-marker resolution, including the renderer's mesh index
//!   convention and cylinder size expansion
//! - Slide joint displacement during downward propagation
//! - Name-based requests with explicit quaternion component order
//!
//! # Example
//!
//! ```ignore
//! use kinmark_kinematics::{KinematicTree, MarkerBuffer, ProjectionRequest, SubtreeProjector, Target};
//! use kinmark_math::Pose;
//!
//! let model = kinmark_model::Model::from_json(&json)?;
//! let tree = KinematicTree::from_model(&model)?;
//! let projector = SubtreeProjector::new(&model, &tree)?;
//!
//! let hand = model.body_id("hand").unwrap();
//! let request = ProjectionRequest::new(Target::Body(hand), Pose::translation(0.3, 0.6, 0.2));
//!
//! let mut markers = MarkerBuffer::new();
//! projector.project_into(&request, &mut markers)?;
//! ```

mod error;
mod marker;
mod projector;
mod request;
mod sink;
mod tree;

pub use error::KinematicsError;
pub use marker::{resolve_geom, visual_mesh_index, Marker, ShapeDescriptor, DEFAULT_RGBA};
pub use projector::{
    BodyVisit, JointValues, Pass, Projection, ProjectionRequest, SlideCompensation,
    SubtreeProjector, Target,
};
pub use request::{NamedRequest, QuatOrder};
pub use sink::{MarkerBuffer, MarkerSink};
pub use tree::{BreadthFirst, KinematicTree};
