#![warn(missing_docs)]

//! Read-only snapshot of an articulated simulation model.
//!
//! A [`Model`] holds the flat arrays the marker projector reads: bodies with
//! their parent ids and static local offsets, geometries with their owner
//! body and shape parameters, and joints with their type and axis. Ids are
//! array indices. Body `0` is conventionally the world body.
//!
//! The model never changes while a projection runs. It is loaded once (for
//! example from a JSON dump of the simulation engine's model) and shared.
//!
//! Quaternions are stored scalar-first (`[w, x, y, z]`), the engine's
//! convention. Use the accessors that return [`Pose`] rather than reading
//! the raw arrays.

mod error;

use kinmark_math::{Pose, Vec3};
use serde::{de, Deserialize, Deserializer, Serialize};

pub use error::ModelError;

/// Index of a body in [`Model::bodies`].
pub type BodyId = usize;

/// Index of a geometry in [`Model::geoms`].
pub type GeomId = usize;

/// Index of a joint in [`Model::joints`].
pub type JointId = usize;

/// Index into the engine's mesh table.
pub type MeshId = usize;

const IDENTITY_QUAT: [f64; 4] = [1.0, 0.0, 0.0, 0.0];

fn identity_quat() -> [f64; 4] {
    IDENTITY_QUAT
}

fn parent_id<'de, D>(deserializer: D) -> Result<Option<BodyId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<i64>::deserialize(deserializer)? {
        None | Some(-1) => Ok(None),
        Some(id) => BodyId::try_from(id)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid parent id {id}"))),
    }
}

/// A type field written either as a name or as the engine's integer code.
#[derive(Deserialize)]
#[serde(untagged)]
enum KindRepr<T> {
    Native(i32),
    Named(T),
}

fn geom_kind<'de, D>(deserializer: D) -> Result<GeomKind, D::Error>
where
    D: Deserializer<'de>,
{
    match KindRepr::deserialize(deserializer)? {
        KindRepr::Named(kind) => Ok(kind),
        KindRepr::Native(code) => GeomKind::from_native(code)
            .ok_or_else(|| de::Error::custom(format!("unknown geom type code {code}"))),
    }
}

fn joint_kind<'de, D>(deserializer: D) -> Result<JointKind, D::Error>
where
    D: Deserializer<'de>,
{
    match KindRepr::deserialize(deserializer)? {
        KindRepr::Named(kind) => Ok(kind),
        KindRepr::Native(code) => JointKind::from_native(code)
            .ok_or_else(|| de::Error::custom(format!("unknown joint type code {code}"))),
    }
}

/// Geometry primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeomKind {
    /// Infinite plane.
    Plane,
    /// Height field.
    HeightField,
    /// Sphere; size is `[radius, _, _]`.
    Sphere,
    /// Capsule; size is `[radius, half_length, _]`.
    Capsule,
    /// Ellipsoid; size is the three radii.
    Ellipsoid,
    /// Cylinder; size is `[radius, half_length, _]`.
    Cylinder,
    /// Box; size is the three half-extents.
    Box,
    /// Triangle mesh referenced by [`Geom::mesh`].
    Mesh,
}

impl GeomKind {
    /// Decode the engine's integer geometry type.
    pub fn from_native(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Plane),
            1 => Some(Self::HeightField),
            2 => Some(Self::Sphere),
            3 => Some(Self::Capsule),
            4 => Some(Self::Ellipsoid),
            5 => Some(Self::Cylinder),
            6 => Some(Self::Box),
            7 => Some(Self::Mesh),
            _ => None,
        }
    }

    /// The engine's integer geometry type.
    pub fn native_code(self) -> i32 {
        match self {
            Self::Plane => 0,
            Self::HeightField => 1,
            Self::Sphere => 2,
            Self::Capsule => 3,
            Self::Ellipsoid => 4,
            Self::Cylinder => 5,
            Self::Box => 6,
            Self::Mesh => 7,
        }
    }
}

/// Joint type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    /// Six degrees of freedom.
    Free,
    /// Three rotational degrees of freedom.
    Ball,
    /// Translation along [`Joint::axis`].
    Slide,
    /// Rotation about [`Joint::axis`].
    Hinge,
}

impl JointKind {
    /// Decode the engine's integer joint type.
    pub fn from_native(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Free),
            1 => Some(Self::Ball),
            2 => Some(Self::Slide),
            3 => Some(Self::Hinge),
            _ => None,
        }
    }

    /// The engine's integer joint type.
    pub fn native_code(self) -> i32 {
        match self {
            Self::Free => 0,
            Self::Ball => 1,
            Self::Slide => 2,
            Self::Hinge => 3,
        }
    }
}

/// A rigid body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Optional unique name.
    #[serde(default)]
    pub name: Option<String>,
    /// Parent body. `None`, or the body's own id, marks a tree root.
    /// Engine dumps write `-1` for "no parent"; that reads as `None`.
    #[serde(default, deserialize_with = "parent_id")]
    pub parent: Option<BodyId>,
    /// Offset from the parent frame.
    #[serde(default)]
    pub pos: [f64; 3],
    /// Rotation relative to the parent frame, scalar-first.
    #[serde(default = "identity_quat")]
    pub quat: [f64; 4],
    /// Joints attaching this body to its parent.
    #[serde(default)]
    pub joints: Vec<JointId>,
}

impl Body {
    /// Static pose of this body in its parent's frame.
    pub fn local_pose(&self) -> Pose {
        Pose::from_wxyz(self.pos, self.quat)
    }
}

/// A geometry attached to a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geom {
    /// Optional unique name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning body.
    pub body: BodyId,
    /// Primitive type, by name or engine code.
    #[serde(deserialize_with = "geom_kind")]
    pub kind: GeomKind,
    /// Offset from the owning body's frame.
    #[serde(default)]
    pub pos: [f64; 3],
    /// Rotation relative to the owning body's frame, scalar-first.
    #[serde(default = "identity_quat")]
    pub quat: [f64; 4],
    /// Native size parameters. Present for every kind except [`GeomKind::Mesh`].
    #[serde(default)]
    pub size: Option<[f64; 3]>,
    /// Mesh table entry. Present only for [`GeomKind::Mesh`].
    #[serde(default)]
    pub mesh: Option<MeshId>,
}

impl Geom {
    /// Static pose of this geometry in its owner's frame.
    pub fn local_pose(&self) -> Pose {
        Pose::from_wxyz(self.pos, self.quat)
    }
}

/// A joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Optional unique name.
    #[serde(default)]
    pub name: Option<String>,
    /// Joint type, by name or engine code.
    #[serde(deserialize_with = "joint_kind")]
    pub kind: JointKind,
    /// Motion axis.
    #[serde(default = "default_axis")]
    pub axis: [f64; 3],
}

fn default_axis() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

impl Joint {
    /// Motion axis as a vector.
    pub fn axis_vec(&self) -> Vec3 {
        Vec3::from(self.axis)
    }
}

/// A simulation model snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Format version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// All bodies, indexed by [`BodyId`].
    pub bodies: Vec<Body>,
    /// All geometries, indexed by [`GeomId`].
    #[serde(default)]
    pub geoms: Vec<Geom>,
    /// All joints, indexed by [`JointId`].
    #[serde(default)]
    pub joints: Vec<Joint>,
}

fn default_version() -> String {
    "0.1".to_string()
}

impl Default for Model {
    fn default() -> Self {
        Self {
            version: default_version(),
            bodies: Vec::new(),
            geoms: Vec::new(),
            joints: Vec::new(),
        }
    }
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string and validate.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Parent of every body, in id order.
    pub fn parent_ids(&self) -> Vec<Option<BodyId>> {
        self.bodies.iter().map(|b| b.parent).collect()
    }

    /// Owner of every geometry, in id order.
    pub fn owner_ids(&self) -> Vec<BodyId> {
        self.geoms.iter().map(|g| g.body).collect()
    }

    /// Look up a body by name.
    pub fn body_id(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .position(|b| b.name.as_deref() == Some(name))
    }

    /// Look up a geometry by name.
    pub fn geom_id(&self, name: &str) -> Option<GeomId> {
        self.geoms.iter().position(|g| g.name.as_deref() == Some(name))
    }

    /// Look up a joint by name.
    pub fn joint_id(&self, name: &str) -> Option<JointId> {
        self.joints
            .iter()
            .position(|j| j.name.as_deref() == Some(name))
    }

    /// Display name of a body: its name, or `#id`.
    pub fn body_label(&self, id: BodyId) -> String {
        match self.bodies.get(id).and_then(|b| b.name.as_deref()) {
            Some(name) => name.to_string(),
            None => format!("#{id}"),
        }
    }

    /// Check index consistency and shape encoding.
    ///
    /// Parent relations are not checked for cycles here; traversal guards
    /// against those.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.bodies.is_empty() {
            return Err(ModelError::Empty);
        }

        for (id, body) in self.bodies.iter().enumerate() {
            if let Some(parent) = body.parent {
                if parent >= self.bodies.len() {
                    return Err(ModelError::ParentOutOfRange { body: id, parent });
                }
            }
            if let Some(&joint) = body.joints.iter().find(|&&j| j >= self.joints.len()) {
                return Err(ModelError::JointOutOfRange { body: id, joint });
            }
        }

        for (id, geom) in self.geoms.iter().enumerate() {
            if geom.body >= self.bodies.len() {
                return Err(ModelError::OwnerOutOfRange {
                    geom: id,
                    body: geom.body,
                });
            }
            let well_formed = match geom.kind {
                GeomKind::Mesh => geom.mesh.is_some() && geom.size.is_none(),
                _ => geom.size.is_some() && geom.mesh.is_none(),
            };
            if !well_formed {
                return Err(ModelError::ShapeMismatch {
                    geom: id,
                    kind: geom.kind,
                });
            }
        }

        Ok(())
    }
}
