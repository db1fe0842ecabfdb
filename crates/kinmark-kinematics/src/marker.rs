//! Geometry descriptor resolution and marker output.

use kinmark_math::{Mat3, Pose, Vec3};
use kinmark_model::{Geom, GeomKind, MeshId};

use crate::error::KinematicsError;

/// Default marker color: semi-transparent gray.
pub const DEFAULT_RGBA: [f32; 4] = [0.5, 0.5, 0.5, 0.9];

/// Shape of a marker as the renderer expects it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeDescriptor {
    /// Primitive with three size parameters.
    Primitive {
        /// Renderer size parameters.
        size: Vec3,
    },
    /// Entry in the renderer's visual mesh table.
    Mesh {
        /// Visual mesh index. Twice the model's mesh id: the visual table
        /// interleaves two entries per mesh.
        data_id: usize,
    },
}

/// An ephemeral debug shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Primitive type.
    pub kind: GeomKind,
    /// World-frame pose.
    pub pose: Pose,
    /// Size or mesh reference.
    pub shape: ShapeDescriptor,
    /// Color, `[r, g, b, a]` in 0.0..1.0.
    pub rgba: [f32; 4],
    /// Text label.
    pub label: String,
}

impl Marker {
    /// Primitive size, if this is not a mesh.
    pub fn size(&self) -> Option<Vec3> {
        match self.shape {
            ShapeDescriptor::Primitive { size } => Some(size),
            ShapeDescriptor::Mesh { .. } => None,
        }
    }

    /// Renderer data id: the visual mesh index, or `-1` for primitives.
    pub fn data_id(&self) -> i64 {
        match self.shape {
            ShapeDescriptor::Mesh { data_id } => data_id as i64,
            ShapeDescriptor::Primitive { .. } => -1,
        }
    }

    /// World-frame rotation as a 3x3 matrix.
    pub fn rotation_matrix(&self) -> Mat3 {
        self.pose.rotation_matrix()
    }

    /// Replace the color.
    pub fn with_rgba(mut self, rgba: [f32; 4]) -> Self {
        self.rgba = rgba;
        self
    }

    /// Replace the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Visual mesh index for a model mesh id.
pub fn visual_mesh_index(mesh: MeshId) -> usize {
    2 * mesh
}

/// Resolve one geometry into a marker, given its owner's world pose.
///
/// Cylinders carry `(radius, half_length)` natively and are expanded to
/// `(radius, radius, half_length)`.
pub fn resolve_geom(geom: &Geom, owner_pose: &Pose) -> Result<Marker, KinematicsError> {
    let pose = owner_pose.compose(&geom.local_pose());

    let shape = match geom.kind {
        GeomKind::Mesh => {
            let mesh = geom.mesh.ok_or(KinematicsError::MalformedShape {
                kind: geom.kind,
                missing: "mesh",
            })?;
            ShapeDescriptor::Mesh {
                data_id: visual_mesh_index(mesh),
            }
        }
        kind => {
            let [a, b, c] = geom.size.ok_or(KinematicsError::MalformedShape {
                kind,
                missing: "size",
            })?;
            let size = match kind {
                GeomKind::Cylinder => Vec3::new(a, a, b),
                _ => Vec3::new(a, b, c),
            };
            ShapeDescriptor::Primitive { size }
        }
    };

    Ok(Marker {
        kind: geom.kind,
        pose,
        shape,
        rgba: DEFAULT_RGBA,
        label: String::new(),
    })
}
