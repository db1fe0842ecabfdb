//! Name-based projection requests.
//!
//! Callers outside the core usually know parts by name and receive
//! quaternions in whatever order their producer uses. [`NamedRequest`]
//! carries that form and resolves it against a model into a
//! [`ProjectionRequest`].

use std::collections::BTreeMap;

use kinmark_math::{Pose, Quat, Vec3};
use kinmark_model::Model;
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;
use crate::projector::{JointValues, ProjectionRequest, Target};

/// Component order of a raw quaternion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuatOrder {
    /// Scalar first, `[w, x, y, z]`.
    #[default]
    Wxyz,
    /// Scalar last, `[x, y, z, w]`.
    Xyzw,
}

/// A projection request naming its parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRequest {
    /// Body whose pose is overridden. Exclusive with `target_geom`.
    #[serde(default)]
    pub target_body: Option<String>,
    /// Geometry whose pose is overridden. Exclusive with `target_body`.
    #[serde(default)]
    pub target_geom: Option<String>,
    /// Upper bound for upward propagation.
    #[serde(default)]
    pub root_body: Option<String>,
    /// Override position, world frame.
    pub position: [f64; 3],
    /// Override orientation components, in `quat_order`. Identity if absent.
    #[serde(default)]
    pub quat: Option<[f64; 4]>,
    /// Component order of `quat`.
    #[serde(default)]
    pub quat_order: QuatOrder,
    /// Slide joint values by joint name.
    #[serde(default)]
    pub joint_values: Option<BTreeMap<String, f64>>,
}

impl NamedRequest {
    /// Override pose, with the quaternion permuted into the internal order.
    pub fn pose(&self) -> Pose {
        let Some(quat) = self.quat else {
            return Pose::new(Vec3::from(self.position), Quat::identity());
        };
        match self.quat_order {
            QuatOrder::Wxyz => Pose::from_wxyz(self.position, quat),
            QuatOrder::Xyzw => Pose::from_xyzw(self.position, quat),
        }
    }

    /// Resolve names against `model`.
    pub fn resolve(&self, model: &Model) -> Result<ProjectionRequest, KinematicsError> {
        let target = match (&self.target_body, &self.target_geom) {
            (Some(body), Some(geom)) => {
                return Err(KinematicsError::AmbiguousTarget {
                    body: body.clone(),
                    geom: geom.clone(),
                })
            }
            (Some(body), None) => Target::Body(
                model
                    .body_id(body)
                    .ok_or_else(|| KinematicsError::UnknownBodyName(body.clone()))?,
            ),
            (None, Some(geom)) => Target::Geom(
                model
                    .geom_id(geom)
                    .ok_or_else(|| KinematicsError::UnknownGeomName(geom.clone()))?,
            ),
            (None, None) => return Err(KinematicsError::MissingTarget),
        };

        let mut request = ProjectionRequest::new(target, self.pose());

        if let Some(root) = &self.root_body {
            let root = model
                .body_id(root)
                .ok_or_else(|| KinematicsError::UnknownBodyName(root.clone()))?;
            request = request.with_root(root);
        }

        if let Some(named) = &self.joint_values {
            let mut values = JointValues::new();
            for (name, &value) in named {
                let joint = model
                    .joint_id(name)
                    .ok_or_else(|| KinematicsError::UnknownJointName(name.clone()))?;
                values.insert(joint, value);
            }
            request = request.with_joint_values(values);
        }

        Ok(request)
    }
}
