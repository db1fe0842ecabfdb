#![warn(missing_docs)]

//! Rigid transform types for kinmark.
//!
//! Thin wrappers around nalgebra providing the pieces the marker projector
//! needs: vectors, unit quaternions, world-frame poses, and tolerance
//! constants.
//!
//! Quaternion component order is explicit at every boundary. Simulation
//! models store quaternions scalar-first (`[w, x, y, z]`); some producers
//! emit scalar-last (`[x, y, z, w]`). Use [`quat_from_wxyz`] and
//! [`quat_from_xyzw`] when reading raw components, and the matching
//! `quat_to_*` functions when writing them. Internally every rotation is a
//! nalgebra [`UnitQuaternion`].

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit quaternion rotation.
pub type Quat = UnitQuaternion<f64>;

/// A 3x3 rotation matrix.
pub type Mat3 = Matrix3<f64>;

/// Build a rotation from scalar-first `[w, x, y, z]` components.
///
/// The components are normalized, matching how the simulation engine reads
/// its own quaternions.
pub fn quat_from_wxyz(q: [f64; 4]) -> Quat {
    UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]))
}

/// Build a rotation from scalar-last `[x, y, z, w]` components.
pub fn quat_from_xyzw(q: [f64; 4]) -> Quat {
    UnitQuaternion::from_quaternion(Quaternion::new(q[3], q[0], q[1], q[2]))
}

/// Scalar-first `[w, x, y, z]` components of a rotation.
pub fn quat_to_wxyz(q: &Quat) -> [f64; 4] {
    [q.w, q.i, q.j, q.k]
}

/// A rigid pose: position plus orientation.
///
/// Poses are values. Every operation returns a new pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Origin of the frame.
    pub position: Vec3,
    /// Rotation of the frame.
    pub orientation: Quat,
}

impl Pose {
    /// Identity pose.
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
        }
    }

    /// Create a pose from a position and orientation.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pure translation by `(x, y, z)`.
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vec3::new(x, y, z), Quat::identity())
    }

    /// Create a pose from raw position and scalar-first quaternion components.
    pub fn from_wxyz(position: [f64; 3], quat: [f64; 4]) -> Self {
        Self::new(Vec3::from(position), quat_from_wxyz(quat))
    }

    /// Create a pose from raw position and scalar-last quaternion components.
    pub fn from_xyzw(position: [f64; 3], quat: [f64; 4]) -> Self {
        Self::new(Vec3::from(position), quat_from_xyzw(quat))
    }

    /// Express a pose given relative to `self` in `self`'s parent frame.
    ///
    /// ```text
    /// position'    = self.position + self.orientation * local.position
    /// orientation' = self.orientation * local.orientation
    /// ```
    pub fn compose(&self, local: &Pose) -> Self {
        Self {
            position: self.apply_point(&local.position),
            orientation: self.orientation * local.orientation,
        }
    }

    /// Inverse pose, such that `p.compose(&p.inverse())` is the identity.
    pub fn inverse(&self) -> Self {
        let orientation = self.orientation.inverse();
        Self {
            position: -(orientation * self.position),
            orientation,
        }
    }

    /// Transform a point from this frame into the parent frame.
    pub fn apply_point(&self, p: &Vec3) -> Vec3 {
        self.position + self.orientation * *p
    }

    /// The orientation as a 3x3 rotation matrix.
    pub fn rotation_matrix(&self) -> Mat3 {
        self.orientation.to_rotation_matrix().into_inner()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for pose comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance.
    pub linear: f64,
    /// Tolerance on quaternion components (sign-insensitive).
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances (1e-9 linear, 1e-9 on quaternion components).
    pub const DEFAULT: Self = Self {
        linear: 1e-9,
        angular: 1e-9,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Vec3, b: &Vec3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if two rotations are equal within tolerance.
    ///
    /// `q` and `-q` describe the same rotation, so both signs are accepted.
    pub fn rotations_equal(&self, a: &Quat, b: &Quat) -> bool {
        let (a, b) = (a.quaternion().coords, b.quaternion().coords);
        (a - b).norm().min((a + b).norm()) < self.angular
    }

    /// Check if two poses are equal within tolerance.
    pub fn poses_equal(&self, a: &Pose, b: &Pose) -> bool {
        self.points_equal(&a.position, &b.position)
            && self.rotations_equal(&a.orientation, &b.orientation)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
