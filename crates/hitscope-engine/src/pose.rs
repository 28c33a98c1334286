//! Camera pose snapshots.
//!
//! The local camera frame is X-forward, Y-right, Z-up: a direction
//! `(1, right, up)` in camera space is rotated into world space by the
//! pose's orientation.

use hitscope_scene::{Point3, UnitQuaternion, Vector3};

/// Camera position and orientation, captured once per tile job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl CameraPose {
    pub fn new(position: Point3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    /// At the origin, looking down +X.
    pub fn identity() -> Self {
        Self::new(Point3::origin(), UnitQuaternion::identity())
    }

    /// Build from a position and yaw/pitch/roll in radians. Yaw turns about
    /// +Z, pitch about +Y, roll about +X.
    pub fn from_yaw_pitch_roll(position: Point3<f32>, yaw: f32, pitch: f32, roll: f32) -> Self {
        Self::new(position, UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    /// Rotate a camera-space vector into world space.
    pub fn transform_vector(&self, local: Vector3<f32>) -> Vector3<f32> {
        self.rotation * local
    }

    /// World-space forward (+X) axis.
    pub fn forward(&self) -> Vector3<f32> {
        self.transform_vector(Vector3::x())
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::identity()
    }
}
