pub mod mapper;
pub mod rig;
mod smoothing;

pub use mapper::AvatarPoseMapper;
pub use rig::{AvatarRig, NodeId, RigError, SceneArena, SceneGraph, SceneNode};

use nalgebra::{UnitQuaternion, Vector3};

/// Pose for the avatar's root and head nodes, in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarPose {
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub scale: f32,
}

impl AvatarPose {
    pub fn new(position: Vector3<f32>, orientation: UnitQuaternion<f32>, scale: f32) -> Self {
        Self {
            position,
            orientation,
            scale,
        }
    }

    /// `[px, py, pz, qx, qy, qz, qw, scale]`
    pub fn to_array(&self) -> [f32; 8] {
        let q = self.orientation.coords;
        [
            self.position.x,
            self.position.y,
            self.position.z,
            q.x,
            q.y,
            q.z,
            q.w,
            self.scale,
        ]
    }
}

// rest pose: origin, identity, unit scale
impl Default for AvatarPose {
    fn default() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity(), 1.0)
    }
}

/// Weight of the newest pose when blending with the previous one.
///
/// `1.0` snaps to the latest detection, `0.0` holds the previous pose. Values in
/// between trade latency for less landmark jitter.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SmoothingFactor(f32);

impl SmoothingFactor {
    pub const SNAP: SmoothingFactor = SmoothingFactor(1.0);
    pub const HOLD: SmoothingFactor = SmoothingFactor(0.0);

    /// Clamps into `[0, 1]`; NaN falls back to [`SmoothingFactor::SNAP`].
    pub fn new(factor: f32) -> Self {
        if factor.is_nan() {
            return Self::SNAP;
        }
        Self(factor.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for SmoothingFactor {
    fn default() -> Self {
        Self::SNAP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_factor_is_clamped() {
        assert_eq!(SmoothingFactor::new(1.5), SmoothingFactor::SNAP);
        assert_eq!(SmoothingFactor::new(-0.2), SmoothingFactor::HOLD);
        assert_eq!(SmoothingFactor::new(f32::NAN), SmoothingFactor::SNAP);
        assert_eq!(SmoothingFactor::new(0.25).get(), 0.25);
    }

    #[test]
    fn pose_array_layout() {
        let pose = AvatarPose::new(
            Vector3::new(1.0, 2.0, 3.0),
            UnitQuaternion::identity(),
            0.5,
        );
        assert_eq!(pose.to_array(), [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0, 0.5]);
    }
}
