use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use super::smoothing::blend;
use super::{AvatarPose, SmoothingFactor};
use crate::config::MapperConfig;
use crate::face_transform::DecomposedTransform;

/// Turns decomposed detector transforms into renderer-space avatar poses.
///
/// The mapper holds no per-frame state: the previous pose is passed in explicitly
/// and the new one is returned, so the same mapper can serve any number of sessions.
#[derive(Debug, Clone, Default)]
pub struct AvatarPoseMapper {
    config: MapperConfig,
}

impl AvatarPoseMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Maps one frame.
    ///
    /// A frame without a [`target`](Self::target) leaves the pose untouched: the
    /// previous pose comes back as is, or `None` when there is nothing to hold yet.
    /// Without a previous pose the raw pose is returned regardless of `smoothing`.
    pub fn map(
        &self,
        transform: &DecomposedTransform,
        mirror: bool,
        previous: Option<&AvatarPose>,
        smoothing: SmoothingFactor,
    ) -> Option<AvatarPose> {
        match self.target(transform, mirror) {
            Some(raw) => Some(Self::smooth(previous, &raw, smoothing)),
            None => previous.copied(),
        }
    }

    /// The raw pose this frame moves towards, or `None` if the frame must not move
    /// the avatar: a degenerate transform, or a pose that came out non-finite or
    /// with a scale that is not strictly positive.
    pub fn target(&self, transform: &DecomposedTransform, mirror: bool) -> Option<AvatarPose> {
        if transform.is_degenerate() {
            return None;
        }

        let raw = self.raw_pose(transform, mirror);
        let finite = raw.position.iter().all(|v| v.is_finite()) && raw.scale.is_finite();
        (finite && raw.scale > 0.0).then_some(raw)
    }

    /// Blends a raw pose into the previous one; the first pose is taken as is.
    pub fn smooth(
        previous: Option<&AvatarPose>,
        raw: &AvatarPose,
        smoothing: SmoothingFactor,
    ) -> AvatarPose {
        match previous {
            Some(previous) => blend(previous, raw, smoothing),
            None => *raw,
        }
    }

    /// The unsmoothed pose for a single transform.
    pub fn raw_pose(&self, transform: &DecomposedTransform, mirror: bool) -> AvatarPose {
        let mut orientation = transform.orientation();
        let mut translation = transform.translation;

        if mirror {
            orientation = mirror_orientation(&orientation);
            translation.x = -translation.x;
        }

        let position =
            translation * self.config.unit_scale + Vector3::new(0.0, 0.0, self.config.depth_bias);

        AvatarPose {
            position,
            orientation,
            scale: self.depth_scale(transform.translation.z),
        }
    }

    /// Uniform scale that keeps the avatar a usable size as the face moves in depth.
    pub fn depth_scale(&self, depth: f32) -> f32 {
        let config = &self.config;
        if !config.depth_scaling {
            return 1.0;
        }

        let distance = depth.abs().max(config.min_depth);
        (config.reference_depth / distance).min(config.max_scale)
    }
}

// reflection across the YZ plane: x stays, y and z flip
fn mirror_orientation(q: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::new_unchecked(Quaternion::new(q.w, q.i, -q.j, -q.k))
}
