use nalgebra::UnitQuaternion;

use super::{AvatarPose, SmoothingFactor};

// below this angle slerp degenerates and the endpoints are treated as equal
const SLERP_EPSILON: f32 = 1e-6;

/// Blends `previous` towards `raw`: slerp for the orientation, lerp for position and scale.
///
/// The endpoints are returned bit-for-bit at factors 0 and 1.
pub(crate) fn blend(previous: &AvatarPose, raw: &AvatarPose, factor: SmoothingFactor) -> AvatarPose {
    let t = factor.get();
    if t >= 1.0 {
        return *raw;
    }
    if t <= 0.0 {
        return *previous;
    }

    AvatarPose {
        position: previous.position.lerp(&raw.position, t),
        orientation: slerp_shortest(&previous.orientation, &raw.orientation, t),
        scale: previous.scale + (raw.scale - previous.scale) * t,
    }
}

fn slerp_shortest(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    // q and -q are the same rotation; take the short way round
    let b = if a.coords.dot(&b.coords) < 0.0 {
        UnitQuaternion::new_unchecked(-b.into_inner())
    } else {
        *b
    };

    a.try_slerp(&b, t, SLERP_EPSILON).unwrap_or(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::f32::consts::FRAC_PI_2;

    // f32 angle_to bottoms out around 1e-3 rad, compare components instead
    fn same_rotation(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, eps: f32) -> bool {
        (a.coords - b.coords).amax() < eps || (a.coords + b.coords).amax() < eps
    }

    fn pose(position: [f32; 3], yaw: f32, scale: f32) -> AvatarPose {
        AvatarPose::new(
            Vector3::new(position[0], position[1], position[2]),
            UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
            scale,
        )
    }

    #[test]
    fn snap_returns_raw_exactly() {
        let previous = pose([1.0, 2.0, 3.0], 0.3, 1.0);
        let raw = pose([4.0, 5.0, 6.0], -1.2, 2.0);
        assert_eq!(blend(&previous, &raw, SmoothingFactor::SNAP), raw);
    }

    #[test]
    fn hold_returns_previous_exactly() {
        let previous = pose([1.0, 2.0, 3.0], 0.3, 1.0);
        let raw = pose([4.0, 5.0, 6.0], -1.2, 2.0);
        assert_eq!(blend(&previous, &raw, SmoothingFactor::HOLD), previous);
    }

    #[test]
    fn halfway_blend() {
        let previous = pose([0.0, 0.0, 0.0], 0.0, 1.0);
        let raw = pose([2.0, 4.0, 6.0], FRAC_PI_2, 3.0);

        let result = blend(&previous, &raw, SmoothingFactor::new(0.5));

        assert!((result.position - Vector3::new(1.0, 2.0, 3.0)).amax() < 1e-6);
        assert!((result.scale - 2.0).abs() < 1e-6);
        let expected = UnitQuaternion::from_euler_angles(0.0, 0.0, FRAC_PI_2 / 2.0);
        assert!(same_rotation(&result.orientation, &expected, 1e-5));
    }

    #[test]
    fn takes_shortest_arc() {
        let a = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.1);
        let b = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.3);
        let flipped = UnitQuaternion::new_unchecked(-b.into_inner());

        let result = slerp_shortest(&a, &flipped, 0.5);
        let expected = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.2);

        assert!(same_rotation(&result, &expected, 1e-5));
        assert!((result.norm() - 1.0).abs() < 1e-5);
    }
}
