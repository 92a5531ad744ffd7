use nalgebra::{Matrix3, UnitQuaternion};

// |m20| above this counts as gimbal lock (pitch at +-90 degrees)
const GIMBAL_LOCK_THRESHOLD: f32 = 1.0 - 1e-6;

/// Euler angles in radians for the rotation `R = Rz(z) * Ry(y) * Rx(x)`.
///
/// Read as intrinsic rotations this is Z, then Y, then X (yaw, pitch, roll); read as
/// extrinsic rotations about the fixed axes it is X, then Y, then Z. It is the
/// convention of `UnitQuaternion::from_euler_angles(x, y, z)` and of a renderer-side
/// Euler order of `"ZYX"`. Anything consuming these angles must use the same order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerZyx {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl EulerZyx {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Extracts the angles from an orthonormal rotation matrix.
    ///
    /// At gimbal lock (`y` at +-90 degrees) only `z - x` or `z + x` is observable;
    /// `x` is then reported as zero and the whole remaining rotation goes into `z`.
    /// The orientation still round-trips, the individual angles do not.
    pub fn from_rotation_matrix(m: &Matrix3<f32>) -> Self {
        let m20 = m[(2, 0)].clamp(-1.0, 1.0);
        let y = (-m20).asin();

        if m20.abs() < GIMBAL_LOCK_THRESHOLD {
            Self {
                x: m[(2, 1)].atan2(m[(2, 2)]),
                y,
                z: m[(1, 0)].atan2(m[(0, 0)]),
            }
        } else {
            Self {
                x: 0.0,
                y,
                z: (-m[(0, 1)]).atan2(m[(1, 1)]),
            }
        }
    }

    pub fn to_quaternion(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(self.x, self.y, self.z)
    }

    pub fn to_rotation_matrix(&self) -> Matrix3<f32> {
        self.to_quaternion().to_rotation_matrix().into_inner()
    }

    pub fn is_gimbal_locked(&self) -> bool {
        self.y.sin().abs() >= GIMBAL_LOCK_THRESHOLD
    }
}
