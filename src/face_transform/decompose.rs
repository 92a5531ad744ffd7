use nalgebra::{Matrix3, Matrix4, Vector3};

use super::{AffineMatrix, DecomposedTransform, Degeneracy, EulerZyx, TransformError};

/// Smallest scale a column may have before its axis counts as collapsed.
pub const SCALE_EPSILON: f32 = 1e-6;

/// Splits an affine transform into translation, Z-Y-X Euler rotation and scale.
///
/// Runs once per detection frame, so numerically unstable input does not raise:
/// a collapsed axis is clamped to [`SCALE_EPSILON`], a reflection is kept as is,
/// and an overflow yields the identity. All of these are reported through
/// [`DecomposedTransform::degeneracy`] so the caller can skip the frame.
pub fn decompose(affine: &AffineMatrix) -> DecomposedTransform {
    let mut m = *affine.matrix();

    // bring w back to 1; validation guarantees it is non-zero
    let w = m[(3, 3)];
    if w != 1.0 {
        m /= w;
    }

    let translation: Vector3<f32> = m.fixed_view::<3, 1>(0, 3).into_owned();
    let linear: Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let lengths = Vector3::from_fn(|axis, _| linear.column(axis).norm());

    // finite input can still overflow in the divide or the column norms
    if !translation.iter().chain(linear.iter()).chain(lengths.iter()).all(|v| v.is_finite()) {
        return DecomposedTransform {
            degeneracy: Some(Degeneracy::NonFinite),
            ..DecomposedTransform::identity()
        };
    }

    let mut degeneracy = None;
    let mut scale = Vector3::zeros();
    let mut rotation = linear;

    for axis in 0..3 {
        let mut length = lengths[axis];
        if length < SCALE_EPSILON {
            length = SCALE_EPSILON;
            degeneracy.get_or_insert(Degeneracy::CollapsedAxis { axis });
        }
        scale[axis] = length;
        rotation.column_mut(axis).unscale_mut(length);
    }

    if degeneracy.is_none() && linear.determinant() < 0.0 {
        degeneracy = Some(Degeneracy::Reflection);
    }

    DecomposedTransform {
        translation,
        rotation: EulerZyx::from_rotation_matrix(&rotation),
        scale,
        degeneracy,
    }
}

/// Validates and decomposes 16 column-major values straight from the detector.
pub fn decompose_slice(values: &[f32]) -> Result<DecomposedTransform, TransformError> {
    let affine = AffineMatrix::from_column_major(values)?;
    Ok(decompose(&affine))
}

/// Rebuilds `T * R * S` from a decomposition.
///
/// ```text
/// [ R11*sx R12*sy R13*sz Tx ]
/// [ R21*sx R22*sy R23*sz Ty ]
/// [ R31*sx R32*sy R33*sz Tz ]
/// [   0      0      0    1  ]
/// ```
pub fn compose(transform: &DecomposedTransform) -> Matrix4<f32> {
    let rotation_and_scale =
        transform.rotation.to_rotation_matrix() * Matrix3::from_diagonal(&transform.scale);

    let mut result = Matrix4::identity();
    result
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&rotation_and_scale);
    result
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&transform.translation);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::f32::consts::FRAC_PI_2;

    // f32 angle_to bottoms out around 1e-3 rad, compare components instead
    fn same_rotation(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, eps: f32) -> bool {
        (a.coords - b.coords).amax() < eps || (a.coords + b.coords).amax() < eps
    }

    fn approx_eq_vec(a: &Vector3<f32>, b: &Vector3<f32>, eps: f32) -> bool {
        (a - b).amax() < eps
    }

    fn trs(translation: Vector3<f32>, rotation: UnitQuaternion<f32>, scale: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&translation)
            * rotation.to_homogeneous()
            * Matrix4::new_scaling(scale)
    }

    #[test]
    fn identity_decomposes_to_rest() {
        let result = decompose_slice(Matrix4::<f32>::identity().as_slice()).unwrap();

        assert_eq!(result.translation, Vector3::zeros());
        assert_eq!(result.rotation, EulerZyx::default());
        assert_eq!(result.scale, Vector3::new(1.0, 1.0, 1.0));
        assert!(!result.is_degenerate());
    }

    #[test]
    fn recovers_translation_rotation_and_uniform_scale() {
        let rotation = UnitQuaternion::from_euler_angles(0.2, -0.5, 1.1);
        let translation = Vector3::new(-3.0, 7.5, -42.0);
        let m = trs(translation, rotation, 1.7);

        let result = decompose_slice(m.as_slice()).unwrap();

        assert!(approx_eq_vec(&result.translation, &translation, 1e-4));
        assert!(approx_eq_vec(&result.scale, &Vector3::repeat(1.7), 1e-5));
        assert!(same_rotation(&result.orientation(), &rotation, 1e-5));
    }

    #[test]
    fn rotate_z_quarter_turn() {
        let m = trs(
            Vector3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            2.0,
        );

        let result = decompose_slice(m.as_slice()).unwrap();

        assert!(approx_eq_vec(&result.translation, &Vector3::new(1.0, 2.0, 3.0), 1e-6));
        assert!(approx_eq_vec(&result.scale, &Vector3::repeat(2.0), 1e-6));
        assert!((result.rotation.z - FRAC_PI_2).abs() < 1e-5);
        assert!(result.rotation.x.abs() < 1e-5);
        assert!(result.rotation.y.abs() < 1e-5);
    }

    #[test]
    fn compose_inverts_decompose() {
        let rotation = UnitQuaternion::from_euler_angles(-0.4, 0.3, -2.6);
        let m = Matrix4::new_translation(&Vector3::new(0.5, -1.0, -30.0))
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 2.0, 0.5));

        let rebuilt = compose(&decompose_slice(m.as_slice()).unwrap());

        assert!((rebuilt - m).amax() < 1e-4);
    }

    #[test]
    fn normalizes_homogeneous_scale() {
        let mut m = Matrix4::new_translation(&Vector3::new(2.0, 4.0, 6.0));
        m *= 2.0;

        let result = decompose_slice(m.as_slice()).unwrap();

        assert!(approx_eq_vec(&result.translation, &Vector3::new(2.0, 4.0, 6.0), 1e-6));
        assert!(approx_eq_vec(&result.scale, &Vector3::repeat(1.0), 1e-6));
    }

    #[test]
    fn collapsed_axis_is_flagged_not_raised() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1e-9, 1.0));

        let result = decompose_slice(m.as_slice()).unwrap();

        assert_eq!(result.degeneracy, Some(Degeneracy::CollapsedAxis { axis: 1 }));
        assert_eq!(result.scale.y, SCALE_EPSILON);
        assert!(result.rotation.x.is_finite());
        assert!(result.rotation.y.is_finite());
        assert!(result.rotation.z.is_finite());
    }

    #[test]
    fn tiny_homogeneous_element_is_flagged_not_infinite() {
        let mut m = Matrix4::new_translation(&Vector3::new(1.0, 1.0, -50.0));
        m[(3, 3)] = 1e-37;

        let result = decompose_slice(m.as_slice()).unwrap();

        assert_eq!(result.degeneracy, Some(Degeneracy::NonFinite));
        assert!(result.translation.iter().all(|v| v.is_finite()));
        assert!(result.scale.iter().all(|s| *s > 0.0 && s.is_finite()));
    }

    #[test]
    fn overflowing_column_norm_is_flagged() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(3e38, 1.0, 1.0))
            + Matrix4::from_fn(|r, c| if r == 1 && c == 0 { 3e38 } else { 0.0 });

        let result = decompose_slice(m.as_slice()).unwrap();

        assert_eq!(result.degeneracy, Some(Degeneracy::NonFinite));
    }

    #[test]
    fn reflection_is_flagged() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));

        let result = decompose_slice(m.as_slice()).unwrap();

        assert_eq!(result.degeneracy, Some(Degeneracy::Reflection));
        assert!(result.scale.iter().all(|s| *s > 0.0));
    }
}
