pub mod decompose;
pub mod euler;

pub use decompose::{compose, decompose, decompose_slice, SCALE_EPSILON};
pub use euler::EulerZyx;

use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use thiserror::Error;

// projective terms in the last row above this (relative to w) are rejected
const PROJECTIVE_EPSILON: f32 = 1e-6;

/// Errors raised when the detector hands over data that does not describe a 4x4 matrix.
///
/// These indicate a contract mismatch between the detector and this crate and are
/// never swallowed. Numerically unstable but well-formed matrices are reported through
/// [`Degeneracy`] instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("expected 16 matrix elements, got {len}")]
    InvalidMatrixShape { len: usize },
    #[error("matrix element {index} is not usable ({value})")]
    InvalidMatrixValue { index: usize, value: f32 },
}

/// Why a decomposition could not produce a trustworthy pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// the column for this axis (0 = x, 1 = y, 2 = z) had near-zero length
    CollapsedAxis { axis: usize },
    /// the linear part flips handedness (negative scale)
    Reflection,
    /// normalizing by a tiny w, or a huge column, overflowed to infinity
    NonFinite,
}

/// A 4x4 homogeneous transform as emitted by the face landmark detector.
///
/// Elements are stored column-major: element `(row, col)` lives at index
/// `col * 4 + row` of the flattened array, so the translation occupies indices
/// 12, 13 and 14. This is the layout of the detector's facial transformation
/// matrix and of `nalgebra::Matrix4::from_column_slice`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMatrix {
    matrix: Matrix4<f32>,
}

impl AffineMatrix {
    /// Validates 16 column-major values.
    pub fn from_column_major(values: &[f32]) -> Result<Self, TransformError> {
        validate_elements(values)?;
        Self::checked(Matrix4::from_column_slice(values))
    }

    /// Validates 16 row-major values, for sources that flatten the other way round.
    pub fn from_row_major(values: &[f32]) -> Result<Self, TransformError> {
        validate_elements(values)?;
        Self::checked(Matrix4::from_row_slice(values))
    }

    pub fn from_matrix(matrix: Matrix4<f32>) -> Result<Self, TransformError> {
        Self::from_column_major(matrix.as_slice())
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.matrix
    }

    // last row must be (0, 0, 0, w) with w != 0; indices below are column-major
    fn checked(matrix: Matrix4<f32>) -> Result<Self, TransformError> {
        let w = matrix[(3, 3)];
        if w == 0.0 {
            return Err(TransformError::InvalidMatrixValue { index: 15, value: w });
        }

        for col in 0..3 {
            let value = matrix[(3, col)];
            if value.abs() > PROJECTIVE_EPSILON * w.abs() {
                return Err(TransformError::InvalidMatrixValue {
                    index: col * 4 + 3,
                    value,
                });
            }
        }

        Ok(Self { matrix })
    }

    /// Flattened back into the detector's column-major order.
    pub fn to_column_major(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.matrix.as_slice());
        out
    }
}

fn validate_elements(values: &[f32]) -> Result<(), TransformError> {
    if values.len() != 16 {
        return Err(TransformError::InvalidMatrixShape { len: values.len() });
    }

    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(TransformError::InvalidMatrixValue { index, value });
    }

    Ok(())
}

/// Translation, rotation and scale recovered from an [`AffineMatrix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedTransform {
    /// in the detector's model units (centimetres for the face landmarker)
    pub translation: Vector3<f32>,
    pub rotation: EulerZyx,
    /// strictly positive; clamped to [`SCALE_EPSILON`] on collapsed axes
    pub scale: Vector3<f32>,
    pub degeneracy: Option<Degeneracy>,
}

impl DecomposedTransform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: EulerZyx::default(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            degeneracy: None,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.degeneracy.is_some()
    }

    pub fn orientation(&self) -> UnitQuaternion<f32> {
        self.rotation.to_quaternion()
    }
}
