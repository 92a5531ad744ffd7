pub mod avatar;
pub mod config;
pub mod face_transform;
pub mod frame_loop;
pub mod protocol;
pub mod recording;
pub mod server;
pub mod utils;

pub use avatar::{AvatarPose, AvatarPoseMapper, AvatarRig, SmoothingFactor};
pub use face_transform::{decompose, decompose_slice, AffineMatrix, DecomposedTransform, TransformError};
pub use frame_loop::{FaceDetection, FrameLoop, FrameOutcome};
