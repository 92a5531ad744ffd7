//! Fixed-size messages exchanged with the pose server.
//!
//! Both messages are plain `#[repr(C)]` structs sent as raw bytes in native byte
//! order, so client and server are expected to run on the same machine.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::avatar::AvatarPose;
use crate::frame_loop::{FaceDetection, FrameOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("expected a {expected} byte message, got {actual} bytes")]
    WrongLength { expected: usize, actual: usize },
}

/// Detector -> server: one facial transformation matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameRequest {
    pub timestamp_ms: u64,
    /// column-major
    pub matrix: [f32; 16],
}

impl FrameRequest {
    pub fn new(timestamp_ms: u64, matrix: [f32; 16]) -> Self {
        Self {
            timestamp_ms,
            matrix,
        }
    }

    pub fn to_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        read_pod(bytes)
    }

    pub fn to_detection(&self) -> FaceDetection {
        FaceDetection::new(self.timestamp_ms, self.matrix.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Updated,
    Held,
    Stale,
    Rejected,
}

impl ReplyStatus {
    fn code(self) -> u32 {
        match self {
            ReplyStatus::Updated => 0,
            ReplyStatus::Held => 1,
            ReplyStatus::Stale => 2,
            ReplyStatus::Rejected => 3,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(ReplyStatus::Updated),
            1 => Some(ReplyStatus::Held),
            2 => Some(ReplyStatus::Stale),
            3 => Some(ReplyStatus::Rejected),
            _ => None,
        }
    }
}

/// Server -> detector: the pose to show after the request was processed.
///
/// For `Held` replies without a previous pose, and for `Stale` and `Rejected`
/// replies, the pose fields hold the rest pose.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PoseReply {
    pub status: u32,
    pub position: [f32; 3],
    /// x, y, z, w
    pub orientation: [f32; 4],
    pub scale: f32,
}

impl PoseReply {
    pub fn new(status: ReplyStatus, pose: &AvatarPose) -> Self {
        let [px, py, pz, qx, qy, qz, qw, scale] = pose.to_array();
        Self {
            status: status.code(),
            position: [px, py, pz],
            orientation: [qx, qy, qz, qw],
            scale,
        }
    }

    pub fn from_outcome(outcome: &FrameOutcome) -> Self {
        let status = match outcome {
            FrameOutcome::Updated(_) => ReplyStatus::Updated,
            FrameOutcome::Held(_) => ReplyStatus::Held,
            FrameOutcome::Stale => ReplyStatus::Stale,
        };
        Self::new(status, &outcome.pose().unwrap_or_default())
    }

    pub fn rejected() -> Self {
        Self::new(ReplyStatus::Rejected, &AvatarPose::default())
    }

    /// `None` for codes this version does not know.
    pub fn status(&self) -> Option<ReplyStatus> {
        ReplyStatus::from_code(self.status)
    }

    pub fn to_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        read_pod(bytes)
    }
}

fn read_pod<T: Pod>(bytes: &[u8]) -> Result<T, ProtocolError> {
    // network buffers carry no alignment guarantee
    bytemuck::try_pod_read_unaligned(bytes).map_err(|_| ProtocolError::WrongLength {
        expected: std::mem::size_of::<T>(),
        actual: bytes.len(),
    })
}
