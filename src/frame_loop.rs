use tracing::{debug, warn};

use crate::avatar::{AvatarPose, AvatarPoseMapper, AvatarRig, SceneGraph, SmoothingFactor};
use crate::config::MapperConfig;
use crate::face_transform::{decompose_slice, DecomposedTransform, TransformError};
use crate::utils::TimeSeries;

// accepted frame timestamps kept for the fps estimate
const FPS_WINDOW: usize = 10;

/// One result from the face landmark detector.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    /// monotonically increasing, milliseconds
    pub timestamp_ms: u64,
    /// facial transformation matrix, 16 column-major values
    pub transform: Vec<f32>,
}

impl FaceDetection {
    pub fn new(timestamp_ms: u64, transform: Vec<f32>) -> Self {
        Self {
            timestamp_ms,
            transform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// a new pose was computed
    Updated(AvatarPose),
    /// the geometry was unusable; the last good pose (if any) stays in place
    Held(Option<AvatarPose>),
    /// the timestamp did not advance, the frame was ignored
    Stale,
}

impl FrameOutcome {
    /// The pose the avatar should show after this frame.
    pub fn pose(&self) -> Option<AvatarPose> {
        match self {
            FrameOutcome::Updated(pose) => Some(*pose),
            FrameOutcome::Held(pose) => *pose,
            FrameOutcome::Stale => None,
        }
    }
}

/// Per-session driver: everything that survives from one frame to the next lives here.
#[derive(Debug, Clone)]
pub struct FrameLoop {
    mapper: AvatarPoseMapper,
    mirror: bool,
    smoothing: SmoothingFactor,
    last_pose: Option<AvatarPose>,
    // accepted frames, also the reference for stale timestamps
    frame_times: TimeSeries,
}

impl FrameLoop {
    pub fn new(config: MapperConfig) -> Self {
        Self {
            mirror: config.mirror,
            smoothing: SmoothingFactor::new(config.smoothing),
            mapper: AvatarPoseMapper::new(config),
            last_pose: None,
            frame_times: TimeSeries::new(FPS_WINDOW),
        }
    }

    pub fn process(&mut self, detection: &FaceDetection) -> Result<FrameOutcome, TransformError> {
        if self.is_stale(detection.timestamp_ms) {
            return Ok(FrameOutcome::Stale);
        }

        let transform = decompose_slice(&detection.transform)?;
        Ok(self.advance(detection.timestamp_ms, &transform))
    }

    /// Same as [`process`](Self::process) for a transform that was already decomposed.
    pub fn process_transform(
        &mut self,
        timestamp_ms: u64,
        transform: &DecomposedTransform,
    ) -> FrameOutcome {
        if self.is_stale(timestamp_ms) {
            return FrameOutcome::Stale;
        }
        self.advance(timestamp_ms, transform)
    }

    /// Processes a detection and pushes any new pose into the scene.
    pub fn drive<S: SceneGraph + ?Sized>(
        &mut self,
        detection: &FaceDetection,
        rig: &AvatarRig,
        scene: &mut S,
    ) -> Result<FrameOutcome, TransformError> {
        let outcome = self.process(detection)?;
        if let FrameOutcome::Updated(pose) = &outcome {
            rig.apply(pose, scene);
        }
        Ok(outcome)
    }

    pub fn last_pose(&self) -> Option<&AvatarPose> {
        self.last_pose.as_ref()
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.mirror = mirror;
    }

    pub fn set_smoothing(&mut self, smoothing: SmoothingFactor) {
        self.smoothing = smoothing;
    }

    /// Detection rate over the last few frames.
    pub fn fps(&self) -> Option<f32> {
        self.frame_times.get_rate()
    }

    /// Forgets the pose and timestamps, e.g. when the camera restarts.
    pub fn reset(&mut self) {
        self.last_pose = None;
        self.frame_times.clear();
    }

    fn is_stale(&self, timestamp_ms: u64) -> bool {
        match self.frame_times.last_timestamp() {
            Some(last) if timestamp_ms <= last => {
                warn!(
                    "dropping frame at {} ms, last processed frame was at {} ms",
                    timestamp_ms, last
                );
                true
            }
            _ => false,
        }
    }

    fn advance(&mut self, timestamp_ms: u64, transform: &DecomposedTransform) -> FrameOutcome {
        self.frame_times.push(timestamp_ms);

        match self.mapper.target(transform, self.mirror) {
            Some(raw) => {
                let pose =
                    AvatarPoseMapper::smooth(self.last_pose.as_ref(), &raw, self.smoothing);
                self.last_pose = Some(pose);
                FrameOutcome::Updated(pose)
            }
            None => {
                debug!(
                    "holding pose at {} ms: unusable transform ({:?})",
                    timestamp_ms, transform.degeneracy
                );
                FrameOutcome::Held(self.last_pose)
            }
        }
    }
}
