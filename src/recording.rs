use std::path::Path;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use ndarray_npy::{read_npy, write_npy, ReadNpyError, WriteNpyError};
use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::avatar::AvatarPose;
use crate::config::{MapperConfig, ReplayConfig};
use crate::face_transform::{decompose_slice, DecomposedTransform, TransformError};
use crate::frame_loop::{FrameLoop, FrameOutcome};

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("failed to read recording")]
    Read(#[from] ReadNpyError),
    #[error("failed to write poses")]
    Write(#[from] WriteNpyError),
    #[error("recording must have 16 or 17 columns, found {0}")]
    Shape(usize),
    #[error("frame {frame}: {source}")]
    Frame {
        frame: usize,
        #[source]
        source: TransformError,
    },
}

/// Recorded detector output: one column-major matrix per frame.
#[derive(Debug, Clone)]
pub struct Recording {
    pub timestamps_ms: Vec<u64>,
    pub matrices: Array2<f32>,
}

impl Recording {
    /// Accepts `N x 16` matrices, or `N x 17` with the timestamp in the first column.
    pub fn from_array(array: ArrayView2<f32>, frame_interval_ms: u64) -> Result<Self, RecordingError> {
        match array.ncols() {
            16 => Ok(Self {
                timestamps_ms: (0..array.nrows() as u64)
                    .map(|i| i * frame_interval_ms)
                    .collect(),
                matrices: array.to_owned(),
            }),
            17 => Ok(Self {
                timestamps_ms: array.column(0).iter().map(|t| t.max(0.0) as u64).collect(),
                matrices: array.slice(ndarray::s![.., 1..]).to_owned(),
            }),
            n => Err(RecordingError::Shape(n)),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, config: &ReplayConfig) -> Result<Self, RecordingError> {
        let array: Array2<f32> = read_npy(path)?;
        Self::from_array(array.view(), config.frame_interval_ms)
    }

    pub fn len(&self) -> usize {
        self.matrices.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.nrows() == 0
    }

    /// Decomposes every frame; frames are independent so this runs in parallel.
    pub fn decompose_all(&self) -> Result<Vec<DecomposedTransform>, RecordingError> {
        (0..self.len())
            .into_par_iter()
            .map(|frame| {
                let values = self.matrices.row(frame).to_vec();
                decompose_slice(&values).map_err(|source| RecordingError::Frame { frame, source })
            })
            .collect()
    }
}

/// Result of replaying a recording, one entry per input frame.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    pub poses: Vec<AvatarPose>,
    /// frames whose transform was unusable and kept the previous pose
    pub held: usize,
    /// frames whose timestamp did not advance and were dropped
    pub stale: usize,
}

impl Replay {
    /// `N x 8` rows of `[px, py, pz, qx, qy, qz, qw, scale]`.
    pub fn to_array(&self) -> Array2<f32> {
        let mut out = Array2::zeros((self.poses.len(), 8));
        for (mut row, pose) in out.axis_iter_mut(Axis(0)).zip(&self.poses) {
            let values = pose.to_array();
            row.assign(&ArrayView1::from(&values[..]));
        }
        out
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RecordingError> {
        write_npy(path, &self.to_array())?;
        Ok(())
    }
}

/// Runs a whole recording through a [`FrameLoop`], exactly as live frames would be.
///
/// Held and stale frames repeat the pose in place at that point; frames before
/// the first usable one produce the rest pose.
pub fn replay(recording: &Recording, config: &MapperConfig) -> Result<Replay, RecordingError> {
    let transforms = recording.decompose_all()?;

    let mut frames = FrameLoop::new(config.clone());
    let mut replay = Replay::default();

    for (timestamp_ms, transform) in recording.timestamps_ms.iter().zip(&transforms) {
        match frames.process_transform(*timestamp_ms, transform) {
            FrameOutcome::Updated(_) => {}
            FrameOutcome::Held(_) => replay.held += 1,
            FrameOutcome::Stale => replay.stale += 1,
        }
        replay
            .poses
            .push(frames.last_pose().copied().unwrap_or_default());
    }

    let span_ms = match (recording.timestamps_ms.first(), recording.timestamps_ms.last()) {
        (Some(first), Some(last)) => last.saturating_sub(*first),
        _ => 0,
    };
    info!(
        "replayed {} frames over {} ms ({} held, {} stale)",
        replay.poses.len(),
        span_ms,
        replay.held,
        replay.stale
    );

    Ok(replay)
}
