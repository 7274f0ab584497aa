//! Packing trajectory features into the encoder's fixed-shape buffers

use crate::trajectory::TrajectoryFeatures;
use crate::{MAX_SEQ_LEN, TRAJECTORY_FEATURES};

/// The three encoder input buffers, in the exact layout the model expects.
///
/// `trajectory` is `[1, 150, 6]` row-major with per-step
/// `(x, y, vx, vy, ax, ay)`; the scalar velocity and acceleration magnitudes
/// are duplicated into both axis slots, matching the layout the model was
/// trained with. `src_mask` is true exactly where the step index is at or
/// beyond the real sample count.
#[derive(Debug, Clone)]
pub struct EncoderTensors {
    pub trajectory: Vec<f32>,
    pub nearest_keys: Vec<i64>,
    pub src_mask: Vec<bool>,
}

/// Builds [`EncoderTensors`] from [`TrajectoryFeatures`].
#[derive(Debug, Clone, Default)]
pub struct FeatureTensorBuilder;

impl FeatureTensorBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, features: &TrajectoryFeatures) -> EncoderTensors {
        let mut trajectory = Vec::with_capacity(MAX_SEQ_LEN * TRAJECTORY_FEATURES);
        for i in 0..MAX_SEQ_LEN {
            let v = features.velocities[i];
            let a = features.accelerations[i];
            trajectory.push(features.xs[i]);
            trajectory.push(features.ys[i]);
            trajectory.push(v);
            trajectory.push(v);
            trajectory.push(a);
            trajectory.push(a);
        }

        let mut src_mask = Vec::with_capacity(MAX_SEQ_LEN);
        for i in 0..MAX_SEQ_LEN {
            src_mask.push(i >= features.actual_length);
        }

        EncoderTensors {
            trajectory,
            nearest_keys: features.nearest_keys.clone(),
            src_mask,
        }
    }
}
