use serde::{Deserialize, Serialize};

/// Fixed resolution for per-trade gain trajectories
pub const TRAJECTORY_BUCKETS: usize = 100;

/// Nearest-index resample: bucket k takes `trajectory[floor(k * len / 100)]`
pub fn resample(trajectory: &[f64]) -> Vec<f64> {
    if trajectory.is_empty() {
        return vec![0.0; TRAJECTORY_BUCKETS];
    }
    (0..TRAJECTORY_BUCKETS)
        .map(|k| trajectory[k * trajectory.len() / TRAJECTORY_BUCKETS])
        .collect()
}

/// Running mean of resampled trade trajectories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryAverage {
    pub mean: Vec<f64>,
    pub count: usize,
}

impl Default for TrajectoryAverage {
    fn default() -> Self {
        Self {
            mean: vec![0.0; TRAJECTORY_BUCKETS],
            count: 0,
        }
    }
}

impl TrajectoryAverage {
    pub fn add(&mut self, trajectory: &[f64]) {
        self.count += 1;
        let n = self.count as f64;
        for (avg, value) in self.mean.iter_mut().zip(resample(trajectory)) {
            *avg += (value - *avg) / n;
        }
    }
}
