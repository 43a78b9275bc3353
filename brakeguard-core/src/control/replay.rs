//! Deployment Schedule Replay
//!
//! Replays a pre-recorded `(time, deployment)` schedule instead of
//! closing the loop. Used to reproduce a previous flight's actuation for
//! drag characterization, or to fly an open-loop profile computed on the
//! ground. Times are relative to liftoff; between samples the deployment
//! is linearly interpolated, and outside the recorded range the nearest
//! end value is held.
//!
//! A missing or malformed schedule is fatal at startup: silently flying
//! open-loop with no profile is worse than scrubbing the feature.

use std::fs;
use std::path::Path;

use crate::control::ControlInput;
use crate::errors::ConfigError;

/// An ordered `(time, deployment)` profile.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSchedule {
    points: Vec<(f32, f32)>,
}

impl DeploymentSchedule {
    /// Builds a schedule from `(seconds since liftoff, deployment)`
    /// pairs. Points are sorted by time; an empty list is rejected.
    pub fn from_points(mut points: Vec<(f32, f32)>) -> Result<Self, ConfigError> {
        if points.is_empty() {
            return Err(ConfigError::ScheduleEmpty);
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { points })
    }

    /// Loads a schedule from a CSV file with `time` and `deployment`
    /// columns. `time_unit` must be one of `us`, `ms`, `s`.
    pub fn load_csv(path: &Path, time_unit: &str) -> Result<Self, ConfigError> {
        let scale = match time_unit {
            "us" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            other => return Err(ConfigError::ScheduleTimeUnit(other.to_string())),
        };

        let contents = fs::read_to_string(path)
            .map_err(|_| ConfigError::ScheduleNotFound(path.display().to_string()))?;
        let mut lines = contents.lines().enumerate();

        let (_, header) = lines
            .next()
            .ok_or(ConfigError::ScheduleEmpty)?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let time_col = columns
            .iter()
            .position(|c| *c == "time")
            .ok_or_else(|| ConfigError::ScheduleColumn("time".to_string()))?;
        let deploy_col = columns
            .iter()
            .position(|c| *c == "deployment")
            .ok_or_else(|| ConfigError::ScheduleColumn("deployment".to_string()))?;

        let mut points = Vec::new();
        for (index, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let parse = |col: usize| -> Result<f32, ConfigError> {
                fields
                    .get(col)
                    .and_then(|f| f.parse::<f32>().ok())
                    .ok_or(ConfigError::ScheduleParse(index + 1))
            };
            points.push((parse(time_col)? * scale, parse(deploy_col)?));
        }
        Self::from_points(points)
    }

    /// Deployment at `time` seconds since liftoff.
    pub fn sample(&self, time: f32) -> f32 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if time <= first.0 {
            return first.1;
        }
        if time >= last.0 {
            return last.1;
        }
        // Bounded by the checks above, a successor always exists.
        let upper = self
            .points
            .partition_point(|&(t, _)| t <= time);
        let (t0, d0) = self.points[upper - 1];
        let (t1, d1) = self.points[upper];
        let span = t1 - t0;
        if span <= 0.0 {
            return d0;
        }
        d0 + (d1 - d0) * (time - t0) / span
    }
}

/// Controller that plays back a [`DeploymentSchedule`].
#[derive(Debug, Clone)]
pub struct ScheduleReplayController {
    schedule: DeploymentSchedule,
}

impl ScheduleReplayController {
    /// Wraps a validated schedule.
    pub fn new(schedule: DeploymentSchedule) -> Self {
        Self { schedule }
    }

    /// Deployment for this tick, sampled at time since liftoff.
    pub fn compute(&mut self, input: &ControlInput) -> f32 {
        self.schedule.sample(input.time_since_liftoff).clamp(0.0, 1.0)
    }
}
