//! JSON configuration and report helpers for the pipelines.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    run_forest_regions, run_road_axis, run_road_mask, ForestParams, PipelineError, RoadAxisParams,
    RoadMaskParams, RunSummary,
};

#[derive(thiserror::Error, Debug)]
pub enum GeofeatIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Which pipeline a config runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    RoadMask,
    Forest,
    RoadAxis,
}

impl Task {
    pub fn as_str(self) -> &'static str {
        match self {
            Task::RoadMask => "road_mask",
            Task::Forest => "forest",
            Task::RoadAxis => "road_axis",
        }
    }

    fn default_output(self) -> &'static str {
        match self {
            Task::RoadMask => "road_mask.bmp",
            Task::Forest => "forest_regions.bmp",
            Task::RoadAxis => "road_axis.bmp",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pipeline invocation.
///
/// For [`Task::Forest`], `input_path` is the image to annotate and `mask_path`
/// is the road mask produced by [`Task::RoadMask`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub task: Task,
    pub input_path: String,
    #[serde(default)]
    pub mask_path: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
    #[serde(default)]
    pub road_mask: RoadMaskParams,
    #[serde(default)]
    pub forest: ForestParams,
    #[serde(default)]
    pub road_axis: RoadAxisParams,
}

impl PipelineConfig {
    /// Config for `task` with default parameters and no optional paths.
    pub fn new(task: Task, input_path: impl Into<String>) -> Self {
        Self {
            task,
            input_path: input_path.into(),
            mask_path: None,
            output_path: None,
            report_path: None,
            road_mask: RoadMaskParams::default(),
            forest: ForestParams::default(),
            road_axis: RoadAxisParams::default(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, GeofeatIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), GeofeatIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output bitmap path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(self.task.default_output()))
    }

    /// Run the configured pipeline and save its output bitmap.
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let output = self.output_path();
        match self.task {
            Task::RoadMask => run_road_mask(&self.input_path, &output, &self.road_mask),
            Task::Forest => {
                let mask = self.mask_path.as_ref().ok_or(PipelineError::MissingPath {
                    task: Task::Forest.as_str(),
                    field: "mask_path",
                })?;
                run_forest_regions(mask, &self.input_path, &output, &self.forest)
            }
            Task::RoadAxis => run_road_axis(&self.input_path, &output, &self.road_axis),
        }
    }
}

/// Machine-readable outcome of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub task: Task,
    pub input_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_path: Option<String>,
    pub output_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineReport {
    /// Report skeleton for `config`, before anything has run.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            task: config.task,
            input_path: config.input_path.clone(),
            mask_path: config.mask_path.clone(),
            output_path: config.output_path().to_string_lossy().into_owned(),
            summary: None,
            error: None,
        }
    }

    /// Fill in the summary or the error message of a finished run.
    pub fn with_outcome(mut self, outcome: &Result<RunSummary, PipelineError>) -> Self {
        match outcome {
            Ok(summary) => self.summary = Some(summary.clone()),
            Err(err) => self.error = Some(err.to_string()),
        }
        self
    }

    /// Load a JSON report from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, GeofeatIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), GeofeatIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
