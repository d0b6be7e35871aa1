//! External media tooling: geometry probing, aspect classification and
//! fast-start remuxing.
//!
//! `ffprobe` and `ffmpeg` sit behind [`GeometryProber`] and [`FastStartRemuxer`]
//! so the ingest pipeline can run against fakes in tests.

pub mod aspect;
pub mod probe;
pub mod remux;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

pub use aspect::{AspectClass, classify};
pub use probe::FfprobeProber;
pub use remux::{FfmpegRemuxer, remux_output_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTool {
    Ffprobe,
    Ffmpeg,
}

impl fmt::Display for MediaTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaTool::Ffprobe => f.write_str("ffprobe"),
            MediaTool::Ffmpeg => f.write_str("ffmpeg"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{tool} could not be started: {source}")]
    Spawn {
        tool: MediaTool,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {after:?}")]
    Timeout { tool: MediaTool, after: Duration },

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("video reports a height of 0 (width {width})")]
    DegenerateGeometry { width: u32 },

    #[error("remux failed: {0}")]
    Remux(String),
}

/// Pixel dimensions of the first video stream. Height is always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Result<Self, MediaError> {
        if height == 0 {
            return Err(MediaError::DegenerateGeometry { width });
        }
        Ok(Self { width, height })
    }

    pub fn aspect_class(&self) -> AspectClass {
        aspect::classify_ratio(self.width as f64 / self.height as f64)
    }
}

#[async_trait]
pub trait GeometryProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<Geometry, MediaError>;
}

#[async_trait]
pub trait FastStartRemuxer: Send + Sync {
    /// Writes a fast-start copy of `input` to [`remux_output_path`] and returns that path.
    async fn remux(&self, input: &Path) -> Result<PathBuf, MediaError>;
}

/// Runs a media tool to completion, killing it if it outlives `timeout`.
pub(crate) async fn run_tool(
    tool: MediaTool,
    mut command: Command,
    timeout: Duration,
) -> Result<Output, MediaError> {
    command
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(MediaError::Spawn { tool, source }),
        Err(_) => {
            tracing::warn!("⏱️  {} timed out after {:?}, killing process", tool, timeout);
            Err(MediaError::Timeout {
                tool,
                after: timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_rejects_zero_height() {
        let err = Geometry::new(1920, 0).unwrap_err();
        assert!(matches!(err, MediaError::DegenerateGeometry { width: 1920 }));
    }

    #[test]
    fn test_geometry_aspect_class() {
        let geometry = Geometry::new(1920, 1080).unwrap();
        assert_eq!(geometry.aspect_class(), AspectClass::Landscape);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_times_out() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let err = run_tool(MediaTool::Ffmpeg, command, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MediaError::Timeout {
                tool: MediaTool::Ffmpeg,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_run_tool_missing_binary() {
        let command = Command::new("definitely-not-a-media-tool");
        let err = run_tool(MediaTool::Ffprobe, command, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MediaError::Spawn {
                tool: MediaTool::Ffprobe,
                ..
            }
        ));
    }
}
