use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use super::{Geometry, GeometryProber, MediaError, MediaTool, run_tool};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Extracts the geometry of the first video stream from `ffprobe -print_format json` output.
pub fn parse_probe_output(stdout: &[u8]) -> Result<Geometry, MediaError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::Probe(format!("malformed ffprobe output: {}", e)))?;

    if output.streams.is_empty() {
        return Err(MediaError::Probe("file contains no media streams".to_string()));
    }

    let stream = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::Probe("file contains no video stream".to_string()))?;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) => Geometry::new(width, height),
        _ => Err(MediaError::Probe(
            "video stream is missing width or height".to_string(),
        )),
    }
}

pub struct FfprobeProber {
    binary: String,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl GeometryProber for FfprobeProber {
    #[tracing::instrument(skip(self), fields(tool = %self.binary))]
    async fn probe(&self, path: &Path) -> Result<Geometry, MediaError> {
        let mut command = Command::new(&self.binary);
        command
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path);

        let output = run_tool(MediaTool::Ffprobe, command, self.timeout).await?;

        if !output.status.success() {
            tracing::debug!(
                "ffprobe stderr: {}",
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(MediaError::Probe(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }

        let geometry = parse_probe_output(&output.stdout)?;
        tracing::debug!("Probed {}x{}", geometry.width, geometry.height);
        Ok(geometry)
    }
}
