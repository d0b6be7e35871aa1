use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::{FastStartRemuxer, MediaError, MediaTool, run_tool};

const OUTPUT_SUFFIX: &str = ".processing";

/// Where the fast-start copy of `input` is written.
pub fn remux_output_path(input: &Path) -> PathBuf {
    let mut path = OsString::from(input.as_os_str());
    path.push(OUTPUT_SUFFIX);
    PathBuf::from(path)
}

pub struct FfmpegRemuxer {
    binary: String,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl FastStartRemuxer for FfmpegRemuxer {
    #[tracing::instrument(skip(self), fields(tool = %self.binary))]
    async fn remux(&self, input: &Path) -> Result<PathBuf, MediaError> {
        let output_path = remux_output_path(input);

        let mut command = Command::new(&self.binary);
        command
            .args(["-nostdin", "-v", "error", "-y", "-i"])
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(&output_path);

        let output = run_tool(MediaTool::Ffmpeg, command, self.timeout).await?;

        if !output.status.success() {
            tracing::debug!(
                "ffmpeg stderr: {}",
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(MediaError::Remux(format!(
                "ffmpeg exited with {}",
                output.status
            )));
        }

        Ok(output_path)
    }
}
