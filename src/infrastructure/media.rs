use crate::config::AppConfig;
use crate::media::{FastStartRemuxer, FfmpegRemuxer, FfprobeProber, GeometryProber};
use std::sync::Arc;
use tracing::info;

pub fn setup_media_tools(
    config: &AppConfig,
) -> (Arc<dyn GeometryProber>, Arc<dyn FastStartRemuxer>) {
    info!(
        "🎞️  Media tools: probe={}, remux={}, timeout={:?}",
        config.ffprobe_path, config.ffmpeg_path, config.media_tool_timeout
    );

    let prober = FfprobeProber::new(config.ffprobe_path.clone(), config.media_tool_timeout);
    let remuxer = FfmpegRemuxer::new(config.ffmpeg_path.clone(), config.media_tool_timeout);

    (Arc::new(prober), Arc::new(remuxer))
}
