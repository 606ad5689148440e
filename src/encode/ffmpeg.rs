use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Settings for recording rendered frames to a video file.
pub struct EncoderSettings<'a> {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: &'a str,
    pub pix_fmt: &'a str,
    pub crf: u32,
}

pub struct FfmpegEncoder {
    child: Child,
    frames: u64,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, settings: &EncoderSettings<'_>) -> Result<Self> {
        let args = ffmpeg_args(output_path, settings);

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "Recording to {}: {}x{} @ {}fps, codec={}",
            output_path.display(),
            settings.width,
            settings.height,
            settings.fps,
            settings.codec
        );

        Ok(Self { child, frames: 0 })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        self.frames += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete ({} frames)", self.frames);
        Ok(())
    }
}

fn ffmpeg_args(output_path: &Path, settings: &EncoderSettings<'_>) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", settings.width, settings.height),
        "-framerate".into(), settings.fps.to_string(),
        "-i".into(), "pipe:0".into(),
        "-c:v".into(), settings.codec.to_string(),
        "-pix_fmt".into(), settings.pix_fmt.to_string(),
        "-crf".into(), settings.crf.to_string(),
        "-preset".into(), "medium".into(),
        output_path.to_string_lossy().into_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_raw_rgba_pipeline_args() {
        let settings = EncoderSettings {
            width: 320,
            height: 240,
            fps: 60,
            codec: "libx264",
            pix_fmt: "yuv420p",
            crf: 18,
        };
        let args = ffmpeg_args(Path::new("out.mp4"), &settings);
        let joined = args.join(" ");
        assert!(joined.contains("-video_size 320x240"));
        assert!(joined.contains("-framerate 60"));
        assert!(joined.contains("-crf 18"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }
}
