use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "shaderdeck",
    about = "Live-edit a WGSL shader and drive its `// @param` declarations"
)]
pub struct Cli {
    /// Shader source file (WGSL fragment shader defining `fs_main`)
    pub shader: PathBuf,

    /// Render width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Render height in pixels
    #[arg(long, default_value_t = 768)]
    pub height: u32,

    /// Fixed timestep rate (frames per second)
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Stop after this many frames
    #[arg(long)]
    pub frames: Option<u64>,

    /// Record rendered frames to a video file (requires --frames)
    #[arg(short, long, requires = "frames")]
    pub output: Option<PathBuf>,

    /// H.264 CRF quality for recording (0-51, lower = better)
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Initial parameter value, e.g. `--set speed=2` or `--set tint=#ff8800`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub overrides: Vec<String>,

    /// Initial vertex attribute buffer (four comma-separated floats)
    #[arg(long, value_delimiter = ',')]
    pub attributes: Option<Vec<f32>>,

    /// Quiet period after a file change before reloading, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub debounce_ms: u64,

    /// Parse the shader's parameters, print them and exit
    #[arg(long)]
    pub list_params: bool,

    /// Print the parameter listing as JSON
    #[arg(long, requires = "list_params")]
    pub json: bool,

    /// Config file (defaults to ./shaderdeck.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["shaderdeck", "toy.wgsl"]).unwrap();
        assert_eq!(cli.shader, PathBuf::from("toy.wgsl"));
        assert_eq!(cli.fps, 60);
        assert!(cli.frames.is_none());
        assert!(cli.overrides.is_empty());
    }

    #[test]
    fn shader_path_is_required() {
        assert!(Cli::try_parse_from(["shaderdeck"]).is_err());
    }

    #[test]
    fn output_requires_frame_count() {
        assert!(Cli::try_parse_from(["shaderdeck", "toy.wgsl", "-o", "out.mp4"]).is_err());
        let cli = Cli::try_parse_from(["shaderdeck", "toy.wgsl", "-o", "out.mp4", "--frames", "120"])
            .unwrap();
        assert_eq!(cli.frames, Some(120));
    }

    #[test]
    fn collects_overrides_and_attributes() {
        let cli = Cli::try_parse_from([
            "shaderdeck",
            "toy.wgsl",
            "--set",
            "speed=2",
            "--set",
            "tint=#ff8800",
            "--attributes",
            "1,0.5,0,1",
        ])
        .unwrap();
        assert_eq!(cli.overrides, vec!["speed=2", "tint=#ff8800"]);
        assert_eq!(cli.attributes, Some(vec![1.0, 0.5, 0.0, 1.0]));
    }
}
