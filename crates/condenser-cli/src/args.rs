//! Command-line arguments and config layering.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use condenser_engine::EngineConfig;
use condenser_models::VideoProps;

#[derive(Debug, Clone, Parser)]
#[command(name = "condenser", version)]
#[command(about = "Detect roundnet serves and rallies in pose observation streams", long_about = None)]
pub struct Args {
    /// Frame observation files (JSON Lines, one processed frame per line)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Court zones JSON file
    #[arg(short, long, default_value = "court_zones.json")]
    pub zones: PathBuf,

    /// Source video frame rate
    #[arg(long)]
    pub fps: f64,

    /// Source video width in pixels
    #[arg(long)]
    pub width: u32,

    /// Source video height in pixels
    #[arg(long)]
    pub height: u32,

    /// Source video frame count (for the report duration)
    #[arg(long)]
    pub frame_count: Option<u64>,

    /// Output file; a directory when several inputs are given
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Engine config JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fast mode (skip 4 frames between processed frames)
    #[arg(long)]
    pub fast: bool,

    /// Frames to skip between processed frames
    #[arg(long)]
    pub skip: Option<u32>,

    /// Inference width in pixels
    #[arg(long)]
    pub process_width: Option<u32>,

    /// Seconds before the serve to include
    #[arg(long, allow_negative_numbers = true)]
    pub pre_buffer: Option<f64>,

    /// Seconds after the point to include (negative trims)
    #[arg(long, allow_negative_numbers = true)]
    pub post_buffer: Option<f64>,

    /// Minimum occupied zones to detect a serve
    #[arg(long)]
    pub min_zones: Option<usize>,

    /// Debug logging
    #[arg(long)]
    pub debug: bool,

    /// Print nothing but errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Defaults, then config file, then `CONDENSER_*` env, then flags.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if self.fast {
            config = config.with_skip_frames(EngineConfig::fast().skip_frames);
        }
        config = config.with_env_overrides();

        if let Some(skip) = self.skip {
            config = config.with_skip_frames(skip);
        }
        if let Some(width) = self.process_width {
            config = config.with_process_width(width);
        }
        if let Some(secs) = self.pre_buffer {
            config = config.with_pre_serve_buffer(secs);
        }
        if let Some(secs) = self.post_buffer {
            config = config.with_post_point_buffer(secs);
        }
        if let Some(zones) = self.min_zones {
            config = config.with_min_occupied_zones(zones);
        }

        config.validate().context("Invalid engine configuration")?;
        Ok(config)
    }

    pub fn video_props(&self) -> VideoProps {
        let video = VideoProps::new(self.fps, self.width, self.height);
        match self.frame_count {
            Some(n) => video.with_frame_count(n),
            None => video,
        }
    }

    /// Report path for `input`.
    ///
    /// A single input writes to `--output` (default `clips.json`). Several
    /// inputs write `<stem>.clips.json` into `--output` or next to the input.
    pub fn output_for(&self, input: &Path) -> PathBuf {
        if self.inputs.len() == 1 {
            return self
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from("clips.json"));
        }

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clips".to_string());
        let name = format!("{}.clips.json", stem);
        match &self.output {
            Some(dir) => dir.join(name),
            None => input.with_file_name(name),
        }
    }
}
