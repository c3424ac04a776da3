//! Render settings: JSON file plus command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use lumen_renderer::{CameraSettings, RenderConfig, Resolution};
use serde::Deserialize;

use crate::scenes::SceneKind;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "lumen", about = "Path trace a scene of spheres to an image")]
pub struct Args {
    /// JSON settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output image; `.png` writes PNG, anything else plain-text PPM
    #[arg(short, long, default_value = "image.ppm")]
    pub output: PathBuf,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Samples per pixel
    #[arg(long)]
    pub samples: Option<u32>,

    /// Maximum bounces per camera ray
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Worker threads (defaults to every core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Seed for reproducible renders
    #[arg(long)]
    pub seed: Option<u64>,

    /// Built-in scene
    #[arg(long, value_enum)]
    pub scene: Option<SceneKind>,
}

/// Everything needed to set up a render.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub image_width: u32,
    pub samples_per_pixel: u32,
    pub max_depth: u32,
    pub threads: Option<usize>,
    pub seed: Option<u64>,
    pub scene: SceneKind,
    pub camera: CameraSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_width: 2560,
            samples_per_pixel: 100,
            max_depth: 50,
            threads: None,
            seed: None,
            scene: SceneKind::Random,
            camera: CameraSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Resolve settings from the optional config file and flag overrides.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(args);
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that can't produce a finite image.
    fn validate(&self) -> Result<()> {
        let aspect_ratio = self.camera.aspect_ratio;
        ensure!(
            aspect_ratio.is_finite() && aspect_ratio > 0.0,
            "Invalid camera aspect ratio {}: must be a positive finite number",
            aspect_ratio
        );
        Ok(())
    }

    fn apply_overrides(&mut self, args: &Args) {
        if let Some(width) = args.width {
            self.image_width = width;
        }
        if let Some(samples) = args.samples {
            self.samples_per_pixel = samples;
        }
        if let Some(max_depth) = args.max_depth {
            self.max_depth = max_depth;
        }
        if args.threads.is_some() {
            self.threads = args.threads;
        }
        if args.seed.is_some() {
            self.seed = args.seed;
        }
        if let Some(scene) = args.scene {
            self.scene = scene;
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::from_aspect_ratio(self.image_width, self.camera.aspect_ratio)
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            samples_per_pixel: self.samples_per_pixel,
            max_depth: self.max_depth,
            threads: self.threads,
            seed: self.seed,
        }
    }
}
