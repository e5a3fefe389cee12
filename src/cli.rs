// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::capture::CaptureParameters;
use crate::math::Rgb;
use crate::style::StyleSettings;

/// Frame sizes offered to users
pub const RESOLUTION_CHOICES: [u32; 5] = [64, 128, 256, 512, 1024];

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// CPU rasterizer, works without a graphics device
    Software,
    /// Headless wgpu device
    Gpu,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "spritegen")]
#[command(about = "Render a 3D model from evenly spaced angles into a sprite sheet", long_about = None)]
pub struct Cli {
    /// Model file to capture (.glb or .gltf)
    #[arg(required_unless_present = "cube", conflicts_with = "cube")]
    pub model: Option<PathBuf>,

    /// Capture a built-in cube instead of a model file
    #[arg(long)]
    pub cube: bool,

    /// Directory the sheet and optional extras are written to
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Load capture parameters from a JSON file; flags below are then ignored
    #[arg(long, value_name = "JSON")]
    pub params: Option<PathBuf>,

    #[arg(short, long, default_value_t = 256, value_parser = parse_resolution)]
    pub resolution: u32,

    #[arg(short, long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    pub steps: u32,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub initial_angle: f32,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub vertical_angle: f32,

    /// Distance of the preview camera
    #[arg(long, default_value_t = 5.0)]
    pub camera_distance: f32,

    /// Frame fill in percent, 80 is the reference framing
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u32).range(1..=200))]
    pub fill: u32,

    /// Model scale applied during normalization
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    #[arg(long)]
    pub outline: bool,

    #[arg(long, default_value_t = 1.0)]
    pub outline_thickness: f32,

    /// Outline color as hex, e.g. "#000000"
    #[arg(long, default_value = "#000000", value_parser = parse_color)]
    pub outline_color: Rgb,

    #[arg(long)]
    pub cel_shading: bool,

    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(2..))]
    pub shading_levels: u32,

    #[arg(long, value_enum, default_value_t = Backend::Software)]
    pub backend: Backend,

    /// Also write each frame as its own PNG
    #[arg(long)]
    pub frames: bool,

    /// Also write sprite_sheet.json describing the frame rectangles
    #[arg(long)]
    pub metadata: bool,
}

impl Cli {
    pub fn style(&self) -> Option<StyleSettings> {
        if !self.outline && !self.cel_shading {
            return None;
        }
        Some(StyleSettings {
            outline_enabled: self.outline,
            outline_thickness: self.outline_thickness,
            outline_color: self.outline_color,
            cell_shading_enabled: self.cel_shading,
            shading_levels: self.shading_levels,
        })
    }

    /// Parameters from `--params` when given, otherwise from the flags
    pub fn capture_parameters(&self) -> Result<CaptureParameters> {
        if let Some(path) = &self.params {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read parameters from {}", path.display()))?;
            return serde_json::from_str(&json)
                .with_context(|| format!("Invalid parameters in {}", path.display()));
        }

        Ok(CaptureParameters {
            resolution: self.resolution,
            steps: self.steps,
            initial_angle_deg: self.initial_angle,
            vertical_angle_deg: self.vertical_angle,
            camera_distance: self.camera_distance,
            frame_fill_percent: self.fill,
            style: self.style(),
        })
    }
}

fn parse_resolution(value: &str) -> std::result::Result<u32, String> {
    let resolution: u32 = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    if RESOLUTION_CHOICES.contains(&resolution) {
        Ok(resolution)
    } else {
        Err(format!("resolution must be one of {:?}", RESOLUTION_CHOICES))
    }
}

fn parse_color(value: &str) -> std::result::Result<Rgb, String> {
    Rgb::parse_hex(value).ok_or_else(|| format!("'{}' is not a hex color", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_capture_defaults() {
        let cli = Cli::try_parse_from(["spritegen", "--cube"]).unwrap();
        assert_eq!(cli.capture_parameters().unwrap(), CaptureParameters::default());
        assert_eq!(cli.backend, Backend::Software);
    }

    #[test]
    fn test_resolution_restricted_to_choices() {
        assert!(Cli::try_parse_from(["spritegen", "--cube", "-r", "128"]).is_ok());
        assert!(Cli::try_parse_from(["spritegen", "--cube", "-r", "100"]).is_err());
    }

    #[test]
    fn test_model_or_cube_required() {
        assert!(Cli::try_parse_from(["spritegen"]).is_err());
        assert!(Cli::try_parse_from(["spritegen", "robot.glb", "--cube"]).is_err());
    }

    #[test]
    fn test_style_flags() {
        let cli = Cli::try_parse_from([
            "spritegen",
            "robot.glb",
            "--outline",
            "--outline-color",
            "#ff0000",
            "--cel-shading",
            "--shading-levels",
            "4",
        ])
        .unwrap();
        let style = cli.style().unwrap();
        assert!(style.outline_enabled && style.cell_shading_enabled);
        assert_eq!(style.outline_color, Rgb::RED);
        assert_eq!(style.shading_levels, 4);
    }

    #[test]
    fn test_negative_vertical_angle() {
        let cli = Cli::try_parse_from(["spritegen", "--cube", "--vertical-angle", "-30"]).unwrap();
        assert_eq!(cli.vertical_angle, -30.0);
    }
}
