//! Writing capture results to disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureParameters;
use crate::sheet::{Frame, SpriteSheet};

pub const SHEET_FILE_NAME: &str = "sprite_sheet.png";
pub const METADATA_FILE_NAME: &str = "sprite_sheet.json";

/// Atlas description written next to the sheet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetMetadata {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub cols: u32,
    pub rows: u32,
    pub frame_size: u32,
    pub frames: Vec<FrameRect>,
    pub parameters: CaptureParameters,
    /// RFC 3339 time the file was written
    pub generated_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRect {
    pub index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub azimuth_deg: f32,
}

impl SheetMetadata {
    pub fn new(sheet: &SpriteSheet, frames: &[Frame], params: &CaptureParameters) -> Self {
        let layout = sheet.layout();
        Self {
            image: SHEET_FILE_NAME.to_string(),
            width: sheet.width(),
            height: sheet.height(),
            cols: layout.cols,
            rows: layout.rows,
            frame_size: layout.cell_size,
            frames: frames
                .iter()
                .enumerate()
                .map(|(slot, frame)| {
                    let (x, y) = layout.cell_offset(slot);
                    FrameRect {
                        index: frame.index(),
                        x,
                        y,
                        width: layout.cell_size,
                        height: layout.cell_size,
                        azimuth_deg: frame.azimuth_deg(),
                    }
                })
                .collect(),
            parameters: params.clone(),
            generated_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// File name of frame `index`, e.g. `frame_007.png`
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:03}.png", index)
}

/// Write the encoded sheet as `sprite_sheet.png` inside `dir`
pub fn save_sheet(sheet: &SpriteSheet, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(SHEET_FILE_NAME);
    fs::write(&path, sheet.png_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved sprite sheet to {}", path.display());
    Ok(path)
}

/// Write every frame as its own PNG inside `dir`
pub fn save_frames(frames: &[Frame], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let paths = frames
        .iter()
        .map(|frame| {
            let path = dir.join(frame_file_name(frame.index()));
            frame
                .image()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect::<Result<Vec<_>>>()?;
    info!("Saved {} frames to {}", paths.len(), dir.display());
    Ok(paths)
}

pub fn write_metadata(
    sheet: &SpriteSheet,
    frames: &[Frame],
    params: &CaptureParameters,
    dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(METADATA_FILE_NAME);
    let json = serde_json::to_string_pretty(&SheetMetadata::new(sheet, frames, params))?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
