//! Grid layout and composition of captured frames into one image.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use log::debug;

use crate::error::SheetError;

/// Largest sheet edge the compositor will allocate
pub const MAX_SHEET_DIMENSION: u64 = 32_768;

/// One captured view of the model
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    index: usize,
    azimuth_deg: f32,
    image: RgbaImage,
}

impl Frame {
    pub fn new(index: usize, azimuth_deg: f32, image: RgbaImage) -> Self {
        Self {
            index,
            azimuth_deg,
            image,
        }
    }

    /// Position in the capture sequence
    pub fn index(&self) -> usize {
        self.index
    }

    /// Camera azimuth the frame was rendered from
    pub fn azimuth_deg(&self) -> f32 {
        self.azimuth_deg
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Near-square grid of equally sized cells, filled row-major
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SheetLayout {
    pub cols: u32,
    pub rows: u32,
    pub cell_size: u32,
}

impl SheetLayout {
    pub fn for_steps(steps: u32, cell_size: u32) -> Self {
        let cols = (steps as f64).sqrt().ceil().max(1.0) as u32;
        let rows = steps.div_ceil(cols).max(1);
        Self {
            cols,
            rows,
            cell_size,
        }
    }

    /// Top-left pixel of the cell holding frame `index`
    pub fn cell_offset(&self, index: usize) -> (u32, u32) {
        let index = index as u32;
        (
            (index % self.cols) * self.cell_size,
            (index / self.cols) * self.cell_size,
        )
    }

    pub fn width(&self) -> u32 {
        self.cols * self.cell_size
    }

    pub fn height(&self) -> u32 {
        self.rows * self.cell_size
    }

    /// True when both sheet edges stay within [`MAX_SHEET_DIMENSION`]
    pub fn fits(&self) -> bool {
        let size = self.cell_size as u64;
        self.cols as u64 * size <= MAX_SHEET_DIMENSION
            && self.rows as u64 * size <= MAX_SHEET_DIMENSION
    }
}

/// Composited sheet together with its PNG encoding
#[derive(Clone, Debug)]
pub struct SpriteSheet {
    image: RgbaImage,
    layout: SheetLayout,
    png: Vec<u8>,
}

impl SpriteSheet {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn layout(&self) -> SheetLayout {
        self.layout
    }

    /// Encoded PNG, ready to be written or downloaded
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Blit `frames` unscaled onto a transparent grid and encode it as PNG
pub fn compose(frames: &[Frame], resolution: u32) -> Result<SpriteSheet, SheetError> {
    if frames.is_empty() {
        return Err(SheetError::NoFrames);
    }

    let layout = SheetLayout::for_steps(frames.len() as u32, resolution);
    if !layout.fits() {
        return Err(SheetError::TooLarge {
            cols: layout.cols,
            rows: layout.rows,
            resolution,
        });
    }

    let mut image = RgbaImage::new(layout.width(), layout.height());
    for (slot, frame) in frames.iter().enumerate() {
        let (width, height) = frame.image.dimensions();
        if width != resolution || height != resolution {
            return Err(SheetError::FrameSize {
                index: frame.index,
                width,
                height,
                resolution,
            });
        }
        let (x, y) = layout.cell_offset(slot);
        image::imageops::replace(&mut image, &frame.image, x as i64, y as i64);
    }

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    debug!(
        "Composed {}x{} sheet ({} cols x {} rows, {} bytes)",
        layout.width(),
        layout.height(),
        layout.cols,
        layout.rows,
        png.len()
    );

    Ok(SpriteSheet { image, layout, png })
}
