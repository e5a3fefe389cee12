//! Stylization passes applied to a model before capture.
//!
//! Both passes work on any [`SceneObject`]: the live preview object, or the
//! clone a capture run renders from.

mod cel;
mod outline;

use serde::{Deserialize, Serialize};

pub use cel::{apply_cel_shading, remove_cel_shading, toon_material};
pub use outline::{apply_outline, outline_count, remove_outline, OUTLINE_SCALE_PER_THICKNESS};

use crate::math::Rgb;
use crate::scene::SceneObject;

/// User-facing toggles for the outline and cel-shading passes
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub outline_enabled: bool,
    pub outline_thickness: f32,
    pub outline_color: Rgb,
    pub cell_shading_enabled: bool,
    pub shading_levels: u32,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            outline_enabled: false,
            outline_thickness: 1.0,
            outline_color: Rgb::BLACK,
            cell_shading_enabled: false,
            shading_levels: 3,
        }
    }
}

impl StyleSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.outline_thickness.is_finite() || self.outline_thickness < 0.0 {
            return Err(format!(
                "outline thickness must be a finite value >= 0, got {}",
                self.outline_thickness
            ));
        }
        if self.shading_levels < 2 {
            return Err(format!(
                "shading levels must be at least 2, got {}",
                self.shading_levels
            ));
        }
        Ok(())
    }
}

/// Bring `object` in line with `settings`, adding or removing each effect
pub fn apply_style(object: &mut SceneObject, settings: &StyleSettings) {
    if settings.outline_enabled {
        apply_outline(object, settings.outline_thickness, settings.outline_color);
    } else {
        remove_outline(object);
    }

    if settings.cell_shading_enabled {
        apply_cel_shading(object, settings.shading_levels);
    } else {
        remove_cel_shading(object);
    }
}
