use serde::{Deserialize, Serialize};

use crate::sheet::{SheetLayout, MAX_SHEET_DIMENSION};
use crate::style::StyleSettings;

/// Largest frame edge accepted for a capture
pub const MAX_RESOLUTION: u32 = 4096;

/// Settings for one capture run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureParameters {
    /// Edge length of each square frame in pixels
    pub resolution: u32,
    /// Number of evenly spaced views around the model
    pub steps: u32,
    pub initial_angle_deg: f32,
    /// Elevation above the horizon
    pub vertical_angle_deg: f32,
    /// Distance of the live preview camera
    pub camera_distance: f32,
    /// How much of the frame the model fills, 80 being the reference framing
    pub frame_fill_percent: u32,
    /// Style to re-apply to the captured copy, if any
    pub style: Option<StyleSettings>,
}

impl Default for CaptureParameters {
    fn default() -> Self {
        Self {
            resolution: 256,
            steps: 8,
            initial_angle_deg: 0.0,
            vertical_angle_deg: 0.0,
            camera_distance: 5.0,
            frame_fill_percent: 80,
            style: None,
        }
    }
}

impl CaptureParameters {
    pub fn validate(&self) -> Result<(), String> {
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            return Err(format!(
                "resolution must be in 1..={}, got {}",
                MAX_RESOLUTION, self.resolution
            ));
        }
        if self.steps == 0 {
            return Err("steps must be at least 1".into());
        }
        let layout = SheetLayout::for_steps(self.steps, self.resolution);
        if !layout.fits() {
            return Err(format!(
                "{} steps at {}px need a {}x{} cell sheet, over the {}px limit",
                self.steps, self.resolution, layout.cols, layout.rows, MAX_SHEET_DIMENSION
            ));
        }
        if !self.initial_angle_deg.is_finite() || !self.vertical_angle_deg.is_finite() {
            return Err("camera angles must be finite".into());
        }
        if !self.camera_distance.is_finite() || self.camera_distance <= 0.0 {
            return Err(format!(
                "camera distance must be positive, got {}",
                self.camera_distance
            ));
        }
        if self.frame_fill_percent == 0 || self.frame_fill_percent > 200 {
            return Err(format!(
                "frame fill must be in 1..=200 percent, got {}",
                self.frame_fill_percent
            ));
        }
        if let Some(style) = &self.style {
            style.validate()?;
        }
        Ok(())
    }

    /// Camera azimuth for frame `index`, in degrees
    pub fn azimuth_deg(&self, index: usize) -> f32 {
        self.initial_angle_deg + index as f32 / self.steps as f32 * 360.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CaptureParameters::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let cases = [
            CaptureParameters {
                resolution: 0,
                ..Default::default()
            },
            CaptureParameters {
                resolution: MAX_RESOLUTION + 1,
                ..Default::default()
            },
            CaptureParameters {
                steps: 0,
                ..Default::default()
            },
            CaptureParameters {
                camera_distance: 0.0,
                ..Default::default()
            },
            CaptureParameters {
                frame_fill_percent: 201,
                ..Default::default()
            },
            CaptureParameters {
                vertical_angle_deg: f32::NAN,
                ..Default::default()
            },
            CaptureParameters {
                style: Some(StyleSettings {
                    shading_levels: 0,
                    ..Default::default()
                }),
                ..Default::default()
            },
        ];
        for params in cases {
            assert!(params.validate().is_err(), "{:?} should be rejected", params);
        }
    }

    #[test]
    fn test_validate_rejects_sheet_over_size_limit() {
        let largest = CaptureParameters {
            resolution: MAX_RESOLUTION,
            steps: 64,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());

        let too_wide = CaptureParameters {
            steps: 65,
            ..largest
        };
        let layout = SheetLayout::for_steps(too_wide.steps, too_wide.resolution);
        assert!(layout.width() as u64 > MAX_SHEET_DIMENSION);
        assert!(too_wide.validate().is_err());
    }

    #[test]
    fn test_azimuths_are_evenly_spaced() {
        let params = CaptureParameters {
            steps: 4,
            initial_angle_deg: 10.0,
            ..Default::default()
        };
        let azimuths: Vec<f32> = (0..4).map(|i| params.azimuth_deg(i)).collect();
        assert_eq!(azimuths, vec![10.0, 100.0, 190.0, 280.0]);
    }

    #[test]
    fn test_parse_json_with_style() {
        let params: CaptureParameters = serde_json::from_str(
            r#"{"resolution": 128, "steps": 4, "style": {"outline_enabled": true}}"#,
        )
        .unwrap();
        assert_eq!(params.resolution, 128);
        assert_eq!(params.frame_fill_percent, 80);
        assert!(params.style.unwrap().outline_enabled);
    }
}
