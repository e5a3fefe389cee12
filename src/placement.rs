//! Per-format framing rules for sprite capture.
//!
//! Each source format maps to one [`PlacementStrategy`]. The strategy decides
//! how much the captured model is scaled, how far away the camera sits, the
//! field of view and the path the camera takes around the model.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::scene::normalize::{SMALL_MODEL_BOOST, SMALL_MODEL_THRESHOLD};

/// Fill percentage that maps to an unscaled model
pub const REFERENCE_FILL_PERCENT: f32 = 80.0;

/// Model file formats the tool accepts
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Glb,
    Gltf,
    Obj,
    Stl,
    Fbx,
    Dae,
    Ply,
    Vtk,
    #[serde(rename = "3ds")]
    ThreeDs,
    X,
    Mtl,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 11] = [
        SourceFormat::Glb,
        SourceFormat::Gltf,
        SourceFormat::Obj,
        SourceFormat::Stl,
        SourceFormat::Fbx,
        SourceFormat::Dae,
        SourceFormat::Ply,
        SourceFormat::Vtk,
        SourceFormat::ThreeDs,
        SourceFormat::X,
        SourceFormat::Mtl,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Glb => "glb",
            SourceFormat::Gltf => "gltf",
            SourceFormat::Obj => "obj",
            SourceFormat::Stl => "stl",
            SourceFormat::Fbx => "fbx",
            SourceFormat::Dae => "dae",
            SourceFormat::Ply => "ply",
            SourceFormat::Vtk => "vtk",
            SourceFormat::ThreeDs => "3ds",
            SourceFormat::X => "x",
            SourceFormat::Mtl => "mtl",
        }
    }

    /// Format for a file name, judged by its extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    pub fn placement_strategy(self) -> PlacementStrategy {
        match self {
            SourceFormat::Fbx => PlacementStrategy::FIXED_HEIGHT,
            SourceFormat::Glb | SourceFormat::Gltf => PlacementStrategy::GLTF_SPHERICAL,
            _ => PlacementStrategy::DEFAULT_SPHERICAL,
        }
    }

    /// Whether the capture scene uses the brighter lighting rig
    pub fn wants_bright_lighting(self) -> bool {
        self == SourceFormat::Fbx
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim_start_matches('.').to_ascii_lowercase();
        SourceFormat::ALL
            .into_iter()
            .find(|format| format.extension() == lower)
            .ok_or_else(|| format!("unsupported model format '{}'", s))
    }
}

/// How the camera and model are arranged for one source format
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PlacementStrategy {
    /// Camera orbits on a sphere at a distance derived from the model size
    OrbitSpherical {
        base_scale: f32,
        distance_multiplier: f32,
        fov_deg: f32,
    },
    /// Camera circles at a fixed distance and height; model scale ignores size
    OrbitFixedHeight {
        base_scale: f32,
        fixed_distance: f32,
        fov_deg: f32,
        height_ratio: f32,
        vertical_offset_ratio: f32,
    },
}

impl PlacementStrategy {
    pub const GLTF_SPHERICAL: PlacementStrategy = PlacementStrategy::OrbitSpherical {
        base_scale: 6.0,
        distance_multiplier: 0.12,
        fov_deg: 45.0,
    };

    pub const DEFAULT_SPHERICAL: PlacementStrategy = PlacementStrategy::OrbitSpherical {
        base_scale: 3.0,
        distance_multiplier: 0.18,
        fov_deg: 45.0,
    };

    pub const FIXED_HEIGHT: PlacementStrategy = PlacementStrategy::OrbitFixedHeight {
        base_scale: 0.5,
        fixed_distance: 2.5,
        fov_deg: 55.0,
        height_ratio: 0.3,
        vertical_offset_ratio: 0.05,
    };

    pub fn fov_deg(&self) -> f32 {
        match *self {
            PlacementStrategy::OrbitSpherical { fov_deg, .. }
            | PlacementStrategy::OrbitFixedHeight { fov_deg, .. } => fov_deg,
        }
    }
}

/// Resolved framing for one capture run
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    pub scale_factor: f32,
    pub camera_distance: f32,
    pub fov_deg: f32,
    /// Offset added to the placement group after centering
    pub model_offset: Vec3,
    pub strategy: PlacementStrategy,
}

impl Placement {
    /// Camera position for an azimuth, looking at the origin
    pub fn camera_position(&self, angle_rad: f32, vertical_angle_deg: f32) -> Vec3 {
        let d = self.camera_distance;
        match self.strategy {
            PlacementStrategy::OrbitSpherical { .. } => {
                let polar = FRAC_PI_2 - vertical_angle_deg.to_radians();
                Vec3::new(
                    d * polar.sin() * angle_rad.cos(),
                    d * polar.cos(),
                    d * polar.sin() * angle_rad.sin(),
                )
            }
            PlacementStrategy::OrbitFixedHeight { height_ratio, .. } => {
                Vec3::new(d * angle_rad.sin(), d * height_ratio, d * angle_rad.cos())
            }
        }
    }
}

/// Scale, camera distance and field of view for a model.
///
/// `bounding_size` is the extent of the model before placement scaling and
/// `fill_percent` is relative to [`REFERENCE_FILL_PERCENT`].
pub fn compute_placement(format: SourceFormat, bounding_size: Vec3, fill_percent: u32) -> Placement {
    place_with(format.placement_strategy(), bounding_size, fill_percent)
}

pub fn place_with(strategy: PlacementStrategy, bounding_size: Vec3, fill_percent: u32) -> Placement {
    let fill_scale = fill_percent as f32 / REFERENCE_FILL_PERCENT;
    let max_dim = bounding_size.max_element();

    match strategy {
        PlacementStrategy::OrbitSpherical {
            base_scale,
            distance_multiplier,
            fov_deg,
        } => {
            let mut scale_factor = base_scale * fill_scale;
            if max_dim < SMALL_MODEL_THRESHOLD {
                scale_factor *= SMALL_MODEL_BOOST;
            }
            let half_fov = (fov_deg / 2.0).to_radians();
            let optimal_distance = (max_dim / 2.0) / half_fov.tan();
            Placement {
                scale_factor,
                camera_distance: optimal_distance * distance_multiplier,
                fov_deg,
                model_offset: Vec3::ZERO,
                strategy,
            }
        }
        PlacementStrategy::OrbitFixedHeight {
            base_scale,
            fixed_distance,
            fov_deg,
            vertical_offset_ratio,
            ..
        } => Placement {
            scale_factor: base_scale * fill_scale,
            camera_distance: fixed_distance,
            fov_deg,
            model_offset: Vec3::new(0.0, bounding_size.y * vertical_offset_ratio, 0.0),
            strategy,
        },
    }
}
