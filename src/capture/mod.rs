//! Rotating capture of a model into frames and a sprite sheet.
//!
//! A run works on a structural clone of the subject placed in its own scene,
//! so the live model only has its root transform snapshotted and restored.
//! Frames are rendered strictly one after another.

mod guard;
mod params;

use glam::{Quat, Vec3};
use image::RgbaImage;
use log::{debug, info};

pub use guard::ViewportHelpers;
pub use params::{CaptureParameters, MAX_RESOLUTION};

use guard::{HelpersHidden, PreparedSurface, TransformSnapshot};

use crate::bounds::compute_bounds;
use crate::error::{CaptureError, RenderError};
use crate::math::Rgb;
use crate::placement::{compute_placement, Placement, SourceFormat};
use crate::render::{lighting_rig, PerspectiveCamera, RasterOutput, Rasterizer, RenderScene};
use crate::scene::{Node, NodeRole, SceneObject, Transform};
use crate::sheet::{compose, Frame, SpriteSheet};
use crate::style::apply_style;

/// Everything a capture run reads or temporarily changes
pub struct CaptureContext<'a, R: Rasterizer + ?Sized> {
    /// Live model; only its root transform is touched, and restored
    pub subject: &'a mut SceneObject,
    /// Live preview camera, source of the clipping planes
    pub camera: &'a PerspectiveCamera,
    pub helpers: &'a mut ViewportHelpers,
    pub format: SourceFormat,
    pub rasterizer: &'a mut R,
    /// Called with (frames done, total) after each frame
    pub progress: Option<&'a mut dyn FnMut(usize, usize)>,
}

/// Frames in capture order plus the composed sheet
#[derive(Clone, Debug)]
pub struct CaptureResult {
    pub frames: Vec<Frame>,
    pub sheet: SpriteSheet,
}

/// Model clone placed at the origin, ready to orbit
#[derive(Clone, Debug)]
pub struct CaptureStage {
    pub scene: RenderScene,
    pub placement: Placement,
}

/// Build the isolated scene a run renders from.
///
/// The clone is restyled when `style` is given, albedo of every mesh except
/// outline duplicates is forced to white, its root position and rotation are reset and it is wrapped in a
/// placement group sized for `format`.
pub fn stage_subject(
    subject: &SceneObject,
    format: SourceFormat,
    params: &CaptureParameters,
) -> CaptureStage {
    let mut clone = subject.structural_clone();
    if let Some(style) = &params.style {
        apply_style(&mut clone, style);
    }
    clone.traverse_mut(&mut |node| {
        if node.role == NodeRole::Outline {
            return;
        }
        if let Some(mesh) = node.mesh.as_mut() {
            for slot in &mut mesh.materials {
                slot.for_each_mut(|material| material.color = Rgb::WHITE);
            }
        }
    });

    clone.transform.position = Vec3::ZERO;
    clone.transform.rotation = Quat::IDENTITY;

    let bounds = compute_bounds(&clone);
    let size = bounds.size();
    let center = bounds.center();
    let placement = compute_placement(format, size, params.frame_fill_percent);
    debug!(
        "Placement for {}: size {:?}, scale {:.3}, distance {:.3}, fov {}",
        format, size, placement.scale_factor, placement.camera_distance, placement.fov_deg
    );

    let group = Node::group("capture_placement")
        .with_transform(Transform {
            position: -center + placement.model_offset,
            scale: Vec3::splat(placement.scale_factor),
            ..Transform::IDENTITY
        })
        .with_child(clone);

    CaptureStage {
        scene: RenderScene::build(&group, lighting_rig(format.wants_bright_lighting())),
        placement,
    }
}

/// Render `params.steps` views around the subject and compose them.
///
/// The first frame that fails aborts the run and nothing is returned. The
/// subject transform and helper visibility are restored and the rasterizer
/// surface released on every exit, including when the future is dropped.
pub async fn capture<R: Rasterizer + ?Sized>(
    ctx: CaptureContext<'_, R>,
    params: &CaptureParameters,
) -> Result<CaptureResult, CaptureError> {
    params.validate().map_err(CaptureError::InvalidParameters)?;

    let CaptureContext {
        subject,
        camera,
        helpers,
        format,
        rasterizer,
        mut progress,
    } = ctx;

    let subject = TransformSnapshot::new(subject);
    let _helpers = HelpersHidden::new(helpers);

    info!(
        "Capturing '{}' ({}): {} frames at {}px",
        subject.name, format, params.steps, params.resolution
    );
    let stage = stage_subject(&subject, format, params);

    rasterizer
        .prepare(params.resolution)
        .map_err(CaptureError::Surface)?;
    let mut surface = PreparedSurface::new(rasterizer);

    let mut view = PerspectiveCamera::new(stage.placement.fov_deg, 1.0, camera.near, camera.far);
    let total = params.steps as usize;
    let mut frames = Vec::with_capacity(total);

    for index in 0..total {
        let azimuth_deg = params.azimuth_deg(index);
        let position = stage
            .placement
            .camera_position(azimuth_deg.to_radians(), params.vertical_angle_deg);
        view.look_at(position, Vec3::ZERO);

        let image = surface
            .render(&stage.scene, &view)
            .await
            .and_then(|output| decode(output, params.resolution))
            .map_err(|source| CaptureError::FrameCapture { index, source })?;

        debug!("Captured frame {} at azimuth {:.1}", index, azimuth_deg);
        frames.push(Frame::new(index, azimuth_deg, image));
        if let Some(report) = progress.as_mut() {
            report(index + 1, total);
        }
    }

    let sheet = compose(&frames, params.resolution)?;
    info!(
        "Sprite sheet ready: {}x{} ({} frames)",
        sheet.width(),
        sheet.height(),
        frames.len()
    );

    Ok(CaptureResult { frames, sheet })
}

fn decode(output: RasterOutput, resolution: u32) -> Result<RgbaImage, RenderError> {
    let RasterOutput {
        width,
        height,
        pixels,
    } = output;
    let mismatch = |actual_len| RenderError::Decode {
        width: resolution,
        height: resolution,
        actual_width: width,
        actual_height: height,
        actual_len,
    };
    if width != resolution || height != resolution {
        return Err(mismatch(pixels.len()));
    }
    let len = pixels.len();
    RgbaImage::from_raw(width, height, pixels).ok_or_else(|| mismatch(len))
}
