//! Preparation of freshly imported models for preview and capture.

use glam::Vec3;
use log::{debug, info, warn};

use super::{Geometry, Material, MaterialSlot, Mesh, Node, NodeRole, SceneObject, Side, Transform};
use crate::bounds::compute_bounds;
use crate::math::{BoundingBox, Rgb};

/// Models smaller than this along every axis get a scale boost
pub const SMALL_MODEL_THRESHOLD: f32 = 0.1;
/// Extra scale applied to models under [`SMALL_MODEL_THRESHOLD`]
pub const SMALL_MODEL_BOOST: f32 = 50.0;

/// Summary of what normalization found and did
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeReport {
    pub mesh_count: usize,
    pub vertex_count: usize,
    pub real_mesh_count: usize,
    pub placeholder_added: bool,
    pub bounds: BoundingBox,
    pub applied_scale: f32,
}

#[derive(Debug, Clone)]
pub struct NormalizedModel {
    pub root: SceneObject,
    pub report: NormalizeReport,
}

/// Center a model on the origin and scale it to a two-unit extent.
///
/// Every mesh ends up with at least one visible material. A red wireframe
/// sphere is added when the model has no real mesh so there is something to
/// frame. The model is wrapped in a new group that carries the scale, with the
/// model itself offset by the negated bounds center.
///
/// The offset is subtracted from the root's existing position rather than
/// replacing it, so an imported root that is not at the origin still ends up
/// centered.
pub fn normalize_model(mut model: SceneObject, user_scale: f32) -> NormalizedModel {
    let mut mesh_count = 0;
    let mut vertex_count = 0;
    let mut real_mesh_count = 0;

    model.traverse_mut(&mut |node| {
        let real = node.is_real_mesh();
        let Some(mesh) = node.mesh.as_mut() else {
            return;
        };
        mesh_count += 1;
        vertex_count += mesh.vertex_count();
        if real {
            real_mesh_count += 1;
        }
        if mesh.materials.is_empty() {
            mesh.materials.push(MaterialSlot::new(Material::default()));
        }
        for slot in &mut mesh.materials {
            slot.for_each_mut(ensure_visible);
        }
        node.visible = true;
        debug!("Mesh '{}': {} vertices", node.name, mesh.vertex_count());
    });

    info!(
        "Model has {} meshes, {} vertices, {} real meshes",
        mesh_count, vertex_count, real_mesh_count
    );

    let placeholder_added = real_mesh_count == 0;
    if placeholder_added {
        warn!("No valid meshes found in model '{}', adding placeholder sphere", model.name);
        model.add_child(placeholder_sphere());
    }

    let bounds = compute_bounds(&model);
    let size = bounds.size();
    let center = bounds.center();
    let max_dim = size.max_element();

    let mut scale_factor = user_scale;
    if max_dim < SMALL_MODEL_THRESHOLD {
        debug!("Very small model detected (max dimension {:.4}), boosting scale", max_dim);
        scale_factor *= SMALL_MODEL_BOOST;
    }
    let applied_scale = 2.0 / max_dim * scale_factor;

    debug!(
        "Bounds min {:?} max {:?} size {:?} center {:?}",
        bounds.min, bounds.max, size, center
    );

    model.transform.position -= center;
    let root = Node::group("normalized")
        .with_transform(Transform {
            scale: Vec3::splat(applied_scale),
            ..Transform::IDENTITY
        })
        .with_child(model);

    info!("Applied scale {:.3}", applied_scale);

    NormalizedModel {
        root,
        report: NormalizeReport {
            mesh_count,
            vertex_count,
            real_mesh_count,
            placeholder_added,
            bounds,
            applied_scale,
        },
    }
}

/// Force a material to render both faces fully opaque
pub fn ensure_visible(material: &mut Material) {
    material.side = Side::Double;
    material.transparent = false;
    material.opacity = 1.0;
    if material
        .map
        .as_ref()
        .is_some_and(|map| map.width == 0 || map.height == 0)
    {
        material.map = None;
        material.color = Rgb::GREY;
    }
}

fn placeholder_sphere() -> Node {
    let material = Material::standard(Rgb::RED).with_wireframe(true);
    Node::mesh("placeholder", Mesh::new(Geometry::uv_sphere(1.0, 16, 16), material))
        .with_role(NodeRole::Placeholder)
}
