use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Quat, Vec2, Vec3};
use log::{debug, info, warn};

use crate::math::Rgb;
use crate::scene::{
    Geometry, GeometryGroup, Material, MaterialSlot, Mesh, Node, SceneObject, Side, Texture,
    Transform,
};

/// Load a `.gltf` or `.glb` file into a node tree
pub fn load_gltf(path: impl AsRef<Path>) -> Result<SceneObject> {
    let path = path.as_ref();
    info!("Loading glTF file: {:?}", path);

    let (document, buffers, images) =
        gltf::import(path).context(format!("Failed to load glTF file: {:?}", path))?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    convert(&document, &buffers, &images, name)
}

/// Load glTF JSON or GLB bytes already in memory
pub fn load_gltf_slice(bytes: &[u8], name: &str) -> Result<SceneObject> {
    let (document, buffers, images) =
        gltf::import_slice(bytes).context(format!("Failed to parse glTF data for {}", name))?;
    convert(&document, &buffers, &images, name.to_string())
}

fn convert(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    name: String,
) -> Result<SceneObject> {
    debug!(
        "glTF contents: {} scenes, {} nodes, {} meshes, {} materials, {} images",
        document.scenes().count(),
        document.nodes().count(),
        document.meshes().count(),
        document.materials().count(),
        images.len()
    );

    let textures: Vec<Arc<Texture>> = images.iter().map(|image| Arc::new(to_texture(image))).collect();

    let mut root = Node::group(name);
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            root.add_child(convert_node(&node, buffers, &textures)?);
        }
    } else {
        warn!("glTF file has no scenes");
    }

    info!(
        "Loaded '{}' with {} mesh nodes",
        root.name,
        root.count_where(|node| node.mesh.is_some())
    );
    Ok(root)
}

fn convert_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    textures: &[Arc<Texture>],
) -> Result<Node> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        position: Vec3::from_array(translation),
        rotation: Quat::from_array(rotation),
        scale: Vec3::from_array(scale),
    };

    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let mut converted = Node::group(name).with_transform(transform);
    if let Some(mesh) = node.mesh() {
        converted.mesh = Some(convert_mesh(&mesh, buffers, textures)?);
    }

    for child in node.children() {
        converted.add_child(convert_node(&child, buffers, textures)?);
    }

    Ok(converted)
}

/// Merge every triangle primitive of a mesh into one geometry with one group
/// and material slot per primitive
fn convert_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    textures: &[Arc<Texture>],
) -> Result<Mesh> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut groups = Vec::new();
    let mut materials = Vec::new();
    let mut all_normals = true;
    let mut all_uvs = true;

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!(
                "Skipping {:?} primitive in mesh {:?}",
                primitive.mode(),
                mesh.name()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let prim_positions: Vec<Vec3> = reader
            .read_positions()
            .context("Mesh primitive has no positions")?
            .map(Vec3::from_array)
            .collect();
        let base = positions.len() as u32;
        let vertex_count = prim_positions.len();

        match reader.read_normals() {
            Some(iter) => normals.extend(iter.map(Vec3::from_array)),
            None => all_normals = false,
        }
        match reader.read_tex_coords(0) {
            // glTF puts the uv origin at the top left
            Some(iter) => uvs.extend(iter.into_f32().map(|[u, v]| Vec2::new(u, 1.0 - v))),
            None => {
                all_uvs = false;
                uvs.extend(std::iter::repeat(Vec2::ZERO).take(vertex_count));
            }
        }

        let start = indices.len();
        match reader.read_indices() {
            Some(iter) => indices.extend(iter.into_u32().map(|i| i + base)),
            None => indices.extend(base..base + vertex_count as u32),
        }
        positions.extend(prim_positions);

        groups.push(GeometryGroup {
            start,
            count: indices.len() - start,
            material_index: materials.len(),
        });
        materials.push(MaterialSlot::new(convert_material(&primitive.material(), textures)));
    }

    let mut geometry = Geometry::new(positions, Some(indices));
    if all_normals && normals.len() == geometry.vertex_count() {
        geometry = geometry.with_normals(normals);
    }
    if all_uvs && uvs.len() == geometry.vertex_count() {
        geometry = geometry.with_uvs(uvs);
    }
    geometry.groups = groups;

    debug!(
        "Mesh {:?}: {} vertices, {} primitives",
        mesh.name(),
        geometry.vertex_count(),
        materials.len()
    );

    Ok(Mesh {
        geometry: Arc::new(geometry),
        materials,
    })
}

fn convert_material(material: &gltf::Material, textures: &[Arc<Texture>]) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let map = pbr
        .base_color_texture()
        .and_then(|info| textures.get(info.texture().source().index()))
        .cloned();

    Material {
        color: Rgb::new(r, g, b),
        map,
        opacity: a,
        transparent: material.alpha_mode() == gltf::material::AlphaMode::Blend,
        side: if material.double_sided() {
            Side::Double
        } else {
            Side::Front
        },
        ..Material::standard(Rgb::WHITE)
    }
}

fn to_texture(image: &gltf::image::Data) -> Texture {
    use gltf::image::Format;

    let data = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks(2)
            .flat_map(|rg| [rg[0], rg[1], 0, 255])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        other => {
            warn!("Unsupported texture format {:?}, using white", other);
            vec![255; (image.width * image.height * 4) as usize]
        }
    };

    Texture {
        width: image.width,
        height: image.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"name": "tri", "mesh": 0, "translation": [0.0, 2.0, 0.0]}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "material": 0}]}],
        "materials": [{"pbrMetallicRoughness": {"baseColorFactor": [1.0, 0.5, 0.25, 1.0]}, "doubleSided": true}],
        "buffers": [{"byteLength": 36, "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                       "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}]
    }"#;

    #[test]
    fn test_load_triangle_from_slice() {
        let root = load_gltf_slice(TRIANGLE_GLTF.as_bytes(), "triangle").unwrap();
        assert_eq!(root.name, "triangle");
        assert_eq!(root.children.len(), 1);

        let node = &root.children[0];
        assert_eq!(node.name, "tri");
        assert_eq!(node.transform.position, Vec3::new(0.0, 2.0, 0.0));

        let mesh = node.mesh.as_ref().unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.geometry.indices.as_deref(), Some(&[0u32, 1, 2][..]));
        assert!(mesh.geometry.normals.is_none());

        let material = mesh.materials[0].active();
        assert_eq!(material.color, Rgb::new(1.0, 0.5, 0.25));
        assert_eq!(material.side, Side::Double);
    }

    #[test]
    fn test_invalid_data_is_an_error() {
        assert!(load_gltf_slice(b"not gltf", "broken").is_err());
    }

    #[test]
    fn test_rgb_texture_expanded_to_rgba() {
        let image = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };
        assert_eq!(to_texture(&image).data, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }
}
