use crate::scene::{GradientMap, Material, SceneObject, Shading};

/// Banded version of `original` with the same color, map and visibility
pub fn toon_material(original: &Material, levels: u32) -> Material {
    Material {
        shading: Shading::Toon(GradientMap::stepped(levels)),
        ..original.clone()
    }
}

/// Swap every real mesh material for a toon material with `levels` bands.
///
/// The original material stays in its slot and is restored by
/// [`remove_cel_shading`].
pub fn apply_cel_shading(object: &mut SceneObject, levels: u32) {
    object.traverse_mut(&mut |node| {
        if !node.is_real_mesh() {
            return;
        }
        if let Some(mesh) = node.mesh.as_mut() {
            for slot in &mut mesh.materials {
                let toon = toon_material(slot.original(), levels);
                slot.set_derived(toon);
            }
        }
    });
}

/// Reactivate the original material of every real mesh
pub fn remove_cel_shading(object: &mut SceneObject) {
    object.traverse_mut(&mut |node| {
        if !node.is_real_mesh() {
            return;
        }
        if let Some(mesh) = node.mesh.as_mut() {
            mesh.materials.iter_mut().for_each(|slot| slot.clear_derived());
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rgb;
    use crate::scene::{Geometry, Mesh, Node, Side};

    fn textured_model() -> SceneObject {
        let mut material = Material::standard(Rgb::new(0.2, 0.4, 0.6)).with_side(Side::Double);
        material.opacity = 0.5;
        material.transparent = true;
        Node::group("root").with_child(Node::mesh(
            "mesh",
            Mesh::new(Geometry::cuboid(1.0, 1.0, 1.0), material),
        ))
    }

    fn active(object: &SceneObject) -> Material {
        object.children[0].mesh.as_ref().unwrap().materials[0]
            .active()
            .clone()
    }

    #[test]
    fn test_cel_shading_swaps_in_toon_material() {
        let mut object = textured_model();
        apply_cel_shading(&mut object, 4);
        let material = active(&object);
        match &material.shading {
            Shading::Toon(gradient) => assert_eq!(gradient.levels(), 4),
            other => panic!("expected toon shading, got {:?}", other),
        }
        assert_eq!(material.color, Rgb::new(0.2, 0.4, 0.6));
    }

    #[test]
    fn test_toggle_off_restores_original() {
        let mut object = textured_model();
        let before = active(&object);
        apply_cel_shading(&mut object, 3);
        apply_cel_shading(&mut object, 5);
        remove_cel_shading(&mut object);
        let after = active(&object);
        assert!(after.same_appearance(&before));
        assert_eq!(after, before);
    }
}
