use std::sync::Arc;

use crate::math::Rgb;

/// Which faces of a triangle are rendered
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// RGBA8 texture shared between materials
#[derive(Debug, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Texture {
    /// Nearest-neighbour lookup with repeat wrapping
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [1.0; 4];
        }
        let x = ((u.rem_euclid(1.0) * self.width as f32) as u32).min(self.width - 1);
        let y = (((1.0 - v).rem_euclid(1.0) * self.height as f32) as u32).min(self.height - 1);
        let idx = ((y * self.width + x) * 4) as usize;
        match self.data.get(idx..idx + 4) {
            Some(px) => [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
                px[3] as f32 / 255.0,
            ],
            None => [1.0; 4],
        }
    }
}

/// One-dimensional lookup of discrete shading bands
#[derive(Clone, Debug, PartialEq)]
pub struct GradientMap {
    bands: Vec<f32>,
}

impl GradientMap {
    /// Quantize a linear 0..1 ramp into `levels` equal-width steps
    pub fn stepped(levels: u32) -> Self {
        let levels = levels.max(2);
        let bands = (0..levels)
            .map(|i| i as f32 / (levels - 1) as f32)
            .collect();
        Self { bands }
    }

    pub fn levels(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[f32] {
        &self.bands
    }

    /// Band value for a light intensity in 0..1
    pub fn lookup(&self, intensity: f32) -> f32 {
        let n = self.bands.len();
        let band = ((intensity.clamp(0.0, 1.0) * n as f32) as usize).min(n - 1);
        self.bands[band]
    }
}

/// Lighting model a material is rendered with
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Shading {
    /// Diffuse lighting from the scene lights
    #[default]
    Standard,
    /// Unlit flat color
    Basic,
    /// Diffuse term snapped to gradient bands
    Toon(GradientMap),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Rgb,
    pub map: Option<Arc<Texture>>,
    pub opacity: f32,
    pub transparent: bool,
    pub side: Side,
    pub wireframe: bool,
    pub shading: Shading,
}

impl Material {
    pub fn standard(color: Rgb) -> Self {
        Self {
            color,
            map: None,
            opacity: 1.0,
            transparent: false,
            side: Side::Front,
            wireframe: false,
            shading: Shading::Standard,
        }
    }

    pub fn basic(color: Rgb) -> Self {
        Self {
            shading: Shading::Basic,
            ..Self::standard(color)
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    /// Alpha written for covered pixels
    pub fn effective_opacity(&self) -> f32 {
        if self.transparent {
            self.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Fields that decide how the material looks, ignoring the lighting model
    pub fn same_appearance(&self, other: &Material) -> bool {
        let same_map = match (&self.map, &other.map) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.color == other.color
            && same_map
            && self.opacity == other.opacity
            && self.transparent == other.transparent
            && self.side == other.side
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::standard(Rgb::GREY).with_side(Side::Double)
    }
}

/// Original material plus an optional derived replacement
///
/// Style passes only ever set or clear `derived`, so the original is never
/// edited and switching a style off is a swap back.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialSlot {
    original: Material,
    derived: Option<Material>,
}

impl MaterialSlot {
    pub fn new(material: Material) -> Self {
        Self {
            original: material,
            derived: None,
        }
    }

    pub fn active(&self) -> &Material {
        self.derived.as_ref().unwrap_or(&self.original)
    }

    pub fn original(&self) -> &Material {
        &self.original
    }

    pub fn original_mut(&mut self) -> &mut Material {
        &mut self.original
    }

    pub fn set_derived(&mut self, material: Material) {
        self.derived = Some(material);
    }

    pub fn clear_derived(&mut self) {
        self.derived = None;
    }

    /// Mutate the original and any derived material together
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Material)) {
        f(&mut self.original);
        if let Some(derived) = self.derived.as_mut() {
            f(derived);
        }
    }
}

impl From<Material> for MaterialSlot {
    fn from(material: Material) -> Self {
        Self::new(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_map_levels() {
        let gradient = GradientMap::stepped(3);
        assert_eq!(gradient.bands(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_gradient_map_minimum_two_levels() {
        assert_eq!(GradientMap::stepped(0).levels(), 2);
    }

    #[test]
    fn test_gradient_lookup_equal_width_bands() {
        let gradient = GradientMap::stepped(4);
        assert_eq!(gradient.lookup(0.0), 0.0);
        assert_eq!(gradient.lookup(0.24), 0.0);
        assert!((gradient.lookup(0.26) - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(gradient.lookup(1.0), 1.0);
        assert_eq!(gradient.lookup(7.0), 1.0);
    }

    #[test]
    fn test_slot_active_prefers_derived() {
        let mut slot = MaterialSlot::new(Material::standard(Rgb::RED));
        assert_eq!(slot.active().color, Rgb::RED);
        slot.set_derived(Material::basic(Rgb::BLACK));
        assert_eq!(slot.active().color, Rgb::BLACK);
        slot.clear_derived();
        assert_eq!(slot.active(), slot.original());
    }

    #[test]
    fn test_effective_opacity_ignores_opacity_when_opaque() {
        let mut material = Material::standard(Rgb::WHITE);
        material.opacity = 0.25;
        assert_eq!(material.effective_opacity(), 1.0);
        material.transparent = true;
        assert_eq!(material.effective_opacity(), 0.25);
    }

    #[test]
    fn test_texture_sample_wraps() {
        let texture = Texture {
            width: 2,
            height: 1,
            data: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        assert_eq!(texture.sample(0.25, 0.5), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(texture.sample(1.75, 0.5), [0.0, 0.0, 1.0, 1.0]);
    }
}
