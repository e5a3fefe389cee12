use std::ops::{Deref, DerefMut};

use log::debug;

use crate::render::Rasterizer;
use crate::scene::{SceneObject, Transform};

/// Visibility of the editor overlays drawn around the live model
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ViewportHelpers {
    pub grid: bool,
    pub axes: bool,
    pub bounds_outline: bool,
}

impl Default for ViewportHelpers {
    fn default() -> Self {
        Self {
            grid: true,
            axes: true,
            bounds_outline: false,
        }
    }
}

impl ViewportHelpers {
    pub fn hidden() -> Self {
        Self {
            grid: false,
            axes: false,
            bounds_outline: false,
        }
    }

    pub fn any_visible(&self) -> bool {
        self.grid || self.axes || self.bounds_outline
    }
}

/// Hides every helper until dropped, then restores the previous state
pub(crate) struct HelpersHidden<'a> {
    helpers: &'a mut ViewportHelpers,
    saved: ViewportHelpers,
}

impl<'a> HelpersHidden<'a> {
    pub(crate) fn new(helpers: &'a mut ViewportHelpers) -> Self {
        let saved = *helpers;
        *helpers = ViewportHelpers::hidden();
        Self { helpers, saved }
    }
}

impl Drop for HelpersHidden<'_> {
    fn drop(&mut self) {
        *self.helpers = self.saved;
    }
}

/// Restores the subject's root transform when dropped
pub(crate) struct TransformSnapshot<'a> {
    subject: &'a mut SceneObject,
    saved: Transform,
}

impl<'a> TransformSnapshot<'a> {
    pub(crate) fn new(subject: &'a mut SceneObject) -> Self {
        let saved = subject.transform;
        Self { subject, saved }
    }
}

impl Deref for TransformSnapshot<'_> {
    type Target = SceneObject;

    fn deref(&self) -> &SceneObject {
        self.subject
    }
}

impl Drop for TransformSnapshot<'_> {
    fn drop(&mut self) {
        if !self.subject.transform.bits_eq(&self.saved) {
            debug!("Restoring transform of '{}'", self.subject.name);
        }
        self.subject.transform = self.saved;
    }
}

/// Releases the rasterizer surface when dropped
pub(crate) struct PreparedSurface<'a, R: Rasterizer + ?Sized> {
    rasterizer: &'a mut R,
}

impl<'a, R: Rasterizer + ?Sized> PreparedSurface<'a, R> {
    pub(crate) fn new(rasterizer: &'a mut R) -> Self {
        Self { rasterizer }
    }
}

impl<R: Rasterizer + ?Sized> Deref for PreparedSurface<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.rasterizer
    }
}

impl<R: Rasterizer + ?Sized> DerefMut for PreparedSurface<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.rasterizer
    }
}

impl<R: Rasterizer + ?Sized> Drop for PreparedSurface<'_, R> {
    fn drop(&mut self) {
        self.rasterizer.release();
    }
}
