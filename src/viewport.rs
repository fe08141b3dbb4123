//! Viewport transform between image pixel space and display space.
//!
//! A single uniform-scale affine transform (no rotation or shear), owned by
//! the session. Reset to a fit-to-window scale on every image change, then
//! mutated only by explicit zoom and pan gestures. Pointer-driven editing
//! happens in image space, so everything goes through [`ViewportTransform::to_image`]
//! first.

use crate::model::Point;

/// Multiplicative step applied per zoom gesture.
pub const ZOOM_STEP: f32 = 1.1;

/// Affine image -> display mapping: `display = image * scale + translation`.
///
/// Zoom and pan compose *after* the existing transform, so zoom scales about
/// the display origin and pan moves in display pixels regardless of scale.
/// The inverse stays exact as long as the scale never reaches zero, which
/// multiplying by `1.1` or `1/1.1` preserves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    scale: f32,
    tx: f32,
    ty: f32,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewportTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Fit-to-window transform: the largest uniform scale that fits both
    /// image dimensions into the display, with no translation.
    pub fn fit(display_width: f32, display_height: f32, image_width: u32, image_height: u32) -> Self {
        if image_width == 0 || image_height == 0 {
            return Self::identity();
        }
        let scale_x = display_width / image_width as f32;
        let scale_y = display_height / image_height as f32;
        Self {
            scale: scale_x.min(scale_y),
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Zoom one step in or out, composed after the existing transform.
    pub fn zoom(&mut self, zoom_in: bool) {
        let factor = if zoom_in { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
        self.zoom_by(factor);
    }

    /// Scale the whole display-space result by `factor`.
    pub fn zoom_by(&mut self, factor: f32) {
        self.scale *= factor;
        self.tx *= factor;
        self.ty *= factor;
    }

    /// Translate in display pixels, composed after the existing transform.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.tx += dx;
        self.ty += dy;
    }

    pub fn to_display(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.tx, p.y * self.scale + self.ty)
    }

    pub fn to_image(&self, p: Point) -> Point {
        Point::new((p.x - self.tx) / self.scale, (p.y - self.ty) / self.scale)
    }
}
