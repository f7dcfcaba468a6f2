use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;
use crate::viewport::ViewportSize;

/// Perspective camera looking at a fixed point.
///
/// Projection uses wgpu clip conventions (right-handed, depth in `[0, 1]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera {
    pub fn new(config: &CameraConfig, viewport: ViewportSize) -> Self {
        Self {
            position: config.position,
            target: config.look_at,
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            near: config.near,
            far: config.far,
            aspect: viewport.aspect(),
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Updates the aspect ratio for a new viewport.
    ///
    /// Returns `true` if the projection changed. Invalid sizes are ignored so a
    /// minimized window keeps the last usable projection.
    pub fn set_viewport(&mut self, viewport: ViewportSize) -> bool {
        if !viewport.is_valid() {
            return false;
        }
        let aspect = viewport.aspect();
        if aspect == self.aspect {
            return false;
        }
        self.aspect = aspect;
        true
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Projects a world position to physical pixel coordinates (top-left origin).
    ///
    /// Returns `None` for points outside the view frustum.
    pub fn project_to_pixels(&self, world: Vec3, viewport: ViewportSize) -> Option<Vec2> {
        if !viewport.is_valid() {
            return None;
        }
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.width as f32,
            (1.0 - ndc.y) * 0.5 * viewport.height as f32,
        ))
    }
}
