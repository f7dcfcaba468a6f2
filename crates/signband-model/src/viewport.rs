/// Viewport size in physical pixels.
///
/// Render targets (surface, depth, picking) are always allocated at this size,
/// so pointer positions must be scaled into the same space before reading back.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// wgpu refuses zero-sized textures and surfaces; callers skip work on invalid sizes.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width over height. Returns `1.0` for an invalid size.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_valid() {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }

    /// Same size with each dimension raised to at least one pixel.
    #[inline]
    pub fn clamped(self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_is_width_over_height() {
        assert_eq!(ViewportSize::new(800, 600).aspect(), 800.0 / 600.0);
        assert_eq!(ViewportSize::new(1024, 768).aspect(), 1024.0 / 768.0);
    }

    #[test]
    fn zero_dimension_is_invalid() {
        assert!(!ViewportSize::new(0, 600).is_valid());
        assert!(!ViewportSize::new(800, 0).is_valid());
        assert_eq!(ViewportSize::new(0, 0).aspect(), 1.0);
        assert_eq!(ViewportSize::new(0, 5).clamped(), ViewportSize::new(1, 5));
    }
}
