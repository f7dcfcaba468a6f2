//! Picking keys.
//!
//! Each instance is drawn into the picking target with its array index packed
//! into 24 bits of RGB. Alpha marks coverage: the target is cleared with zero
//! alpha, so background pixels never decode to an index.

use crate::record::RecordId;
use crate::viewport::ViewportSize;

/// Number of instances that can be told apart by a 24-bit key.
pub const MAX_PICKABLE_INSTANCES: usize = 1 << 24;

/// A 24-bit instance key encoded as an RGB8 color.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PickingColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PickingColor {
    /// Encodes `index`, or `None` when it does not fit in 24 bits.
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= MAX_PICKABLE_INSTANCES {
            return None;
        }
        let key = index as u32;
        Some(Self {
            r: ((key >> 16) & 0xff) as u8,
            g: ((key >> 8) & 0xff) as u8,
            b: (key & 0xff) as u8,
        })
    }

    /// `R << 16 | G << 8 | B`.
    #[inline]
    pub fn index(self) -> usize {
        ((self.r as usize) << 16) | ((self.g as usize) << 8) | self.b as usize
    }

    /// Normalized RGBA with full alpha, as uploaded to the color attribute.
    ///
    /// `k / 255.0` survives the unorm8 store exactly, so readback returns the
    /// original bytes.
    #[inline]
    pub fn to_unorm(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            1.0,
        ]
    }

    /// Decodes a pixel read back from an `Rgba8Unorm` picking target.
    ///
    /// Returns `None` for uncovered (zero alpha) pixels.
    #[inline]
    pub fn from_rgba8(pixel: [u8; 4]) -> Option<Self> {
        if pixel[3] == 0 {
            return None;
        }
        Some(Self {
            r: pixel[0],
            g: pixel[1],
            b: pixel[2],
        })
    }
}

/// Resolved hover target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickHit {
    pub index: usize,
    pub id: RecordId,
}

/// Row order of a framebuffer.
///
/// wgpu textures put row 0 at the top; GL default framebuffers put it at the bottom.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramebufferOrigin {
    TopLeft,
    BottomLeft,
}

/// Maps a pointer position (logical pixels, top-left origin) to a texel of a
/// framebuffer sized to `viewport` (physical pixels).
///
/// Returns `None` when the pointer lies outside the framebuffer.
pub fn pointer_to_texel(
    pointer: (f32, f32),
    scale_factor: f32,
    viewport: ViewportSize,
    origin: FramebufferOrigin,
) -> Option<(u32, u32)> {
    if !viewport.is_valid() {
        return None;
    }

    let x = (pointer.0 * scale_factor).floor();
    let y = (pointer.1 * scale_factor).floor();
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return None;
    }

    let (x, y) = (x as u32, y as u32);
    if x >= viewport.width || y >= viewport.height {
        return None;
    }

    match origin {
        FramebufferOrigin::TopLeft => Some((x, y)),
        FramebufferOrigin::BottomLeft => Some((x, viewport.height - 1 - y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_follow_bit_layout() {
        let c = PickingColor::from_index(0x12_34_56).unwrap();
        assert_eq!((c.r, c.g, c.b), (0x12, 0x34, 0x56));
        assert_eq!(c.index(), 0x12_34_56);
    }

    #[test]
    fn index_zero_is_black() {
        let c = PickingColor::from_index(0).unwrap();
        assert_eq!(c, PickingColor { r: 0, g: 0, b: 0 });
        assert_eq!(c.to_unorm(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn key_space_is_exactly_24_bits() {
        let last = PickingColor::from_index(MAX_PICKABLE_INSTANCES - 1).unwrap();
        assert_eq!((last.r, last.g, last.b), (255, 255, 255));
        assert_eq!(last.index(), MAX_PICKABLE_INSTANCES - 1);
        assert!(PickingColor::from_index(MAX_PICKABLE_INSTANCES).is_none());
    }

    #[test]
    fn every_key_round_trips_through_unorm8() {
        // Odd stride so the blue channel cycles through every value.
        for index in (0..MAX_PICKABLE_INSTANCES).step_by(4099) {
            let color = PickingColor::from_index(index).unwrap();
            let [r, g, b, a] = color.to_unorm();
            let stored = [r, g, b, a].map(|v| (v * 255.0).round() as u8);
            assert_eq!(PickingColor::from_rgba8(stored).map(PickingColor::index), Some(index));
        }
    }

    #[test]
    fn transparent_pixel_is_background() {
        assert!(PickingColor::from_rgba8([0, 0, 0, 0]).is_none());
        assert!(PickingColor::from_rgba8([255, 255, 255, 0]).is_none());
        assert_eq!(PickingColor::from_rgba8([0, 0, 2, 255]).map(PickingColor::index), Some(2));
    }

    #[test]
    fn texel_mapping_scales_and_flips() {
        let vp = ViewportSize::new(1600, 1200);
        assert_eq!(
            pointer_to_texel((10.4, 20.9), 2.0, vp, FramebufferOrigin::TopLeft),
            Some((20, 41))
        );
        assert_eq!(
            pointer_to_texel((0.0, 0.0), 1.0, vp, FramebufferOrigin::BottomLeft),
            Some((0, 1199))
        );
        assert_eq!(
            pointer_to_texel((0.0, 1199.0), 1.0, vp, FramebufferOrigin::BottomLeft),
            Some((0, 0))
        );
    }

    #[test]
    fn texel_mapping_rejects_outside_pointer() {
        let vp = ViewportSize::new(800, 600);
        assert!(pointer_to_texel((-1.0, 5.0), 1.0, vp, FramebufferOrigin::TopLeft).is_none());
        assert!(pointer_to_texel((800.0, 5.0), 1.0, vp, FramebufferOrigin::TopLeft).is_none());
        assert!(pointer_to_texel((5.0, 600.0), 1.0, vp, FramebufferOrigin::TopLeft).is_none());
        assert!(pointer_to_texel((5.0, 5.0), 1.0, ViewportSize::new(0, 0), FramebufferOrigin::TopLeft).is_none());
    }
}
