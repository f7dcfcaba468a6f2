use signband_model::ViewportSize;

/// What the frame loop does after a failed acquire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was configured again; the next frame should succeed.
    Reconfigured,
    SkipFrame,
    /// Out of memory. The loop should stop.
    Fatal,
}

/// An acquired swapchain image with its view and an encoder for this frame.
///
/// Must be handed back to `Gpu::submit` in the same callback; an
/// outstanding surface texture blocks the next acquire.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// First sRGB format when `prefer_srgb` is set, otherwise the surface's
/// preferred format.
pub(super) fn pick_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let preferred = caps.formats.first().copied();
    if !prefer_srgb {
        return preferred;
    }
    caps.formats.iter().copied().find(|f| f.is_srgb()).or(preferred)
}

pub(super) fn pick_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    match requested {
        Some(mode) if caps.alpha_modes.contains(&mode) => mode,
        _ => caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
    }
}

/// Size the surface should be configured with, or `None` when `next` needs
/// no reconfiguration (unchanged or zero).
pub(super) fn resize_target(current: ViewportSize, next: ViewportSize) -> Option<ViewportSize> {
    (next != current && next.is_valid()).then_some(next)
}

pub(super) fn classify_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        _ => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        }
    }

    #[test]
    fn srgb_format_wins_when_preferred() {
        let c = caps(vec![
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ]);
        assert_eq!(pick_format(&c, true), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
        assert_eq!(pick_format(&c, false), Some(wgpu::TextureFormat::Bgra8Unorm));
        assert_eq!(pick_format(&caps(vec![]), true), None);
    }

    #[test]
    fn unsupported_alpha_mode_falls_back() {
        let c = caps(vec![wgpu::TextureFormat::Bgra8Unorm]);
        assert_eq!(
            pick_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
        assert_eq!(
            pick_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::Opaque)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }

    #[test]
    fn zero_or_unchanged_size_skips_reconfigure() {
        let cur = ViewportSize::new(800, 600);
        assert_eq!(resize_target(cur, cur), None);
        assert_eq!(resize_target(cur, ViewportSize::new(0, 600)), None);
        assert_eq!(
            resize_target(cur, ViewportSize::new(1024, 768)),
            Some(ViewportSize::new(1024, 768))
        );
    }

    #[test]
    fn lost_surface_is_recoverable() {
        assert_eq!(classify_error(&wgpu::SurfaceError::Lost), SurfaceErrorAction::Reconfigured);
        assert_eq!(classify_error(&wgpu::SurfaceError::Timeout), SurfaceErrorAction::SkipFrame);
        assert_eq!(classify_error(&wgpu::SurfaceError::OutOfMemory), SurfaceErrorAction::Fatal);
    }
}
