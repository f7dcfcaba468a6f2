//! Scene owner.
//!
//! [`SignScene`] holds the current instance set and every GPU resource that
//! depends on it. Rebuilding is atomic: the new instance buffer is fully
//! written before it replaces the old one, and picking only ever resolves
//! against the set that produced the picking frame.

use glam::{Mat4, Quat, Vec3};
use signband_model::orbit::orbit_rotation;
use signband_model::picking::pointer_to_texel;
use signband_model::{
    Camera, FramebufferOrigin, InputRecord, InstanceBuilder, InstanceSet, PickHit, SceneConfig,
    ViewportSize, MAX_PICKABLE_INSTANCES,
};

use crate::SceneError;

use super::common::DepthTarget;
use super::ctx::{RenderCtx, RenderTarget};
use super::decor::DecorRenderer;
use super::instanced::{FrameUniforms, InstancedRenderer, Material, SignInstance};
use super::picking::PickingTarget;

/// Uniform scale of the target marker mesh.
pub const TARGET_MARKER_SCALE: f32 = 8.0;

/// Distance the marker floats above its sign, away from the band axis.
pub const TARGET_MARKER_LIFT: f32 = 6.0;

pub struct SignScene {
    config: SceneConfig,
    camera: Camera,
    builder: InstanceBuilder,
    instances: InstanceSet,

    signs: InstancedRenderer,
    decor: DecorRenderer,
    depth: Option<DepthTarget>,
    picking: Option<PickingTarget>,

    phase: f32,
    target: Option<usize>,
    max_buffer_size: u64,
}

impl SignScene {
    pub fn new(config: SceneConfig, seed: u64, viewport: ViewportSize) -> Self {
        let camera = Camera::new(&config.camera, viewport);
        let builder = InstanceBuilder::new(config.band.clone(), seed);
        Self {
            config,
            camera,
            builder,
            instances: InstanceSet::default(),
            signs: InstancedRenderer::new(),
            decor: DecorRenderer::new(),
            depth: None,
            picking: None,
            phase: 0.0,
            target: None,
            max_buffer_size: u64::MAX,
        }
    }

    /// Creates pipelines, static meshes and size-dependent targets.
    pub fn static_init(&mut self, ctx: &RenderCtx<'_>) {
        self.signs.prepare(ctx.device, ctx.surface_format);
        self.decor.prepare(ctx.device, ctx.surface_format, &self.config.grid);
        self.max_buffer_size = ctx.device.limits().max_buffer_size;

        self.camera.set_viewport(ctx.viewport);
        let size = ctx.viewport.clamped();
        self.depth = Some(DepthTarget::new(ctx.device, size, "signband depth"));
        self.picking = Some(PickingTarget::new(ctx.device, size));

        log::info!(
            "scene initialized at {}x{}, up to {} instances",
            size.width,
            size.height,
            self.max_instances()
        );
    }

    /// Largest instance count this device accepts.
    pub fn max_instances(&self) -> usize {
        instance_limit(self.max_buffer_size)
    }

    /// Replaces the instance set with one built from `records`.
    ///
    /// On error the previous set stays in place.
    pub fn rebuild(&mut self, device: &wgpu::Device, records: &[InputRecord]) -> Result<(), SceneError> {
        check_instance_count(records.len(), self.max_buffer_size)?;
        let set = self.builder.build(records);
        self.replace_instances(device, set)
    }

    /// Swaps in a prepared instance set. Clears the hover target.
    pub fn replace_instances(&mut self, device: &wgpu::Device, set: InstanceSet) -> Result<(), SceneError> {
        check_instance_count(set.len(), self.max_buffer_size)?;

        let packed = SignInstance::interleave(&set.attributes());
        self.signs.replace_instances(device, &packed);
        self.instances = set;
        self.target = None;

        log::debug!("instance set replaced: {} instances", self.instances.len());
        Ok(())
    }

    /// Follows a new drawable size. Returns `true` if anything was reallocated.
    pub fn resize(&mut self, device: &wgpu::Device, viewport: ViewportSize) -> bool {
        if !viewport.is_valid() {
            return false;
        }
        let mut changed = self.camera.set_viewport(viewport);

        if self.depth.as_ref().is_some_and(|d| d.size() != viewport) {
            self.depth = Some(DepthTarget::new(device, viewport, "signband depth"));
            changed = true;
        }
        if let Some(picking) = self.picking.as_mut() {
            changed |= picking.resize(device, viewport);
        }
        changed
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase;
    }

    #[inline]
    pub fn target(&self) -> Option<usize> {
        self.target
    }

    /// Marks `index` as the hover target. Returns `false` for an unknown index.
    pub fn set_target(&mut self, index: usize) -> bool {
        if index >= self.instances.len() {
            return false;
        }
        self.target = Some(index);
        true
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    #[inline]
    pub fn instances(&self) -> &InstanceSet {
        &self.instances
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// World position of instance `index` at the current phase.
    pub fn instance_world_position(&self, index: usize) -> Option<Vec3> {
        let instance = self.instances.get(index)?;
        Some(instance.world_position(self.phase, self.config.animation.orbit_spread))
    }

    /// Draws grid, signs, arrows and the target marker over the cleared frame.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        let Some(depth_size) = self.depth.as_ref().map(DepthTarget::size) else {
            log::warn!("render called before static_init");
            return;
        };
        if depth_size != ctx.viewport.clamped() {
            // Resize has not been delivered yet; the attachments would not match.
            return;
        }

        self.write_uniforms(ctx.queue);
        let Some(depth) = self.depth.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("signband scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(depth.attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        self.decor.draw_grid(&mut rpass);
        self.signs.draw(&mut rpass);
        self.decor.draw_target(&mut rpass);
    }

    /// Resolves the instance under a pointer given in logical pixels.
    pub fn pick(&mut self, ctx: &RenderCtx<'_>, pointer: (f32, f32)) -> Result<Option<PickHit>, SceneError> {
        let Some(size) = self.picking.as_ref().map(PickingTarget::size) else {
            return Ok(None);
        };
        match pointer_to_texel(pointer, ctx.scale_factor, size, FramebufferOrigin::TopLeft) {
            Some(texel) => self.pick_texel(ctx, texel),
            None => Ok(None),
        }
    }

    /// Renders the picking frame and decodes texel `(x, y)` (physical pixels,
    /// top-left origin).
    pub fn pick_texel(&mut self, ctx: &RenderCtx<'_>, texel: (u32, u32)) -> Result<Option<PickHit>, SceneError> {
        if self.instances.is_empty() {
            return Ok(None);
        }
        let Some(size) = self.picking.as_ref().map(PickingTarget::size) else {
            return Ok(None);
        };
        if texel.0 >= size.width || texel.1 >= size.height {
            return Ok(None);
        }

        self.write_uniforms(ctx.queue);
        let Some(picking) = self.picking.as_ref() else {
            return Ok(None);
        };

        let mut encoder = ctx.encoder("signband picking encoder");
        {
            let mut rpass = picking.begin_pass(&mut encoder);
            self.signs.draw_picking(&mut rpass);
        }
        let pixel = picking.read_pixel(ctx.device, ctx.queue, encoder, texel)?;

        Ok(self.instances.resolve_pixel(pixel))
    }

    fn write_uniforms(&mut self, queue: &wgpu::Queue) {
        let view = self.camera.view_matrix();
        let projection = self.camera.projection_matrix();
        let style = &self.config.style;

        let frame = FrameUniforms {
            view,
            projection,
            model: orbit_rotation(self.phase),
            light_position: style.light_position,
            orbit_spread: self.config.animation.orbit_spread,
        };
        let sign = Material::sign(style.sign_color, style.sign_fog_factor, style.lighting);
        let arrow = Material::arrow(style.arrow_color, style.sign_fog_factor);
        self.signs.write_uniforms(queue, &frame, &sign, &arrow);

        let marker = self
            .target
            .and_then(|index| self.instance_world_position(index))
            .map(target_marker_model);
        self.decor
            .write_uniforms(queue, view, projection, self.config.grid.fog_factor, marker);
    }
}

/// Model matrix placing the target marker above a sign at `world`.
///
/// The marker is lifted away from the band axis and turned so its tip points
/// back at the sign.
pub fn target_marker_model(world: Vec3) -> Mat4 {
    let radial = Vec3::new(0.0, world.y, world.z).normalize_or_zero();
    let rotation = if radial == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::Y, radial)
    };
    let up = if radial == Vec3::ZERO { Vec3::Y } else { radial };
    Mat4::from_scale_rotation_translation(
        Vec3::splat(TARGET_MARKER_SCALE),
        rotation,
        world + up * TARGET_MARKER_LIFT,
    )
}

/// Largest instance count that fits both the picking key space and one
/// instance buffer of `max_buffer_size` bytes.
pub fn instance_limit(max_buffer_size: u64) -> usize {
    let by_buffer = max_buffer_size / std::mem::size_of::<SignInstance>() as u64;
    MAX_PICKABLE_INSTANCES.min(usize::try_from(by_buffer).unwrap_or(usize::MAX))
}

fn check_instance_count(count: usize, max_buffer_size: u64) -> Result<(), SceneError> {
    if count > MAX_PICKABLE_INSTANCES {
        return Err(SceneError::PickingKeySpace {
            count,
            max: MAX_PICKABLE_INSTANCES,
        });
    }
    let bytes = count as u64 * std::mem::size_of::<SignInstance>() as u64;
    if bytes > max_buffer_size {
        return Err(SceneError::BufferLimit {
            count,
            bytes,
            limit: max_buffer_size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped_by_key_space() {
        assert_eq!(instance_limit(u64::MAX), MAX_PICKABLE_INSTANCES);
    }

    #[test]
    fn limit_is_capped_by_buffer_size() {
        // 256 MiB, the wgpu default `max_buffer_size`.
        let limit = instance_limit(256 << 20);
        assert_eq!(limit, (256 << 20) / 192);
        assert!(limit < MAX_PICKABLE_INSTANCES);
    }

    #[test]
    fn key_space_overflow_is_rejected() {
        let err = check_instance_count(MAX_PICKABLE_INSTANCES + 1, u64::MAX).unwrap_err();
        assert!(matches!(err, SceneError::PickingKeySpace { .. }));
        assert!(check_instance_count(MAX_PICKABLE_INSTANCES, u64::MAX).is_ok());
    }

    #[test]
    fn buffer_overflow_is_rejected() {
        assert!(check_instance_count(10, 1920).is_ok());
        match check_instance_count(11, 1920) {
            Err(SceneError::BufferLimit { count, bytes, limit }) => {
                assert_eq!((count, bytes, limit), (11, 2112, 1920));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_set_always_fits() {
        assert!(check_instance_count(0, 0).is_ok());
    }

    #[test]
    fn marker_floats_outward_and_points_at_sign() {
        let sign = Vec3::new(4.0, 0.0, 300.0);
        let m = target_marker_model(sign);

        let base = m.transform_point3(Vec3::new(0.0, 0.3, 0.0));
        let tip = m.transform_point3(Vec3::new(0.0, -0.6, 0.0));
        let radius = |p: Vec3| Vec3::new(0.0, p.y, p.z).length();

        assert!(radius(base) > radius(tip));
        assert!(radius(tip) > 300.0);
        assert!((base.x - 4.0).abs() < 1e-4);
    }

    #[test]
    fn marker_on_axis_keeps_upright() {
        let m = target_marker_model(Vec3::ZERO);
        let p = m.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, TARGET_MARKER_LIFT, 0.0)).length() < 1e-5);
    }
}
