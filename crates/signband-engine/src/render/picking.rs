//! Offscreen picking target.
//!
//! The picking copy of the signs is drawn into an `Rgba8Unorm` texture sized
//! to the viewport. One texel is copied into a small staging buffer and mapped
//! synchronously; the surface frame is never involved.

use signband_model::ViewportSize;

use crate::SceneError;

use super::common::{extent, DepthTarget};

pub const PICKING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Zero alpha marks uncovered texels.
pub const PICKING_CLEAR: wgpu::Color = wgpu::Color::TRANSPARENT;

/// One texel, padded to the row alignment a buffer copy requires.
const STAGING_SIZE: u64 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64;

pub struct PickingTarget {
    size: ViewportSize,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    depth: DepthTarget,
    staging: wgpu::Buffer,
}

impl PickingTarget {
    pub fn new(device: &wgpu::Device, size: ViewportSize) -> Self {
        let size = size.clamped();
        let (texture, view) = create_color(device, size);
        let depth = DepthTarget::new(device, size, "signband picking depth");

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("signband picking staging"),
            size: STAGING_SIZE,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            size,
            texture,
            view,
            depth,
            staging,
        }
    }

    #[inline]
    pub fn size(&self) -> ViewportSize {
        self.size
    }

    /// Reallocates color and depth for `size`.
    ///
    /// Returns `false` for an unchanged or zero size.
    pub fn resize(&mut self, device: &wgpu::Device, size: ViewportSize) -> bool {
        if !size.is_valid() || size == self.size {
            return false;
        }
        let (texture, view) = create_color(device, size);
        self.texture = texture;
        self.view = view;
        self.depth = DepthTarget::new(device, size, "signband picking depth");
        self.size = size;
        log::debug!("picking target resized to {}x{}", size.width, size.height);
        true
    }

    /// Opens a pass that clears the target to [`PICKING_CLEAR`].
    pub fn begin_pass<'e>(&'e self, encoder: &'e mut wgpu::CommandEncoder) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("signband picking pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(PICKING_CLEAR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(self.depth.attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }

    /// Copies texel `(x, y)` (top-left origin) after the commands in `encoder`,
    /// submits, and blocks until the pixel is readable.
    pub fn read_pixel(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mut encoder: wgpu::CommandEncoder,
        (x, y): (u32, u32),
    ) -> Result<[u8; 4], SceneError> {
        debug_assert!(x < self.size.width && y < self.size.height);

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        queue.submit(std::iter::once(encoder.finish()));

        let slice = self.staging.slice(..4);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver outlives the poll below; a send failure means it was dropped.
            let _ = tx.send(result);
        });
        device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })?;
        rx.recv().map_err(|_| SceneError::ReadbackDropped)??;

        let pixel = {
            let data = slice.get_mapped_range();
            [data[0], data[1], data[2], data[3]]
        };
        self.staging.unmap();

        Ok(pixel)
    }
}

fn create_color(device: &wgpu::Device, size: ViewportSize) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("signband picking color"),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PICKING_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
