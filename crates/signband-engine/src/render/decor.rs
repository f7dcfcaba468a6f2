//! Static decor: the floor grid and the hover target marker.
//!
//! Both are camera independent and built once by [`DecorRenderer::prepare`].
//! Only their uniforms change per frame.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use signband_model::GridConfig;
use wgpu::util::DeviceExt;

use super::common::{
    depth_stencil_state, straight_alpha_blend, uniform_bind_group_layout, UniformBinding,
};
use super::geometry::{grid_lines, target_marker, DecorVertex};

#[derive(Default)]
pub struct DecorRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    grid_pipeline: Option<wgpu::RenderPipeline>,
    target_pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    grid_uniform: Option<UniformBinding>,
    target_uniform: Option<UniformBinding>,

    grid_vbo: Option<wgpu::Buffer>,
    grid_vertex_count: u32,
    target_vbo: Option<wgpu::Buffer>,
    target_vertex_count: u32,

    target_visible: bool,
}

impl DecorRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        grid: &GridConfig,
    ) {
        self.ensure_pipelines(device, surface_format);
        self.ensure_bindings(device);
        self.ensure_static_buffers(device, grid);
    }

    /// Writes camera state for both meshes. `target_model` of `None` hides the marker.
    pub fn write_uniforms(
        &mut self,
        queue: &wgpu::Queue,
        view: Mat4,
        projection: Mat4,
        grid_fog: f32,
        target_model: Option<Mat4>,
    ) {
        if let Some(binding) = self.grid_uniform.as_ref() {
            let u = DecorUniform::new(view, projection, Mat4::IDENTITY, grid_fog);
            queue.write_buffer(&binding.ubo, 0, bytemuck::bytes_of(&u));
        }

        self.target_visible = target_model.is_some();
        if let (Some(binding), Some(model)) = (self.target_uniform.as_ref(), target_model) {
            let u = DecorUniform::new(view, projection, model, 0.0);
            queue.write_buffer(&binding.ubo, 0, bytemuck::bytes_of(&u));
        }
    }

    pub fn draw_grid(&self, rpass: &mut wgpu::RenderPass<'_>) {
        let Some(pipeline) = self.grid_pipeline.as_ref() else { return };
        let Some(binding) = self.grid_uniform.as_ref() else { return };
        let Some(vbo) = self.grid_vbo.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &binding.bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(0..self.grid_vertex_count, 0..1);
    }

    pub fn draw_target(&self, rpass: &mut wgpu::RenderPass<'_>) {
        if !self.target_visible {
            return;
        }
        let Some(pipeline) = self.target_pipeline.as_ref() else { return };
        let Some(binding) = self.target_uniform.as_ref() else { return };
        let Some(vbo) = self.target_vbo.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &binding.bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(0..self.target_vertex_count, 0..1);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipelines(&mut self, device: &wgpu::Device, surface_format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(surface_format) && self.grid_pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("signband decor shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/decor.wgsl").into()),
        });

        let bind_group_layout = uniform_bind_group_layout(
            device,
            "signband decor bgl",
            std::mem::size_of::<DecorUniform>(),
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("signband decor pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let build = |label: &str, topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[DecorVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(straight_alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(depth_stencil_state()),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let grid_pipeline = build("signband grid pipeline", wgpu::PrimitiveTopology::LineList);
        let target_pipeline = build("signband target pipeline", wgpu::PrimitiveTopology::TriangleList);

        self.pipeline_format = Some(surface_format);
        self.grid_pipeline = Some(grid_pipeline);
        self.target_pipeline = Some(target_pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.grid_uniform = None;
        self.target_uniform = None;
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device) {
        if self.grid_uniform.is_some() && self.target_uniform.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let size = std::mem::size_of::<DecorUniform>();

        self.grid_uniform = Some(UniformBinding::new(device, bgl, "signband grid ubo", size));
        self.target_uniform = Some(UniformBinding::new(device, bgl, "signband target ubo", size));
    }

    fn ensure_static_buffers(&mut self, device: &wgpu::Device, grid: &GridConfig) {
        if self.grid_vbo.is_none() {
            let lines = grid_lines(grid);
            self.grid_vertex_count = lines.len() as u32;
            self.grid_vbo = (!lines.is_empty()).then(|| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("signband grid vbo"),
                    contents: bytemuck::cast_slice(&lines),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            });
            log::debug!("grid built with {} lines", lines.len() / 2);
        }

        if self.target_vbo.is_none() {
            let marker = target_marker();
            self.target_vertex_count = marker.len() as u32;
            self.target_vbo = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("signband target vbo"),
                contents: bytemuck::cast_slice(&marker),
                usage: wgpu::BufferUsages::VERTEX,
            }));
        }
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Mirror of `Decor` in `decor.wgsl` (208 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DecorUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    fog_factor: f32,
    _pad: [f32; 3],
}

impl DecorUniform {
    fn new(view: Mat4, projection: Mat4, model: Mat4, fog_factor: f32) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            fog_factor,
            _pad: [0.0; 3],
        }
    }
}
