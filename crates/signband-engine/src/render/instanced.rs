//! Instanced sign renderer.
//!
//! Signs, arrows and the picking copy of the signs read the same instance
//! buffer. Only the material uniform differs: base color, the picking-color
//! switch, and which of orientation/transform apply.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use signband_model::InstanceAttributes;
use wgpu::util::DeviceExt;

use super::common::{
    depth_stencil_state, straight_alpha_blend, uniform_bind_group_layout, UniformBinding,
};
use super::geometry::{arrow_mesh, sign_mesh, MeshVertex};
use super::picking::PICKING_FORMAT;

/// Shading mode of one instanced mesh.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub base_color: [f32; 4],
    pub use_picking_color: bool,
    pub use_instance_transform: bool,
    pub use_orientation: bool,
    pub use_lighting: bool,
    pub fog_factor: f32,
    pub transform_blend: f32,
}

impl Material {
    pub fn sign(base_color: [f32; 4], fog_factor: f32, use_lighting: bool) -> Self {
        Self {
            base_color,
            use_picking_color: false,
            use_instance_transform: true,
            use_orientation: true,
            use_lighting,
            fog_factor,
            transform_blend: 0.0,
        }
    }

    /// Arrows sit at the raw offset: no scale, no facing.
    pub fn arrow(base_color: [f32; 4], fog_factor: f32) -> Self {
        Self {
            base_color,
            use_picking_color: false,
            use_instance_transform: false,
            use_orientation: false,
            use_lighting: false,
            fog_factor,
            transform_blend: 0.0,
        }
    }

    /// Same geometry path as `sign`, flat key colors.
    pub fn picking() -> Self {
        Self {
            base_color: [0.0; 4],
            use_picking_color: true,
            use_instance_transform: true,
            use_orientation: true,
            use_lighting: false,
            fog_factor: 0.0,
            transform_blend: 0.0,
        }
    }
}

/// Camera and band state shared by every instanced mesh in a frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    /// Band rotation at the current phase.
    pub model: Mat4,
    /// View-space light position.
    pub light_position: glam::Vec3,
    pub orbit_spread: f32,
}

/// Per-mesh instance draw state.
#[derive(Default)]
pub struct InstancedRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    draw_pipeline: Option<wgpu::RenderPipeline>,
    picking_pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sign_material: Option<UniformBinding>,
    arrow_material: Option<UniformBinding>,
    picking_material: Option<UniformBinding>,

    sign_vbo: Option<wgpu::Buffer>,
    arrow_vbo: Option<wgpu::Buffer>,

    instance_vbo: Option<wgpu::Buffer>,
    instance_count: u32,
}

impl InstancedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates pipelines, bindings and base meshes. Cheap when already built
    /// for `surface_format`.
    pub fn prepare(&mut self, device: &wgpu::Device, surface_format: wgpu::TextureFormat) {
        self.ensure_pipelines(device, surface_format);
        self.ensure_bindings(device);
        self.ensure_static_buffers(device);
    }

    #[inline]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Uploads a fresh instance buffer and swaps it in.
    ///
    /// The old buffer stays bound until the new one is fully written, so a
    /// frame never sees a partially built set.
    pub fn replace_instances(&mut self, device: &wgpu::Device, instances: &[SignInstance]) {
        let vbo = (!instances.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("signband instance vbo"),
                contents: bytemuck::cast_slice(instances),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        self.instance_vbo = vbo;
        self.instance_count = instances.len() as u32;
    }

    pub fn write_uniforms(
        &self,
        queue: &wgpu::Queue,
        frame: &FrameUniforms,
        sign: &Material,
        arrow: &Material,
    ) {
        let picking = Material::picking();
        let pairs = [
            (self.sign_material.as_ref(), sign),
            (self.arrow_material.as_ref(), arrow),
            (self.picking_material.as_ref(), &picking),
        ];
        for (binding, material) in pairs {
            let Some(binding) = binding else { continue };
            let uniform = MaterialUniform::new(frame, material);
            queue.write_buffer(&binding.ubo, 0, bytemuck::bytes_of(&uniform));
        }
    }

    /// Draws signs, then arrows, into a pass targeting the surface format.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        if self.instance_count == 0 {
            return;
        }
        let Some(pipeline) = self.draw_pipeline.as_ref() else { return };
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));

        let meshes = [
            (self.sign_material.as_ref(), self.sign_vbo.as_ref(), SIGN_VERTEX_COUNT),
            (self.arrow_material.as_ref(), self.arrow_vbo.as_ref(), ARROW_VERTEX_COUNT),
        ];
        for (material, vbo, vertex_count) in meshes {
            let (Some(material), Some(vbo)) = (material, vbo) else { continue };
            rpass.set_bind_group(0, &material.bind_group, &[]);
            rpass.set_vertex_buffer(0, vbo.slice(..));
            rpass.draw(0..vertex_count, 0..self.instance_count);
        }
    }

    /// Draws the signs with key colors into a [`PICKING_FORMAT`] pass.
    pub fn draw_picking(&self, rpass: &mut wgpu::RenderPass<'_>) {
        if self.instance_count == 0 {
            return;
        }
        let Some(pipeline) = self.picking_pipeline.as_ref() else { return };
        let Some(material) = self.picking_material.as_ref() else { return };
        let Some(sign_vbo) = self.sign_vbo.as_ref() else { return };
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &material.bind_group, &[]);
        rpass.set_vertex_buffer(0, sign_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.draw(0..SIGN_VERTEX_COUNT, 0..self.instance_count);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipelines(&mut self, device: &wgpu::Device, surface_format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(surface_format) && self.draw_pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("signband instanced shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/instanced.wgsl").into()),
        });

        let bind_group_layout = uniform_bind_group_layout(
            device,
            "signband material bgl",
            std::mem::size_of::<MaterialUniform>(),
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("signband instanced pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let build = |label: &str, entry: &str, format: wgpu::TextureFormat, blend| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[MeshVertex::layout(), SignInstance::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Signs are visible from both sides.
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

        let draw_pipeline = build(
            "signband sign pipeline",
            "fs_main",
            surface_format,
            Some(straight_alpha_blend()),
        );
        // Key colors must reach the target unblended.
        let picking_pipeline = build("signband picking pipeline", "fs_picking", PICKING_FORMAT, None);

        log::debug!("instanced pipelines built for {surface_format:?}");

        self.pipeline_format = Some(surface_format);
        self.draw_pipeline = Some(draw_pipeline);
        self.picking_pipeline = Some(picking_pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.sign_material = None;
        self.arrow_material = None;
        self.picking_material = None;
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device) {
        if self.sign_material.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let size = std::mem::size_of::<MaterialUniform>();

        self.sign_material = Some(UniformBinding::new(device, bgl, "signband sign material", size));
        self.arrow_material = Some(UniformBinding::new(device, bgl, "signband arrow material", size));
        self.picking_material =
            Some(UniformBinding::new(device, bgl, "signband picking material", size));
    }

    fn ensure_static_buffers(&mut self, device: &wgpu::Device) {
        if self.sign_vbo.is_some() && self.arrow_vbo.is_some() {
            return;
        }

        self.sign_vbo = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("signband sign vbo"),
            contents: bytemuck::cast_slice(&sign_mesh()),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.arrow_vbo = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("signband arrow vbo"),
            contents: bytemuck::cast_slice(&arrow_mesh()),
            usage: wgpu::BufferUsages::VERTEX,
        }));
    }
}

const SIGN_VERTEX_COUNT: u32 = 6;
const ARROW_VERTEX_COUNT: u32 = 3;

// ── GPU types ─────────────────────────────────────────────────────────────

/// Instance data layout (192 bytes):
///
///  offset   0  offset          [f32; 3]       loc 3
///  offset  12  pct_offset      f32            loc 15
///  offset  16  orientation     [f32; 4]       loc 4
///  offset  32  transform       [[f32; 4]; 4]  loc 5..8   (columns)
///  offset  96  next_transform  [[f32; 4]; 4]  loc 9..12  (columns)
///  offset 160  color           [f32; 4]       loc 13
///  offset 176  uv_rect         [f32; 4]       loc 14
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SignInstance {
    pub offset: [f32; 3],
    pub pct_offset: f32,
    pub orientation: [f32; 4],
    pub transform: [[f32; 4]; 4],
    pub next_transform: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub uv_rect: [f32; 4],
}

impl SignInstance {
    const ATTRS: [wgpu::VertexAttribute; 13] = wgpu::vertex_attr_array![
        3 => Float32x3,  // offset
        15 => Float32,   // pct_offset
        4 => Float32x4,  // orientation
        5 => Float32x4,  // transform col 0
        6 => Float32x4,  // transform col 1
        7 => Float32x4,  // transform col 2
        8 => Float32x4,  // transform col 3
        9 => Float32x4,  // next_transform col 0
        10 => Float32x4, // next_transform col 1
        11 => Float32x4, // next_transform col 2
        12 => Float32x4, // next_transform col 3
        13 => Float32x4, // color
        14 => Float32x4  // uv_rect
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SignInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    /// Interleaves packed attribute arrays into one vertex stream.
    ///
    /// Panics if the arrays disagree on the instance count.
    pub fn interleave(attrs: &InstanceAttributes) -> Vec<SignInstance> {
        attrs.assert_consistent();
        (0..attrs.len())
            .map(|i| SignInstance {
                offset: attrs.offsets[i],
                pct_offset: attrs.pct_offsets[i],
                orientation: attrs.orientations[i],
                transform: std::array::from_fn(|c| attrs.transform_columns[c][i]),
                next_transform: std::array::from_fn(|c| attrs.next_transform_columns[c][i]),
                color: attrs.colors[i],
                uv_rect: attrs.uv_rects[i],
            })
            .collect()
    }
}

/// Mirror of `Material` in `instanced.wgsl` (320 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MaterialUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    base_color: [f32; 4],
    light_position: [f32; 4],
    flags: [u32; 4],
    fog_factor: f32,
    transform_blend: f32,
    orbit_spread: f32,
    _pad: f32,
}

impl MaterialUniform {
    fn new(frame: &FrameUniforms, material: &Material) -> Self {
        let model_view = frame.view * frame.model;
        Self {
            view: frame.view.to_cols_array_2d(),
            projection: frame.projection.to_cols_array_2d(),
            model: frame.model.to_cols_array_2d(),
            normal_matrix: model_view.inverse().transpose().to_cols_array_2d(),
            base_color: material.base_color,
            light_position: frame.light_position.extend(1.0).to_array(),
            flags: [
                material.use_picking_color as u32,
                material.use_instance_transform as u32,
                material.use_orientation as u32,
                material.use_lighting as u32,
            ],
            fog_factor: material.fog_factor,
            transform_blend: material.transform_blend.clamp(0.0, 1.0),
            orbit_spread: frame.orbit_spread,
            _pad: 0.0,
        }
    }
}
