//! End-to-end picking on a headless adapter.
//!
//! Every test returns early when no adapter is available so CI machines
//! without a GPU (or a software rasterizer) still pass.

use glam::{Quat, Vec2, Vec3};
use signband_engine::paint::Color;
use signband_engine::render::{RenderCtx, RenderTarget, SignScene};
use signband_model::instance::rotate_by_orientation;
use signband_model::orbit::{instance_angle, rotate_on_band};
use signband_model::{
    BandConfig, Camera, CameraConfig, InputRecord, InstanceRecord, InstanceSet, RecordId, SceneConfig,
    Span, StyleConfig, ViewportSize,
};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn gpu() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("signband test device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .ok()
    })
}

fn ctx<'a>(device: &'a wgpu::Device, queue: &'a wgpu::Queue, viewport: ViewportSize) -> RenderCtx<'a> {
    RenderCtx::new(device, queue, FORMAT, viewport, 1.0)
}

/// Camera on +z looking at the origin, three signs in a row facing it.
fn row_scene(device: &wgpu::Device, queue: &wgpu::Queue, viewport: ViewportSize) -> SignScene {
    styled_row_scene(device, queue, viewport, StyleConfig::default())
}

fn styled_row_scene(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    viewport: ViewportSize,
    style: StyleConfig,
) -> SignScene {
    let config = SceneConfig {
        camera: CameraConfig {
            position: Vec3::new(0.0, 0.0, 50.0),
            look_at: Vec3::ZERO,
            ..CameraConfig::default()
        },
        style,
        ..SceneConfig::default()
    };
    let mut scene = SignScene::new(config, 7, viewport);
    scene.static_init(&ctx(device, queue, viewport));

    let xs = [-10.0, 0.0, 10.0];
    let ids = ["left", "middle", "right"].map(RecordId::from).to_vec();
    let instances = xs
        .iter()
        .enumerate()
        .map(|(i, &x)| InstanceRecord::placed(i, Vec3::new(x, 0.0, 0.0), Quat::IDENTITY))
        .collect();
    scene
        .replace_instances(device, InstanceSet::from_parts(ids, instances))
        .unwrap();
    scene
}

fn pick_at(
    scene: &mut SignScene,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    viewport: ViewportSize,
    world: Vec3,
) -> Option<String> {
    let p = scene.camera().project_to_pixels(world, viewport).unwrap();
    let texel = (p.x as u32, p.y as u32);
    scene
        .pick_texel(&ctx(device, queue, viewport), texel)
        .unwrap()
        .map(|hit| hit.id.to_string())
}

#[test]
fn picks_each_sign_and_misses_background() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no adapter; skipping");
        return;
    };
    let vp = ViewportSize::new(800, 600);
    let mut scene = row_scene(&device, &queue, vp);

    for (x, id) in [(-10.0, "left"), (0.0, "middle"), (10.0, "right")] {
        let got = pick_at(&mut scene, &device, &queue, vp, Vec3::new(x, 0.0, 0.0));
        assert_eq!(got.as_deref(), Some(id));
    }

    let background = scene.pick_texel(&ctx(&device, &queue, vp), (5, 5)).unwrap();
    assert!(background.is_none());

    let outside = scene.pick(&ctx(&device, &queue, vp), (-3.0, 10.0)).unwrap();
    assert!(outside.is_none());
}

#[test]
fn picking_follows_resize() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no adapter; skipping");
        return;
    };
    let small = ViewportSize::new(800, 600);
    let large = ViewportSize::new(1024, 768);
    let mut scene = row_scene(&device, &queue, small);

    assert!(scene.resize(&device, large));
    assert!(!scene.resize(&device, large));

    let got = pick_at(&mut scene, &device, &queue, large, Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(got.as_deref(), Some("right"));

    // Texel that only exists in the larger target.
    let corner = scene.pick_texel(&ctx(&device, &queue, large), (1000, 750)).unwrap();
    assert!(corner.is_none());
}

#[test]
fn rebuild_swaps_the_set_and_clears_target() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no adapter; skipping");
        return;
    };
    let vp = ViewportSize::new(640, 480);
    let mut scene = row_scene(&device, &queue, vp);
    assert!(scene.set_target(2));
    assert!(!scene.set_target(3));

    let records: Vec<InputRecord> = (0..50).map(|i| InputRecord::new(format!("r{i}"))).collect();
    scene.rebuild(&device, &records).unwrap();

    assert_eq!(scene.instances().len(), 50);
    assert_eq!(scene.target(), None);
    assert_eq!(scene.instances().id(49).map(RecordId::as_str), Some("r49"));
}

/// Ring of radius 100 seen broadside from +z. Signs keep at least unit
/// scale so none collapses to a sliver.
fn band_scene(device: &wgpu::Device, queue: &wgpu::Queue, viewport: ViewportSize) -> SignScene {
    let config = SceneConfig {
        band: BandConfig {
            radius: 100.0,
            x_span: Span::new(-60.0, 60.0),
            width_scale: Span::new(1.0, 2.0),
            depth_scale: Span::new(1.0, 1.0),
        },
        camera: CameraConfig {
            position: Vec3::new(0.0, 0.0, 300.0),
            look_at: Vec3::ZERO,
            ..CameraConfig::default()
        },
        ..SceneConfig::default()
    };
    let mut scene = SignScene::new(config, 0x5eed, viewport);
    scene.static_init(&ctx(device, queue, viewport));
    scene
}

/// Pixel position without frustum rejection.
fn to_pixels(camera: &Camera, viewport: ViewportSize, world: Vec3) -> Vec2 {
    let ndc = camera.view_projection().project_point3(world);
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * viewport.width as f32,
        (1.0 - ndc.y) * 0.5 * viewport.height as f32,
    )
}

/// Screen bounds of one sign quad, placed the way the vertex stage places
/// it: orient, scale, offset, then turn with the band.
fn sign_bounds(scene: &SignScene, viewport: ViewportSize, index: usize) -> (Vec2, Vec2) {
    let instance = scene.instances().get(index).unwrap();
    let angle = instance_angle(
        scene.phase(),
        instance.pct_offset,
        scene.config().animation.orbit_spread,
    );
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    for (x, y) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
        let oriented = rotate_by_orientation(instance.orientation, Vec3::new(x, y, 0.0));
        let local = instance.transform.transform_point3(oriented);
        let world = rotate_on_band(local + instance.offset_position, angle);
        let p = to_pixels(scene.camera(), viewport, world);
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

/// Picks the projected center of every sign that is at least a few pixels
/// tall and lies outside every other sign's bounds. Returns how many signs
/// were picked.
fn pick_clear_sign_centers(
    scene: &mut SignScene,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    viewport: ViewportSize,
) -> usize {
    let bounds: Vec<(Vec2, Vec2)> = (0..scene.instances().len())
        .map(|i| sign_bounds(scene, viewport, i))
        .collect();
    let size = Vec2::new(viewport.width as f32, viewport.height as f32);

    let mut picked = 0;
    for (i, &(min, max)) in bounds.iter().enumerate() {
        if (max - min).min_element() < 3.5 {
            continue;
        }
        let center = to_pixels(scene.camera(), viewport, scene.instance_world_position(i).unwrap());
        if center.cmplt(Vec2::ZERO).any() || center.cmpge(size).any() {
            continue;
        }
        let texel = (center.x as u32, center.y as u32);
        let sample = Vec2::new(texel.0 as f32 + 0.5, texel.1 as f32 + 0.5);
        let overlapped = bounds.iter().enumerate().any(|(j, &(lo, hi))| {
            j != i && sample.cmpge(lo - 1.5).all() && sample.cmple(hi + 1.5).all()
        });
        if overlapped {
            continue;
        }

        let hit = scene.pick_texel(&ctx(device, queue, viewport), texel).unwrap();
        let expected = scene.instances().id(i).cloned();
        assert_eq!(hit.map(|h| (h.index, h.id)), expected.map(|id| (i, id)), "sign {i}");
        picked += 1;
    }
    picked
}

#[test]
fn rebuilt_band_picks_every_visible_sign_at_a_turned_phase() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no adapter; skipping");
        return;
    };
    let vp = ViewportSize::new(1280, 960);
    let mut scene = band_scene(&device, &queue, vp);
    let records: Vec<InputRecord> = (0..120).map(|i| InputRecord::new(format!("r{i}"))).collect();

    scene.rebuild(&device, &records[..0]).unwrap();
    scene.set_phase(0.7);
    assert!(scene.instances().is_empty());
    let centre = (vp.width / 2, vp.height / 2);
    assert!(scene.pick_texel(&ctx(&device, &queue, vp), centre).unwrap().is_none());

    scene.rebuild(&device, &records[..50]).unwrap();
    scene.set_phase(0.7);
    assert_eq!(scene.instances().len(), 50);
    let first_fifty: Vec<Vec3> = (0..50)
        .map(|i| scene.instance_world_position(i).unwrap())
        .collect();
    let picked = pick_clear_sign_centers(&mut scene, &device, &queue, vp);
    assert!(picked * 3 >= 50, "only {picked} of 50 signs were pickable");

    scene.rebuild(&device, &records).unwrap();
    scene.set_phase(0.7);
    assert_eq!(scene.instances().len(), 120);
    for (i, before) in first_fifty.iter().enumerate() {
        assert_eq!(scene.instance_world_position(i), Some(*before), "sign {i} moved");
    }
    let picked = pick_clear_sign_centers(&mut scene, &device, &queue, vp);
    assert!(picked * 3 >= 120, "only {picked} of 120 signs were pickable");
}

/// Clears a fresh color target to the scene's clear color, renders the
/// scene over it and reads back the given texels.
fn render_and_sample(
    scene: &mut SignScene,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    viewport: ViewportSize,
    texels: &[(u32, u32)],
) -> Vec<[u8; 4]> {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen color"),
        size: wgpu::Extent3d {
            width: viewport.width,
            height: viewport.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let clear = Color::from_hex(scene.config().style.clear_color);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    drop(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("offscreen clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear.to_wgpu()),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    }));
    {
        let mut target = RenderTarget::new(&mut encoder, &view);
        scene.render(&ctx(device, queue, viewport), &mut target);
    }

    let row = u64::from(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("offscreen readback"),
        size: row * texels.len() as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    for (k, &(x, y)) in texels.iter().enumerate() {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: k as u64 * row,
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
    }
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .unwrap();
    let data = slice.get_mapped_range();
    (0..texels.len())
        .map(|k| {
            let o = k * row as usize;
            [data[o], data[o + 1], data[o + 2], data[o + 3]]
        })
        .collect()
}

fn close(got: [u8; 4], want: [u8; 4]) -> bool {
    got.iter().zip(want).all(|(&g, w)| g.abs_diff(w) <= 1)
}

/// A point on the middle sign, clear of its arrow.
fn on_middle_sign(scene: &SignScene, viewport: ViewportSize) -> (u32, u32) {
    let p = scene
        .camera()
        .project_to_pixels(Vec3::new(0.6, 0.5, 0.0), viewport)
        .unwrap();
    (p.x as u32, p.y as u32)
}

#[test]
fn unlit_frame_shows_sign_color_over_clear_color() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no adapter; skipping");
        return;
    };
    let vp = ViewportSize::new(640, 480);
    let mut scene = row_scene(&device, &queue, vp);
    let sign = on_middle_sign(&scene, vp);

    let px = render_and_sample(&mut scene, &device, &queue, vp, &[(5, 5), sign]);

    // 0xeeeeee survives the linear round trip through the sRGB target.
    assert!(close(px[0], [0xee, 0xee, 0xee, 0xff]), "background {:?}", px[0]);
    assert!(close(px[1], [0xff, 0xff, 0xff, 0xff]), "sign {:?}", px[1]);
}

#[test]
fn lit_sign_is_shaded_by_the_light_angle() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no adapter; skipping");
        return;
    };
    let vp = ViewportSize::new(640, 480);
    // The sign faces -z; a light off to the side behind it gives a Lambert
    // weight near 0.31, about 150 once sRGB encoded.
    let style = StyleConfig {
        lighting: true,
        light_position: Vec3::new(100.0, 0.0, -80.0),
        ..StyleConfig::default()
    };
    let mut scene = styled_row_scene(&device, &queue, vp, style);
    let sign = on_middle_sign(&scene, vp);

    let px = render_and_sample(&mut scene, &device, &queue, vp, &[(5, 5), sign])[1];

    assert!((120..=185).contains(&px[0]), "lit sign {px:?}");
    assert!(px[0].abs_diff(px[1]) <= 1 && px[1].abs_diff(px[2]) <= 1, "lit sign {px:?}");
    assert_eq!(px[3], 0xff);
}
