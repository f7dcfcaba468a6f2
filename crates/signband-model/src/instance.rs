//! Instance data builder.
//!
//! Turns the ordered record sequence into per-instance placement on the band
//! and packs it into the attribute arrays the instanced pipelines consume.
//! Index `i` of every array belongs to record `i`; that index is the picking key.

use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::BandConfig;
use crate::orbit::{instance_angle, rotate_on_band};
use crate::picking::{PickHit, PickingColor, MAX_PICKABLE_INSTANCES};
use crate::record::{InputRecord, RecordId};

/// Full UV rect: offset `(0, 0)`, size `(1, 1)`.
pub const FULL_UV_RECT: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

/// Derived per-record render data.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InstanceRecord {
    /// Placement on the band before orbit rotation.
    pub offset_position: Vec3,
    /// Unit quaternion facing the sign.
    pub orientation: Quat,
    /// Scale applied after orientation.
    pub transform: Mat4,
    /// Transform blended toward by the shader's `transform_blend` uniform.
    pub next_transform: Mat4,
    pub picking_color: PickingColor,
    /// Phase offset along the orbit, `[0, 1)`.
    pub pct_offset: f32,
    /// Texture atlas rect: `xy` offset, `zw` size.
    pub uv_rect: Vec4,
}

impl InstanceRecord {
    /// Hand-placed instance with identity scale and the full UV rect.
    pub fn placed(index: usize, offset_position: Vec3, orientation: Quat) -> Self {
        Self {
            offset_position,
            orientation,
            transform: Mat4::IDENTITY,
            next_transform: Mat4::IDENTITY,
            picking_color: PickingColor::from_index(index).unwrap_or_default(),
            pct_offset: 0.0,
            uv_rect: FULL_UV_RECT,
        }
    }

    /// Position of the sign's center once the band has turned by `phase`.
    pub fn world_position(&self, phase: f32, orbit_spread: f32) -> Vec3 {
        rotate_on_band(
            self.offset_position,
            instance_angle(phase, self.pct_offset, orbit_spread),
        )
    }
}

/// Facing for a sign at band angle `(y, z)`.
///
/// The quaternion's vector part is the band tangent crossed with the x axis,
/// with a zero scalar part; a sign on the axis itself keeps the identity.
pub fn band_orientation(y: f32, z: f32) -> Quat {
    let axis = Vec3::new(0.0, y, z).cross(Vec3::X);
    let q = axis.extend(0.0).normalize_or_zero();
    if q == Vec4::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_vec4(q)
    }
}

/// `v' = 2(q × v)w + 2 q × (q × v) + v`, the identity the vertex stage uses.
pub fn rotate_by_orientation(q: Quat, v: Vec3) -> Vec3 {
    let u = Vec3::new(q.x, q.y, q.z);
    let uv = u.cross(v);
    uv * (2.0 * q.w) + (u.cross(uv) * 2.0 + v)
}

/// Builds instances from records.
///
/// Randomness is drawn from a generator seeded by `(seed, index)`, so an
/// instance depends only on its record, its index and the seed. Growing the
/// dataset therefore leaves existing signs where they were; only
/// `pct_offset` moves because it is relative to the total count.
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    band: BandConfig,
    seed: u64,
}

impl InstanceBuilder {
    pub fn new(band: BandConfig, seed: u64) -> Self {
        Self { band, seed }
    }

    /// Builds the full instance set. O(N).
    pub fn build(&self, records: &[InputRecord]) -> InstanceSet {
        let total = records.len();
        let instances = records
            .iter()
            .enumerate()
            .map(|(index, record)| self.build_one(record, index, total))
            .collect();
        let ids = records.iter().map(|r| r.id.clone()).collect();
        InstanceSet { instances, ids }
    }

    pub fn build_one(&self, record: &InputRecord, index: usize, total: usize) -> InstanceRecord {
        let mut rng = self.rng_for(index);
        self.sample(&mut rng, record, index, total)
    }

    /// Derives one instance from an explicit random source.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        record: &InputRecord,
        index: usize,
        total: usize,
    ) -> InstanceRecord {
        debug_assert!(
            index < MAX_PICKABLE_INSTANCES,
            "instance {index} does not fit in the 24-bit picking key"
        );

        let theta = rng.random::<f32>() * TAU;
        let (sin, cos) = theta.sin_cos();
        let z = cos * self.band.radius;
        let y = sin * self.band.radius;

        let width = self.band.width_scale.sample(rng);
        let depth = self.band.depth_scale.sample(rng);
        let x = self.band.x_span.sample(rng);

        let transform = Mat4::from_scale(Vec3::new(width, 1.0, depth));

        let pct_offset = record
            .metadata
            .pct_offset
            .filter(|p| p.is_finite())
            .map(wrap_unit)
            .unwrap_or_else(|| default_pct_offset(index, total));

        InstanceRecord {
            offset_position: Vec3::new(x, y, z),
            orientation: band_orientation(y, z),
            transform,
            next_transform: transform,
            picking_color: PickingColor::from_index(index).unwrap_or_default(),
            pct_offset,
            uv_rect: FULL_UV_RECT,
        }
    }

    fn rng_for(&self, index: usize) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

fn default_pct_offset(index: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        wrap_unit(index as f32 / total as f32)
    }
}

fn wrap_unit(p: f32) -> f32 {
    let w = p.rem_euclid(1.0);
    if w >= 1.0 { 0.0 } else { w }
}

/// Instances paired with the ids of the records they came from.
#[derive(Debug, Clone, Default)]
pub struct InstanceSet {
    instances: Vec<InstanceRecord>,
    ids: Vec<RecordId>,
}

impl InstanceSet {
    /// Pairs hand-built instances with their ids.
    ///
    /// Panics if the lengths differ: the index is the picking key.
    pub fn from_parts(ids: Vec<RecordId>, instances: Vec<InstanceRecord>) -> Self {
        assert_eq!(ids.len(), instances.len(), "instance/id length mismatch");
        Self { instances, ids }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    #[inline]
    pub fn instances(&self) -> &[InstanceRecord] {
        &self.instances
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&InstanceRecord> {
        self.instances.get(index)
    }

    #[inline]
    pub fn id(&self, index: usize) -> Option<&RecordId> {
        self.ids.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &InstanceRecord)> {
        self.ids.iter().zip(self.instances.iter())
    }

    /// Maps a decoded picking index back to its record, `None` if out of range.
    pub fn resolve_index(&self, index: usize) -> Option<PickHit> {
        self.ids.get(index).map(|id| PickHit {
            index,
            id: id.clone(),
        })
    }

    pub fn resolve_color(&self, color: PickingColor) -> Option<PickHit> {
        self.resolve_index(color.index())
    }

    /// Decodes a picking-target pixel. Background and stale indices are misses.
    pub fn resolve_pixel(&self, pixel: [u8; 4]) -> Option<PickHit> {
        PickingColor::from_rgba8(pixel).and_then(|c| self.resolve_color(c))
    }

    pub fn attributes(&self) -> InstanceAttributes {
        InstanceAttributes::pack(&self.instances)
    }
}

/// Per-instance attribute arrays, one entry per instance.
///
/// Matrices are split into column-major `vec4` columns because vertex
/// attributes cannot carry a `mat4`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceAttributes {
    pub offsets: Vec<[f32; 3]>,
    pub orientations: Vec<[f32; 4]>,
    pub transform_columns: [Vec<[f32; 4]>; 4],
    pub next_transform_columns: [Vec<[f32; 4]>; 4],
    pub colors: Vec<[f32; 4]>,
    pub uv_rects: Vec<[f32; 4]>,
    pub pct_offsets: Vec<f32>,
}

impl InstanceAttributes {
    /// Packs instances into attribute arrays. O(N).
    pub fn pack(instances: &[InstanceRecord]) -> Self {
        let n = instances.len();
        let mut out = Self {
            offsets: Vec::with_capacity(n),
            orientations: Vec::with_capacity(n),
            transform_columns: std::array::from_fn(|_| Vec::with_capacity(n)),
            next_transform_columns: std::array::from_fn(|_| Vec::with_capacity(n)),
            colors: Vec::with_capacity(n),
            uv_rects: Vec::with_capacity(n),
            pct_offsets: Vec::with_capacity(n),
        };

        for inst in instances {
            out.offsets.push(inst.offset_position.to_array());
            out.orientations.push(inst.orientation.to_array());

            let cols = inst.transform.to_cols_array_2d();
            let next = inst.next_transform.to_cols_array_2d();
            for c in 0..4 {
                out.transform_columns[c].push(cols[c]);
                out.next_transform_columns[c].push(next[c]);
            }

            out.colors.push(inst.picking_color.to_unorm());
            out.uv_rects.push(inst.uv_rect.to_array());
            out.pct_offsets.push(inst.pct_offset);
        }

        out
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Panics unless every array has the same length.
    pub fn assert_consistent(&self) {
        let n = self.offsets.len();
        assert_eq!(self.orientations.len(), n, "orientation count mismatch");
        for c in 0..4 {
            assert_eq!(self.transform_columns[c].len(), n, "transform column {c} mismatch");
            assert_eq!(self.next_transform_columns[c].len(), n, "next transform column {c} mismatch");
        }
        assert_eq!(self.colors.len(), n, "color count mismatch");
        assert_eq!(self.uv_rects.len(), n, "uv rect count mismatch");
        assert_eq!(self.pct_offsets.len(), n, "pct offset count mismatch");
    }
}
