//! Ring-buffer particle emitter.
//!
//! An [`Emitter`] owns a fixed number of particle slots stored as three
//! parallel `f32` channels (structure of arrays), so the renderer can bind
//! each channel as its own vertex attribute stream.
//!
//! # Channels
//!
//! | Channel | Attribute | Stride | Per-slot contents |
//! |---------|-----------|--------|-------------------|
//! | [`Channel::Position`] | `position` | 3 | spawn time, lifetime, `pack(size0, size1, turb0, turb1)` |
//! | [`Channel::PositionVelocity`] | `particlePositionAndVel` | 4 | x, y, z, `pack(vx, vy, vz, turb0)` |
//! | [`Channel::Color`] | `particleColor` | 2 | `pack(r0, g0, b0, a0)`, `pack(r1, g1, b1, a1)` |
//!
//! The `position` attribute carries timing data rather than a location, so
//! the renderer must disable frustum culling for particle draws.
//!
//! # Spawning and dirty tracking
//!
//! [`Emitter::spawn`] overwrites the slot under the write cursor and advances
//! it cyclically; once the ring is full the oldest particle is replaced.
//! Particles are never destroyed explicitly: the shader derives liveness from
//! spawn time and lifetime.
//!
//! Spawns only grow a counter. [`Emitter::update`] turns that counter into an
//! upload range per channel: the contiguous run of freshly written slots, or
//! the whole buffer when the run wraps past the end.

use glam::Vec3;
use rand::Rng;

use crate::config::EmitterConfig;
use crate::error::{ParticleError, Result};
use crate::options::EmitterOptions;
use crate::packing::{pack, pack_floored, unpack};
use crate::shading::SharedShading;
use crate::time::FrameContext;

/// Velocity bytes are re-centred so 127 means "at rest".
pub const VELOCITY_BIAS: f32 = 127.0;

/// One of the three vertex attribute streams of an emitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Position,
    PositionVelocity,
    Color,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Position, Channel::PositionVelocity, Channel::Color];

    /// Floats per particle slot.
    pub const fn stride(self) -> usize {
        match self {
            Channel::Position => 3,
            Channel::PositionVelocity => 4,
            Channel::Color => 2,
        }
    }

    /// Vertex attribute name the shader binds this channel to.
    pub const fn attribute_name(self) -> &'static str {
        match self {
            Channel::Position => "position",
            Channel::PositionVelocity => "particlePositionAndVel",
            Channel::Color => "particleColor",
        }
    }

    const fn index(self) -> usize {
        match self {
            Channel::Position => 0,
            Channel::PositionVelocity => 1,
            Channel::Color => 2,
        }
    }
}

/// Sub-range of a channel, in floats (already multiplied by the stride).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRange {
    pub offset: usize,
    pub length: usize,
}

impl DirtyRange {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &DirtyRange) -> DirtyRange {
        let offset = self.offset.min(other.offset);
        DirtyRange::new(offset, self.end().max(other.end()) - offset)
    }

    /// The part of `data` this range covers.
    pub fn slice<'a>(&self, data: &'a [f32]) -> &'a [f32] {
        &data[self.offset..self.end()]
    }
}

/// Outcome of [`Emitter::update`], in slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flush {
    /// Nothing was spawned since the last update.
    Clean,
    /// Slots `start..start + count` changed.
    Partial { start: usize, count: usize },
    /// The whole buffer must be uploaded.
    Full { capacity: usize },
}

impl Flush {
    /// Changed slots, `None` when clean.
    pub fn slots(&self) -> Option<DirtyRange> {
        match *self {
            Flush::Clean => None,
            Flush::Partial { start, count } => Some(DirtyRange::new(start, count)),
            Flush::Full { capacity } => Some(DirtyRange::new(0, capacity)),
        }
    }

    /// Changed floats of `channel`, `None` when clean.
    pub fn channel_range(&self, channel: Channel) -> Option<DirtyRange> {
        self.slots().map(|r| {
            DirtyRange::new(r.offset * channel.stride(), r.length * channel.stride())
        })
    }
}

/// Spawns accumulated since the last flush.
#[derive(Clone, Copy, Debug, Default)]
struct DirtyState {
    pending: bool,
    /// Slot of the first spawn after the last flush.
    anchor: Option<usize>,
    length: usize,
}

/// Decoded contents of one slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleRecord {
    pub position: Vec3,
    /// Velocity bytes, [`VELOCITY_BIAS`] = at rest.
    pub velocity: [u8; 3],
    pub spawn_time: f32,
    pub lifetime: f32,
    /// `[r, g, b, opacity]` at birth.
    pub color_start: [u8; 4],
    /// `[r, g, b, opacity]` at death.
    pub color_end: [u8; 4],
    /// `[start, end]`.
    pub size: [u8; 2],
    /// `[start, end]`.
    pub turbulence: [u8; 2],
}

impl ParticleRecord {
    /// Inert record written into fresh slots. It decodes to an already-expired
    /// particle at the origin.
    pub const RESTING: ParticleRecord = ParticleRecord {
        position: Vec3::ZERO,
        velocity: [127, 127, 127],
        spawn_time: 0.0,
        lifetime: 0.0,
        color_start: [128, 128, 0, 0],
        color_end: [0, 254, 0, 254],
        size: [0, 0],
        turbulence: [0, 0],
    };

    fn write(&self, slot: usize, channels: &mut [Vec<f32>; 3]) {
        let [position, position_velocity, color] = channels;

        let p = slot * Channel::Position.stride();
        position[p..p + 3].copy_from_slice(&[
            self.spawn_time,
            self.lifetime,
            pack(self.size[0], self.size[1], self.turbulence[0], self.turbulence[1]),
        ]);

        let pv = slot * Channel::PositionVelocity.stride();
        position_velocity[pv..pv + 4].copy_from_slice(&[
            self.position.x,
            self.position.y,
            self.position.z,
            pack(self.velocity[0], self.velocity[1], self.velocity[2], self.turbulence[0]),
        ]);

        let c = slot * Channel::Color.stride();
        let [r0, g0, b0, a0] = self.color_start;
        let [r1, g1, b1, a1] = self.color_end;
        color[c..c + 2].copy_from_slice(&[pack(r0, g0, b0, a0), pack(r1, g1, b1, a1)]);
    }

    fn read(slot: usize, channels: &[Vec<f32>; 3]) -> Self {
        let [position, position_velocity, color] = channels;
        let p = slot * Channel::Position.stride();
        let pv = slot * Channel::PositionVelocity.stride();
        let c = slot * Channel::Color.stride();

        let [s0, s1, t0, t1] = unpack(position[p + 2]);
        let [vx, vy, vz, _] = unpack(position_velocity[pv + 3]);

        Self {
            position: Vec3::new(position_velocity[pv], position_velocity[pv + 1], position_velocity[pv + 2]),
            velocity: [vx, vy, vz],
            spawn_time: position[p],
            lifetime: position[p + 1],
            color_start: unpack(color[c]),
            color_end: unpack(color[c + 1]),
            size: [s0, s1],
            turbulence: [t0, t1],
        }
    }
}

/// A source of particles backed by a ring buffer.
pub struct Emitter {
    options: EmitterOptions,
    write_cursor: usize,
    dirty: DirtyState,
    /// Indexed by [`Channel::index`].
    channels: [Vec<f32>; 3],
    /// Ranges waiting to be pushed to the renderer.
    uploads: [Option<DirtyRange>; 3],
    /// Bumped by every reallocation.
    generation: u64,
    /// Device-side buffers must be recreated before any upload.
    needs_rebuild: bool,
    shading: Option<SharedShading>,
}

impl Emitter {
    /// Allocate channels for `options.capacity` slots.
    ///
    /// Shading state must be attached with [`attach_shading`](Self::attach_shading)
    /// before the first spawn.
    pub fn new(options: EmitterOptions) -> Result<Self> {
        let mut emitter = Self {
            options,
            write_cursor: 0,
            dirty: DirtyState::default(),
            channels: Default::default(),
            uploads: [None; 3],
            generation: 0,
            needs_rebuild: true,
            shading: None,
        };
        emitter.recreate_with_capacity(emitter.options.capacity)?;
        Ok(emitter)
    }

    pub fn attach_shading(&mut self, shading: SharedShading) {
        self.shading = Some(shading);
    }

    pub fn shading(&self) -> Option<&SharedShading> {
        self.shading.as_ref()
    }

    pub fn options(&self) -> &EmitterOptions {
        &self.options
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn capacity(&self) -> usize {
        self.options.capacity
    }

    pub fn spawn_rate(&self) -> f32 {
        self.options.spawn_rate
    }

    pub fn visible(&self) -> bool {
        self.options.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.options.visible = visible;
    }

    /// Slot the next spawn writes to.
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Whether spawns happened since the last update.
    pub fn is_dirty(&self) -> bool {
        self.dirty.pending
    }

    /// Raw floats of a channel.
    pub fn channel(&self, channel: Channel) -> &[f32] {
        &self.channels[channel.index()]
    }

    /// Range of `channel` waiting to be uploaded, if any.
    pub fn upload_range(&self, channel: Channel) -> Option<DirtyRange> {
        self.uploads[channel.index()]
    }

    /// Clear the pending upload range of `channel`, returning it.
    pub fn mark_uploaded(&mut self, channel: Channel) -> Option<DirtyRange> {
        self.uploads[channel.index()].take()
    }

    /// Binding generation: changes whenever the channels are reallocated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Acknowledge that the renderer recreated its buffers from the full
    /// channels. Pending upload ranges are dropped since they are included.
    pub fn mark_rebuilt(&mut self) {
        self.needs_rebuild = false;
        self.uploads = [None; 3];
    }

    /// Decode slot `slot`, `None` past the capacity.
    pub fn record(&self, slot: usize) -> Option<ParticleRecord> {
        (slot < self.capacity()).then(|| ParticleRecord::read(slot, &self.channels))
    }

    /// Write one new particle under the cursor and advance it.
    pub fn spawn<R: Rng + ?Sized>(&mut self, ctx: &FrameContext, rng: &mut R) -> Result<()> {
        self.require_shading()?;
        let record = self.generate(ctx, rng)?;
        record.write(self.write_cursor, &mut self.channels);
        self.mark_spawned();
        Ok(())
    }

    fn generate<R: Rng + ?Sized>(&self, ctx: &FrameContext, rng: &mut R) -> Result<ParticleRecord> {
        let o = &self.options;

        let origin = o.emitter_position.value(ctx, rng)?;
        let position = o.initial_position.value(ctx, rng)? + origin;
        let velocity = o.initial_velocity.value(ctx, rng)? + Vec3::splat(VELOCITY_BIAS);
        let lifetime = o.lifetime.value(ctx, rng)?;
        let (color_start, color_end) = o.color_over_life.start_end(ctx, rng)?;
        let (opacity_start, opacity_end) = o.opacity_over_life.start_end(ctx, rng)?;
        let (size_start, size_end) = o.size_over_life.start_end(ctx, rng)?;
        let (turb_start, turb_end) = o.turbulence_over_life.start_end(ctx, rng)?;

        let rgba = |rgb: [f32; 3], a: f32| {
            unpack(pack_floored(byte(rgb[0]), byte(rgb[1]), byte(rgb[2]), byte(a)))
        };
        let pair = |a: f32, b: f32| [byte(a) as u8, byte(b) as u8];

        Ok(ParticleRecord {
            position,
            velocity: [byte(velocity.x) as u8, byte(velocity.y) as u8, byte(velocity.z) as u8],
            spawn_time: ctx.cumulative_time as f32,
            lifetime,
            color_start: rgba(color_start.channels(), opacity_start),
            color_end: rgba(color_end.channels(), opacity_end),
            size: pair(size_start, size_end),
            turbulence: pair(turb_start, turb_end),
        })
    }

    fn mark_spawned(&mut self) {
        if !self.dirty.pending {
            self.dirty = DirtyState {
                pending: true,
                anchor: Some(self.write_cursor),
                length: 0,
            };
        }
        self.dirty.length += 1;
        self.write_cursor = (self.write_cursor + 1) % self.capacity();
    }

    /// Turn spawns since the last update into per-channel upload ranges.
    ///
    /// Returns [`Flush::Clean`] without touching anything when nothing was
    /// spawned.
    pub fn update(&mut self, _ctx: &FrameContext) -> Result<Flush> {
        self.require_shading()?;
        if !self.dirty.pending {
            return Ok(Flush::Clean);
        }

        let capacity = self.capacity();
        let anchor = self.dirty.anchor.unwrap_or(0);
        let length = self.dirty.length;
        let flush = if anchor + length <= capacity && length < capacity {
            Flush::Partial {
                start: anchor,
                count: length,
            }
        } else {
            Flush::Full { capacity }
        };
        self.dirty = DirtyState::default();

        for channel in Channel::ALL {
            if let Some(range) = flush.channel_range(channel) {
                let slot = &mut self.uploads[channel.index()];
                *slot = Some(match slot {
                    Some(prev) => prev.union(&range),
                    None => range,
                });
            }
        }

        log::trace!("emitter '{}' flushed {:?}", self.options.name, flush);
        Ok(flush)
    }

    /// Drop all particles and reallocate channels for `capacity` slots.
    ///
    /// Every slot is reseeded with [`ParticleRecord::RESTING`]; cursor and
    /// dirty state start over and the renderer is asked to rebuild.
    pub fn recreate_with_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(ParticleError::InvalidCapacity(0));
        }

        self.options.capacity = capacity;
        self.channels = Channel::ALL.map(|ch| vec![0.0; capacity * ch.stride()]);
        for slot in 0..capacity {
            ParticleRecord::RESTING.write(slot, &mut self.channels);
        }
        self.write_cursor = 0;
        self.dirty = DirtyState::default();
        self.uploads = [None; 3];
        self.generation += 1;
        self.needs_rebuild = true;

        log::debug!("emitter '{}' allocated {} slots", self.options.name, capacity);
        Ok(())
    }

    /// Merge `overrides` onto the current options.
    ///
    /// A capacity change rebuilds the ring buffer.
    pub fn update_options(&mut self, overrides: &EmitterConfig) -> Result<()> {
        let merged = overrides.apply_to(&self.options)?;
        let capacity_changed = merged.capacity != self.capacity();
        self.options = merged;
        if capacity_changed {
            self.recreate_with_capacity(self.options.capacity)?;
        }
        Ok(())
    }

    fn require_shading(&self) -> Result<()> {
        match self.shading {
            Some(_) => Ok(()),
            None => Err(ParticleError::MissingShadingState {
                emitter: self.options.name.clone(),
            }),
        }
    }
}

/// Clamp into the byte domain. Flooring happens in the packer.
#[inline]
fn byte(v: f32) -> f32 {
    v.clamp(0.0, 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::{ResourceHandle, ShadingHandles, ShadingState};
    use crate::value::ValueSpec;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn shading() -> SharedShading {
        Rc::new(RefCell::new(ShadingState::new(ShadingHandles {
            shader: ResourceHandle(1),
            noise_texture: ResourceHandle(2),
            sprite_texture: ResourceHandle(3),
        })))
    }

    fn emitter(capacity: usize) -> Emitter {
        let mut e = Emitter::new(EmitterOptions::new("test").with_capacity(capacity)).unwrap();
        e.attach_shading(shading());
        e
    }

    fn spawn_n(e: &mut Emitter, n: usize, rng: &mut SmallRng) {
        for i in 0..n {
            e.spawn(&FrameContext::new(0.016, i as f64), rng).unwrap();
        }
    }

    #[test]
    fn test_channel_strides() {
        let e = emitter(10);
        assert_eq!(e.channel(Channel::Position).len(), 30);
        assert_eq!(e.channel(Channel::PositionVelocity).len(), 40);
        assert_eq!(e.channel(Channel::Color).len(), 20);
    }

    #[test]
    fn test_fresh_slots_are_resting() {
        let e = emitter(4);
        for slot in 0..4 {
            assert_eq!(e.record(slot), Some(ParticleRecord::RESTING));
        }
        assert_eq!(e.record(4), None);
    }

    #[test]
    fn test_record_round_trip() {
        let mut channels: [Vec<f32>; 3] = Channel::ALL.map(|ch| vec![0.0; 2 * ch.stride()]);
        let record = ParticleRecord {
            position: Vec3::new(1.0, -2.0, 3.5),
            velocity: [0, 127, 254],
            spawn_time: 12.5,
            lifetime: 2.25,
            color_start: [255, 128, 0, 255],
            color_end: [1, 2, 3, 0],
            size: [51, 255],
            turbulence: [9, 200],
        };
        record.write(1, &mut channels);
        assert_eq!(ParticleRecord::read(1, &channels), record);
    }

    #[test]
    fn test_spawn_advances_cursor_cyclically() {
        let mut e = emitter(3);
        let mut rng = SmallRng::seed_from_u64(3);
        spawn_n(&mut e, 2, &mut rng);
        assert_eq!(e.write_cursor(), 2);
        spawn_n(&mut e, 1, &mut rng);
        assert_eq!(e.write_cursor(), 0);
    }

    #[test]
    fn test_spawn_packs_fields() {
        let opts = EmitterOptions::new("exact")
            .with_capacity(8)
            .with_initial_position(ValueSpec::new(Vec3::new(1.0, 2.0, 3.0)))
            .with_position(ValueSpec::new(Vec3::new(10.0, 0.0, 0.0)))
            .with_lifetime(ValueSpec::new(1.5))
            .with_size(ValueSpec::range(0.2, 1.0).with_transform(crate::value::Transform::BYTE));
        let mut e = Emitter::new(opts).unwrap();
        e.attach_shading(shading());
        let mut rng = SmallRng::seed_from_u64(3);
        e.spawn(&FrameContext::new(0.1, 4.0), &mut rng).unwrap();

        let r = e.record(0).unwrap();
        assert_eq!(r.position, Vec3::new(11.0, 2.0, 3.0));
        assert_eq!(r.velocity, [127, 127, 127]);
        assert_eq!(r.spawn_time, 4.0);
        assert_eq!(r.lifetime, 1.5);
        assert_eq!(r.size, [51, 255]);
        assert_eq!(r.color_start, [230, 90, 70, 255]);
        assert_eq!(r.color_end, [0, 255, 255, 0]);
    }

    #[test]
    fn test_velocity_is_recentred() {
        let opts = EmitterOptions::new("fast")
            .with_capacity(2)
            .with_initial_velocity(
                ValueSpec::new(Vec3::new(0.5, -0.5, 0.1)).with_transform(crate::value::Transform::SIGNED_BYTE),
            );
        let mut e = Emitter::new(opts).unwrap();
        e.attach_shading(shading());
        e.spawn(&FrameContext::default(), &mut SmallRng::seed_from_u64(0)).unwrap();
        // 0.5 * 254 = 127, -127, floor(25.4) = 25
        assert_eq!(e.record(0).unwrap().velocity, [254, 0, 152]);
    }

    #[test]
    fn test_update_partial_range() {
        let mut e = emitter(10);
        let mut rng = SmallRng::seed_from_u64(3);
        spawn_n(&mut e, 2, &mut rng);
        e.update(&FrameContext::default()).unwrap();
        e.mark_rebuilt();

        spawn_n(&mut e, 3, &mut rng);
        let flush = e.update(&FrameContext::default()).unwrap();
        assert_eq!(flush, Flush::Partial { start: 2, count: 3 });
        assert_eq!(e.upload_range(Channel::Position), Some(DirtyRange::new(6, 9)));
        assert_eq!(e.upload_range(Channel::PositionVelocity), Some(DirtyRange::new(8, 12)));
        assert_eq!(e.upload_range(Channel::Color), Some(DirtyRange::new(4, 6)));
    }

    #[test]
    fn test_update_range_ending_at_capacity_is_partial() {
        let mut e = emitter(10);
        let mut rng = SmallRng::seed_from_u64(3);
        spawn_n(&mut e, 7, &mut rng);
        e.update(&FrameContext::default()).unwrap();
        spawn_n(&mut e, 3, &mut rng);
        let flush = e.update(&FrameContext::default()).unwrap();
        assert_eq!(flush, Flush::Partial { start: 7, count: 3 });
        assert_eq!(e.write_cursor(), 0);
    }

    #[test]
    fn test_update_wrap_is_full() {
        let mut e = emitter(10);
        let mut rng = SmallRng::seed_from_u64(3);
        spawn_n(&mut e, 8, &mut rng);
        e.update(&FrameContext::default()).unwrap();
        spawn_n(&mut e, 4, &mut rng);
        let flush = e.update(&FrameContext::default()).unwrap();
        assert_eq!(flush, Flush::Full { capacity: 10 });
    }

    #[test]
    fn test_upload_ranges_accumulate_until_taken() {
        let mut e = emitter(10);
        let mut rng = SmallRng::seed_from_u64(3);
        e.mark_rebuilt();
        spawn_n(&mut e, 2, &mut rng);
        e.update(&FrameContext::default()).unwrap();
        spawn_n(&mut e, 2, &mut rng);
        e.update(&FrameContext::default()).unwrap();

        assert_eq!(e.mark_uploaded(Channel::Color), Some(DirtyRange::new(0, 8)));
        assert_eq!(e.mark_uploaded(Channel::Color), None);
    }

    #[test]
    fn test_update_clean_is_noop() {
        let mut e = emitter(4);
        assert_eq!(e.update(&FrameContext::default()).unwrap(), Flush::Clean);
        assert_eq!(e.upload_range(Channel::Position), None);
    }

    #[test]
    fn test_missing_shading() {
        let mut e = Emitter::new(EmitterOptions::new("bare").with_capacity(4)).unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        let err = e.spawn(&FrameContext::default(), &mut rng).unwrap_err();
        assert!(matches!(err, ParticleError::MissingShadingState { ref emitter } if emitter == "bare"));
        assert!(matches!(
            e.update(&FrameContext::default()),
            Err(ParticleError::MissingShadingState { .. })
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            Emitter::new(EmitterOptions::default().with_capacity(0)),
            Err(ParticleError::InvalidCapacity(0))
        ));
        let mut e = emitter(4);
        assert!(e.recreate_with_capacity(0).is_err());
        assert_eq!(e.capacity(), 4);
    }

    #[test]
    fn test_recreate_resets_everything() {
        let mut e = emitter(4);
        let mut rng = SmallRng::seed_from_u64(3);
        e.mark_rebuilt();
        spawn_n(&mut e, 3, &mut rng);

        e.recreate_with_capacity(6).unwrap();
        assert_eq!(e.capacity(), 6);
        assert_eq!(e.write_cursor(), 0);
        assert!(!e.is_dirty());
        assert!(e.needs_rebuild());
        assert_eq!(e.generation(), 2);
        assert_eq!(e.channel(Channel::PositionVelocity).len(), 24);
        assert!((0..6).all(|s| e.record(s) == Some(ParticleRecord::RESTING)));
        assert_eq!(e.update(&FrameContext::default()).unwrap(), Flush::Clean);
    }

    #[test]
    fn test_update_options_rebuilds_on_capacity_change() {
        let mut e = emitter(4);
        e.mark_rebuilt();
        e.update_options(&EmitterConfig {
            spawn_rate: Some(5.0),
            ..Default::default()
        })
        .unwrap();
        assert!(!e.needs_rebuild());
        assert_eq!(e.spawn_rate(), 5.0);

        e.update_options(&EmitterConfig {
            capacity: Some(16),
            visible: Some(false),
            ..Default::default()
        })
        .unwrap();
        assert!(e.needs_rebuild());
        assert_eq!(e.capacity(), 16);
        assert!(!e.visible());
    }
}
