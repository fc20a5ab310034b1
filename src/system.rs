//! Particle system: a set of emitters driven by one clock.
//!
//! The system owns the default [`EmitterOptions`] that per-emitter overrides
//! are merged onto, the shading state shared by all emitters, and the random
//! source used for spawning.
//!
//! Each frame the application calls [`ParticleSystem::update`] with a
//! [`FrameContext`], then [`ParticleSystem::sync`] to push changed channels to
//! a [`ParticleSink`].
//!
//! # Emission cadence
//!
//! A visible emitter spawns `floor(min(spawn_rate * elapsed, capacity / 5))`
//! particles per frame, so one long frame overwrites at most a fifth of the
//! ring.
//!
//! # Example
//!
//! ```ignore
//! let mut system = ParticleSystem::new().with_seed(7);
//! system.attach_shading(ShadingState::new(handles));
//! let fire = system.push_emitter(EmitterOptions::new("fire").with_spawn_rate(500.0))?;
//!
//! loop {
//!     let ctx = time.update();
//!     system.update(&ctx)?;
//!     system.sync(&mut sink);
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::{EmitterConfig, SystemConfig};
use crate::emitter::{Channel, Emitter, Flush};
use crate::error::{ParticleError, Result};
use crate::options::EmitterOptions;
use crate::shading::{ShadingState, SharedShading};
use crate::sink::ParticleSink;
use crate::time::FrameContext;

/// Fraction of capacity an emitter may spawn in a single frame.
const MAX_FRAME_FRACTION: f64 = 1.0 / 5.0;

/// Handle of an emitter inside its [`ParticleSystem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(usize);

impl EmitterId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// What [`ParticleSystem::update`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Particles spawned across all emitters.
    pub spawned: usize,
    /// Emitters whose spawn count hit the per-frame ceiling.
    pub throttled: usize,
    /// Emitters that reported a non-clean flush.
    pub flushed: usize,
    /// The frame carried no elapsed time and nothing ran.
    pub paused: bool,
}

/// What [`ParticleSystem::sync`] pushed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub rebuilt_channels: usize,
    pub uploads: usize,
    pub floats: usize,
}

pub struct ParticleSystem {
    defaults: EmitterOptions,
    emitters: Vec<Emitter>,
    shading: Option<SharedShading>,
    time_scale: f64,
    rng: SmallRng,
}

impl ParticleSystem {
    /// Empty system with built-in defaults and an entropy-seeded RNG.
    pub fn new() -> Self {
        Self {
            defaults: EmitterOptions::default(),
            emitters: Vec::new(),
            shading: None,
            time_scale: 1.0,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Use `defaults` as the base for emitters added from overrides.
    pub fn with_defaults(mut self, defaults: EmitterOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Make spawning deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.set_time_scale(time_scale);
        self
    }

    /// Build a system and its emitters from a configuration document.
    ///
    /// Shading state still has to be attached before the first update.
    pub fn from_config(config: &SystemConfig) -> Result<Self> {
        let mut system = Self::new().with_time_scale(config.time_scale);
        if let Some(seed) = config.seed {
            system = system.with_seed(seed);
        }
        if let Some(defaults) = &config.defaults {
            system.defaults = defaults.apply_to(&system.defaults)?;
        }
        for emitter in &config.emitters {
            system.add_emitter(emitter)?;
        }
        log::info!(
            "particle system configured with {} emitter(s), time scale {}",
            system.emitters.len(),
            system.time_scale
        );
        Ok(system)
    }

    pub fn defaults(&self) -> &EmitterOptions {
        &self.defaults
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Negative scales clamp to 0.
    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.time_scale = time_scale.max(0.0);
    }

    /// Share `state` with every current and future emitter.
    pub fn attach_shading(&mut self, state: ShadingState) -> SharedShading {
        let shared = Rc::new(RefCell::new(state));
        for emitter in &mut self.emitters {
            emitter.attach_shading(Rc::clone(&shared));
        }
        log::info!("shading attached to {} emitter(s)", self.emitters.len());
        self.shading = Some(Rc::clone(&shared));
        shared
    }

    pub fn shading(&self) -> Option<&SharedShading> {
        self.shading.as_ref()
    }

    /// Add an emitter built from the defaults merged with `overrides`.
    pub fn add_emitter(&mut self, overrides: &EmitterConfig) -> Result<EmitterId> {
        let options = overrides.apply_to(&self.defaults)?;
        self.push_emitter(options)
    }

    /// Add an emitter with fully specified options.
    pub fn push_emitter(&mut self, options: EmitterOptions) -> Result<EmitterId> {
        let mut emitter = Emitter::new(options)?;
        if let Some(shading) = &self.shading {
            emitter.attach_shading(Rc::clone(shading));
        }
        let id = EmitterId::new(self.emitters.len());
        log::debug!(
            "added emitter '{}' as {:?} ({} slots, {}/s)",
            emitter.name(),
            id,
            emitter.capacity(),
            emitter.spawn_rate()
        );
        self.emitters.push(emitter);
        Ok(id)
    }

    pub fn emitter(&self, id: EmitterId) -> Result<&Emitter> {
        self.emitters
            .get(id.0)
            .ok_or(ParticleError::UnknownEmitter(id.0))
    }

    pub fn emitter_mut(&mut self, id: EmitterId) -> Result<&mut Emitter> {
        self.emitters
            .get_mut(id.0)
            .ok_or(ParticleError::UnknownEmitter(id.0))
    }

    /// Merge `overrides` onto one emitter's current options.
    pub fn update_emitter(&mut self, id: EmitterId, overrides: &EmitterConfig) -> Result<()> {
        self.emitter_mut(id)?.update_options(overrides)
    }

    pub fn emitters(&self) -> impl Iterator<Item = (EmitterId, &Emitter)> {
        self.emitters
            .iter()
            .enumerate()
            .map(|(i, e)| (EmitterId::new(i), e))
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Advance one frame: spawn on every visible emitter, then flush it.
    ///
    /// The shared time uniform is refreshed even when the frame is paused.
    /// A frame whose scaled elapsed time is not positive (including NaN)
    /// counts as paused.
    ///
    /// The per-frame ceiling is `capacity / 5`, so an emitter with fewer than
    /// five slots never spawns.
    pub fn update(&mut self, ctx: &FrameContext) -> Result<FrameStats> {
        let ctx = ctx.scaled(self.time_scale);
        if let Some(shading) = &self.shading {
            shading.borrow_mut().uniforms.time = ctx.cumulative_time as f32;
        }

        let mut stats = FrameStats::default();
        if ctx.elapsed_time.is_nan() || ctx.elapsed_time <= 0.0 {
            stats.paused = true;
            return Ok(stats);
        }

        for emitter in self.emitters.iter_mut().filter(|e| e.visible()) {
            let wanted = f64::from(emitter.spawn_rate()) * ctx.elapsed_time;
            let ceiling = emitter.capacity() as f64 * MAX_FRAME_FRACTION;
            if wanted > ceiling {
                log::debug!(
                    "emitter '{}' throttled: {:.1} requested, {:.1} allowed",
                    emitter.name(),
                    wanted,
                    ceiling
                );
                stats.throttled += 1;
            }

            let count = wanted.min(ceiling).floor() as usize;
            for _ in 0..count {
                emitter.spawn(&ctx, &mut self.rng)?;
            }
            stats.spawned += count;

            if emitter.update(&ctx)? != Flush::Clean {
                stats.flushed += 1;
            }
        }
        Ok(stats)
    }

    /// Push rebuilt or dirty channels and the uniform block to `sink`.
    ///
    /// Pending ranges are cleared as they are handed over.
    pub fn sync<S: ParticleSink + ?Sized>(&mut self, sink: &mut S) -> SyncStats {
        let mut stats = SyncStats::default();

        for (index, emitter) in self.emitters.iter_mut().enumerate() {
            let id = EmitterId::new(index);
            if emitter.needs_rebuild() {
                for channel in Channel::ALL {
                    let data = emitter.channel(channel);
                    sink.rebuild(id, emitter.generation(), channel, data);
                    stats.rebuilt_channels += 1;
                    stats.floats += data.len();
                }
                emitter.mark_rebuilt();
                continue;
            }

            for channel in Channel::ALL {
                if let Some(range) = emitter.mark_uploaded(channel) {
                    sink.upload(id, channel, range, range.slice(emitter.channel(channel)));
                    stats.uploads += 1;
                    stats.floats += range.length;
                }
            }
        }

        if let Some(shading) = &self.shading {
            sink.uniforms(&shading.borrow().uniforms);
        }
        stats
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::{ResourceHandle, ShadingHandles};
    use crate::sink::{RecordingSink, SinkEvent};

    fn handles() -> ShadingHandles {
        ShadingHandles {
            shader: ResourceHandle(10),
            noise_texture: ResourceHandle(11),
            sprite_texture: ResourceHandle(12),
        }
    }

    fn system() -> ParticleSystem {
        let mut s = ParticleSystem::new().with_seed(1);
        s.attach_shading(ShadingState::new(handles()));
        s
    }

    #[test]
    fn test_throttle() {
        let mut s = system();
        let id = s
            .push_emitter(EmitterOptions::new("t").with_capacity(100).with_spawn_rate(1000.0))
            .unwrap();
        let stats = s.update(&FrameContext::new(10.0, 10.0)).unwrap();
        assert_eq!(stats.spawned, 20);
        assert_eq!(stats.throttled, 1);
        assert_eq!(s.emitter(id).unwrap().write_cursor(), 20);
    }

    #[test]
    fn test_tiny_capacity_never_spawns() {
        let mut s = system();
        let id = s
            .push_emitter(EmitterOptions::new("tiny").with_capacity(4).with_spawn_rate(1000.0))
            .unwrap();
        let stats = s.update(&FrameContext::new(1.0, 1.0)).unwrap();
        assert_eq!(stats.spawned, 0);
        assert_eq!(stats.throttled, 1);
        assert_eq!(s.emitter(id).unwrap().write_cursor(), 0);
    }

    #[test]
    fn test_nan_elapsed_is_paused() {
        let mut s = system();
        let id = s
            .push_emitter(EmitterOptions::new("n").with_capacity(100).with_spawn_rate(1000.0))
            .unwrap();
        let stats = s.update(&FrameContext::new(f64::NAN, 2.0)).unwrap();
        assert!(stats.paused);
        assert_eq!(stats.spawned, 0);
        assert_eq!(s.emitter(id).unwrap().write_cursor(), 0);
        assert_eq!(s.shading().unwrap().borrow().uniforms.time, 2.0);
    }

    #[test]
    fn test_rate_floor() {
        let mut s = system();
        s.push_emitter(EmitterOptions::new("r").with_spawn_rate(100.0)).unwrap();
        let stats = s.update(&FrameContext::new(0.016, 0.016)).unwrap();
        assert_eq!(stats.spawned, 1);
        assert_eq!(stats.throttled, 0);
    }

    #[test]
    fn test_paused_frame_only_touches_uniforms() {
        let mut s = system();
        let id = s.push_emitter(EmitterOptions::default()).unwrap();
        let stats = s.update(&FrameContext::new(0.0, 3.5)).unwrap();
        assert!(stats.paused);
        assert_eq!(stats.spawned, 0);
        assert_eq!(s.emitter(id).unwrap().write_cursor(), 0);
        assert_eq!(s.shading().unwrap().borrow().uniforms.time, 3.5);
    }

    #[test]
    fn test_time_scale() {
        let mut s = system().with_time_scale(0.5);
        s.push_emitter(EmitterOptions::default().with_spawn_rate(100.0)).unwrap();
        let stats = s.update(&FrameContext::new(0.1, 1.0)).unwrap();
        assert_eq!(stats.spawned, 5);

        s.set_time_scale(-2.0);
        assert_eq!(s.time_scale(), 0.0);
        assert!(s.update(&FrameContext::new(0.1, 1.1)).unwrap().paused);
    }

    #[test]
    fn test_invisible_emitters_skipped() {
        let mut s = system();
        let id = s.push_emitter(EmitterOptions::default().with_visible(false)).unwrap();
        let stats = s.update(&FrameContext::new(1.0, 1.0)).unwrap();
        assert_eq!(stats.spawned, 0);
        assert!(!s.emitter(id).unwrap().is_dirty());
    }

    #[test]
    fn test_missing_shading() {
        let mut s = ParticleSystem::new().with_seed(1);
        s.push_emitter(EmitterOptions::new("lonely")).unwrap();
        assert!(matches!(
            s.update(&FrameContext::new(0.1, 0.1)),
            Err(ParticleError::MissingShadingState { .. })
        ));
    }

    #[test]
    fn test_late_emitters_share_shading() {
        let mut s = system();
        let id = s.add_emitter(&EmitterConfig::default()).unwrap();
        let emitter_shading = s.emitter(id).unwrap().shading().unwrap();
        assert!(Rc::ptr_eq(emitter_shading, s.shading().unwrap()));
    }

    #[test]
    fn test_unknown_emitter() {
        let s = system();
        assert!(matches!(
            s.emitter(EmitterId::new(4)),
            Err(ParticleError::UnknownEmitter(4))
        ));
    }

    #[test]
    fn test_add_emitter_merges_defaults() {
        let mut s = system().with_defaults(EmitterOptions::default().with_spawn_rate(7.0));
        let id = s
            .add_emitter(&EmitterConfig {
                name: Some("merged".into()),
                ..Default::default()
            })
            .unwrap();
        let e = s.emitter(id).unwrap();
        assert_eq!(e.name(), "merged");
        assert_eq!(e.spawn_rate(), 7.0);
    }

    #[test]
    fn test_from_config() {
        let config = SystemConfig::from_json(
            r#"{
                "time_scale": 2.0,
                "seed": 5,
                "defaults": { "capacity": 50 },
                "emitters": [{ "name": "a" }, { "name": "b", "capacity": 10 }]
            }"#,
        )
        .unwrap();
        let s = ParticleSystem::from_config(&config).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.time_scale(), 2.0);
        let caps: Vec<usize> = s.emitters().map(|(_, e)| e.capacity()).collect();
        assert_eq!(caps, vec![50, 10]);
    }

    #[test]
    fn test_sync_rebuild_then_upload() {
        let mut s = system();
        let id = s
            .push_emitter(EmitterOptions::new("s").with_capacity(10).with_spawn_rate(100.0))
            .unwrap();
        let mut sink = RecordingSink::new();

        let first = s.sync(&mut sink);
        assert_eq!(first.rebuilt_channels, 3);
        assert_eq!(first.floats, 90);

        sink.clear_events();
        s.update(&FrameContext::new(0.02, 0.02)).unwrap();
        let second = s.sync(&mut sink);
        assert_eq!(second.uploads, 3);
        assert_eq!(second.floats, 18);
        assert!(sink.events().contains(&SinkEvent::Upload {
            emitter: id,
            channel: Channel::PositionVelocity,
            range: crate::emitter::DirtyRange::new(0, 8),
        }));

        // Nothing pending: only the uniforms go out.
        sink.clear_events();
        assert_eq!(s.sync(&mut sink), SyncStats::default());
        assert!(matches!(sink.events(), [SinkEvent::Uniforms(_)]));
    }

    #[test]
    fn test_update_emitter_capacity_triggers_rebuild() {
        let mut s = system();
        let id = s.push_emitter(EmitterOptions::new("grow").with_capacity(10)).unwrap();
        let mut sink = RecordingSink::new();
        s.sync(&mut sink);

        s.update_emitter(
            id,
            &EmitterConfig {
                capacity: Some(20),
                ..Default::default()
            },
        )
        .unwrap();
        sink.clear_events();
        s.sync(&mut sink);
        assert!(sink.events().contains(&SinkEvent::Rebuild {
            emitter: id,
            generation: 2,
            channel: Channel::Color,
            len: 40,
        }));
    }
}
