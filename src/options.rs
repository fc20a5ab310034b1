//! Emitter configuration.
//!
//! [`EmitterOptions`] holds one [`ValueSpec`] per animatable attribute plus a
//! handful of scalar settings. The [`Default`] values describe a small
//! orange-to-cyan puff emitted at the origin; the owning
//! [`ParticleSystem`](crate::ParticleSystem) keeps a copy of them and merges
//! per-emitter overrides on top.
//!
//! # Example
//!
//! ```ignore
//! let opts = EmitterOptions::new("sparks")
//!     .with_capacity(5_000)
//!     .with_spawn_rate(800.0)
//!     .with_path(EmitterPath::Circle { radius: 10.0, angular_speed: 1.5, height: 0.0 })
//!     .with_lifetime(ValueSpec::new(1.2).with_distribution(0.4));
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::value::{Color, Transform, Value, ValueSpec};

/// Everything an emitter needs to spawn particles.
#[derive(Clone, Debug)]
pub struct EmitterOptions {
    pub name: String,
    pub visible: bool,
    /// Number of particle slots in the ring buffer.
    pub capacity: usize,
    /// Particles per second.
    pub spawn_rate: f32,
    /// Offset added to every spawned position. Usually constant, or a path
    /// computed from the frame context.
    pub emitter_position: ValueSpec<Vec3>,
    /// Seconds.
    pub lifetime: ValueSpec<f32>,
    pub initial_position: ValueSpec<Vec3>,
    /// Whole values in -127..=127 after the transform.
    pub initial_velocity: ValueSpec<Vec3>,
    pub turbulence_over_life: ValueSpec<f32>,
    pub size_over_life: ValueSpec<f32>,
    pub color_over_life: ValueSpec<Color>,
    pub opacity_over_life: ValueSpec<f32>,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            name: "particle emitter".to_string(),
            visible: true,
            capacity: 1000,
            spawn_rate: 100.0,
            emitter_position: ValueSpec::new(Vec3::ZERO),
            lifetime: ValueSpec::new(2.0).with_distribution(0.5),
            initial_position: ValueSpec::new(Vec3::ZERO).with_distribution(0.5),
            initial_velocity: ValueSpec::new(Vec3::ZERO).with_transform(Transform::SIGNED_BYTE),
            turbulence_over_life: ValueSpec::new(0.0).with_transform(Transform::BYTE),
            size_over_life: ValueSpec::range(0.2, 1.0)
                .with_distribution(0.3)
                .with_transform(Transform::BYTE),
            color_over_life: ValueSpec::range(Color::from_hex(0xE65A46), Color::from_hex(0x00FFFF)),
            opacity_over_life: ValueSpec::range(1.0, 0.0).with_transform(Transform::BYTE),
        }
    }
}

impl EmitterOptions {
    /// Default options with a different name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_spawn_rate(mut self, spawn_rate: f32) -> Self {
        self.spawn_rate = spawn_rate;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_position(mut self, position: ValueSpec<Vec3>) -> Self {
        self.emitter_position = position;
        self
    }

    /// Move the emitter along a predefined path.
    pub fn with_path(mut self, path: EmitterPath) -> Self {
        self.emitter_position = path.to_spec();
        self
    }

    pub fn with_lifetime(mut self, lifetime: ValueSpec<f32>) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_initial_position(mut self, spec: ValueSpec<Vec3>) -> Self {
        self.initial_position = spec;
        self
    }

    pub fn with_initial_velocity(mut self, spec: ValueSpec<Vec3>) -> Self {
        self.initial_velocity = spec;
        self
    }

    pub fn with_turbulence(mut self, spec: ValueSpec<f32>) -> Self {
        self.turbulence_over_life = spec;
        self
    }

    pub fn with_size(mut self, spec: ValueSpec<f32>) -> Self {
        self.size_over_life = spec;
        self
    }

    pub fn with_color(mut self, spec: ValueSpec<Color>) -> Self {
        self.color_over_life = spec;
        self
    }

    pub fn with_opacity(mut self, spec: ValueSpec<f32>) -> Self {
        self.opacity_over_life = spec;
        self
    }
}

/// Time-parametric emitter positions.
///
/// Each path becomes a computed [`ValueSpec`] reading
/// [`FrameContext::cumulative_time`](crate::time::FrameContext).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case", deny_unknown_fields)]
pub enum EmitterPath {
    /// Sine on every axis; `z` is phase-shifted by the vertical speed.
    Lissajous {
        horizontal_speed: f32,
        vertical_speed: f32,
        amplitude: [f32; 3],
    },
    /// Circle in the XZ plane.
    Circle {
        radius: f32,
        angular_speed: f32,
        height: f32,
    },
}

impl EmitterPath {
    /// The projectile path used by the original fire demo.
    pub fn projectile() -> Self {
        EmitterPath::Lissajous {
            horizontal_speed: 1.5,
            vertical_speed: 1.33,
            amplitude: [20.0, 10.0, 5.0],
        }
    }

    /// Position at `t` seconds of simulation time.
    pub fn position_at(&self, t: f64) -> Vec3 {
        let t = t as f32;
        match *self {
            EmitterPath::Lissajous {
                horizontal_speed,
                vertical_speed,
                amplitude,
            } => Vec3::new(
                (t * horizontal_speed).sin() * amplitude[0],
                (t * vertical_speed).sin() * amplitude[1],
                (t * horizontal_speed + vertical_speed).sin() * amplitude[2],
            ),
            EmitterPath::Circle {
                radius,
                angular_speed,
                height,
            } => {
                let angle = t * angular_speed;
                Vec3::new(angle.cos() * radius, height, angle.sin() * radius)
            }
        }
    }

    pub fn to_spec(&self) -> ValueSpec<Vec3> {
        let path = self.clone();
        ValueSpec::computed(move |ctx| Value::Vec3(path.position_at(ctx.cumulative_time)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FrameContext;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults() {
        let opts = EmitterOptions::default();
        assert_eq!(opts.name, "particle emitter");
        assert!(opts.visible);
        assert_eq!(opts.capacity, 1000);
        assert_eq!(opts.spawn_rate, 100.0);
        assert_eq!(opts.lifetime.distribution(), 0.5);
        assert_eq!(*opts.size_over_life.transform(), Transform::BYTE);
    }

    #[test]
    fn test_default_pairs() {
        let opts = EmitterOptions::default();
        let ctx = FrameContext::default();
        let mut rng = SmallRng::seed_from_u64(1);

        let (op_start, op_end) = opts.opacity_over_life.start_end(&ctx, &mut rng).unwrap();
        assert_eq!((op_start, op_end), (255.0, 0.0));

        let (c_start, c_end) = opts.color_over_life.start_end(&ctx, &mut rng).unwrap();
        assert_eq!(c_start.channels(), [230.0, 90.0, 70.0]);
        assert_eq!(c_end.channels(), [0.0, 255.0, 255.0]);
    }

    #[test]
    fn test_builder() {
        let opts = EmitterOptions::new("jets")
            .with_capacity(64)
            .with_spawn_rate(10.0)
            .with_visible(false);
        assert_eq!(opts.name, "jets");
        assert_eq!(opts.capacity, 64);
        assert!(!opts.visible);
    }

    #[test]
    fn test_circle_path() {
        let path = EmitterPath::Circle {
            radius: 2.0,
            angular_speed: 1.0,
            height: 3.0,
        };
        let p = path.position_at(0.0);
        assert!((p - Vec3::new(2.0, 3.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_path_spec_follows_time() {
        let spec = EmitterPath::projectile().to_spec();
        let mut rng = SmallRng::seed_from_u64(1);
        let a = spec.value(&FrameContext::new(0.0, 0.0), &mut rng).unwrap();
        let b = spec.value(&FrameContext::new(0.0, 1.0), &mut rng).unwrap();
        assert_eq!(a.x, 0.0);
        assert_ne!(a, b);
        assert!((b - EmitterPath::projectile().position_at(1.0)).length() < 1e-5);
    }
}
