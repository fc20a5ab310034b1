//! # ember - emitter-driven GPU particles
//!
//! Continuous particle emission with a compact, GPU-ready memory layout.
//!
//! ember keeps the CPU side of a particle system small: each emitter owns a
//! ring buffer of packed vertex channels, spawns into it at a configurable
//! rate, and reports exactly which slots changed so only that range is
//! uploaded. Animation over a particle's life happens in the vertex shader,
//! which decodes the packed bytes.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ember::prelude::*;
//!
//! let mut system = ParticleSystem::new();
//! system.attach_shading(ShadingState::new(handles));
//! system.push_emitter(
//!     EmitterOptions::new("fire")
//!         .with_capacity(20_000)
//!         .with_spawn_rate(2_000.0)
//!         .with_path(EmitterPath::projectile())
//!         .with_color(ValueSpec::range(Color::from_hex(0xFFB347), Color::from_hex(0x400000))),
//! )?;
//!
//! let mut time = Time::new();
//! let mut sink = RecordingSink::new();
//! loop {
//!     system.update(&time.update())?;
//!     system.sync(&mut sink);
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Values
//!
//! Every particle attribute is a [`ValueSpec`]: a base (constant, start/end
//! pair, or computed from the frame), a random distribution around it and a
//! transform that turns it into whole bytes. See [`value`].
//!
//! ### Emitters
//!
//! An [`Emitter`] writes particles into three float channels:
//!
//! | Channel | Stride | Contents |
//! |---------|--------|----------|
//! | `position` | 3 | spawn time, lifetime, packed size/turbulence |
//! | `particlePositionAndVel` | 4 | x, y, z, packed velocity |
//! | `particleColor` | 2 | packed start and end RGBA |
//!
//! Packing folds four bytes into one float bit pattern, see [`packing`].
//!
//! ### Systems
//!
//! A [`ParticleSystem`] owns emitters, decides how many particles each spawns
//! per frame and pushes the results into a [`ParticleSink`]. Systems can be
//! described in JSON, see [`config`].
//!
//! ## Feature Overview
//!
//! | Area | Types |
//! |------|-------|
//! | Values | [`ValueSpec`], [`Transform`], [`EndDraw`], [`Color`] |
//! | Emission | [`Emitter`], [`EmitterOptions`], [`EmitterPath`] |
//! | Frames | [`FrameContext`], [`Time`] |
//! | Output | [`ParticleSink`], [`RecordingSink`], [`gpu::GpuParticleSink`] |

pub mod config;
pub mod emitter;
mod error;
pub mod gpu;
pub mod options;
pub mod packing;
pub mod shading;
pub mod sink;
mod system;
pub mod time;
pub mod value;

pub use config::{EmitterConfig, SystemConfig};
pub use emitter::{Channel, DirtyRange, Emitter, Flush, ParticleRecord};
pub use error::{GpuError, ParticleError, Result};
pub use glam::{Vec2, Vec3};
pub use options::{EmitterOptions, EmitterPath};
pub use shading::{ParticleUniforms, ResourceHandle, ShadingHandles, ShadingState, SharedShading};
pub use sink::{ParticleSink, RecordingSink};
pub use system::{EmitterId, FrameStats, ParticleSystem, SyncStats};
pub use time::{FrameContext, Time};
pub use value::{Color, EndDraw, Transform, Value, ValueSpec};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use ember::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{EmitterConfig, SystemConfig};
    pub use crate::emitter::{Channel, Emitter};
    pub use crate::options::{EmitterOptions, EmitterPath};
    pub use crate::shading::{ResourceHandle, ShadingHandles, ShadingState};
    pub use crate::sink::{ParticleSink, RecordingSink};
    pub use crate::system::{EmitterId, ParticleSystem};
    pub use crate::time::{FrameContext, Time};
    pub use crate::value::{Color, EndDraw, Transform, ValueSpec};
    pub use crate::{Vec2, Vec3};
}
