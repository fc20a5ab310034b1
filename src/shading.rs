//! Shading state shared by every emitter of a particle system.
//!
//! The core never touches shaders or textures itself. It only needs to know
//! that a material exists (emitters refuse to spawn without one) and to keep
//! the shared uniform block current.

use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

/// Uniform block read by the particle vertex shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleUniforms {
    /// Cumulative simulation time in seconds.
    pub time: f32,
    /// Global particle size multiplier.
    pub scale: f32,
    pub _padding: [f32; 2],
}

impl Default for ParticleUniforms {
    fn default() -> Self {
        Self {
            time: 0.0,
            scale: 1.0,
            _padding: [0.0; 2],
        }
    }
}

/// Opaque id of a resource owned by the renderer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u64);

/// Ready-to-bind resources handed over by the asset layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShadingHandles {
    pub shader: ResourceHandle,
    pub noise_texture: ResourceHandle,
    pub sprite_texture: ResourceHandle,
}

/// Material state shared by all emitters of one system.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadingState {
    pub handles: ShadingHandles,
    pub uniforms: ParticleUniforms,
}

impl ShadingState {
    pub fn new(handles: ShadingHandles) -> Self {
        Self {
            handles,
            uniforms: ParticleUniforms::default(),
        }
    }
}

/// Shading state as held by the system and its emitters.
pub type SharedShading = Rc<RefCell<ShadingState>>;
