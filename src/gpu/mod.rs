//! wgpu backend for particle channels.
//!
//! [`GpuParticleSink`] owns one vertex buffer per emitter channel plus the
//! shared uniform buffer. Rebuilds create fresh buffers from the full channel
//! contents; dirty ranges are written in place with `Queue::write_buffer`.
//!
//! Pipelines, bind groups and draw calls belong to the renderer. It binds the
//! buffers returned by [`GpuParticleSink::buffer`] with
//! [`vertex_buffer_layouts`] and decodes them with [`VERTEX_INPUT_WGSL`].

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::emitter::{Channel, DirtyRange};
use crate::error::GpuError;
use crate::packing::UNPACK_WGSL;
use crate::shading::ParticleUniforms;
use crate::sink::ParticleSink;
use crate::system::EmitterId;

/// Bytes per float in every channel.
const FLOAT_SIZE: wgpu::BufferAddress = std::mem::size_of::<f32>() as wgpu::BufferAddress;

static POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
static POSITION_VELOCITY_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![1 => Float32x4];
static COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];

/// Per-instance layouts for the three channels, in [`Channel::ALL`] order.
///
/// Each particle is one instance; bind the channel buffers to vertex slots
/// 0, 1 and 2.
pub fn vertex_buffer_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    Channel::ALL.map(|channel| wgpu::VertexBufferLayout {
        array_stride: channel.stride() as wgpu::BufferAddress * FLOAT_SIZE,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: match channel {
            Channel::Position => &POSITION_ATTRIBUTES,
            Channel::PositionVelocity => &POSITION_VELOCITY_ATTRIBUTES,
            Channel::Color => &COLOR_ATTRIBUTES,
        },
    })
}

/// Vertex inputs matching [`vertex_buffer_layouts`] and a decoder into
/// per-particle values. Relies on [`UNPACK_WGSL`], which [`vertex_shader_prelude`]
/// prepends.
pub const VERTEX_INPUT_WGSL: &str = r#"
struct ParticleInput {
    @location(0) timing: vec3<f32>,
    @location(1) position_velocity: vec4<f32>,
    @location(2) colors: vec2<f32>,
};

struct Particle {
    position: vec3<f32>,
    velocity: vec3<f32>,
    spawn_time: f32,
    lifetime: f32,
    size: vec2<f32>,
    turbulence: vec2<f32>,
    color_start: vec4<f32>,
    color_end: vec4<f32>,
};

fn decode_particle(attrs: ParticleInput) -> Particle {
    var p: Particle;
    p.position = attrs.position_velocity.xyz;
    p.velocity = unpack_velocity(attrs.position_velocity.w);
    p.spawn_time = attrs.timing.x;
    p.lifetime = attrs.timing.y;
    let size_turb = unpack_unorm(attrs.timing.z);
    p.size = size_turb.xy;
    p.turbulence = size_turb.zw;
    p.color_start = unpack_unorm(attrs.colors.x);
    p.color_end = unpack_unorm(attrs.colors.y);
    return p;
}

// Normalized age in [0, 1]; above 1 once expired or never spawned.
fn particle_age(p: Particle, now: f32) -> f32 {
    return (now - p.spawn_time) / max(p.lifetime, 1e-6);
}
"#;

/// WGSL the renderer prepends to its particle vertex shader.
pub fn vertex_shader_prelude() -> String {
    format!("{UNPACK_WGSL}\n{VERTEX_INPUT_WGSL}")
}

/// Device and queue used by the sink.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Acquire a device without a surface.
    pub async fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Particle Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let adapter_info = adapter.get_info();
        log::info!(
            "using GPU adapter '{}' ({:?})",
            adapter_info.name,
            adapter_info.backend
        );
        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Blocking variant of [`headless`](Self::headless).
    pub fn headless_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::headless())
    }
}

struct ChannelBuffer {
    buffer: wgpu::Buffer,
    generation: u64,
    len: usize,
}

/// [`ParticleSink`] writing into wgpu buffers.
pub struct GpuParticleSink {
    context: GpuContext,
    buffers: HashMap<(EmitterId, Channel), ChannelBuffer>,
    uniform_buffer: wgpu::Buffer,
}

impl GpuParticleSink {
    pub fn new(context: GpuContext) -> Self {
        let uniform_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Uniform Buffer"),
                contents: bytemuck::bytes_of(&ParticleUniforms::default()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        Self {
            context,
            buffers: HashMap::new(),
            uniform_buffer,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Vertex buffer of one channel, once rebuilt.
    pub fn buffer(&self, emitter: EmitterId, channel: Channel) -> Option<&wgpu::Buffer> {
        self.buffers.get(&(emitter, channel)).map(|b| &b.buffer)
    }

    /// Uniform buffer holding [`ParticleUniforms`].
    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.uniform_buffer
    }
}

impl ParticleSink for GpuParticleSink {
    fn rebuild(&mut self, emitter: EmitterId, generation: u64, channel: Channel, data: &[f32]) {
        let key = (emitter, channel);
        if let Some(existing) = self.buffers.get(&key) {
            if existing.generation == generation && existing.len == data.len() {
                self.context
                    .queue
                    .write_buffer(&existing.buffer, 0, bytemuck::cast_slice(data));
                return;
            }
        }

        let label = format!("{:?} {}", emitter, channel.attribute_name());
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        log::debug!("created buffer '{}' ({} floats, generation {})", label, data.len(), generation);
        self.buffers.insert(
            key,
            ChannelBuffer {
                buffer,
                generation,
                len: data.len(),
            },
        );
    }

    fn upload(&mut self, emitter: EmitterId, channel: Channel, range: DirtyRange, data: &[f32]) {
        let Some(target) = self.buffers.get(&(emitter, channel)) else {
            log::warn!(
                "dropping upload for {:?}/{}: buffer not built",
                emitter,
                channel.attribute_name()
            );
            return;
        };
        debug_assert!(range.end() <= target.len);
        self.context.queue.write_buffer(
            &target.buffer,
            range.offset as wgpu::BufferAddress * FLOAT_SIZE,
            bytemuck::cast_slice(data),
        );
    }

    fn uniforms(&mut self, uniforms: &ParticleUniforms) {
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_strides_match_channels() {
        let layouts = vertex_buffer_layouts();
        let strides: Vec<u64> = layouts.iter().map(|l| l.array_stride).collect();
        assert_eq!(strides, vec![12, 16, 8]);
        for (i, layout) in layouts.iter().enumerate() {
            assert_eq!(layout.attributes.len(), 1);
            assert_eq!(layout.attributes[0].shader_location, i as u32);
            assert_eq!(layout.attributes[0].offset, 0);
        }
    }

    #[test]
    fn test_vertex_prelude_validates() {
        let source = format!(
            "{}\n{}",
            vertex_shader_prelude(),
            r#"
@vertex
fn vs_main(attrs: ParticleInput) -> @builtin(position) vec4<f32> {
    let p = decode_particle(attrs);
    let age = particle_age(p, 1.0);
    return vec4<f32>(p.position + p.velocity * age, p.color_start.a);
}
"#
        );
        let module = naga::front::wgsl::parse_str(&source).expect("parse");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).expect("vertex prelude should validate");
    }
}
