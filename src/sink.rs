//! Destination for packed particle channels.
//!
//! [`ParticleSystem::sync`](crate::ParticleSystem::sync) drives a
//! [`ParticleSink`]: channels of newly (re)allocated emitters arrive through
//! [`rebuild`](ParticleSink::rebuild), dirty sub-ranges of existing ones
//! through [`upload`](ParticleSink::upload).
//!
//! [`RecordingSink`] keeps an in-memory mirror of everything it receives. The
//! wgpu-backed sink lives in [`gpu`](crate::gpu).

use std::collections::HashMap;

use crate::emitter::{Channel, DirtyRange};
use crate::shading::ParticleUniforms;
use crate::system::EmitterId;

/// Receiver of channel data and uniforms.
pub trait ParticleSink {
    /// Replace the whole buffer of `channel` with `data`.
    ///
    /// `generation` increases every time the emitter reallocates.
    fn rebuild(&mut self, emitter: EmitterId, generation: u64, channel: Channel, data: &[f32]);

    /// Overwrite `range` of an existing buffer. `data` holds exactly the
    /// floats of that range.
    fn upload(&mut self, emitter: EmitterId, channel: Channel, range: DirtyRange, data: &[f32]);

    /// Current shared uniform block.
    fn uniforms(&mut self, uniforms: &ParticleUniforms);
}

/// One call received by a [`RecordingSink`].
#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    Rebuild {
        emitter: EmitterId,
        generation: u64,
        channel: Channel,
        len: usize,
    },
    Upload {
        emitter: EmitterId,
        channel: Channel,
        range: DirtyRange,
    },
    Uniforms(ParticleUniforms),
}

/// In-memory sink mirroring every buffer it is sent.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<SinkEvent>,
    buffers: HashMap<(EmitterId, Channel), Vec<f32>>,
    uniforms: ParticleUniforms,
    uploaded_floats: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Forget recorded events; mirrored buffers are kept.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Mirror of one channel, `None` if it was never rebuilt.
    pub fn buffer(&self, emitter: EmitterId, channel: Channel) -> Option<&[f32]> {
        self.buffers.get(&(emitter, channel)).map(Vec::as_slice)
    }

    pub fn last_uniforms(&self) -> &ParticleUniforms {
        &self.uniforms
    }

    /// Floats received through uploads and rebuilds since creation.
    pub fn uploaded_floats(&self) -> usize {
        self.uploaded_floats
    }

    pub fn upload_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Upload { .. }))
            .count()
    }
}

impl ParticleSink for RecordingSink {
    fn rebuild(&mut self, emitter: EmitterId, generation: u64, channel: Channel, data: &[f32]) {
        self.buffers.insert((emitter, channel), data.to_vec());
        self.uploaded_floats += data.len();
        self.events.push(SinkEvent::Rebuild {
            emitter,
            generation,
            channel,
            len: data.len(),
        });
    }

    fn upload(&mut self, emitter: EmitterId, channel: Channel, range: DirtyRange, data: &[f32]) {
        match self.buffers.get_mut(&(emitter, channel)) {
            Some(buffer) if range.end() <= buffer.len() => {
                buffer[range.offset..range.end()].copy_from_slice(data);
            }
            _ => {
                log::warn!(
                    "upload to {:?}/{} outside any rebuilt buffer: {:?}",
                    emitter,
                    channel.attribute_name(),
                    range
                );
                return;
            }
        }
        self.uploaded_floats += data.len();
        self.events.push(SinkEvent::Upload {
            emitter,
            channel,
            range,
        });
    }

    fn uniforms(&mut self, uniforms: &ParticleUniforms) {
        self.uniforms = *uniforms;
        self.events.push(SinkEvent::Uniforms(*uniforms));
    }
}
