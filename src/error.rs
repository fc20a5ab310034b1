//! Error types for ember.
//!
//! Every error here signals a configuration or integration bug in the caller.
//! Nothing is retried: the core performs no I/O, so there is no transient
//! failure mode, and continuing with half-initialized channels would corrupt
//! the packed stream silently.

use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised by value evaluation, emitters and the particle system.
#[derive(Debug, Error)]
pub enum ParticleError {
    /// A value resolved to a shape the requested evaluator cannot interpret.
    #[error("unsupported value shape: expected {expected:?}, found {found}")]
    UnsupportedValueShape {
        /// Shape the evaluator was asked for.
        expected: ValueKind,
        /// Description of the offending value.
        found: String,
    },

    /// An emitter was asked to spawn or update before shading state was attached.
    #[error("emitter '{emitter}' has no shading state attached")]
    MissingShadingState {
        /// Name of the emitter.
        emitter: String,
    },

    /// A capacity of zero (or a negative one from configuration) was requested.
    #[error("invalid particle capacity {0}: must be at least 1")]
    InvalidCapacity(i64),

    /// No emitter exists for the given id.
    #[error("no emitter with id {0}")]
    UnknownEmitter(usize),

    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ParticleError {
    pub(crate) fn unsupported(expected: ValueKind, found: impl std::fmt::Debug) -> Self {
        ParticleError::UnsupportedValueShape {
            expected,
            found: format!("{found:?}"),
        }
    }
}

/// Errors that can occur while acquiring a GPU device.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; ensure the system has a GPU with WebGPU/Vulkan/Metal/DX12 support")]
    NoAdapter,

    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
}

/// Result type using [`ParticleError`].
pub type Result<T> = std::result::Result<T, ParticleError>;
