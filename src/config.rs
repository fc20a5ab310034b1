//! JSON configuration for particle systems.
//!
//! Every field of an [`EmitterConfig`] is optional: a config is an override
//! merged onto existing [`EmitterOptions`], so a document only names what
//! differs from the system defaults.
//!
//! ```json
//! {
//!   "time_scale": 1.0,
//!   "seed": 42,
//!   "emitters": [
//!     {
//!       "name": "fire",
//!       "capacity": 20000,
//!       "spawn_rate": 2000,
//!       "position": { "path": "lissajous", "horizontal_speed": 1.5,
//!                     "vertical_speed": 1.33, "amplitude": [20, 10, 5] },
//!       "lifetime": { "value": 1.2, "distribution": 0.4 },
//!       "color": { "value": "#ffb347", "end": "#400000" },
//!       "size": 0.3
//!     }
//!   ]
//! }
//! ```
//!
//! A value is either bare (`1.5`, `[0, 1, 0]`, `"#ff0000"`), which replaces
//! the base and keeps distribution and transform, or detailed, where each
//! present key overrides one part of the spec.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParticleError, Result};
use crate::options::{EmitterOptions, EmitterPath};
use crate::value::{EndDraw, Transform, Value, ValueKind, ValueShape, ValueSpec};

/// Top-level configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    /// Multiplier applied to every frame's elapsed time.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    /// Seed for the spawn RNG. Omit for entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Overrides applied to the built-in defaults before any emitter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<EmitterConfig>,
    #[serde(default)]
    pub emitters: Vec<EmitterConfig>,
}

fn default_time_scale() -> f64 {
    1.0
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            seed: None,
            defaults: None,
            emitters: Vec::new(),
        }
    }
}

impl SystemConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Partial override of [`EmitterOptions`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Signed so that bad input reports the value instead of failing to parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<ValueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_position: Option<ValueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_velocity: Option<ValueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turbulence: Option<ValueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<ValueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ValueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<ValueConfig>,
}

impl EmitterConfig {
    /// Deep-merge this override onto `base`, returning the merged options.
    ///
    /// `base` is left untouched if any field fails to convert.
    pub fn apply_to(&self, base: &EmitterOptions) -> Result<EmitterOptions> {
        let mut opts = base.clone();

        if let Some(name) = &self.name {
            opts.name = name.clone();
        }
        if let Some(visible) = self.visible {
            opts.visible = visible;
        }
        if let Some(capacity) = self.capacity {
            opts.capacity = checked_capacity(capacity)?;
        }
        if let Some(rate) = self.spawn_rate {
            opts.spawn_rate = rate.max(0.0);
        }
        match &self.position {
            Some(PositionConfig::Path(path)) => opts.emitter_position = path.to_spec(),
            Some(PositionConfig::Value(v)) => v.merge_into(&mut opts.emitter_position)?,
            None => {}
        }

        merge(&self.lifetime, &mut opts.lifetime)?;
        merge(&self.initial_position, &mut opts.initial_position)?;
        merge(&self.initial_velocity, &mut opts.initial_velocity)?;
        merge(&self.turbulence, &mut opts.turbulence_over_life)?;
        merge(&self.size, &mut opts.size_over_life)?;
        merge(&self.color, &mut opts.color_over_life)?;
        merge(&self.opacity, &mut opts.opacity_over_life)?;

        Ok(opts)
    }
}

fn merge<T: ValueShape>(config: &Option<ValueConfig>, spec: &mut ValueSpec<T>) -> Result<()> {
    match config {
        Some(c) => c.merge_into(spec),
        None => Ok(()),
    }
}

fn checked_capacity(capacity: i64) -> Result<usize> {
    if capacity <= 0 {
        return Err(ParticleError::InvalidCapacity(capacity));
    }
    usize::try_from(capacity).map_err(|_| ParticleError::InvalidCapacity(capacity))
}

/// Emitter position: a named path or a plain value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionConfig {
    Value(ValueConfig),
    Path(EmitterPath),
}

/// A value override, bare or detailed.
///
/// `Bare` is tried first: serde would otherwise accept a JSON array as a
/// positional `ValueDetail`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueConfig {
    Bare(ValueInput),
    Detailed(ValueDetail),
}

impl ValueConfig {
    pub fn merge_into<T: ValueShape>(&self, spec: &mut ValueSpec<T>) -> Result<()> {
        match self {
            ValueConfig::Bare(input) => spec.set_constant(input.resolve()?),
            ValueConfig::Detailed(detail) => {
                if let Some(value) = &detail.value {
                    spec.set_constant(value.resolve()?);
                }
                if let Some(end) = &detail.end {
                    spec.set_end(end.resolve()?);
                }
                if let Some(distribution) = detail.distribution {
                    spec.set_distribution(distribution);
                }
                if let Some(transform) = detail.transform {
                    spec.set_transform(transform);
                }
                if let Some(end_draw) = detail.end_draw {
                    spec.set_end_draw(end_draw);
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValueDetail {
    /// START base (and END, unless `end` is given).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<ValueInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_draw: Option<EndDraw>,
}

/// Raw value as written in JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueInput {
    Number(f32),
    /// Two or three components.
    Array(Vec<f32>),
    /// `"#rrggbb"` or `"0xrrggbb"`.
    Text(String),
}

impl ValueInput {
    /// Untyped value this input denotes.
    pub fn to_value(&self) -> Result<Value> {
        match self {
            ValueInput::Number(v) => Ok(Value::Scalar(*v)),
            ValueInput::Array(v) => match v.as_slice() {
                [x, y] => Ok(Value::Vec2(glam::Vec2::new(*x, *y))),
                [x, y, z] => Ok(Value::Vec3(glam::Vec3::new(*x, *y, *z))),
                _ => Err(ParticleError::unsupported(ValueKind::Vec3, v)),
            },
            ValueInput::Text(s) => parse_hex_color(s)
                .map(|hex| Value::Color(crate::value::Color::from_hex(hex)))
                .ok_or_else(|| ParticleError::unsupported(ValueKind::Color, s)),
        }
    }

    /// Narrow to shape `T`.
    pub fn resolve<T: ValueShape>(&self) -> Result<T> {
        T::from_value(self.to_value()?)
    }
}

impl From<f32> for ValueInput {
    fn from(v: f32) -> Self {
        ValueInput::Number(v)
    }
}

fn parse_hex_color(s: &str) -> Option<u32> {
    let digits = s
        .strip_prefix('#')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))?;
    if digits.is_empty() || digits.len() > 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
