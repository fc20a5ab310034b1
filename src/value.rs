//! Per-attribute value generation.
//!
//! A [`ValueSpec`] describes how a particle attribute is produced at spawn
//! time: a base value (constant, start/end pair, or computed from the frame
//! context), a random distribution around it and a transform pipeline.
//!
//! # Randomization
//!
//! `distribution` is a full width. Each component draws `r` uniformly in
//! `[-1, 1]` and becomes `base + r * distribution / 2`.
//!
//! # Transform
//!
//! Applied after randomization, always in this order:
//!
//! | Step | Effect |
//! |------|--------|
//! | multiply | `v *= multiplier` |
//! | clamp min | `v = v.max(clamp_min)` |
//! | clamp max | `v = v.min(clamp_max)` |
//! | integer | `v = v.floor()` |
//!
//! Colors ignore a `ValueSpec`'s transform and always use [`Transform::COLOR`]:
//! base channels are normalized 0..1, evaluated channels are whole numbers in
//! 0..=255 ready for [`pack`](crate::packing::pack).
//!
//! # Example
//!
//! ```ignore
//! let size = ValueSpec::range(0.2, 1.0)
//!     .with_distribution(0.3)
//!     .with_transform(Transform::BYTE);
//! let (start, end) = size.start_end(&ctx, &mut rng)?;
//! ```

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ParticleError, Result};
use crate::time::FrameContext;

/// RGB color. Base colors are normalized (0..1); evaluated colors hold 0..=255.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Color from a `0xRRGGBB` value.
    pub fn from_hex(hex: u32) -> Self {
        Self::from_rgb8(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// Color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Channels as `[r, g, b]`.
    pub fn channels(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    fn map(self, mut f: impl FnMut(f32) -> f32) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }
}

/// Tag of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Vec2,
    Vec3,
    Color,
}

/// A value of any supported shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Scalar(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Color(Color),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Vec2(_) => ValueKind::Vec2,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Color(_) => ValueKind::Color,
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vec2(v)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Value::Vec3(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

/// Post-randomization pipeline: multiply, clamp min, clamp max, floor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Transform {
    pub multiplier: Option<f32>,
    pub clamp_min: Option<f32>,
    pub clamp_max: Option<f32>,
    pub truncate_to_integer: bool,
}

impl Transform {
    /// Identity transform.
    pub const NONE: Transform = Transform {
        multiplier: None,
        clamp_min: None,
        clamp_max: None,
        truncate_to_integer: false,
    };

    /// Normalized 0..1 input to a whole byte value.
    pub const BYTE: Transform = Transform {
        multiplier: Some(255.0),
        clamp_min: Some(0.0),
        clamp_max: Some(255.0),
        truncate_to_integer: true,
    };

    /// Always applied to color channels.
    pub const COLOR: Transform = Transform::BYTE;

    /// Normalized -0.5..0.5 input to a whole signed value in -127..=127.
    pub const SIGNED_BYTE: Transform = Transform {
        multiplier: Some(254.0),
        clamp_min: Some(-127.0),
        clamp_max: Some(127.0),
        truncate_to_integer: true,
    };

    pub fn with_multiplier(mut self, multiplier: f32) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    pub fn clamped(mut self, min: f32, max: f32) -> Self {
        self.clamp_min = Some(min);
        self.clamp_max = Some(max);
        self
    }

    pub fn integer(mut self) -> Self {
        self.truncate_to_integer = true;
        self
    }

    /// Run the pipeline on one component.
    #[inline]
    pub fn apply(&self, mut v: f32) -> f32 {
        if let Some(mul) = self.multiplier {
            v *= mul;
        }
        if let Some(min) = self.clamp_min {
            v = v.max(min);
        }
        if let Some(max) = self.clamp_max {
            v = v.min(max);
        }
        if self.truncate_to_integer {
            v = v.floor();
        }
        v
    }
}

/// Closed set of shapes a [`ValueSpec`] can produce.
///
/// Implemented for `f32`, [`Vec2`], [`Vec3`] and [`Color`].
pub trait ValueShape: Copy + fmt::Debug + 'static {
    const KIND: ValueKind;

    /// Interpret a bare number as this shape.
    fn from_scalar(v: f32) -> Self;

    /// Add `draw() * half_width` to every component.
    fn combine_random(self, half_width: f32, draw: &mut dyn FnMut() -> f32) -> Self;

    fn apply_transform(self, transform: &Transform) -> Self;

    /// Narrow an untyped value, broadcasting scalars where the shape allows it.
    fn from_value(value: Value) -> Result<Self>;

    fn into_value(self) -> Value;
}

impl ValueShape for f32 {
    const KIND: ValueKind = ValueKind::Scalar;

    fn from_scalar(v: f32) -> Self {
        v
    }

    fn combine_random(self, half_width: f32, draw: &mut dyn FnMut() -> f32) -> Self {
        self + draw() * half_width
    }

    fn apply_transform(self, transform: &Transform) -> Self {
        transform.apply(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Scalar(v) => Ok(v),
            other => Err(ParticleError::unsupported(Self::KIND, other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Scalar(self)
    }
}

impl ValueShape for Vec2 {
    const KIND: ValueKind = ValueKind::Vec2;

    fn from_scalar(v: f32) -> Self {
        Vec2::splat(v)
    }

    fn combine_random(self, half_width: f32, draw: &mut dyn FnMut() -> f32) -> Self {
        Vec2::new(
            self.x.combine_random(half_width, draw),
            self.y.combine_random(half_width, draw),
        )
    }

    fn apply_transform(self, transform: &Transform) -> Self {
        Vec2::new(transform.apply(self.x), transform.apply(self.y))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Vec2(v) => Ok(v),
            Value::Scalar(v) => Ok(Self::from_scalar(v)),
            other => Err(ParticleError::unsupported(Self::KIND, other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Vec2(self)
    }
}

impl ValueShape for Vec3 {
    const KIND: ValueKind = ValueKind::Vec3;

    fn from_scalar(v: f32) -> Self {
        Vec3::splat(v)
    }

    fn combine_random(self, half_width: f32, draw: &mut dyn FnMut() -> f32) -> Self {
        Vec3::new(
            self.x.combine_random(half_width, draw),
            self.y.combine_random(half_width, draw),
            self.z.combine_random(half_width, draw),
        )
    }

    fn apply_transform(self, transform: &Transform) -> Self {
        Vec3::new(
            transform.apply(self.x),
            transform.apply(self.y),
            transform.apply(self.z),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Vec3(v) => Ok(v),
            Value::Scalar(v) => Ok(Self::from_scalar(v)),
            other => Err(ParticleError::unsupported(Self::KIND, other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Vec3(self)
    }
}

impl ValueShape for Color {
    const KIND: ValueKind = ValueKind::Color;

    /// Bare numbers are `0xRRGGBB`.
    fn from_scalar(v: f32) -> Self {
        Color::from_hex(v.max(0.0) as u32)
    }

    fn combine_random(self, half_width: f32, draw: &mut dyn FnMut() -> f32) -> Self {
        self.map(|c| c.combine_random(half_width, draw))
    }

    fn apply_transform(self, _transform: &Transform) -> Self {
        self.map(|c| Transform::COLOR.apply(c))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Color(c) => Ok(c),
            Value::Scalar(v) => Ok(Self::from_scalar(v)),
            other => Err(ParticleError::unsupported(Self::KIND, other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Color(self)
    }
}

/// Which end of an over-lifetime pair is evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Start,
    End,
}

/// How the END value's randomness relates to START's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndDraw {
    /// START and END draw independently.
    #[default]
    Independent,
    /// END replays START's draws, so both move by the same offset.
    Shared,
    /// END's base is START's randomized (pre-transform) value.
    Chained,
}

/// Start value with an optional end value.
///
/// A missing end is materialized from the start on first read and cached, so
/// repeated reads agree even if the start changes later.
#[derive(Clone, Debug)]
pub struct StartEnd<T> {
    start: T,
    end: OnceCell<T>,
}

impl<T: Copy> StartEnd<T> {
    pub fn new(start: T) -> Self {
        Self {
            start,
            end: OnceCell::new(),
        }
    }

    pub fn pair(start: T, end: T) -> Self {
        Self {
            start,
            end: OnceCell::from(end),
        }
    }

    pub fn start(&self) -> T {
        self.start
    }

    pub fn end(&self) -> T {
        *self.end.get_or_init(|| self.start)
    }

    pub fn get(&self, role: Role) -> T {
        match role {
            Role::Start => self.start(),
            Role::End => self.end(),
        }
    }

    pub fn set_start(&mut self, start: T) {
        self.start = start;
    }

    pub fn set_end(&mut self, end: T) {
        self.end = OnceCell::from(end);
    }
}

/// Function of the frame context producing a base value.
pub type ComputedFn = Rc<dyn Fn(&FrameContext) -> Value>;

/// Base of a [`ValueSpec`].
#[derive(Clone)]
pub enum BaseValue<T> {
    Constant(StartEnd<T>),
    /// Evaluated every time with the current frame context. The result is used
    /// as both START and END base.
    Computed(ComputedFn),
}

impl<T: fmt::Debug> fmt::Debug for BaseValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseValue::Constant(se) => f.debug_tuple("Constant").field(se).finish(),
            BaseValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Declarative description of one particle attribute.
#[derive(Clone, Debug)]
pub struct ValueSpec<T> {
    base: BaseValue<T>,
    distribution: f32,
    transform: Transform,
    end_draw: EndDraw,
}

impl<T: ValueShape> ValueSpec<T> {
    /// Constant value; END mirrors START.
    pub fn new(value: T) -> Self {
        Self::from_base(BaseValue::Constant(StartEnd::new(value)))
    }

    /// Start/end pair.
    pub fn range(start: T, end: T) -> Self {
        Self::from_base(BaseValue::Constant(StartEnd::pair(start, end)))
    }

    /// Base computed from the frame context (e.g. an emitter path).
    pub fn computed(f: impl Fn(&FrameContext) -> Value + 'static) -> Self {
        Self::from_base(BaseValue::Computed(Rc::new(f)))
    }

    pub fn from_base(base: BaseValue<T>) -> Self {
        Self {
            base,
            distribution: 0.0,
            transform: Transform::NONE,
            end_draw: EndDraw::default(),
        }
    }

    /// Negative distributions are treated as zero.
    pub fn with_distribution(mut self, distribution: f32) -> Self {
        self.set_distribution(distribution);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_end_draw(mut self, end_draw: EndDraw) -> Self {
        self.end_draw = end_draw;
        self
    }

    pub fn base(&self) -> &BaseValue<T> {
        &self.base
    }

    pub fn distribution(&self) -> f32 {
        self.distribution
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn end_draw(&self) -> EndDraw {
        self.end_draw
    }

    pub fn set_distribution(&mut self, distribution: f32) {
        self.distribution = distribution.max(0.0);
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn set_end_draw(&mut self, end_draw: EndDraw) {
        self.end_draw = end_draw;
    }

    /// Replace the whole base with a constant; END mirrors it again.
    pub fn set_constant(&mut self, value: T) {
        self.base = BaseValue::Constant(StartEnd::new(value));
    }

    /// Replace the START base. A computed base becomes a constant one.
    pub fn set_start(&mut self, start: T) {
        match &mut self.base {
            BaseValue::Constant(se) => se.set_start(start),
            BaseValue::Computed(_) => self.base = BaseValue::Constant(StartEnd::new(start)),
        }
    }

    /// Replace the END base. A computed base becomes a constant one.
    pub fn set_end(&mut self, end: T) {
        match &mut self.base {
            BaseValue::Constant(se) => se.set_end(end),
            BaseValue::Computed(_) => {
                self.base = BaseValue::Constant(StartEnd::pair(end, end));
            }
        }
    }

    /// Base value for `role` before randomization.
    pub fn resolve_base(&self, role: Role, ctx: &FrameContext) -> Result<T> {
        match &self.base {
            BaseValue::Constant(se) => Ok(se.get(role)),
            BaseValue::Computed(f) => T::from_value(f(ctx)),
        }
    }

    /// Generate one concrete value for `role`.
    pub fn evaluate<R: Rng + ?Sized>(&self, role: Role, ctx: &FrameContext, rng: &mut R) -> Result<T> {
        let base = self.resolve_base(role, ctx)?;
        let mut draw = || rng.gen_range(-1.0f32..=1.0);
        Ok(self.finish(self.randomize(base, &mut draw)))
    }

    /// START value.
    pub fn value<R: Rng + ?Sized>(&self, ctx: &FrameContext, rng: &mut R) -> Result<T> {
        self.evaluate(Role::Start, ctx, rng)
    }

    /// START and END values, honouring the [`EndDraw`] policy.
    pub fn start_end<R: Rng + ?Sized>(&self, ctx: &FrameContext, rng: &mut R) -> Result<(T, T)> {
        match self.end_draw {
            EndDraw::Independent => Ok((
                self.evaluate(Role::Start, ctx, rng)?,
                self.evaluate(Role::End, ctx, rng)?,
            )),
            EndDraw::Shared => {
                let draws: [f32; 3] = [
                    rng.gen_range(-1.0f32..=1.0),
                    rng.gen_range(-1.0f32..=1.0),
                    rng.gen_range(-1.0f32..=1.0),
                ];
                let start = self.resolve_base(Role::Start, ctx)?;
                let end = self.resolve_base(Role::End, ctx)?;
                let start = self.finish(self.randomize(start, &mut replay(&draws)));
                let end = self.finish(self.randomize(end, &mut replay(&draws)));
                Ok((start, end))
            }
            EndDraw::Chained => {
                let mut draw = || rng.gen_range(-1.0f32..=1.0);
                let start = self.randomize(self.resolve_base(Role::Start, ctx)?, &mut draw);
                let end = self.randomize(start, &mut draw);
                Ok((self.finish(start), self.finish(end)))
            }
        }
    }

    fn randomize(&self, base: T, draw: &mut dyn FnMut() -> f32) -> T {
        let half_width = self.distribution / 2.0;
        if half_width == 0.0 {
            return base;
        }
        base.combine_random(half_width, draw)
    }

    fn finish(&self, v: T) -> T {
        v.apply_transform(&self.transform)
    }
}

fn replay(draws: &[f32; 3]) -> impl FnMut() -> f32 + '_ {
    let mut i = 0;
    move || {
        let v = draws[i % draws.len()];
        i += 1;
        v
    }
}
