//! Render State
//!
//! The sink a unit commits its derived state into: texture slots, the bound
//! program, a fixed viewport attribute, and named uniforms. The real
//! graphics backend reads this object when drawing; nothing here talks to
//! a GPU.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use super::shader::ProgramId;
use super::texture::{Texture, TextureTarget};
use super::viewport::Viewport;

/// Number of texture slots a fresh render state reserves.
pub const MAX_TEXTURE_SLOTS: usize = 16;

/// A named parameter passed to the active program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    /// Texture unit index, typed by what the unit samples.
    Sampler { target: TextureTarget, unit: i32 },
}

impl UniformValue {
    /// Integer payload of `Int` and `Sampler` values.
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Self::Int(v) | Self::Sampler { unit: v, .. } => Some(v),
            Self::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// Texture attached at one slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextureBinding {
    /// `None` is the empty placeholder texture.
    pub texture: Option<Texture>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RenderState {
    textures: BTreeMap<usize, TextureBinding>,
    program: Option<ProgramId>,
    viewport: Option<Viewport>,
    uniforms: IndexMap<String, UniformValue>,
}

impl RenderState {
    /// State with the empty program and [`MAX_TEXTURE_SLOTS`] empty texture
    /// slots, so nothing leaks in from an enclosing state.
    pub fn new() -> Self {
        let textures = (0..MAX_TEXTURE_SLOTS)
            .map(|slot| (slot, TextureBinding::default()))
            .collect();
        Self {
            textures,
            ..Self::default()
        }
    }

    /// Attach `texture` at `slot` and enable it.
    pub fn bind_texture(&mut self, slot: usize, texture: Texture) {
        self.textures.insert(
            slot,
            TextureBinding {
                texture: Some(texture),
                enabled: true,
            },
        );
    }

    /// Put the empty placeholder back at `slot`.
    pub fn clear_texture(&mut self, slot: usize) {
        self.textures.insert(slot, TextureBinding::default());
    }

    pub fn texture(&self, slot: usize) -> Option<&TextureBinding> {
        self.textures.get(&slot)
    }

    /// Slots that currently hold a real, enabled texture.
    pub fn bound_slots(&self) -> impl Iterator<Item = (usize, &Texture)> {
        self.textures.iter().filter_map(|(slot, binding)| {
            match (&binding.texture, binding.enabled) {
                (Some(tex), true) => Some((*slot, tex)),
                _ => None,
            }
        })
    }

    pub fn set_program(&mut self, program: Option<ProgramId>) {
        self.program = program;
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn set_uniform(&mut self, name: impl Into<String>, value: UniformValue) {
        self.uniforms.insert(name.into(), value);
    }

    pub fn remove_uniform(&mut self, name: &str) -> Option<UniformValue> {
        self.uniforms.shift_remove(name)
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.uniforms.iter().map(|(name, value)| (name.as_str(), value))
    }
}
