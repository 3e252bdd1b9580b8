//! Shader handles.
//!
//! A [`Shader`] is the transform a unit applies. Several units may share
//! one shader; the handle is reference counted and its parameter list is
//! behind a lock so any holder can tweak it between frames.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::state::{RenderState, UniformValue};

/// Identifier of a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u64);

impl ProgramId {
    /// Generate a new unique program ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ProgramId {
    fn default() -> Self {
        Self::new()
    }
}

struct ShaderInner {
    name: String,
    program: ProgramId,
    parameters: RwLock<IndexMap<String, UniformValue>>,
}

/// Shared handle to a program and its own parameters.
#[derive(Clone)]
pub struct Shader {
    inner: Arc<ShaderInner>,
}

impl Shader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ShaderInner {
                name: name.into(),
                program: ProgramId::new(),
                parameters: RwLock::new(IndexMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn program(&self) -> ProgramId {
        self.inner.program
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: UniformValue) {
        self.inner.parameters.write().insert(name.into(), value);
    }

    pub fn parameter(&self, name: &str) -> Option<UniformValue> {
        self.inner.parameters.read().get(name).copied()
    }

    /// Snapshot of the parameter list in insertion order.
    pub fn parameters(&self) -> Vec<(String, UniformValue)> {
        self.inner
            .parameters
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }

    /// Push this shader's parameters into `state`.
    pub fn enable(&self, state: &mut RenderState) {
        for (name, value) in self.inner.parameters.read().iter() {
            state.set_uniform(name.clone(), *value);
        }
    }

    /// Undo [`Shader::enable`]: unbind the program and drop the parameters.
    pub fn disable(&self, state: &mut RenderState) {
        if state.program() == Some(self.program()) {
            state.set_program(None);
        }
        for name in self.inner.parameters.read().keys() {
            state.remove_uniform(name);
        }
    }

    pub fn ptr_eq(&self, other: &Shader) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Shader {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.inner.name)
            .field("program", &self.inner.program)
            .finish()
    }
}
