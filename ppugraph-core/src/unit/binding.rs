//! Binding resolved state into the render state.

use crate::error::{UnitError, UnitResult};
use crate::graph::{NodeId, SceneGraph};
use crate::render::UniformValue;

use super::{Unit, UnitEvent};

/// Float uniform carrying the viewport width.
pub const VIEWPORT_WIDTH_UNIFORM: &str = "ppu_ViewportWidth";

/// Float uniform carrying the viewport height.
pub const VIEWPORT_HEIGHT_UNIFORM: &str = "ppu_ViewportHeight";

impl Unit {
    /// Attach every bound input at its slot; slots that lost their input
    /// get the empty placeholder back.
    pub(crate) fn assign_input_textures(&mut self) {
        let stale: Vec<usize> = self
            .state
            .bound_slots()
            .map(|(slot, _)| slot)
            .filter(|slot| !self.inputs.contains_key(slot))
            .collect();
        for slot in stale {
            self.state.clear_texture(slot);
        }

        for (slot, tex) in &self.inputs {
            self.state.bind_texture(*slot, tex.clone());
        }
    }

    pub(crate) fn assign_shader(&mut self) {
        let Some(shader) = &self.shader else {
            return;
        };
        shader.enable(&mut self.state);
        self.state.set_program(Some(shader.program()));
        self.notify(UnitEvent::ShaderAssigned);
    }

    pub(crate) fn remove_shader(&mut self) {
        let Some(shader) = &self.shader else {
            return;
        };
        shader.disable(&mut self.state);
        self.notify(UnitEvent::ShaderRemoved);
    }

    pub(crate) fn assign_viewport(&mut self) {
        if let Some(viewport) = self.viewport {
            self.state.set_viewport(Some(viewport));
        }
    }
}

impl SceneGraph {
    /// Regenerate the viewport size uniforms and the sampler uniform of
    /// every named input binding of `id`.
    pub(crate) fn update_uniforms(&mut self, id: NodeId) -> UnitResult<()> {
        let bindings: Vec<(NodeId, String, usize)> = self
            .unit(id)?
            .input_uniforms()
            .map(|(parent, name, edge)| (parent, name.to_string(), edge))
            .collect();

        let mut samplers = Vec::with_capacity(bindings.len());
        for (parent, name, edge) in bindings {
            let Ok(parent_unit) = self.unit(parent) else {
                continue;
            };
            let value = match parent_unit.output_texture(0) {
                Some(tex) => UniformValue::Sampler {
                    target: tex.target(),
                    unit: edge as i32,
                },
                None => UniformValue::Int(edge as i32),
            };
            samplers.push((name, value));
        }

        let unit = self.unit_mut(id)?;
        if let Some(viewport) = unit.viewport {
            unit.state
                .set_uniform(VIEWPORT_WIDTH_UNIFORM, UniformValue::Float(viewport.width as f32));
            unit.state
                .set_uniform(VIEWPORT_HEIGHT_UNIFORM, UniformValue::Float(viewport.height as f32));
        }
        for (name, value) in samplers {
            unit.state.set_uniform(name, value);
        }
        Ok(())
    }

    /// Expose the output of `parent` to the shader of `id` under `uniform`.
    ///
    /// With `add_edge`, `id` first becomes a child of `parent` if it is not
    /// one already. The uniform's value is `parent`'s position among the
    /// parents of `id`.
    pub fn set_input_to_uniform(
        &mut self,
        id: NodeId,
        parent: NodeId,
        uniform: &str,
        add_edge: bool,
    ) -> UnitResult<()> {
        self.unit(id)?;
        self.unit(parent)?;
        if uniform.is_empty() {
            return Err(UnitError::config("uniform name must not be empty"));
        }

        if add_edge && !self.contains_child(parent, id)? {
            self.add_child(parent, id)?;
        }

        let Some(edge) = self.parents(id)?.iter().position(|p| *p == parent) else {
            return Err(UnitError::InvalidUniformTarget {
                unit: self.node_name(id).to_string(),
                parent,
            }
            .report());
        };

        let unit = self.unit_mut(id)?;
        unit.input_uniforms.insert(parent, (uniform.to_string(), edge));
        unit.mark_dirty();
        Ok(())
    }

    /// Drop the named input binding called `uniform`. With `remove_edge`
    /// the edge from its parent to `id` goes too.
    ///
    /// Returns whether a binding was removed.
    pub fn remove_input_to_uniform(
        &mut self,
        id: NodeId,
        uniform: &str,
        remove_edge: bool,
    ) -> UnitResult<bool> {
        let unit = self.unit_mut(id)?;
        let Some(index) = unit
            .input_uniforms
            .values()
            .position(|(name, _)| name == uniform)
        else {
            return Ok(false);
        };

        let Some((parent, _)) = unit.input_uniforms.shift_remove_index(index) else {
            return Ok(false);
        };
        unit.state.remove_uniform(uniform);
        unit.mark_dirty();

        if remove_edge {
            self.remove_child(parent, id)?;
        }
        Ok(true)
    }

    /// Drop the named input binding of `parent`, if any.
    pub fn remove_input_to_uniform_of(
        &mut self,
        id: NodeId,
        parent: NodeId,
        remove_edge: bool,
    ) -> UnitResult<bool> {
        let name = match self.unit(id)?.input_uniforms.get(&parent) {
            Some((name, _)) => name.clone(),
            None => return Ok(false),
        };
        self.remove_input_to_uniform(id, &name, remove_edge)
    }
}
