//! The update protocol.
//!
//! A unit is either clean or dirty and starts dirty. Updating a dirty unit
//! resolves its inputs (updating dirty ancestors first), derives its
//! viewport, commits everything into its render state and regenerates its
//! uniforms. Updating a clean unit does nothing.

use crate::error::{UnitError, UnitResult};
use crate::graph::{NodeId, SceneGraph};
use crate::render::Texture;

impl SceneGraph {
    /// Bring `id` up to date.
    ///
    /// Ancestors are updated first through the same call, so a frame pass
    /// recomputes each dirty unit exactly once. Re-entering a unit that is
    /// still being resolved fails with [`UnitError::CycleDetected`].
    #[tracing::instrument(level = "trace", skip(self), fields(unit = %self.node_name(id)))]
    pub fn update_unit(&mut self, id: NodeId) -> UnitResult<()> {
        if !self.unit(id)?.is_dirty() {
            return Ok(());
        }

        if self.resolving.contains(&id) {
            return Err(UnitError::CycleDetected {
                unit: self.node_name(id).to_string(),
            }
            .report());
        }
        let limit = self.settings().max_resolve_depth;
        if self.resolving.len() >= limit {
            return Err(UnitError::DepthLimitExceeded {
                unit: self.node_name(id).to_string(),
                limit,
            }
            .report());
        }

        self.resolving.push(id);
        let result = self.recompute(id);
        self.resolving.pop();
        result
    }

    /// Mark `id` dirty so the next update recomputes it.
    pub fn invalidate(&mut self, id: NodeId) -> UnitResult<()> {
        self.unit_mut(id)?.mark_dirty();
        Ok(())
    }

    fn recompute(&mut self, id: NodeId) -> UnitResult<()> {
        let bridge_error = self.setup_inputs_from_parents(id)?;

        let unit = self.unit_mut(id)?;
        unit.sync_viewport_to_reference();
        unit.resize_outputs_to_viewport();
        unit.assign_input_textures();
        unit.assign_shader();
        unit.assign_viewport();

        self.print_debug_info(id)?;
        self.update_uniforms(id)?;

        let unit = self.unit_mut(id)?;
        unit.revision += 1;
        unit.mark_clean();

        // retried next pass so the condition is reported again
        if let Some(err) = bridge_error {
            unit.mark_dirty();
            return Err(err);
        }
        Ok(())
    }

    fn print_debug_info(&self, id: NodeId) -> UnitResult<()> {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return Ok(());
        }
        let unit = self.unit(id)?;

        let inputs = unit
            .inputs()
            .map(|(slot, tex)| format!("[{slot}: {}]", describe(tex)))
            .collect::<Vec<_>>()
            .join("");
        let outputs = unit
            .outputs()
            .map(|(mrt, tex)| match tex {
                Some(tex) => format!("[{mrt}: {}]", describe(tex)),
                None => format!("[{mrt}: none]"),
            })
            .collect::<Vec<_>>()
            .join("");
        let uniforms: Vec<_> = unit
            .input_uniforms()
            .map(|(parent, name, edge)| format!("{name}={edge} ({})", self.node_name(parent)))
            .collect();

        tracing::debug!(
            name = %self.node_name(id),
            index = unit.index(),
            viewport = ?unit.viewport(),
            reference = ?unit.viewport_reference_input(),
            shader = unit.shader().map(|s| s.name()).unwrap_or("none"),
            uniforms = ?uniforms,
            %inputs,
            %outputs,
            "unit updated"
        );
        Ok(())
    }
}

fn describe(tex: &Texture) -> String {
    let (w, h) = tex.size();
    format!("{w}x{h} {:?}", tex.format())
}
