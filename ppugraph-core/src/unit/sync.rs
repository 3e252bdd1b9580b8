//! Viewport derivation.
//!
//! With a reference input configured and bound, the viewport takes that
//! buffer's width and height; the offsets stay whatever they were. A
//! viewport copied from the processor is copied again on every resolution.
//! Output buffers follow the viewport size.

use crate::render::Viewport;

use super::{Unit, UnitEvent, ViewportSource};

impl Unit {
    /// Size the viewport after the reference input. Emits
    /// [`UnitEvent::ViewportChanged`] and returns true when it changed.
    pub(crate) fn sync_viewport_to_reference(&mut self) -> bool {
        let Some(size) = self
            .viewport_reference
            .and_then(|slot| self.inputs.get(&slot))
            .map(|tex| tex.size())
        else {
            return false;
        };

        if self.viewport.is_none() {
            self.viewport_source = ViewportSource::Reference;
        }
        let viewport = self.viewport.get_or_insert_with(Viewport::default);
        if !viewport.resize(size.0, size.1) {
            return false;
        }

        let viewport = *viewport;
        self.state.set_viewport(Some(viewport));
        self.notify(UnitEvent::ViewportChanged(viewport));
        true
    }

    /// Take the processor's rectangle as the viewport. Emits
    /// [`UnitEvent::ViewportChanged`] when an earlier viewport differs.
    pub(crate) fn adopt_processor_viewport(&mut self, viewport: Viewport) {
        let previous = self.viewport.replace(viewport);
        self.viewport_source = ViewportSource::Processor;
        self.state.set_viewport(Some(viewport));
        if previous.is_some_and(|old| old != viewport) {
            self.notify(UnitEvent::ViewportChanged(viewport));
        }
    }

    /// Resize every bound output to the viewport.
    pub(crate) fn resize_outputs_to_viewport(&self) {
        let Some(viewport) = self.viewport else {
            return;
        };
        for tex in self.outputs.values().flatten() {
            if tex.size() != viewport.size() {
                tex.set_size(viewport.width, viewport.height);
            }
        }
    }
}
