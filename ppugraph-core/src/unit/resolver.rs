//! Input Resolution
//!
//! Inputs are pulled, not pushed. When a unit needs its derived state it
//! climbs its ancestor paths; every unit found on the way is updated first
//! and contributes its render target 0, every processor contributes its
//! color buffer. Anything else is climbed through.
//!
//! After discovery the unit may copy the processor's viewport (when it has
//! nothing better to go on) and feeds its own output across any bridges
//! hanging below it. Bridged inputs always come after the discovered ones
//! and go away once their barrier does.

use std::collections::BTreeMap;

use crate::error::{UnitError, UnitResult};
use crate::graph::{NodeId, SceneGraph, Walk};
use crate::render::Texture;

use super::{Unit, UnitEvent, ViewportSource};

/// An ancestor that supplies an input, in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Unit(NodeId),
    Processor(NodeId),
}

impl Unit {
    /// Rebuild the discovered slots from `candidates`, skipping ignored
    /// positions. Bridged slots follow them.
    ///
    /// Returns whether any slot was assigned.
    pub(crate) fn assign_discovered_inputs(&mut self, candidates: Vec<Option<Texture>>) -> bool {
        let mut inputs = BTreeMap::new();
        let mut slot = 0;
        let mut assigned = false;

        for (position, candidate) in candidates.into_iter().enumerate() {
            if self.is_input_ignored(position) {
                continue;
            }
            if let Some(tex) = candidate {
                inputs.insert(slot, tex);
            }
            slot += 1;
            assigned = true;
        }

        self.direct_inputs = inputs;
        self.direct_slots = slot;
        self.lay_out_inputs();
        assigned
    }
}

impl SceneGraph {
    /// Collect the input sources above `id`.
    fn discover_sources(&self, id: NodeId) -> UnitResult<Vec<Source>> {
        let mut sources = Vec::new();
        let mut looped = false;

        self.walk_ancestors(id, |ancestor, node| {
            if ancestor == id {
                looped = true;
                Walk::Break
            } else if node.is_unit() {
                sources.push(Source::Unit(ancestor));
                Walk::Stop
            } else if node.as_processor().is_some() {
                sources.push(Source::Processor(ancestor));
                Walk::Stop
            } else {
                Walk::Continue
            }
        })?;

        if looped {
            return Err(UnitError::CycleDetected {
                unit: self.node_name(id).to_string(),
            }
            .report());
        }
        Ok(sources)
    }

    /// Whether `source` is a unit with a barrier child blocking `target`.
    fn bridges_into(&self, source: NodeId, target: NodeId) -> bool {
        let Ok(node) = self.node(source) else {
            return false;
        };
        node.is_unit()
            && node.children().iter().any(|&child| {
                self.node(child)
                    .ok()
                    .and_then(|n| n.as_barrier())
                    .and_then(|b| b.blocked_child())
                    == Some(target)
            })
    }

    /// Forget bridges into `id` whose barrier is gone.
    fn prune_bridges(&mut self, id: NodeId) -> UnitResult<bool> {
        let live: Vec<NodeId> = self
            .unit(id)?
            .bridge_sources()
            .filter(|&source| self.bridges_into(source, id))
            .collect();
        Ok(self.unit_mut(id)?.retain_bridges(|source| live.contains(&source)))
    }

    /// Nearest processor above `id`, climbing through units and groups.
    pub fn find_processor(&self, id: NodeId) -> UnitResult<Option<NodeId>> {
        let mut found = None;
        self.walk_ancestors(id, |ancestor, node| {
            if ancestor == id {
                Walk::Stop
            } else if node.as_processor().is_some() {
                found = Some(ancestor);
                Walk::Break
            } else {
                Walk::Continue
            }
        })?;
        Ok(found)
    }

    /// Discover and bind the inputs of `id`, apply the processor viewport
    /// fallback and feed bridges.
    ///
    /// `Err` aborts the unit's update. A malformed bridge does not abort;
    /// it is handed back in `Ok(Some(_))` once everything else is done.
    #[tracing::instrument(level = "trace", skip(self), fields(unit = %self.node_name(id)))]
    pub(crate) fn setup_inputs_from_parents(
        &mut self,
        id: NodeId,
    ) -> UnitResult<Option<UnitError>> {
        let pruned = self.prune_bridges(id)?;
        if self.unit(id)?.is_offline() {
            return Ok(None);
        }

        let sources = self.discover_sources(id)?;
        let mut candidates = Vec::with_capacity(sources.len());
        let mut units_found = false;

        for source in sources {
            match source {
                Source::Unit(parent) => {
                    if let Err(err) = self.update_unit(parent) {
                        if err.is_structural() {
                            return Err(err);
                        }
                        tracing::warn!(
                            parent = %self.node_name(parent),
                            "using stale output of failed parent"
                        );
                    }
                    let output = self.unit_mut(parent)?.get_or_create_output_texture(0);
                    candidates.push(Some(output));
                    units_found = true;
                }
                Source::Processor(proc) => {
                    candidates.push(self.processor(proc)?.color_buffer().cloned());
                }
            }
        }

        let unit = self.unit_mut(id)?;
        if unit.assign_discovered_inputs(candidates) || pruned {
            unit.notify(UnitEvent::InputChanged);
        }

        let open = matches!(
            unit.viewport_source(),
            ViewportSource::Unset | ViewportSource::Processor
        );
        let needs_fallback =
            open && (unit.viewport_reference_input().is_none() || !units_found);
        if needs_fallback {
            let Some(proc) = self.find_processor(id)? else {
                return Err(UnitError::MissingOwner {
                    unit: self.node_name(id).to_string(),
                }
                .report());
            };
            let viewport = self.processor(proc)?.viewport();
            self.unit_mut(id)?.adopt_processor_viewport(viewport);
        }

        self.connect_bridges(id)
    }

    /// Feed render target 0 of `id` into the blocked child of every
    /// barrier directly below it. Each target gets one slot per bridging
    /// unit, after its discovered inputs.
    fn connect_bridges(&mut self, id: NodeId) -> UnitResult<Option<UnitError>> {
        let children = self.children(id)?.to_vec();
        let mut first_error = None;

        for child in children {
            let Some(barrier) = self.node(child)?.as_barrier().copied() else {
                continue;
            };

            let target = barrier
                .blocked_child()
                .filter(|&blocked| self.node(blocked).map_or(false, |n| n.is_unit()));
            let Some(target) = target else {
                let err = UnitError::MalformedBridge {
                    unit: self.node_name(id).to_string(),
                    barrier: child,
                }
                .report();
                first_error.get_or_insert(err);
                continue;
            };

            let output = self.unit_mut(id)?.get_or_create_output_texture(0);
            tracing::trace!(
                from = %self.node_name(id),
                to = %self.node_name(target),
                "bridging output"
            );
            self.unit_mut(target)?.bridge_input(id, output);
        }

        Ok(first_error)
    }
}
