//! Traversals
//!
//! Two walks drive the unit protocol:
//!
//! - [`SceneGraph::traverse`] goes down from a root, depth first. In
//!   update-like passes every unit sits behind its traversal guard, so a
//!   unit with several parents is entered (and descended) only once.
//! - [`SceneGraph::walk_ancestors`] goes up from a node through every
//!   parent path. The callback decides where the walk stops.
//!
//! Neither walk descends into or climbs through a barrier.

use crate::error::{UnitError, UnitResult};

use super::node::{NodeId, SceneNode};
use super::scene::SceneGraph;

/// Kind of pass a traversal performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorKind {
    /// Per-frame update.
    Update,
    /// Per-frame cull/draw.
    Cull,
    /// Anything else (search, export). Never guarded.
    Other,
}

impl VisitorKind {
    /// Update and cull passes run each unit once per pass.
    pub fn is_update_like(self) -> bool {
        matches!(self, Self::Update | Self::Cull)
    }
}

/// What an upward walk does after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Keep climbing through this node's parents.
    Continue,
    /// Do not climb past this node; other paths go on.
    Stop,
    /// End the whole walk.
    Break,
}

/// Outcome of one frame pass.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Units entered, in visit order.
    pub visited: Vec<NodeId>,
    /// Units whose update failed this pass.
    pub failed: Vec<(NodeId, UnitError)>,
}

impl SceneGraph {
    /// Visit every ancestor path above `start`, depth first, parents in
    /// edge order. `start` itself is not visited. A node reachable through
    /// several paths is visited once per path.
    pub fn walk_ancestors<F>(&self, start: NodeId, mut visit: F) -> UnitResult<()>
    where
        F: FnMut(NodeId, &SceneNode) -> Walk,
    {
        let limit = self.settings().max_walk_depth;
        let mut stack: Vec<(NodeId, usize)> = self
            .parents(start)?
            .iter()
            .rev()
            .map(|&parent| (parent, 1))
            .collect();

        while let Some((id, depth)) = stack.pop() {
            if depth > limit {
                return Err(UnitError::DepthLimitExceeded {
                    unit: self.node_name(start).to_string(),
                    limit,
                }
                .report());
            }

            let node = self.node(id)?;
            match visit(id, node) {
                Walk::Break => break,
                Walk::Stop => {}
                Walk::Continue if node.as_barrier().is_some() => {}
                Walk::Continue => {
                    stack.extend(node.parents().iter().rev().map(|&p| (p, depth + 1)));
                }
            }
        }
        Ok(())
    }

    /// Depth-first pre-order traversal from `root`.
    ///
    /// `visit` is called on each node before its children. In update-like
    /// passes a unit whose guard was already passed is skipped together
    /// with its subtree. Barriers are visited but never descended into.
    pub fn traverse<F>(&mut self, root: NodeId, kind: VisitorKind, mut visit: F) -> UnitResult<()>
    where
        F: FnMut(&mut SceneGraph, NodeId),
    {
        self.node(root)?;
        if kind.is_update_like() {
            self.begin_guarded_pass();
        }

        let limit = self.settings().max_walk_depth;
        let mut stack = vec![(root, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            if depth > limit {
                return Err(UnitError::DepthLimitExceeded {
                    unit: self.node_name(root).to_string(),
                    limit,
                }
                .report());
            }

            let node = self.node_mut(id)?;
            if kind.is_update_like() {
                if let Some(unit) = node.as_unit_mut() {
                    if !unit.guard_mut().enter() {
                        continue;
                    }
                }
            }

            visit(self, id);

            let node = self.node(id)?;
            if node.as_barrier().is_some() {
                continue;
            }
            stack.extend(node.children().iter().rev().map(|&c| (c, depth + 1)));
        }
        Ok(())
    }

    /// Run one frame pass from `root`. In an update pass every entered,
    /// active unit is updated; other passes only record visits. Failures are logged where they happen and collected in the
    /// report; they never stop the pass.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn run_pass(&mut self, root: NodeId, kind: VisitorKind) -> PassReport {
        let mut report = PassReport::default();

        let result = self.traverse(root, kind, |graph, id| {
            let Ok(unit) = graph.unit(id) else {
                return;
            };
            report.visited.push(id);
            if kind != VisitorKind::Update || !unit.is_active() {
                return;
            }
            if let Err(err) = graph.update_unit(id) {
                report.failed.push((id, err));
            }
        });

        if let Err(err) = result {
            report.failed.push((root, err));
        }
        report
    }

    /// Flip the pass target and rearm every unit guard with it.
    fn begin_guarded_pass(&mut self) {
        self.pass_target = !self.pass_target;
        let target = self.pass_target;
        for unit in self.units_mut() {
            unit.guard_mut().rearm(target);
        }
    }
}
