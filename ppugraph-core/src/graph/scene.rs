//! Scene Graph
//!
//! An arena of [`SceneNode`]s connected by ordered parent/child edges. The
//! graph is a DAG in normal use; units, processors, barriers and plain
//! groups all live in the same arena and are told apart by capability
//! queries on their [`NodeKind`].

use std::collections::{HashMap, VecDeque};

use crate::config::{GraphSettings, UnitConfig};
use crate::error::{UnitError, UnitResult};
use crate::unit::Unit;

use super::node::{Barrier, NodeId, NodeKind, Processor, SceneNode};

/// The graph and the per-graph state of the unit protocol.
#[derive(Debug)]
pub struct SceneGraph {
    /// All nodes, indexed by `NodeId`.
    nodes: Vec<SceneNode>,

    settings: GraphSettings,

    /// Units whose update is currently running, outermost first.
    pub(crate) resolving: Vec<NodeId>,

    /// Target handed to every unit guard at the start of a guarded pass.
    pub(crate) pass_target: bool,
}

impl SceneGraph {
    /// Create a new empty graph with default settings.
    pub fn new() -> Self {
        Self::with_settings(GraphSettings::default())
    }

    pub fn with_settings(settings: GraphSettings) -> Self {
        Self {
            nodes: Vec::new(),
            settings,
            resolving: Vec::new(),
            pass_target: false,
        }
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    fn insert(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a plain grouping node.
    pub fn add_group(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(SceneNode::new(name, NodeKind::Group))
    }

    pub fn add_processor(&mut self, name: impl Into<String>, processor: Processor) -> NodeId {
        self.insert(SceneNode::new(name, NodeKind::Processor(processor)))
    }

    /// Add a fresh unit using the graph's default projection.
    pub fn add_unit(&mut self, name: impl Into<String>) -> NodeId {
        let unit = Unit::with_frustum(self.settings.default_frustum);
        self.insert_unit(name, unit)
    }

    /// Add a unit built elsewhere.
    pub fn insert_unit(&mut self, name: impl Into<String>, unit: Unit) -> NodeId {
        self.insert(SceneNode::new(name, NodeKind::Unit(Box::new(unit))))
    }

    /// Add a unit described by `config`.
    pub fn add_configured_unit(&mut self, config: &UnitConfig) -> NodeId {
        let unit = config.build_with_frustum(self.settings.default_frustum);
        self.insert_unit(config.name.clone(), unit)
    }

    /// Add a barrier that bridges into `blocked_child`.
    pub fn add_barrier(&mut self, name: impl Into<String>, blocked_child: NodeId) -> NodeId {
        self.insert(SceneNode::new(name, NodeKind::Barrier(Barrier::new(blocked_child))))
    }

    /// Add a barrier with no blocked child yet.
    pub fn add_empty_barrier(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(SceneNode::new(name, NodeKind::Barrier(Barrier::default())))
    }

    pub fn node(&self, id: NodeId) -> UnitResult<&SceneNode> {
        self.nodes.get(id.index()).ok_or(UnitError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> UnitResult<&mut SceneNode> {
        self.nodes.get_mut(id.index()).ok_or(UnitError::UnknownNode(id))
    }

    /// Name of `id`, or a placeholder for unknown ids.
    pub fn node_name(&self, id: NodeId) -> &str {
        self.nodes
            .get(id.index())
            .map(SceneNode::name)
            .unwrap_or("<unknown>")
    }

    pub fn unit(&self, id: NodeId) -> UnitResult<&Unit> {
        self.node(id)?.as_unit().ok_or(UnitError::NotAUnit(id))
    }

    pub fn unit_mut(&mut self, id: NodeId) -> UnitResult<&mut Unit> {
        self.node_mut(id)?
            .as_unit_mut()
            .ok_or(UnitError::NotAUnit(id))
    }

    pub fn processor(&self, id: NodeId) -> UnitResult<&Processor> {
        self.node(id)?
            .as_processor()
            .ok_or_else(|| UnitError::config(format!("{id:?} is not a processor")))
    }

    pub fn processor_mut(&mut self, id: NodeId) -> UnitResult<&mut Processor> {
        self.node_mut(id)?
            .as_processor_mut()
            .ok_or_else(|| UnitError::config(format!("{id:?} is not a processor")))
    }

    /// Ids of every unit in insertion order.
    pub fn unit_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_unit())
            .map(|(index, _)| NodeId::from_index(index))
    }

    pub(crate) fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.nodes.iter_mut().filter_map(SceneNode::as_unit_mut)
    }

    /// Add an edge `parent -> child`. The unit whose inputs change (the
    /// child, or the unit a barrier child blocks) is marked dirty.
    ///
    /// Returns false if the edge already exists.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> UnitResult<bool> {
        self.node(child)?;
        if self.contains_child(parent, child)? {
            return Ok(false);
        }
        self.node_mut(parent)?.add_child(child);
        self.node_mut(child)?.add_parent(parent);
        self.touch_inputs_of(child);
        Ok(true)
    }

    /// Remove the edge `parent -> child`, dirtying like [`Self::add_child`].
    ///
    /// Returns false if there was no such edge.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> UnitResult<bool> {
        self.node(child)?;
        if !self.contains_child(parent, child)? {
            return Ok(false);
        }
        self.node_mut(parent)?.remove_child(child);
        self.node_mut(child)?.remove_parent(parent);
        self.touch_inputs_of(child);
        Ok(true)
    }

    fn touch_inputs_of(&mut self, child: NodeId) {
        let blocked = self
            .node(child)
            .ok()
            .and_then(SceneNode::as_barrier)
            .and_then(Barrier::blocked_child);
        for id in [Some(child), blocked].into_iter().flatten() {
            if let Ok(unit) = self.unit_mut(id) {
                unit.mark_dirty();
            }
        }
    }

    /// Whether `parent` already lists `child` as a child.
    pub fn contains_child(&self, parent: NodeId, child: NodeId) -> UnitResult<bool> {
        Ok(self.node(parent)?.children().contains(&child))
    }

    pub fn parents(&self, id: NodeId) -> UnitResult<&[NodeId]> {
        Ok(self.node(id)?.parents())
    }

    pub fn children(&self, id: NodeId) -> UnitResult<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Mark every unit dirty, e.g. after the processor was resized.
    pub fn invalidate_all(&mut self) {
        for unit in self.units_mut() {
            unit.mark_dirty();
        }
    }

    /// Check the structural edges plus every bridge edge for cycles.
    ///
    /// Uses Kahn's algorithm: if some node never reaches in-degree zero it
    /// sits on a cycle, and the first such unit is reported.
    pub fn validate_acyclic(&self) -> UnitResult<()> {
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut queue = VecDeque::new();

        let edges_from = |index: usize| -> Vec<NodeId> {
            let node = &self.nodes[index];
            let mut out: Vec<NodeId> = node.children().to_vec();
            if let Some(blocked) = node
                .as_barrier()
                .and_then(Barrier::blocked_child)
                .filter(|blocked| blocked.index() < self.nodes.len())
            {
                out.push(blocked);
            }
            out
        };

        for index in 0..self.nodes.len() {
            in_degree.entry(NodeId::from_index(index)).or_insert(0);
            for target in edges_from(index) {
                *in_degree.entry(target).or_insert(0) += 1;
            }
        }

        for (&id, &degree) in &in_degree {
            if degree == 0 {
                queue.push_back(id);
            }
        }

        let mut processed = 0;
        while let Some(id) = queue.pop_front() {
            processed += 1;
            for target in edges_from(id.index()) {
                if let Some(degree) = in_degree.get_mut(&target) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(target);
                    }
                }
            }
        }

        if processed == self.nodes.len() {
            return Ok(());
        }

        let mut stuck: Vec<NodeId> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(id, _)| id)
            .collect();
        stuck.sort();
        let culprit = stuck
            .iter()
            .find(|id| self.nodes[id.index()].is_unit())
            .or(stuck.first())
            .copied();

        let unit = culprit
            .map(|id| self.node_name(id).to_string())
            .unwrap_or_default();
        Err(UnitError::CycleDetected { unit })
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
