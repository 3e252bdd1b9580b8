//! Graph Nodes
//!
//! This module defines the node types that live in the scene graph. The
//! resolution protocol only ever asks a node what it is capable of
//! (`as_unit`, `as_processor`, `as_barrier`); it never needs to know more
//! about foreign node kinds than that.

use smallvec::SmallVec;

use crate::render::{Texture, Viewport};
use crate::unit::Unit;

/// Identifier of a node inside one [`crate::graph::SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the node in its graph's arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// The graph owner: supplies the source image and the default viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct Processor {
    viewport: Viewport,
    color_buffer: Option<Texture>,
}

impl Processor {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            color_buffer: None,
        }
    }

    /// Processor whose camera renders into `color_buffer`.
    pub fn with_color_buffer(viewport: Viewport, color_buffer: Texture) -> Self {
        Self {
            viewport,
            color_buffer: Some(color_buffer),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn color_buffer(&self) -> Option<&Texture> {
        self.color_buffer.as_ref()
    }

    pub fn set_color_buffer(&mut self, color_buffer: Option<Texture>) {
        self.color_buffer = color_buffer;
    }
}

/// A node that cuts a structural edge and turns it into a bridge: the unit
/// above the barrier feeds its output straight into `blocked_child`.
///
/// Traversals never descend through a barrier and upward walks stop at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Barrier {
    blocked_child: Option<NodeId>,
}

impl Barrier {
    pub fn new(blocked_child: NodeId) -> Self {
        Self {
            blocked_child: Some(blocked_child),
        }
    }

    pub fn blocked_child(&self) -> Option<NodeId> {
        self.blocked_child
    }

    pub fn set_blocked_child(&mut self, blocked_child: Option<NodeId>) {
        self.blocked_child = blocked_child;
    }
}

/// What a node is.
#[derive(Debug)]
pub enum NodeKind {
    /// A processing unit.
    Unit(Box<Unit>),

    /// The graph owner.
    Processor(Processor),

    /// A bridge between a unit and a blocked descendant.
    Barrier(Barrier),

    /// Any other node. Traversals pass straight through it.
    Group,
}

/// A node in the scene graph.
#[derive(Debug)]
pub struct SceneNode {
    name: String,
    kind: NodeKind,
    /// Ordered; a unit's parent-edge index is a position in this list.
    parents: SmallVec<[NodeId; 4]>,
    children: SmallVec<[NodeId; 4]>,
}

impl SceneNode {
    pub(crate) fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parents: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_unit(&self) -> Option<&Unit> {
        match &self.kind {
            NodeKind::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_unit_mut(&mut self) -> Option<&mut Unit> {
        match &mut self.kind {
            NodeKind::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_processor(&self) -> Option<&Processor> {
        match &self.kind {
            NodeKind::Processor(processor) => Some(processor),
            _ => None,
        }
    }

    pub fn as_processor_mut(&mut self) -> Option<&mut Processor> {
        match &mut self.kind {
            NodeKind::Processor(processor) => Some(processor),
            _ => None,
        }
    }

    pub fn as_barrier(&self) -> Option<&Barrier> {
        match &self.kind {
            NodeKind::Barrier(barrier) => Some(barrier),
            _ => None,
        }
    }

    pub fn as_barrier_mut(&mut self) -> Option<&mut Barrier> {
        match &mut self.kind {
            NodeKind::Barrier(barrier) => Some(barrier),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.kind, NodeKind::Unit(_))
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn add_parent(&mut self, parent: NodeId) {
        self.parents.push(parent);
    }

    pub(crate) fn remove_parent(&mut self, parent: NodeId) {
        self.parents.retain(|p| *p != parent);
    }

    pub(crate) fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|c| *c != child);
    }
}
