//! Scene Graph
//!
//! This module implements the scene graph the units live in.
//!
//! # Overview
//!
//! The graph is an arena of [`SceneNode`]s addressed by [`NodeId`]. Every
//! node keeps its parents and its children in edge order, where:
//!
//! - A unit's parents are where its inputs come from
//! - A unit's children are the units (and barriers) consuming its output
//!
//! Nodes are tagged with a [`NodeKind`]: units, processors owning a viewport
//! and a color buffer, barriers that cut an edge for traversal while still
//! naming the node behind it, and plain groups.
//!
//! # Design Decisions
//!
//! 1. We use an arena rather than reference-counted nodes because:
//!    - Upward walks need parent links without ownership cycles
//!    - Ids stay valid for the lifetime of the graph
//!
//! 2. Edges are stored on both ends so walks go either way without a scan.
//!
//! 3. Cycles are not supported. They are detected and reported instead of
//!    looping forever.

mod node;
mod scene;
mod traversal;

pub use node::{Barrier, NodeId, NodeKind, Processor, SceneNode};
pub use scene::SceneGraph;
pub use traversal::{PassReport, VisitorKind, Walk};
