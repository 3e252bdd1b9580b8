//! PPU Graph Core
//!
//! This crate provides lazy dependency resolution for post-processing units
//! placed in a scene graph. It implements:
//!
//! - A scene graph arena with guarded frame traversals
//! - Input discovery through ancestor paths, with ignore lists and bridges
//! - Viewport derivation from a reference input or the owning processor
//! - A dirty/clean update protocol committing into a per-unit render state
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Scene graph nodes, edges and traversals
//! - `unit`: The unit itself and its update protocol
//! - `render`: Textures, shaders and the render state units write into
//! - `config`: Serializable graph settings and unit configuration
//! - `error`: The error type shared by all of the above
//!
//! # Example
//!
//! ```rust
//! use ppugraph_core::graph::{Processor, SceneGraph, VisitorKind};
//! use ppugraph_core::render::Viewport;
//!
//! let mut graph = SceneGraph::new();
//! let processor = graph.add_processor("processor", Processor::new(Viewport::new(0, 0, 800, 600)));
//! let blur = graph.add_unit("blur");
//! let tonemap = graph.add_unit("tonemap");
//! graph.add_child(processor, blur).unwrap();
//! graph.add_child(blur, tonemap).unwrap();
//!
//! let report = graph.run_pass(processor, VisitorKind::Update);
//! assert!(report.failed.is_empty());
//!
//! // tonemap reads blur's output and takes its size
//! let tonemap = graph.unit(tonemap).unwrap();
//! assert_eq!(tonemap.viewport(), Some(Viewport::new(0, 0, 800, 600)));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod render;
pub mod unit;

pub use config::{Frustum, GraphSettings, UnitConfig};
pub use error::{UnitError, UnitResult};
pub use graph::{NodeId, SceneGraph, VisitorKind};
pub use unit::Unit;
