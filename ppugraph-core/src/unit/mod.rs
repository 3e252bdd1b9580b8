//! Processing Units
//!
//! A [`Unit`] is one node of the post-processing dataflow graph. It reads
//! the outputs of the units above it, applies a shader over a viewport and
//! exposes its own outputs to the units below.
//!
//! # Lifecycle
//!
//! A unit starts dirty. Every setter that touches inputs, outputs, the
//! shader, the viewport, the ignore list or the viewport reference marks
//! it dirty again. [`crate::graph::SceneGraph::update_unit`] turns a dirty
//! unit clean by:
//!
//! 1. resolving its inputs from its ancestors, forcing their update first
//! 2. deriving the viewport from the reference input
//! 3. committing inputs, shader and viewport to the render state
//! 4. emitting debug info
//! 5. regenerating the viewport and sampler uniforms
//!
//! Updating a clean unit does nothing, which is what makes the recursive
//! pull through a DAG cheap: every shared ancestor is recomputed once.
//!
//! # Submodules
//!
//! - `guard`: once-per-pass traversal guard
//! - `observer`: change notifications
//! - `resolver`: input discovery and bridges
//! - `sync`: viewport derivation
//! - `binding`: render state and uniforms
//! - `update`: the dirty/clean protocol

mod binding;
mod guard;
mod observer;
mod resolver;
mod sync;
mod update;

use std::collections::BTreeMap;

use glam::Mat4;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::config::Frustum;
use crate::graph::NodeId;
use crate::render::{PixelFormat, RenderState, Shader, Texture, Viewport};

pub use binding::{VIEWPORT_HEIGHT_UNIFORM, VIEWPORT_WIDTH_UNIFORM};
pub use guard::TraversalGuard;
pub use observer::{Observer, ObserverId, UnitEvent};

/// Origin of a unit's viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewportSource {
    /// No viewport yet.
    #[default]
    Unset,
    /// Set by hand; only its size follows the reference input.
    Explicit,
    /// Copied from the processor; refreshed on every resolution.
    Processor,
    /// Created from the reference input's size.
    Reference,
}

/// A post-processing unit.
#[derive(Debug)]
pub struct Unit {
    /// Position hint inside the owning pipeline.
    index: i32,
    active: bool,
    /// Inputs are set by hand instead of discovered.
    offline: bool,

    /// Slot -> upstream buffer, bridges included.
    inputs: BTreeMap<usize, Texture>,
    /// Discovered or hand-set slots.
    direct_inputs: BTreeMap<usize, Texture>,
    /// Slots taken by `direct_inputs`, unbound ones included.
    direct_slots: usize,
    /// Bridging unit -> its output. Laid out after the direct slots.
    bridged_inputs: IndexMap<NodeId, Texture>,
    /// Discovery positions that never become slots.
    ignore_list: SmallVec<[usize; 4]>,

    /// Render target -> output buffer. Target 0 always has an entry.
    outputs: IndexMap<usize, Option<Texture>>,
    output_format: PixelFormat,

    viewport: Option<Viewport>,
    viewport_source: ViewportSource,
    viewport_reference: Option<usize>,

    shader: Option<Shader>,
    /// Ancestor -> (uniform name, parent edge index).
    input_uniforms: IndexMap<NodeId, (String, usize)>,

    dirty: bool,
    guard: TraversalGuard,
    state: RenderState,
    projection: Mat4,
    modelview: Mat4,
    observers: Vec<Observer>,
    /// Completed recomputations.
    revision: u64,
}

impl Unit {
    /// Create an empty, dirty unit.
    pub fn new() -> Self {
        Self::with_frustum(Frustum::default())
    }

    /// Create an empty, dirty unit with the given default projection.
    pub fn with_frustum(frustum: Frustum) -> Self {
        let mut outputs = IndexMap::new();
        outputs.insert(0, None);

        Self {
            index: -1,
            active: true,
            offline: false,
            inputs: BTreeMap::new(),
            direct_inputs: BTreeMap::new(),
            direct_slots: 0,
            bridged_inputs: IndexMap::new(),
            ignore_list: SmallVec::new(),
            outputs,
            output_format: PixelFormat::default(),
            viewport: None,
            viewport_source: ViewportSource::Unset,
            viewport_reference: Some(0),
            shader: None,
            input_uniforms: IndexMap::new(),
            dirty: true,
            guard: TraversalGuard::new(),
            state: RenderState::new(),
            projection: frustum.projection(),
            modelview: Mat4::IDENTITY,
            observers: Vec::new(),
            revision: 0,
        }
    }

    /// Copy of this unit that shares its buffers and shader.
    ///
    /// Shared with the source: input, output and bridged buffers, the
    /// shader, the named input bindings. Copied by value: index, flags,
    /// format, viewport, reference input, ignore list, matrices, guard.
    /// Fresh: render state (rebuilt on first update), observers, revision.
    /// The clone starts dirty.
    pub fn shallow_clone(&self) -> Self {
        Self {
            index: self.index,
            active: self.active,
            offline: self.offline,
            inputs: self.inputs.clone(),
            direct_inputs: self.direct_inputs.clone(),
            direct_slots: self.direct_slots,
            bridged_inputs: self.bridged_inputs.clone(),
            ignore_list: self.ignore_list.clone(),
            outputs: self.outputs.clone(),
            output_format: self.output_format,
            viewport: self.viewport,
            viewport_source: self.viewport_source,
            viewport_reference: self.viewport_reference,
            shader: self.shader.clone(),
            input_uniforms: self.input_uniforms.clone(),
            dirty: true,
            guard: self.guard,
            state: RenderState::new(),
            projection: self.projection,
            modelview: self.modelview,
            observers: Vec::new(),
            revision: 0,
        }
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn set_index(&mut self, index: i32) {
        self.index = index;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark derived state stale. It is recomputed on the next update.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Number of completed recomputations.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn guard(&self) -> &TraversalGuard {
        &self.guard
    }

    pub(crate) fn guard_mut(&mut self) -> &mut TraversalGuard {
        &mut self.guard
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    pub fn input_texture(&self, slot: usize) -> Option<&Texture> {
        self.inputs.get(&slot)
    }

    /// Bound input slots in slot order.
    pub fn inputs(&self) -> impl Iterator<Item = (usize, &Texture)> {
        self.inputs.iter().map(|(slot, tex)| (*slot, tex))
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Bind or unbind an input slot by hand. Meant for offline units;
    /// online units overwrite discovered slots on their next update.
    pub fn set_input_texture(&mut self, slot: usize, texture: Option<Texture>) {
        match texture {
            Some(tex) => {
                self.direct_inputs.insert(slot, tex);
                self.direct_slots = self.direct_slots.max(slot + 1);
            }
            None => {
                self.direct_inputs.remove(&slot);
            }
        }
        self.lay_out_inputs();
        self.mark_dirty();
    }

    /// Units currently bridging into this one, in the order their slots
    /// follow the direct inputs.
    pub fn bridge_sources(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.bridged_inputs.keys().copied()
    }

    /// Feed the output of `source` into the slot reserved for it after the
    /// direct inputs.
    pub(crate) fn bridge_input(&mut self, source: NodeId, texture: Texture) {
        self.bridged_inputs.insert(source, texture);
        self.lay_out_inputs();
        self.mark_dirty();
    }

    /// Drop bridges whose source fails `keep`. Returns whether any went.
    pub(crate) fn retain_bridges(&mut self, mut keep: impl FnMut(NodeId) -> bool) -> bool {
        let before = self.bridged_inputs.len();
        self.bridged_inputs.retain(|source, _| keep(*source));
        if self.bridged_inputs.len() == before {
            return false;
        }
        self.lay_out_inputs();
        true
    }

    /// Rebuild `inputs`: direct slots first, then one slot per bridge.
    pub(crate) fn lay_out_inputs(&mut self) {
        let mut inputs = self.direct_inputs.clone();
        for (offset, tex) in self.bridged_inputs.values().enumerate() {
            inputs.insert(self.direct_slots + offset, tex.clone());
        }
        self.inputs = inputs;
    }

    pub fn is_input_ignored(&self, position: usize) -> bool {
        self.ignore_list.contains(&position)
    }

    /// Exclude (or stop excluding) discovery position `position` from slot
    /// assignment.
    pub fn set_ignore_input(&mut self, position: usize, ignore: bool) {
        let ignored = self.is_input_ignored(position);
        if ignore && !ignored {
            self.ignore_list.push(position);
            self.mark_dirty();
        } else if !ignore && ignored {
            self.ignore_list.retain(|p| *p != position);
            self.mark_dirty();
        }
    }

    pub fn ignored_inputs(&self) -> &[usize] {
        &self.ignore_list
    }

    // ------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------

    pub fn output_texture(&self, mrt: usize) -> Option<&Texture> {
        self.outputs.get(&mrt).and_then(Option::as_ref)
    }

    /// Render targets with their buffers, including unbound ones.
    pub fn outputs(&self) -> impl Iterator<Item = (usize, Option<&Texture>)> {
        self.outputs.iter().map(|(mrt, tex)| (*mrt, tex.as_ref()))
    }

    pub fn set_output_texture(&mut self, mrt: usize, texture: Option<Texture>) {
        self.outputs.insert(mrt, texture);
        self.mark_dirty();
    }

    /// Output buffer of render target `mrt`, created on first request with
    /// the unit's format and viewport size.
    pub fn get_or_create_output_texture(&mut self, mrt: usize) -> Texture {
        let (width, height) = self.viewport.map(|vp| vp.size()).unwrap_or((0, 0));
        let format = self.output_format;
        self.outputs
            .entry(mrt)
            .or_insert(None)
            .get_or_insert_with(|| Texture::new(width, height, format))
            .clone()
    }

    pub fn output_internal_format(&self) -> PixelFormat {
        self.output_format
    }

    /// Set the format of new outputs and convert every existing one.
    pub fn set_output_internal_format(&mut self, format: PixelFormat) {
        self.output_format = format;
        for tex in self.outputs.values().flatten() {
            tex.set_format(format);
        }
        self.mark_dirty();
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Where the current viewport came from.
    pub fn viewport_source(&self) -> ViewportSource {
        self.viewport_source
    }

    /// Set the viewport explicitly.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.viewport_source = ViewportSource::Explicit;
        self.state.set_viewport(Some(viewport));
        self.mark_dirty();
    }

    pub fn viewport_reference_input(&self) -> Option<usize> {
        self.viewport_reference
    }

    /// Input slot whose buffer size drives the viewport, `None` to stop
    /// deriving. Always marks the unit dirty.
    pub fn set_viewport_reference_input(&mut self, slot: Option<usize>) {
        self.viewport_reference = slot;
        self.mark_dirty();
    }

    // ------------------------------------------------------------------
    // Shader
    // ------------------------------------------------------------------

    pub fn shader(&self) -> Option<&Shader> {
        self.shader.as_ref()
    }

    /// Replace the shader. A previously assigned shader is disabled first.
    pub fn set_shader(&mut self, shader: Option<Shader>) {
        let same = match (&self.shader, &shader) {
            (Some(old), Some(new)) => old.ptr_eq(new),
            _ => false,
        };
        if !same {
            self.remove_shader();
        }
        self.shader = shader;
        self.mark_dirty();
    }

    /// Named input bindings: ancestor -> (uniform name, parent edge index).
    pub fn input_uniforms(&self) -> impl Iterator<Item = (NodeId, &str, usize)> {
        self.input_uniforms
            .iter()
            .map(|(parent, (name, edge))| (*parent, name.as_str(), *edge))
    }

    // ------------------------------------------------------------------
    // Render state and matrices
    // ------------------------------------------------------------------

    pub fn render_state(&self) -> &RenderState {
        &self.state
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn modelview(&self) -> Mat4 {
        self.modelview
    }

    pub fn set_modelview(&mut self, modelview: Mat4) {
        self.modelview = modelview;
    }

    /// Orthographic projection used when drawing the unit's quad.
    pub fn set_rendering_frustum(&mut self, left: f32, top: f32, right: f32, bottom: f32) {
        self.projection = Frustum::ortho_2d(left, top, right, bottom).projection();
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Subscribe to change notifications.
    pub fn subscribe<F>(&mut self, notify: F) -> ObserverId
    where
        F: Fn(&UnitEvent) + Send + Sync + 'static,
    {
        let observer = Observer::new(notify);
        let id = observer.id();
        self.observers.push(observer);
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id() != id);
        self.observers.len() != before
    }

    pub(crate) fn notify(&self, event: UnitEvent) {
        for observer in &self.observers {
            observer.notify(&event);
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::new()
    }
}
