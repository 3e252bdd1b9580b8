//! Render Collaborators
//!
//! Minimal stand-ins for the graphics objects a unit manipulates: image
//! buffers, shader programs, and the render state they are committed to.
//! They carry exactly the information the resolution protocol needs
//! (sizes, formats, identities, bindings) and nothing that would require a
//! graphics context.

mod shader;
mod state;
mod texture;
mod viewport;

pub use shader::{ProgramId, Shader};
pub use state::{RenderState, TextureBinding, UniformValue, MAX_TEXTURE_SLOTS};
pub use texture::{PixelFormat, SourceFormat, Texture, TextureDesc, TextureTarget};
pub use viewport::Viewport;
