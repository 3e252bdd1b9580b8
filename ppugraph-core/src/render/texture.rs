//! Image buffer descriptors.
//!
//! A [`Texture`] is a shared handle: the unit that produces it and every
//! downstream unit that samples it hold the same descriptor, and the buffer
//! lives as long as its longest holder. Identity is pointer identity.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Internal pixel format of an image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgba8,
    Rgb8,
    #[default]
    Rgba16F,
    Rgb16F,
    Rgba32F,
    Rgb32F,
    R32F,
    Depth24,
}

impl PixelFormat {
    /// Client-side layout matching this internal format.
    pub fn source_format(self) -> SourceFormat {
        match self {
            Self::Rgba8 | Self::Rgba16F | Self::Rgba32F => SourceFormat::Rgba,
            Self::Rgb8 | Self::Rgb16F | Self::Rgb32F => SourceFormat::Rgb,
            Self::R32F => SourceFormat::Red,
            Self::Depth24 => SourceFormat::Depth,
        }
    }
}

/// Channel layout of the data uploaded to or read from a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Rgba,
    Rgb,
    Red,
    Depth,
}

/// Sampling target of a buffer, used to pick the sampler uniform type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTarget {
    #[default]
    Texture2D,
    Rectangle,
    Texture3D,
    CubeMap,
}

/// Format description of one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub source_format: SourceFormat,
    pub target: TextureTarget,
}

/// Shared handle to an image buffer descriptor.
#[derive(Clone)]
pub struct Texture {
    inner: Arc<RwLock<TextureDesc>>,
}

impl Texture {
    /// Create a 2D buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self::with_target(width, height, format, TextureTarget::Texture2D)
    }

    pub fn with_target(width: u32, height: u32, format: PixelFormat, target: TextureTarget) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TextureDesc {
                width,
                height,
                format,
                source_format: format.source_format(),
                target,
            })),
        }
    }

    pub fn width(&self) -> u32 {
        self.inner.read().width
    }

    pub fn height(&self) -> u32 {
        self.inner.read().height
    }

    pub fn size(&self) -> (u32, u32) {
        let desc = self.inner.read();
        (desc.width, desc.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.inner.read().format
    }

    pub fn source_format(&self) -> SourceFormat {
        self.inner.read().source_format
    }

    pub fn target(&self) -> TextureTarget {
        self.inner.read().target
    }

    /// Snapshot of the whole descriptor.
    pub fn desc(&self) -> TextureDesc {
        self.inner.read().clone()
    }

    /// Resize the buffer. Every holder sees the new size.
    pub fn set_size(&self, width: u32, height: u32) {
        let mut desc = self.inner.write();
        desc.width = width;
        desc.height = height;
    }

    /// Change the internal format; the source format follows.
    pub fn set_format(&self, format: PixelFormat) {
        let mut desc = self.inner.write();
        desc.format = format;
        desc.source_format = format.source_format();
    }

    /// Whether both handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this buffer.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Texture {}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = self.inner.read();
        write!(
            f,
            "Texture({:#x} {}x{} {:?})",
            self.addr(),
            desc.width,
            desc.height,
            desc.format
        )
    }
}
