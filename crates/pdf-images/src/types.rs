use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagesError {
    #[error("Unsupported file type: {}", path.display())]
    UnsupportedType { path: PathBuf },
    #[error("Failed to decode {name}: {message}")]
    Decode { name: String, message: String },
    #[error("Timed out decoding {name}")]
    DecodeTimeout { name: String },
    #[error("Please add at least one image")]
    EmptyCollection,
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ImagesError>;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an image within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

impl ImageId {
    /// Allocate a fresh, process-wide unique id
    pub fn next() -> Self {
        Self(NEXT_IMAGE_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A decoded raster, flattened to 8-bit RGB.
#[derive(Clone, PartialEq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImagesError::Decode {
                name: "raster".to_string(),
                message: format!("image has no pixels ({width}x{height})"),
            });
        }
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(ImagesError::Decode {
                name: "raster".to_string(),
                message: format!("expected {expected} RGB bytes, got {}", rgb.len()),
            });
        }
        Ok(Self { width, height, rgb })
    }

    /// A single-color image, mostly useful for previews and tests
    pub fn solid(width: u32, height: u32, color: [u8; 3]) -> Result<Self> {
        let pixels = width as usize * height as usize;
        let rgb = color.iter().copied().cycle().take(pixels * 3).collect();
        Self::new(width, height, rgb)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgb.len())
            .finish()
    }
}

/// An image that decoded successfully but is not yet part of a collection
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub display_name: String,
    pub image: DecodedImage,
}

impl LoadedImage {
    pub fn new(display_name: impl Into<String>, image: DecodedImage) -> Self {
        Self {
            display_name: display_name.into(),
            image,
        }
    }
}

/// One image in the collection. Cloning shares the raster.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub id: ImageId,
    pub display_name: String,
    pub image: Arc<DecodedImage>,
}

/// Where and how large an image is drawn on its page.
///
/// Coordinates are in millimetres from the bottom-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
    /// Millimetres per source pixel
    pub scale: f32,
}

/// Result of a successful assembly
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub path: PathBuf,
    pub page_count: usize,
    pub placements: Vec<PagePlacement>,
}
