use crate::constants::{DEFAULT_DOCUMENT_NAME, DEFAULT_MARGIN_MM};
use crate::name::DocumentName;
use crate::types::*;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Standard paper sizes, always portrait
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PaperSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }
}

/// Physical page size and the uniform margin around the drawing area
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PageGeometry {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::from_paper(PaperSize::A4, DEFAULT_MARGIN_MM)
    }
}

impl PageGeometry {
    pub fn from_paper(paper: PaperSize, margin_mm: f32) -> Self {
        let (page_width_mm, page_height_mm) = paper.dimensions_mm();
        Self {
            page_width_mm,
            page_height_mm,
            margin_mm,
        }
    }

    /// Width and height left for the image once margins are removed
    pub fn available_area(&self) -> (f32, f32) {
        (
            self.page_width_mm - 2.0 * self.margin_mm,
            self.page_height_mm - 2.0 * self.margin_mm,
        )
    }

    pub fn validate(&self) -> Result<()> {
        let dims = [self.page_width_mm, self.page_height_mm, self.margin_mm];
        if dims.iter().any(|v| !v.is_finite()) {
            return Err(ImagesError::Config(
                "Page dimensions must be finite numbers".to_string(),
            ));
        }
        if self.page_width_mm <= 0.0 || self.page_height_mm <= 0.0 {
            return Err(ImagesError::Config(format!(
                "Page size must be positive, got {}x{} mm",
                self.page_width_mm, self.page_height_mm
            )));
        }
        if self.margin_mm < 0.0 {
            return Err(ImagesError::Config("Margin cannot be negative".to_string()));
        }
        let (avail_w, avail_h) = self.available_area();
        if avail_w <= 0.0 || avail_h <= 0.0 {
            return Err(ImagesError::Config(format!(
                "Margin of {} mm leaves no drawing area on a {}x{} mm page",
                self.margin_mm, self.page_width_mm, self.page_height_mm
            )));
        }
        Ok(())
    }
}

/// Order in which a batch of concurrently decoded files joins the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AppendOrder {
    /// Same order the files were selected in, whatever order decodes finish
    #[default]
    Selection,
    /// Each file is appended as soon as its decode completes
    Completion,
}

/// Everything needed to turn a collection into a document
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssemblyOptions {
    pub paper_size: PaperSize,
    pub margin_mm: f32,
    /// Raw name as typed; sanitized before use
    pub output_name: String,
    pub output_dir: PathBuf,
    pub append_order: AppendOrder,
    /// Per-image decode timeout, unlimited when unset
    pub decode_timeout_secs: Option<u64>,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            margin_mm: DEFAULT_MARGIN_MM,
            output_name: DEFAULT_DOCUMENT_NAME.to_string(),
            output_dir: PathBuf::from("."),
            append_order: AppendOrder::Selection,
            decode_timeout_secs: None,
        }
    }
}

impl AssemblyOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| ImagesError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ImagesError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn geometry(&self) -> PageGeometry {
        PageGeometry::from_paper(self.paper_size, self.margin_mm)
    }

    pub fn document_name(&self) -> DocumentName {
        DocumentName::new(&self.output_name)
    }

    pub fn decode_timeout(&self) -> Option<Duration> {
        self.decode_timeout_secs.map(Duration::from_secs)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.document_name().file_name())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        self.geometry().validate()?;
        if self.decode_timeout_secs == Some(0) {
            return Err(ImagesError::Config(
                "Decode timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}
