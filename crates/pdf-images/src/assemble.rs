//! Turning an ordered list of images into a PDF, one image per page

use crate::constants::{PLACEMENT_DPI, mm_to_pt};
use crate::layout::plan_layout;
use crate::name::DocumentName;
use crate::options::PageGeometry;
use crate::types::{AssemblyReport, DecodedImage, ImageEntry, ImagesError, PagePlacement, Result};
use printpdf::*;
use std::path::{Path, PathBuf};

/// Build the document and write it to `<output_dir>/<name>.pdf`.
///
/// `entries` is treated as a snapshot: pages follow its order exactly. Nothing
/// is written when it is empty.
pub async fn assemble(
    entries: &[ImageEntry],
    geometry: &PageGeometry,
    output_dir: impl AsRef<Path>,
    name: &DocumentName,
) -> Result<AssemblyReport> {
    let document = render_document(entries, geometry, name).await?;
    let path: PathBuf = output_dir.as_ref().join(name.file_name());
    write_pdf(&document.bytes, &path).await?;
    log::info!("Wrote {} page(s) to {}", document.page_count(), path.display());
    Ok(document.into_report(path))
}

/// A finished document that has not been written anywhere yet
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub placements: Vec<PagePlacement>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }

    pub fn into_report(self, path: PathBuf) -> AssemblyReport {
        AssemblyReport {
            path,
            page_count: self.placements.len(),
            placements: self.placements,
        }
    }
}

/// Render the document on the blocking pool without touching the disk.
pub async fn render_document(
    entries: &[ImageEntry],
    geometry: &PageGeometry,
    name: &DocumentName,
) -> Result<RenderedDocument> {
    if entries.is_empty() {
        return Err(ImagesError::EmptyCollection);
    }
    geometry.validate()?;

    let entries = entries.to_vec();
    let geometry = *geometry;
    let title = name.to_string();
    let placements = plan_layout(&entries, &geometry);

    // PDF generation is CPU-bound, spawn blocking
    let bytes =
        tokio::task::spawn_blocking(move || render_pdf_bytes(&entries, &geometry, &title)).await??;

    Ok(RenderedDocument { bytes, placements })
}

/// Write finished document bytes, creating the parent directory if needed
pub async fn write_pdf(bytes: &[u8], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Render the document in memory.
pub fn render_pdf_bytes(
    entries: &[ImageEntry],
    geometry: &PageGeometry,
    title: &str,
) -> Result<Vec<u8>> {
    if entries.is_empty() {
        return Err(ImagesError::EmptyCollection);
    }
    geometry.validate()?;

    let mut doc = PdfDocument::new(title);
    let placements = plan_layout(entries, geometry);

    for (entry, placement) in entries.iter().zip(&placements) {
        let image_id = doc.add_image(&to_raw_image(&entry.image));
        let (width_px, height_px) = entry.image.dimensions();

        // At PLACEMENT_DPI one pixel is one point, so the scale is simply
        // the drawn size in points over the pixel count.
        let transform = XObjectTransform {
            translate_x: Some(Pt(mm_to_pt(placement.x_mm))),
            translate_y: Some(Pt(mm_to_pt(placement.y_mm))),
            scale_x: Some(mm_to_pt(placement.width_mm) / width_px as f32),
            scale_y: Some(mm_to_pt(placement.height_mm) / height_px as f32),
            dpi: Some(PLACEMENT_DPI),
            ..Default::default()
        };

        log::debug!(
            "Page {}: {} at ({:.1}, {:.1}) mm, {:.1}x{:.1} mm",
            doc.pages.len() + 1,
            entry.display_name,
            placement.x_mm,
            placement.y_mm,
            placement.width_mm,
            placement.height_mm
        );

        doc.pages.push(PdfPage::new(
            Mm(geometry.page_width_mm),
            Mm(geometry.page_height_mm),
            vec![Op::UseXobject {
                id: image_id,
                transform,
            }],
        ));
    }

    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        log::debug!("printpdf reported {} warning(s) while saving", warnings.len());
    }

    if bytes.is_empty() {
        return Err(ImagesError::Pdf("document serialized to zero bytes".to_string()));
    }

    Ok(bytes)
}

fn to_raw_image(image: &DecodedImage) -> RawImage {
    RawImage {
        pixels: RawImageData::U8(image.rgb().to_vec()),
        width: image.width() as usize,
        height: image.height() as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    }
}
