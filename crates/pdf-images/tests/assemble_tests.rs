use pdf_images::*;
use std::sync::Arc;
use tempfile::TempDir;

fn entries(sizes: &[(u32, u32)]) -> Vec<ImageEntry> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| ImageEntry {
            id: ImageId::next(),
            display_name: format!("image{i}.png"),
            image: Arc::new(DecodedImage::solid(w, h, [(i * 40) as u8, 90, 160]).unwrap()),
        })
        .collect()
}

fn page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
}

#[test]
fn test_page_count_matches_image_count() {
    let geometry = PageGeometry::default();
    for count in [1, 3, 10] {
        let sizes: Vec<_> = (0..count).map(|i| (10 + i as u32, 20)).collect();
        let bytes = render_pdf_bytes(&entries(&sizes), &geometry, "Test").unwrap();
        assert_eq!(page_count(&bytes), count, "for {count} images");
    }
}

#[test]
fn test_pages_use_configured_size() {
    let geometry = PageGeometry::from_paper(PaperSize::Letter, 5.0);
    let bytes = render_pdf_bytes(&entries(&[(30, 40)]), &geometry, "Letter").unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
    let media_box = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .clone();
    let as_f32 = |o: &lopdf::Object| o.as_float().or_else(|_| o.as_i64().map(|v| v as f32)).unwrap();
    assert!((as_f32(&media_box[2]) - mm_to_pt(215.9)).abs() < 0.5);
    assert!((as_f32(&media_box[3]) - mm_to_pt(279.4)).abs() < 0.5);
}

#[test]
fn test_render_empty_collection_fails() {
    let result = render_pdf_bytes(&[], &PageGeometry::default(), "Empty");
    assert!(matches!(result, Err(ImagesError::EmptyCollection)));
}

#[test]
fn test_render_rejects_invalid_geometry() {
    let geometry = PageGeometry {
        page_width_mm: 20.0,
        page_height_mm: 20.0,
        margin_mm: 10.0,
    };
    let result = render_pdf_bytes(&entries(&[(5, 5)]), &geometry, "Tight");
    assert!(matches!(result, Err(ImagesError::Config(_))));
}

#[tokio::test]
async fn test_assemble_writes_named_file() {
    let dir = TempDir::new().unwrap();
    let name = DocumentName::new("My File!!123");
    let report = assemble(
        &entries(&[(100, 200), (400, 100)]),
        &PageGeometry::default(),
        dir.path(),
        &name,
    )
    .await
    .unwrap();

    assert_eq!(report.path, dir.path().join("MyFile123.pdf"));
    assert_eq!(report.page_count, 2);
    assert_eq!(report.placements.len(), 2);
    assert!((report.placements[0].width_mm - 138.5).abs() < 1e-3);
    assert!((report.placements[1].height_mm - 47.5).abs() < 1e-3);

    let bytes = std::fs::read(&report.path).unwrap();
    assert_eq!(page_count(&bytes), 2);
}

#[tokio::test]
async fn test_assemble_creates_missing_output_dir() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("exports").join("today");
    let report = assemble(
        &entries(&[(8, 8)]),
        &PageGeometry::default(),
        &nested,
        &DocumentName::default(),
    )
    .await
    .unwrap();
    assert_eq!(report.path, nested.join("My_PDF.pdf"));
    assert!(report.path.exists());
}

#[tokio::test]
async fn test_assemble_empty_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let result = assemble(
        &[],
        &PageGeometry::default(),
        dir.path(),
        &DocumentName::default(),
    )
    .await;

    assert!(matches!(result, Err(ImagesError::EmptyCollection)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_render_document_stays_in_memory() {
    let dir = TempDir::new().unwrap();
    let document = render_document(
        &entries(&[(20, 10), (10, 20), (5, 5)]),
        &PageGeometry::default(),
        &DocumentName::default(),
    )
    .await
    .unwrap();

    assert_eq!(document.page_count(), 3);
    assert_eq!(page_count(&document.bytes), 3);

    let report = document.into_report(dir.path().join("later.pdf"));
    assert_eq!(report.page_count, 3);
    assert_eq!(report.placements.len(), 3);
}
