//! Fitting images onto pages
//!
//! Every image gets its own page. It is scaled uniformly so it fits inside the
//! page margins and then centered on the page.

use crate::options::PageGeometry;
use crate::types::{ImageEntry, PagePlacement};

/// Uniform scale that fits a source into the target area.
pub fn calculate_scale(src_width: f32, src_height: f32, target_width: f32, target_height: f32) -> f32 {
    let scale_w = target_width / src_width;
    let scale_h = target_height / src_height;
    scale_w.min(scale_h)
}

/// Place an image of the given pixel size on a page.
pub fn place_image(width_px: u32, height_px: u32, geometry: &PageGeometry) -> PagePlacement {
    let (avail_w, avail_h) = geometry.available_area();
    let (src_w, src_h) = (width_px as f32, height_px as f32);

    let scale = calculate_scale(src_w, src_h, avail_w, avail_h);
    let width_mm = src_w * scale;
    let height_mm = src_h * scale;

    PagePlacement {
        x_mm: (geometry.page_width_mm - width_mm) / 2.0,
        y_mm: (geometry.page_height_mm - height_mm) / 2.0,
        width_mm,
        height_mm,
        scale,
    }
}

/// One placement per entry, in collection order.
pub fn plan_layout(entries: &[ImageEntry], geometry: &PageGeometry) -> Vec<PagePlacement> {
    entries
        .iter()
        .map(|entry| place_image(entry.image.width(), entry.image.height(), geometry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PaperSize;

    const EPSILON: f32 = 1e-3;

    fn a4_with_margin(margin_mm: f32) -> PageGeometry {
        PageGeometry::from_paper(PaperSize::A4, margin_mm)
    }

    #[test]
    fn test_tall_image_is_limited_by_height() {
        let geometry = a4_with_margin(10.0);
        assert_eq!(geometry.available_area(), (190.0, 277.0));

        let placement = place_image(100, 200, &geometry);
        assert!((placement.scale - 1.385).abs() < EPSILON);
        assert!((placement.width_mm - 138.5).abs() < EPSILON);
        assert!((placement.height_mm - 277.0).abs() < EPSILON);
        assert!((placement.x_mm - (210.0 - 138.5) / 2.0).abs() < EPSILON);
        assert!((placement.y_mm - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_wide_image_is_limited_by_width() {
        let geometry = a4_with_margin(10.0);
        let placement = place_image(400, 100, &geometry);
        assert!((placement.scale - 0.475).abs() < EPSILON);
        assert!((placement.width_mm - 190.0).abs() < EPSILON);
        assert!((placement.height_mm - 47.5).abs() < EPSILON);
        assert!((placement.x_mm - 10.0).abs() < EPSILON);
        assert!((placement.y_mm - (297.0 - 47.5) / 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_small_image_is_scaled_up_to_fit() {
        let geometry = a4_with_margin(10.0);
        let placement = place_image(19, 10, &geometry);
        assert!((placement.width_mm - 190.0).abs() < EPSILON);
        assert!((placement.height_mm - 100.0).abs() < EPSILON);
    }

    #[test]
    fn test_placements_fit_and_keep_aspect_ratio() {
        let sizes = [
            (1, 1),
            (1, 5000),
            (5000, 1),
            (640, 480),
            (1080, 1920),
            (3000, 2000),
            (17, 31),
        ];
        for margin in [0.0, 5.0, 10.0, 25.0] {
            for paper in [PaperSize::A4, PaperSize::Letter, PaperSize::A5] {
                let geometry = PageGeometry::from_paper(paper, margin);
                let (avail_w, avail_h) = geometry.available_area();
                for (w, h) in sizes {
                    let p = place_image(w, h, &geometry);
                    assert!(p.width_mm <= avail_w + EPSILON, "{w}x{h} too wide");
                    assert!(p.height_mm <= avail_h + EPSILON, "{w}x{h} too tall");
                    let source_ratio = w as f32 / h as f32;
                    let drawn_ratio = p.width_mm / p.height_mm;
                    assert!(
                        (source_ratio - drawn_ratio).abs() / source_ratio < 1e-4,
                        "{w}x{h} aspect changed"
                    );
                    // Centered: equal space on opposite sides
                    let right = geometry.page_width_mm - p.x_mm - p.width_mm;
                    let top = geometry.page_height_mm - p.y_mm - p.height_mm;
                    assert!((p.x_mm - right).abs() < EPSILON);
                    assert!((p.y_mm - top).abs() < EPSILON);
                    assert!(p.x_mm >= margin - EPSILON && p.y_mm >= margin - EPSILON);
                }
            }
        }
    }

    #[test]
    fn test_calculate_scale_picks_smaller_ratio() {
        assert_eq!(calculate_scale(100.0, 100.0, 50.0, 200.0), 0.5);
        assert_eq!(calculate_scale(100.0, 100.0, 300.0, 200.0), 2.0);
    }
}
