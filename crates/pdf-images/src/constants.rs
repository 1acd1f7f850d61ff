//! Shared constants for image-to-PDF assembly

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Defaults
// =============================================================================

/// Margin applied on every side of the page
pub const DEFAULT_MARGIN_MM: f32 = 10.0;

/// Output name used when the requested one sanitizes to nothing
pub const DEFAULT_DOCUMENT_NAME: &str = "My_PDF";

/// Extension of the emitted document
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Image DPI handed to printpdf so that one source pixel maps to one point
/// before the placement scale is applied.
pub const PLACEMENT_DPI: f32 = 72.0;
