mod assemble;
mod collection;
mod constants;
mod layout;
pub mod load;
mod name;
mod options;
mod types;

pub use assemble::{RenderedDocument, assemble, render_document, render_pdf_bytes, write_pdf};
pub use collection::Collection;
pub use constants::*;
pub use layout::{calculate_scale, place_image, plan_layout};
pub use load::{LoadOutcome, decode_bytes, decode_image, load_images, load_images_streaming};
pub use name::{DocumentName, sanitize_name};
pub use options::*;
pub use types::*;
