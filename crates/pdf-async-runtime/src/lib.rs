use std::path::PathBuf;

mod session;

pub use session::{session_task, spawn_session};

// Re-export types from library crates
pub use pdf_images::{
    AppendOrder, AssemblyOptions, DocumentName, ImageId, LoadedImage, PageGeometry,
    PagePlacement,
};

/// Commands sent from the front end to the session worker
#[derive(Debug)]
pub enum SessionCommand {
    /// Decode files concurrently and append the ones that are images
    AddFiles { paths: Vec<PathBuf> },
    /// Append an image that is already decoded
    AddDecoded { image: LoadedImage },
    Remove { id: ImageId },
    /// Move an image to a position; out-of-range positions clamp
    Move { id: ImageId, to_index: usize },
    /// Drop an image onto another one, taking its slot
    MoveOnto { id: ImageId, target: ImageId },
    SetOutputName { name: String },
    SetGeometry { geometry: PageGeometry },
    /// Build the document from the current collection. An earlier assembly
    /// that has not started writing yet is cancelled.
    Assemble { output_dir: Option<PathBuf> },
}

/// Updates sent from the session worker to the front end
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    /// The full ordered collection, sent after every mutation
    CollectionChanged {
        entries: Vec<EntrySummary>,
    },
    /// A file was skipped because it is not an image
    Rejected {
        path: PathBuf,
    },
    DecodeFailed {
        path: PathBuf,
        message: String,
    },
    /// Every file of an `AddFiles` batch has been handled
    FilesLoaded {
        batch: BatchId,
        added: usize,
        skipped: usize,
    },
    NameChanged {
        name: DocumentName,
    },
    AssemblyStarted {
        page_count: usize,
    },
    /// A newer `Assemble` arrived before this run wrote its file
    AssemblyCancelled,
    AssemblyComplete {
        path: PathBuf,
        page_count: usize,
        placements: Vec<PagePlacement>,
    },
    Error {
        message: String,
    },
}

/// What the front end needs to show for one image
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySummary {
    pub id: ImageId,
    pub display_name: String,
    pub width_px: u32,
    pub height_px: u32,
}

/// Handle to one `AddFiles` batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(pub u64);
