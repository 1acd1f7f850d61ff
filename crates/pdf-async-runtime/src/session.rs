use crate::{BatchId, EntrySummary, SessionCommand, SessionUpdate};
use pdf_images::{
    AssemblyOptions, Collection, ImagesError, LoadOutcome, LoadedImage, load_images_streaming,
    render_document, write_pdf,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Decode results travelling back into the worker loop
enum LoadEvent {
    Loaded { batch: BatchId, outcome: LoadOutcome },
    BatchFinished { batch: BatchId },
}

#[derive(Default)]
struct BatchProgress {
    total: usize,
    done: usize,
    added: usize,
    skipped: usize,
}

struct SessionState {
    collection: Collection,
    options: AssemblyOptions,
    batches: HashMap<BatchId, BatchProgress>,
    next_batch: u64,
    /// Bumped by every `Assemble`; a run whose number is stale is superseded
    assembly_generation: Arc<AtomicU64>,
    /// Held across the staleness check and the file write
    write_lock: Arc<Mutex<()>>,
    load_tx: mpsc::UnboundedSender<LoadEvent>,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
}

/// Spawn a session worker on the current runtime.
pub fn spawn_session(
    options: AssemblyOptions,
) -> (
    mpsc::UnboundedSender<SessionCommand>,
    mpsc::UnboundedReceiver<SessionUpdate>,
    JoinHandle<()>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(session_task(command_rx, update_tx, options));
    (command_tx, update_rx, task)
}

/// Async worker that owns the collection.
///
/// Commands and decode completions are handled one at a time from this loop,
/// so the collection only ever has one writer. Returns once the command
/// channel closes.
pub async fn session_task(
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
    options: AssemblyOptions,
) {
    let (load_tx, mut load_rx) = mpsc::unbounded_channel();
    let mut state = SessionState {
        collection: Collection::new(),
        options,
        batches: HashMap::new(),
        next_batch: 1,
        assembly_generation: Arc::new(AtomicU64::new(0)),
        write_lock: Arc::new(Mutex::new(())),
        load_tx,
        update_tx,
    };

    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(cmd) => state.process_command(cmd),
                None => break,
            },
            Some(event) = load_rx.recv() => state.process_load_event(event),
        }
    }

    // Batches still decoding are applied before the worker exits so their
    // outcomes are reported.
    while !state.batches.is_empty() {
        match load_rx.recv().await {
            Some(event) => state.process_load_event(event),
            None => break,
        }
    }
    log::debug!("Session closed with {} image(s)", state.collection.len());
}

impl SessionState {
    fn process_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::AddFiles { paths } => self.start_batch(paths),
            SessionCommand::AddDecoded { image } => {
                self.append(image);
            }
            SessionCommand::Remove { id } => {
                if self.collection.remove(id).is_some() {
                    self.publish_collection();
                } else {
                    log::debug!("Ignoring removal of unknown image {id}");
                }
            }
            SessionCommand::Move { id, to_index } => {
                if self.collection.move_to(id, to_index) {
                    self.publish_collection();
                }
            }
            SessionCommand::MoveOnto { id, target } => {
                if self.collection.move_onto(id, target) {
                    self.publish_collection();
                }
            }
            SessionCommand::SetOutputName { name } => {
                self.options.output_name = name;
                let _ = self.update_tx.send(SessionUpdate::NameChanged {
                    name: self.options.document_name(),
                });
            }
            SessionCommand::SetGeometry { geometry } => match geometry.validate() {
                Ok(()) => {
                    self.options.margin_mm = geometry.margin_mm;
                    self.options.paper_size = pdf_images::PaperSize::Custom {
                        width_mm: geometry.page_width_mm,
                        height_mm: geometry.page_height_mm,
                    };
                }
                Err(e) => self.send_error(format!("Page geometry rejected: {e}")),
            },
            SessionCommand::Assemble { output_dir } => self.start_assembly(output_dir),
        }
    }

    fn process_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Loaded { batch, outcome } => {
                let added = match outcome.result {
                    Ok(image) => {
                        self.append(image);
                        true
                    }
                    Err(ImagesError::UnsupportedType { path }) => {
                        log::info!("Skipping {}: not an image", path.display());
                        let _ = self.update_tx.send(SessionUpdate::Rejected { path });
                        false
                    }
                    Err(e) => {
                        log::warn!("Could not load {}: {e}", outcome.path.display());
                        let _ = self.update_tx.send(SessionUpdate::DecodeFailed {
                            path: outcome.path,
                            message: e.to_string(),
                        });
                        false
                    }
                };

                if let Some(progress) = self.batches.get_mut(&batch) {
                    progress.done += 1;
                    if added {
                        progress.added += 1;
                    } else {
                        progress.skipped += 1;
                    }
                    let _ = self.update_tx.send(SessionUpdate::Progress {
                        operation: "Loading images".to_string(),
                        current: progress.done,
                        total: progress.total,
                    });
                }
            }
            LoadEvent::BatchFinished { batch } => {
                if let Some(progress) = self.batches.remove(&batch) {
                    // Outcomes lost to a failed task count as skipped
                    let skipped = progress.skipped + (progress.total - progress.done);
                    let _ = self.update_tx.send(SessionUpdate::FilesLoaded {
                        batch,
                        added: progress.added,
                        skipped,
                    });
                }
            }
        }
    }

    fn append(&mut self, image: LoadedImage) {
        self.collection.append(image);
        self.publish_collection();
    }

    fn start_batch(&mut self, paths: Vec<PathBuf>) {
        let batch = BatchId(self.next_batch);
        self.next_batch += 1;
        self.batches.insert(
            batch,
            BatchProgress {
                total: paths.len(),
                ..Default::default()
            },
        );
        log::debug!("Loading {} file(s) as batch {}", paths.len(), batch.0);

        let order = self.options.append_order;
        let timeout = self.options.decode_timeout();
        let load_tx = self.load_tx.clone();
        tokio::spawn(async move {
            load_images_streaming(&paths, order, timeout, |outcome| {
                let _ = load_tx.send(LoadEvent::Loaded { batch, outcome });
            })
            .await;
            let _ = load_tx.send(LoadEvent::BatchFinished { batch });
        });
    }

    fn start_assembly(&mut self, output_dir: Option<PathBuf>) {
        if self.collection.is_empty() {
            self.send_error(ImagesError::EmptyCollection.to_string());
            return;
        }

        // Runs still rendering see the new number and stand down before writing
        let generation = self.assembly_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot = self.collection.snapshot();
        let geometry = self.options.geometry();
        let name = self.options.document_name();
        let path = output_dir
            .unwrap_or_else(|| self.options.output_dir.clone())
            .join(name.file_name());
        let current = Arc::clone(&self.assembly_generation);
        let write_lock = Arc::clone(&self.write_lock);
        let update_tx = self.update_tx.clone();

        let _ = self.update_tx.send(SessionUpdate::AssemblyStarted {
            page_count: snapshot.len(),
        });

        tokio::spawn(async move {
            let superseded = || current.load(Ordering::SeqCst) != generation;
            let fail = |e: ImagesError| {
                let _ = update_tx.send(SessionUpdate::Error {
                    message: format!("Failed to generate PDF: {e}"),
                });
            };

            let document = match render_document(&snapshot, &geometry, &name).await {
                Ok(document) => document,
                Err(e) => return fail(e),
            };

            let _guard = write_lock.lock().await;
            if superseded() {
                log::info!("Assembly {generation} superseded before writing");
                let _ = update_tx.send(SessionUpdate::AssemblyCancelled);
                return;
            }
            if let Err(e) = write_pdf(&document.bytes, &path).await {
                return fail(e);
            }

            log::info!("Wrote {} page(s) to {}", document.page_count(), path.display());
            let report = document.into_report(path);
            let _ = update_tx.send(SessionUpdate::AssemblyComplete {
                path: report.path,
                page_count: report.page_count,
                placements: report.placements,
            });
        });
    }

    fn publish_collection(&self) {
        let entries = self
            .collection
            .iter()
            .map(|entry| EntrySummary {
                id: entry.id,
                display_name: entry.display_name.clone(),
                width_px: entry.image.width(),
                height_px: entry.image.height(),
            })
            .collect();
        let _ = self
            .update_tx
            .send(SessionUpdate::CollectionChanged { entries });
    }

    fn send_error(&self, message: String) {
        log::warn!("{message}");
        let _ = self.update_tx.send(SessionUpdate::Error { message });
    }
}
