use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pdf_async_runtime::{EntrySummary, SessionCommand, SessionUpdate, spawn_session};
use pdf_images::{AppendOrder, AssemblyOptions, Collection, ImageId, PaperSize, PagePlacement};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::mpsc;

mod logger;

#[derive(Parser)]
#[command(name = "imgpdf", about = "Combine images into a PDF, one image per page", version)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a PDF from images, in the order given
    Build {
        /// Input images
        #[arg(required = true, num_args = 1..)]
        images: Vec<PathBuf>,

        /// Output name (letters, digits, `_` and `-`; ".pdf" is appended)
        #[arg(short, long)]
        name: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Order loaded images join the document in
        #[arg(long, value_enum)]
        order: Option<OrderArg>,

        /// Drop the image at this 1-based position (after loading)
        #[arg(long = "remove", value_name = "INDEX")]
        remove: Vec<usize>,

        /// Move the image at FROM to TO (1-based), applied after removals
        #[arg(long = "move", value_name = "FROM:TO")]
        moves: Vec<MoveArg>,

        /// Give up on an image whose decode takes longer than this
        #[arg(long, value_name = "SECS")]
        decode_timeout: Option<u64>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show where each image would be placed, without writing a PDF
    Layout {
        /// Input images
        #[arg(required = true, num_args = 1..)]
        images: Vec<PathBuf>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Write the effective options to a JSON file
    Config {
        /// Destination file
        path: PathBuf,

        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Options file (JSON); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Paper size
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Margin on every side, in mm
    #[arg(long)]
    margin: Option<f32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Selection,
    Completion,
}

#[derive(Clone, Copy, Debug)]
struct MoveArg {
    from: usize,
    to: usize,
}

impl FromStr for MoveArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(':')
            .ok_or_else(|| format!("expected FROM:TO, got {s:?}"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| format!("positions start at 1, got {v:?}"))
        };
        Ok(Self {
            from: parse(from)?,
            to: parse(to)?,
        })
    }
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
        }
    }
}

impl From<OrderArg> for AppendOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Selection => Self::Selection,
            OrderArg::Completion => Self::Completion,
        }
    }
}

impl PageArgs {
    async fn resolve(&self) -> Result<AssemblyOptions> {
        let mut options = match &self.config {
            Some(path) => AssemblyOptions::load(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
            None => AssemblyOptions::default(),
        };
        if let Some(paper) = self.paper {
            options.paper_size = paper.into();
        }
        if let Some(margin) = self.margin {
            options.margin_mm = margin;
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::CliLogger::new(logger::CliLogger::level_for_verbosity(cli.verbose)).init()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let result = runtime.block_on(run(cli.command));
    // A read that outlived its decode timeout may still sit on the blocking
    // pool; it must not keep the process alive.
    runtime.shutdown_background();
    result
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Build {
            images,
            name,
            output_dir,
            order,
            remove,
            moves,
            decode_timeout,
            page,
        } => {
            let mut options = page.resolve().await?;
            if let Some(name) = name {
                options.output_name = name;
            }
            if let Some(dir) = output_dir {
                options.output_dir = dir;
            }
            if let Some(order) = order {
                options.append_order = order.into();
            }
            if decode_timeout.is_some() {
                options.decode_timeout_secs = decode_timeout;
            }
            options.validate()?;

            build(images, options, remove, moves).await?;
        }

        Commands::Layout { images, page } => {
            let options = page.resolve().await?;
            options.validate()?;
            layout(&images, &options).await?;
        }

        Commands::Config { path, page } => {
            let options = page.resolve().await?;
            options.validate()?;
            options.save(&path).await?;
            println!("Wrote options → {}", path.display());
        }
    }

    Ok(())
}

async fn build(
    images: Vec<PathBuf>,
    options: AssemblyOptions,
    remove: Vec<usize>,
    moves: Vec<MoveArg>,
) -> Result<()> {
    let (command_tx, mut update_rx, _session) = spawn_session(options);
    let mut entries: Vec<EntrySummary> = Vec::new();

    command_tx.send(SessionCommand::AddFiles { paths: images })?;
    loop {
        match next_update(&mut update_rx).await? {
            SessionUpdate::CollectionChanged { entries: latest } => entries = latest,
            SessionUpdate::Rejected { path } => {
                log::warn!("Skipped {} (not an image)", path.display())
            }
            SessionUpdate::DecodeFailed { path, message } => {
                log::warn!("Skipped {}: {message}", path.display())
            }
            SessionUpdate::Progress { current, total, .. } => {
                log::debug!("Loaded {current}/{total}")
            }
            SessionUpdate::FilesLoaded { added, skipped, .. } => {
                log::info!("Loaded {added} image(s), skipped {skipped}");
                break;
            }
            _ => {}
        }
    }

    for edit in plan_edits(&entries, &remove, &moves) {
        command_tx.send(edit)?;
        entries = next_collection(&mut update_rx).await?;
    }

    for (index, entry) in entries.iter().enumerate() {
        log::info!("Page {}: {}", index + 1, entry.display_name);
    }

    command_tx.send(SessionCommand::Assemble { output_dir: None })?;
    loop {
        match next_update(&mut update_rx).await? {
            SessionUpdate::AssemblyComplete {
                path, page_count, ..
            } => {
                println!("Generated {} page(s) → {}", page_count, path.display());
                return Ok(());
            }
            SessionUpdate::Error { message } => bail!(message),
            _ => {}
        }
    }
}

/// Turn 1-based `--remove` and `--move` positions into session commands.
///
/// Removal positions refer to `entries` as loaded. Moves run after every
/// removal, in the order given, each against the order the previous edit left
/// behind. Edits that would not change the order are dropped, so every
/// returned command republishes the collection.
fn plan_edits(
    entries: &[EntrySummary],
    remove: &[usize],
    moves: &[MoveArg],
) -> Vec<SessionCommand> {
    let mut order: Vec<ImageId> = entries.iter().map(|e| e.id).collect();
    let mut edits = Vec::new();

    let mut to_remove = Vec::new();
    for &position in remove {
        match position.checked_sub(1).and_then(|i| order.get(i)) {
            Some(&id) => to_remove.push(id),
            None => log::warn!("No image at position {position}, nothing removed"),
        }
    }
    to_remove.sort();
    to_remove.dedup();
    for id in to_remove {
        order.retain(|&other| other != id);
        edits.push(SessionCommand::Remove { id });
    }

    for &MoveArg { from, to } in moves {
        let Some(from_index) = from.checked_sub(1).filter(|&i| i < order.len()) else {
            log::warn!("No image at position {from}, move ignored");
            continue;
        };
        let to_index = to.saturating_sub(1).min(order.len() - 1);
        if from_index == to_index {
            continue;
        }
        let id = order.remove(from_index);
        order.insert(to_index, id);
        edits.push(SessionCommand::Move {
            id,
            to_index: to.saturating_sub(1),
        });
    }

    edits
}

async fn layout(images: &[PathBuf], options: &AssemblyOptions) -> Result<()> {
    let mut collection = Collection::new();
    for outcome in
        pdf_images::load_images(images, options.append_order, options.decode_timeout()).await
    {
        match outcome.result {
            Ok(image) => {
                collection.append(image);
            }
            Err(e) => log::warn!("Skipped {}: {e}", outcome.path.display()),
        }
    }
    if collection.is_empty() {
        bail!(pdf_images::ImagesError::EmptyCollection);
    }

    let geometry = options.geometry();
    let (avail_w, avail_h) = geometry.available_area();
    println!(
        "Page {:.1} x {:.1} mm, margin {:.1} mm, drawing area {:.1} x {:.1} mm",
        geometry.page_width_mm, geometry.page_height_mm, geometry.margin_mm, avail_w, avail_h
    );
    let placements = pdf_images::plan_layout(collection.entries(), &geometry);
    for (index, (entry, placement)) in collection.iter().zip(&placements).enumerate() {
        let PagePlacement {
            x_mm,
            y_mm,
            width_mm,
            height_mm,
            scale,
        } = *placement;
        let (w, h) = entry.image.dimensions();
        println!(
            "  {:>3}. {} ({}x{} px) → {:.1} x {:.1} mm at ({:.1}, {:.1}), {:.4} mm/px",
            index + 1,
            entry.display_name,
            w,
            h,
            width_mm,
            height_mm,
            x_mm,
            y_mm,
            scale
        );
    }
    Ok(())
}

async fn next_update(rx: &mut mpsc::UnboundedReceiver<SessionUpdate>) -> Result<SessionUpdate> {
    rx.recv().await.context("session ended unexpectedly")
}

async fn next_collection(
    rx: &mut mpsc::UnboundedReceiver<SessionUpdate>,
) -> Result<Vec<EntrySummary>> {
    loop {
        if let SessionUpdate::CollectionChanged { entries } = next_update(rx).await? {
            return Ok(entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_arg() {
        let arg: MoveArg = "3:1".parse().unwrap();
        assert_eq!((arg.from, arg.to), (3, 1));
        assert!("3".parse::<MoveArg>().is_err());
        assert!("0:2".parse::<MoveArg>().is_err());
        assert!("a:b".parse::<MoveArg>().is_err());
    }

    #[test]
    fn test_cli_parses_build() {
        let cli = Cli::try_parse_from([
            "imgpdf", "build", "a.png", "b.jpg", "-n", "scans", "--paper", "letter", "--margin",
            "5", "--move", "2:1", "--remove", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Build {
                images,
                name,
                moves,
                remove,
                page,
                ..
            } => {
                assert_eq!(images.len(), 2);
                assert_eq!(name.as_deref(), Some("scans"));
                assert_eq!(moves.len(), 1);
                assert_eq!(remove, [3]);
                assert_eq!(page.margin, Some(5.0));
                assert!(matches!(page.paper, Some(PaperArg::Letter)));
            }
            _ => panic!("Expected build command"),
        }
    }

    fn summaries(names: &[&str]) -> (Collection, Vec<EntrySummary>) {
        let mut collection = Collection::new();
        for name in names {
            let image = pdf_images::DecodedImage::solid(2, 2, [0, 0, 0]).unwrap();
            collection.append(pdf_images::LoadedImage::new(*name, image));
        }
        let entries = collection
            .iter()
            .map(|e| EntrySummary {
                id: e.id,
                display_name: e.display_name.clone(),
                width_px: e.image.width(),
                height_px: e.image.height(),
            })
            .collect();
        (collection, entries)
    }

    /// Apply planned edits the way the session does and return the names
    fn apply(collection: &mut Collection, edits: &[SessionCommand]) -> Vec<String> {
        for edit in edits {
            let changed = match *edit {
                SessionCommand::Remove { id } => collection.remove(id).is_some(),
                SessionCommand::Move { id, to_index } => collection.move_to(id, to_index),
                _ => panic!("unexpected edit {edit:?}"),
            };
            assert!(changed, "planned edit {edit:?} changed nothing");
        }
        collection.iter().map(|e| e.display_name.clone()).collect()
    }

    fn moves(args: &[&str]) -> Vec<MoveArg> {
        args.iter().map(|a| a.parse().unwrap()).collect()
    }

    #[test]
    fn test_plan_removals_use_loaded_positions() {
        let (mut collection, entries) = summaries(&["a", "b", "c", "d"]);
        // Positions 2 and 3 both refer to the loaded order, not to the order
        // after the first removal; duplicates collapse
        let edits = plan_edits(&entries, &[3, 2, 3], &[]);
        assert_eq!(edits.len(), 2);
        assert_eq!(apply(&mut collection, &edits), ["a", "d"]);
    }

    #[test]
    fn test_plan_moves_run_after_removals() {
        let (mut collection, entries) = summaries(&["a", "b", "c", "d"]);
        // With "a" gone, position 3 is "d"
        let edits = plan_edits(&entries, &[1], &moves(&["3:1"]));
        assert_eq!(apply(&mut collection, &edits), ["d", "b", "c"]);
    }

    #[test]
    fn test_plan_moves_apply_in_sequence() {
        let (mut collection, entries) = summaries(&["a", "b", "c"]);
        let edits = plan_edits(&entries, &[], &moves(&["1:3", "1:2"]));
        assert_eq!(edits.len(), 2);
        // b c a, then c b a
        assert_eq!(apply(&mut collection, &edits), ["c", "b", "a"]);
    }

    #[test]
    fn test_plan_skips_moves_that_change_nothing() {
        let (mut collection, entries) = summaries(&["a", "b", "c"]);
        // 3:9 clamps onto its own position, 2:2 is a self move
        let edits = plan_edits(&entries, &[], &moves(&["3:9", "2:2", "1:9"]));
        assert_eq!(edits.len(), 1);
        assert_eq!(apply(&mut collection, &edits), ["b", "c", "a"]);
    }

    #[test]
    fn test_plan_ignores_missing_positions() {
        let (mut collection, entries) = summaries(&["a", "b"]);
        let edits = plan_edits(&entries, &[5], &moves(&["4:1"]));
        assert!(edits.is_empty());
        assert_eq!(apply(&mut collection, &edits), ["a", "b"]);

        // Removing everything leaves nothing to move
        let edits = plan_edits(&entries, &[1, 2], &moves(&["1:2"]));
        assert_eq!(edits.len(), 2);
        assert!(apply(&mut collection, &edits).is_empty());
    }

    #[test]
    fn test_cli_requires_images() {
        assert!(Cli::try_parse_from(["imgpdf", "build"]).is_err());
    }
}
