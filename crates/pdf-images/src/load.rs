//! Reading and decoding image files
//!
//! Files are sniffed by content (falling back to the extension) so that
//! anything that is not an image is rejected before decoding. Decoding is
//! CPU-bound and runs on the blocking pool. Batches decode concurrently; the
//! [`AppendOrder`] decides whether results come back in the order the files
//! were given or the order their decodes finished.

use crate::options::AppendOrder;
use crate::types::*;
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinSet;

/// Outcome of loading one file of a batch
#[derive(Debug)]
pub struct LoadOutcome {
    /// Position of the file in the submitted batch
    pub index: usize,
    pub path: PathBuf,
    pub result: Result<LoadedImage>,
}

/// Read and decode a single image file
pub async fn decode_image(path: impl AsRef<Path>) -> Result<LoadedImage> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let format = detect_format(&path, &bytes).ok_or_else(|| ImagesError::UnsupportedType {
        path: path.clone(),
    })?;
    let display_name = display_name(&path);

    let name = display_name.clone();
    let image = tokio::task::spawn_blocking(move || decode_bytes(&bytes, format, &name)).await??;
    log::debug!(
        "Decoded {} as {:?} ({}x{})",
        display_name,
        format,
        image.width(),
        image.height()
    );

    Ok(LoadedImage::new(display_name, image))
}

/// Decode an in-memory image of a known format into an RGB raster.
///
/// Transparent pixels are composited onto white.
pub fn decode_bytes(bytes: &[u8], format: ImageFormat, name: &str) -> Result<DecodedImage> {
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|e| ImagesError::Decode {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    let (width, height) = (decoded.width(), decoded.height());
    let rgb = if decoded.color().has_alpha() {
        flatten_onto_white(&decoded)
    } else {
        decoded.to_rgb8().into_raw()
    };

    DecodedImage::new(width, height, rgb).map_err(|e| match e {
        ImagesError::Decode { message, .. } => ImagesError::Decode {
            name: name.to_string(),
            message,
        },
        other => other,
    })
}

/// Decode several files concurrently and hand each outcome to `on_outcome`.
///
/// Rejected or broken files produce an error outcome and never stop the rest
/// of the batch.
pub async fn load_images_streaming<F>(
    paths: &[PathBuf],
    order: AppendOrder,
    timeout: Option<Duration>,
    mut on_outcome: F,
) where
    F: FnMut(LoadOutcome),
{
    match order {
        AppendOrder::Selection => {
            // All decodes are started up front; awaiting the handles in
            // submission order releases them in that order.
            let handles: Vec<_> = paths
                .iter()
                .cloned()
                .map(|path| tokio::spawn(decode_with_timeout(path, timeout)))
                .collect();

            for (index, (path, handle)) in paths.iter().zip(handles).enumerate() {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(ImagesError::TaskJoin(e)),
                };
                on_outcome(LoadOutcome {
                    index,
                    path: path.clone(),
                    result,
                });
            }
        }
        AppendOrder::Completion => {
            let mut tasks = JoinSet::new();
            for (index, path) in paths.iter().cloned().enumerate() {
                tasks.spawn(async move {
                    let result = decode_with_timeout(path.clone(), timeout).await;
                    LoadOutcome {
                        index,
                        path,
                        result,
                    }
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => on_outcome(outcome),
                    Err(e) => log::error!("Image decode task failed: {e}"),
                }
            }
        }
    }
}

/// Decode several files concurrently and collect the outcomes
pub async fn load_images(
    paths: &[PathBuf],
    order: AppendOrder,
    timeout: Option<Duration>,
) -> Vec<LoadOutcome> {
    let mut outcomes = Vec::with_capacity(paths.len());
    load_images_streaming(paths, order, timeout, |outcome| outcomes.push(outcome)).await;
    outcomes
}

async fn decode_with_timeout(path: PathBuf, timeout: Option<Duration>) -> Result<LoadedImage> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, decode_image(&path))
            .await
            .map_err(|_| ImagesError::DecodeTimeout {
                name: display_name(&path),
            })?,
        None => decode_image(&path).await,
    }
}

fn detect_format(path: &Path, bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes)
        .or_else(|_| ImageFormat::from_path(path))
        .ok()
        .filter(|format| format.reading_enabled())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn flatten_onto_white(image: &DynamicImage) -> Vec<u8> {
    let rgba = image.to_rgba8();
    let mut rgb = Vec::with_capacity(rgba.width() as usize * rgba.height() as usize * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        for channel in [r, g, b] {
            let blended = (channel as u32 * alpha + 255 * (255 - alpha)) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}
