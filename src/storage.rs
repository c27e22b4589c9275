// SPDX-License-Identifier: GPL-3.0-only

//! Picture persistence
//!
//! The module hands every still picture to a [`FileSaver`]; the result comes
//! back later through a listener so saving never blocks the module.

use crate::backends::camera::types::Role;
use crate::config::PictureFormat;
use crate::constants::THUMBNAIL_MAX_EDGE;
use crate::errors::PhotoError;
use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Small RGBA preview of a saved picture
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

/// A picture that made it to storage
#[derive(Debug, Clone, PartialEq)]
pub struct SavedMedia {
    pub uri: String,
    pub path: PathBuf,
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveResult {
    Saved(SavedMedia),
    SaveFailed(String),
}

/// One still picture to persist
#[derive(Debug, Clone)]
pub struct SaveRequest {
    /// Encoded JPEG/PNG, or raw RGB/RGBA pixels of `width` x `height`
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Identifier of the device that produced the picture
    pub device_tag: String,
    pub format: PictureFormat,
    pub role: Role,
}

pub type SaveListener = Box<dyn FnOnce(SaveResult) + Send + 'static>;

/// Persistence gateway
pub trait FileSaver: Send + Sync {
    /// Persist `request` and report the outcome through `listener`, later
    fn save(&self, request: SaveRequest, listener: SaveListener);
}

/// Writes pictures into a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct DiskFileSaver {
    directory: PathBuf,
    jpeg_quality: u8,
}

impl DiskFileSaver {
    pub fn new(directory: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            directory: directory.into(),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `IMG_<timestamp>_<ROLE>_<device>.<ext>`
    pub fn file_name(request: &SaveRequest) -> String {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let tag: String = request
            .device_tag
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!(
            "IMG_{}_{}_{}.{}",
            timestamp,
            request.role.label(),
            tag,
            request.format.extension()
        )
    }

    /// Blocking save; used from a worker thread
    pub fn persist(&self, request: &SaveRequest) -> SaveResult {
        match self.write(request) {
            Ok(media) => {
                info!(role = %request.role, path = %media.path.display(), "Picture saved");
                SaveResult::Saved(media)
            }
            Err(e) => {
                error!(role = %request.role, error = %e, "Failed to save picture");
                SaveResult::SaveFailed(e.to_string())
            }
        }
    }

    fn write(&self, request: &SaveRequest) -> Result<SavedMedia, PhotoError> {
        std::fs::create_dir_all(&self.directory)?;

        let path = self.directory.join(Self::file_name(request));
        debug!(path = %path.display(), size = request.data.len(), "Writing picture");

        let image = decode(request)?;
        let bytes = match request.format {
            PictureFormat::Jpeg if is_jpeg(&request.data) => request.data.clone(),
            PictureFormat::Jpeg => encode_jpeg(&image, self.jpeg_quality)?,
            PictureFormat::Png => encode_png(&image)?,
        };

        std::fs::write(&path, &bytes)?;

        let uri = format!("file://{}", path.display());
        Ok(SavedMedia {
            uri,
            path,
            thumbnail: Some(thumbnail(&image)),
        })
    }
}

impl FileSaver for DiskFileSaver {
    fn save(&self, request: SaveRequest, listener: SaveListener) {
        let saver = self.clone();
        let job = move || listener(saver.persist(&request));

        // File I/O and encoding are blocking; keep them off the caller
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                std::thread::spawn(job);
            }
        }
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8])
}

fn decode(request: &SaveRequest) -> Result<DynamicImage, PhotoError> {
    let pixels = request.width as usize * request.height as usize;
    if pixels > 0 && request.data.len() == pixels * 4 {
        return RgbaImage::from_raw(request.width, request.height, request.data.clone())
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| PhotoError::EncodingFailed("Invalid RGBA buffer".to_string()));
    }
    if pixels > 0 && request.data.len() == pixels * 3 {
        return RgbImage::from_raw(request.width, request.height, request.data.clone())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| PhotoError::EncodingFailed("Invalid RGB buffer".to_string()));
    }
    Ok(image::load_from_memory(&request.data)?)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, PhotoError> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )?;
    Ok(buffer)
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, PhotoError> {
    let mut buffer = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)?;
    Ok(buffer)
}

fn thumbnail(image: &DynamicImage) -> Thumbnail {
    let small = if image.width() <= THUMBNAIL_MAX_EDGE && image.height() <= THUMBNAIL_MAX_EDGE {
        image.to_rgba8()
    } else {
        image.thumbnail(THUMBNAIL_MAX_EDGE, THUMBNAIL_MAX_EDGE).to_rgba8()
    };
    Thumbnail {
        width: small.width(),
        height: small.height(),
        rgba: Arc::new(small.into_raw()),
    }
}
