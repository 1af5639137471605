//! The user's photo library: a directory that filtered photos are committed
//! into, guarded by a write authorization.

pub mod authorization;
pub mod save;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{
    CompressionType as PngCompressionType, FilterType as PngFilterType, PngEncoder,
};
use image::codecs::webp::WebPEncoder;
use thiserror::Error;

use crate::pending::Pending;

const MAX_NAME_ATTEMPTS: u32 = 10_000;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("photo library at {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode asset: {0}")]
    Encode(#[from] image::ImageError),
    #[error("asset has no pixel data")]
    EmptyAsset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Jpg,
    Png,
    Webp,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => ExportFormat::Png,
            "webp" => ExportFormat::Webp,
            _ => ExportFormat::Jpg,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpg => "jpg",
            ExportFormat::Png => "png",
            ExportFormat::Webp => "webp",
        }
    }
}

/// Asks the library to create one new photo asset from a bitmap.
pub struct AssetCreationRequest {
    image: DynamicImage,
}

impl AssetCreationRequest {
    pub fn from_image(image: DynamicImage) -> Self {
        Self { image }
    }
}

#[derive(Clone, Debug)]
pub struct PhotoLibrary {
    root: PathBuf,
    format: ExportFormat,
    jpg_quality: u8,
}

impl PhotoLibrary {
    pub fn new(root: PathBuf, format: ExportFormat, jpg_quality: u8) -> Self {
        Self {
            root,
            format,
            jpg_quality: jpg_quality.clamp(1, 100),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs a change transaction on a worker thread.
    ///
    /// The asset either lands in the library complete or not at all.
    pub fn perform_changes(
        &self,
        request: AssetCreationRequest,
    ) -> Pending<Result<PathBuf, LibraryError>> {
        let (tx, pending) = Pending::channel();
        let library = self.clone();
        std::thread::spawn(move || {
            let _ = tx.send(library.commit(&request));
        });
        pending
    }

    fn commit(&self, request: &AssetCreationRequest) -> Result<PathBuf, LibraryError> {
        if request.image.width() == 0 || request.image.height() == 0 {
            return Err(LibraryError::EmptyAsset);
        }
        std::fs::create_dir_all(&self.root).map_err(|source| LibraryError::Unavailable {
            path: self.root.clone(),
            source,
        })?;

        let stamp = asset_stamp();
        let extension = self.format.extension();
        let (partial_path, file) = reserve_partial(&self.root, stamp, extension)?;
        let published = self
            .write_encoded(&request.image, file, &partial_path)
            .and_then(|()| publish_asset(&partial_path, &self.root, stamp, extension));
        // The partial file is never part of the library, committed or not.
        let _ = std::fs::remove_file(&partial_path);
        published
    }

    fn write_encoded(
        &self,
        image: &DynamicImage,
        file: File,
        path: &Path,
    ) -> Result<(), LibraryError> {
        let mut writer = BufWriter::new(file);
        match self.format {
            ExportFormat::Jpg => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut writer, self.jpg_quality);
                rgb.write_with_encoder(encoder)?;
            }
            ExportFormat::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut writer,
                    PngCompressionType::Level(6),
                    PngFilterType::Adaptive,
                );
                image.write_with_encoder(encoder)?;
            }
            ExportFormat::Webp => {
                let encoder = WebPEncoder::new_lossless(&mut writer);
                DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(encoder)?;
            }
        }
        writer.flush().map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn asset_stamp() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

fn asset_name(stamp: u128, n: u32, extension: &str) -> String {
    if n == 1 {
        format!("IMG_{}.{}", stamp, extension)
    } else {
        format!("IMG_{}-{}.{}", stamp, n, extension)
    }
}

fn names_exhausted(root: &Path) -> LibraryError {
    LibraryError::Io {
        path: root.to_path_buf(),
        source: std::io::Error::new(
            ErrorKind::AlreadyExists,
            "no free asset name left for this timestamp",
        ),
    }
}

/// Exclusively creates a hidden `.IMG_<millis>[-n].<ext>.partial` file to
/// encode into, so concurrent transactions never share one.
fn reserve_partial(
    root: &Path,
    stamp: u128,
    extension: &str,
) -> Result<(PathBuf, File), LibraryError> {
    for n in 1..MAX_NAME_ATTEMPTS {
        let candidate = partial_path_for(&root.join(asset_name(stamp, n, extension)));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(LibraryError::Io {
                    path: candidate,
                    source,
                });
            }
        }
    }
    Err(names_exhausted(root))
}

/// Gives the finished partial file its first free `IMG_<millis>[-n]` name.
///
/// Existing assets are never replaced.
fn publish_asset(
    partial: &Path,
    root: &Path,
    stamp: u128,
    extension: &str,
) -> Result<PathBuf, LibraryError> {
    for n in 1..MAX_NAME_ATTEMPTS {
        let asset = root.join(asset_name(stamp, n, extension));
        match place_without_clobbering(partial, &asset) {
            Ok(()) => return Ok(asset),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(LibraryError::Io { path: asset, source }),
        }
    }
    Err(names_exhausted(root))
}

fn place_without_clobbering(partial: &Path, asset: &Path) -> std::io::Result<()> {
    match std::fs::hard_link(partial, asset) {
        Err(err) if err.kind() != ErrorKind::AlreadyExists => {
            // No hard links on this filesystem: checked rename instead.
            tracing::debug!(%err, "hard link unavailable; renaming partial asset");
            if asset.exists() {
                return Err(ErrorKind::AlreadyExists.into());
            }
            std::fs::rename(partial, asset)
        }
        other => other,
    }
}

fn partial_path_for(asset_path: &Path) -> PathBuf {
    let name = asset_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy();
    asset_path.with_file_name(format!(".{}.partial", name))
}
