use std::path::Path;

use image::DynamicImage;

static RAW_EXTS: &[&str] = &["raf", "dng", "nef", "cr2", "arw"];
pub static SUPPORTED_IMAGE_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "raf", "dng", "nef", "cr2", "arw",
];

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

pub fn is_raw_image(path: &Path) -> bool {
    has_extension(path, RAW_EXTS)
}

/// Returns `true` if the path has a supported image extension.
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_IMAGE_EXTS)
}

/// Opens a photo at full resolution, upright.
///
/// Standard formats go through the `image` crate and get their EXIF
/// orientation applied; RAW files are developed with `rawler`.
pub fn open_photo(path: &Path) -> anyhow::Result<DynamicImage> {
    open_photo_with_hooks(path, |p| Ok(image::open(p)?), develop_raw)
}

fn open_photo_with_hooks<FStd, FRaw>(
    path: &Path,
    open_std: FStd,
    open_raw: FRaw,
) -> anyhow::Result<DynamicImage>
where
    FStd: Fn(&Path) -> anyhow::Result<DynamicImage>,
    FRaw: Fn(&Path) -> anyhow::Result<DynamicImage>,
{
    match open_std(path) {
        Ok(img) => {
            let orientation = crate::metadata::read_orientation(path).ok().flatten();
            Ok(match orientation {
                Some(o) => crate::metadata::apply_orientation(img, o),
                None => img,
            })
        }
        Err(err) if !is_raw_image(path) => Err(err),
        Err(_) => open_raw(path),
    }
}

fn develop_raw(path: &Path) -> anyhow::Result<DynamicImage> {
    let raw = rawler::decode_file(path)?;
    let develop = rawler::imgop::develop::RawDevelop::default();
    let intermediate = develop.develop_intermediate(&raw)?;
    intermediate
        .to_dynamic_image()
        .ok_or_else(|| anyhow::anyhow!("raw develop produced invalid image"))
}
