use std::path::Path;

use image::DynamicImage;

/// Reads the EXIF orientation tag (1-8) from an image file.
pub fn read_orientation(path: &Path) -> anyhow::Result<Option<u32>> {
    let file = std::fs::File::open(path)?;
    let mut bufreader = std::io::BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut bufreader)?;

    Ok(exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0)))
}

/// Rotates/flips a decoded image so it displays upright.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba};

    use super::apply_orientation;

    // 2x1: red on the left, blue on the right.
    fn marker() -> DynamicImage {
        let mut buf = ImageBuffer::from_pixel(2, 1, Rgba([0u8, 0, 255, 255]));
        buf.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        DynamicImage::ImageRgba8(buf)
    }

    #[test]
    fn upright_orientation_is_untouched() {
        let out = apply_orientation(marker(), 1).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn orientation_six_rotates_clockwise() {
        let out = apply_orientation(marker(), 6).to_rgba8();
        assert_eq!(out.dimensions(), (1, 2));
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(0, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn orientation_two_mirrors() {
        let out = apply_orientation(marker(), 2).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn unknown_orientation_is_ignored() {
        let out = apply_orientation(marker(), 42).to_rgba8();
        assert_eq!(out.dimensions(), (2, 1));
    }
}
