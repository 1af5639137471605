use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

/// Logical size of the on-screen preview plus the display's pixel density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewSurface {
    pub logical_width: f32,
    pub logical_height: f32,
    pub pixels_per_point: f32,
}

impl PreviewSurface {
    pub fn new(logical_width: f32, logical_height: f32, pixels_per_point: f32) -> Self {
        Self {
            logical_width,
            logical_height,
            pixels_per_point,
        }
    }

    /// Physical pixel size: logical size times the density multiplier.
    pub fn pixel_size(&self) -> (u32, u32) {
        let scale = self.pixels_per_point.max(0.0);
        let w = (self.logical_width.max(0.0) * scale).round() as u32;
        let h = (self.logical_height.max(0.0) * scale).round() as u32;
        (w, h)
    }
}

/// Produces a preview copy of `img` whose pixel size equals the surface's.
///
/// The source is fitted inside the canvas with its aspect ratio intact and
/// centered on a transparent background.
pub fn scale_to_surface(img: &DynamicImage, surface: &PreviewSurface) -> DynamicImage {
    let (canvas_w, canvas_h) = surface.pixel_size();
    let mut canvas = RgbaImage::new(canvas_w, canvas_h);
    let Some((fit_w, fit_h)) = fitted_dimensions(img.width(), img.height(), canvas_w, canvas_h)
    else {
        return DynamicImage::ImageRgba8(canvas);
    };

    let fitted = if (fit_w, fit_h) == (img.width(), img.height()) {
        img.to_rgba8()
    } else {
        img.resize_exact(fit_w, fit_h, FilterType::Triangle).to_rgba8()
    };
    let x = (canvas_w - fit_w) / 2;
    let y = (canvas_h - fit_h) / 2;
    imageops::replace(&mut canvas, &fitted, x as i64, y as i64);
    DynamicImage::ImageRgba8(canvas)
}

fn fitted_dimensions(width: u32, height: u32, max_w: u32, max_h: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 || max_w == 0 || max_h == 0 {
        return None;
    }
    let scale = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
    let new_w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
    let new_h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
    Some((new_w, new_h))
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba};

    use super::{PreviewSurface, fitted_dimensions, scale_to_surface};

    fn solid(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, Rgba([90, 120, 200, 255])))
    }

    #[test]
    fn pixel_size_multiplies_by_density() {
        assert_eq!(PreviewSurface::new(300.0, 200.0, 1.0).pixel_size(), (300, 200));
        assert_eq!(PreviewSurface::new(300.0, 200.0, 2.0).pixel_size(), (600, 400));
        assert_eq!(PreviewSurface::new(300.0, 200.0, 3.0).pixel_size(), (900, 600));
    }

    #[test]
    fn preview_matches_surface_pixels_exactly() {
        let surface = PreviewSurface::new(300.0, 200.0, 2.0);
        let scaled = scale_to_surface(&solid(4000, 3000), &surface);
        assert_eq!((scaled.width(), scaled.height()), (600, 400));
    }

    #[test]
    fn preview_keeps_aspect_and_letterboxes() {
        let surface = PreviewSurface::new(100.0, 100.0, 1.0);
        let scaled = scale_to_surface(&solid(200, 100), &surface).to_rgba8();
        assert_eq!(scaled.dimensions(), (100, 100));
        // 100x50 image centered vertically: rows 0..25 are transparent.
        assert_eq!(scaled.get_pixel(50, 10)[3], 0);
        let center = scaled.get_pixel(50, 50).0;
        assert_eq!(center[3], 255);
        assert!(center[2].abs_diff(200) <= 1);
    }

    #[test]
    fn fitted_dimensions_scales_portrait_inside_landscape() {
        assert_eq!(fitted_dimensions(3000, 6000, 600, 400), Some((200, 400)));
        assert_eq!(fitted_dimensions(0, 10, 600, 400), None);
    }

    #[test]
    fn empty_surface_yields_empty_preview() {
        let surface = PreviewSurface::new(0.0, 200.0, 2.0);
        let scaled = scale_to_surface(&solid(10, 10), &surface);
        assert_eq!((scaled.width(), scaled.height()), (0, 400));
    }
}
