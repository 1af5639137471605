use image::DynamicImage;

use crate::processing::pipeline::{self, RenderContext};
use crate::processing::scaling::{self, PreviewSurface};
use crate::state::FilterParams;

/// The screen's whole state: the picked photo, its preview-sized copy, and
/// the slider values. The scaled copy is always derived from the current
/// original and the surface's pixel density.
pub struct Editor {
    original: Option<DynamicImage>,
    scaled: Option<DynamicImage>,
    pub params: FilterParams,
    surface: PreviewSurface,
}

impl Editor {
    pub fn new(surface: PreviewSurface) -> Self {
        Self {
            original: None,
            scaled: None,
            params: FilterParams::default(),
            surface,
        }
    }

    pub fn original(&self) -> Option<&DynamicImage> {
        self.original.as_ref()
    }

    #[cfg(test)]
    pub fn scaled(&self) -> Option<&DynamicImage> {
        self.scaled.as_ref()
    }

    pub fn surface(&self) -> PreviewSurface {
        self.surface
    }

    /// Replaces the original wholesale and rebuilds the preview copy.
    pub fn set_original(&mut self, img: DynamicImage) {
        self.scaled = Some(scaling::scale_to_surface(&img, &self.surface));
        self.original = Some(img);
    }

    /// Returns `true` when the surface changed and the preview was rebuilt.
    pub fn set_surface(&mut self, surface: PreviewSurface) -> bool {
        if surface == self.surface {
            return false;
        }
        self.surface = surface;
        self.scaled = self
            .original
            .as_ref()
            .map(|img| scaling::scale_to_surface(img, &surface));
        true
    }

    pub fn reset_params(&mut self) {
        self.params = FilterParams::default();
    }

    /// Filtered preview of the scaled copy, if a photo is loaded.
    pub fn preview(&self, ctx: &RenderContext) -> Option<DynamicImage> {
        self.scaled
            .as_ref()
            .map(|img| pipeline::image_by_filtering(img, &self.params, ctx))
    }

    /// Filtered full-resolution original, used for saving.
    pub fn filtered_original(&self, ctx: &RenderContext) -> Option<DynamicImage> {
        self.original
            .as_ref()
            .map(|img| pipeline::image_by_filtering(img, &self.params, ctx))
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba};

    use crate::processing::pipeline::{RenderBackend, RenderContext};
    use crate::processing::scaling::PreviewSurface;
    use crate::state::FilterParams;

    use super::Editor;

    fn photo(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, Rgba([120, 80, 40, 255])))
    }

    fn cpu() -> RenderContext {
        RenderContext::new(RenderBackend::Cpu)
    }

    #[test]
    fn setting_original_derives_scaled_copy() {
        let mut editor = Editor::new(PreviewSurface::new(300.0, 200.0, 2.0));
        editor.set_original(photo(1200, 800));
        let scaled = editor.scaled().expect("scaled copy exists");
        assert_eq!((scaled.width(), scaled.height()), (600, 400));
        assert_eq!(editor.original().map(|o| o.width()), Some(1200));
    }

    #[test]
    fn density_change_rebuilds_scaled_copy() {
        let mut editor = Editor::new(PreviewSurface::new(300.0, 200.0, 1.0));
        editor.set_original(photo(1200, 800));
        assert!(editor.set_surface(PreviewSurface::new(300.0, 200.0, 3.0)));
        let scaled = editor.scaled().expect("scaled copy exists");
        assert_eq!((scaled.width(), scaled.height()), (900, 600));
        assert!(!editor.set_surface(PreviewSurface::new(300.0, 200.0, 3.0)));
    }

    #[test]
    fn preview_is_none_without_a_photo() {
        let editor = Editor::new(PreviewSurface::new(300.0, 200.0, 1.0));
        assert!(editor.preview(&cpu()).is_none());
        assert!(editor.filtered_original(&cpu()).is_none());
    }

    #[test]
    fn export_filters_the_full_resolution_original() {
        let mut editor = Editor::new(PreviewSurface::new(30.0, 20.0, 1.0));
        editor.set_original(photo(120, 80));
        editor.params.saturation = 0.0;
        let out = editor.filtered_original(&cpu()).expect("photo loaded");
        assert_eq!((out.width(), out.height()), (120, 80));
        let px = out.to_rgba8().get_pixel(5, 5).0;
        assert_eq!(px[0], px[1]);
    }

    #[test]
    fn reset_restores_neutral_params() {
        let mut editor = Editor::new(PreviewSurface::new(30.0, 20.0, 1.0));
        editor.params.brightness = 0.4;
        editor.reset_params();
        assert_eq!(editor.params, FilterParams::default());
    }
}
