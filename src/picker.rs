use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::decode::{self, SUPPORTED_IMAGE_EXTS};
use crate::editor::Editor;

pub enum PickOutcome {
    Picked(DynamicImage),
    Cancelled,
}

/// Somewhere the user can choose an existing photo from.
pub trait PhotoSource {
    fn is_available(&self) -> bool;
    fn pick(&self) -> PickOutcome;
}

/// Native file dialog rooted at the photo library. No camera capture.
pub struct SystemPicker {
    library_root: PathBuf,
}

impl SystemPicker {
    pub fn new(library_root: &Path) -> Self {
        Self {
            library_root: library_root.to_path_buf(),
        }
    }
}

impl PhotoSource for SystemPicker {
    fn is_available(&self) -> bool {
        self.library_root.is_dir()
    }

    fn pick(&self) -> PickOutcome {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Choose Photo")
            .set_directory(&self.library_root)
            .add_filter("Photos", SUPPORTED_IMAGE_EXTS)
            .pick_file()
        else {
            return PickOutcome::Cancelled;
        };
        if !decode::is_supported_image(&path) {
            tracing::warn!(path = %path.display(), "the chosen file is not a supported photo");
            return PickOutcome::Cancelled;
        }
        match decode::open_photo(&path) {
            Ok(img) => PickOutcome::Picked(img),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "could not open the chosen photo");
                PickOutcome::Cancelled
            }
        }
    }
}

/// Presents `source` and hands a chosen photo to the editor.
///
/// Returns `true` when the editor received a new original.
pub fn present(source: &dyn PhotoSource, editor: &mut Editor) -> bool {
    if !source.is_available() {
        tracing::warn!("the photo library is not available");
        return false;
    }
    match source.pick() {
        PickOutcome::Picked(img) => {
            editor.set_original(img);
            true
        }
        PickOutcome::Cancelled => false,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use image::{DynamicImage, ImageBuffer, Rgba};

    use crate::editor::Editor;
    use crate::processing::scaling::PreviewSurface;

    use super::{PhotoSource, PickOutcome, SystemPicker, present};

    struct FakeSource {
        available: bool,
        picks: Cell<usize>,
        result: fn() -> PickOutcome,
    }

    impl PhotoSource for FakeSource {
        fn is_available(&self) -> bool {
            self.available
        }

        fn pick(&self) -> PickOutcome {
            self.picks.set(self.picks.get() + 1);
            (self.result)()
        }
    }

    fn photo(px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(40, 20, Rgba(px)))
    }

    fn editor_with_photo() -> Editor {
        let mut editor = Editor::new(PreviewSurface::new(20.0, 10.0, 2.0));
        editor.set_original(photo([1, 2, 3, 255]));
        editor
    }

    #[test]
    fn cancellation_leaves_images_untouched() {
        let mut editor = editor_with_photo();
        let before_original = editor.original().map(|i| i.to_rgba8());
        let before_scaled = editor.scaled().map(|i| i.to_rgba8());

        let source = FakeSource {
            available: true,
            picks: Cell::new(0),
            result: || PickOutcome::Cancelled,
        };
        assert!(!present(&source, &mut editor));
        assert_eq!(source.picks.get(), 1);
        assert_eq!(editor.original().map(|i| i.to_rgba8()), before_original);
        assert_eq!(editor.scaled().map(|i| i.to_rgba8()), before_scaled);
    }

    #[test]
    fn selection_replaces_the_original() {
        let mut editor = editor_with_photo();
        let source = FakeSource {
            available: true,
            picks: Cell::new(0),
            result: || PickOutcome::Picked(photo([200, 100, 0, 255])),
        };
        assert!(present(&source, &mut editor));
        let original = editor.original().expect("original set").to_rgba8();
        assert_eq!(original.get_pixel(0, 0).0, [200, 100, 0, 255]);
        let scaled = editor.scaled().expect("scaled set");
        assert_eq!((scaled.width(), scaled.height()), (40, 20));
    }

    #[test]
    fn unavailable_source_is_never_presented() {
        let mut editor = Editor::new(PreviewSurface::new(20.0, 10.0, 1.0));
        let source = FakeSource {
            available: false,
            picks: Cell::new(0),
            result: || PickOutcome::Picked(photo([0, 0, 0, 255])),
        };
        assert!(!present(&source, &mut editor));
        assert_eq!(source.picks.get(), 0);
        assert!(editor.original().is_none());
    }

    #[test]
    fn system_picker_needs_an_existing_library() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(SystemPicker::new(dir.path()).is_available());
        assert!(!SystemPicker::new(&dir.path().join("missing")).is_available());
    }
}
