use std::path::PathBuf;
use std::time::Duration;

use image::DynamicImage;

use crate::config::AppConfig;
use crate::editor::Editor;
use crate::library::PhotoLibrary;
use crate::library::authorization::LibraryAuthorization;
use crate::library::save::{SaveJob, SaveState};
use crate::picker::{self, SystemPicker};
use crate::processing::pipeline::RenderContext;
use crate::processing::scaling::PreviewSurface;
use crate::state::{BRIGHTNESS_RANGE, CONTRAST_RANGE, SATURATION_RANGE};

const SAVE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything behind the screen that does not need an egui context: the
/// editor, the library and its authorization, in-flight saves, settings.
pub struct FilterSession {
    editor: Editor,
    render: RenderContext,
    library: PhotoLibrary,
    authorization: LibraryAuthorization,
    save_jobs: Vec<SaveJob>,
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl FilterSession {
    pub fn new(
        config: AppConfig,
        config_path: Option<PathBuf>,
        render: RenderContext,
        surface: PreviewSurface,
    ) -> Self {
        let library = PhotoLibrary::new(
            config.library_root(),
            config.export_format(),
            config.jpg_quality(),
        );
        let authorization = LibraryAuthorization::new(config.library_access());
        Self {
            editor: Editor::new(surface),
            render,
            library,
            authorization,
            save_jobs: Vec::new(),
            config,
            config_path,
        }
    }

    /// Starts a fresh save attempt for the current photo. Each call is its
    /// own job; nothing is retried or merged.
    pub fn save_photo(&mut self) -> bool {
        let Some(filtered) = self.editor.filtered_original(&self.render) else {
            return false;
        };
        let mut job = SaveJob::new(filtered);
        job.start(&self.authorization);
        self.save_jobs.push(job);
        true
    }

    /// Advances every save and drops the finished ones. Returns `true`
    /// while any save is still in flight.
    pub fn poll_save_jobs(&mut self) -> bool {
        for job in &mut self.save_jobs {
            job.poll(&self.library);
        }
        self.save_jobs.retain(|job| {
            let state = job.state();
            if state.is_terminal() {
                tracing::debug!(
                    ?state,
                    path = ?job.saved_path(),
                    error = ?job.error().map(ToString::to_string),
                    "save finished"
                );
            }
            !state.is_terminal()
        });
        !self.save_jobs.is_empty()
    }

    /// Blocks on saves that are already committing. Saves still waiting for
    /// the user's decision are abandoned with a warning.
    pub fn finish_pending_saves(&mut self) {
        for job in &mut self.save_jobs {
            if job.finish(&self.library) == SaveState::AwaitingAuthorization {
                tracing::warn!("discarding a save that was never authorized");
            }
        }
        self.save_jobs.clear();
    }

    pub fn record_authorization(&mut self, granted: bool) {
        let status = self.authorization.decide(granted);
        self.config.library_access = Some(status);
        self.persist_config();
    }

    pub fn persist_config(&self) {
        if let Some(path) = &self.config_path {
            self.config.save_to(path);
        }
    }
}

pub struct PhotoFilterApp {
    session: FilterSession,
    texture: Option<egui::TextureHandle>,
    /// Set whenever the image or a slider changed since the last upload.
    preview_dirty: bool,
}

impl PhotoFilterApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        render: RenderContext,
        initial: Option<DynamicImage>,
    ) -> Self {
        let (preview_w, preview_h) = config.preview_size();
        let surface = PreviewSurface::new(preview_w, preview_h, cc.egui_ctx.pixels_per_point());
        let mut session = FilterSession::new(config, AppConfig::config_path(), render, surface);
        if let Some(img) = initial {
            session.editor.set_original(img);
        }
        Self {
            session,
            texture: None,
            preview_dirty: true,
        }
    }

    fn choose_photo(&mut self) {
        let source = SystemPicker::new(self.session.library.root());
        if picker::present(&source, &mut self.session.editor) {
            self.preview_dirty = true;
        }
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let editor = &mut self.session.editor;
        let surface = PreviewSurface::new(
            editor.surface().logical_width,
            editor.surface().logical_height,
            ctx.pixels_per_point(),
        );
        if editor.set_surface(surface) {
            self.preview_dirty = true;
        }
        if !self.preview_dirty {
            return;
        }
        self.preview_dirty = false;

        self.texture = editor.preview(&self.session.render).and_then(|img| {
            if img.width() == 0 || img.height() == 0 {
                return None;
            }
            let rgba = img.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let color = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
            Some(ctx.load_texture("preview", color, egui::TextureOptions::LINEAR))
        });
    }

    fn show_authorization_prompt(&mut self, ctx: &egui::Context) {
        if !self.session.authorization.awaiting_decision() {
            return;
        }
        let mut answer = None;
        egui::Window::new("Allow access to your photos?")
            .id(egui::Id::new("library_authorization"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "Photo Filter would like to add photos to {}.",
                    self.session.library.root().display()
                ));
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Don't Allow").clicked() {
                        answer = Some(false);
                    }
                    if ui.button("Allow").clicked() {
                        answer = Some(true);
                    }
                });
            });
        if let Some(granted) = answer {
            self.session.record_authorization(granted);
        }
    }
}

fn param_slider(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    range: std::ops::RangeInclusive<f32>,
) -> bool {
    ui.horizontal(|ui| {
        ui.add_sized([90.0, 18.0], egui::Label::new(label));
        ui.add(
            egui::Slider::new(value, range)
                .fixed_decimals(2)
                .clamping(egui::SliderClamping::Always),
        )
        .changed()
    })
    .inner
}

impl eframe::App for PhotoFilterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            self.session.config.window_width = Some(rect.width());
            self.session.config.window_height = Some(rect.height());
        }

        if self.session.poll_save_jobs() {
            ctx.request_repaint_after(SAVE_POLL_INTERVAL);
        }
        self.refresh_texture(ctx);

        let surface = self.session.editor.surface();
        let surface_size = egui::vec2(surface.logical_width, surface.logical_height);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                let (rect, _) = ui.allocate_exact_size(surface_size, egui::Sense::hover());
                ui.painter()
                    .rect_filled(rect, 4.0, egui::Color32::from_gray(24));
                match self.texture {
                    Some(ref tex) => {
                        ui.painter().image(
                            tex.id(),
                            rect,
                            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                            egui::Color32::WHITE,
                        );
                    }
                    None => {
                        ui.painter().text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            "Choose a photo to get started",
                            egui::FontId::proportional(16.0),
                            egui::Color32::GRAY,
                        );
                    }
                }
            });

            ui.add_space(12.0);

            let params = &mut self.session.editor.params;
            let mut changed = false;
            changed |= param_slider(ui, "Brightness", &mut params.brightness, BRIGHTNESS_RANGE);
            changed |= param_slider(ui, "Contrast", &mut params.contrast, CONTRAST_RANGE);
            changed |= param_slider(ui, "Saturation", &mut params.saturation, SATURATION_RANGE);

            ui.add_space(12.0);
            ui.horizontal(|ui| {
                if ui.button("Choose Photo").clicked() {
                    self.choose_photo();
                }
                let has_photo = self.session.editor.original().is_some();
                if ui
                    .add_enabled(has_photo, egui::Button::new("Save Photo"))
                    .clicked()
                    && self.session.save_photo()
                {
                    ctx.request_repaint_after(SAVE_POLL_INTERVAL);
                }
                let neutral = self.session.editor.params.is_neutral();
                if ui.add_enabled(!neutral, egui::Button::new("Reset")).clicked() {
                    self.session.editor.reset_params();
                    changed = true;
                }
            });

            // Slider edits re-render synchronously on this frame.
            if changed {
                self.preview_dirty = true;
            }
        });

        if self.preview_dirty {
            self.refresh_texture(ctx);
        }
        self.show_authorization_prompt(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.finish_pending_saves();
        self.session.persist_config();
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use image::{DynamicImage, ImageBuffer, Rgba};

    use crate::config::AppConfig;
    use crate::library::authorization::AuthorizationStatus;
    use crate::processing::pipeline::{RenderBackend, RenderContext};
    use crate::processing::scaling::PreviewSurface;

    use super::FilterSession;

    fn session(library: &Path, config_path: &Path, access: AuthorizationStatus) -> FilterSession {
        let config = AppConfig {
            library_path: Some(library.to_path_buf()),
            export_format: Some("png".to_string()),
            library_access: Some(access),
            ..AppConfig::default()
        };
        let mut session = FilterSession::new(
            config,
            Some(config_path.to_path_buf()),
            RenderContext::new(RenderBackend::Cpu),
            PreviewSurface::new(20.0, 10.0, 1.0),
        );
        session.editor.set_original(DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
            8,
            4,
            Rgba([90, 160, 30, 255]),
        )));
        session
    }

    fn assets_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read library dir")
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn each_save_click_commits_its_own_asset() {
        let library = tempfile::tempdir().expect("library dir");
        let config_dir = tempfile::tempdir().expect("config dir");
        let config_path = config_dir.path().join("config.toml");
        let mut session = session(library.path(), &config_path, AuthorizationStatus::Granted);

        assert!(session.save_photo());
        assert!(session.save_photo());
        assert_eq!(session.save_jobs.len(), 2);
        session.finish_pending_saves();

        let assets = assets_in(library.path());
        assert_eq!(assets.len(), 2);
        assert!(assets.iter().all(|n| n.starts_with("IMG_") && n.ends_with(".png")));
        for name in &assets {
            let len = std::fs::metadata(library.path().join(name))
                .expect("asset metadata")
                .len();
            assert!(len > 0, "{} is empty", name);
        }
    }

    #[test]
    fn save_without_a_photo_starts_nothing() {
        let library = tempfile::tempdir().expect("library dir");
        let config_dir = tempfile::tempdir().expect("config dir");
        let mut session = FilterSession::new(
            AppConfig {
                library_path: Some(library.path().to_path_buf()),
                ..AppConfig::default()
            },
            Some(config_dir.path().join("config.toml")),
            RenderContext::new(RenderBackend::Cpu),
            PreviewSurface::new(20.0, 10.0, 1.0),
        );

        assert!(!session.save_photo());
        assert!(!session.poll_save_jobs());
    }

    #[test]
    fn denial_is_remembered_and_nothing_is_written() {
        let library = tempfile::tempdir().expect("library dir");
        let config_dir = tempfile::tempdir().expect("config dir");
        let config_path = config_dir.path().join("config.toml");
        let mut session = session(library.path(), &config_path, AuthorizationStatus::Unknown);

        assert!(session.save_photo());
        assert!(session.poll_save_jobs());
        assert!(session.authorization.awaiting_decision());

        session.record_authorization(false);
        assert!(!session.poll_save_jobs());

        assert_eq!(
            session.config.library_access,
            Some(AuthorizationStatus::Denied)
        );
        let saved = std::fs::read_to_string(&config_path).expect("config persisted");
        let reloaded: AppConfig = toml::from_str(&saved).expect("valid toml");
        assert_eq!(reloaded.library_access(), AuthorizationStatus::Denied);
        assert!(assets_in(library.path()).is_empty());
    }

    #[test]
    fn finished_saves_are_dropped_from_the_queue() {
        let library = tempfile::tempdir().expect("library dir");
        let config_dir = tempfile::tempdir().expect("config dir");
        let config_path = config_dir.path().join("config.toml");
        let mut session = session(library.path(), &config_path, AuthorizationStatus::Denied);

        assert!(session.save_photo());
        assert!(!session.poll_save_jobs());
        assert!(session.save_jobs.is_empty());
    }
}
