use std::path::PathBuf;
use std::sync::Arc;

use crate::blur::sharpness_score;
use crate::keymap::{Action, KeyMap};
use crate::loader::{self, Bitmap, SharedCache};
use crate::overlay::{self, BAR_HEIGHT};
use crate::session::ReviewSession;
use crate::settings::Settings;
use crate::ui::render::{blit_bitmap, draw_text, fill_rect, rgb, BG_COLOR};

// ---------------------------------------------------------------------------
// Viewer state: glue between shell events and the session/renderer
// ---------------------------------------------------------------------------

pub struct ViewerState {
    pub settings: Settings,
    pub session: ReviewSession,
    pub cache: SharedCache,
    pub keymap: KeyMap,
    pub dest_dir: PathBuf,
    pub window_size: (u32, u32),

    current: Option<Arc<Bitmap>>,
    current_blurred: bool,
    current_score: f64,
    composed: Option<Bitmap>,
    composed_for: (u32, u32),
    error_message: Option<String>,
}

impl ViewerState {
    pub fn new(
        settings: Settings,
        session: ReviewSession,
        cache: SharedCache,
        dest_dir: PathBuf,
    ) -> ViewerState {
        let keymap = KeyMap::from_settings(&settings);
        let window_size = (settings.window_width, settings.window_height);
        ViewerState {
            settings,
            session,
            cache,
            keymap,
            dest_dir,
            window_size,
            current: None,
            current_blurred: false,
            current_score: 0.0,
            composed: None,
            composed_for: (0, 0),
            error_message: None,
        }
    }

    /// Load and analyze the image under the cursor: prefetch-cache hit,
    /// cached failure, or synchronous decode. Then queue the next file for
    /// the prefetch worker.
    pub fn show_current(&mut self) {
        self.current = None;
        self.composed = None;
        self.error_message = None;

        let Some(name) = self.session.current().map(str::to_string) else {
            return;
        };
        let Some(path) = self.session.current_path() else {
            return;
        };

        let (hit, cached_err) = {
            let cache = self.cache.0.lock().unwrap();
            (cache.get(&name), cache.error_for(&name).map(str::to_string))
        };

        let decoded: Result<Arc<Bitmap>, String> = if let Some(img) = hit {
            log::debug!("[cache] hit {}", name);
            Ok(img)
        } else if let Some(e) = cached_err {
            Err(e)
        } else {
            loader::decode(&path)
                .map(Arc::new)
                .map_err(|e| e.to_string())
        };

        match decoded {
            Ok(bitmap) => {
                self.current_score = sharpness_score(&bitmap);
                self.current_blurred = self.current_score < self.settings.blur_threshold;
                log::debug!(
                    "{}: sharpness {:.1} (threshold {:.1})",
                    name,
                    self.current_score,
                    self.settings.blur_threshold
                );
                self.current = Some(bitmap);
            }
            Err(e) => {
                log::warn!("could not load {}: {}", name, e);
                self.error_message = Some(format!("Cannot display {}: {}", name, e));
            }
        }

        self.prefetch_next();
    }

    fn prefetch_next(&self) {
        let next = self.session.index() + 1;
        if let (Some(name), Some(path)) = (self.session.file_at(next), self.session.path_at(next)) {
            loader::request_prefetch(&self.cache, name, &path);
        }
    }

    /// Dispatch one logical review action.
    pub fn handle_action(&mut self, action: Action) {
        let before = self.session.index();
        match action {
            Action::Next => {
                self.session.next();
            }
            Action::Prev => {
                self.session.prev();
            }
            Action::MarkDelete => {
                self.session.mark_current_for_deletion();
            }
            Action::CopyAndAdvance => {
                let dest = self.dest_dir.clone();
                if let Err(e) = self.session.copy_current_and_advance(&dest) {
                    log::error!("{}", e);
                    notify_error("Copy failed", &e.to_string());
                }
            }
        }
        if self.session.index() != before {
            self.show_current();
        }
    }

    /// Let the user pick a new source directory; reloads the session,
    /// clears the prefetch cache and records the choice in history.
    pub fn pick_source_dir(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Select photo folder")
            .set_directory(self.session.source_dir())
            .pick_folder();
        let Some(dir) = picked else { return };

        match self.session.load_directory(&dir) {
            Ok(count) => {
                log::info!("switched to {} ({} images)", dir.display(), count);
                self.cache.0.lock().unwrap().clear();
                self.save_history();
                self.show_current();
            }
            Err(e) => {
                log::error!("could not open {}: {}", dir.display(), e);
                notify_error("Cannot open folder", &format!("{}: {}", dir.display(), e));
            }
        }
    }

    /// Let the user pick a new destination directory for keepers.
    pub fn pick_dest_dir(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Select destination folder")
            .set_directory(&self.dest_dir)
            .pick_folder();
        if let Some(dir) = picked {
            log::info!("destination is now {}", dir.display());
            self.dest_dir = dir;
            self.save_history();
        }
    }

    fn save_history(&mut self) {
        let open = self.session.source_dir().to_string_lossy().into_owned();
        let save = self.dest_dir.to_string_lossy().into_owned();
        if let Err(e) = self.settings.save_history(&open, &save) {
            log::warn!("could not save history: {}", e);
        }
    }

    /// Persist the checkpoint, optionally sweep the marked files, report
    /// failures in aggregate.
    pub fn finalize(&mut self, execute_deletes: bool) {
        if let Err(e) = self
            .settings
            .save_window_size(self.window_size.0, self.window_size.1)
        {
            log::warn!("could not save window size: {}", e);
        }
        match self.session.finalize(execute_deletes) {
            Ok(report) => {
                if !report.failures.is_empty() {
                    let lines: Vec<String> = report
                        .failures
                        .iter()
                        .map(|(name, e)| format!("{}: {}", name, e))
                        .collect();
                    notify_error("Some files could not be deleted", &lines.join("\n"));
                }
            }
            Err(e) => {
                log::error!("could not write delete list: {}", e);
                notify_error("Could not write delete list", &e.to_string());
            }
        }
    }

    /// Render into the softbuffer framebuffer (u32 per pixel, 0x00RRGGBB).
    pub fn render(&mut self, frame: &mut [u32], fb_w: u32, fb_h: u32) {
        frame.fill(rgb(BG_COLOR[0], BG_COLOR[1], BG_COLOR[2]));

        let viewport = (fb_w.max(1), fb_h.saturating_sub(BAR_HEIGHT).max(1));
        if self.composed.is_none() || self.composed_for != viewport {
            if let Some(ref original) = self.current {
                self.composed = Some(overlay::render(
                    original,
                    viewport,
                    self.settings.zoom_range,
                    self.settings.zoom_scale,
                    self.current_blurred,
                ));
                self.composed_for = viewport;
            }
        }

        if let Some(ref display) = self.composed {
            blit_bitmap(frame, fb_w, fb_h, display, 0, 0);
        } else if let Some(ref err) = self.error_message {
            draw_text(frame, fb_w, fb_h, err, 20, fb_h as i32 / 2, 2, (255, 80, 80, 255));
        } else if self.session.is_empty() {
            draw_text(
                frame,
                fb_w,
                fb_h,
                "No images in this folder",
                20,
                fb_h as i32 / 2,
                2,
                (255, 255, 255, 255),
            );
        }

        self.draw_status_bar(frame, fb_w, fb_h);
    }

    fn draw_status_bar(&self, frame: &mut [u32], fb_w: u32, fb_h: u32) {
        let bar_h = BAR_HEIGHT.min(fb_h);
        let bar_y = (fb_h - bar_h) as i32;
        fill_rect(frame, fb_w, fb_h, 0, bar_y, fb_w, bar_h, (0, 0, 0, 230));

        let white = (255, 255, 255, 255);
        let gray = (170, 170, 170, 255);

        let line1 = if let Some(name) = self.session.current() {
            let flag = if self.current_blurred { "  BLUR" } else { "" };
            format!(
                "[{}/{}] {}  sharpness {:.1}{}  marked {}",
                self.session.index() + 1,
                self.session.len(),
                name,
                self.current_score,
                flag,
                self.session.marked().len(),
            )
        } else {
            "[0/0]".to_string()
        };
        let line2 = "o open  s save dir  x delete+exit  Esc exit";

        draw_text(frame, fb_w, fb_h, &line1, 10, bar_y + 8, 2, white);
        draw_text(frame, fb_w, fb_h, line2, 10, bar_y + 34, 2, gray);
    }
}

/// Blocking, user-visible error notification naming the file and cause.
pub fn notify_error(title: &str, description: &str) {
    log::error!("{}: {}", title, description);
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(description)
        .show();
}
