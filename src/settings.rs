use std::io;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;

// ---------------------------------------------------------------------------
// Defaults (used for any missing or malformed key)
// ---------------------------------------------------------------------------

const DEFAULT_WIDTH: u32 = 1024;
const DEFAULT_HEIGHT: u32 = 768;
const DEFAULT_KEY_COPY: &str = "K";
const DEFAULT_KEY_NEXT: &str = "Right";
const DEFAULT_KEY_PREV: &str = "Left";
const DEFAULT_KEY_DELETE: &str = "D";
const DEFAULT_ZOOM_RANGE: u32 = 10;
const DEFAULT_ZOOM_SCALE: u32 = 10;
const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;

/// Per-session settings backed by an INI file.
///
/// Loading never fails: a missing file, a missing key or a value that does
/// not parse each fall back to the documented default (malformed values are
/// logged). The parsed INI document is kept so that the save operations can
/// rewrite the whole file while preserving sections they do not touch.
pub struct Settings {
    path: PathBuf,
    ini: Ini,

    pub window_width: u32,
    pub window_height: u32,
    pub key_copy: String,
    pub key_next: String,
    pub key_prev: String,
    pub key_delete: String,
    pub zoom_range: u32,
    pub zoom_scale: u32,
    pub blur_threshold: f64,
    pub last_open_dir: String,
    pub last_save_dir: String,
}

impl Settings {
    pub fn load(path: &Path) -> Settings {
        let mut ini = Ini::new();
        if path.exists() {
            if let Err(e) = ini.load(path) {
                log::warn!("could not read settings file {}: {}", path.display(), e);
                ini = Ini::new();
            }
        }

        Settings {
            window_width: int_or(&ini, "window", "width", DEFAULT_WIDTH),
            window_height: int_or(&ini, "window", "height", DEFAULT_HEIGHT),
            key_copy: str_or(&ini, "keys", "copy", DEFAULT_KEY_COPY),
            key_next: str_or(&ini, "keys", "next", DEFAULT_KEY_NEXT),
            key_prev: str_or(&ini, "keys", "prev", DEFAULT_KEY_PREV),
            key_delete: str_or(&ini, "keys", "delete", DEFAULT_KEY_DELETE),
            zoom_range: int_or(&ini, "zoom", "range", DEFAULT_ZOOM_RANGE),
            zoom_scale: int_or(&ini, "zoom", "scale", DEFAULT_ZOOM_SCALE),
            blur_threshold: float_or(&ini, "blur", "threshold", DEFAULT_BLUR_THRESHOLD),
            last_open_dir: str_or(&ini, "history", "last_open_dir", ""),
            last_save_dir: str_or(&ini, "history", "last_save_dir", ""),
            path: path.to_path_buf(),
            ini,
        }
    }

    /// Persist the window size. Rewrites the whole settings file, keeping
    /// every other section as loaded.
    pub fn save_window_size(&mut self, width: u32, height: u32) -> io::Result<()> {
        self.window_width = width;
        self.window_height = height;
        self.ini.set("window", "width", Some(width.to_string()));
        self.ini.set("window", "height", Some(height.to_string()));
        self.ini.write(&self.path)
    }

    /// Persist the most recently accepted source/destination directories.
    pub fn save_history(&mut self, open_dir: &str, save_dir: &str) -> io::Result<()> {
        self.last_open_dir = open_dir.to_string();
        self.last_save_dir = save_dir.to_string();
        self.ini.set("history", "last_open_dir", Some(open_dir.to_string()));
        self.ini.set("history", "last_save_dir", Some(save_dir.to_string()));
        self.ini.write(&self.path)
    }
}

fn int_or(ini: &Ini, section: &str, key: &str, default: u32) -> u32 {
    match ini.getint(section, key) {
        Ok(Some(v)) if v >= 0 && v <= u32::MAX as i64 => v as u32,
        Ok(Some(v)) => {
            log::warn!("settings [{section}] {key} = {v} out of range, using {default}");
            default
        }
        Ok(None) => default,
        Err(e) => {
            log::warn!("settings [{section}] {key}: {e}, using {default}");
            default
        }
    }
}

fn float_or(ini: &Ini, section: &str, key: &str, default: f64) -> f64 {
    match ini.getfloat(section, key) {
        Ok(Some(v)) => v,
        Ok(None) => default,
        Err(e) => {
            log::warn!("settings [{section}] {key}: {e}, using {default}");
            default
        }
    }
}

fn str_or(ini: &Ini, section: &str, key: &str, default: &str) -> String {
    ini.get(section, key).unwrap_or_else(|| default.to_string())
}
