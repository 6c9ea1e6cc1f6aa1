use std::path::{Path, PathBuf};

use clap::Parser;
use winit::event_loop::EventLoop;

mod blur;
mod cli;
mod keymap;
mod loader;
mod overlay;
mod session;
mod settings;
mod ui;

use cli::Cli;
use session::ReviewSession;
use settings::Settings;
use ui::state::ViewerState;
use ui::App;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(cli::default_settings_path);
    let mut settings = Settings::load(&settings_path);
    if let Some(threshold) = cli.blur_threshold {
        settings.blur_threshold = threshold;
    }

    let Some(source_dir) = resolve_dir(
        cli.source.as_deref(),
        &settings.last_open_dir,
        "Select photo folder",
    ) else {
        log::error!("no source folder chosen, nothing to review");
        return;
    };
    let Some(dest_dir) = resolve_dir(
        cli.dest.as_deref(),
        &settings.last_save_dir,
        "Select destination folder",
    ) else {
        log::error!("no destination folder chosen");
        return;
    };

    if let Err(e) = settings.save_history(
        &source_dir.to_string_lossy(),
        &dest_dir.to_string_lossy(),
    ) {
        log::warn!("could not save folder history: {}", e);
    }

    let mut session = ReviewSession::new();
    if let Err(e) = session.load_directory(&source_dir) {
        log::error!("could not read {}: {}", source_dir.display(), e);
        ui::state::notify_error(
            "Cannot open folder",
            &format!("{}: {}", source_dir.display(), e),
        );
        return;
    }

    let cache = loader::new_shared_cache();
    let worker = loader::spawn_prefetch_worker(cache.clone());

    let mut state = ViewerState::new(settings, session, cache.clone(), dest_dir);
    state.show_current();

    let event_loop = match EventLoop::new() {
        Ok(el) => el,
        Err(e) => {
            log::error!("could not create event loop: {}", e);
            return;
        }
    };
    let mut app = App::new(state);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {}", e);
    }

    loader::shutdown_prefetch(&cache);
    if worker.join().is_err() {
        log::warn!("prefetch worker panicked");
    }
}

/// Resolve a working directory: explicit argument first, then the remembered
/// folder from the last run if it still exists, then an interactive picker.
fn resolve_dir(arg: Option<&Path>, history: &str, title: &str) -> Option<PathBuf> {
    if let Some(dir) = arg {
        return Some(dir.to_path_buf());
    }
    if !history.is_empty() {
        let dir = PathBuf::from(history);
        if dir.is_dir() {
            return Some(dir);
        }
        log::warn!("remembered folder {} no longer exists", dir.display());
    }
    rfd::FileDialog::new().set_title(title).pick_folder()
}
