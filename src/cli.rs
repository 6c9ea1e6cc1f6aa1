use std::env;
use std::path::PathBuf;

use clap::Parser;

pub const HELP_KEYS: &str = "\
Keys (rebindable in setting.ini):
  K            copy current photo to the destination folder and advance
  Right        next photo
  Left         previous photo
  D            mark current photo for deletion and advance
  o            choose a different source folder
  s            choose a different destination folder
  x            exit and delete all marked photos
  Esc / close  exit, keeping marked photos on disk (list is saved)
";

#[derive(Parser, Debug)]
#[command(name = "picsel", version, about = "Cull a folder of photos: keep, skip or delete", after_help = HELP_KEYS)]
pub struct Cli {
    /// Folder of photos to review (remembered from the last run if omitted)
    pub source: Option<PathBuf>,

    /// Destination folder for kept photos
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Settings file (defaults to setting.ini next to the executable)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Override the blur detection threshold for this run
    #[arg(long)]
    pub blur_threshold: Option<f64>,
}

/// setting.ini lives next to the executable, like the window it configures.
pub fn default_settings_path() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join("setting.ini")))
        .unwrap_or_else(|| PathBuf::from("setting.ini"))
}
