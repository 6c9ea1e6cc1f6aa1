use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Review session: ordered file list, cursor, pending-delete set
// ---------------------------------------------------------------------------

pub const DELETE_LIST_FILE: &str = "delete_list.json";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];

fn is_reviewable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Error)]
#[error("could not copy {file} to {dest}: {source}")]
pub struct CopyError {
    pub file: String,
    pub dest: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Result of `finalize`: where the checkpoint landed and which removals
/// failed (the sweep never aborts on the first failure).
#[derive(Debug)]
pub struct DeleteReport {
    pub checkpoint: PathBuf,
    pub failures: Vec<(String, io::Error)>,
}

/// State machine for one review pass over a source directory.
///
/// The file list is sorted and immutable after `load_directory`; the cursor
/// is clamped to it (never wrapped). Files marked for deletion are kept in
/// insertion order with duplicate-safe insertion, and are only touched on
/// `finalize`.
pub struct ReviewSession {
    source_dir: PathBuf,
    files: Vec<String>,
    index: usize,
    delete_list: Vec<String>,
}

impl ReviewSession {
    pub fn new() -> ReviewSession {
        ReviewSession {
            source_dir: PathBuf::new(),
            files: Vec::new(),
            index: 0,
            delete_list: Vec::new(),
        }
    }

    /// List reviewable files in `dir` (case-insensitive jpg/jpeg/png/heic),
    /// sorted lexicographically, and reset the cursor. Switching to a
    /// different directory starts a fresh delete set; reloading the same
    /// one keeps it.
    pub fn load_directory(&mut self, dir: &Path) -> io::Result<usize> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_reviewable(&path) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        if self.source_dir != dir {
            self.delete_list.clear();
            self.source_dir = dir.to_path_buf();
        }
        self.files = names;
        self.index = 0;
        log::info!(
            "loaded {} reviewable images from {}",
            self.files.len(),
            dir.display()
        );
        Ok(self.files.len())
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn file_at(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(String::as_str)
    }

    pub fn path_at(&self, index: usize) -> Option<PathBuf> {
        self.files.get(index).map(|n| self.source_dir.join(n))
    }

    pub fn current(&self) -> Option<&str> {
        self.file_at(self.index)
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.path_at(self.index)
    }

    /// Advance the cursor. No-op at the last index; returns whether it moved.
    pub fn next(&mut self) -> bool {
        if self.index + 1 < self.files.len() {
            self.index += 1;
            log::debug!("[nav] -> {}", self.index);
            true
        } else {
            false
        }
    }

    /// Step the cursor back. No-op at index 0; returns whether it moved.
    pub fn prev(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            log::debug!("[nav] <- {}", self.index);
            true
        } else {
            false
        }
    }

    /// Add the current file to the delete set (at most once), then advance.
    pub fn mark_current_for_deletion(&mut self) {
        if let Some(name) = self.current().map(str::to_string) {
            if !self.delete_list.contains(&name) {
                log::info!("marked for deletion: {}", name);
                self.delete_list.push(name);
            }
            self.next();
        }
    }

    pub fn marked(&self) -> &[String] {
        &self.delete_list
    }

    /// Copy the current file's bytes to `dest_dir` under the same name,
    /// overwriting and carrying the source timestamps. The cursor advances
    /// whether or not the copy succeeded; a failure is reported, not fatal.
    pub fn copy_current_and_advance(&mut self, dest_dir: &Path) -> Result<(), CopyError> {
        let result = match self.current() {
            Some(name) => {
                let src = self.source_dir.join(name);
                let dst = dest_dir.join(name);
                copy_with_times(&src, &dst).map_err(|e| CopyError {
                    file: name.to_string(),
                    dest: dst,
                    source: e,
                })
            }
            None => Ok(()),
        };
        self.next();
        result
    }

    pub fn delete_list_path(&self) -> PathBuf {
        self.source_dir.join(DELETE_LIST_FILE)
    }

    /// Write the delete set as a JSON array of filenames, whole-file
    /// rewrite. This checkpoint records intent independent of whether the
    /// files are actually removed.
    pub fn save_delete_list(&self) -> io::Result<PathBuf> {
        let path = self.delete_list_path();
        let json = serde_json::to_string_pretty(&self.delete_list).map_err(io::Error::other)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Persist the checkpoint and, when `execute_deletes`, remove every
    /// listed file, collecting per-file failures instead of aborting.
    pub fn finalize(&self, execute_deletes: bool) -> io::Result<DeleteReport> {
        let checkpoint = self.save_delete_list()?;
        let mut failures = Vec::new();
        if execute_deletes {
            for name in &self.delete_list {
                let path = self.source_dir.join(name);
                match fs::remove_file(&path) {
                    Ok(()) => log::info!("deleted {}", path.display()),
                    Err(e) => {
                        log::warn!("could not delete {}: {}", path.display(), e);
                        failures.push((name.clone(), e));
                    }
                }
            }
        }
        Ok(DeleteReport {
            checkpoint,
            failures,
        })
    }
}

fn copy_with_times(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let meta = fs::metadata(src)?;
    filetime::set_file_times(
        dst,
        filetime::FileTime::from_last_access_time(&meta),
        filetime::FileTime::from_last_modification_time(&meta),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_with(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), format!("data-{name}")).unwrap();
        }
        dir
    }

    fn session_for(dir: &tempfile::TempDir) -> ReviewSession {
        let mut s = ReviewSession::new();
        s.load_directory(dir.path()).unwrap();
        s
    }

    #[test]
    fn listing_filters_and_sorts() {
        let dir = dir_with(&["b.png", "a.jpg", "c.heic", "note.txt"]);
        let s = session_for(&dir);
        assert_eq!(
            s.files,
            vec!["a.jpg".to_string(), "b.png".to_string(), "c.heic".to_string()]
        );
    }

    #[test]
    fn listing_matches_extensions_case_insensitively() {
        let dir = dir_with(&["x.JPG", "y.Png", "z.HEIC", "w.JPEG", "skip.TXT"]);
        let s = session_for(&dir);
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn cursor_clamps_at_both_ends() {
        let dir = dir_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut s = session_for(&dir);

        assert!(!s.prev());
        assert_eq!(s.index(), 0);

        assert!(s.next());
        assert!(s.prev());
        assert_eq!(s.index(), 0);

        assert!(s.next());
        assert!(s.next());
        assert_eq!(s.index(), 2);
        assert!(!s.next());
        assert_eq!(s.index(), 2);

        assert!(s.prev());
        assert!(s.next());
        assert_eq!(s.index(), 2);
    }

    #[test]
    fn empty_session_is_inert() {
        let dir = dir_with(&[]);
        let mut s = session_for(&dir);
        assert!(s.is_empty());
        assert!(s.current().is_none());
        assert!(!s.next());
        assert!(!s.prev());
        s.mark_current_for_deletion();
        assert!(s.marked().is_empty());
    }

    #[test]
    fn marking_twice_keeps_one_entry() {
        let dir = dir_with(&["a.jpg", "b.jpg"]);
        let mut s = session_for(&dir);

        s.mark_current_for_deletion();
        s.prev();
        s.mark_current_for_deletion();

        assert_eq!(s.marked(), ["a.jpg".to_string()]);
    }

    #[test]
    fn marking_advances_the_cursor() {
        let dir = dir_with(&["a.jpg", "b.jpg"]);
        let mut s = session_for(&dir);
        s.mark_current_for_deletion();
        assert_eq!(s.index(), 1);
        assert_eq!(s.current(), Some("b.jpg"));
    }

    #[test]
    fn delete_list_round_trips_through_json() {
        let dir = dir_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut s = session_for(&dir);
        s.mark_current_for_deletion();
        s.mark_current_for_deletion();

        let path = s.save_delete_list().unwrap();
        assert_eq!(path, dir.path().join(DELETE_LIST_FILE));

        let loaded: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, ["a.jpg".to_string(), "b.jpg".to_string()]);
    }

    #[test]
    fn finalize_with_execute_removes_only_marked_files() {
        let dir = dir_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut s = session_for(&dir);

        s.mark_current_for_deletion(); // marks a.jpg, moves to b.jpg
        s.next();
        s.next();

        let report = s.finalize(true).unwrap();
        assert!(report.failures.is_empty());

        let loaded: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&report.checkpoint).unwrap()).unwrap();
        assert_eq!(loaded, ["a.jpg".to_string()]);

        assert!(!dir.path().join("a.jpg").exists());
        assert!(dir.path().join("b.jpg").exists());
        assert!(dir.path().join("c.jpg").exists());
    }

    #[test]
    fn finalize_without_execute_touches_nothing() {
        let dir = dir_with(&["a.jpg"]);
        let mut s = session_for(&dir);
        s.mark_current_for_deletion();

        let report = s.finalize(false).unwrap();
        assert!(report.failures.is_empty());
        assert!(dir.path().join("a.jpg").exists());
        assert!(report.checkpoint.exists());
    }

    #[test]
    fn finalize_collects_failures_without_aborting() {
        let dir = dir_with(&["a.jpg", "b.jpg"]);
        let mut s = session_for(&dir);
        s.mark_current_for_deletion();
        s.mark_current_for_deletion();

        // Remove one target out from under the sweep.
        fs::remove_file(dir.path().join("a.jpg")).unwrap();

        let report = s.finalize(true).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "a.jpg");
        // The rest of the batch still ran.
        assert!(!dir.path().join("b.jpg").exists());
    }

    #[test]
    fn copy_places_bytes_and_advances() {
        let src = dir_with(&["a.jpg", "b.jpg"]);
        let dst = tempfile::tempdir().unwrap();
        let mut s = session_for(&src);

        s.copy_current_and_advance(dst.path()).unwrap();
        assert_eq!(s.index(), 1);
        assert_eq!(
            fs::read(dst.path().join("a.jpg")).unwrap(),
            fs::read(src.path().join("a.jpg")).unwrap()
        );
    }

    #[test]
    fn copy_overwrites_existing_destination() {
        let src = dir_with(&["a.jpg"]);
        let dst = tempfile::tempdir().unwrap();
        fs::write(dst.path().join("a.jpg"), "old").unwrap();

        let mut s = session_for(&src);
        s.copy_current_and_advance(dst.path()).unwrap();
        assert_eq!(fs::read(dst.path().join("a.jpg")).unwrap(), b"data-a.jpg");
    }

    #[test]
    fn copy_failure_still_advances() {
        let src = dir_with(&["a.jpg", "b.jpg"]);
        let mut s = session_for(&src);

        let missing_dest = src.path().join("no-such-dir");
        let err = s.copy_current_and_advance(&missing_dest).unwrap_err();
        assert_eq!(err.file, "a.jpg");
        assert_eq!(s.index(), 1);
    }

    #[test]
    fn changing_directory_resets_the_delete_set() {
        let first = dir_with(&["a.jpg"]);
        let second = dir_with(&["z.jpg"]);

        let mut s = session_for(&first);
        s.mark_current_for_deletion();
        assert_eq!(s.marked().len(), 1);

        s.load_directory(second.path()).unwrap();
        assert!(s.marked().is_empty());
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn reloading_same_directory_keeps_the_delete_set() {
        let dir = dir_with(&["a.jpg", "b.jpg"]);
        let mut s = session_for(&dir);
        s.mark_current_for_deletion();

        s.load_directory(dir.path()).unwrap();
        assert_eq!(s.marked(), ["a.jpg".to_string()]);
        assert_eq!(s.index(), 0);
    }
}
