use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Decoded image data
// ---------------------------------------------------------------------------

/// A decoded image: contiguous 3-channel RGB8, row-major, no row padding.
/// Every decode path normalizes to this layout regardless of the source
/// channel count or color space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Bitmap {
        Bitmap {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 3],
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.pixels[i..i + 3].copy_from_slice(&rgb);
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Heif(#[from] libheif_rs::HeifError),
    #[error("heif image has no interleaved color plane")]
    MissingPlane,
}

/// Decode a file into a `Bitmap`. HEIC/HEIF goes through libheif, everything
/// else through the `image` crate with format guessing. Any failure carries
/// its cause; the caller substitutes a "cannot display" state.
pub fn decode(path: &Path) -> Result<Bitmap, DecodeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if ext == "heic" || ext == "heif" {
        decode_heif(path)
    } else {
        decode_raster(path)
    }
}

fn decode_raster(path: &Path) -> Result<Bitmap, DecodeError> {
    let img = image::ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Bitmap {
        width,
        height,
        pixels: rgb.into_raw(),
    })
}

fn decode_heif(path: &Path) -> Result<Bitmap, DecodeError> {
    let bytes = fs::read(path)?;
    let ctx = HeifContext::read_from_bytes(&bytes)?;
    let handle = ctx.primary_image_handle()?;
    let lib_heif = LibHeif::new();
    let img = lib_heif.decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)?;
    let planes = img.planes();
    let plane = planes.interleaved.ok_or(DecodeError::MissingPlane)?;

    let width = plane.width;
    let height = plane.height;
    let row_bytes = width as usize * 3;
    // libheif rows may carry padding; copy stride-aware.
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * plane.stride;
        pixels.extend_from_slice(&plane.data[start..start + row_bytes]);
    }
    Ok(Bitmap {
        width,
        height,
        pixels,
    })
}

// ---------------------------------------------------------------------------
// Prefetch cache (shared between the UI thread and the worker via
// Mutex + Condvar)
// ---------------------------------------------------------------------------

/// Filename-keyed cache of decoded images for the current source directory.
/// Decode failures are kept as sentinels so a broken file is not retried on
/// every navigation. Cleared in full when the directory changes.
pub struct PrefetchCache {
    images: HashMap<String, Arc<Bitmap>>,
    errors: HashMap<String, String>,
    in_flight: HashSet<String>,
    want: Option<(String, PathBuf)>,
    generation: u64,
    shutdown: bool,
}

pub type SharedCache = Arc<(Mutex<PrefetchCache>, Condvar)>;

impl PrefetchCache {
    fn new() -> PrefetchCache {
        PrefetchCache {
            images: HashMap::new(),
            errors: HashMap::new(),
            in_flight: HashSet::new(),
            want: None,
            generation: 0,
            shutdown: false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Bitmap>> {
        self.images.get(name).cloned()
    }

    pub fn error_for(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    /// Drop everything cached or requested. A decode still in flight is
    /// discarded on arrival via the generation check.
    pub fn clear(&mut self) {
        self.images.clear();
        self.errors.clear();
        self.want = None;
        self.generation += 1;
    }

    fn take_work(&mut self) -> Option<(String, PathBuf, u64)> {
        let (name, path) = self.want.take()?;
        if self.images.contains_key(&name)
            || self.errors.contains_key(&name)
            || self.in_flight.contains(&name)
        {
            return None;
        }
        self.in_flight.insert(name.clone());
        Some((name, path, self.generation))
    }

    #[cfg(test)]
    fn pending(&self) -> bool {
        self.want.is_some()
    }
}

pub fn new_shared_cache() -> SharedCache {
    Arc::new((Mutex::new(PrefetchCache::new()), Condvar::new()))
}

/// Ask the worker to decode `path` ahead of time. A no-op when the entry is
/// already cached (image or failure sentinel) or currently being decoded.
pub fn request_prefetch(shared: &SharedCache, name: &str, path: &Path) {
    let (lock, cvar) = &**shared;
    let mut cache = lock.lock().unwrap();
    if cache.images.contains_key(name)
        || cache.errors.contains_key(name)
        || cache.in_flight.contains(name)
    {
        return;
    }
    log::debug!("[prefetch] queue {}", name);
    cache.want = Some((name.to_string(), path.to_path_buf()));
    cvar.notify_one();
}

/// Stop the worker thread. Used on shutdown and in tests; leaking the
/// thread at process exit would also be fine.
pub fn shutdown_prefetch(shared: &SharedCache) {
    let (lock, cvar) = &**shared;
    lock.lock().unwrap().shutdown = true;
    cvar.notify_all();
}

/// One background worker decoding the most recently requested file into the
/// cache. The UI never blocks on it: a display-time miss just decodes
/// synchronously on the UI thread.
pub fn spawn_prefetch_worker(shared: SharedCache) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            let (name, path, generation) = {
                let (lock, cvar) = &*shared;
                let mut cache = lock.lock().unwrap();
                loop {
                    if cache.shutdown {
                        return;
                    }
                    if let Some(work) = cache.take_work() {
                        break work;
                    }
                    cache = cvar.wait(cache).unwrap();
                }
            };

            let result = decode(&path);

            let (lock, cvar) = &*shared;
            let mut cache = lock.lock().unwrap();
            cache.in_flight.remove(&name);
            if cache.generation == generation {
                match result {
                    Ok(bitmap) => {
                        log::debug!(
                            "[prefetch] ready {} ({}x{})",
                            name,
                            bitmap.width,
                            bitmap.height
                        );
                        cache.images.insert(name, Arc::new(bitmap));
                    }
                    Err(e) => {
                        log::debug!("[prefetch] failed {}: {}", name, e);
                        cache.errors.insert(name, e.to_string());
                    }
                }
            }
            cvar.notify_all();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn write_png(dir: &Path, name: &str, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(8, 6, image::Rgb(rgb))
            .save(&path)
            .unwrap();
        path
    }

    fn wait_for_entry(shared: &SharedCache, name: &str) {
        let (lock, cvar) = &**shared;
        let mut cache = lock.lock().unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        while cache.get(name).is_none() && cache.error_for(name).is_none() {
            assert!(Instant::now() < deadline, "prefetch timed out");
            let (c, _) = cvar.wait_timeout(cache, Duration::from_millis(50)).unwrap();
            cache = c;
        }
    }

    #[test]
    fn decode_png_normalizes_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", [10, 200, 30]);

        let bmp = decode(&path).unwrap();
        assert_eq!((bmp.width, bmp.height), (8, 6));
        assert_eq!(bmp.pixels.len(), 8 * 6 * 3);
        assert_eq!(bmp.pixel(3, 2), [10, 200, 30]);
    }

    #[test]
    fn decode_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(decode(&dir.path().join("nope.jpg")).is_err());
    }

    #[test]
    fn decode_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        fs::write(&path, b"not an image at all").unwrap();
        assert!(decode(&path).is_err());
    }

    #[test]
    fn prefetch_decodes_into_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", [1, 2, 3]);

        let shared = new_shared_cache();
        let handle = spawn_prefetch_worker(Arc::clone(&shared));
        request_prefetch(&shared, "a.png", &path);
        wait_for_entry(&shared, "a.png");

        let img = shared.0.lock().unwrap().get("a.png").unwrap();
        assert_eq!((img.width, img.height), (8, 6));

        shutdown_prefetch(&shared);
        handle.join().unwrap();
    }

    #[test]
    fn prefetch_failure_is_kept_as_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"garbage").unwrap();

        let shared = new_shared_cache();
        let handle = spawn_prefetch_worker(Arc::clone(&shared));
        request_prefetch(&shared, "broken.jpg", &path);
        wait_for_entry(&shared, "broken.jpg");

        {
            let cache = shared.0.lock().unwrap();
            assert!(cache.get("broken.jpg").is_none());
            assert!(cache.error_for("broken.jpg").is_some());
        }

        // A second request for a failed entry is a no-op.
        request_prefetch(&shared, "broken.jpg", &path);
        assert!(!shared.0.lock().unwrap().pending());

        shutdown_prefetch(&shared);
        handle.join().unwrap();
    }

    #[test]
    fn clear_invalidates_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", [1, 2, 3]);

        let shared = new_shared_cache();
        let handle = spawn_prefetch_worker(Arc::clone(&shared));
        request_prefetch(&shared, "a.png", &path);
        wait_for_entry(&shared, "a.png");

        {
            let mut cache = shared.0.lock().unwrap();
            cache.clear();
            assert!(cache.get("a.png").is_none());
            assert!(cache.error_for("a.png").is_none());
        }

        shutdown_prefetch(&shared);
        handle.join().unwrap();
    }
}
