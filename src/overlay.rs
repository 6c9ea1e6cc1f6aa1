use image::imageops::FilterType;

use crate::loader::Bitmap;
use crate::ui::render::glyph;

// ---------------------------------------------------------------------------
// Display composition: stretch-resized preview + zoom inset + blur badge
// ---------------------------------------------------------------------------

/// Height reserved at the bottom of the window for the status bar; the
/// zoom inset is lifted above it so the two never overlap.
pub const BAR_HEIGHT: u32 = 60;

const INSET_RIGHT_MARGIN: i64 = 10;
const OUTLINE_PX: u32 = 3;
const BADGE_WIDTH: i64 = 100;
const BADGE_HEIGHT: i64 = 40;
const RED: [u8; 3] = [255, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];

/// Half-open crop region in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Square region of half-extent `range` around (cx, cy), clamped to the
/// image bounds. Clamping is asymmetric: near an edge the region shrinks
/// on that side only instead of shifting inward.
pub fn crop_centered(width: u32, height: u32, cx: u32, cy: u32, range: u32) -> CropRect {
    CropRect {
        x0: cx.saturating_sub(range),
        y0: cy.saturating_sub(range),
        x1: (cx + range).min(width),
        y1: (cy + range).min(height),
    }
}

/// Compose the display image for one photo. Always returns a new bitmap;
/// `original` is never touched, so cached/prefetched buffers stay clean.
///
/// The preview is stretched to fill the viewport exactly (aspect ratio is
/// intentionally not preserved). The crop marker rectangle uses independent
/// x/y scale factors, so it can be non-square when the aspect ratios differ.
pub fn render(
    original: &Bitmap,
    viewport: (u32, u32),
    zoom_range: u32,
    zoom_scale: u32,
    is_blurred: bool,
) -> Bitmap {
    let (vw, vh) = (viewport.0.max(1), viewport.1.max(1));
    let mut display = resize(original, vw, vh);

    let crop = crop_centered(
        original.width,
        original.height,
        original.width / 2,
        original.height / 2,
        zoom_range,
    );

    if crop.width() > 0 && crop.height() > 0 {
        // Marker rectangle, source coordinates scaled into display space.
        let sx = vw as f64 / original.width as f64;
        let sy = vh as f64 / original.height as f64;
        draw_rect_outline(
            &mut display,
            (crop.x0 as f64 * sx).round() as i64,
            (crop.y0 as f64 * sy).round() as i64,
            (crop.x1 as f64 * sx).round() as i64,
            (crop.y1 as f64 * sy).round() as i64,
            OUTLINE_PX,
            RED,
        );

        // Magnified inset from the full-resolution original, fixed square
        // size even when the crop was clamped at an edge.
        let side = (2 * zoom_range * zoom_scale).max(1);
        let mut inset = resize(&extract(original, crop), side, side);
        draw_rect_outline(&mut inset, 0, 0, side as i64, side as i64, OUTLINE_PX, RED);

        let pos_x = (vw as i64 - side as i64 - INSET_RIGHT_MARGIN).max(0);
        let pos_y = (vh as i64 - side as i64 - BAR_HEIGHT as i64).max(0);
        paste(&mut display, &inset, pos_x, pos_y);
    }

    if is_blurred {
        fill_region(&mut display, 0, 0, BADGE_WIDTH, BADGE_HEIGHT, WHITE);
        draw_text_rgb(&mut display, "Blur", 5, 5, 4, RED);
    }

    display
}

/// Lanczos3 resample to exactly `width` x `height`.
pub fn resize(bmp: &Bitmap, width: u32, height: u32) -> Bitmap {
    let img = image::RgbImage::from_raw(bmp.width, bmp.height, bmp.pixels.clone())
        .expect("bitmap buffer matches its dimensions");
    let out = image::imageops::resize(&img, width, height, FilterType::Lanczos3);
    Bitmap {
        width,
        height,
        pixels: out.into_raw(),
    }
}

fn extract(bmp: &Bitmap, crop: CropRect) -> Bitmap {
    let mut out = Bitmap::new(crop.width(), crop.height());
    for y in 0..crop.height() {
        for x in 0..crop.width() {
            out.set_pixel(x, y, bmp.pixel(crop.x0 + x, crop.y0 + y));
        }
    }
    out
}

fn paste(dst: &mut Bitmap, src: &Bitmap, pos_x: i64, pos_y: i64) {
    for y in 0..src.height {
        let dy = pos_y + y as i64;
        if dy < 0 || dy >= dst.height as i64 {
            continue;
        }
        for x in 0..src.width {
            let dx = pos_x + x as i64;
            if dx < 0 || dx >= dst.width as i64 {
                continue;
            }
            dst.set_pixel(dx as u32, dy as u32, src.pixel(x, y));
        }
    }
}

/// Fill a half-open region, clipped to the bitmap.
fn fill_region(bmp: &mut Bitmap, x0: i64, y0: i64, x1: i64, y1: i64, color: [u8; 3]) {
    let cx0 = x0.max(0);
    let cy0 = y0.max(0);
    let cx1 = x1.min(bmp.width as i64);
    let cy1 = y1.min(bmp.height as i64);
    for y in cy0..cy1 {
        for x in cx0..cx1 {
            bmp.set_pixel(x as u32, y as u32, color);
        }
    }
}

/// Rectangle outline drawn inward from the half-open bounds.
fn draw_rect_outline(
    bmp: &mut Bitmap,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    thickness: u32,
    color: [u8; 3],
) {
    let t = thickness as i64;
    fill_region(bmp, x0, y0, x1, y0 + t, color);
    fill_region(bmp, x0, y1 - t, x1, y1, color);
    fill_region(bmp, x0, y0, x0 + t, y1, color);
    fill_region(bmp, x1 - t, y0, x1, y1, color);
}

/// Draw text into an RGB bitmap using the shared 5x7 font.
fn draw_text_rgb(bmp: &mut Bitmap, text: &str, px: i64, py: i64, scale: u32, color: [u8; 3]) {
    let mut x = px;
    for ch in text.chars() {
        let g = glyph(ch);
        for col in 0..5u32 {
            let bits = g[col as usize];
            for row in 0..7u32 {
                if bits & (1 << row) != 0 {
                    fill_region(
                        bmp,
                        x + (col * scale) as i64,
                        py + (row * scale) as i64,
                        x + (col * scale + scale) as i64,
                        py + (row * scale + scale) as i64,
                        color,
                    );
                }
            }
        }
        x += (6 * scale) as i64;
    }
}
