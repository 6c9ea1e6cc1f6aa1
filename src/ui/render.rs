use crate::loader::Bitmap;

// ---------------------------------------------------------------------------
// Framebuffer drawing primitives (softbuffer u32 pixels, 0x00RRGGBB)
// ---------------------------------------------------------------------------

pub const BG_COLOR: [u8; 4] = [31, 31, 31, 255];

// 5x7 bitmap font covering ASCII 32..127. One byte per column, LSB = top row.
static FONT_5X7: [[u8; 5]; 96] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x14, 0x08, 0x3E, 0x08, 0x14], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x3E, 0x41, 0x5D, 0x55, 0x1E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x10, 0x08, 0x08, 0x10, 0x08], // ~
    [0x00, 0x00, 0x00, 0x00, 0x00], // DEL (blank)
];

/// Glyph columns for a printable ASCII character (blank outside 32..127).
pub fn glyph(ch: char) -> [u8; 5] {
    let idx = (ch as u32).wrapping_sub(32) as usize;
    if idx < 96 { FONT_5X7[idx] } else { FONT_5X7[0] }
}

/// Pack RGB into softbuffer u32 format: 0x00RRGGBB.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

fn unpack_rgb(v: u32) -> (u8, u8, u8) {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

fn draw_char(
    buf: &mut [u32],
    stride: u32,
    buf_h: u32,
    ch: char,
    px: i32,
    py: i32,
    scale: u32,
    color: (u8, u8, u8, u8),
) {
    let g = glyph(ch);
    let a = color.3 as u32;
    for col in 0..5u32 {
        let bits = g[col as usize];
        for row in 0..7u32 {
            if bits & (1 << row) == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + (col * scale + sx) as i32;
                    let y = py + (row * scale + sy) as i32;
                    if x >= 0 && y >= 0 && (x as u32) < stride && (y as u32) < buf_h {
                        let off = (y as u32 * stride + x as u32) as usize;
                        let (dr, dg, db) = unpack_rgb(buf[off]);
                        let r = ((color.0 as u32 * a + dr as u32 * (255 - a)) / 255) as u8;
                        let g2 = ((color.1 as u32 * a + dg as u32 * (255 - a)) / 255) as u8;
                        let b = ((color.2 as u32 * a + db as u32 * (255 - a)) / 255) as u8;
                        buf[off] = rgb(r, g2, b);
                    }
                }
            }
        }
    }
}

/// Draw a string. Returns the x position after the last character.
pub fn draw_text(
    buf: &mut [u32],
    stride: u32,
    buf_h: u32,
    text: &str,
    px: i32,
    py: i32,
    scale: u32,
    color: (u8, u8, u8, u8),
) -> i32 {
    let mut x = px;
    for ch in text.chars() {
        draw_char(buf, stride, buf_h, ch, x, py, scale, color);
        x += (6 * scale) as i32;
    }
    x
}

/// Fill a rectangle with alpha blending.
pub fn fill_rect(
    buf: &mut [u32],
    stride: u32,
    buf_h: u32,
    rx: i32,
    ry: i32,
    rw: u32,
    rh: u32,
    color: (u8, u8, u8, u8),
) {
    let a = color.3 as u32;
    for row in 0..rh {
        let y = ry + row as i32;
        if y < 0 || y as u32 >= buf_h {
            continue;
        }
        for col in 0..rw {
            let x = rx + col as i32;
            if x < 0 || x as u32 >= stride {
                continue;
            }
            let off = (y as u32 * stride + x as u32) as usize;
            let (dr, dg, db) = unpack_rgb(buf[off]);
            let r = ((color.0 as u32 * a + dr as u32 * (255 - a)) / 255) as u8;
            let g = ((color.1 as u32 * a + dg as u32 * (255 - a)) / 255) as u8;
            let b = ((color.2 as u32 * a + db as u32 * (255 - a)) / 255) as u8;
            buf[off] = rgb(r, g, b);
        }
    }
}

/// Copy an RGB bitmap into the framebuffer 1:1 at (x0, y0), clipped. The
/// overlay renderer already produced it at display size, so no scaling
/// happens here.
pub fn blit_bitmap(buf: &mut [u32], stride: u32, buf_h: u32, bmp: &Bitmap, x0: i32, y0: i32) {
    for y in 0..bmp.height {
        let dy = y0 + y as i32;
        if dy < 0 || dy as u32 >= buf_h {
            continue;
        }
        for x in 0..bmp.width {
            let dx = x0 + x as i32;
            if dx < 0 || dx as u32 >= stride {
                continue;
            }
            let [r, g, b] = bmp.pixel(x, y);
            buf[(dy as u32 * stride + dx as u32) as usize] = rgb(r, g, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_packs_and_unpacks() {
        assert_eq!(rgb(0x12, 0x34, 0x56), 0x0012_3456);
        assert_eq!(unpack_rgb(0x0012_3456), (0x12, 0x34, 0x56));
    }

    #[test]
    fn blit_clips_at_the_edges() {
        let mut frame = vec![0u32; 4 * 4];
        let mut bmp = Bitmap::new(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                bmp.set_pixel(x, y, [255, 255, 255]);
            }
        }
        blit_bitmap(&mut frame, 4, 4, &bmp, 2, 2);
        assert_eq!(frame[2 * 4 + 2], rgb(255, 255, 255));
        assert_eq!(frame[3 * 4 + 3], rgb(255, 255, 255));
        assert_eq!(frame[0], 0);
    }

    #[test]
    fn opaque_fill_overwrites() {
        let mut frame = vec![0u32; 8 * 8];
        fill_rect(&mut frame, 8, 8, 1, 1, 2, 2, (10, 20, 30, 255));
        assert_eq!(frame[1 * 8 + 1], rgb(10, 20, 30));
        assert_eq!(frame[0], 0);
    }

    #[test]
    fn text_advances_by_glyph_cell() {
        let mut frame = vec![0u32; 64 * 16];
        let end = draw_text(&mut frame, 64, 16, "ab", 0, 0, 1, (255, 255, 255, 255));
        assert_eq!(end, 12);
        assert!(frame.iter().any(|&p| p != 0));
    }
}
