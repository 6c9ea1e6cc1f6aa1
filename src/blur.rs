use crate::loader::Bitmap;

// ---------------------------------------------------------------------------
// Blur detection: variance of the Laplacian response over luminance.
// Sharp images carry high-frequency edge energy, so their second-derivative
// response has high variance; blur suppresses it.
// ---------------------------------------------------------------------------

/// BT.601 integer luminance, one byte per pixel.
pub fn luminance(bmp: &Bitmap) -> Vec<u8> {
    bmp.pixels
        .chunks_exact(3)
        .map(|p| {
            ((p[0] as u32 * 299 + p[1] as u32 * 587 + p[2] as u32 * 114) / 1000) as u8
        })
        .collect()
}

/// Mirror an out-of-range coordinate without repeating the edge sample
/// (reflect-101: -1 maps to 1, n maps to n-2).
#[inline]
fn mirror(i: i64, n: i64) -> i64 {
    if n == 1 {
        0
    } else if i < 0 {
        -i
    } else if i >= n {
        2 * n - 2 - i
    } else {
        i
    }
}

/// Sharpness score: population variance of the 3x3 Laplacian
/// (0 1 0 / 1 -4 1 / 0 1 0) applied to the luminance plane. All
/// accumulation is in f64 and strictly sequential, so the score is
/// identical for identical input bytes.
pub fn sharpness_score(bmp: &Bitmap) -> f64 {
    let w = bmp.width as i64;
    let h = bmp.height as i64;
    if w == 0 || h == 0 {
        return 0.0;
    }

    let luma = luminance(bmp);
    let at = |x: i64, y: i64| -> f64 {
        luma[(mirror(y, h) * w + mirror(x, w)) as usize] as f64
    };

    let mut response = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let v = at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y)
                - 4.0 * at(x, y);
            response.push(v);
        }
    }

    let n = response.len() as f64;
    let mean = response.iter().sum::<f64>() / n;
    response.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// An image is classified blurred when its sharpness score falls below
/// the threshold.
pub fn is_blurred(bmp: &Bitmap, threshold: f64) -> bool {
    sharpness_score(bmp) < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: u32, height: u32, value: u8) -> Bitmap {
        Bitmap {
            width,
            height,
            pixels: vec![value; width as usize * height as usize * 3],
        }
    }

    fn checkerboard(width: u32, height: u32) -> Bitmap {
        let mut bmp = Bitmap::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                bmp.set_pixel(x, y, [v, v, v]);
            }
        }
        bmp
    }

    #[test]
    fn flat_image_scores_zero() {
        assert_eq!(sharpness_score(&flat(16, 16, 128)), 0.0);
    }

    #[test]
    fn checkerboard_scores_higher_than_flat() {
        let sharp = sharpness_score(&checkerboard(16, 16));
        assert!(sharp > 0.0);
        assert!(sharp > sharpness_score(&flat(16, 16, 128)));
    }

    #[test]
    fn classification_follows_threshold() {
        let bmp = flat(16, 16, 200);
        // Variance 0: blurred for any positive threshold, not for 0.
        assert!(is_blurred(&bmp, 100.0));
        assert!(!is_blurred(&bmp, 0.0));

        let sharp = checkerboard(16, 16);
        let score = sharpness_score(&sharp);
        assert!(!is_blurred(&sharp, score - 1.0));
        assert!(is_blurred(&sharp, score + 1.0));
    }

    #[test]
    fn monotonic_in_threshold() {
        let bmp = checkerboard(12, 12);
        let (t1, t2) = (50.0, 500_000.0);
        if is_blurred(&bmp, t1) {
            assert!(is_blurred(&bmp, t2));
        }
        // The contrapositive on the same pair.
        if !is_blurred(&bmp, t2) {
            assert!(!is_blurred(&bmp, t1));
        }
    }

    #[test]
    fn score_is_deterministic() {
        let bmp = checkerboard(20, 14);
        assert_eq!(sharpness_score(&bmp), sharpness_score(&bmp));
    }

    #[test]
    fn step_edge_has_positive_score() {
        let mut bmp = Bitmap::new(16, 16);
        for y in 0..16 {
            for x in 8..16 {
                bmp.set_pixel(x, y, [255, 255, 255]);
            }
        }
        assert!(sharpness_score(&bmp) > 0.0);
    }
}
