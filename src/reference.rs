//! Pure-Rust reference implementations of the upscaling and interpolation
//! math, used only by the test suite to check §8's numeric properties
//! without requiring a probed GPU adapter. Not part of the public API and
//! not wired into the real pipeline; the shaders in [`crate::upscaler`] and
//! [`crate::interpolate`] are the actual runtime path.

#[cfg(test)]
pub(crate) fn nearest_scale(rgba: &[u8], in_w: u32, in_h: u32, out_w: u32, out_h: u32) -> Vec<u8> {
    let mut out = vec![0u8; (out_w * out_h * 4) as usize];
    for oy in 0..out_h {
        let sy = (oy * in_h / out_h.max(1)).min(in_h.saturating_sub(1));
        for ox in 0..out_w {
            let sx = (ox * in_w / out_w.max(1)).min(in_w.saturating_sub(1));
            let src = ((sy * in_w + sx) * 4) as usize;
            let dst = ((oy * out_w + ox) * 4) as usize;
            out[dst..dst + 4].copy_from_slice(&rgba[src..src + 4]);
        }
    }
    out
}

#[cfg(test)]
pub(crate) fn bilinear_scale(rgba: &[u8], in_w: u32, in_h: u32, out_w: u32, out_h: u32) -> Vec<u8> {
    let sample = |x: u32, y: u32, c: usize| -> f32 {
        let x = x.min(in_w - 1);
        let y = y.min(in_h - 1);
        rgba[((y * in_w + x) * 4) as usize + c] as f32
    };

    let mut out = vec![0u8; (out_w * out_h * 4) as usize];
    for oy in 0..out_h {
        let fy = if out_h > 1 { (oy as f32) * (in_h - 1) as f32 / (out_h - 1) as f32 } else { 0.0 };
        let y0 = fy.floor() as u32;
        let y1 = (y0 + 1).min(in_h - 1);
        let wy = fy - y0 as f32;
        for ox in 0..out_w {
            let fx = if out_w > 1 { (ox as f32) * (in_w - 1) as f32 / (out_w - 1) as f32 } else { 0.0 };
            let x0 = fx.floor() as u32;
            let x1 = (x0 + 1).min(in_w - 1);
            let wx = fx - x0 as f32;

            let dst = ((oy * out_w + ox) * 4) as usize;
            for c in 0..4 {
                let top = sample(x0, y0, c) * (1.0 - wx) + sample(x1, y0, c) * wx;
                let bottom = sample(x0, y1, c) * (1.0 - wx) + sample(x1, y1, c) * wx;
                let v = top * (1.0 - wy) + bottom * wy;
                out[dst + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Straight per-pixel cross-fade. Not motion-compensated like the real
/// shader, but agrees with it whenever `a == b` (property 9), which is all
/// the CPU-only suite needs from interpolation.
#[cfg(test)]
pub(crate) fn cross_fade(a: &[u8], b: &[u8], t: f32) -> Vec<u8> {
    a.iter()
        .zip(b.iter())
        .map(|(&av, &bv)| (av as f32 * (1.0 - t) + bv as f32 * t).round().clamp(0.0, 255.0) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_scale_at_1x_is_byte_identical_to_input() {
        let input: Vec<u8> = (0..4 * 4)
            .flat_map(|i| {
                let x = i % 4;
                let y = i / 4;
                [(x * 63) as u8, (y * 63) as u8, 0, 255]
            })
            .collect();
        let out = nearest_scale(&input, 4, 4, 4, 4);
        assert_eq!(out, input);
    }

    #[test]
    fn nearest_scale_output_size_matches_the_output_size_law() {
        for (in_w, in_h, scale) in [(1u32, 1u32, 1.0f32), (7, 5, 2.0), (3, 9, 3.5), (64, 64, 4.0)] {
            let out_w = (in_w as f32 * scale).round() as u32;
            let out_h = (in_h as f32 * scale).round() as u32;
            let input = vec![0u8; (in_w * in_h * 4) as usize];
            let out = nearest_scale(&input, in_w, in_h, out_w, out_h);
            assert_eq!(out.len(), (4 * out_w * out_h) as usize);
        }
    }

    #[test]
    fn bilinear_scale_of_a_horizontal_gradient_is_non_decreasing_left_to_right() {
        let in_w = 16u32;
        let in_h = 2u32;
        let input: Vec<u8> = (0..in_h)
            .flat_map(|_| (0..in_w).flat_map(|x| [(x * 255 / (in_w - 1)) as u8, 0, 0, 255]))
            .collect();
        let out = bilinear_scale(&input, in_w, in_h, 32, 4);
        for row in out.chunks((32 * 4) as usize) {
            let reds: Vec<u8> = row.chunks(4).map(|px| px[0]).collect();
            for pair in reds.windows(2) {
                assert!(pair[1] >= pair[0]);
            }
        }
    }

    #[test]
    fn bilinear_scale_output_size_matches_the_output_size_law() {
        for (in_w, in_h, scale) in [(2u32, 2u32, 2.0f32), (5, 5, 1.5), (10, 3, 4.0)] {
            let out_w = (in_w as f32 * scale).round() as u32;
            let out_h = (in_h as f32 * scale).round() as u32;
            let input = vec![0u8; (in_w * in_h * 4) as usize];
            let out = bilinear_scale(&input, in_w, in_h, out_w, out_h);
            assert_eq!(out.len(), (4 * out_w * out_h) as usize);
        }
    }

    #[test]
    fn cross_fade_of_identical_frames_is_byte_identical_to_the_input() {
        let a = vec![40u8, 80, 120, 255, 1, 2, 3, 4];
        let out = cross_fade(&a, &a, 0.5);
        assert_eq!(out, a);
    }
}
