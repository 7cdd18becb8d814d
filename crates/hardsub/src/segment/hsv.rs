use image::{GrayImage, Luma, RgbImage};

use crate::config::SegmenterConfig;

/// Converts one RGB pixel to HSV in the 8-bit convention: H is degrees / 2
/// (0..=180), S and V span 0..=255.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    (
        (h / 2.0).round().clamp(0.0, 180.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        max as u8,
    )
}

/// Marks pixels that pass the brightness gate and fall in the white or yellow
/// band with 255, everything else with 0.
pub fn color_mask(roi: &RgbImage, config: &SegmenterConfig) -> GrayImage {
    let [v_min, v_max] = config.brightness;
    let mut mask = GrayImage::new(roi.width(), roi.height());

    for (x, y, pixel) in roi.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let bright = (v_min..=v_max).contains(&v);
        let colored = config.white.contains(h, s, v) || config.yellow.contains(h, s, v);
        if bright && colored {
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    mask
}
