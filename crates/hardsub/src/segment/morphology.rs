use image::GrayImage;

/// Square structuring-element morphology on binary masks. Pixels outside the
/// image never contribute to a dilation or an erosion.
fn apply(mask: &GrayImage, kernel: u32, take_max: bool) -> GrayImage {
    let (width, height) = mask.dimensions();
    let radius = (kernel / 2) as i64;
    let mut out = GrayImage::new(width, height);

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut acc = if take_max { 0u8 } else { 255u8 };
            for dy in -radius..=radius {
                let ny = y + dy;
                if ny < 0 || ny >= height as i64 {
                    continue;
                }
                for dx in -radius..=radius {
                    let nx = x + dx;
                    if nx < 0 || nx >= width as i64 {
                        continue;
                    }
                    let value = mask.get_pixel(nx as u32, ny as u32).0[0];
                    acc = if take_max { acc.max(value) } else { acc.min(value) };
                }
            }
            out.get_pixel_mut(x as u32, y as u32).0[0] = acc;
        }
    }

    out
}

pub fn dilate(mask: &GrayImage, kernel: u32) -> GrayImage {
    apply(mask, kernel, true)
}

pub fn erode(mask: &GrayImage, kernel: u32) -> GrayImage {
    apply(mask, kernel, false)
}

/// Morphological closing: `iterations` dilations followed by as many erosions.
pub fn close(mask: &GrayImage, kernel: u32, iterations: u32) -> GrayImage {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = dilate(&out, kernel);
    }
    for _ in 0..iterations {
        out = erode(&out, kernel);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn count_on(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn test_dilate_single_pixel() {
        let mut mask = GrayImage::new(5, 5);
        mask.put_pixel(2, 2, Luma([255]));
        assert_eq!(count_on(&dilate(&mask, 3)), 9);
    }

    #[test]
    fn test_erode_ignores_outside() {
        let mask = GrayImage::from_pixel(4, 4, Luma([255]));
        assert_eq!(count_on(&erode(&mask, 3)), 16);
    }

    #[test]
    fn test_close_bridges_small_gap() {
        let mut mask = GrayImage::new(12, 5);
        for x in (1..5).chain(7..11) {
            mask.put_pixel(x, 2, Luma([255]));
        }
        let closed = close(&mask, 3, 2);
        assert_eq!(closed.get_pixel(5, 2).0, [255]);
        assert_eq!(closed.get_pixel(6, 2).0, [255]);
    }

    #[test]
    fn test_close_keeps_empty_mask_empty() {
        let mask = GrayImage::new(8, 8);
        assert_eq!(count_on(&close(&mask, 3, 2)), 0);
    }
}
