use std::collections::VecDeque;

use image::{GrayImage, Luma};

use crate::config::ComponentBounds;

/// Pixel statistics of one 8-connected foreground component.
#[derive(Debug, Clone)]
pub struct Component {
    pub pixels: Vec<(u32, u32)>,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Component {
    pub fn area(&self) -> u64 {
        self.pixels.len() as u64
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn aspect(&self) -> f64 {
        self.width() as f64 / self.height().max(1) as f64
    }

    pub fn fill(&self) -> f64 {
        let box_area = (self.width() as u64 * self.height() as u64).max(1);
        self.area() as f64 / box_area as f64
    }
}

/// Labels the non-zero pixels of `mask` into 8-connected components, in
/// row-major order of their first pixel.
pub fn label_components(mask: &GrayImage) -> Vec<Component> {
    let (width, height) = mask.dimensions();
    let mut visited = vec![false; width as usize * height as usize];
    let mut components = Vec::new();
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;

    for y in 0..height {
        for x in 0..width {
            if visited[index(x, y)] || mask.get_pixel(x, y).0[0] == 0 {
                continue;
            }

            let mut component = Component {
                pixels: Vec::new(),
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            };
            let mut queue = VecDeque::from([(x, y)]);
            visited[index(x, y)] = true;

            while let Some((cx, cy)) = queue.pop_front() {
                component.pixels.push((cx, cy));
                component.min_x = component.min_x.min(cx);
                component.min_y = component.min_y.min(cy);
                component.max_x = component.max_x.max(cx);
                component.max_y = component.max_y.max(cy);

                for ny in cy.saturating_sub(1)..=(cy + 1).min(height - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(width - 1) {
                        let i = index(nx, ny);
                        if !visited[i] && mask.get_pixel(nx, ny).0[0] != 0 {
                            visited[i] = true;
                            queue.push_back((nx, ny));
                        }
                    }
                }
            }

            components.push(component);
        }
    }

    components
}

/// Concrete pixel limits derived from [`ComponentBounds`] for one ROI size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBounds {
    pub min_area: u64,
    pub max_area: u64,
    pub min_height: u32,
    pub max_height: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub min_fill: f64,
    pub max_fill: f64,
}

impl ResolvedBounds {
    pub fn for_roi(bounds: &ComponentBounds, width: u32, height: u32) -> Self {
        let area = (width as u64 * height as u64).max(1) as f64;
        let min_height = bounds
            .min_height_px
            .max((height as f64 * bounds.min_height_ratio).floor() as u32);

        Self {
            min_area: (bounds.min_area_px as u64)
                .max((area * bounds.min_area_ratio).floor() as u64),
            max_area: (area * bounds.max_area_ratio).floor() as u64,
            min_height,
            max_height: (min_height + 1)
                .max((height as f64 * bounds.max_height_ratio).floor() as u32),
            min_width: bounds.min_width_px,
            max_width: (bounds.min_width_px + 1)
                .max((width as f64 * bounds.max_width_ratio).floor() as u32),
            min_aspect: bounds.min_aspect,
            max_aspect: bounds.max_aspect,
            min_fill: bounds.min_fill,
            max_fill: bounds.max_fill,
        }
    }

    pub fn accepts(&self, component: &Component) -> bool {
        let area = component.area();
        let width = component.width();
        let height = component.height();
        let aspect = component.aspect();
        let fill = component.fill();

        (self.min_area..=self.max_area).contains(&area)
            && (self.min_height..=self.max_height).contains(&height)
            && (self.min_width..=self.max_width).contains(&width)
            && (self.min_aspect..=self.max_aspect).contains(&aspect)
            && (self.min_fill..=self.max_fill).contains(&fill)
    }
}

/// Keeps only the components of `mask` that satisfy `bounds`.
pub fn filter_components(mask: &GrayImage, bounds: &ComponentBounds) -> GrayImage {
    let (width, height) = mask.dimensions();
    let resolved = ResolvedBounds::for_roi(bounds, width, height);
    let mut out = GrayImage::new(width, height);

    for component in label_components(mask) {
        if !resolved.accepts(&component) {
            continue;
        }
        for &(x, y) in &component.pixels {
            out.put_pixel(x, y, Luma([255]));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_rect(mask: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    #[test]
    fn test_labels_diagonal_as_one_component() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(1, 1, Luma([255]));
        mask.put_pixel(3, 3, Luma([255]));

        let components = label_components(&mask);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].area(), 2);
        assert_eq!(components[1].area(), 1);
    }

    #[test]
    fn test_component_geometry() {
        let mut mask = GrayImage::new(10, 10);
        fill_rect(&mut mask, 2, 3, 4, 2);
        let components = label_components(&mask);
        assert_eq!(components.len(), 1);
        let c = &components[0];
        assert_eq!((c.width(), c.height()), (4, 2));
        assert!((c.aspect() - 2.0).abs() < 1e-9);
        assert!((c.fill() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolved_bounds_for_typical_roi() {
        let resolved = ResolvedBounds::for_roi(&ComponentBounds::default(), 600, 120);
        // A = 72000
        assert_eq!(resolved.min_area, 12);
        assert_eq!(resolved.max_area, 5760);
        assert_eq!(resolved.min_height, 8);
        assert_eq!(resolved.max_height, 42);
        assert_eq!(resolved.min_width, 2);
        assert_eq!(resolved.max_width, 390);
    }

    #[test]
    fn test_resolved_bounds_for_tiny_roi() {
        let resolved = ResolvedBounds::for_roi(&ComponentBounds::default(), 2, 2);
        assert_eq!(resolved.min_height, 8);
        assert_eq!(resolved.max_height, 9);
        assert_eq!(resolved.max_width, 3);
        assert_eq!(resolved.max_area, 0);
    }

    #[test]
    fn test_filter_keeps_glyph_and_drops_noise() {
        let mut mask = GrayImage::new(200, 60);
        // hollow 10x20 glyph-like outline
        fill_rect(&mut mask, 50, 20, 10, 2);
        fill_rect(&mut mask, 50, 38, 10, 2);
        fill_rect(&mut mask, 50, 20, 2, 20);
        fill_rect(&mut mask, 58, 20, 2, 20);
        // speck and a solid block
        mask.put_pixel(5, 5, Luma([255]));
        fill_rect(&mut mask, 120, 10, 12, 12);

        let filtered = filter_components(&mask, &ComponentBounds::default());
        assert_eq!(filtered.get_pixel(50, 20).0, [255]);
        assert_eq!(filtered.get_pixel(5, 5).0, [0]);
        assert_eq!(filtered.get_pixel(125, 15).0, [0]);
    }
}
