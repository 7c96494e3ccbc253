//! Boolean pixel grids: segmentation output and inclusion masks.

use image::GrayImage;

use crate::geometry::{Point, Polygon, sort_clockwise};

#[derive(Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl std::fmt::Debug for BinaryMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryMask")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("set", &self.count())
            .finish()
    }
}

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for r in 0..height as usize {
            for c in 0..width as usize {
                data.push(f(r, c));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Rasterizes a polygon: a pixel is set when its centre lies inside.
    pub fn from_polygon(width: u32, height: u32, polygon: &Polygon) -> Self {
        Self::from_fn(width, height, |r, c| {
            polygon.contains(&Point::new(r as f64, c as f64))
        })
    }

    /// Inclusion mask covering the arena outline: the boundary points are
    /// ordered clockwise about their centroid and filled as one polygon.
    pub fn from_arena_outline(width: u32, height: u32, nodes: &[Point]) -> Self {
        Self::from_polygon(width, height, &Polygon::new(sort_clockwise(nodes)))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn shape(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, r: usize, c: usize) -> bool {
        self.data[r * self.width as usize + c]
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Clears every pixel that is not set in `other`.
    pub fn retain_within(&mut self, other: &BinaryMask) {
        for (value, keep) in self.data.iter_mut().zip(other.data.iter()) {
            *value &= *keep;
        }
    }

    /// 0/255 rendering for previews.
    pub fn to_image(&self) -> GrayImage {
        let data = self.data.iter().map(|&v| if v { 255 } else { 0 }).collect();
        GrayImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_fill_covers_interior_pixels() {
        let square = Polygon::new(vec![
            Point::new(1.5, 1.5),
            Point::new(1.5, 4.5),
            Point::new(4.5, 4.5),
            Point::new(4.5, 1.5),
        ]);
        let mask = BinaryMask::from_polygon(8, 8, &square);
        assert_eq!(mask.count(), 9);
        assert!(mask.get(2, 2));
        assert!(mask.get(4, 4));
        assert!(!mask.get(1, 1));
    }

    #[test]
    fn outline_order_does_not_matter() {
        let nodes = [
            Point::new(1.5, 1.5),
            Point::new(4.5, 4.5),
            Point::new(1.5, 4.5),
            Point::new(4.5, 1.5),
        ];
        let mask = BinaryMask::from_arena_outline(8, 8, &nodes);
        assert_eq!(mask.count(), 9);
    }

    #[test]
    fn retain_within_intersects() {
        let mut a = BinaryMask::from_fn(3, 1, |_, _| true);
        let b = BinaryMask::from_fn(3, 1, |_, c| c != 1);
        a.retain_within(&b);
        assert_eq!(a.as_slice(), &[true, false, true]);
    }
}
