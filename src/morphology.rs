//! Binary erosion, connected-component labeling and region properties.

use crate::mask::BinaryMask;

const CROSS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const NEIGHBORS_8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One pass of erosion with the 4-connected cross. Pixels outside the image
/// count as set, so foreground touching the border is not eaten away.
pub fn erode_cross(mask: &BinaryMask) -> BinaryMask {
    let width = mask.width() as isize;
    let height = mask.height() as isize;
    BinaryMask::from_fn(mask.width(), mask.height(), |r, c| {
        if !mask.get(r, c) {
            return false;
        }
        CROSS.iter().all(|(dr, dc)| {
            let nr = r as isize + dr;
            let nc = c as isize + dc;
            if nr < 0 || nc < 0 || nr >= height || nc >= width {
                return true;
            }
            mask.get(nr as usize, nc as usize)
        })
    })
}

/// Shape descriptors of one connected component.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionProps {
    /// 1-based label in raster order of each component's first pixel.
    pub label: u32,
    pub area: usize,
    pub centroid: (f64, f64),
    pub major_axis_length: f64,
    pub minor_axis_length: f64,
}

impl RegionProps {
    fn from_pixels(label: u32, pixels: &[(usize, usize)]) -> Self {
        let n = pixels.len() as f64;
        let (sum_r, sum_c) = pixels
            .iter()
            .fold((0.0, 0.0), |(r, c), &(pr, pc)| (r + pr as f64, c + pc as f64));
        let mean_r = sum_r / n;
        let mean_c = sum_c / n;

        let (mut var_r, mut var_c, mut cov) = (0.0, 0.0, 0.0);
        for &(pr, pc) in pixels {
            let dr = pr as f64 - mean_r;
            let dc = pc as f64 - mean_c;
            var_r += dr * dr;
            var_c += dc * dc;
            cov += dr * dc;
        }
        var_r /= n;
        var_c /= n;
        cov /= n;

        let half_trace = (var_r + var_c) / 2.0;
        let spread = (((var_r - var_c) / 2.0).powi(2) + cov * cov).sqrt();
        let major = (half_trace + spread).max(0.0);
        let minor = (half_trace - spread).max(0.0);

        Self {
            label,
            area: pixels.len(),
            centroid: (mean_r, mean_c),
            major_axis_length: 4.0 * major.sqrt(),
            minor_axis_length: 4.0 * minor.sqrt(),
        }
    }
}

/// Labels 8-connected components and measures each one. Components are
/// returned in label order.
pub fn label_regions(mask: &BinaryMask) -> Vec<RegionProps> {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let mut visited = vec![false; width * height];
    let mut regions = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut pixels: Vec<(usize, usize)> = Vec::new();

    for r in 0..height {
        for c in 0..width {
            let idx = r * width + c;
            if visited[idx] || !mask.get(r, c) {
                continue;
            }
            visited[idx] = true;
            stack.push((r, c));
            pixels.clear();

            while let Some((cr, cc)) = stack.pop() {
                pixels.push((cr, cc));
                for (dr, dc) in NEIGHBORS_8 {
                    let nr = cr as isize + dr;
                    let nc = cc as isize + dc;
                    if nr < 0 || nc < 0 || nr >= height as isize || nc >= width as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    let nidx = nr * width + nc;
                    if !visited[nidx] && mask.get(nr, nc) {
                        visited[nidx] = true;
                        stack.push((nr, nc));
                    }
                }
            }

            let label = regions.len() as u32 + 1;
            regions.push(RegionProps::from_pixels(label, &pixels));
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> BinaryMask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        BinaryMask::from_fn(width, height, |r, c| rows[r].as_bytes()[c] == b'#')
    }

    #[test]
    fn erosion_strips_isolated_pixels_and_thin_bridges() {
        let mask = mask_from_rows(&[
            ".......", //
            ".###...", //
            ".######", //
            ".###...", //
            ".......", //
        ]);
        let eroded = erode_cross(&mask);
        assert!(eroded.get(2, 2));
        assert!(eroded.get(2, 3));
        assert!(!eroded.get(2, 5));
        assert_eq!(eroded.count(), 2);
    }

    #[test]
    fn erosion_keeps_foreground_on_the_border() {
        let mask = BinaryMask::from_fn(3, 3, |_, _| true);
        assert_eq!(erode_cross(&mask).count(), 9);
    }

    #[test]
    fn diagonal_pixels_join_one_component() {
        let mask = mask_from_rows(&[
            "#...", //
            ".#..", //
            "...#", //
        ]);
        let regions = label_regions(&mask);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].area, 2);
        assert_eq!(regions[0].label, 1);
        assert_eq!(regions[1].centroid, (2.0, 3.0));
    }

    #[test]
    fn rectangle_axes_follow_population_moments() {
        let mask = BinaryMask::from_fn(12, 5, |r, c| (1..4).contains(&r) && (1..11).contains(&c));
        let regions = label_regions(&mask);
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.area, 30);
        assert_eq!(region.centroid, (2.0, 5.5));
        assert!((region.major_axis_length - 4.0 * (99.0f64 / 12.0).sqrt()).abs() < 1e-9);
        assert!((region.minor_axis_length - 4.0 * (8.0f64 / 12.0).sqrt()).abs() < 1e-9);
    }
}
