//! FAST-9 corner detection with 3x3 non-maximum suppression.
//!
//! A pixel is a corner when at least 9 contiguous pixels on the 16-pixel
//! Bresenham circle of radius 3 are all brighter than `center + threshold` or
//! all darker than `center - threshold`. The corner score is the summed
//! excess over the threshold on the winning side.

use crate::image::GrayImage;

const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const ARC: usize = 9;

/// Detected corner in level coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

fn corner_score(img: &GrayImage, x: usize, y: usize, threshold: u8) -> Option<f32> {
    let center = i16::from(img.at(x, y));
    let t = i16::from(threshold);
    let mut ring = [0i16; 16];
    for (slot, &(dx, dy)) in ring.iter_mut().zip(CIRCLE.iter()) {
        let px = (x as isize + dx) as usize;
        let py = (y as isize + dy) as usize;
        *slot = i16::from(img.at(px, py));
    }

    // Cardinal pixels reject most candidates before the full arc scan.
    let cardinals = [ring[0], ring[4], ring[8], ring[12]];
    let bright = cardinals.iter().filter(|&&p| p > center + t).count();
    let dark = cardinals.iter().filter(|&&p| p < center - t).count();
    if bright < 2 && dark < 2 {
        return None;
    }

    let mut best: Option<f32> = None;
    for sign in [1i16, -1] {
        let mut run = 0usize;
        let mut longest = 0usize;
        for i in 0..32 {
            let diff = (ring[i % 16] - center) * sign;
            if diff > t {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }
        if longest >= ARC {
            let score: i32 = ring
                .iter()
                .map(|&p| i32::from(((p - center) * sign - t).max(0)))
                .sum();
            let score = score as f32;
            best = Some(best.map_or(score, |b: f32| b.max(score)));
        }
    }
    best
}

/// Detects FAST-9 corners at least `border` pixels away from every edge.
pub fn detect_fast9(img: &GrayImage, threshold: u8, border: usize) -> Vec<Corner> {
    let width = img.width();
    let height = img.height();
    let border = border.max(3);
    if width <= 2 * border || height <= 2 * border {
        return Vec::new();
    }

    let mut scores = vec![0.0f32; width * height];
    for y in border..height - border {
        for x in border..width - border {
            if let Some(score) = corner_score(img, x, y, threshold) {
                scores[y * width + x] = score;
            }
        }
    }

    let mut corners = Vec::new();
    for y in border..height - border {
        for x in border..width - border {
            let idx = y * width + x;
            let score = scores[idx];
            if score <= 0.0 {
                continue;
            }
            let mut is_max = true;
            'window: for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nidx = ((y as isize + dy) as usize) * width + (x as isize + dx) as usize;
                    let other = scores[nidx];
                    // Plateaus keep the first pixel in raster order.
                    if other > score || (other == score && nidx < idx) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                corners.push(Corner { x, y, score });
            }
        }
    }
    corners
}

#[cfg(test)]
mod tests {
    use super::detect_fast9;
    use crate::image::OwnedImage;

    #[test]
    fn flat_image_has_no_corners() {
        let img = OwnedImage::new(vec![128u8; 40 * 40], 40, 40).unwrap();
        assert!(detect_fast9(&img, 20, 3).is_empty());
    }

    #[test]
    fn bright_square_yields_corners_near_its_vertices() {
        let width = 48;
        let height = 48;
        let data: Vec<u8> = (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                if (16..32).contains(&x) && (16..32).contains(&y) {
                    220
                } else {
                    30
                }
            })
            .collect();
        let img = OwnedImage::new(data, width, height).unwrap();
        let corners = detect_fast9(&img, 20, 3);
        assert!(!corners.is_empty());
        for (vx, vy) in [(16usize, 16usize), (31, 16), (16, 31), (31, 31)] {
            assert!(
                corners
                    .iter()
                    .any(|c| c.x.abs_diff(vx) <= 2 && c.y.abs_diff(vy) <= 2),
                "no corner near ({vx}, {vy})"
            );
        }
    }
}
