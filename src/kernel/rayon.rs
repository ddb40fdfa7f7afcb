//! Row-parallel scan (feature-gated).
//!
//! Each row of placements is scored on its own task; the per-row winners are
//! reduced with the same tie-break as the sequential scan, so both return the
//! same peak.

use crate::image::ImageView;
use crate::kernel::{Peak, TemplatePlan};
use crate::util::ProdMatchResult;
use rayon::prelude::*;

/// Parallel counterpart of [`crate::kernel::scalar::scan_best`].
pub fn scan_best_par(image: ImageView<'_, f32>, plan: &TemplatePlan) -> ProdMatchResult<Peak> {
    let (nx, ny) = plan.placements(image)?;
    let floor = Peak {
        x: 0,
        y: 0,
        score: f32::NEG_INFINITY,
    };
    let best = (0..ny)
        .into_par_iter()
        .map(|y| {
            let mut row_best = floor;
            for x in 0..nx {
                let candidate = Peak {
                    x,
                    y,
                    score: plan.score_at(image, x, y),
                };
                if candidate.beats(&row_best) {
                    row_best = candidate;
                }
            }
            row_best
        })
        .reduce(|| floor, |a, b| if b.beats(&a) { b } else { a });
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::scan_best_par;
    use crate::image::ImageView;
    use crate::kernel::scalar::scan_best;
    use crate::kernel::TemplatePlan;

    #[test]
    fn parallel_scan_matches_scalar() {
        let data: Vec<f32> = (0..40 * 30)
            .map(|i: u32| ((i.wrapping_mul(2_654_435_761) >> 7) % 251) as f32)
            .collect();
        let image = ImageView::from_slice(&data, 40, 30).unwrap();
        let tpl = image.roi(11, 9, 8, 6).unwrap().to_owned_image();
        let plan = TemplatePlan::from_view(tpl.view()).unwrap();
        assert_eq!(
            scan_best(image, &plan).unwrap(),
            scan_best_par(image, &plan).unwrap()
        );
    }
}
