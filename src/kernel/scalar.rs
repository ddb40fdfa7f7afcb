//! Sequential reference scan.

use crate::image::ImageView;
use crate::kernel::{Peak, TemplatePlan};
use crate::util::ProdMatchResult;

/// Scans every placement in raster order and returns the best peak.
pub fn scan_best(image: ImageView<'_, f32>, plan: &TemplatePlan) -> ProdMatchResult<Peak> {
    let (nx, ny) = plan.placements(image)?;
    let mut best = Peak {
        x: 0,
        y: 0,
        score: f32::NEG_INFINITY,
    };
    for y in 0..ny {
        for x in 0..nx {
            let candidate = Peak {
                x,
                y,
                score: plan.score_at(image, x, y),
            };
            if candidate.beats(&best) {
                best = candidate;
            }
        }
    }
    Ok(best)
}
