//! Numeric helpers shared by the gate and the detectors.

/// Scales `values` in place to unit L2 norm. All-zero input is left untouched.
pub(crate) fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

/// Pearson correlation of two equally sized vectors.
///
/// Returns 1.0 when both inputs are constant and equal, 0.0 when only one of
/// them is constant.
pub(crate) fn pearson(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&x, &y) in a[..n].iter().zip(&b[..n]) {
        let dx = f64::from(x) - mean_a;
        let dy = f64::from(y) - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        if var_a <= f64::EPSILON && var_b <= f64::EPSILON && (mean_a - mean_b).abs() < 1e-12 {
            return 1.0;
        }
        return 0.0;
    }
    (cov / denom) as f32
}

/// Median of a non-empty slice; reorders the slice. Even lengths average the
/// two middle values.
pub(crate) fn median_in_place(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let (_, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper;
    if values.len() % 2 == 1 {
        return Some(upper);
    }
    let lower = values[..mid]
        .iter()
        .copied()
        .max_by(f32::total_cmp)
        .unwrap_or(upper);
    Some((lower + upper) * 0.5)
}

/// Number of differing bits between two equally sized byte strings.
pub(crate) fn hamming_bytes(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[cfg(test)]
mod tests {
    use super::{hamming_bytes, l2_normalize, median_in_place, pearson};

    #[test]
    fn l2_normalize_produces_unit_norm() {
        let mut v = [3.0f32, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zeros = [0.0f32; 3];
        l2_normalize(&mut zeros);
        assert_eq!(zeros, [0.0; 3]);
    }

    #[test]
    fn pearson_detects_linear_relations() {
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [2.0f32, 4.0, 6.0, 8.0];
        let c = [4.0f32, 3.0, 2.0, 1.0];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-6);
        assert!((pearson(&a, &c) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn median_handles_odd_and_even_lengths() {
        let mut odd = [5.0f32, 1.0, 3.0];
        assert_eq!(median_in_place(&mut odd), Some(3.0));
        let mut even = [4.0f32, 1.0, 3.0, 2.0];
        assert_eq!(median_in_place(&mut even), Some(2.5));
        assert_eq!(median_in_place(&mut []), None);
    }

    #[test]
    fn hamming_counts_bits() {
        assert_eq!(hamming_bytes(&[0b1010_1010], &[0b0101_0101]), 8);
        assert_eq!(hamming_bytes(&[0xFF, 0x00], &[0xFF, 0x01]), 1);
    }
}
