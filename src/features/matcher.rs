//! Brute-force Hamming matching.

use crate::features::{Descriptor, DescriptorMatch};
use crate::util::math::hamming_bytes;

fn nearest(query_idx: usize, query: &Descriptor, train: &[Descriptor], k: usize) -> Vec<DescriptorMatch> {
    let mut candidates: Vec<DescriptorMatch> = train
        .iter()
        .enumerate()
        .map(|(train_idx, desc)| DescriptorMatch {
            query_idx,
            train_idx,
            distance: hamming_bytes(query, desc),
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then_with(|| a.train_idx.cmp(&b.train_idx))
    });
    candidates.truncate(k);
    candidates
}

/// Returns up to `k` nearest train descriptors for each query descriptor.
///
/// Output is index-aligned with `query`. Neighbors are ordered by distance,
/// ties broken by lower train index. Lists are shorter than `k` when `train`
/// has fewer than `k` entries.
pub fn knn_match(query: &[Descriptor], train: &[Descriptor], k: usize) -> Vec<Vec<DescriptorMatch>> {
    if k == 0 || train.is_empty() {
        return vec![Vec::new(); query.len()];
    }

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        query
            .par_iter()
            .enumerate()
            .map(|(idx, desc)| nearest(idx, desc, train, k))
            .collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        query
            .iter()
            .enumerate()
            .map(|(idx, desc)| nearest(idx, desc, train, k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::knn_match;
    use crate::features::Descriptor;

    fn desc(fill: u8) -> Descriptor {
        [fill; 32]
    }

    #[test]
    fn nearest_neighbors_are_sorted() {
        let query = [desc(0b0000_0000)];
        let train = [desc(0b1111_0000), desc(0b0000_0001), desc(0b0000_0011)];
        let matches = knn_match(&query, &train, 2);
        assert_eq!(matches.len(), 1);
        let pair = &matches[0];
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0].train_idx, 1);
        assert_eq!(pair[0].distance, 32);
        assert_eq!(pair[1].train_idx, 2);
        assert_eq!(pair[1].distance, 64);
    }

    #[test]
    fn ties_prefer_lower_train_index() {
        let query = [desc(0)];
        let train = [desc(1), desc(2), desc(1)];
        let matches = knn_match(&query, &train, 2);
        assert_eq!(matches[0][0].train_idx, 0);
        assert_eq!(matches[0][1].train_idx, 1);
    }

    #[test]
    fn short_train_set_yields_short_lists() {
        let query = [desc(0), desc(255)];
        let train = [desc(0)];
        let matches = knn_match(&query, &train, 2);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.len() == 1));
        assert_eq!(matches[1][0].distance, 256);
        assert!(knn_match(&query, &[], 2).iter().all(Vec::is_empty));
    }
}
