use crate::markers::utils::GroupLayout;

/// Cross-block averages of the per-block means and detected proportions of every group.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAverages {
    /// `[group][feature]`
    pub means: Vec<Vec<f64>>,
    /// `[group][feature]`
    pub detected: Vec<Vec<f64>>,
}

/// Average `[group][block][feature]` statistics over blocks.
///
/// Returns `None` with a single block, where the per-block values already are the average.
pub fn average_blocks(
    means: &[Vec<Vec<f64>>],
    detected: &[Vec<Vec<f64>>],
    layout: &GroupLayout,
) -> Option<BlockAverages> {
    if layout.num_blocks() <= 1 {
        return None;
    }

    let mut averaged_means = Vec::with_capacity(layout.num_groups());
    let mut averaged_detected = Vec::with_capacity(layout.num_groups());
    for g in 0..layout.num_groups() {
        let present: Vec<usize> = (0..layout.num_blocks())
            .filter(|&b| layout.combo_size(g, b) > 0)
            .collect();
        averaged_means.push(average_vectors(&means[g], &present));
        averaged_detected.push(average_vectors(&detected[g], &present));
    }

    Some(BlockAverages {
        means: averaged_means,
        detected: averaged_detected,
    })
}

/// Feature-wise arithmetic mean of `vectors[b]` over the blocks `b` in `present`.
///
/// Blocks are summed in increasing order. Without any present block every entry is NaN.
pub fn average_vectors(vectors: &[Vec<f64>], present: &[usize]) -> Vec<f64> {
    let len = vectors.first().map_or(0, Vec::len);
    if present.is_empty() {
        return vec![f64::NAN; len];
    }

    let mut out = vec![0.0; len];
    for &b in present {
        for (o, &v) in out.iter_mut().zip(&vectors[b]) {
            *o += v;
        }
    }
    let count = present.len() as f64;
    out.iter_mut().for_each(|o| *o /= count);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block_is_not_averaged() {
        let layout = GroupLayout::new(&[0, 1], None);
        let means = vec![vec![vec![1.0]], vec![vec![2.0]]];
        assert!(average_blocks(&means, &means, &layout).is_none());
    }

    #[test]
    fn test_empty_blocks_are_excluded() {
        // Group 0 lives in blocks 0 and 2, group 1 in block 1 only.
        let layout = GroupLayout::new(&[0, 1, 0], Some(&[0, 1, 2]));
        let nan = f64::NAN;
        let means = vec![
            vec![vec![1.0, 2.0], vec![nan, nan], vec![3.0, 6.0]],
            vec![vec![nan, nan], vec![5.0, 7.0], vec![nan, nan]],
        ];
        let detected = vec![
            vec![vec![1.0, 0.0], vec![nan, nan], vec![0.0, 1.0]],
            vec![vec![nan, nan], vec![1.0, 1.0], vec![nan, nan]],
        ];

        let averaged = average_blocks(&means, &detected, &layout).unwrap();
        assert_eq!(averaged.means[0], vec![2.0, 4.0]);
        assert_eq!(averaged.means[1], vec![5.0, 7.0]);
        assert_eq!(averaged.detected[0], vec![0.5, 0.5]);
    }

    #[test]
    fn test_average_vectors_without_blocks() {
        let out = average_vectors(&[vec![1.0, 2.0]], &[]);
        assert!(out.iter().all(|v| v.is_nan()));
    }
}
