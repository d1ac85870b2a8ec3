//! All-pairs comparisons between groups, computed feature by feature.
//!
//! Only the upper triangle of group pairs is traversed; each pair fills both directions from
//! the same per-block moments. Comparisons are made within each block and combined with a
//! weighted mean, the weight of a block being the product of the two group sizes in it.

use ndarray::{Array2, Array3, ArrayViewMut1, ArrayViewMut2, Axis};
use rayon::prelude::*;
use single_utilities::traits::FloatOpsTS;

use crate::markers::effect::{auc_from_sorted, cohens_d, compute_moments, sorted_values, GroupMoments};
use crate::markers::utils::GroupLayout;
use crate::markers::ScoreMarkersConfig;
use crate::matrix::MatrixHandle;

/// Per-combination moments and pairwise effects of every feature.
///
/// Effect cubes have shape `(num_groups, num_groups, num_features)` and are indexed as
/// `[focal, other, feature]`; the diagonal is NaN.
#[derive(Debug, Clone)]
pub struct PairwiseResults {
    /// `[group][block][feature]`
    pub means: Vec<Vec<Vec<f64>>>,
    /// `[group][block][feature]`
    pub detected: Vec<Vec<Vec<f64>>>,
    pub cohen: Array3<f64>,
    pub lfc: Array3<f64>,
    pub delta_detected: Array3<f64>,
    pub auc: Option<Array3<f64>>,
}

/// Output slots of a single feature: one entry per combination, `[focal, other]` per effect.
struct FeatureLanes<'a> {
    feature: usize,
    means: ArrayViewMut1<'a, f64>,
    detected: ArrayViewMut1<'a, f64>,
    cohen: ArrayViewMut2<'a, f64>,
    lfc: ArrayViewMut2<'a, f64>,
    delta_detected: ArrayViewMut2<'a, f64>,
    auc: Option<ArrayViewMut2<'a, f64>>,
}

#[derive(Debug, Default)]
struct PairAccumulator {
    weight: f64,
    cohen_forward: f64,
    cohen_reverse: f64,
    lfc: f64,
    delta_detected: f64,
    auc_forward: f64,
    auc_reverse: f64,
}

/// Compare all groups on all features of `matrix`, in parallel over features.
///
/// Each feature writes straight into its lanes of the output cubes. Runs on the current
/// rayon pool; callers control the thread count via `pool.install`.
pub fn compare_groups<T>(
    matrix: &MatrixHandle<T>,
    layout: &GroupLayout,
    config: &ScoreMarkersConfig,
) -> PairwiseResults
where
    T: FloatOpsTS,
{
    let num_features = matrix.nrows();
    let num_groups = layout.num_groups();
    let ncols = matrix.ncols();

    let shape = (num_groups, num_groups, num_features);
    let mut cohen = Array3::from_elem(shape, f64::NAN);
    let mut lfc = cohen.clone();
    let mut delta_detected = cohen.clone();
    let mut auc = config.compute_auc.then(|| cohen.clone());
    let mut means = Array2::from_elem((layout.num_combos(), num_features), f64::NAN);
    let mut detected = means.clone();

    let auc_lanes: Vec<Option<ArrayViewMut2<f64>>> = match auc.as_mut() {
        Some(cube) => cube.axis_iter_mut(Axis(2)).map(Some).collect(),
        None => (0..num_features).map(|_| None).collect(),
    };
    let lanes: Vec<FeatureLanes> = means
        .axis_iter_mut(Axis(1))
        .zip(detected.axis_iter_mut(Axis(1)))
        .zip(cohen.axis_iter_mut(Axis(2)))
        .zip(lfc.axis_iter_mut(Axis(2)))
        .zip(delta_detected.axis_iter_mut(Axis(2)))
        .zip(auc_lanes)
        .enumerate()
        .map(
            |(feature, (((((means, detected), cohen), lfc), delta_detected), auc))| FeatureLanes {
                feature,
                means,
                detected,
                cohen,
                lfc,
                delta_detected,
                auc,
            },
        )
        .collect();

    lanes.into_par_iter().for_each_init(
        || vec![0.0; ncols],
        |buffer, mut lanes| {
            matrix.fetch_row(lanes.feature, buffer);
            compare_feature(buffer, layout, config, &mut lanes);
        },
    );

    PairwiseResults {
        means: split_combos(&means, layout),
        detected: split_combos(&detected, layout),
        cohen,
        lfc,
        delta_detected,
        auc,
    }
}

fn compare_feature(
    values: &[f64],
    layout: &GroupLayout,
    config: &ScoreMarkersConfig,
    out: &mut FeatureLanes,
) {
    let num_groups = layout.num_groups();
    let threshold = config.lfc_threshold;
    let floor = config.variance_floor;

    let moments: Vec<GroupMoments> = (0..layout.num_combos())
        .map(|c| compute_moments(values, layout.indices(c)))
        .collect();
    for (c, m) in moments.iter().enumerate() {
        out.means[c] = m.mean;
        out.detected[c] = m.detected;
    }

    let sorted: Option<Vec<Vec<f64>>> = out.auc.is_some().then(|| {
        (0..layout.num_combos())
            .map(|c| sorted_values(values, layout.indices(c)))
            .collect()
    });

    for left in 0..num_groups {
        for right in (left + 1)..num_groups {
            let mut acc = PairAccumulator::default();

            for block in 0..layout.num_blocks() {
                let lc = layout.combo(left, block);
                let rc = layout.combo(right, block);
                let (lm, rm) = (&moments[lc], &moments[rc]);
                if lm.n == 0 || rm.n == 0 {
                    continue;
                }

                let weight = (lm.n * rm.n) as f64;
                acc.weight += weight;
                acc.cohen_forward += weight * cohens_d(lm, rm, threshold, floor);
                acc.cohen_reverse += weight * cohens_d(rm, lm, threshold, floor);
                acc.lfc += weight * (lm.mean - rm.mean);
                acc.delta_detected += weight * (lm.detected - rm.detected);

                if let Some(sorted) = &sorted {
                    let forward = auc_from_sorted(&sorted[lc], &sorted[rc], threshold);
                    let reverse = if threshold == 0.0 {
                        1.0 - forward
                    } else {
                        auc_from_sorted(&sorted[rc], &sorted[lc], threshold)
                    };
                    acc.auc_forward += weight * forward;
                    acc.auc_reverse += weight * reverse;
                }
            }

            // No block holds both groups, leave the pair as NaN.
            if acc.weight == 0.0 {
                continue;
            }

            let lfc = acc.lfc / acc.weight;
            let delta_detected = acc.delta_detected / acc.weight;
            out.cohen[[left, right]] = acc.cohen_forward / acc.weight;
            out.cohen[[right, left]] = acc.cohen_reverse / acc.weight;
            out.lfc[[left, right]] = lfc;
            out.lfc[[right, left]] = -lfc;
            out.delta_detected[[left, right]] = delta_detected;
            out.delta_detected[[right, left]] = -delta_detected;
            if let Some(auc) = out.auc.as_mut() {
                auc[[left, right]] = acc.auc_forward / acc.weight;
                auc[[right, left]] = acc.auc_reverse / acc.weight;
            }
        }
    }
}

/// Reshape a `(combination, feature)` array into `[group][block][feature]`.
fn split_combos(values: &Array2<f64>, layout: &GroupLayout) -> Vec<Vec<Vec<f64>>> {
    (0..layout.num_groups())
        .map(|g| {
            (0..layout.num_blocks())
                .map(|b| values.row(layout.combo(g, b)).to_vec())
                .collect()
        })
        .collect()
}
