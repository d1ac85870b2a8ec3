//! Reduction of pairwise effects into per-group summaries.

use ndarray::{s, Array3};
use rayon::prelude::*;
use statrs::statistics::{Data, Median};

use crate::markers::effect::descending_nan_last;
use crate::markers::{ComputeSummaries, SummaryType};

/// Summaries of one effect type, `[summary][group][feature]`, `None` where not computed.
#[derive(Debug, Clone, Default)]
pub struct EffectSummaries {
    stats: [Option<Vec<Vec<f64>>>; SummaryType::COUNT],
}

impl EffectSummaries {
    pub fn is_available(&self, summary: SummaryType) -> bool {
        self.stats[summary.index()].is_some()
    }

    pub fn get(&self, group: usize, summary: SummaryType) -> Option<&[f64]> {
        self.stats[summary.index()]
            .as_ref()
            .and_then(|groups| groups.get(group))
            .map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Copy)]
struct FeatureSummary {
    min: f64,
    mean: f64,
    median: f64,
    max: f64,
}

/// Summarize an effect cube indexed `[focal, other, feature]` for every focal group.
pub fn summarize_effects(cube: &Array3<f64>, flags: ComputeSummaries) -> EffectSummaries {
    let (num_groups, _, num_features) = cube.dim();
    let mut out = EffectSummaries::default();

    if flags.min || flags.mean || flags.median || flags.max {
        let per_group: Vec<Vec<FeatureSummary>> = (0..num_groups)
            .map(|focal| {
                (0..num_features)
                    .into_par_iter()
                    .map(|feature| summarize_feature(cube, focal, feature, flags.median))
                    .collect()
            })
            .collect();

        let extract = |pick: fn(&FeatureSummary) -> f64| -> Vec<Vec<f64>> {
            per_group
                .iter()
                .map(|features| features.iter().map(pick).collect())
                .collect()
        };

        if flags.min {
            out.stats[SummaryType::Min.index()] = Some(extract(|s| s.min));
        }
        if flags.mean {
            out.stats[SummaryType::Mean.index()] = Some(extract(|s| s.mean));
        }
        if flags.median {
            out.stats[SummaryType::Median.index()] = Some(extract(|s| s.median));
        }
        if flags.max {
            out.stats[SummaryType::Max.index()] = Some(extract(|s| s.max));
        }
    }

    if flags.min_rank {
        out.stats[SummaryType::MinRank.index()] =
            Some((0..num_groups).map(|focal| min_rank(cube, focal)).collect());
    }

    out
}

fn summarize_feature(cube: &Array3<f64>, focal: usize, feature: usize, with_median: bool) -> FeatureSummary {
    let num_groups = cube.dim().0;
    let values: Vec<f64> = (0..num_groups)
        .filter(|&other| other != focal)
        .map(|other| cube[[focal, other, feature]])
        .filter(|v| !v.is_nan())
        .collect();

    if values.is_empty() {
        return FeatureSummary {
            min: f64::NAN,
            mean: f64::NAN,
            median: f64::NAN,
            max: f64::NAN,
        };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let median = if with_median {
        Data::new(values).median()
    } else {
        f64::NAN
    };

    FeatureSummary {
        min,
        mean,
        median,
        max,
    }
}

/// Best 1-based rank of each feature across the comparisons of `focal` with every other group.
///
/// Within a comparison features are ordered by decreasing effect, ties by feature index.
/// NaN effects receive no rank; a feature never ranked gets NaN.
fn min_rank(cube: &Array3<f64>, focal: usize) -> Vec<f64> {
    let (num_groups, _, num_features) = cube.dim();
    let others: Vec<usize> = (0..num_groups).filter(|&o| o != focal).collect();

    let per_comparison: Vec<Vec<Option<usize>>> = others
        .into_par_iter()
        .map(|other| {
            let lane = cube.slice(s![focal, other, ..]);
            let mut order: Vec<usize> = (0..num_features).collect();
            order.sort_by(|&a, &b| descending_nan_last(lane[a], lane[b]).then(a.cmp(&b)));

            let mut ranks = vec![None; num_features];
            for (position, &feature) in order.iter().enumerate() {
                if !lane[feature].is_nan() {
                    ranks[feature] = Some(position + 1);
                }
            }
            ranks
        })
        .collect();

    (0..num_features)
        .map(|feature| {
            per_comparison
                .iter()
                .filter_map(|ranks| ranks[feature])
                .min()
                .map_or(f64::NAN, |r| r as f64)
        })
        .collect()
}
