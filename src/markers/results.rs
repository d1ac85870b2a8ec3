//! Immutable container for the output of [`score_markers`](crate::markers::score_markers).

use crate::error::{MarkerError, Result};
use crate::markers::average::BlockAverages;
use crate::markers::effect::descending_nan_last;
use crate::markers::summary::EffectSummaries;
use crate::markers::{EffectType, SummaryType};

/// Block selector for the per-block accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockChoice {
    /// A specific block
    Index(usize),
    /// The average across blocks; identical to block 0 when there is only one block
    Average,
}

impl From<usize> for BlockChoice {
    fn from(block: usize) -> Self {
        BlockChoice::Index(block)
    }
}

/// Marker statistics for every group.
///
/// All vector accessors return slices of length [`num_features`](Self::num_features) that
/// borrow from the result.
#[derive(Debug, Clone)]
pub struct ScoreMarkersResults {
    num_features: usize,
    /// `[group][block][feature]`
    means: Vec<Vec<Vec<f64>>>,
    /// `[group][block][feature]`
    detected: Vec<Vec<Vec<f64>>>,
    averaged: Option<BlockAverages>,
    cohen: EffectSummaries,
    lfc: EffectSummaries,
    delta_detected: EffectSummaries,
    auc: Option<EffectSummaries>,
}

impl ScoreMarkersResults {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        num_features: usize,
        means: Vec<Vec<Vec<f64>>>,
        detected: Vec<Vec<Vec<f64>>>,
        averaged: Option<BlockAverages>,
        cohen: EffectSummaries,
        lfc: EffectSummaries,
        delta_detected: EffectSummaries,
        auc: Option<EffectSummaries>,
    ) -> Self {
        ScoreMarkersResults {
            num_features,
            means,
            detected,
            averaged,
            cohen,
            lfc,
            delta_detected,
            auc,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.means.len()
    }

    /// Number of blocks, or zero if there are no groups.
    pub fn num_blocks(&self) -> usize {
        self.means.first().map_or(0, Vec::len)
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Whether AUCs were computed.
    pub fn has_auc(&self) -> bool {
        self.auc.is_some()
    }

    /// Mean expression of each feature in `group`, for one block or averaged across blocks.
    pub fn means(&self, group: usize, block: impl Into<BlockChoice>) -> Result<&[f64]> {
        let averaged = self.averaged.as_ref().map(|a| a.means.as_slice());
        self.block_view(&self.means, averaged, group, block.into())
    }

    /// Proportion of observations in `group` with detected expression of each feature.
    pub fn detected(&self, group: usize, block: impl Into<BlockChoice>) -> Result<&[f64]> {
        let averaged = self.averaged.as_ref().map(|a| a.detected.as_slice());
        self.block_view(&self.detected, averaged, group, block.into())
    }

    pub fn cohen(&self, group: usize, summary: SummaryType) -> Result<&[f64]> {
        self.summary(EffectType::Cohen, group, summary)
    }

    pub fn lfc(&self, group: usize, summary: SummaryType) -> Result<&[f64]> {
        self.summary(EffectType::Lfc, group, summary)
    }

    pub fn delta_detected(&self, group: usize, summary: SummaryType) -> Result<&[f64]> {
        self.summary(EffectType::DeltaDetected, group, summary)
    }

    /// Fails with [`MarkerError::UnavailableStatistic`] if AUCs were not computed.
    pub fn auc(&self, group: usize, summary: SummaryType) -> Result<&[f64]> {
        self.summary(EffectType::Auc, group, summary)
    }

    /// Summarized `effect` for `group` across its comparisons with all other groups.
    pub fn summary(&self, effect: EffectType, group: usize, summary: SummaryType) -> Result<&[f64]> {
        self.check_group(group)?;
        let store = match effect {
            EffectType::Cohen => Some(&self.cohen),
            EffectType::Lfc => Some(&self.lfc),
            EffectType::DeltaDetected => Some(&self.delta_detected),
            EffectType::Auc => self.auc.as_ref(),
        };
        store
            .and_then(|s| s.get(group, summary))
            .ok_or(MarkerError::UnavailableStatistic { effect, summary })
    }

    /// Indices of the `n` best markers of `group` under one summarized effect.
    ///
    /// Larger values rank first, except for [`SummaryType::MinRank`] where smaller ranks do.
    /// NaN values go last and ties keep feature order.
    pub fn top_markers(
        &self,
        group: usize,
        effect: EffectType,
        summary: SummaryType,
        n: usize,
    ) -> Result<Vec<usize>> {
        let values = self.summary(effect, group, summary)?;

        let mut indices: Vec<usize> = (0..values.len()).collect();
        indices.sort_by(|&a, &b| {
            let order = match summary {
                SummaryType::MinRank => descending_nan_last(-values[a], -values[b]),
                _ => descending_nan_last(values[a], values[b]),
            };
            order.then(a.cmp(&b))
        });
        indices.truncate(n);
        Ok(indices)
    }

    fn check_group(&self, group: usize) -> Result<()> {
        if group >= self.num_groups() {
            return Err(MarkerError::invalid_config(format!(
                "group index {} out of range for {} groups",
                group,
                self.num_groups()
            )));
        }
        Ok(())
    }

    fn block_view<'a>(
        &self,
        per_block: &'a [Vec<Vec<f64>>],
        averaged: Option<&'a [Vec<f64>]>,
        group: usize,
        block: BlockChoice,
    ) -> Result<&'a [f64]> {
        self.check_group(group)?;
        let blocks = &per_block[group];
        match block {
            BlockChoice::Average => Ok(averaged.map_or(blocks[0].as_slice(), |a| a[group].as_slice())),
            BlockChoice::Index(b) => blocks.get(b).map(Vec::as_slice).ok_or_else(|| {
                MarkerError::invalid_config(format!(
                    "block index {} out of range for {} blocks",
                    b,
                    blocks.len()
                ))
            }),
        }
    }
}

impl PartialEq for ScoreMarkersResults {
    /// Bitwise comparison of every stored value, so identical NaNs compare equal.
    fn eq(&self, other: &Self) -> bool {
        fn same(a: &[f64], b: &[f64]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
        }

        let dims = self.num_features == other.num_features
            && self.num_groups() == other.num_groups()
            && self.num_blocks() == other.num_blocks()
            && self.has_auc() == other.has_auc();
        if !dims {
            return false;
        }

        let blocks: Vec<BlockChoice> = (0..self.num_blocks())
            .map(BlockChoice::Index)
            .chain(std::iter::once(BlockChoice::Average))
            .collect();
        let effects = [
            EffectType::Cohen,
            EffectType::Lfc,
            EffectType::DeltaDetected,
            EffectType::Auc,
        ];

        (0..self.num_groups()).all(|g| {
            let per_block = blocks.iter().all(|&b| {
                match (self.means(g, b), other.means(g, b), self.detected(g, b), other.detected(g, b)) {
                    (Ok(m1), Ok(m2), Ok(d1), Ok(d2)) => same(m1, m2) && same(d1, d2),
                    _ => false,
                }
            });
            let summaries = effects.iter().all(|&e| {
                SummaryType::ALL.iter().all(|&s| {
                    match (self.summary(e, g, s), other.summary(e, g, s)) {
                        (Ok(a), Ok(b)) => same(a, b),
                        (Err(_), Err(_)) => true,
                        _ => false,
                    }
                })
            });
            per_block && summaries
        })
    }
}
