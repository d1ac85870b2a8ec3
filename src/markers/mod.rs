//! Marker scoring for groups of observations.
//!
//! Every pair of groups is compared on every feature, within each block, yielding Cohen's d,
//! log-fold changes, differences in detected proportions and (optionally) AUCs. For each
//! group these pairwise effects are then summarized across its comparisons with all other
//! groups, so that a strong marker for a group has a large minimum or mean effect, or a
//! small minimum rank.

use std::fmt;

use log::{debug, warn};
use single_utilities::traits::FloatOpsTS;

use crate::error::{Dimension, MarkerError, Result};
use crate::matrix::MatrixHandle;

pub mod average;
pub mod effect;
pub mod pairwise;
pub mod results;
pub mod summary;
pub mod utils;

pub use results::{BlockChoice, ScoreMarkersResults};

use utils::GroupLayout;

/// Statistic used to reduce the pairwise effects of one focal group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SummaryType {
    Min,
    #[default]
    Mean,
    Median,
    Max,
    /// Best rank of the feature across all comparisons involving the focal group
    MinRank,
}

impl SummaryType {
    pub const COUNT: usize = 5;

    pub const ALL: [SummaryType; Self::COUNT] = [
        SummaryType::Min,
        SummaryType::Mean,
        SummaryType::Median,
        SummaryType::Max,
        SummaryType::MinRank,
    ];

    /// Position in [`SummaryType::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SummaryType::Min => "min",
            SummaryType::Mean => "mean",
            SummaryType::Median => "median",
            SummaryType::Max => "max",
            SummaryType::MinRank => "min_rank",
        };
        f.write_str(name)
    }
}

/// The pairwise effect sizes computed for each comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectType {
    Cohen,
    Lfc,
    DeltaDetected,
    Auc,
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectType::Cohen => "Cohen's d",
            EffectType::Lfc => "log-fold changes",
            EffectType::DeltaDetected => "the delta detected",
            EffectType::Auc => "AUC",
        };
        f.write_str(name)
    }
}

/// Which summaries are computed for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeSummaries {
    pub min: bool,
    pub mean: bool,
    pub median: bool,
    pub max: bool,
    pub min_rank: bool,
}

impl ComputeSummaries {
    /// No summaries at all, used for the AUC when it is disabled.
    pub fn none() -> Self {
        ComputeSummaries {
            min: false,
            mean: false,
            median: false,
            max: false,
            min_rank: false,
        }
    }

    /// Min, mean and min-rank, plus the optional median and maximum.
    pub fn with_optional(median: bool, max: bool) -> Self {
        ComputeSummaries {
            min: true,
            mean: true,
            median,
            max,
            min_rank: true,
        }
    }

    pub fn enabled(&self, summary: SummaryType) -> bool {
        match summary {
            SummaryType::Min => self.min,
            SummaryType::Mean => self.mean,
            SummaryType::Median => self.median,
            SummaryType::Max => self.max,
            SummaryType::MinRank => self.min_rank,
        }
    }

    pub fn any(&self) -> bool {
        SummaryType::ALL.iter().any(|&s| self.enabled(s))
    }
}

/// Parameters for [`score_markers`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMarkersConfig {
    /// Non-negative log-fold change threshold applied to Cohen's d and the AUC
    pub lfc_threshold: f64,
    pub compute_auc: bool,
    pub compute_median: bool,
    pub compute_max: bool,
    /// Size of the worker pool; 1 runs everything sequentially
    pub num_threads: usize,
    /// Lower bound on the pooled variance used as the denominator of Cohen's d
    pub variance_floor: f64,
}

impl Default for ScoreMarkersConfig {
    fn default() -> Self {
        ScoreMarkersConfig {
            lfc_threshold: 0.0,
            compute_auc: true,
            compute_median: false,
            compute_max: false,
            num_threads: 1,
            variance_floor: 1e-8,
        }
    }
}

impl ScoreMarkersConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lfc_threshold(mut self, threshold: f64) -> Self {
        self.lfc_threshold = threshold;
        self
    }

    pub fn with_auc(mut self, compute: bool) -> Self {
        self.compute_auc = compute;
        self
    }

    pub fn with_median(mut self, compute: bool) -> Self {
        self.compute_median = compute;
        self
    }

    pub fn with_max(mut self, compute: bool) -> Self {
        self.compute_max = compute;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_variance_floor(mut self, floor: f64) -> Self {
        self.variance_floor = floor;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.lfc_threshold.is_finite() || self.lfc_threshold < 0.0 {
            return Err(MarkerError::invalid_config(format!(
                "lfc_threshold must be a finite non-negative number, got {}",
                self.lfc_threshold
            )));
        }
        if self.num_threads == 0 {
            return Err(MarkerError::invalid_config("num_threads must be at least 1"));
        }
        if !self.variance_floor.is_finite() || self.variance_floor <= 0.0 {
            return Err(MarkerError::invalid_config(format!(
                "variance_floor must be a finite positive number, got {}",
                self.variance_floor
            )));
        }
        Ok(())
    }

    /// Summaries computed for Cohen's d, LFC and delta-detected.
    pub fn summaries(&self) -> ComputeSummaries {
        ComputeSummaries::with_optional(self.compute_median, self.compute_max)
    }

    /// Summaries computed for the AUC.
    pub fn auc_summaries(&self) -> ComputeSummaries {
        if self.compute_auc {
            self.summaries()
        } else {
            ComputeSummaries::none()
        }
    }
}

pub trait ScoreMarkers {
    /// Score every feature as a marker for every group, see [`score_markers`].
    fn score_markers(
        &self,
        groups: &[usize],
        blocks: Option<&[usize]>,
        config: &ScoreMarkersConfig,
    ) -> Result<ScoreMarkersResults>;
}

impl<T> ScoreMarkers for MatrixHandle<T>
where
    T: FloatOpsTS,
{
    fn score_markers(
        &self,
        groups: &[usize],
        blocks: Option<&[usize]>,
        config: &ScoreMarkersConfig,
    ) -> Result<ScoreMarkersResults> {
        score_markers(self, groups, blocks, config)
    }
}

/// Compute marker statistics for each group of observations.
///
/// # Arguments
///
/// * `matrix` - Log-expression matrix (features × observations)
/// * `groups` - Group of each observation, consecutive ids starting at zero
/// * `blocks` - Optional block (e.g. batch) of each observation, same convention
/// * `config` - Threshold, optional statistics and thread count
///
/// # Returns
///
/// A [`ScoreMarkersResults`] holding per-group/per-block means and detected proportions and
/// the summarized effect sizes. Nothing is returned unless every statistic was computed.
pub fn score_markers<T>(
    matrix: &MatrixHandle<T>,
    groups: &[usize],
    blocks: Option<&[usize]>,
    config: &ScoreMarkersConfig,
) -> Result<ScoreMarkersResults>
where
    T: FloatOpsTS,
{
    config.validate()?;

    let ncols = matrix.ncols();
    if groups.len() != ncols {
        return Err(MarkerError::shape_mismatch(
            0,
            Dimension::GroupAssignments,
            ncols,
            groups.len(),
        ));
    }
    if let Some(blocks) = blocks {
        if blocks.len() != ncols {
            return Err(MarkerError::shape_mismatch(
                0,
                Dimension::BlockAssignments,
                ncols,
                blocks.len(),
            ));
        }
    }

    utils::check_assignments(groups, blocks)?;

    let layout = GroupLayout::new(groups, blocks);
    for g in 0..layout.num_groups() {
        if layout.group_size(g) == 0 {
            warn!("group {} has no observations, its statistics will be NaN", g);
        }
    }
    debug!(
        "scoring {} features across {} groups and {} blocks with {} threads",
        matrix.nrows(),
        layout.num_groups(),
        layout.num_blocks(),
        config.num_threads
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build()
        .map_err(|e| MarkerError::invalid_config(format!("failed to build thread pool: {}", e)))?;

    let summaries = config.summaries();
    let auc_summaries = config.auc_summaries();

    let results = pool.install(|| {
        let pairwise = pairwise::compare_groups(matrix, &layout, config);

        let cohen = summary::summarize_effects(&pairwise.cohen, summaries);
        let lfc = summary::summarize_effects(&pairwise.lfc, summaries);
        let delta_detected = summary::summarize_effects(&pairwise.delta_detected, summaries);
        let auc = pairwise
            .auc
            .as_ref()
            .map(|cube| summary::summarize_effects(cube, auc_summaries));

        let averaged = average::average_blocks(&pairwise.means, &pairwise.detected, &layout);

        ScoreMarkersResults::new(
            matrix.nrows(),
            pairwise.means,
            pairwise.detected,
            averaged,
            cohen,
            lfc,
            delta_detected,
            auc,
        )
    });

    Ok(results)
}
