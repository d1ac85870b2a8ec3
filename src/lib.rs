//! # single-markers
//!
//! Marker scoring for groups of single-cell observations, part of the single-rust ecosystem.
//!
//! This crate compares every pair of groups (e.g. clusters) on every feature of an expression
//! matrix and summarizes the resulting effect sizes per group, so that candidate marker genes
//! can be ranked. It also provides delayed, copy-free binding of matrices from several sources,
//! including binding on the intersection of their feature identifiers.
//!
//! ## Core Features
//!
//! - **Matrix Binding**: `cbind`/`rbind` over shared, immutable matrix handles without copying
//! - **Intersection Binding**: column binding restricted to the features present in every input
//! - **Pairwise Effect Sizes**: Cohen's d, log-fold change, delta-detected and AUC
//! - **Summaries**: minimum, mean, median, maximum and minimum rank across comparisons
//! - **Blocking**: comparisons within batches, averaged into a single estimate
//! - **Sparse Matrix Support**: `CsrMatrix` from nalgebra-sparse alongside dense `ndarray` input
//!
//! ## Quick Start
//!
//! Wrap a matrix in a [`matrix::MatrixHandle`] and call [`markers::score_markers`] (or the
//! [`markers::ScoreMarkers`] trait method) with one group id per observation. Results are
//! read back per group through [`markers::ScoreMarkersResults`].
//!
//! ## Module Organization
//!
//! - **[`matrix`]**: Matrix handles and the binding operations
//! - **[`markers`]**: Pairwise comparisons, summaries, block averaging and the result store
//! - **[`error`]**: The error type shared by both

pub mod error;
pub mod markers;
pub mod matrix;

pub use error::{Dimension, MarkerError, Result};
