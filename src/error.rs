//! Error types shared by the binding and marker-scoring layers.

use std::fmt;
use thiserror::Error;

use crate::markers::{EffectType, SummaryType};

/// Axis or assignment array whose extent disagreed with what an operation expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Rows,
    Columns,
    RowIdentifiers,
    GroupAssignments,
    BlockAssignments,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Rows => "rows",
            Dimension::Columns => "columns",
            Dimension::RowIdentifiers => "row identifiers",
            Dimension::GroupAssignments => "group assignments",
            Dimension::BlockAssignments => "block assignments",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkerError {
    /// Zero matrices were supplied where at least one is required
    #[error("need at least one matrix to {operation}")]
    EmptyInput { operation: &'static str },

    /// Row/column counts or assignment lengths disagree
    #[error("input {input} has {found} {dimension}, expected {expected}")]
    ShapeMismatch {
        input: usize,
        dimension: Dimension,
        expected: usize,
        found: usize,
    },

    /// The name-based intersection contains no rows
    #[error("no row identifiers are shared by all {inputs} inputs")]
    EmptyIntersection { inputs: usize },

    /// A summary (or the AUC as a whole) was not computed for this result
    #[error("summary type '{summary}' not available for {effect}")]
    UnavailableStatistic {
        effect: EffectType,
        summary: SummaryType,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

pub type Result<T> = std::result::Result<T, MarkerError>;

impl MarkerError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn shape_mismatch(
        input: usize,
        dimension: Dimension,
        expected: usize,
        found: usize,
    ) -> Self {
        Self::ShapeMismatch {
            input,
            dimension,
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_input_and_dimension() {
        let err = MarkerError::shape_mismatch(2, Dimension::Rows, 10, 7);
        assert_eq!(err.to_string(), "input 2 has 7 rows, expected 10");

        let err = MarkerError::UnavailableStatistic {
            effect: EffectType::Auc,
            summary: SummaryType::Median,
        };
        assert_eq!(err.to_string(), "summary type 'median' not available for AUC");

        let err = MarkerError::EmptyInput { operation: "cbind" };
        assert_eq!(err.to_string(), "need at least one matrix to cbind");
    }
}
