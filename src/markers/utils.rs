use crate::error::{Dimension, MarkerError, Result};

/// Number of levels in a 0-based factor, i.e. the largest id plus one.
pub fn count_levels(ids: &[usize]) -> usize {
    ids.iter().max().map_or(0, |&m| m.saturating_add(1))
}

/// Reject group or block ids that cannot index one of the `ids.len()` observations.
///
/// Every level in `[0, n)` must be used, so no valid id reaches `n`.
pub fn check_levels(ids: &[usize], dimension: Dimension) -> Result<()> {
    let n = ids.len();
    if let Some((obs, &id)) = ids.iter().enumerate().find(|&(_, &id)| id >= n) {
        return Err(MarkerError::invalid_config(format!(
            "{} has id {} at observation {}, expected ids below {}",
            dimension, id, obs, n
        )));
    }
    Ok(())
}

/// Validate group and block ids before a [`GroupLayout`] is built from them.
pub fn check_assignments(groups: &[usize], blocks: Option<&[usize]>) -> Result<()> {
    check_levels(groups, Dimension::GroupAssignments)?;
    if let Some(blocks) = blocks {
        check_levels(blocks, Dimension::BlockAssignments)?;
    }

    let num_groups = count_levels(groups);
    let num_blocks = blocks.map_or(1, count_levels).max(1);
    num_groups.checked_mul(num_blocks).ok_or_else(|| {
        MarkerError::invalid_config(format!(
            "{} groups by {} blocks is too many combinations",
            num_groups, num_blocks
        ))
    })?;
    Ok(())
}

/// Observations of each (group, block) combination.
///
/// Combinations are laid out group-major: `combo = group * num_blocks + block`.
#[derive(Debug, Clone)]
pub struct GroupLayout {
    num_groups: usize,
    num_blocks: usize,
    combo_indices: Vec<Vec<usize>>,
}

impl GroupLayout {
    /// Tally `groups` and `blocks`; without blocks every observation is in block 0.
    pub fn new(groups: &[usize], blocks: Option<&[usize]>) -> Self {
        let num_groups = count_levels(groups);
        let num_blocks = blocks.map_or(1, count_levels).max(1);

        let mut combo_indices = vec![Vec::new(); num_groups * num_blocks];
        for (obs, &g) in groups.iter().enumerate() {
            let b = blocks.map_or(0, |blocks| blocks[obs]);
            combo_indices[g * num_blocks + b].push(obs);
        }

        GroupLayout {
            num_groups,
            num_blocks,
            combo_indices,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn num_combos(&self) -> usize {
        self.combo_indices.len()
    }

    #[inline]
    pub fn combo(&self, group: usize, block: usize) -> usize {
        group * self.num_blocks + block
    }

    /// Observation indices of a combination, in increasing order.
    pub fn indices(&self, combo: usize) -> &[usize] {
        &self.combo_indices[combo]
    }

    pub fn combo_size(&self, group: usize, block: usize) -> usize {
        self.combo_indices[self.combo(group, block)].len()
    }

    pub fn group_size(&self, group: usize) -> usize {
        (0..self.num_blocks).map(|b| self.combo_size(group, b)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_levels() {
        assert_eq!(count_levels(&[]), 0);
        assert_eq!(count_levels(&[0, 2, 1, 2]), 3);
    }

    #[test]
    fn test_check_assignments() {
        assert!(check_assignments(&[0, 1, 1, 0], Some(&[0, 0, 1, 1])).is_ok());
        assert!(check_assignments(&[], None).is_ok());

        let err = check_assignments(&[0, usize::MAX], None).unwrap_err();
        assert!(matches!(err, MarkerError::InvalidConfig { .. }));
        assert!(err.to_string().contains("group assignments"));

        let err = check_assignments(&[0, 1], Some(&[0, 2])).unwrap_err();
        assert!(err.to_string().contains("block assignments"));
        assert_eq!(count_levels(&[usize::MAX]), usize::MAX);
    }

    #[test]
    fn test_layout_without_blocks() {
        let layout = GroupLayout::new(&[1, 0, 1, 1], None);
        assert_eq!(layout.num_groups(), 2);
        assert_eq!(layout.num_blocks(), 1);
        assert_eq!(layout.indices(layout.combo(0, 0)), &[1]);
        assert_eq!(layout.indices(layout.combo(1, 0)), &[0, 2, 3]);
    }

    #[test]
    fn test_layout_with_blocks() {
        let groups = [0, 0, 1, 1, 0, 2];
        let blocks = [0, 1, 0, 1, 1, 1];
        let layout = GroupLayout::new(&groups, Some(&blocks));

        assert_eq!(layout.num_groups(), 3);
        assert_eq!(layout.num_blocks(), 2);
        assert_eq!(layout.num_combos(), 6);
        assert_eq!(layout.indices(layout.combo(0, 1)), &[1, 4]);
        assert_eq!(layout.combo_size(2, 0), 0);
        assert_eq!(layout.group_size(0), 3);
    }
}
