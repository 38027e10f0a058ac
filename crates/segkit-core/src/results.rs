// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::Segment;

/// A non-empty group of borrowed segments produced by partitioning.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster<'a> {
    members: Vec<&'a Segment>,
}

impl<'a> Cluster<'a> {
    /// Wraps `members`; returns `None` for an empty group.
    pub fn new(members: Vec<&'a Segment>) -> Option<Self> {
        if members.is_empty() {
            None
        } else {
            Some(Self { members })
        }
    }

    pub fn members(&self) -> &[&'a Segment] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.members.iter().map(|segment| segment.id()).collect()
    }
}

/// Closest member pair found inside one cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPair<'a> {
    pub cluster_index: usize,
    pub first: &'a Segment,
    pub second: &'a Segment,
    pub distance: f64,
}

impl ClosestPair<'_> {
    pub fn ids(&self) -> (u64, u64) {
        (self.first.id(), self.second.id())
    }
}

/// Maximum-sum contiguous run within one segment; `start..=end` is inclusive.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubarrayResult {
    pub segment_id: u64,
    pub max_sum: f64,
    pub start: usize,
    pub end: usize,
}

impl SubarrayResult {
    /// Number of samples in the winning run.
    pub fn run_len(&self) -> usize {
        self.end - self.start + 1
    }
}

#[cfg(test)]
mod tests {
    use super::{ClosestPair, Cluster, SubarrayResult};
    use crate::Segment;

    #[test]
    fn cluster_rejects_empty_membership() {
        assert!(Cluster::new(vec![]).is_none());
    }

    #[test]
    fn cluster_reports_member_ids_in_order() {
        let a = Segment::new(3, vec![1.0]);
        let b = Segment::new(1, vec![2.0]);
        let cluster = Cluster::new(vec![&a, &b]).expect("non-empty cluster");
        assert_eq!(cluster.len(), 2);
        assert_eq!(cluster.ids(), vec![3, 1]);
    }

    #[test]
    fn closest_pair_ids_follow_enumeration_order() {
        let a = Segment::new(10, vec![0.0]);
        let b = Segment::new(4, vec![1.0]);
        let pair = ClosestPair {
            cluster_index: 0,
            first: &a,
            second: &b,
            distance: 1.0,
        };
        assert_eq!(pair.ids(), (10, 4));
    }

    #[test]
    fn subarray_run_len_is_inclusive() {
        let result = SubarrayResult {
            segment_id: 0,
            max_sum: 6.0,
            start: 3,
            end: 6,
        };
        assert_eq!(result.run_len(), 4);
    }
}
