//! Chain grouping of near-duplicate dataset entries.
//!
//! Entries are visited once, left to right, in file-name order. Each
//! unvisited entry with labels seeds a group, and the following unvisited
//! entries join it while they stay similar to the seed. The first
//! dissimilar entry closes the group. This targets burst captures, where
//! duplicates form contiguous runs: an entry that matches the seed but sits
//! after a non-matching one is not grouped with it, and the result depends
//! on order (it is not a transitive closure).

mod log;

pub use log::{match_log_file_name, MatchLog};

use serde::Serialize;

use crate::label::LabelSet;
use crate::matcher::labels_similar;

/// Options for grouping.
#[derive(Clone, Copy, Debug)]
pub struct GroupingOptions {
    pub iou_threshold: f64,
    /// Compare only the first N labels of each set (0 = all).
    pub labels_limit: usize,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            iou_threshold: 0.8,
            labels_limit: 0,
        }
    }
}

/// A set of entry indices judged to be duplicates of one another.
///
/// The first member is the keeper (the seed); the rest are its duplicates.
/// Groups always have at least two members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    members: Vec<usize>,
}

impl DuplicateGroup {
    /// The seed entry, kept in place by a normal-mode reorganization.
    pub fn keeper(&self) -> usize {
        self.members[0]
    }

    /// The entries matched against the keeper.
    pub fn duplicates(&self) -> &[usize] {
        &self.members[1..]
    }

    /// All members, keeper first.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// State of the sweep.
enum Sweep {
    /// Looking for the next unvisited entry at or after `next`.
    Seed { next: usize },
    /// Comparing candidates from `candidate` onwards against `members[0]`.
    Scanning {
        members: Vec<usize>,
        candidate: usize,
    },
    /// The group seeded by `members[0]` takes no more entries.
    Closed { members: Vec<usize> },
    Done,
}

/// Group entries by their label sets, in the order given.
pub fn find_duplicate_groups(labels: &[LabelSet], opts: &GroupingOptions) -> Vec<DuplicateGroup> {
    find_duplicate_groups_with(labels, opts, |_, _| {})
}

/// Like [`find_duplicate_groups`], calling `on_match(seed, candidate)` for
/// every confirmed pairwise match, in sweep order.
pub fn find_duplicate_groups_with<F>(
    labels: &[LabelSet],
    opts: &GroupingOptions,
    mut on_match: F,
) -> Vec<DuplicateGroup>
where
    F: FnMut(usize, usize),
{
    let n = labels.len();
    let mut visited = vec![false; n];
    let mut groups = Vec::new();
    let mut state = Sweep::Seed { next: 0 };

    loop {
        state = match state {
            Sweep::Seed { next } => match (next..n).find(|&i| !visited[i]) {
                None => Sweep::Done,
                Some(seed) => {
                    visited[seed] = true;
                    if labels[seed].is_empty() {
                        Sweep::Seed { next: seed + 1 }
                    } else {
                        Sweep::Scanning {
                            members: vec![seed],
                            candidate: seed + 1,
                        }
                    }
                }
            },
            Sweep::Scanning {
                mut members,
                candidate,
            } => match (candidate..n).find(|&j| !visited[j]) {
                None => Sweep::Closed { members },
                Some(j) => {
                    let seed = members[0];
                    if labels_similar(
                        &labels[seed],
                        &labels[j],
                        opts.iou_threshold,
                        opts.labels_limit,
                    ) {
                        visited[j] = true;
                        members.push(j);
                        on_match(seed, j);
                        Sweep::Scanning {
                            members,
                            candidate: j + 1,
                        }
                    } else {
                        Sweep::Closed { members }
                    }
                }
            },
            Sweep::Closed { members } => {
                let next = members[0] + 1;
                if members.len() > 1 {
                    groups.push(DuplicateGroup { members });
                }
                Sweep::Seed { next }
            }
            Sweep::Done => break,
        };
    }

    groups
}
