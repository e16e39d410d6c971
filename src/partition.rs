// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Who renders what.  Rows are dealt out to ranks like cards: row `y`
//! belongs to rank `y mod ranks`.  Interleaving rather than cutting
//! the image into bands keeps the expensive rows near the set's
//! boundary spread over every rank.  Inside a rank, the owned rows are
//! cut into row segments and handed to threads under a `Schedule`.

use std::fmt;
use std::str::FromStr;

/// Rank-level ownership of rows.  A pure function of the row, the
/// rank and the group size; ranks never need to talk to agree on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RowOwnership {
    rank: usize,
    ranks: usize,
}

impl RowOwnership {
    /// Ownership for `rank` out of `ranks`.  Panics if the rank is not
    /// a member of the group.
    pub fn new(rank: usize, ranks: usize) -> RowOwnership {
        assert!(ranks >= 1, "a group needs at least one rank");
        assert!(rank < ranks, "rank {} is not in a group of {}", rank, ranks);
        RowOwnership { rank, ranks }
    }

    /// The single-rank case: every row.
    pub fn everything() -> RowOwnership {
        RowOwnership::new(0, 1)
    }

    /// This rank's index.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The size of the group.
    pub fn ranks(&self) -> usize {
        self.ranks
    }

    /// Does this rank render row `y`?
    #[inline]
    pub fn owns(&self, y: usize) -> bool {
        y % self.ranks == self.rank
    }

    /// The rows this rank renders, in increasing order.
    pub fn rows(&self, height: usize) -> impl Iterator<Item = usize> {
        (self.rank..height).step_by(self.ranks)
    }

    /// How many of `height` rows this rank renders.
    pub fn row_count(&self, height: usize) -> usize {
        if height <= self.rank {
            0
        } else {
            (height - self.rank + self.ranks - 1) / self.ranks
        }
    }
}

/// How a rank's work items are spread over its threads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// `Static` for a lone rank, `Dynamic` otherwise.
    Auto,
    /// One contiguous block of work items per thread, fixed up front.
    /// Fine when the rank renders the whole image, since neighbouring
    /// rows cost about the same.
    Static,
    /// Threads take work items one at a time from a shared queue.
    Dynamic,
}

impl Schedule {
    /// Settle `Auto` for a group of the given size.
    pub fn resolve(self, ranks: usize) -> Schedule {
        match self {
            Schedule::Auto if ranks <= 1 => Schedule::Static,
            Schedule::Auto => Schedule::Dynamic,
            other => other,
        }
    }
}

impl Default for Schedule {
    fn default() -> Schedule {
        Schedule::Auto
    }
}

impl FromStr for Schedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Schedule, String> {
        match s {
            "auto" => Ok(Schedule::Auto),
            "static" => Ok(Schedule::Static),
            "dynamic" => Ok(Schedule::Dynamic),
            _ => Err(format!("Unknown schedule '{}'", s)),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Schedule::Auto => "auto",
            Schedule::Static => "static",
            Schedule::Dynamic => "dynamic",
        };
        write!(f, "{}", name)
    }
}

/// Split `items` work items into `threads` contiguous blocks, as
/// evenly as possible, the first blocks taking the remainder.
/// Returns the block lengths; empty blocks are omitted.
pub fn static_blocks(items: usize, threads: usize) -> Vec<usize> {
    let threads = threads.max(1);
    let base = items / threads;
    let extra = items % threads;
    (0..threads)
        .map(|t| base + if t < extra { 1 } else { 0 })
        .filter(|&len| len > 0)
        .collect()
}
