// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Loop range arithmetic. Endpoints never rest on ornamental events and a range always spans
//! at least two indices.

use std::{fmt, ops::RangeInclusive};

/// An inclusive range of event indices with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRange {
    pub start: usize,
    pub end: usize,
}

impl LoopRange {
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for LoopRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn reverse(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// The nearest playable index from `index` walking in one direction, `index` included.
fn nearest(
    index: usize,
    len: usize,
    direction: Direction,
    is_ornamental: &impl Fn(usize) -> bool,
) -> Option<usize> {
    match direction {
        Direction::Forward => (index..len).find(|i| !is_ornamental(*i)),
        Direction::Backward => (0..=index.min(len.checked_sub(1)?))
            .rev()
            .find(|i| !is_ornamental(*i)),
    }
}

/// Moves an endpoint off an ornamental event: first in the preferred direction, then the other
/// way. Returns None only when nothing in the sequence is playable.
pub fn adjust_endpoint(
    index: usize,
    len: usize,
    preferred: Direction,
    is_ornamental: impl Fn(usize) -> bool,
) -> Option<usize> {
    let index = index.min(len.checked_sub(1)?);
    nearest(index, len, preferred, &is_ornamental)
        .or_else(|| nearest(index, len, preferred.reverse(), &is_ornamental))
}

/// Builds a loop range, pulling ornamental endpoints inward first and outward second.
pub fn normalize(
    start: usize,
    end: usize,
    len: usize,
    is_ornamental: impl Fn(usize) -> bool,
) -> Option<LoopRange> {
    if start >= end || end >= len {
        return None;
    }
    let start = adjust_endpoint(start, len, Direction::Forward, &is_ornamental)?;
    let end = adjust_endpoint(end, len, Direction::Backward, &is_ornamental)?;
    (start < end).then_some(LoopRange { start, end })
}

/// Moves the start one playable event earlier.
pub fn decrement_start(
    range: LoopRange,
    is_ornamental: impl Fn(usize) -> bool,
) -> Option<LoopRange> {
    let start = (0..range.start).rev().find(|i| !is_ornamental(*i))?;
    Some(LoopRange { start, ..range })
}

/// Moves the start one playable event later, stopping short of the end.
pub fn increment_start(
    range: LoopRange,
    is_ornamental: impl Fn(usize) -> bool,
) -> Option<LoopRange> {
    let start = (range.start + 1..range.end).find(|i| !is_ornamental(*i))?;
    Some(LoopRange { start, ..range })
}

/// Moves the end one playable event earlier, stopping short of the start.
pub fn decrement_end(
    range: LoopRange,
    is_ornamental: impl Fn(usize) -> bool,
) -> Option<LoopRange> {
    let end = (range.start + 1..range.end)
        .rev()
        .find(|i| !is_ornamental(*i))?;
    Some(LoopRange { end, ..range })
}

/// Moves the end one playable event later.
pub fn increment_end(
    range: LoopRange,
    len: usize,
    is_ornamental: impl Fn(usize) -> bool,
) -> Option<LoopRange> {
    let end = (range.end + 1..len).find(|i| !is_ornamental(*i))?;
    Some(LoopRange { end, ..range })
}
