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
use std::{fmt, ops::RangeInclusive};

/// Where an event comes from in the notation.
///
/// Repetitions are not part of a location, so one location maps to as many event indices as
/// the times its unit is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub section: usize,
    pub sub_section: usize,
    /// Set for strums, which live inside a chord sequence.
    pub chord_sequence: Option<usize>,
    /// Column or strum position.
    pub index: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chord_sequence {
            Some(chord_sequence) => write!(
                f,
                "{}.{}.{}:{}",
                self.section, self.sub_section, chord_sequence, self.index
            ),
            None => write!(f, "{}.{}:{}", self.section, self.sub_section, self.index),
        }
    }
}

/// A unit of notation that playback can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Section(usize),
    SubSection {
        section: usize,
        sub_section: usize,
    },
    ChordSequence {
        section: usize,
        sub_section: usize,
        chord_sequence: usize,
    },
}

impl Scope {
    pub fn contains(&self, location: &Location) -> bool {
        match *self {
            Scope::Section(section) => location.section == section,
            Scope::SubSection {
                section,
                sub_section,
            } => location.section == section && location.sub_section == sub_section,
            Scope::ChordSequence {
                section,
                sub_section,
                chord_sequence,
            } => {
                location.section == section
                    && location.sub_section == sub_section
                    && location.chord_sequence == Some(chord_sequence)
            }
        }
    }
}

/// A unit that produced no events, recorded at the event index where its events would sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub scope: Scope,
    pub index: usize,
}

/// Maps event indices to notation locations and back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationLookup {
    locations: Vec<Location>,
    placeholders: Vec<Placeholder>,
}

impl LocationLookup {
    pub(crate) fn push(&mut self, location: Location) {
        self.locations.push(location);
    }

    /// Records a placeholder at the current end of the event list. A unit is only recorded
    /// once even when it is walked on several passes.
    pub(crate) fn push_placeholder(&mut self, scope: Scope) {
        if self.placeholders.iter().any(|p| p.scope == scope) {
            return;
        }
        self.placeholders.push(Placeholder {
            scope,
            index: self.locations.len(),
        });
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// The location of an event.
    pub fn location(&self, index: usize) -> Option<&Location> {
        self.locations.get(index)
    }

    /// The event index of a location: the first occurrence at or after `current`, otherwise
    /// the first occurrence overall.
    pub fn index_of(&self, location: &Location, current: usize) -> Option<usize> {
        self.locations
            .iter()
            .skip(current)
            .position(|l| l == location)
            .map(|offset| current + offset)
            .or_else(|| self.locations.iter().position(|l| l == location))
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// The first contiguous run of events inside a scope.
    pub fn scope_range(&self, scope: &Scope) -> Option<RangeInclusive<usize>> {
        let start = self.locations.iter().position(|l| scope.contains(l))?;
        let run = self.locations[start..]
            .iter()
            .take_while(|l| scope.contains(l))
            .count();
        Some(start..=start + run - 1)
    }
}
