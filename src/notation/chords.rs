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
use serde::Deserialize;

use super::{
    column::{FretCell, PalmMute},
    lenient, NoteLength,
};
use crate::tuning::{Pitch, Tuning, STRING_COUNT};

/// A named chord voicing. Frets are listed highest string first, like tab columns.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Chord {
    #[serde(deserialize_with = "lenient::value")]
    pub name: String,
    #[serde(deserialize_with = "lenient::seq")]
    pub frets: Vec<String>,
}

impl Chord {
    /// Sounding pitches of the voicing, lowest string first. Dead and empty strings are skipped.
    pub fn pitches(&self, tuning: &Tuning, capo: u8) -> Vec<Pitch> {
        (0..STRING_COUNT)
            .rev()
            .filter_map(|row| {
                let cell = FretCell::parse(self.frets.get(row)?);
                tuning.pitch_at(row, cell.fret?, capo)
            })
            .collect()
    }
}

/// A reusable sequence of strums.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrummingPattern {
    #[serde(deserialize_with = "lenient::value")]
    pub name: String,
    #[serde(deserialize_with = "lenient::value")]
    pub note_length: NoteLength,
    #[serde(deserialize_with = "lenient::seq")]
    pub strums: Vec<Strum>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Strum {
    #[serde(deserialize_with = "lenient::value")]
    pub strum: StrumToken,
    #[serde(deserialize_with = "lenient::value")]
    pub palm_mute: PalmMute,
    #[serde(deserialize_with = "lenient::value")]
    pub note_length: Option<NoteLength>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrumDirection {
    Down,
    Up,
}

/// What a strum position does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum StrumToken {
    /// An unset position. Takes no time.
    #[default]
    Empty,
    Strum {
        direction: StrumDirection,
        accented: bool,
    },
    Slap,
    Rest,
}

impl StrumToken {
    pub fn is_empty(&self) -> bool {
        matches!(self, StrumToken::Empty)
    }
}

impl From<String> for StrumToken {
    fn from(token: String) -> Self {
        let strum = |direction, accented| StrumToken::Strum {
            direction,
            accented,
        };
        match token.trim() {
            "v" => strum(StrumDirection::Down, false),
            "^" => strum(StrumDirection::Up, false),
            "v>" => strum(StrumDirection::Down, true),
            "^>" => strum(StrumDirection::Up, true),
            "s" => StrumToken::Slap,
            "r" => StrumToken::Rest,
            _ => StrumToken::Empty,
        }
    }
}

/// Refers to a strumming pattern by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PatternRef {
    Index(usize),
    Name(String),
}

/// A chord progression played with one strumming pattern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChordSequence {
    #[serde(deserialize_with = "lenient::value")]
    pub id: String,
    #[serde(deserialize_with = "lenient::value")]
    pub strumming_pattern: Option<PatternRef>,
    #[serde(deserialize_with = "lenient::bpm")]
    pub bpm: Option<f64>,
    #[serde(deserialize_with = "lenient::count")]
    pub repetitions: u32,
    /// One chord name per strum position.
    #[serde(deserialize_with = "lenient::seq")]
    pub data: Vec<String>,
}

impl Default for ChordSequence {
    fn default() -> Self {
        ChordSequence {
            id: String::new(),
            strumming_pattern: None,
            bpm: None,
            repetitions: 1,
            data: Vec::new(),
        }
    }
}

impl ChordSequence {
    /// The chord name assigned to a strum position, if any.
    pub fn chord_at(&self, position: usize) -> Option<&str> {
        self.data
            .get(position)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
    }
}
