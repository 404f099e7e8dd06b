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

//! Tuning and pitch utilities.
//!
//! Tunings are written as six whitespace separated pitches, lowest string first, e.g.
//! `"e2 a2 d3 g3 b3 e4"`. Tab rows are the other way around: row 0 is the top line of a tab,
//! which is the highest string.

use std::{fmt, str::FromStr};

/// The number of strings every tuning describes.
pub const STRING_COUNT: usize = 6;

/// Standard guitar tuning.
pub const STANDARD_TUNING: &str = "e2 a2 d3 g3 b3 e4";

/// Pitch class names, flats preferred. These match instrument sample file names.
const PITCH_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Errors produced while parsing pitches and tunings.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TuningError {
    #[error("invalid pitch '{0}'")]
    InvalidPitch(String),

    #[error("pitch '{0}' is outside the MIDI range")]
    OutOfRange(String),

    #[error("a tuning needs {STRING_COUNT} pitches, found {0}")]
    WrongStringCount(usize),
}

/// A single pitch, stored as a MIDI note number (C4 = 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pitch(u8);

impl Pitch {
    /// E2, the open low string in standard tuning.
    pub const LOW_E: Pitch = Pitch(40);

    /// E6, the 24th fret of the high string in standard tuning.
    pub const HIGH_E_24: Pitch = Pitch(88);

    /// Creates a pitch from a MIDI note number.
    pub fn from_midi(midi: u8) -> Option<Pitch> {
        (midi <= 127).then_some(Pitch(midi))
    }

    /// The MIDI note number.
    pub fn midi(&self) -> u8 {
        self.0
    }

    /// Octave number in scientific pitch notation.
    pub fn octave(&self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    /// Pitch class name (flats preferred).
    pub fn name(&self) -> &'static str {
        PITCH_NAMES[(self.0 % 12) as usize]
    }

    /// Transposes the pitch by a number of semitones, returning None when the result falls
    /// outside the MIDI range.
    pub fn transpose(&self, semitones: i16) -> Option<Pitch> {
        let midi = self.0 as i16 + semitones;
        u8::try_from(midi).ok().and_then(Pitch::from_midi)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave())
    }
}

impl FromStr for Pitch {
    type Err = TuningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars
            .next()
            .ok_or_else(|| TuningError::InvalidPitch(s.to_string()))?;

        let base: i16 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(TuningError::InvalidPitch(s.to_string())),
        };

        let rest = chars.as_str();
        let (accidental, octave) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') if rest.len() > 1 => (-1, &rest[1..]),
            _ => (0, rest),
        };

        let octave: i16 = octave
            .parse()
            .map_err(|_| TuningError::InvalidPitch(s.to_string()))?;

        let midi = (octave + 1) * 12 + base + accidental;
        u8::try_from(midi)
            .ok()
            .and_then(Pitch::from_midi)
            .ok_or_else(|| TuningError::OutOfRange(s.to_string()))
    }
}

/// Six string pitches, lowest string first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    strings: [Pitch; STRING_COUNT],
}

impl Tuning {
    /// Parses a tuning string such as `"e2 a2 d3 g3 b3 e4"`.
    pub fn parse(tuning: &str) -> Result<Tuning, TuningError> {
        let pitches = tuning
            .split_whitespace()
            .map(Pitch::from_str)
            .collect::<Result<Vec<Pitch>, TuningError>>()?;

        let strings: [Pitch; STRING_COUNT] = pitches
            .as_slice()
            .try_into()
            .map_err(|_| TuningError::WrongStringCount(pitches.len()))?;

        Ok(Tuning { strings })
    }

    /// Pitches from the lowest string to the highest.
    pub fn pitches(&self) -> &[Pitch; STRING_COUNT] {
        &self.strings
    }

    /// Pitches in tab row order: highest string first.
    pub fn rows(&self) -> impl Iterator<Item = Pitch> + '_ {
        self.strings.iter().rev().copied()
    }

    /// Labels for the left edge of a rendered tab, highest string first.
    pub fn row_labels(&self) -> Vec<&'static str> {
        self.rows().map(|pitch| pitch.name()).collect()
    }

    /// Resolves the pitch of a fret on a tab row (row 0 is the highest string).
    pub fn pitch_at(&self, row: usize, fret: u8, capo: u8) -> Option<Pitch> {
        let string = STRING_COUNT.checked_sub(row + 1)?;
        self.strings[string].transpose(fret as i16 + capo as i16)
    }
}

impl Default for Tuning {
    fn default() -> Self {
        // e2 a2 d3 g3 b3 e4
        Tuning {
            strings: [40, 45, 50, 55, 59, 64].map(Pitch),
        }
    }
}

impl fmt::Display for Tuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .strings
            .iter()
            .map(|pitch| pitch.to_string().to_lowercase())
            .collect();
        write!(f, "{}", names.join(" "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_pitch() {
        assert_eq!(Pitch::from_str("C4").unwrap().midi(), 60);
        assert_eq!(Pitch::from_str("e2").unwrap().midi(), 40);
        assert_eq!(Pitch::from_str("Bb3").unwrap().midi(), 58);
        assert_eq!(Pitch::from_str("bb3").unwrap().midi(), 58);
        assert_eq!(Pitch::from_str("F#2").unwrap().midi(), 42);
        assert_eq!(Pitch::from_str("b3").unwrap().midi(), 59);
        assert!(Pitch::from_str("H2").is_err());
        assert!(Pitch::from_str("").is_err());
        assert!(Pitch::from_str("C").is_err());
        assert_eq!(
            Pitch::from_str("C12"),
            Err(TuningError::OutOfRange("C12".to_string()))
        );
    }

    #[test]
    fn test_pitch_display() {
        assert_eq!(Pitch::from_midi(60).unwrap().to_string(), "C4");
        assert_eq!(Pitch::from_midi(56).unwrap().to_string(), "Ab3");
        assert_eq!(Pitch::from_midi(40).unwrap().to_string(), "E2");
        assert!(Pitch::from_midi(128).is_none());
    }

    #[test]
    fn test_parse_tuning() {
        let tuning = Tuning::parse(STANDARD_TUNING).unwrap();
        assert_eq!(tuning, Tuning::default());
        assert_eq!(tuning.to_string(), STANDARD_TUNING);
        assert_eq!(tuning.row_labels(), vec!["E", "B", "G", "D", "A", "E"]);

        let drop_d = Tuning::parse("d2 a2 d3 g3 b3 e4").unwrap();
        assert_eq!(drop_d.pitches()[0].midi(), 38);

        assert_eq!(
            Tuning::parse("e2 a2 d3"),
            Err(TuningError::WrongStringCount(3))
        );
        assert!(Tuning::parse("e2 a2 d3 g3 b3 q4").is_err());
    }

    #[test]
    fn test_pitch_at() {
        let tuning = Tuning::default();
        // Row 0 is the high e string.
        assert_eq!(tuning.pitch_at(0, 0, 0).unwrap().midi(), 64);
        assert_eq!(tuning.pitch_at(5, 3, 0).unwrap().midi(), 43);
        assert_eq!(tuning.pitch_at(5, 3, 2).unwrap().midi(), 45);
        assert!(tuning.pitch_at(6, 0, 0).is_none());
    }
}
