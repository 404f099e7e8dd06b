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
use std::{fmt, str::FromStr};

use serde::Deserialize;

use super::NotationError;

/// The undotted note values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl NoteValue {
    fn quarter_notes(&self) -> f64 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::Half => 2.0,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::Sixteenth => 0.25,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            NoteValue::Whole => "whole",
            NoteValue::Half => "half",
            NoteValue::Quarter => "quarter",
            NoteValue::Eighth => "eighth",
            NoteValue::Sixteenth => "sixteenth",
        }
    }
}

/// Dot modifiers. A dot adds half the value, a double dot three quarters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dots {
    None,
    Dotted,
    DoubleDotted,
}

impl Dots {
    fn multiplier(&self) -> f64 {
        match self {
            Dots::None => 1.0,
            Dots::Dotted => 1.5,
            Dots::DoubleDotted => 1.75,
        }
    }
}

/// A note length drawn from the fixed enumeration used by columns and strums.
///
/// Written as `"quarter"`, `"eighth dotted"`, `"halfDoubleDotted"` and so on; case, spaces,
/// dashes and underscores are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct NoteLength {
    value: NoteValue,
    dots: Dots,
}

impl NoteLength {
    pub const QUARTER: NoteLength = NoteLength::new(NoteValue::Quarter, Dots::None);

    pub const fn new(value: NoteValue, dots: Dots) -> NoteLength {
        NoteLength { value, dots }
    }

    pub fn value(&self) -> NoteValue {
        self.value
    }

    pub fn dots(&self) -> Dots {
        self.dots
    }

    /// The length expressed as a number of quarter notes.
    pub fn quarter_notes(&self) -> f64 {
        self.value.quarter_notes() * self.dots.multiplier()
    }

    /// The length relative to a beat unit. With a quarter note beat this is the same as
    /// [`NoteLength::quarter_notes`].
    pub fn beats(&self, beat: NoteLength) -> f64 {
        self.quarter_notes() / beat.quarter_notes()
    }
}

impl Default for NoteLength {
    fn default() -> Self {
        NoteLength::QUARTER
    }
}

impl fmt::Display for NoteLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dots {
            Dots::None => write!(f, "{}", self.value.name()),
            Dots::Dotted => write!(f, "{} dotted", self.value.name()),
            Dots::DoubleDotted => write!(f, "{} double dotted", self.value.name()),
        }
    }
}

impl FromStr for NoteLength {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        let (value, dots) = if let Some(value) = normalized.strip_suffix("doubledotted") {
            (value, Dots::DoubleDotted)
        } else if let Some(value) = normalized.strip_suffix("dotted") {
            (value, Dots::Dotted)
        } else {
            (normalized.as_str(), Dots::None)
        };

        let value = match value {
            "whole" => NoteValue::Whole,
            "half" => NoteValue::Half,
            "quarter" => NoteValue::Quarter,
            "eighth" => NoteValue::Eighth,
            "sixteenth" => NoteValue::Sixteenth,
            _ => return Err(NotationError::InvalidNoteLength(s.to_string())),
        };

        Ok(NoteLength::new(value, dots))
    }
}

impl TryFrom<String> for NoteLength {
    type Error = NotationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
