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

//! The notation model: a tab is a list of sections, each holding sub-sections that are
//! either fretboard column grids or strummed chord sequences.
//!
//! Only the top level of a document has to be well formed. Everything below it is parsed
//! leniently and a malformed unit is read as an empty one.

use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;

use crate::tuning::{Tuning, STANDARD_TUNING};

mod chords;
mod column;
mod lenient;
mod note_length;

pub use chords::{
    Chord, ChordSequence, PatternRef, Strum, StrumDirection, StrumToken, StrummingPattern,
};
pub use column::{Column, Effect, FretCell, MeasureLine, NoteColumn, PalmMute, TempoMark};
pub use note_length::{Dots, NoteLength, NoteValue};

/// The tempo used when neither the tab nor a sub-section names one.
pub const DEFAULT_BPM: f64 = 75.0;

#[derive(Debug, thiserror::Error)]
pub enum NotationError {
    #[error("unable to read tab: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse JSON tab: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to parse YAML tab: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("unsupported tab file extension: {0}")]
    UnsupportedFormat(String),

    #[error("invalid note length '{0}'")]
    InvalidNoteLength(String),
}

/// The root of a tab document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tab {
    #[serde(deserialize_with = "lenient::value")]
    pub title: String,
    #[serde(deserialize_with = "lenient::bpm")]
    pub bpm: Option<f64>,
    #[serde(deserialize_with = "lenient::value")]
    pub tuning: String,
    #[serde(deserialize_with = "lenient::value")]
    pub capo: u8,
    #[serde(deserialize_with = "lenient::seq")]
    pub chords: Vec<Chord>,
    #[serde(deserialize_with = "lenient::seq")]
    pub strumming_patterns: Vec<StrummingPattern>,
    #[serde(deserialize_with = "lenient::seq")]
    pub sections: Vec<Section>,
}

impl Default for Tab {
    fn default() -> Self {
        Tab {
            title: String::new(),
            bpm: None,
            tuning: STANDARD_TUNING.to_string(),
            capo: 0,
            chords: Vec::new(),
            strumming_patterns: Vec::new(),
            sections: Vec::new(),
        }
    }
}

impl Tab {
    /// Loads a tab from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Tab, NotationError> {
        let contents = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
            .to_lowercase();

        match extension.as_str() {
            "json" => Tab::from_json(&contents),
            "yaml" | "yml" => Tab::from_yaml(&contents),
            _ => Err(NotationError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn from_json(contents: &str) -> Result<Tab, NotationError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_yaml(contents: &str) -> Result<Tab, NotationError> {
        Ok(serde_yml::from_str(contents)?)
    }

    /// The tab tempo, or the default when none is set.
    pub fn bpm(&self) -> f64 {
        self.bpm.unwrap_or(DEFAULT_BPM)
    }

    /// The parsed tuning. An unparseable tuning falls back to standard tuning.
    pub fn tuning(&self) -> Tuning {
        if self.tuning.trim().is_empty() {
            return Tuning::default();
        }
        Tuning::parse(&self.tuning).unwrap_or_else(|e| {
            warn!(tuning = %self.tuning, err = %e, "Invalid tuning, using standard tuning.");
            Tuning::default()
        })
    }

    /// Looks up a chord voicing by name.
    pub fn chord(&self, name: &str) -> Option<&Chord> {
        self.chords.iter().find(|chord| chord.name == name)
    }

    /// Resolves a strumming pattern reference.
    pub fn strumming_pattern(&self, reference: &PatternRef) -> Option<&StrummingPattern> {
        match reference {
            PatternRef::Index(index) => self.strumming_patterns.get(*index),
            PatternRef::Name(name) => self
                .strumming_patterns
                .iter()
                .find(|pattern| &pattern.name == name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "lenient::value")]
    pub id: String,
    #[serde(deserialize_with = "lenient::value")]
    pub title: String,
    #[serde(deserialize_with = "lenient::count")]
    pub repetitions: u32,
    #[serde(deserialize_with = "lenient::seq")]
    pub data: Vec<SubSection>,
}

impl Default for Section {
    fn default() -> Self {
        Section {
            id: String::new(),
            title: String::new(),
            repetitions: 1,
            data: Vec::new(),
        }
    }
}

/// A section's contents: a column grid or a list of chord sequences.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SubSection {
    Tab(TabSubSection),
    Chord(ChordSubSection),
}

impl Default for SubSection {
    fn default() -> Self {
        SubSection::Tab(TabSubSection::default())
    }
}

impl SubSection {
    pub fn id(&self) -> &str {
        match self {
            SubSection::Tab(tab) => &tab.id,
            SubSection::Chord(chord) => &chord.id,
        }
    }

    pub fn bpm(&self) -> Option<f64> {
        match self {
            SubSection::Tab(tab) => tab.bpm,
            SubSection::Chord(chord) => chord.bpm,
        }
    }

    pub fn repetitions(&self) -> u32 {
        match self {
            SubSection::Tab(tab) => tab.repetitions,
            SubSection::Chord(chord) => chord.repetitions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TabSubSection {
    #[serde(deserialize_with = "lenient::value")]
    pub id: String,
    #[serde(deserialize_with = "lenient::bpm")]
    pub bpm: Option<f64>,
    #[serde(deserialize_with = "lenient::count")]
    pub repetitions: u32,
    #[serde(deserialize_with = "lenient::seq")]
    pub data: Vec<Column>,
}

impl Default for TabSubSection {
    fn default() -> Self {
        TabSubSection {
            id: String::new(),
            bpm: None,
            repetitions: 1,
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChordSubSection {
    #[serde(deserialize_with = "lenient::value")]
    pub id: String,
    #[serde(deserialize_with = "lenient::bpm")]
    pub bpm: Option<f64>,
    #[serde(deserialize_with = "lenient::count")]
    pub repetitions: u32,
    #[serde(deserialize_with = "lenient::seq")]
    pub data: Vec<ChordSequence>,
}

impl Default for ChordSubSection {
    fn default() -> Self {
        ChordSubSection {
            id: String::new(),
            bpm: None,
            repetitions: 1,
            data: Vec::new(),
        }
    }
}
