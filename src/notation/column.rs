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

use super::{lenient, NoteLength};
use crate::tuning::STRING_COUNT;

/// A single column of a tab grid.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Column {
    Note(NoteColumn),
    MeasureLine(MeasureLine),
    TuningStart,
    TuningEnd,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Column {
    /// Ornamental columns carry no note length and are never played.
    pub fn is_ornamental(&self) -> bool {
        !matches!(self, Column::Note(_))
    }
}

/// A playable column: one cell per string, highest string first.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteColumn {
    #[serde(deserialize_with = "lenient::seq")]
    pub frets: Vec<String>,
    #[serde(deserialize_with = "lenient::value")]
    pub palm_mute: PalmMute,
    #[serde(deserialize_with = "lenient::value")]
    pub note_length: NoteLength,
    #[serde(deserialize_with = "lenient::value")]
    pub rest: bool,
    #[serde(deserialize_with = "lenient::value")]
    pub id: String,
}

impl NoteColumn {
    /// Parsed fret cells in row order. Missing rows are empty.
    pub fn cells(&self) -> [FretCell; STRING_COUNT] {
        std::array::from_fn(|row| {
            self.frets
                .get(row)
                .map(|cell| FretCell::parse(cell))
                .unwrap_or_default()
        })
    }

    /// True if the column sounds nothing: an explicit rest or no populated cells.
    pub fn is_silent(&self) -> bool {
        self.rest || self.cells().iter().all(FretCell::is_empty)
    }
}

/// A bar line, optionally changing the tempo from this point on.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MeasureLine {
    #[serde(deserialize_with = "lenient::value")]
    pub tempo: Option<TempoMark>,
}

/// A tempo and/or beat unit change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TempoMark {
    #[serde(deserialize_with = "lenient::bpm")]
    pub bpm: Option<f64>,
    #[serde(deserialize_with = "lenient::value")]
    pub beat: Option<NoteLength>,
}

/// Palm mute markers. `start`/`end` bracket a muted run, `-` continues it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum PalmMute {
    #[default]
    None,
    Start,
    Continue,
    End,
}

impl PalmMute {
    pub fn is_muted(&self) -> bool {
        !matches!(self, PalmMute::None)
    }
}

impl From<String> for PalmMute {
    fn from(marker: String) -> Self {
        match marker.trim() {
            "" => PalmMute::None,
            "start" => PalmMute::Start,
            "end" => PalmMute::End,
            _ => PalmMute::Continue,
        }
    }
}

/// Articulations written alongside a fret number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    HammerOn,
    PullOff,
    SlideUp,
    SlideDown,
    Bend,
    Release,
    Vibrato,
    Tap,
    Harmonic,
}

impl Effect {
    fn from_glyph(glyph: char) -> Option<Effect> {
        Some(match glyph {
            'h' => Effect::HammerOn,
            'p' => Effect::PullOff,
            '/' => Effect::SlideUp,
            '\\' => Effect::SlideDown,
            'b' => Effect::Bend,
            'r' => Effect::Release,
            '~' => Effect::Vibrato,
            't' => Effect::Tap,
            '<' | '>' => Effect::Harmonic,
            _ => return None,
        })
    }
}

/// A parsed fret cell such as `"5"`, `"x"`, `"7h9"` or `"<12>"`.
///
/// The first fret number is the one that sounds when the column triggers; later numbers are
/// targets of the effects between them and are kept for display only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FretCell {
    pub fret: Option<u8>,
    pub dead: bool,
    pub effects: Vec<Effect>,
}

impl FretCell {
    pub fn parse(cell: &str) -> FretCell {
        let mut parsed = FretCell::default();
        let mut digits = String::new();

        for c in cell.trim().chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            parsed.take_fret(&mut digits);
            match c {
                'x' | 'X' => parsed.dead = true,
                _ => {
                    if let Some(effect) = Effect::from_glyph(c) {
                        if !parsed.effects.contains(&effect) {
                            parsed.effects.push(effect);
                        }
                    }
                }
            }
        }
        parsed.take_fret(&mut digits);
        parsed
    }

    fn take_fret(&mut self, digits: &mut String) {
        if !digits.is_empty() && self.fret.is_none() {
            self.fret = digits.parse().ok();
        }
        digits.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fret.is_none() && !self.dead
    }

    pub fn has(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fret_cells() {
        assert_eq!(FretCell::parse(""), FretCell::default());
        assert_eq!(FretCell::parse("3").fret, Some(3));
        assert_eq!(FretCell::parse("12").fret, Some(12));

        let dead = FretCell::parse("x");
        assert!(dead.dead);
        assert_eq!(dead.fret, None);
        assert!(!dead.is_empty());

        let hammer = FretCell::parse("7h9");
        assert_eq!(hammer.fret, Some(7));
        assert!(hammer.has(Effect::HammerOn));

        let harmonic = FretCell::parse("<12>");
        assert_eq!(harmonic.fret, Some(12));
        assert_eq!(harmonic.effects, vec![Effect::Harmonic]);

        let slide = FretCell::parse("5\\3~");
        assert_eq!(slide.fret, Some(5));
        assert_eq!(slide.effects, vec![Effect::SlideDown, Effect::Vibrato]);

        assert!(FretCell::parse("?").is_empty());
    }

    #[test]
    fn test_deserialize_columns() {
        let columns: Vec<Column> = serde_json::from_str(
            r#"[
                {"kind": "note", "frets": ["0", "", "", "", "", "3"], "noteLength": "eighth", "palmMute": "start", "id": "a"},
                {"kind": "measureLine"},
                {"kind": "measureLine", "tempo": {"bpm": 90, "beat": "eighth"}},
                {"kind": "tuningStart"},
                {"kind": "tuningEnd"},
                {"kind": "somethingElse", "frets": []}
            ]"#,
        )
        .unwrap();

        let Column::Note(note) = &columns[0] else {
            panic!("expected a note column, got {:?}", columns[0]);
        };
        assert_eq!(note.note_length, "eighth".parse().unwrap());
        assert_eq!(note.palm_mute, PalmMute::Start);
        assert_eq!(note.cells()[5].fret, Some(3));
        assert!(!note.is_silent());

        assert_eq!(columns[1], Column::MeasureLine(MeasureLine::default()));
        let Column::MeasureLine(line) = &columns[2] else {
            panic!("expected a measure line, got {:?}", columns[2]);
        };
        let tempo = line.tempo.unwrap();
        assert_eq!(tempo.bpm, Some(90.0));
        assert_eq!(tempo.beat, Some("eighth".parse().unwrap()));

        assert_eq!(columns[3], Column::TuningStart);
        assert_eq!(columns[4], Column::TuningEnd);
        assert_eq!(columns[5], Column::Unknown);
        assert!(columns[1..].iter().all(Column::is_ornamental));
        assert!(!columns[0].is_ornamental());
    }

    #[test]
    fn test_malformed_note_fields() {
        let column: Column = serde_json::from_str(
            r#"{"kind": "note", "frets": "broken", "noteLength": "forever", "rest": "yes"}"#,
        )
        .unwrap();
        let Column::Note(note) = column else {
            panic!("expected a note column");
        };
        assert!(note.frets.is_empty());
        assert_eq!(note.note_length, NoteLength::QUARTER);
        assert!(!note.rest);
        assert!(note.is_silent());
    }
}
