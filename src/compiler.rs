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

//! Flattens a tab into a linear sequence of timed playback events.

use std::{ops::RangeInclusive, sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    location::{Location, LocationLookup, Scope},
    notation::{
        ChordSubSection, Column, Effect, NoteLength, StrumDirection, StrumToken, SubSection, Tab,
        TabSubSection,
    },
    tuning::{Pitch, Tuning},
};

#[cfg(test)]
mod tests;

/// Which sub-sections produce events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Full,
    /// Only chord sub-sections are compiled; tab sub-sections become placeholders.
    ChordsOnly,
}

/// Playback speed multipliers accepted by the compiler and the transport.
pub const PLAYBACK_SPEEDS: RangeInclusive<f64> = 0.25..=2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileOptions {
    pub playback_speed: f64,
    pub view_mode: ViewMode,
    /// Emit zero length events for bar lines and other ornamental columns.
    pub include_measure_lines: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            playback_speed: 1.0,
            view_mode: ViewMode::Full,
            include_measure_lines: false,
        }
    }
}

/// A single fretted (or dead) string in a tab column.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Tab row, 0 being the highest string.
    pub row: usize,
    pub pitch: Pitch,
    pub dead: bool,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    Down,
    Up,
    Slap,
}

/// What an event sounds like.
#[derive(Debug, Clone, PartialEq)]
pub enum Sound {
    Notes {
        notes: Vec<Note>,
        palm_mute: bool,
    },
    Strum {
        /// The chord name, if one is assigned to this strum position.
        chord: Option<String>,
        /// Voicing pitches, lowest string first. Empty when the chord is unset or unknown.
        pitches: Vec<Pitch>,
        stroke: Stroke,
        accented: bool,
        palm_mute: bool,
    },
    Rest,
    /// A bar line or other non playable column.
    Ornament,
}

/// One scheduled unit of playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEvent {
    pub bpm: f64,
    /// Length of the event as a fraction of the current beat unit.
    pub note_length_multiplier: f64,
    pub playback_speed: f64,
    pub location: Location,
    pub sound: Sound,
}

impl PlaybackEvent {
    pub fn is_ornamental(&self) -> bool {
        matches!(self.sound, Sound::Ornament)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.is_ornamental() || self.note_length_multiplier <= 0.0 {
            return 0.0;
        }
        60.0 / (self.bpm / self.note_length_multiplier * self.playback_speed)
    }

    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration_seconds()).unwrap_or(Duration::ZERO)
    }
}

/// The compiled form of a tab.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTab {
    tab: Arc<Tab>,
    options: CompileOptions,
    events: Vec<PlaybackEvent>,
    lookup: LocationLookup,
}

impl CompiledTab {
    pub fn tab(&self) -> &Tab {
        &self.tab
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn events(&self) -> &[PlaybackEvent] {
        &self.events
    }

    pub fn event(&self, index: usize) -> Option<&PlaybackEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn lookup(&self) -> &LocationLookup {
        &self.lookup
    }

    /// True if the event at the index is ornamental. Out of range counts as ornamental.
    pub fn is_ornamental(&self, index: usize) -> bool {
        self.events
            .get(index)
            .map_or(true, PlaybackEvent::is_ornamental)
    }

    pub fn total_duration(&self) -> Duration {
        self.events.iter().map(PlaybackEvent::duration).sum()
    }

    /// Rebuilds the event list for a new playback speed.
    pub fn with_playback_speed(&self, playback_speed: f64) -> CompiledTab {
        let options = CompileOptions {
            playback_speed,
            ..self.options
        };
        compile_shared(self.tab.clone(), options)
    }

    /// Rebuilds the event list with different options.
    pub fn with_options(&self, options: CompileOptions) -> CompiledTab {
        compile_shared(self.tab.clone(), options)
    }
}

/// Compiles a tab into playback events.
pub fn compile(tab: &Tab, options: CompileOptions) -> CompiledTab {
    compile_shared(Arc::new(tab.clone()), options)
}

/// Compiles a shared tab without copying it.
pub fn compile_shared(tab: Arc<Tab>, options: CompileOptions) -> CompiledTab {
    let playback_speed = if PLAYBACK_SPEEDS.contains(&options.playback_speed) {
        options.playback_speed
    } else {
        debug!(
            playback_speed = options.playback_speed,
            "Invalid playback speed, using 1.0."
        );
        1.0
    };
    let options = CompileOptions {
        playback_speed,
        ..options
    };

    let mut compiler = Compiler {
        tab: &tab,
        tuning: tab.tuning(),
        options,
        events: Vec::new(),
        lookup: LocationLookup::default(),
    };
    compiler.compile();

    let Compiler { events, lookup, .. } = compiler;
    debug!(events = events.len(), title = %tab.title, "Compiled tab.");
    CompiledTab {
        tab,
        options,
        events,
        lookup,
    }
}

/// A point in a sub-section where the tempo or the beat unit changes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TempoChange {
    column: usize,
    bpm: Option<f64>,
    beat: Option<NoteLength>,
}

/// Collects the tempo marks carried by a sub-section's bar lines.
fn tempo_changes(columns: &[Column]) -> Vec<TempoChange> {
    columns
        .iter()
        .enumerate()
        .filter_map(|(column, c)| match c {
            Column::MeasureLine(line) => line.tempo.map(|tempo| TempoChange {
                column,
                bpm: tempo.bpm,
                beat: tempo.beat,
            }),
            _ => None,
        })
        .collect()
}

/// Walks tempo changes forward as columns are visited. The last change at or before a
/// column wins.
struct TempoScan<'a> {
    changes: &'a [TempoChange],
    next: usize,
    bpm: f64,
    beat: NoteLength,
}

impl<'a> TempoScan<'a> {
    fn new(changes: &'a [TempoChange], bpm: f64) -> TempoScan<'a> {
        TempoScan {
            changes,
            next: 0,
            bpm,
            beat: NoteLength::QUARTER,
        }
    }

    fn advance_to(&mut self, column: usize) {
        while let Some(change) = self.changes.get(self.next) {
            if change.column > column {
                break;
            }
            if let Some(bpm) = change.bpm {
                self.bpm = bpm;
            }
            if let Some(beat) = change.beat {
                self.beat = beat;
            }
            self.next += 1;
        }
    }
}

struct Compiler<'a> {
    tab: &'a Tab,
    tuning: Tuning,
    options: CompileOptions,
    events: Vec<PlaybackEvent>,
    lookup: LocationLookup,
}

impl Compiler<'_> {
    fn compile(&mut self) {
        let tab = self.tab;
        for (section_index, section) in tab.sections.iter().enumerate() {
            if section.data.is_empty() {
                self.lookup.push_placeholder(Scope::Section(section_index));
                continue;
            }
            for _ in 0..section.repetitions {
                for (sub_index, sub_section) in section.data.iter().enumerate() {
                    for _ in 0..sub_section.repetitions() {
                        match sub_section {
                            SubSection::Tab(sub) => {
                                self.tab_sub_section(section_index, sub_index, sub)
                            }
                            SubSection::Chord(sub) => {
                                self.chord_sub_section(section_index, sub_index, sub)
                            }
                        }
                    }
                }
            }
        }
    }

    fn push(&mut self, event: PlaybackEvent) {
        self.lookup.push(event.location);
        self.events.push(event);
    }

    fn tab_sub_section(&mut self, section: usize, sub_section: usize, sub: &TabSubSection) {
        let scope = Scope::SubSection {
            section,
            sub_section,
        };
        if self.options.view_mode == ViewMode::ChordsOnly
            || sub.data.iter().all(Column::is_ornamental)
        {
            self.lookup.push_placeholder(scope);
            return;
        }

        let changes = tempo_changes(&sub.data);
        let mut tempo = TempoScan::new(&changes, sub.bpm.unwrap_or(self.tab.bpm()));

        for (index, column) in sub.data.iter().enumerate() {
            tempo.advance_to(index);
            let location = Location {
                section,
                sub_section,
                chord_sequence: None,
                index,
            };

            let Column::Note(note) = column else {
                if self.options.include_measure_lines {
                    self.push(PlaybackEvent {
                        bpm: tempo.bpm,
                        note_length_multiplier: 0.0,
                        playback_speed: self.options.playback_speed,
                        location,
                        sound: Sound::Ornament,
                    });
                }
                continue;
            };

            let sound = if note.is_silent() {
                Sound::Rest
            } else {
                let notes = note
                    .cells()
                    .into_iter()
                    .enumerate()
                    .filter(|(_, cell)| !cell.is_empty())
                    .filter_map(|(row, cell)| {
                        let pitch = self
                            .tuning
                            .pitch_at(row, cell.fret.unwrap_or(0), self.tab.capo)?;
                        Some(Note {
                            row,
                            pitch,
                            dead: cell.dead,
                            effects: cell.effects,
                        })
                    })
                    .collect();
                Sound::Notes {
                    notes,
                    palm_mute: note.palm_mute.is_muted(),
                }
            };

            self.push(PlaybackEvent {
                bpm: tempo.bpm,
                note_length_multiplier: note.note_length.beats(tempo.beat),
                playback_speed: self.options.playback_speed,
                location,
                sound,
            });
        }
    }

    fn chord_sub_section(&mut self, section: usize, sub_section: usize, sub: &ChordSubSection) {
        if sub.data.is_empty() {
            self.lookup.push_placeholder(Scope::SubSection {
                section,
                sub_section,
            });
            return;
        }

        let tab = self.tab;
        for (sequence_index, sequence) in sub.data.iter().enumerate() {
            let pattern = sequence
                .strumming_pattern
                .as_ref()
                .and_then(|reference| tab.strumming_pattern(reference))
                .filter(|pattern| pattern.strums.iter().any(|s| !s.strum.is_empty()));

            let Some(pattern) = pattern else {
                debug!(
                    section,
                    sub_section,
                    sequence = sequence_index,
                    "Chord sequence has no usable strumming pattern."
                );
                self.lookup.push_placeholder(Scope::ChordSequence {
                    section,
                    sub_section,
                    chord_sequence: sequence_index,
                });
                continue;
            };

            let bpm = sequence.bpm.or(sub.bpm).unwrap_or(tab.bpm());

            for _ in 0..sequence.repetitions {
                for (index, strum) in pattern.strums.iter().enumerate() {
                    let location = Location {
                        section,
                        sub_section,
                        chord_sequence: Some(sequence_index),
                        index,
                    };
                    let palm_mute = strum.palm_mute.is_muted();
                    let (stroke, accented) = match strum.strum {
                        StrumToken::Empty => continue,
                        StrumToken::Rest => {
                            self.push_strum(
                                bpm,
                                strum.note_length,
                                pattern.note_length,
                                location,
                                Sound::Rest,
                            );
                            continue;
                        }
                        StrumToken::Slap => (Stroke::Slap, false),
                        StrumToken::Strum {
                            direction: StrumDirection::Down,
                            accented,
                        } => (Stroke::Down, accented),
                        StrumToken::Strum {
                            direction: StrumDirection::Up,
                            accented,
                        } => (Stroke::Up, accented),
                    };

                    let chord = sequence.chord_at(index);
                    let pitches = chord
                        .and_then(|name| {
                            let voicing = tab.chord(name);
                            if voicing.is_none() {
                                debug!(chord = name, "Unknown chord.");
                            }
                            voicing
                        })
                        .map(|voicing| voicing.pitches(&self.tuning, tab.capo))
                        .unwrap_or_default();

                    self.push_strum(
                        bpm,
                        strum.note_length,
                        pattern.note_length,
                        location,
                        Sound::Strum {
                            chord: chord.map(str::to_string),
                            pitches,
                            stroke,
                            accented,
                            palm_mute,
                        },
                    );
                }
            }
        }
    }

    fn push_strum(
        &mut self,
        bpm: f64,
        note_length: Option<NoteLength>,
        pattern_length: NoteLength,
        location: Location,
        sound: Sound,
    ) {
        self.push(PlaybackEvent {
            bpm,
            note_length_multiplier: note_length.unwrap_or(pattern_length).quarter_notes(),
            playback_speed: self.options.playback_speed,
            location,
            sound,
        });
    }
}
