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

//! Voice rendering and management for polyphonic sample playback.
//!
//! Sounds are turned into voices here, then mixed by whichever thread owns the output.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use tracing::{debug, warn};

use super::{Instrument, Sample};
use crate::compiler::{Sound, Stroke};
use crate::tuning::Pitch;

/// Global voice ID counter. IDs increase monotonically, so a lower ID is an older voice.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// Time between successive strings of a strum.
const STRUM_STAGGER: Duration = Duration::from_millis(12);

/// Fade applied at the end of a cut voice.
const RELEASE: Duration = Duration::from_millis(8);

const PALM_MUTE_LENGTH: f64 = 0.35;
const PALM_MUTE_GAIN: f32 = 0.8;
const DEAD_NOTE_LENGTH: Duration = Duration::from_millis(60);
const DEAD_NOTE_GAIN: f32 = 0.6;
const ACCENT_GAIN: f32 = 1.3;

/// What started a voice. Stopping is done by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTag {
    Note,
    Click,
    Recording,
}

/// A single sample being played.
pub struct Voice {
    id: u64,
    tag: VoiceTag,
    sample: Arc<Sample>,
    /// Read position in source frames.
    position: f64,
    /// Source frames advanced per output frame.
    step: f64,
    /// Output frames of silence before the sample starts.
    delay: usize,
    /// Output frames left to sound, if the voice is cut before the sample ends.
    remaining: Option<usize>,
    release: usize,
    gain: f32,
}

impl Voice {
    /// Creates a voice that plays `sample` shifted by `semitones` at the given output rate.
    pub fn new(
        tag: VoiceTag,
        sample: Arc<Sample>,
        semitones: i32,
        output_rate: u32,
        gain: f32,
    ) -> Voice {
        let ratio = sample.rate() as f64 / output_rate.max(1) as f64;
        Voice {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst),
            tag,
            sample,
            position: 0.0,
            step: 2f64.powf(semitones as f64 / 12.0) * ratio,
            delay: 0,
            remaining: None,
            release: frames(RELEASE, output_rate),
            gain,
        }
    }

    /// Starts the voice after a delay.
    pub fn with_delay(mut self, delay: Duration, output_rate: u32) -> Voice {
        self.delay = frames(delay, output_rate);
        self
    }

    /// Cuts the voice off after it has sounded for `length`.
    pub fn with_length(mut self, length: Duration, output_rate: u32) -> Voice {
        self.remaining = Some(frames(length, output_rate).max(1));
        self
    }

    /// Starts the voice partway into the sample.
    pub fn with_offset(mut self, offset: Duration) -> Voice {
        self.position = offset.as_secs_f64() * self.sample.rate() as f64;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn tag(&self) -> VoiceTag {
        self.tag
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Returns true once the voice has nothing left to play.
    pub fn is_finished(&self) -> bool {
        self.remaining == Some(0) || self.position >= self.sample.frames().len() as f64
    }

    /// Mixes the voice into a mono buffer. Returns false once the voice is finished.
    pub fn render(&mut self, out: &mut [f32]) -> bool {
        let frames = self.sample.frames();
        let skip = self.delay.min(out.len());
        self.delay -= skip;

        for slot in out[skip..].iter_mut() {
            if self.is_finished() {
                break;
            }

            // Linear interpolation between neighbouring source frames.
            let index = self.position as usize;
            let frac = (self.position - index as f64) as f32;
            let current = frames[index];
            let next = frames.get(index + 1).copied().unwrap_or(0.0);
            let mut value = current + (next - current) * frac;

            if let Some(remaining) = self.remaining.as_mut() {
                if *remaining < self.release {
                    value *= *remaining as f32 / self.release as f32;
                }
                *remaining -= 1;
            }

            *slot += value * self.gain;
            self.position += self.step;
        }

        !self.is_finished()
    }
}

fn frames(duration: Duration, rate: u32) -> usize {
    (duration.as_secs_f64() * rate as f64).round() as usize
}

/// Plays the nearest sampled note, pitch shifted to the requested one.
fn pitched_voice(
    instrument: &Instrument,
    pitch: Pitch,
    output_rate: u32,
    gain: f32,
) -> Option<Voice> {
    let (sampled, sample) = instrument.nearest(pitch.midi())?;
    let semitones = pitch.midi() as i32 - sampled as i32;
    Some(Voice::new(
        VoiceTag::Note,
        sample.clone(),
        semitones,
        output_rate,
        gain,
    ))
}

/// Turns a compiled sound into voices.
///
/// Notes in a column sound together. Strums are staggered string by string, low to high for
/// down strokes and high to low for up strokes. Palm muted sounds are shortened and softened,
/// dead notes are short thumps and accents are louder. Everything else rings for `duration`.
pub fn voices_for(
    sound: &Sound,
    instrument: &Instrument,
    delay: Duration,
    duration: Duration,
    output_rate: u32,
) -> Vec<Voice> {
    match sound {
        Sound::Notes { notes, palm_mute } => notes
            .iter()
            .filter_map(|note| {
                let (length, gain) = if note.dead {
                    (DEAD_NOTE_LENGTH.min(duration), DEAD_NOTE_GAIN)
                } else if *palm_mute {
                    (duration.mul_f64(PALM_MUTE_LENGTH), PALM_MUTE_GAIN)
                } else {
                    (duration, 1.0)
                };
                Some(
                    pitched_voice(instrument, note.pitch, output_rate, gain)?
                        .with_delay(delay, output_rate)
                        .with_length(length, output_rate),
                )
            })
            .collect(),
        Sound::Strum {
            pitches,
            stroke,
            accented,
            palm_mute,
            ..
        } => {
            let mut gain = if *accented { ACCENT_GAIN } else { 1.0 };
            let mut length = duration;
            if *palm_mute {
                gain *= PALM_MUTE_GAIN;
                length = duration.mul_f64(PALM_MUTE_LENGTH);
            }

            let order: Vec<Pitch> = match stroke {
                Stroke::Up => pitches.iter().rev().copied().collect(),
                Stroke::Down | Stroke::Slap => pitches.clone(),
            };

            order
                .into_iter()
                .enumerate()
                .filter_map(|(string, pitch)| {
                    // Slaps hit every string at once.
                    let (offset, length) = match stroke {
                        Stroke::Slap => (Duration::ZERO, DEAD_NOTE_LENGTH.min(length)),
                        Stroke::Down | Stroke::Up => (STRUM_STAGGER * string as u32, length),
                    };
                    Some(
                        pitched_voice(instrument, pitch, output_rate, gain)?
                            .with_delay(delay + offset, output_rate)
                            .with_length(length, output_rate),
                    )
                })
                .collect()
        }
        Sound::Rest | Sound::Ornament => Vec::new(),
    }
}

/// Manages active voices.
pub struct VoiceManager {
    voices: Vec<Voice>,
    /// Global maximum voices limit. Recordings don't count towards it.
    max_voices: usize,
}

impl VoiceManager {
    pub fn new(max_voices: usize) -> Self {
        Self {
            voices: Vec::new(),
            max_voices: max_voices.max(1),
        }
    }

    /// Adds a voice, stealing the oldest note or click if the limit is reached. Returns the
    /// ID of the stolen voice.
    pub fn add_voice(&mut self, voice: Voice) -> Option<u64> {
        let mut stolen = None;
        if voice.tag != VoiceTag::Recording {
            let count = self.stealable().count();
            if count >= self.max_voices {
                if let Some(oldest) = self.stealable().map(|v| v.id).min() {
                    self.voices.retain(|v| v.id != oldest);
                    stolen = Some(oldest);
                    warn!(
                        max_voices = self.max_voices,
                        "Global voice limit reached, stealing oldest"
                    );
                }
            }
        }
        self.voices.push(voice);
        stolen
    }

    fn stealable(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().filter(|v| v.tag != VoiceTag::Recording)
    }

    /// Stops every voice with the given tag.
    pub fn stop(&mut self, tag: VoiceTag) -> usize {
        let before = self.voices.len();
        self.voices.retain(|v| v.tag != tag);
        let stopped = before - self.voices.len();
        if stopped > 0 {
            debug!(?tag, stopped, "Stopped voices");
        }
        stopped
    }

    /// Mixes every voice into a mono buffer, dropping voices that have finished.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        self.voices.retain_mut(|voice| voice.render(out));
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("active_voices", &self.voices.len())
            .field("max_voices", &self.max_voices)
            .finish()
    }
}
