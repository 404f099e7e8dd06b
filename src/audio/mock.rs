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
use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::{AudioEngine, AudioError, Instrument, Sample};
use crate::compiler::Sound;

/// A trigger received by the mock engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub sound: Sound,
    pub delay: Duration,
    pub duration: Duration,
}

#[derive(Default)]
struct State {
    open: bool,
    volume: f32,
    instrument: Option<Arc<Instrument>>,
    click: Option<Arc<Sample>>,
    recording: Option<Arc<Sample>>,
    triggers: Vec<Trigger>,
    clicks: usize,
    stop_alls: usize,
    recording_starts: Vec<Duration>,
    recording_playing: bool,
}

/// A mock engine. Doesn't actually play anything, but remembers what it was asked to play.
pub struct MockEngine {
    name: String,
    state: Mutex<State>,
}

impl MockEngine {
    /// Gets the given mock engine. It starts closed with nothing loaded, like a real one.
    pub fn get(name: &str) -> MockEngine {
        MockEngine {
            name: name.to_string(),
            state: Mutex::new(State {
                volume: 1.0,
                ..Default::default()
            }),
        }
    }

    /// Gets a mock engine that is already open, with an instrument and click loaded.
    pub fn loaded(name: &str) -> MockEngine {
        let engine = MockEngine::get(name);
        let sample = Arc::new(Sample::new(8000, vec![0.0; 8000]));
        engine.set_instrument(Some(Arc::new(Instrument::new(
            "mock",
            BTreeMap::from([(64, sample.clone())]),
        ))));
        engine.set_count_in_click(Some(sample));
        engine.state.lock().open = true;
        engine
    }

    /// Sounds triggered so far.
    pub fn triggers(&self) -> Vec<Trigger> {
        self.state.lock().triggers.clone()
    }

    /// Forgets the triggers received so far.
    pub fn clear_triggers(&self) {
        self.state.lock().triggers.clear();
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().clicks
    }

    pub fn stop_alls(&self) -> usize {
        self.state.lock().stop_alls
    }

    /// Offsets the recording was started from.
    pub fn recording_starts(&self) -> Vec<Duration> {
        self.state.lock().recording_starts.clone()
    }

    pub fn is_recording_playing(&self) -> bool {
        self.state.lock().recording_playing
    }
}

impl AudioEngine for MockEngine {
    fn user_gesture(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if !state.open {
            info!(engine = self.name, "Audio output opened.");
            state.open = true;
        }
        Ok(())
    }

    fn trigger(
        &self,
        sound: &Sound,
        delay: Duration,
        duration: Duration,
    ) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if !state.open {
            return Ok(());
        }
        if state.instrument.is_none() {
            return Err(AudioError::NotLoaded);
        }
        debug!(engine = self.name, ?sound, ?duration, "Trigger.");
        state.triggers.push(Trigger {
            sound: sound.clone(),
            delay,
            duration,
        });
        Ok(())
    }

    fn stop_all(&self) {
        self.state.lock().stop_alls += 1;
    }

    fn set_volume(&self, gain: f32) {
        if !gain.is_nan() {
            self.state.lock().volume = gain.clamp(0.0, 1.0);
        }
    }

    fn play_count_in_click(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if !state.open {
            return Ok(());
        }
        if state.click.is_none() {
            return Err(AudioError::NoClick);
        }
        state.clicks += 1;
        Ok(())
    }

    fn set_instrument(&self, instrument: Option<Arc<Instrument>>) {
        self.state.lock().instrument = instrument;
    }

    fn set_count_in_click(&self, click: Option<Arc<Sample>>) {
        self.state.lock().click = click;
    }

    fn set_recording(&self, recording: Option<Arc<Sample>>) {
        let mut state = self.state.lock();
        state.recording = recording;
        state.recording_playing = false;
    }

    fn play_recording(&self, offset: Duration) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if state.recording.is_none() {
            return Err(AudioError::NoRecording);
        }
        if !state.open {
            return Ok(());
        }
        state.recording_starts.push(offset);
        state.recording_playing = true;
        Ok(())
    }

    fn stop_recording(&self) {
        self.state.lock().recording_playing = false;
    }

    fn recording_duration(&self) -> Option<Duration> {
        self.state
            .lock()
            .recording
            .as_ref()
            .map(|recording| recording.duration())
    }
}

impl fmt::Display for MockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
