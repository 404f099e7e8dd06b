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
use std::{error::Error, sync::Arc, time::Duration};

use crate::{compiler::Sound, config};

pub mod cpal;
pub mod decode;
pub mod fetch;
pub mod instrument;
pub mod mock;
pub mod voice;

pub use instrument::{Instrument, InstrumentLoader, Sample, SampleFormat};

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no instrument is loaded")]
    NotLoaded,

    #[error("instrument {0} could not be loaded from any sample source")]
    InstrumentUnavailable(String),

    #[error("unable to fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("unable to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("no count-in click is loaded")]
    NoClick,

    #[error("no recording is loaded")]
    NoRecording,

    #[error("audio output error: {0}")]
    Output(String),

    #[error("sample loading task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Sends sounds to an audio output.
///
/// Engines start closed: until [`AudioEngine::user_gesture`] opens the output every trigger is
/// silently dropped.
pub trait AudioEngine: Send + Sync {
    /// Opens the audio output. Safe to call more than once.
    fn user_gesture(&self) -> Result<(), AudioError>;

    /// Plays a sound `delay` from now, letting it ring for `duration`.
    fn trigger(&self, sound: &Sound, delay: Duration, duration: Duration)
        -> Result<(), AudioError>;

    /// Silences every sounding note. The recording is left alone.
    fn stop_all(&self);

    /// Sets the master gain, 0.0 to 1.0.
    fn set_volume(&self, gain: f32);

    fn play_count_in_click(&self) -> Result<(), AudioError>;

    fn set_instrument(&self, instrument: Option<Arc<Instrument>>);

    fn set_count_in_click(&self, click: Option<Arc<Sample>>);

    fn set_recording(&self, recording: Option<Arc<Sample>>);

    /// Starts the recording `offset` into the file.
    fn play_recording(&self, offset: Duration) -> Result<(), AudioError>;

    fn stop_recording(&self);

    fn recording_duration(&self) -> Option<Duration>;
}

/// Gets the engine named by the configuration. Device names starting with "mock" produce a
/// mock engine that records triggers without making a sound.
pub fn get_engine(config: &config::Player) -> Result<Arc<dyn AudioEngine>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::MockEngine::get(device)));
    }

    Ok(Arc::new(cpal::CpalEngine::new(device, config.max_voices())))
}
