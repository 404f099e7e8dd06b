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
use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{debug, error, info, span, warn, Level};

use super::{
    voice::{voices_for, Voice, VoiceManager, VoiceTag},
    AudioEngine, AudioError, Instrument, Sample,
};
use crate::compiler::Sound;

/// Commands sent from the engine to the output thread.
enum Command {
    Play(Voice),
    Stop(VoiceTag),
}

/// A running output stream.
struct Output {
    commands: crossbeam_channel::Sender<Command>,
    sample_rate: u32,
    /// Dropping this ends the output thread, which drops the stream.
    _shutdown: crossbeam_channel::Sender<()>,
}

/// Plays sounds through a cpal output device.
///
/// The device isn't opened until [`AudioEngine::user_gesture`] is called. Once open, the stream
/// lives on its own thread and everything else talks to it through a command channel.
pub struct CpalEngine {
    device_name: String,
    max_voices: usize,
    /// Master gain, stored as f32 bits.
    gain: Arc<AtomicU32>,
    output: Mutex<Option<Output>>,
    instrument: Mutex<Option<Arc<Instrument>>>,
    click: Mutex<Option<Arc<Sample>>>,
    recording: Mutex<Option<Arc<Sample>>>,
}

impl CpalEngine {
    /// Creates an engine for the named device. "default" is the host's default output.
    pub fn new(device_name: &str, max_voices: usize) -> CpalEngine {
        CpalEngine {
            device_name: device_name.to_string(),
            max_voices,
            gain: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            output: Mutex::new(None),
            instrument: Mutex::new(None),
            click: Mutex::new(None),
            recording: Mutex::new(None),
        }
    }

    fn find_device(&self) -> Result<cpal::Device, AudioError> {
        let host = cpal::default_host();
        if self.device_name == "default" {
            return host
                .default_output_device()
                .ok_or_else(|| AudioError::Output("no default output device".to_string()));
        }

        let devices = host
            .output_devices()
            .map_err(|e| AudioError::Output(e.to_string()))?;
        for device in devices {
            match device.name() {
                Ok(name) if name.trim() == self.device_name => return Ok(device),
                Ok(_) => {}
                Err(e) => debug!(err = %e, "Unable to read device name"),
            }
        }
        Err(AudioError::Output(format!(
            "no device found with name {}",
            self.device_name
        )))
    }

    /// Opens the device and starts the output thread.
    fn open(&self) -> Result<Output, AudioError> {
        let span = span!(Level::INFO, "open output (cpal)");
        let _enter = span.enter();

        let device = self.find_device()?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Output(e.to_string()))?;
        let sample_rate = supported.sample_rate();
        let channels = supported.channels();
        let sample_format = supported.sample_format();

        let (commands, command_rx) = crossbeam_channel::unbounded();
        let (shutdown, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let mixer = Mixer {
            commands: command_rx,
            voices: VoiceManager::new(self.max_voices),
            gain: self.gain.clone(),
            channels: channels as usize,
            scratch: Vec::new(),
        };

        // The stream is created and kept on its own thread.
        thread::spawn(move || {
            let config = cpal::StreamConfig {
                channels,
                sample_rate,
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = match sample_format {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer),
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer),
                cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, mixer),
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer),
                other => Err(format!("unsupported sample format {}", other)),
            }
            .and_then(|stream| {
                stream.play().map_err(|e| e.to_string())?;
                Ok(stream)
            });

            match stream {
                Ok(_stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Keep the stream alive until the engine goes away.
                    let _ = shutdown_rx.recv();
                    debug!("Output thread exiting");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {
                info!(
                    device = self.device_name,
                    sample_rate, channels, "Output stream started."
                );
                Ok(Output {
                    commands,
                    sample_rate,
                    _shutdown: shutdown,
                })
            }
            Ok(Err(e)) => Err(AudioError::Output(e)),
            Err(e) => Err(AudioError::Output(e.to_string())),
        }
    }

    /// Sends voices to the output thread. A closed output drops them.
    fn send(&self, voices: impl FnOnce(u32) -> Vec<Voice>) -> Result<(), AudioError> {
        let output = self.output.lock();
        let Some(output) = output.as_ref() else {
            return Ok(());
        };
        for voice in voices(output.sample_rate) {
            output
                .commands
                .send(Command::Play(voice))
                .map_err(|e| AudioError::Output(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&self, tag: VoiceTag) {
        if let Some(output) = self.output.lock().as_ref() {
            if output.commands.send(Command::Stop(tag)).is_err() {
                error!("Output thread is gone");
            }
        }
    }
}

impl AudioEngine for CpalEngine {
    fn user_gesture(&self) -> Result<(), AudioError> {
        let mut output = self.output.lock();
        if output.is_none() {
            *output = Some(self.open()?);
        }
        Ok(())
    }

    fn trigger(
        &self,
        sound: &Sound,
        delay: Duration,
        duration: Duration,
    ) -> Result<(), AudioError> {
        if self.output.lock().is_none() {
            return Ok(());
        }
        let instrument = self.instrument.lock().clone().ok_or(AudioError::NotLoaded)?;
        self.send(|rate| voices_for(sound, &instrument, delay, duration, rate))
    }

    fn stop_all(&self) {
        self.stop(VoiceTag::Note);
        self.stop(VoiceTag::Click);
    }

    fn set_volume(&self, gain: f32) {
        if gain.is_nan() {
            warn!(engine = self.device_name, "Ignoring a NaN volume.");
            return;
        }
        self.gain
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn play_count_in_click(&self) -> Result<(), AudioError> {
        if self.output.lock().is_none() {
            return Ok(());
        }
        let click = self.click.lock().clone().ok_or(AudioError::NoClick)?;
        self.send(|rate| vec![Voice::new(VoiceTag::Click, click, 0, rate, 1.0)])
    }

    fn set_instrument(&self, instrument: Option<Arc<Instrument>>) {
        *self.instrument.lock() = instrument;
    }

    fn set_count_in_click(&self, click: Option<Arc<Sample>>) {
        *self.click.lock() = click;
    }

    fn set_recording(&self, recording: Option<Arc<Sample>>) {
        self.stop_recording();
        *self.recording.lock() = recording;
    }

    fn play_recording(&self, offset: Duration) -> Result<(), AudioError> {
        let recording = self.recording.lock().clone().ok_or(AudioError::NoRecording)?;
        self.stop_recording();
        self.send(|rate| {
            vec![Voice::new(VoiceTag::Recording, recording, 0, rate, 1.0).with_offset(offset)]
        })
    }

    fn stop_recording(&self) {
        self.stop(VoiceTag::Recording);
    }

    fn recording_duration(&self) -> Option<Duration> {
        self.recording
            .lock()
            .as_ref()
            .map(|recording| recording.duration())
    }
}

impl fmt::Display for CpalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (cpal)", self.device_name)
    }
}

/// Owned by the audio callback: applies commands and renders voices.
struct Mixer {
    commands: crossbeam_channel::Receiver<Command>,
    voices: VoiceManager,
    gain: Arc<AtomicU32>,
    channels: usize,
    scratch: Vec<f32>,
}

impl Mixer {
    /// Fills an interleaved buffer, copying the mono mix to every channel.
    fn fill<T: cpal::Sample + cpal::FromSample<f32>>(&mut self, data: &mut [T]) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Play(voice) => {
                    self.voices.add_voice(voice);
                }
                Command::Stop(tag) => {
                    self.voices.stop(tag);
                }
            }
        }

        let channels = self.channels.max(1);
        let frames = data.len() / channels;
        self.scratch.resize(frames, 0.0);
        self.voices.render(&mut self.scratch);

        let gain = f32::from_bits(self.gain.load(Ordering::Relaxed));
        for (frame, value) in data.chunks_mut(channels).zip(self.scratch.iter()) {
            let value = T::from_sample((value * gain).clamp(-1.0, 1.0));
            frame.fill(value);
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
) -> Result<cpal::Stream, String>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| mixer.fill(data),
            |err| error!("CPAL output stream error: {}", err),
            None,
        )
        .map_err(|e| e.to_string())
}
