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

//! Instrument sample sets and their loading.
//!
//! An instrument is one sample per pitch, laid out as `{instrument}-{format}/{Pitch}.{format}`
//! under each sample root, e.g. `acoustic_guitar_steel-ogg/Ab2.ogg`. Instruments are loaded
//! entirely into memory and cached for the life of the process by name.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use symphonia::core::codecs::CODEC_TYPE_VORBIS;
use tracing::{debug, info, warn};

use super::{decode::decode, fetch::SampleFetcher, AudioError};
use crate::tuning::Pitch;

/// Loaded instruments, by name.
static INSTRUMENTS: Mutex<BTreeMap<String, Arc<Instrument>>> = Mutex::new(BTreeMap::new());

/// Loaded one-shot assets such as the count-in click, by path.
static ASSETS: Mutex<BTreeMap<String, Arc<Sample>>> = Mutex::new(BTreeMap::new());

pub const DEFAULT_LOWEST: Pitch = Pitch::LOW_E;
pub const DEFAULT_HIGHEST: Pitch = Pitch::HIGH_E_24;

/// Mono audio held in memory at its source sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    rate: u32,
    frames: Vec<f32>,
}

impl Sample {
    pub fn new(rate: u32, frames: Vec<f32>) -> Sample {
        Sample { rate, frames }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn frames(&self) -> &[f32] {
        &self.frames
    }

    pub fn duration(&self) -> Duration {
        if self.rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames.len() as f64 / self.rate as f64)
    }
}

/// A set of pitched samples.
#[derive(Clone, PartialEq)]
pub struct Instrument {
    name: String,
    samples: BTreeMap<u8, Arc<Sample>>,
}

impl Instrument {
    /// Creates an instrument from samples keyed by MIDI note.
    pub fn new(name: &str, samples: BTreeMap<u8, Arc<Sample>>) -> Instrument {
        Instrument {
            name: name.to_string(),
            samples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sampled note closest to the requested one. Ties go to the lower note.
    pub fn nearest(&self, midi: u8) -> Option<(u8, &Arc<Sample>)> {
        let below = self.samples.range(..=midi).next_back();
        let above = self.samples.range(midi..).next();
        match (below, above) {
            (Some(below), Some(above)) => {
                if midi - below.0 <= above.0 - midi {
                    Some((*below.0, below.1))
                } else {
                    Some((*above.0, above.1))
                }
            }
            (Some((note, sample)), None) | (None, Some((note, sample))) => Some((*note, sample)),
            (None, None) => None,
        }
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("name", &self.name)
            .field("samples", &self.samples.len())
            .finish()
    }
}

/// Encoded sample formats served by sample roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Ogg,
    Mp3,
}

impl SampleFormat {
    /// Ogg Vorbis when the decoder registry can play it, mp3 otherwise.
    pub fn negotiate() -> SampleFormat {
        if symphonia::default::get_codecs()
            .get_codec(CODEC_TYPE_VORBIS)
            .is_some()
        {
            SampleFormat::Ogg
        } else {
            SampleFormat::Mp3
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SampleFormat::Ogg => "ogg",
            SampleFormat::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Loads instruments from an ordered list of sample sources, falling back from one to the
/// next.
pub struct InstrumentLoader {
    sources: Vec<Box<dyn SampleFetcher>>,
    format: SampleFormat,
    lowest: Pitch,
    highest: Pitch,
}

impl InstrumentLoader {
    /// Creates a loader with no sources covering the range of a 24 fret guitar in standard
    /// tuning.
    pub fn new(format: SampleFormat) -> InstrumentLoader {
        InstrumentLoader {
            sources: Vec::new(),
            format,
            lowest: DEFAULT_LOWEST,
            highest: DEFAULT_HIGHEST,
        }
    }

    /// Adds a source. Sources are tried in the order they are added.
    pub fn with_source(mut self, source: Box<dyn SampleFetcher>) -> InstrumentLoader {
        self.sources.push(source);
        self
    }

    /// Restricts the pitches loaded for each instrument.
    pub fn with_range(mut self, lowest: Pitch, highest: Pitch) -> InstrumentLoader {
        self.lowest = lowest.min(highest);
        self.highest = highest.max(lowest);
        self
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// The relative path of one pitch of an instrument.
    pub fn sample_path(&self, instrument: &str, pitch: Pitch) -> String {
        let extension = self.format.extension();
        format!("{}-{}/{}.{}", instrument, extension, pitch, extension)
    }

    /// Loads an instrument, or returns it from the cache. Fails only when every source fails.
    pub fn load(&self, name: &str) -> Result<Arc<Instrument>, AudioError> {
        if let Some(instrument) = INSTRUMENTS.lock().get(name) {
            debug!(instrument = name, "Using cached instrument.");
            return Ok(instrument.clone());
        }

        for source in self.sources.iter() {
            match self.load_from(source.as_ref(), name) {
                Ok(instrument) => {
                    info!(
                        instrument = name,
                        source = %source,
                        samples = instrument.len(),
                        "Instrument loaded."
                    );
                    let instrument = Arc::new(instrument);
                    INSTRUMENTS
                        .lock()
                        .insert(name.to_string(), instrument.clone());
                    return Ok(instrument);
                }
                Err(e) => {
                    warn!(
                        instrument = name,
                        source = %source,
                        err = %e,
                        "Unable to load instrument."
                    );
                }
            }
        }

        Err(AudioError::InstrumentUnavailable(name.to_string()))
    }

    /// Loads an instrument on a blocking task.
    pub async fn load_async(self: Arc<Self>, name: String) -> Result<Arc<Instrument>, AudioError> {
        tokio::task::spawn_blocking(move || self.load(&name)).await?
    }

    /// Loads a one-shot asset, such as the count-in click, or returns it from the cache.
    pub fn load_asset(&self, path: &str) -> Result<Arc<Sample>, AudioError> {
        if let Some(sample) = ASSETS.lock().get(path) {
            return Ok(sample.clone());
        }

        let mut last_error = None;
        for source in self.sources.iter() {
            match source.fetch(path).and_then(|bytes| decode(bytes, path)) {
                Ok(sample) => {
                    let sample = Arc::new(sample);
                    ASSETS.lock().insert(path.to_string(), sample.clone());
                    return Ok(sample);
                }
                Err(e) => {
                    debug!(path, source = %source, err = %e, "Unable to load asset.");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AudioError::Fetch {
            path: path.to_string(),
            source: "no sample sources are configured".into(),
        }))
    }

    /// Loads every pitch in range from a single source. Any missing pitch fails the source.
    fn load_from(&self, source: &dyn SampleFetcher, name: &str) -> Result<Instrument, AudioError> {
        let mut samples = BTreeMap::new();
        for midi in self.lowest.midi()..=self.highest.midi() {
            let Some(pitch) = Pitch::from_midi(midi) else {
                continue;
            };
            let path = self.sample_path(name, pitch);
            let sample = decode(source.fetch(&path)?, &path)?;
            samples.insert(midi, Arc::new(sample));
        }
        Ok(Instrument::new(name, samples))
    }
}

/// Returns a cached instrument without loading it.
pub fn cached(name: &str) -> Option<Arc<Instrument>> {
    INSTRUMENTS.lock().get(name).cloned()
}

/// Drops every cached instrument and asset.
pub fn clear_cache() {
    INSTRUMENTS.lock().clear();
    ASSETS.lock().clear();
}

/// Number of cached instruments, by name.
pub fn cache_summary() -> HashMap<String, usize> {
    INSTRUMENTS
        .lock()
        .iter()
        .map(|(name, instrument)| (name.clone(), instrument.len()))
        .collect()
}

#[cfg(test)]
mod test {
    use std::{fs, path::Path};

    use serial_test::serial;

    use super::*;
    use crate::audio::{decode::test::write_wav, fetch::DirectoryFetcher};

    fn pitch(name: &str) -> Pitch {
        name.parse().unwrap()
    }

    /// Lays out a WAV sample for every pitch in `lowest..=highest`.
    fn write_instrument(
        root: &Path,
        name: &str,
        lowest: u8,
        highest: u8,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = root.join(format!("{}-ogg", name));
        fs::create_dir_all(&dir)?;
        for midi in lowest..=highest {
            let pitch = Pitch::from_midi(midi).unwrap();
            // The loader asks for .ogg; symphonia detects the WAV header regardless.
            write_wav(&dir.join(format!("{}.ogg", pitch)), 8000, 1, 800)?;
        }
        Ok(())
    }

    fn loader(roots: &[&Path]) -> InstrumentLoader {
        roots
            .iter()
            .fold(InstrumentLoader::new(SampleFormat::Ogg), |loader, root| {
                loader.with_source(Box::new(DirectoryFetcher::new(root)))
            })
            .with_range(pitch("E2"), pitch("G2"))
    }

    #[test]
    fn test_sample_path() {
        let loader = InstrumentLoader::new(SampleFormat::Mp3);
        assert_eq!(
            loader.sample_path("acoustic_guitar_steel", pitch("G#2")),
            "acoustic_guitar_steel-mp3/Ab2.mp3"
        );
    }

    #[test]
    fn test_nearest() {
        let sample = Arc::new(Sample::new(8000, vec![0.0; 10]));
        let instrument = Instrument::new(
            "sparse",
            BTreeMap::from([(40, sample.clone()), (44, sample.clone()), (52, sample)]),
        );
        assert_eq!(instrument.nearest(40).map(|(n, _)| n), Some(40));
        assert_eq!(instrument.nearest(42).map(|(n, _)| n), Some(40));
        assert_eq!(instrument.nearest(43).map(|(n, _)| n), Some(44));
        assert_eq!(instrument.nearest(30).map(|(n, _)| n), Some(40));
        assert_eq!(instrument.nearest(90).map(|(n, _)| n), Some(52));
        assert!(Instrument::new("empty", BTreeMap::new()).nearest(40).is_none());
    }

    #[test]
    fn test_negotiated_format() {
        // The full symphonia feature set includes Vorbis.
        assert_eq!(SampleFormat::negotiate(), SampleFormat::Ogg);
    }

    #[test]
    #[serial]
    fn test_load_and_cache() -> Result<(), Box<dyn std::error::Error>> {
        clear_cache();
        let dir = tempfile::tempdir()?;
        write_instrument(dir.path(), "nylon", 40, 43)?;

        let loader = loader(&[dir.path()]);
        let instrument = loader.load("nylon")?;
        assert_eq!(instrument.name(), "nylon");
        assert_eq!(instrument.len(), 4);
        assert!(cached("nylon").is_some());
        assert_eq!(cache_summary().get("nylon"), Some(&4));

        // Served from the cache even once the files are gone.
        fs::remove_dir_all(dir.path().join("nylon-ogg"))?;
        let again = loader.load("nylon")?;
        assert!(Arc::ptr_eq(&instrument, &again));
        clear_cache();
        Ok(())
    }

    #[test]
    #[serial]
    fn test_falls_back_to_next_source() -> Result<(), Box<dyn std::error::Error>> {
        clear_cache();
        let remote = tempfile::tempdir()?;
        let local = tempfile::tempdir()?;
        // The first source is missing a pitch, so the whole source is skipped.
        write_instrument(remote.path(), "steel", 40, 42)?;
        write_instrument(local.path(), "steel", 40, 43)?;

        let instrument = loader(&[remote.path(), local.path()]).load("steel")?;
        assert_eq!(instrument.len(), 4);
        clear_cache();
        Ok(())
    }

    #[test]
    #[serial]
    fn test_unavailable_everywhere() -> Result<(), Box<dyn std::error::Error>> {
        clear_cache();
        let remote = tempfile::tempdir()?;
        let local = tempfile::tempdir()?;

        let result = loader(&[remote.path(), local.path()]).load("missing");
        assert!(matches!(
            result,
            Err(AudioError::InstrumentUnavailable(name)) if name == "missing"
        ));
        assert!(cached("missing").is_none());
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_load_async() -> Result<(), Box<dyn std::error::Error>> {
        clear_cache();
        let dir = tempfile::tempdir()?;
        write_instrument(dir.path(), "electric", 40, 43)?;

        let loader = Arc::new(loader(&[dir.path()]));
        let instrument = loader.load_async("electric".to_string()).await?;
        assert_eq!(instrument.len(), 4);
        clear_cache();
        Ok(())
    }

    #[test]
    #[serial]
    fn test_load_asset() -> Result<(), Box<dyn std::error::Error>> {
        clear_cache();
        let dir = tempfile::tempdir()?;
        write_wav(&dir.path().join("click.wav"), 8000, 1, 400)?;

        let loader = loader(&[dir.path()]);
        let click = loader.load_asset("click.wav")?;
        assert_eq!(click.frames().len(), 400);
        assert_eq!(click.duration(), Duration::from_millis(50));
        assert!(loader.load_asset("missing.wav").is_err());
        assert!(InstrumentLoader::new(SampleFormat::Ogg)
            .load_asset("click.wav")
            .is_ok());
        clear_cache();
        assert!(InstrumentLoader::new(SampleFormat::Ogg)
            .load_asset("click.wav")
            .is_err());
        Ok(())
    }
}
