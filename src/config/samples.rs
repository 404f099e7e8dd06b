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
use std::path::PathBuf;

use serde::Deserialize;
use tracing::info;

#[cfg(feature = "remote")]
use crate::audio::fetch::HttpFetcher;
use crate::audio::{fetch::DirectoryFetcher, InstrumentLoader, SampleFormat};
use crate::tuning::Pitch;

use super::ConfigError;

const DEFAULT_LOCAL_SAMPLES: &str = "samples";

/// The sample format to request from sample sources.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SamplesFormat {
    /// Pick based on which codecs are available.
    #[default]
    Auto,
    Ogg,
    Mp3,
}

/// A YAML representation of where instrument samples come from.
#[derive(Deserialize, Clone, Default)]
pub struct Samples {
    /// Base URL of the remote sample host. Tried first when set.
    remote: Option<String>,

    /// Local sample directory, used when the remote host fails (default: "samples").
    local: Option<String>,

    /// The sample format (default: auto).
    format: Option<SamplesFormat>,

    /// The lowest note to load for each instrument, e.g. "E2".
    lowest_note: Option<String>,

    /// The highest note to load for each instrument, e.g. "E6".
    highest_note: Option<String>,
}

impl Samples {
    pub fn remote(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    pub fn local(&self) -> PathBuf {
        PathBuf::from(self.local.as_deref().unwrap_or(DEFAULT_LOCAL_SAMPLES))
    }

    /// Returns the configured format, negotiating one when set to auto.
    pub fn format(&self) -> SampleFormat {
        match self.format.unwrap_or_default() {
            SamplesFormat::Auto => SampleFormat::negotiate(),
            SamplesFormat::Ogg => SampleFormat::Ogg,
            SamplesFormat::Mp3 => SampleFormat::Mp3,
        }
    }

    /// Returns the note range to load (default: the range of a 24 fret guitar).
    pub fn range(&self) -> Result<(Pitch, Pitch), ConfigError> {
        let lowest = match &self.lowest_note {
            Some(note) => note.parse()?,
            None => crate::audio::instrument::DEFAULT_LOWEST,
        };
        let highest = match &self.highest_note {
            Some(note) => note.parse()?,
            None => crate::audio::instrument::DEFAULT_HIGHEST,
        };
        if lowest > highest {
            return Err(ConfigError::InvalidValue {
                key: "samples.lowest_note",
                reason: format!("{} is above the highest note {}", lowest, highest),
            });
        }
        Ok((lowest, highest))
    }

    /// Builds an instrument loader that tries the remote host, then the local directory.
    pub fn loader(&self) -> Result<InstrumentLoader, ConfigError> {
        let (lowest, highest) = self.range()?;
        let loader = InstrumentLoader::new(self.format()).with_range(lowest, highest);

        #[cfg(feature = "remote")]
        let loader = match self.remote() {
            Some(remote) => loader.with_source(Box::new(HttpFetcher::new(remote))),
            None => loader,
        };

        let local = self.local();
        info!(
            remote = self.remote(),
            local = %local.display(),
            format = %loader.format(),
            "Sample sources configured."
        );
        Ok(loader.with_source(Box::new(DirectoryFetcher::new(local))))
    }
}

#[cfg(test)]
mod test {
    use config::{Config, File, FileFormat};

    use super::*;

    fn parse(yaml: &str) -> Samples {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let samples = parse("{}");
        assert_eq!(samples.remote(), None);
        assert_eq!(samples.local(), PathBuf::from("samples"));
        assert_eq!(samples.format(), SampleFormat::negotiate());
        assert_eq!(
            samples.range().unwrap(),
            (Pitch::LOW_E, Pitch::HIGH_E_24)
        );
    }

    #[test]
    fn test_explicit() {
        let samples = parse(
            r#"
            remote: https://samples.invalid/guitars
            local: /opt/samples
            format: mp3
            lowest_note: A2
            highest_note: C5
            "#,
        );
        assert_eq!(samples.remote(), Some("https://samples.invalid/guitars"));
        assert_eq!(samples.local(), PathBuf::from("/opt/samples"));
        assert_eq!(samples.format(), SampleFormat::Mp3);

        let (lowest, highest) = samples.range().unwrap();
        assert_eq!(lowest.to_string(), "A2");
        assert_eq!(highest.to_string(), "C5");

        let loader = samples.loader().unwrap();
        assert_eq!(loader.format(), SampleFormat::Mp3);
    }

    #[test]
    fn test_bad_range() {
        let samples = parse("lowest_note: E5\nhighest_note: E2");
        assert!(matches!(
            samples.range(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let samples = parse("lowest_note: H2");
        assert!(matches!(samples.range(), Err(ConfigError::InvalidNote(_))));
    }
}
