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
use std::{path::Path, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;
use tracing::warn;

use crate::audio::SampleFormat;
use crate::compiler::PLAYBACK_SPEEDS;
use crate::scheduler::DEFAULT_COUNT_IN;

use super::{ConfigError, Samples};

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_INSTRUMENT: &str = "acoustic_guitar_steel";
const DEFAULT_MAX_VOICES: usize = 64;

/// The configuration for the tab player.
#[derive(Deserialize, Clone)]
pub struct Player {
    /// The audio device. "default" uses the host's default output.
    device: Option<String>,

    /// The instrument to load samples for.
    instrument: Option<String>,

    /// Where samples come from.
    #[serde(default)]
    samples: Samples,

    /// How long to count in before playback starts (default: 3s).
    count_in: Option<String>,

    /// Path of the count-in click relative to the sample sources (default: "click.<format>").
    count_in_click: Option<String>,

    /// Master volume, 0.0 to 1.0 (default: 1.0).
    volume: Option<f32>,

    /// Playback speed multiplier (default: 1.0).
    playback_speed: Option<f64>,

    /// Whether to loop at the end of the tab or loop range.
    looping: Option<bool>,

    /// The maximum number of voices sounding at once.
    max_voices: Option<usize>,
}

impl Player {
    /// Loads and validates the player configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Player, ConfigError> {
        let player = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Player>()?;
        player.validate()?;
        Ok(player)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.parse_count_in()?;
        self.samples.range()?;

        if let Some(volume) = self.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(ConfigError::InvalidValue {
                    key: "volume",
                    reason: format!("{} is not between 0 and 1", volume),
                });
            }
        }
        if let Some(speed) = self.playback_speed {
            if !PLAYBACK_SPEEDS.contains(&speed) {
                return Err(ConfigError::InvalidValue {
                    key: "playback_speed",
                    reason: format!(
                        "{} is not between {} and {}",
                        speed,
                        PLAYBACK_SPEEDS.start(),
                        PLAYBACK_SPEEDS.end()
                    ),
                });
            }
        }
        if self.max_voices == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_voices",
                reason: "at least one voice is required".to_string(),
            });
        }
        Ok(())
    }

    fn parse_count_in(&self) -> Result<Duration, ConfigError> {
        match &self.count_in {
            Some(count_in) => DurationString::from_string(count_in.clone())
                .map(Into::into)
                .map_err(|_| ConfigError::InvalidDuration {
                    key: "count_in",
                    value: count_in.clone(),
                }),
            None => Ok(DEFAULT_COUNT_IN),
        }
    }

    /// Returns the audio device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    pub fn instrument(&self) -> &str {
        self.instrument.as_deref().unwrap_or(DEFAULT_INSTRUMENT)
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Returns the count-in duration (default: 3s).
    pub fn count_in(&self) -> Duration {
        self.parse_count_in().unwrap_or_else(|e| {
            warn!(err = %e, "Using the default count-in.");
            DEFAULT_COUNT_IN
        })
    }

    /// Returns the path of the count-in click for the given format.
    pub fn count_in_click(&self, format: SampleFormat) -> String {
        match &self.count_in_click {
            Some(click) => click.clone(),
            None => format!("click.{}", format.extension()),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(1.0)
    }

    pub fn playback_speed(&self) -> f64 {
        self.playback_speed.unwrap_or(1.0)
    }

    pub fn looping(&self) -> bool {
        self.looping.unwrap_or(false)
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES).max(1)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use config::FileFormat;

    use super::*;

    fn parse(yaml: &str) -> Player {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let player = parse("{}");
        assert_eq!(player.device(), "default");
        assert_eq!(player.instrument(), "acoustic_guitar_steel");
        assert_eq!(player.count_in(), Duration::from_secs(3));
        assert_eq!(player.count_in_click(SampleFormat::Ogg), "click.ogg");
        assert_eq!(player.volume(), 1.0);
        assert_eq!(player.playback_speed(), 1.0);
        assert!(!player.looping());
        assert_eq!(player.max_voices(), 64);
        assert!(player.validate().is_ok());
    }

    #[test]
    fn test_load() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        write!(
            file,
            r#"
device: mock-device
instrument: electric_guitar_clean
count_in: 1500ms
count_in_click: metronome/tick.mp3
volume: 0.5
playback_speed: 0.75
looping: true
max_voices: 16
samples:
  local: /srv/samples
  format: ogg
"#
        )?;

        let player = Player::load(file.path())?;
        assert_eq!(player.device(), "mock-device");
        assert_eq!(player.instrument(), "electric_guitar_clean");
        assert_eq!(player.count_in(), Duration::from_millis(1500));
        assert_eq!(
            player.count_in_click(SampleFormat::Ogg),
            "metronome/tick.mp3"
        );
        assert_eq!(player.volume(), 0.5);
        assert_eq!(player.playback_speed(), 0.75);
        assert!(player.looping());
        assert_eq!(player.max_voices(), 16);
        assert_eq!(player.samples().format(), SampleFormat::Ogg);
        Ok(())
    }

    #[test]
    fn test_invalid_values() {
        for (yaml, key) in [
            ("count_in: soon", "count_in"),
            ("volume: 1.5", "volume"),
            ("playback_speed: 4.0", "playback_speed"),
            ("max_voices: 0", "max_voices"),
        ] {
            let result = parse(yaml).validate();
            match result {
                Err(ConfigError::InvalidDuration { key: found, .. })
                | Err(ConfigError::InvalidValue { key: found, .. }) => assert_eq!(found, key),
                other => panic!("expected an error for {}, got {:?}", yaml, other),
            }
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Player::load(Path::new("/nonexistent/player.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}
