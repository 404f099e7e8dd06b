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

//! Forgiving deserializers for user authored notation. A malformed unit turns into its empty
//! default instead of failing the whole document.

use std::ops::RangeInclusive;

use serde::{de::IgnoredAny, Deserialize, Deserializer};

/// Tempos outside this range are treated as missing.
pub const BPM_RANGE: RangeInclusive<f64> = 1.0..=1000.0;

/// Repetition counts above this are treated as malformed.
pub const MAX_REPETITIONS: u32 = 256;

#[derive(Deserialize)]
#[serde(untagged)]
enum Item<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T: Default> Item<T> {
    fn or_default(self) -> T {
        match self {
            Item::Valid(value) => value,
            Item::Invalid(_) => T::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Float(f64),
    Text(String),
    Invalid(IgnoredAny),
}

impl Number {
    fn value(self) -> Option<f64> {
        match self {
            Number::Float(value) => Some(value),
            Number::Text(text) => text.trim().parse().ok(),
            Number::Invalid(_) => None,
        }
    }
}

/// A sequence of units. Elements that fail to parse become their default; anything that
/// is not a sequence becomes an empty one.
pub fn seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    match Item::<Vec<Item<T>>>::deserialize(deserializer)? {
        Item::Valid(items) => Ok(items.into_iter().map(Item::or_default).collect()),
        Item::Invalid(_) => Ok(Vec::new()),
    }
}

/// Any value that fails to parse becomes its default.
pub fn value<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Item::<T>::deserialize(deserializer)?.or_default())
}

/// An optional tempo, accepted as a number or a numeric string.
pub fn bpm<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Number::deserialize(deserializer)?
        .value()
        .filter(|value| BPM_RANGE.contains(value)))
}

/// A repetition count. Anything that isn't a number from 0 to [`MAX_REPETITIONS`] counts as
/// a single pass.
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Number::deserialize(deserializer)?
        .value()
        .map(f64::round)
        .filter(|value| (0.0..=MAX_REPETITIONS as f64).contains(value))
        .map(|value| value as u32)
        .unwrap_or(1))
}
