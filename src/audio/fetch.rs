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
use std::{fmt, fs, path::PathBuf};

use super::AudioError;

/// A place sample files can be read from. Paths are relative and always use `/`.
///
/// Fetching blocks, so loaders call it from a blocking task.
pub trait SampleFetcher: fmt::Display + Send + Sync {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AudioError>;
}

/// Reads samples from a local directory.
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> DirectoryFetcher {
        DirectoryFetcher { root: root.into() }
    }
}

impl SampleFetcher for DirectoryFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AudioError> {
        let full_path = path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |full_path, part| full_path.join(part));

        fs::read(&full_path).map_err(|e| AudioError::Fetch {
            path: full_path.display().to_string(),
            source: Box::new(e),
        })
    }
}

impl fmt::Display for DirectoryFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (local)", self.root.display())
    }
}

/// Downloads samples over HTTP(S).
#[cfg(feature = "remote")]
pub struct HttpFetcher {
    base_url: String,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    pub fn new(base_url: &str) -> HttpFetcher {
        HttpFetcher {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(feature = "remote")]
impl SampleFetcher for HttpFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AudioError> {
        let url = self.url(path);
        let error = |e: reqwest::Error| AudioError::Fetch {
            path: url.clone(),
            source: Box::new(e),
        };

        let response = reqwest::blocking::get(&url)
            .and_then(|response| response.error_for_status())
            .map_err(error)?;
        Ok(response.bytes().map_err(error)?.to_vec())
    }
}

#[cfg(feature = "remote")]
impl fmt::Display for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (remote)", self.base_url)
    }
}
