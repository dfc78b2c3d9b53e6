//! Editor preferences persisted between sessions
//!
//! A tiny JSON record (`{"grid_size": 16}`) under the platform config dir.
//! Missing or unreadable content silently falls back to defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::prefs::{APP_DIR, FILENAME, GRID_STEPS};
use crate::error::PrefsError;

/// Quantization used when nudging a monitor with the arrow keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStep(u32);

impl GridStep {
    /// Accepts only the values in the cycling list
    pub fn new(pixels: u32) -> Option<Self> {
        GRID_STEPS.contains(&pixels).then_some(Self(pixels))
    }

    pub fn pixels(self) -> u32 {
        self.0
    }

    /// Next value in `1, 8, 16, 32, 64`, wrapping back to 1
    pub fn next(self) -> Self {
        let next = GRID_STEPS
            .iter()
            .position(|&step| step == self.0)
            .and_then(|i| GRID_STEPS.get(i + 1))
            .copied()
            .unwrap_or(GRID_STEPS[0]);
        Self(next)
    }
}

impl Default for GridStep {
    fn default() -> Self {
        Self(GRID_STEPS[0])
    }
}

/// On-disk preferences record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPrefs {
    #[serde(rename = "grid_size", default = "default_grid_size")]
    pub grid_size: u32,
}

fn default_grid_size() -> u32 {
    GRID_STEPS[0]
}

impl Default for AppPrefs {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
        }
    }
}

impl AppPrefs {
    pub fn from_grid_step(step: GridStep) -> Self {
        Self {
            grid_size: step.pixels(),
        }
    }

    /// Stored grid size, or the default when the file holds an unlisted value
    pub fn grid_step(&self) -> GridStep {
        GridStep::new(self.grid_size).unwrap_or_else(|| {
            warn!(grid_size = self.grid_size, allowed = ?GRID_STEPS, "grid_size not a known step, using default");
            GridStep::default()
        })
    }
}

/// Location of the preferences file
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{config_dir}/mangomon/state.json`
    pub fn default_location() -> Self {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(FILENAME);
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AppPrefs, PrefsError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No preferences file, using defaults");
                return Ok(AppPrefs::default());
            }
            Err(source) => {
                return Err(PrefsError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_str::<AppPrefs>(&contents) {
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt preferences file, using defaults");
                Ok(AppPrefs::default())
            }
        }
    }

    pub fn save(&self, prefs: &AppPrefs) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PrefsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, contents).map_err(|source| PrefsError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), grid_size = prefs.grid_size, "Saved preferences");
        Ok(())
    }
}
