//! Physical output and display mode discovery
//!
//! Outputs come from an external helper (`mmsg -O`), modes from the kernel's
//! DRM connector directories. Either source may be missing on a given
//! machine, so every failure lands on a fixed built-in list instead.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::constants::discovery::{
    BASE_RATE, DRM_ROOT, FALLBACK_MODES, FALLBACK_OUTPUTS, HELPER_TIMEOUT, HIGH_RATES,
    HIGH_RATE_MIN_WIDTH, MODES_FILE, OUTPUT_HELPER, OUTPUT_HELPER_ARG,
};
use crate::error::DiscoveryError;

const HELPER_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A connected output, identified by its connector name (e.g. `eDP-1`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub name: String,
}

impl Output {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One candidate resolution and refresh rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: f64,
}

impl Mode {
    pub fn new(width: u32, height: u32, refresh_rate: f64) -> Self {
        Self {
            width,
            height,
            refresh_rate,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {:.2}Hz", self.width, self.height, self.refresh_rate)
    }
}

/// Where the editor gets outputs and modes from
///
/// Implementations never fail: they hand back a fallback list instead.
pub trait OutputSource {
    fn outputs(&self) -> Vec<Output>;
    fn modes(&self, output: &str) -> Vec<Mode>;
}

pub fn fallback_outputs() -> Vec<Output> {
    FALLBACK_OUTPUTS.iter().map(|name| Output::new(*name)).collect()
}

pub fn fallback_modes() -> Vec<Mode> {
    FALLBACK_MODES
        .iter()
        .map(|&(width, height, rate)| Mode::new(width, height, rate))
        .collect()
}

/// Output names from helper output: first whitespace-delimited token per line
pub fn parse_output_list(text: &str) -> Vec<Output> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(Output::new)
        .collect()
}

/// Modes from a DRM `modes` file
///
/// Each distinct `WxH` line yields a 60 Hz mode; wide modes also get the
/// usual high refresh rates since the kernel file does not list rates.
pub fn parse_mode_list(text: &str) -> Vec<Mode> {
    let mut seen = HashSet::new();
    let mut modes = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if !seen.insert(line) {
            continue;
        }
        let Some((width, height)) = line.split_once('x') else {
            continue;
        };
        let (Ok(width), Ok(height)) = (width.parse::<u32>(), height.parse::<u32>()) else {
            debug!(line, "Ignoring unparseable mode");
            continue;
        };

        modes.push(Mode::new(width, height, BASE_RATE));
        if width >= HIGH_RATE_MIN_WIDTH {
            modes.extend(HIGH_RATES.iter().map(|&rate| Mode::new(width, height, rate)));
        }
    }
    modes
}

/// Discovery backed by the helper process and sysfs
#[derive(Debug, Clone)]
pub struct SystemDiscovery {
    helper: String,
    helper_args: Vec<String>,
    drm_root: PathBuf,
    timeout: Duration,
}

impl Default for SystemDiscovery {
    fn default() -> Self {
        Self {
            helper: OUTPUT_HELPER.to_string(),
            helper_args: vec![OUTPUT_HELPER_ARG.to_string()],
            drm_root: PathBuf::from(DRM_ROOT),
            timeout: HELPER_TIMEOUT,
        }
    }
}

impl SystemDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_helper<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.helper = program.into();
        self.helper_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_drm_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.drm_root = root.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the helper and parse its output
    pub fn try_outputs(&self) -> Result<Vec<Output>, DiscoveryError> {
        let text = self.run_helper()?;
        let outputs = parse_output_list(&text);
        if outputs.is_empty() {
            return Err(DiscoveryError::NoOutputs);
        }
        Ok(outputs)
    }

    fn run_helper(&self) -> Result<String, DiscoveryError> {
        let program = self.helper.clone();
        let mut child = Command::new(&self.helper)
            .args(&self.helper_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| DiscoveryError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Drain stdout on a separate thread so a chatty helper cannot block on a full pipe
        let (tx, rx) = mpsc::channel();
        if let Some(mut stdout) = child.stdout.take() {
            thread::spawn(move || {
                let mut text = String::new();
                let result = stdout.read_to_string(&mut text).map(|_| text);
                let _ = tx.send(result);
            });
        }

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(DiscoveryError::Timeout {
                        program,
                        millis: self.timeout.as_millis(),
                    });
                }
                Ok(None) => thread::sleep(HELPER_POLL_INTERVAL),
                Err(source) => return Err(DiscoveryError::Spawn { program, source }),
            }
        };

        if !status.success() {
            return Err(DiscoveryError::HelperFailed { program, status });
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(source)) => Err(DiscoveryError::HelperRead { program, source }),
            Err(_) => Err(DiscoveryError::Timeout {
                program,
                millis: self.timeout.as_millis(),
            }),
        }
    }

    /// Read the `modes` file of the DRM connector named `*-{output}`
    pub fn try_modes(&self, output: &str) -> Result<Vec<Mode>, DiscoveryError> {
        let entry = self.find_connector(output)?;
        let modes_path = entry.join(MODES_FILE);
        let text = fs::read_to_string(&modes_path).map_err(|source| DiscoveryError::DrmRead {
            path: modes_path.clone(),
            source,
        })?;

        let modes = parse_mode_list(&text);
        if modes.is_empty() {
            return Err(DiscoveryError::NoModes(output.to_string()));
        }
        Ok(modes)
    }

    fn find_connector(&self, output: &str) -> Result<PathBuf, DiscoveryError> {
        let read_err = |source| DiscoveryError::DrmRead {
            path: self.drm_root.clone(),
            source,
        };
        let suffix = format!("-{output}");

        let mut names: Vec<String> = fs::read_dir(&self.drm_root)
            .map_err(read_err)?
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort_unstable();

        names
            .iter()
            .find(|name| name.ends_with(&suffix))
            .map(|name| self.drm_root.join(name))
            .ok_or_else(|| DiscoveryError::NoDrmEntry(output.to_string()))
    }
}

impl OutputSource for SystemDiscovery {
    fn outputs(&self) -> Vec<Output> {
        match self.try_outputs() {
            Ok(outputs) => {
                info!(count = outputs.len(), "Discovered outputs");
                outputs
            }
            Err(e) => {
                warn!(error = %e, "Output discovery failed, using fallback list");
                fallback_outputs()
            }
        }
    }

    fn modes(&self, output: &str) -> Vec<Mode> {
        match self.try_modes(output) {
            Ok(modes) => {
                debug!(output, count = modes.len(), "Discovered modes");
                modes
            }
            Err(e) => {
                warn!(output, drm_root = %self.drm_root.display(), error = %e, "Mode discovery failed, using fallback list");
                fallback_modes()
            }
        }
    }
}
