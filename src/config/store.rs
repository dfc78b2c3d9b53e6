//! Read-modify-write of the compositor config file
//!
//! Only `monitorrule=` lines are ever touched. Every other line is kept
//! byte-for-byte in its original position, and rule lines for monitors the
//! editor does not know about are left alone.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::constants::config::{DEFAULT_RELATIVE_PATH, RULE_MARKER};
use crate::error::StoreError;
use crate::rule::{rule_body, rule_line_id, MonitorRule, RuleMap};

/// A config file plus the raw lines captured by the last parse or save
///
/// Lines are kept as bytes without their `\n`, so text that is not UTF-8
/// and `\r` line endings survive a save untouched.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    lines: Vec<Vec<u8>>,
}

impl ConfigStore {
    /// Bind to `path`; nothing is read until [`ConfigStore::parse`]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
        }
    }

    /// `{home}/.config/mango/config.conf`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(DEFAULT_RELATIVE_PATH);
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and collect its rules
    ///
    /// A missing file is an empty config. Malformed rule lines stay in the
    /// raw lines but are left out of the returned map.
    pub fn parse(&mut self) -> Result<RuleMap, StoreError> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Config file not found, starting empty");
                self.lines.clear();
                return Ok(RuleMap::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let rules = self.parse_contents(&contents);
        info!(path = %self.path.display(), lines = self.lines.len(), rules = rules.len(), "Parsed config");
        Ok(rules)
    }

    fn parse_contents(&mut self, contents: &[u8]) -> RuleMap {
        self.lines = split_lines(contents);

        let mut rules = RuleMap::new();
        for (number, line) in self.lines.iter().enumerate() {
            let Some(body) = line_rule_body(line, number) else {
                continue;
            };
            match MonitorRule::parse_body(body) {
                Ok(rule) => {
                    if let Some(previous) = rules.insert(rule) {
                        debug!(id = %previous.id, line = number + 1, "Duplicate rule, later line wins");
                    }
                }
                Err(e) => warn!(line = number + 1, error = %e, "Skipping malformed monitor rule"),
            }
        }
        rules
    }

    /// Merge `new_rules` into the captured lines without touching the disk
    ///
    /// Every existing line for a known id is replaced in place (duplicates
    /// included) keeping its `\r` ending, and ids never seen in the file are
    /// appended in the order given.
    pub fn merged_lines(&self, new_rules: &[MonitorRule]) -> Vec<Vec<u8>> {
        let mut output = Vec::with_capacity(self.lines.len() + new_rules.len());
        let mut written: HashSet<&str> = HashSet::new();

        for (number, line) in self.lines.iter().enumerate() {
            let replacement = line_rule_body(line, number)
                .and_then(rule_line_id)
                .and_then(|id| new_rules.iter().find(|rule| rule.id == id));

            match replacement {
                Some(rule) => {
                    let mut rewritten = rule.to_string().into_bytes();
                    if line.ends_with(b"\r") {
                        rewritten.push(b'\r');
                    }
                    output.push(rewritten);
                    written.insert(rule.id.as_str());
                }
                None => output.push(line.clone()),
            }
        }

        for rule in new_rules {
            if written.insert(rule.id.as_str()) {
                output.push(rule.to_string().into_bytes());
            }
        }
        output
    }

    /// Write `new_rules` back, replacing the file atomically
    pub fn save(&mut self, new_rules: &[MonitorRule]) -> Result<(), StoreError> {
        let lines = self.merged_lines(new_rules);
        let target = self.write_target();
        write_atomically(&target, &lines)?;

        info!(path = %target.display(), lines = lines.len(), rules = new_rules.len(), "Saved config");
        self.lines = lines;
        Ok(())
    }

    /// Resolve symlinks so a linked config is updated rather than replaced
    fn write_target(&self) -> PathBuf {
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
            }
            _ => self.path.clone(),
        }
    }
}

/// Split on `\n`; a trailing newline does not start another line
fn split_lines(contents: &[u8]) -> Vec<Vec<u8>> {
    if contents.is_empty() {
        return Vec::new();
    }
    let contents = contents.strip_suffix(b"\n").unwrap_or(contents);
    contents.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect()
}

/// Rule body of a raw line, if it is a rule line with valid UTF-8
fn line_rule_body(line: &[u8], number: usize) -> Option<&str> {
    match std::str::from_utf8(line) {
        Ok(text) => rule_body(text),
        Err(_) => {
            if line.trim_ascii_start().starts_with(RULE_MARKER.as_bytes()) {
                warn!(line = number + 1, "Skipping monitor rule that is not valid UTF-8");
            }
            None
        }
    }
}

fn write_atomically(path: &Path, lines: &[Vec<u8>]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    for line in lines {
        tmp.write_all(line).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;

    if let Ok(meta) = fs::metadata(path)
        && let Err(e) = tmp.as_file().set_permissions(meta.permissions())
    {
        warn!(path = %path.display(), error = %e, "Could not carry over file permissions");
    }

    tmp.persist(path).map_err(|e| StoreError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}
