//! Modal list pickers opened from the grid
//!
//! Each picker owns only its transient cursor and input buffer. Keys return a
//! [`PickerEvent`]; the editor applies a `Selected` value to the rule map and
//! drops the picker on either `Selected` or `Cancelled`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::constants::pickers::{
    CUSTOM_SCALE_MAX, CUSTOM_SCALE_MAX_CHARS, DEFAULT_SCALE_INDEX, SCALES, VRR_LABELS,
};
use crate::discovery::Mode;
use crate::rule::{MonitorRule, Transform};

const SCALE_MATCH_EPSILON: f64 = 0.001;

/// Outcome of one key in a picker
#[derive(Debug, Clone, PartialEq)]
pub enum PickerEvent<T> {
    Pending,
    Selected(T),
    Cancelled,
}

/// What the UI needs to draw any picker
pub trait PickerView {
    fn title(&self) -> &'static str;
    fn items(&self) -> Vec<String>;
    fn cursor(&self) -> usize;

    /// Extra lines shown under the list
    fn details(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Bounded cursor over a list of `len` entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListCursor {
    index: usize,
    len: usize,
}

impl ListCursor {
    pub fn new(len: usize, index: usize) -> Self {
        Self {
            index: index.min(len.saturating_sub(1)),
            len,
        }
    }

    pub fn index(self) -> usize {
        self.index
    }

    fn up(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    fn down(&mut self) {
        if self.index + 1 < self.len {
            self.index += 1;
        }
    }

    fn first(&mut self) {
        self.index = 0;
    }

    fn last(&mut self) {
        self.index = self.len.saturating_sub(1);
    }
}

pub(crate) fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c' | 'C'))
}

/// List navigation shared by every picker
enum ListKey {
    Moved,
    Commit,
    Cancel,
    Ignored,
}

fn list_key(cursor: &mut ListCursor, key: &KeyEvent) -> ListKey {
    if is_ctrl_c(key) {
        return ListKey::Cancel;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => cursor.up(),
        KeyCode::Down | KeyCode::Char('j') => cursor.down(),
        KeyCode::Home | KeyCode::Char('g') => cursor.first(),
        KeyCode::End | KeyCode::Char('G') => cursor.last(),
        KeyCode::Enter => return ListKey::Commit,
        KeyCode::Esc | KeyCode::Char('q') => return ListKey::Cancel,
        _ => return ListKey::Ignored,
    }
    ListKey::Moved
}

/// Scale picker with fixed presets and a free-form input mode
#[derive(Debug, Clone, PartialEq)]
pub struct ScalePicker {
    cursor: ListCursor,
    current: f64,
    physical: (u32, u32),
    custom: Option<String>,
}

impl ScalePicker {
    pub fn new(rule: &MonitorRule) -> Self {
        let index = SCALES
            .iter()
            .position(|s| (s - rule.scale).abs() < SCALE_MATCH_EPSILON)
            .unwrap_or(DEFAULT_SCALE_INDEX);
        Self {
            cursor: ListCursor::new(SCALES.len(), index),
            current: rule.scale,
            physical: (rule.width, rule.height),
            custom: None,
        }
    }

    /// Text typed so far, when in custom input mode
    pub fn custom_input(&self) -> Option<&str> {
        self.custom.as_deref()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerEvent<f64> {
        if is_ctrl_c(&key) {
            return PickerEvent::Cancelled;
        }
        if let Some(input) = self.custom.as_mut() {
            match key.code {
                KeyCode::Esc => self.custom = None,
                KeyCode::Enter => {
                    if let Some(scale) = parse_custom_scale(input) {
                        return PickerEvent::Selected(scale);
                    }
                }
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) if (c.is_ascii_digit() || c == '.') && input.len() < CUSTOM_SCALE_MAX_CHARS => {
                    input.push(c);
                }
                _ => {}
            }
            return PickerEvent::Pending;
        }

        match key.code {
            KeyCode::Char('c') => {
                self.custom = Some(String::new());
                return PickerEvent::Pending;
            }
            KeyCode::Char('1') => return PickerEvent::Selected(1.0),
            KeyCode::Char('2') => return PickerEvent::Selected(2.0),
            _ => {}
        }
        match list_key(&mut self.cursor, &key) {
            ListKey::Commit => PickerEvent::Selected(SCALES[self.cursor.index()]),
            ListKey::Cancel => PickerEvent::Cancelled,
            ListKey::Moved | ListKey::Ignored => PickerEvent::Pending,
        }
    }

    /// Scale the details line describes: the typed value or the highlighted preset
    fn preview_scale(&self) -> Option<f64> {
        match &self.custom {
            Some(input) => parse_custom_scale(input),
            None => Some(SCALES[self.cursor.index()]),
        }
    }
}

/// A positive scale no larger than the maximum, or nothing
pub fn parse_custom_scale(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s > 0.0 && *s <= CUSTOM_SCALE_MAX)
}

/// Logical size of a `width` x `height` output at `scale`
pub fn effective_size(width: u32, height: u32, scale: f64) -> (u32, u32) {
    ((f64::from(width) / scale) as u32, (f64::from(height) / scale) as u32)
}

impl PickerView for ScalePicker {
    fn title(&self) -> &'static str {
        "Scale"
    }

    fn items(&self) -> Vec<String> {
        SCALES
            .iter()
            .map(|&scale| {
                let mut label = format!("x{scale:.2}");
                if (scale - 1.0).abs() < SCALE_MATCH_EPSILON {
                    label.push_str(" (native)");
                }
                if (scale - self.current).abs() < SCALE_MATCH_EPSILON {
                    label.push_str(" (current)");
                }
                label
            })
            .collect()
    }

    fn cursor(&self) -> usize {
        self.cursor.index()
    }

    fn details(&self) -> Vec<String> {
        let (width, height) = self.physical;
        let mut lines = Vec::new();
        if let Some(input) = self.custom_input() {
            lines.push(format!("Custom: {input}_"));
        }
        match self.preview_scale() {
            Some(scale) => {
                let (ew, eh) = effective_size(width, height, scale);
                lines.push(format!("Physical: {width}x{height} -> Effective: {ew}x{eh}"));
            }
            None => lines.push(format!("Enter a scale in (0, {CUSTOM_SCALE_MAX:.0}]")),
        }
        lines.push(if self.custom.is_some() {
            "[Enter] Apply  [Esc] Back".to_string()
        } else {
            "[1] x1  [2] x2  [c] Custom".to_string()
        });
        lines
    }
}

/// Resolution and refresh picker over discovered modes
#[derive(Debug, Clone, PartialEq)]
pub struct ModePicker {
    modes: Vec<Mode>,
    cursor: ListCursor,
    current: Option<usize>,
}

impl ModePicker {
    pub fn new(modes: Vec<Mode>, rule: &MonitorRule) -> Self {
        let current = modes.iter().position(|m| {
            m.width == rule.width && m.height == rule.height && (m.refresh_rate - rule.refresh_rate).abs() < 0.5
        });
        Self {
            cursor: ListCursor::new(modes.len(), current.unwrap_or(0)),
            modes,
            current,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerEvent<Mode> {
        match list_key(&mut self.cursor, &key) {
            ListKey::Commit => match self.modes.get(self.cursor.index()) {
                Some(mode) => PickerEvent::Selected(*mode),
                None => PickerEvent::Cancelled,
            },
            ListKey::Cancel => PickerEvent::Cancelled,
            ListKey::Moved | ListKey::Ignored => PickerEvent::Pending,
        }
    }
}

impl PickerView for ModePicker {
    fn title(&self) -> &'static str {
        "Mode"
    }

    fn items(&self) -> Vec<String> {
        self.modes
            .iter()
            .enumerate()
            .map(|(i, mode)| match self.current {
                Some(current) if current == i => format!("{mode} (current)"),
                _ => mode.to_string(),
            })
            .collect()
    }

    fn cursor(&self) -> usize {
        self.cursor.index()
    }
}

/// Other outputs whose geometry can be copied
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorPicker {
    targets: Vec<String>,
    cursor: ListCursor,
}

impl MirrorPicker {
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            cursor: ListCursor::new(targets.len(), 0),
            targets,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerEvent<String> {
        match list_key(&mut self.cursor, &key) {
            ListKey::Commit => match self.targets.get(self.cursor.index()) {
                Some(target) => PickerEvent::Selected(target.clone()),
                None => PickerEvent::Cancelled,
            },
            ListKey::Cancel => PickerEvent::Cancelled,
            ListKey::Moved | ListKey::Ignored => PickerEvent::Pending,
        }
    }
}

impl PickerView for MirrorPicker {
    fn title(&self) -> &'static str {
        "Mirror"
    }

    fn items(&self) -> Vec<String> {
        self.targets.clone()
    }

    fn cursor(&self) -> usize {
        self.cursor.index()
    }

    fn details(&self) -> Vec<String> {
        vec!["Copies position and size".to_string()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformPicker {
    cursor: ListCursor,
}

impl TransformPicker {
    pub fn new(current: Transform) -> Self {
        Self {
            cursor: ListCursor::new(Transform::ALL.len(), usize::from(current.index())),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerEvent<Transform> {
        match list_key(&mut self.cursor, &key) {
            ListKey::Commit => PickerEvent::Selected(Transform::ALL[self.cursor.index()]),
            ListKey::Cancel => PickerEvent::Cancelled,
            ListKey::Moved | ListKey::Ignored => PickerEvent::Pending,
        }
    }
}

impl PickerView for TransformPicker {
    fn title(&self) -> &'static str {
        "Transform"
    }

    fn items(&self) -> Vec<String> {
        Transform::ALL.iter().map(|t| t.label().to_string()).collect()
    }

    fn cursor(&self) -> usize {
        self.cursor.index()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VrrPicker {
    cursor: ListCursor,
}

impl VrrPicker {
    pub fn new(current: bool) -> Self {
        Self {
            cursor: ListCursor::new(VRR_LABELS.len(), usize::from(current)),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerEvent<bool> {
        match list_key(&mut self.cursor, &key) {
            ListKey::Commit => PickerEvent::Selected(self.cursor.index() == 1),
            ListKey::Cancel => PickerEvent::Cancelled,
            ListKey::Moved | ListKey::Ignored => PickerEvent::Pending,
        }
    }
}

impl PickerView for VrrPicker {
    fn title(&self) -> &'static str {
        "Variable Refresh Rate"
    }

    fn items(&self) -> Vec<String> {
        VRR_LABELS.iter().map(|label| label.to_string()).collect()
    }

    fn cursor(&self) -> usize {
        self.cursor.index()
    }
}
