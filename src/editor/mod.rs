//! Editor state machine
//!
//! The editor owns the rule map and every piece of interactive state. One key
//! event is fully applied, including any save, before the next is handled.
//! At most one picker is open at a time and it lives inside [`EditorState`].

pub mod pickers;

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, error, info, warn};

use crate::config::{AppPrefs, ConfigStore, GridStep, PrefsStore};
use crate::constants::footer::KEY_BINDINGS;
use crate::discovery::{Output, OutputSource};
use crate::error::{SaveError, StoreError};
use crate::rule::{MonitorRule, RuleMap};

use pickers::{
    is_ctrl_c, MirrorPicker, ModePicker, PickerEvent, PickerView, ScalePicker, TransformPicker,
    VrrPicker,
};

/// Multiplier for Shift-moves
const FAST_MOVE_FACTOR: i32 = 10;

/// Which screen has the keyboard
#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Grid,
    Scale(ScalePicker),
    Mode(ModePicker),
    Mirror(MirrorPicker),
    Transform(TransformPicker),
    Vrr(VrrPicker),
}

impl EditorState {
    pub fn picker(&self) -> Option<&dyn PickerView> {
        match self {
            EditorState::Grid => None,
            EditorState::Scale(p) => Some(p),
            EditorState::Mode(p) => Some(p),
            EditorState::Mirror(p) => Some(p),
            EditorState::Transform(p) => Some(p),
            EditorState::Vrr(p) => Some(p),
        }
    }
}

/// Whether the event loop keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Result of the last save, shown in the footer
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Saved(PathBuf),
    Error(String),
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

pub struct Editor {
    rules: RuleMap,
    outputs: Vec<Output>,
    selected: Option<String>,
    grid_step: GridStep,
    state: EditorState,
    status: Status,
    store: ConfigStore,
    prefs: PrefsStore,
    source: Box<dyn OutputSource>,
}

impl Editor {
    /// Load rules, discover outputs, seed missing rules and restore preferences
    pub fn bootstrap(
        mut store: ConfigStore,
        prefs: PrefsStore,
        source: Box<dyn OutputSource>,
    ) -> Result<Self, StoreError> {
        let mut rules = store.parse()?;
        let outputs = source.outputs();

        for output in &outputs {
            if !rules.contains(&output.name) {
                debug!(output = %output.name, "Seeding default rule");
                rules.insert(MonitorRule::seeded(output.name.clone()));
            }
        }

        let grid_step = match prefs.load() {
            Ok(loaded) => loaded.grid_step(),
            Err(e) => {
                warn!(error = %e, "Failed to load preferences, using defaults");
                GridStep::default()
            }
        };

        if rules.is_empty() {
            warn!("No rules and no outputs, nothing to arrange");
        }

        let selected = outputs.first().map(|output| output.name.clone());
        info!(
            rules = rules.len(),
            outputs = outputs.len(),
            selected = ?selected,
            grid_step = grid_step.pixels(),
            "Editor ready"
        );

        Ok(Self {
            rules,
            outputs,
            selected,
            grid_step,
            state: EditorState::Grid,
            status: Status::Idle,
            store,
            prefs,
            source,
        })
    }

    pub fn rules(&self) -> &RuleMap {
        &self.rules
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn grid_step(&self) -> GridStep {
        self.grid_step
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn footer(&self) -> String {
        match &self.status {
            Status::Idle => KEY_BINDINGS.to_string(),
            Status::Saved(path) => format!("Saved {}", path.display()),
            Status::Error(message) => format!("Error: {message}"),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Flow {
        match std::mem::replace(&mut self.state, EditorState::Grid) {
            EditorState::Grid => return self.handle_grid_key(key),
            EditorState::Scale(mut picker) => match picker.handle_key(key) {
                PickerEvent::Pending => self.state = EditorState::Scale(picker),
                PickerEvent::Selected(scale) => self.edit_selected(|rule| rule.scale = scale),
                PickerEvent::Cancelled => {}
            },
            EditorState::Mode(mut picker) => match picker.handle_key(key) {
                PickerEvent::Pending => self.state = EditorState::Mode(picker),
                PickerEvent::Selected(mode) => self.edit_selected(|rule| {
                    rule.width = mode.width;
                    rule.height = mode.height;
                    rule.refresh_rate = mode.refresh_rate;
                }),
                PickerEvent::Cancelled => {}
            },
            EditorState::Mirror(mut picker) => match picker.handle_key(key) {
                PickerEvent::Pending => self.state = EditorState::Mirror(picker),
                PickerEvent::Selected(target) => match self.rules.get(&target).cloned() {
                    Some(target) => self.edit_selected(|rule| rule.mirror(&target)),
                    None => warn!(target = %target, "Mirror target has no rule"),
                },
                PickerEvent::Cancelled => {}
            },
            EditorState::Transform(mut picker) => match picker.handle_key(key) {
                PickerEvent::Pending => self.state = EditorState::Transform(picker),
                PickerEvent::Selected(transform) => self.edit_selected(|rule| rule.transform = transform),
                PickerEvent::Cancelled => {}
            },
            EditorState::Vrr(mut picker) => match picker.handle_key(key) {
                PickerEvent::Pending => self.state = EditorState::Vrr(picker),
                PickerEvent::Selected(vrr) => self.edit_selected(|rule| rule.vrr = vrr),
                PickerEvent::Cancelled => {}
            },
        }
        Flow::Continue
    }

    fn handle_grid_key(&mut self, key: KeyEvent) -> Flow {
        if is_ctrl_c(&key) {
            return Flow::Quit;
        }
        self.status = Status::Idle;

        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let step = i32::try_from(self.grid_step.pixels()).unwrap_or(i32::MAX);
        let fast = step.saturating_mul(FAST_MOVE_FACTOR);

        match key.code {
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Tab => self.select_next(),

            KeyCode::Left if shift => self.nudge(Axis::X, -fast),
            KeyCode::Right if shift => self.nudge(Axis::X, fast),
            KeyCode::Up if shift => self.nudge(Axis::Y, -fast),
            KeyCode::Down if shift => self.nudge(Axis::Y, fast),
            KeyCode::Char('H') => self.nudge(Axis::X, -fast),
            KeyCode::Char('L') => self.nudge(Axis::X, fast),
            KeyCode::Char('K') => self.nudge(Axis::Y, -fast),
            KeyCode::Char('J') => self.nudge(Axis::Y, fast),
            KeyCode::Left | KeyCode::Char('h') => self.nudge(Axis::X, -step),
            KeyCode::Right | KeyCode::Char('l') => self.nudge(Axis::X, step),
            KeyCode::Up | KeyCode::Char('k') => self.nudge(Axis::Y, -step),
            KeyCode::Down | KeyCode::Char('j') => self.nudge(Axis::Y, step),

            KeyCode::Char('g' | 'G') => {
                self.grid_step = self.grid_step.next();
                debug!(grid_step = self.grid_step.pixels(), "Grid step changed");
            }

            KeyCode::Char('r' | 'R') => self.open_picker(|_, rule| EditorState::Scale(ScalePicker::new(rule))),
            KeyCode::Char('f' | 'F') => self.open_picker(|editor, rule| {
                EditorState::Mode(ModePicker::new(editor.source.modes(&rule.id), rule))
            }),
            KeyCode::Char('m' | 'M') => self.open_picker(|editor, rule| {
                let targets = editor
                    .outputs
                    .iter()
                    .map(|output| output.name.clone())
                    .filter(|name| *name != rule.id)
                    .collect();
                EditorState::Mirror(MirrorPicker::new(targets))
            }),
            KeyCode::Char('t' | 'T') => {
                self.open_picker(|_, rule| EditorState::Transform(TransformPicker::new(rule.transform)))
            }
            KeyCode::Char('v' | 'V') => self.open_picker(|_, rule| EditorState::Vrr(VrrPicker::new(rule.vrr))),

            KeyCode::Char('s' | 'S') => self.save(),
            _ => {}
        }
        Flow::Continue
    }

    /// Next output in discovery order, wrapping
    fn select_next(&mut self) {
        let current = self
            .selected
            .as_deref()
            .and_then(|id| self.outputs.iter().position(|output| output.name == id));
        let next = match current {
            Some(i) => (i + 1) % self.outputs.len(),
            None => 0,
        };
        if let Some(output) = self.outputs.get(next) {
            self.selected = Some(output.name.clone());
        }
    }

    fn nudge(&mut self, axis: Axis, delta: i32) {
        self.edit_selected(|rule| match axis {
            Axis::X => rule.x = rule.x.saturating_add(delta),
            Axis::Y => rule.y = rule.y.saturating_add(delta),
        });
    }

    /// Open a picker seeded from the selected rule; no-op without a selection
    fn open_picker(&mut self, build: impl FnOnce(&Self, &MonitorRule) -> EditorState) {
        let Some(rule) = self.selected.as_deref().and_then(|id| self.rules.get(id)) else {
            debug!("No selected rule, picker not opened");
            return;
        };
        self.state = build(self, rule);
    }

    fn edit_selected(&mut self, edit: impl FnOnce(&mut MonitorRule)) {
        if let Some(id) = self.selected.as_deref() {
            self.rules.update(id, edit);
        }
    }

    fn save(&mut self) {
        self.status = match self.commit() {
            Ok(()) => {
                info!(
                    path = %self.store.path().display(),
                    prefs = %self.prefs.path().display(),
                    rules = self.rules.len(),
                    "Saved monitor rules"
                );
                Status::Saved(self.store.path().to_path_buf())
            }
            Err(e) => {
                error!(error = %e, "Save failed");
                Status::Error(e.to_string())
            }
        };
    }

    /// Preferences first, then the monitor config whatever the preferences did
    ///
    /// A config failure is reported ahead of a preferences failure.
    fn commit(&mut self) -> Result<(), SaveError> {
        let prefs = self.prefs.save(&AppPrefs::from_grid_step(self.grid_step));
        if let Err(e) = &prefs {
            warn!(path = %self.prefs.path().display(), error = %e, "Failed to save preferences");
        }
        self.store.save(&self.rules.to_vec())?;
        prefs?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::discovery::Mode;
    use crate::grid::GridRenderer;
    use crate::rule::Transform;

    struct FakeOutputs {
        outputs: Vec<&'static str>,
        modes: Vec<Mode>,
    }

    impl OutputSource for FakeOutputs {
        fn outputs(&self) -> Vec<Output> {
            self.outputs.iter().map(|name| Output::new(*name)).collect()
        }

        fn modes(&self, _output: &str) -> Vec<Mode> {
            self.modes.clone()
        }
    }

    fn editor_in(dir: &Path, config: Option<&str>, outputs: Vec<&'static str>) -> Editor {
        let config_path = dir.join("config.conf");
        if let Some(contents) = config {
            fs::write(&config_path, contents).unwrap();
        }
        let source = FakeOutputs {
            outputs,
            modes: vec![Mode::new(2560, 1440, 144.0), Mode::new(1920, 1080, 60.0)],
        };
        Editor::bootstrap(
            ConfigStore::open(config_path),
            PrefsStore::new(dir.join("prefs").join("state.json")),
            Box::new(source),
        )
        .unwrap()
    }

    fn press(editor: &mut Editor, code: KeyCode) -> Flow {
        editor.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_keys(editor: &mut Editor, keys: &str) {
        for c in keys.chars() {
            let modifiers = if c.is_ascii_uppercase() {
                KeyModifiers::SHIFT
            } else {
                KeyModifiers::NONE
            };
            editor.handle_key(KeyEvent::new(KeyCode::Char(c), modifiers));
        }
    }

    const PRESERVE_INPUT: &str = "# header
monitorrule=name:eDP-1,width:1920,height:1080,refresh:60,x:0,y:0,scale:1.00,vrr:0,rr:0
some_other_setting=42
monitorrule=name:HDMI-A-1,width:3840,height:2160,refresh:60,x:1920,y:0,scale:2.00,vrr:0,rr:0
";

    #[test]
    fn test_empty_start_seeds_and_saves_discovered_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1", "HDMI-A-1"]);

        let ids: Vec<&str> = editor.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["eDP-1", "HDMI-A-1"]);
        for rule in editor.rules().iter() {
            assert_eq!(*rule, MonitorRule::seeded(rule.id.clone()));
        }
        assert_eq!(editor.selected(), Some("eDP-1"));

        type_keys(&mut editor, "s");
        let written = fs::read_to_string(dir.path().join("config.conf")).unwrap();
        assert_eq!(
            written,
            "monitorrule=name:eDP-1,width:1920,height:1080,refresh:60,x:0,y:0,scale:1.00,vrr:0,rr:0\n\
             monitorrule=name:HDMI-A-1,width:1920,height:1080,refresh:60,x:0,y:0,scale:1.00,vrr:0,rr:0\n"
        );
        assert!(editor.footer().starts_with("Saved "));
    }

    #[test]
    fn test_move_and_save_preserves_other_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), Some(PRESERVE_INPUT), vec!["eDP-1", "HDMI-A-1"]);

        press(&mut editor, KeyCode::Tab);
        assert_eq!(editor.selected(), Some("HDMI-A-1"));

        // step 8, shift-right moves 80
        type_keys(&mut editor, "gL");
        // back to step 1, ten shift-downs move 100
        type_keys(&mut editor, "gggg");
        assert_eq!(editor.grid_step().pixels(), 1);
        type_keys(&mut editor, "JJJJJJJJJJ");
        type_keys(&mut editor, "s");

        let written = fs::read_to_string(dir.path().join("config.conf")).unwrap();
        let expected = PRESERVE_INPUT.replace("x:1920,y:0,scale:2.00", "x:2000,y:100,scale:2.00");
        assert_eq!(written, expected);

        let prefs = fs::read_to_string(dir.path().join("prefs").join("state.json")).unwrap();
        assert!(prefs.contains("\"grid_size\": 1"));
    }

    #[test]
    fn test_grid_step_cycle_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        let mut seen = Vec::new();
        for _ in 0..5 {
            type_keys(&mut editor, "g");
            seen.push(editor.grid_step().pixels());
        }
        assert_eq!(seen, vec![8, 16, 32, 64, 1]);
    }

    #[test]
    fn test_arrow_moves_use_grid_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        type_keys(&mut editor, "g");
        press(&mut editor, KeyCode::Right);
        type_keys(&mut editor, "k");
        editor.handle_key(KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT));

        let rule = editor.rules().get("eDP-1").unwrap();
        assert_eq!((rule.x, rule.y), (8 - 80, -8));
    }

    #[test]
    fn test_tab_cycles_in_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["DP-2", "DP-1", "eDP-1"]);
        let mut seen = Vec::new();
        for _ in 0..3 {
            press(&mut editor, KeyCode::Tab);
            seen.push(editor.selected().unwrap().to_string());
        }
        assert_eq!(seen, vec!["DP-1", "eDP-1", "DP-2"]);
    }

    #[test]
    fn test_scale_quick_key_commits() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1", "HDMI-A-1"]);

        type_keys(&mut editor, "r");
        assert!(matches!(editor.state(), EditorState::Scale(_)));
        type_keys(&mut editor, "2");

        assert_eq!(*editor.state(), EditorState::Grid);
        assert_eq!(editor.rules().get("eDP-1").unwrap().scale, 2.0);
        assert_eq!(editor.rules().get("HDMI-A-1").unwrap().scale, 1.0);

        let frame = GridRenderer::default().render(editor.rules(), editor.selected(), editor.grid_step(), 160, 50);
        assert!(frame.canvas.lines().iter().any(|line| line.contains("x2.00")));
    }

    #[test]
    fn test_mirror_copies_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let config = "monitorrule=name:A,width:1920,height:1080,refresh:60,x:0,y:0,scale:1.00,vrr:0,rr:0
monitorrule=name:B,width:2560,height:1440,refresh:144,x:100,y:200,scale:1.00,vrr:0,rr:0
";
        let mut editor = editor_in(dir.path(), Some(config), vec!["A", "B"]);
        let a_before = editor.rules().get("A").unwrap().clone();

        press(&mut editor, KeyCode::Tab);
        type_keys(&mut editor, "m");
        match editor.state() {
            EditorState::Mirror(picker) => assert_eq!(picker.items(), vec!["A".to_string()]),
            other => panic!("expected mirror picker, got {other:?}"),
        }
        press(&mut editor, KeyCode::Enter);

        let b = editor.rules().get("B").unwrap();
        assert_eq!((b.x, b.y, b.width, b.height), (0, 0, 1920, 1080));
        assert_eq!(b.refresh_rate, 144.0);
        assert_eq!(*editor.rules().get("A").unwrap(), a_before);
        assert_eq!(editor.selected(), Some("B"));
    }

    #[test]
    fn test_mode_picker_applies_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        type_keys(&mut editor, "f");
        type_keys(&mut editor, "g");
        press(&mut editor, KeyCode::Enter);

        let rule = editor.rules().get("eDP-1").unwrap();
        assert_eq!((rule.width, rule.height, rule.refresh_rate), (2560, 1440, 144.0));
    }

    #[test]
    fn test_transform_and_vrr_commit() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        type_keys(&mut editor, "tjj");
        press(&mut editor, KeyCode::Enter);
        type_keys(&mut editor, "vj");
        press(&mut editor, KeyCode::Enter);

        let rule = editor.rules().get("eDP-1").unwrap();
        assert_eq!(rule.transform, Transform::Rotate180);
        assert!(rule.vrr);
    }

    #[test]
    fn test_transform_cancel_leaves_rule() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        type_keys(&mut editor, "tjj");
        press(&mut editor, KeyCode::Esc);

        assert_eq!(*editor.state(), EditorState::Grid);
        assert_eq!(editor.rules().get("eDP-1").unwrap().transform, Transform::Normal);
    }

    #[test]
    fn test_cancel_from_every_picker_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = "monitorrule=name:A,width:1920,height:1080,refresh:60,x:0,y:0,scale:1.00,vrr:0,rr:0\n";
        let cancels = [
            KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE),
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ];

        for opener in ['r', 'f', 'm', 't', 'v'] {
            for cancel in cancels {
                let mut editor = editor_in(dir.path(), Some(config), vec!["A", "B"]);
                let before = editor.rules().to_vec();

                type_keys(&mut editor, &opener.to_string());
                assert_ne!(*editor.state(), EditorState::Grid, "picker {opener} did not open");
                type_keys(&mut editor, "j");
                assert_eq!(editor.handle_key(cancel), Flow::Continue);

                assert_eq!(*editor.state(), EditorState::Grid);
                assert_eq!(editor.rules().to_vec(), before);
                assert_eq!(editor.selected(), Some("A"));
            }
        }
    }

    #[test]
    fn test_custom_scale_stays_open_until_valid() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        type_keys(&mut editor, "rc20");
        press(&mut editor, KeyCode::Enter);
        assert!(matches!(editor.state(), EditorState::Scale(p) if p.custom_input() == Some("20")));

        press(&mut editor, KeyCode::Backspace);
        type_keys(&mut editor, ".5");
        press(&mut editor, KeyCode::Enter);
        assert_eq!(*editor.state(), EditorState::Grid);
        assert_eq!(editor.rules().get("eDP-1").unwrap().scale, 2.5);
    }

    #[test]
    fn test_quit_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        assert_eq!(press(&mut editor, KeyCode::Char('q')), Flow::Quit);
        assert_eq!(
            editor.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Flow::Quit
        );
        // Quitting never saves implicitly
        assert!(!dir.path().join("config.conf").exists());
    }

    #[test]
    fn test_save_error_is_reported_in_footer() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        // A directory where the config file should be
        fs::create_dir(dir.path().join("config.conf")).unwrap();

        type_keys(&mut editor, "s");
        assert!(matches!(editor.status(), Status::Error(_)));
        assert!(editor.footer().starts_with("Error: "));
        assert_eq!(*editor.state(), EditorState::Grid);

        type_keys(&mut editor, "g");
        assert_eq!(editor.footer(), KEY_BINDINGS);
    }

    #[test]
    fn test_config_is_saved_when_prefs_cannot_be() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, vec!["eDP-1"]);
        // A regular file where the prefs directory should be
        fs::write(dir.path().join("prefs"), "").unwrap();

        type_keys(&mut editor, "ls");

        let written = fs::read_to_string(dir.path().join("config.conf")).unwrap();
        assert!(written.contains("name:eDP-1,width:1920,height:1080,refresh:60,x:1,y:0,"));
        assert!(matches!(editor.status(), Status::Error(_)));
        assert!(editor.footer().contains("preferences"));
    }

    #[test]
    fn test_no_outputs_means_no_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor_in(dir.path(), None, Vec::new());
        assert_eq!(editor.selected(), None);
        type_keys(&mut editor, "rl");
        press(&mut editor, KeyCode::Tab);
        assert_eq!(*editor.state(), EditorState::Grid);
        assert!(editor.rules().is_empty());
    }
}
