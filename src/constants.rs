//! Application-wide constants
//!
//! Every magic number and string literal used by the editor lives here,
//! grouped by the part of the program that consumes it.

/// Monitor config file constants
pub mod config {
    /// Literal that starts every monitor rule line (after leading whitespace)
    pub const RULE_MARKER: &str = "monitorrule=";

    /// Separator between rule fields
    pub const FIELD_SEPARATOR: char = ',';

    /// Separator between a key and its value in the keyed rule form
    pub const KEY_VALUE_SEPARATOR: char = ':';

    /// Default config location, relative to the user's home directory
    pub const DEFAULT_RELATIVE_PATH: &str = ".config/mango/config.conf";

    /// Minimum field count of a legacy positional rule line
    pub const POSITIONAL_FIELD_COUNT: usize = 11;
}

/// Editor preferences (AppPrefs) storage
pub mod prefs {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "mangomon";

    /// Preferences file name
    pub const FILENAME: &str = "state.json";

    /// Grid step values in cycling order
    pub const GRID_STEPS: [u32; 5] = [1, 8, 16, 32, 64];
}

/// Defaults for outputs that have no rule in the config file yet
pub mod seed {
    pub const WIDTH: u32 = 1920;
    pub const HEIGHT: u32 = 1080;
    pub const REFRESH: f64 = 60.0;
    pub const SCALE: f64 = 1.0;
}

/// Output and mode discovery
pub mod discovery {
    use std::time::Duration;

    /// Helper program that prints one output per line
    pub const OUTPUT_HELPER: &str = "mmsg";

    /// Argument asking the helper for its output list
    pub const OUTPUT_HELPER_ARG: &str = "-O";

    /// Upper bound on how long the helper may run
    pub const HELPER_TIMEOUT: Duration = Duration::from_secs(2);

    /// Kernel directory holding one entry per connector
    pub const DRM_ROOT: &str = "/sys/class/drm";

    /// File inside a connector entry listing `WxH` modes
    pub const MODES_FILE: &str = "modes";

    /// Refresh rate given to every mode read from the kernel
    pub const BASE_RATE: f64 = 60.0;

    /// Modes at least this wide also get the high refresh rates below
    pub const HIGH_RATE_MIN_WIDTH: u32 = 1920;

    /// Extra refresh rates synthesized for wide modes
    pub const HIGH_RATES: [f64; 4] = [120.0, 144.0, 165.0, 240.0];

    /// Outputs used when the helper cannot be run
    pub const FALLBACK_OUTPUTS: [&str; 2] = ["eDP-1", "HDMI-A-1"];

    /// Modes used when the kernel cannot be read (width, height, rate)
    pub const FALLBACK_MODES: [(u32, u32, f64); 7] = [
        (3840, 2160, 144.0),
        (3840, 2160, 60.0),
        (2560, 1440, 165.0),
        (2560, 1440, 144.0),
        (2560, 1440, 60.0),
        (1920, 1080, 144.0),
        (1920, 1080, 60.0),
    ];
}

/// Grid projection and drawing
pub mod grid {
    /// World bounds used when there are no rules (min_x, min_y, max_x, max_y)
    pub const EMPTY_BOUNDS: (i64, i64, i64, i64) = (0, 0, 1920, 1080);

    /// Total world units added around the content on each axis (half per side)
    pub const VIEW_PADDING: i64 = 3000;

    /// Height of a terminal cell relative to its width
    pub const TERM_ASPECT: f64 = 2.2;

    /// Rows reserved outside the drawing area (header + footer)
    pub const RESERVED_ROWS: u16 = 2;

    /// The drawing area never gets fewer rows than this
    pub const MIN_RENDER_ROWS: usize = 10;

    /// Smallest box that can still hold its labels
    pub const MIN_BOX_WIDTH: i64 = 6;
    pub const MIN_BOX_HEIGHT: i64 = 4;

    /// Scale labels are only shown when scale differs from 1.0 by more than this
    pub const SCALE_LABEL_EPSILON: f64 = 0.01;
}

/// Picker option lists
pub mod pickers {
    pub const SCALES: [f64; 9] = [0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0, 2.5, 3.0];

    /// Cursor position when the current scale is not a listed option (1.0)
    pub const DEFAULT_SCALE_INDEX: usize = 2;

    /// Custom scale input limits
    pub const CUSTOM_SCALE_MAX_CHARS: usize = 5;
    pub const CUSTOM_SCALE_MAX: f64 = 10.0;

    pub const VRR_LABELS: [&str; 2] = ["Disabled (0)", "Enabled (1)"];
}

/// Log file location
pub mod logging {
    pub const APP_DIR: &str = "mangomon";
    pub const FILENAME: &str = "mangomon.log";
}

/// Footer text
pub mod footer {
    pub const KEY_BINDINGS: &str = "[Tab] Cycle  [Arrows] Move  [G] Grid  [R] Scale  [F] Mode  [T] Transform  [V] VRR  [M] Mirror  [S] Save  [Q] Quit";
}
