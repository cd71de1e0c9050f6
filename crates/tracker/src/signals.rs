//! Input signals — the explicit subscription surface between the
//! embedding host and the tracker.
//!
//! The host translates whatever input technology it has (DOM listeners,
//! a test harness, a replay log) into these values; the tracker never
//! touches a rendering layer. Serializable so sessions can be recorded
//! and replayed.

use serde::{Deserialize, Serialize};
use studylens_core::types::ExitType;

use crate::sections::SectionMeta;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum InputSignal {
    Click {
        x: f64,
        y: f64,
        element_id: Option<String>,
        element_type: Option<String>,
        element_text: Option<String>,
    },
    Scroll {
        position: f64,
        viewport_height: f64,
        depth_percent: u8,
    },
    Hover {
        element_id: Option<String>,
        element_type: Option<String>,
        element_text: Option<String>,
    },
    MouseMove {
        x: f64,
        y: f64,
    },
    VisibilityChanged {
        visible: bool,
    },
    CopyText {
        text: String,
    },
    KeyPress {
        key: String,
        ctrl: bool,
    },
    FlashcardFlip {
        element_id: String,
        front_text: Option<String>,
    },
    NodeToggle {
        element_id: String,
        element_text: Option<String>,
        expanding: bool,
    },
    TabChange {
        element_id: String,
        tab_name: String,
    },
    /// The closest-visible tracked section changed.
    SectionChange {
        section: SectionMeta,
    },
    /// Node-registration callback from the rendering component; fired
    /// every time a node is (re)created, credited at most once.
    NodeRegistered {
        node_id: String,
        display_text: Option<String>,
    },
    /// Explicit end action. The runtime loop terminates on it.
    EndSession {
        exit_type: ExitType,
    },
}

/// Map a key press to a tracked shortcut, if it is one.
pub(crate) fn shortcut_action(key: &str, ctrl: bool) -> Option<(&'static str, &'static str)> {
    let key = key.to_ascii_lowercase();
    match (ctrl, key.as_str()) {
        (true, "f") => Some(("ctrl+f", "search")),
        (true, "c") => Some(("ctrl+c", "copy")),
        (false, "f11") => Some(("f11", "fullscreen")),
        _ => None,
    }
}
