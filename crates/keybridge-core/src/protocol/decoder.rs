//! Line decoder: classifies one raw serial line into exactly one [`Event`].
//!
//! The device is a tiny microcontroller that prints human-readable status
//! lines.  Classification is done by an ordered table of independent
//! matchers ([`MATCHERS`]).  Each matcher looks for its pattern *anywhere* in
//! the line, and the first matcher that accepts the line wins:
//!
//! | # | Pattern                              | Event              |
//! |---|--------------------------------------|--------------------|
//! | 1 | `Selected: [<ch>] \| Mode: <mode>`   | `Selection`        |
//! | 2 | `Confirmed:<ws><optional text>`      | `Confirmed`        |
//! | 3 | `ESC pressed`                        | `Escape`           |
//! | 4 | `Backspace`                          | `Backspace`        |
//! | 5 | `Space inserted`                     | `SpaceInserted`    |
//! | 6 | `Enter`                              | `Enter`            |
//! | 7 | `Mode switched to:<ws><mode>`        | `ModeChanged`      |
//! | - | anything else                        | `Unknown`          |
//!
//! The patterns are not disjoint (`"Mode switched to: Enter"` contains
//! `Enter`), so the order of the table is part of the protocol.
//!
//! Captured text never spans a `'\n'`; lines produced by the serial reader
//! are already split and trimmed, so this only matters for direct callers.

use super::event::Event;

/// One entry of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct LineMatcher {
    /// Stable name of the pattern, for diagnostics.
    pub name: &'static str,
    /// Returns `Some(event)` if the pattern occurs in the line.
    pub matches: fn(&str) -> Option<Event>,
}

/// The classification table, in precedence order.
pub const MATCHERS: &[LineMatcher] = &[
    LineMatcher { name: "selection", matches: match_selection },
    LineMatcher { name: "confirmed", matches: match_confirmed },
    LineMatcher { name: "esc", matches: match_escape },
    LineMatcher { name: "backspace", matches: match_backspace },
    LineMatcher { name: "space", matches: match_space_inserted },
    LineMatcher { name: "enter", matches: match_enter },
    LineMatcher { name: "mode_change", matches: match_mode_switched },
];

const SELECTED_PREFIX: &str = "Selected: [";
const SELECTED_INFIX: &str = "] | Mode: ";
const CONFIRMED_PREFIX: &str = "Confirmed:";
const MODE_SWITCHED_PREFIX: &str = "Mode switched to:";

/// Decodes a raw line into an [`Event`].
///
/// Total: a line that no matcher accepts becomes [`Event::Unknown`] carrying
/// the line verbatim.
///
/// # Examples
///
/// ```rust
/// use keybridge_core::{decode, Event};
///
/// assert_eq!(
///     decode("Selected: [A] | Mode: Letters"),
///     Event::Selection { char: 'A', mode: "Letters".to_string() },
/// );
/// assert_eq!(decode("Confirmed:"), Event::Confirmed { char: " ".to_string() });
/// ```
pub fn decode(line: &str) -> Event {
    MATCHERS
        .iter()
        .find_map(|m| (m.matches)(line))
        .unwrap_or_else(|| Event::Unknown { raw: line.to_string() })
}

// ── Matchers ──────────────────────────────────────────────────────────────────

fn match_selection(line: &str) -> Option<Event> {
    line.match_indices(SELECTED_PREFIX).find_map(|(idx, _)| {
        let after = &line[idx + SELECTED_PREFIX.len()..];
        let ch = after.chars().next().filter(|&c| c != '\n')?;
        let mode = until_newline(after[ch.len_utf8()..].strip_prefix(SELECTED_INFIX)?);
        if mode.is_empty() {
            return None;
        }
        Some(Event::Selection { char: ch, mode: mode.to_string() })
    })
}

fn match_confirmed(line: &str) -> Option<Event> {
    let idx = line.find(CONFIRMED_PREFIX)?;
    let text = capture_after_whitespace(&line[idx + CONFIRMED_PREFIX.len()..], false)?;
    // An empty commit means "space"; injection back-ends treat "" and " "
    // differently, so normalize here.
    let payload = if text.is_empty() { " " } else { text };
    Some(Event::Confirmed { char: payload.to_string() })
}

fn match_escape(line: &str) -> Option<Event> {
    line.contains("ESC pressed").then_some(Event::Escape)
}

fn match_backspace(line: &str) -> Option<Event> {
    line.contains("Backspace").then_some(Event::Backspace)
}

fn match_space_inserted(line: &str) -> Option<Event> {
    line.contains("Space inserted").then_some(Event::SpaceInserted)
}

fn match_enter(line: &str) -> Option<Event> {
    line.contains("Enter").then_some(Event::Enter)
}

fn match_mode_switched(line: &str) -> Option<Event> {
    line.match_indices(MODE_SWITCHED_PREFIX).find_map(|(idx, _)| {
        let mode = capture_after_whitespace(&line[idx + MODE_SWITCHED_PREFIX.len()..], true)?;
        Some(Event::ModeChanged { mode: mode.to_string() })
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Returns `s` up to (not including) the first `'\n'`.
fn until_newline(s: &str) -> &str {
    s.split('\n').next().unwrap_or("")
}

/// Skips a run of leading whitespace and captures the rest of the line.
///
/// When `non_empty` is set and nothing follows the whitespace, the run is
/// given back one character at a time so that the capture can start inside
/// it (`"Mode switched to:  "` captures `" "`).
fn capture_after_whitespace(rest: &str, non_empty: bool) -> Option<&str> {
    let ws_end = rest.len() - rest.trim_start().len();
    let starts = rest[..ws_end]
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(ws_end))
        .rev();

    for start in starts {
        let capture = until_newline(&rest[start..]);
        if !non_empty || !capture.is_empty() {
            return Some(capture);
        }
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
