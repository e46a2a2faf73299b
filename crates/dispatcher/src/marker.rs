//! Marker framing over the pane's unstructured text stream.
//!
//! A job's marker line is typed into the pane just before its command. After
//! the wait window, the output attributed to the job is everything after the
//! last occurrence of that marker in the capture.

const MARKER_PREFIX: &str = "<<<BRIDGE_START id=";
const MARKER_SUFFIX: &str = ">>>";

/// The delimiter line for job `id`.
///
/// Marker text is not escaped; a command that itself prints another job's
/// marker will confuse extraction for that job.
pub fn marker_for(id: &str) -> String {
    format!("{}{}{}", MARKER_PREFIX, id, MARKER_SUFFIX)
}

/// Output attributed to one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub output: String,
    /// False when the marker had scrolled out, been cleared, or not yet been
    /// echoed; `output` is then the whole capture.
    pub marker_found: bool,
}

/// Slice `capture` after the last `marker`, trimmed. Falls back to the whole
/// capture, trimmed, when the marker is absent.
pub fn extract(capture: &str, marker: &str) -> Extraction {
    match capture.rfind(marker) {
        Some(idx) => Extraction {
            output: capture[idx + marker.len()..].trim().to_string(),
            marker_found: true,
        },
        None => Extraction {
            output: capture.trim().to_string(),
            marker_found: false,
        },
    }
}
