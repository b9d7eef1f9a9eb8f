//! Conversion state threaded through every line transform
//!
//! One `ConversionState` exists per document conversion. It is owned by a
//! single conversion run and discarded at the end; only the `defverbs`
//! table accumulates across the whole document, everything else tracks the
//! frame/list/environment context of the current position.

use indexmap::IndexMap;
use std::collections::HashMap;

/// Mutable state for one document conversion.
#[derive(Debug, Default)]
pub struct ConversionState {
    /// Is a Beamer frame currently open
    pub frame_opened: bool,
    /// Current list nesting as a sequence of `*`/`#` markers; empty = no list
    pub enum_item_level: String,
    /// Header/footer injected into the currently open frame
    pub frame_header: String,
    pub frame_footer: String,
    /// Pending header/footer, activated when the next frame opens.
    /// Double-buffered so a directive on the same line as a heading applies
    /// to the new frame, not retroactively to the previous one.
    pub next_frame_header: String,
    pub next_frame_footer: String,
    /// Index of the most recently appended non-code output line. Tracked
    /// by the driver but not consumed anywhere yet; nothing reads it.
    pub current_line: usize,
    /// Whether an autotemplate block emitted the document opening
    pub autotemplate_opened: bool,
    /// Verbatim name -> rendered defverbatim block, in insertion order.
    /// Flushed once into the output at `code_pos`.
    pub defverbs: IndexMap<String, String>,
    /// Output index where the accumulated defverbs get spliced in
    pub code_pos: usize,
    /// Open-count per named environment; suppresses some inline rewrites
    /// (e.g. colors inside `equation`). The pseudo-environment `frame` is
    /// never tracked here.
    pub active_envs: HashMap<String, usize>,
}

impl ConversionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate the pending header/footer for a newly opened frame.
    pub fn switch_to_next_frame(&mut self) {
        self.frame_header = self.next_frame_header.clone();
        self.frame_footer = self.next_frame_footer.clone();
    }

    /// Record an environment opening (except `frame`).
    pub fn open_env(&mut self, name: &str) {
        if name != "frame" {
            *self.active_envs.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    /// Record an environment closing. Unmatched closes are ignored, the
    /// user takes full responsibility for balancing their environments.
    pub fn close_env(&mut self, name: &str) {
        if name == "frame" {
            return;
        }
        if let Some(count) = self.active_envs.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                self.active_envs.remove(name);
            }
        }
    }

    /// Is the named environment currently open?
    pub fn env_active(&self, name: &str) -> bool {
        self.active_envs.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_to_next_frame() {
        let mut state = ConversionState::new();
        state.next_frame_header = "hdr".to_string();
        state.next_frame_footer = "ftr".to_string();
        state.switch_to_next_frame();
        assert_eq!(state.frame_header, "hdr");
        assert_eq!(state.frame_footer, "ftr");
    }

    #[test]
    fn test_env_bookkeeping() {
        let mut state = ConversionState::new();
        state.open_env("equation");
        state.open_env("equation");
        assert!(state.env_active("equation"));
        state.close_env("equation");
        assert!(state.env_active("equation"));
        state.close_env("equation");
        assert!(!state.env_active("equation"));
    }

    #[test]
    fn test_frame_is_not_tracked_as_env() {
        let mut state = ConversionState::new();
        state.open_env("frame");
        assert!(!state.env_active("frame"));
        // unmatched close must not panic
        state.close_env("block");
    }
}
