//! Selected-frame filter
//!
//! A frame heading prefixed with `!` marks the frame as selected. If any
//! selected frame exists in the document, only selected frames (plus
//! content outside frames and autotemplate blocks) survive the pre-pass;
//! without selected frames the filter is a no-op.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SELECTED_FRAME_RE: Regex = Regex::new(r"^!====\s*(.*?)\s*====(.*)").unwrap();
    static ref UNSELECTED_FRAME_RE: Regex = Regex::new(r"^====\s*(.*?)\s*====(.*)").unwrap();
    static ref FRAME_CLOSE_RE: Regex = Regex::new(r"^\s*\[\s*frame\s*\]>").unwrap();
}

/// Does any heading in the document carry the selected marker?
pub fn scan_for_selected_frames(lines: &[String]) -> bool {
    lines.iter().any(|line| SELECTED_FRAME_RE.is_match(line))
}

fn line_opens_selected_frame(line: &str) -> bool {
    SELECTED_FRAME_RE.is_match(line)
}

fn line_opens_unselected_frame(line: &str) -> bool {
    UNSELECTED_FRAME_RE.is_match(line)
}

fn line_closes_frame(line: &str) -> bool {
    FRAME_CLOSE_RE.is_match(line)
}

/// Keep only lines inside selected frames or outside any frame. A
/// manually closed frame that is never reopened drops the trailing
/// content with it.
pub fn filter_selected_lines(lines: &[String]) -> Vec<String> {
    let mut selected_lines = Vec::new();

    let mut selected_frame_opened = false;
    let mut frame_closed = true;
    let mut frame_manually_closed = false;

    for line in lines {
        if line_opens_selected_frame(line) {
            selected_frame_opened = true;
            frame_closed = false;
        }
        if line_opens_unselected_frame(line) {
            selected_frame_opened = false;
            frame_closed = false;
        }
        if line_closes_frame(line) {
            selected_frame_opened = false;
            frame_closed = true;
            frame_manually_closed = true;
        }

        if selected_frame_opened || (frame_closed && !frame_manually_closed) {
            selected_lines.push(line.clone());
        }
    }

    selected_lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scan_finds_selected_marker() {
        assert!(scan_for_selected_frames(&lines(&["!==== x ===="])));
        assert!(!scan_for_selected_frames(&lines(&["==== x ===="])));
    }

    #[test]
    fn test_filter_keeps_selected_frame_only() {
        let input = lines(&[
            "preamble",
            "!==== keep ====",
            "kept body",
            "==== drop ====",
            "dropped body",
        ]);
        let filtered = filter_selected_lines(&input);
        assert_eq!(filtered, lines(&["preamble", "!==== keep ====", "kept body"]));
    }

    #[test]
    fn test_filter_drops_after_manual_close() {
        let input = lines(&[
            "!==== keep ====",
            "body",
            "[frame]>",
            "after close",
        ]);
        let filtered = filter_selected_lines(&input);
        // the manual close itself and trailing content are dropped
        assert_eq!(filtered, lines(&["!==== keep ====", "body"]));
    }

    #[test]
    fn test_filter_keeps_lines_outside_frames() {
        let input = lines(&[
            "<[autotemplate]",
            "title={x}",
            "[autotemplate]>",
            "!==== keep ====",
            "body",
        ]);
        let filtered = filter_selected_lines(&input);
        assert_eq!(filtered, input);
    }
}
