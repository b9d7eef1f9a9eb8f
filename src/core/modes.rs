//! Mode scanner for the three exclusive block modes
//!
//! Detects entry/exit of `nowiki`, `code` and `autotemplate` regions and
//! strips the mode markers from the line. The start marker is `<[name]`
//! (interior whitespace allowed), the end marker `[name]>`, both anchored
//! at the start of the line.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref NOWIKI_START: Regex = Regex::new(r"^<\[\s*nowiki\s*\]").unwrap();
    pub static ref NOWIKI_END: Regex = Regex::new(r"^\[\s*nowiki\s*\]>").unwrap();
    pub static ref CODE_START: Regex = Regex::new(r"^<\[\s*code\s*\]").unwrap();
    pub static ref CODE_END: Regex = Regex::new(r"^\[\s*code\s*\]>").unwrap();
    pub static ref AUTOTEMPLATE_START: Regex = Regex::new(r"^<\[\s*autotemplate\s*\]").unwrap();
    pub static ref AUTOTEMPLATE_END: Regex = Regex::new(r"^\[\s*autotemplate\s*\]>").unwrap();
}

/// Update a single mode flag for one line, stripping the marker that
/// triggered the transition.
fn scan(line: &str, active: bool, start: &Regex, end: &Regex) -> (String, bool) {
    if !active {
        if start.is_match(line) {
            return (start.replace(line, "").into_owned(), true);
        }
    } else if end.is_match(line) {
        return (end.replace(line, "").into_owned(), false);
    }
    (line.to_string(), active)
}

/// Track nowiki mode across one line.
pub fn get_nowiki_mode(line: &str, nowiki_mode: bool) -> (String, bool) {
    scan(line, nowiki_mode, &NOWIKI_START, &NOWIKI_END)
}

/// Track code mode across one line.
pub fn get_code_mode(line: &str, code_mode: bool) -> (String, bool) {
    scan(line, code_mode, &CODE_START, &CODE_END)
}

/// Track autotemplate mode across one line.
pub fn get_autotemplate_mode(line: &str, autotemplate_mode: bool) -> (String, bool) {
    scan(line, autotemplate_mode, &AUTOTEMPLATE_START, &AUTOTEMPLATE_END)
}
