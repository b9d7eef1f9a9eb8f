//! Recursive file inclusion
//!
//! A `>>>filename<<<` line pulls in another file's (already line-joined)
//! content. File contents are cached across repeated inclusion in an
//! injected `FileCache`; the active inclusion stack detects cycles and
//! fails with the full trail instead of recursing unboundedly. Inclusion
//! tokens inside nowiki or code regions are left untouched.

use std::collections::HashMap;
use std::fs;

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::joiner::join_lines;
use crate::core::modes::{CODE_END, CODE_START, NOWIKI_END, NOWIKI_START};
use crate::utils::error::{ConversionError, ConversionResult};

lazy_static! {
    static ref INCLUDE_RE: Regex = Regex::new(r"^>>>(.*?)<<<").unwrap();
}

/// Session-wide cache of file contents, keyed by the name used to include
/// them. Passed explicitly so tests and multi-run callers control its
/// lifecycle.
#[derive(Debug, Default)]
pub struct FileCache {
    files: HashMap<String, Vec<String>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache; an existing entry is kept.
    pub fn add_lines(&mut self, filename: &str, lines: Vec<String>) {
        self.files.entry(filename.to_string()).or_insert(lines);
    }

    /// Cached lines for `filename`, reading (and line-joining) the file on
    /// first access.
    pub fn get_lines(&mut self, filename: &str) -> ConversionResult<Vec<String>> {
        if let Some(lines) = self.files.get(filename) {
            return Ok(lines.clone());
        }
        let content = fs::read_to_string(filename)
            .map_err(|_| ConversionError::io(format!("Cannot read file: {}", filename)))?;
        let lines = join_lines(&content.lines().map(|l| l.to_string()).collect::<Vec<_>>());
        self.files.insert(filename.to_string(), lines.clone());
        Ok(lines)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Extract the filename from an inclusion line, if any.
fn include_file(line: &str) -> Option<String> {
    if INCLUDE_RE.is_match(line) {
        Some(INCLUDE_RE.replace(line, "${1}").into_owned())
    } else {
        None
    }
}

/// Expand `base` and all transitively included files into one line
/// sequence.
pub fn include_file_recursive(
    base: &str,
    cache: &mut FileCache,
) -> ConversionResult<Vec<String>> {
    let mut stack = Vec::new();
    let mut output = Vec::new();
    recurse(base, cache, &mut stack, &mut output)?;
    Ok(output)
}

fn recurse(
    file: &str,
    cache: &mut FileCache,
    stack: &mut Vec<String>,
    output: &mut Vec<String>,
) -> ConversionResult<()> {
    stack.push(file.to_string());

    let lines = cache.get_lines(file)?;
    let mut nowiki_mode = false;
    let mut code_mode = false;

    for line in lines {
        if nowiki_mode || code_mode {
            if NOWIKI_END.is_match(&line) {
                nowiki_mode = false;
            } else if CODE_END.is_match(&line) {
                code_mode = false;
            }
            output.push(line);
        } else if NOWIKI_START.is_match(&line) {
            output.push(line);
            nowiki_mode = true;
        } else if CODE_START.is_match(&line) {
            output.push(line);
            code_mode = true;
        } else if let Some(include) = include_file(&line) {
            if stack.contains(&include) {
                return Err(ConversionError::include_loop(include, stack.clone()));
            }
            recurse(&include, cache, stack, output)?;
        } else {
            output.push(line);
        }
    }

    stack.pop();
    Ok(())
}
