//! Line joining
//!
//! Two separate continuation conventions run before the main transform
//! pass:
//!
//! - a trailing unescaped `%` soft-joins a line with the next one (the
//!   percent is stripped), suppressed inside nowiki/code regions which
//!   preserve literal line structure;
//! - a trailing single backslash physically merges two lines (`\\` is an
//!   escaped literal backslash and does not join).
//!
//! Both scans track the nowiki/code markers on their own, since joining
//! happens before the driver's mode dispatch.

use super::modes::{get_code_mode, get_nowiki_mode};

/// Join lines ending with unescaped percent signs, unless inside code or
/// nowiki mode. Non-code lines are right-trimmed first; code lines keep
/// their exact bytes.
pub fn join_lines(lines: &[String]) -> Vec<String> {
    let mut nowiki_mode = false;
    let mut code_mode = false;
    let mut result = Vec::new();
    let mut joined = String::new();

    for raw in lines {
        let (_, nowiki) = get_nowiki_mode(raw, nowiki_mode);
        nowiki_mode = nowiki;
        if !nowiki_mode {
            let (_, code) = get_code_mode(raw, code_mode);
            code_mode = code;
        }

        let line = if code_mode {
            raw.as_str()
        } else {
            raw.trim_end()
        };

        let continues = !(nowiki_mode || code_mode)
            && match line.as_bytes() {
                [b'%'] => true,
                [.., prev, b'%'] => *prev != b'\\',
                _ => false,
            };

        if continues {
            joined.push_str(&line[..line.len() - 1]);
        } else {
            joined.push_str(line);
            result.push(std::mem::take(&mut joined));
        }
    }

    result
}

/// Merge lines ending with a single trailing backslash into one logical
/// line. Runs on the fully included line sequence.
pub fn munge_input_lines(lines: &[String]) -> Vec<String> {
    let mut munge = false;
    let mut new_lines: Vec<String> = Vec::new();

    for line in lines {
        if munge {
            let mut line = line.as_str();
            if !line.ends_with('\\') {
                munge = false;
            } else {
                line = &line[..line.len() - 1];
            }
            if let Some(last) = new_lines.last_mut() {
                last.push_str(line);
            }
        } else if line.ends_with('\\') && !line.ends_with("\\\\") {
            munge = true;
            new_lines.push(line[..line.len() - 1].to_string());
        } else {
            new_lines.push(line.clone());
        }
    }

    new_lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_percent_join() {
        let joined = join_lines(&lines(&["foo%", "bar"]));
        assert_eq!(joined, vec!["foobar"]);
    }

    #[test]
    fn test_escaped_percent_does_not_join() {
        let joined = join_lines(&lines(&["foo\\%", "bar"]));
        assert_eq!(joined, vec!["foo\\%", "bar"]);
    }

    #[test]
    fn test_lone_percent_joins() {
        let joined = join_lines(&lines(&["%", "bar"]));
        assert_eq!(joined, vec!["bar"]);
    }

    #[test]
    fn test_join_suppressed_in_code() {
        let input = lines(&["<[code]{}", "x = 100 %", "[code]>"]);
        let joined = join_lines(&input);
        assert_eq!(joined, input);
    }

    #[test]
    fn test_join_suppressed_in_nowiki() {
        let input = lines(&["<[nowiki]", "literal%", "[nowiki]>"]);
        let joined = join_lines(&input);
        assert_eq!(joined, input);
    }

    #[test]
    fn test_join_is_idempotent() {
        let input = lines(&["a%", "b", "c %", " d", "plain"]);
        let once = join_lines(&input);
        let twice = join_lines(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_backslash_munge() {
        let munged = munge_input_lines(&lines(&["foo\\", "bar"]));
        assert_eq!(munged, vec!["foobar"]);
    }

    #[test]
    fn test_double_backslash_is_literal() {
        let munged = munge_input_lines(&lines(&["foo\\\\", "bar"]));
        assert_eq!(munged, vec!["foo\\\\", "bar"]);
    }

    #[test]
    fn test_munge_chain() {
        let munged = munge_input_lines(&lines(&["a\\", "b\\", "c"]));
        assert_eq!(munged, vec!["abc"]);
    }
}
