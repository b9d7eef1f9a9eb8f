//! Document driver
//!
//! Folds the logical line sequence through the mode scanner and dispatches
//! each line to the right consumer: nowiki lines pass through untouched,
//! code and autotemplate lines are buffered until their block closes and
//! then expanded, everything else goes through the line transform engine.
//! At end of input the driver flushes open lists/frames, closes the
//! autotemplate document and splices the accumulated defverbatim blocks.

use super::autotemplate::{expand_autotemplate_opening, get_autotemplate_closing};
use super::code::{expand_code_defverbs, expand_code_segment};
use super::filter::{filter_selected_lines, scan_for_selected_frames};
use super::modes::{get_autotemplate_mode, get_code_mode, get_nowiki_mode};
use super::state::ConversionState;
use super::transform::{get_frame_closing, transform};
use crate::utils::error::ConversionResult;

/// Convert a document to LaTeX/Beamer, honoring selected-frame markers.
pub fn convert_to_beamer(lines: &[String]) -> ConversionResult<Vec<String>> {
    if scan_for_selected_frames(lines) {
        convert_to_beamer_full(&filter_selected_lines(lines))
    } else {
        convert_to_beamer_full(lines)
    }
}

/// Convert the full line sequence, no frame selection.
pub fn convert_to_beamer_full(lines: &[String]) -> ConversionResult<Vec<String>> {
    let mut state = ConversionState::new();
    // line 0 stays empty and doubles as the default defverb splice point
    let mut result: Vec<String> = vec![String::new()];
    let mut codebuffer: Vec<String> = Vec::new();
    let mut autotemplatebuffer: Vec<String> = Vec::new();

    let mut nowiki_mode = false;
    let mut code_mode = false;
    let mut autotemplate_mode = false;

    for raw in lines {
        let (line, nowiki) = get_nowiki_mode(raw, nowiki_mode);
        nowiki_mode = nowiki;
        if nowiki_mode {
            result.push(line);
            continue;
        }

        let (line, code) = get_code_mode(&line, code_mode);
        if code && !code_mode {
            codebuffer.clear();
        } else if !code && code_mode {
            expand_code_segment(&mut result, &codebuffer, &mut state)?;
        }

        if code_mode || code {
            // the remainder of the closing line is discarded with the
            // stale buffer
            codebuffer.push(line);
            code_mode = code;
            continue;
        }

        let (line, autotemplate) = get_autotemplate_mode(&line, autotemplate_mode);
        if autotemplate && !autotemplate_mode {
            autotemplatebuffer.clear();
        } else if !autotemplate && autotemplate_mode {
            expand_autotemplate_opening(&mut result, &autotemplatebuffer, &mut state)?;
        }
        autotemplate_mode = autotemplate;

        if autotemplate_mode {
            autotemplatebuffer.push(line);
        } else {
            state.current_line = result.len();
            result.push(transform(&line, &mut state));
        }
    }

    // flush: close any still-open list or environment
    result.push(transform("", &mut state));

    if state.frame_opened {
        result.push(get_frame_closing(&state));
    }
    if state.autotemplate_opened {
        result.push(get_autotemplate_closing());
    }

    expand_code_defverbs(&mut result, &mut state);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    fn convert(input: &[&str]) -> Vec<String> {
        convert_to_beamer(&lines(input)).unwrap()
    }

    #[test]
    fn test_section_roundtrip() {
        let output = convert(&["== foo =="]).join("");
        assert!(output.contains("\\section{foo}"));
        assert!(!output.contains("\\begin{frame}"));
    }

    #[test]
    fn test_frame_closed_at_end_of_document() {
        let output = convert(&["==== frame ====", "content"]).join("");
        assert_eq!(
            output.matches("\\begin{frame}").count(),
            output.matches("\\end{frame}").count()
        );
    }

    #[test]
    fn test_every_frame_closed_once() {
        let output = convert(&[
            "==== one ====",
            "a",
            "==== two ====",
            "b",
            "== sec ==",
            "==== three ====",
        ])
        .join("");
        assert_eq!(output.matches("\\begin{frame}").count(), 3);
        assert_eq!(output.matches("\\end{frame}").count(), 3);
    }

    #[test]
    fn test_nowiki_passthrough() {
        let output = convert(&[
            "<[nowiki]",
            "== not a section ==",
            "* not an item",
            "[nowiki]>",
        ]);
        assert!(output.contains(&"== not a section ==".to_string()));
        assert!(output.contains(&"* not an item".to_string()));
        let joined = output.join("");
        assert!(!joined.contains("\\section"));
        assert!(!joined.contains("\\item"));
    }

    #[test]
    fn test_open_list_closed_at_end() {
        let output = convert(&["* a", "** b"]).join("");
        assert_eq!(output.matches("\\begin{itemize}").count(), 2);
        assert_eq!(output.matches("\\end{itemize}").count(), 2);
    }

    #[test]
    fn test_code_block_defverbs_spliced_at_start() {
        let output = convert(&["==== f ====", "<[code][language=C]", "int x;", "[code]>"]);
        // definitions land in line 0, the reference stays at the block's
        // position
        assert!(output[0].contains("\\defverbatim"));
        let joined = output.join("");
        assert_eq!(joined.matches("\\defverbatim").count(), 1);
    }

    #[test]
    fn test_autotemplate_document_wrapping() {
        let output = convert(&[
            "<[autotemplate]",
            "title={Talk}",
            "[autotemplate]>",
            "==== f ====",
            "x",
        ]);
        let joined = output.join("");
        assert!(joined.contains("\\documentclass{beamer}"));
        assert!(joined.contains("\\title{Talk}"));
        assert!(joined.contains("\\begin{document}"));
        assert!(joined.contains("\\end{document}"));
    }

    #[test]
    fn test_no_document_close_without_autotemplate() {
        let joined = convert(&["==== f ====", "x"]).join("");
        assert!(!joined.contains("\\end{document}"));
    }

    #[test]
    fn test_defverbs_spliced_after_autotemplate_opening() {
        let output = convert(&[
            "<[autotemplate]",
            "[autotemplate]>",
            "==== f ====",
            "<[code]{}",
            "code here",
            "[code]>",
        ]);
        let joined = output.join("");
        let doc_pos = joined.find("\\begin{document}").unwrap();
        let defverb_pos = joined.find("\\defverbatim").unwrap();
        let frame_pos = joined.find("\\begin{frame}").unwrap();
        assert!(doc_pos < defverb_pos);
        assert!(defverb_pos < frame_pos);
    }

    #[test]
    fn test_selected_frame_filtering() {
        let output = convert(&[
            "!==== keep ====",
            "kept",
            "==== drop ====",
            "dropped",
        ])
        .join("");
        assert!(output.contains("\\frametitle{keep}"));
        assert!(output.contains("kept"));
        assert!(!output.contains("\\frametitle{drop}"));
        assert!(!output.contains("dropped"));
    }

    #[test]
    fn test_filter_noop_without_selection() {
        let input = ["==== a ====", "one", "==== b ====", "two"];
        let output = convert(&input).join("");
        assert!(output.contains("\\frametitle{a}"));
        assert!(output.contains("\\frametitle{b}"));
        assert!(output.contains("one"));
        assert!(output.contains("two"));
    }

    #[test]
    fn test_itemize_scenario_sequence() {
        let output = convert(&["* foo", "* bar", "** foobar"]);
        let joined = output.join("\n");
        let expected_order = [
            "\\begin{itemize}",
            "\\item foo",
            "\\item bar",
            "\\begin{itemize}",
            "\\item foobar",
            "\\end{itemize}",
            "\\end{itemize}",
        ];
        let mut pos = 0;
        for token in expected_order {
            let found = joined[pos..].find(token);
            assert!(found.is_some(), "missing {} after byte {}", token, pos);
            pos += found.unwrap() + token.len();
        }
    }

    #[test]
    fn test_manual_frame_close() {
        let joined = convert(&["==== f ====", "x", "[frame]>", "outside"]).join("");
        assert_eq!(joined.matches("\\end{frame}").count(), 1);
    }

    #[test]
    fn test_empty_input() {
        let output = convert_to_beamer(&[]).unwrap();
        // line 0 plus the final flush, defverb splice appends a newline
        assert_eq!(output.len(), 2);
    }
}
