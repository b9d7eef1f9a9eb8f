//! Line transform engine
//!
//! Rewrites one logical line into LaTeX, given and updating the
//! `ConversionState`. The rules are independent rewrites applied in a
//! fixed order (`TRANSFORM_RULES`): order matters because later rules
//! consume syntax produced by earlier ones, e.g. the heading rules must
//! run before header/footer placeholder substitution, and the list rule
//! runs last on the already-rewritten line.
//!
//! A rule that does not match leaves the line unchanged; malformed markup
//! is never an error here.

use lazy_static::lazy_static;
use regex::Regex;

use super::state::ConversionState;

/// One rewrite rule: `(line, state) -> line'`.
pub type TransformRule = fn(&str, &mut ConversionState) -> String;

/// The ordered rule pipeline. Adding or removing a rule is a one-line
/// change here.
pub const TRANSFORM_RULES: &[TransformRule] = &[
    transform_define_foothead,
    transform_detect_manual_frameclose,
    transform_title_slide,
    transform_frame_heading,
    transform_subsection_heading,
    transform_section_heading,
    transform_replace_headfoot,
    transform_environments,
    transform_columns,
    transform_boldfont,
    transform_italicfont,
    transform_typewriterfont,
    transform_alerts,
    transform_colors,
    transform_footnotes,
    transform_graphics,
    transform_substitutions,
    transform_vspacestar,
    transform_vspace,
    transform_uncover,
    transform_only,
    transform_itemenums,
];

/// Convert/transform one line in context of `state`.
pub fn transform(line: &str, state: &mut ConversionState) -> String {
    let mut line = line.to_string();
    for rule in TRANSFORM_RULES {
        line = rule(&line, state);
    }
    line
}

lazy_static! {
    static ref FRAMEHEADER_RE: Regex = Regex::new(r"^@FRAMEHEADER=(.*)$").unwrap();
    static ref FRAMEFOOTER_RE: Regex = Regex::new(r"^@FRAMEFOOTER=(.*)$").unwrap();
    static ref FRAMECLOSE_RE: Regex = Regex::new(r"^\[\s*frame\s*\]>").unwrap();
    static ref TITLE_SLIDE_RE: Regex = Regex::new(r"^=!\s*(.*?)\s*!=(.*)").unwrap();
    static ref FRAME_HEADING_RE: Regex = Regex::new(r"^!?====\s*(.*?)\s*====(.*)").unwrap();
    static ref SUBSEC_HEADING_RE: Regex = Regex::new(r"^===\s*(.*?)\s*===(.*)").unwrap();
    static ref SEC_HEADING_RE: Regex = Regex::new(r"^==\s*(.*?)\s*==(.*)").unwrap();
    static ref ENV_OPEN_RE: Regex = Regex::new(r"^<\[([^{}]*?)\]").unwrap();
    static ref ENV_CLOSE_RE: Regex = Regex::new(r"^\[([^{}]*?)\]>").unwrap();
    static ref COLUMN_RE: Regex = Regex::new(r"^\[\[\[(.*?)\]\]\]").unwrap();
    static ref BOLD_RE: Regex = Regex::new(r"'''(.*?)'''").unwrap();
    static ref ITALIC_RE: Regex = Regex::new(r"''(.*?)''").unwrap();
    static ref GRAPHICS_SPAN_RE: Regex = Regex::new(r"<<<(.*?)>>>").unwrap();
    static ref COLOR_RE: Regex = Regex::new(r"_([^_\\{}]*?)_([^_]*?[^_\\{}])_").unwrap();
    static ref FOOTNOTE_RE: Regex = Regex::new(r"\(\(\((.*?)\)\)\)").unwrap();
    static ref GRAPHICS_OPTS_RE: Regex = Regex::new(r"<<<(.*?),(.*?)>>>").unwrap();
    static ref GRAPHICS_RE: Regex = Regex::new(r"<<<(.*?)>>>").unwrap();
    static ref VSPACE_RE: Regex = Regex::new(r"^\s*--(.*)--\s*$").unwrap();
    static ref VSPACESTAR_RE: Regex = Regex::new(r"^\s*--\*(.*)--\s*$").unwrap();
    static ref UNCOVER_RE: Regex = Regex::new(r"\+<(.*)>\s*\{(.*)").unwrap();
    static ref ONLY_RE: Regex = Regex::new(r"-<(.*)>\s*\{(.*)").unwrap();
    static ref ITEM_LEVEL_RE: Regex = Regex::new(r"^([*#]+)").unwrap();
    static ref ITEM_RE: Regex = Regex::new(r"^([*#]+)((?:\[[^\]*]\])?)\s*(.*)$").unwrap();
}

/// The closing text for the currently open frame, footer included.
pub fn get_frame_closing(state: &ConversionState) -> String {
    format!(" {} \n\\end{{frame}}\n", state.frame_footer)
}

/// `@FRAMEHEADER=`/`@FRAMEFOOTER=` directives set the header/footer of the
/// *next* frame and erase the line.
fn transform_define_foothead(line: &str, state: &mut ConversionState) -> String {
    let mut line = line.to_string();
    if let Some(caps) = FRAMEHEADER_RE.captures(&line) {
        state.next_frame_header = caps[1].to_string();
        line.clear();
    }
    if let Some(caps) = FRAMEFOOTER_RE.captures(&line) {
        state.next_frame_footer = caps[1].to_string();
        line.clear();
    }
    line
}

/// Detect manual closing of frames. The literal `[frame]>` is left in
/// place for the environment rule to render as `\end{frame}`.
fn transform_detect_manual_frameclose(line: &str, state: &mut ConversionState) -> String {
    if state.frame_opened && FRAMECLOSE_RE.is_match(line) {
        state.frame_opened = false;
    }
    line.to_string()
}

/// `=! title !=` opens a centered title slide.
fn transform_title_slide(line: &str, state: &mut ConversionState) -> String {
    let Some(caps) = TITLE_SLIDE_RE.captures(line) else {
        return line.to_string();
    };
    let mut out = String::new();
    if state.frame_opened {
        out.push_str(&get_frame_closing(state));
    }
    out.push_str("\n\\begin{frame}\n\\frametitle{}\n\\begin{center}\n{\\Huge ");
    out.push_str(&caps[1]);
    out.push_str("}\n\\end{center}\n");
    state.frame_opened = true;
    state.switch_to_next_frame();
    out
}

/// `==== title ====` opens a frame, closing a previous one first. An
/// optional trailing modifier (e.g. `[fragile]`) is passed through to
/// `\begin{frame}`.
fn transform_frame_heading(line: &str, state: &mut ConversionState) -> String {
    let Some(caps) = FRAME_HEADING_RE.captures(line) else {
        return line.to_string();
    };
    let mut out = String::new();
    if state.frame_opened {
        out.push_str(&get_frame_closing(state));
    }
    out.push_str(&format!(
        "\\begin{{frame}}{}\n \\frametitle{{{}}}\n {} \n",
        &caps[2], &caps[1], state.next_frame_header
    ));
    state.frame_opened = true;
    state.switch_to_next_frame();
    out
}

/// `=== title ===` maps to a subsection and closes any open frame.
fn transform_subsection_heading(line: &str, state: &mut ConversionState) -> String {
    let Some(caps) = SUBSEC_HEADING_RE.captures(line) else {
        return line.to_string();
    };
    let mut out = String::new();
    if state.frame_opened {
        out.push_str(&get_frame_closing(state));
    }
    out.push_str(&format!("\n\\subsection{}{{{}}}\n\n", &caps[2], &caps[1]));
    state.frame_opened = false;
    out
}

/// `== title ==` maps to a section and closes any open frame.
fn transform_section_heading(line: &str, state: &mut ConversionState) -> String {
    let Some(caps) = SEC_HEADING_RE.captures(line) else {
        return line.to_string();
    };
    let mut out = String::new();
    if state.frame_opened {
        out.push_str(&get_frame_closing(state));
    }
    out.push_str(&format!("\n\\section{}{{{}}}\n\n", &caps[2], &caps[1]));
    state.frame_opened = false;
    out
}

/// Substitute the internal header/footer placeholders with the current
/// frame's values.
fn transform_replace_headfoot(line: &str, state: &mut ConversionState) -> String {
    line.replace("<---FRAMEHEADER--->", &state.frame_header)
        .replace("<---FRAMEFOOTER--->", &state.frame_footer)
}

/// Generic LaTeX environments: `<[name]...` / `[name]>`. The user takes
/// full responsibility for closing all opened environments:
///
/// ```text
/// <[block]{block title}
/// message
/// [block]>
/// ```
fn transform_environments(line: &str, state: &mut ConversionState) -> String {
    let mut line = line.to_string();
    if let Some(caps) = ENV_OPEN_RE.captures(&line) {
        state.open_env(caps[1].trim());
    }
    line = ENV_OPEN_RE.replace(&line, "\\begin{${1}}").into_owned();
    if let Some(caps) = ENV_CLOSE_RE.captures(&line) {
        state.close_env(caps[1].trim());
    }
    ENV_CLOSE_RE.replace(&line, "\\end{${1}}").into_owned()
}

/// `[[[width]]]` columns.
fn transform_columns(line: &str, _state: &mut ConversionState) -> String {
    COLUMN_RE.replace(line, "\\column{${1}}").into_owned()
}

/// `'''bold'''`.
fn transform_boldfont(line: &str, _state: &mut ConversionState) -> String {
    BOLD_RE.replace_all(line, "\\textbf{${1}}").into_owned()
}

/// `''italic''`.
fn transform_italicfont(line: &str, _state: &mut ConversionState) -> String {
    ITALIC_RE.replace_all(line, "\\emph{${1}}").into_owned()
}

/// Single-pass delimiter scanner shared by the typewriter and alert
/// rules. Supports backslash-escaping of the delimiter; an unmatched
/// trailing delimiter is passed through literally.
fn mini_parser(delimiter: char, replacement: &str, input: &str) -> String {
    let mut output = String::new();
    let mut stash = String::new();
    let mut seen_delim = false;
    let mut seen_escape = false;

    for ch in input.chars() {
        if seen_escape {
            if ch == delimiter {
                output.push(delimiter);
            } else {
                output.push('\\');
                output.push(ch);
            }
            seen_escape = false;
        } else if ch == '\\' {
            seen_escape = true;
        } else if ch == delimiter {
            if seen_delim {
                seen_delim = false;
                std::mem::swap(&mut output, &mut stash);
                output.push('\\');
                output.push_str(replacement);
                output.push('{');
                output.push_str(&stash);
                output.push('}');
                stash.clear();
            } else {
                seen_delim = true;
                std::mem::swap(&mut output, &mut stash);
            }
        } else {
            output.push(ch);
        }
    }

    if seen_delim {
        std::mem::swap(&mut output, &mut stash);
        output.push(delimiter);
        output.push_str(&stash);
    }
    output
}

/// `@text@` typewriter font.
fn transform_typewriterfont(line: &str, _state: &mut ConversionState) -> String {
    mini_parser('@', "texttt", line)
}

/// `!text!` alerts.
fn transform_alerts(line: &str, _state: &mut ConversionState) -> String {
    mini_parser('!', "alert", line)
}

/// `_colorname_text_` colors. Disabled inside an open `equation`
/// environment (underscores are subscripts there) and inside graphics
/// include tokens on the same line.
fn transform_colors(line: &str, state: &mut ConversionState) -> String {
    if state.env_active("equation") {
        return line.to_string();
    }

    let graphics: Vec<(usize, usize)> = GRAPHICS_SPAN_RE
        .find_iter(line)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut out = String::new();
    let mut last = 0;
    for caps in COLOR_RE.captures_iter(line) {
        let m = caps.get(0).unwrap();
        out.push_str(&line[last..m.start()]);
        let in_graphics = graphics
            .iter()
            .any(|&(start, end)| m.start() >= start && m.end() <= end);
        if in_graphics {
            out.push_str(m.as_str());
        } else {
            out.push_str("\\textcolor{");
            out.push_str(&caps[1]);
            out.push_str("}{");
            out.push_str(&caps[2]);
            out.push('}');
        }
        last = m.end();
    }
    out.push_str(&line[last..]);
    out
}

/// `(((text)))` footnotes.
fn transform_footnotes(line: &str, _state: &mut ConversionState) -> String {
    FOOTNOTE_RE.replace_all(line, "\\footnote{${1}}").into_owned()
}

/// `<<<path,options>>>` / `<<<path>>>` figures.
fn transform_graphics(line: &str, _state: &mut ConversionState) -> String {
    let line = GRAPHICS_OPTS_RE
        .replace_all(line, "\\includegraphics[${2}]{${1}}")
        .into_owned();
    GRAPHICS_RE
        .replace_all(&line, "\\includegraphics{${1}}")
        .into_owned()
}

/// Whitespace-bounded arrow and smiley substitutions.
fn transform_substitutions(line: &str, _state: &mut ConversionState) -> String {
    lazy_static! {
        static ref RIGHT_RE: Regex = Regex::new(r"(\s)-->(\s)").unwrap();
        static ref LEFT_RE: Regex = Regex::new(r"(\s)<--(\s)").unwrap();
        static ref RIGHT2_RE: Regex = Regex::new(r"(\s)==>(\s)").unwrap();
        static ref LEFT2_RE: Regex = Regex::new(r"(\s)<==(\s)").unwrap();
        static ref SMILEY_RE: Regex = Regex::new(r"(\s):-\)(\s)").unwrap();
        static ref FROWNIE_RE: Regex = Regex::new(r"(\s):-\((\s)").unwrap();
    }
    let line = RIGHT_RE.replace_all(line, "${1}$$\\rightarrow$$${2}");
    let line = LEFT_RE.replace_all(&line, "${1}$$\\leftarrow$$${2}");
    let line = RIGHT2_RE.replace_all(&line, "${1}$$\\Rightarrow$$${2}");
    let line = LEFT2_RE.replace_all(&line, "${1}$$\\Leftarrow$$${2}");
    let line = SMILEY_RE.replace_all(&line, "${1}\\smiley${2}");
    FROWNIE_RE.replace_all(&line, "${1}\\frownie${2}").into_owned()
}

/// `--*len--` on an otherwise-blank line. Must run before the plain
/// vspace rule, which would otherwise swallow the star.
fn transform_vspacestar(line: &str, _state: &mut ConversionState) -> String {
    VSPACESTAR_RE
        .replace(line, "\n\\vspace*{${1}}\n")
        .into_owned()
}

/// `--len--` on an otherwise-blank line.
fn transform_vspace(line: &str, _state: &mut ConversionState) -> String {
    VSPACE_RE.replace(line, "\n\\vspace{${1}}\n").into_owned()
}

/// `+<1-2>{...` uncover.
fn transform_uncover(line: &str, _state: &mut ConversionState) -> String {
    UNCOVER_RE
        .replace_all(line, "\\uncover<${1}>{${2}")
        .into_owned()
}

/// `-<1-2>{...` only.
fn transform_only(line: &str, _state: &mut ConversionState) -> String {
    ONLY_RE.replace_all(line, "\\only<${1}>{${2}").into_owned()
}

/// Itemizations/enumerations. Computes the longest common prefix between
/// the previous and current marker run, closes the divergent suffix of the
/// old nesting innermost-first and opens the new suffix outermost-first,
/// then rewrites the marker run as `\item` (keeping a bracketed label).
fn transform_itemenums(line: &str, state: &mut ConversionState) -> String {
    let my_level = ITEM_LEVEL_RE
        .captures(line)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    let mut preamble = String::new();
    if my_level != state.enum_item_level {
        let old: Vec<char> = state.enum_item_level.chars().collect();
        let new: Vec<char> = my_level.chars().collect();
        let common = old
            .iter()
            .zip(new.iter())
            .take_while(|(a, b)| a == b)
            .count();

        for marker in old[common..].iter().rev() {
            match marker {
                '*' => preamble.push_str("\\end{itemize}\n"),
                '#' => preamble.push_str("\\end{enumerate}\n"),
                _ => {}
            }
        }
        for marker in &new[common..] {
            match marker {
                '*' => preamble.push_str("\\begin{itemize}\n"),
                '#' => preamble.push_str("\\begin{enumerate}\n"),
                _ => {}
            }
        }
    }
    state.enum_item_level = my_level;

    let body = ITEM_RE.replace(line, "  \\item${2} ${3}");
    format!("{}{}", preamble, body)
}
