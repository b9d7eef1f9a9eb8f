//! Autotemplate expander
//!
//! Parses a buffered `<[autotemplate]` block of `key=value` lines, merges
//! it with the built-in default template and emits the LaTeX preamble and
//! document opening. `usepackage` entries are deduplicated by package name
//! (user value wins), `documentclass` and `titleframe` are singleton
//! overrides, everything else is concatenated after the defaults.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use super::state::ConversionState;
use crate::utils::error::{ConversionError, ConversionResult};

/// The `basic` listings style installed by the default template.
const LST_BASIC_STYLE: &str = r"{basic}{
    captionpos=t,%
    basicstyle=\footnotesize\ttfamily,%
    numberstyle=\tiny,%
    numbers=left,%
    stepnumber=1,%
    frame=single,%
    showspaces=false,%
    showstringspaces=false,%
    showtabs=false,%
    %
    keywordstyle=\color{blue},%
    identifierstyle=,%
    commentstyle=\color{gray},%
    stringstyle=\color{magenta}%
}";

/// The built-in default template, merged under every user template.
fn default_autotemplate() -> Vec<(String, String)> {
    let pairs: &[(&str, &str)] = &[
        ("documentclass", "{beamer}"),
        ("usepackage", "{listings}"),
        ("usepackage", "{wasysym}"),
        ("usepackage", "{graphicx}"),
        ("date", "{\\today}"),
        ("lstdefinestyle", LST_BASIC_STYLE),
        ("titleframe", "True"),
    ];
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

lazy_static! {
    static ref USEPACKAGE_RE: Regex = Regex::new(r"^\s*(\[.*\])?\s*\{(.*)\}\s*$").unwrap();
}

/// Parse a boolean template value.
pub fn parse_bool(value: &str) -> ConversionResult<bool> {
    match value {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        other => Err(ConversionError::syntax(
            "Boolean expected (True/true/1 or False/false/0)",
            other,
        )),
    }
}

/// Parse the buffered autotemplate block into ordered (key, value) pairs.
/// Blank lines and `%` comment lines are ignored; a line without `=` is a
/// fatal syntax error.
pub fn parse_autotemplate(buffer: &[String]) -> ConversionResult<Vec<(String, String)>> {
    let mut template = Vec::new();

    for line in buffer {
        let stripped = line.trim_start();
        if stripped.is_empty() || stripped.starts_with('%') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConversionError::syntax(
                "lines in the autotemplate section have to be of the form key=value",
                line,
            ));
        };
        template.push((key.to_string(), value.to_string()));
    }

    Ok(template)
}

/// Parse a usepackage value of the form `[options]{name}`.
fn parse_usepackage(usepackage: &str) -> ConversionResult<(String, Option<String>)> {
    let Some(caps) = USEPACKAGE_RE.captures(usepackage) else {
        return Err(ConversionError::syntax(
            "usepackage specifications have to be of the form [options]{name}",
            usepackage,
        ));
    };
    let name = caps[2].trim().to_string();
    let options = caps.get(1).map(|m| m.as_str().to_string());
    Ok((name, options))
}

/// Merge templates in order (defaults first, user last). Later
/// `usepackage` values win per package name but keep the first-seen
/// position; later `documentclass`/`titleframe` win outright.
pub fn unify_autotemplates(
    templates: Vec<Vec<(String, String)>>,
) -> ConversionResult<Vec<(String, String)>> {
    let mut usepackages: IndexMap<String, Option<String>> = IndexMap::new();
    let mut documentclass = String::new();
    let mut titleframe = false;
    let mut merged = Vec::new();

    for template in templates {
        for (key, value) in template {
            match key.as_str() {
                "usepackage" => {
                    let (name, options) = parse_usepackage(&value)?;
                    usepackages.insert(name, options);
                }
                "titleframe" => titleframe = parse_bool(&value)?,
                "documentclass" => documentclass = value,
                _ => merged.push((key, value)),
            }
        }
    }

    let mut autotemplate = Vec::new();
    autotemplate.push(("documentclass".to_string(), documentclass));
    for (name, options) in &usepackages {
        let value = match options {
            Some(opts) if !opts.trim().is_empty() => format!("{}{{{}}}", opts, name),
            _ => format!("{{{}}}", name),
        };
        autotemplate.push(("usepackage".to_string(), value));
    }
    autotemplate.push((
        "titleframe".to_string(),
        if titleframe { "True" } else { "False" }.to_string(),
    ));
    autotemplate.extend(merged);

    Ok(autotemplate)
}

/// Render the merged template as the document opening: preamble commands,
/// `\begin{document}` and (if `titleframe` resolves true) the title page
/// frame.
pub fn expand_autotemplate_gen_opening(
    autotemplate: &[(String, String)],
) -> ConversionResult<String> {
    let mut titleframe = false;
    let mut titleframeopts = String::new();
    let mut out = Vec::new();

    for (key, value) in autotemplate {
        match key.as_str() {
            "titleframe" => titleframe = parse_bool(value)?,
            "titleframeopts" => titleframeopts = value.clone(),
            _ => out.push(format!("\\{}{}", key, value)),
        }
    }

    out.push("\n\\begin{document}\n".to_string());
    if titleframe {
        out.push(format!("\n\\frame{}{{\\titlepage}}\n", titleframeopts));
    }

    Ok(out.join("\n"))
}

/// Expand a completed autotemplate block into the output and remember
/// where the defverbatim blocks get spliced in later.
pub fn expand_autotemplate_opening(
    result: &mut Vec<String>,
    templatebuffer: &[String],
    state: &mut ConversionState,
) -> ConversionResult<()> {
    let user_template = parse_autotemplate(templatebuffer)?;
    let merged = unify_autotemplates(vec![default_autotemplate(), user_template])?;

    let opening = expand_autotemplate_gen_opening(&merged)?;
    result.push(opening);
    result.push(String::new());
    state.code_pos = result.len();
    state.autotemplate_opened = true;
    Ok(())
}

/// Closing emitted once at the very end, iff the opening was emitted.
pub fn get_autotemplate_closing() -> String {
    "\n\\end{document}\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buffer(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_skips_blanks_and_comments() {
        let parsed = parse_autotemplate(&buffer(&["", "% comment", "title={T}"])).unwrap();
        assert_eq!(parsed, vec![("title".to_string(), "{T}".to_string())]);
    }

    #[test]
    fn test_parse_rejects_line_without_equals() {
        assert!(parse_autotemplate(&buffer(&["notakeyvalue"])).is_err());
    }

    #[test]
    fn test_value_may_contain_equals() {
        let parsed = parse_autotemplate(&buffer(&["lstset={basicstyle=\\tiny}"])).unwrap();
        assert_eq!(parsed[0].1, "{basicstyle=\\tiny}");
    }

    #[test]
    fn test_parse_usepackage() {
        assert_eq!(
            parse_usepackage("{listings}").unwrap(),
            ("listings".to_string(), None)
        );
        assert_eq!(
            parse_usepackage("[utf8]{inputenc}").unwrap(),
            ("inputenc".to_string(), Some("[utf8]".to_string()))
        );
        assert!(parse_usepackage("listings").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("True").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn test_unify_user_package_options_win() {
        let defaults = default_autotemplate();
        let user = vec![(
            "usepackage".to_string(),
            "[pdftex]{graphicx}".to_string(),
        )];
        let merged = unify_autotemplates(vec![defaults, user]).unwrap();
        let graphicx: Vec<&(String, String)> = merged
            .iter()
            .filter(|(k, v)| k == "usepackage" && v.contains("graphicx"))
            .collect();
        assert_eq!(graphicx.len(), 1);
        assert_eq!(graphicx[0].1, "[pdftex]{graphicx}");
    }

    #[test]
    fn test_unify_documentclass_override() {
        let user = vec![(
            "documentclass".to_string(),
            "[compress]{beamer}".to_string(),
        )];
        let merged = unify_autotemplates(vec![default_autotemplate(), user]).unwrap();
        assert_eq!(merged[0].0, "documentclass");
        assert_eq!(merged[0].1, "[compress]{beamer}");
    }

    #[test]
    fn test_opening_contains_preamble_and_titlepage() {
        let merged = unify_autotemplates(vec![default_autotemplate()]).unwrap();
        let opening = expand_autotemplate_gen_opening(&merged).unwrap();
        assert!(opening.contains("\\documentclass{beamer}"));
        assert!(opening.contains("\\usepackage{listings}"));
        assert!(opening.contains("\\begin{document}"));
        assert!(opening.contains("\\frame{\\titlepage}"));
    }

    #[test]
    fn test_titleframe_false_suppresses_titlepage() {
        let user = vec![("titleframe".to_string(), "False".to_string())];
        let merged = unify_autotemplates(vec![default_autotemplate(), user]).unwrap();
        let opening = expand_autotemplate_gen_opening(&merged).unwrap();
        assert!(!opening.contains("\\titlepage"));
        // default package list still present
        assert!(opening.contains("\\usepackage{listings}"));
        assert!(opening.contains("\\usepackage{wasysym}"));
        assert!(opening.contains("\\usepackage{graphicx}"));
    }

    #[test]
    fn test_titleframeopts_passed_to_frame() {
        let user = vec![
            ("titleframeopts".to_string(), "[plain]".to_string()),
        ];
        let merged = unify_autotemplates(vec![default_autotemplate(), user]).unwrap();
        let opening = expand_autotemplate_gen_opening(&merged).unwrap();
        assert!(opening.contains("\\frame[plain]{\\titlepage}"));
    }

    #[test]
    fn test_expand_opening_sets_code_pos() {
        let mut state = ConversionState::new();
        let mut result = vec![String::new()];
        expand_autotemplate_opening(&mut result, &buffer(&[]), &mut state).unwrap();
        assert!(state.autotemplate_opened);
        assert_eq!(state.code_pos, result.len());
    }
}
