//! Code/animation expander
//!
//! Consumes a buffered `<[code]` block (first line = lstlisting options,
//! remaining lines = code body), tokenizes animation spans, generates
//! per-overlay variants and registers deduplicated `\defverbatim` blocks
//! under content-addressed names. The defverbatim blocks themselves are
//! accumulated in `ConversionState::defverbs` and spliced into the output
//! once at the end of the conversion; only the reference (a plain
//! `\name` or an overprint block) is emitted in place.

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::state::ConversionState;
use crate::utils::error::{ConversionError, ConversionResult};

/// Animated spans: non-greedy bracket matching, doubly-nested `[[...]]`
/// form first. `(?s)` so spans may cross line boundaries.
const ANIM_PATTERN: &str = r"(?s)\[\[.*?\]\]|\[.*?\]";

lazy_static! {
    static ref ANIM_RE: Regex = Regex::new(ANIM_PATTERN).unwrap();
    static ref SIMPLE_ANIM_RE: Regex = Regex::new(r"(?s)^\[<([0-9,\-]+)>(.*)\]$").unwrap();
    static ref DOUBLE_SPLIT_RE: Regex = Regex::new(r"\[|\]\[|\]").unwrap();
}

/// Probe cap for the escape-placeholder search. Hitting it is effectively
/// impossible for real input.
const MAX_PLACEHOLDER_PROBES: usize = 64;

/// An animation spec is either a simple `[<overlays>code]` span or the
/// double `[[spec][spec]...]` concatenation form. Double specs pad unset
/// overlays with spaces to keep listing columns aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnimKind {
    Simple,
    Double,
}

/// Find a placeholder pair for escaped brackets that occurs nowhere in
/// `text`. Starts from `"1"`/`"2"` and extends deterministically with a
/// cycling digit until both are collision-free.
fn search_escape_sequences(text: &str) -> ConversionResult<(String, String)> {
    let mut esc_open = String::from("1");
    let mut esc_close = String::from("2");
    let mut probes = 0;
    while text.contains(&esc_open) || text.contains(&esc_close) {
        let digit = char::from(b'0' + (probes % 10) as u8);
        esc_open.push(digit);
        esc_close.push(digit);
        probes += 1;
        if probes > MAX_PLACEHOLDER_PROBES {
            return Err(ConversionError::internal(
                "could not find a collision-free escape placeholder",
            ));
        }
    }
    Ok((esc_open, esc_close))
}

/// Split code into alternating non-animated and animated spans. The
/// returned `non_anim` always has one more element than `anim`, so the two
/// interleave as `non_anim[0] anim[0] non_anim[1] ... non_anim[n]`.
/// Escaped brackets are restored afterwards: to their escaped form inside
/// animated spans (they get re-escaped when parsed) and to plain brackets
/// in the non-animated text.
fn tokenize_anims(code: &str) -> ConversionResult<(Vec<String>, Vec<String>)> {
    let (esc_open, esc_close) = search_escape_sequences(code)?;
    let escaped = code.replace("\\[", &esc_open).replace("\\]", &esc_close);

    let mut anim = Vec::new();
    let mut non_anim = Vec::new();
    let mut last = 0;
    for m in ANIM_RE.find_iter(&escaped) {
        non_anim.push(escaped[last..m.start()].to_string());
        anim.push(m.as_str().to_string());
        last = m.end();
    }
    non_anim.push(escaped[last..].to_string());

    let anim = anim
        .into_iter()
        .map(|s| s.replace(&esc_open, "\\[").replace(&esc_close, "\\]"))
        .collect();
    let non_anim = non_anim
        .into_iter()
        .map(|s| s.replace(&esc_open, "[").replace(&esc_close, "]"))
        .collect();
    Ok((anim, non_anim))
}

/// Parse an overlay set: comma-separated integers and `lo-hi` ranges,
/// duplicates removed (first occurrence wins the position).
fn parse_overlay_spec(overlayspec: &str) -> ConversionResult<Vec<u32>> {
    let mut overlays: Vec<u32> = Vec::new();
    let mut push_unique = |overlays: &mut Vec<u32>, n: u32| {
        if !overlays.contains(&n) {
            overlays.push(n);
        }
    };

    for group in overlayspec.split(',') {
        let group = group.trim();
        if group.contains('-') {
            let nums: Vec<&str> = group.split('-').collect();
            if nums.len() < 2 {
                return Err(ConversionError::syntax(
                    "overlay specs must be of the form <(N-N)|(N), ...>",
                    overlayspec,
                ));
            }
            let start: u32 = nums[0].parse().map_err(|_| {
                ConversionError::syntax(
                    "not an int, overlay specs must be of the form <(N-N)|(N), ...>",
                    overlayspec,
                )
            })?;
            let stop: u32 = nums[1].parse().map_err(|_| {
                ConversionError::syntax(
                    "not an int, overlay specs must be of the form <(N-N)|(N), ...>",
                    overlayspec,
                )
            })?;
            for n in start..=stop {
                push_unique(&mut overlays, n);
            }
        } else {
            let num: u32 = group.parse().map_err(|_| {
                ConversionError::syntax(
                    "not an int, overlay specs must be of the form <(N-N)|(N), ...>",
                    overlayspec,
                )
            })?;
            push_unique(&mut overlays, num);
        }
    }

    Ok(overlays)
}

/// Parse a simple `[<overlays>code]` span into (overlay, code) pairs.
fn parse_simple_animspec(animspec: &str) -> ConversionResult<Vec<(u32, String)>> {
    let (esc_open, esc_close) = search_escape_sequences(animspec)?;
    let escaped = animspec.replace("\\[", &esc_open).replace("\\]", &esc_close);

    let Some(caps) = SIMPLE_ANIM_RE.captures(&escaped) else {
        return Err(ConversionError::syntax(
            "specification does not match [<overlays>code]",
            animspec,
        ));
    };
    let overlays = parse_overlay_spec(&caps[1])?;
    let code = caps[2].replace(&esc_open, "[").replace(&esc_close, "]");

    Ok(overlays.into_iter().map(|o| (o, code.clone())).collect())
}

/// Parse an animation span as either the simple or the double form.
fn parse_animspec(animspec: &str) -> ConversionResult<(AnimKind, Vec<(u32, String)>)> {
    if animspec.len() < 4 || !animspec.starts_with("[[") {
        return Ok((AnimKind::Simple, parse_simple_animspec(animspec)?));
    }

    let (esc_open, esc_close) = search_escape_sequences(animspec)?;
    let escaped = animspec.replace("\\[", &esc_open).replace("\\]", &esc_close);

    let mut parsed = Vec::new();
    for part in DOUBLE_SPLIT_RE.split(&escaped) {
        if part.trim().is_empty() {
            continue;
        }
        let simple = format!("[{}]", part)
            .replace(&esc_open, "\\[")
            .replace(&esc_close, "\\]");
        parsed.extend(parse_simple_animspec(&simple)?);
    }
    Ok((AnimKind::Double, parsed))
}

fn get_max_overlay(parsed_anims: &[Vec<(u32, String)>]) -> u32 {
    parsed_anims
        .iter()
        .flat_map(|anim| anim.iter().map(|(o, _)| *o))
        .max()
        .unwrap_or(0)
}

fn get_min_overlay(parsed_anims: &[Vec<(u32, String)>]) -> u32 {
    parsed_anims
        .iter()
        .flat_map(|anim| anim.iter().map(|(o, _)| *o))
        .min()
        .unwrap_or(0)
}

/// Generate the per-overlay variants of one animated span, one entry per
/// overlay in `[min_overlay, max_overlay]`. Overlays the span does not
/// mention render as spaces (double form: padded to the longest variant so
/// listing columns stay aligned; simple form: empty).
fn gen_anims(
    parsed_animspec: &[(u32, String)],
    min_overlay: u32,
    max_overlay: u32,
    kind: AnimKind,
) -> Vec<String> {
    let maxlen = match kind {
        AnimKind::Double => parsed_animspec
            .iter()
            .map(|(_, code)| code.chars().count())
            .max()
            .unwrap_or(0),
        AnimKind::Simple => 0,
    };
    let fill = " ".repeat(maxlen);
    let slots = (max_overlay + 1).saturating_sub(min_overlay) as usize;
    let mut out = vec![fill; slots];

    for (overlay, code) in parsed_animspec {
        if let Some(index) = overlay.checked_sub(min_overlay) {
            if let Some(slot) = out.get_mut(index as usize) {
                *slot = code.clone();
            }
        }
    }
    out
}

/// Letters-only name derived from the content hash, usable as a LaTeX
/// control sequence (32 chars drawn from `a..=p`, one per nibble).
fn get_code_name(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    digest[..16]
        .iter()
        .flat_map(|byte| [byte >> 4, byte & 0x0f])
        .map(|nibble| char::from(b'a' + nibble))
        .collect()
}

fn make_defverb(content: &str, name: &str) -> String {
    format!("\\defverbatim[colored]\\{}{{\n{}\n}}", name, content)
}

fn make_lstlisting(content: &str, options: &str) -> String {
    format!(
        "\\begin{{lstlisting}}{}\n{}\\end{{lstlisting}}",
        options, content
    )
}

/// Generate a collision-free entry for the defverbs map: identical content
/// always reuses the same name, distinct content under a colliding hash is
/// rehashed with a deterministic suffix until the name is free.
fn get_unique_name(state: &ConversionState, code: &str, lstparams: &str) -> (String, String) {
    let mut name = get_code_name(code);
    let mut expanded = make_defverb(&make_lstlisting(code, lstparams), &name);
    let mut rehash = String::new();
    let mut attempt: u32 = 0;

    while state
        .defverbs
        .get(&name)
        .is_some_and(|existing| existing != &expanded)
    {
        rehash.push(char::from(b'A' + (attempt % 26) as u8));
        attempt += 1;
        name = get_code_name(&format!("{}{}", code, rehash));
        expanded = make_defverb(&make_lstlisting(code, lstparams), &name);
    }

    (name, expanded)
}

/// The Beamer overprint block pairing each overlay with its verbatim name.
fn make_overprint(names: &[String], min_overlay: u32) -> String {
    let mut out = String::from("\\begin{overprint}\n");
    for (index, name) in names.iter().enumerate() {
        out.push_str(&format!(
            "  \\onslide<{}>\\{}\n",
            index as u32 + min_overlay,
            name
        ));
    }
    out.push_str("\\end{overprint}\n");
    out
}

/// Expand one buffered code block into `result`, registering defverbatim
/// entries in the state. The first buffered line holds the lstlisting
/// options.
pub fn expand_code_segment(
    result: &mut Vec<String>,
    codebuffer: &[String],
    state: &mut ConversionState,
) -> ConversionResult<()> {
    let lstparams = codebuffer.first().cloned().unwrap_or_default();
    // body lines rejoined with their newlines; an options-only buffer is
    // an empty block
    let code = if codebuffer.len() > 1 {
        let mut body = codebuffer[1..].join("\n");
        body.push('\n');
        body
    } else {
        String::new()
    };

    let (anim, non_anim) = tokenize_anims(&code)?;
    if !anim.is_empty() {
        let parsed: Vec<(AnimKind, Vec<(u32, String)>)> = anim
            .iter()
            .map(|spec| parse_animspec(spec))
            .collect::<ConversionResult<_>>()?;
        let parsed_lists: Vec<Vec<(u32, String)>> =
            parsed.iter().map(|(_, list)| list.clone()).collect();

        let max_overlay = get_max_overlay(&parsed_lists);
        // if there is unanimated code, it is visible from the start
        let min_overlay = if non_anim.iter().any(|s| !s.is_empty()) {
            1
        } else {
            get_min_overlay(&parsed_lists)
        };

        let gen: Vec<Vec<String>> = parsed
            .iter()
            .map(|(kind, list)| gen_anims(list, min_overlay, max_overlay, *kind))
            .collect();

        let mut names = Vec::new();
        for (slot, _overlay) in (min_overlay..=max_overlay).enumerate() {
            // combine non-animated and animated parts for this overlay
            let mut overlay_code = String::new();
            for (i, plain) in non_anim.iter().enumerate() {
                overlay_code.push_str(plain);
                if let Some(variants) = gen.get(i) {
                    overlay_code.push_str(&variants[slot]);
                }
            }

            let (name, expanded) = get_unique_name(state, &overlay_code, &lstparams);
            state.defverbs.insert(name.clone(), expanded);
            names.push(name);
        }

        result.push(make_overprint(&names, min_overlay));
    } else {
        // no animations: a single defverbatim, referenced in place
        let code = code.replace("\\[", "[").replace("\\]", "]");
        let (name, expanded) = get_unique_name(state, &code, &lstparams);
        state.defverbs.insert(name.clone(), expanded);
        result.push(format!("\n\\{}\n", name));
    }

    Ok(())
}

/// Splice the accumulated defverbatim blocks into the output at
/// `code_pos` (right after the autotemplate opening, or the very start).
pub fn expand_code_defverbs(result: &mut [String], state: &mut ConversionState) {
    let joined = state
        .defverbs
        .values()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    result[state.code_pos].push_str(&joined);
    result[state.code_pos].push('\n');
    state.defverbs.clear();
}
