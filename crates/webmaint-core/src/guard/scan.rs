//! Lexical helpers for locating call sites.
//!
//! These work on raw source text without parsing it. All delimiters the
//! scanner cares about are ASCII, so byte-indexing a UTF-8 string is safe:
//! continuation bytes of multi-byte characters never equal an ASCII byte.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::WINDOW_GUARD;

/// Matches a `typeof window` check that protects whatever follows on the line.
///
/// Accepts `!==`/`!=` followed by `?`, `&&` or a closing paren (ternary,
/// short-circuit, `if (...)`), and `===`/`==` followed by `?`/`||`. No
/// statement terminator may sit between the guard and the end of the prefix.
fn guard_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"typeof\s+window\s*(?:!==?\s*['"]undefined['"]\s*(?:\?|&&|\))|===?\s*['"]undefined['"]\s*(?:\?|\|\|))[^;]*$"#,
        )
        .expect("guard regex is valid")
    })
}

/// Matches an assignment or update operator at the start of the text.
fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(?:\*\*|<<|>>>|>>|\|\||&&|\?\?|[-+*/%|&^])?=(?:[^=>]|$)|\+\+|--)")
            .expect("assignment regex is valid")
    })
}

/// Text from the start of the line containing `pos` up to `pos`.
pub(crate) fn line_prefix(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    &text[line_start..pos]
}

/// 1-based line and column (in characters) of a byte offset.
pub(crate) fn line_col(text: &str, pos: usize) -> (u32, u32) {
    let before = &text[..pos];
    let line = before.matches('\n').count() + 1;
    let col = line_prefix(text, pos).chars().count() + 1;
    (line as u32, col as u32)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// True when the match is a property of some other object (`foo.window`,
/// `win.localStorage`) or the tail of a longer identifier.
pub(crate) fn is_member_access(text: &str, start: usize) -> bool {
    match text.as_bytes()[..start].last() {
        Some(&b) => b == b'.' || is_ident_byte(b),
        None => false,
    }
}

/// True when the match is the operand of `typeof` or `delete`.
pub(crate) fn follows_operator_keyword(prefix: &str) -> bool {
    let trimmed = prefix.trim_end();
    ["typeof", "delete"].iter().any(|kw| {
        trimmed.strip_suffix(kw).is_some_and(|rest| {
            rest.as_bytes()
                .last()
                .map_or(true, |&b| !is_ident_byte(b))
        })
    })
}

/// True when the match sits after a line comment marker or on a block
/// comment continuation line.
pub(crate) fn in_comment(prefix: &str) -> bool {
    let trimmed = prefix.trim_start();
    prefix.contains("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// True when a `typeof window` check already protects the match.
pub(crate) fn is_guarded(prefix: &str) -> bool {
    guard_regex().is_match(prefix)
}

/// Byte ranges of every `(typeof window !== 'undefined' ? ... )` wrapper in
/// `text`, as produced by [`GuardKind::wrap`](super::GuardKind::wrap).
///
/// Wrappers may span lines and nest; anything inside one is already guarded.
pub(crate) fn wrapped_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    for (pos, _) in text.match_indices(WINDOW_GUARD) {
        let Some(open) = pos.checked_sub(1) else {
            continue;
        };
        let wrapper = text.as_bytes()[open] == b'('
            && text[pos + WINDOW_GUARD.len()..].starts_with(" ?");
        if !wrapper {
            continue;
        }
        if let Some(end) = matching_paren(text, open) {
            spans.push(open..end);
        }
    }
    spans
}

/// True when `pos` falls inside one of `spans`.
pub(crate) fn inside_any(spans: &[Range<usize>], pos: usize) -> bool {
    spans.iter().any(|span| span.contains(&pos))
}

/// True when the text after a match assigns to or updates it.
pub(crate) fn is_assignment_target(rest: &str) -> bool {
    assignment_regex().is_match(rest)
}

/// Find the end (exclusive) of the argument list opening at `open`.
///
/// `text[open]` must be `(`. String and template literals are skipped so
/// parens inside them do not count. Returns `None` when the list is not
/// closed.
pub(crate) fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            quote @ (b'\'' | b'"' | b'`') => {
                i = skip_string(bytes, i, quote)?;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Return the index just past the literal starting at `start`.
fn skip_string(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
        } else if b == quote {
            return Some(i + 1);
        } else if b == b'\n' && quote != b'`' {
            return None;
        } else {
            i += 1;
        }
    }
    None
}

/// Extend a callee match over its argument list, if one follows directly.
///
/// Returns `Some(range)` covering callee and arguments, the bare callee when
/// no `(` follows and a call is optional, or `None` when the site must be
/// left alone.
pub(crate) fn extend_over_call(
    text: &str,
    callee: Range<usize>,
    call_required: bool,
) -> Option<Range<usize>> {
    if text[callee.end..].starts_with('(') {
        let end = matching_paren(text, callee.end)?;
        Some(callee.start..end)
    } else if call_required {
        None
    } else {
        Some(callee)
    }
}

// ============================================================================
// Tests
// ============================================================================
