//! Unified diff generation utilities.
//!
//! Guard rewrites never add or remove lines, so a diff only needs to pair
//! line `n` of the old text with line `n` of the new text. Consecutive
//! changed lines are grouped into one hunk, with up to [`CONTEXT_LINES`]
//! unchanged lines around each hunk.

use crate::guard::FilePatch;

/// Unchanged lines shown before and after each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Generate a unified diff for one file.
///
/// Returns an empty string when the texts are identical. Texts with a
/// different number of lines are rendered as a single whole-file hunk.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }

    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let mut diff = String::new();
    diff.push_str(&format!("--- a/{}\n", path));
    diff.push_str(&format!("+++ b/{}\n", path));

    if old_lines.len() != new_lines.len() {
        diff.push_str(&format!(
            "@@ -1,{} +1,{} @@\n",
            old_lines.len(),
            new_lines.len()
        ));
        for line in &old_lines {
            diff.push_str(&format!("-{}\n", line));
        }
        for line in &new_lines {
            diff.push_str(&format!("+{}\n", line));
        }
        return diff;
    }

    let changed: Vec<usize> = (0..old_lines.len())
        .filter(|&i| old_lines[i] != new_lines[i])
        .collect();

    for (start, end) in hunk_ranges(&changed, old_lines.len()) {
        let len = end - start;
        diff.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            start + 1,
            len,
            start + 1,
            len
        ));
        // Removed lines of a run come before its added lines.
        let mut i = start;
        while i < end {
            if old_lines[i] == new_lines[i] {
                diff.push_str(&format!(" {}\n", old_lines[i]));
                i += 1;
                continue;
            }
            let run_start = i;
            while i < end && old_lines[i] != new_lines[i] {
                i += 1;
            }
            for line in &old_lines[run_start..i] {
                diff.push_str(&format!("-{}\n", line));
            }
            for line in &new_lines[run_start..i] {
                diff.push_str(&format!("+{}\n", line));
            }
        }
    }

    diff
}

/// Merge changed line indices into `[start, end)` hunk ranges with context.
fn hunk_ranges(changed: &[usize], total: usize) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &idx in changed {
        let start = idx.saturating_sub(CONTEXT_LINES);
        let end = (idx + 1 + CONTEXT_LINES).min(total);
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }
    ranges
}

/// Generate a unified diff covering every patched file.
pub fn patches_diff(patches: &[FilePatch]) -> String {
    patches
        .iter()
        .map(|p| unified_diff(&p.path, &p.before, &p.after))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
