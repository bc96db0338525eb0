//! Token-level diff between two XML payloads, rendered as HTML.
//!
//! The edit script is computed with Myers' O(ND) algorithm over word,
//! whitespace and symbol tokens, then passed through a semantic cleanup
//! that folds short equal runs sandwiched between edits into the edits
//! themselves. The cleanup trades a little edit-distance optimality for a
//! diff a human can actually read; without it, reordered attributes and
//! whitespace churn produce confetti.

/// Edit depth above which the diff degrades to a whole-document
/// replacement. Keeps the O(ND) trace bounded on pathological inputs.
const MAX_EDIT_DEPTH: usize = 512;

/// One fragment of the edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    /// Text present in both payloads.
    Equal(String),
    /// Text present only in the reference.
    Delete(String),
    /// Text present only in the candidate.
    Insert(String),
}

/// Diff `candidate` against `reference` and render the result as HTML.
///
/// Returns `None` when the payloads are identical. Deletions mark text only
/// the reference has, insertions text only the candidate has.
pub fn diff_html(reference: &str, candidate: &str) -> Option<String> {
    let ops = diff_ops(reference, candidate)?;
    Some(render_html(&ops))
}

/// Compute the cleaned edit script, or `None` when the inputs are equal.
pub fn diff_ops(reference: &str, candidate: &str) -> Option<Vec<DiffOp>> {
    if reference == candidate {
        return None;
    }
    let ref_tokens = tokenize(reference);
    let cand_tokens = tokenize(candidate);
    let mut ops = myers(&ref_tokens, &cand_tokens);
    cleanup_semantic(&mut ops);
    Some(ops)
}

/// Split text into words, whitespace runs and single symbol characters.
///
/// Markup punctuation stays one-character-per-token so that edits inside a
/// tag do not swallow the surrounding angle brackets.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut kind: Option<bool> = None; // Some(true) word, Some(false) whitespace
    for (idx, ch) in text.char_indices() {
        let this = if ch.is_alphanumeric() || ch == '_' {
            Some(true)
        } else if ch.is_whitespace() {
            Some(false)
        } else {
            None
        };
        match (kind, this) {
            (Some(prev), Some(cur)) if prev == cur => continue,
            _ => {}
        }
        if idx > start {
            tokens.push(&text[start..idx]);
        }
        start = idx;
        kind = this;
        if this.is_none() {
            // Symbol characters are their own tokens.
            tokens.push(&text[idx..idx + ch.len_utf8()]);
            start = idx + ch.len_utf8();
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Myers' greedy shortest-edit-script search with backtracking.
fn myers(a: &[&str], b: &[&str]) -> Vec<DiffOp> {
    let (prefix, a, b, suffix) = trim_common_ends(a, b);

    let n = a.len();
    let m = b.len();
    let offset = n + m;
    let mut v = vec![0usize; 2 * (n + m) + 2];
    let mut trace: Vec<Vec<usize>> = Vec::new();
    let mut found_depth = None;

    'search: for d in 0..=(n + m).min(MAX_EDIT_DEPTH) {
        trace.push(v.clone());
        let d_i = d as isize;
        let mut k = -d_i;
        while k <= d_i {
            let ki = (offset as isize + k) as usize;
            let mut x = if k == -d_i || (k != d_i && v[ki - 1] < v[ki + 1]) {
                v[ki + 1]
            } else {
                v[ki - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            while x < n && y < m && a[x] == b[y] {
                x += 1;
                y += 1;
            }
            v[ki] = x;
            if x >= n && y >= m {
                found_depth = Some(d);
                break 'search;
            }
            k += 2;
        }
    }

    let mut ops = Vec::new();
    if !prefix.is_empty() {
        ops.push(DiffOp::Equal(prefix.concat()));
    }
    match found_depth {
        Some(depth) => backtrack(a, b, &trace, depth, offset, &mut ops),
        None => {
            // Too dissimilar to be worth a fine-grained script.
            if !a.is_empty() {
                ops.push(DiffOp::Delete(a.concat()));
            }
            if !b.is_empty() {
                ops.push(DiffOp::Insert(b.concat()));
            }
        }
    }
    if !suffix.is_empty() {
        ops.push(DiffOp::Equal(suffix.concat()));
    }
    merge_ops(&mut ops);
    ops
}

fn trim_common_ends<'a, 'b>(
    a: &'b [&'a str],
    b: &'b [&'a str],
) -> (&'b [&'a str], &'b [&'a str], &'b [&'a str], &'b [&'a str]) {
    let mut head = 0;
    while head < a.len() && head < b.len() && a[head] == b[head] {
        head += 1;
    }
    let mut tail = 0;
    while tail < a.len() - head && tail < b.len() - head
        && a[a.len() - 1 - tail] == b[b.len() - 1 - tail]
    {
        tail += 1;
    }
    (
        &a[..head],
        &a[head..a.len() - tail],
        &b[head..b.len() - tail],
        &a[a.len() - tail..],
    )
}

fn backtrack(
    a: &[&str],
    b: &[&str],
    trace: &[Vec<usize>],
    depth: usize,
    offset: usize,
    ops: &mut Vec<DiffOp>,
) {
    let mut reversed = Vec::new();
    let mut x = a.len();
    let mut y = b.len();

    for d in (0..=depth).rev() {
        if d == 0 {
            // Depth zero can only be reached on the k = 0 diagonal.
            while x > 0 && y > 0 {
                reversed.push(DiffOp::Equal(a[x - 1].to_string()));
                x -= 1;
                y -= 1;
            }
            break;
        }
        let v = &trace[d];
        let d_i = d as isize;
        let k = x as isize - y as isize;
        let prev_k = if k == -d_i || (k != d_i && v[(offset as isize + k - 1) as usize]
            < v[(offset as isize + k + 1) as usize])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(offset as isize + prev_k) as usize];
        let prev_y = (prev_x as isize - prev_k) as usize;

        while x > prev_x && y > prev_y {
            reversed.push(DiffOp::Equal(a[x - 1].to_string()));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                reversed.push(DiffOp::Insert(b[prev_y].to_string()));
            } else {
                reversed.push(DiffOp::Delete(a[prev_x].to_string()));
            }
        }
        x = prev_x;
        y = prev_y;
    }

    ops.extend(reversed.into_iter().rev());
}

/// Coalesce runs of same-kind ops; within one edit run deletions come first.
fn merge_ops(ops: &mut Vec<DiffOp>) {
    let mut merged: Vec<DiffOp> = Vec::with_capacity(ops.len());
    let mut deleted = String::new();
    let mut inserted = String::new();
    let mut equal = String::new();

    let flush_edits = |merged: &mut Vec<DiffOp>, deleted: &mut String, inserted: &mut String| {
        if !deleted.is_empty() {
            merged.push(DiffOp::Delete(std::mem::take(deleted)));
        }
        if !inserted.is_empty() {
            merged.push(DiffOp::Insert(std::mem::take(inserted)));
        }
    };

    for op in ops.drain(..) {
        match op {
            DiffOp::Equal(text) => {
                flush_edits(&mut merged, &mut deleted, &mut inserted);
                equal.push_str(&text);
            }
            DiffOp::Delete(text) => {
                if !equal.is_empty() {
                    merged.push(DiffOp::Equal(std::mem::take(&mut equal)));
                }
                deleted.push_str(&text);
            }
            DiffOp::Insert(text) => {
                if !equal.is_empty() {
                    merged.push(DiffOp::Equal(std::mem::take(&mut equal)));
                }
                inserted.push_str(&text);
            }
        }
    }
    flush_edits(&mut merged, &mut deleted, &mut inserted);
    if !equal.is_empty() {
        merged.push(DiffOp::Equal(equal));
    }
    *ops = merged;
}

/// Fold short equalities that sit between two edits into the edits.
///
/// An equal run no longer than the larger of its surrounding edit runs is
/// demoted to a paired delete+insert, which then merges with its
/// neighbors. Repeats until a pass makes no change.
fn cleanup_semantic(ops: &mut Vec<DiffOp>) {
    loop {
        let mut changed = false;
        let mut idx = 1;
        while idx + 1 < ops.len() {
            let demote = match (&ops[idx - 1], &ops[idx], &ops[idx + 1]) {
                (before, DiffOp::Equal(eq), after)
                    if is_edit(before) && is_edit(after) =>
                {
                    let eq_len = eq.chars().count();
                    eq_len <= edit_len(before).max(edit_len(after))
                }
                _ => false,
            };
            if demote {
                let DiffOp::Equal(text) = ops.remove(idx) else {
                    unreachable!("demoted op is an equality");
                };
                ops.insert(idx, DiffOp::Delete(text.clone()));
                ops.insert(idx + 1, DiffOp::Insert(text));
                changed = true;
            }
            idx += 1;
        }
        if changed {
            merge_ops(ops);
        } else {
            break;
        }
    }
}

fn is_edit(op: &DiffOp) -> bool {
    !matches!(op, DiffOp::Equal(_))
}

fn edit_len(op: &DiffOp) -> usize {
    match op {
        DiffOp::Equal(text) | DiffOp::Delete(text) | DiffOp::Insert(text) => text.chars().count(),
    }
}

/// Render an edit script with `<ins>`/`<del>` markers and escaped payloads.
fn render_html(ops: &[DiffOp]) -> String {
    let mut html = String::new();
    for op in ops {
        match op {
            DiffOp::Equal(text) => {
                html.push_str("<span>");
                html.push_str(&escape_html(text));
                html.push_str("</span>");
            }
            DiffOp::Delete(text) => {
                html.push_str("<del style=\"background:#ffe6e6;\">");
                html.push_str(&escape_html(text));
                html.push_str("</del>");
            }
            DiffOp::Insert(text) => {
                html.push_str("<ins style=\"background:#e6ffe6;\">");
                html.push_str(&escape_html(text));
                html.push_str("</ins>");
            }
        }
    }
    html
}

/// Escape text for embedding in the report, marking line breaks visibly.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&para;<br>"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_produce_no_diff() {
        assert_eq!(diff_html("<a/>", "<a/>"), None);
        assert_eq!(diff_html("", ""), None);
    }

    #[test]
    fn tokenizer_splits_words_whitespace_and_symbols() {
        assert_eq!(
            tokenize("<a href=\"x\">hi there</a>"),
            vec!["<", "a", " ", "href", "=", "\"", "x", "\"", ">", "hi", " ", "there", "<", "/", "a", ">"],
        );
    }

    #[test]
    fn single_token_change_is_marked() {
        let html = diff_html("<a>2</a>", "<a>1</a>").unwrap();
        assert!(html.contains("<del style=\"background:#ffe6e6;\">2</del>"), "{html}");
        assert!(html.contains("<ins style=\"background:#e6ffe6;\">1</ins>"), "{html}");
        assert!(html.contains("<span>&lt;a&gt;</span>"), "{html}");
    }

    #[test]
    fn pure_insertion_and_deletion() {
        let ops = diff_ops("a b", "a b c").unwrap();
        assert_eq!(
            ops,
            vec![
                DiffOp::Equal("a b".to_string()),
                DiffOp::Insert(" c".to_string()),
            ],
        );
        let ops = diff_ops("a b c", "a b").unwrap();
        assert_eq!(
            ops,
            vec![
                DiffOp::Equal("a b".to_string()),
                DiffOp::Delete(" c".to_string()),
            ],
        );
    }

    #[test]
    fn semantic_cleanup_folds_short_gap_between_edits() {
        // "alpha x gamma" -> "beta x delta": the one-token "x" gap should
        // fold into one delete+insert pair instead of three fragments.
        let ops = diff_ops("alpha x gamma", "beta x delta").unwrap();
        assert_eq!(
            ops,
            vec![
                DiffOp::Delete("alpha x gamma".to_string()),
                DiffOp::Insert("beta x delta".to_string()),
            ],
        );
    }

    #[test]
    fn long_equal_run_survives_cleanup() {
        let ops = diff_ops(
            "start middle-section-stays-put end1",
            "begin middle-section-stays-put end2",
        )
        .unwrap();
        assert!(
            ops.iter()
                .any(|op| matches!(op, DiffOp::Equal(text) if text.contains("middle-section-stays-put"))),
            "{ops:?}",
        );
    }

    #[test]
    fn payload_markup_is_escaped() {
        let html = diff_html("<a>1</a>", "<b>1&2</b>").unwrap();
        assert!(!html.contains("<a>"), "{html}");
        assert!(html.contains("&amp;"), "{html}");
    }

    #[test]
    fn line_breaks_render_visibly() {
        let html = diff_html("one\ntwo", "one\nthree").unwrap();
        assert!(html.contains("&para;<br>"), "{html}");
    }

    #[test]
    fn completely_disjoint_inputs_become_replacement() {
        let ops = diff_ops("aaa bbb", "ccc ddd").unwrap();
        assert_eq!(
            ops,
            vec![
                DiffOp::Delete("aaa bbb".to_string()),
                DiffOp::Insert("ccc ddd".to_string()),
            ],
        );
    }
}
