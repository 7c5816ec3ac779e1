//! Literal extraction for trigram filtering.
//!
//! Lifts substrings of length >= 3 that every match of the pattern must
//! contain. Alternation groups whose branches are plain word runs
//! contribute every branch; word-class runs elsewhere contribute
//! themselves. Filtering downstream unions per-literal candidate sets, so
//! branch literals stay sound. A character governed by `*`, `?`, or `{` is
//! excluded from its run, a `+`-quantified character terminates the run
//! after itself, and runs inside optionally-quantified groups are dropped
//! entirely: a literal must never span something the regex can skip.

use std::collections::HashSet;

const MIN_LITERAL_LENGTH: usize = 3;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_usable_literal(run: &str) -> bool {
    run.len() >= MIN_LITERAL_LENGTH && run.chars().any(|c| c.is_ascii_alphanumeric())
}

/// Extract trigram-ready literals from a pattern.
///
/// Deterministic, order-preserving, duplicate-suppressing, and linear in
/// the pattern length. Runs on simple and complex patterns alike; only
/// simple patterns consume the output for filtering.
pub fn extract_literals(pattern: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    collect_alternation_branches(pattern, &mut candidates);
    collect_word_runs(pattern, &mut candidates);

    let mut literals = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for candidate in candidates {
        if is_usable_literal(&candidate) && seen.insert(candidate.clone()) {
            literals.push(candidate);
        }
    }
    literals
}

fn collect_alternation_branches(pattern: &str, out: &mut Vec<String>) {
    let chars: Vec<(usize, char)> = pattern.char_indices().collect();
    let mut escaped = false;
    let mut in_class = false;
    let mut i = 0;

    while i < chars.len() {
        let (start_offset, c) = chars[i];
        if escaped {
            escaped = false;
            i += 1;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => {
                // Only plain groups: (? constructs never reach here on the
                // simple path, and their branches are not mandatory anyway.
                if chars.get(i + 1).map(|&(_, next)| next) == Some('?') {
                    i += 1;
                    continue;
                }
                if let Some(end) = find_group_end(&chars, i + 1) {
                    let (end_offset, _) = chars[end];
                    let body = &pattern[start_offset + 1..end_offset];
                    let quantified = chars
                        .get(end + 1)
                        .map(|&(_, q)| matches!(q, '*' | '?' | '{'))
                        .unwrap_or(false);
                    if !quantified
                        && body.contains('|')
                        && body.chars().all(|b| is_word_char(b) || b == '|')
                    {
                        for branch in body.split('|') {
                            out.push(branch.to_string());
                        }
                        i = end + 1;
                        continue;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
}

/// Index of the `)` closing the group opened just before `from`, provided
/// the group body contains no nested groups or classes.
fn find_group_end(chars: &[(usize, char)], from: usize) -> Option<usize> {
    let mut escaped = false;
    for (idx, &(_, c)) in chars.iter().enumerate().skip(from) {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ')' => return Some(idx),
            '(' | '[' => return None,
            _ => {}
        }
    }
    None
}

/// Marks every character inside a group quantified by `*`, `?`, or `{`.
/// Content the regex can skip never contributes a mandatory literal.
fn optional_group_exclusions(chars: &[char]) -> Vec<bool> {
    let mut excluded = vec![false; chars.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut escaped = false;
    let mut in_class = false;

    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => stack.push(i),
            ')' if !in_class => {
                if let Some(open) = stack.pop() {
                    let quantified = chars
                        .get(i + 1)
                        .map(|&q| matches!(q, '*' | '?' | '{'))
                        .unwrap_or(false);
                    if quantified {
                        for slot in excluded.iter_mut().take(i + 1).skip(open) {
                            *slot = true;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    excluded
}

fn collect_word_runs(pattern: &str, out: &mut Vec<String>) {
    let chars: Vec<char> = pattern.chars().collect();
    let excluded = optional_group_exclusions(&chars);
    let mut escaped = false;
    let mut run = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if escaped {
            escaped = false;
            flush_run(&mut run, out);
            i += 1;
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                flush_run(&mut run, out);
                i += 1;
            }
            '[' => {
                flush_run(&mut run, out);
                i = skip_delimited(&chars, i + 1, ']');
            }
            '{' => {
                // Counted-repetition body: digits in {2,5} are not content.
                flush_run(&mut run, out);
                i = skip_delimited(&chars, i + 1, '}');
            }
            c if is_word_char(c) && !excluded[i] => {
                match chars.get(i + 1) {
                    // An optional character cannot appear in a mandatory
                    // literal; drop it and its quantifier.
                    Some('*') | Some('?') => {
                        flush_run(&mut run, out);
                        i += 2;
                    }
                    // The brace body is skipped by the '{' arm next round.
                    Some('{') => {
                        flush_run(&mut run, out);
                        i += 1;
                    }
                    // A + character is always present but can repeat, so
                    // the run ends with it.
                    Some('+') => {
                        run.push(c);
                        flush_run(&mut run, out);
                        i += 2;
                    }
                    _ => {
                        run.push(c);
                        i += 1;
                    }
                }
            }
            _ => {
                flush_run(&mut run, out);
                i += 1;
            }
        }
    }
    flush_run(&mut run, out);
}

/// First index past the closing delimiter, honoring escapes.
fn skip_delimited(chars: &[char], from: usize, close: char) -> usize {
    let mut escaped = false;
    let mut i = from;
    while i < chars.len() {
        let c = chars[i];
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == close {
            return i + 1;
        }
        i += 1;
    }
    i
}

fn flush_run(run: &mut String, out: &mut Vec<String>) {
    if !run.is_empty() {
        out.push(std::mem::take(run));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_word_pattern() {
        assert_eq!(extract_literals("function"), vec!["function"]);
    }

    #[test]
    fn test_runs_split_by_metacharacters() {
        assert_eq!(extract_literals("foo.*barbaz"), vec!["foo", "barbaz"]);
        assert_eq!(extract_literals("^type"), vec!["type"]);
    }

    #[test]
    fn test_short_runs_dropped() {
        assert_eq!(extract_literals("ab.cd"), Vec::<String>::new());
        assert_eq!(extract_literals("ab|cde"), vec!["cde"]);
    }

    #[test]
    fn test_alternation_group_branches_first() {
        let literals = extract_literals("(alpha|beta)suffix");
        assert_eq!(literals, vec!["alpha", "beta", "suffix"]);
    }

    #[test]
    fn test_quantified_group_contents_skipped() {
        // The whole group is optional, so nothing inside is mandatory.
        assert_eq!(extract_literals("(alpha|beta)*suffix"), vec!["suffix"]);
        assert_eq!(extract_literals("(alpha)?suffix"), vec!["suffix"]);
    }

    #[test]
    fn test_quantified_character_excluded_from_run() {
        // `c` may repeat but is present: run ends after it.
        assert_eq!(extract_literals("abc+def"), vec!["abc", "def"]);
        // `c` may be absent entirely.
        assert_eq!(extract_literals("abc*def"), vec!["def"]);
        assert_eq!(extract_literals("abc?def"), vec!["def"]);
        assert_eq!(extract_literals("abc{2}def"), vec!["def"]);
    }

    #[test]
    fn test_repetition_counts_are_not_content() {
        assert_eq!(extract_literals("x{100}needle"), vec!["needle"]);
    }

    #[test]
    fn test_escapes_break_runs() {
        assert_eq!(extract_literals(r"foo\dbar"), vec!["foo", "bar"]);
        assert_eq!(extract_literals(r"foo\.bar"), vec!["foo", "bar"]);
    }

    #[test]
    fn test_class_contents_ignored() {
        assert_eq!(extract_literals("[abc]needle"), vec!["needle"]);
    }

    #[test]
    fn test_duplicates_suppressed_in_order() {
        assert_eq!(extract_literals("(foo|bar)foo.bar"), vec!["foo", "bar"]);
    }

    #[test]
    fn test_underscore_only_run_rejected() {
        assert_eq!(extract_literals("____"), Vec::<String>::new());
        assert_eq!(extract_literals("_ab_"), vec!["_ab_"]);
    }

    #[test]
    fn test_every_literal_is_substring_of_pattern() {
        for pattern in [
            "(get|set)Value",
            "foo.*bar[0-9]+baz",
            r"handle\s+request",
            "parse_json|parse_yaml",
        ] {
            for literal in extract_literals(pattern) {
                assert!(
                    pattern.contains(&literal),
                    "{:?} not in {:?}",
                    literal,
                    pattern
                );
                assert!(literal.len() >= 3);
                assert!(literal.chars().any(|c| c.is_ascii_alphanumeric()));
            }
        }
    }
}
