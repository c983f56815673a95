use std::ops::Range;
use std::path::Path;

use regex_lite::{NoExpand, Regex};

/// Extract filename from a file path
///
/// Returns the filename component of a path, or "Unknown" if it can't be extracted.
pub fn extract_filename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != ".")
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Search flags.
///
/// Word boundaries follow `regex_lite` and only know ASCII word characters,
/// so `whole_word` anchors just the needle edges that are `[0-9A-Za-z_]`.
/// An edge such as `(` or `é` matches wherever the rest of the needle does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub match_case: bool,
    pub whole_word: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Escaped needle. `(?i)` folds ASCII only, so other cased characters get a
/// class of their simple case variants.
fn literal(needle: &str, match_case: bool) -> String {
    let mut pattern = String::with_capacity(needle.len());
    for c in needle.chars() {
        let mut variants = vec![c];
        if !match_case && !c.is_ascii() {
            for other in c.to_lowercase().chain(c.to_uppercase()) {
                if !variants.contains(&other) {
                    variants.push(other);
                }
            }
        }
        let simple = c.to_lowercase().count() == 1 && c.to_uppercase().count() == 1;
        if variants.len() > 1 && simple {
            pattern.push('[');
            pattern.extend(variants);
            pattern.push(']');
        } else {
            pattern.push_str(&regex_lite::escape(c.encode_utf8(&mut [0; 4])));
        }
    }
    pattern
}

/// Compile `needle` as a literal pattern. `None` for an empty needle.
fn build_pattern(needle: &str, options: SearchOptions) -> Option<Regex> {
    let (first, last) = (needle.chars().next()?, needle.chars().next_back()?);
    let mut pattern = literal(needle, options.match_case);
    if options.whole_word {
        if is_word_char(first) {
            pattern.insert_str(0, r"\b");
        }
        if is_word_char(last) {
            pattern.push_str(r"\b");
        }
    }
    if !options.match_case {
        pattern.insert_str(0, "(?i)");
    }
    Regex::new(&pattern).ok()
}

/// Byte ranges of every non-overlapping match.
pub fn find_all(text: &str, needle: &str, options: SearchOptions) -> Vec<Range<usize>> {
    match build_pattern(needle, options) {
        Some(re) => re.find_iter(text).map(|m| m.range()).collect(),
        None => Vec::new(),
    }
}

/// First match starting at or after `from`, wrapping to the start of the text.
pub fn find_next(text: &str, needle: &str, from: usize, options: SearchOptions) -> Option<Range<usize>> {
    let matches = find_all(text, needle, options);
    matches
        .iter()
        .find(|r| r.start >= from)
        .or_else(|| matches.first())
        .cloned()
}

/// Last match ending at or before `before`, wrapping to the end of the text.
pub fn find_previous(text: &str, needle: &str, before: usize, options: SearchOptions) -> Option<Range<usize>> {
    let matches = find_all(text, needle, options);
    matches
        .iter()
        .rev()
        .find(|r| r.end <= before)
        .or_else(|| matches.last())
        .cloned()
}

/// Convert a 1-based line number to a byte position in the text
///
/// Returns None if the line number is 0 or beyond the end of the text.
pub fn line_number_to_byte_position(text: &str, line: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    if line == 1 {
        return Some(0);
    }

    let mut current_line = 1;
    for (i, ch) in text.char_indices() {
        if ch == '\n' {
            current_line += 1;
            if current_line == line {
                return Some(i + 1);
            }
        }
    }
    None
}

/// Replace all occurrences of search string with replacement
///
/// Returns (new_text, count_of_replacements)
pub fn replace_all(text: &str, needle: &str, replacement: &str, options: SearchOptions) -> (String, usize) {
    let Some(re) = build_pattern(needle, options) else {
        return (text.to_string(), 0);
    };
    let count = re.find_iter(text).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    (re.replace_all(text, NoExpand(replacement)).into_owned(), count)
}
