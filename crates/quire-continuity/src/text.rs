//! Prose helpers shared by the rules

use regex::Regex;

/// Blank out quoted dialogue, keeping byte offsets stable
///
/// Straight double quotes toggle; curly quotes open and close. Single quotes
/// count only at word boundaries, so apostrophes in `can't` or `guards'`
/// stay part of the narration.
pub(crate) fn mask_dialogue(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        let is_mark = match (quote, ch) {
            (None | Some('"'), '"') => {
                quote = if quote.is_some() { None } else { Some('"') };
                true
            }
            (None, '\u{201c}') => {
                quote = Some('\u{201d}');
                true
            }
            (Some('\u{201d}'), '\u{201d}') => {
                quote = None;
                true
            }
            (None, '\'' | '\u{2018}') if !is_word(prev) && is_word(next) => {
                quote = Some(ch);
                true
            }
            (Some('\'' | '\u{2018}'), '\'' | '\u{2019}') if !is_word(next) => {
                quote = None;
                true
            }
            _ => false,
        };
        if quote.is_some() || is_mark {
            if ch == '\n' {
                // Unclosed quotes do not leak past the paragraph
                quote = None;
                out.push('\n');
            } else {
                out.extend(std::iter::repeat(' ').take(ch.len_utf8()));
            }
        } else {
            out.push(ch);
        }
        prev = Some(ch);
    }
    out
}

fn is_word(ch: Option<char>) -> bool {
    ch.is_some_and(char::is_alphanumeric)
}

/// Sentence spans as `(start, end)` byte ranges, trimmed, non-empty
pub(crate) fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        let end = match ch {
            '\n' => Some(i),
            '.' | '!' | '?' => {
                // Swallow trailing closers so `"Go!"` stays whole
                let mut end = i + ch.len_utf8();
                while let Some(&(j, next)) = chars.peek() {
                    if matches!(next, '"' | '\'' | '\u{201d}' | ')' | '.' | '!' | '?') {
                        end = j + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                match chars.peek() {
                    None => Some(end),
                    Some(&(_, next)) if next.is_whitespace() => Some(end),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(end) = end {
            push_trimmed(text, start, end, &mut spans);
            start = end;
        }
    }
    push_trimmed(text, start, text.len(), &mut spans);
    spans
}

fn push_trimmed(text: &str, start: usize, end: usize, spans: &mut Vec<(usize, usize)>) {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if !trimmed.is_empty() {
        spans.push((start + lead, start + lead + trimmed.len()));
    }
}

/// Case-insensitive whole-word pattern over alternatives
///
/// Returns `None` for an empty list.
pub(crate) fn word_pattern<S: AsRef<str>>(words: &[S]) -> Option<Regex> {
    let alternatives: Vec<String> = words
        .iter()
        .map(AsRef::as_ref)
        .filter(|w| !w.is_empty())
        .map(|w| regex::escape(w).replace(' ', r"\s+"))
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).ok()
}

/// Up to `n` lowercase words immediately before `offset`
pub(crate) fn preceding_words(text: &str, offset: usize, n: usize) -> Vec<String> {
    let mut words: Vec<String> = text[..offset]
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .rev()
        .take(n)
        .map(str::to_lowercase)
        .collect();
    words.reverse();
    words
}
