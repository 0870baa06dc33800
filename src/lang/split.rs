//! Quote and bracket aware helpers for cutting statement text apart.

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Walks `text` yielding `(byte offset, char)` for characters that sit
/// outside string literals and outside `()` / `[]`.
fn top_level(text: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut quote: Option<char> = None;
    let mut depth = 0i32;
    text.char_indices().filter(move |&(_, ch)| {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            return false;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                false
            }
            '(' | '[' => {
                depth += 1;
                false
            }
            ')' | ']' => {
                depth -= 1;
                false
            }
            _ => depth == 0,
        }
    })
}

/// Splits on `delim` outside quotes and brackets. Pieces are trimmed and
/// blank input yields no pieces.
pub fn split_top(text: &str, delim: char) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![];
    }
    let mut pieces = vec![];
    let mut start = 0;
    for (i, ch) in top_level(text) {
        if ch == delim {
            pieces.push(text[start..i].trim().to_string());
            start = i + ch.len_utf8();
        }
    }
    pieces.push(text[start..].trim().to_string());
    pieces
}

/// Byte offset of a whole-word, case-insensitive keyword outside quotes
/// and brackets.
pub fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let len = keyword.len();
    for (i, _) in top_level(text) {
        let candidate = match text.get(i..i + len) {
            Some(c) => c,
            None => continue,
        };
        if !candidate.eq_ignore_ascii_case(keyword) {
            continue;
        }
        let before = text[..i].chars().next_back();
        let after = text[i + len..].chars().next();
        if before.map_or(true, |c| !is_word_char(c)) && after.map_or(true, |c| !is_word_char(c))
        {
            return Some(i);
        }
    }
    None
}

/// Cuts around the first top-level keyword; both sides trimmed.
pub fn split_keyword<'a>(text: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let i = find_keyword(text, keyword)?;
    Some((text[..i].trim(), text[i + keyword.len()..].trim()))
}

/// Removes a leading keyword and returns the rest, trimmed.
pub fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let text = text.trim_start();
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    match rest.chars().next() {
        Some(c) if is_word_char(c) => None,
        _ => Some(rest.trim()),
    }
}

/// First whitespace-delimited word, upper-cased, with any `(` suffix removed.
pub fn first_word(text: &str) -> String {
    let word = text.split_whitespace().next().unwrap_or("");
    let word = match word.find('(') {
        Some(i) => &word[..i],
        None => word,
    };
    word.to_ascii_uppercase()
}

/// Byte offset of the first top-level `=` that is an assignment rather
/// than part of `<=`, `>=`, `<>`, `==` or `!=`.
pub fn find_assign(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for (i, ch) in top_level(text) {
        if ch != '=' {
            continue;
        }
        let prev = if i > 0 { bytes[i - 1] } else { b' ' };
        let next = bytes.get(i + 1).copied().unwrap_or(b' ');
        if matches!(prev, b'<' | b'>' | b'=' | b'!') || next == b'=' {
            continue;
        }
        return Some(i);
    }
    None
}

/// PRINT item list: each expression with the separator that followed it.
pub fn split_print(text: &str) -> Vec<(String, Option<char>)> {
    let mut items = vec![];
    let mut start = 0;
    for (i, ch) in top_level(text) {
        if ch == ';' || ch == ',' {
            items.push((text[start..i].trim().to_string(), Some(ch)));
            start = i + 1;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        items.push((tail.to_string(), None));
    }
    items
}

/// Position of the `]` closing the `[` at byte offset `open`.
pub fn matching_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, ch) in text[open..].char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_top_respects_quotes_and_brackets() {
        assert_eq!(
            split_top(r#"1, "a,b", F(2, 3), [4, 5]"#, ','),
            vec!["1", r#""a,b""#, "F(2, 3)", "[4, 5]"]
        );
        assert!(split_top("  ", ',').is_empty());
    }

    #[test]
    fn test_find_keyword_whole_word() {
        assert_eq!(find_keyword("X = 1 TO 10", "TO"), Some(6));
        assert_eq!(find_keyword("TOTAL = 1", "TO"), None);
        assert_eq!(find_keyword(r#"PRINT "go to""#, "TO"), None);
        assert_eq!(
            split_keyword("A$ into B", "INTO"),
            Some(("A$", "B"))
        );
    }

    #[test]
    fn test_strip_keyword() {
        assert_eq!(strip_keyword("let x = 1", "LET"), Some("x = 1"));
        assert_eq!(strip_keyword("LETTER", "LET"), None);
    }

    #[test]
    fn test_find_assign_skips_comparisons() {
        assert_eq!(find_assign("A <= 3"), None);
        assert_eq!(find_assign("A = B = C"), Some(2));
        assert_eq!(find_assign(r#"S$ = "x=y""#), Some(3));
    }

    #[test]
    fn test_split_print() {
        assert_eq!(
            split_print(r#""a"; B, C;"#),
            vec![
                (r#""a""#.to_string(), Some(';')),
                ("B".to_string(), Some(',')),
                ("C".to_string(), Some(';')),
            ]
        );
    }
}
