// Last-resort heuristic over the undecoded bytes: find BT ... ET text objects and pull
// out their literal strings. Only works for uncompressed content streams.
use regex::Regex;
use std::sync::OnceLock;

use super::ExtractError;

// Anything shorter than this is assumed to be noise rather than text.
const MIN_RAW_CHARS: usize = 10;

static TEXT_OBJECT: OnceLock<Regex> = OnceLock::new();
static LITERAL_STRING: OnceLock<Regex> = OnceLock::new();

fn text_object_re() -> &'static Regex {
    TEXT_OBJECT.get_or_init(|| Regex::new(r"(?s)BT\s+(.*?)\s+ET").expect("valid regex"))
}

// Accepts one level of balanced, unescaped parentheses inside a literal.
// Deeper nesting loses its outermost level.
fn literal_string_re() -> &'static Regex {
    LITERAL_STRING.get_or_init(|| {
        Regex::new(r"\(((?:\\.|[^\\()\r\n]|\((?:\\.|[^\\()\r\n])*\))*)\)").expect("valid regex")
    })
}

pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    // Latin-1 view keeps every byte addressable by the regex.
    let binary: String = bytes.iter().map(|&b| b as char).collect();

    let mut found_text_object = false;
    let mut strings = Vec::new();
    for block in text_object_re().captures_iter(&binary) {
        found_text_object = true;
        let body = block.get(1).map_or("", |m| m.as_str());
        for literal in literal_string_re().captures_iter(body) {
            strings.push(unescape(literal.get(1).map_or("", |m| m.as_str())));
        }
    }

    if !found_text_object {
        return Err(ExtractError::NoText("no BT/ET text objects"));
    }

    let text = strings.join(" ");
    let text = text.trim();
    let chars = text.chars().count();
    if chars < MIN_RAW_CHARS {
        return Err(ExtractError::TooShort(chars));
    }

    Ok(text.to_string())
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => {}
            Some('t') => out.push(' '),
            Some('(') => out.push('('),
            Some(')') => out.push(')'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_strings_from_text_objects() {
        let stream = b"q BT /F1 12 Tf (Chuyen doi so) Tj ET Q\nBT (cho doanh nghiep) Tj ET";
        assert_eq!(extract(stream).unwrap(), "Chuyen doi so cho doanh nghiep");
    }

    #[test]
    fn unescapes_common_sequences() {
        assert_eq!(unescape(r"a\(b\)c"), "a(b)c");
        assert_eq!(unescape(r"line\nnext\r"), "line\nnext");
        assert_eq!(unescape(r"tab\there"), "tab here");
        assert_eq!(unescape(r"back\\slash"), r"back\slash");
        assert_eq!(unescape(r"octal\101"), r"octal\101");
    }

    #[test]
    fn escaped_parens_stay_inside_the_literal() {
        let stream = br"BT (Muc tieu \(2025\) ro rang) Tj ET";
        assert_eq!(extract(stream).unwrap(), "Muc tieu (2025) ro rang");
    }

    #[test]
    fn balanced_parens_stay_inside_the_literal() {
        let stream = b"BT (Chinh sach (du thao) cho AI) Tj ET";
        assert_eq!(extract(stream).unwrap(), "Chinh sach (du thao) cho AI");
    }

    #[test]
    fn missing_text_objects_fail() {
        assert!(matches!(
            extract(b"%PDF-1.7 no text here"),
            Err(ExtractError::NoText(_))
        ));
    }

    #[test]
    fn floor_is_inclusive() {
        let at_floor = format!("BT ({}) Tj ET", "y".repeat(MIN_RAW_CHARS));
        assert_eq!(extract(at_floor.as_bytes()).unwrap().len(), MIN_RAW_CHARS);
    }

    #[test]
    fn short_result_is_treated_as_garbage() {
        assert!(matches!(
            extract(b"BT (abc) Tj ET"),
            Err(ExtractError::TooShort(3))
        ));
    }
}
