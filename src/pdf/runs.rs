// Second parser: walk each page's content stream with lopdf and collect the text runs
// passed to the text-showing operators. Independent from pdf-extract's layout engine,
// so it survives a different set of malformed documents.
use lopdf::content::Content;
use lopdf::{Document, Object};
use tracing::{debug, warn};

use super::ExtractError;

// Trimmed output must be longer than this, or the walk is treated as having found nothing.
const MIN_RUN_CHARS: usize = 50;

pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Parse(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(ExtractError::Encrypted);
    }

    let mut text = String::new();
    for (page_number, page_id) in doc.get_pages() {
        let content = match doc
            .get_page_content(page_id)
            .map_err(|e| e.to_string())
            .and_then(|data| Content::decode(&data).map_err(|e| e.to_string()))
        {
            Ok(content) => content,
            Err(e) => {
                debug!(page = page_number, error = %e, "Skipping undecodable page");
                text.push('\n');
                continue;
            }
        };

        for run in page_runs(&content) {
            text.push_str(&decode_run(&run));
            text.push(' ');
        }
        text.push('\n');
    }

    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    if chars <= MIN_RUN_CHARS {
        warn!(chars, sample = %trimmed, "Very little text in page runs");
        return Err(ExtractError::TooShort(chars));
    }

    Ok(trimmed.to_string())
}

fn page_runs(content: &Content) -> Vec<String> {
    let mut runs = Vec::new();
    for op in &content.operations {
        match op.operator.as_str() {
            "Tj" | "'" => {
                if let Some(Object::String(bytes, _)) = op.operands.last() {
                    runs.push(decode_pdf_string(bytes));
                }
            }
            "\"" => {
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    runs.push(decode_pdf_string(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let run: String = items
                        .iter()
                        .filter_map(|item| match item {
                            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                            _ => None,
                        })
                        .collect();
                    if !run.is_empty() {
                        runs.push(run);
                    }
                }
            }
            _ => {}
        }
    }
    runs
}

// UTF-16BE when the string carries a BOM, otherwise one char per byte.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn decode_run(run: &str) -> String {
    percent_decode(run).unwrap_or_else(|| run.to_string())
}

// Strict percent-decoding: `None` on a malformed escape or invalid UTF-8.
pub(crate) fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hi = (hex[0] as char).to_digit(16)?;
            let lo = (hex[1] as char).to_digit(16)?;
            out.push(((hi << 4) | lo) as u8);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use lopdf::content::Operation;

    #[test]
    fn percent_decode_handles_escapes() {
        assert_eq!(percent_decode("Kinh%20t%E1%BA%BF").as_deref(), Some("Kinh tế"));
        assert_eq!(percent_decode("plain").as_deref(), Some("plain"));
    }

    #[test]
    fn percent_decode_rejects_malformed() {
        assert_eq!(percent_decode("100%"), None);
        assert_eq!(percent_decode("%zz"), None);
        assert_eq!(percent_decode("%FF"), None);
    }

    #[test]
    fn malformed_run_keeps_raw_text() {
        assert_eq!(decode_run("tăng 50% năng suất"), "tăng 50% năng suất");
    }

    #[test]
    fn walks_text_runs_of_a_page() {
        let sentence = "Viet Nam can khung chinh sach ro rang cho tri tue nhan tao trong tai chinh";
        let pdf = pdf_with_operations(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Tj", vec![Object::string_literal(sentence)]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Ket "),
                    (-120).into(),
                    Object::string_literal("luan"),
                ])],
            ),
            Operation::new("ET", vec![]),
        ]);

        let text = extract(&pdf).expect("runs");
        assert_eq!(text, format!("{} Ket luan", sentence));
    }

    #[test]
    fn page_without_runs_is_too_short() {
        let pdf = pdf_without_text();
        assert!(matches!(extract(&pdf), Err(ExtractError::TooShort(0))));
    }

    #[test]
    fn short_text_is_rejected() {
        let pdf = pdf_with_text("Xin chao");
        assert!(matches!(extract(&pdf), Err(ExtractError::TooShort(_))));
    }

    #[test]
    fn floor_is_exclusive() {
        let at_floor = "x".repeat(MIN_RUN_CHARS);
        assert!(matches!(
            extract(&pdf_with_text(&at_floor)),
            Err(ExtractError::TooShort(n)) if n == MIN_RUN_CHARS
        ));

        let above = "x".repeat(MIN_RUN_CHARS + 1);
        assert_eq!(extract(&pdf_with_text(&above)).unwrap(), above);
    }

    #[test]
    fn utf16_strings_are_decoded() {
        let bytes = [0xFE, 0xFF, 0x00, 0x56, 0x00, 0x69, 0x1E, 0xC7];
        assert_eq!(decode_pdf_string(&bytes), "Việ");
    }
}
