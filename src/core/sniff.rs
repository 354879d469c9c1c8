//! Content type detection from file contents.
//!
//! Assets are typed by what their bytes look like, never by their file name. Markup is
//! recognised by its leading tag, binary formats by `infer`'s magic numbers, and
//! anything else that reads as text is served as plain text.

/// At most this many leading bytes are inspected for signatures and markup.
const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const TEXT_XML: &str = "text/xml; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";
pub const IMAGE_SVG: &str = "image/svg+xml";

/// Tags that mark a document as HTML when they open it, matched case-insensitively and
/// followed by whitespace or `>`.
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Detect the MIME type of `content`.
pub fn detect_content_type(content: &[u8]) -> &'static str {
    let head = &content[..content.len().min(SNIFF_LEN)];

    let text = skip_whitespace(head);
    if let Some(mime) = match_markup(text) {
        return mime;
    }

    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }

    if matches!(text.first(), Some(b'{') | Some(b'[')) && is_json(content) {
        return APPLICATION_JSON;
    }

    if looks_like_text(head) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

fn match_markup(text: &[u8]) -> Option<&'static str> {
    if HTML_TAGS.iter().any(|tag| starts_with_tag(text, tag)) {
        return Some(TEXT_HTML);
    }
    if text.starts_with(b"<?xml") {
        return Some(if contains(text, b"<svg") {
            IMAGE_SVG
        } else {
            TEXT_XML
        });
    }
    if starts_with_tag(text, b"<SVG") {
        return Some(IMAGE_SVG);
    }
    None
}

fn starts_with_tag(text: &[u8], tag: &[u8]) -> bool {
    if text.len() <= tag.len() || !text[..tag.len()].eq_ignore_ascii_case(tag) {
        return false;
    }
    // Comments need no terminator check.
    tag == b"<!--" || matches!(text[tag.len()], b' ' | b'>' | b'\t' | b'\n' | b'\r')
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn is_json(content: &[u8]) -> bool {
    serde_json::from_slice::<serde::de::IgnoredAny>(content).is_ok()
}

/// Text means valid UTF-8 (a sequence cut at the sniff boundary is allowed) with no
/// control bytes besides the usual whitespace and escape.
fn looks_like_text(head: &[u8]) -> bool {
    let valid = match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    };
    valid
        && !head
            .iter()
            .any(|b| matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_documents() {
        assert_eq!(detect_content_type(b"<!DOCTYPE html>\n<html></html>"), TEXT_HTML);
        assert_eq!(detect_content_type(b"  \n<html lang=\"en\">"), TEXT_HTML);
        assert_eq!(detect_content_type(b"<p>hello</p>"), TEXT_HTML);
        assert_eq!(detect_content_type(b"<!-- banner -->"), TEXT_HTML);
        assert_eq!(detect_content_type(b"<pre>not listed</pre>"), TEXT_PLAIN);
    }

    #[test]
    fn test_xml_and_svg() {
        assert_eq!(detect_content_type(b"<?xml version=\"1.0\"?><feed/>"), TEXT_XML);
        assert_eq!(
            detect_content_type(b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            IMAGE_SVG
        );
        assert_eq!(detect_content_type(b"<svg width=\"10\"></svg>"), IMAGE_SVG);
    }

    #[test]
    fn test_binary_signatures() {
        assert_eq!(
            detect_content_type(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR"),
            "image/png"
        );
        assert_eq!(detect_content_type(b"\xff\xd8\xff\xe0\x00\x10JFIF"), "image/jpeg");
        assert_eq!(detect_content_type(b"GIF89a\x01\x00"), "image/gif");
        assert_eq!(detect_content_type(b"RIFF\x24\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(detect_content_type(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(detect_content_type(b"\x00\x00\x00\x18ftypmp42"), "video/mp4");
    }

    #[test]
    fn test_json() {
        assert_eq!(detect_content_type(br#"{"name": "frontdoor"}"#), APPLICATION_JSON);
        assert_eq!(detect_content_type(b" [1, 2, 3]\n"), APPLICATION_JSON);
        assert_eq!(detect_content_type(b"{ not json"), TEXT_PLAIN);
    }

    #[test]
    fn test_plain_text_and_empty() {
        assert_eq!(detect_content_type(b"User-agent: *\nDisallow:\n"), TEXT_PLAIN);
        assert_eq!(detect_content_type(b"body { color: red; }"), TEXT_PLAIN);
        assert_eq!(detect_content_type("h\u{e9}llo".as_bytes()), TEXT_PLAIN);
        assert_eq!(detect_content_type(b""), TEXT_PLAIN);
    }

    #[test]
    fn test_unknown_binary() {
        assert_eq!(detect_content_type(b"\x01\x02\x03\x04\xfe"), OCTET_STREAM);
        assert_eq!(detect_content_type(&[0xc3, 0x28, 0x41]), OCTET_STREAM);
    }

    #[test]
    fn test_long_text_is_cut_at_sniff_boundary() {
        let mut content = vec![b'a'; SNIFF_LEN - 1];
        content.extend_from_slice("\u{e9}".as_bytes());
        assert_eq!(detect_content_type(&content), TEXT_PLAIN);
    }
}
